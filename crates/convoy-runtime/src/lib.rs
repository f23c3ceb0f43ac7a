//! Lifecycle execution for the Convoy orchestrator.
//!
//! This crate drives container and network lifecycle operations against a
//! [`ContainerEngine`] in the order computed by `convoy-graph`, gating
//! dependent services on readiness conditions and reporting progress
//! through an injected [`EventSink`].
//!
//! # Components
//!
//! - [`ContainerEngine`] - the boundary trait a concrete engine binding
//!   implements; everything here is specified per logical operation, not
//!   per wire format
//! - [`ServiceProbe`] - per-container readiness state: log-marker
//!   matching, start/exit notifications, and native health signals
//! - [`ActionHarness`] - wraps one top-level operation with timing,
//!   error classification, and a guaranteed final progress reset
//! - [`LifecycleExecutor`] - walks a plan's ready sets with one worker
//!   thread per member, synchronising at ready-set boundaries
//!
//! Ready sets execute concurrently; a failure in one member aborts the
//! not-yet-started remainder of its batch and every later set, while
//! completed work is left in place and reported.

mod cancel;
mod engine;
mod error;
mod events;
mod executor;
mod harness;
mod monitor;

pub use cancel::CancelToken;
pub use engine::{ContainerEngine, EngineError, HealthStatus, LogStream, ResourceKind};
pub use error::{InterruptKind, RuntimeError};
pub use events::{Event, EventSink, NullSink, Step, StepOutcome, TracingSink};
pub use executor::{ExecutorOptions, LifecycleExecutor};
pub use harness::{ActionHarness, EndingCondition, Timer};
pub use monitor::{ConditionStatus, ServiceProbe};

#[cfg(test)]
mod tests;
