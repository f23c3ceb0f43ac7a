//! Configuration snapshot model for the Convoy orchestrator.
//!
//! This crate defines the immutable service graph that the scheduler and
//! executor consume: named services with dependency edges, per-operation
//! command bindings, named groups, and log-marker readiness probes. The
//! snapshot is assembled once by a configuration loader (compose-file
//! parsing lives outside this workspace) and is never mutated afterwards;
//! the orchestration core only reads it.
//!
//! # Core Types
//!
//! - [`Project`] - The assembled snapshot: services in declaration order,
//!   groups, and the default network name
//! - [`Service`] - A named deployable unit with dependencies, bindings,
//!   and readiness markers
//! - [`DependencyEdge`] - A depended-on service name plus the [`Condition`]
//!   the dependent waits for
//! - [`CommandBindings`] - Per-[`Operation`] participation policy
//!   ([`Binding::Auto`] / [`Binding::Manual`] / [`Binding::Never`])
//! - [`LogMarker`] - A timestamped regex that signals readiness from a
//!   container's log stream

mod binding;
mod condition;
mod group;
mod marker;
mod project;
mod service;

pub use binding::{Binding, CommandBindings, Direction, Operation};
pub use condition::{Condition, DependencyEdge};
pub use group::Group;
pub use marker::LogMarker;
pub use project::{ConfigError, Project, ServiceId};
pub use service::{ContainerSpec, Service};
