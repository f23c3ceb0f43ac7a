//! Progress and failure events published during lifecycle operations.
//!
//! Rendering layers (console, GUI log viewers) subscribe by implementing
//! [`EventSink`]; the executor receives exactly one sink at construction,
//! so there is no process-wide listener list to mutate. The event type is
//! a sparse enum - listeners match the variants they care about and
//! ignore the rest.

use serde::Serialize;
use tracing::{debug, warn};

use convoy_config::Condition;

use crate::harness::EndingCondition;

/// Tracing target for event forwarding.
const EVENT_TARGET: &str = "convoy_runtime::events";

/// A per-service lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    /// Creating the service's container.
    Create,
    /// Starting the service's container.
    Start,
    /// Stopping the service's container.
    Stop,
    /// Removing the service's container.
    Remove,
}

/// Outcome marker for a step event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step is about to run.
    Begin,
    /// The step completed successfully.
    End,
    /// The step was skipped because its batch was aborted.
    Skipped,
}

/// Progress, readiness, and failure notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A network is about to be created.
    NetworkCreating {
        /// Network name.
        network: String,
    },
    /// A network was created.
    NetworkCreated {
        /// Network name.
        network: String,
    },
    /// A network is about to be removed.
    NetworkRemoving {
        /// Network name.
        network: String,
    },
    /// A network was removed.
    NetworkRemoved {
        /// Network name.
        network: String,
    },
    /// A per-service step began, ended, or was skipped.
    ServiceStep {
        /// Service name.
        service: String,
        /// Which lifecycle step.
        step: Step,
        /// Begin, end, or skipped.
        outcome: StepOutcome,
    },
    /// A dependent service is blocked on an upstream condition.
    WaitingOn {
        /// The blocked service.
        service: String,
        /// The depended-on service.
        dependency: String,
        /// The awaited condition.
        condition: Condition,
    },
    /// A previously awaited condition was satisfied.
    DependencyReady {
        /// The formerly blocked service.
        service: String,
        /// The depended-on service.
        dependency: String,
        /// The satisfied condition.
        condition: Condition,
        /// How long the dependent waited, in milliseconds.
        waited_ms: u64,
    },
    /// An awaited condition did not arrive within its budget.
    ConditionTimedOut {
        /// The blocked service.
        service: String,
        /// The depended-on service.
        dependency: String,
        /// The condition that never arrived.
        condition: Condition,
        /// The exhausted budget, in milliseconds.
        timeout_ms: u64,
    },
    /// A service's operation failed; the current batch is aborting.
    OperationFailed {
        /// The failed service.
        service: String,
        /// Human-readable failure description.
        message: String,
    },
    /// A top-level action finished, successfully or not.
    ActionFinished {
        /// Action name, e.g. `up`.
        action: String,
        /// Classified outcome.
        ending: EndingCondition,
        /// Wall-clock duration of the action, in milliseconds.
        elapsed_ms: u64,
    },
    /// Progress displays should reset; fires exactly once per action.
    ProgressReset,
}

/// Receiver for lifecycle events.
///
/// Dispatch happens from worker threads, so implementations must be
/// thread-safe and should return quickly.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    fn publish(&self, event: &Event);
}

/// A sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &Event) {}
}

/// A sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &Event) {
        match event {
            Event::ConditionTimedOut { .. } | Event::OperationFailed { .. } => {
                warn!(target: EVENT_TARGET, ?event, "lifecycle event");
            }
            _ => debug!(target: EVENT_TARGET, ?event, "lifecycle event"),
        }
    }
}
