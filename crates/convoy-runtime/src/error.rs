//! Runtime errors raised while executing lifecycle operations.
//!
//! One tagged enum carries every failure kind; callers dispatch by
//! matching the variant rather than downcasting. Lower-level engine
//! errors are wrapped with their service or network context, never
//! swallowed.

use thiserror::Error;

use convoy_config::Condition;
use convoy_graph::PlanError;

use crate::engine::EngineError;
use crate::events::Step;

/// Who requested a cooperative interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum InterruptKind {
    /// The user asked to stop, e.g. Ctrl-C.
    User,
    /// The surrounding system asked to stop, e.g. SIGTERM.
    System,
}

/// Errors surfaced by lifecycle execution.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Selection or scheduling failed; no engine call was made.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// An engine call outside any per-service step failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A network operation failed.
    #[error("network '{network}' operation failed: {source}")]
    Network {
        /// The affected network.
        network: String,
        /// Underlying engine failure.
        #[source]
        source: EngineError,
    },

    /// A per-service lifecycle step failed.
    #[error("{step} failed for service '{service}': {source}")]
    ServiceStep {
        /// The affected service.
        service: String,
        /// Which step failed.
        step: Step,
        /// Underlying engine failure.
        #[source]
        source: EngineError,
    },

    /// A dependency never reached the required condition within budget.
    #[error(
        "dependency '{dependency}' of '{service}' did not reach '{condition}' within {timeout_ms}ms"
    )]
    ConditionTimeout {
        /// The blocked dependent service.
        service: String,
        /// The depended-on service.
        dependency: String,
        /// The condition that never arrived.
        condition: Condition,
        /// The exhausted budget, in milliseconds.
        timeout_ms: u64,
    },

    /// A dependency exited non-zero while a completion gate waited on it.
    #[error("dependency '{dependency}' exited with code {exit_code} before completing successfully")]
    DependencyFailed {
        /// The depended-on service.
        dependency: String,
        /// The non-zero exit code.
        exit_code: i64,
    },

    /// The operation was cooperatively interrupted.
    #[error("operation interrupted by {kind}")]
    Interrupted {
        /// Who requested the interrupt.
        kind: InterruptKind,
    },

    /// A ready-set worker thread panicked.
    #[error("worker thread for service '{service}' panicked")]
    WorkerPanicked {
        /// The service whose worker died.
        service: String,
    },
}

impl RuntimeError {
    /// Creates a `ServiceStep` error.
    #[must_use]
    pub fn service_step(service: impl Into<String>, step: Step, source: EngineError) -> Self {
        Self::ServiceStep {
            service: service.into(),
            step,
            source,
        }
    }

    /// Creates a `Network` error.
    #[must_use]
    pub fn network(network: impl Into<String>, source: EngineError) -> Self {
        Self::Network {
            network: network.into(),
            source,
        }
    }
}
