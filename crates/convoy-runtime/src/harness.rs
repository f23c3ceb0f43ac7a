//! Per-operation tracking scope: timing, classification, final reset.
//!
//! An [`ActionHarness`] wraps one top-level operation invocation. It
//! snapshots the action name and arguments, runs a single-use [`Timer`],
//! classifies at most one error into an [`EndingCondition`], and
//! guarantees - via `Drop` - that the [`Event::ProgressReset`] signal is
//! published exactly once no matter how the operation terminated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::EngineError;
use crate::error::{InterruptKind, RuntimeError};
use crate::events::{Event, EventSink};

/// Tracing target for harness lifecycle.
const HARNESS_TARGET: &str = "convoy_runtime::harness";

/// A single-use wall-clock timer.
///
/// Misuse is a programming error, not a recoverable condition: the timer
/// fails loudly on a double stop or on reading the elapsed time before
/// stopping.
#[derive(Debug)]
pub struct Timer {
    started_at: Instant,
    stopped_at: Option<Instant>,
}

impl Timer {
    /// Starts a timer at the current instant.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            stopped_at: None,
        }
    }

    /// Stops the timer.
    ///
    /// # Panics
    ///
    /// Panics if the timer was already stopped.
    pub fn stop(&mut self) {
        assert!(self.stopped_at.is_none(), "timer stopped twice");
        self.stopped_at = Some(Instant::now());
    }

    /// Returns whether the timer has been stopped.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Elapsed time between start and stop.
    ///
    /// # Panics
    ///
    /// Panics if the timer has not been stopped.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let Some(stopped_at) = self.stopped_at else {
            panic!("elapsed time read before the timer was stopped");
        };
        stopped_at.duration_since(self.started_at)
    }
}

/// Classified outcome of one top-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndingCondition {
    /// The operation completed without error.
    Normal,
    /// The user interrupted the operation.
    UserInterrupted,
    /// The surrounding system interrupted the operation.
    SystemInterrupted,
    /// A readiness wait exhausted its budget.
    Timeout,
    /// An unexpected failure with no known cause.
    UnknownException,
    /// A recognised, expected failure kind.
    KnownException,
}

/// Tracking scope for one top-level operation invocation.
///
/// Created when the operation begins and consumed by [`finish`] when it
/// ends; dropping an unfinished harness (a panic unwinding through the
/// scope, for instance) still publishes the final progress reset. The
/// harness never retries - retrying, if desired, belongs to a layer above
/// it.
///
/// [`finish`]: ActionHarness::finish
pub struct ActionHarness {
    action: String,
    arguments: Vec<String>,
    timer: Timer,
    ending: EndingCondition,
    message: Option<String>,
    classified: bool,
    reset_sent: bool,
    sink: Arc<dyn EventSink>,
}

impl ActionHarness {
    /// Opens a tracking scope, starting the timer.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>, action: impl Into<String>, arguments: &[String]) -> Self {
        let action = action.into();
        debug!(
            target: HARNESS_TARGET,
            action = %action,
            ?arguments,
            "action started"
        );
        Self {
            action,
            arguments: arguments.to_vec(),
            timer: Timer::start(),
            ending: EndingCondition::Normal,
            message: None,
            classified: false,
            reset_sent: false,
            sink,
        }
    }

    /// The tracked action's name.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Immutable snapshot of the caller's arguments.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Classifies the operation's error into an ending condition.
    ///
    /// Classification happens at most once per operation.
    ///
    /// # Panics
    ///
    /// Panics if an error was already recorded.
    pub fn record_error(&mut self, error: &RuntimeError) {
        assert!(
            !self.classified,
            "ending condition classified twice for action '{}'",
            self.action
        );
        self.classified = true;
        self.ending = classify(error);
        self.message = Some(error.to_string());
        warn!(
            target: HARNESS_TARGET,
            action = %self.action,
            ending = %self.ending,
            error = %error,
            "action failed"
        );
    }

    /// Human-readable message for the recorded error, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Closes the scope: stops the timer, publishes the summary and the
    /// final progress reset, and returns the classified ending.
    pub fn finish(mut self) -> EndingCondition {
        self.timer.stop();
        let elapsed = self.timer.elapsed();
        debug!(
            target: HARNESS_TARGET,
            action = %self.action,
            ending = %self.ending,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "action finished"
        );
        self.sink.publish(&Event::ActionFinished {
            action: self.action.clone(),
            ending: self.ending,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
        self.sink.publish(&Event::ProgressReset);
        self.reset_sent = true;
        self.ending
    }
}

impl Drop for ActionHarness {
    fn drop(&mut self) {
        // Guarantees the reset fires even when the scope unwinds without
        // reaching finish.
        if !self.reset_sent {
            self.sink.publish(&Event::ProgressReset);
            self.reset_sent = true;
        }
    }
}

/// Maps a runtime error onto its ending condition.
fn classify(error: &RuntimeError) -> EndingCondition {
    match error {
        RuntimeError::Interrupted {
            kind: InterruptKind::User,
        } => EndingCondition::UserInterrupted,
        RuntimeError::Interrupted {
            kind: InterruptKind::System,
        } => EndingCondition::SystemInterrupted,
        RuntimeError::ConditionTimeout { .. } => EndingCondition::Timeout,
        RuntimeError::Plan(_) | RuntimeError::DependencyFailed { .. } => {
            EndingCondition::KnownException
        }
        RuntimeError::Engine(source)
        | RuntimeError::Network { source, .. }
        | RuntimeError::ServiceStep { source, .. } => classify_engine(source),
        RuntimeError::WorkerPanicked { .. } => EndingCondition::UnknownException,
    }
}

fn classify_engine(source: &EngineError) -> EndingCondition {
    if source.is_known() {
        EndingCondition::KnownException
    } else {
        EndingCondition::UnknownException
    }
}
