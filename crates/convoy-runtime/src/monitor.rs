//! Per-container readiness state.
//!
//! A [`ServiceProbe`] is attached to a service when its container is
//! observed to start. The executor's log pump feeds it timestamped lines,
//! and engine polls feed it native health and exit notifications; gate
//! waits read the combined state back through [`ServiceProbe::status`].

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use convoy_config::{Condition, LogMarker};

/// Tracing target for readiness monitoring.
const MONITOR_TARGET: &str = "convoy_runtime::monitor";

/// Progress of one configured marker.
#[derive(Debug, Clone)]
struct MarkerProgress {
    marker: LogMarker,
    satisfied_at_ms: Option<u64>,
}

/// Evaluation of a condition against a probe's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Not satisfied yet; keep waiting.
    Pending,
    /// The condition is satisfied; it stays satisfied permanently.
    Satisfied,
    /// The condition can never be satisfied.
    Failed {
        /// Exit code that doomed the wait.
        exit_code: i64,
    },
}

#[derive(Debug, Default)]
struct ProbeState {
    started: bool,
    healthy_native: bool,
    exit_code: Option<i64>,
    markers: Vec<MarkerProgress>,
}

/// Readiness state for one container.
///
/// One probe exists per started container; probes for independent
/// services operate independently. All transitions are at-most-once: a
/// marker that matched stays satisfied, and later matching lines change
/// nothing.
#[derive(Debug)]
pub struct ServiceProbe {
    service: String,
    state: Mutex<ProbeState>,
}

impl ServiceProbe {
    /// Creates a probe for a service with its configured markers pending.
    #[must_use]
    pub fn new(service: impl Into<String>, markers: &[LogMarker]) -> Self {
        let markers = markers
            .iter()
            .map(|marker| MarkerProgress {
                marker: marker.clone(),
                satisfied_at_ms: None,
            })
            .collect();
        Self {
            service: service.into(),
            state: Mutex::new(ProbeState {
                markers,
                ..ProbeState::default()
            }),
        }
    }

    /// The monitored service's name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records that the container was observed to start.
    pub fn notify_started(&self) {
        self.lock().started = true;
    }

    /// Records a native engine healthy signal.
    pub fn notify_healthy(&self) {
        self.lock().healthy_native = true;
    }

    /// Records the container's exit code.
    pub fn notify_exit(&self, exit_code: i64) {
        self.lock().exit_code = Some(exit_code);
    }

    /// Tests a log line against every still-pending marker.
    ///
    /// The elapsed time is measured from log-stream attach and is
    /// recorded for diagnostics on first match; a marker that already
    /// matched is never re-evaluated.
    pub fn observe_line(&self, line: &str, elapsed_ms: u64) {
        let mut state = self.lock();
        for progress in &mut state.markers {
            if progress.satisfied_at_ms.is_some() {
                continue;
            }
            if progress.marker.matches(line) {
                progress.satisfied_at_ms = Some(elapsed_ms);
                debug!(
                    target: MONITOR_TARGET,
                    service = %self.service,
                    marker = progress.marker.description(),
                    elapsed_ms,
                    expected_offset_ms = progress.marker.offset_ms(),
                    "marker satisfied"
                );
            }
        }
    }

    /// Evaluates a condition against the current state.
    ///
    /// `Started` is satisfied by the start notification alone, with no
    /// log scan. `Healthy` is satisfied by a native healthy signal or by
    /// all configured markers matching; a service with no markers relies
    /// on the native signal. `CompletedSuccessfully` requires an exit
    /// code of zero; any exit dooms a still-pending healthy or completion
    /// wait.
    #[must_use]
    pub fn status(&self, condition: Condition) -> ConditionStatus {
        let state = self.lock();
        match condition {
            Condition::Started => {
                if state.started {
                    ConditionStatus::Satisfied
                } else {
                    ConditionStatus::Pending
                }
            }
            Condition::Healthy => {
                let markers_done = !state.markers.is_empty()
                    && state.markers.iter().all(|m| m.satisfied_at_ms.is_some());
                if state.healthy_native || markers_done {
                    ConditionStatus::Satisfied
                } else if let Some(exit_code) = state.exit_code {
                    ConditionStatus::Failed { exit_code }
                } else {
                    ConditionStatus::Pending
                }
            }
            Condition::CompletedSuccessfully => match state.exit_code {
                Some(0) => ConditionStatus::Satisfied,
                Some(exit_code) => ConditionStatus::Failed { exit_code },
                None => ConditionStatus::Pending,
            },
        }
    }

    /// Elapsed milliseconds at which the indexed marker matched, if it
    /// has.
    #[must_use]
    pub fn marker_elapsed_ms(&self, index: usize) -> Option<u64> {
        self.lock()
            .markers
            .get(index)
            .and_then(|m| m.satisfied_at_ms)
    }

    /// Number of markers that have matched so far.
    #[must_use]
    pub fn satisfied_markers(&self) -> usize {
        self.lock()
            .markers
            .iter()
            .filter(|m| m.satisfied_at_ms.is_some())
            .count()
    }
}
