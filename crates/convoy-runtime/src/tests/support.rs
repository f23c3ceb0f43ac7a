//! Shared fixtures for runtime tests: a scripted fake engine, an
//! event-collecting sink, and canonical projects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use convoy_config::{Condition, ContainerSpec, LogMarker, Project, Service};

use crate::engine::{ContainerEngine, EngineError, HealthStatus, LogStream};
use crate::events::{Event, EventSink};
use crate::executor::{ExecutorOptions, LifecycleExecutor};
use crate::harness::EndingCondition;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------
// Fake engine
// ---------------------------------------------------------------------

/// An in-memory engine that records calls and replays scripted state.
///
/// Mutating calls are recorded as `"verb:name"` strings in invocation
/// order. The polled queries (`exit_status`, `health_status`) are not
/// recorded; they run in wait loops and would swamp the call log.
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<String>>,
    logs: Mutex<HashMap<String, Vec<(u64, String)>>>,
    endless: Mutex<HashMap<String, (u64, String)>>,
    open_streams: Arc<AtomicUsize>,
    health: Mutex<HashMap<String, HealthStatus>>,
    exits: Mutex<HashMap<String, i64>>,
    failures: Mutex<HashMap<String, EngineError>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scripts the log stream for a service as `(delay_ms, line)` pairs;
    /// each delay elapses before its line is yielded.
    pub fn script_logs(&self, service: &str, lines: &[(u64, &str)]) {
        lock(&self.logs).insert(
            service.to_owned(),
            lines
                .iter()
                .map(|&(delay, line)| (delay, line.to_owned()))
                .collect(),
        );
    }

    /// Scripts a never-ending stream for a service: after any scripted
    /// lines, `line` repeats every `period_ms` until the reader stops.
    pub fn script_endless_logs(&self, service: &str, period_ms: u64, line: &str) {
        lock(&self.endless).insert(service.to_owned(), (period_ms, line.to_owned()));
    }

    /// Number of log streams attached and not yet dropped.
    pub fn open_log_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Presets the native healthcheck verdict for a service.
    pub fn set_health(&self, service: &str, status: HealthStatus) {
        lock(&self.health).insert(service.to_owned(), status);
    }

    /// Presets the exit code reported for a service.
    pub fn set_exit(&self, service: &str, exit_code: i64) {
        lock(&self.exits).insert(service.to_owned(), exit_code);
    }

    /// Makes the named call fail instead of being recorded, e.g.
    /// `fail("create:db", ...)`.
    pub fn fail(&self, call: &str, error: EngineError) {
        lock(&self.failures).insert(call.to_owned(), error);
    }

    /// Recorded mutating calls, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: String) -> Result<(), EngineError> {
        if let Some(error) = lock(&self.failures).get(&call) {
            return Err(error.clone());
        }
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl ContainerEngine for FakeEngine {
    fn ensure_connected(&self) -> Result<(), EngineError> {
        self.record("connect".to_owned())
    }

    fn create_network(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("network-create:{name}"))
    }

    fn remove_network(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("network-remove:{name}"))
    }

    fn create_container(&self, service: &str, _spec: &ContainerSpec) -> Result<(), EngineError> {
        self.record(format!("create:{service}"))
    }

    fn start_container(&self, service: &str) -> Result<(), EngineError> {
        self.record(format!("start:{service}"))
    }

    fn stop_container(&self, service: &str) -> Result<(), EngineError> {
        self.record(format!("stop:{service}"))
    }

    fn remove_container(&self, service: &str) -> Result<(), EngineError> {
        self.record(format!("remove:{service}"))
    }

    fn attach_logs(&self, service: &str) -> Result<LogStream, EngineError> {
        self.record(format!("logs:{service}"))?;
        let lines = lock(&self.logs).get(service).cloned().unwrap_or_default();
        let repeat = lock(&self.endless).get(service).cloned();
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            lines: lines.into_iter(),
            repeat,
            open: Arc::clone(&self.open_streams),
        }))
    }

    fn exit_status(&self, service: &str) -> Result<Option<i64>, EngineError> {
        Ok(lock(&self.exits).get(service).copied())
    }

    fn health_status(&self, service: &str) -> Result<HealthStatus, EngineError> {
        Ok(lock(&self.health)
            .get(service)
            .copied()
            .unwrap_or(HealthStatus::Unsupported))
    }
}

/// Replays scripted `(delay_ms, line)` pairs, optionally repeating a
/// trailing line forever, and tracks its own drop so tests can assert
/// that every attachment was released.
struct ScriptedStream {
    lines: std::vec::IntoIter<(u64, String)>,
    repeat: Option<(u64, String)>,
    open: Arc<AtomicUsize>,
}

impl Iterator for ScriptedStream {
    type Item = Result<String, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((delay_ms, line)) = self.lines.next() {
            thread::sleep(Duration::from_millis(delay_ms));
            return Some(Ok(line));
        }
        let (period_ms, line) = self.repeat.as_ref()?;
        thread::sleep(Duration::from_millis(*period_ms));
        Some(Ok(line.clone()))
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------
// Collecting sink
// ---------------------------------------------------------------------

/// A sink that stores every published event for later assertions.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    /// Number of progress resets seen; must be exactly one per action.
    pub fn progress_resets(&self) -> usize {
        lock(&self.events)
            .iter()
            .filter(|event| matches!(event, Event::ProgressReset))
            .count()
    }

    /// Ending condition from the last `ActionFinished` event, if any.
    pub fn last_ending(&self) -> Option<EndingCondition> {
        lock(&self.events)
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::ActionFinished { ending, .. } => Some(*ending),
                _ => None,
            })
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: &Event) {
        lock(&self.events).push(event.clone());
    }
}

// ---------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------

/// Builds the canonical two-service project: `db` (with one readiness
/// marker) and `api` depending on `db` with the given condition.
pub fn db_api_project(condition: Condition) -> Project {
    let mut project = Project::new("demo");
    let db = Service::new("db")
        .with_spec(ContainerSpec::new("postgres:16"))
        .with_marker(
            LogMarker::new(25, "ready to accept connections", "database ready")
                .expect("valid marker"),
        );
    project.add_service(db).expect("add db");
    project
        .add_service(
            Service::new("api")
                .with_spec(ContainerSpec::new("api:latest"))
                .with_dependency("db", condition),
        )
        .expect("add api");
    project
}

/// Wraps a project, engine, and sink into an executor with fast timing
/// suited to tests.
pub fn executor(
    project: Project,
    engine: &Arc<FakeEngine>,
    sink: &Arc<CollectingSink>,
) -> LifecycleExecutor {
    let engine: Arc<dyn ContainerEngine> = Arc::<FakeEngine>::clone(engine);
    let sink_dyn: Arc<dyn EventSink> = Arc::<CollectingSink>::clone(sink);
    LifecycleExecutor::new(Arc::new(project), engine, sink_dyn).with_options(ExecutorOptions {
        condition_timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(5),
    })
}
