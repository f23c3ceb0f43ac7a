//! Ready-set walking and engine call composition.
//!
//! The [`LifecycleExecutor`] owns one immutable project snapshot, one
//! shared engine reference, and one event sink. Each public operation
//! expands its selection, opens an [`ActionHarness`] scope, obtains an
//! [`ExecutionPlan`], and walks the plan's ready sets with one worker
//! thread per member, synchronising at ready-set boundaries: set N fully
//! resolves before set N+1 begins.
//!
//! A failure in any member marks the batch aborted - workers that have
//! not started yet, or that were still waiting on closed gates, publish
//! `Skipped` and stand down; workers mid-step finish, and later ready
//! sets are never attempted. Completed work from earlier sets is left in
//! place; partial application is a visible, reported outcome.
//!
//! Log pumps spawned during an ascending phase are stopped and joined
//! before the phase returns, so no stream attachment or blocked reader
//! survives the harness scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use convoy_config::{Condition, Operation, Project, Service, ServiceId};
use convoy_graph::{ExecutionPlan, Gate, Selection, schedule};

use crate::cancel::CancelToken;
use crate::engine::{ContainerEngine, EngineError, HealthStatus, LogStream};
use crate::error::{InterruptKind, RuntimeError};
use crate::events::{Event, EventSink, Step, StepOutcome};
use crate::harness::ActionHarness;
use crate::monitor::{ConditionStatus, ServiceProbe};

/// Tracing target for executor operations.
const EXEC_TARGET: &str = "convoy_runtime::executor";

/// Probes for the services started during one ascending phase.
type ProbeMap = Mutex<HashMap<ServiceId, Arc<ServiceProbe>>>;

/// Tunable timing for lifecycle execution.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Budget for each readiness-condition wait.
    pub condition_timeout: Duration,
    /// Interval between polls while waiting on a condition.
    pub poll_interval: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            condition_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// Drives dependency-ordered lifecycle operations against an engine.
pub struct LifecycleExecutor {
    project: Arc<Project>,
    engine: Arc<dyn ContainerEngine>,
    sink: Arc<dyn EventSink>,
    options: ExecutorOptions,
    cancel: CancelToken,
}

impl LifecycleExecutor {
    /// Creates an executor over one project snapshot.
    #[must_use]
    pub fn new(
        project: Arc<Project>,
        engine: Arc<dyn ContainerEngine>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            project,
            engine,
            sink,
            options: ExecutorOptions::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the timing options.
    #[must_use]
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a handle callers can wire into an interrupt source.
    ///
    /// Cancelling the token classifies the running operation as
    /// user-interrupted and releases blocked condition waits promptly.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Creates networks and containers, then starts them in dependency
    /// order, gating each start on its upstream conditions.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by planning or by any
    /// ready-set worker; prior completed work is left in place.
    pub fn up(&self, tokens: &[String]) -> Result<(), RuntimeError> {
        self.run_action(Operation::Up, tokens, |selection| {
            let plan = schedule(&self.project, Operation::Up, selection)?;
            if plan.is_empty() {
                return Ok(());
            }
            self.engine.ensure_connected()?;
            self.create_default_network()?;
            self.ascend(&plan, AscendMode::CreateAndStart)
        })
    }

    /// Stops and removes containers in reverse dependency order, then
    /// removes the default network for a full default selection.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by planning or by any
    /// ready-set worker; prior completed work is left in place.
    pub fn down(&self, tokens: &[String]) -> Result<(), RuntimeError> {
        self.run_action(Operation::Down, tokens, |selection| {
            let plan = schedule(&self.project, Operation::Down, selection)?;
            if plan.is_empty() {
                return Ok(());
            }
            self.engine.ensure_connected()?;
            self.descend(plan.ready_sets().iter(), &[Step::Stop, Step::Remove])?;
            if plan.covers_default_selection() {
                self.remove_default_network()?;
            }
            Ok(())
        })
    }

    /// Stops containers in reverse dependency order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by planning or by any
    /// ready-set worker.
    pub fn stop(&self, tokens: &[String]) -> Result<(), RuntimeError> {
        self.run_action(Operation::Stop, tokens, |selection| {
            let plan = schedule(&self.project, Operation::Stop, selection)?;
            if plan.is_empty() {
                return Ok(());
            }
            self.engine.ensure_connected()?;
            self.descend(plan.ready_sets().iter(), &[Step::Stop])
        })
    }

    /// Starts already-created containers in dependency order, gated on
    /// upstream conditions.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by planning or by any
    /// ready-set worker.
    pub fn start(&self, tokens: &[String]) -> Result<(), RuntimeError> {
        self.run_action(Operation::Start, tokens, |selection| {
            let plan = schedule(&self.project, Operation::Start, selection)?;
            if plan.is_empty() {
                return Ok(());
            }
            self.engine.ensure_connected()?;
            self.ascend(&plan, AscendMode::StartOnly)
        })
    }

    /// Stops the selection in reverse order, then starts it again in
    /// dependency order, under a single tracking scope.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by planning or by any
    /// ready-set worker.
    pub fn restart(&self, tokens: &[String]) -> Result<(), RuntimeError> {
        self.run_action(Operation::Restart, tokens, |selection| {
            let plan = schedule(&self.project, Operation::Restart, selection)?;
            if plan.is_empty() {
                return Ok(());
            }
            self.engine.ensure_connected()?;
            // An ascending plan read backwards is a valid teardown order.
            self.descend(plan.ready_sets().iter().rev(), &[Step::Stop])?;
            self.ascend(&plan, AscendMode::StartOnly)
        })
    }

    /// Removes containers in reverse dependency order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by planning or by any
    /// ready-set worker.
    pub fn rm(&self, tokens: &[String]) -> Result<(), RuntimeError> {
        self.run_action(Operation::Rm, tokens, |selection| {
            let plan = schedule(&self.project, Operation::Rm, selection)?;
            if plan.is_empty() {
                return Ok(());
            }
            self.engine.ensure_connected()?;
            self.descend(plan.ready_sets().iter(), &[Step::Remove])
        })
    }

    /// Full teardown followed by full bring-up, sharing one harness
    /// scope.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by planning or by any
    /// ready-set worker.
    pub fn bounce(&self, tokens: &[String]) -> Result<(), RuntimeError> {
        self.run_action(Operation::Bounce, tokens, |selection| {
            let plan = schedule(&self.project, Operation::Bounce, selection)?;
            if plan.is_empty() {
                return Ok(());
            }
            self.engine.ensure_connected()?;
            self.descend(plan.ready_sets().iter().rev(), &[Step::Stop, Step::Remove])?;
            if plan.covers_default_selection() {
                self.remove_default_network()?;
            }
            self.create_default_network()?;
            self.ascend(&plan, AscendMode::CreateAndStart)
        })
    }

    // -----------------------------------------------------------------
    // Harness scope
    // -----------------------------------------------------------------

    fn run_action<F>(
        &self,
        operation: Operation,
        tokens: &[String],
        body: F,
    ) -> Result<(), RuntimeError>
    where
        F: FnOnce(&Selection) -> Result<(), RuntimeError>,
    {
        let selection = Selection::from_tokens(tokens);
        let mut harness =
            ActionHarness::new(Arc::clone(&self.sink), operation.to_string(), tokens);
        let result = body(&selection);
        if let Err(ref error) = result {
            harness.record_error(error);
        }
        let ending = harness.finish();
        debug!(
            target: EXEC_TARGET,
            operation = %operation,
            ending = %ending,
            "operation complete"
        );
        result
    }

    // -----------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------

    /// Walks ready sets forward, creating (optionally) and starting each
    /// member after its gates open.
    ///
    /// Pumps spawned during the phase are stopped and joined before this
    /// returns, success or not, releasing every log attachment.
    fn ascend(&self, plan: &ExecutionPlan, mode: AscendMode) -> Result<(), RuntimeError> {
        let probes: ProbeMap = Mutex::new(HashMap::new());
        let pumps = LogPumps::new(self.cancel.clone());
        let result = self.ascend_sets(plan, mode, &probes, &pumps);
        pumps.shutdown();
        result
    }

    fn ascend_sets(
        &self,
        plan: &ExecutionPlan,
        mode: AscendMode,
        probes: &ProbeMap,
        pumps: &LogPumps,
    ) -> Result<(), RuntimeError> {
        let skip_steps: &[Step] = match mode {
            AscendMode::CreateAndStart => &[Step::Create, Step::Start],
            AscendMode::StartOnly => &[Step::Start],
        };
        for ready_set in plan.ready_sets() {
            self.run_ready_set(ready_set, skip_steps, |id, service, aborted| {
                self.wait_for_gates(plan, probes, id, service)?;
                // The batch may have aborted while this member's gates
                // were still closed; it has started nothing, so it skips.
                if aborted.load(Ordering::SeqCst) {
                    self.publish_skipped(service.name(), skip_steps);
                    return Ok(());
                }
                if mode == AscendMode::CreateAndStart {
                    self.step(service, Step::Create, || {
                        self.engine.create_container(service.name(), service.spec())
                    })?;
                }
                self.start_and_attach(probes, pumps, id, service)
            })?;
        }
        Ok(())
    }

    /// Walks the given ready sets applying teardown steps to each member.
    fn descend<'a>(
        &self,
        ready_sets: impl Iterator<Item = &'a Vec<ServiceId>>,
        steps: &[Step],
    ) -> Result<(), RuntimeError> {
        for ready_set in ready_sets {
            self.run_ready_set(ready_set, steps, |_, service, _| {
                self.teardown_one(service, steps)
            })?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Ready-set workers
    // -----------------------------------------------------------------

    /// Runs one worker thread per ready-set member and joins the batch.
    ///
    /// The first failure (in declaration order) is returned after every
    /// member has completed, failed, or skipped.
    fn run_ready_set<F>(
        &self,
        ready_set: &[ServiceId],
        skip_steps: &[Step],
        worker: F,
    ) -> Result<(), RuntimeError>
    where
        F: Fn(ServiceId, &Service, &AtomicBool) -> Result<(), RuntimeError> + Sync,
    {
        let aborted = AtomicBool::new(false);
        let outcomes: Vec<Result<(), RuntimeError>> = thread::scope(|scope| {
            let handles: Vec<_> = ready_set
                .iter()
                .filter_map(|&id| self.project.service(id).map(|service| (id, service)))
                .map(|(id, service)| {
                    let aborted = &aborted;
                    let worker = &worker;
                    let handle = scope.spawn(move || {
                        self.run_worker(id, service, skip_steps, aborted, worker)
                    });
                    (id, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(id, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(RuntimeError::WorkerPanicked {
                            service: self.service_name(id),
                        })
                    })
                })
                .collect()
        });
        for outcome in outcomes {
            outcome?;
        }
        Ok(())
    }

    fn run_worker<F>(
        &self,
        id: ServiceId,
        service: &Service,
        skip_steps: &[Step],
        aborted: &AtomicBool,
        worker: &F,
    ) -> Result<(), RuntimeError>
    where
        F: Fn(ServiceId, &Service, &AtomicBool) -> Result<(), RuntimeError> + Sync,
    {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Interrupted {
                kind: InterruptKind::User,
            });
        }
        if aborted.load(Ordering::SeqCst) {
            self.publish_skipped(service.name(), skip_steps);
            return Ok(());
        }
        match worker(id, service, aborted) {
            Ok(()) => Ok(()),
            Err(error) => {
                aborted.store(true, Ordering::SeqCst);
                self.sink.publish(&Event::OperationFailed {
                    service: service.name().to_owned(),
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    // -----------------------------------------------------------------
    // Per-service steps
    // -----------------------------------------------------------------

    fn step(
        &self,
        service: &Service,
        step: Step,
        call: impl FnOnce() -> Result<(), EngineError>,
    ) -> Result<(), RuntimeError> {
        self.publish_step(service.name(), step, StepOutcome::Begin);
        call().map_err(|source| RuntimeError::service_step(service.name(), step, source))?;
        self.publish_step(service.name(), step, StepOutcome::End);
        Ok(())
    }

    fn publish_step(&self, service: &str, step: Step, outcome: StepOutcome) {
        self.sink.publish(&Event::ServiceStep {
            service: service.to_owned(),
            step,
            outcome,
        });
    }

    fn publish_skipped(&self, service: &str, steps: &[Step]) {
        for &step in steps {
            self.publish_step(service, step, StepOutcome::Skipped);
        }
    }

    fn teardown_one(&self, service: &Service, steps: &[Step]) -> Result<(), RuntimeError> {
        for &step in steps {
            match step {
                Step::Stop => {
                    self.step(service, Step::Stop, || {
                        self.engine.stop_container(service.name())
                    })?;
                }
                Step::Remove => {
                    self.step(service, Step::Remove, || {
                        self.engine.remove_container(service.name())
                    })?;
                }
                Step::Create | Step::Start => {}
            }
        }
        Ok(())
    }

    fn start_and_attach(
        &self,
        probes: &ProbeMap,
        pumps: &LogPumps,
        id: ServiceId,
        service: &Service,
    ) -> Result<(), RuntimeError> {
        self.step(service, Step::Start, || {
            self.engine.start_container(service.name())
        })?;
        let probe = Arc::new(ServiceProbe::new(service.name(), service.markers()));
        probe.notify_started();
        if !service.markers().is_empty() {
            let stream = self
                .engine
                .attach_logs(service.name())
                .map_err(|source| RuntimeError::service_step(service.name(), Step::Start, source))?;
            pumps.spawn(Arc::clone(&probe), stream);
        }
        probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, probe);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Condition gates
    // -----------------------------------------------------------------

    fn wait_for_gates(
        &self,
        plan: &ExecutionPlan,
        probes: &ProbeMap,
        id: ServiceId,
        service: &Service,
    ) -> Result<(), RuntimeError> {
        for gate in plan.gates(id) {
            let dependency = self.service_name(gate.dependency());
            self.sink.publish(&Event::WaitingOn {
                service: service.name().to_owned(),
                dependency: dependency.clone(),
                condition: gate.condition(),
            });
            let waited_ms = self.wait_for_condition(service.name(), &dependency, *gate, probes)?;
            self.sink.publish(&Event::DependencyReady {
                service: service.name().to_owned(),
                dependency,
                condition: gate.condition(),
                waited_ms,
            });
        }
        Ok(())
    }

    /// Blocks until the gate's condition is satisfied, doomed, timed
    /// out, or cancelled.
    fn wait_for_condition(
        &self,
        dependent: &str,
        dependency: &str,
        gate: Gate,
        probes: &ProbeMap,
    ) -> Result<u64, RuntimeError> {
        let started = Instant::now();
        let deadline = started + self.options.condition_timeout;
        loop {
            if self.cancel.is_cancelled() {
                return Err(RuntimeError::Interrupted {
                    kind: InterruptKind::User,
                });
            }
            let probe = probes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&gate.dependency())
                .cloned();
            if let Some(probe) = probe {
                self.poll_engine_signals(dependency, gate.condition(), &probe)?;
                match probe.status(gate.condition()) {
                    ConditionStatus::Satisfied => return Ok(elapsed_ms(started)),
                    ConditionStatus::Failed { exit_code } => {
                        return Err(RuntimeError::DependencyFailed {
                            dependency: dependency.to_owned(),
                            exit_code,
                        });
                    }
                    ConditionStatus::Pending => {}
                }
            }
            if Instant::now() >= deadline {
                let timeout_ms = millis(self.options.condition_timeout);
                warn!(
                    target: EXEC_TARGET,
                    service = dependent,
                    dependency,
                    condition = %gate.condition(),
                    timeout_ms,
                    "condition wait timed out"
                );
                self.sink.publish(&Event::ConditionTimedOut {
                    service: dependent.to_owned(),
                    dependency: dependency.to_owned(),
                    condition: gate.condition(),
                    timeout_ms,
                });
                return Err(RuntimeError::ConditionTimeout {
                    service: dependent.to_owned(),
                    dependency: dependency.to_owned(),
                    condition: gate.condition(),
                    timeout_ms,
                });
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    /// Feeds engine-derived health and exit signals into a probe.
    fn poll_engine_signals(
        &self,
        dependency: &str,
        condition: Condition,
        probe: &ServiceProbe,
    ) -> Result<(), RuntimeError> {
        match condition {
            Condition::Started => Ok(()),
            Condition::Healthy => {
                if self.engine.health_status(dependency)? == HealthStatus::Healthy {
                    probe.notify_healthy();
                }
                // Capture exits so a dead dependency fails fast instead
                // of waiting out the timeout.
                if let Some(exit_code) = self.engine.exit_status(dependency)? {
                    probe.notify_exit(exit_code);
                }
                Ok(())
            }
            Condition::CompletedSuccessfully => {
                if let Some(exit_code) = self.engine.exit_status(dependency)? {
                    probe.notify_exit(exit_code);
                }
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------
    // Networks
    // -----------------------------------------------------------------

    fn create_default_network(&self) -> Result<(), RuntimeError> {
        let network = self.project.default_network();
        self.sink.publish(&Event::NetworkCreating {
            network: network.clone(),
        });
        self.engine
            .create_network(&network)
            .map_err(|source| RuntimeError::network(network.clone(), source))?;
        self.sink.publish(&Event::NetworkCreated { network });
        Ok(())
    }

    fn remove_default_network(&self) -> Result<(), RuntimeError> {
        let network = self.project.default_network();
        self.sink.publish(&Event::NetworkRemoving {
            network: network.clone(),
        });
        self.engine
            .remove_network(&network)
            .map_err(|source| RuntimeError::network(network.clone(), source))?;
        self.sink.publish(&Event::NetworkRemoved { network });
        Ok(())
    }

    fn service_name(&self, id: ServiceId) -> String {
        self.project
            .service(id)
            .map_or_else(|| String::from("?"), |service| service.name().to_owned())
    }
}

/// Whether an ascending phase creates containers before starting them.
#[derive(Clone, Copy, PartialEq, Eq)]
enum AscendMode {
    CreateAndStart,
    StartOnly,
}

/// Log pumps spawned during one ascending phase.
///
/// Each pump re-checks its stop flag and the operation's cancel token
/// between lines; [`shutdown`] raises the flag and joins every pump,
/// dropping the streams, so no attachment or blocked reader survives the
/// phase. Joining returns promptly because streams honour the
/// bounded-blocking contract of [`ContainerEngine::attach_logs`].
///
/// [`shutdown`]: LogPumps::shutdown
struct LogPumps {
    cancel: CancelToken,
    stop: Arc<AtomicBool>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl LogPumps {
    fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            stop: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns a pump feeding a container's log stream into its probe.
    ///
    /// The pump ends when the stream does, on a stream error, or when
    /// stopped or cancelled; a stream error is logged without failing
    /// the operation.
    fn spawn(&self, probe: Arc<ServiceProbe>, stream: LogStream) {
        let stop = Arc::clone(&self.stop);
        let cancel = self.cancel.clone();
        let name = format!("logs-{}", probe.service());
        let spawned = thread::Builder::new()
            .name(name)
            .spawn(move || pump_lines(&probe, stream, &stop, &cancel));
        match spawned {
            Ok(handle) => self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle),
            Err(error) => warn!(target: EXEC_TARGET, %error, "failed to spawn log pump"),
        }
    }

    /// Stops every pump and joins it, releasing the attachments.
    fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handles: Vec<_> = {
            let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            guard.drain(..).collect()
        };
        for handle in handles {
            if handle.join().is_err() {
                warn!(target: EXEC_TARGET, "log pump panicked");
            }
        }
    }
}

fn pump_lines(probe: &ServiceProbe, stream: LogStream, stop: &AtomicBool, cancel: &CancelToken) {
    let attached = Instant::now();
    for line in stream {
        if stop.load(Ordering::SeqCst) || cancel.is_cancelled() {
            break;
        }
        match line {
            Ok(text) => probe.observe_line(&text, elapsed_ms(attached)),
            Err(error) => {
                warn!(
                    target: EXEC_TARGET,
                    service = probe.service(),
                    %error,
                    "log stream ended with error"
                );
                break;
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn elapsed_ms(since: Instant) -> u64 {
    millis(since.elapsed())
}
