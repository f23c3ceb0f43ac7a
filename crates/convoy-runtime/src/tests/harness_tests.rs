//! Timer discipline, error classification, and the final-reset
//! guarantee.

use std::sync::Arc;

use rstest::rstest;

use convoy_config::Condition;
use convoy_graph::PlanError;

use crate::engine::{EngineError, ResourceKind};
use crate::error::{InterruptKind, RuntimeError};
use crate::events::{Event, Step};
use crate::harness::{ActionHarness, EndingCondition, Timer};
use crate::tests::support::CollectingSink;

fn harness(sink: &Arc<CollectingSink>) -> ActionHarness {
    ActionHarness::new(
        Arc::<CollectingSink>::clone(sink),
        "up",
        &["backend".to_owned()],
    )
}

// ---------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------

#[rstest]
fn timer_stops_once() {
    let mut timer = Timer::start();
    assert!(!timer.is_stopped());
    timer.stop();
    assert!(timer.is_stopped());
    let _ = timer.elapsed();
}

#[rstest]
#[should_panic(expected = "timer stopped twice")]
fn timer_rejects_double_stop() {
    let mut timer = Timer::start();
    timer.stop();
    timer.stop();
}

#[rstest]
#[should_panic(expected = "before the timer was stopped")]
fn timer_rejects_elapsed_before_stop() {
    let timer = Timer::start();
    let _ = timer.elapsed();
}

// ---------------------------------------------------------------------
// Harness lifecycle
// ---------------------------------------------------------------------

#[rstest]
fn clean_finish_reports_normal_ending() {
    let sink = CollectingSink::new();
    let harness = harness(&sink);
    assert_eq!(harness.action(), "up");
    assert_eq!(harness.arguments(), ["backend".to_owned()]);
    assert_eq!(harness.finish(), EndingCondition::Normal);

    let events = sink.events();
    assert!(matches!(
        events.first(),
        Some(Event::ActionFinished {
            ending: EndingCondition::Normal,
            ..
        })
    ));
    assert!(matches!(events.get(1), Some(Event::ProgressReset)));
    assert_eq!(sink.progress_resets(), 1);
}

#[rstest]
fn recorded_error_sets_ending_and_message() {
    let sink = CollectingSink::new();
    let mut harness = harness(&sink);
    harness.record_error(&RuntimeError::Interrupted {
        kind: InterruptKind::User,
    });
    assert_eq!(
        harness.message(),
        Some("operation interrupted by user")
    );
    assert_eq!(harness.finish(), EndingCondition::UserInterrupted);
}

#[rstest]
#[should_panic(expected = "classified twice")]
fn second_error_recording_panics() {
    let sink = CollectingSink::new();
    let mut harness = harness(&sink);
    let error = RuntimeError::Interrupted {
        kind: InterruptKind::User,
    };
    harness.record_error(&error);
    harness.record_error(&error);
}

#[rstest]
fn dropping_unfinished_harness_still_resets_progress() {
    let sink = CollectingSink::new();
    drop(harness(&sink));
    assert_eq!(sink.progress_resets(), 1);
    // No summary without finish; only the reset fires.
    assert!(sink.last_ending().is_none());
}

// ---------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------

#[rstest]
#[case::user_interrupt(
    RuntimeError::Interrupted { kind: InterruptKind::User },
    EndingCondition::UserInterrupted
)]
#[case::system_interrupt(
    RuntimeError::Interrupted { kind: InterruptKind::System },
    EndingCondition::SystemInterrupted
)]
#[case::condition_timeout(
    RuntimeError::ConditionTimeout {
        service: "api".to_owned(),
        dependency: "db".to_owned(),
        condition: Condition::Healthy,
        timeout_ms: 500,
    },
    EndingCondition::Timeout
)]
#[case::plan_error(
    RuntimeError::Plan(PlanError::unknown_name("web")),
    EndingCondition::KnownException
)]
#[case::dependency_failed(
    RuntimeError::DependencyFailed { dependency: "migrate".to_owned(), exit_code: 1 },
    EndingCondition::KnownException
)]
#[case::known_engine_failure(
    RuntimeError::service_step("web", Step::Start, EngineError::PortInUse { port: 8080 }),
    EndingCondition::KnownException
)]
#[case::missing_resource(
    RuntimeError::Engine(EngineError::not_found(ResourceKind::Container, "db")),
    EndingCondition::KnownException
)]
#[case::unknown_engine_failure(
    RuntimeError::service_step(
        "db",
        Step::Create,
        EngineError::Failure { message: "boom".to_owned() },
    ),
    EndingCondition::UnknownException
)]
#[case::unreachable_engine(
    RuntimeError::Engine(EngineError::Unreachable { message: "no socket".to_owned() }),
    EndingCondition::UnknownException
)]
#[case::worker_panic(
    RuntimeError::WorkerPanicked { service: "db".to_owned() },
    EndingCondition::UnknownException
)]
fn errors_classify_into_endings(#[case] error: RuntimeError, #[case] expected: EndingCondition) {
    let sink = CollectingSink::new();
    let mut harness = harness(&sink);
    harness.record_error(&error);
    assert_eq!(harness.finish(), expected);
}
