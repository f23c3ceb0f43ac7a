//! Probe state transitions and condition evaluation.

use convoy_config::{Condition, LogMarker};
use rstest::{fixture, rstest};

use crate::monitor::{ConditionStatus, ServiceProbe};

fn marker(pattern: &str) -> LogMarker {
    LogMarker::new(0, pattern, pattern).expect("valid marker")
}

#[fixture]
fn db_probe() -> ServiceProbe {
    ServiceProbe::new(
        "db",
        &[
            marker("database system is ready"),
            marker("listening on port \\d+"),
        ],
    )
}

// ---------------------------------------------------------------------
// Started
// ---------------------------------------------------------------------

#[rstest]
fn started_requires_notification(db_probe: ServiceProbe) {
    assert_eq!(db_probe.status(Condition::Started), ConditionStatus::Pending);
    db_probe.notify_started();
    assert_eq!(
        db_probe.status(Condition::Started),
        ConditionStatus::Satisfied
    );
}

#[rstest]
fn started_ignores_log_markers(db_probe: ServiceProbe) {
    db_probe.notify_started();
    assert_eq!(db_probe.satisfied_markers(), 0);
    assert_eq!(
        db_probe.status(Condition::Started),
        ConditionStatus::Satisfied
    );
}

// ---------------------------------------------------------------------
// Healthy
// ---------------------------------------------------------------------

#[rstest]
fn healthy_pending_until_all_markers_match(db_probe: ServiceProbe) {
    db_probe.observe_line("database system is ready", 10);
    assert_eq!(db_probe.status(Condition::Healthy), ConditionStatus::Pending);
    db_probe.observe_line("listening on port 5432", 20);
    assert_eq!(
        db_probe.status(Condition::Healthy),
        ConditionStatus::Satisfied
    );
}

#[rstest]
fn native_health_signal_satisfies_without_markers(db_probe: ServiceProbe) {
    db_probe.notify_healthy();
    assert_eq!(
        db_probe.status(Condition::Healthy),
        ConditionStatus::Satisfied
    );
}

#[rstest]
fn probe_without_markers_needs_native_signal() {
    let probe = ServiceProbe::new("cache", &[]);
    probe.notify_started();
    assert_eq!(probe.status(Condition::Healthy), ConditionStatus::Pending);
    probe.notify_healthy();
    assert_eq!(probe.status(Condition::Healthy), ConditionStatus::Satisfied);
}

#[rstest]
fn exit_dooms_pending_healthy_wait(db_probe: ServiceProbe) {
    db_probe.observe_line("database system is ready", 10);
    db_probe.notify_exit(137);
    assert_eq!(
        db_probe.status(Condition::Healthy),
        ConditionStatus::Failed { exit_code: 137 }
    );
}

#[rstest]
fn satisfaction_is_permanent(db_probe: ServiceProbe) {
    db_probe.observe_line("database system is ready", 10);
    db_probe.observe_line("listening on port 5432", 20);
    db_probe.notify_exit(1);
    // A satisfied condition stays satisfied even after the container dies.
    assert_eq!(
        db_probe.status(Condition::Healthy),
        ConditionStatus::Satisfied
    );
}

// ---------------------------------------------------------------------
// Completed successfully
// ---------------------------------------------------------------------

#[rstest]
#[case(0, ConditionStatus::Satisfied)]
#[case(1, ConditionStatus::Failed { exit_code: 1 })]
#[case(137, ConditionStatus::Failed { exit_code: 137 })]
fn completion_follows_exit_code(#[case] exit_code: i64, #[case] expected: ConditionStatus) {
    let probe = ServiceProbe::new("migrate", &[]);
    assert_eq!(
        probe.status(Condition::CompletedSuccessfully),
        ConditionStatus::Pending
    );
    probe.notify_exit(exit_code);
    assert_eq!(probe.status(Condition::CompletedSuccessfully), expected);
}

// ---------------------------------------------------------------------
// Marker matching
// ---------------------------------------------------------------------

#[rstest]
fn marker_matches_at_most_once(db_probe: ServiceProbe) {
    db_probe.observe_line("database system is ready", 10);
    db_probe.observe_line("database system is ready", 500);
    assert_eq!(db_probe.marker_elapsed_ms(0), Some(10));
    assert_eq!(db_probe.satisfied_markers(), 1);
}

#[rstest]
fn unmatched_lines_leave_markers_pending(db_probe: ServiceProbe) {
    db_probe.observe_line("checkpoint complete", 5);
    assert_eq!(db_probe.satisfied_markers(), 0);
    assert_eq!(db_probe.marker_elapsed_ms(0), None);
}

#[rstest]
fn one_line_can_satisfy_several_markers() {
    let probe = ServiceProbe::new(
        "web",
        &[marker("server (started|ready)"), marker("port 8080")],
    );
    probe.observe_line("server started on port 8080", 15);
    assert_eq!(probe.satisfied_markers(), 2);
    assert_eq!(probe.marker_elapsed_ms(1), Some(15));
}
