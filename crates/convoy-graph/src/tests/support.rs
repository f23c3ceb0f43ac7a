//! Shared fixtures for graph tests.

use convoy_config::{Condition, Group, Project, Service};

use crate::plan::ExecutionPlan;

/// Builds the canonical two-service project: `db` plus `api` depending on
/// `db: healthy`, with a `backend` group covering both.
pub fn db_api_project() -> Project {
    let mut project = Project::new("demo");
    project.add_service(Service::new("db")).expect("add db");
    project
        .add_service(Service::new("api").with_dependency("db", Condition::Healthy))
        .expect("add api");
    project
        .add_group(Group::new(
            "backend",
            vec!["db".to_owned(), "api".to_owned()],
        ))
        .expect("add backend");
    project
}

/// Renders a plan's ready sets as service names for readable assertions.
pub fn ready_set_names(project: &Project, plan: &ExecutionPlan) -> Vec<Vec<String>> {
    plan.ready_sets()
        .iter()
        .map(|set| {
            set.iter()
                .filter_map(|&id| project.service(id).map(|s| s.name().to_owned()))
                .collect()
        })
        .collect()
}

/// Renders an expanded selection as service names in iteration order.
pub fn selection_names(
    project: &Project,
    selected: &std::collections::BTreeSet<convoy_config::ServiceId>,
) -> Vec<String> {
    selected
        .iter()
        .filter_map(|&id| project.service(id).map(|s| s.name().to_owned()))
        .collect()
}
