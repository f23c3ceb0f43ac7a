//! Token expansion over services and nested groups.

use std::collections::BTreeSet;

use convoy_config::{Project, ServiceId};

use crate::error::PlanError;

/// Expands caller-supplied tokens into a duplicate-free set of services.
///
/// Each token may name a service or a group; groups expand depth-first and
/// may nest. The result is keyed by declaration index, so iterating it
/// yields services in declaration order regardless of token order, and a
/// service reachable through several tokens collapses to one entry.
/// Expansion is a pure function of the loaded configuration.
///
/// # Errors
///
/// Returns [`PlanError::UnknownName`] for a token matching neither a
/// service nor a group, or [`PlanError::CyclicGroup`] when a group reaches
/// itself through nested members.
pub fn expand(project: &Project, tokens: &[String]) -> Result<BTreeSet<ServiceId>, PlanError> {
    let mut selected = BTreeSet::new();
    let mut visiting = Vec::new();
    for token in tokens {
        expand_token(project, token, &mut visiting, &mut selected)?;
    }
    Ok(selected)
}

/// Resolves one token, recursing into group members.
fn expand_token(
    project: &Project,
    token: &str,
    visiting: &mut Vec<String>,
    selected: &mut BTreeSet<ServiceId>,
) -> Result<(), PlanError> {
    if let Some(id) = project.service_named(token) {
        selected.insert(id);
        return Ok(());
    }
    let Some(group) = project.group(token) else {
        return Err(PlanError::unknown_name(token));
    };
    if visiting.iter().any(|seen| seen == token) {
        let mut path: Vec<&str> = visiting.iter().map(String::as_str).collect();
        path.push(token);
        return Err(PlanError::cyclic_group(path.join(" -> ")));
    }
    visiting.push(token.to_owned());
    for member in group.members() {
        expand_token(project, member, visiting, selected)?;
    }
    visiting.pop();
    Ok(())
}
