//! Binding-aware selection and topological layering.

use std::collections::{BTreeSet, HashMap};

use convoy_config::{Binding, Direction, Operation, Project, Service, ServiceId};

use crate::error::PlanError;
use crate::plan::{ExecutionPlan, Gate};
use crate::resolve::expand;

/// Which services a caller asked an operation to cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No explicit names: every `Auto`-bound service for the operation.
    All,
    /// Explicit tokens naming services or groups.
    Named(Vec<String>),
}

impl Selection {
    /// Builds a selection from caller tokens, mapping an empty list to
    /// [`Selection::All`].
    #[must_use]
    pub fn from_tokens(tokens: &[String]) -> Self {
        if tokens.is_empty() {
            Self::All
        } else {
            Self::Named(tokens.to_vec())
        }
    }
}

/// Computes a dependency-ordered execution plan for one operation.
///
/// Selection rules: with [`Selection::All`], every service whose binding
/// for the operation is `Auto` participates; `Manual` and `Never` services
/// are left out. With [`Selection::Named`], tokens are expanded through
/// groups and only `Never`-bound services are filtered - naming a `Never`
/// service excludes it rather than failing.
///
/// Dependency edges to services outside the selection are dropped;
/// out-of-set dependencies are assumed already satisfied. The induced
/// subgraph is layered into ready sets, dependencies first for ascending
/// operations and dependents first for descending ones, with declaration
/// order breaking ties inside each set.
///
/// # Errors
///
/// Returns [`PlanError::UnknownService`] when any edge in the whole
/// project names a missing service, [`PlanError::DependencyCycle`] when
/// the induced subgraph is cyclic, and propagates expansion errors from
/// [`expand`].
pub fn schedule(
    project: &Project,
    operation: Operation,
    selection: &Selection,
) -> Result<ExecutionPlan, PlanError> {
    validate_edges(project)?;
    let (selected, covers_default) = select(project, operation, selection)?;
    let gates = collect_gates(project, &selected);
    let ready_sets = layer(project, operation.direction(), &selected, &gates)?;
    Ok(ExecutionPlan::new(
        operation,
        ready_sets,
        gates,
        covers_default,
    ))
}

/// Rejects edges whose target is absent from the whole project, not just
/// the selection.
fn validate_edges(project: &Project) -> Result<(), PlanError> {
    for (_, service) in project.services() {
        for edge in service.depends_on() {
            if project.service_named(edge.service()).is_none() {
                return Err(PlanError::unknown_service(edge.service(), service.name()));
            }
        }
    }
    Ok(())
}

/// Applies binding policy to produce the concrete service set.
fn select(
    project: &Project,
    operation: Operation,
    selection: &Selection,
) -> Result<(BTreeSet<ServiceId>, bool), PlanError> {
    match selection {
        Selection::All => {
            let selected = project
                .services()
                .filter(|(_, service)| service.binding_for(operation) == Binding::Auto)
                .map(|(id, _)| id)
                .collect();
            Ok((selected, true))
        }
        Selection::Named(tokens) => {
            let mut selected = expand(project, tokens)?;
            selected.retain(|&id| {
                project
                    .service(id)
                    .is_some_and(|service| service.binding_for(operation) != Binding::Never)
            });
            Ok((selected, false))
        }
    }
}

/// Collects each selected service's in-selection upstream gates.
fn collect_gates(
    project: &Project,
    selected: &BTreeSet<ServiceId>,
) -> HashMap<ServiceId, Vec<Gate>> {
    let mut gates: HashMap<ServiceId, Vec<Gate>> = HashMap::new();
    for &id in selected {
        let Some(service) = project.service(id) else {
            continue;
        };
        let in_set: Vec<Gate> = service
            .depends_on()
            .iter()
            .filter_map(|edge| {
                project
                    .service_named(edge.service())
                    .filter(|dep| selected.contains(dep))
                    .map(|dep| Gate::new(dep, edge.condition()))
            })
            .collect();
        if !in_set.is_empty() {
            gates.insert(id, in_set);
        }
    }
    gates
}

/// Layers the induced subgraph into ready sets with Kahn's algorithm.
fn layer(
    project: &Project,
    direction: Direction,
    selected: &BTreeSet<ServiceId>,
    gates: &HashMap<ServiceId, Vec<Gate>>,
) -> Result<Vec<Vec<ServiceId>>, PlanError> {
    let mut indegree: HashMap<ServiceId, usize> =
        selected.iter().map(|&id| (id, 0)).collect();
    let mut successors: HashMap<ServiceId, Vec<ServiceId>> = HashMap::new();
    let mut predecessors: HashMap<ServiceId, Vec<ServiceId>> = HashMap::new();

    for (&dependent, dependent_gates) in gates {
        for gate in dependent_gates {
            // Ascending: the dependency precedes the dependent. Descending
            // reverses the edge so dependents are torn down first.
            let (earlier, later) = match direction {
                Direction::Ascending => (gate.dependency(), dependent),
                Direction::Descending => (dependent, gate.dependency()),
            };
            successors.entry(earlier).or_default().push(later);
            predecessors.entry(later).or_default().push(earlier);
            if let Some(count) = indegree.get_mut(&later) {
                *count += 1;
            }
        }
    }

    let mut remaining = selected.clone();
    let mut ready_sets = Vec::new();
    while !remaining.is_empty() {
        // BTreeSet iteration yields declaration order, the deterministic
        // tie-break between unordered members.
        let ready: Vec<ServiceId> = remaining
            .iter()
            .copied()
            .filter(|id| indegree.get(id).copied() == Some(0))
            .collect();
        if ready.is_empty() {
            let path = find_cycle(project, &remaining, &predecessors);
            return Err(PlanError::dependency_cycle(path));
        }
        for &id in &ready {
            remaining.remove(&id);
            for later in successors.get(&id).into_iter().flatten() {
                if let Some(count) = indegree.get_mut(later) {
                    *count = count.saturating_sub(1);
                }
            }
        }
        ready_sets.push(ready);
    }
    Ok(ready_sets)
}

/// Reconstructs one cycle through the stuck remainder for the error path.
fn find_cycle(
    project: &Project,
    remaining: &BTreeSet<ServiceId>,
    predecessors: &HashMap<ServiceId, Vec<ServiceId>>,
) -> String {
    let Some(mut current) = remaining.iter().next().copied() else {
        return String::new();
    };
    let mut path: Vec<ServiceId> = Vec::new();
    loop {
        if let Some(position) = path.iter().position(|&id| id == current) {
            let mut cycle: Vec<&str> = path
                .get(position..)
                .into_iter()
                .flatten()
                .map(|&id| service_name(project, id))
                .collect();
            cycle.push(service_name(project, current));
            // The walk followed predecessors, so reverse to present the
            // cycle in dependency direction.
            cycle.reverse();
            return cycle.join(" -> ");
        }
        path.push(current);
        let next = predecessors
            .get(&current)
            .into_iter()
            .flatten()
            .copied()
            .find(|id| remaining.contains(id));
        match next {
            Some(id) => current = id,
            None => {
                return path
                    .iter()
                    .map(|&id| service_name(project, id))
                    .collect::<Vec<_>>()
                    .join(" -> ");
            }
        }
    }
}

fn service_name(project: &Project, id: ServiceId) -> &str {
    project.service(id).map_or("?", Service::name)
}
