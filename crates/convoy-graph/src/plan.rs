//! Execution plans: layered ready sets plus per-service start gates.

use std::collections::HashMap;

use convoy_config::{Condition, Operation, ServiceId};

/// An in-selection readiness requirement on an upstream dependency.
///
/// Before starting a gated service, the executor must wait until the
/// dependency has reached the state demanded by the gate's condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    dependency: ServiceId,
    condition: Condition,
}

impl Gate {
    /// Creates a gate on the given dependency.
    #[must_use]
    pub const fn new(dependency: ServiceId, condition: Condition) -> Self {
        Self {
            dependency,
            condition,
        }
    }

    /// The depended-on service.
    #[must_use]
    pub const fn dependency(self) -> ServiceId {
        self.dependency
    }

    /// The readiness state the dependency must reach.
    #[must_use]
    pub const fn condition(self) -> Condition {
        self.condition
    }
}

/// A dependency-ordered schedule for one operation.
///
/// The plan is a sequence of ready sets: batches of services whose
/// ordering constraints are simultaneously satisfied, safe to act on
/// concurrently. Set N fully resolves before set N+1 begins; strict
/// sequential execution of the concatenated sets is an equally valid
/// realisation. Members within a set appear in declaration order.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    operation: Operation,
    ready_sets: Vec<Vec<ServiceId>>,
    gates: HashMap<ServiceId, Vec<Gate>>,
    covers_default_selection: bool,
}

impl ExecutionPlan {
    pub(crate) fn new(
        operation: Operation,
        ready_sets: Vec<Vec<ServiceId>>,
        gates: HashMap<ServiceId, Vec<Gate>>,
        covers_default_selection: bool,
    ) -> Self {
        Self {
            operation,
            ready_sets,
            gates,
            covers_default_selection,
        }
    }

    /// The operation this plan was built for.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// The layered ready sets, earliest first.
    #[must_use]
    pub fn ready_sets(&self) -> &[Vec<ServiceId>] {
        &self.ready_sets
    }

    /// The in-selection start gates for one service.
    ///
    /// Gates only block ascending phases; teardown consults ready-set
    /// ordering alone.
    #[must_use]
    pub fn gates(&self, id: ServiceId) -> &[Gate] {
        self.gates.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Iterates all scheduled services in execution order.
    pub fn services(&self) -> impl Iterator<Item = ServiceId> + '_ {
        self.ready_sets.iter().flatten().copied()
    }

    /// Number of scheduled services across all ready sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ready_sets.iter().map(Vec::len).sum()
    }

    /// Returns `true` when nothing was scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready_sets.is_empty()
    }

    /// Whether the plan was built from the full default selection.
    ///
    /// Drives project-wide teardown such as removing the default network
    /// at the end of a `down`.
    #[must_use]
    pub const fn covers_default_selection(&self) -> bool {
        self.covers_default_selection
    }
}
