//! Operations, command bindings, and scheduling direction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level operations a caller can request against a project.
///
/// Each service declares a [`Binding`] per operation; the scheduler
/// consults the binding for the operation being run when selecting
/// services implicitly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Operation {
    /// Create networks and containers, then start them in dependency order.
    Up,
    /// Stop and remove containers, then remove networks.
    Down,
    /// Down followed by up under a single tracking scope.
    Bounce,
    /// Create containers without starting them.
    Create,
    /// Stop then start in dependency order.
    Restart,
    /// Remove containers.
    Rm,
    /// Start already-created containers.
    Start,
    /// Stop running containers.
    Stop,
    /// Join a service's log stream.
    Join,
    /// Detach from a service's log stream.
    Unjoin,
    /// Wait for a service to reach a readiness condition.
    Wait,
}

impl Operation {
    /// Returns the scheduling direction for this operation.
    ///
    /// Tear-down operations run against the reversed dependency graph so
    /// that dependents are acted on before their dependencies.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Down | Self::Rm | Self::Stop => Direction::Descending,
            Self::Up
            | Self::Bounce
            | Self::Create
            | Self::Restart
            | Self::Start
            | Self::Join
            | Self::Unjoin
            | Self::Wait => Direction::Ascending,
        }
    }
}

/// Direction in which the dependency graph is walked for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Dependencies are acted on before their dependents (up, start, ...).
    Ascending,
    /// Dependents are acted on before their dependencies (down, stop, rm).
    Descending,
}

/// Whether a service participates in an operation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Binding {
    /// Participates when no explicit names are given.
    #[default]
    Auto,
    /// Participates only when explicitly named.
    Manual,
    /// Excluded even when explicitly named.
    Never,
}

/// Per-operation binding policy for one service.
///
/// A service with no explicit bindings behaves as if every operation is
/// [`Binding::Auto`].
#[derive(Debug, Clone, Default)]
pub struct CommandBindings {
    bindings: HashMap<Operation, Binding>,
}

impl CommandBindings {
    /// Creates an empty binding map (everything defaults to `Auto`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the binding for one operation, replacing any previous value.
    #[must_use]
    pub fn with(mut self, operation: Operation, binding: Binding) -> Self {
        self.bindings.insert(operation, binding);
        self
    }

    /// Returns the binding for the given operation.
    #[must_use]
    pub fn binding_for(&self, operation: Operation) -> Binding {
        self.bindings.get(&operation).copied().unwrap_or_default()
    }
}
