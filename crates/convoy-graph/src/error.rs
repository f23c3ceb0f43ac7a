//! Errors raised while expanding selections and building plans.

use thiserror::Error;

/// Errors returned by selection expansion and scheduling.
///
/// All variants are configuration errors: they are fatal to the requested
/// operation, never retried, and always surfaced before any engine call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// A token matched neither a service nor a group.
    #[error("no service or group named '{token}'")]
    UnknownName {
        /// The unresolvable token as the caller supplied it.
        token: String,
    },

    /// A group reached itself while expanding nested members.
    #[error("group expansion cycle: {path}")]
    CyclicGroup {
        /// The expansion path that closed the cycle, e.g. `a -> b -> a`.
        path: String,
    },

    /// The dependency graph restricted to the selection contains a cycle.
    #[error("dependency cycle: {path}")]
    DependencyCycle {
        /// The dependency path that closed the cycle, e.g. `a -> b -> a`.
        path: String,
    },

    /// A dependency edge names a service absent from the whole project.
    #[error("service '{dependent}' depends on unknown service '{name}'")]
    UnknownService {
        /// The missing dependency target.
        name: String,
        /// The service declaring the edge.
        dependent: String,
    },
}

impl PlanError {
    /// Creates a new `UnknownName` error.
    #[must_use]
    pub fn unknown_name(token: impl Into<String>) -> Self {
        Self::UnknownName {
            token: token.into(),
        }
    }

    /// Creates a new `CyclicGroup` error.
    #[must_use]
    pub fn cyclic_group(path: impl Into<String>) -> Self {
        Self::CyclicGroup { path: path.into() }
    }

    /// Creates a new `DependencyCycle` error.
    #[must_use]
    pub fn dependency_cycle(path: impl Into<String>) -> Self {
        Self::DependencyCycle { path: path.into() }
    }

    /// Creates a new `UnknownService` error.
    #[must_use]
    pub fn unknown_service(name: impl Into<String>, dependent: impl Into<String>) -> Self {
        Self::UnknownService {
            name: name.into(),
            dependent: dependent.into(),
        }
    }
}
