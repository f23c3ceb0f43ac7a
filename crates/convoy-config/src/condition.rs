//! Readiness conditions and dependency edges.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Readiness state a dependency must reach before its dependent starts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Condition {
    /// Satisfied as soon as the dependency's container is observed to start.
    Started,
    /// Satisfied by a native engine health signal or by all of the
    /// dependency's configured log markers matching.
    Healthy,
    /// Satisfied when the dependency's container exits with code zero.
    CompletedSuccessfully,
}

/// A directed dependency from one service to another.
///
/// The edge is owned by the dependent service and names the service it
/// depends on, together with the [`Condition`] that gates the dependent's
/// start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    service: String,
    condition: Condition,
}

impl DependencyEdge {
    /// Creates an edge to the named service with the given condition.
    #[must_use]
    pub fn new(service: impl Into<String>, condition: Condition) -> Self {
        Self {
            service: service.into(),
            condition,
        }
    }

    /// Name of the depended-on service.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Condition the dependent waits for.
    #[must_use]
    pub const fn condition(&self) -> Condition {
        self.condition
    }
}
