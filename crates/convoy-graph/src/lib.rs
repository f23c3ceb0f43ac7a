//! Selection expansion and dependency-ordered scheduling for Convoy.
//!
//! This crate turns a caller's name tokens plus a project's dependency
//! graph into an [`ExecutionPlan`]: a sequence of ready sets that a
//! lifecycle executor can walk either sequentially or with one worker per
//! member. Two stages feed the plan:
//!
//! - **Expansion** ([`expand`]) resolves tokens that may name individual
//!   services or nested groups into a duplicate-free set of service ids,
//!   failing on unknown tokens and group self-reference.
//! - **Scheduling** ([`schedule`]) applies per-operation command bindings,
//!   restricts the dependency graph to the selection, and layers it
//!   topologically - dependencies first for ascending operations,
//!   dependents first for descending ones. Ties between unordered
//!   services break by declaration order, keeping plans deterministic.
//!
//! Cycles in either stage are configuration errors surfaced before any
//! engine call.

mod error;
mod plan;
mod resolve;
mod schedule;

pub use error::PlanError;
pub use plan::{ExecutionPlan, Gate};
pub use resolve::expand;
pub use schedule::{Selection, schedule};

#[cfg(test)]
mod tests;
