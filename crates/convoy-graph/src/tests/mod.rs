//! Unit tests for selection expansion and scheduling.

mod support;
