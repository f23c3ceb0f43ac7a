//! Unit tests for the runtime: probes, the harness, and the executor.

mod harness_tests;
mod monitor_tests;
mod support;
