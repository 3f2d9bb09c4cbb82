//! Certsuite QE Library
//!
//! End-to-end verification of the certsuite certification tool: deploy
//! workloads into a cluster, run certsuite against them and check the
//! verdicts it records.

pub mod builders;
pub mod certsuite;
pub mod config;
pub mod error;
pub mod harness;
pub mod k8s;
pub mod report;
pub mod suites;

pub use error::{QeError, Result};
pub use harness::{init_tracing, QeHarness, ScenarioContext};
pub use report::TestCaseStatus;
