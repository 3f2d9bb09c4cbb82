//! Error types for the QE harness

use std::time::Duration;

use thiserror::Error;

/// Errors raised while preparing, running or verifying a certsuite scenario
#[derive(Debug, Error)]
pub enum QeError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("cluster config inference failed: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JUnit XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("test case {test_case} not found in {report}")]
    TestCaseNotFound { test_case: String, report: String },

    #[error("test case {test_case}: expected status {expected}, {report} recorded {actual}")]
    StatusMismatch {
        test_case: String,
        expected: String,
        actual: String,
        report: String,
    },

    #[error("invalid test case status: {0}")]
    InvalidStatus(String),

    #[error("certsuite exited with code {code:?}: {stderr}")]
    CertsuiteFailed { code: Option<i32>, stderr: String },

    #[error("{} parallel task(s) failed: {}", .0.len(), .0.join("; "))]
    Parallel(Vec<String>),

    #[error("missing field {0}")]
    MissingField(&'static str),
}

impl QeError {
    /// Build a timeout error for a named wait
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        QeError::Timeout {
            what: what.into(),
            timeout,
        }
    }

    /// True when the error wraps an API response with the given HTTP code
    pub fn is_api_code(&self, code: u16) -> bool {
        matches!(self, QeError::Kube(kube::Error::Api(e)) if e.code == code)
    }
}

pub type Result<T> = std::result::Result<T, QeError>;
