use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Harness settings, read from `QE_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct QeConfig {
    #[serde(default)]
    pub kubeconfig: Option<String>,

    /// Run a local certsuite binary instead of the container image
    #[serde(default)]
    pub certsuite_binary: Option<String>,

    #[serde(default = "default_certsuite_image")]
    pub certsuite_image: String,

    #[serde(default = "default_certsuite_image_tag")]
    pub certsuite_image_tag: String,

    #[serde(default = "default_container_engine")]
    pub container_engine: String,

    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    #[serde(default = "default_test_image")]
    pub test_image: String,

    /// Keep report directories after a scenario
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub disable_intrusive_tests: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_certsuite_timeout_secs")]
    pub certsuite_timeout_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    #[serde(default = "default_probe_daemonset_namespace")]
    pub probe_daemonset_namespace: String,
}

fn default_certsuite_image() -> String {
    "quay.io/redhat-best-practices-for-k8s/certsuite".to_string()
}

fn default_certsuite_image_tag() -> String {
    "latest".to_string()
}

fn default_container_engine() -> String {
    "docker".to_string()
}

fn default_config_dir() -> String {
    "/tmp/certsuite_config".to_string()
}

fn default_report_dir() -> String {
    "/tmp/certsuite_reports".to_string()
}

fn default_test_image() -> String {
    "quay.io/testnetworkfunction/cnf-test-partner:latest".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_certsuite_timeout_secs() -> u64 {
    900
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_ready_timeout_secs() -> u64 {
    300
}

fn default_probe_daemonset_namespace() -> String {
    "cnf-suite".to_string()
}

impl QeConfig {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("QE").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn certsuite_image_ref(&self) -> String {
        format!("{}:{}", self.certsuite_image, self.certsuite_image_tag)
    }

    pub fn config_dir(&self) -> PathBuf {
        PathBuf::from(&self.config_dir)
    }

    pub fn report_dir(&self) -> PathBuf {
        PathBuf::from(&self.report_dir)
    }

    pub fn certsuite_timeout(&self) -> Duration {
        Duration::from_secs(self.certsuite_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

impl Default for QeConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            certsuite_binary: None,
            certsuite_image: default_certsuite_image(),
            certsuite_image_tag: default_certsuite_image_tag(),
            container_engine: default_container_engine(),
            config_dir: default_config_dir(),
            report_dir: default_report_dir(),
            test_image: default_test_image(),
            debug: false,
            disable_intrusive_tests: false,
            log_level: default_log_level(),
            certsuite_timeout_secs: default_certsuite_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            ready_timeout_secs: default_ready_timeout_secs(),
            probe_daemonset_namespace: default_probe_daemonset_namespace(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QeConfig::default();
        assert_eq!(config.container_engine, "docker");
        assert_eq!(config.report_dir, "/tmp/certsuite_reports");
        assert_eq!(
            config.certsuite_image_ref(),
            "quay.io/redhat-best-practices-for-k8s/certsuite:latest"
        );
        assert_eq!(config.ready_timeout(), Duration::from_secs(300));
        assert!(config.certsuite_binary.is_none());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: QeConfig = serde_json::from_value(serde_json::json!({
            "certsuite_binary": "/usr/local/bin/certsuite",
            "debug": true
        }))
        .unwrap();

        assert_eq!(config.certsuite_binary.as_deref(), Some("/usr/local/bin/certsuite"));
        assert!(config.debug);
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.certsuite_timeout(), Duration::from_secs(900));
    }
}
