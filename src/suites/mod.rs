//! Per-suite parameters and fixtures
//!
//! Each certsuite test suite gets a module holding its test-case ids,
//! namespace prefix, resource names and the workload fixtures its
//! scenarios deploy.

use std::collections::BTreeMap;

use crate::builders::labels;
use crate::certsuite::CertsuiteConfig;

pub mod accesscontrol;
pub mod affiliated;
pub mod lifecycle;
pub mod manageability;
pub mod networking;
pub mod observability;
pub mod operator;
pub mod parallel;
pub mod performance;
pub mod platform;

/// Label certsuite uses to pick pods under test
pub const TARGET_POD_LABEL_KEY: &str = "redhat-best-practices-for-k8s.com/generic";
pub const TARGET_POD_LABEL_VALUE: &str = "target";

/// Label certsuite uses to pick operators under test
pub const TARGET_OPERATOR_LABEL_KEY: &str = "redhat-best-practices-for-k8s.com/operator";
pub const TARGET_OPERATOR_LABEL_VALUE: &str = "target";

pub const TEST_DEPLOYMENT_NAME: &str = "test-deployment";
pub const TEST_DAEMONSET_NAME: &str = "test-daemonset";
pub const TEST_STATEFULSET_NAME: &str = "test-statefulset";
pub const TEST_POD_NAME: &str = "test-pod";
pub const TEST_SERVICE_NAME: &str = "test-service";

/// Pod labels matching the default certsuite selector
pub fn target_labels() -> BTreeMap<String, String> {
    labels([("app", "test"), (TARGET_POD_LABEL_KEY, TARGET_POD_LABEL_VALUE)])
}

/// Config scanning `namespaces` for pods carrying the target label
pub fn base_certsuite_config<S: AsRef<str>>(namespaces: &[S]) -> CertsuiteConfig {
    CertsuiteConfig::new(namespaces).with_pod_label(TARGET_POD_LABEL_KEY, TARGET_POD_LABEL_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_labels_match_config() {
        let config = base_certsuite_config(&["ns"]);
        let labels = target_labels();

        let (key, value) = config.pods_under_test_labels[0]
            .split_once(": ")
            .unwrap();
        assert_eq!(labels.get(key).map(String::as_str), Some(value));
    }
}
