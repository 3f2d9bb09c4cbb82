//! Affiliated-certification suite

use crate::certsuite::CertsuiteConfig;

pub const NAMESPACE_PREFIX: &str = "affiliated-certification-tests";

pub const TC_HELMCHART_IS_CERTIFIED: &str = "affiliated-certification-helmchart-is-certified";
pub const TC_OPERATOR_IS_CERTIFIED: &str = "affiliated-certification-operator-is-certified";
pub const TC_CONTAINER_IS_CERTIFIED_DIGEST: &str =
    "affiliated-certification-container-is-certified-digest";
pub const TC_HELM_VERSION: &str = "affiliated-certification-helm-version";

/// Operators the certified-operator scenarios install
pub const CERTIFIED_OPERATOR_PACKAGE: &str = "cockroachdb-certified";
pub const CERTIFIED_OPERATOR_SOURCE: &str = "certified-operators";
pub const UNCERTIFIED_OPERATOR_PACKAGE: &str = "cockroachdb";
pub const UNCERTIFIED_OPERATOR_SOURCE: &str = "community-operators";

/// Container images certsuite checks against the certified image catalog
pub const CERTIFIED_IMAGE: &str = "registry.access.redhat.com/ubi8/ubi-minimal:latest";
pub const UNCERTIFIED_IMAGE: &str = "quay.io/testnetworkfunction/cnf-test-partner:latest";

/// Helm charts every helm scenario leaves out of the scan
pub const SKIPPED_HELM_CHARTS: &[&str] = &["certsuite-probe"];

/// Base config for helm scenarios with the default skip list applied
pub fn helm_config<S: AsRef<str>>(namespaces: &[S]) -> CertsuiteConfig {
    SKIPPED_HELM_CHARTS
        .iter()
        .fold(super::base_certsuite_config(namespaces), |config, chart| {
            config.with_skipped_helm_chart(chart)
        })
}
