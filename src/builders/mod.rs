//! Builders for every Kubernetes object a scenario deploys
//!
//! All functions here are pure: they construct objects and never talk to
//! the cluster. Workloads start from a `define_*` constructor and are
//! refined with the `PodWorkload` / `Replicated` / `ServiceExt` mutators.

use std::collections::BTreeMap;

pub mod container;
mod crd;
mod daemonset;
mod deployment;
mod nad;
pub mod olm;
mod pod;
mod quota;
mod rbac;
mod service;
mod statefulset;
mod workload;

pub use crd::{crd_api_resource, define_crd, define_custom_resource, CRD_VERSION};
pub use daemonset::define_daemonset;
pub use deployment::define_deployment;
pub use nad::{
    define_nad, define_sriov_nad, nad_api_resource, nad_config, CniConfig,
    SRIOV_RESOURCE_ANNOTATION,
};
pub use olm::{define_operator_group, define_subscription, SubscriptionParams};
pub use pod::define_pod;
pub use quota::{define_pod_disruption_budget, define_resource_quota, DisruptionBound};
pub use rbac::{
    define_cluster_role, define_cluster_role_binding, define_role, define_role_binding,
    define_service_account, define_service_account_with_automount, policy_rule,
};
pub use service::{define_headless_service, define_service, ServiceExt};
pub use statefulset::define_statefulset;
pub use workload::{PodWorkload, Replicated, MULTUS_NETWORKS_ANNOTATION};

/// Label map from literal pairs
pub fn labels<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Parse a `key=value` label argument
pub fn parse_label(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}
