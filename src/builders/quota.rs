//! ResourceQuota and PodDisruptionBudget builders

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ResourceQuota, ResourceQuotaSpec};
use k8s_openapi::api::policy::v1::{PodDisruptionBudget, PodDisruptionBudgetSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Namespace quota on cpu/memory requests and limits
pub fn define_resource_quota(
    name: &str,
    namespace: &str,
    cpu_request: &str,
    memory_request: &str,
    cpu_limit: &str,
    memory_limit: &str,
) -> ResourceQuota {
    let hard: BTreeMap<String, Quantity> = [
        ("requests.cpu", cpu_request),
        ("requests.memory", memory_request),
        ("limits.cpu", cpu_limit),
        ("limits.memory", memory_limit),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
    .collect();

    ResourceQuota {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ResourceQuotaSpec {
            hard: Some(hard),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Which side of a disruption budget is pinned
#[derive(Debug, Clone)]
pub enum DisruptionBound {
    MinAvailable(IntOrString),
    MaxUnavailable(IntOrString),
}

pub fn define_pod_disruption_budget(
    name: &str,
    namespace: &str,
    bound: DisruptionBound,
    labels: &BTreeMap<String, String>,
) -> PodDisruptionBudget {
    let (min_available, max_unavailable) = match bound {
        DisruptionBound::MinAvailable(v) => (Some(v), None),
        DisruptionBound::MaxUnavailable(v) => (None, Some(v)),
    };

    PodDisruptionBudget {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(PodDisruptionBudgetSpec {
            min_available,
            max_unavailable,
            selector: Some(LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::labels;

    #[test]
    fn test_define_resource_quota() {
        let quota = define_resource_quota("rq", "ac-tests", "1", "1Gi", "2", "2Gi");

        let hard = quota.spec.unwrap().hard.unwrap();
        assert_eq!(hard.len(), 4);
        assert_eq!(hard.get("limits.memory"), Some(&Quantity("2Gi".to_string())));
    }

    #[test]
    fn test_pdb_bounds_are_exclusive() {
        let pdb = define_pod_disruption_budget(
            "pdb",
            "ob-tests",
            DisruptionBound::MaxUnavailable(IntOrString::String("50%".to_string())),
            &labels([("app", "x")]),
        );

        let spec = pdb.spec.unwrap();
        assert!(spec.min_available.is_none());
        assert_eq!(
            spec.max_unavailable,
            Some(IntOrString::String("50%".to_string()))
        );
    }
}
