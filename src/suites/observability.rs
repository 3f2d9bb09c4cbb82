//! Observability suite

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::{target_labels, TEST_DAEMONSET_NAME, TEST_DEPLOYMENT_NAME};
use crate::builders::{
    define_crd, define_daemonset, define_deployment, define_pod_disruption_budget,
    DisruptionBound, PodWorkload, Replicated,
};

pub const NAMESPACE_PREFIX: &str = "observability-tests";
pub const PDB_NAME: &str = "test-pdb";
pub const CRD_GROUP: &str = "observability.certsuite.io";
pub const CRD_SUFFIX: &str = "certsuite.io";

pub const TC_CONTAINER_LOGGING: &str = "observability-container-logging";
pub const TC_CRD_STATUS: &str = "observability-crd-status";
pub const TC_TERMINATION_POLICY: &str = "observability-termination-policy";
pub const TC_POD_DISRUPTION_BUDGET: &str = "observability-pod-disruption-budget";
pub const TC_NEXT_OCP_RELEASE: &str = "observability-compatibility-with-next-ocp-release";

/// Shell loop writing one line to stdout, or nothing when `log` is false
fn logging_command(log: bool) -> Vec<String> {
    let script = if log {
        "while true; do echo certsuite-qe log line; sleep 10; done"
    } else {
        "while true; do sleep 10; done"
    };
    vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Deployment whose container does or does not log to stdout
pub fn define_logging_deployment(namespace: &str, image: &str, log: bool) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .map_containers(|c| c.command = Some(logging_command(log)))
}

pub fn define_logging_daemonset(namespace: &str, image: &str, log: bool) -> DaemonSet {
    define_daemonset(TEST_DAEMONSET_NAME, namespace, image, &target_labels())
        .map_containers(|c| c.command = Some(logging_command(log)))
}

/// Deployment with the given termination message policy on every container
pub fn define_termination_policy_deployment(
    namespace: &str,
    image: &str,
    policy: &str,
) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_termination_message_policy(policy)
}

/// Deployment of `replicas` plus a PDB over its pods
pub fn define_pdb_fixture(
    namespace: &str,
    image: &str,
    replicas: i32,
    bound: DisruptionBound,
) -> (Deployment, PodDisruptionBudget) {
    let labels = target_labels();
    let deployment =
        define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &labels).with_replicas(replicas);
    let pdb = define_pod_disruption_budget(PDB_NAME, namespace, bound, &labels);
    (deployment, pdb)
}

/// `minAvailable` equal to the replica count, which blocks every voluntary eviction
pub fn blocking_bound(replicas: i32) -> DisruptionBound {
    DisruptionBound::MinAvailable(IntOrString::Int(replicas))
}

/// CRD under the observability group, with or without a status subresource
pub fn define_status_crd(kind: &str, plural: &str, with_status: bool) -> CustomResourceDefinition {
    let mut crd = define_crd(CRD_GROUP, kind, plural, false);
    if !with_status {
        for version in crd.spec.versions.iter_mut() {
            version.subresources = None;
        }
    }
    crd
}
