//! Lifecycle suite

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, Toleration};

use super::{target_labels, TEST_DEPLOYMENT_NAME, TEST_POD_NAME, TEST_STATEFULSET_NAME};
use crate::builders::{
    container, define_deployment, define_pod, define_statefulset, labels, PodWorkload, Replicated,
};

pub const NAMESPACE_PREFIX: &str = "lifecycle-tests";
pub const PRE_STOP_COMMAND: &[&str] = &["/bin/sh", "-c", "killall -0 tail"];
pub const POST_START_COMMAND: &[&str] = &["/bin/sh", "-c", "echo started"];
pub const PROBE_COMMAND: &[&str] = &["ls"];
pub const PROBE_INITIAL_DELAY: i32 = 5;
pub const PROBE_PERIOD: i32 = 5;

pub const TC_PRE_STOP: &str = "lifecycle-container-prestop";
pub const TC_POST_START: &str = "lifecycle-container-poststart";
pub const TC_LIVENESS_PROBE: &str = "lifecycle-liveness-probe";
pub const TC_READINESS_PROBE: &str = "lifecycle-readiness-probe";
pub const TC_STARTUP_PROBE: &str = "lifecycle-startup-probe";
pub const TC_IMAGE_PULL_POLICY: &str = "lifecycle-image-pull-policy";
pub const TC_POD_OWNER_TYPE: &str = "lifecycle-pod-owner-type";
pub const TC_HIGH_AVAILABILITY: &str = "lifecycle-pod-high-availability";
pub const TC_POD_SCHEDULING: &str = "lifecycle-pod-scheduling";
pub const TC_TOLERATION_BYPASS: &str = "lifecycle-pod-toleration-bypass";
pub const TC_DEPLOYMENT_SCALING: &str = "lifecycle-deployment-scaling";
pub const TC_STATEFULSET_SCALING: &str = "lifecycle-statefulset-scaling";
pub const TC_CRD_SCALING: &str = "lifecycle-crd-scaling";
pub const TC_AFFINITY_REQUIRED: &str = "lifecycle-affinity-required-pods";
pub const TC_POD_RECREATION: &str = "lifecycle-pod-recreation";
pub const TC_CPU_ISOLATION: &str = "lifecycle-cpu-isolation";

/// Label marking pods that must carry an affinity rule
pub const AFFINITY_REQUIRED_LABEL: (&str, &str) = ("AffinityRequired", "true");

/// Deployment with `replicas` spread across nodes by pod anti-affinity
pub fn define_ha_deployment(namespace: &str, image: &str, replicas: i32) -> Deployment {
    let labels = target_labels();
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &labels)
        .with_replicas(replicas)
        .with_pod_anti_affinity(&labels)
}

/// Deployment whose containers all declare liveness, readiness and startup probes
pub fn define_probed_deployment(namespace: &str, image: &str) -> Deployment {
    let probe = container::exec_probe(PROBE_COMMAND, PROBE_INITIAL_DELAY, PROBE_PERIOD);
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_liveness_probe(probe.clone())
        .with_readiness_probe(probe.clone())
        .with_startup_probe(probe)
}

/// Deployment whose containers declare preStop and postStart hooks
pub fn define_hooked_deployment(namespace: &str, image: &str) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_pre_stop(PRE_STOP_COMMAND)
        .with_post_start(POST_START_COMMAND)
}

pub fn define_lifecycle_statefulset(namespace: &str, image: &str, replicas: i32) -> StatefulSet {
    define_statefulset(TEST_STATEFULSET_NAME, namespace, image, &target_labels())
        .with_replicas(replicas)
}

/// Pod without an owner reference
pub fn define_orphan_pod(namespace: &str, image: &str) -> Pod {
    define_pod(TEST_POD_NAME, namespace, image, &target_labels())
}

/// Deployment pinned to nodes by a node selector
pub fn define_node_selector_deployment(namespace: &str, image: &str, hostname: &str) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_node_selector(&labels([("kubernetes.io/hostname", hostname)]))
}

/// Deployment tolerating a taint certsuite does not allow to be bypassed
pub fn define_toleration_bypass_deployment(namespace: &str, image: &str) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels()).with_tolerations(
        vec![Toleration {
            key: Some("node.kubernetes.io/not-ready".to_string()),
            operator: Some("Exists".to_string()),
            effect: Some("NoExecute".to_string()),
            toleration_seconds: Some(300),
            ..Default::default()
        }],
    )
}

/// Deployment labelled AffinityRequired, with or without an affinity rule
pub fn define_affinity_required_deployment(
    namespace: &str,
    image: &str,
    with_affinity: bool,
) -> Deployment {
    let mut labels = target_labels();
    labels.insert(
        AFFINITY_REQUIRED_LABEL.0.to_string(),
        AFFINITY_REQUIRED_LABEL.1.to_string(),
    );

    let deployment = define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &labels);
    if with_affinity {
        deployment.with_pod_anti_affinity(&labels)
    } else {
        deployment
    }
}
