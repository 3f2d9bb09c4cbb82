//! Bare pod builder

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::container::{define_container, DEFAULT_CONTAINER_NAME};

/// Pod without an owner, restarted in place by the kubelet
pub fn define_pod(
    name: &str,
    namespace: &str,
    image: &str,
    labels: &BTreeMap<String, String>,
) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![define_container(DEFAULT_CONTAINER_NAME, image, &[])],
            restart_policy: Some("Always".to_string()),
            termination_grace_period_seconds: Some(0),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{labels, PodWorkload};

    #[test]
    fn test_define_pod() {
        let pod = define_pod("lcpod", "lc-tests", "busybox", &labels([("app", "pod")]));

        assert_eq!(pod.metadata.name.as_deref(), Some("lcpod"));
        assert!(pod.metadata.owner_references.is_none());
        assert_eq!(pod.spec.unwrap().restart_policy.as_deref(), Some("Always"));
    }

    #[test]
    fn test_pod_labels_live_on_pod_metadata() {
        let pod = define_pod("p", "ns", "busybox", &labels([("app", "pod")]))
            .with_labels(&labels([("extra", "x")]));

        let pod_labels = pod.metadata.labels.unwrap();
        assert_eq!(pod_labels.len(), 2);
    }
}
