//! StatefulSet builder

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::container::{define_container, DEFAULT_CONTAINER_NAME};

/// One-replica statefulset governed by a service of the same name
pub fn define_statefulset(
    name: &str,
    namespace: &str,
    image: &str,
    labels: &BTreeMap<String, String>,
) -> StatefulSet {
    StatefulSet {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            service_name: name.to_string(),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![define_container(DEFAULT_CONTAINER_NAME, image, &[])],
                    termination_grace_period_seconds: Some(0),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{labels, Replicated};

    #[test]
    fn test_define_statefulset() {
        let sts = define_statefulset("lcsts", "lc-tests", "busybox", &labels([("app", "sts")]))
            .with_replicas(2);

        let spec = sts.spec.unwrap();
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.service_name, "lcsts");
        assert_eq!(spec.selector.match_labels, Some(labels([("app", "sts")])));
    }
}
