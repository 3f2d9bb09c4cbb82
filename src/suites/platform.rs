//! Platform-alteration suite

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, Taint};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::{target_labels, TEST_DEPLOYMENT_NAME};
use crate::builders::{define_deployment, PodWorkload};

pub const NAMESPACE_PREFIX: &str = "platform-alteration-tests";
pub const HUGEPAGES_2MI: &str = "hugepages-2Mi";
pub const HUGEPAGES_1GI: &str = "hugepages-1Gi";

pub const TC_BASE_IMAGE: &str = "platform-alteration-base-image";
pub const TC_BOOT_PARAMS: &str = "platform-alteration-boot-params";
pub const TC_HUGEPAGES_CONFIG: &str = "platform-alteration-hugepages-config";
pub const TC_HUGEPAGES_2M_ONLY: &str = "platform-alteration-hugepages-2m-only";
pub const TC_HUGEPAGES_1G_ONLY: &str = "platform-alteration-hugepages-1g-only";
pub const TC_SELINUX_ENFORCING: &str = "platform-alteration-is-selinux-enforcing";
pub const TC_TAINTED_NODE_KERNEL: &str = "platform-alteration-tainted-node-kernel";
pub const TC_SYSCTL_CONFIG: &str = "platform-alteration-sysctl-config";
pub const TC_SERVICE_MESH_USAGE: &str = "platform-alteration-service-mesh-usage";
pub const TC_OCP_LIFECYCLE: &str = "platform-alteration-ocp-lifecycle";
pub const TC_NODE_OS_LIFECYCLE: &str = "platform-alteration-ocp-node-os-lifecycle";
pub const TC_HYPERTHREAD_ENABLE: &str = "platform-alteration-hyperthread-enable";
pub const TC_RED_HAT_RELEASE: &str = "platform-alteration-isredhat-release";

/// Deployment requesting `quantity` of a hugepages resource (e.g. "hugepages-2Mi", "4Mi")
pub fn define_hugepages_deployment(
    namespace: &str,
    image: &str,
    resource: &str,
    quantity: &str,
) -> Deployment {
    let resource = resource.to_string();
    let quantity = Quantity(quantity.to_string());
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_resources(Some("100m"), Some("128Mi"), Some("100m"), Some("128Mi"))
        .map_containers(|c| {
            let resources = c.resources.get_or_insert_with(Default::default);
            for map in [&mut resources.requests, &mut resources.limits] {
                map.get_or_insert_with(Default::default)
                    .insert(resource.clone(), quantity.clone());
            }
        })
}

/// Nodes advertising a non-zero amount of a hugepages resource
pub fn nodes_with_hugepages<'a>(nodes: &'a [Node], resource: &str) -> Vec<&'a Node> {
    nodes
        .iter()
        .filter(|node| {
            node.status
                .as_ref()
                .and_then(|s| s.allocatable.as_ref())
                .and_then(|a| a.get(resource))
                .is_some_and(|q| q.0 != "0")
        })
        .collect()
}

/// Taints on a node that mark it unschedulable for test pods
pub fn no_schedule_taints(node: &Node) -> Vec<&Taint> {
    node.spec
        .as_ref()
        .and_then(|s| s.taints.as_ref())
        .map(|taints| taints.iter().filter(|t| t.effect == "NoSchedule").collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeSpec, NodeStatus};
    use std::collections::BTreeMap;

    fn node(hugepages: &str, taints: Vec<Taint>) -> Node {
        Node {
            spec: Some(NodeSpec {
                taints: Some(taints),
                ..Default::default()
            }),
            status: Some(NodeStatus {
                allocatable: Some(BTreeMap::from([(
                    HUGEPAGES_2MI.to_string(),
                    Quantity(hugepages.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_hugepages_deployment_requests_and_limits() {
        let d = define_hugepages_deployment("ns", "img", HUGEPAGES_2MI, "4Mi");
        let resources = d.spec.unwrap().template.spec.unwrap().containers[0]
            .resources
            .clone()
            .unwrap();
        let expected = Quantity("4Mi".to_string());
        assert_eq!(resources.requests.unwrap().get(HUGEPAGES_2MI), Some(&expected));
        assert_eq!(resources.limits.unwrap().get(HUGEPAGES_2MI), Some(&expected));
    }

    #[test]
    fn test_nodes_with_hugepages() {
        let nodes = vec![node("0", vec![]), node("1Gi", vec![])];
        assert_eq!(nodes_with_hugepages(&nodes, HUGEPAGES_2MI).len(), 1);
        assert!(nodes_with_hugepages(&nodes, HUGEPAGES_1GI).is_empty());
    }

    #[test]
    fn test_no_schedule_taints() {
        let taint = |effect: &str| Taint {
            key: "k".to_string(),
            effect: effect.to_string(),
            ..Default::default()
        };
        let n = node("0", vec![taint("NoSchedule"), taint("PreferNoSchedule")]);
        assert_eq!(no_schedule_taints(&n).len(), 1);
    }
}
