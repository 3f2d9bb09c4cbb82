//! Networking suite
//!
//! Besides the fixtures, this module finds the SR-IOV interfaces usable
//! on every worker: certsuite's SR-IOV checks need a NAD whose resource
//! exists on all nodes the pods might land on.

use std::collections::BTreeSet;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use tracing::{debug, instrument};

use super::{target_labels, TEST_DEPLOYMENT_NAME, TEST_SERVICE_NAME};
use crate::builders::{
    container, define_deployment, define_service, PodWorkload, Replicated, ServiceExt,
};
use crate::error::Result;
use crate::k8s::K8sClient;

pub const NAMESPACE_PREFIX: &str = "networking-tests";
pub const SRIOV_OPERATOR_NAMESPACE: &str = "openshift-sriov-network-operator";
pub const SERVICE_PORT: i32 = 3022;
pub const UNDECLARED_PORT: i32 = 8080;
pub const OCP_RESERVED_PORT: i32 = 22623;
pub const PARTNER_RESERVED_PORT: i32 = 15443;

pub const TC_ICMPV4: &str = "networking-icmpv4-connectivity";
pub const TC_ICMPV6: &str = "networking-icmpv6-connectivity";
pub const TC_ICMPV4_MULTUS: &str = "networking-icmpv4-connectivity-multus";
pub const TC_ICMPV6_MULTUS: &str = "networking-icmpv6-connectivity-multus";
pub const TC_UNDECLARED_PORTS: &str = "networking-undeclared-container-ports-usage";
pub const TC_OCP_RESERVED_PORTS: &str = "networking-ocp-reserved-ports-usage";
pub const TC_PARTNER_RESERVED_PORTS: &str = "networking-reserved-partner-ports";
pub const TC_DUAL_STACK_SERVICE: &str = "networking-dual-stack-service";
pub const TC_NETWORK_POLICY_DENY_ALL: &str = "networking-network-policy-deny-all";
pub const TC_SRIOV_MTU: &str = "networking-network-attachment-definition-sriov-mtu";
pub const TC_RESTART_ON_REBOOT_SRIOV: &str = "networking-restart-on-reboot-sriov-pod";

pub fn sriov_node_state_resource() -> ApiResource {
    ApiResource {
        group: "sriovnetwork.openshift.io".to_string(),
        version: "v1".to_string(),
        api_version: "sriovnetwork.openshift.io/v1".to_string(),
        kind: "SriovNetworkNodeState".to_string(),
        plural: "sriovnetworknodestates".to_string(),
    }
}

/// Strings present in every list, in first-list order and without duplicates
pub fn find_list_intersections<S: AsRef<str>>(lists: &[Vec<S>]) -> Vec<String> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };

    let others: Vec<BTreeSet<&str>> = rest
        .iter()
        .map(|list| list.iter().map(AsRef::as_ref).collect())
        .collect();

    let mut seen = BTreeSet::new();
    first
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| others.iter().all(|set| set.contains(item)))
        .filter(|item| seen.insert(*item))
        .map(str::to_string)
        .collect()
}

/// Interface names listed in a SriovNetworkNodeState status
pub fn sriov_interfaces_of(state: &DynamicObject) -> Vec<String> {
    state
        .data
        .pointer("/status/interfaces")
        .and_then(|v| v.as_array())
        .map(|interfaces| {
            interfaces
                .iter()
                .filter_map(|i| i.get("name").and_then(|n| n.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// SR-IOV interfaces present on every node reporting SR-IOV state
#[instrument(skip(client))]
pub async fn common_sriov_interfaces(client: &K8sClient) -> Result<Vec<String>> {
    let states = client
        .list_dynamic(Some(SRIOV_OPERATOR_NAMESPACE), &sriov_node_state_resource())
        .await?;

    let per_node: Vec<Vec<String>> = states.iter().map(sriov_interfaces_of).collect();
    let common = find_list_intersections(&per_node);
    debug!(nodes = per_node.len(), common = ?common, "SR-IOV interfaces");
    Ok(common)
}

/// Deployment whose pods attach to the given NADs through Multus
pub fn define_multus_deployment(
    namespace: &str,
    image: &str,
    replicas: i32,
    nads: &[&str],
) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_replicas(replicas)
        .with_multus_networks(nads)
}

/// Deployment declaring the port its service targets
pub fn define_nw_deployment(namespace: &str, image: &str, replicas: i32) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_replicas(replicas)
        .with_container_ports(&[container::container_port(
            Some("tcp-3022"),
            SERVICE_PORT,
            "TCP",
        )])
}

/// Deployment listening on `port` from a command the port list does not declare
pub fn define_listening_deployment(namespace: &str, image: &str, port: i32) -> Deployment {
    let command = format!("while true; do nc -l -p {} >/dev/null; done", port);
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels()).map_containers(
        |c| c.command = Some(vec!["/bin/sh".to_string(), "-c".to_string(), command.clone()]),
    )
}

/// Service in front of the networking deployment with the given IP family setup
pub fn define_nw_service(namespace: &str, families: &[&str], policy: &str) -> Service {
    define_service(
        TEST_SERVICE_NAME,
        namespace,
        SERVICE_PORT,
        SERVICE_PORT,
        "TCP",
        &target_labels(),
    )
    .with_ip_families(families, policy)
}
