//! Tests for the object builders
//!
//! These tests exercise the public builder API the way scenarios chain it.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use certsuite_qe::builders::{
    container, define_daemonset, define_deployment, define_nad, define_pod,
    define_pod_disruption_budget, define_resource_quota, define_service, define_statefulset,
    labels, nad_config, CniConfig, DisruptionBound, PodWorkload, Replicated, ServiceExt,
    MULTUS_NETWORKS_ANNOTATION,
};
use certsuite_qe::k8s::{daemonset_is_ready, deployment_is_ready};

const IMAGE: &str = "quay.io/testnetworkfunction/cnf-test-partner:latest";

#[test]
fn test_define_deployment_defaults() {
    let l = labels([("app", "test")]);
    let deployment = define_deployment("acdeployment", "ac-tests", IMAGE, &l);

    assert_eq!(deployment.metadata.name.as_deref(), Some("acdeployment"));
    assert_eq!(deployment.metadata.namespace.as_deref(), Some("ac-tests"));

    let spec = deployment.spec.unwrap();
    assert_eq!(spec.replicas, Some(1));
    assert_eq!(spec.selector.match_labels.as_ref(), Some(&l));
    assert_eq!(spec.template.metadata.unwrap().labels.as_ref(), Some(&l));

    let containers = spec.template.spec.unwrap().containers;
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].image.as_deref(), Some(IMAGE));
}

#[test]
fn test_chained_access_control_mutators() {
    let deployment = define_deployment("d", "ns", IMAGE, &labels([("app", "test")]))
        .with_replicas(3)
        .with_host_network(true)
        .with_host_pid(true)
        .with_host_ipc(true)
        .with_host_port(8080)
        .with_host_path_volume("host", "/tmp", "/host")
        .with_privileged_containers(true)
        .with_added_capabilities(&["NET_ADMIN", "NET_ADMIN", "SYS_ADMIN"]);

    let spec = deployment.spec.unwrap();
    assert_eq!(spec.replicas, Some(3));

    let pod = spec.template.spec.unwrap();
    assert_eq!(pod.host_network, Some(true));
    assert_eq!(pod.host_pid, Some(true));
    assert_eq!(pod.host_ipc, Some(true));
    assert_eq!(pod.volumes.unwrap()[0].name, "host");

    let c = &pod.containers[0];
    assert_eq!(c.ports.as_ref().unwrap()[0].host_port, Some(8080));
    assert_eq!(c.volume_mounts.as_ref().unwrap()[0].mount_path, "/host");
    let sc = c.security_context.as_ref().unwrap();
    assert_eq!(sc.privileged, Some(true));
    assert_eq!(
        sc.capabilities.as_ref().unwrap().add.as_ref().unwrap(),
        &vec!["NET_ADMIN".to_string(), "SYS_ADMIN".to_string()]
    );
}

#[test]
fn test_mutators_apply_to_every_container() {
    let extra = container::define_container("sidecar", IMAGE, &["sleep", "infinity"]);
    let daemonset = define_daemonset("ds", "ns", IMAGE, &labels([("app", "ds")]))
        .with_extra_container(extra)
        .with_read_only_root_filesystem(true);

    let containers = daemonset.spec.unwrap().template.spec.unwrap().containers;
    assert_eq!(containers.len(), 2);
    for c in containers {
        assert_eq!(
            c.security_context.unwrap().read_only_root_filesystem,
            Some(true)
        );
    }
}

#[test]
fn test_pod_and_statefulset_share_mutators() {
    let pod = define_pod("p", "ns", IMAGE, &labels([("app", "p")]))
        .with_service_account("ac-sa")
        .with_multus_networks(&["nad-a"]);
    assert_eq!(
        pod.spec.as_ref().unwrap().service_account_name.as_deref(),
        Some("ac-sa")
    );
    assert_eq!(
        pod.metadata
            .annotations
            .unwrap()
            .get(MULTUS_NETWORKS_ANNOTATION)
            .map(String::as_str),
        Some("nad-a")
    );

    let sts = define_statefulset("ss", "ns", IMAGE, &labels([("app", "ss")])).with_replicas(2);
    let spec = sts.spec.unwrap();
    assert_eq!(spec.replicas, Some(2));
    assert_eq!(spec.service_name, "ss");
}

#[test]
fn test_fresh_workloads_are_not_ready() {
    let deployment = define_deployment("d", "ns", IMAGE, &labels([("app", "d")]));
    assert!(!deployment_is_ready(&deployment));

    let daemonset = define_daemonset("ds", "ns", IMAGE, &labels([("app", "ds")]));
    assert!(!daemonset_is_ready(&daemonset));
}

#[test]
fn test_service_quota_and_pdb() {
    let svc = define_service("svc", "ns", 80, 8080, "TCP", &labels([("app", "x")]))
        .with_ip_families(&["IPv6"], "SingleStack");
    let spec = svc.spec.unwrap();
    assert_eq!(spec.ip_families, Some(vec!["IPv6".to_string()]));

    let quota = define_resource_quota("rq", "ns", "1", "1Gi", "2", "2Gi");
    assert_eq!(quota.metadata.namespace.as_deref(), Some("ns"));

    let pdb = define_pod_disruption_budget(
        "pdb",
        "ns",
        DisruptionBound::MinAvailable(IntOrString::Int(1)),
        &labels([("app", "x")]),
    );
    assert_eq!(
        pdb.spec.unwrap().min_available,
        Some(IntOrString::Int(1))
    );
}

#[test]
fn test_nad_config_survives_the_object() {
    let config = CniConfig::macvlan("mv", "ens1f0")
        .with_static_ipam()
        .with_mtu(1500);
    let nad = define_nad("mv", "networking-tests", &config).unwrap();

    assert_eq!(nad_config(&nad).unwrap(), Some(config));
}
