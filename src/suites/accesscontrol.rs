//! Access-control suite

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};

use super::{target_labels, TEST_DEPLOYMENT_NAME, TEST_POD_NAME};
use crate::builders::{
    define_cluster_role, define_cluster_role_binding, define_deployment, define_pod, define_role,
    define_role_binding, policy_rule, PodWorkload,
};

pub const NAMESPACE_PREFIX: &str = "ac-tests";
pub const SERVICE_ACCOUNT_NAME: &str = "ac-sa";
pub const ROLE_NAME: &str = "ac-role";
pub const ROLE_BINDING_NAME: &str = "ac-rb";
pub const CLUSTER_ROLE_NAME: &str = "ac-cluster-role";
pub const CLUSTER_ROLE_BINDING_NAME: &str = "ac-crb";
pub const HOST_PATH: &str = "/tmp";
pub const HOST_PORT: i32 = 8080;
pub const INVALID_NAMESPACE_PREFIX: &str = "openshift-ac";

pub const TC_HOST_NETWORK: &str = "access-control-host-network";
pub const TC_HOST_PID: &str = "access-control-host-pid";
pub const TC_HOST_IPC: &str = "access-control-host-ipc";
pub const TC_HOST_PORT: &str = "access-control-container-host-port";
pub const TC_HOST_PATH: &str = "access-control-pod-host-path";
pub const TC_AUTOMOUNT_TOKEN: &str = "access-control-pod-automount-service-account-token";
pub const TC_SERVICE_ACCOUNT: &str = "access-control-pod-service-account";
pub const TC_ROLE_BINDINGS: &str = "access-control-pod-role-bindings";
pub const TC_CLUSTER_ROLE_BINDINGS: &str = "access-control-cluster-role-bindings";
pub const TC_NON_ROOT_USER: &str = "access-control-security-context-non-root-user-id-check";
pub const TC_PRIVILEGE_ESCALATION: &str = "access-control-security-context-privilege-escalation";
pub const TC_READ_ONLY_FS: &str = "access-control-security-context-read-only-file-system";
pub const TC_BPF_CAPABILITY: &str = "access-control-bpf-capability-check";
pub const TC_NET_ADMIN_CAPABILITY: &str = "access-control-net-admin-capability-check";
pub const TC_NET_RAW_CAPABILITY: &str = "access-control-net-raw-capability-check";
pub const TC_IPC_LOCK_CAPABILITY: &str = "access-control-ipc-lock-capability-check";
pub const TC_SYS_ADMIN_CAPABILITY: &str = "access-control-sys-admin-capability-check";
pub const TC_NAMESPACE: &str = "access-control-namespace";
pub const TC_NAMESPACE_RESOURCE_QUOTA: &str = "access-control-namespace-resource-quota";
pub const TC_REQUESTS: &str = "access-control-requests";
pub const TC_ONE_PROCESS_PER_CONTAINER: &str = "access-control-one-process-per-container";
pub const TC_SSH_DAEMONS: &str = "access-control-ssh-daemons";
pub const TC_SERVICE_TYPE: &str = "access-control-service-type";
pub const TC_CRD_ROLES: &str = "access-control-crd-roles";

/// Capability checked by each capability test case
pub fn capability_for(test_case: &str) -> Option<&'static str> {
    match test_case {
        TC_BPF_CAPABILITY => Some("BPF"),
        TC_NET_ADMIN_CAPABILITY => Some("NET_ADMIN"),
        TC_NET_RAW_CAPABILITY => Some("NET_RAW"),
        TC_IPC_LOCK_CAPABILITY => Some("IPC_LOCK"),
        TC_SYS_ADMIN_CAPABILITY => Some("SYS_ADMIN"),
        _ => None,
    }
}

/// Baseline access-control deployment, compliant with every host-namespace check
pub fn define_ac_deployment(namespace: &str, image: &str) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_host_network(false)
        .with_host_pid(false)
        .with_host_ipc(false)
        .with_automount_service_account_token(false)
        .with_privilege_escalation(false)
        .with_run_as_non_root(true)
        .with_run_as_user(1000)
}

/// Deployment holding `capability` in every container
pub fn define_ac_deployment_with_capability(
    namespace: &str,
    image: &str,
    capability: &str,
) -> Deployment {
    define_ac_deployment(namespace, image).with_added_capabilities(&[capability])
}

/// Bare pod with requests and limits on every container
pub fn define_ac_pod_with_requests(namespace: &str, image: &str) -> Pod {
    define_pod(TEST_POD_NAME, namespace, image, &target_labels()).with_resources(
        Some("100m"),
        Some("128Mi"),
        Some("100m"),
        Some("128Mi"),
    )
}

/// Role plus a binding of it to `service_account` from `sa_namespace`
pub fn define_role_fixture(
    namespace: &str,
    service_account: &str,
    sa_namespace: &str,
) -> (Role, RoleBinding) {
    let role = define_role(
        ROLE_NAME,
        namespace,
        vec![policy_rule(&[""], &["pods"], &["get", "list", "watch"])],
    );
    let binding = define_role_binding(
        ROLE_BINDING_NAME,
        namespace,
        ROLE_NAME,
        service_account,
        sa_namespace,
    );
    (role, binding)
}

/// Cluster-wide read role bound to `service_account`
pub fn define_cluster_role_fixture(
    service_account: &str,
    sa_namespace: &str,
) -> (ClusterRole, ClusterRoleBinding) {
    let role = define_cluster_role(
        CLUSTER_ROLE_NAME,
        vec![policy_rule(&[""], &["nodes"], &["get", "list"])],
    );
    let binding = define_cluster_role_binding(
        CLUSTER_ROLE_BINDING_NAME,
        CLUSTER_ROLE_NAME,
        service_account,
        sa_namespace,
    );
    (role, binding)
}
