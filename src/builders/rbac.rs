//! ServiceAccount, Role and binding builders

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

pub fn define_service_account(name: &str, namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Service account with the token automount flag set explicitly
pub fn define_service_account_with_automount(
    name: &str,
    namespace: &str,
    automount: bool,
) -> ServiceAccount {
    ServiceAccount {
        automount_service_account_token: Some(automount),
        ..define_service_account(name, namespace)
    }
}

pub fn policy_rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(api_groups.iter().map(|g| g.to_string()).collect()),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        ..Default::default()
    }
}

pub fn define_role(name: &str, namespace: &str, rules: Vec<PolicyRule>) -> Role {
    Role {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        rules: Some(rules),
    }
}

pub fn define_cluster_role(name: &str, rules: Vec<PolicyRule>) -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        rules: Some(rules),
        ..Default::default()
    }
}

fn service_account_subject(service_account: &str, namespace: &str) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: service_account.to_string(),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

/// Bind a Role in `namespace` to a service account living in `sa_namespace`
pub fn define_role_binding(
    name: &str,
    namespace: &str,
    role: &str,
    service_account: &str,
    sa_namespace: &str,
) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "Role".to_string(),
            name: role.to_string(),
        },
        subjects: Some(vec![service_account_subject(service_account, sa_namespace)]),
    }
}

pub fn define_cluster_role_binding(
    name: &str,
    cluster_role: &str,
    service_account: &str,
    sa_namespace: &str,
) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: cluster_role.to_string(),
        },
        subjects: Some(vec![service_account_subject(service_account, sa_namespace)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_binding_crosses_namespaces() {
        let rb = define_role_binding("rb", "other-ns", "pod-reader", "my-sa", "test-ns");

        assert_eq!(rb.metadata.namespace.as_deref(), Some("other-ns"));
        assert_eq!(rb.role_ref.kind, "Role");
        let subject = &rb.subjects.unwrap()[0];
        assert_eq!(subject.name, "my-sa");
        assert_eq!(subject.namespace.as_deref(), Some("test-ns"));
    }

    #[test]
    fn test_cluster_role_binding() {
        let crb = define_cluster_role_binding("crb", "cluster-admin", "my-sa", "test-ns");
        assert_eq!(crb.role_ref.kind, "ClusterRole");
        assert_eq!(crb.role_ref.api_group, RBAC_API_GROUP);
    }

    #[test]
    fn test_policy_rule() {
        let rule = policy_rule(&["apps"], &["deployments"], &["get", "list"]);
        assert_eq!(rule.verbs, vec!["get", "list"]);
        assert_eq!(rule.api_groups, Some(vec!["apps".to_string()]));
    }

    #[test]
    fn test_service_account_automount() {
        let sa = define_service_account_with_automount("sa", "ns", false);
        assert_eq!(sa.automount_service_account_token, Some(false));
        assert_eq!(sa.metadata.name.as_deref(), Some("sa"));
    }
}
