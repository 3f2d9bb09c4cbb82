//! Service builder

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// ClusterIP service selecting pods by `labels`
pub fn define_service(
    name: &str,
    namespace: &str,
    port: i32,
    target_port: i32,
    protocol: &str,
    labels: &BTreeMap<String, String>,
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels.clone()),
            ports: Some(vec![ServicePort {
                name: Some(format!("{}-{}", protocol.to_lowercase(), port)),
                port,
                target_port: Some(IntOrString::Int(target_port)),
                protocol: Some(protocol.to_string()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Headless service (`clusterIP: None`) for statefulset pods
pub fn define_headless_service(
    name: &str,
    namespace: &str,
    port: i32,
    labels: &BTreeMap<String, String>,
) -> Service {
    define_service(name, namespace, port, port, "TCP", labels).headless()
}

/// Builders over an existing service spec
pub trait ServiceExt: Sized {
    fn with_ip_families(self, families: &[&str], policy: &str) -> Self;
    fn with_type(self, type_: &str) -> Self;
    fn with_node_port(self, node_port: i32) -> Self;
    fn headless(self) -> Self;
}

impl ServiceExt for Service {
    /// e.g. `["IPv4", "IPv6"]` with `"PreferDualStack"`
    fn with_ip_families(mut self, families: &[&str], policy: &str) -> Self {
        let spec = self.spec.get_or_insert_with(Default::default);
        spec.ip_families = Some(families.iter().map(|f| f.to_string()).collect());
        spec.ip_family_policy = Some(policy.to_string());
        self
    }

    fn with_type(mut self, type_: &str) -> Self {
        self.spec.get_or_insert_with(Default::default).type_ = Some(type_.to_string());
        self
    }

    /// Switch to NodePort and pin the first port
    fn with_node_port(mut self, node_port: i32) -> Self {
        let spec = self.spec.get_or_insert_with(Default::default);
        spec.type_ = Some("NodePort".to_string());
        if let Some(port) = spec.ports.as_mut().and_then(|p| p.first_mut()) {
            port.node_port = Some(node_port);
        }
        self
    }

    fn headless(mut self) -> Self {
        self.spec.get_or_insert_with(Default::default).cluster_ip = Some("None".to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::labels;

    #[test]
    fn test_define_service() {
        let svc = define_service("testservice", "nw-tests", 3022, 3022, "TCP", &labels([("app", "x")]));

        assert_eq!(svc.metadata.name.as_deref(), Some("testservice"));
        let spec = svc.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        let port = &spec.ports.unwrap()[0];
        assert_eq!(port.port, 3022);
        assert_eq!(port.target_port, Some(IntOrString::Int(3022)));
        assert_eq!(port.name.as_deref(), Some("tcp-3022"));
    }

    #[test]
    fn test_dual_stack_node_port() {
        let svc = define_service("s", "ns", 80, 8080, "TCP", &labels([("app", "x")]))
            .with_ip_families(&["IPv4", "IPv6"], "PreferDualStack")
            .with_node_port(30022);

        let spec = svc.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("NodePort"));
        assert_eq!(spec.ip_family_policy.as_deref(), Some("PreferDualStack"));
        assert_eq!(spec.ip_families.unwrap().len(), 2);
        assert_eq!(spec.ports.unwrap()[0].node_port, Some(30022));
    }

    #[test]
    fn test_headless() {
        let svc = define_headless_service("s", "ns", 80, &labels([("app", "x")]));
        let spec = svc.spec.unwrap();
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(spec.ports.unwrap()[0].port, 80);
    }
}
