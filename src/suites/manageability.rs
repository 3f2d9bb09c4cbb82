//! Manageability suite

use k8s_openapi::api::apps::v1::Deployment;

use super::{target_labels, TEST_DEPLOYMENT_NAME};
use crate::builders::{container, define_deployment, PodWorkload};

pub const NAMESPACE_PREFIX: &str = "manageability-tests";

pub const TC_CONTAINERS_IMAGE_TAG: &str = "manageability-containers-image-tag";
pub const TC_CONTAINER_PORT_NAME_FORMAT: &str = "manageability-container-port-name-format";

/// Port name prefixes certsuite accepts, `<protocol>[-<suffix>]`
pub const VALID_PORT_NAME_PREFIXES: &[&str] = &[
    "grpc", "grpc-web", "http", "http2", "https", "mongo", "mysql", "redis", "tcp", "tls", "udp",
];

/// Image reference without its tag or digest
pub fn untagged_image(image: &str) -> &str {
    let image = image.split('@').next().unwrap_or(image);
    match image.rfind(':') {
        // a colon before the last slash belongs to a registry port
        Some(pos) if !image[pos..].contains('/') => &image[..pos],
        _ => image,
    }
}

/// True when `name` follows the `<protocol>[-<suffix>]` convention
pub fn is_valid_port_name(name: &str) -> bool {
    let protocol = name.split('-').next().unwrap_or(name);
    VALID_PORT_NAME_PREFIXES.contains(&protocol)
}

/// Deployment running `image` with its tag stripped
pub fn define_untagged_deployment(namespace: &str, image: &str) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_image(untagged_image(image))
}

/// Deployment declaring one container port named `port_name`
pub fn define_named_port_deployment(namespace: &str, image: &str, port_name: &str) -> Deployment {
    define_deployment(TEST_DEPLOYMENT_NAME, namespace, image, &target_labels())
        .with_container_ports(&[container::container_port(Some(port_name), 8080, "TCP")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_image() {
        assert_eq!(untagged_image("quay.io/org/app:v1"), "quay.io/org/app");
        assert_eq!(untagged_image("registry:5000/org/app"), "registry:5000/org/app");
        assert_eq!(untagged_image("registry:5000/org/app:1.0"), "registry:5000/org/app");
        assert_eq!(untagged_image("quay.io/org/app@sha256:abcd"), "quay.io/org/app");
    }

    #[test]
    fn test_port_name_format() {
        assert!(is_valid_port_name("http-web"));
        assert!(is_valid_port_name("tcp"));
        assert!(!is_valid_port_name("web-http"));
    }

    #[test]
    fn test_untagged_deployment() {
        let d = define_untagged_deployment("ns", "quay.io/org/app:v1");
        let c = &d.spec.unwrap().template.spec.unwrap().containers[0];
        assert_eq!(c.image.as_deref(), Some("quay.io/org/app"));
    }
}
