//! Kubernetes integration for the QE harness
//!
//! This module handles all interactions with the cluster under test:
//! - Creating, fetching and deleting the objects scenarios deploy
//! - Creating and tearing down per-scenario namespaces
//! - Polling workloads until they report ready

mod client;
pub mod namespaces;
pub mod wait;

pub use client::K8sClient;
pub use namespaces::{
    create_test_namespace, delete_namespaces, generate_namespace_name, list_managed_namespaces,
    managed_selector, wait_for_namespace_deletion, NamespaceOps,
};
pub use wait::{
    daemonset_is_ready, deployment_is_ready, pod_is_ready, poll_until, statefulset_is_ready,
};
