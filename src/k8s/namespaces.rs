//! Namespace lifecycle for scenarios
//!
//! Every scenario runs in its own randomly named namespace. Namespaces
//! created here carry the managed-by label so leftovers can be found later.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ListParams, PostParams};
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use super::client::{delete_params, K8sClient};
use super::wait::poll_until;
use crate::error::{QeError, Result};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "certsuite-qe";

const MAX_NAMESPACE_LEN: usize = 63;

/// Namespace operations the lifecycle helpers depend on
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NamespaceOps: Send + Sync {
    /// Create a namespace; an existing namespace is not an error
    async fn create_namespace(&self, name: &str) -> Result<()>;

    /// Request deletion; a missing namespace is not an error
    async fn delete_namespace(&self, name: &str) -> Result<()>;

    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    /// Names of namespaces matching a label selector
    async fn list_namespaces(&self, label_selector: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl NamespaceOps for K8sClient {
    #[instrument(skip(self))]
    async fn create_namespace(&self, name: &str) -> Result<()> {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(managed_labels()),
                ..Default::default()
            },
            ..Default::default()
        };

        match self.namespaces().create(&PostParams::default(), &ns).await {
            Ok(_) => {
                info!(namespace = %name, "Created namespace");
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                info!(namespace = %name, "Namespace already exists");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, name: &str) -> Result<()> {
        match self
            .namespaces()
            .delete(name, &delete_params())
            .await
        {
            Ok(_) => {
                info!(namespace = %name, "Namespace deletion requested");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        Ok(self.namespaces().get_opt(name).await?.is_some())
    }

    async fn list_namespaces(&self, label_selector: &str) -> Result<Vec<String>> {
        let list = self
            .namespaces()
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }
}

fn managed_labels() -> BTreeMap<String, String> {
    [(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string())]
        .into_iter()
        .collect()
}

/// Selector matching every namespace this harness created
pub fn managed_selector() -> String {
    format!("{}={}", MANAGED_BY_LABEL, MANAGED_BY_VALUE)
}

/// `<prefix>-<8 hex chars>`, lowercased and clipped to a valid DNS label
pub fn generate_namespace_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];

    let prefix: String = prefix
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    let prefix = prefix.trim_matches('-');

    let max_prefix = MAX_NAMESPACE_LEN - suffix.len() - 1;
    let prefix = &prefix[..prefix.len().min(max_prefix)];
    let prefix = prefix.trim_end_matches('-');

    if prefix.is_empty() {
        format!("qe-{}", suffix)
    } else {
        format!("{}-{}", prefix, suffix)
    }
}

/// Create a fresh namespace named after `prefix` and return its name
pub async fn create_test_namespace<O: NamespaceOps + ?Sized>(
    ops: &O,
    prefix: &str,
) -> Result<String> {
    let name = generate_namespace_name(prefix);
    ops.create_namespace(&name).await?;
    Ok(name)
}

/// Namespaces left behind by earlier runs
pub async fn list_managed_namespaces<O: NamespaceOps + ?Sized>(ops: &O) -> Result<Vec<String>> {
    ops.list_namespaces(&managed_selector()).await
}

/// Block until `name` no longer exists
pub async fn wait_for_namespace_deletion<O: NamespaceOps + ?Sized>(
    ops: &O,
    name: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    poll_until(
        interval,
        timeout,
        &format!("deletion of namespace {}", name),
        move || async move { Ok::<_, QeError>(!ops.namespace_exists(name).await?) },
    )
    .await
}

/// Delete exactly the named namespaces and wait for them to disappear.
///
/// Returns the names that could not be deleted within `timeout`; those are
/// reported rather than failing the caller.
#[instrument(skip(ops))]
pub async fn delete_namespaces<O: NamespaceOps + ?Sized>(
    ops: &O,
    names: &[String],
    interval: Duration,
    timeout: Duration,
) -> Vec<String> {
    let mut remaining = Vec::new();

    for name in names {
        if let Err(e) = ops.delete_namespace(name).await {
            warn!(namespace = %name, error = %e, "Failed to delete namespace");
            remaining.push(name.clone());
            continue;
        }

        if let Err(e) = wait_for_namespace_deletion(ops, name, interval, timeout).await {
            warn!(namespace = %name, error = %e, "Namespace still present");
            remaining.push(name.clone());
        }
    }

    remaining
}
