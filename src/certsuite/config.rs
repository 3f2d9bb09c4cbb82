//! Model of the certsuite configuration file
//!
//! Scenarios describe what the tool should scan (namespaces, pod and
//! operator labels, CRD filters) and write it next to the report directory
//! before each launch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub const CONFIG_FILE_NAME: &str = "certsuite_config.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamespacedRef {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrdFilter {
    pub name_suffix: String,
    pub scalable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KernelTaint {
    pub module: String,
}

/// Contents of `certsuite_config.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertsuiteConfig {
    #[serde(default, rename = "targetNameSpaces")]
    pub target_namespaces: Vec<NamedRef>,

    /// `"key: value"` selectors for pods under test
    #[serde(default)]
    pub pods_under_test_labels: Vec<String>,

    #[serde(default)]
    pub operators_under_test_labels: Vec<String>,

    #[serde(default)]
    pub target_crd_filters: Vec<CrdFilter>,

    #[serde(default)]
    pub managed_deployments: Vec<NamedRef>,

    #[serde(default)]
    pub managed_statefulsets: Vec<NamedRef>,

    #[serde(default)]
    pub accepted_kernel_taints: Vec<KernelTaint>,

    #[serde(default)]
    pub skip_helm_chart_list: Vec<NamedRef>,

    #[serde(default)]
    pub skip_scaling_test_deployments: Vec<NamespacedRef>,

    #[serde(default)]
    pub skip_scaling_test_statefulsets: Vec<NamespacedRef>,

    #[serde(default, rename = "servicesignorelist")]
    pub services_ignore_list: Vec<String>,

    #[serde(default)]
    pub valid_protocol_names: Vec<String>,

    #[serde(default, rename = "probeDaemonSetNamespace", skip_serializing_if = "Option::is_none")]
    pub probe_daemonset_namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_app_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_app_password: Option<String>,
}

impl CertsuiteConfig {
    /// Config scanning `namespaces` for pods carrying the given labels
    pub fn new<S: AsRef<str>>(namespaces: &[S]) -> Self {
        Self::default().with_namespaces(namespaces)
    }

    pub fn with_namespaces<S: AsRef<str>>(mut self, namespaces: &[S]) -> Self {
        for ns in namespaces {
            let ns = ns.as_ref();
            if !self.target_namespaces.iter().any(|n| n.name == ns) {
                self.target_namespaces.push(NamedRef {
                    name: ns.to_string(),
                });
            }
        }
        self
    }

    pub fn with_pod_label(mut self, key: &str, value: &str) -> Self {
        self.pods_under_test_labels.push(format_label(key, value));
        self
    }

    /// Replace every pod label with a single selector
    pub fn with_only_pod_label(mut self, key: &str, value: &str) -> Self {
        self.pods_under_test_labels = vec![format_label(key, value)];
        self
    }

    pub fn with_operator_label(mut self, key: &str, value: &str) -> Self {
        self.operators_under_test_labels.push(format_label(key, value));
        self
    }

    pub fn with_crd_filter(mut self, name_suffix: &str, scalable: bool) -> Self {
        self.target_crd_filters.push(CrdFilter {
            name_suffix: name_suffix.to_string(),
            scalable,
        });
        self
    }

    pub fn with_managed_deployment(mut self, name: &str) -> Self {
        self.managed_deployments.push(NamedRef {
            name: name.to_string(),
        });
        self
    }

    pub fn with_managed_statefulset(mut self, name: &str) -> Self {
        self.managed_statefulsets.push(NamedRef {
            name: name.to_string(),
        });
        self
    }

    pub fn with_accepted_kernel_taint(mut self, module: &str) -> Self {
        self.accepted_kernel_taints.push(KernelTaint {
            module: module.to_string(),
        });
        self
    }

    pub fn with_skipped_helm_chart(mut self, name: &str) -> Self {
        self.skip_helm_chart_list.push(NamedRef {
            name: name.to_string(),
        });
        self
    }

    pub fn with_skipped_scaling_deployment(mut self, name: &str, namespace: &str) -> Self {
        self.skip_scaling_test_deployments.push(NamespacedRef {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
        self
    }

    pub fn with_skipped_scaling_statefulset(mut self, name: &str, namespace: &str) -> Self {
        self.skip_scaling_test_statefulsets.push(NamespacedRef {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
        self
    }

    pub fn with_ignored_service(mut self, name: &str) -> Self {
        self.services_ignore_list.push(name.to_string());
        self
    }

    pub fn with_valid_protocol_name(mut self, name: &str) -> Self {
        self.valid_protocol_names.push(name.to_string());
        self
    }

    pub fn with_probe_daemonset_namespace(mut self, namespace: &str) -> Self {
        self.probe_daemonset_namespace = Some(namespace.to_string());
        self
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Write `<dir>/certsuite_config.yml`, creating `dir` if needed
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, self.to_yaml()?).await?;
        debug!(path = %path.display(), "Wrote certsuite config");
        Ok(path)
    }
}

fn format_label(key: &str, value: &str) -> String {
    format!("{}: {}", key, value)
}
