//! Multus NetworkAttachmentDefinition builders
//!
//! NADs are custom resources, so they are built as DynamicObjects against a
//! hand-written ApiResource. The CNI configuration is carried as a JSON
//! string in `spec.config`.

use std::collections::BTreeMap;

use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;

/// Annotation binding a NAD to an SR-IOV device plugin resource
pub const SRIOV_RESOURCE_ANNOTATION: &str = "k8s.v1.cni.cncf.io/resourceName";

pub fn nad_api_resource() -> ApiResource {
    ApiResource {
        group: "k8s.cni.cncf.io".to_string(),
        version: "v1".to_string(),
        api_version: "k8s.cni.cncf.io/v1".to_string(),
        kind: "NetworkAttachmentDefinition".to_string(),
        plural: "network-attachment-definitions".to_string(),
    }
}

/// CNI plugin configuration embedded in a NAD
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CniConfig {
    pub cni_version: String,
    pub name: String,
    #[serde(rename = "type")]
    pub plugin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipam: Option<serde_json::Value>,
}

impl CniConfig {
    fn new(name: &str, plugin: &str) -> Self {
        Self {
            cni_version: "0.3.1".to_string(),
            name: name.to_string(),
            plugin: plugin.to_string(),
            bridge: None,
            master: None,
            mode: None,
            mtu: None,
            ipam: None,
        }
    }

    /// Linux bridge named after the network
    pub fn bridge(name: &str) -> Self {
        Self {
            bridge: Some(format!("br-{}", name)),
            ..Self::new(name, "bridge")
        }
    }

    pub fn macvlan(name: &str, master: &str) -> Self {
        Self {
            master: Some(master.to_string()),
            mode: Some("bridge".to_string()),
            ..Self::new(name, "macvlan")
        }
    }

    pub fn sriov(name: &str) -> Self {
        Self::new(name, "sriov")
    }

    /// Whereabouts IPAM over `range`, e.g. "192.168.0.0/24" or "fd00::/64"
    pub fn with_whereabouts_ipam(mut self, range: &str) -> Self {
        self.ipam = Some(json!({ "type": "whereabouts", "range": range }));
        self
    }

    /// Static IPAM; addresses are assigned per pod through the networks annotation
    pub fn with_static_ipam(mut self) -> Self {
        self.ipam = Some(json!({ "type": "static" }));
        self
    }

    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }
}

/// Build a NAD carrying `config`
pub fn define_nad(name: &str, namespace: &str, config: &CniConfig) -> Result<DynamicObject> {
    let config = serde_json::to_string(config)?;

    Ok(DynamicObject::new(name, &nad_api_resource())
        .within(namespace)
        .data(json!({ "spec": { "config": config } })))
}

/// SR-IOV NAD bound to a device plugin resource
pub fn define_sriov_nad(
    name: &str,
    namespace: &str,
    resource_name: &str,
    mtu: Option<u32>,
) -> Result<DynamicObject> {
    let mut config = CniConfig::sriov(name).with_whereabouts_ipam("192.168.100.0/24");
    config.mtu = mtu;

    let mut nad = define_nad(name, namespace, &config)?;
    nad.metadata.annotations = Some(BTreeMap::from([(
        SRIOV_RESOURCE_ANNOTATION.to_string(),
        resource_name.to_string(),
    )]));
    Ok(nad)
}

/// Parse the CNI configuration back out of a NAD
pub fn nad_config(nad: &DynamicObject) -> Result<Option<CniConfig>> {
    match nad.data.pointer("/spec/config").and_then(|v| v.as_str()) {
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        None => Ok(None),
    }
}
