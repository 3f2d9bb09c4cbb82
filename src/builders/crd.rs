//! CustomResourceDefinition builders

use std::collections::BTreeMap;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, CustomResourceDefinitionNames, CustomResourceDefinitionSpec,
    CustomResourceDefinitionVersion, CustomResourceSubresourceScale,
    CustomResourceSubresourceStatus, CustomResourceSubresources, CustomResourceValidation,
    JSONSchemaProps,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde_json::json;

pub const CRD_VERSION: &str = "v1";

fn object_schema(properties: BTreeMap<String, JSONSchemaProps>) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some("object".to_string()),
        properties: Some(properties),
        ..Default::default()
    }
}

fn open_object() -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some("object".to_string()),
        x_kubernetes_preserve_unknown_fields: Some(true),
        ..Default::default()
    }
}

/// Namespaced CRD `<plural>.<group>` with a status subresource, and a scale
/// subresource when `scalable`
pub fn define_crd(group: &str, kind: &str, plural: &str, scalable: bool) -> CustomResourceDefinition {
    let schema = object_schema(BTreeMap::from([
        ("spec".to_string(), open_object()),
        ("status".to_string(), open_object()),
    ]));

    let scale = scalable.then(|| CustomResourceSubresourceScale {
        spec_replicas_path: ".spec.replicas".to_string(),
        status_replicas_path: ".status.replicas".to_string(),
        label_selector_path: Some(".status.selector".to_string()),
    });

    CustomResourceDefinition {
        metadata: ObjectMeta {
            name: Some(format!("{}.{}", plural, group)),
            ..Default::default()
        },
        spec: CustomResourceDefinitionSpec {
            group: group.to_string(),
            names: CustomResourceDefinitionNames {
                kind: kind.to_string(),
                plural: plural.to_string(),
                singular: Some(kind.to_lowercase()),
                list_kind: Some(format!("{}List", kind)),
                ..Default::default()
            },
            scope: "Namespaced".to_string(),
            versions: vec![CustomResourceDefinitionVersion {
                name: CRD_VERSION.to_string(),
                served: true,
                storage: true,
                schema: Some(CustomResourceValidation {
                    open_api_v3_schema: Some(schema),
                }),
                subresources: Some(CustomResourceSubresources {
                    scale,
                    status: Some(CustomResourceSubresourceStatus(json!({}))),
                }),
                ..Default::default()
            }],
            ..Default::default()
        },
        ..Default::default()
    }
}

/// ApiResource addressing instances of a CRD built by `define_crd`
pub fn crd_api_resource(crd: &CustomResourceDefinition) -> ApiResource {
    let group = crd.spec.group.clone();
    let version = crd
        .spec
        .versions
        .first()
        .map(|v| v.name.clone())
        .unwrap_or_else(|| CRD_VERSION.to_string());

    ApiResource {
        api_version: format!("{}/{}", group, version),
        group,
        version,
        kind: crd.spec.names.kind.clone(),
        plural: crd.spec.names.plural.clone(),
    }
}

/// Instance of a CRD with the given spec
pub fn define_custom_resource(
    crd: &CustomResourceDefinition,
    name: &str,
    namespace: &str,
    spec: serde_json::Value,
) -> DynamicObject {
    DynamicObject::new(name, &crd_api_resource(crd))
        .within(namespace)
        .data(json!({ "spec": spec }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_scalable_crd() {
        let crd = define_crd("test.certsuite.io", "TestScale", "testscales", true);

        assert_eq!(crd.metadata.name.as_deref(), Some("testscales.test.certsuite.io"));
        let version = &crd.spec.versions[0];
        let scale = version.subresources.as_ref().unwrap().scale.as_ref().unwrap();
        assert_eq!(scale.spec_replicas_path, ".spec.replicas");
    }

    #[test]
    fn test_define_non_scalable_crd() {
        let crd = define_crd("test.certsuite.io", "TestCrd", "testcrds", false);
        let subresources = crd.spec.versions[0].subresources.as_ref().unwrap();
        assert!(subresources.scale.is_none());
        assert!(subresources.status.is_some());
    }

    #[test]
    fn test_custom_resource_targets_crd() {
        let crd = define_crd("test.certsuite.io", "TestCrd", "testcrds", false);
        let cr = define_custom_resource(&crd, "cr1", "ob-tests", json!({ "replicas": 1 }));

        let types = cr.types.unwrap();
        assert_eq!(types.api_version, "test.certsuite.io/v1");
        assert_eq!(types.kind, "TestCrd");
        assert_eq!(cr.data["spec"]["replicas"], 1);
    }
}
