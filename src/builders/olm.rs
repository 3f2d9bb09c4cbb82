//! OLM (Operator Lifecycle Manager) object builders

use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde_json::json;

fn olm_resource(version: &str, kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: "operators.coreos.com".to_string(),
        version: version.to_string(),
        api_version: format!("operators.coreos.com/{}", version),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

pub fn operator_group_resource() -> ApiResource {
    olm_resource("v1", "OperatorGroup", "operatorgroups")
}

pub fn subscription_resource() -> ApiResource {
    olm_resource("v1alpha1", "Subscription", "subscriptions")
}

pub fn install_plan_resource() -> ApiResource {
    olm_resource("v1alpha1", "InstallPlan", "installplans")
}

pub fn csv_resource() -> ApiResource {
    olm_resource("v1alpha1", "ClusterServiceVersion", "clusterserviceversions")
}

/// OperatorGroup targeting `target_namespaces`; empty means all namespaces
pub fn define_operator_group(
    name: &str,
    namespace: &str,
    target_namespaces: &[&str],
) -> DynamicObject {
    let spec = if target_namespaces.is_empty() {
        json!({})
    } else {
        json!({ "targetNamespaces": target_namespaces })
    };

    DynamicObject::new(name, &operator_group_resource())
        .within(namespace)
        .data(json!({ "spec": spec }))
}

/// Parameters of an operator subscription
#[derive(Debug, Clone)]
pub struct SubscriptionParams<'a> {
    pub package: &'a str,
    pub channel: &'a str,
    pub source: &'a str,
    pub source_namespace: &'a str,
    pub starting_csv: Option<&'a str>,
    /// Manual approval leaves the InstallPlan for the scenario to approve
    pub manual_approval: bool,
}

pub fn define_subscription(
    name: &str,
    namespace: &str,
    params: &SubscriptionParams<'_>,
) -> DynamicObject {
    let mut spec = json!({
        "name": params.package,
        "channel": params.channel,
        "source": params.source,
        "sourceNamespace": params.source_namespace,
        "installPlanApproval": if params.manual_approval { "Manual" } else { "Automatic" },
    });
    if let Some(csv) = params.starting_csv {
        spec["startingCSV"] = json!(csv);
    }

    DynamicObject::new(name, &subscription_resource())
        .within(namespace)
        .data(json!({ "spec": spec }))
}

/// Phase reported by an InstallPlan or CSV status
pub fn status_phase(obj: &DynamicObject) -> Option<&str> {
    obj.data.pointer("/status/phase").and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_subscription() {
        let sub = define_subscription(
            "cockroachdb",
            "op-tests",
            &SubscriptionParams {
                package: "cockroachdb",
                channel: "stable-v6.x",
                source: "community-operators",
                source_namespace: "openshift-marketplace",
                starting_csv: Some("cockroachdb.v6.0.0"),
                manual_approval: true,
            },
        );

        let spec = &sub.data["spec"];
        assert_eq!(spec["name"], "cockroachdb");
        assert_eq!(spec["installPlanApproval"], "Manual");
        assert_eq!(spec["startingCSV"], "cockroachdb.v6.0.0");
        assert_eq!(sub.types.unwrap().kind, "Subscription");
    }

    #[test]
    fn test_operator_group_all_namespaces() {
        let og = define_operator_group("og", "op-tests", &[]);
        assert_eq!(og.data["spec"], json!({}));

        let og = define_operator_group("og", "op-tests", &["op-tests"]);
        assert_eq!(og.data["spec"]["targetNamespaces"][0], "op-tests");
    }

    #[test]
    fn test_status_phase() {
        let mut csv = DynamicObject::new("csv", &csv_resource());
        assert_eq!(status_phase(&csv), None);

        csv.data = json!({ "status": { "phase": "Succeeded" } });
        assert_eq!(status_phase(&csv), Some("Succeeded"));
    }
}
