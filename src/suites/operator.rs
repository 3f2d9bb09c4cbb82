//! Operator suite
//!
//! Operators are installed through OLM: an OperatorGroup and a
//! Subscription go into the test namespace, a manual InstallPlan is
//! approved when present, and the resulting CSV must reach `Succeeded`
//! before it is labelled for certsuite.

use std::time::Duration;

use kube::api::DynamicObject;
use serde_json::json;
use tracing::{info, instrument};

use super::{TARGET_OPERATOR_LABEL_KEY, TARGET_OPERATOR_LABEL_VALUE};
use crate::builders::olm::{
    csv_resource, install_plan_resource, operator_group_resource, status_phase,
    subscription_resource,
};
use crate::builders::{define_operator_group, define_subscription, SubscriptionParams};
use crate::error::{QeError, Result};
use crate::k8s::{poll_until, K8sClient};

pub const NAMESPACE_PREFIX: &str = "operator-tests";
pub const OPERATOR_GROUP_NAME: &str = "operator-tests-og";
pub const MARKETPLACE_NAMESPACE: &str = "openshift-marketplace";
pub const CSV_SUCCEEDED: &str = "Succeeded";

pub const TC_INSTALL_STATUS_SUCCEEDED: &str = "operator-install-status-succeeded";
pub const TC_INSTALL_SOURCE: &str = "operator-install-source";
pub const TC_INSTALL_NO_PRIVILEGES: &str = "operator-install-status-no-privileges";
pub const TC_CRD_VERSIONING: &str = "operator-crd-versioning";
pub const TC_CRD_OPENAPI_SCHEMA: &str = "operator-crd-openapi-schema";
pub const TC_SINGLE_CRD_OWNER: &str = "operator-single-crd-owner";
pub const TC_PODS_NO_HUGEPAGES: &str = "operator-pods-no-hugepages";
pub const TC_MULTIPLE_SAME_OPERATORS: &str = "operator-multiple-same-operators";
pub const TC_CATALOGSOURCE_BUNDLE_COUNT: &str = "operator-catalogsource-bundle-count";
pub const TC_OLM_SKIP_RANGE: &str = "operator-olm-skip-range";

/// CSV name a subscription resolved to, once OLM has installed it
pub fn installed_csv(subscription: &DynamicObject) -> Option<&str> {
    subscription
        .data
        .pointer("/status/installedCSV")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// InstallPlan referenced by a subscription
pub fn install_plan_name(subscription: &DynamicObject) -> Option<&str> {
    subscription
        .data
        .pointer("/status/installPlanRef/name")
        .or_else(|| subscription.data.pointer("/status/installplan/name"))
        .and_then(|v| v.as_str())
}

pub fn install_plan_approved(plan: &DynamicObject) -> bool {
    plan.data
        .pointer("/spec/approved")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

async fn get_subscription(client: &K8sClient, namespace: &str, name: &str) -> Result<DynamicObject> {
    client
        .get_dynamic(Some(namespace), &subscription_resource(), name)
        .await?
        .ok_or(QeError::MissingField("subscription"))
}

/// Install an operator into `namespace` and return its CSV name
#[instrument(skip(client, params), fields(package = params.package))]
pub async fn install_operator(
    client: &K8sClient,
    namespace: &str,
    params: &SubscriptionParams<'_>,
    timeout: Duration,
) -> Result<String> {
    let og = define_operator_group(OPERATOR_GROUP_NAME, namespace, &[namespace]);
    match client
        .create_dynamic(Some(namespace), &operator_group_resource(), &og)
        .await
    {
        Err(e) if e.is_api_code(409) => {}
        other => {
            other?;
        }
    }

    let sub_name = params.package;
    let subscription = define_subscription(sub_name, namespace, params);
    client
        .create_dynamic(Some(namespace), &subscription_resource(), &subscription)
        .await?;

    let interval = client.poll_interval();
    if params.manual_approval {
        poll_until(
            interval,
            timeout,
            &format!("install plan of {}", sub_name),
            move || async move {
                let sub = get_subscription(client, namespace, sub_name).await?;
                Ok::<_, QeError>(install_plan_name(&sub).is_some())
            },
        )
        .await?;

        let sub = get_subscription(client, namespace, sub_name).await?;
        let plan = install_plan_name(&sub).ok_or(QeError::MissingField("status.installPlanRef"))?;
        approve_install_plan(client, namespace, plan).await?;
    }

    poll_until(
        interval,
        timeout,
        &format!("installed CSV of {}", sub_name),
        move || async move {
            let sub = get_subscription(client, namespace, sub_name).await?;
            Ok::<_, QeError>(installed_csv(&sub).is_some())
        },
    )
    .await?;

    let sub = get_subscription(client, namespace, sub_name).await?;
    let csv = installed_csv(&sub)
        .ok_or(QeError::MissingField("status.installedCSV"))?
        .to_string();
    wait_for_csv_succeeded(client, namespace, &csv, timeout).await?;

    info!(csv = %csv, "Operator installed");
    Ok(csv)
}

pub async fn approve_install_plan(client: &K8sClient, namespace: &str, name: &str) -> Result<()> {
    client
        .patch_dynamic(
            Some(namespace),
            &install_plan_resource(),
            name,
            &json!({ "spec": { "approved": true } }),
        )
        .await?;
    info!(install_plan = name, "Approved install plan");
    Ok(())
}

pub async fn wait_for_csv_succeeded(
    client: &K8sClient,
    namespace: &str,
    csv: &str,
    timeout: Duration,
) -> Result<()> {
    let ar = csv_resource();
    let ar = &ar;
    poll_until(
        client.poll_interval(),
        timeout,
        &format!("CSV {}/{}", namespace, csv),
        move || async move {
            let obj = client.get_dynamic(Some(namespace), ar, csv).await?;
            Ok::<_, QeError>(obj.as_ref().and_then(status_phase) == Some(CSV_SUCCEEDED))
        },
    )
    .await
}

/// Label a CSV so certsuite treats the operator as under test
pub async fn label_operator(client: &K8sClient, namespace: &str, csv: &str) -> Result<()> {
    let mut labels = serde_json::Map::new();
    labels.insert(
        TARGET_OPERATOR_LABEL_KEY.to_string(),
        json!(TARGET_OPERATOR_LABEL_VALUE),
    );

    client
        .patch_dynamic(
            Some(namespace),
            &csv_resource(),
            csv,
            &json!({ "metadata": { "labels": labels } }),
        )
        .await?;
    Ok(())
}
