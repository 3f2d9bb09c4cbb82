//! Observability scenarios against a live cluster

#![cfg(feature = "e2e")]

mod common;

use anyhow::Result;

use certsuite_qe::builders::{define_custom_resource, crd_api_resource};
use certsuite_qe::suites::observability::*;
use certsuite_qe::TestCaseStatus;

#[tokio::test]
async fn test_container_logging() -> Result<()> {
    let qe = common::harness().await?;
    qe.scenario(NAMESPACE_PREFIX, |ctx| async move {
        let deployment = define_logging_deployment(ctx.namespace(), ctx.test_image(), true);
        ctx.client()
            .create_deployment_and_wait(&deployment, ctx.config().ready_timeout())
            .await?;
        ctx.launch_and_verify(TC_CONTAINER_LOGGING, TestCaseStatus::Passed)
            .await
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_silent_daemonset() -> Result<()> {
    let qe = common::harness().await?;
    qe.scenario(NAMESPACE_PREFIX, |ctx| async move {
        let daemonset = define_logging_daemonset(ctx.namespace(), ctx.test_image(), false);
        ctx.client()
            .create_daemonset_and_wait(&daemonset, ctx.config().ready_timeout())
            .await?;
        ctx.launch_and_verify(TC_CONTAINER_LOGGING, TestCaseStatus::Failed)
            .await
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_termination_policy_fallback() -> Result<()> {
    let qe = common::harness().await?;
    qe.scenario(NAMESPACE_PREFIX, |ctx| async move {
        let deployment = define_termination_policy_deployment(
            ctx.namespace(),
            ctx.test_image(),
            "FallbackToLogsOnError",
        );
        ctx.client()
            .create_deployment_and_wait(&deployment, ctx.config().ready_timeout())
            .await?;
        ctx.launch_and_verify(TC_TERMINATION_POLICY, TestCaseStatus::Passed)
            .await
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_blocking_pod_disruption_budget() -> Result<()> {
    let qe = common::harness().await?;
    qe.scenario(NAMESPACE_PREFIX, |ctx| async move {
        let (deployment, pdb) =
            define_pdb_fixture(ctx.namespace(), ctx.test_image(), 2, blocking_bound(2));
        ctx.client()
            .create_deployment_and_wait(&deployment, ctx.config().ready_timeout())
            .await?;
        ctx.client().create_pod_disruption_budget(&pdb).await?;

        ctx.launch_and_verify(TC_POD_DISRUPTION_BUDGET, TestCaseStatus::Failed)
            .await
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_crd_without_status() -> Result<()> {
    let qe = common::harness().await?;
    qe.scenario(NAMESPACE_PREFIX, |ctx| async move {
        let crd = define_status_crd("NoStatus", "nostatuses", false);
        ctx.client().create_cluster(&crd).await?;

        let result: certsuite_qe::Result<()> = async {
            // the API server needs a moment to serve a fresh CRD
            tokio::time::sleep(ctx.config().poll_interval()).await;
            let cr = define_custom_resource(&crd, "cr1", ctx.namespace(), serde_json::json!({}));
            ctx.client()
                .create_dynamic(Some(ctx.namespace()), &crd_api_resource(&crd), &cr)
                .await?;

            let config = ctx.certsuite_config().with_crd_filter(CRD_SUFFIX, false);
            ctx.write_certsuite_config(&config).await?;
            ctx.launch_and_verify(TC_CRD_STATUS, TestCaseStatus::Failed)
                .await
        }
        .await;

        ctx.client().delete_crds_with_suffix(CRD_SUFFIX).await?;
        result
    })
    .await?;
    Ok(())
}
