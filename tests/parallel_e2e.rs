//! Several labelled workloads in one namespace, validated one label at a time

#![cfg(feature = "e2e")]

mod common;

use anyhow::Result;

use certsuite_qe::suites::parallel::*;
use certsuite_qe::suites::{accesscontrol, lifecycle};
use certsuite_qe::TestCaseStatus;

#[tokio::test]
async fn test_labelled_scenarios_in_one_namespace() -> Result<()> {
    let qe = common::harness().await?;
    qe.scenario(NAMESPACE_PREFIX, |ctx| async move {
        let scenarios = vec![
            ParallelScenario::new(
                "hostnet",
                accesscontrol::TC_HOST_NETWORK,
                TestCaseStatus::Passed,
            ),
            ParallelScenario::new(
                "owner",
                lifecycle::TC_POD_OWNER_TYPE,
                TestCaseStatus::Passed,
            ),
            ParallelScenario::new("ha", lifecycle::TC_HIGH_AVAILABILITY, TestCaseStatus::Failed),
        ];

        let deployments = scenario_deployments(ctx.namespace(), ctx.test_image(), &scenarios);
        let created = create_deployments_concurrently(
            ctx.client(),
            deployments,
            ctx.config().ready_timeout(),
        )
        .await?;
        assert_eq!(created.len(), scenarios.len());

        run_validation_passes(&ctx, &scenarios).await
    })
    .await?;
    Ok(())
}
