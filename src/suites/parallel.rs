//! Concurrent deployment fan-out
//!
//! Several labelled deployments are created at once in one namespace, then
//! certsuite is pointed at each label in turn. Creation failures are all
//! collected before reporting; one failed task does not cancel the others.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use k8s_openapi::api::apps::v1::Deployment;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use super::{target_labels, TEST_DEPLOYMENT_NAME};
use crate::builders::define_deployment;
use crate::error::{QeError, Result};
use crate::harness::ScenarioContext;
use crate::k8s::K8sClient;
use crate::report::TestCaseStatus;

pub const NAMESPACE_PREFIX: &str = "parallel-tests";
pub const SCENARIO_LABEL_KEY: &str = "certsuite-qe/scenario";

/// One labelled deployment and the verdict certsuite should give it
#[derive(Debug, Clone)]
pub struct ParallelScenario {
    pub name: String,
    pub test_case: String,
    pub expected: TestCaseStatus,
}

impl ParallelScenario {
    pub fn new(name: &str, test_case: &str, expected: TestCaseStatus) -> Self {
        Self {
            name: name.to_string(),
            test_case: test_case.to_string(),
            expected,
        }
    }
}

/// Run `task` over every item concurrently and join them all.
///
/// Results keep input order. Every failure, including panics, is gathered
/// into `QeError::Parallel`.
pub async fn fan_out<T, R, F, Fut>(items: Vec<T>, task: F) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let mut set = JoinSet::new();
    let total = items.len();
    for (index, item) in items.into_iter().enumerate() {
        let fut = AssertUnwindSafe(task(item)).catch_unwind();
        set.spawn(async move { (index, fut.await) });
    }

    let mut results = Vec::new();
    let mut errors: Vec<(usize, String)> = Vec::new();
    let mut joined_tasks = vec![false; total];
    while let Some(joined) = set.join_next().await {
        let Ok((index, outcome)) = joined else {
            continue;
        };
        joined_tasks[index] = true;
        match outcome {
            Ok(Ok(value)) => results.push((index, value)),
            Ok(Err(e)) => {
                warn!(task = index, error = %e, "Parallel task failed");
                errors.push((index, e.to_string()));
            }
            Err(_) => {
                warn!(task = index, "Parallel task panicked");
                errors.push((index, "panicked".to_string()));
            }
        }
    }
    // a task that never reported back was cancelled
    for (index, joined) in joined_tasks.iter().enumerate() {
        if !joined {
            errors.push((index, "cancelled".to_string()));
        }
    }

    if !errors.is_empty() {
        errors.sort_by_key(|(index, _)| *index);
        return Err(QeError::Parallel(
            errors
                .into_iter()
                .map(|(index, e)| format!("task {}: {}", index, e))
                .collect(),
        ));
    }

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, value)| value).collect())
}

/// One deployment per scenario, each carrying its own scenario label value
pub fn scenario_deployments(
    namespace: &str,
    image: &str,
    scenarios: &[ParallelScenario],
) -> Vec<Deployment> {
    scenarios
        .iter()
        .map(|scenario| {
            let mut labels = target_labels();
            labels.insert(SCENARIO_LABEL_KEY.to_string(), scenario.name.clone());
            define_deployment(
                &format!("{}-{}", TEST_DEPLOYMENT_NAME, scenario.name),
                namespace,
                image,
                &labels,
            )
        })
        .collect()
}

/// Create every deployment at once and wait for all of them to be ready
#[instrument(skip(client, deployments), fields(count = deployments.len()))]
pub async fn create_deployments_concurrently(
    client: &K8sClient,
    deployments: Vec<Deployment>,
    timeout: Duration,
) -> Result<Vec<Deployment>> {
    let client = client.clone();
    fan_out(deployments, move |deployment| {
        let client = client.clone();
        async move { client.create_deployment_and_wait(&deployment, timeout).await }
    })
    .await
}

/// Point certsuite at each scenario's label in turn and check its verdict
pub async fn run_validation_passes(
    ctx: &ScenarioContext,
    scenarios: &[ParallelScenario],
) -> Result<()> {
    for scenario in scenarios {
        let pass = ctx.with_report_subdir(&scenario.name);
        let config = pass
            .certsuite_config()
            .with_only_pod_label(SCENARIO_LABEL_KEY, &scenario.name);
        pass.write_certsuite_config(&config).await?;
        pass.launch_and_verify(&scenario.test_case, scenario.expected)
            .await?;
        info!(scenario = %scenario.name, "Validation pass succeeded");
    }
    Ok(())
}
