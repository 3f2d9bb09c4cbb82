//! Readiness polling
//!
//! Fixed-interval polling with a deadline, plus the readiness predicates
//! for the workload kinds scenarios deploy.

use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{QeError, Result};

/// Poll `probe` every `interval` until it returns `Ok(true)` or `timeout` elapses.
///
/// Probe errors are logged and retried; only the deadline ends the loop.
pub async fn poll_until<F, Fut>(
    interval: Duration,
    timeout: Duration,
    what: &str,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();

    loop {
        match probe().await {
            Ok(true) => {
                debug!(what, elapsed = ?start.elapsed(), "Condition met");
                return Ok(());
            }
            Ok(false) => debug!(what, "Condition not met yet"),
            Err(e) => warn!(what, error = %e, "Probe failed, retrying"),
        }

        if start.elapsed() >= timeout {
            return Err(QeError::timeout(what, timeout));
        }

        sleep(interval).await;
    }
}

/// All desired replicas are ready and updated
pub fn deployment_is_ready(deployment: &Deployment) -> bool {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);

    match &deployment.status {
        Some(status) => {
            status.ready_replicas.unwrap_or(0) == desired
                && status.updated_replicas.unwrap_or(0) == desired
                && status.replicas.unwrap_or(0) == desired
        }
        None => false,
    }
}

/// Every scheduled daemon pod is ready, and at least one was scheduled
pub fn daemonset_is_ready(daemonset: &DaemonSet) -> bool {
    match &daemonset.status {
        Some(status) => {
            status.desired_number_scheduled > 0
                && status.number_ready == status.desired_number_scheduled
                && status.number_available.unwrap_or(0) == status.desired_number_scheduled
        }
        None => false,
    }
}

pub fn statefulset_is_ready(statefulset: &StatefulSet) -> bool {
    let desired = statefulset
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);

    match &statefulset.status {
        Some(status) => status.ready_replicas.unwrap_or(0) == desired && status.replicas == desired,
        None => false,
    }
}

/// Pod is in the Running phase and every container reports ready
pub fn pod_is_ready(pod: &Pod) -> bool {
    let Some(status) = &pod.status else {
        return false;
    };

    if status.phase.as_deref() != Some("Running") {
        return false;
    }

    match &status.container_statuses {
        Some(containers) if !containers.is_empty() => containers.iter().all(|c| c.ready),
        _ => false,
    }
}
