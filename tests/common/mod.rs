//! Shared setup for the live-cluster scenarios

use anyhow::{Context, Result};

use certsuite_qe::{init_tracing, QeHarness};

/// Harness connected to the cluster named by `QE_KUBECONFIG` or the default kubeconfig
pub async fn harness() -> Result<QeHarness> {
    init_tracing();
    QeHarness::from_env()
        .await
        .context("failed to connect the QE harness")
}
