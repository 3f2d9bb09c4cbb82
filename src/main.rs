//! `certsuite-qe` command line
//!
//! ## Commands
//!
//! - `run`: launch certsuite for one test case and check its verdict
//! - `report`: print the verdicts recorded in a report directory
//! - `cleanup`: delete namespaces left behind by earlier scenarios

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use certsuite_qe::{
    builders::parse_label,
    certsuite::{CertsuiteConfig, CertsuiteRunner},
    config::QeConfig,
    k8s::{delete_namespaces, list_managed_namespaces, K8sClient},
    report::{self, claim, junit, TestCaseStatus, CLAIM_FILE, JUNIT_FILE},
    suites::{TARGET_POD_LABEL_KEY, TARGET_POD_LABEL_VALUE},
    QeError,
};

#[derive(Parser)]
#[command(name = "certsuite-qe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "End-to-end verification of certsuite verdicts", long_about = None)]
struct Cli {
    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run certsuite for one test case against existing namespaces
    Run {
        /// Certsuite test case id, e.g. access-control-host-network
        #[arg(short, long)]
        test_case: String,

        /// Verdict both reports must record
        #[arg(short, long, default_value = "passed")]
        expect: TestCaseStatus,

        /// Namespaces certsuite scans
        #[arg(short, long = "namespace", required = true)]
        namespaces: Vec<String>,

        /// Pod selector as key=value; defaults to the generic target label
        #[arg(short, long = "label", value_parser = label_arg)]
        labels: Vec<(String, String)>,

        /// Where reports go (default: QE_REPORT_DIR/<test case>)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Show the verdicts in a report directory
    Report {
        #[arg(short, long)]
        dir: PathBuf,

        /// Only show this test case
        #[arg(short, long)]
        test_case: Option<String>,
    },

    /// Delete every namespace labelled managed-by=certsuite-qe
    Cleanup,
}

fn label_arg(raw: &str) -> std::result::Result<(String, String), String> {
    parse_label(raw).ok_or_else(|| format!("expected key=value, got {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = QeConfig::load().context("Failed to load QE configuration")?;

    match cli.command {
        Commands::Run {
            test_case,
            expect,
            namespaces,
            labels,
            output_dir,
        } => run(&config, &test_case, expect, &namespaces, &labels, output_dir).await,
        Commands::Report { dir, test_case } => show_report(&dir, test_case.as_deref()).await,
        Commands::Cleanup => cleanup(&config).await,
    }
}

async fn run(
    config: &QeConfig,
    test_case: &str,
    expect: TestCaseStatus,
    namespaces: &[String],
    labels: &[(String, String)],
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut certsuite_config = CertsuiteConfig::new(namespaces)
        .with_probe_daemonset_namespace(&config.probe_daemonset_namespace);
    if labels.is_empty() {
        certsuite_config =
            certsuite_config.with_pod_label(TARGET_POD_LABEL_KEY, TARGET_POD_LABEL_VALUE);
    }
    for (key, value) in labels {
        certsuite_config = certsuite_config.with_pod_label(key, value);
    }

    let output_dir = output_dir.unwrap_or_else(|| config.report_dir().join(test_case));
    let config_file = certsuite_config
        .write_to(&config.config_dir().join(test_case))
        .await?;

    let runner = CertsuiteRunner::from_config(config);
    match runner.launch(test_case, &config_file, &output_dir).await {
        Ok(_) => {}
        Err(QeError::CertsuiteFailed { code, .. })
            if matches!(expect, TestCaseStatus::Failed | TestCaseStatus::Error) =>
        {
            tracing::info!(?code, "certsuite exited non-zero, checking reports");
        }
        Err(e) => return Err(e.into()),
    }

    report::verify_test_case(&output_dir, test_case, expect).await?;
    println!("{}: {}", test_case, expect);
    Ok(())
}

async fn show_report(dir: &Path, test_case: Option<&str>) -> Result<()> {
    let Some(test_case) = test_case else {
        let summary = report::summarize(dir).await?;
        for (id, status) in &summary.test_cases {
            println!("{:<70} {}", id, status);
        }
        println!("{}", summary);
        return Ok(());
    };

    let junit_report = junit::parse_file(&dir.join(JUNIT_FILE)).await?;
    let claim = claim::parse_file(&dir.join(CLAIM_FILE)).await?;

    let junit_status = junit::test_case_status(&junit_report, test_case)?;
    let claim_status = claim::test_case_status(&claim, test_case)?;
    println!("{} {}: {}", JUNIT_FILE, test_case, junit_status);
    println!("{} {}: {}", CLAIM_FILE, test_case, claim_status);

    let details = claim::check_details(&claim, test_case)?;
    for obj in &details.non_compliant {
        println!(
            "  non-compliant {} {}",
            obj.object_type,
            obj.object_fields_values.join(" ")
        );
    }

    if junit_status != claim_status {
        bail!("reports disagree on {}", test_case);
    }
    Ok(())
}

async fn cleanup(config: &QeConfig) -> Result<()> {
    let client = match &config.kubeconfig {
        Some(path) => K8sClient::from_kubeconfig(path).await?,
        None => K8sClient::new().await?,
    };

    let namespaces = list_managed_namespaces(&client).await?;
    if namespaces.is_empty() {
        println!("No managed namespaces found");
        return Ok(());
    }

    let remaining = delete_namespaces(
        &client,
        &namespaces,
        config.poll_interval(),
        config.ready_timeout(),
    )
    .await;
    println!(
        "Deleted {} namespace(s)",
        namespaces.len() - remaining.len()
    );

    if !remaining.is_empty() {
        bail!("failed to delete: {}", remaining.join(", "));
    }
    Ok(())
}
