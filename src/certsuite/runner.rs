//! Launching certsuite as a child process
//!
//! The tool runs either from a local binary or from its container image.
//! Both modes receive the same `run` arguments; the container mode mounts
//! the kubeconfig, the config directory and the output directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{error, info, instrument, warn};

use crate::config::QeConfig;
use crate::error::{QeError, Result};

const CONTAINER_KUBECONFIG: &str = "/usr/certsuite/kubeconfig/config";
const CONTAINER_CONFIG_DIR: &str = "/usr/certsuite/config";
const CONTAINER_OUTPUT_DIR: &str = "/usr/certsuite/results";

/// Where the certsuite executable comes from
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchMode {
    Binary(PathBuf),
    Container { engine: String, image: String },
}

/// Output of a finished certsuite run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CertsuiteRunner {
    mode: LaunchMode,
    kubeconfig: Option<PathBuf>,
    intrusive: bool,
    log_level: String,
    timeout: Duration,
}

impl CertsuiteRunner {
    pub fn new(mode: LaunchMode) -> Self {
        Self {
            mode,
            kubeconfig: None,
            intrusive: true,
            log_level: "info".to_string(),
            timeout: Duration::from_secs(900),
        }
    }

    /// Binary mode when `certsuite_binary` is set, container mode otherwise
    pub fn from_config(config: &QeConfig) -> Self {
        let mode = match &config.certsuite_binary {
            Some(binary) => LaunchMode::Binary(PathBuf::from(binary)),
            None => LaunchMode::Container {
                engine: config.container_engine.clone(),
                image: config.certsuite_image_ref(),
            },
        };

        let mut runner = Self::new(mode)
            .with_intrusive(!config.disable_intrusive_tests)
            .with_log_level(&config.log_level)
            .with_timeout(config.certsuite_timeout());
        if let Some(kubeconfig) = &config.kubeconfig {
            runner = runner.with_kubeconfig(kubeconfig);
        }
        runner
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    pub fn with_intrusive(mut self, intrusive: bool) -> Self {
        self.intrusive = intrusive;
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> &LaunchMode {
        &self.mode
    }

    /// Program and arguments for one run
    pub fn command_line(
        &self,
        test_case: &str,
        config_file: &Path,
        output_dir: &Path,
    ) -> (String, Vec<String>) {
        match &self.mode {
            LaunchMode::Binary(binary) => (
                binary.display().to_string(),
                self.run_args(test_case, config_file, output_dir),
            ),
            LaunchMode::Container { engine, image } => {
                let config_dir = config_file.parent().unwrap_or_else(|| Path::new("."));
                let config_name = config_file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let mut args = vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "--network".to_string(),
                    "host".to_string(),
                    "-v".to_string(),
                    format!("{}:{}:Z", config_dir.display(), CONTAINER_CONFIG_DIR),
                    "-v".to_string(),
                    format!("{}:{}:Z", output_dir.display(), CONTAINER_OUTPUT_DIR),
                ];
                if let Some(kubeconfig) = &self.kubeconfig {
                    args.push("-v".to_string());
                    args.push(format!("{}:{}:Z", kubeconfig.display(), CONTAINER_KUBECONFIG));
                    args.push("-e".to_string());
                    args.push(format!("KUBECONFIG={}", CONTAINER_KUBECONFIG));
                }
                args.push(image.clone());
                args.push("certsuite".to_string());
                args.extend(self.run_args(
                    test_case,
                    &Path::new(CONTAINER_CONFIG_DIR).join(config_name),
                    Path::new(CONTAINER_OUTPUT_DIR),
                ));

                (engine.clone(), args)
            }
        }
    }

    fn run_args(&self, test_case: &str, config_file: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            "run".to_string(),
            "--label-filter".to_string(),
            test_case.to_string(),
            "--config-file".to_string(),
            config_file.display().to_string(),
            "--output-dir".to_string(),
            output_dir.display().to_string(),
            format!("--intrusive={}", self.intrusive),
            "--log-level".to_string(),
            self.log_level.clone(),
        ]
    }

    /// Run one test case and wait for the tool to exit.
    ///
    /// A non-zero exit becomes `CertsuiteFailed`; scenarios expecting a
    /// failing verdict still get their reports since certsuite writes them
    /// before exiting.
    #[instrument(skip(self))]
    pub async fn launch(
        &self,
        test_case: &str,
        config_file: &Path,
        output_dir: &Path,
    ) -> Result<RunOutput> {
        tokio::fs::create_dir_all(output_dir).await?;

        let (program, args) = self.command_line(test_case, config_file, output_dir);
        info!(program = %program, "Launching certsuite");

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let (LaunchMode::Binary(_), Some(kubeconfig)) = (&self.mode, &self.kubeconfig) {
            cmd.env("KUBECONFIG", kubeconfig);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| QeError::timeout(format!("certsuite run of {}", test_case), self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stderr.is_empty() {
            warn!(stderr = %stderr, "certsuite stderr");
        }

        if output.status.success() {
            info!(test_case, "certsuite finished");
            Ok(RunOutput {
                stdout,
                stderr,
                output_dir: output_dir.to_path_buf(),
            })
        } else {
            error!(code = ?output.status.code(), "certsuite failed");
            Err(QeError::CertsuiteFailed {
                code: output.status.code(),
                stderr,
            })
        }
    }
}
