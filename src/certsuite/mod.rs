//! The certification tool: its configuration file and its launcher

mod config;
mod runner;

pub use config::{CertsuiteConfig, CrdFilter, KernelTaint, NamedRef, NamespacedRef, CONFIG_FILE_NAME};
pub use runner::{CertsuiteRunner, LaunchMode, RunOutput};
