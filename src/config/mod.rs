//! Application configuration for kubesre

use crate::error::{Result, SreError};
use crate::sre::health::ScoringWeights;
use crate::sre::provider::ProviderChoice;
use crate::sre::remediation::PlanContext;
use crate::sre::DiagnosticsOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration stored in ~/.kubesre/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// kubectl binary to run
    #[serde(default = "default_kubectl")]
    pub kubectl_path: String,

    /// Per-call timeout for kubectl, in seconds
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,

    /// Log lines fetched for crash diagnostics
    #[serde(default = "default_log_tail")]
    pub log_tail_lines: usize,

    /// Events kept per report
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    /// Include raw collaborator errors in health warnings
    #[serde(default)]
    pub debug: bool,

    /// Provider overlay selection
    #[serde(default)]
    pub provider: ProviderChoice,

    /// Default output format
    #[serde(default)]
    pub default_output: OutputFormat,

    #[serde(default)]
    pub scoring: ScoringWeights,

    /// Cloud coordinates used in `az`/`gcloud` plan steps
    #[serde(default)]
    pub cloud: PlanContext,
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_log_tail() -> usize {
    100
}

fn default_max_events() -> usize {
    50
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            kubectl_path: default_kubectl(),
            command_timeout_secs: default_timeout(),
            log_tail_lines: default_log_tail(),
            max_events: default_max_events(),
            debug: false,
            provider: ProviderChoice::default(),
            default_output: OutputFormat::default(),
            scoring: ScoringWeights::default(),
            cloud: PlanContext::default(),
        }
    }
}

impl AppConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }

    pub fn diagnostics_options(&self) -> DiagnosticsOptions {
        DiagnosticsOptions {
            debug: self.debug,
            max_events: self.max_events,
            log_tail_lines: self.log_tail_lines,
            provider: self.provider,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Markdown,
}

/// Get the kubesre config directory (~/.kubesre)
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".kubesre"))
        .ok_or_else(|| SreError::Config("Could not determine home directory".to_string()))
}

/// Load application config from ~/.kubesre/config.toml
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_dir()?.join("config.toml"))
}

/// Load config from `path`, defaulting when the file does not exist
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        parse_config(&content)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
    toml::from_str(content).map_err(|e| SreError::Config(e.to_string()))
}
