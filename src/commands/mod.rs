//! Command implementations

pub mod context;
pub mod diagnose;
pub mod health;
pub mod plan;

pub use context::*;
pub use diagnose::*;
pub use health::*;
pub use plan::*;

use std::sync::Arc;
use tracing::debug;

use crate::cli::Cli;
use crate::client::{resolve_context, KubeClient, KubectlClient};
use crate::config::{AppConfig, OutputFormat};
use crate::error::Result;

/// Everything a command needs, resolved once from flags and config
pub struct Runtime {
    pub config: AppConfig,
    pub client: Arc<dyn KubeClient>,
    pub namespace: Option<String>,
    pub output: OutputFormat,
}

impl Runtime {
    /// Flags win over the config file. An explicit `--context` must exist
    /// in the kubeconfig.
    pub fn from_cli(cli: &Cli, mut config: AppConfig) -> Result<Self> {
        let context = match cli.context.as_deref() {
            Some(name) => Some(resolve_context(Some(name))?),
            None => {
                if let Ok(current) = resolve_context(None) {
                    debug!("Using current context {}", current);
                }
                None
            }
        };

        if let Some(provider) = cli.provider {
            config.provider = provider;
        }

        let client = KubectlClient::new(
            config.kubectl_path.clone(),
            context,
            config.command_timeout(),
        );

        Ok(Self {
            output: cli.output.unwrap_or(config.default_output),
            namespace: cli.namespace.clone(),
            client: Arc::new(client),
            config,
        })
    }
}
