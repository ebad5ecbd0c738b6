//! Health command implementation

use crate::commands::Runtime;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::{format_json, format_yaml};
use crate::sre::report::{format_health_markdown, format_health_table};
use crate::sre::HealthManager;

/// Execute health command
pub async fn run_health(runtime: &Runtime) -> Result<()> {
    let manager = HealthManager::new(
        runtime.client.clone(),
        runtime.config.scoring,
        runtime.config.debug,
    );
    let summary = manager.get_cluster_health().await?;

    match runtime.output {
        OutputFormat::Json => println!("{}", format_json(&summary, true)?),
        OutputFormat::Yaml => println!("{}", format_yaml(&summary)?),
        OutputFormat::Markdown => println!("{}", format_health_markdown(&summary)),
        OutputFormat::Table => println!("{}", format_health_table(&summary)),
    }
    Ok(())
}
