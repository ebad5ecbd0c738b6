//! Diagnose command implementation

use crate::cli::{DiagnoseArgs, Target};
use crate::commands::Runtime;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::{format_json, format_yaml};
use crate::sre::diagnostics::DEFAULT_NAMESPACE;
use crate::sre::report::{format_report_markdown, format_report_table};
use crate::sre::{DiagnosticReport, DiagnosticsManager, Severity};

/// Run the diagnosis a target asks for
pub async fn diagnose_target(
    manager: &DiagnosticsManager,
    target: &Target,
    namespace: Option<&str>,
) -> Result<DiagnosticReport> {
    match target {
        Target::Cluster => manager.diagnose_cluster().await,
        Target::Namespace { name } => {
            let ns = name
                .as_deref()
                .or(namespace)
                .unwrap_or(DEFAULT_NAMESPACE);
            manager.diagnose_namespace(ns).await
        }
        Target::Pod { name } => manager.diagnose_resource("pod", namespace, name).await,
        Target::Deployment { name } => {
            manager.diagnose_resource("deployment", namespace, name).await
        }
        Target::Node { name } => manager.diagnose_resource("node", None, name).await,
        Target::Resource { kind, name } => manager.diagnose_resource(kind, namespace, name).await,
    }
}

/// Execute diagnose command
pub async fn run_diagnose(runtime: &Runtime, args: &DiagnoseArgs) -> Result<()> {
    let manager = DiagnosticsManager::new(
        runtime.client.clone(),
        runtime.config.diagnostics_options(),
    );

    let mut report = diagnose_target(&manager, &args.target, runtime.namespace.as_deref()).await?;
    if let Some(filter) = args.severity {
        report.retain_severity(Severity::from(filter));
    }

    print_report(&report, runtime.output)
}

pub fn print_report(report: &DiagnosticReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", format_json(report, true)?),
        OutputFormat::Yaml => println!("{}", format_yaml(report)?),
        OutputFormat::Markdown => println!("{}", format_report_markdown(report)),
        OutputFormat::Table => println!("{}", format_report_table(report)),
    }
    Ok(())
}
