//! Plan command implementation

use owo_colors::{OwoColorize, Stream::Stderr};
use std::io::{BufRead, Write};

use crate::cli::PlanArgs;
use crate::commands::{diagnose_target, Runtime};
use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::{format_json, format_yaml};
use crate::sre::diagnostics::DEFAULT_NAMESPACE;
use crate::sre::remediation::RemediationStep;
use crate::sre::report::{format_plan_markdown, format_plan_table};
use crate::sre::{DiagnosticsManager, RemediationPlanner, RemediationRegistry, Severity};

/// Execute plan command
pub async fn run_plan(runtime: &Runtime, args: &PlanArgs) -> Result<()> {
    let manager = DiagnosticsManager::new(
        runtime.client.clone(),
        runtime.config.diagnostics_options(),
    );

    let mut report = diagnose_target(&manager, &args.target, runtime.namespace.as_deref()).await?;
    if let Some(filter) = args.severity {
        report.retain_severity(Severity::from(filter));
    }

    let planner = RemediationPlanner::new(
        RemediationRegistry::standard(),
        runtime.config.cloud.clone(),
    );
    let plan = planner.generate_remediation_plan(&report);

    match runtime.output {
        OutputFormat::Json => println!("{}", format_json(&plan, true)?),
        OutputFormat::Yaml => println!("{}", format_yaml(&plan)?),
        OutputFormat::Markdown => println!("{}", format_plan_markdown(&plan)),
        OutputFormat::Table => println!("{}", format_plan_table(&plan)),
    }

    if !args.restart_pods {
        return Ok(());
    }

    let targets: Vec<(String, String)> = plan.automated_steps().filter_map(restart_target).collect();
    if targets.is_empty() {
        eprintln!("No automated pod restarts in this plan");
        return Ok(());
    }

    if !args.yes && !confirm(&targets)? {
        eprintln!("Aborted");
        return Ok(());
    }

    for (namespace, name) in &targets {
        match manager.restart_pod(namespace, name).await {
            Ok(_) => eprintln!(
                "{} pod {}/{}",
                "Restarted".if_supports_color(Stderr, |t| t.green()),
                namespace,
                name
            ),
            Err(e) => eprintln!(
                "{} pod {}/{}: {}",
                "Failed to restart".if_supports_color(Stderr, |t| t.red()),
                namespace,
                name,
                e
            ),
        }
    }

    Ok(())
}

/// (namespace, pod) for a `kubectl delete pod NAME [-n NS]` step
pub fn restart_target(step: &RemediationStep) -> Option<(String, String)> {
    if !step.is_pod_restart() {
        return None;
    }
    let name = step.args.get(2)?.clone();
    let namespace = step
        .args
        .iter()
        .position(|a| a == "-n")
        .and_then(|i| step.args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    Some((namespace, name))
}

fn confirm(targets: &[(String, String)]) -> Result<bool> {
    eprintln!("The following pods will be deleted and recreated by their controllers:");
    for (namespace, name) in targets {
        eprintln!("  {}/{}", namespace, name);
    }
    eprint!("Proceed? [y/N] ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
