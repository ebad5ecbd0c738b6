//! Human-readable rendering of reports, health summaries and plans

use owo_colors::{OwoColorize, Stream::Stdout};

use super::health::{ClusterHealthSummary, ComponentHealth};
use super::remediation::SrePlan;
use super::types::{DiagnosticReport, LogLevel, Severity};
use crate::output::{colorize_health, colorize_risk, colorize_severity, format_table_raw, truncate};

/// Terminal rendering of a diagnostic report
pub fn format_report_table(report: &DiagnosticReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", report.summary.if_supports_color(Stdout, |t| t.bold())));
    if let Some(provider) = report.provider {
        output.push_str(&format!("Provider: {}\n", provider));
    }
    output.push('\n');

    if report.issues.is_empty() {
        let clean = "No issues found".if_supports_color(Stdout, |t| t.green());
        output.push_str(&format!("{}\n", clean));
    } else {
        let rows: Vec<Vec<String>> = report
            .issues
            .iter()
            .map(|issue| {
                vec![
                    colorize_severity(issue.severity),
                    issue.category.to_string(),
                    truncate(&issue.resource.to_string(), 40),
                    truncate(&issue.message, 70),
                ]
            })
            .collect();
        output.push_str(&format_table_raw(
            &["SEVERITY", "CATEGORY", "RESOURCE", "MESSAGE"],
            &rows,
        ));
        output.push_str("\n\n");

        for issue in report.issues.iter().filter(|i| !i.suggestions.is_empty()) {
            output.push_str(&format!(
                "{} {}\n",
                "Fix:".if_supports_color(Stdout, |t| t.cyan()),
                issue.id.if_supports_color(Stdout, |t| t.dimmed())
            ));
            for suggestion in &issue.suggestions {
                output.push_str(&format!("  - {}\n", suggestion));
            }
        }
    }

    if !report.events.is_empty() {
        output.push_str(&format!("\n{}\n", "EVENTS".if_supports_color(Stdout, |t| t.bold())));
        let rows: Vec<Vec<String>> = report
            .events
            .iter()
            .map(|e| {
                vec![
                    e.event_type.clone(),
                    e.reason.clone(),
                    format!("{}/{}", e.involved_kind, e.involved_name),
                    e.count.to_string(),
                    truncate(&e.message, 70),
                ]
            })
            .collect();
        output.push_str(&format_table_raw(
            &["TYPE", "REASON", "OBJECT", "COUNT", "MESSAGE"],
            &rows,
        ));
        output.push('\n');
    }

    if !report.logs.is_empty() {
        output.push_str(&format!("\n{}\n", "LOGS".if_supports_color(Stdout, |t| t.bold())));
        for line in &report.logs {
            let text = match line.level {
                LogLevel::Error => line.line.if_supports_color(Stdout, |t| t.red()).to_string(),
                LogLevel::Warning => line.line.if_supports_color(Stdout, |t| t.yellow()).to_string(),
                LogLevel::Info => line.line.clone(),
            };
            output.push_str(&format!("{}\n", text));
        }
    }

    if report.skipped_items > 0 {
        output.push_str(&format!(
            "\n{} {} list item(s) could not be decoded and were not checked\n",
            "Note:".if_supports_color(Stdout, |t| t.yellow()),
            report.skipped_items
        ));
    }

    output
}

/// Markdown rendering of a diagnostic report
pub fn format_report_markdown(report: &DiagnosticReport) -> String {
    let mut output = String::new();

    output.push_str("# Kubernetes Diagnostic Report\n\n");
    output.push_str(&format!("**Scope:** {}\n", report.scope));
    if let Some(resource) = &report.resource {
        output.push_str(&format!("**Resource:** `{}`\n", resource));
    }
    if let Some(provider) = report.provider {
        output.push_str(&format!("**Provider:** {}\n", provider));
    }
    output.push_str(&format!(
        "**Generated:** {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("{}\n\n", report.summary));

    output.push_str("## Summary\n\n| Severity | Count |\n|----------|-------|\n");
    for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
        output.push_str(&format!("| {} | {} |\n", severity, report.count(severity)));
    }
    output.push('\n');

    for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
        let issues: Vec<_> = report.issues.iter().filter(|i| i.severity == severity).collect();
        if issues.is_empty() {
            continue;
        }
        output.push_str(&format!("## {} Issues\n\n", severity));
        for issue in issues {
            output.push_str(&format!("### {} ({})\n\n", issue.category, issue.resource.kind));
            output.push_str(&format!("**Resource:** `{}`\n\n", issue.resource.qualified_name()));
            output.push_str(&format!("{}\n\n", issue.message));
            for suggestion in &issue.suggestions {
                output.push_str(&format!("- {}\n", suggestion));
            }
            if !issue.suggestions.is_empty() {
                output.push('\n');
            }
        }
    }

    output
}

fn component_row(name: &str, component: &ComponentHealth) -> Vec<String> {
    vec![
        name.to_string(),
        colorize_health(component.status),
        format!("{:.1}", component.score),
        component.details.clone(),
    ]
}

/// Terminal rendering of a cluster health summary
pub fn format_health_table(summary: &ClusterHealthSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {} (score {:.1})\n\n",
        "Cluster health:".if_supports_color(Stdout, |t| t.bold()),
        colorize_health(summary.status),
        summary.score
    ));

    let rows = vec![
        component_row("nodes", &summary.nodes),
        component_row("workloads", &summary.workloads),
        component_row("storage", &summary.storage),
        component_row("network", &summary.network),
    ];
    output.push_str(&format_table_raw(&["COMPONENT", "STATUS", "SCORE", "DETAILS"], &rows));
    output.push_str("\n\n");

    output.push_str(&format!(
        "Pods: {} total, {} running, {} pending, {} failed\n",
        summary.pods.total, summary.pods.running, summary.pods.pending, summary.pods.failed
    ));
    output.push_str(&format!(
        "Issues: {} critical, {} warning\n",
        summary.critical_issues, summary.warning_issues
    ));
    for warning in &summary.warnings {
        output.push_str(&format!("{} {}\n", "Warning:".if_supports_color(Stdout, |t| t.yellow()), warning));
    }

    output
}

/// Markdown rendering of a cluster health summary
pub fn format_health_markdown(summary: &ClusterHealthSummary) -> String {
    let mut output = String::new();

    output.push_str("# Cluster Health\n\n");
    output.push_str(&format!(
        "**Status:** {}  \n**Score:** {:.1}\n\n",
        summary.status, summary.score
    ));
    output.push_str("| Component | Status | Score | Details |\n|-----------|--------|-------|---------|\n");
    for (name, c) in [
        ("Nodes", &summary.nodes),
        ("Workloads", &summary.workloads),
        ("Storage", &summary.storage),
        ("Network", &summary.network),
    ] {
        output.push_str(&format!("| {} | {} | {:.1} | {} |\n", name, c.status, c.score, c.details));
    }
    output.push_str(&format!(
        "\n**Issues:** {} critical, {} warning\n",
        summary.critical_issues, summary.warning_issues
    ));

    output
}

/// Terminal rendering of a remediation plan
pub fn format_plan_table(plan: &SrePlan) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", plan.summary.if_supports_color(Stdout, |t| t.bold())));
    if let Some(risk) = plan.highest_risk {
        output.push_str(&format!("Highest risk: {}\n", colorize_risk(risk)));
    }
    output.push('\n');

    for step in &plan.steps {
        let mode = if step.automated { "auto" } else { "manual" };
        output.push_str(&format!(
            "{:>3}. [{}] [{}] {}\n",
            step.order,
            colorize_risk(step.risk),
            mode,
            step.description
        ));
        if let Some(cmd) = step.command_line() {
            output.push_str(&format!("     {}\n", cmd.if_supports_color(Stdout, |t| t.cyan())));
        }
    }

    for note in &plan.notes {
        output.push_str(&format!("\n{} {}\n", "Note:".if_supports_color(Stdout, |t| t.yellow()), note));
    }

    output
}

/// Markdown rendering of a remediation plan
pub fn format_plan_markdown(plan: &SrePlan) -> String {
    let mut output = String::new();

    output.push_str("# Remediation Plan\n\n");
    output.push_str(&format!("{}\n\n", plan.summary));

    if !plan.steps.is_empty() {
        output.push_str("| # | Action | Risk | Automated | Command |\n|---|--------|------|-----------|---------|\n");
        for step in &plan.steps {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                step.order,
                step.description,
                step.risk,
                if step.automated { "yes" } else { "no" },
                step.command_line()
                    .map(|c| format!("`{}`", c))
                    .unwrap_or_default()
            ));
        }
        output.push('\n');
    }

    for note in &plan.notes {
        output.push_str(&format!("> {}\n", note));
    }

    output
}
