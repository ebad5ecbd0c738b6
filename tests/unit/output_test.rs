//! Tests for output formatting and report rendering

use kubesre::output::{format_json, format_table_raw, format_yaml, strip_ansi_codes, truncate};
use kubesre::sre::health::{summarize, HealthInput, ScoringWeights};
use kubesre::sre::remediation::RemediationPlanner;
use kubesre::sre::report::{
    format_health_markdown, format_health_table, format_plan_markdown, format_plan_table,
    format_report_markdown, format_report_table,
};
use kubesre::sre::types::{DiagnosticReport, DiagnosticScope, Issue, IssueCategory, ResourceRef};

fn crash_report() -> DiagnosticReport {
    let issue = Issue::new(
        IssueCategory::Crash,
        ResourceRef::pod("shop", "api"),
        "phase",
        "Pod shop/api is in Failed phase",
    )
    .with_suggestion("Check pod events and container logs for the failure reason");
    let mut report = DiagnosticReport::new(DiagnosticScope::Resource, vec![issue]);
    report.resource = Some(ResourceRef::pod("shop", "api"));
    report.summary = "Pod shop/api has 1 issue(s): 1 critical, 0 warning".to_string();
    report
}

// ============================================================================
// Table helpers
// ============================================================================

#[test]
fn test_format_table_raw_aligns_columns() {
    let rows = vec![
        vec!["web".to_string(), "Running".to_string()],
        vec!["database".to_string(), "Pending".to_string()],
    ];
    let table = strip_ansi_codes(&format_table_raw(&["NAME", "STATUS"], &rows));
    let lines: Vec<_> = table.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "NAME      STATUS");
    assert_eq!(lines[1], "web       Running");
    assert_eq!(lines[2], "database  Pending");
}

#[test]
fn test_strip_ansi_codes() {
    assert_eq!(strip_ansi_codes("\x1b[31mred\x1b[0m"), "red");
    assert_eq!(strip_ansi_codes("plain"), "plain");
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long message", 10), "a very ...");
}

#[test]
fn test_format_json_and_yaml() {
    let report = crash_report();
    let json = format_json(&report, true).unwrap();
    assert!(json.contains("\"scope\": \"resource\""));

    let yaml = format_yaml(&report).unwrap();
    assert!(yaml.contains("scope: resource"));
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_report_table() {
    let table = strip_ansi_codes(&format_report_table(&crash_report()));

    assert!(table.starts_with("Pod shop/api has 1 issue(s)"));
    assert!(table.contains("SEVERITY"));
    assert!(table.contains("CRITICAL"));
    assert!(table.contains("Pod shop/api"));
    assert!(table.contains("  - Check pod events"));
}

#[test]
fn test_empty_report_table() {
    let mut report = DiagnosticReport::new(DiagnosticScope::Cluster, Vec::new());
    report.summary = "Cluster is healthy".into();
    report.skipped_items = 2;
    let table = strip_ansi_codes(&format_report_table(&report));

    assert!(table.contains("No issues found"));
    assert!(table.contains("2 list item(s) could not be decoded"));
}

#[test]
fn test_report_markdown() {
    let md = format_report_markdown(&crash_report());

    assert!(md.starts_with("# Kubernetes Diagnostic Report"));
    assert!(md.contains("**Resource:** `Pod shop/api`"));
    assert!(md.contains("| CRITICAL | 1 |"));
    assert!(md.contains("## CRITICAL Issues"));
    assert!(!md.contains("## WARNING Issues"));
}

// ============================================================================
// Health and plans
// ============================================================================

#[test]
fn test_health_renderings() {
    let summary = summarize(&HealthInput::default(), &ScoringWeights::default());

    let table = strip_ansi_codes(&format_health_table(&summary));
    assert!(table.contains("Cluster health: healthy"));
    assert!(table.contains("workloads"));

    let md = format_health_markdown(&summary);
    assert!(md.contains("**Status:** healthy"));
    assert!(md.contains("| Nodes | healthy | 100.0 |"));
}

#[test]
fn test_plan_renderings() {
    let plan = RemediationPlanner::default().generate_remediation_plan(&crash_report());

    let table = strip_ansi_codes(&format_plan_table(&plan));
    assert!(table.contains("  1. [low] [auto]"));
    assert!(table.contains("kubectl delete pod api -n shop"));

    let md = format_plan_markdown(&plan);
    assert!(md.starts_with("# Remediation Plan"));
    assert!(md.contains("`kubectl delete pod api -n shop`"));
    assert!(md.contains("| 1 |"));
}
