//! Tests for the issue taxonomy and report types

use kubesre::sre::types::{
    DiagnosticReport, DiagnosticScope, ExitCodeInfo, Issue, IssueCategory, ResourceRef, Severity,
};
use std::collections::HashSet;

// ============================================================================
// Severity
// ============================================================================

#[test]
fn test_severity_ordering() {
    assert!(Severity::Critical < Severity::Warning);
    assert!(Severity::Warning < Severity::Info);
    assert!(Severity::Critical.at_least(Severity::Warning));
    assert!(Severity::Warning.at_least(Severity::Warning));
    assert!(!Severity::Info.at_least(Severity::Warning));
}

#[test]
fn test_severity_display_and_serde() {
    assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
    let parsed: Severity = serde_json::from_str("\"info\"").unwrap();
    assert_eq!(parsed, Severity::Info);
}

// ============================================================================
// Categories
// ============================================================================

#[test]
fn test_category_slugs_are_unique() {
    let slugs: HashSet<_> = IssueCategory::ALL.iter().map(|c| c.slug()).collect();
    assert_eq!(slugs.len(), IssueCategory::ALL.len());
}

#[test]
fn test_generic_categories_have_no_provider() {
    let generic: Vec<_> = IssueCategory::ALL
        .iter()
        .filter(|c| c.provider().is_none())
        .collect();
    assert_eq!(generic.len(), 10);
}

#[test]
fn test_default_severities() {
    assert_eq!(IssueCategory::Crash.default_severity(), Severity::Critical);
    assert_eq!(IssueCategory::Storage.default_severity(), Severity::Warning);
    assert_eq!(IssueCategory::Preemption.default_severity(), Severity::Info);
}

#[test]
fn test_category_serde_snake_case() {
    assert_eq!(
        serde_json::to_string(&IssueCategory::ImagePull).unwrap(),
        "\"image_pull\""
    );
    assert_eq!(
        serde_json::to_string(&IssueCategory::AksNodePool).unwrap(),
        "\"aks_node_pool\""
    );
}

// ============================================================================
// Resource references and issues
// ============================================================================

#[test]
fn test_resource_ref_display() {
    assert_eq!(ResourceRef::pod("shop", "web").to_string(), "Pod shop/web");
    assert_eq!(ResourceRef::node("n1").to_string(), "Node n1");
    assert_eq!(ResourceRef::new("Pod", Some(""), "x").namespace, None);
}

#[test]
fn test_issue_id_is_deterministic() {
    let a = Issue::new(IssueCategory::Crash, ResourceRef::pod("shop", "web"), "App:Restarts", "one");
    let b = Issue::new(IssueCategory::Crash, ResourceRef::pod("shop", "web"), "App:Restarts", "two");

    assert_eq!(a.id, b.id);
    assert_eq!(a.id, "pod/shop/web:crash:app:restarts");
    assert_eq!(
        Issue::new(IssueCategory::NodePressure, ResourceRef::node("n1"), "", "x").id,
        "node/-/n1:node-pressure"
    );
}

#[test]
fn test_issue_builders() {
    let issue = Issue::new(IssueCategory::Pending, ResourceRef::pod("a", "b"), "", "waiting")
        .with_severity(Severity::Info)
        .with_suggestion("first")
        .with_suggestions(["second", "third"]);

    assert_eq!(issue.severity, Severity::Info);
    assert_eq!(issue.suggestions, vec!["first", "second", "third"]);
}

#[test]
fn test_issue_serializes_flat_resource() {
    let issue = Issue::new(IssueCategory::Crash, ResourceRef::pod("shop", "web"), "", "boom");
    let value = serde_json::to_value(&issue).unwrap();

    assert_eq!(value["resource_type"], "Pod");
    assert_eq!(value["resource_name"], "web");
    assert_eq!(value["namespace"], "shop");
    assert_eq!(value["category"], "crash");
    assert!(value.get("details").is_none());
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_report_counts_and_filters() {
    let issues = vec![
        Issue::new(IssueCategory::Crash, ResourceRef::pod("a", "1"), "", "c"),
        Issue::new(IssueCategory::Pending, ResourceRef::pod("a", "2"), "", "w"),
        Issue::new(IssueCategory::SpotEviction, ResourceRef::node("n"), "", "i"),
    ];
    let mut report = DiagnosticReport::new(DiagnosticScope::Cluster, issues);

    assert_eq!(report.critical_count(), 1);
    assert_eq!(report.warning_count(), 1);
    assert_eq!(report.count(Severity::Info), 1);
    assert!(report.has_crash_issue());
    assert_eq!(report.filter_by_severity(Severity::Warning).len(), 2);

    report.retain_severity(Severity::Critical);
    assert_eq!(report.issues.len(), 1);
}

#[test]
fn test_scope_serde() {
    assert_eq!(serde_json::to_string(&DiagnosticScope::Namespace).unwrap(), "\"namespace\"");
    assert_eq!(DiagnosticScope::Resource.to_string(), "resource");
}

#[test]
fn test_exit_code_analysis() {
    let oom = ExitCodeInfo::analyze(137);
    assert_eq!(oom.signal.as_deref(), Some("Signal 9"));
    assert!(oom.meaning.contains("SIGKILL"));
    assert!(ExitCodeInfo::analyze(1).signal.is_none());
}
