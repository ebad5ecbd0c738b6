//! Tests for remediation planning

use kubesre::sre::remediation::{
    PlanContext, RemediationHandler, RemediationPlanner, RemediationRegistry, RemediationStep,
    Risk,
};
use kubesre::sre::types::{
    DiagnosticReport, DiagnosticScope, Issue, IssueCategory, ResourceRef,
};
use serde_json::json;

fn report(issues: Vec<Issue>) -> DiagnosticReport {
    DiagnosticReport::new(DiagnosticScope::Namespace, issues)
}

fn crash_issue(ns: &str, pod: &str) -> Issue {
    Issue::new(
        IssueCategory::Crash,
        ResourceRef::pod(ns, pod),
        "app:waiting",
        "Container app is waiting: CrashLoopBackOff",
    )
    .with_details(json!({ "container": "app" }))
}

// ============================================================================
// Plan synthesis
// ============================================================================

#[test]
fn test_zero_issues_needs_no_remediation() {
    let planner = RemediationPlanner::default();
    let plan = planner.generate_remediation_plan(&report(Vec::new()));

    assert!(plan.steps.is_empty());
    assert!(plan.summary.contains("no remediation needed"), "{}", plan.summary);
    assert_eq!(plan.issues_addressed, 0);
    assert!(plan.highest_risk.is_none());
}

#[test]
fn test_crash_plan_starts_with_automated_pod_delete() {
    let planner = RemediationPlanner::default();
    let issue = crash_issue("shop", "api-7d9f");
    let plan = planner.generate_remediation_plan(&report(vec![issue.clone()]));

    let first = &plan.steps[0];
    assert_eq!(first.order, 1);
    assert!(first.automated);
    assert_eq!(first.risk, Risk::Low);
    assert_eq!(first.command.as_deref(), Some("kubectl"));
    assert_eq!(first.args, vec!["delete", "pod", "api-7d9f", "-n", "shop"]);
    assert!(first.is_pod_restart());
    assert_eq!(first.issue_id.as_deref(), Some(issue.id.as_str()));
}

#[test]
fn test_crash_plan_reads_previous_logs_of_container() {
    let planner = RemediationPlanner::default();
    let plan = planner.generate_remediation_plan(&report(vec![crash_issue("shop", "api")]));

    let logs = plan
        .steps
        .iter()
        .find(|s| s.action == "inspect-logs")
        .expect("log step");
    assert!(!logs.automated);
    assert_eq!(
        logs.command_line().unwrap(),
        "kubectl logs api --previous -c app -n shop"
    );
}

#[test]
fn test_deployment_crash_uses_rollout_restart() {
    let planner = RemediationPlanner::default();
    let issue = Issue::new(
        IssueCategory::Crash,
        ResourceRef::deployment("shop", "api"),
        "no-ready-replicas",
        "Deployment shop/api has 0/3 replicas ready",
    );
    let plan = planner.generate_remediation_plan(&report(vec![issue]));

    let restart = plan
        .steps
        .iter()
        .find(|s| s.automated)
        .expect("automated step");
    assert_eq!(restart.args[..3], ["rollout", "restart", "deployment/api"]);
    assert_eq!(restart.risk, Risk::Medium);
    assert!(!restart.is_pod_restart());
}

#[test]
fn test_order_is_strictly_increasing_across_issues() {
    let planner = RemediationPlanner::default();
    let issues = vec![
        crash_issue("shop", "a"),
        Issue::new(
            IssueCategory::NodePressure,
            ResourceRef::node("node-1"),
            "MemoryPressure",
            "Node node-1 is under memory pressure",
        ),
        Issue::new(
            IssueCategory::Storage,
            ResourceRef::new("PersistentVolumeClaim", Some("db"), "data"),
            "phase",
            "PersistentVolumeClaim db/data is Pending",
        ),
    ];
    let plan = planner.generate_remediation_plan(&report(issues));

    let orders: Vec<u32> = plan.steps.iter().map(|s| s.order).collect();
    let expected: Vec<u32> = (1..=plan.steps.len() as u32).collect();
    assert_eq!(orders, expected);
    assert_eq!(plan.issues_addressed, 3);
    assert_eq!(plan.highest_risk, Some(Risk::High));
}

#[test]
fn test_repeated_crash_issues_restart_pod_once() {
    let planner = RemediationPlanner::default();
    let restarts = Issue::new(
        IssueCategory::Crash,
        ResourceRef::pod("prod", "web-1"),
        "app:restarts",
        "Container app has restarted 10 times",
    )
    .with_details(json!({ "container": "app" }));
    let plan = planner.generate_remediation_plan(&report(vec![crash_issue("prod", "web-1"), restarts]));

    let restarts: Vec<_> = plan.steps.iter().filter(|s| s.is_pod_restart()).collect();
    assert_eq!(restarts.len(), 1);
    assert_eq!(
        restarts[0].command_line().as_deref(),
        Some("kubectl delete pod web-1 -n prod")
    );
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[1].order, 2);
    assert_eq!(plan.issues_addressed, 2);
}

#[test]
fn test_node_pressure_drain_is_high_risk() {
    let planner = RemediationPlanner::default();
    let issue = Issue::new(
        IssueCategory::NodePressure,
        ResourceRef::node("node-1"),
        "DiskPressure",
        "Node node-1 is under disk pressure",
    );
    let plan = planner.generate_remediation_plan(&report(vec![issue]));

    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].args, vec!["describe", "node", "node-1"]);
    assert_eq!(plan.steps[1].args[0], "drain");
    assert_eq!(plan.steps[1].risk, Risk::High);
}

#[test]
fn test_unmapped_issues_get_manual_investigation_note() {
    let planner = RemediationPlanner::new(RemediationRegistry::empty(), PlanContext::default());
    let plan = planner.generate_remediation_plan(&report(vec![crash_issue("shop", "a")]));

    assert!(plan.steps.is_empty());
    assert_eq!(plan.notes.len(), 1);
    assert!(plan.notes[0].contains("manual investigation"));
    assert_eq!(plan.issues_addressed, 0);
}

#[test]
fn test_core_registry_does_not_cover_provider_categories() {
    let planner = RemediationPlanner::new(RemediationRegistry::core(), PlanContext::default());
    let issue = Issue::new(
        IssueCategory::AksNodePool,
        ResourceRef::new("NodePool", None, "system"),
        "",
        "AKS node pool 'system' has 1/3 nodes ready",
    );
    let plan = planner.generate_remediation_plan(&report(vec![issue, crash_issue("shop", "a")]));

    assert_eq!(plan.issues_addressed, 1);
    assert_eq!(plan.notes.len(), 1);
    assert!(plan.steps.iter().all(|s| s.command.as_deref() == Some("kubectl")));
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_standard_registry_covers_every_category() {
    let registry = RemediationRegistry::standard();
    for category in IssueCategory::ALL {
        assert!(registry.contains(category), "missing handler for {}", category);
        assert!(registry.guidance(category).is_some());
    }
    assert_eq!(registry.len(), IssueCategory::ALL.len());
}

#[test]
fn test_core_registry_covers_generic_categories_only() {
    let registry = RemediationRegistry::core();
    for category in IssueCategory::ALL {
        assert_eq!(registry.contains(category), category.provider().is_none());
    }
}

fn custom_storage_steps(_issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    vec![RemediationStep::manual("page-storage-team", "Escalate to the storage on-call")]
}

#[test]
fn test_register_replaces_handler() {
    let mut registry = RemediationRegistry::core();
    registry.register(RemediationHandler {
        category: IssueCategory::Storage,
        guidance: "Escalate",
        build: custom_storage_steps,
    });
    let planner = RemediationPlanner::new(registry, PlanContext::default());
    let issue = Issue::new(
        IssueCategory::Storage,
        ResourceRef::new("PersistentVolumeClaim", Some("db"), "data"),
        "phase",
        "Pending",
    );
    let plan = planner.generate_remediation_plan(&report(vec![issue]));

    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].action, "page-storage-team");
    assert_eq!(planner.registry().guidance(IssueCategory::Storage), Some("Escalate"));
}

// ============================================================================
// Provider steps
// ============================================================================

#[test]
fn test_aks_node_pool_steps_use_plan_context() {
    let context = PlanContext {
        cluster_name: Some("prod-aks".into()),
        resource_group: Some("rg-prod".into()),
        ..Default::default()
    };
    let planner = RemediationPlanner::new(RemediationRegistry::standard(), context);
    let issue = Issue::new(
        IssueCategory::AksNodePool,
        ResourceRef::new("NodePool", None, "userpool"),
        "",
        "AKS node pool 'userpool' has 1/3 nodes ready",
    )
    .with_details(json!({ "pool": "userpool", "total": 3, "ready": 1 }));
    let plan = planner.generate_remediation_plan(&report(vec![issue]));

    assert!(plan.steps.iter().all(|s| s.command.as_deref() == Some("az")));
    let show = plan.steps[0].command_line().unwrap();
    assert!(show.contains("--resource-group rg-prod"));
    assert!(show.contains("--cluster-name prod-aks"));
    let scale = plan.steps.last().unwrap().command_line().unwrap();
    assert!(scale.ends_with("--node-count 4"), "{}", scale);
}

#[test]
fn test_provider_steps_pair_flags_with_values() {
    let context = PlanContext {
        cluster_name: Some("prod-aks".into()),
        resource_group: Some("rg-prod".into()),
        ..Default::default()
    };
    let planner = RemediationPlanner::new(RemediationRegistry::standard(), context);
    let issue = Issue::new(
        IssueCategory::AksNodePool,
        ResourceRef::new("NodePool", None, "userpool"),
        "",
        "AKS node pool 'userpool' has 1/3 nodes ready",
    );
    let plan = planner.generate_remediation_plan(&report(vec![issue]));

    assert_eq!(
        plan.steps[1].command_line().as_deref(),
        Some("az aks nodepool upgrade --resource-group rg-prod --cluster-name prod-aks --name userpool --node-image-only")
    );

    let issue = Issue::new(
        IssueCategory::WorkloadIdentity,
        ResourceRef::new("ServiceAccount", Some("shop"), "api"),
        "iam.gke.io/gcp-service-account",
        "malformed annotation",
    );
    let plan = RemediationPlanner::default().generate_remediation_plan(&report(vec![issue]));
    let annotate = plan.steps.last().unwrap();
    assert_eq!(
        annotate.args[..6],
        ["annotate", "serviceaccount", "api", "-n", "shop", "--overwrite"]
    );
}

#[test]
fn test_gke_identity_steps_fall_back_to_placeholders() {
    let planner = RemediationPlanner::default();
    let issue = Issue::new(
        IssueCategory::WorkloadIdentity,
        ResourceRef::new("ServiceAccount", Some("shop"), "api"),
        "iam.gke.io/gcp-service-account",
        "malformed annotation",
    );
    let plan = planner.generate_remediation_plan(&report(vec![issue]));

    let binding = plan
        .steps
        .iter()
        .find(|s| s.command.as_deref() == Some("gcloud"))
        .expect("gcloud step");
    let line = binding.command_line().unwrap();
    assert!(line.contains("roles/iam.workloadIdentityUser"));
    assert!(line.contains("<project-id>.svc.id.goog[shop/api]"), "{}", line);
}

#[test]
fn test_plan_context_placeholders() {
    let ctx = PlanContext::default();
    assert_eq!(ctx.cluster(), "<cluster-name>");
    assert_eq!(ctx.resource_group(), "<resource-group>");
    assert_eq!(ctx.project(), "<project-id>");
    assert_eq!(ctx.location(), "<location>");
}

#[test]
fn test_step_serializes_risk_lowercase() {
    let step = RemediationStep::automated("restart-pod", "Delete the pod")
        .with_command("kubectl", ["delete", "pod", "x"])
        .with_risk(Risk::Low);
    let value = serde_json::to_value(&step).unwrap();

    assert_eq!(value["risk"], "low");
    assert_eq!(value["automated"], true);
    assert!(value.get("issue_id").is_none());
}
