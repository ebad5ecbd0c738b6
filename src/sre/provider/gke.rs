//! Google Kubernetes Engine overlay

use regex::Regex;
use std::sync::LazyLock;

use super::{cli_args, CloudProvider, NodePool, ProviderOverlay};
use crate::sre::remediation::{
    PlanContext, RemediationHandler, RemediationRegistry, RemediationStep, Risk,
};
use crate::sre::status::ServiceAccountInfo;
use crate::sre::types::{EventRecord, Issue, IssueCategory};

pub const POOL_LABEL: &str = "cloud.google.com/gke-nodepool";

pub const GSA_ANNOTATION: &str = "iam.gke.io/gcp-service-account";

static GSA_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.iam\.gserviceaccount\.com$").expect("GSA pattern is valid")
});

/// Whether `value` looks like a Google service account email
pub fn is_gsa_email(value: &str) -> bool {
    GSA_EMAIL.is_match(value)
}

const IDENTITY_ANNOTATIONS: &[(&str, fn(&str) -> bool)] = &[(GSA_ANNOTATION, is_gsa_email)];

#[derive(Debug, Clone, Copy, Default)]
pub struct GkeOverlay;

impl ProviderOverlay for GkeOverlay {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Gke
    }

    fn pool_label_keys(&self) -> &'static [&'static str] {
        &[POOL_LABEL]
    }

    fn pool_category(&self) -> IssueCategory {
        IssueCategory::GkeNodePool
    }

    fn eviction_category(&self) -> IssueCategory {
        IssueCategory::Preemption
    }

    fn identity_category(&self) -> IssueCategory {
        IssueCategory::WorkloadIdentity
    }

    fn is_eviction_event(&self, event: &EventRecord) -> bool {
        // Pods get `Preempted` from scheduler priority preemption, which is
        // unrelated to VM reclaim
        if event.involved_kind != "Node" {
            return false;
        }
        event.reason.contains("Preempt") || event.message.to_lowercase().contains("preempt")
    }

    fn identity_annotations(&self) -> &'static [(&'static str, fn(&str) -> bool)] {
        IDENTITY_ANNOTATIONS
    }

    fn pool_suggestions(&self, pool: &NodePool) -> Vec<String> {
        vec![
            format!("Check the managed instance group behind node pool '{}'", pool.name),
            "Check node auto-repair status and recent node pool operations".into(),
        ]
    }

    fn eviction_suggestions(&self) -> Vec<String> {
        vec![
            "Spot and preemptible VMs are reclaimed with 30s notice; keep a standard pool for critical workloads".into(),
            "Set terminationGracePeriodSeconds below 30 on workloads scheduled to spot nodes".into(),
        ]
    }

    fn identity_suggestions(&self, sa: &ServiceAccountInfo, _key: &str) -> Vec<String> {
        vec![
            "Use the form NAME@PROJECT_ID.iam.gserviceaccount.com".into(),
            format!(
                "Grant roles/iam.workloadIdentityUser to member serviceAccount:PROJECT_ID.svc.id.goog[{}/{}]",
                sa.namespace, sa.name
            ),
        ]
    }

    fn register_remediation(&self, registry: &mut RemediationRegistry) {
        registry.register(RemediationHandler {
            category: IssueCategory::GkeNodePool,
            guidance: "Inspect and repair or resize the GKE node pool",
            build: node_pool_steps,
        });
        registry.register(RemediationHandler {
            category: IssueCategory::Preemption,
            guidance: "Move critical workloads off spot/preemptible node pools",
            build: preemption_steps,
        });
        registry.register(RemediationHandler {
            category: IssueCategory::WorkloadIdentity,
            guidance: "Fix the GSA annotation and IAM binding",
            build: identity_steps,
        });
    }
}

fn node_pool_steps(issue: &Issue, ctx: &PlanContext) -> Vec<RemediationStep> {
    let pool = issue.resource.name.as_str();
    let (cluster, location) = (ctx.cluster(), ctx.location());
    let total = issue
        .details
        .as_ref()
        .and_then(|d| d.get("total"))
        .and_then(|t| t.as_u64())
        .unwrap_or(1);
    let nodes = (total + 1).to_string();
    let pool_flags = [("--cluster", cluster.as_str()), ("--location", location.as_str())];

    let mut repair = cli_args(&["container", "node-pools", "update", pool], &pool_flags);
    repair.push("--enable-autorepair".into());

    vec![
        RemediationStep::manual(
            "describe-node-pool",
            format!("Show status and autoscaling settings of node pool '{}'", pool),
        )
        .with_command(
            "gcloud",
            cli_args(&["container", "node-pools", "describe", pool], &pool_flags),
        ),
        RemediationStep::manual("enable-auto-repair", "Let GKE recreate unhealthy nodes")
            .with_command("gcloud", repair)
            .with_risk(Risk::Medium),
        RemediationStep::manual(
            "resize-node-pool",
            "Add a node to restore capacity while broken nodes are replaced",
        )
        .with_command(
            "gcloud",
            cli_args(
                &["container", "clusters", "resize", cluster.as_str()],
                &[
                    ("--node-pool", pool),
                    ("--num-nodes", nodes.as_str()),
                    ("--location", location.as_str()),
                ],
            ),
        )
        .with_risk(Risk::Medium),
    ]
}

fn preemption_steps(_issue: &Issue, ctx: &PlanContext) -> Vec<RemediationStep> {
    let (cluster, location) = (ctx.cluster(), ctx.location());
    vec![
        RemediationStep::manual("list-preemptions", "List recent preemption events")
            .with_command("kubectl", ["get", "events", "-A", "--sort-by=.lastTimestamp"]),
        RemediationStep::manual(
            "add-standard-pool",
            "Add a standard (non-spot) node pool for workloads that cannot tolerate preemption",
        )
        .with_command(
            "gcloud",
            cli_args(
                &["container", "node-pools", "create", "standard-pool"],
                &[
                    ("--cluster", cluster.as_str()),
                    ("--location", location.as_str()),
                    ("--num-nodes", "1"),
                ],
            ),
        )
        .with_risk(Risk::Medium),
    ]
}

fn identity_steps(issue: &Issue, ctx: &PlanContext) -> Vec<RemediationStep> {
    let ksa = issue.resource.name.as_str();
    let ns = issue.resource.namespace.as_deref().unwrap_or("default");
    let project = ctx.project();
    let member = format!("serviceAccount:{}.svc.id.goog[{}/{}]", project, ns, ksa);
    let gsa = format!("<gsa-name>@{}.iam.gserviceaccount.com", project);
    let annotation = format!("{}={}", GSA_ANNOTATION, gsa);

    let mut annotate = cli_args(&["annotate", "serviceaccount", ksa], &[("-n", ns)]);
    annotate.extend(["--overwrite".to_string(), annotation]);

    vec![
        RemediationStep::manual(
            "inspect-service-account",
            "Review the iam.gke.io annotation on the service account",
        )
        .with_command("kubectl", ["get", "serviceaccount", ksa, "-n", ns, "-o", "yaml"]),
        RemediationStep::manual(
            "bind-workload-identity",
            "Allow the Kubernetes service account to impersonate the Google service account",
        )
        .with_command(
            "gcloud",
            cli_args(
                &["iam", "service-accounts", "add-iam-policy-binding", gsa.as_str()],
                &[
                    ("--role", "roles/iam.workloadIdentityUser"),
                    ("--member", member.as_str()),
                ],
            ),
        )
        .with_risk(Risk::Medium),
        RemediationStep::manual("fix-annotation", "Point the annotation at the Google service account")
            .with_command("kubectl", annotate)
            .with_risk(Risk::Low),
    ]
}
