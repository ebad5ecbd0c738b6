//! Azure Kubernetes Service overlay

use regex::Regex;
use std::sync::LazyLock;

use super::{cli_args, CloudProvider, NodePool, ProviderOverlay};
use crate::sre::remediation::{
    PlanContext, RemediationHandler, RemediationRegistry, RemediationStep, Risk,
};
use crate::sre::status::ServiceAccountInfo;
use crate::sre::types::{EventRecord, Issue, IssueCategory};

pub const POOL_LABEL: &str = "kubernetes.azure.com/agentpool";
const LEGACY_POOL_LABEL: &str = "agentpool";

pub const CLIENT_ID_ANNOTATION: &str = "azure.workload.identity/client-id";
pub const TENANT_ID_ANNOTATION: &str = "azure.workload.identity/tenant-id";

static GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("GUID pattern is valid")
});

/// Whether `value` is a GUID, as Azure client and tenant IDs are
pub fn is_guid(value: &str) -> bool {
    GUID.is_match(value)
}

const IDENTITY_ANNOTATIONS: &[(&str, fn(&str) -> bool)] = &[
    (CLIENT_ID_ANNOTATION, is_guid),
    (TENANT_ID_ANNOTATION, is_guid),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct AksOverlay;

impl ProviderOverlay for AksOverlay {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aks
    }

    fn pool_label_keys(&self) -> &'static [&'static str] {
        &[POOL_LABEL, LEGACY_POOL_LABEL]
    }

    fn pool_category(&self) -> IssueCategory {
        IssueCategory::AksNodePool
    }

    fn eviction_category(&self) -> IssueCategory {
        IssueCategory::SpotEviction
    }

    fn identity_category(&self) -> IssueCategory {
        IssueCategory::ManagedIdentity
    }

    fn is_eviction_event(&self, event: &EventRecord) -> bool {
        if event.involved_kind != "Node" {
            return false;
        }
        // Spot nodes get a PreemptScheduled event from the scheduled-events
        // monitor before the VM is reclaimed.
        if event.reason == "PreemptScheduled" || event.reason == "SpotEviction" {
            return true;
        }
        event.reason.contains("Evict") && event.message.to_lowercase().contains("spot")
    }

    fn identity_annotations(&self) -> &'static [(&'static str, fn(&str) -> bool)] {
        IDENTITY_ANNOTATIONS
    }

    fn pool_suggestions(&self, pool: &NodePool) -> Vec<String> {
        vec![
            format!("Check the VM scale set instances behind node pool '{}'", pool.name),
            "Look for failed node image upgrades or quota errors in the Azure activity log".into(),
        ]
    }

    fn eviction_suggestions(&self) -> Vec<String> {
        vec![
            "Spot node pools can be reclaimed at any time; keep a regular pool for critical workloads".into(),
            "Add PodDisruptionBudgets and spread replicas across pools".into(),
        ]
    }

    fn identity_suggestions(&self, sa: &ServiceAccountInfo, key: &str) -> Vec<String> {
        vec![
            format!("Set '{}' to the GUID of the user-assigned managed identity", key),
            format!(
                "Ensure a federated credential exists for subject system:serviceaccount:{}:{}",
                sa.namespace, sa.name
            ),
        ]
    }

    fn register_remediation(&self, registry: &mut RemediationRegistry) {
        registry.register(RemediationHandler {
            category: IssueCategory::AksNodePool,
            guidance: "Inspect and repair or scale the AKS node pool",
            build: node_pool_steps,
        });
        registry.register(RemediationHandler {
            category: IssueCategory::SpotEviction,
            guidance: "Move critical workloads off spot node pools",
            build: spot_eviction_steps,
        });
        registry.register(RemediationHandler {
            category: IssueCategory::ManagedIdentity,
            guidance: "Fix the workload identity annotation and federated credential",
            build: identity_steps,
        });
    }
}

fn node_pool_steps(issue: &Issue, ctx: &PlanContext) -> Vec<RemediationStep> {
    let pool = issue.resource.name.as_str();
    let (rg, cluster) = (ctx.resource_group(), ctx.cluster());
    let total = issue
        .details
        .as_ref()
        .and_then(|d| d.get("total"))
        .and_then(|t| t.as_u64())
        .unwrap_or(1);
    let nodes = (total + 1).to_string();
    let pool_flags = [
        ("--resource-group", rg.as_str()),
        ("--cluster-name", cluster.as_str()),
        ("--name", pool),
    ];

    let mut reimage = cli_args(&["aks", "nodepool", "upgrade"], &pool_flags);
    reimage.push("--node-image-only".into());
    let mut scale = cli_args(&["aks", "nodepool", "scale"], &pool_flags);
    scale.extend(["--node-count".to_string(), nodes]);

    vec![
        RemediationStep::manual(
            "describe-node-pool",
            format!("Show provisioning state and power state of node pool '{}'", pool),
        )
        .with_command("az", cli_args(&["aks", "nodepool", "show"], &pool_flags)),
        RemediationStep::manual(
            "reimage-node-pool",
            "Reimage the pool's nodes with the latest node image",
        )
        .with_command("az", reimage)
        .with_risk(Risk::Medium),
        RemediationStep::manual(
            "scale-node-pool",
            "Add a node to restore capacity while broken nodes are replaced",
        )
        .with_command("az", scale)
        .with_risk(Risk::Medium),
    ]
}

fn spot_eviction_steps(_issue: &Issue, ctx: &PlanContext) -> Vec<RemediationStep> {
    let (rg, cluster) = (ctx.resource_group(), ctx.cluster());
    vec![
        RemediationStep::manual("list-evictions", "List recent spot preemption events")
            .with_command(
                "kubectl",
                ["get", "events", "-A", "--field-selector", "reason=PreemptScheduled"],
            ),
        RemediationStep::manual(
            "add-regular-pool",
            "Add a regular-priority node pool for workloads that cannot tolerate eviction",
        )
        .with_command(
            "az",
            cli_args(
                &["aks", "nodepool", "add"],
                &[
                    ("--resource-group", rg.as_str()),
                    ("--cluster-name", cluster.as_str()),
                    ("--name", "regular"),
                    ("--priority", "Regular"),
                    ("--node-count", "1"),
                ],
            ),
        )
        .with_risk(Risk::Medium),
    ]
}

fn identity_steps(issue: &Issue, ctx: &PlanContext) -> Vec<RemediationStep> {
    let sa = issue.resource.name.as_str();
    let ns = issue.resource.namespace.as_deref().unwrap_or("default");
    let rg = ctx.resource_group();
    let subject = format!("system:serviceaccount:{}:{}", ns, sa);
    let credential = format!("{}-federated", sa);
    vec![
        RemediationStep::manual(
            "inspect-service-account",
            "Review the workload identity annotations on the service account",
        )
        .with_command("kubectl", ["get", "serviceaccount", sa, "-n", ns, "-o", "yaml"]),
        RemediationStep::manual(
            "lookup-identity",
            "Look up the managed identity's client ID to put in the annotation",
        )
        .with_command(
            "az",
            cli_args(
                &["identity", "show"],
                &[
                    ("--name", "<identity-name>"),
                    ("--resource-group", rg.as_str()),
                    ("--query", "clientId"),
                ],
            ),
        ),
        RemediationStep::manual(
            "create-federated-credential",
            "Federate the managed identity with the service account",
        )
        .with_command(
            "az",
            cli_args(
                &["identity", "federated-credential", "create"],
                &[
                    ("--name", credential.as_str()),
                    ("--identity-name", "<identity-name>"),
                    ("--resource-group", rg.as_str()),
                    ("--issuer", "<oidc-issuer-url>"),
                    ("--subject", subject.as_str()),
                ],
            ),
        )
        .with_risk(Risk::Medium),
    ]
}
