//! Managed-cluster provider overlays
//!
//! Each overlay contributes extra issue categories and their remediation
//! entries. The detection shape (node pool readiness, eviction events,
//! workload identity annotations) is shared; overlays only supply the
//! provider-specific keys and wording.

pub mod aks;
pub mod gke;

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use super::remediation::RemediationRegistry;
use super::status::{NodeStatus, ServiceAccountInfo};
use super::types::{EventRecord, Issue, IssueCategory, ResourceRef, Severity};

/// Managed Kubernetes offering a cluster runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aks,
    Gke,
    Eks,
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudProvider::Aks => write!(f, "AKS"),
            CloudProvider::Gke => write!(f, "GKE"),
            CloudProvider::Eks => write!(f, "EKS"),
        }
    }
}

/// Which overlay to apply: detected from nodes, forced, or disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    #[default]
    Auto,
    Aks,
    Gke,
    None,
}

impl FromStr for ProviderChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ProviderChoice::Auto),
            "aks" | "azure" => Ok(ProviderChoice::Aks),
            "gke" | "gcp" => Ok(ProviderChoice::Gke),
            "none" | "off" => Ok(ProviderChoice::None),
            other => Err(format!(
                "unknown provider '{}' (expected auto, aks, gke or none)",
                other
            )),
        }
    }
}

impl ProviderChoice {
    /// Resolve against the cluster's nodes
    pub fn resolve(&self, nodes: &[NodeStatus]) -> Option<CloudProvider> {
        match self {
            ProviderChoice::Auto => detect_provider(nodes),
            ProviderChoice::Aks => Some(CloudProvider::Aks),
            ProviderChoice::Gke => Some(CloudProvider::Gke),
            ProviderChoice::None => None,
        }
    }
}

/// Detect the managed provider from node provider IDs and labels
pub fn detect_provider(nodes: &[NodeStatus]) -> Option<CloudProvider> {
    for node in nodes {
        if node.provider_id.starts_with("azure://") {
            return Some(CloudProvider::Aks);
        }
        if node.provider_id.starts_with("gce://") {
            return Some(CloudProvider::Gke);
        }
        if node.provider_id.starts_with("aws://") {
            return Some(CloudProvider::Eks);
        }

        let has = |key: &str| node.labels.contains_key(key);
        if has("kubernetes.azure.com/agentpool")
            || has("kubernetes.azure.com/cluster")
            || has("kubernetes.azure.com/mode")
            || has("agentpool")
        {
            return Some(CloudProvider::Aks);
        }
        if has("cloud.google.com/gke-nodepool") || has("cloud.google.com/gke-os-distribution") {
            return Some(CloudProvider::Gke);
        }
        if has("eks.amazonaws.com/nodegroup") {
            return Some(CloudProvider::Eks);
        }
    }
    None
}

/// Readiness of one node pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePool {
    pub name: String,
    pub total: usize,
    pub ready: usize,
    pub nodes: Vec<String>,
}

impl NodePool {
    pub fn ready_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.ready as f64 * 100.0 / self.total as f64
    }
}

/// Group nodes by the first label key present. Nodes with none of the keys
/// are left out.
pub fn group_node_pools(nodes: &[NodeStatus], label_keys: &[&str]) -> BTreeMap<String, NodePool> {
    let mut pools: BTreeMap<String, NodePool> = BTreeMap::new();
    for node in nodes {
        let Some(pool) = label_keys.iter().find_map(|k| node.label(k)) else {
            continue;
        };
        let entry = pools.entry(pool.to_string()).or_insert_with(|| NodePool {
            name: pool.to_string(),
            total: 0,
            ready: 0,
            nodes: Vec::new(),
        });
        entry.total += 1;
        if node.ready {
            entry.ready += 1;
        }
        entry.nodes.push(node.name.clone());
    }
    pools
}

/// Cluster facts an overlay inspects
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayInput<'a> {
    pub nodes: &'a [NodeStatus],
    pub events: &'a [EventRecord],
    pub service_accounts: &'a [ServiceAccountInfo],
}

/// A provider overlay. Implementors supply the keys and wording; the
/// provided `detect` runs the shared checks.
pub trait ProviderOverlay: Send + Sync {
    fn provider(&self) -> CloudProvider;

    /// Node label keys naming the pool, most specific first
    fn pool_label_keys(&self) -> &'static [&'static str];

    fn pool_category(&self) -> IssueCategory;

    /// Category for spot/preemptible node loss
    fn eviction_category(&self) -> IssueCategory;

    fn identity_category(&self) -> IssueCategory;

    /// Whether an event reports the loss of a spot/preemptible node. Only
    /// events on Node objects qualify.
    fn is_eviction_event(&self, event: &EventRecord) -> bool;

    /// Service account annotation keys checked for workload identity, each
    /// with its validator
    fn identity_annotations(&self) -> &'static [(&'static str, fn(&str) -> bool)];

    fn pool_suggestions(&self, pool: &NodePool) -> Vec<String>;

    fn eviction_suggestions(&self) -> Vec<String>;

    fn identity_suggestions(&self, sa: &ServiceAccountInfo, key: &str) -> Vec<String>;

    fn register_remediation(&self, registry: &mut RemediationRegistry);

    /// Categories this overlay owns
    fn categories(&self) -> [IssueCategory; 3] {
        [
            self.pool_category(),
            self.eviction_category(),
            self.identity_category(),
        ]
    }

    fn detect(&self, input: &OverlayInput<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        issues.extend(self.detect_node_pools(input.nodes));
        issues.extend(self.detect_evictions(input.nodes, input.events));
        issues.extend(self.detect_identity(input.service_accounts));
        issues
    }

    fn detect_node_pools(&self, nodes: &[NodeStatus]) -> Vec<Issue> {
        group_node_pools(nodes, self.pool_label_keys())
            .into_values()
            .filter(|pool| pool.ready < pool.total)
            .map(|pool| {
                let severity = if pool.ready == 0 {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                Issue::new(
                    self.pool_category(),
                    ResourceRef::new("NodePool", None, pool.name.as_str()),
                    "",
                    format!(
                        "{} node pool '{}' has {}/{} nodes ready ({:.0}%)",
                        self.provider(),
                        pool.name,
                        pool.ready,
                        pool.total,
                        pool.ready_percent()
                    ),
                )
                .with_severity(severity)
                .with_details(json!({
                    "pool": pool.name,
                    "total": pool.total,
                    "ready": pool.ready,
                    "nodes": pool.nodes,
                }))
                .with_suggestions(self.pool_suggestions(&pool))
            })
            .collect()
    }

    /// One issue per pool that lost nodes; events whose node has no known
    /// pool are reported against the cluster.
    fn detect_evictions(&self, nodes: &[NodeStatus], events: &[EventRecord]) -> Vec<Issue> {
        let node_pool: HashMap<&str, &str> = nodes
            .iter()
            .filter_map(|n| {
                self.pool_label_keys()
                    .iter()
                    .find_map(|k| n.label(k))
                    .map(|pool| (n.name.as_str(), pool))
            })
            .collect();

        let mut counts: BTreeMap<Option<&str>, i32> = BTreeMap::new();
        for event in events.iter().filter(|e| self.is_eviction_event(e)) {
            let pool = if event.involved_kind == "Node" {
                node_pool.get(event.involved_name.as_str()).copied()
            } else {
                None
            };
            *counts.entry(pool).or_default() += event.count.max(1);
        }

        counts
            .into_iter()
            .map(|(pool, count)| {
                let resource = match pool {
                    Some(name) => ResourceRef::new("NodePool", None, name),
                    None => ResourceRef::new("Cluster", None, "cluster"),
                };
                let scope = pool
                    .map(|p| format!("node pool '{}'", p))
                    .unwrap_or_else(|| "the cluster".to_string());
                Issue::new(
                    self.eviction_category(),
                    resource,
                    "",
                    format!("{} eviction event(s) recorded for {}", count, scope),
                )
                .with_details(json!({ "events": count, "pool": pool }))
                .with_suggestions(self.eviction_suggestions())
            })
            .collect()
    }

    fn detect_identity(&self, service_accounts: &[ServiceAccountInfo]) -> Vec<Issue> {
        let mut issues = Vec::new();
        for sa in service_accounts {
            for (key, valid) in self.identity_annotations() {
                let Some(value) = sa.annotations.get(*key) else {
                    continue;
                };
                if valid(value.trim()) {
                    continue;
                }
                issues.push(
                    Issue::new(
                        self.identity_category(),
                        ResourceRef::new("ServiceAccount", Some(sa.namespace.as_str()), sa.name.as_str()),
                        key,
                        format!(
                            "ServiceAccount {}/{} has a malformed '{}' annotation: '{}'",
                            sa.namespace, sa.name, key, value
                        ),
                    )
                    .with_details(json!({ "annotation": key, "value": value }))
                    .with_suggestions(self.identity_suggestions(sa, key)),
                );
            }
        }
        issues
    }
}

/// Cloud CLI arguments: the subcommand words followed by each
/// `flag value` pair in order
fn cli_args(subcommand: &[&str], flags: &[(&str, &str)]) -> Vec<String> {
    subcommand
        .iter()
        .map(|s| s.to_string())
        .chain(
            flags
                .iter()
                .flat_map(|(flag, value)| [flag.to_string(), value.to_string()]),
        )
        .collect()
}

/// All built-in overlays
pub fn overlays() -> Vec<Box<dyn ProviderOverlay>> {
    vec![Box::new(aks::AksOverlay), Box::new(gke::GkeOverlay)]
}

/// Overlay for a provider, if it has one
pub fn overlay_for(provider: CloudProvider) -> Option<Box<dyn ProviderOverlay>> {
    match provider {
        CloudProvider::Aks => Some(Box::new(aks::AksOverlay)),
        CloudProvider::Gke => Some(Box::new(gke::GkeOverlay)),
        CloudProvider::Eks => None,
    }
}
