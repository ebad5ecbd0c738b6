//! Cluster health scoring
//!
//! Each component (nodes, workloads, storage, network) gets a 0-100 score
//! from its resource ratio minus per-issue penalties. The overall score is a
//! weighted blend of the four, less a penalty per critical/warning issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::detector;
use super::status::{self, NodeStatus, PodStatus, PvcStatus, ServiceStatus};
use super::types::{Issue, Severity};
use crate::client::KubeClient;
use crate::error::Result;

pub const NODE_WEIGHT: f64 = 0.30;
pub const WORKLOAD_WEIGHT: f64 = 0.40;
pub const STORAGE_WEIGHT: f64 = 0.15;
pub const NETWORK_WEIGHT: f64 = 0.15;

pub const NODE_CRITICAL_PENALTY: f64 = 20.0;
pub const NODE_WARNING_PENALTY: f64 = 5.0;
pub const WORKLOAD_CRITICAL_PENALTY: f64 = 10.0;
pub const WORKLOAD_WARNING_PENALTY: f64 = 3.0;
pub const STORAGE_PENDING_PENALTY: f64 = 10.0;
pub const NETWORK_PENDING_PENALTY: f64 = 5.0;
pub const OVERALL_CRITICAL_PENALTY: f64 = 5.0;
pub const OVERALL_WARNING_PENALTY: f64 = 1.0;

/// Below this a component is critical
pub const CRITICAL_THRESHOLD: f64 = 50.0;
/// Below this a component (or the cluster) is degraded
pub const DEGRADED_THRESHOLD: f64 = 80.0;

/// Scoring weights and penalties; every field defaults to the constants above
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub node_weight: f64,
    pub workload_weight: f64,
    pub storage_weight: f64,
    pub network_weight: f64,
    pub node_critical_penalty: f64,
    pub node_warning_penalty: f64,
    pub workload_critical_penalty: f64,
    pub workload_warning_penalty: f64,
    pub storage_pending_penalty: f64,
    pub network_pending_penalty: f64,
    pub overall_critical_penalty: f64,
    pub overall_warning_penalty: f64,
    pub critical_threshold: f64,
    pub degraded_threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            node_weight: NODE_WEIGHT,
            workload_weight: WORKLOAD_WEIGHT,
            storage_weight: STORAGE_WEIGHT,
            network_weight: NETWORK_WEIGHT,
            node_critical_penalty: NODE_CRITICAL_PENALTY,
            node_warning_penalty: NODE_WARNING_PENALTY,
            workload_critical_penalty: WORKLOAD_CRITICAL_PENALTY,
            workload_warning_penalty: WORKLOAD_WARNING_PENALTY,
            storage_pending_penalty: STORAGE_PENDING_PENALTY,
            network_pending_penalty: NETWORK_PENDING_PENALTY,
            overall_critical_penalty: OVERALL_CRITICAL_PENALTY,
            overall_warning_penalty: OVERALL_WARNING_PENALTY,
            critical_threshold: CRITICAL_THRESHOLD,
            degraded_threshold: DEGRADED_THRESHOLD,
        }
    }
}

/// Clamp into [0, 100]; NaN becomes 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// 100 x part/total, with an empty total counting as fully healthy
fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * part.min(total) as f64 / total as f64
    }
}

impl ScoringWeights {
    pub fn score_nodes(&self, ready: usize, total: usize, critical: usize, warning: usize) -> f64 {
        clamp_score(
            ratio(ready, total)
                - self.node_critical_penalty * critical as f64
                - self.node_warning_penalty * warning as f64,
        )
    }

    pub fn score_workloads(
        &self,
        running_ready: usize,
        total: usize,
        critical: usize,
        warning: usize,
    ) -> f64 {
        clamp_score(
            ratio(running_ready, total)
                - self.workload_critical_penalty * critical as f64
                - self.workload_warning_penalty * warning as f64,
        )
    }

    pub fn score_storage(&self, bound: usize, total: usize, pending: usize) -> f64 {
        clamp_score(ratio(bound, total) - self.storage_pending_penalty * pending as f64)
    }

    pub fn score_network(&self, healthy: usize, total: usize, pending_lb: usize) -> f64 {
        clamp_score(ratio(healthy, total) - self.network_pending_penalty * pending_lb as f64)
    }

    pub fn overall_score(
        &self,
        nodes: f64,
        workloads: f64,
        storage: f64,
        network: f64,
        critical: usize,
        warning: usize,
    ) -> f64 {
        clamp_score(
            self.node_weight * nodes
                + self.workload_weight * workloads
                + self.storage_weight * storage
                + self.network_weight * network
                - self.overall_critical_penalty * critical as f64
                - self.overall_warning_penalty * warning as f64,
        )
    }

    pub fn overall_status(&self, score: f64, critical: usize, warning: usize) -> HealthStatus {
        if critical > 0 {
            HealthStatus::Critical
        } else if warning > 0 || score < self.degraded_threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Status from score alone, escalated to critical when the component has
    /// a critical issue
    pub fn component_status(&self, score: f64, has_critical: bool) -> HealthStatus {
        if has_critical || score < self.critical_threshold {
            HealthStatus::Critical
        } else if score < self.degraded_threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    fn component(&self, score: f64, has_critical: bool, details: String) -> ComponentHealth {
        let score = clamp_score(score);
        ComponentHealth {
            status: self.component_status(score, has_critical),
            score,
            details,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub score: f64,
    pub details: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodCounts {
    pub total: usize,
    pub running: usize,
    pub pending: usize,
    pub failed: usize,
}

impl PodCounts {
    pub fn from_pods(pods: &[PodStatus]) -> Self {
        let mut counts = PodCounts::default();
        for pod in pods {
            counts.total += 1;
            match pod.phase.as_str() {
                "Running" => counts.running += 1,
                "Pending" => counts.pending += 1,
                "Failed" => counts.failed += 1,
                _ => {}
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterHealthSummary {
    pub status: HealthStatus,
    pub score: f64,
    pub nodes: ComponentHealth,
    pub workloads: ComponentHealth,
    pub storage: ComponentHealth,
    pub network: ComponentHealth,
    pub critical_issues: usize,
    pub warning_issues: usize,
    pub pods: PodCounts,
    /// Collaborator calls that failed; the matching component is scored
    /// from whatever was fetched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Resources the summary is computed from
#[derive(Debug, Clone, Default)]
pub struct HealthInput {
    pub nodes: Vec<NodeStatus>,
    pub pods: Vec<PodStatus>,
    pub pvcs: Vec<PvcStatus>,
    pub services: Vec<ServiceStatus>,
}

fn severity_counts<'a>(issues: impl Iterator<Item = &'a Issue>) -> (usize, usize) {
    issues.fold((0, 0), |(c, w), issue| match issue.severity {
        Severity::Critical => (c + 1, w),
        Severity::Warning => (c, w + 1),
        Severity::Info => (c, w),
    })
}

/// Score a snapshot. Pure; no collaborator access.
pub fn summarize(input: &HealthInput, weights: &ScoringWeights) -> ClusterHealthSummary {
    let node_issues: Vec<Issue> = input.nodes.iter().flat_map(detector::detect_node_issues).collect();
    let pod_issues: Vec<Issue> = input.pods.iter().flat_map(detector::detect_pod_issues).collect();
    let pvc_issues: Vec<Issue> = input.pvcs.iter().flat_map(detector::detect_pvc_issues).collect();
    let svc_issues: Vec<Issue> = input
        .services
        .iter()
        .flat_map(detector::detect_service_issues)
        .collect();

    // Nodes
    let (node_crit, node_warn) = severity_counts(node_issues.iter());
    let ready_nodes = input.nodes.iter().filter(|n| n.ready).count();
    let nodes = weights.component(
        weights.score_nodes(ready_nodes, input.nodes.len(), node_crit, node_warn),
        node_crit > 0,
        format!("{}/{} nodes ready", ready_nodes, input.nodes.len()),
    );

    // Workloads; every pod counts, completed ones included
    let (pod_crit, pod_warn) = severity_counts(pod_issues.iter());
    let running_ready = input.pods.iter().filter(|p| p.is_running_ready()).count();
    let workloads = weights.component(
        weights.score_workloads(running_ready, input.pods.len(), pod_crit, pod_warn),
        pod_crit > 0,
        format!("{}/{} pods running and ready", running_ready, input.pods.len()),
    );

    // Storage
    let bound = input.pvcs.iter().filter(|p| p.is_bound()).count();
    let pending = input.pvcs.iter().filter(|p| p.is_pending()).count();
    let (pvc_crit, _) = severity_counts(pvc_issues.iter());
    let storage = weights.component(
        weights.score_storage(bound, input.pvcs.len(), pending),
        pvc_crit > 0,
        format!("{}/{} PVCs bound, {} pending", bound, input.pvcs.len(), pending),
    );

    // Network
    let healthy = input.services.iter().filter(|s| s.is_healthy()).count();
    let pending_lb = input
        .services
        .iter()
        .filter(|s| s.is_pending_load_balancer())
        .count();
    let (svc_crit, _) = severity_counts(svc_issues.iter());
    let network = weights.component(
        weights.score_network(healthy, input.services.len(), pending_lb),
        svc_crit > 0,
        format!(
            "{}/{} services healthy, {} load balancers pending",
            healthy,
            input.services.len(),
            pending_lb
        ),
    );

    let (critical, warning) = severity_counts(
        node_issues
            .iter()
            .chain(&pod_issues)
            .chain(&pvc_issues)
            .chain(&svc_issues),
    );
    let score = weights.overall_score(
        nodes.score,
        workloads.score,
        storage.score,
        network.score,
        critical,
        warning,
    );

    ClusterHealthSummary {
        status: weights.overall_status(score, critical, warning),
        score,
        nodes,
        workloads,
        storage,
        network,
        critical_issues: critical,
        warning_issues: warning,
        pods: PodCounts::from_pods(&input.pods),
        warnings: Vec::new(),
        generated_at: Utc::now(),
    }
}

/// Fetches cluster state and scores it
pub struct HealthManager {
    client: Arc<dyn KubeClient>,
    weights: ScoringWeights,
    debug: bool,
}

impl HealthManager {
    pub fn new(client: Arc<dyn KubeClient>, weights: ScoringWeights, debug: bool) -> Self {
        Self {
            client,
            weights,
            debug,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Every list call is best-effort: a failure is recorded in
    /// `warnings` and that component is scored as empty.
    pub async fn get_cluster_health(&self) -> Result<ClusterHealthSummary> {
        let mut warnings = Vec::new();
        let mut input = HealthInput::default();

        if let Some(nodes) = self
            .fetch(&["get", "nodes"], status::extract_nodes, &mut warnings)
            .await
        {
            input.nodes = nodes;
        }
        if let Some(pods) = self
            .fetch(&["get", "pods", "-A"], status::extract_pods, &mut warnings)
            .await
        {
            input.pods = pods;
        }
        if let Some(pvcs) = self
            .fetch(&["get", "pvc", "-A"], status::extract_pvcs, &mut warnings)
            .await
        {
            input.pvcs = pvcs;
        }
        if let Some(services) = self
            .fetch(&["get", "services", "-A"], status::extract_services, &mut warnings)
            .await
        {
            input.services = services;
        }

        let mut summary = summarize(&input, &self.weights);
        summary.warnings = warnings;
        Ok(summary)
    }

    async fn fetch<T>(
        &self,
        args: &[&str],
        extract: fn(&[u8]) -> Result<status::Extracted<T>>,
        warnings: &mut Vec<String>,
    ) -> Option<Vec<T>> {
        let result = match self.client.run_json(args).await {
            Ok(raw) => extract(&raw),
            Err(e) => Err(e),
        };
        match result {
            Ok(extracted) => {
                if extracted.skipped > 0 {
                    warnings.push(format!(
                        "{}: skipped {} malformed item(s)",
                        args.join(" "),
                        extracted.skipped
                    ));
                }
                Some(extracted.items)
            }
            Err(e) => {
                warn!("health scan: `{}` failed: {}", args.join(" "), e);
                if self.debug {
                    warnings.push(format!("{}: {}", args.join(" "), e));
                } else {
                    warnings.push(format!("failed to fetch {}", args[1..].join(" ")));
                }
                None
            }
        }
    }
}
