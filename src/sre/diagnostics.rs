//! Diagnostics orchestration
//!
//! Scopes a request (cluster, namespace or one resource), pulls raw JSON
//! through the collaborator, runs extraction and detection, and assembles a
//! [`DiagnosticReport`]. Multi-resource scans are best-effort; a
//! single-resource diagnosis fails on the first collaborator error.

use std::sync::Arc;
use tracing::{debug, warn};

use super::detector;
use super::events::{self, analyze_logs};
use super::provider::{self, OverlayInput, ProviderChoice};
use super::status::{self, Extracted};
use super::types::{
    DiagnosticReport, DiagnosticScope, EventRecord, Issue, LogLine, ResourceRef, Severity,
};
use crate::client::KubeClient;
use crate::error::{Result, SreError};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Tunables for a [`DiagnosticsManager`]
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsOptions {
    pub debug: bool,
    pub max_events: usize,
    pub log_tail_lines: usize,
    pub provider: ProviderChoice,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_events: 50,
            log_tail_lines: 100,
            provider: ProviderChoice::Auto,
        }
    }
}

/// Entry point for diagnostics. Holds only the client handle and options,
/// so one instance can serve concurrent requests.
pub struct DiagnosticsManager {
    client: Arc<dyn KubeClient>,
    options: DiagnosticsOptions,
}

/// Accumulates partial results during a best-effort scan
#[derive(Default)]
struct Scan {
    issues: Vec<Issue>,
    events: Vec<EventRecord>,
    skipped: usize,
}

impl Scan {
    fn take<T>(&mut self, extracted: Extracted<T>) -> Vec<T> {
        self.skipped += extracted.skipped;
        extracted.items
    }
}

impl DiagnosticsManager {
    pub fn new(client: Arc<dyn KubeClient>, options: DiagnosticsOptions) -> Self {
        Self { client, options }
    }

    /// Node- and pod-wide detection plus cluster-wide warning events
    pub async fn diagnose_cluster(&self) -> Result<DiagnosticReport> {
        let mut scan = Scan::default();

        let nodes = self.list(&["get", "nodes"], status::extract_nodes, &mut scan).await;
        let pods = self.list(&["get", "pods", "-A"], status::extract_pods, &mut scan).await;
        let pvcs = self.list(&["get", "pvc", "-A"], status::extract_pvcs, &mut scan).await;
        let services = self
            .list(&["get", "services", "-A"], status::extract_services, &mut scan)
            .await;

        scan.issues.extend(nodes.iter().flat_map(detector::detect_node_issues));
        scan.issues.extend(pods.iter().flat_map(detector::detect_pod_issues));
        scan.issues.extend(pvcs.iter().flat_map(detector::detect_pvc_issues));
        scan.issues.extend(services.iter().flat_map(detector::detect_service_issues));

        scan.events = self
            .events(&["get", "events", "-A", "--field-selector", "type=Warning"], &mut scan)
            .await;

        let cloud = self.options.provider.resolve(&nodes);
        if let Some(overlay) = cloud.and_then(provider::overlay_for) {
            let service_accounts = self
                .list(
                    &["get", "serviceaccounts", "-A"],
                    status::extract_service_accounts,
                    &mut scan,
                )
                .await;
            scan.issues.extend(overlay.detect(&OverlayInput {
                nodes: &nodes,
                events: &scan.events,
                service_accounts: &service_accounts,
            }));
        }

        let mut report = self.finish(DiagnosticScope::Cluster, scan);
        report.provider = cloud;
        report.summary = if report.issues.is_empty() {
            format!(
                "Cluster is healthy: no issues across {} node(s) and {} pod(s)",
                nodes.len(),
                pods.len()
            )
        } else {
            issue_summary("Cluster", &report.issues)
        };
        Ok(report)
    }

    /// Pod, deployment, PVC and service detection within one namespace
    pub async fn diagnose_namespace(&self, namespace: &str) -> Result<DiagnosticReport> {
        if namespace.is_empty() {
            return Err(SreError::InvalidArgument("namespace must not be empty".into()));
        }
        let mut scan = Scan::default();

        let ns = ["-n", namespace];
        let pods = self
            .list(&with(&["get", "pods"], &ns), status::extract_pods, &mut scan)
            .await;
        let deployments = self
            .list(
                &with(&["get", "deployments"], &ns),
                status::extract_deployments,
                &mut scan,
            )
            .await;
        let pvcs = self
            .list(&with(&["get", "pvc"], &ns), status::extract_pvcs, &mut scan)
            .await;
        let services = self
            .list(&with(&["get", "services"], &ns), status::extract_services, &mut scan)
            .await;

        scan.issues.extend(pods.iter().flat_map(detector::detect_pod_issues));
        scan.issues
            .extend(deployments.iter().flat_map(detector::detect_deployment_issues));
        scan.issues.extend(pvcs.iter().flat_map(detector::detect_pvc_issues));
        scan.issues.extend(services.iter().flat_map(detector::detect_service_issues));

        scan.events = self.events(&with(&["get", "events"], &ns), &mut scan).await;

        // Node pools are cluster-wide; only the namespace's identities and
        // events feed the overlay here.
        let cloud = match self.options.provider {
            ProviderChoice::Auto => {
                let nodes = self.list(&["get", "nodes"], status::extract_nodes, &mut scan).await;
                provider::detect_provider(&nodes)
            }
            choice => choice.resolve(&[]),
        };
        if let Some(overlay) = cloud.and_then(provider::overlay_for) {
            let service_accounts = self
                .list(
                    &with(&["get", "serviceaccounts"], &ns),
                    status::extract_service_accounts,
                    &mut scan,
                )
                .await;
            scan.issues.extend(overlay.detect(&OverlayInput {
                nodes: &[],
                events: &scan.events,
                service_accounts: &service_accounts,
            }));
        }

        let mut report = self.finish(DiagnosticScope::Namespace, scan);
        report.namespace = Some(namespace.to_string());
        report.provider = cloud;
        report.summary = if report.issues.is_empty() {
            format!(
                "Namespace {} is healthy: {} pod(s) and {} deployment(s) checked",
                namespace,
                pods.len(),
                deployments.len()
            )
        } else {
            issue_summary(&format!("Namespace {}", namespace), &report.issues)
        };
        Ok(report)
    }

    /// Diagnose one resource. Pods, deployments and nodes use the rule
    /// tables; any other kind falls back to the `describe` heuristic.
    pub async fn diagnose_resource(
        &self,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DiagnosticReport> {
        if name.is_empty() {
            return Err(SreError::InvalidArgument("resource name must not be empty".into()));
        }
        let namespace = namespace.filter(|ns| !ns.is_empty()).unwrap_or(DEFAULT_NAMESPACE);

        match status::normalize_kind(kind) {
            Some("pod") => self.diagnose_pod(namespace, name).await,
            Some("deployment") => self.diagnose_deployment(namespace, name).await,
            Some("node") => self.diagnose_node(name).await,
            _ => self.diagnose_generic(kind, namespace, name).await,
        }
    }

    pub async fn diagnose_pod(&self, namespace: &str, name: &str) -> Result<DiagnosticReport> {
        let raw = self
            .client
            .run_json(&["get", "pod", name, "-n", namespace])
            .await?;
        let pod = status::extract_pod(&raw)?;
        let resource = ResourceRef::pod(namespace, name);

        let issues = detector::detect_pod_issues(&pod);
        let mut report = self.resource_report(resource.clone(), issues);
        report.events = self.resource_events(&resource).await;
        if report.has_crash_issue() {
            report.logs = self.logs(namespace, name).await;
        }

        report.summary = if report.issues.is_empty() {
            format!(
                "Pod {}/{} is healthy ({}, {}/{} containers ready)",
                namespace,
                name,
                pod.phase,
                pod.ready_containers(),
                pod.containers.len()
            )
        } else {
            issue_summary(&format!("Pod {}/{}", namespace, name), &report.issues)
        };
        Ok(report)
    }

    pub async fn diagnose_deployment(&self, namespace: &str, name: &str) -> Result<DiagnosticReport> {
        let raw = self
            .client
            .run_json(&["get", "deployment", name, "-n", namespace])
            .await?;
        let deploy = status::extract_deployment(&raw)?;
        let resource = ResourceRef::deployment(namespace, name);

        let issues = detector::detect_deployment_issues(&deploy);
        let mut report = self.resource_report(resource.clone(), issues);
        report.events = self.resource_events(&resource).await;
        if report.has_crash_issue() {
            report.logs = self.logs(namespace, &format!("deployment/{}", name)).await;
        }

        report.summary = if report.issues.is_empty() {
            format!(
                "Deployment {}/{} is healthy ({}/{} replicas ready)",
                namespace, name, deploy.ready_replicas, deploy.desired_replicas
            )
        } else {
            issue_summary(&format!("Deployment {}/{}", namespace, name), &report.issues)
        };
        Ok(report)
    }

    pub async fn diagnose_node(&self, name: &str) -> Result<DiagnosticReport> {
        let raw = self.client.run_json(&["get", "node", name]).await?;
        let node = status::extract_node(&raw)?;
        let resource = ResourceRef::node(name);

        let issues = detector::detect_node_issues(&node);
        let mut report = self.resource_report(resource.clone(), issues);
        report.provider = self.options.provider.resolve(std::slice::from_ref(&node));
        report.events = self.resource_events(&resource).await;

        report.summary = if report.issues.is_empty() {
            let schedulable = if node.unschedulable { ", cordoned" } else { "" };
            format!("Node {} is healthy (Ready{})", name, schedulable)
        } else {
            issue_summary(&format!("Node {}", name), &report.issues)
        };
        Ok(report)
    }

    async fn diagnose_generic(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<DiagnosticReport> {
        let output = self
            .client
            .run_with_namespace(namespace, &["describe", kind, name])
            .await?;
        let resource = ResourceRef::new(display_kind(kind), Some(namespace), name);

        let (issues, mut events) = detector::detect_from_describe(&resource, &output);
        events.truncate(self.options.max_events);
        let mut report = self.resource_report(resource.clone(), issues);
        report.events = events;

        report.summary = if report.issues.is_empty() {
            format!("{} shows no warning events", resource.qualified_name())
        } else {
            issue_summary(&resource.qualified_name(), &report.issues)
        };
        Ok(report)
    }

    /// Delete a pod so its controller recreates it. The only mutating call
    /// the engine makes.
    pub async fn restart_pod(&self, namespace: &str, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(SreError::InvalidArgument("pod name must not be empty".into()));
        }
        self.client
            .run_with_namespace(namespace, &["delete", "pod", name, "--wait=false"])
            .await
    }

    fn resource_report(&self, resource: ResourceRef, issues: Vec<Issue>) -> DiagnosticReport {
        let mut report = DiagnosticReport::new(DiagnosticScope::Resource, order_issues(issues));
        report.namespace = resource.namespace.clone();
        report.resource = Some(resource);
        report
    }

    fn finish(&self, scope: DiagnosticScope, scan: Scan) -> DiagnosticReport {
        if scan.skipped > 0 {
            warn!(
                skipped = scan.skipped,
                "Some list items could not be decoded and were left out of detection"
            );
        }
        let mut report = DiagnosticReport::new(scope, order_issues(scan.issues));
        report.events = scan.events;
        report.skipped_items = scan.skipped;
        report
    }

    /// Best-effort list; failures are logged and yield nothing
    async fn list<T>(
        &self,
        args: &[&str],
        extract: fn(&[u8]) -> Result<Extracted<T>>,
        scan: &mut Scan,
    ) -> Vec<T> {
        let result = match self.client.run_json(args).await {
            Ok(raw) => extract(&raw),
            Err(e) => Err(e),
        };
        match result {
            Ok(extracted) => scan.take(extracted),
            Err(e) => {
                warn!("`{}` failed, continuing without it: {}", args.join(" "), e);
                Vec::new()
            }
        }
    }

    async fn events(&self, args: &[&str], scan: &mut Scan) -> Vec<EventRecord> {
        let result = match self.client.run_json(args).await {
            Ok(raw) => events::extract_events(&raw, self.options.max_events),
            Err(e) => Err(e),
        };
        match result {
            Ok(extracted) => scan.take(extracted),
            Err(e) => {
                warn!("`{}` failed, continuing without events: {}", args.join(" "), e);
                Vec::new()
            }
        }
    }

    /// Events about one object; failures yield no events
    async fn resource_events(&self, resource: &ResourceRef) -> Vec<EventRecord> {
        let selector = format!(
            "involvedObject.kind={},involvedObject.name={}",
            resource.kind, resource.name
        );
        let mut args = vec!["get", "events", "--field-selector", selector.as_str()];
        if let Some(ns) = resource.namespace.as_deref() {
            args.extend(["-n", ns]);
        }
        let mut scan = Scan::default();
        let events = self.events(&args, &mut scan).await;
        if scan.skipped > 0 {
            debug!(skipped = scan.skipped, "Skipped malformed events");
        }
        events
    }

    async fn logs(&self, namespace: &str, target: &str) -> Vec<LogLine> {
        let tail = format!("--tail={}", self.options.log_tail_lines);
        match self
            .client
            .run_with_namespace(namespace, &["logs", target, "--all-containers", tail.as_str()])
            .await
        {
            Ok(output) => analyze_logs(&output),
            Err(e) => {
                warn!("Failed to fetch logs for {}/{}: {}", namespace, target, e);
                Vec::new()
            }
        }
    }
}

fn with<'a>(base: &[&'a str], extra: &[&'a str]) -> Vec<&'a str> {
    base.iter().chain(extra).copied().collect()
}

/// Dedupe by id, then most severe first; detection order is kept within a
/// severity.
fn order_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let mut issues = detector::dedupe(issues);
    issues.sort_by_key(|i| i.severity);
    issues
}

/// "Kind" casing for kinds typed on the command line
fn display_kind(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One sentence from the critical/warning/info counts
pub fn issue_summary(subject: &str, issues: &[Issue]) -> String {
    let count = |s: Severity| issues.iter().filter(|i| i.severity == s).count();
    let (critical, warning, info) = (
        count(Severity::Critical),
        count(Severity::Warning),
        count(Severity::Info),
    );
    let mut summary = format!(
        "{} has {} issue(s): {} critical, {} warning",
        subject,
        issues.len(),
        critical,
        warning
    );
    if info > 0 {
        summary.push_str(&format!(", {} info", info));
    }
    summary
}
