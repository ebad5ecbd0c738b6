//! Remediation planning
//!
//! A [`RemediationRegistry`] maps each [`IssueCategory`] to a handler record
//! producing the steps for one issue. Provider overlays register their own
//! entries; plan synthesis never branches on category itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::provider;
use super::types::{DiagnosticReport, Issue, IssueCategory};

/// Risk of applying a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Low => write!(f, "low"),
            Risk::Medium => write!(f, "medium"),
            Risk::High => write!(f, "high"),
        }
    }
}

/// One step of a remediation plan. Automated steps are advisory; nothing in
/// the engine runs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationStep {
    /// 1-based position within the plan
    pub order: u32,
    pub action: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub risk: Risk,
    pub automated: bool,
    /// Issue this step addresses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
}

impl RemediationStep {
    /// A step for a human to carry out
    pub fn manual(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            order: 0,
            action: action.into(),
            description: description.into(),
            command: None,
            args: Vec::new(),
            risk: Risk::Low,
            automated: false,
            issue_id: None,
        }
    }

    /// A step a tool could carry out unattended
    pub fn automated(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            automated: true,
            ..Self::manual(action, description)
        }
    }

    pub fn with_command<I, S>(mut self, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into());
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_risk(mut self, risk: Risk) -> Self {
        self.risk = risk;
        self
    }

    /// Full command line, for display
    pub fn command_line(&self) -> Option<String> {
        self.command.as_ref().map(|cmd| {
            std::iter::once(cmd.as_str())
                .chain(self.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    /// `kubectl delete pod` steps are the only ones the CLI may execute
    pub fn is_pod_restart(&self) -> bool {
        self.automated
            && self.command.as_deref() == Some("kubectl")
            && self.args.len() >= 3
            && self.args[0] == "delete"
            && self.args[1] == "pod"
    }
}

/// Cloud coordinates substituted into provider commands. Unknown values are
/// rendered as `<placeholder>` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanContext {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl PlanContext {
    pub fn cluster(&self) -> String {
        or_placeholder(&self.cluster_name, "cluster-name")
    }

    pub fn resource_group(&self) -> String {
        or_placeholder(&self.resource_group, "resource-group")
    }

    pub fn project(&self) -> String {
        or_placeholder(&self.project, "project-id")
    }

    pub fn location(&self) -> String {
        or_placeholder(&self.location, "location")
    }
}

fn or_placeholder(value: &Option<String>, name: &str) -> String {
    value.clone().unwrap_or_else(|| format!("<{}>", name))
}

/// Builds the steps for one issue
pub type StepBuilder = fn(&Issue, &PlanContext) -> Vec<RemediationStep>;

/// Registry entry for one category
#[derive(Debug, Clone, Copy)]
pub struct RemediationHandler {
    pub category: IssueCategory,
    /// One-line operator guidance for the category
    pub guidance: &'static str,
    pub build: StepBuilder,
}

/// Category -> handler table
#[derive(Debug, Clone, Default)]
pub struct RemediationRegistry {
    handlers: HashMap<IssueCategory, RemediationHandler>,
}

impl RemediationRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Handlers for the generic categories only
    pub fn core() -> Self {
        let mut registry = Self::empty();
        for handler in CORE_HANDLERS {
            registry.register(*handler);
        }
        registry
    }

    /// Generic handlers plus every provider overlay
    pub fn standard() -> Self {
        let mut registry = Self::core();
        for overlay in provider::overlays() {
            overlay.register_remediation(&mut registry);
        }
        registry
    }

    /// Add or replace the handler for `handler.category`
    pub fn register(&mut self, handler: RemediationHandler) {
        self.handlers.insert(handler.category, handler);
    }

    pub fn get(&self, category: IssueCategory) -> Option<&RemediationHandler> {
        self.handlers.get(&category)
    }

    pub fn contains(&self, category: IssueCategory) -> bool {
        self.handlers.contains_key(&category)
    }

    pub fn guidance(&self, category: IssueCategory) -> Option<&'static str> {
        self.get(category).map(|h| h.guidance)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A remediation plan for one diagnostic report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrePlan {
    pub summary: String,
    pub steps: Vec<RemediationStep>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub issues_addressed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_risk: Option<Risk>,
    pub generated_at: DateTime<Utc>,
}

impl SrePlan {
    pub fn automated_steps(&self) -> impl Iterator<Item = &RemediationStep> {
        self.steps.iter().filter(|s| s.automated)
    }
}

/// Synthesizes plans from reports
#[derive(Debug, Clone)]
pub struct RemediationPlanner {
    registry: RemediationRegistry,
    context: PlanContext,
}

impl Default for RemediationPlanner {
    fn default() -> Self {
        Self::new(RemediationRegistry::standard(), PlanContext::default())
    }
}

impl RemediationPlanner {
    pub fn new(registry: RemediationRegistry, context: PlanContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &RemediationRegistry {
        &self.registry
    }

    /// Walk the report's issues in order and concatenate each category's
    /// steps, numbering them 1..n across the whole plan.
    pub fn generate_remediation_plan(&self, report: &DiagnosticReport) -> SrePlan {
        let target = report
            .resource
            .as_ref()
            .map(|r| r.to_string())
            .or_else(|| report.namespace.as_ref().map(|ns| format!("namespace {}", ns)))
            .unwrap_or_else(|| "the cluster".to_string());

        if report.issues.is_empty() {
            return SrePlan {
                summary: format!("No issues detected for {}; no remediation needed.", target),
                steps: Vec::new(),
                notes: Vec::new(),
                issues_addressed: 0,
                highest_risk: None,
                generated_at: Utc::now(),
            };
        }

        let mut steps = Vec::new();
        let mut notes = Vec::new();
        let mut addressed = 0;
        let mut unmapped = 0;
        // Several issues on one pod map to the same command; run it once
        let mut emitted: HashSet<String> = HashSet::new();

        for issue in &report.issues {
            let Some(handler) = self.registry.get(issue.category) else {
                unmapped += 1;
                continue;
            };

            let built = (handler.build)(issue, &self.context);
            if built.is_empty() {
                unmapped += 1;
                continue;
            }

            addressed += 1;
            for mut step in built {
                if let Some(line) = step.command_line() {
                    if !emitted.insert(line) {
                        continue;
                    }
                }
                step.order = steps.len() as u32 + 1;
                step.issue_id = Some(issue.id.clone());
                steps.push(step);
            }
        }

        if unmapped > 0 {
            notes.push(format!(
                "{} issue(s) have no known remediation; manual investigation is recommended.",
                unmapped
            ));
        }

        let highest_risk = steps.iter().map(|s| s.risk).max();
        let summary = if steps.is_empty() {
            format!(
                "{} issue(s) found for {} but none map to a known remediation.",
                report.issues.len(),
                target
            )
        } else {
            format!(
                "{} step(s) to address {} of {} issue(s) for {}.",
                steps.len(),
                addressed,
                report.issues.len(),
                target
            )
        };

        SrePlan {
            summary,
            steps,
            notes,
            issues_addressed: addressed,
            highest_risk,
            generated_at: Utc::now(),
        }
    }
}

fn namespace_args(issue: &Issue) -> Vec<String> {
    match &issue.resource.namespace {
        Some(ns) => vec!["-n".to_string(), ns.clone()],
        None => Vec::new(),
    }
}

fn kubectl(args: &[&str], issue: &Issue) -> Vec<String> {
    let mut out: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    out.extend(namespace_args(issue));
    out
}

fn container_of(issue: &Issue) -> Option<String> {
    issue
        .details
        .as_ref()
        .and_then(|d| d.get("container"))
        .and_then(|c| c.as_str())
        .map(String::from)
}

fn crash_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    let name = issue.resource.name.as_str();
    match issue.resource.kind.as_str() {
        "Pod" => {
            let container = container_of(issue);
            let mut logs = vec!["logs", name, "--previous"];
            if let Some(c) = container.as_deref() {
                logs.extend(["-c", c]);
            }
            vec![
                RemediationStep::automated(
                    "restart-pod",
                    format!("Delete pod {} so its controller recreates it", name),
                )
                .with_command("kubectl", kubectl(&["delete", "pod", name], issue))
                .with_risk(Risk::Low),
                RemediationStep::manual(
                    "inspect-logs",
                    "Read the previous container logs to find the crash cause",
                )
                .with_command("kubectl", kubectl(&logs, issue)),
            ]
        }
        "Deployment" => {
            let target = format!("deployment/{}", name);
            vec![
                RemediationStep::manual(
                    "inspect-pods",
                    "Find the failing pods and their last termination reason",
                )
                .with_command("kubectl", kubectl(&["describe", &target], issue)),
                RemediationStep::automated(
                    "rollout-restart",
                    format!("Restart the pods of deployment {}", name),
                )
                .with_command("kubectl", kubectl(&["rollout", "restart", &target], issue))
                .with_risk(Risk::Medium),
            ]
        }
        kind => vec![RemediationStep::manual(
            "inspect-resource",
            format!("Describe {} {} and check its events", kind, name),
        )
        .with_command("kubectl", kubectl(&["describe", &kind.to_lowercase(), name], issue))],
    }
}

fn image_pull_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    let name = issue.resource.name.as_str();
    vec![
        RemediationStep::manual(
            "check-image",
            "Verify the image reference exists in the registry and the tag is correct",
        )
        .with_command(
            "kubectl",
            kubectl(
                &["get", "pod", name, "-o", "jsonpath={.spec.containers[*].image}"],
                issue,
            ),
        ),
        RemediationStep::manual(
            "check-pull-secrets",
            "Confirm imagePullSecrets exist and hold valid registry credentials",
        )
        .with_command(
            "kubectl",
            kubectl(&["get", "pod", name, "-o", "jsonpath={.spec.imagePullSecrets}"], issue),
        ),
    ]
}

fn configuration_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    vec![
        RemediationStep::manual(
            "inspect-events",
            "Read the container creation error in the pod events",
        )
        .with_command(
            "kubectl",
            kubectl(&["describe", "pod", &issue.resource.name], issue),
        ),
        RemediationStep::manual(
            "check-references",
            "Create or fix the ConfigMaps and Secrets referenced by the pod spec",
        )
        .with_command("kubectl", kubectl(&["get", "configmaps,secrets"], issue)),
    ]
}

fn resource_limit_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    vec![
        RemediationStep::manual(
            "check-usage",
            "Compare actual memory usage against the container limit",
        )
        .with_command("kubectl", kubectl(&["top", "pod", &issue.resource.name], issue)),
        RemediationStep::manual(
            "raise-memory-limit",
            "Raise the memory limit on the owning workload, or fix the leak",
        )
        .with_risk(Risk::Medium),
    ]
}

fn pending_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    let kind = issue.resource.kind.to_lowercase();
    let mut steps = vec![RemediationStep::manual(
        "inspect-scheduling",
        "Check scheduling and rollout events for the blocking reason",
    )
    .with_command(
        "kubectl",
        kubectl(&["describe", &kind, &issue.resource.name], issue),
    )];
    if issue.resource.kind == "Deployment" {
        steps.push(
            RemediationStep::manual("check-rollout", "Check whether the rollout is stuck")
                .with_command(
                    "kubectl",
                    kubectl(
                        &["rollout", "status", &format!("deployment/{}", issue.resource.name)],
                        issue,
                    ),
                ),
        );
    } else {
        steps.push(
            RemediationStep::manual("check-capacity", "Check allocatable capacity on the nodes")
                .with_command("kubectl", ["describe", "nodes"]),
        );
    }
    steps
}

fn probe_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    vec![
        RemediationStep::manual(
            "inspect-probes",
            "Review readiness/liveness probe failures in the pod events",
        )
        .with_command(
            "kubectl",
            kubectl(&["describe", "pod", &issue.resource.name], issue),
        ),
        RemediationStep::manual(
            "tune-probes",
            "Fix the probe endpoint or relax initialDelaySeconds/timeoutSeconds",
        )
        .with_risk(Risk::Medium),
    ]
}

fn node_unreachable_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    let node = issue.resource.name.as_str();
    vec![
        RemediationStep::manual("inspect-node", "Check node conditions and kubelet heartbeat")
            .with_command("kubectl", ["describe", "node", node]),
        RemediationStep::manual(
            "cordon-node",
            format!("Stop scheduling new pods onto {}", node),
        )
        .with_command("kubectl", ["cordon", node])
        .with_risk(Risk::Medium),
    ]
}

fn node_pressure_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    let node = issue.resource.name.as_str();
    vec![
        RemediationStep::manual("inspect-node", "Check which resource is under pressure and top consumers")
            .with_command("kubectl", ["describe", "node", node]),
        RemediationStep::manual(
            "drain-node",
            format!("Drain {} to relieve pressure; evicts all its pods", node),
        )
        .with_command(
            "kubectl",
            ["drain", node, "--ignore-daemonsets", "--delete-emptydir-data"],
        )
        .with_risk(Risk::High),
    ]
}

fn network_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    if issue.resource.kind == "Service" {
        return vec![RemediationStep::manual(
            "inspect-service",
            "Check load balancer provisioning events for the service",
        )
        .with_command(
            "kubectl",
            kubectl(&["describe", "service", &issue.resource.name], issue),
        )];
    }
    vec![
        RemediationStep::manual(
            "inspect-cni",
            "Check the CNI plugin pods in kube-system",
        )
        .with_command("kubectl", ["get", "pods", "-n", "kube-system", "-o", "wide"]),
        RemediationStep::manual(
            "inspect-node",
            "Check the node's NetworkUnavailable condition reason",
        )
        .with_command("kubectl", ["describe", "node", issue.resource.name.as_str()]),
    ]
}

fn storage_steps(issue: &Issue, _ctx: &PlanContext) -> Vec<RemediationStep> {
    vec![
        RemediationStep::manual("inspect-pvc", "Check the claim's events and requested StorageClass")
            .with_command(
                "kubectl",
                kubectl(&["describe", "pvc", &issue.resource.name], issue),
            ),
        RemediationStep::manual(
            "inspect-storageclass",
            "Confirm the StorageClass exists and its provisioner is running",
        )
        .with_command("kubectl", ["get", "storageclass"]),
    ]
}

const CORE_HANDLERS: &[RemediationHandler] = &[
    RemediationHandler {
        category: IssueCategory::Crash,
        guidance: "Restart the failing pod and read its previous logs",
        build: crash_steps,
    },
    RemediationHandler {
        category: IssueCategory::ImagePull,
        guidance: "Verify the image reference and registry credentials",
        build: image_pull_steps,
    },
    RemediationHandler {
        category: IssueCategory::Configuration,
        guidance: "Fix missing ConfigMap/Secret references in the pod spec",
        build: configuration_steps,
    },
    RemediationHandler {
        category: IssueCategory::ResourceLimit,
        guidance: "Raise memory limits or reduce memory usage",
        build: resource_limit_steps,
    },
    RemediationHandler {
        category: IssueCategory::Pending,
        guidance: "Find the scheduling or rollout blocker",
        build: pending_steps,
    },
    RemediationHandler {
        category: IssueCategory::Probe,
        guidance: "Fix or tune the failing health probe",
        build: probe_steps,
    },
    RemediationHandler {
        category: IssueCategory::NodeUnreachable,
        guidance: "Check kubelet health and cordon the node",
        build: node_unreachable_steps,
    },
    RemediationHandler {
        category: IssueCategory::NodePressure,
        guidance: "Relieve node pressure, draining if needed",
        build: node_pressure_steps,
    },
    RemediationHandler {
        category: IssueCategory::Network,
        guidance: "Check CNI health and load balancer provisioning",
        build: network_steps,
    },
    RemediationHandler {
        category: IssueCategory::Storage,
        guidance: "Check the PVC binding and StorageClass provisioner",
        build: storage_steps,
    },
];
