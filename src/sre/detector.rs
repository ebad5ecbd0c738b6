//! Issue detection
//!
//! Rule tables that turn status records into [`Issue`] values. Every rule is
//! independent of the others and a single resource may trigger several. All
//! functions here are pure: missing or zero fields never produce an issue.

use serde_json::json;
use std::collections::HashSet;

use super::status::{
    ContainerState, ContainerStatus, DeploymentStatus, NodeStatus, PodStatus, PvcStatus,
    ResourceStatus, ServiceStatus,
};
use super::types::{EventRecord, ExitCodeInfo, Issue, IssueCategory, ResourceRef, Severity};

/// Restart count at which a container is considered unstable
pub const RESTART_WARNING_THRESHOLD: i32 = 5;

/// Classify a container waiting reason.
///
/// Image pull failures, crash loops and container creation errors are
/// critical; anything else is a transient wait.
pub fn classify_waiting_reason(reason: &str) -> (IssueCategory, Severity) {
    match reason {
        "ImagePullBackOff" | "ErrImagePull" | "ImagePullError" => {
            (IssueCategory::ImagePull, Severity::Critical)
        }
        "CrashLoopBackOff" => (IssueCategory::Crash, Severity::Critical),
        "CreateContainerError" | "CreateContainerConfigError" => {
            (IssueCategory::Configuration, Severity::Critical)
        }
        _ => (IssueCategory::Pending, Severity::Warning),
    }
}

fn waiting_suggestions(reason: &str) -> Vec<&'static str> {
    match reason {
        "ImagePullBackOff" | "ErrImagePull" | "ImagePullError" => vec![
            "Verify image name and tag are correct",
            "Check image registry authentication and imagePullSecrets",
            "Verify network connectivity to the registry",
        ],
        "CrashLoopBackOff" => vec![
            "Check container logs, including --previous, for the failure",
            "Verify application configuration and environment",
            "Check resource limits and health probe configuration",
        ],
        "CreateContainerConfigError" => vec![
            "Check that referenced ConfigMaps and Secrets exist",
            "Verify volume mounts and environment references",
        ],
        "CreateContainerError" => vec![
            "Check container runtime errors in pod events",
            "Verify security context settings",
        ],
        _ => vec!["Check pod events for the wait reason"],
    }
}

/// Detect issues on a single pod
pub fn detect_pod_issues(pod: &PodStatus) -> Vec<Issue> {
    let mut issues = Vec::new();
    let resource = ResourceRef::pod(&pod.namespace, &pod.name);

    match pod.phase.as_str() {
        "Failed" => issues.push(
            Issue::new(
                IssueCategory::Crash,
                resource.clone(),
                "phase",
                format!("Pod {} is in Failed phase", resource.qualified_name()),
            )
            .with_severity(Severity::Critical)
            .with_suggestion("Check pod events and container logs for the failure reason"),
        ),
        "Pending" => issues.push(
            Issue::new(
                IssueCategory::Pending,
                resource.clone(),
                "phase",
                format!("Pod {} is Pending", resource.qualified_name()),
            )
            .with_severity(Severity::Warning)
            .with_suggestion("Check scheduling events, node capacity and PVC bindings"),
        ),
        _ => {}
    }

    for container in &pod.containers {
        issues.extend(container_issues(&resource, container, false));
    }

    for container in &pod.init_containers {
        issues.extend(container_issues(&resource, container, true));
    }

    if let Some(ready) = pod.condition("Ready") {
        if ready.is_false() && ready.reason.to_lowercase().contains("probe") {
            issues.push(
                Issue::new(
                    IssueCategory::Probe,
                    resource.clone(),
                    "ready",
                    format!(
                        "Pod {} is not ready: {} {}",
                        resource.qualified_name(),
                        ready.reason,
                        ready.message
                    )
                    .trim_end()
                    .to_string(),
                )
                .with_severity(Severity::Warning)
                .with_suggestion("Verify probe paths, ports and initialDelaySeconds"),
            );
        }
    }

    issues
}

fn container_issues(resource: &ResourceRef, container: &ContainerStatus, init: bool) -> Vec<Issue> {
    let mut issues = Vec::new();
    let label = if init { "Init container" } else { "Container" };
    let rule_prefix = if init { "init:" } else { "" };

    match &container.state {
        ContainerState::Waiting { reason, message } => {
            let (category, severity) = classify_waiting_reason(reason);
            // Init containers routinely wait on PodInitializing; only the
            // failure reasons are reportable for them.
            if !(init && category == IssueCategory::Pending) {
                issues.push(
                    Issue::new(
                        category,
                        resource.clone(),
                        &format!("{}{}:waiting", rule_prefix, container.name),
                        format!("{} {} is waiting: {}", label, container.name, reason),
                    )
                    .with_severity(severity)
                    .with_details(json!({
                        "container": container.name,
                        "reason": reason,
                        "message": message,
                    }))
                    .with_suggestions(waiting_suggestions(reason)),
                );
            }
        }
        ContainerState::Terminated {
            reason, exit_code, ..
        } if reason == "OOMKilled" => {
            issues.push(oom_issue(resource, container, rule_prefix, *exit_code, Severity::Critical));
        }
        ContainerState::Running { .. } => {
            if let ContainerState::Terminated {
                reason, exit_code, ..
            } = &container.last_state
            {
                if reason == "OOMKilled" {
                    issues.push(oom_issue(resource, container, rule_prefix, *exit_code, Severity::Warning));
                }
            }
        }
        _ => {}
    }

    if container.restart_count >= RESTART_WARNING_THRESHOLD {
        issues.push(
            Issue::new(
                IssueCategory::Crash,
                resource.clone(),
                &format!("{}{}:restarts", rule_prefix, container.name),
                format!(
                    "{} {} has restarted {} times",
                    label, container.name, container.restart_count
                ),
            )
            .with_severity(Severity::Warning)
            .with_details(json!({
                "container": container.name,
                "restart_count": container.restart_count,
            }))
            .with_suggestion("Check previous container logs for the root cause of restarts"),
        );
    }

    issues
}

fn oom_issue(
    resource: &ResourceRef,
    container: &ContainerStatus,
    rule_prefix: &str,
    exit_code: i32,
    severity: Severity,
) -> Issue {
    Issue::new(
        IssueCategory::ResourceLimit,
        resource.clone(),
        &format!("{}{}:oom", rule_prefix, container.name),
        format!(
            "Container {} was OOMKilled (exceeded its memory limit)",
            container.name
        ),
    )
    .with_severity(severity)
    .with_details(json!({
        "container": container.name,
        "exit_code": exit_code,
        "exit_info": ExitCodeInfo::analyze(exit_code),
    }))
    .with_suggestions([
        "Increase the container memory limit",
        "Profile the application for memory leaks",
    ])
}

/// Detect issues on a single deployment
pub fn detect_deployment_issues(deploy: &DeploymentStatus) -> Vec<Issue> {
    let mut issues = Vec::new();
    let resource = ResourceRef::deployment(&deploy.namespace, &deploy.name);
    let name = resource.qualified_name();

    if deploy.unavailable_replicas > 0 {
        issues.push(
            Issue::new(
                IssueCategory::Pending,
                resource.clone(),
                "unavailable",
                format!(
                    "Deployment {} has {} unavailable replica(s)",
                    name, deploy.unavailable_replicas
                ),
            )
            .with_severity(Severity::Warning)
            .with_details(json!({
                "desired": deploy.desired_replicas,
                "ready": deploy.ready_replicas,
                "unavailable": deploy.unavailable_replicas,
            })),
        );
    }

    if deploy.desired_replicas > 0 && deploy.ready_replicas == 0 {
        issues.push(
            Issue::new(
                IssueCategory::Crash,
                resource.clone(),
                "no-ready-replicas",
                format!(
                    "Deployment {} has 0/{} replicas ready",
                    name, deploy.desired_replicas
                ),
            )
            .with_severity(Severity::Critical)
            .with_suggestion("Check the status and logs of the deployment's pods"),
        );
    }

    if let Some(available) = deploy.condition("Available") {
        if available.is_false() {
            issues.push(
                Issue::new(
                    IssueCategory::Pending,
                    resource.clone(),
                    "available",
                    format!("Deployment {} is not Available: {}", name, available.reason),
                )
                .with_severity(Severity::Critical),
            );
        }
    }

    if let Some(progressing) = deploy.condition("Progressing") {
        if progressing.is_false() {
            issues.push(
                Issue::new(
                    IssueCategory::Pending,
                    resource.clone(),
                    "progressing",
                    format!("Deployment {} rollout is not progressing: {}", name, progressing.reason),
                )
                .with_severity(Severity::Warning)
                .with_suggestion("Inspect rollout status and the newest ReplicaSet's events"),
            );
        }
    }

    issues
}

/// Detect issues on a single node
pub fn detect_node_issues(node: &NodeStatus) -> Vec<Issue> {
    let mut issues = Vec::new();
    let resource = ResourceRef::node(&node.name);

    if let Some(ready) = node.condition("Ready") {
        if !ready.is_true() {
            issues.push(
                Issue::new(
                    IssueCategory::NodeUnreachable,
                    resource.clone(),
                    "ready",
                    format!(
                        "Node {} is not ready (Ready={}): {}",
                        node.name, ready.status, ready.reason
                    ),
                )
                .with_severity(Severity::Critical)
                .with_suggestion("Check kubelet status and logs on the node"),
            );
        }
    }

    let pressures = [
        (node.pressure.memory, "MemoryPressure", "memory"),
        (node.pressure.disk, "DiskPressure", "disk"),
        (node.pressure.pid, "PIDPressure", "PID"),
    ];
    for (active, condition, what) in pressures {
        if active {
            issues.push(
                Issue::new(
                    IssueCategory::NodePressure,
                    resource.clone(),
                    condition,
                    format!("Node {} is under {} pressure", node.name, what),
                )
                .with_severity(Severity::Warning)
                .with_details(json!({ "condition": condition }))
                .with_suggestion("Pods may be evicted; reduce load or add capacity"),
            );
        }
    }

    if node.network_unavailable {
        issues.push(
            Issue::new(
                IssueCategory::Network,
                resource.clone(),
                "NetworkUnavailable",
                format!("Node {} network is unavailable", node.name),
            )
            .with_severity(Severity::Critical)
            .with_suggestion("Check the CNI plugin pods and node routes"),
        );
    }

    issues
}

/// Detect issues on a PersistentVolumeClaim
pub fn detect_pvc_issues(pvc: &PvcStatus) -> Vec<Issue> {
    let resource = ResourceRef::new("PersistentVolumeClaim", Some(&pvc.namespace), &pvc.name);
    match pvc.phase.as_str() {
        "Pending" => vec![Issue::new(
            IssueCategory::Storage,
            resource.clone(),
            "phase",
            format!("PersistentVolumeClaim {} is Pending", resource.qualified_name()),
        )
        .with_severity(Severity::Warning)
        .with_details(json!({ "storage_class": pvc.storage_class }))],
        "Lost" => vec![Issue::new(
            IssueCategory::Storage,
            resource.clone(),
            "phase",
            format!(
                "PersistentVolumeClaim {} lost its PersistentVolume",
                resource.qualified_name()
            ),
        )
        .with_severity(Severity::Critical)],
        _ => Vec::new(),
    }
}

/// Detect issues on a Service
pub fn detect_service_issues(svc: &ServiceStatus) -> Vec<Issue> {
    if !svc.is_pending_load_balancer() {
        return Vec::new();
    }
    let resource = ResourceRef::new("Service", Some(&svc.namespace), &svc.name);
    vec![Issue::new(
        IssueCategory::Network,
        resource.clone(),
        "load-balancer",
        format!(
            "LoadBalancer service {} has no external address assigned",
            resource.qualified_name()
        ),
    )
    .with_severity(Severity::Warning)
    .with_suggestion("Check cloud load balancer provisioning events for the service")]
}

/// Detect issues on any supported resource
pub fn detect_issues(status: &ResourceStatus) -> Vec<Issue> {
    match status {
        ResourceStatus::Pod(pod) => detect_pod_issues(pod),
        ResourceStatus::Deployment(deploy) => detect_deployment_issues(deploy),
        ResourceStatus::Node(node) => detect_node_issues(node),
    }
}

/// Detect issues across many resources
pub fn detect_all<'a, I>(statuses: I) -> Vec<Issue>
where
    I: IntoIterator<Item = &'a ResourceStatus>,
{
    statuses.into_iter().flat_map(detect_issues).collect()
}

/// Drop later issues that share an id with an earlier one
pub fn dedupe(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.id.clone()))
        .collect()
}

/// Category suggested by an event reason, if the reason is recognized
pub fn event_category(reason: &str, message: &str) -> Option<IssueCategory> {
    let message = message.to_lowercase();
    match reason {
        "BackOff" | "CrashLoopBackOff" => {
            if message.contains("image") && message.contains("pull") {
                Some(IssueCategory::ImagePull)
            } else {
                Some(IssueCategory::Crash)
            }
        }
        "ErrImagePull" | "ImagePullBackOff" | "InspectFailed" | "ErrImageNeverPull" => {
            Some(IssueCategory::ImagePull)
        }
        "Failed" if message.contains("pull") || message.contains("image") => {
            Some(IssueCategory::ImagePull)
        }
        "FailedMount" | "FailedAttachVolume" | "ProvisioningFailed" | "FailedBinding" => {
            Some(IssueCategory::Storage)
        }
        "FailedScheduling" => Some(IssueCategory::Pending),
        "Unhealthy" => Some(IssueCategory::Probe),
        "OOMKilling" => Some(IssueCategory::ResourceLimit),
        "NetworkNotReady" | "FailedCreatePodSandBox" => Some(IssueCategory::Network),
        "FailedCreate" | "CreateContainerConfigError" => Some(IssueCategory::Configuration),
        _ => None,
    }
}

/// Heuristic for kinds without a dedicated rule table: read the `Events:`
/// section of `kubectl describe` output. Warning events with a recognized
/// reason become issues; the rest are returned as plain events.
pub fn detect_from_describe(resource: &ResourceRef, describe: &str) -> (Vec<Issue>, Vec<EventRecord>) {
    let events = parse_describe_events(resource, describe);
    let mut issues = Vec::new();

    for event in &events {
        if !event.is_warning() {
            continue;
        }
        if let Some(category) = event_category(&event.reason, &event.message) {
            issues.push(
                Issue::new(
                    category,
                    resource.clone(),
                    &event.reason,
                    format!("{} {}: {}", event.reason, resource.qualified_name(), event.message),
                )
                .with_details(json!({ "event_reason": event.reason, "count": event.count })),
            );
        }
    }

    (dedupe(issues), events)
}

/// Parse the column layout of the `Events:` table printed by `kubectl describe`
pub fn parse_describe_events(resource: &ResourceRef, describe: &str) -> Vec<EventRecord> {
    let mut lines = describe
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Events:"));

    if lines.next().is_none() {
        return Vec::new();
    }

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let (Some(reason_col), Some(age_col), Some(from_col), Some(message_col)) = (
        header.find("Reason"),
        header.find("Age"),
        header.find("From"),
        header.find("Message"),
    ) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if trimmed.starts_with("----") {
            continue;
        }

        let event_type = trimmed.split_whitespace().next().unwrap_or_default();
        let reason = slice_column(line, reason_col, Some(age_col));
        let age = slice_column(line, age_col, Some(from_col));
        let message = slice_column(line, message_col, None);

        events.push(EventRecord {
            event_type: event_type.to_string(),
            reason: reason.split_whitespace().next().unwrap_or_default().to_string(),
            message: message.to_string(),
            involved_kind: resource.kind.clone(),
            involved_name: resource.name.clone(),
            namespace: resource.namespace.clone(),
            count: repeat_count(age),
            last_seen: None,
        });
    }

    events
}

fn slice_column(line: &str, start: usize, end: Option<usize>) -> &str {
    let end = end.unwrap_or(line.len()).min(line.len());
    if start >= end || !line.is_char_boundary(start) || !line.is_char_boundary(end) {
        return "";
    }
    line[start..end].trim()
}

/// `2m (x10 over 5m)` -> 10
fn repeat_count(age: &str) -> i32 {
    age.split("(x")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.trim_end_matches(')').parse().ok())
        .unwrap_or(1)
}
