//! Issue taxonomy and diagnostic report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::provider::CloudProvider;

/// Severity level for detected issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Requires immediate attention - workload or node is down
    Critical,
    /// Should be addressed soon - degraded or at risk
    Warning,
    /// Informational
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

impl Severity {
    /// Whether this severity is at least as severe as `min`
    pub fn at_least(&self, min: Severity) -> bool {
        *self <= min
    }
}

/// Closed set of issue categories.
///
/// The generic categories come from the core rule tables; the provider
/// categories are only ever produced by the AKS and GKE overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Crash,
    ImagePull,
    Configuration,
    ResourceLimit,
    Pending,
    Probe,
    NodeUnreachable,
    NodePressure,
    Network,
    Storage,
    // AKS
    AksNodePool,
    SpotEviction,
    ManagedIdentity,
    // GKE
    GkeNodePool,
    Preemption,
    WorkloadIdentity,
}

impl IssueCategory {
    /// Every category, generic ones first
    pub const ALL: [IssueCategory; 16] = [
        IssueCategory::Crash,
        IssueCategory::ImagePull,
        IssueCategory::Configuration,
        IssueCategory::ResourceLimit,
        IssueCategory::Pending,
        IssueCategory::Probe,
        IssueCategory::NodeUnreachable,
        IssueCategory::NodePressure,
        IssueCategory::Network,
        IssueCategory::Storage,
        IssueCategory::AksNodePool,
        IssueCategory::SpotEviction,
        IssueCategory::ManagedIdentity,
        IssueCategory::GkeNodePool,
        IssueCategory::Preemption,
        IssueCategory::WorkloadIdentity,
    ];

    /// Categories owned by the AKS overlay
    pub const AKS: [IssueCategory; 3] = [
        IssueCategory::AksNodePool,
        IssueCategory::SpotEviction,
        IssueCategory::ManagedIdentity,
    ];

    /// Categories owned by the GKE overlay
    pub const GKE: [IssueCategory; 3] = [
        IssueCategory::GkeNodePool,
        IssueCategory::Preemption,
        IssueCategory::WorkloadIdentity,
    ];

    /// Severity class a category carries unless a rule overrides it
    pub fn default_severity(&self) -> Severity {
        match self {
            IssueCategory::Crash
            | IssueCategory::ImagePull
            | IssueCategory::Configuration
            | IssueCategory::ResourceLimit
            | IssueCategory::NodeUnreachable
            | IssueCategory::Network => Severity::Critical,
            IssueCategory::Pending
            | IssueCategory::Probe
            | IssueCategory::NodePressure
            | IssueCategory::Storage
            | IssueCategory::AksNodePool
            | IssueCategory::ManagedIdentity
            | IssueCategory::GkeNodePool
            | IssueCategory::WorkloadIdentity => Severity::Warning,
            IssueCategory::SpotEviction | IssueCategory::Preemption => Severity::Info,
        }
    }

    pub fn is_aks(&self) -> bool {
        matches!(
            self,
            IssueCategory::AksNodePool | IssueCategory::SpotEviction | IssueCategory::ManagedIdentity
        )
    }

    pub fn is_gke(&self) -> bool {
        matches!(
            self,
            IssueCategory::GkeNodePool | IssueCategory::Preemption | IssueCategory::WorkloadIdentity
        )
    }

    /// Provider that owns this category, if any
    pub fn provider(&self) -> Option<CloudProvider> {
        if self.is_aks() {
            Some(CloudProvider::Aks)
        } else if self.is_gke() {
            Some(CloudProvider::Gke)
        } else {
            None
        }
    }

    /// Stable lowercase identifier, used in issue ids
    pub fn slug(&self) -> &'static str {
        match self {
            IssueCategory::Crash => "crash",
            IssueCategory::ImagePull => "image-pull",
            IssueCategory::Configuration => "configuration",
            IssueCategory::ResourceLimit => "resource-limit",
            IssueCategory::Pending => "pending",
            IssueCategory::Probe => "probe",
            IssueCategory::NodeUnreachable => "node-unreachable",
            IssueCategory::NodePressure => "node-pressure",
            IssueCategory::Network => "network",
            IssueCategory::Storage => "storage",
            IssueCategory::AksNodePool => "aks-node-pool",
            IssueCategory::SpotEviction => "spot-eviction",
            IssueCategory::ManagedIdentity => "managed-identity",
            IssueCategory::GkeNodePool => "gke-node-pool",
            IssueCategory::Preemption => "preemption",
            IssueCategory::WorkloadIdentity => "workload-identity",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCategory::Crash => write!(f, "Crash"),
            IssueCategory::ImagePull => write!(f, "ImagePull"),
            IssueCategory::Configuration => write!(f, "Configuration"),
            IssueCategory::ResourceLimit => write!(f, "ResourceLimit"),
            IssueCategory::Pending => write!(f, "Pending"),
            IssueCategory::Probe => write!(f, "Probe"),
            IssueCategory::NodeUnreachable => write!(f, "NodeUnreachable"),
            IssueCategory::NodePressure => write!(f, "NodePressure"),
            IssueCategory::Network => write!(f, "Network"),
            IssueCategory::Storage => write!(f, "Storage"),
            IssueCategory::AksNodePool => write!(f, "NodePool (AKS)"),
            IssueCategory::SpotEviction => write!(f, "SpotEviction"),
            IssueCategory::ManagedIdentity => write!(f, "ManagedIdentity"),
            IssueCategory::GkeNodePool => write!(f, "NodePool (GKE)"),
            IssueCategory::Preemption => write!(f, "Preemption"),
            IssueCategory::WorkloadIdentity => write!(f, "WorkloadIdentity"),
        }
    }
}

/// Reference to a single Kubernetes object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Kind of resource (Pod, Deployment, Node, ...)
    #[serde(rename = "resource_type")]
    pub kind: String,
    #[serde(rename = "resource_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(String::from),
        }
    }

    pub fn pod(namespace: &str, name: &str) -> Self {
        Self::new("Pod", Some(namespace), name)
    }

    pub fn deployment(namespace: &str, name: &str) -> Self {
        Self::new("Deployment", Some(namespace), name)
    }

    pub fn node(name: &str) -> Self {
        Self::new("Node", None, name)
    }

    /// `namespace/name` for namespaced objects, `name` otherwise
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.qualified_name())
    }
}

/// A single detected issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Stable identifier; detecting the same problem twice yields the same id
    pub id: String,
    pub severity: Severity,
    pub category: IssueCategory,
    #[serde(flatten)]
    pub resource: ResourceRef,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl Issue {
    /// Create an issue with the category's default severity.
    ///
    /// `rule` distinguishes several issues of the same category on one
    /// resource (a container name, a condition type); it may be empty.
    pub fn new(
        category: IssueCategory,
        resource: ResourceRef,
        rule: &str,
        message: impl Into<String>,
    ) -> Self {
        let id = issue_id(&resource, category, rule);
        Self {
            id,
            severity: category.default_severity(),
            category,
            resource,
            message: message.into(),
            details: None,
            detected_at: Utc::now(),
            suggestions: Vec::new(),
        }
    }

    /// Override the category's default severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }
}

fn issue_id(resource: &ResourceRef, category: IssueCategory, rule: &str) -> String {
    let mut id = format!(
        "{}/{}/{}:{}",
        resource.kind.to_lowercase(),
        resource.namespace.as_deref().unwrap_or("-"),
        resource.name,
        category.slug()
    );
    if !rule.is_empty() {
        id.push(':');
        id.push_str(&rule.to_lowercase());
    }
    id
}

/// Scope of a diagnostic request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticScope {
    Cluster,
    Namespace,
    Resource,
}

impl fmt::Display for DiagnosticScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticScope::Cluster => write!(f, "cluster"),
            DiagnosticScope::Namespace => write!(f, "namespace"),
            DiagnosticScope::Resource => write!(f, "resource"),
        }
    }
}

/// Kubernetes event, reduced to the fields diagnostics use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub involved_kind: String,
    pub involved_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl EventRecord {
    pub fn is_warning(&self) -> bool {
        self.event_type == "Warning"
    }
}

/// Classified log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
}

/// A single classified log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub line: String,
}

/// Result of one diagnostic invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub scope: DiagnosticScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<CloudProvider>,
    pub summary: String,
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
    #[serde(default)]
    pub logs: Vec<LogLine>,
    /// List items that could not be decoded and were left out of detection
    #[serde(default)]
    pub skipped_items: usize,
    pub generated_at: DateTime<Utc>,
}

impl DiagnosticReport {
    pub fn new(scope: DiagnosticScope, issues: Vec<Issue>) -> Self {
        Self {
            scope,
            resource: None,
            namespace: None,
            provider: None,
            summary: String::new(),
            issues,
            events: Vec::new(),
            logs: Vec::new(),
            skipped_items: 0,
            generated_at: Utc::now(),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn critical_count(&self) -> usize {
        self.count(Severity::Critical)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Whether any issue is in the Crash category (gates log collection)
    pub fn has_crash_issue(&self) -> bool {
        has_crash_issue(&self.issues)
    }

    /// Issues at least as severe as `min`
    pub fn filter_by_severity(&self, min: Severity) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.severity.at_least(min)).collect()
    }

    /// Drop issues less severe than `min`
    pub fn retain_severity(&mut self, min: Severity) {
        self.issues.retain(|i| i.severity.at_least(min));
    }
}

pub(crate) fn has_crash_issue(issues: &[Issue]) -> bool {
    issues.iter().any(|i| i.category == IssueCategory::Crash)
}

/// Exit code analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitCodeInfo {
    pub code: i32,
    pub signal: Option<String>,
    pub meaning: String,
}

impl ExitCodeInfo {
    /// Interpret a container exit code
    pub fn analyze(code: i32) -> Self {
        let meaning = match code {
            0 => "Success",
            1 => "General application error",
            2 => "Misuse of shell command",
            126 => "Command not executable",
            127 => "Command not found",
            134 => "SIGABRT (abort)",
            137 => "SIGKILL (killed, often OOM)",
            139 => "SIGSEGV (segmentation fault)",
            143 => "SIGTERM (graceful termination)",
            255 => "Exit status out of range",
            _ => "Unknown exit code",
        };

        let signal = if code > 128 && code < 165 {
            Some(format!("Signal {}", code - 128))
        } else {
            None
        };

        Self {
            code,
            signal,
            meaning: meaning.to_string(),
        }
    }
}
