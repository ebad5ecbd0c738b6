//! Resource status extraction
//!
//! Decodes raw Kubernetes JSON (as returned by `kubectl get -o json`) into
//! normalized status records. Single objects and `List` documents are both
//! accepted. Missing optional fields become zero values; a list item that
//! fails to decode is skipped and counted instead of failing the whole list.

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ContainerStatus as K8sContainerStatus, Node, PersistentVolumeClaim, Pod, Service,
    ServiceAccount,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, SreError};

/// Normalized object condition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: String,
    pub message: String,
}

impl Condition {
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    pub fn is_false(&self) -> bool {
        self.status == "False"
    }
}

fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Container state as reported by the kubelet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ContainerState {
    Running {
        started_at: Option<DateTime<Utc>>,
    },
    Waiting {
        reason: String,
        message: String,
    },
    Terminated {
        reason: String,
        message: String,
        exit_code: i32,
    },
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
    pub state: ContainerState,
    /// Previous termination, when the container has restarted
    pub last_state: ContainerState,
}

impl ContainerStatus {
    pub fn waiting_reason(&self) -> Option<&str> {
        match &self.state {
            ContainerState::Waiting { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Whether the current or last termination was an OOM kill
    pub fn oom_killed(&self) -> bool {
        [&self.state, &self.last_state].iter().any(|s| {
            matches!(s, ContainerState::Terminated { reason, .. } if reason == "OOMKilled")
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub node_name: String,
    pub conditions: Vec<Condition>,
    pub containers: Vec<ContainerStatus>,
    pub init_containers: Vec<ContainerStatus>,
}

impl PodStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(&self.conditions, type_)
    }

    pub fn is_ready(&self) -> bool {
        self.condition("Ready").map(Condition::is_true).unwrap_or(false)
    }

    pub fn ready_containers(&self) -> usize {
        self.containers.iter().filter(|c| c.ready).count()
    }

    /// Running with a True Ready condition
    pub fn is_running_ready(&self) -> bool {
        self.phase == "Running" && self.is_ready()
    }

    pub fn total_restarts(&self) -> i32 {
        self.containers.iter().map(|c| c.restart_count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub name: String,
    pub namespace: String,
    pub desired_replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub unavailable_replicas: i32,
    pub updated_replicas: i32,
    pub conditions: Vec<Condition>,
}

impl DeploymentStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(&self.conditions, type_)
    }
}

/// Node pressure flags taken from the node conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePressure {
    pub memory: bool,
    pub disk: bool,
    pub pid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub provider_id: String,
    pub ready: bool,
    pub unschedulable: bool,
    pub pressure: NodePressure,
    /// NetworkUnavailable condition is True
    pub network_unavailable: bool,
    pub conditions: Vec<Condition>,
    pub allocatable: BTreeMap<String, String>,
    pub capacity: BTreeMap<String, String>,
}

impl NodeStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(&self.conditions, type_)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Normalized snapshot of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResourceStatus {
    Pod(PodStatus),
    Deployment(DeploymentStatus),
    Node(NodeStatus),
}

impl ResourceStatus {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceStatus::Pod(_) => "Pod",
            ResourceStatus::Deployment(_) => "Deployment",
            ResourceStatus::Node(_) => "Node",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ResourceStatus::Pod(p) => &p.name,
            ResourceStatus::Deployment(d) => &d.name,
            ResourceStatus::Node(n) => &n.name,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            ResourceStatus::Pod(p) => Some(&p.namespace),
            ResourceStatus::Deployment(d) => Some(&d.namespace),
            ResourceStatus::Node(_) => None,
        }
    }
}

/// PersistentVolumeClaim binding state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvcStatus {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub storage_class: String,
}

impl PvcStatus {
    pub fn is_bound(&self) -> bool {
        self.phase == "Bound"
    }

    pub fn is_pending(&self) -> bool {
        self.phase == "Pending"
    }
}

/// Service exposure state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub namespace: String,
    pub service_type: String,
    pub cluster_ip: String,
    pub has_ingress: bool,
}

impl ServiceStatus {
    pub fn is_load_balancer(&self) -> bool {
        self.service_type == "LoadBalancer"
    }

    /// LoadBalancer still waiting for an external address
    pub fn is_pending_load_balancer(&self) -> bool {
        self.is_load_balancer() && !self.has_ingress
    }

    /// ClusterIP, headless, NodePort and ExternalName services count as
    /// healthy; a LoadBalancer needs an assigned ingress.
    pub fn is_healthy(&self) -> bool {
        !self.is_pending_load_balancer()
    }
}

/// Service account with its annotations, for identity checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountInfo {
    pub name: String,
    pub namespace: String,
    pub annotations: BTreeMap<String, String>,
}

/// Records decoded from a list, plus the count of items that failed to decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Extracted<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> Extracted<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Extracted<U> {
        Extracted {
            items: self.items.into_iter().map(f).collect(),
            skipped: self.skipped,
        }
    }
}

/// Decode a single object. Any failure is fatal.
fn decode_one<T: DeserializeOwned>(json: &[u8]) -> Result<T> {
    serde_json::from_slice(json).map_err(|e| SreError::Parse(e.to_string()))
}

/// Decode a `List` document or a single object, skipping malformed items
pub(crate) fn decode_many<T: DeserializeOwned>(json: &[u8]) -> Result<Extracted<T>> {
    let value: serde_json::Value = serde_json::from_slice(json)?;

    let items = match value {
        serde_json::Value::Object(mut obj) => match obj.remove("items") {
            Some(serde_json::Value::Array(items)) => items,
            Some(serde_json::Value::Null) => Vec::new(),
            Some(_) => return Err(SreError::Parse("`items` is not an array".to_string())),
            None => vec![serde_json::Value::Object(obj)],
        },
        serde_json::Value::Array(items) => items,
        _ => return Err(SreError::Parse("expected a JSON object".to_string())),
    };

    let mut out = Extracted::default();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(v) => out.items.push(v),
            Err(e) => {
                debug!(index, error = %e, "Skipping list item that failed to decode");
                out.skipped += 1;
            }
        }
    }
    Ok(out)
}

fn to_conditions<I>(iter: I) -> Vec<Condition>
where
    I: IntoIterator<Item = (String, String, Option<String>, Option<String>)>,
{
    iter.into_iter()
        .map(|(type_, status, reason, message)| Condition {
            type_,
            status,
            reason: reason.unwrap_or_default(),
            message: message.unwrap_or_default(),
        })
        .collect()
}

fn to_container_state(state: Option<&k8s_openapi::api::core::v1::ContainerState>) -> ContainerState {
    let Some(state) = state else {
        return ContainerState::Unknown;
    };

    if let Some(waiting) = &state.waiting {
        ContainerState::Waiting {
            reason: waiting.reason.clone().unwrap_or_default(),
            message: waiting.message.clone().unwrap_or_default(),
        }
    } else if let Some(terminated) = &state.terminated {
        ContainerState::Terminated {
            reason: terminated.reason.clone().unwrap_or_default(),
            message: terminated.message.clone().unwrap_or_default(),
            exit_code: terminated.exit_code,
        }
    } else if let Some(running) = &state.running {
        ContainerState::Running {
            started_at: running.started_at.as_ref().map(|t| t.0),
        }
    } else {
        ContainerState::Unknown
    }
}

fn to_container_status(cs: &K8sContainerStatus) -> ContainerStatus {
    ContainerStatus {
        name: cs.name.clone(),
        ready: cs.ready,
        restart_count: cs.restart_count,
        state: to_container_state(cs.state.as_ref()),
        last_state: to_container_state(cs.last_state.as_ref()),
    }
}

pub fn pod_status(pod: &Pod) -> PodStatus {
    let status = pod.status.as_ref();

    PodStatus {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        phase: status.and_then(|s| s.phase.clone()).unwrap_or_default(),
        node_name: pod
            .spec
            .as_ref()
            .and_then(|s| s.node_name.clone())
            .unwrap_or_default(),
        conditions: to_conditions(
            status
                .and_then(|s| s.conditions.clone())
                .unwrap_or_default()
                .into_iter()
                .map(|c| (c.type_, c.status, c.reason, c.message)),
        ),
        containers: status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|list| list.iter().map(to_container_status).collect())
            .unwrap_or_default(),
        init_containers: status
            .and_then(|s| s.init_container_statuses.as_ref())
            .map(|list| list.iter().map(to_container_status).collect())
            .unwrap_or_default(),
    }
}

pub fn deployment_status(deploy: &Deployment) -> DeploymentStatus {
    let status = deploy.status.as_ref();

    DeploymentStatus {
        name: deploy.metadata.name.clone().unwrap_or_default(),
        namespace: deploy.metadata.namespace.clone().unwrap_or_default(),
        // The API server defaults spec.replicas to 1
        desired_replicas: deploy.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
        ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
        available_replicas: status.and_then(|s| s.available_replicas).unwrap_or(0),
        unavailable_replicas: status.and_then(|s| s.unavailable_replicas).unwrap_or(0),
        updated_replicas: status.and_then(|s| s.updated_replicas).unwrap_or(0),
        conditions: to_conditions(
            status
                .and_then(|s| s.conditions.clone())
                .unwrap_or_default()
                .into_iter()
                .map(|c| (c.type_, c.status, c.reason, c.message)),
        ),
    }
}

pub fn node_status(node: &Node) -> NodeStatus {
    let status = node.status.as_ref();
    let conditions = to_conditions(
        status
            .and_then(|s| s.conditions.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|c| (c.type_, c.status, c.reason, c.message)),
    );

    let is_true = |type_: &str| {
        find_condition(&conditions, type_)
            .map(Condition::is_true)
            .unwrap_or(false)
    };

    let quantities = |q: Option<&BTreeMap<String, k8s_openapi::apimachinery::pkg::api::resource::Quantity>>| {
        q.map(|m| m.iter().map(|(k, v)| (k.clone(), v.0.clone())).collect())
            .unwrap_or_default()
    };

    NodeStatus {
        name: node.metadata.name.clone().unwrap_or_default(),
        labels: node.metadata.labels.clone().unwrap_or_default(),
        provider_id: node
            .spec
            .as_ref()
            .and_then(|s| s.provider_id.clone())
            .unwrap_or_default(),
        ready: is_true("Ready"),
        unschedulable: node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false),
        pressure: NodePressure {
            memory: is_true("MemoryPressure"),
            disk: is_true("DiskPressure"),
            pid: is_true("PIDPressure"),
        },
        network_unavailable: is_true("NetworkUnavailable"),
        allocatable: quantities(status.and_then(|s| s.allocatable.as_ref())),
        capacity: quantities(status.and_then(|s| s.capacity.as_ref())),
        conditions,
    }
}

pub fn pvc_status(pvc: &PersistentVolumeClaim) -> PvcStatus {
    PvcStatus {
        name: pvc.metadata.name.clone().unwrap_or_default(),
        namespace: pvc.metadata.namespace.clone().unwrap_or_default(),
        phase: pvc
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_default(),
        storage_class: pvc
            .spec
            .as_ref()
            .and_then(|s| s.storage_class_name.clone())
            .unwrap_or_default(),
    }
}

pub fn service_status(svc: &Service) -> ServiceStatus {
    let spec = svc.spec.as_ref();
    ServiceStatus {
        name: svc.metadata.name.clone().unwrap_or_default(),
        namespace: svc.metadata.namespace.clone().unwrap_or_default(),
        service_type: spec
            .and_then(|s| s.type_.clone())
            .unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec.and_then(|s| s.cluster_ip.clone()).unwrap_or_default(),
        has_ingress: svc
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| !ingress.is_empty())
            .unwrap_or(false),
    }
}

pub fn service_account_info(sa: &ServiceAccount) -> ServiceAccountInfo {
    ServiceAccountInfo {
        name: sa.metadata.name.clone().unwrap_or_default(),
        namespace: sa.metadata.namespace.clone().unwrap_or_default(),
        annotations: sa.metadata.annotations.clone().unwrap_or_default(),
    }
}

pub fn extract_pod(json: &[u8]) -> Result<PodStatus> {
    decode_one::<Pod>(json).map(|p| pod_status(&p))
}

pub fn extract_deployment(json: &[u8]) -> Result<DeploymentStatus> {
    decode_one::<Deployment>(json).map(|d| deployment_status(&d))
}

pub fn extract_node(json: &[u8]) -> Result<NodeStatus> {
    decode_one::<Node>(json).map(|n| node_status(&n))
}

pub fn extract_pods(json: &[u8]) -> Result<Extracted<PodStatus>> {
    decode_many::<Pod>(json).map(|e| e.map(|p| pod_status(&p)))
}

pub fn extract_deployments(json: &[u8]) -> Result<Extracted<DeploymentStatus>> {
    decode_many::<Deployment>(json).map(|e| e.map(|d| deployment_status(&d)))
}

pub fn extract_nodes(json: &[u8]) -> Result<Extracted<NodeStatus>> {
    decode_many::<Node>(json).map(|e| e.map(|n| node_status(&n)))
}

pub fn extract_pvcs(json: &[u8]) -> Result<Extracted<PvcStatus>> {
    decode_many::<PersistentVolumeClaim>(json).map(|e| e.map(|p| pvc_status(&p)))
}

pub fn extract_services(json: &[u8]) -> Result<Extracted<ServiceStatus>> {
    decode_many::<Service>(json).map(|e| e.map(|s| service_status(&s)))
}

pub fn extract_service_accounts(json: &[u8]) -> Result<Extracted<ServiceAccountInfo>> {
    decode_many::<ServiceAccount>(json).map(|e| e.map(|s| service_account_info(&s)))
}

/// Decode a single object of the given kind into a [`ResourceStatus`]
pub fn extract_resource(kind: &str, json: &[u8]) -> Result<ResourceStatus> {
    match normalize_kind(kind) {
        Some("pod") => extract_pod(json).map(ResourceStatus::Pod),
        Some("deployment") => extract_deployment(json).map(ResourceStatus::Deployment),
        Some("node") => extract_node(json).map(ResourceStatus::Node),
        _ => Err(SreError::UnsupportedKind(kind.to_string())),
    }
}

/// Decode a list (or a single object) of the given kind
pub fn extract_statuses(kind: &str, json: &[u8]) -> Result<Extracted<ResourceStatus>> {
    match normalize_kind(kind) {
        Some("pod") => extract_pods(json).map(|e| e.map(ResourceStatus::Pod)),
        Some("deployment") => extract_deployments(json).map(|e| e.map(ResourceStatus::Deployment)),
        Some("node") => extract_nodes(json).map(|e| e.map(ResourceStatus::Node)),
        _ => Err(SreError::UnsupportedKind(kind.to_string())),
    }
}

/// Map kubectl kind spellings (`po`, `pods`, `deploy`, `Node`) to a canonical
/// lowercase singular for the kinds the extractor understands
pub fn normalize_kind(kind: &str) -> Option<&'static str> {
    match kind.to_lowercase().as_str() {
        "po" | "pod" | "pods" => Some("pod"),
        "deploy" | "deployment" | "deployments" => Some("deployment"),
        "no" | "node" | "nodes" => Some("node"),
        _ => None,
    }
}
