//! Tests for resource status extraction

use kubesre::error::SreError;
use kubesre::sre::status::{
    extract_deployment, extract_node, extract_nodes, extract_pod, extract_pods, extract_pvcs,
    extract_resource, extract_service_accounts, extract_services, extract_statuses,
    normalize_kind, ContainerState, ResourceStatus,
};

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

use common::*;

// ============================================================================
// Pods
// ============================================================================

#[test]
fn test_extract_running_pod() {
    let json = json_bytes(&to_json(&running_pod("web-1", "shop")));
    let pod = extract_pod(&json).unwrap();

    assert_eq!(pod.name, "web-1");
    assert_eq!(pod.namespace, "shop");
    assert_eq!(pod.phase, "Running");
    assert_eq!(pod.node_name, "node-1");
    assert!(pod.is_ready());
    assert!(pod.is_running_ready());
    assert_eq!(pod.containers.len(), 1);
    assert_eq!(pod.ready_containers(), 1);
    assert!(matches!(pod.containers[0].state, ContainerState::Running { .. }));
}

#[test]
fn test_extract_waiting_container() {
    let json = json_bytes(&to_json(&crashloop_pod("api", "shop", 7)));
    let pod = extract_pod(&json).unwrap();

    let container = &pod.containers[0];
    assert_eq!(container.restart_count, 7);
    assert_eq!(container.waiting_reason(), Some("CrashLoopBackOff"));
    assert!(!pod.is_ready());
    assert_eq!(pod.total_restarts(), 7);
}

#[test]
fn test_extract_oom_killed_container() {
    let pod = pod_with_containers("batch", "jobs", "Running", vec![oom_killed_container("worker")]);
    let status = extract_pod(&json_bytes(&to_json(&pod))).unwrap();

    assert!(status.containers[0].oom_killed());
    match &status.containers[0].state {
        ContainerState::Terminated { exit_code, .. } => assert_eq!(*exit_code, 137),
        other => panic!("unexpected state: {:?}", other),
    }
}

#[test]
fn test_extract_pod_missing_fields_default_to_zero_values() {
    let pod = extract_pod(br#"{"metadata": {"name": "bare"}}"#).unwrap();
    assert_eq!(pod.name, "bare");
    assert_eq!(pod.namespace, "");
    assert_eq!(pod.phase, "");
    assert!(pod.containers.is_empty());
    assert!(pod.conditions.is_empty());
}

#[test]
fn test_extract_pod_malformed_json_fails() {
    let err = extract_pod(b"{not json").unwrap_err();
    assert!(matches!(err, SreError::Parse(_)));
}

#[test]
fn test_extract_pods_from_list() {
    let json = json_bytes(&list_of(&[
        running_pod("a", "default"),
        pod_in_phase("b", "default", "Pending"),
    ]));
    let extracted = extract_pods(&json).unwrap();

    assert_eq!(extracted.items.len(), 2);
    assert_eq!(extracted.skipped, 0);
    assert_eq!(extracted.items[1].phase, "Pending");
}

#[test]
fn test_extract_pods_skips_malformed_items() {
    let mut list = list_of(&[running_pod("good", "default")]);
    list["items"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({ "metadata": { "name": 42 } }));

    let extracted = extract_pods(&json_bytes(&list)).unwrap();
    assert_eq!(extracted.items.len(), 1);
    assert_eq!(extracted.items[0].name, "good");
    assert_eq!(extracted.skipped, 1);
}

#[test]
fn test_extract_pods_accepts_single_object() {
    let json = json_bytes(&to_json(&running_pod("solo", "default")));
    let extracted = extract_pods(&json).unwrap();
    assert_eq!(extracted.items.len(), 1);
}

#[test]
fn test_extract_pods_empty_and_null_items() {
    assert!(extract_pods(br#"{"kind": "List", "items": []}"#).unwrap().items.is_empty());
    assert!(extract_pods(br#"{"kind": "List", "items": null}"#).unwrap().items.is_empty());
}

#[test]
fn test_extract_pods_rejects_non_array_items() {
    let err = extract_pods(br#"{"items": "nope"}"#).unwrap_err();
    assert!(matches!(err, SreError::Parse(_)));
}

// ============================================================================
// Deployments and nodes
// ============================================================================

#[test]
fn test_extract_deployment_replicas() {
    let json = json_bytes(&to_json(&deployment("api", "shop", 3, 2, 1)));
    let deploy = extract_deployment(&json).unwrap();

    assert_eq!(deploy.desired_replicas, 3);
    assert_eq!(deploy.ready_replicas, 2);
    assert_eq!(deploy.available_replicas, 2);
    assert_eq!(deploy.unavailable_replicas, 1);
}

#[test]
fn test_extract_deployment_defaults_desired_to_one() {
    let deploy = extract_deployment(br#"{"metadata": {"name": "x", "namespace": "y"}}"#).unwrap();
    assert_eq!(deploy.desired_replicas, 1);
    assert_eq!(deploy.ready_replicas, 0);
}

#[test]
fn test_extract_node_conditions() {
    let node = node_with_conditions(
        "node-a",
        &[
            ("Ready", "False"),
            ("MemoryPressure", "True"),
            ("DiskPressure", "False"),
            ("PIDPressure", "True"),
            ("NetworkUnavailable", "True"),
        ],
    );
    let status = extract_node(&json_bytes(&to_json(&node))).unwrap();

    assert!(!status.ready);
    assert!(status.pressure.memory);
    assert!(!status.pressure.disk);
    assert!(status.pressure.pid);
    assert!(status.network_unavailable);
    assert_eq!(status.condition("Ready").unwrap().status, "False");
}

#[test]
fn test_extract_node_labels_and_provider_id() {
    let node = with_provider_id(
        with_labels(node("aks-1", true), &[("kubernetes.azure.com/agentpool", "system")]),
        "azure:///subscriptions/x/vm/0",
    );
    let status = extract_node(&json_bytes(&to_json(&node))).unwrap();

    assert!(status.ready);
    assert_eq!(status.label("kubernetes.azure.com/agentpool"), Some("system"));
    assert!(status.provider_id.starts_with("azure://"));
}

#[test]
fn test_extract_nodes_list() {
    let json = json_bytes(&list_of(&[node("a", true), node("b", false)]));
    let nodes = extract_nodes(&json).unwrap().items;
    assert_eq!(nodes.len(), 2);
    assert!(nodes[0].ready);
    assert!(!nodes[1].ready);
}

// ============================================================================
// PVCs, services, service accounts
// ============================================================================

#[test]
fn test_extract_pvcs() {
    let json = json_bytes(&list_of(&[pvc("data", "db", "Bound"), pvc("logs", "db", "Pending")]));
    let pvcs = extract_pvcs(&json).unwrap().items;

    assert!(pvcs[0].is_bound());
    assert!(pvcs[1].is_pending());
    assert_eq!(pvcs[1].storage_class, "standard");
}

#[test]
fn test_extract_services() {
    let json = json_bytes(&list_of(&[
        service("web", "shop", "LoadBalancer", true),
        service("api", "shop", "LoadBalancer", false),
        service("internal", "shop", "ClusterIP", false),
    ]));
    let services = extract_services(&json).unwrap().items;

    assert!(services[0].is_healthy());
    assert!(services[1].is_pending_load_balancer());
    assert!(services[2].is_healthy());
}

#[test]
fn test_extract_service_accounts_annotations() {
    let json = json_bytes(&list_of(&[service_account(
        "app",
        "shop",
        &[("iam.gke.io/gcp-service-account", "app@proj.iam.gserviceaccount.com")],
    )]));
    let accounts = extract_service_accounts(&json).unwrap().items;

    assert_eq!(accounts[0].name, "app");
    assert_eq!(
        accounts[0].annotations.get("iam.gke.io/gcp-service-account").map(String::as_str),
        Some("app@proj.iam.gserviceaccount.com")
    );
}

// ============================================================================
// Kind dispatch
// ============================================================================

#[test]
fn test_normalize_kind_aliases() {
    assert_eq!(normalize_kind("po"), Some("pod"));
    assert_eq!(normalize_kind("Pods"), Some("pod"));
    assert_eq!(normalize_kind("deploy"), Some("deployment"));
    assert_eq!(normalize_kind("Node"), Some("node"));
    assert_eq!(normalize_kind("statefulset"), None);
}

#[test]
fn test_extract_resource_dispatch() {
    let json = json_bytes(&to_json(&node("n1", true)));
    let status = extract_resource("no", &json).unwrap();

    assert!(matches!(status, ResourceStatus::Node(_)));
    assert_eq!(status.kind(), "Node");
    assert_eq!(status.name(), "n1");
    assert_eq!(status.namespace(), None);
}

#[test]
fn test_extract_resource_unsupported_kind() {
    let err = extract_resource("statefulset", b"{}").unwrap_err();
    assert!(matches!(err, SreError::UnsupportedKind(k) if k == "statefulset"));
}

#[test]
fn test_extract_statuses_list() {
    let json = json_bytes(&list_of(&[deployment("a", "ns", 1, 1, 0)]));
    let extracted = extract_statuses("deployments", &json).unwrap();
    assert_eq!(extracted.items.len(), 1);
    assert_eq!(extracted.items[0].namespace(), Some("ns"));
}
