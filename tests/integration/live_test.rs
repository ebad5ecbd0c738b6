//! Tests against a real cluster through `kubectl`
//!
//! These need a kubeconfig with a reachable current context:
//! cargo test -- --ignored

use kubesre::client::{list_contexts, KubeClient, KubectlClient};
use kubesre::sre::health::ScoringWeights;
use kubesre::sre::{DiagnosticsManager, DiagnosticsOptions, HealthManager};
use std::sync::Arc;

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

use common::*;

fn client() -> Arc<dyn KubeClient> {
    Arc::new(KubectlClient::default())
}

#[test]
#[ignore]
fn test_list_contexts() {
    if !has_kubeconfig() {
        eprintln!("Skipping: no kubeconfig");
        return;
    }
    let contexts = list_contexts().unwrap();
    assert!(!contexts.is_empty());
    assert!(contexts.iter().filter(|c| c.is_current).count() <= 1);
}

#[tokio::test]
#[ignore]
async fn test_cluster_diagnosis() {
    if !has_kubeconfig() {
        eprintln!("Skipping: no kubeconfig");
        return;
    }
    let manager = DiagnosticsManager::new(client(), DiagnosticsOptions::default());
    let report = manager.diagnose_cluster().await.unwrap();

    assert!(!report.summary.is_empty());
    println!("{}", report.summary);
}

#[tokio::test]
#[ignore]
async fn test_kube_system_namespace() {
    if !has_kubeconfig() {
        eprintln!("Skipping: no kubeconfig");
        return;
    }
    let manager = DiagnosticsManager::new(client(), DiagnosticsOptions::default());
    let report = manager.diagnose_namespace("kube-system").await.unwrap();

    assert_eq!(report.namespace.as_deref(), Some("kube-system"));
}

#[tokio::test]
#[ignore]
async fn test_missing_pod_is_not_found() {
    if !has_kubeconfig() {
        eprintln!("Skipping: no kubeconfig");
        return;
    }
    let manager = DiagnosticsManager::new(client(), DiagnosticsOptions::default());
    let err = manager
        .diagnose_pod("default", "kubesre-does-not-exist")
        .await
        .unwrap_err();

    assert!(matches!(err, kubesre::error::SreError::NotFound { .. }));
}

#[tokio::test]
#[ignore]
async fn test_cluster_health() {
    if !has_kubeconfig() {
        eprintln!("Skipping: no kubeconfig");
        return;
    }
    let health = HealthManager::new(client(), ScoringWeights::default(), true);
    let summary = health.get_cluster_health().await.unwrap();

    assert!((0.0..=100.0).contains(&summary.score));
    assert!(summary.nodes.details.ends_with("nodes ready"));
}
