//! Tests for cluster health scoring

use kubesre::config::parse_config;
use kubesre::sre::health::{
    clamp_score, summarize, HealthInput, HealthStatus, PodCounts, ScoringWeights,
    CRITICAL_THRESHOLD, DEGRADED_THRESHOLD, NETWORK_WEIGHT, NODE_WEIGHT, STORAGE_WEIGHT,
    WORKLOAD_WEIGHT,
};
use kubesre::sre::status::{extract_nodes, extract_pods, extract_pvcs, extract_services};

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

use common::*;

fn weights() -> ScoringWeights {
    ScoringWeights::default()
}

// ============================================================================
// Constants and bounds
// ============================================================================

#[test]
fn test_default_weights_sum_to_one() {
    let sum = NODE_WEIGHT + WORKLOAD_WEIGHT + STORAGE_WEIGHT + NETWORK_WEIGHT;
    assert!((sum - 1.0).abs() < 1e-9);
    assert!(CRITICAL_THRESHOLD < DEGRADED_THRESHOLD);
}

#[test]
fn test_clamp_score() {
    assert_eq!(clamp_score(-12.0), 0.0);
    assert_eq!(clamp_score(140.0), 100.0);
    assert_eq!(clamp_score(f64::NAN), 0.0);
    assert_eq!(clamp_score(63.5), 63.5);
}

#[test]
fn test_component_scores_stay_in_bounds() {
    let w = weights();
    for critical in 0..30 {
        for warning in 0..30 {
            let node = w.score_nodes(3, 5, critical, warning);
            let workload = w.score_workloads(7, 10, critical, warning);
            assert!((0.0..=100.0).contains(&node));
            assert!((0.0..=100.0).contains(&workload));
            let overall = w.overall_score(node, workload, 100.0, 0.0, critical, warning);
            assert!((0.0..=100.0).contains(&overall));
        }
    }
}

#[test]
fn test_empty_totals_score_full() {
    let w = weights();
    assert_eq!(w.score_nodes(0, 0, 0, 0), 100.0);
    assert_eq!(w.score_storage(0, 0, 0), 100.0);
    assert_eq!(w.score_network(0, 0, 0), 100.0);
}

#[test]
fn test_component_penalties() {
    let w = weights();
    assert_eq!(w.score_nodes(4, 4, 1, 1), 75.0);
    assert_eq!(w.score_workloads(10, 10, 1, 2), 84.0);
    assert_eq!(w.score_storage(2, 4, 2), 30.0);
    assert_eq!(w.score_network(9, 10, 1), 85.0);
}

// ============================================================================
// Overall score and status
// ============================================================================

#[test]
fn test_perfect_components_are_healthy() {
    let w = weights();
    let score = w.overall_score(100.0, 100.0, 100.0, 100.0, 0, 0);

    assert!((95.0..=100.0).contains(&score), "score {}", score);
    assert_eq!(w.overall_status(score, 0, 0), HealthStatus::Healthy);
}

#[test]
fn test_poor_components_with_critical_issues_are_critical() {
    let w = weights();
    let score = w.overall_score(50.0, 30.0, 60.0, 40.0, 5, 0);

    assert!((15.0..=50.0).contains(&score), "score {}", score);
    assert_eq!(w.overall_status(score, 5, 0), HealthStatus::Critical);
}

#[test]
fn test_warnings_degrade_status() {
    let w = weights();
    assert_eq!(w.overall_status(99.0, 0, 1), HealthStatus::Degraded);
    assert_eq!(w.overall_status(70.0, 0, 0), HealthStatus::Degraded);
}

#[test]
fn test_component_status_thresholds() {
    let w = weights();
    assert_eq!(w.component_status(90.0, false), HealthStatus::Healthy);
    assert_eq!(w.component_status(60.0, false), HealthStatus::Degraded);
    assert_eq!(w.component_status(40.0, false), HealthStatus::Critical);
    assert_eq!(w.component_status(100.0, true), HealthStatus::Critical);
}

#[test]
fn test_custom_weights_from_config() {
    let config = parse_config(
        r#"
[scoring]
node_weight = 0.5
workload_weight = 0.5
storage_weight = 0.0
network_weight = 0.0
"#,
    )
    .unwrap();

    assert_eq!(config.scoring.node_weight, 0.5);
    assert_eq!(config.scoring.overall_critical_penalty, 5.0);
    let score = config.scoring.overall_score(100.0, 0.0, 0.0, 0.0, 0, 0);
    assert_eq!(score, 50.0);
}

// ============================================================================
// Summaries
// ============================================================================

#[test]
fn test_summarize_healthy_cluster() {
    let input = HealthInput {
        nodes: extract_nodes(&json_bytes(&list_of(&[node("a", true), node("b", true)])))
            .unwrap()
            .items,
        pods: extract_pods(&json_bytes(&list_of(&[
            running_pod("web", "shop"),
            running_pod("api", "shop"),
        ])))
        .unwrap()
        .items,
        pvcs: extract_pvcs(&json_bytes(&list_of(&[pvc("data", "shop", "Bound")])))
            .unwrap()
            .items,
        services: extract_services(&json_bytes(&list_of(&[service("web", "shop", "LoadBalancer", true)])))
            .unwrap()
            .items,
    };

    let summary = summarize(&input, &weights());

    assert_eq!(summary.status, HealthStatus::Healthy);
    assert!((summary.score - 100.0).abs() < 1e-9, "score {}", summary.score);
    assert_eq!(summary.workloads.details, "2/2 pods running and ready");
    assert_eq!(summary.critical_issues, 0);
    assert_eq!(
        summary.pods,
        PodCounts {
            total: 2,
            running: 2,
            pending: 0,
            failed: 0
        }
    );
}

#[test]
fn test_completed_pods_count_toward_workload_total() {
    let input = HealthInput {
        nodes: extract_nodes(&json_bytes(&list_of(&[node("a", true)])))
            .unwrap()
            .items,
        pods: extract_pods(&json_bytes(&list_of(&[
            running_pod("web", "shop"),
            running_pod("api", "shop"),
            pod_in_phase("migrate", "shop", "Succeeded"),
        ])))
        .unwrap()
        .items,
        ..Default::default()
    };

    let summary = summarize(&input, &weights());

    assert_eq!(summary.workloads.details, "2/3 pods running and ready");
    assert!((summary.workloads.score - 200.0 / 3.0).abs() < 1e-9, "score {}", summary.workloads.score);
    assert_eq!(summary.workloads.status, HealthStatus::Degraded);
    let expected = 0.30 * 100.0 + 0.40 * (200.0 / 3.0) + 0.15 * 100.0 + 0.15 * 100.0;
    assert!((summary.score - expected).abs() < 1e-9, "score {}", summary.score);
    assert_eq!(summary.status, HealthStatus::Healthy);
}

#[test]
fn test_summarize_critical_node_forces_component_critical() {
    let input = HealthInput {
        nodes: extract_nodes(&json_bytes(&list_of(&[
            node("a", true),
            node("b", true),
            node("c", true),
            node("d", true),
            node("e", false),
        ])))
        .unwrap()
        .items,
        ..Default::default()
    };

    let summary = summarize(&input, &weights());

    // 80% ready less one critical penalty
    assert_eq!(summary.nodes.score, 60.0);
    assert_eq!(summary.nodes.status, HealthStatus::Critical);
    assert_eq!(summary.critical_issues, 1);
    assert_eq!(summary.status, HealthStatus::Critical);
}

#[test]
fn test_summarize_empty_cluster() {
    let summary = summarize(&HealthInput::default(), &weights());
    assert!((summary.score - 100.0).abs() < 1e-9);
    assert_eq!(summary.status, HealthStatus::Healthy);
    assert!(summary.warnings.is_empty());
}

#[test]
fn test_summarize_pending_storage_and_network() {
    let input = HealthInput {
        pvcs: extract_pvcs(&json_bytes(&list_of(&[
            pvc("a", "db", "Bound"),
            pvc("b", "db", "Pending"),
        ])))
        .unwrap()
        .items,
        services: extract_services(&json_bytes(&list_of(&[service("lb", "db", "LoadBalancer", false)])))
            .unwrap()
            .items,
        ..Default::default()
    };

    let summary = summarize(&input, &weights());

    assert_eq!(summary.storage.score, 40.0);
    assert_eq!(summary.network.score, 0.0);
    assert_eq!(summary.warning_issues, 2);
    assert_eq!(summary.status, HealthStatus::Degraded);
}
