//! HTTP handlers for the web API

use crate::client::{list_contexts, KubeClient};
use crate::error::SreError;
use crate::sre::diagnostics::DEFAULT_NAMESPACE;
use crate::sre::types::DiagnosticScope;
use crate::sre::{
    ClusterHealthSummary, DiagnosticReport, DiagnosticsManager, DiagnosticsOptions,
    HealthManager, PlanContext, RemediationPlanner, RemediationRegistry, ScoringWeights,
    Severity, SrePlan,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub diagnostics: Arc<DiagnosticsManager>,
    pub health: Arc<HealthManager>,
    pub planner: Arc<RemediationPlanner>,
    /// Namespace used when a request names none
    pub namespace: Option<String>,
}

impl AppState {
    pub fn new(
        client: Arc<dyn KubeClient>,
        options: DiagnosticsOptions,
        weights: ScoringWeights,
        plan_context: PlanContext,
        namespace: Option<String>,
    ) -> Self {
        Self {
            diagnostics: Arc::new(DiagnosticsManager::new(client.clone(), options)),
            health: Arc::new(HealthManager::new(client, weights, options.debug)),
            planner: Arc::new(RemediationPlanner::new(
                RemediationRegistry::standard(),
                plan_context,
            )),
            namespace,
        }
    }
}

/// Query parameters for diagnose and plan
#[derive(Debug, Default, Deserialize)]
pub struct DiagnoseQuery {
    pub scope: Option<DiagnosticScope>,
    pub namespace: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
    /// Minimum severity to keep
    pub severity: Option<Severity>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl From<SreError> for ApiError {
    fn from(e: SreError) -> Self {
        let status = match &e {
            SreError::InvalidArgument(_) | SreError::UnsupportedKind(_) => StatusCode::BAD_REQUEST,
            SreError::NotFound { .. } | SreError::ContextNotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_collaborator_failure() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            error: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Cluster health summary
pub async fn get_health(State(state): State<AppState>) -> ApiResult<ClusterHealthSummary> {
    Ok(Json(state.health.get_cluster_health().await?))
}

async fn run_diagnosis(state: &AppState, query: &DiagnoseQuery) -> Result<DiagnosticReport, SreError> {
    let namespace = query
        .namespace
        .as_deref()
        .or(state.namespace.as_deref())
        .filter(|ns| !ns.is_empty());

    // A name implies a resource request
    let scope = query.scope.unwrap_or(if query.name.is_some() {
        DiagnosticScope::Resource
    } else if namespace.is_some() {
        DiagnosticScope::Namespace
    } else {
        DiagnosticScope::Cluster
    });

    let mut report = match scope {
        DiagnosticScope::Cluster => state.diagnostics.diagnose_cluster().await?,
        DiagnosticScope::Namespace => {
            state
                .diagnostics
                .diagnose_namespace(namespace.unwrap_or(DEFAULT_NAMESPACE))
                .await?
        }
        DiagnosticScope::Resource => {
            let kind = query
                .kind
                .as_deref()
                .ok_or_else(|| SreError::InvalidArgument("`kind` is required for resource scope".into()))?;
            let name = query
                .name
                .as_deref()
                .ok_or_else(|| SreError::InvalidArgument("`name` is required for resource scope".into()))?;
            state.diagnostics.diagnose_resource(kind, namespace, name).await?
        }
    };

    if let Some(min) = query.severity {
        report.retain_severity(min);
    }
    Ok(report)
}

/// Diagnostic report for the requested scope
pub async fn get_diagnose(
    State(state): State<AppState>,
    Query(query): Query<DiagnoseQuery>,
) -> ApiResult<DiagnosticReport> {
    Ok(Json(run_diagnosis(&state, &query).await?))
}

/// Remediation plan for the requested scope
pub async fn get_plan(
    State(state): State<AppState>,
    Query(query): Query<DiagnoseQuery>,
) -> ApiResult<SrePlan> {
    let report = run_diagnosis(&state, &query).await?;
    Ok(Json(state.planner.generate_remediation_plan(&report)))
}

/// Context summary
#[derive(Debug, Serialize)]
pub struct ContextSummary {
    pub name: String,
    pub cluster: Option<String>,
    pub namespace: Option<String>,
    pub current: bool,
}

/// Kubeconfig contexts
pub async fn list_contexts_handler() -> ApiResult<Vec<ContextSummary>> {
    let contexts = list_contexts()?
        .into_iter()
        .map(|c| ContextSummary {
            name: c.name,
            cluster: c.cluster,
            namespace: c.namespace,
            current: c.is_current,
        })
        .collect();
    Ok(Json(contexts))
}
