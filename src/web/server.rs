//! Web server implementation using axum

use crate::error::{Result, SreError};
use crate::web::handlers::{self, AppState};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Build the API router over `state`
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/diagnose", get(handlers::get_diagnose))
        .route("/api/plan", get(handlers::get_plan))
        .route("/api/contexts", get(handlers::list_contexts_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(address: &str, port: u16, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| SreError::InvalidArgument(format!("invalid listen address: {}", e)))?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);
    println!("kubesre API running at http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| SreError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
