//! Health endpoint.
//!
//! A minimal axum router for container orchestration probes: `/health` for
//! liveness checks and `/` for a human-facing status line.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::scheduler::SharedSchedulerState;

/// Shared state handed to the route handlers.
#[derive(Clone)]
pub struct AppState {
    scheduler: SharedSchedulerState,
}

impl AppState {
    pub fn new(scheduler: SharedSchedulerState) -> Self {
        Self { scheduler }
    }
}

/// Builds the router with all routes attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(state)
}

/// GET / - Service status.
async fn index(State(state): State<AppState>) -> Json<Value> {
    let scheduler = state.scheduler.read().await;
    Json(json!({
        "status": "running",
        "scheduler": "active",
        "runs_completed": scheduler.runs_completed,
        "last_run": scheduler.last_run,
        "last_error": scheduler.last_error,
    }))
}

/// GET /health - Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Binds the listener and serves the health endpoint until the process exits.
pub async fn serve(port: u16, state: AppState) -> ServerResult<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::http(format!("bind {addr}: {e}")))?;

    info!(%addr, "Health endpoint listening");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| ServerError::http(e.to_string()))
}
