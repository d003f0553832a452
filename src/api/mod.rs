//! REST surface over the copilot suite.

mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::coordinator::CopilotCoordinator;
use crate::copilots::CopilotSuite;

pub use routes::{
    CodeRequest, CoordinateRequest, CopilotResponse, DebugRequest, DocRequest, RefactorRequest,
    ReviewRequest, TestRequest,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub suite: Arc<CopilotSuite>,
    pub coordinator: Arc<CopilotCoordinator>,
}

impl AppState {
    /// State whose coordinator has every copilot of `suite` registered
    pub fn new(suite: CopilotSuite) -> Self {
        let coordinator = suite.coordinator();
        Self {
            suite: Arc::new(suite),
            coordinator: Arc::new(coordinator),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/v1/copilots", get(routes::list_copilots))
        .route("/api/v1/review", post(routes::review))
        .route("/api/v1/docs", post(routes::docs))
        .route("/api/v1/test", post(routes::test))
        .route("/api/v1/security", post(routes::security))
        .route("/api/v1/debug", post(routes::debug_error))
        .route("/api/v1/refactor", post(routes::refactor))
        .route("/api/v1/coordinate", post(routes::coordinate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(addr = %addr, "API server listening");
    axum::serve(listener, app).await.context("API server stopped")?;
    Ok(())
}
