//! HTTP surface.
//!
//! - `POST /api/brain/run`: full pipeline for one account
//! - `POST /api/brain/decide`: plan only, nothing fetched or dispatched
//! - `GET /health`

pub mod error;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::brain::Orchestrator;

pub use error::AppError;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The pipeline.
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the router. Used by [`serve`] and by integration tests.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/brain/run", post(routes::run))
        .route("/api/brain/decide", post(routes::decide))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "adbrain listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await
        .context("server error")?;
    Ok(())
}
