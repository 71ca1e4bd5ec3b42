//! HTTP boundary.
//!
//! | Route                | Body                                          |
//! |----------------------|-----------------------------------------------|
//! | `POST /api/generate` | `{repositoryUrl, githubToken?}`               |
//! | `POST /api/build`    | `{repositoryUrl, githubToken?, dockerfile}`   |
//! | `POST /api/push`     | `{repositoryUrl, githubToken?, dockerfile}`   |
//! | `GET /api/health`    |                                               |
//!
//! Responses use the envelope `{success, data?, error?, stage?, log?}`.
//! Missing input is a 400; a failed operation is a 500 naming its stage.

mod handlers;

use crate::pipeline::StackcraftService;
use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use handlers::ApiResponse;

pub fn router(service: Arc<StackcraftService>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/generate", post(handlers::generate))
        .route("/api/build", post(handlers::build))
        .route("/api/push", post(handlers::push))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

pub async fn serve(service: Arc<StackcraftService>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
