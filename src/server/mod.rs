//! HTTP surface of the transcript API.

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes;

pub use error::ApiError;

use crate::extractors::TranscriptSource;
use crate::Result;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn TranscriptSource>,
    pub default_language: Arc<str>,
}

impl AppState {
    pub fn new(source: Arc<dyn TranscriptSource>, default_language: &str) -> Self {
        Self {
            source,
            default_language: Arc::from(default_language),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let transcript = Router::new()
        .route("/info/:video_id", get(routes::video_info))
        .route("/extract", post(routes::extract))
        .route("/download", post(routes::download))
        .route("/clean", post(routes::clean))
        .route("/languages/:video_id", get(routes::languages));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/transcript", transcript)
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `addr` until SIGINT or SIGTERM
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let local = listener.local_addr()?;
    tracing::info!("Server listening on http://{}", local);
    tracing::info!("Health check at http://{}/health", local);
    tracing::info!("Transcript API at http://{}/api/transcript", local);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
