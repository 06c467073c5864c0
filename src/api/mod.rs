//! Groundlink HTTP API
//!
//! Read/export surface over the core, built with Axum.
//!
//! # Endpoints
//!
//! ## Live store
//! - `GET /api/v1/store` - full snapshot
//! - `GET /api/v1/store/:key` - most recent message for one key
//!
//! ## Capture events
//! - `GET /api/v1/captures` - stored capture events (JSON)
//! - `GET /api/v1/captures.csv` - CSV export (`?dl=true` to download)
//! - `GET /api/v1/captures.geojson` - GeoJSON export
//! - `DELETE /api/v1/captures` - clear the store
//!
//! ## Ingest
//! - `POST /api/v1/ingest` - decoder handoff, one decoded message
//!
//! ## Health
//! - `GET /health/live`, `GET /health/ready`, `GET /health`
//!
//! ## WebSocket
//! - `GET /ws` - live subscriber connection

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/store", get(routes::store::store_snapshot))
        .route("/store/:key", get(routes::store::store_entry))
        .route("/captures", get(routes::captures::list_captures))
        .route("/captures", delete(routes::captures::clear_captures))
        .route("/captures.csv", get(routes::captures::captures_csv))
        .route("/captures.geojson", get(routes::captures::captures_geojson))
        .route("/ingest", post(routes::ingest::ingest_message));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("Bind failed on {}: {}", addr, e)))?;

    tracing::info!("Groundlink API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Groundlink API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
