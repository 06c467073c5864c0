//! Application state
//!
//! Shared state accessible by all API handlers, wrapped in Arc for
//! sharing across async tasks. The API layer only reads telemetry state;
//! all writes go through the ingest pipeline.

use crate::ingest::MessageSender;
use crate::persist::EventStore;
use crate::telemetry::LiveStore;
use crate::websocket::ConnectionHub;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Live store read surface
    pub store: Arc<LiveStore>,
    /// Capture event store (listing, clearing)
    pub events: Arc<dyn EventStore>,
    /// WebSocket hub for subscriber connections
    pub hub: Arc<ConnectionHub>,
    /// Handoff channel into the ingest pipeline
    pub ingest_tx: MessageSender,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<LiveStore>,
        events: Arc<dyn EventStore>,
        hub: Arc<ConnectionHub>,
        ingest_tx: MessageSender,
        config: ApiConfig,
    ) -> Self {
        Self {
            store,
            events,
            hub,
            ingest_tx,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
