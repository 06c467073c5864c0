//! API request/response types

use serde::{Deserialize, Serialize};

/// Query parameters for export endpoints
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    /// `?dl=true` adds a Content-Disposition attachment header
    #[serde(default)]
    pub dl: bool,
}

/// Response for an accepted ingest request
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub key: u32,
}

/// Generic status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub connections: usize,
    pub store_keys: usize,
}
