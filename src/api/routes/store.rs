//! Live store routes
//!
//! Read surface over the most-recent-value cache.
//!
//! - GET /api/v1/store - full snapshot
//! - GET /api/v1/store/:key - single entry

use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::telemetry::{DecodedMessage, MessageKey};

/// GET /api/v1/store
///
/// The most recent message for every key seen so far.
pub async fn store_snapshot(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, DecodedMessage>> {
    let snapshot = state.store.snapshot_all().await;
    // String keys for JSON object compatibility, sorted for stable output
    let by_key: BTreeMap<String, DecodedMessage> = snapshot
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Json(by_key)
}

/// GET /api/v1/store/:key
///
/// The most recent message for one key; 404 when never seen.
pub async fn store_entry(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<DecodedMessage>> {
    let key: u32 = key
        .parse()
        .map_err(|_| ApiError::Validation(format!("Key must be a number, got '{}'", key)))?;

    state
        .store
        .get(MessageKey(key))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No data for key {}", key)))
}
