//! Ingest route
//!
//! The decoder handoff boundary: an external wire decoder posts one
//! decoded message per request and the API forwards it into the pipeline
//! channel in arrival order.
//!
//! - POST /api/v1/ingest

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::IngestResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::telemetry::DecodedMessage;

/// POST /api/v1/ingest
///
/// Accept one decoded message. Unknown keys are accepted here and
/// dropped by the pipeline, matching the in-process handoff behavior.
pub async fn ingest_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<DecodedMessage>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let key = message.key.0;

    state
        .ingest_tx
        .send(message)
        .await
        .map_err(|_| ApiError::ServiceUnavailable("Ingest pipeline is not running".to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            status: "accepted".to_string(),
            key,
        }),
    ))
}
