//! Capture event routes
//!
//! Listing and export of persisted capture events.
//!
//! - GET    /api/v1/captures - JSON list
//! - GET    /api/v1/captures.csv - CSV export
//! - GET    /api/v1/captures.geojson - GeoJSON FeatureCollection
//! - DELETE /api/v1/captures - clear the store

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::api::dto::{DownloadParams, StatusResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::correlate::CompositeEvent;
use crate::telemetry::FieldValue;

/// Columns of the CSV export, in original field order
const CSV_COLUMNS: &[(&str, &str, &str)] = &[
    // (section, field, column header)
    ("system_time", "timeBootMs", "timeBootMs"),
    ("trigger", "lat", "lat"),
    ("trigger", "lng", "lng"),
    ("trigger", "altMsl", "altMsl"),
    ("trigger", "altRel", "altRel"),
    ("orientation", "pitch", "pitch"),
    ("orientation", "roll", "roll"),
    ("orientation", "yaw", "yaw"),
    ("orientation", "yawAbsolute", "yawAbsolute"),
];

/// GET /api/v1/captures
///
/// Stored capture events with a derived capture time, ordered by boot
/// time.
pub async fn list_captures(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<CompositeEvent>>> {
    Ok(Json(load_sorted(&state).await?))
}

/// DELETE /api/v1/captures
///
/// Clear the capture event store.
pub async fn clear_captures(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusResponse>> {
    state.events.clear().await?;
    Ok(Json(StatusResponse {
        status: "cleared".to_string(),
    }))
}

/// GET /api/v1/captures.csv
pub async fn captures_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> ApiResult<Response> {
    let events = load_sorted(&state).await?;
    let body = render_csv(&events)?;

    Ok(export_response(
        body,
        "text/csv",
        "captures.csv",
        params.dl,
    ))
}

/// GET /api/v1/captures.geojson
pub async fn captures_geojson(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> ApiResult<Response> {
    let events = load_sorted(&state).await?;
    let collection = render_geojson(&events);
    let body = serde_json::to_string(&collection)
        .map_err(|e| ApiError::Internal(format!("GeoJSON serialization failed: {}", e)))?;

    Ok(export_response(
        body,
        "application/geo+json",
        "captures.geojson",
        params.dl,
    ))
}

/// Load stored events that carry a capture time, sorted by boot time
///
/// Records without a boot time sort last; insertion order breaks ties.
async fn load_sorted(state: &AppState) -> ApiResult<Vec<CompositeEvent>> {
    let mut events = state.events.load_all().await?;
    events.retain(|e| e.derived.contains_key("capture_time_iso"));
    events.sort_by(|a, b| match (a.boot_time_ms(), b.boot_time_ms()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(events)
}

/// One cell of the CSV export; missing optional fields render empty
fn cell(event: &CompositeEvent, section: &str, field: &str) -> String {
    let value = match section {
        "trigger" => event.trigger_field(field),
        _ => event.correlated_field(section, field),
    };
    value.map(FieldValue::to_cell).unwrap_or_default()
}

/// Render events as CSV with the fixed column set
fn render_csv(events: &[CompositeEvent]) -> ApiResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let headers: Vec<&str> = CSV_COLUMNS.iter().map(|(_, _, h)| *h).collect();
    writer
        .write_record(&headers)
        .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;

    for event in events {
        let row: Vec<String> = CSV_COLUMNS
            .iter()
            .map(|(section, field, _)| cell(event, section, field))
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("CSV encoding: {}", e)))
}

/// Render events as a GeoJSON FeatureCollection
///
/// Position comes from the trigger's 1e7-scaled lat/lng integers; a
/// record missing either required field is skipped.
fn render_geojson(events: &[CompositeEvent]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = events
        .iter()
        .filter_map(|event| {
            let lat = event.trigger_field("lat").and_then(FieldValue::as_f64)? / 1e7;
            let lng = event.trigger_field("lng").and_then(FieldValue::as_f64)? / 1e7;

            let float_or_null = |section: &str, field: &str| -> serde_json::Value {
                let value = match section {
                    "trigger" => event.trigger_field(field),
                    _ => event.correlated_field(section, field),
                };
                value
                    .and_then(FieldValue::as_f64)
                    .map(|v| serde_json::json!(v))
                    .unwrap_or(serde_json::Value::Null)
            };

            Some(serde_json::json!({
                "type": "Feature",
                "properties": {
                    "lat": lat,
                    "lng": lng,
                    "altMsl": float_or_null("trigger", "altMsl"),
                    "altRel": float_or_null("trigger", "altRel"),
                    "pitch": float_or_null("orientation", "pitch"),
                    "roll": float_or_null("orientation", "roll"),
                    "yaw": float_or_null("orientation", "yaw"),
                    "yawAbsolute": float_or_null("orientation", "yawAbsolute"),
                    "systemTime": float_or_null("system_time", "timeBootMs"),
                    "captureTime": event.derived.get("capture_time_iso"),
                },
                "geometry": {
                    "type": "Point",
                    "coordinates": [lng, lat]
                }
            }))
        })
        .collect();

    serde_json::json!({
        "type": "FeatureCollection",
        "features": features
    })
}

/// Build the export response, optionally as an attachment
fn export_response(body: String, content_type: &str, filename: &str, download: bool) -> Response {
    if download {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            Body::from(body),
        )
            .into_response()
    } else {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type.to_string())],
            Body::from(body),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DecodedMessage;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn full_event(boot_ms: i64) -> CompositeEvent {
        let mut correlated = BTreeMap::new();
        correlated.insert(
            "orientation".to_string(),
            Some(
                DecodedMessage::new(265, "MOUNT_ORIENTATION")
                    .field("pitch", 1.5)
                    .field("roll", 0.2)
                    .field("yaw", 10.0)
                    .field("yawAbsolute", 15.0),
            ),
        );
        correlated.insert(
            "system_time".to_string(),
            Some(DecodedMessage::new(42, "MISSION_CURRENT").field("timeBootMs", boot_ms)),
        );

        let mut derived = BTreeMap::new();
        derived.insert(
            "capture_time_iso".to_string(),
            "2024-05-15T09:54:13.676Z".to_string(),
        );

        CompositeEvent {
            timestamp: Utc::now(),
            trigger: DecodedMessage::new(180, "CAMERA_FEEDBACK")
                .field("lat", 100_000_000i64)
                .field("lng", 200_000_000i64)
                .field("altMsl", 50.0)
                .field("altRel", 10.0),
            correlated,
            derived,
        }
    }

    fn partial_event() -> CompositeEvent {
        let mut correlated = BTreeMap::new();
        correlated.insert("orientation".to_string(), None);
        correlated.insert("system_time".to_string(), None);

        let mut derived = BTreeMap::new();
        derived.insert(
            "capture_time_iso".to_string(),
            "2024-05-15T09:54:14.000Z".to_string(),
        );

        CompositeEvent {
            timestamp: Utc::now(),
            trigger: DecodedMessage::new(180, "CAMERA_FEEDBACK"),
            correlated,
            derived,
        }
    }

    #[test]
    fn test_csv_full_record() {
        let csv = render_csv(&[full_event(1000)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timeBootMs,lat,lng,altMsl,altRel,pitch,roll,yaw,yawAbsolute"
        );
        assert_eq!(lines.next().unwrap(), "1000,100000000,200000000,50,10,1.5,0.2,10,15");
    }

    #[test]
    fn test_csv_missing_fields_render_empty() {
        let csv = render_csv(&[partial_event()]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, ",,,,,,,,");
    }

    #[test]
    fn test_geojson_scaling_and_properties() {
        let collection = render_geojson(&[full_event(1000)]);
        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);

        let feature = &features[0];
        assert_eq!(feature["geometry"]["coordinates"][0], 20.0);
        assert_eq!(feature["geometry"]["coordinates"][1], 10.0);
        assert_eq!(feature["properties"]["pitch"], 1.5);
        assert_eq!(feature["properties"]["systemTime"], 1000.0);
        assert_eq!(
            feature["properties"]["captureTime"],
            "2024-05-15T09:54:13.676Z"
        );
    }

    #[test]
    fn test_geojson_skips_records_without_position() {
        let collection = render_geojson(&[partial_event(), full_event(1000)]);
        let features = collection["features"].as_array().unwrap();
        // The positionless record is skipped, not nulled
        assert_eq!(features.len(), 1);
    }
}
