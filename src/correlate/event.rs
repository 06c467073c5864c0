//! Composite capture events
//!
//! A `CompositeEvent` is the record assembled when a trigger message
//! arrives: the trigger itself, a snapshot of each configured dependent
//! key from the live store (possibly absent), and derived fields computed
//! from specific dependent values.

use crate::telemetry::message::{DecodedMessage, FieldValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A capture event correlated from several message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeEvent {
    /// When the trigger was processed
    pub timestamp: DateTime<Utc>,
    /// The trigger message itself
    pub trigger: DecodedMessage,
    /// Named dependent snapshots; `None` when the key was never seen
    pub correlated: BTreeMap<String, Option<DecodedMessage>>,
    /// Fields computed from dependent data (e.g. the ISO-8601 capture time)
    pub derived: BTreeMap<String, String>,
}

impl CompositeEvent {
    /// Look up a field on a named correlated message
    ///
    /// Returns `None` when the dependent entry is absent or lacks the
    /// field, which export layers render as an explicit empty marker.
    pub fn correlated_field(&self, name: &str, field: &str) -> Option<&FieldValue> {
        self.correlated
            .get(name)
            .and_then(|entry| entry.as_ref())
            .and_then(|msg| msg.get_field(field))
    }

    /// Look up a field on the trigger message
    pub fn trigger_field(&self, field: &str) -> Option<&FieldValue> {
        self.trigger.get_field(field)
    }

    /// The value export layers sort capture lists by
    pub fn boot_time_ms(&self) -> Option<f64> {
        self.correlated_field("system_time", "timeBootMs")
            .and_then(FieldValue::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::message::DecodedMessage;

    fn sample_event() -> CompositeEvent {
        let mut correlated = BTreeMap::new();
        correlated.insert(
            "system_time".to_string(),
            Some(DecodedMessage::new(42, "MISSION_CURRENT").field("timeBootMs", 1000i64)),
        );
        correlated.insert("orientation".to_string(), None);

        let mut derived = BTreeMap::new();
        derived.insert(
            "capture_time_iso".to_string(),
            "2024-05-15T09:54:13.676Z".to_string(),
        );

        CompositeEvent {
            timestamp: Utc::now(),
            trigger: DecodedMessage::new(180, "CAMERA_FEEDBACK").field("lat", 100_000_000i64),
            correlated,
            derived,
        }
    }

    #[test]
    fn test_correlated_field_lookup() {
        let event = sample_event();
        assert_eq!(
            event.correlated_field("system_time", "timeBootMs"),
            Some(&FieldValue::Int(1000))
        );
        // Absent dependent entry
        assert!(event.correlated_field("orientation", "pitch").is_none());
        // Unknown dependent name
        assert!(event.correlated_field("nope", "pitch").is_none());
    }

    #[test]
    fn test_boot_time_ms() {
        let event = sample_event();
        assert_eq!(event.boot_time_ms(), Some(1000.0));
    }

    #[test]
    fn test_event_round_trip() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let back: CompositeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.derived, event.derived);
        assert_eq!(back.trigger.key, event.trigger.key);
        assert!(back.correlated["orientation"].is_none());
    }
}
