//! Trigger-based event correlator
//!
//! When the configured trigger key arrives, the correlator snapshots a
//! fixed set of dependent keys from the live store and assembles a
//! `CompositeEvent`. A dependent key that has never been seen becomes a
//! `null` entry; a missing *derived-field source* aborts the event.
//!
//! The correlator runs inside the single ingest sequence, so its store
//! reads can never be torn by a concurrent update.

use super::event::CompositeEvent;
use crate::telemetry::message::{DecodedMessage, MessageKey};
use crate::telemetry::{keys, LiveStore};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that abort a single correlation (never the pipeline)
#[derive(Debug, Error)]
pub enum CorrelateError {
    /// The message carrying a derived-field source has never been seen
    #[error("derived field '{field}' needs key {key} which has not been seen")]
    SourceNeverSeen { field: String, key: MessageKey },

    /// The source message exists but lacks the needed field
    #[error("derived field '{field}' source is missing field '{source_field}'")]
    SourceFieldMissing { field: String, source_field: String },

    /// The source field exists but is not an unsigned integer timestamp
    #[error("derived field '{field}' source field '{source_field}' is not a timestamp")]
    SourceFieldInvalid { field: String, source_field: String },
}

/// Result type for correlation
pub type CorrelateResult<T> = Result<T, CorrelateError>;

/// Correlator configuration: trigger, dependents, derived-field source
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    /// Key whose arrival produces an event
    pub trigger_key: MessageKey,
    /// Named dependent keys snapshotted at trigger time
    pub dependents: Vec<(String, MessageKey)>,
    /// Name of the derived capture-time field on the event
    pub derived_time_field: String,
    /// Key of the message the capture time is read from
    pub clock_key: MessageKey,
    /// Field on that message holding microseconds since epoch
    pub clock_field: String,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            trigger_key: keys::CAMERA_FEEDBACK,
            dependents: vec![
                ("orientation".to_string(), keys::MOUNT_ORIENTATION),
                ("system_time".to_string(), keys::MISSION_CURRENT),
            ],
            derived_time_field: "capture_time_iso".to_string(),
            clock_key: keys::SYSTEM_TIME,
            clock_field: "timeUnixUsec".to_string(),
        }
    }
}

/// Assembles composite events when the trigger key arrives
#[derive(Debug, Clone)]
pub struct EventCorrelator {
    config: CorrelatorConfig,
}

impl EventCorrelator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self { config }
    }

    /// The key whose arrival invokes this correlator
    pub fn trigger_key(&self) -> MessageKey {
        self.config.trigger_key
    }

    /// Correlate a trigger message against the current live store
    ///
    /// # Errors
    ///
    /// Fails when the derived capture time cannot be computed; in that
    /// case no event is emitted at all.
    pub async fn on_trigger(
        &self,
        trigger: DecodedMessage,
        store: &LiveStore,
    ) -> CorrelateResult<CompositeEvent> {
        let mut correlated = BTreeMap::new();
        for (name, key) in &self.config.dependents {
            correlated.insert(name.clone(), store.get(*key).await);
        }

        let mut derived = BTreeMap::new();
        derived.insert(
            self.config.derived_time_field.clone(),
            self.derive_capture_time(store).await?,
        );

        Ok(CompositeEvent {
            timestamp: Utc::now(),
            trigger,
            correlated,
            derived,
        })
    }

    /// Compute the ISO-8601 capture time from the clock message
    async fn derive_capture_time(&self, store: &LiveStore) -> CorrelateResult<String> {
        let field = &self.config.derived_time_field;

        let clock = store.get(self.config.clock_key).await.ok_or_else(|| {
            CorrelateError::SourceNeverSeen {
                field: field.clone(),
                key: self.config.clock_key,
            }
        })?;

        let value = clock.get_field(&self.config.clock_field).ok_or_else(|| {
            CorrelateError::SourceFieldMissing {
                field: field.clone(),
                source_field: self.config.clock_field.clone(),
            }
        })?;

        let micros = value
            .as_u64()
            .ok_or_else(|| CorrelateError::SourceFieldInvalid {
                field: field.clone(),
                source_field: self.config.clock_field.clone(),
            })?;

        Ok(micros_to_iso8601(micros).ok_or_else(|| {
            CorrelateError::SourceFieldInvalid {
                field: field.clone(),
                source_field: self.config.clock_field.clone(),
            }
        })?)
    }
}

impl Default for EventCorrelator {
    fn default() -> Self {
        Self::new(CorrelatorConfig::default())
    }
}

/// Convert microseconds since the Unix epoch to an ISO-8601 string
///
/// Division truncates toward zero; sub-millisecond precision is dropped.
/// Returns `None` only when the value is outside chrono's representable
/// range.
pub fn micros_to_iso8601(micros: u64) -> Option<String> {
    let millis = i64::try_from(micros / 1000).ok()?;
    let time: DateTime<Utc> = DateTime::from_timestamp_millis(millis)?;
    Some(time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}
