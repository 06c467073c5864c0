//! Live telemetry store
//!
//! Holds the most recently seen message for every key. Values are
//! overwritten on every sighting, never merged or queued, and never
//! deleted for the life of the process.
//!
//! Write access belongs to the ingest pipeline alone; the API layer and
//! the correlator only read. A plain `RwLock<HashMap>` is enough because
//! readers tolerate staleness of one message interval.

use super::message::{DecodedMessage, MessageKey};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache of the most recent message per key
#[derive(Debug, Default)]
pub struct LiveStore {
    entries: RwLock<HashMap<MessageKey, DecodedMessage>>,
}

impl LiveStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for the message's key
    ///
    /// Returns `true` if this is the first sighting of the key.
    pub async fn update(&self, message: DecodedMessage) -> bool {
        let mut entries = self.entries.write().await;
        entries.insert(message.key, message).is_none()
    }

    /// Most recent message for a key, if the key has ever been seen
    pub async fn get(&self, key: MessageKey) -> Option<DecodedMessage> {
        self.entries.read().await.get(&key).cloned()
    }

    /// Snapshot of every entry, for the query/export surface
    pub async fn snapshot_all(&self) -> HashMap<MessageKey, DecodedMessage> {
        self.entries.read().await.clone()
    }

    /// Number of distinct keys seen so far
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no message has been seen yet
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::message::FieldValue;

    #[tokio::test]
    async fn test_most_recent_wins() {
        let store = LiveStore::new();

        let first = DecodedMessage::new(42, "MISSION_CURRENT").field("timeBootMs", 1000i64);
        let second = DecodedMessage::new(42, "MISSION_CURRENT").field("timeBootMs", 2000i64);

        assert!(store.update(first).await);
        assert!(!store.update(second.clone()).await);

        let current = store.get(MessageKey(42)).await.unwrap();
        assert_eq!(current, second);
        assert_eq!(
            current.get_field("timeBootMs"),
            Some(&FieldValue::Int(2000))
        );
    }

    #[tokio::test]
    async fn test_get_unseen_key() {
        let store = LiveStore::new();
        assert!(store.get(MessageKey(30)).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_idempotent() {
        let store = LiveStore::new();
        store
            .update(DecodedMessage::new(30, "ATTITUDE").field("pitch", 0.1))
            .await;
        store
            .update(DecodedMessage::new(33, "GLOBAL_POSITION_INT").field("lat", 100_000_000i64))
            .await;

        let a = store.snapshot_all().await;
        let b = store.snapshot_all().await;
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[tokio::test]
    async fn test_entries_never_deleted() {
        let store = LiveStore::new();
        store.update(DecodedMessage::new(0, "HEARTBEAT")).await;
        for _ in 0..10 {
            store.update(DecodedMessage::new(0, "HEARTBEAT")).await;
        }
        assert_eq!(store.len().await, 1);
        assert!(store.get(MessageKey(0)).await.is_some());
    }
}
