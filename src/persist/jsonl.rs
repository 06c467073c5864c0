//! Newline-delimited JSON event store
//!
//! One capture event per line in a single append-only file. The file is
//! truncated on startup (a ground-station session starts fresh, matching
//! the flight-log workflow this service supports). Unparseable lines are
//! skipped on load rather than failing the whole listing.

use super::error::PersistResult;
use super::sink::EventStore;
use crate::correlate::CompositeEvent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Capture event store backed by a JSONL file
pub struct JsonlEventStore {
    path: PathBuf,
    // Serializes append/clear against concurrent readers of the same file
    write_lock: Mutex<()>,
}

impl JsonlEventStore {
    /// Open (and truncate) the store at `path`
    pub async fn open(path: impl Into<PathBuf>) -> PersistResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Fresh session: previous events are discarded on startup
        fs::write(&path, b"").await?;
        tracing::info!(path = %path.display(), "Capture event store ready");

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventStore for JsonlEventStore {
    async fn append(&self, event: &CompositeEvent) -> PersistResult<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_all(&self) -> PersistResult<Vec<CompositeEvent>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CompositeEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(
                        line = line_no + 1,
                        error = %e,
                        "Skipping unreadable capture record"
                    );
                }
            }
        }
        Ok(events)
    }

    async fn clear(&self) -> PersistResult<()> {
        let _guard = self.write_lock.lock().await;
        fs::write(&self.path, b"").await?;
        tracing::info!(path = %self.path.display(), "Capture event store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DecodedMessage;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn sample_event(lat: i64) -> CompositeEvent {
        let mut derived = BTreeMap::new();
        derived.insert(
            "capture_time_iso".to_string(),
            "2024-05-15T09:54:13.676Z".to_string(),
        );
        CompositeEvent {
            timestamp: Utc::now(),
            trigger: DecodedMessage::new(180, "CAMERA_FEEDBACK").field("lat", lat),
            correlated: BTreeMap::new(),
            derived,
        }
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempdir().unwrap();
        let store = JsonlEventStore::open(dir.path().join("captures.jsonl"))
            .await
            .unwrap();

        store.append(&sample_event(1)).await.unwrap();
        store.append(&sample_event(2)).await.unwrap();

        let events = store.load_all().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].trigger.get_field("lat").unwrap().as_f64(),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_open_truncates_previous_session() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("captures.jsonl");

        let store = JsonlEventStore::open(&path).await.unwrap();
        store.append(&sample_event(1)).await.unwrap();
        drop(store);

        let store = JsonlEventStore::open(&path).await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = tempdir().unwrap();
        let store = JsonlEventStore::open(dir.path().join("captures.jsonl"))
            .await
            .unwrap();

        store.append(&sample_event(1)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());

        // Store stays usable after clearing
        store.append(&sample_event(2)).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_line_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("captures.jsonl");
        let store = JsonlEventStore::open(&path).await.unwrap();

        store.append(&sample_event(1)).await.unwrap();
        // Simulate a torn write
        let mut content = fs::read_to_string(&path).await.unwrap();
        content.push_str("{\"not\": \"an event\n");
        fs::write(&path, content).await.unwrap();
        store.append(&sample_event(2)).await.unwrap();

        let events = store.load_all().await.unwrap();
        assert_eq!(events.len(), 2);
    }
}
