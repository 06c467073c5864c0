//! Persistence sink
//!
//! The ingest pipeline hands completed capture events to the sink and
//! moves on immediately. A bounded queue decouples the pipeline from
//! storage latency; a dedicated worker task drains the queue into an
//! `EventStore`. Persistence is best-effort: a full queue drops the
//! newest event, a failed append is logged and the event discarded.

use super::error::{PersistError, PersistResult};
use crate::correlate::CompositeEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default capacity of the sink queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Append-only capture event storage
///
/// The core only needs "append one record, get error-or-success"; the
/// query surface additionally lists stored records.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event
    async fn append(&self, event: &CompositeEvent) -> PersistResult<()>;

    /// Load every stored event in append order
    async fn load_all(&self) -> PersistResult<Vec<CompositeEvent>>;

    /// Remove all stored events
    async fn clear(&self) -> PersistResult<()>;
}

/// Producer half of the persistence path
///
/// Cheap to clone; owned by the ingest pipeline (and the API layer, which
/// never submits but shares the store through `EventSink::store`).
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<CompositeEvent>,
}

impl SinkHandle {
    /// Enqueue an event without waiting
    ///
    /// Returns `false` when the event was dropped (queue full or worker
    /// gone). Never blocks the caller.
    pub fn submit(&self, event: CompositeEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Persistence queue full, capture event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::error!("Persistence worker stopped, capture event dropped");
                false
            }
        }
    }
}

/// The persistence worker and its queue
pub struct EventSink {
    store: Arc<dyn EventStore>,
    capacity: usize,
}

impl EventSink {
    pub fn new(store: Arc<dyn EventStore>, capacity: usize) -> Self {
        Self { store, capacity }
    }

    /// Shared access to the underlying store (for the query surface)
    pub fn store(&self) -> Arc<dyn EventStore> {
        Arc::clone(&self.store)
    }

    /// Start the worker task
    ///
    /// Returns the producer handle and the worker's join handle. The
    /// worker exits when every `SinkHandle` has been dropped.
    pub fn spawn(&self) -> (SinkHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<CompositeEvent>(self.capacity);
        let store = Arc::clone(&self.store);

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match store.append(&event).await {
                    Ok(()) => {
                        tracing::debug!(
                            capture_time = ?event.derived.get("capture_time_iso"),
                            "Capture event persisted"
                        );
                    }
                    Err(e) => {
                        // Best effort: no retry, no requeue
                        tracing::error!(error = %e, "Failed to persist capture event");
                    }
                }
            }
            tracing::debug!("Persistence worker stopped");
        });

        (SinkHandle { tx }, worker)
    }
}

/// An event store that keeps everything in memory
///
/// Used in tests and available for running without a data directory.
#[derive(Default)]
pub struct MemoryEventStore {
    events: tokio::sync::Mutex<Vec<CompositeEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: &CompositeEvent) -> PersistResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn load_all(&self) -> PersistResult<Vec<CompositeEvent>> {
        Ok(self.events.lock().await.clone())
    }

    async fn clear(&self) -> PersistResult<()> {
        self.events.lock().await.clear();
        Ok(())
    }
}

/// An event store whose appends always fail, for error-path tests
#[cfg(test)]
pub struct FailingEventStore;

#[cfg(test)]
#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(&self, _event: &CompositeEvent) -> PersistResult<()> {
        Err(PersistError::Storage("disk on fire".to_string()))
    }

    async fn load_all(&self) -> PersistResult<Vec<CompositeEvent>> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> PersistResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DecodedMessage;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_event(n: i64) -> CompositeEvent {
        CompositeEvent {
            timestamp: Utc::now(),
            trigger: DecodedMessage::new(180, "CAMERA_FEEDBACK").field("lat", n),
            correlated: BTreeMap::new(),
            derived: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_submit_and_drain() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = EventSink::new(Arc::clone(&store) as Arc<dyn EventStore>, 8);
        let (handle, worker) = sink.spawn();

        assert!(handle.submit(sample_event(1)));
        assert!(handle.submit(sample_event(2)));
        drop(handle);
        worker.await.unwrap();

        let stored = store.load_all().await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_queue_full_drops_newest() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = EventSink::new(Arc::clone(&store) as Arc<dyn EventStore>, 2);
        // Fill the queue before the worker exists so nothing drains
        let (tx, mut rx) = mpsc::channel::<CompositeEvent>(2);
        let handle = SinkHandle { tx };

        assert!(handle.submit(sample_event(1)));
        assert!(handle.submit(sample_event(2)));
        // Third submission is dropped, the first two remain queued
        assert!(!handle.submit(sample_event(3)));

        assert_eq!(rx.recv().await.unwrap().trigger.get_field("lat").unwrap().as_f64(), Some(1.0));
        assert_eq!(rx.recv().await.unwrap().trigger.get_field("lat").unwrap().as_f64(), Some(2.0));
        drop(sink);
    }

    #[tokio::test]
    async fn test_append_failure_does_not_kill_worker() {
        let sink = EventSink::new(Arc::new(FailingEventStore), 8);
        let (handle, worker) = sink.spawn();

        assert!(handle.submit(sample_event(1)));
        assert!(handle.submit(sample_event(2)));
        drop(handle);

        // Worker drains both failing appends and exits cleanly
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_events_stored_twice() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = EventSink::new(Arc::clone(&store) as Arc<dyn EventStore>, 8);
        let (handle, worker) = sink.spawn();

        let event = sample_event(7);
        handle.submit(event.clone());
        handle.submit(event);
        drop(handle);
        worker.await.unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }
}
