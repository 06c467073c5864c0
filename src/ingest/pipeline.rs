//! Ingestion pipeline
//!
//! The single driver of all shared telemetry state. Messages arrive on an
//! mpsc channel in decode order and are processed strictly one at a time:
//! registry check, live store update, correlation on the trigger key, then
//! broadcast. Correlation errors, persistence drops, and delivery failures
//! are all absorbed at their own boundary; the pipeline always advances to
//! the next message.

use crate::correlate::EventCorrelator;
use crate::persist::SinkHandle;
use crate::telemetry::{DecodedMessage, LiveStore, SchemaRegistry};
use crate::websocket::ConnectionHub;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default capacity of the decoder handoff channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Sender half of the decoder handoff
///
/// The external decoder (or the HTTP ingest boundary) pushes decoded
/// messages through this handle.
pub type MessageSender = mpsc::Sender<DecodedMessage>;

/// The sequential ingestion driver
pub struct IngestPipeline {
    registry: SchemaRegistry,
    store: Arc<LiveStore>,
    correlator: EventCorrelator,
    sink: SinkHandle,
    hub: Arc<ConnectionHub>,
}

impl IngestPipeline {
    pub fn new(
        registry: SchemaRegistry,
        store: Arc<LiveStore>,
        correlator: EventCorrelator,
        sink: SinkHandle,
        hub: Arc<ConnectionHub>,
    ) -> Self {
        Self {
            registry,
            store,
            correlator,
            sink,
            hub,
        }
    }

    /// Spawn the pipeline task consuming from `rx`
    ///
    /// Runs until the sending side closes, then exits.
    pub fn spawn(self, mut rx: mpsc::Receiver<DecodedMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                trigger_key = %self.correlator.trigger_key(),
                known_schemas = self.registry.len(),
                "Ingest pipeline started"
            );
            while let Some(message) = rx.recv().await {
                self.process(message).await;
            }
            tracing::info!("Ingest pipeline stopped: message stream closed");
        })
    }

    /// Process one message to completion
    pub async fn process(&self, message: DecodedMessage) {
        // Unknown key: drop before any state mutation
        if !self.registry.contains(message.key) {
            tracing::warn!(key = %message.key, "Unknown message key, dropping");
            return;
        }

        let key = message.key;
        let first_sighting = self.store.update(message.clone()).await;
        if first_sighting {
            tracing::info!(
                name = %message.name,
                id = %key,
                "New message type"
            );
        }

        if key == self.correlator.trigger_key() {
            match self.correlator.on_trigger(message.clone(), &self.store).await {
                Ok(event) => {
                    // Fire-and-forget: the pipeline never waits on storage
                    self.sink.submit(event);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Correlation error, capture event not emitted");
                }
            }
        }

        self.hub.publish(&message).await;
    }
}
