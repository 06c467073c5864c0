//! # Groundlink
//!
//! Telemetry correlation and fan-out engine for decoded vehicle
//! telemetry. A single sequential pipeline keeps a last-value store per
//! message type, assembles capture events when the trigger message
//! arrives, persists them to an append-only session file, and fans every
//! message out to subscribed WebSocket clients.
//!
//! ## Architecture
//!
//! - **telemetry**: decoded message model, schema registry, live store
//! - **correlate**: trigger-based capture event assembly
//! - **persist**: capture event sink and JSONL session store
//! - **websocket**: subscriber hub and connection handling
//! - **ingest**: the sequential pipeline driving all of the above
//! - **api**: HTTP read/export surface and the decoder handoff endpoint
//! - **config**: TOML + environment configuration

pub mod api;
pub mod config;
pub mod correlate;
pub mod ingest;
pub mod persist;
pub mod telemetry;
pub mod websocket;

pub use config::Config;
pub use correlate::{CompositeEvent, CorrelatorConfig, EventCorrelator};
pub use ingest::{IngestPipeline, MessageSender};
pub use persist::{EventSink, EventStore, JsonlEventStore};
pub use telemetry::{DecodedMessage, FieldValue, LiveStore, MessageKey, SchemaRegistry};
pub use websocket::{ConnectionHub, HubConfig};
