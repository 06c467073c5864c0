//! Message ingestion
//!
//! A single sequential pipeline consumes decoded messages in arrival
//! order and drives the live store, the correlator, and the broadcaster.

pub mod pipeline;

pub use pipeline::{IngestPipeline, MessageSender, DEFAULT_CHANNEL_CAPACITY};
