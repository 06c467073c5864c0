//! Capture event persistence
//!
//! - **sink**: bounded-queue handoff from the ingest pipeline to a worker
//! - **jsonl**: append-only newline-delimited JSON store
//! - **error**: persistence error types
//!
//! Write path: pipeline -> `SinkHandle::submit` (non-blocking) ->
//! worker -> `EventStore::append`. The pipeline never waits on storage.

pub mod error;
pub mod jsonl;
pub mod sink;

pub use error::{PersistError, PersistResult};
pub use jsonl::JsonlEventStore;
pub use sink::{EventSink, EventStore, MemoryEventStore, SinkHandle, DEFAULT_QUEUE_CAPACITY};
