//! Telemetry domain types and live state
//!
//! - **message**: decoded message value types (`DecodedMessage`, `FieldValue`)
//! - **registry**: the set of message schemas the decoder knows
//! - **store**: most-recent-value cache per message key

pub mod message;
pub mod registry;
pub mod store;

pub use message::{DecodedMessage, FieldValue, MessageKey, SourceId};
pub use registry::{keys, SchemaRegistry};
pub use store::LiveStore;
