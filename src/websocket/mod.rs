//! WebSocket fan-out
//!
//! Live subscribers connect to `/ws`, send `{"subscribe": ["42", 265]}`
//! to choose message keys, and receive one `{msgid, sysid, compid,
//! message}` envelope per matching ingested message.
//!
//! - **ConnectionHub**: subscription registry and broadcast path
//! - **Handler**: WebSocket upgrade and connection lifecycle
//! - **Messages**: inbound request and outbound envelope formats

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::{Envelope, KeyRef, SubscribeRequest};
