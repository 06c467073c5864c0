//! WebSocket message types
//!
//! Inbound: a subscription request replacing the connection's key set.
//! Outbound: one envelope per (message, matching subscriber) pair.

use crate::telemetry::message::{DecodedMessage, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Inbound request from a subscriber connection
///
/// `{"subscribe": ["42", 265]}` - keys may arrive as strings or numbers;
/// both normalize to the string form used for matching.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub subscribe: Vec<KeyRef>,
}

/// A message key as clients write it
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyRef {
    Number(u64),
    Text(String),
}

impl KeyRef {
    /// Normalized string form used for subscription matching
    pub fn normalize(&self) -> String {
        match self {
            KeyRef::Number(n) => n.to_string(),
            KeyRef::Text(s) => s.trim().to_string(),
        }
    }
}

impl SubscribeRequest {
    /// The requested key set in normalized form
    pub fn key_set(&self) -> HashSet<String> {
        self.subscribe.iter().map(KeyRef::normalize).collect()
    }
}

/// Outbound envelope delivered to matching subscribers
///
/// `msgid` carries the string form of the key so clients can match it
/// against the set they subscribed with; integer fields in `message`
/// beyond 2^53 serialize as strings (see `FieldValue`).
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub msgid: String,
    pub sysid: u8,
    pub compid: u8,
    pub message: HashMap<String, FieldValue>,
}

impl Envelope {
    /// Build the envelope for a decoded message
    pub fn from_message(message: &DecodedMessage) -> Self {
        Self {
            msgid: message.key.as_subscription_key(),
            sysid: message.source.system_id,
            compid: message.source.component_id,
            message: message.fields.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_mixed_key_forms() {
        let req: SubscribeRequest =
            serde_json::from_str(r#"{"subscribe": ["42", 265, " 30 "]}"#).unwrap();
        let keys = req.key_set();
        assert!(keys.contains("42"));
        assert!(keys.contains("265"));
        assert!(keys.contains("30"));
    }

    #[test]
    fn test_malformed_requests_rejected() {
        assert!(serde_json::from_str::<SubscribeRequest>(r#"{"subscribe": "42"}"#).is_err());
        assert!(serde_json::from_str::<SubscribeRequest>(r#"{"other": []}"#).is_err());
        assert!(serde_json::from_str::<SubscribeRequest>("not json").is_err());
    }

    #[test]
    fn test_envelope_shape() {
        let msg = DecodedMessage::new(42, "MISSION_CURRENT")
            .source(1, 1)
            .field("timeBootMs", 1000i64);
        let envelope = Envelope::from_message(&msg);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["msgid"], "42");
        assert_eq!(json["sysid"], 1);
        assert_eq!(json["compid"], 1);
        assert_eq!(json["message"]["timeBootMs"], 1000);
    }

    #[test]
    fn test_envelope_big_int_as_string() {
        let big = (1u64 << 53) + 99;
        let msg = DecodedMessage::new(2, "SYSTEM_TIME").field("timeUnixUsec", big);
        let envelope = Envelope::from_message(&msg);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["message"]["timeUnixUsec"], big.to_string());
    }
}
