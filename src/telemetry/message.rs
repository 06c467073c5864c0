//! Core telemetry message types
//!
//! This module defines the value types produced by the external decoder:
//! - `DecodedMessage`: one decoded telemetry message
//! - `MessageKey`: the schema identifier of a message
//! - `SourceId`: which system/component on the vehicle sent it
//! - `FieldValue`: the closed set of field value shapes the decoder emits

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Largest integer magnitude that survives a JSON number round-trip
/// without precision loss (2^53).
const MAX_SAFE_JSON_INT: u64 = 1 << 53;

/// Identifier of a telemetry message schema
///
/// Small positive integer assigned by the wire protocol (e.g. 30 for
/// ATTITUDE, 180 for CAMERA_FEEDBACK).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKey(pub u32);

impl MessageKey {
    /// The key as the string form used for subscription matching
    pub fn as_subscription_key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MessageKey {
    fn from(id: u32) -> Self {
        MessageKey(id)
    }
}

/// Originating system and component on the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceId {
    /// System ID (e.g. 1 for the autopilot)
    pub system_id: u8,
    /// Component ID within the system
    pub component_id: u8,
}

impl SourceId {
    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
        }
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// A single field value inside a decoded message
///
/// Unsigned and signed 64-bit integers beyond 2^53 are serialized as
/// decimal strings so downstream JSON consumers never see a rounded
/// value; everything else serializes as the natural JSON type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Signed integer (covers all signed wire widths)
    Int(i64),
    /// Unsigned integer (covers timestamps like timeUnixUsec)
    UInt(u64),
    /// Floating point (f32 fields widen to f64)
    Float(f64),
    /// Text field
    Text(String),
    /// Boolean flag
    Bool(bool),
    /// Array field (e.g. RC channel values)
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Interpret this value as an unsigned integer, if it is one
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt(v) => Some(*v),
            FieldValue::Int(v) if *v >= 0 => Some(*v as u64),
            // Decoders that pre-stringify big integers hand us text
            FieldValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Interpret this value as a float, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Render the value the way it appears in a CSV cell
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::UInt(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Array(_) => String::new(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Int(v) => {
                if v.unsigned_abs() > MAX_SAFE_JSON_INT {
                    serializer.serialize_str(&v.to_string())
                } else {
                    serializer.serialize_i64(*v)
                }
            }
            FieldValue::UInt(v) => {
                if *v > MAX_SAFE_JSON_INT {
                    serializer.serialize_str(&v.to_string())
                } else {
                    serializer.serialize_u64(*v)
                }
            }
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Array(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        FieldValue::from_json(&value).ok_or_else(|| de::Error::custom("unsupported field value"))
    }
}

impl FieldValue {
    /// Convert a JSON value into a field value
    ///
    /// Returns `None` for shapes the decoder never produces (nested
    /// objects, null).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Some(FieldValue::Int(v))
                } else if let Some(v) = n.as_u64() {
                    Some(FieldValue::UInt(v))
                } else {
                    n.as_f64().map(FieldValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(FieldValue::Bool(*b)),
            serde_json::Value::Array(items) => {
                let converted: Option<Vec<FieldValue>> =
                    items.iter().map(FieldValue::from_json).collect();
                converted.map(FieldValue::Array)
            }
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::UInt(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// One decoded telemetry message
///
/// Produced by the external wire decoder; immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMessage {
    /// Schema identifier
    pub key: MessageKey,
    /// Originating system/component
    #[serde(default)]
    pub source: SourceId,
    /// Schema name (e.g. "ATTITUDE")
    pub name: String,
    /// Decoded field values keyed by the schema's field names
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

impl DecodedMessage {
    /// Create a message with no fields
    pub fn new(key: impl Into<MessageKey>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: SourceId::default(),
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    /// Builder method: set the source
    pub fn source(mut self, system_id: u8, component_id: u8) -> Self {
        self.source = SourceId::new(system_id, component_id);
        self
    }

    /// Builder method: add a field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field by name
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
