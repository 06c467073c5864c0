//! Message schema registry
//!
//! The set of message keys the decoder is configured against. A message
//! whose key is not present here is dropped by the ingest pipeline before
//! touching any state.

use super::message::MessageKey;
use std::collections::HashMap;

/// Well-known message keys used by the correlation configuration.
pub mod keys {
    use crate::telemetry::message::MessageKey;

    /// SYSTEM_TIME: carries timeUnixUsec, the wall-clock source for
    /// derived capture timestamps
    pub const SYSTEM_TIME: MessageKey = MessageKey(2);
    /// MISSION_CURRENT: carries timeBootMs, used to order capture events
    pub const MISSION_CURRENT: MessageKey = MessageKey(42);
    /// CAMERA_FEEDBACK: the capture trigger
    pub const CAMERA_FEEDBACK: MessageKey = MessageKey(180);
    /// MOUNT_ORIENTATION: gimbal pitch/roll/yaw at capture time
    pub const MOUNT_ORIENTATION: MessageKey = MessageKey(265);
}

/// Registry of known message schemas
///
/// Maps each key to its schema name. Mirrors the dialect set the wire
/// decoder is built against; keys can be added at startup for custom
/// dialects.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    names: HashMap<MessageKey, String>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Create a registry with the standard dialect entries
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (id, name) in DEFAULT_SCHEMAS {
            registry.register(MessageKey(*id), *name);
        }
        registry
    }

    /// Register a schema
    pub fn register(&mut self, key: MessageKey, name: impl Into<String>) {
        self.names.insert(key, name.into());
    }

    /// Whether the key belongs to a known schema
    pub fn contains(&self, key: MessageKey) -> bool {
        self.names.contains_key(&key)
    }

    /// Schema name for a key, if known
    pub fn name(&self, key: MessageKey) -> Option<&str> {
        self.names.get(&key).map(String::as_str)
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Standard dialect schemas (minimal + common + ardupilotmega subset the
/// vehicle actually emits)
const DEFAULT_SCHEMAS: &[(u32, &str)] = &[
    (0, "HEARTBEAT"),
    (1, "SYS_STATUS"),
    (2, "SYSTEM_TIME"),
    (11, "SET_MODE"),
    (22, "PARAM_VALUE"),
    (24, "GPS_RAW_INT"),
    (27, "RAW_IMU"),
    (29, "SCALED_PRESSURE"),
    (30, "ATTITUDE"),
    (32, "LOCAL_POSITION_NED"),
    (33, "GLOBAL_POSITION_INT"),
    (36, "SERVO_OUTPUT_RAW"),
    (42, "MISSION_CURRENT"),
    (62, "NAV_CONTROLLER_OUTPUT"),
    (65, "RC_CHANNELS"),
    (74, "VFR_HUD"),
    (87, "POSITION_TARGET_GLOBAL_INT"),
    (110, "FILE_TRANSFER_PROTOCOL"),
    (111, "TIMESYNC"),
    (116, "SCALED_IMU2"),
    (125, "POWER_STATUS"),
    (129, "SCALED_IMU3"),
    (136, "TERRAIN_REPORT"),
    (137, "SCALED_PRESSURE2"),
    (147, "BATTERY_STATUS"),
    (152, "MEMINFO"),
    (158, "MOUNT_STATUS"),
    (163, "AHRS"),
    (164, "SIMSTATE"),
    (165, "HWSTATUS"),
    (168, "WIND"),
    (173, "RANGEFINDER"),
    (178, "AHRS2"),
    (180, "CAMERA_FEEDBACK"),
    (193, "EKF_STATUS_REPORT"),
    (241, "VIBRATION"),
    (253, "STATUSTEXT"),
    (265, "MOUNT_ORIENTATION"),
    (1130, "UAVIONIX_ADSB_OUT_CFG"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_contain_correlation_keys() {
        let registry = SchemaRegistry::with_defaults();
        assert!(registry.contains(keys::CAMERA_FEEDBACK));
        assert!(registry.contains(keys::MOUNT_ORIENTATION));
        assert!(registry.contains(keys::MISSION_CURRENT));
        assert!(registry.contains(keys::SYSTEM_TIME));
        assert_eq!(registry.name(MessageKey(30)), Some("ATTITUDE"));
    }

    #[test]
    fn test_unknown_key() {
        let registry = SchemaRegistry::with_defaults();
        assert!(!registry.contains(MessageKey(9999)));
        assert!(registry.name(MessageKey(9999)).is_none());
    }

    #[test]
    fn test_register_custom_schema() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.is_empty());

        registry.register(MessageKey(11030), "CUSTOM_PAYLOAD_STATUS");
        assert!(registry.contains(MessageKey(11030)));
        assert_eq!(registry.len(), 1);
    }
}
