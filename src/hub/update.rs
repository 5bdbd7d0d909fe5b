//! Value notification types for hub fan-out
//!
//! This module defines the key type identifying a telemetry point and the
//! notification broadcast to subscribers after every successful persist.

/// Unique identifier for a telemetry point (device + parameter)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointKey {
    /// Device name (e.g., "boiler-1")
    pub device: String,
    /// Measurement or control point on the device (e.g., "temperature")
    pub parameter: String,
}

impl PointKey {
    /// Create a new point key
    pub fn new(device: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            parameter: parameter.into(),
        }
    }
}

impl std::fmt::Display for PointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device, self.parameter)
    }
}

/// A value notification broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueUpdate {
    /// Device name
    pub device: String,
    /// Parameter name
    pub parameter: String,
    /// Persisted value
    pub value: String,
    /// Capture timestamp, UTC milliseconds
    pub timestamp_ms: i64,
}

impl ValueUpdate {
    /// Create a new value update
    pub fn new(
        device: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            device: device.into(),
            parameter: parameter.into(),
            value: value.into(),
            timestamp_ms,
        }
    }

    /// The point this update belongs to
    pub fn key(&self) -> PointKey {
        PointKey::new(self.device.clone(), self.parameter.clone())
    }
}
