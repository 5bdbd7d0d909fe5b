//! Queue payload type

/// One telemetry event as produced by the transport listener
///
/// Lives only on the ingest queue: consumed exactly once by a worker or
/// dropped at the gate, never persisted as its own entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub device: String,
    pub parameter: String,
    pub value: String,
}

impl TelemetryEvent {
    /// Create a new event
    pub fn new(
        device: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}
