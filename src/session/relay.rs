//! Command relay toward devices
//!
//! Inbound commands from a subscriber session are forwarded to the external
//! publish interface. The path is fire-and-log: a failed publish is counted
//! and logged but never closes the session or surfaces to the RPC client.

use std::sync::Arc;

use async_trait::async_trait;

use crate::stats::PipelineStats;

/// One device command received from a subscriber session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub device: String,
    pub parameter: String,
    pub value: String,
}

impl Command {
    /// Create a new command
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

/// Outbound publish interface toward the device transport
///
/// Implemented by the embedding process over its protocol client (e.g. an
/// MQTT publish on the command topic). Injected at session construction.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(
        &self,
        device: &str,
        parameter: &str,
        value: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Forwards commands from one session to the publish interface
pub struct CommandRelay {
    publisher: Arc<dyn CommandPublisher>,
    stats: Arc<PipelineStats>,
}

impl CommandRelay {
    /// Create a relay over the given publish interface
    pub fn new(publisher: Arc<dyn CommandPublisher>, stats: Arc<PipelineStats>) -> Self {
        Self { publisher, stats }
    }

    /// Forward one command, fire-and-log
    pub async fn forward(&self, cmd: &Command) {
        tracing::info!(
            device = %cmd.device,
            parameter = %cmd.parameter,
            value = %cmd.value,
            "Command received from subscriber"
        );

        match self
            .publisher
            .publish(&cmd.device, &cmd.parameter, &cmd.value)
            .await
        {
            Ok(()) => {
                self.stats.inc_commands_published();
            }
            Err(e) => {
                self.stats.inc_publish_errors();
                tracing::error!(
                    device = %cmd.device,
                    parameter = %cmd.parameter,
                    error = %e,
                    "Failed to publish command"
                );
            }
        }
    }
}
