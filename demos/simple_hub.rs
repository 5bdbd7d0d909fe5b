//! Minimal in-process hub demo
//!
//! Feeds a few synthetic telemetry events through the full pipeline and
//! prints what a subscriber session sees. Run with:
//!
//! ```sh
//! cargo run --example simple_hub
//! ```

use std::sync::Arc;
use std::time::Duration;

use telehub::{
    Command, CommandPublisher, ReceiverConfig, StorageEngine, TelemetryEvent, TelemetryReceiver,
};

/// Publisher that just logs instead of talking to a broker
struct LoggingPublisher;

#[async_trait::async_trait]
impl CommandPublisher for LoggingPublisher {
    async fn publish(
        &self,
        device: &str,
        parameter: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("-> publish {} = {}", telehub::command_topic(device, parameter), value);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> telehub::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let storage = StorageEngine::open_in_memory().await?;
    let receiver = TelemetryReceiver::start(ReceiverConfig::default().worker_count(2), storage)?;

    let mut session = receiver.open_session(Arc::new(LoggingPublisher));
    session.relay_command(&Command::new("boiler", "setpoint", "55")).await;

    // Pretend to be the transport listener
    let gate = receiver.gate();
    for (value, parameter) in [("21.5", "temperature"), ("21.7", "temperature"), ("3.1", "pressure")] {
        gate.offer(TelemetryEvent::new("boiler", parameter, value));
    }
    drop(gate);

    for _ in 0..3 {
        if let Some(update) = session.next_update().await {
            println!(
                "<- {}/{} = {} @ {}",
                update.device, update.parameter, update.value, update.timestamp_ms
            );
        }
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    let history = receiver.get_history("boiler", "temperature", 0, i64::MAX).await?;
    println!("history rows for boiler/temperature: {}", history.len());
    println!("stats: {:?}", receiver.stats());

    session.close();
    receiver.shutdown().await;
    Ok(())
}
