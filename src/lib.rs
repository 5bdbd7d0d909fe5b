//! # telehub
//!
//! Telemetry ingestion and distribution hub for device fleets.
//!
//! Field devices publish values over a pub/sub transport; this crate
//! persists the latest value and a historical trail per device parameter,
//! and fans every accepted value out in real time to any number of
//! streaming RPC subscribers, which can also send commands back toward the
//! devices.
//!
//! # Data flow
//!
//! ```text
//! listener ─► IngestGate ─► bounded queue ─► WorkerPool
//!  (offer, drop-on-full)                        │ persist
//!                                               ▼
//!                                         StorageEngine
//!                                  (current values + history)
//!                                               │ on commit
//!                                               ▼
//!                                        DistributionHub
//!                                 (snapshot + try_send per buffer)
//!                            ┌──────────────────┼──────────────────┐
//!                            ▼                  ▼                  ▼
//!                       [Session]          [Session]          [Session]
//!                       next_update()      next_update()      next_update()
//!
//! [Session] ─► relay_command() ─► CommandPublisher ─► device transport
//! ```
//!
//! No producer is ever blocked by a slow consumer: the gate drops on a full
//! queue, and broadcast drops per-subscriber on a full buffer. Degradation
//! under overload is deliberate and visible through [`PipelineStats`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telehub::{ReceiverConfig, StorageEngine, TelemetryEvent, TelemetryReceiver};
//!
//! # struct MyPublisher;
//! # #[async_trait::async_trait]
//! # impl telehub::CommandPublisher for MyPublisher {
//! #     async fn publish(&self, _: &str, _: &str, _: &str)
//! #         -> Result<(), Box<dyn std::error::Error + Send + Sync>> { Ok(()) }
//! # }
//! # async fn example() -> telehub::Result<()> {
//! let storage = StorageEngine::open("telemetry.db").await?;
//! let receiver = TelemetryReceiver::start(ReceiverConfig::default(), storage)?;
//!
//! // Transport listener callback
//! let gate = receiver.gate();
//! gate.offer(TelemetryEvent::new("boiler", "temperature", "21.5"));
//!
//! // One streaming RPC client
//! let mut session = receiver.open_session(Arc::new(MyPublisher));
//! while let Some(update) = session.next_update().await {
//!     println!("{}/{} = {}", update.device, update.parameter, update.value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hub;
pub mod ingest;
pub mod receiver;
pub mod session;
pub mod stats;
pub mod storage;
pub mod topic;

pub use config::ReceiverConfig;
pub use error::{Error, Result};
pub use hub::{DistributionHub, PointKey, SubscriberHandle, ValueUpdate};
pub use ingest::{IngestGate, TelemetryEvent};
pub use receiver::TelemetryReceiver;
pub use session::{Command, CommandPublisher, SubscriberSession};
pub use stats::{PipelineStats, StatsSnapshot};
pub use storage::{CurrentValue, HistoryRecord, StorageEngine};
pub use topic::{command_topic, parse_topic};
