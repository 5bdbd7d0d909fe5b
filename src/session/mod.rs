//! Subscriber session lifecycle
//!
//! A session is one bidirectional streaming RPC client: outbound it drains
//! value notifications from its hub subscription, inbound it relays device
//! commands to the publish interface. The transport drives both directions
//! from its own send and receive loops; this module only owns the state
//! shared between them and guarantees the subscription is removed exactly
//! once when the session ends, however it ends.

pub mod relay;

use std::sync::Arc;

use crate::hub::{DistributionHub, SubscriberHandle, ValueUpdate};
use crate::stats::PipelineStats;

pub use relay::{Command, CommandPublisher, CommandRelay};

/// One active subscriber session
///
/// Created when the RPC stream opens, dropped (or explicitly closed) when
/// it ends. Dropping unsubscribes from the hub, so a session that ends by
/// transport error still cleans up.
pub struct SubscriberSession {
    hub: Arc<DistributionHub>,
    handle: Option<SubscriberHandle>,
    relay: CommandRelay,
    session_id: u64,
}

impl SubscriberSession {
    /// Open a session: subscribe to the hub and wire the command relay
    pub fn new(
        hub: Arc<DistributionHub>,
        publisher: Arc<dyn CommandPublisher>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let handle = hub.subscribe();
        let session_id = handle.id();

        tracing::info!(session_id = session_id, "Subscriber session opened");

        Self {
            hub,
            handle: Some(handle),
            relay: CommandRelay::new(publisher, stats),
            session_id,
        }
    }

    /// Session id (same as the hub subscriber id)
    pub fn id(&self) -> u64 {
        self.session_id
    }

    /// Next outbound notification, `None` once the session is closed and
    /// its buffer drained
    ///
    /// Drives the transport's send loop. Blocks only this session.
    pub async fn next_update(&mut self) -> Option<ValueUpdate> {
        match self.handle.as_mut() {
            Some(handle) => handle.recv().await,
            None => None,
        }
    }

    /// Relay one inbound command to the publish interface
    ///
    /// Drives the transport's receive loop. Commands from one session are
    /// totally ordered because the receive loop is sequential; nothing is
    /// ordered across sessions.
    pub async fn relay_command(&self, cmd: &Command) {
        self.relay.forward(cmd).await;
    }

    /// Close the session, removing its subscription
    pub fn close(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.hub.unsubscribe(handle);
            tracing::info!(session_id = self.session_id, "Subscriber session closed");
        }
    }
}

impl Drop for SubscriberSession {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
