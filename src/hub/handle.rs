//! Subscriber handle

use tokio::sync::mpsc;

use super::update::ValueUpdate;

/// Receiving side of one subscription
///
/// Returned by [`DistributionHub::subscribe`](super::DistributionHub::subscribe).
/// The owning session reads notifications through [`recv`](Self::recv) and
/// gives the handle back to the hub when the session ends. After the hub
/// side is removed, `recv` drains whatever is still buffered and then
/// returns `None`.
#[derive(Debug)]
pub struct SubscriberHandle {
    pub(super) id: u64,
    pub(super) rx: mpsc::Receiver<ValueUpdate>,
}

impl SubscriberHandle {
    /// Subscriber id, unique for the lifetime of the hub
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next notification
    ///
    /// Blocks only this subscriber's outbound loop while its buffer is
    /// empty. Returns `None` once the subscription was removed and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Option<ValueUpdate> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for transports that poll
    pub fn try_recv(&mut self) -> Option<ValueUpdate> {
        self.rx.try_recv().ok()
    }
}
