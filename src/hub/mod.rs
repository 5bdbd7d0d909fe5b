//! Distribution hub for value fan-out
//!
//! The hub routes every committed telemetry value to all connected
//! subscriber sessions. Each subscriber owns a bounded output buffer;
//! broadcast is a non-blocking send per buffer with drop-on-full, so a
//! lagging subscriber can never stall the persistence workers.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<DistributionHub>
//!                   ┌────────────────────────────┐
//!                   │ subscribers: Mutex<        │
//!                   │   HashMap<id, mpsc::Tx>    │
//!                   │ >                          │
//!                   └────────────┬───────────────┘
//!                                │ broadcast() = snapshot + try_send
//!            ┌───────────────────┼───────────────────┐
//!            │                   │                   │
//!            ▼                   ▼                   ▼
//!      [Subscriber]        [Subscriber]        [Subscriber]
//!      handle.recv()       handle.recv()       handle.recv()
//!            │                   │                   │
//!            └──► session send loop ──► streaming RPC transport
//! ```

pub mod handle;
pub mod store;
pub mod update;

pub use handle::SubscriberHandle;
pub use store::DistributionHub;
pub use update::{PointKey, ValueUpdate};
