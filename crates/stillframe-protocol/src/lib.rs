//! # Stillframe Protocol
//!
//! The snapshot protocol layer: message types, the per-node state machine,
//! and the transport abstraction.
//!
//! ## Overview
//!
//! Nodes exchange tokens over point-to-point FIFO channels. Any node can
//! initiate a snapshot; marker messages propagate the cut along every
//! channel, and each node records the in-flight traffic on each inbound
//! channel between its own entry into recording and that channel's marker.
//! The union of the per-node records is a consistent cut.
//!
//! ## Key Properties
//!
//! - **Non-blocking**: the network keeps running; the cut captures state,
//!   not a pause
//! - **Clock-free**: consistency comes from marker positions in channel
//!   streams, not timestamps
//! - **Conserving**: captured balances plus recorded in-flight amounts
//!   equal the pre-run total, in every interleaving
//!
//! ## Message Flow
//!
//! A three-node ring `a -> b -> c -> a`, snapshot initiated at `a`:
//!
//! ```text
//! a: StartSnapshot(1)
//!    capture balance, record channel c->a, send marker on a->b
//!
//! a                    b                    c
//! |----- marker ------>|                    |
//! |                    | capture balance    |
//! |                    |----- marker ------>|
//! |                    |                    | capture balance
//! |<------------------------ marker --------|
//! | stop recording c->a: participation complete
//! ```
//!
//! Transfers already queued ahead of a marker are applied before the
//! receiver's cut (FIFO); transfers queued behind it land in the next
//! epoch. Only channels into an already-recording node are recorded.
//!
//! ## Transport Contract
//!
//! Correctness is conditioned on the transport: per-channel FIFO, no
//! loss, no duplication, arbitrary finite delay. See [`transport`].

pub mod error;
pub mod messages;
pub mod node;
pub mod transport;

pub use error::{ProtocolError, Result};
pub use messages::Message;
pub use node::Node;
pub use transport::{
    memory::ChannelReceiver, memory::MemoryNetwork, memory::MemoryTransport,
    memory::DEFAULT_CHANNEL_CAPACITY, ChannelId, Transport,
};
