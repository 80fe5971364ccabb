//! # Stillframe
//!
//! Consistent global snapshots of token-passing node networks - the
//! Chandy-Lamport marker protocol over point-to-point FIFO channels,
//! together with a deterministic simulation coordinator.
//!
//! ## Overview
//!
//! A network of nodes exchanges a conserved resource (tokens) over
//! directed, reliable, FIFO channels. Any node can initiate a snapshot at
//! any moment; the network keeps running while markers propagate the cut,
//! and the assembled result is a consistent cut: every node's balance at
//! its local cut point plus every transfer in flight across the cut.
//!
//! ## Key Concepts
//!
//! - **Marker**: control message delimiting the cut on the channel it
//!   travels. Exactly one per channel per run.
//! - **Recording**: the per-channel window between a node's entry into the
//!   snapshot and that channel's marker; transfers arriving inside the
//!   window are part of the cut.
//! - **Sealing**: a run's global snapshot is complete once every node has
//!   reported; sealed snapshots are immutable and conservation-checked.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stillframe::{Coordinator, CoordinatorConfig, SnapshotId};
//!
//! async fn example() -> stillframe::Result<()> {
//!     let mut sim = Coordinator::with_seed(CoordinatorConfig::default(), 42);
//!
//!     sim.add_node("a", 10)?;
//!     sim.add_node("b", 0)?;
//!     sim.add_link("a", "b").await?;
//!     sim.add_link("b", "a").await?;
//!
//!     sim.transfer("a", "b", 5).await?;
//!     sim.start_snapshot("a", SnapshotId::new(1)).await?;
//!     sim.run_until_quiescent().await;
//!
//!     let snapshot = sim.snapshot(SnapshotId::new(1)).expect("sealed");
//!     assert_eq!(snapshot.total_tokens(), 10);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `stillframe::core` - identifiers, records, conservation checks
//! - `stillframe::protocol` - messages, the node state machine, transport

pub mod coordinator;
pub mod error;

// Re-export component crates
pub use stillframe_core as core;
pub use stillframe_protocol as protocol;

// Re-export main types for convenience
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use error::{CoordinatorError, Result};

// Re-export commonly used component types
pub use stillframe_core::{
    verify_complete, verify_conservation, GlobalSnapshot, NodeId, SnapshotId, SnapshotRecord,
};
pub use stillframe_protocol::{ChannelId, Message, Node, ProtocolError, Transport};
