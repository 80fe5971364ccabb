//! Error types for the protocol layer.

use thiserror::Error;

use stillframe_core::{NodeId, SnapshotId};

/// Errors reported by nodes and the transport.
///
/// Node methods return these synchronously from the call that triggered
/// them; nothing is thrown across actor boundaries.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// StartSnapshot for an id already started or completed, or while
    /// another snapshot is active on this node.
    #[error("cannot start snapshot {requested}: node already has an active or finished run")]
    AlreadyRecording { requested: SnapshotId },

    /// A marker for a different id arrived while one snapshot was active.
    #[error("marker for snapshot {incoming} received while snapshot {active} is recording")]
    ConcurrentSnapshotConflict {
        active: SnapshotId,
        incoming: SnapshotId,
    },

    /// A packet referenced a channel that is not wired into the topology.
    #[error("no channel to or from {peer}")]
    UnknownChannel { peer: NodeId },

    /// A marker arrived for an id this node already completed.
    #[error("stale marker for completed snapshot {snapshot_id}")]
    StaleMarker { snapshot_id: SnapshotId },

    /// A second marker for the active id arrived on an already-cut channel.
    ///
    /// The transport contract forbids duplication, so this is evidence of
    /// a misbehaving transport or driver.
    #[error("duplicate marker for snapshot {snapshot_id} on channel from {src}")]
    DuplicateMarker { snapshot_id: SnapshotId, src: NodeId },

    /// A transfer would overdraw the sender's balance.
    #[error("insufficient tokens: balance {available}, requested {requested}")]
    InsufficientTokens { available: u64, requested: u64 },

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
