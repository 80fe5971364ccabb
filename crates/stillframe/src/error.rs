//! Error types for the Coordinator.

use thiserror::Error;

use stillframe_core::{NodeId, SnapshotError, SnapshotId, ValidationError};
use stillframe_protocol::{ChannelId, ProtocolError};

/// Errors that can occur during Coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A node id not present in the topology.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// A node with this id already exists.
    #[error("node already exists: {0}")]
    DuplicateNode(NodeId),

    /// This directed link already exists.
    #[error("link already exists: {0}")]
    DuplicateLink(ChannelId),

    /// A node cannot be linked to itself.
    #[error("refusing self-link on {0}")]
    SelfLink(NodeId),

    /// A completion notification referenced a run that was never initiated.
    #[error("no snapshot run with id {0}")]
    UnknownSnapshot(SnapshotId),

    /// A run with this id was already initiated.
    #[error("snapshot {0} already initiated")]
    SnapshotAlreadyInitiated(SnapshotId),

    /// A node reported completion twice for the same run.
    #[error("duplicate completion from {node} for snapshot {snapshot_id}")]
    DuplicateCompletion {
        node: NodeId,
        snapshot_id: SnapshotId,
    },

    /// A node-level protocol error, tagged with the node it came from.
    #[error("node {id}: {source}")]
    Node {
        id: NodeId,
        #[source]
        source: ProtocolError,
    },

    /// Protocol error outside any particular node.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Snapshot assembly error.
    #[error("snapshot assembly error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Invariant violation over a sealed snapshot.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for Coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
