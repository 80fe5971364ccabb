//! Error types for Stillframe Core.

use thiserror::Error;

use crate::types::{NodeId, SnapshotId};

/// Errors that can occur while assembling a global snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("record for snapshot {got} inserted into snapshot {expected}")]
    IdMismatch {
        expected: SnapshotId,
        got: SnapshotId,
    },

    #[error("node {0} already has a record in this snapshot")]
    DuplicateRecord(NodeId),
}

/// Invariant violations detected over an assembled snapshot.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("conservation violated: expected {expected} tokens, snapshot holds {actual}")]
    ConservationViolation { expected: u64, actual: u64 },

    #[error("no record for participant {0}")]
    MissingRecord(NodeId),

    #[error("record from {0}, which is not a participant")]
    UnexpectedRecord(NodeId),
}
