//! Invariant checks over assembled snapshots.
//!
//! A sealed snapshot is a claim about the whole system; these functions
//! check that claim against what must hold for any consistent cut of a
//! token-conserving network.

use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::snapshot::GlobalSnapshot;
use crate::types::NodeId;

/// Verify token conservation.
///
/// The sum of every node's captured balance plus every recorded in-flight
/// amount must equal the total present in the system before the run began.
/// This holds for every consistent cut regardless of message interleaving;
/// a mismatch means the cut straddled a transfer.
pub fn verify_conservation(
    snapshot: &GlobalSnapshot,
    expected_total: u64,
) -> Result<(), ValidationError> {
    let actual = snapshot.total_tokens();
    if actual != expected_total {
        return Err(ValidationError::ConservationViolation {
            expected: expected_total,
            actual,
        });
    }
    Ok(())
}

/// Verify that exactly the given participants reported.
pub fn verify_complete(
    snapshot: &GlobalSnapshot,
    participants: &BTreeSet<NodeId>,
) -> Result<(), ValidationError> {
    for participant in participants {
        if !snapshot.contains(participant) {
            return Err(ValidationError::MissingRecord(participant.clone()));
        }
    }
    for node in snapshot.records.keys() {
        if !participants.contains(node) {
            return Err(ValidationError::UnexpectedRecord(node.clone()));
        }
    }
    Ok(())
}
