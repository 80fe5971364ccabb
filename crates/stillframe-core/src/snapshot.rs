//! Assembled global snapshots.
//!
//! A global snapshot is created empty when a run is initiated, accumulates
//! one record per participating node, and is sealed by its owner once every
//! participant has reported.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::SnapshotError;
use crate::record::SnapshotRecord;
use crate::types::{NodeId, SnapshotId};

/// The consistent cut assembled from per-node records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSnapshot {
    /// The run this snapshot belongs to.
    pub snapshot_id: SnapshotId,

    /// Finalized record per node.
    pub records: BTreeMap<NodeId, SnapshotRecord>,
}

impl GlobalSnapshot {
    /// Create an empty snapshot for a run.
    pub fn new(snapshot_id: SnapshotId) -> Self {
        Self {
            snapshot_id,
            records: BTreeMap::new(),
        }
    }

    /// Insert a node's finalized record.
    ///
    /// Rejects records from a different run and second records for the
    /// same node.
    pub fn insert_record(
        &mut self,
        node: NodeId,
        record: SnapshotRecord,
    ) -> Result<(), SnapshotError> {
        if record.snapshot_id != self.snapshot_id {
            return Err(SnapshotError::IdMismatch {
                expected: self.snapshot_id,
                got: record.snapshot_id,
            });
        }
        if self.records.contains_key(&node) {
            return Err(SnapshotError::DuplicateRecord(node));
        }
        self.records.insert(node, record);
        Ok(())
    }

    /// Whether a record from `node` has been inserted.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.records.contains_key(node)
    }

    /// The record for `node`, if reported.
    pub fn record(&self, node: &NodeId) -> Option<&SnapshotRecord> {
        self.records.get(node)
    }

    /// Number of records inserted so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records have been inserted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether every participant has reported.
    pub fn is_complete(&self, participants: &BTreeSet<NodeId>) -> bool {
        participants.iter().all(|p| self.records.contains_key(p))
    }

    /// Sum of every node's captured balance.
    pub fn captured_total(&self) -> u64 {
        self.records.values().map(|r| r.captured_tokens).sum()
    }

    /// Sum of every recorded in-flight amount.
    pub fn in_flight_total(&self) -> u64 {
        self.records.values().map(|r| r.in_flight_total()).sum()
    }

    /// Captured balances plus in-flight amounts.
    pub fn total_tokens(&self) -> u64 {
        self.captured_total() + self.in_flight_total()
    }
}
