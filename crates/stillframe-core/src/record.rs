//! Per-node snapshot records.
//!
//! A record is created when a node enters recording for a snapshot id and
//! frozen when the node completes. Ownership enforces the freeze: the node
//! moves the record out when it reports completion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{NodeId, SnapshotId};

/// State captured by one node during a snapshot run.
///
/// Holds the node's token balance at the instant it entered recording and,
/// per inbound peer, the ordered amounts received while that channel was
/// being recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// The run this record belongs to.
    pub snapshot_id: SnapshotId,

    /// Token balance at entry into recording.
    ///
    /// Set exactly once, before any marker is sent.
    pub captured_tokens: u64,

    /// Amounts received per inbound peer while recording that channel.
    ///
    /// An amount appears under peer `p` iff it arrived strictly after this
    /// node entered recording and strictly before the marker for the same
    /// snapshot arrived on channel `p`.
    pub recorded: BTreeMap<NodeId, Vec<u64>>,
}

impl SnapshotRecord {
    /// Create a record at entry into recording, capturing the balance.
    pub fn new(snapshot_id: SnapshotId, captured_tokens: u64) -> Self {
        Self {
            snapshot_id,
            captured_tokens,
            recorded: BTreeMap::new(),
        }
    }

    /// Append an in-flight amount received from `peer`.
    pub fn record(&mut self, peer: NodeId, amount: u64) {
        self.recorded.entry(peer).or_default().push(amount);
    }

    /// Amounts recorded on the channel from `peer`, in arrival order.
    pub fn recorded_from(&self, peer: &NodeId) -> &[u64] {
        self.recorded.get(peer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sum of all recorded in-flight amounts.
    pub fn in_flight_total(&self) -> u64 {
        self.recorded
            .values()
            .flat_map(|amounts| amounts.iter())
            .sum()
    }

    /// Captured balance plus recorded in-flight amounts.
    pub fn total_tokens(&self) -> u64 {
        self.captured_tokens + self.in_flight_total()
    }
}
