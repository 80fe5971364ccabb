//! Per-node snapshot state machine.
//!
//! Each node is a sequential actor: one packet is processed to completion
//! before the next, so every transition here is atomic with respect to that
//! node. Per snapshot id a node moves `Idle -> Recording -> Done`; `Done`
//! is terminal for the id, and at most one id is active at a time.
//!
//! The cut discipline: entering recording captures the local balance
//! before any marker leaves, every inbound channel is recorded until its
//! own marker arrives, and the channel that triggered the transition is
//! considered already cut: the triggering marker itself delimits it.

use std::collections::{BTreeMap, BTreeSet};

use stillframe_core::{NodeId, SnapshotId, SnapshotRecord};

use crate::error::{ProtocolError, Result};
use crate::messages::Message;
use crate::transport::Transport;

/// A node holding a token balance and, per active snapshot, the recording
/// state for each inbound channel.
///
/// Channel wiring is performed by the topology owner after construction,
/// via [`connect_outbound`](Node::connect_outbound) and
/// [`connect_inbound`](Node::connect_inbound); the node itself only knows
/// its peers.
pub struct Node<T: Transport> {
    id: NodeId,
    tokens: u64,
    transport: T,
    /// Peers this node can send to.
    outbound: BTreeSet<NodeId>,
    /// Peers this node receives from.
    inbound: BTreeSet<NodeId>,
    /// Per inbound peer: whether arriving transfers are being recorded.
    /// Populated on entry into recording, cleared at completion.
    recording: BTreeMap<NodeId, bool>,
    /// The record under construction, present exactly while recording.
    active: Option<SnapshotRecord>,
    /// Ids this node has finished; markers for these are stale.
    completed: BTreeSet<SnapshotId>,
}

impl<T: Transport> Node<T> {
    /// Create a node with an initial token balance.
    pub fn new(id: NodeId, initial_tokens: u64, transport: T) -> Self {
        Self {
            id,
            tokens: initial_tokens,
            transport,
            outbound: BTreeSet::new(),
            inbound: BTreeSet::new(),
            recording: BTreeMap::new(),
            active: None,
            completed: BTreeSet::new(),
        }
    }

    /// This node's id.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Current token balance.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Whether a snapshot is active on this node.
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Whether this node has finished its participation in `snapshot_id`.
    pub fn has_completed(&self, snapshot_id: SnapshotId) -> bool {
        self.completed.contains(&snapshot_id)
    }

    /// Register `peer` as a send target. Called by the topology owner.
    pub fn connect_outbound(&mut self, peer: NodeId) {
        self.outbound.insert(peer);
    }

    /// Register `peer` as a receive source. Called by the topology owner.
    pub fn connect_inbound(&mut self, peer: NodeId) {
        self.inbound.insert(peer);
    }

    /// Send `amount` tokens to `dest`.
    ///
    /// The balance is debited when the transfer is handed to the
    /// transport; the amount is then in flight until the receiver applies
    /// it. Outbound transfers are never recorded by the sender; anything
    /// sent after the cut belongs to the sender's post-snapshot state.
    pub async fn send_tokens(&mut self, dest: &NodeId, amount: u64) -> Result<()> {
        if !self.outbound.contains(dest) {
            return Err(ProtocolError::UnknownChannel { peer: dest.clone() });
        }
        if amount > self.tokens {
            return Err(ProtocolError::InsufficientTokens {
                available: self.tokens,
                requested: amount,
            });
        }
        self.transport
            .send(dest, Message::Transfer { amount })
            .await?;
        self.tokens -= amount;
        Ok(())
    }

    /// Initiate a snapshot locally.
    ///
    /// May be called at most once per id; calling it while any snapshot is
    /// active, or for an id this node already ran, is an error and mutates
    /// nothing. Returns the finalized record immediately when the node has
    /// no inbound channels to record.
    pub async fn start_snapshot(
        &mut self,
        snapshot_id: SnapshotId,
    ) -> Result<Option<SnapshotRecord>> {
        if self.active.is_some() || self.completed.contains(&snapshot_id) {
            return Err(ProtocolError::AlreadyRecording {
                requested: snapshot_id,
            });
        }
        self.begin_recording(snapshot_id, None).await?;
        Ok(self.finish_if_complete())
    }

    /// Process one arriving packet.
    ///
    /// Called by the transport owner whenever a message is delivered on
    /// the channel from `src`. Returns the finalized record when this
    /// packet completed the node's participation; the caller forwards it
    /// to the coordinator exactly once.
    pub async fn handle_packet(
        &mut self,
        src: &NodeId,
        message: Message,
    ) -> Result<Option<SnapshotRecord>> {
        if !self.inbound.contains(src) {
            return Err(ProtocolError::UnknownChannel { peer: src.clone() });
        }

        match message {
            Message::Transfer { amount } => {
                // The cut captures state, not a pause in execution: the
                // transfer is applied whether or not it is recorded.
                self.tokens += amount;
                if self.recording.get(src).copied().unwrap_or(false) {
                    if let Some(record) = self.active.as_mut() {
                        record.record(src.clone(), amount);
                    }
                }
            }
            Message::Marker { snapshot_id } => {
                let active_id = self.active.as_ref().map(|record| record.snapshot_id);
                match active_id {
                    None => {
                        if self.completed.contains(&snapshot_id) {
                            return Err(ProtocolError::StaleMarker { snapshot_id });
                        }
                        // First marker for an unseen id: enter recording,
                        // with the triggering channel already cut.
                        self.begin_recording(snapshot_id, Some(src)).await?;
                    }
                    Some(active) if active != snapshot_id => {
                        return Err(ProtocolError::ConcurrentSnapshotConflict {
                            active,
                            incoming: snapshot_id,
                        });
                    }
                    Some(_) => match self.recording.get_mut(src) {
                        Some(recording) if *recording => *recording = false,
                        _ => {
                            return Err(ProtocolError::DuplicateMarker {
                                snapshot_id,
                                src: src.clone(),
                            });
                        }
                    },
                }
            }
        }

        Ok(self.finish_if_complete())
    }

    /// Enter recording for `snapshot_id`.
    ///
    /// Captures the balance synchronously before any marker is sent, so
    /// the captured value cannot be affected by this node's own markers.
    /// Exactly one marker goes out per outbound channel, in peer order.
    async fn begin_recording(
        &mut self,
        snapshot_id: SnapshotId,
        triggered_by: Option<&NodeId>,
    ) -> Result<()> {
        self.active = Some(SnapshotRecord::new(snapshot_id, self.tokens));
        for peer in &self.inbound {
            let cut_already = triggered_by == Some(peer);
            self.recording.insert(peer.clone(), !cut_already);
        }
        tracing::debug!(node = %self.id, snapshot = %snapshot_id, "entered recording");

        for peer in &self.outbound {
            self.transport
                .send(peer, Message::Marker { snapshot_id })
                .await?;
        }
        Ok(())
    }

    /// Move to `Done` if no inbound channel is still recording.
    ///
    /// Tears down the recording state and hands the frozen record out;
    /// the id becomes terminal for this node.
    fn finish_if_complete(&mut self) -> Option<SnapshotRecord> {
        if self.recording.values().any(|recording| *recording) {
            return None;
        }
        let record = self.active.take()?;
        self.recording.clear();
        self.completed.insert(record.snapshot_id);
        tracing::debug!(
            node = %self.id,
            snapshot = %record.snapshot_id,
            captured = record.captured_tokens,
            in_flight = record.in_flight_total(),
            "snapshot participation complete"
        );
        Some(record)
    }
}
