//! The Coordinator: topology, delivery scheduling, and snapshot assembly.
//!
//! The Coordinator owns the node registry and the directed FIFO channels
//! between them, and realizes the network as an event scheduler: one
//! queued `(channel, message)` event is delivered at a time, with the
//! channel chosen by a seeded RNG. That exercises arbitrary cross-channel
//! interleavings while per-channel FIFO holds by construction, which is
//! exactly the freedom the snapshot protocol must tolerate.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use stillframe_core::{verify_conservation, GlobalSnapshot, NodeId, SnapshotId, SnapshotRecord};
use stillframe_protocol::{
    ChannelId, ChannelReceiver, MemoryNetwork, MemoryTransport, Message, Node, Transport,
    DEFAULT_CHANNEL_CAPACITY,
};

use crate::error::{CoordinatorError, Result};

/// Configuration for the Coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Capacity of each directed channel's queue.
    pub channel_capacity: usize,
    /// Whether to check token conservation when a snapshot seals.
    pub validate_conservation: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            validate_conservation: true,
        }
    }
}

/// Bookkeeping for one outstanding snapshot run.
struct SnapshotRun {
    snapshot: GlobalSnapshot,
    participants: BTreeSet<NodeId>,
    expected_total: u64,
    sealed: bool,
}

/// Owns the topology, routes messages, and assembles global snapshots.
///
/// Nodes never touch each other's state: all cross-node effects flow
/// through channel sends, delivered one at a time by [`step`](Self::step).
/// Completion notifications are serialized through
/// [`notify_snapshot_complete`](Self::notify_snapshot_complete), the sole
/// mutation path into a run's global snapshot.
pub struct Coordinator {
    config: CoordinatorConfig,
    network: Arc<MemoryNetwork>,
    nodes: BTreeMap<NodeId, Node<MemoryTransport>>,
    channels: BTreeMap<ChannelId, ChannelReceiver>,
    runs: BTreeMap<SnapshotId, SnapshotRun>,
    errors: Vec<CoordinatorError>,
    rng: StdRng,
    initial_total: u64,
}

impl Coordinator {
    /// Create a coordinator with an entropy-seeded scheduler.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::from_rng(config, StdRng::from_entropy())
    }

    /// Create a coordinator whose delivery order is reproducible from
    /// `seed`.
    pub fn with_seed(config: CoordinatorConfig, seed: u64) -> Self {
        Self::from_rng(config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(config: CoordinatorConfig, rng: StdRng) -> Self {
        let network = MemoryNetwork::new(config.channel_capacity);
        Self {
            config,
            network,
            nodes: BTreeMap::new(),
            channels: BTreeMap::new(),
            runs: BTreeMap::new(),
            errors: Vec::new(),
            rng,
            initial_total: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Topology
    // ─────────────────────────────────────────────────────────────────────

    /// Add a node with an initial token balance.
    pub fn add_node(&mut self, id: impl Into<NodeId>, initial_tokens: u64) -> Result<()> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(CoordinatorError::DuplicateNode(id));
        }
        let transport = self.network.transport(id.clone());
        let node = Node::new(transport.local_node_id(), initial_tokens, transport);
        self.initial_total += initial_tokens;
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Wire the directed channel `src -> dst`.
    ///
    /// Opens the FIFO queue, registers `dst` as a send target of `src` and
    /// `src` as a receive source of `dst`, and keeps the receiving end for
    /// the scheduler.
    pub async fn add_link(
        &mut self,
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
    ) -> Result<()> {
        let src = src.into();
        let dst = dst.into();
        if src == dst {
            return Err(CoordinatorError::SelfLink(src));
        }
        if !self.nodes.contains_key(&src) {
            return Err(CoordinatorError::UnknownNode(src));
        }
        if !self.nodes.contains_key(&dst) {
            return Err(CoordinatorError::UnknownNode(dst));
        }
        let channel = ChannelId {
            src: src.clone(),
            dst: dst.clone(),
        };
        if self.channels.contains_key(&channel) {
            return Err(CoordinatorError::DuplicateLink(channel));
        }

        let receiver = self.network.open_channel(&src, &dst).await?;
        if let Some(node) = self.nodes.get_mut(&src) {
            node.connect_outbound(dst.clone());
        }
        if let Some(node) = self.nodes.get_mut(&dst) {
            node.connect_inbound(src.clone());
        }
        self.channels.insert(channel, receiver);
        Ok(())
    }

    /// Node ids currently in the topology, in order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Current balance of `node`, if present.
    pub fn tokens(&self, node: &NodeId) -> Option<u64> {
        self.nodes.get(node).map(Node::tokens)
    }

    /// Sum of all node balances. Equals [`initial_total`](Self::initial_total)
    /// when no transfers are in flight.
    pub fn total_tokens(&self) -> u64 {
        self.nodes.values().map(Node::tokens).sum()
    }

    /// Total tokens present in the system at construction time.
    pub fn initial_total(&self) -> u64 {
        self.initial_total
    }

    // ─────────────────────────────────────────────────────────────────────
    // Application traffic
    // ─────────────────────────────────────────────────────────────────────

    /// Send `amount` tokens from `src` to `dst`.
    pub async fn transfer(
        &mut self,
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
        amount: u64,
    ) -> Result<()> {
        let src = src.into();
        let dst = dst.into();
        let node = self
            .nodes
            .get_mut(&src)
            .ok_or_else(|| CoordinatorError::UnknownNode(src.clone()))?;
        node.send_tokens(&dst, amount)
            .await
            .map_err(|source| CoordinatorError::Node { id: src, source })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Snapshot runs
    // ─────────────────────────────────────────────────────────────────────

    /// Initiate a snapshot run at `initiator`.
    ///
    /// Every node currently in the topology is a participant; the run
    /// seals once all of them report completion.
    pub async fn start_snapshot(
        &mut self,
        initiator: impl Into<NodeId>,
        snapshot_id: SnapshotId,
    ) -> Result<()> {
        let initiator = initiator.into();
        if self.runs.contains_key(&snapshot_id) {
            return Err(CoordinatorError::SnapshotAlreadyInitiated(snapshot_id));
        }
        let participants: BTreeSet<NodeId> = self.nodes.keys().cloned().collect();

        let node = self
            .nodes
            .get_mut(&initiator)
            .ok_or_else(|| CoordinatorError::UnknownNode(initiator.clone()))?;
        let outcome = node
            .start_snapshot(snapshot_id)
            .await
            .map_err(|source| CoordinatorError::Node {
                id: initiator.clone(),
                source,
            })?;

        self.runs.insert(
            snapshot_id,
            SnapshotRun {
                snapshot: GlobalSnapshot::new(snapshot_id),
                participants,
                expected_total: self.initial_total,
                sealed: false,
            },
        );
        tracing::info!(snapshot = %snapshot_id, initiator = %initiator, "snapshot initiated");

        if let Some(record) = outcome {
            self.notify_snapshot_complete(&initiator, snapshot_id, record)?;
        }
        Ok(())
    }

    /// Record one node's completion of a run.
    ///
    /// Invoked once per `(node, snapshot_id)` as participation finishes.
    /// When the last participant reports, the run seals; if configured,
    /// conservation is validated at seal time.
    pub fn notify_snapshot_complete(
        &mut self,
        node_id: &NodeId,
        snapshot_id: SnapshotId,
        record: SnapshotRecord,
    ) -> Result<()> {
        let run = self
            .runs
            .get_mut(&snapshot_id)
            .ok_or(CoordinatorError::UnknownSnapshot(snapshot_id))?;
        if !run.participants.contains(node_id) {
            return Err(CoordinatorError::UnknownNode(node_id.clone()));
        }
        if run.snapshot.contains(node_id) {
            return Err(CoordinatorError::DuplicateCompletion {
                node: node_id.clone(),
                snapshot_id,
            });
        }
        run.snapshot.insert_record(node_id.clone(), record)?;
        tracing::debug!(
            node = %node_id,
            snapshot = %snapshot_id,
            reported = run.snapshot.len(),
            participants = run.participants.len(),
            "completion reported"
        );

        if run.snapshot.is_complete(&run.participants) {
            run.sealed = true;
            tracing::info!(
                snapshot = %snapshot_id,
                total_tokens = run.snapshot.total_tokens(),
                "global snapshot sealed"
            );
            if self.config.validate_conservation {
                verify_conservation(&run.snapshot, run.expected_total)?;
            }
        }
        Ok(())
    }

    /// The sealed global snapshot for `snapshot_id`, if the run finished.
    pub fn snapshot(&self, snapshot_id: SnapshotId) -> Option<&GlobalSnapshot> {
        self.runs
            .get(&snapshot_id)
            .filter(|run| run.sealed)
            .map(|run| &run.snapshot)
    }

    /// Whether the run for `snapshot_id` has sealed.
    pub fn is_sealed(&self, snapshot_id: SnapshotId) -> bool {
        self.runs
            .get(&snapshot_id)
            .map(|run| run.sealed)
            .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Delivery scheduling
    // ─────────────────────────────────────────────────────────────────────

    /// Deliver exactly one in-flight message, if any channel holds one.
    ///
    /// The channel is chosen uniformly among nonempty channels. Node-level
    /// protocol errors are logged and retained (see
    /// [`errors`](Self::errors)); they never halt other nodes' progress.
    pub async fn step(&mut self) -> bool {
        let mut candidates: Vec<ChannelId> = self.channels.keys().cloned().collect();
        candidates.shuffle(&mut self.rng);

        for channel in candidates {
            let message = match self.channels.get_mut(&channel) {
                Some(receiver) => match receiver.try_next() {
                    Some(message) => message,
                    None => continue,
                },
                None => continue,
            };
            self.deliver(&channel, message).await;
            return true;
        }
        false
    }

    /// Step until every channel is empty.
    ///
    /// Returns the number of messages delivered. Sends happen only inside
    /// packet handling, so an empty sweep means the network is quiescent.
    pub async fn run_until_quiescent(&mut self) -> usize {
        let mut delivered = 0;
        while self.step().await {
            delivered += 1;
        }
        delivered
    }

    /// Protocol errors observed during stepping, in occurrence order.
    pub fn errors(&self) -> &[CoordinatorError] {
        &self.errors
    }

    async fn deliver(&mut self, channel: &ChannelId, message: Message) {
        if !self.nodes.contains_key(&channel.dst) {
            self.record_error(CoordinatorError::UnknownNode(channel.dst.clone()));
            return;
        }
        let outcome = match self.nodes.get_mut(&channel.dst) {
            Some(node) => node.handle_packet(&channel.src, message).await,
            None => return,
        };

        match outcome {
            Ok(None) => {}
            Ok(Some(record)) => {
                let snapshot_id = record.snapshot_id;
                if let Err(error) =
                    self.notify_snapshot_complete(&channel.dst, snapshot_id, record)
                {
                    self.record_error(error);
                }
            }
            Err(source) => self.record_error(CoordinatorError::Node {
                id: channel.dst.clone(),
                source,
            }),
        }
    }

    fn record_error(&mut self, error: CoordinatorError) {
        tracing::warn!(error = %error, "protocol error during simulation");
        self.errors.push(error);
    }
}
