//! Proptest generators for randomized snapshot scenarios.
//!
//! A scenario is a topology (ring spine plus random chords, so every node
//! stays reachable from every initiator), a transfer script split around
//! the snapshot initiation, and a scheduler seed. Raw indices are
//! generated wide and normalized modulo the node count at build time, so
//! shrinking stays simple.

use proptest::prelude::*;

use stillframe::{Coordinator, CoordinatorConfig, CoordinatorError, Result};
use stillframe_core::SnapshotId;
use stillframe_protocol::ProtocolError;

/// Upper bound used when generating raw node indices.
const MAX_NODES: usize = 6;

/// Parameters for one randomized snapshot scenario.
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    /// Initial balance per node; the length is the node count.
    pub balances: Vec<u64>,
    /// Extra directed chords over the ring spine (raw indices).
    pub extra_links: Vec<(usize, usize)>,
    /// Ring-edge transfers issued before the snapshot starts:
    /// (source raw index, amount).
    pub pre_transfers: Vec<(usize, u64)>,
    /// Ring-edge transfers issued after the snapshot starts.
    pub post_transfers: Vec<(usize, u64)>,
    /// Deliveries to perform before the snapshot starts, leaving the rest
    /// of the pre-transfer traffic in flight.
    pub warmup_steps: usize,
    /// Which node initiates (raw index).
    pub initiator: usize,
    /// Scheduler seed: fixes the cross-channel interleaving.
    pub seed: u64,
}

impl Arbitrary for ScenarioParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(0u64..=50, 2..=MAX_NODES),
            prop::collection::vec((0usize..MAX_NODES, 0usize..MAX_NODES), 0..8),
            prop::collection::vec((0usize..MAX_NODES, 1u64..=5), 0..6),
            prop::collection::vec((0usize..MAX_NODES, 1u64..=5), 0..6),
            0usize..10,
            0usize..MAX_NODES,
            any::<u64>(),
        )
            .prop_map(
                |(balances, extra_links, pre_transfers, post_transfers, warmup_steps, initiator, seed)| {
                    ScenarioParams {
                        balances,
                        extra_links,
                        pre_transfers,
                        post_transfers,
                        warmup_steps,
                        initiator,
                        seed,
                    }
                },
            )
            .boxed()
    }
}

impl ScenarioParams {
    /// Number of nodes in this scenario.
    pub fn node_count(&self) -> usize {
        self.balances.len()
    }

    /// Total tokens present at construction.
    pub fn total_tokens(&self) -> u64 {
        self.balances.iter().sum()
    }

    fn name(&self, raw_index: usize) -> String {
        format!("n{}", raw_index % self.node_count())
    }

    /// The ring successor of a raw index.
    fn next_name(&self, raw_index: usize) -> String {
        format!("n{}", (raw_index + 1) % self.node_count())
    }
}

/// Build the topology for a scenario: nodes, ring spine, extra chords.
pub async fn build_scenario(params: &ScenarioParams) -> Result<Coordinator> {
    let n = params.node_count();
    let mut sim = Coordinator::with_seed(CoordinatorConfig::default(), params.seed);

    for (i, tokens) in params.balances.iter().enumerate() {
        sim.add_node(format!("n{i}"), *tokens)?;
    }
    for i in 0..n {
        sim.add_link(format!("n{i}"), format!("n{}", (i + 1) % n))
            .await?;
    }
    for (src, dst) in &params.extra_links {
        let (src, dst) = (*src % n, *dst % n);
        if src == dst {
            continue;
        }
        match sim.add_link(format!("n{src}"), format!("n{dst}")).await {
            Ok(()) | Err(CoordinatorError::DuplicateLink(_)) => {}
            Err(error) => return Err(error),
        }
    }
    Ok(sim)
}

/// Build and run a scenario to quiescence: pre-transfer traffic, a warmup
/// prefix of deliveries, snapshot initiation, post-transfer traffic, then
/// drain.
pub async fn run_scenario(params: &ScenarioParams) -> Result<Coordinator> {
    let mut sim = build_scenario(params).await?;

    for (src, amount) in &params.pre_transfers {
        ring_transfer(&mut sim, params, *src, *amount).await?;
    }
    for _ in 0..params.warmup_steps {
        if !sim.step().await {
            break;
        }
    }

    sim.start_snapshot(params.name(params.initiator), SnapshotId::new(1))
        .await?;

    for (src, amount) in &params.post_transfers {
        ring_transfer(&mut sim, params, *src, *amount).await?;
    }
    sim.run_until_quiescent().await;
    Ok(sim)
}

/// Transfer along a ring edge; an overdraw is a legal no-op in generated
/// scripts.
async fn ring_transfer(
    sim: &mut Coordinator,
    params: &ScenarioParams,
    src: usize,
    amount: u64,
) -> Result<()> {
    match sim
        .transfer(params.name(src), params.next_name(src), amount)
        .await
    {
        Ok(()) => Ok(()),
        Err(CoordinatorError::Node {
            source: ProtocolError::InsufficientTokens { .. },
            ..
        }) => Ok(()),
        Err(error) => Err(error),
    }
}
