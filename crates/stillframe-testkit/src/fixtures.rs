//! Test fixtures and helpers.
//!
//! Wired-up coordinators for the topologies the tests keep reaching for.

use stillframe::{Coordinator, CoordinatorConfig, Result};

/// Two nodes with links both ways.
pub async fn pair(a_tokens: u64, b_tokens: u64, seed: u64) -> Result<Coordinator> {
    let mut sim = Coordinator::with_seed(CoordinatorConfig::default(), seed);
    sim.add_node("a", a_tokens)?;
    sim.add_node("b", b_tokens)?;
    sim.add_link("a", "b").await?;
    sim.add_link("b", "a").await?;
    Ok(sim)
}

/// A forward-only chain: each node links to the next.
///
/// Only the first node has no inbound channel, so a snapshot initiated
/// there completes instantly at the initiator and still sweeps the chain.
pub async fn line(balances: &[(&str, u64)], seed: u64) -> Result<Coordinator> {
    let mut sim = Coordinator::with_seed(CoordinatorConfig::default(), seed);
    for (id, tokens) in balances {
        sim.add_node(*id, *tokens)?;
    }
    for window in balances.windows(2) {
        sim.add_link(window[0].0, window[1].0).await?;
    }
    Ok(sim)
}

/// A unidirectional ring: each node links to the next, the last wraps to
/// the first.
pub async fn ring(balances: &[(&str, u64)], seed: u64) -> Result<Coordinator> {
    let mut sim = Coordinator::with_seed(CoordinatorConfig::default(), seed);
    for (id, tokens) in balances {
        sim.add_node(*id, *tokens)?;
    }
    let ids: Vec<&str> = balances.iter().map(|(id, _)| *id).collect();
    for i in 0..ids.len() {
        sim.add_link(ids[i], ids[(i + 1) % ids.len()]).await?;
    }
    Ok(sim)
}

/// Every ordered pair of distinct nodes gets a link.
pub async fn fully_connected(balances: &[(&str, u64)], seed: u64) -> Result<Coordinator> {
    let mut sim = Coordinator::with_seed(CoordinatorConfig::default(), seed);
    for (id, tokens) in balances {
        sim.add_node(*id, *tokens)?;
    }
    for (src, _) in balances {
        for (dst, _) in balances {
            if src != dst {
                sim.add_link(*src, *dst).await?;
            }
        }
    }
    Ok(sim)
}
