//! Golden scenarios with hand-derived expected snapshots.
//!
//! Each scenario's outcome is pinned by the FIFO channel contract alone,
//! not by a particular scheduler seed, so the expected snapshot can be
//! stated up front and checked under any seed. Any drift in the state
//! machine shows up as a vector mismatch.

use stillframe::{Coordinator, CoordinatorConfig, Result};
use stillframe_core::{GlobalSnapshot, SnapshotId};

/// A golden scenario over the three-node ring `a -> b -> c -> a`.
#[derive(Debug, Clone)]
pub struct GoldenScenario {
    /// Human-readable name for the scenario.
    pub name: &'static str,
    /// What the scenario exercises.
    pub description: &'static str,
    /// Initial balances for a, b, c.
    pub balances: [u64; 3],
    /// The sealed global snapshot, as JSON.
    pub expected_json: &'static str,
}

/// Get all golden scenarios.
pub fn all_scenarios() -> Vec<GoldenScenario> {
    vec![
        GoldenScenario {
            name: "quiescent_cut",
            description: "Traffic fully drained before the snapshot: the cut \
                          is exactly the balances, nothing in flight.",
            balances: [10, 0, 0],
            expected_json: r#"{
                "snapshot_id": 1,
                "records": {
                    "a": { "snapshot_id": 1, "captured_tokens": 5, "recorded": {} },
                    "b": { "snapshot_id": 1, "captured_tokens": 5, "recorded": {} },
                    "c": { "snapshot_id": 1, "captured_tokens": 0, "recorded": {} }
                }
            }"#,
        },
        GoldenScenario {
            name: "transfer_ahead_of_marker",
            description: "Send then start: the transfer is queued ahead of \
                          the initiator's marker on the same channel, so the \
                          receiver applies it pre-cut in every interleaving.",
            balances: [10, 0, 0],
            expected_json: r#"{
                "snapshot_id": 1,
                "records": {
                    "a": { "snapshot_id": 1, "captured_tokens": 5, "recorded": {} },
                    "b": { "snapshot_id": 1, "captured_tokens": 5, "recorded": {} },
                    "c": { "snapshot_id": 1, "captured_tokens": 0, "recorded": {} }
                }
            }"#,
        },
        GoldenScenario {
            name: "recorded_in_flight",
            description: "A transfer sent toward the initiator after it \
                          entered recording lands in its channel record, not \
                          its captured balance.",
            balances: [10, 0, 7],
            expected_json: r#"{
                "snapshot_id": 1,
                "records": {
                    "a": { "snapshot_id": 1, "captured_tokens": 5, "recorded": { "c": [3] } },
                    "b": { "snapshot_id": 1, "captured_tokens": 5, "recorded": {} },
                    "c": { "snapshot_id": 1, "captured_tokens": 4, "recorded": {} }
                }
            }"#,
        },
    ]
}

/// Run a golden scenario under the given scheduler seed.
pub async fn run_scenario(scenario: &GoldenScenario, seed: u64) -> Result<GlobalSnapshot> {
    let [a, b, c] = scenario.balances;
    let mut sim = Coordinator::with_seed(CoordinatorConfig::default(), seed);
    sim.add_node("a", a)?;
    sim.add_node("b", b)?;
    sim.add_node("c", c)?;
    sim.add_link("a", "b").await?;
    sim.add_link("b", "c").await?;
    sim.add_link("c", "a").await?;

    match scenario.name {
        "quiescent_cut" => {
            sim.transfer("a", "b", 5).await?;
            sim.run_until_quiescent().await;
            sim.start_snapshot("a", SnapshotId::new(1)).await?;
        }
        "transfer_ahead_of_marker" => {
            sim.transfer("a", "b", 5).await?;
            sim.start_snapshot("a", SnapshotId::new(1)).await?;
        }
        "recorded_in_flight" => {
            sim.transfer("a", "b", 5).await?;
            sim.start_snapshot("a", SnapshotId::new(1)).await?;
            sim.transfer("c", "a", 3).await?;
        }
        other => unreachable!("unknown golden scenario: {other}"),
    }
    sim.run_until_quiescent().await;

    Ok(sim
        .snapshot(SnapshotId::new(1))
        .expect("golden scenarios always seal")
        .clone())
}

/// Verify every golden scenario under `seed`.
///
/// Returns `(name, matched)` per scenario; comparison is structural over
/// the JSON values.
pub async fn verify_all_scenarios(seed: u64) -> Result<Vec<(String, bool)>> {
    let mut results = Vec::new();
    for scenario in all_scenarios() {
        let snapshot = run_scenario(&scenario, seed).await?;
        let actual = serde_json::to_value(&snapshot).expect("snapshot serializes");
        let expected: serde_json::Value =
            serde_json::from_str(scenario.expected_json).expect("vector JSON parses");
        results.push((scenario.name.to_string(), actual == expected));
    }
    Ok(results)
}
