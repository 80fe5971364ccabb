//! # Stillframe Testkit
//!
//! Testing utilities for Stillframe.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: wired-up coordinators for common topologies
//! - **Generators**: proptest strategies for randomized snapshot scenarios
//! - **Golden scenarios**: fixed runs whose sealed snapshots are pinned by
//!   the FIFO contract alone and checked as JSON vectors
//!
//! ## Fixtures
//!
//! ```rust,no_run
//! use stillframe_testkit::fixtures::ring;
//!
//! async fn example() {
//!     let sim = ring(&[("a", 10), ("b", 0), ("c", 0)], 42).await.unwrap();
//!     assert_eq!(sim.total_tokens(), 10);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use stillframe_testkit::generators::{run_scenario, ScenarioParams};
//!
//! proptest! {
//!     #[test]
//!     fn conservation_holds(params: ScenarioParams) {
//!         // build a runtime, run_scenario(&params), check totals
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fully_connected, line, pair, ring};
pub use generators::{build_scenario, run_scenario, ScenarioParams};
pub use vectors::{all_scenarios, verify_all_scenarios, GoldenScenario};
