//! # Stillframe Core
//!
//! Pure primitives for Stillframe: node and snapshot identifiers, per-node
//! snapshot records, assembled global snapshots, and conservation checks.
//!
//! This crate contains no I/O, no networking, no async. It is pure
//! computation over the data a snapshot run produces.
//!
//! ## Key Types
//!
//! - [`NodeId`] - Stable identifier for a node in the network
//! - [`SnapshotId`] - Identifier shared by all participants of one snapshot run
//! - [`SnapshotRecord`] - One node's captured state plus recorded in-flight messages
//! - [`GlobalSnapshot`] - The assembled consistent cut across all nodes
//!
//! ## Conservation
//!
//! Tokens are a conserved resource. For any sealed [`GlobalSnapshot`], the
//! captured balances plus the recorded in-flight amounts must sum to the
//! total present before the run began. See [`validation`].

pub mod error;
pub mod record;
pub mod snapshot;
pub mod types;
pub mod validation;

pub use error::{SnapshotError, ValidationError};
pub use record::SnapshotRecord;
pub use snapshot::GlobalSnapshot;
pub use types::{NodeId, SnapshotId};
pub use validation::{verify_complete, verify_conservation};
