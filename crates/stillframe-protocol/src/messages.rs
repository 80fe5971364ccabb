//! Protocol message types.
//!
//! Exactly two kinds of message travel a channel: application transfers
//! and snapshot markers. The enum is closed and exhaustively matched, so
//! adding a message kind is a compile-checked change.

use serde::{Deserialize, Serialize};

use stillframe_core::SnapshotId;

/// A message in flight on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Application message: move tokens from sender to receiver.
    Transfer {
        /// Amount debited from the sender when it was sent.
        amount: u64,
    },

    /// Control message delimiting the snapshot cut on the channel it
    /// travels. Carries no tokens.
    Marker {
        /// The run this marker belongs to.
        snapshot_id: SnapshotId,
    },
}

impl Message {
    /// Whether this is a marker.
    pub fn is_marker(&self) -> bool {
        matches!(self, Message::Marker { .. })
    }

    /// Whether this is an application transfer.
    pub fn is_transfer(&self) -> bool {
        matches!(self, Message::Transfer { .. })
    }
}
