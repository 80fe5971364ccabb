//! Transport abstraction for the snapshot protocol.
//!
//! The protocol's correctness is conditioned on the transport contract:
//! each channel delivers messages from exactly one sender to exactly one
//! receiver, in send order (FIFO), with no loss and no duplication,
//! asynchronously with arbitrary finite delay. A transport that reorders a
//! channel voids snapshot consistency: the recording windows in the node
//! state machine assume the marker arrives exactly where the sender put it
//! in the stream. Nodes do not re-check this contract.

use async_trait::async_trait;
use std::fmt;

use stillframe_core::NodeId;

use crate::error::ProtocolError;
use crate::messages::Message;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// A directed link between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId {
    /// Sending node.
    pub src: NodeId,
    /// Receiving node.
    pub dst: NodeId,
}

impl ChannelId {
    /// Create a channel id.
    pub fn new(src: impl Into<NodeId>, dst: impl Into<NodeId>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.src, self.dst)
    }
}

/// Sending half of the transport, held by a node.
///
/// Sends are fire-and-forget: a node never waits for a reply, only for
/// queue admission. Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message on the channel from the local node to `dest`.
    async fn send(&self, dest: &NodeId, message: Message) -> Result<()>;

    /// The local node's identity.
    fn local_node_id(&self) -> NodeId;
}

/// In-memory transport with one FIFO queue per directed link.
///
/// The queue is the channel: bounded tokio mpsc, so per-channel FIFO, no
/// loss, and no duplication hold by construction. The topology owner keeps
/// the receiving ends and decides delivery order across channels.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, RwLock};

    /// Default per-channel queue capacity.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

    /// Receiving end of one directed channel.
    pub struct ChannelReceiver {
        receiver: mpsc::Receiver<Message>,
    }

    impl ChannelReceiver {
        /// Pop the next queued message without waiting.
        ///
        /// Returns None when the queue is currently empty.
        pub fn try_next(&mut self) -> Option<Message> {
            self.receiver.try_recv().ok()
        }

        /// Wait for the next message.
        ///
        /// Returns None if every sending handle was dropped.
        pub async fn next(&mut self) -> Option<Message> {
            self.receiver.recv().await
        }
    }

    /// Shared registry of channel queues for one simulated network.
    pub struct MemoryNetwork {
        capacity: usize,
        senders: RwLock<HashMap<ChannelId, mpsc::Sender<Message>>>,
    }

    impl MemoryNetwork {
        /// Create a network whose channels hold up to `capacity` messages.
        pub fn new(capacity: usize) -> Arc<Self> {
            Arc::new(Self {
                capacity,
                senders: RwLock::new(HashMap::new()),
            })
        }

        /// Open the directed channel `src -> dst`.
        ///
        /// The sending end is registered in the network; the receiving end
        /// is returned to the caller, which owns delivery.
        pub async fn open_channel(
            &self,
            src: &NodeId,
            dst: &NodeId,
        ) -> Result<ChannelReceiver> {
            let id = ChannelId {
                src: src.clone(),
                dst: dst.clone(),
            };
            let mut senders = self.senders.write().await;
            if senders.contains_key(&id) {
                return Err(ProtocolError::Transport(format!(
                    "channel {id} already open"
                )));
            }
            let (tx, rx) = mpsc::channel(self.capacity);
            senders.insert(id, tx);
            Ok(ChannelReceiver { receiver: rx })
        }

        /// Create a node's sending handle into this network.
        pub fn transport(self: &Arc<Self>, node_id: NodeId) -> MemoryTransport {
            MemoryTransport {
                node_id,
                network: Arc::clone(self),
            }
        }
    }

    /// A node's sending handle into a [`MemoryNetwork`].
    pub struct MemoryTransport {
        node_id: NodeId,
        network: Arc<MemoryNetwork>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, dest: &NodeId, message: Message) -> Result<()> {
            let channel = ChannelId {
                src: self.node_id.clone(),
                dst: dest.clone(),
            };
            // Clone the sender out so the registry lock is not held while
            // awaiting queue admission.
            let sender = {
                let senders = self.network.senders.read().await;
                senders.get(&channel).cloned()
            };
            match sender {
                Some(sender) => sender
                    .send(message)
                    .await
                    .map_err(|_| ProtocolError::Transport(format!("channel {channel} closed"))),
                None => Err(ProtocolError::Transport(format!(
                    "channel {channel} not wired"
                ))),
            }
        }

        fn local_node_id(&self) -> NodeId {
            self.node_id.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;
    use stillframe_core::SnapshotId;

    #[tokio::test]
    async fn test_channel_preserves_send_order() {
        let network = MemoryNetwork::new(16);
        let a = NodeId::from("a");
        let b = NodeId::from("b");

        let mut rx = network.open_channel(&a, &b).await.unwrap();
        let transport = network.transport(a.clone());

        transport.send(&b, Message::Transfer { amount: 1 }).await.unwrap();
        transport.send(&b, Message::Transfer { amount: 2 }).await.unwrap();
        transport
            .send(
                &b,
                Message::Marker {
                    snapshot_id: SnapshotId::new(1),
                },
            )
            .await
            .unwrap();

        assert_eq!(rx.try_next(), Some(Message::Transfer { amount: 1 }));
        assert_eq!(rx.try_next(), Some(Message::Transfer { amount: 2 }));
        assert!(rx.try_next().unwrap().is_marker());
        assert_eq!(rx.try_next(), None);
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let network = MemoryNetwork::new(16);
        let a = NodeId::from("a");
        let b = NodeId::from("b");
        let c = NodeId::from("c");

        let mut ab = network.open_channel(&a, &b).await.unwrap();
        let mut cb = network.open_channel(&c, &b).await.unwrap();

        let from_a = network.transport(a.clone());
        let from_c = network.transport(c.clone());

        from_a.send(&b, Message::Transfer { amount: 10 }).await.unwrap();
        from_c.send(&b, Message::Transfer { amount: 20 }).await.unwrap();

        // Each directed link holds only its own sender's traffic.
        assert_eq!(ab.try_next(), Some(Message::Transfer { amount: 10 }));
        assert_eq!(ab.try_next(), None);
        assert_eq!(cb.try_next(), Some(Message::Transfer { amount: 20 }));
        assert_eq!(cb.try_next(), None);
    }

    #[tokio::test]
    async fn test_send_on_unwired_channel_fails() {
        let network = MemoryNetwork::new(16);
        let transport = network.transport(NodeId::from("a"));

        let result = transport
            .send(&NodeId::from("b"), Message::Transfer { amount: 1 })
            .await;
        assert!(matches!(result, Err(ProtocolError::Transport(_))));
    }

    #[tokio::test]
    async fn test_reopening_channel_fails() {
        let network = MemoryNetwork::new(16);
        let a = NodeId::from("a");
        let b = NodeId::from("b");

        network.open_channel(&a, &b).await.unwrap();
        let result = network.open_channel(&a, &b).await;
        assert!(matches!(result, Err(ProtocolError::Transport(_))));
    }
}
