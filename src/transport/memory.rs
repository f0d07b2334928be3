use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::codec::Message;
use crate::config::PeerConfig;
use crate::transport::{Transport, TransportError};
use crate::NodeId;

/// A message that reached its destination mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub from: NodeId,
    pub to: NodeId,
    pub message: Message,
}

#[derive(Default)]
struct NetworkInner {
    mailboxes: HashMap<NodeId, mpsc::UnboundedSender<Message>>,
    down: HashSet<NodeId>,
    deliveries: Vec<Delivery>,
}

/// In-process network connecting nodes through unbounded mailboxes.
///
/// A node marked down (or never registered) refuses delivery exactly like
/// an unreachable TCP peer. Every successful delivery is logged.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkInner> {
        // A panic while holding the lock leaves plain data behind
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a mailbox for `node_id`, replacing any previous one.
    pub fn register(&self, node_id: NodeId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        inner.mailboxes.insert(node_id, tx);
        inner.down.remove(&node_id);
        rx
    }

    pub fn transport(&self, node_id: NodeId) -> MemoryTransport {
        MemoryTransport {
            node_id,
            network: self.clone(),
        }
    }

    pub fn set_down(&self, node_id: NodeId, down: bool) {
        let mut inner = self.lock();
        if down {
            inner.down.insert(node_id);
        } else {
            inner.down.remove(&node_id);
        }
    }

    pub fn is_down(&self, node_id: NodeId) -> bool {
        self.lock().down.contains(&node_id)
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().deliveries.clone()
    }

    fn deliver(&self, from: NodeId, to: NodeId, message: &Message) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.down.contains(&to) || inner.down.contains(&from) {
            return Err(TransportError::Unreachable {
                node_id: to,
                reason: "node is down".to_string(),
            });
        }

        let mailbox = inner
            .mailboxes
            .get(&to)
            .ok_or_else(|| TransportError::Unreachable {
                node_id: to,
                reason: "no such node".to_string(),
            })?;

        mailbox
            .send(message.clone())
            .map_err(|_| TransportError::Unreachable {
                node_id: to,
                reason: "mailbox closed".to_string(),
            })?;

        inner.deliveries.push(Delivery {
            from,
            to,
            message: message.clone(),
        });
        Ok(())
    }
}

/// One node's handle on a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryTransport {
    node_id: NodeId,
    network: MemoryNetwork,
}

impl Transport for MemoryTransport {
    async fn send(&self, peer: &PeerConfig, message: &Message) -> Result<(), TransportError> {
        self.network.deliver(self.node_id, peer.node_id, message)
    }
}
