use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::codec::Message;
use crate::config::{ElectionStrategy, NodeConfig};
use crate::detector::{next_action, DetectorAction};
use crate::election::{protocol_for, ElectionProtocol, Outbound, Phase};
use crate::error::Result;
use crate::topology::Topology;
use crate::transport::Transport;
use crate::NodeId;

/// Point-in-time view of a node's election state.
#[derive(Debug, Clone, Serialize)]
pub struct ElectionSnapshot {
    pub node_id: NodeId,
    pub strategy: String,
    pub phase: String,
    pub leader_id: Option<NodeId>,
    pub is_leader: bool,
    pub round: u64,
    pub epoch: u64,
    pub leader_since: Option<DateTime<Utc>>,
}

/// Per-process election runtime.
///
/// All mutable election state sits behind a single mutex; inbound messages,
/// detector ticks and external triggers interleave only at lock boundaries.
/// The lock is released before any network I/O, and every send is bounded
/// by `send_timeout`.
pub struct ElectionNode<T: Transport> {
    pub id: NodeId,
    topology: Arc<Topology>,
    protocol: Mutex<Box<dyn ElectionProtocol>>,
    transport: T,
    send_timeout: Duration,
}

impl<T: Transport> ElectionNode<T> {
    /// Fails if the configured membership is ill-formed.
    pub fn new(config: &NodeConfig, transport: T) -> Result<Self> {
        let topology = Arc::new(Topology::new(config.node_id, config.members.clone())?);
        let protocol = protocol_for(config, topology.clone());

        Ok(Self {
            id: config.node_id,
            topology,
            protocol: Mutex::new(protocol),
            transport,
            send_timeout: Duration::from_millis(config.connect_timeout_ms),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub async fn strategy(&self) -> ElectionStrategy {
        self.protocol.lock().await.strategy()
    }

    /// Current leader belief, if any.
    pub async fn current_leader(&self) -> Option<NodeId> {
        self.protocol.lock().await.state().leader_id()
    }

    pub async fn is_leader(&self) -> bool {
        self.protocol.lock().await.state().is_leader()
    }

    pub async fn phase(&self) -> Phase {
        self.protocol.lock().await.state().phase()
    }

    pub async fn snapshot(&self) -> ElectionSnapshot {
        let protocol = self.protocol.lock().await;
        let state = protocol.state();
        ElectionSnapshot {
            node_id: self.id,
            strategy: protocol.strategy().to_string(),
            phase: state.phase().to_string(),
            leader_id: state.leader_id(),
            is_leader: state.is_leader(),
            round: state.leader.round,
            epoch: state.epoch,
            leader_since: state.leader.adopted_at,
        }
    }

    /// Start an election now, bypassing rate limits.
    pub async fn trigger_election(&self) {
        let outbound = self
            .protocol
            .lock()
            .await
            .start_election(true, Instant::now());
        self.execute(outbound).await;
    }

    /// Dispatch one inbound message to the state machine.
    pub async fn handle_message(&self, message: Message) {
        let sender = message.sender_id();
        if let Message::Ping { .. } = message {
            // Liveness probes need no state; any sender may probe
            tracing::trace!(node_id = self.id, sender, "Probed");
            return;
        }
        if !self.topology.contains(sender) || sender == self.id {
            tracing::warn!(
                node_id = self.id,
                sender,
                kind = message.kind(),
                "Dropping message from unexpected sender"
            );
            return;
        }

        tracing::trace!(node_id = self.id, sender, kind = message.kind(), "Dispatching message");

        let outbound = self
            .protocol
            .lock()
            .await
            .handle(message, Instant::now());
        self.execute(outbound).await;
    }

    /// One failure detector round: probe the leader, or elect if none.
    pub async fn check_leader(&self) {
        let leader = self.current_leader().await;

        match next_action(self.id, leader) {
            DetectorAction::Idle => {}
            DetectorAction::Probe(leader_id) => {
                let ping = Message::Ping { sender_id: self.id };
                if self.deliver(leader_id, &ping).await {
                    return;
                }

                tracing::warn!(node_id = self.id, leader_id, "Leader not responding");
                let outbound = self
                    .protocol
                    .lock()
                    .await
                    .on_leader_unreachable(leader_id, Instant::now());
                self.execute(outbound).await;
            }
            DetectorAction::Elect => {
                let outbound = self.protocol.lock().await.on_idle_tick(Instant::now());
                self.execute(outbound).await;
            }
        }
    }

    /// Perform state machine effects, feeding challenge results back in.
    async fn execute(&self, outbound: Vec<Outbound>) {
        let mut pending: VecDeque<Outbound> = outbound.into();

        while let Some(next) = pending.pop_front() {
            match next {
                Outbound::Direct { to, message } => {
                    self.deliver(to, &message).await;
                }
                Outbound::Ring { to, message } => {
                    self.deliver_along_ring(to, &message).await;
                }
                Outbound::Challenge {
                    round,
                    targets,
                    message,
                } => {
                    let mut reached = false;
                    for target in targets {
                        if self.deliver(target, &message).await {
                            reached = true;
                        }
                    }

                    let follow_up = self.protocol.lock().await.conclude_challenge(
                        round,
                        reached,
                        Instant::now(),
                    );
                    pending.extend(follow_up);
                }
            }
        }
    }

    /// Single bounded attempt. Returns whether the peer accepted the message.
    async fn deliver(&self, to: NodeId, message: &Message) -> bool {
        let Some(peer) = self.topology.peer(to) else {
            tracing::warn!(node_id = self.id, peer_id = to, "No address for peer");
            return false;
        };

        match timeout(self.send_timeout, self.transport.send(peer, message)).await {
            Ok(Ok(())) => {
                tracing::trace!(node_id = self.id, peer_id = to, kind = message.kind(), "Sent");
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(
                    node_id = self.id,
                    peer_id = to,
                    kind = message.kind(),
                    error = %e,
                    "Send failed"
                );
                false
            }
            Err(_) => {
                tracing::debug!(node_id = self.id, peer_id = to, kind = message.kind(), "Send timed out");
                false
            }
        }
    }

    /// Deliver to `to` or the first live member after it. Bounded by the
    /// membership size; this node is never a candidate.
    async fn deliver_along_ring(&self, to: NodeId, message: &Message) -> bool {
        for peer in self.topology.ring_candidates(to) {
            if self.deliver(peer.node_id, message).await {
                return true;
            }
            tracing::info!(
                node_id = self.id,
                peer_id = peer.node_id,
                "Skipping unreachable ring member"
            );
        }

        tracing::warn!(
            node_id = self.id,
            kind = message.kind(),
            "No live ring member reachable, dropping message"
        );
        false
    }
}
