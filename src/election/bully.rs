use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::codec::Message;
use crate::config::ElectionStrategy;
use crate::election::state::{Adoption, ElectionState};
use crate::election::{ElectionProtocol, Outbound};
use crate::topology::Topology;
use crate::NodeId;

/// Priority-broadcast ("bully") election.
///
/// A node challenges every higher-priority peer. Any higher peer that
/// accepts the challenge takes over; a node whose higher peers are all
/// unreachable (or absent) declares itself coordinator.
pub struct BullyElection {
    topology: Arc<Topology>,
    state: ElectionState,
    election_timeout: Duration,
}

impl BullyElection {
    pub fn new(topology: Arc<Topology>, election_timeout: Duration) -> Self {
        let state = ElectionState::new(topology.self_id());
        Self {
            topology,
            state,
            election_timeout,
        }
    }

    fn self_id(&self) -> NodeId {
        self.state.self_id
    }

    /// Become leader and announce it directly to every peer.
    fn promote_self(&mut self, round: u64) -> Vec<Outbound> {
        let me = self.self_id();
        self.state.end_session();
        self.state.adopt(me, round);

        tracing::info!(node_id = me, round, "No higher peer answered, became coordinator");

        let announcement = Message::Coordinator {
            sender_id: me,
            leader_id: me,
            origin_id: None,
            round,
        };
        self.topology
            .peer_ids()
            .into_iter()
            .map(|to| Outbound::Direct {
                to,
                message: announcement.clone(),
            })
            .collect()
    }

    /// Handle ELECTION from a lower peer: always acknowledge, and run our own
    /// election unless one is already in progress.
    pub fn on_election(&mut self, from: NodeId, round: u64, now: Instant) -> Vec<Outbound> {
        self.state.observe_round(round);

        tracing::debug!(node_id = self.self_id(), from, round, "Received ELECTION");

        let mut outbound = vec![Outbound::Direct {
            to: from,
            message: Message::Ok {
                sender_id: self.self_id(),
                round,
            },
        }];

        if !self.state.in_progress() {
            outbound.extend(self.start_election(false, now));
        }
        outbound
    }

    /// A higher peer is alive; keep waiting for its COORDINATOR.
    pub fn on_ok(&mut self, from: NodeId, round: u64) {
        self.state.observe_round(round);
        if let Some(session) = self.state.session.as_mut() {
            session.collected.insert(from);
            tracing::debug!(
                node_id = self.state.self_id,
                from,
                round,
                "Received OK, waiting for COORDINATOR"
            );
        }
    }

    pub fn on_coordinator(&mut self, leader: NodeId, round: u64, now: Instant) -> Vec<Outbound> {
        match self.state.adopt(leader, round) {
            Adoption::Adopted => {
                self.state.end_session();
                tracing::info!(node_id = self.self_id(), leader_id = leader, round, "New coordinator");
                Vec::new()
            }
            Adoption::Duplicate => {
                self.state.end_session();
                Vec::new()
            }
            Adoption::Stale if self.state.leader_id() != Some(leader) => {
                // Announcer missed a newer round; re-elect so it hears one
                tracing::warn!(
                    node_id = self.self_id(),
                    leader_id = leader,
                    round,
                    adopted_round = self.state.leader.round,
                    "Stale COORDINATOR for a different leader, re-electing"
                );
                self.start_election(true, now)
            }
            Adoption::Stale => Vec::new(),
        }
    }
}

impl ElectionProtocol for BullyElection {
    fn strategy(&self) -> ElectionStrategy {
        ElectionStrategy::Bully
    }

    fn state(&self) -> &ElectionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElectionState {
        &mut self.state
    }

    fn start_election(&mut self, force: bool, now: Instant) -> Vec<Outbound> {
        if let Some(session) = &self.state.session {
            if !force && !session.is_expired(now, self.election_timeout) {
                tracing::trace!(node_id = self.state.self_id, "Election already in progress");
                return Vec::new();
            }
        }

        let round = self.state.begin_session(now);
        let targets = self.topology.higher_peer_ids();
        if targets.is_empty() {
            return self.promote_self(round);
        }

        tracing::info!(node_id = self.self_id(), round, higher = ?targets, "Starting election");

        vec![Outbound::Challenge {
            round,
            targets,
            message: Message::Election {
                sender_id: self.self_id(),
                origin_id: None,
                ids: Vec::new(),
                round,
            },
        }]
    }

    fn handle(&mut self, message: Message, now: Instant) -> Vec<Outbound> {
        match message {
            Message::Election {
                sender_id, round, ..
            } => self.on_election(sender_id, round, now),
            Message::Ok { sender_id, round } => {
                self.on_ok(sender_id, round);
                Vec::new()
            }
            Message::Coordinator {
                leader_id, round, ..
            } => self.on_coordinator(leader_id, round, now),
            Message::Ping { .. } => Vec::new(),
        }
    }

    fn conclude_challenge(&mut self, round: u64, reached: bool, _now: Instant) -> Vec<Outbound> {
        let Some(session) = &self.state.session else {
            return Vec::new();
        };
        if session.round != round {
            return Vec::new();
        }

        if reached || !session.collected.is_empty() {
            tracing::debug!(node_id = self.state.self_id, round, "Higher peer alive, awaiting COORDINATOR");
            return Vec::new();
        }
        self.promote_self(round)
    }

    fn on_idle_tick(&mut self, now: Instant) -> Vec<Outbound> {
        self.start_election(false, now)
    }
}
