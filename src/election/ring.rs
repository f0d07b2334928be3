use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::codec::Message;
use crate::config::ElectionStrategy;
use crate::election::state::{Adoption, ElectionState};
use crate::election::{ElectionProtocol, Outbound};
use crate::topology::Topology;
use crate::NodeId;

/// Ring-traversal election.
///
/// ELECTION travels the successor ring collecting the ids of live members.
/// When it returns to its originator the highest collected id is leader and
/// a COORDINATOR makes one more pass so every member adopts it. Delivery
/// skips dead successors (see [`Outbound::Ring`]).
pub struct RingElection {
    topology: Arc<Topology>,
    state: ElectionState,
    min_reelection_interval: Duration,
}

impl RingElection {
    pub fn new(topology: Arc<Topology>, min_reelection_interval: Duration) -> Self {
        let state = ElectionState::new(topology.self_id());
        Self {
            topology,
            state,
            min_reelection_interval,
        }
    }

    fn self_id(&self) -> NodeId {
        self.state.self_id
    }

    fn to_successor(&self, message: Message) -> Outbound {
        Outbound::Ring {
            to: self.topology.successor(self.self_id()),
            message,
        }
    }

    pub fn on_election(
        &mut self,
        origin: NodeId,
        mut ids: Vec<NodeId>,
        round: u64,
    ) -> Vec<Outbound> {
        self.state.observe_round(round);
        let me = self.self_id();

        if origin == me {
            if !ids.contains(&me) {
                ids.push(me);
            }
            if let Some(session) = self.state.session.as_mut() {
                if session.round == round {
                    session.collected.extend(ids.iter().copied());
                }
            }
            self.state.end_session();

            let leader = ids.iter().copied().max().unwrap_or(me);
            tracing::info!(node_id = me, round, ids = ?ids, leader_id = leader, "Election completed the ring");

            return match self.state.adopt(leader, round) {
                Adoption::Adopted => vec![self.to_successor(Message::Coordinator {
                    sender_id: me,
                    leader_id: leader,
                    origin_id: Some(me),
                    round,
                })],
                Adoption::Duplicate | Adoption::Stale => {
                    tracing::debug!(node_id = me, round, "Election superseded by a newer announcement");
                    Vec::new()
                }
            };
        }

        if ids.contains(&me) {
            // Came round again without meeting its originator
            tracing::warn!(node_id = me, origin, round, "Originator unreachable, dropping ELECTION");
            return Vec::new();
        }

        ids.push(me);
        tracing::debug!(node_id = me, origin, round, ids = ?ids, "Forwarding ELECTION");
        vec![self.to_successor(Message::Election {
            sender_id: me,
            origin_id: Some(origin),
            ids,
            round,
        })]
    }

    pub fn on_coordinator(
        &mut self,
        leader: NodeId,
        origin: Option<NodeId>,
        round: u64,
        now: Instant,
    ) -> Vec<Outbound> {
        let me = self.self_id();
        match self.state.adopt(leader, round) {
            Adoption::Adopted => {
                self.state.end_session();
                tracing::info!(node_id = me, leader_id = leader, round, "New coordinator");
                vec![self.to_successor(Message::Coordinator {
                    sender_id: me,
                    leader_id: leader,
                    origin_id: origin,
                    round,
                })]
            }
            // Announcement is back where it started
            Adoption::Duplicate => Vec::new(),
            Adoption::Stale if self.state.leader_id() != Some(leader) => {
                tracing::warn!(
                    node_id = me,
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

    /// Highest configured member with no leader belief announces itself.
    pub fn self_promote(&mut self) -> Vec<Outbound> {
        let me = self.self_id();
        if self.state.leader_id().is_some() || !self.topology.is_highest() {
            return Vec::new();
        }

        let round = self.state.next_round();
        self.state.end_session();
        self.state.adopt(me, round);

        tracing::info!(node_id = me, round, "Highest configured id, declaring self coordinator");

        vec![self.to_successor(Message::Coordinator {
            sender_id: me,
            leader_id: me,
            origin_id: Some(me),
            round,
        })]
    }
}

impl ElectionProtocol for RingElection {
    fn strategy(&self) -> ElectionStrategy {
        ElectionStrategy::Ring
    }

    fn state(&self) -> &ElectionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElectionState {
        &mut self.state
    }

    fn start_election(&mut self, force: bool, now: Instant) -> Vec<Outbound> {
        if !force && self.state.started_within(now, self.min_reelection_interval) {
            tracing::trace!(node_id = self.state.self_id, "Election rate limited");
            return Vec::new();
        }

        let me = self.self_id();
        self.state.clear_leader();
        let round = self.state.begin_session(now);
        if let Some(session) = self.state.session.as_mut() {
            session.collected.insert(me);
        }

        tracing::info!(node_id = me, round, "Starting ring election");

        vec![self.to_successor(Message::Election {
            sender_id: me,
            origin_id: Some(me),
            ids: vec![me],
            round,
        })]
    }

    fn handle(&mut self, message: Message, now: Instant) -> Vec<Outbound> {
        match message {
            Message::Election {
                sender_id,
                origin_id,
                ids,
                round,
            } => self.on_election(origin_id.unwrap_or(sender_id), ids, round),
            Message::Coordinator {
                leader_id,
                origin_id,
                round,
                ..
            } => self.on_coordinator(leader_id, origin_id, round, now),
            Message::Ok { .. } | Message::Ping { .. } => Vec::new(),
        }
    }

    fn on_idle_tick(&mut self, now: Instant) -> Vec<Outbound> {
        if self.topology.is_highest() {
            return self.self_promote();
        }
        self.start_election(false, now)
    }
}
