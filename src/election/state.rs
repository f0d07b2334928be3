use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::NodeId;

/// Observable phase of a node's election state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ElectionInProgress,
    LeaderKnown(NodeId),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::ElectionInProgress => write!(f, "election_in_progress"),
            Phase::LeaderKnown(_) => write!(f, "leader_known"),
        }
    }
}

/// A node's local belief about the current leader.
#[derive(Debug, Clone, Default)]
pub struct LeadershipFact {
    pub leader_id: Option<NodeId>,
    /// Round token of the last adopted announcement. Survives `clear`.
    pub round: u64,
    pub adopted_at: Option<DateTime<Utc>>,
}

/// Ephemeral record of the election this node is currently running.
#[derive(Debug, Clone)]
pub struct ElectionSession {
    pub originator_id: NodeId,
    pub round: u64,
    /// OK senders (bully) or collected ring ids (ring)
    pub collected: BTreeSet<NodeId>,
    pub started_at: Instant,
}

impl ElectionSession {
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.started_at) >= timeout
    }
}

/// Outcome of offering a COORDINATOR announcement to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    /// New belief taken
    Adopted,
    /// Same leader and round already adopted
    Duplicate,
    /// Round older than the adopted one, or the same round naming a
    /// lower leader
    Stale,
}

/// Election state shared by both strategies.
///
/// # Invariants
///
/// - `epoch` never decreases and is at least `leader.round`; new rounds are
///   always `epoch + 1`, so every round this node issues is fresher than any
///   it has seen.
/// - A COORDINATOR is adopted only if `(round, leader_id)` is not below
///   the adopted `(leader.round, leader.leader_id)`.
/// - While a session is open the leader belief is either `None` or the
///   leader believed before the session started.
#[derive(Debug)]
pub struct ElectionState {
    pub self_id: NodeId,
    pub epoch: u64,
    pub leader: LeadershipFact,
    pub session: Option<ElectionSession>,
    pub last_election_started: Option<Instant>,
}

impl ElectionState {
    pub fn new(self_id: NodeId) -> Self {
        Self {
            self_id,
            epoch: 0,
            leader: LeadershipFact::default(),
            session: None,
            last_election_started: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.session.is_some() {
            Phase::ElectionInProgress
        } else if let Some(leader) = self.leader.leader_id {
            Phase::LeaderKnown(leader)
        } else {
            Phase::Idle
        }
    }

    pub fn leader_id(&self) -> Option<NodeId> {
        self.leader.leader_id
    }

    pub fn is_leader(&self) -> bool {
        self.leader.leader_id == Some(self.self_id)
    }

    pub fn in_progress(&self) -> bool {
        self.session.is_some()
    }

    /// Record a round token seen on the wire.
    pub fn observe_round(&mut self, round: u64) {
        self.epoch = self.epoch.max(round);
    }

    /// Allocate a fresh round token for a new election.
    pub fn next_round(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Open a session, replacing any previous one.
    pub fn begin_session(&mut self, now: Instant) -> u64 {
        let round = self.next_round();
        self.session = Some(ElectionSession {
            originator_id: self.self_id,
            round,
            collected: BTreeSet::new(),
            started_at: now,
        });
        self.last_election_started = Some(now);
        round
    }

    pub fn end_session(&mut self) {
        self.session = None;
    }

    pub fn session_round(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.round)
    }

    pub fn adopt(&mut self, leader_id: NodeId, round: u64) -> Adoption {
        self.observe_round(round);

        if round < self.leader.round {
            return Adoption::Stale;
        }
        if round == self.leader.round {
            // Announcements order by (round, leader id)
            match self.leader.leader_id {
                Some(current) if current == leader_id => return Adoption::Duplicate,
                Some(current) if leader_id < current => return Adoption::Stale,
                _ => {}
            }
        }

        self.leader = LeadershipFact {
            leader_id: Some(leader_id),
            round,
            adopted_at: Some(Utc::now()),
        };
        Adoption::Adopted
    }

    pub fn clear_leader(&mut self) {
        self.leader.leader_id = None;
        self.leader.adopted_at = None;
    }

    /// Whether a new election started now would be within `interval` of the
    /// previous one.
    pub fn started_within(&self, now: Instant, interval: Duration) -> bool {
        self.last_election_started
            .map(|t| now.saturating_duration_since(t) < interval)
            .unwrap_or(false)
    }
}
