//! Leader election state machines and the per-node runtime that drives them.
//!
//! Both strategies are pure and synchronous: every operation mutates the
//! node's [`ElectionState`] and returns the [`Outbound`] effects the runtime
//! must perform. The runtime ([`node::ElectionNode`]) owns the only lock
//! around the protocol and never holds it across network I/O.
//!
//! # Components
//!
//! - [`bully::BullyElection`]: priority-broadcast election
//! - [`ring::RingElection`]: ring-traversal election
//! - [`state`]: leadership fact, session and round bookkeeping
//! - [`timer`]: jittered intervals for the failure detector

pub mod bully;
pub mod node;
pub mod ring;
pub mod state;
pub mod timer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::codec::Message;
use crate::config::{ElectionStrategy, NodeConfig};
use crate::topology::Topology;
use crate::NodeId;

pub use bully::BullyElection;
pub use node::ElectionNode;
pub use ring::RingElection;
pub use state::{Adoption, ElectionState, Phase};

/// Network effect requested by a state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Single delivery attempt to one peer
    Direct { to: NodeId, message: Message },
    /// Deliver to `to`, or to the first live member after it in ring order
    Ring { to: NodeId, message: Message },
    /// Deliver to every target, then report reachability through
    /// [`ElectionProtocol::conclude_challenge`]
    Challenge {
        round: u64,
        targets: Vec<NodeId>,
        message: Message,
    },
}

/// Common surface of the election strategies.
pub trait ElectionProtocol: Send {
    fn strategy(&self) -> ElectionStrategy;

    fn state(&self) -> &ElectionState;

    fn state_mut(&mut self) -> &mut ElectionState;

    /// Begin an election. `force` bypasses rate limiting and restarts any
    /// session already in progress.
    fn start_election(&mut self, force: bool, now: Instant) -> Vec<Outbound>;

    /// Apply one inbound message.
    fn handle(&mut self, message: Message, now: Instant) -> Vec<Outbound>;

    /// Result of an [`Outbound::Challenge`]: `reached` is true if any target
    /// accepted the message.
    fn conclude_challenge(&mut self, _round: u64, _reached: bool, _now: Instant) -> Vec<Outbound> {
        Vec::new()
    }

    /// Failure detector could not reach `leader`.
    fn on_leader_unreachable(&mut self, leader: NodeId, now: Instant) -> Vec<Outbound> {
        if self.state().leader_id() != Some(leader) {
            // Belief already moved on while the probe was in flight
            return Vec::new();
        }
        self.state_mut().clear_leader();
        self.start_election(true, now)
    }

    /// Failure detector tick with no known leader.
    fn on_idle_tick(&mut self, now: Instant) -> Vec<Outbound>;
}

/// Build the state machine selected by `config.strategy`.
pub fn protocol_for(config: &NodeConfig, topology: Arc<Topology>) -> Box<dyn ElectionProtocol> {
    match config.strategy {
        ElectionStrategy::Bully => Box::new(BullyElection::new(
            topology,
            Duration::from_millis(config.election_timeout_ms),
        )),
        ElectionStrategy::Ring => Box::new(RingElection::new(
            topology,
            Duration::from_millis(config.min_reelection_interval_ms),
        )),
    }
}
