use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::NodeConfig;
use crate::election::timer::random_interval;
use crate::election::ElectionNode;
use crate::transport::Transport;
use crate::NodeId;

/// What a detector tick should do given the current leader belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorAction {
    /// This node is the leader
    Idle,
    /// Check that the believed leader still answers
    Probe(NodeId),
    /// No leader known
    Elect,
}

pub fn next_action(self_id: NodeId, leader: Option<NodeId>) -> DetectorAction {
    match leader {
        Some(leader_id) if leader_id == self_id => DetectorAction::Idle,
        Some(leader_id) => DetectorAction::Probe(leader_id),
        None => DetectorAction::Elect,
    }
}

/// Periodic leader liveness check with a jittered interval.
pub struct FailureDetector {
    min_ms: u64,
    max_ms: u64,
}

impl FailureDetector {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.probe_interval_min_ms, config.probe_interval_max_ms)
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run<T: Transport>(&self, node: Arc<ElectionNode<T>>, shutdown: CancellationToken) {
        tracing::debug!(
            node_id = node.id,
            min_ms = self.min_ms,
            max_ms = self.max_ms,
            "Failure detector started"
        );

        loop {
            let delay = random_interval(self.min_ms, self.max_ms);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(node_id = node.id, "Failure detector stopped");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    node.check_leader().await;
                }
            }
        }
    }
}
