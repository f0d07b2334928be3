use std::collections::HashMap;

use crate::config::PeerConfig;
use crate::error::{ElectionError, Result};
use crate::NodeId;

/// Static, validated membership as seen from one node.
///
/// Members keep their configured order; the ring successor of member `i` is
/// member `(i + 1) % n`. Read-only after construction, so it is shared
/// between tasks behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct Topology {
    self_id: NodeId,
    members: Vec<PeerConfig>,
    index: HashMap<NodeId, usize>,
}

impl Topology {
    pub fn new(self_id: NodeId, members: Vec<PeerConfig>) -> Result<Self> {
        if members.is_empty() {
            return Err(ElectionError::EmptyTopology);
        }

        let mut index = HashMap::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            if index.insert(member.node_id, i).is_some() {
                return Err(ElectionError::DuplicateNode(member.node_id));
            }
        }

        if !index.contains_key(&self_id) {
            return Err(ElectionError::UnknownSelf(self_id));
        }

        Ok(Self {
            self_id,
            members,
            index,
        })
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn peer(&self, id: NodeId) -> Option<&PeerConfig> {
        self.index.get(&id).map(|&i| &self.members[i])
    }

    /// Every member except this node.
    pub fn peer_ids(&self) -> Vec<NodeId> {
        self.members
            .iter()
            .map(|m| m.node_id)
            .filter(|&id| id != self.self_id)
            .collect()
    }

    /// Members with strictly higher priority than this node.
    pub fn higher_peer_ids(&self) -> Vec<NodeId> {
        self.members
            .iter()
            .map(|m| m.node_id)
            .filter(|&id| id > self.self_id)
            .collect()
    }

    pub fn max_id(&self) -> NodeId {
        // Construction guarantees at least one member.
        self.members
            .iter()
            .map(|m| m.node_id)
            .max()
            .unwrap_or(self.self_id)
    }

    pub fn is_highest(&self) -> bool {
        self.max_id() == self.self_id
    }

    /// Ring successor of `id`. Unknown ids map to this node's successor.
    pub fn successor(&self, id: NodeId) -> NodeId {
        let i = self
            .index
            .get(&id)
            .or_else(|| self.index.get(&self.self_id))
            .copied()
            .unwrap_or(0);
        self.members[(i + 1) % self.members.len()].node_id
    }

    /// Delivery candidates for a ring message addressed to `target`: the
    /// target first, then its successors in ring order, never this node.
    /// At most `len() - 1` entries.
    pub fn ring_candidates(&self, target: NodeId) -> Vec<&PeerConfig> {
        let n = self.members.len();
        let start = match self.index.get(&target) {
            Some(&i) => i,
            None => return Vec::new(),
        };

        (0..n)
            .map(|step| &self.members[(start + step) % n])
            .filter(|m| m.node_id != self.self_id)
            .collect()
    }
}
