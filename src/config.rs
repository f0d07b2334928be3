use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ElectionError, Result};
use crate::NodeId;

/// Which election algorithm a node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ElectionStrategy {
    /// Priority broadcast: challenge every higher peer directly
    #[default]
    Bully,
    /// Ring traversal: collect live ids around the successor ring
    Ring,
}

impl fmt::Display for ElectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionStrategy::Bully => write!(f, "bully"),
            ElectionStrategy::Ring => write!(f, "ring"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub node_id: NodeId,
    pub addr: String, // host:port format, supports both IP and hostnames
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: NodeId,
    pub listen_addr: SocketAddr,
    /// Full membership including this node. Order defines the ring.
    pub members: Vec<PeerConfig>,
    pub strategy: ElectionStrategy,
    pub probe_interval_min_ms: u64,
    pub probe_interval_max_ms: u64,
    pub connect_timeout_ms: u64,
    pub min_reelection_interval_ms: u64,
    pub election_timeout_ms: u64,
    pub max_inbound_connections: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 1,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 5001)),
            members: Vec::new(),
            strategy: ElectionStrategy::Bully,
            probe_interval_min_ms: 3000,
            probe_interval_max_ms: 5000,
            connect_timeout_ms: 2000,
            min_reelection_interval_ms: 10_000,
            election_timeout_ms: 10_000,
            max_inbound_connections: 64,
        }
    }
}

impl NodeConfig {
    pub fn new(node_id: NodeId, listen_addr: SocketAddr) -> Self {
        Self {
            node_id,
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_member(mut self, node_id: NodeId, addr: String) -> Self {
        self.members.push(PeerConfig { node_id, addr });
        self
    }

    pub fn with_strategy(mut self, strategy: ElectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// One entry of a topology file. Accepts the `pid` spelling used by older
/// node lists.
#[derive(Debug, Deserialize)]
struct MemberEntry {
    #[serde(alias = "pid")]
    id: NodeId,
    host: String,
    port: u16,
}

/// Load an ordered membership list from a JSON file of
/// `[{"id": 1, "host": "127.0.0.1", "port": 5001}, ...]`.
pub fn load_members(path: &Path) -> Result<Vec<PeerConfig>> {
    let contents = std::fs::read_to_string(path)?;
    parse_members_json(&contents)
}

pub fn parse_members_json(contents: &str) -> Result<Vec<PeerConfig>> {
    let entries: Vec<MemberEntry> = serde_json::from_str(contents)?;
    Ok(entries
        .into_iter()
        .map(|e| PeerConfig {
            node_id: e.id,
            addr: format!("{}:{}", e.host, e.port),
        })
        .collect())
}

/// Parse a comma-separated `id:host:port` list. Any malformed entry is an
/// error: a node must never start with a partial membership.
pub fn parse_members(members: &str) -> Result<Vec<PeerConfig>> {
    if members.trim().is_empty() {
        return Ok(Vec::new());
    }

    members
        .split(',')
        .map(|member| {
            let parts: Vec<&str> = member.trim().split(':').collect();
            if parts.len() != 3 {
                return Err(ElectionError::InvalidMember(format!(
                    "'{}', expected id:host:port",
                    member.trim()
                )));
            }
            let node_id: NodeId = parts[0]
                .parse()
                .map_err(|_| ElectionError::InvalidMember(format!("bad id in '{}'", member)))?;
            let port: u16 = parts[2]
                .parse()
                .map_err(|_| ElectionError::InvalidMember(format!("bad port in '{}'", member)))?;
            Ok(PeerConfig {
                node_id,
                addr: format!("{}:{}", parts[1], port),
            })
        })
        .collect()
}
