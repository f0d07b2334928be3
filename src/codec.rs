//! Wire format for election traffic.
//!
//! Every connection carries exactly one self-describing JSON record. The
//! `type` tag selects the message kind; ring-only fields are omitted for
//! bully traffic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NodeId;

/// Upper bound on a single encoded message.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Empty message")]
    Empty,

    #[error("Message of {0} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit")]
    TooLarge(usize),

    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Election challenge (bully) or ring traversal token (ring)
    Election {
        sender_id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin_id: Option<NodeId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        ids: Vec<NodeId>,
        #[serde(default)]
        round: u64,
    },
    /// Bully acknowledgement from a higher peer
    Ok {
        sender_id: NodeId,
        #[serde(default)]
        round: u64,
    },
    /// Leader announcement
    Coordinator {
        sender_id: NodeId,
        leader_id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin_id: Option<NodeId>,
        #[serde(default)]
        round: u64,
    },
    /// Liveness probe, no reply expected
    Ping { sender_id: NodeId },
}

impl Message {
    pub fn sender_id(&self) -> NodeId {
        match self {
            Message::Election { sender_id, .. }
            | Message::Ok { sender_id, .. }
            | Message::Coordinator { sender_id, .. }
            | Message::Ping { sender_id } => *sender_id,
        }
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Election { .. } => "ELECTION",
            Message::Ok { .. } => "OK",
            Message::Coordinator { .. } => "COORDINATOR",
            Message::Ping { .. } => "PING",
        }
    }
}

pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(message)?;
    if bytes.len() > MAX_MESSAGE_BYTES {
        return Err(CodecError::TooLarge(bytes.len()));
    }
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::Empty);
    }
    if bytes.len() > MAX_MESSAGE_BYTES {
        return Err(CodecError::TooLarge(bytes.len()));
    }
    Ok(serde_json::from_slice(bytes)?)
}
