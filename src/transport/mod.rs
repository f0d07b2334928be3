//! Outbound delivery of election messages.
//!
//! A [`Transport`] makes one bounded attempt to hand a message to a peer.
//! Failures are reported as [`TransportError`] and folded into election
//! logic by the runtime; they never propagate further.
//!
//! - [`TcpTransport`]: one TCP connection per message
//! - [`MemoryNetwork`]: in-process network with switchable liveness and a
//!   delivery log, used by tests and simulations

pub mod memory;
pub mod tcp;

use std::future::Future;

use thiserror::Error;

use crate::codec::{CodecError, Message};
use crate::config::PeerConfig;
use crate::NodeId;

pub use memory::{Delivery, MemoryNetwork, MemoryTransport};
pub use tcp::TcpTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Peer {node_id} unreachable: {reason}")]
    Unreachable { node_id: NodeId, reason: String },

    #[error("Timed out sending to peer {0}")]
    Timeout(NodeId),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

pub trait Transport: Send + Sync + 'static {
    /// Deliver `message` to `peer`. Must not block longer than the
    /// transport's configured timeout.
    fn send(
        &self,
        peer: &PeerConfig,
        message: &Message,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
