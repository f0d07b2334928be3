pub mod codec;
pub mod config;
pub mod dashboard;
pub mod detector;
pub mod election;
pub mod error;
pub mod node;
pub mod server;
pub mod shutdown;
pub mod topology;
pub mod transport;

/// Totally ordered process identity, also the election tie-break key.
pub type NodeId = u64;
