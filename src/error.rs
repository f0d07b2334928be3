use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElectionError {
    #[error("Topology is empty")]
    EmptyTopology,

    #[error("Duplicate node id {0} in topology")]
    DuplicateNode(u64),

    #[error("Node {0} is not a member of the configured topology")]
    UnknownSelf(u64),

    #[error("Invalid member specification: {0}")]
    InvalidMember(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed topology file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ElectionError>;
