//! CgnsError: Unified error type for cgns-sieve public APIs
//!
//! This error type is used throughout the crate to provide non-panicking
//! error handling for node access, metadata parsing, zone reads and the
//! cross-rank collectives.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for CGNS node-tree, mesh and collective operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CgnsError {
    /// File could not be opened, read or written.
    #[error("I/O error: {0}")]
    Io(String),
    /// The node tree is malformed or does not look like a CGNS file.
    #[error("CGNS parse error: {0}")]
    Parse(String),
    /// A node's declared element type differs from the requested one.
    #[error("node `{node}` stores {declared} data, but {requested} was requested")]
    DataTypeMismatch {
        node: String,
        declared: &'static str,
        requested: &'static str,
    },
    /// No child with the requested label (and name) exists.
    #[error("no child node with label `{label}`{}", .name.as_ref().map(|n| format!(" named `{n}`")).unwrap_or_default())]
    NotFound { label: String, name: Option<String> },
    /// Every slot of the node handle table is in use.
    #[error("node handle table exhausted ({capacity} handles open)")]
    HandleTableExhausted { capacity: usize },
    /// Ranks disagree on the shape of a composite tree.
    #[error("cross-rank reconciliation failed: {0}")]
    Reconciliation(String),
    /// Point-to-point or collective communication with a peer failed.
    #[error("communication with rank {neighbor} failed: {reason}")]
    CommError { neighbor: usize, reason: String },
    /// Encoding or decoding a metadata or mesh payload failed.
    #[error("payload serialization failed: {0}")]
    Serialization(String),
    /// A mesh object violates one of its structural invariants.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}

impl From<std::io::Error> for CgnsError {
    fn from(err: std::io::Error) -> Self {
        CgnsError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CgnsError {
    fn from(err: serde_json::Error) -> Self {
        CgnsError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for CgnsError {
    fn from(err: bincode::Error) -> Self {
        CgnsError::Serialization(err.to_string())
    }
}
