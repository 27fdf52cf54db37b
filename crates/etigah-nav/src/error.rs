//! Error types for map, routing and session operations.
//!
//! All fallible operations return [`Result<T>`]. Every variant is an expected,
//! recoverable condition; a failed QR decode is not an error at all (see
//! [`crate::qr::Decoded`]).

use thiserror::Error;

/// Result type alias for etigah-nav operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Error type for all map, routing and session operations.
#[derive(Error, Debug)]
pub enum MapError {
    /// Storage backend error (RocksDB, file I/O, etc.)
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Node not found in the map
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// ID of the missing node
        node_id: String,
    },

    /// Edge not found in the map
    #[error("Edge not found: {from} <-> {to}")]
    EdgeNotFound {
        /// One endpoint of the missing edge
        from: String,
        /// Other endpoint of the missing edge
        to: String,
    },

    /// Attempt to connect a node to itself
    #[error("Invalid edge: {node_id} cannot be connected to itself")]
    InvalidEdge {
        /// The node on both ends
        node_id: String,
    },

    /// Node data violates a store invariant (non-finite position, floor 0)
    #[error("Invalid node {node_id}: {message}")]
    InvalidNode {
        /// ID of the offending node, or `<new>` for an unallocated one
        node_id: String,
        /// What is wrong with it
        message: String,
    },

    /// A node with this identity already exists
    #[error("Duplicate node: {node_id}")]
    DuplicateNode {
        /// The colliding identity
        node_id: String,
    },

    /// No path connects the two nodes
    #[error("No path from {start} to {end}")]
    NoPath {
        /// Start node
        start: String,
        /// End node
        end: String,
    },

    /// Session operation not allowed in the current state
    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        /// Requested action
        action: &'static str,
        /// Current session state
        state: &'static str,
    },

    /// A new session needs a destination and none was supplied or configured
    #[error("No destination supplied and no default destination configured")]
    MissingDestination,

    /// Snapshot failed validation and was not applied
    #[error("Invalid snapshot: {message}")]
    InvalidSnapshot {
        /// Validation failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be loaded
    #[error("Config error: {message}")]
    Config {
        /// Error details
        message: String,
    },
}

impl MapError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    pub(crate) fn node_not_found(id: impl std::fmt::Display) -> Self {
        Self::NodeNotFound {
            node_id: id.to_string(),
        }
    }
}
