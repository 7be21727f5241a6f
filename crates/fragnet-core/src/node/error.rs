//! Error types for the node layer
//!
//! A download that misses fragments is not an error; see
//! [`DownloadReport::missing`](super::DownloadReport::missing).

use crate::error::ProtocolError;
use fragnet_registry::{Endpoint, RegistryError};
use std::borrow::Cow;
use thiserror::Error;

/// Errors that can occur in node operations
#[derive(Debug, Error)]
pub enum NodeError {
    // ============ Lookup Errors ============
    /// No peer is registered for the file, or a peer does not share it
    #[error("file not found: {0}")]
    NotFound(String),

    /// Fragment index past the end of the file
    #[error("fragment {index} out of range for {file}")]
    OutOfRange {
        /// File name
        file: String,
        /// Requested index
        index: u32,
    },

    // ============ Peer Errors ============
    /// Connecting to or exchanging with a peer failed
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        /// Peer that failed
        endpoint: Endpoint,
        /// Failure description
        reason: String,
    },

    /// The size query against the first peer failed
    #[error("size query for {file} failed: {reason}")]
    SizeQuery {
        /// File name
        file: String,
        /// Failure description
        reason: String,
    },

    /// Malformed message on the wire
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // ============ Local Errors ============
    /// File I/O error
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry call failed
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),

    /// Invalid state (e.g. a file too large to address)
    #[error("invalid state: {0}")]
    InvalidState(Cow<'static, str>),
}

impl NodeError {
    /// Create an invalid configuration error with static context (zero allocation)
    #[must_use]
    pub const fn invalid_config(context: &'static str) -> Self {
        NodeError::InvalidConfig(Cow::Borrowed(context))
    }

    /// Create an invalid state error with static context (zero allocation)
    #[must_use]
    pub const fn invalid_state(context: &'static str) -> Self {
        NodeError::InvalidState(Cow::Borrowed(context))
    }

    pub(crate) fn connection(endpoint: &Endpoint, reason: impl ToString) -> Self {
        NodeError::Connection {
            endpoint: endpoint.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for node operations
pub type Result<T> = std::result::Result<T, NodeError>;
