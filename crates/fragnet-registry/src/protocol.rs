//! Registry RPC message definitions and framing.
//!
//! Each connection carries exactly one request and one response. A message is
//! framed as a 4-byte big-endian body length followed by a `bincode` body.

use crate::MAX_FRAME_SIZE;
use crate::endpoint::Endpoint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Requests accepted by the registry server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistryRequest {
    /// Add an endpoint to a file's servers
    Register {
        /// File name
        file: String,
        /// Serving endpoint
        endpoint: Endpoint,
    },

    /// Remove an endpoint from a file's servers
    Unregister {
        /// File name
        file: String,
        /// Serving endpoint
        endpoint: Endpoint,
    },

    /// List the endpoints serving a file
    Lookup {
        /// File name
        file: String,
    },

    /// List every registered file name
    ListFiles,
}

/// Registry server responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistryResponse {
    /// Mutation applied
    Ack,

    /// Endpoints for a looked-up file, in registration order
    Endpoints(Vec<Endpoint>),

    /// Registered file names
    Files(Vec<String>),

    /// Request failed
    Error {
        /// Error code
        code: RegistryErrorCode,
        /// Human-readable error message
        message: String,
    },
}

/// Registry error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistryErrorCode {
    /// Request could not be decoded
    InvalidMessage = 1,
    /// Internal server error
    InternalError = 2,
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Network I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Frame length above [`MAX_FRAME_SIZE`]
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Connection timeout
    #[error("connection timeout")]
    Timeout,

    /// Server answered with a response that does not match the request
    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),

    /// Server reported an error
    #[error("registry error ({code:?}): {message}")]
    Remote {
        /// Error code
        code: RegistryErrorCode,
        /// Server message
        message: String,
    },
}

impl RegistryRequest {
    /// Get the request type name
    pub fn request_type(&self) -> &'static str {
        match self {
            RegistryRequest::Register { .. } => "Register",
            RegistryRequest::Unregister { .. } => "Unregister",
            RegistryRequest::Lookup { .. } => "Lookup",
            RegistryRequest::ListFiles => "ListFiles",
        }
    }
}

/// Serialize a message body
pub fn to_bytes<T: Serialize>(msg: &T) -> Result<Vec<u8>, RegistryError> {
    bincode::serialize(msg).map_err(|e| RegistryError::Serialization(e.to_string()))
}

/// Deserialize a message body
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RegistryError> {
    bincode::deserialize(bytes).map_err(|e| RegistryError::Deserialization(e.to_string()))
}

/// Write one length-prefixed message
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), RegistryError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = to_bytes(msg)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(RegistryError::FrameTooLarge(body.len()));
    }

    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, RegistryError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(RegistryError::FrameTooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    from_bytes(&body)
}
