//! Fragment server endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Address of a reachable fragment server
///
/// Two endpoints are equal only when host and port match exactly; no DNS
/// normalization is applied, so `localhost:5000` and `127.0.0.1:5000` are
/// distinct registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

/// Endpoint parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    /// No `:port` suffix
    #[error("endpoint '{0}' missing port (expected host:port)")]
    MissingPort(String),

    /// Port is not a number in 1..=65535
    #[error("endpoint '{0}' has invalid port")]
    InvalidPort(String),

    /// Host part is empty
    #[error("endpoint '{0}' has empty host")]
    EmptyHost(String),
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(s.to_string()))?;

        let port: u16 = port
            .parse()
            .map_err(|_| EndpointParseError::InvalidPort(s.to_string()))?;
        if port == 0 {
            return Err(EndpointParseError::InvalidPort(s.to_string()));
        }

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost(s.to_string()));
        }

        Ok(Self::new(host, port))
    }
}
