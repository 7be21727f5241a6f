//! Node configuration

use crate::MAX_FRAGMENT_SIZE;
use crate::compression::Compression;
use crate::node::error::{NodeError, Result};
use fragnet_files::FRAGMENT_SIZE;
use std::borrow::Cow;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default fragment server port
pub const DEFAULT_PEER_PORT: u16 = 5000;

/// Default number of fragments fetched concurrently by one download
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 32;

/// Default number of connections a fragment server handles at once
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Fragment server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address for incoming fragment queries
    pub listen_addr: SocketAddr,

    /// Directory that shared file names resolve against
    pub share_root: PathBuf,

    /// Names this server answers for
    pub shared_files: HashSet<String>,

    /// Fragment size (must match every other peer serving the same file)
    pub fragment_size: u64,

    /// Payload codec (must match the downloaders)
    pub compression: Compression,

    /// Maximum concurrently handled connections (0 = unbounded)
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PEER_PORT)),
            share_root: PathBuf::from("."),
            shared_files: HashSet::new(),
            fragment_size: FRAGMENT_SIZE,
            compression: Compression::None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    /// Share `files` from `share_root`, listening on `listen_addr`
    pub fn new<I, S>(listen_addr: SocketAddr, share_root: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            listen_addr,
            share_root: share_root.into(),
            shared_files: files.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the fragment size is out of bounds or a
    /// shared name could escape the share root.
    pub fn validate(&self) -> Result<()> {
        validate_fragment_size(self.fragment_size)?;

        for name in &self.shared_files {
            if name.is_empty() {
                return Err(NodeError::invalid_config("shared file name is empty"));
            }
            if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
                return Err(NodeError::InvalidConfig(Cow::Owned(format!(
                    "shared file name must be a plain file name: {name}"
                ))));
            }
        }

        Ok(())
    }
}

/// Download orchestrator configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Fragment size (must match the serving peers)
    pub fragment_size: u64,

    /// Payload codec (must match the serving peers)
    pub compression: Compression,

    /// Maximum fragments in flight at once (0 = one task per fragment, unbounded)
    pub max_concurrent_fetches: usize,

    /// Per-connection connect timeout (`None` = wait on the OS)
    pub connect_timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            fragment_size: FRAGMENT_SIZE,
            compression: Compression::None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            connect_timeout: None,
        }
    }
}

impl DownloadConfig {
    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the fragment size is out of bounds or the
    /// connect timeout is zero.
    pub fn validate(&self) -> Result<()> {
        validate_fragment_size(self.fragment_size)?;

        if self.connect_timeout == Some(Duration::ZERO) {
            return Err(NodeError::invalid_config("connect timeout must be non-zero"));
        }

        Ok(())
    }
}

fn validate_fragment_size(fragment_size: u64) -> Result<()> {
    if fragment_size == 0 {
        return Err(NodeError::invalid_config("fragment size must be non-zero"));
    }
    if fragment_size > MAX_FRAGMENT_SIZE {
        return Err(NodeError::InvalidConfig(Cow::Owned(format!(
            "fragment size {fragment_size} exceeds maximum {MAX_FRAGMENT_SIZE}"
        ))));
    }
    Ok(())
}
