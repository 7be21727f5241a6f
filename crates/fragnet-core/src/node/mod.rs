//! Node layer
//!
//! The pieces a FRAGNET process runs:
//!
//! - [`FragmentServer`] answers size and fragment queries for shared files
//! - [`Registration`] keeps a server's files listed in the registry
//! - [`DownloadOrchestrator`] fetches a file from every peer that has it
//! - [`PeerClient`] issues single queries against one fragment server
//!
//! # Example
//!
//! ```no_run
//! use fragnet_core::node::{DownloadConfig, DownloadOrchestrator};
//! use fragnet_registry::RegistryClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(RegistryClient::new("127.0.0.1:4000"));
//!     let orchestrator = DownloadOrchestrator::new(registry, DownloadConfig::default())?;
//!
//!     let report = orchestrator.download("movie.mkv", "movie.mkv").await?;
//!     if !report.is_complete() {
//!         eprintln!("missing fragments: {:?}", report.missing);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod peer;
pub mod registration;
pub mod server;

pub use config::{
    DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_CONNECTIONS, DEFAULT_PEER_PORT, DownloadConfig,
    ServerConfig,
};
pub use download::{DownloadOrchestrator, DownloadReport};
pub use error::{NodeError, Result};
pub use peer::PeerClient;
pub use registration::Registration;
pub use server::FragmentServer;
