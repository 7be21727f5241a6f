//! # FRAGNET Registry
//!
//! Central file registry for the FRAGNET file distribution system.
//!
//! Peers register the files they serve under their fragment-server endpoint;
//! downloaders look a file name up to find every peer currently serving it.
//!
//! This crate provides:
//! - [`Endpoint`], the value-typed address of a fragment server
//! - [`Registry`], the in-memory concurrent catalog
//! - [`RegistryService`], the seam shared by the local catalog and the remote client
//! - A small TCP RPC ([`RegistryServer`], [`RegistryClient`]) for remote access
//!
//! ## Architecture
//!
//! ```text
//!      ┌─────────────┐   register/unregister   ┌──────────────────┐
//!      │    Peer     │ ──────────────────────▶ │  RegistryServer  │
//!      └─────────────┘                          │   (Registry)     │
//!      ┌─────────────┐        lookup            │                  │
//!      │ Downloader  │ ──────────────────────▶ │                  │
//!      └─────────────┘                          └──────────────────┘
//! ```
//!
//! The registry never evicts entries on its own. There is no liveness
//! tracking, so an entry left by a crashed peer stays until it is explicitly
//! unregistered.
//!
//! ## Example
//!
//! ```rust
//! use fragnet_registry::{Endpoint, Registry};
//!
//! let registry = Registry::new();
//! let peer = Endpoint::new("10.0.0.7", 5000);
//!
//! registry.register("movie.mkv", peer.clone());
//! assert_eq!(registry.lookup("movie.mkv"), vec![peer]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod endpoint;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod service;

pub use client::RegistryClient;
pub use endpoint::{Endpoint, EndpointParseError};
pub use protocol::{RegistryError, RegistryErrorCode, RegistryRequest, RegistryResponse};
pub use registry::Registry;
pub use server::{RegistryServer, RegistryServerConfig};
pub use service::RegistryService;

/// Default registry port
pub const DEFAULT_REGISTRY_PORT: u16 = 4000;

/// Maximum registry RPC frame size (16 MiB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Registry connect timeout (10 seconds)
pub const REGISTRY_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
