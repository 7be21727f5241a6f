//! # FRAGNET Core
//!
//! Core implementation of the FRAGNET fragmented file distribution system.
//!
//! This crate provides:
//! - The fragment wire protocol (size and fragment queries)
//! - Pluggable payload compression
//! - The fragment server run by every peer
//! - The download orchestrator run by clients
//! - Scoped peer registration with the file registry
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ register  ┌──────────────┐  lookup  ┌──────────────────────┐
//! │ Fragment     │ ────────▶ │   Registry   │ ◀─────── │ DownloadOrchestrator │
//! │ Server (peer)│           └──────────────┘          └──────────┬───────────┘
//! │              │ ◀───── size query (first endpoint) ────────────┤
//! │              │ ◀───── fragment query idx (round-robin) ───────┘
//! └──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod error;
pub mod node;
pub mod protocol;

pub use compression::Compression;
pub use error::ProtocolError;
pub use fragnet_files::FRAGMENT_SIZE;
pub use protocol::{FragmentReply, Opcode, Request, SizeReply};

/// Largest configurable fragment size (16 MiB)
pub const MAX_FRAGMENT_SIZE: u64 = 16 * 1024 * 1024;

/// Largest payload accepted in a fragment reply (32 MiB)
///
/// Leaves room for compression overhead on a maximum-size fragment.
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;
