//! # FRAGNET Files
//!
//! Fragment engine for the FRAGNET file distribution system.
//!
//! This crate provides:
//! - Fragment addressing for a fixed fragment size
//! - Positional (seek + read) fragment reads from shared files
//! - The per-download assembly buffer that reassembles fetched fragments
//!
//! Every peer serving the same file must use the same fragment size. Nothing
//! on the wire carries it, so a mismatch silently corrupts addressing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembly;
pub mod layout;
pub mod reader;

pub use assembly::{AssemblyBuffer, AssemblyOutcome};
pub use layout::FragmentLayout;
pub use reader::{FragmentRead, file_size, read_fragment};

use thiserror::Error;

/// Default fragment size (1 MiB)
pub const FRAGMENT_SIZE: u64 = 1024 * 1024;

/// Fragment engine errors
#[derive(Debug, Error)]
pub enum FragmentError {
    /// Fragment index outside the assembly buffer
    #[error("fragment {index} out of range (fragment count {count})")]
    OutOfRange {
        /// Offending index
        index: u32,
        /// Number of fragments in the buffer
        count: usize,
    },

    /// Slot already holds a fragment
    #[error("fragment {0} already filled")]
    AlreadyFilled(u32),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
