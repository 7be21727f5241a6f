//! Fragment reassembly.

use crate::FragmentError;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Result of writing an assembly buffer to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    /// Bytes written to the destination
    pub bytes_written: u64,
    /// Indices of slots that were empty and skipped
    pub missing: Vec<u32>,
}

impl AssemblyOutcome {
    /// True when no slot was skipped
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Per-download buffer with one slot per fragment index
///
/// Slots are filled independently in any order and consumed once, in index
/// order, by [`AssemblyBuffer::write_to`]. Empty slots are skipped, so the
/// output is shorter than the source file when a fetch failed.
#[derive(Debug)]
pub struct AssemblyBuffer {
    slots: Vec<Option<Vec<u8>>>,
}

impl AssemblyBuffer {
    /// Allocate `fragment_count` empty slots
    pub fn new(fragment_count: usize) -> Self {
        Self {
            slots: vec![None; fragment_count],
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the buffer has no slots (empty source file)
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of filled slots
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Store fragment `index`
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an index past the last slot and
    /// `AlreadyFilled` if the slot already holds data.
    pub fn insert(&mut self, index: u32, data: Vec<u8>) -> Result<(), FragmentError> {
        let count = self.slots.len();
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(FragmentError::OutOfRange { index, count })?;

        if slot.is_some() {
            return Err(FragmentError::AlreadyFilled(index));
        }
        *slot = Some(data);
        Ok(())
    }

    /// Indices of empty slots in ascending order
    pub fn missing(&self) -> Vec<u32> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Write all filled slots to `path` in index order, consuming the buffer
    ///
    /// The destination is created or truncated. Each empty slot is logged as
    /// a gap and reported in the outcome; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be created or written.
    pub async fn write_to(self, path: impl AsRef<Path>) -> Result<AssemblyOutcome, FragmentError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path).await?);
        let mut bytes_written = 0u64;
        let mut missing = Vec::new();

        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(data) => {
                    writer.write_all(&data).await?;
                    bytes_written += data.len() as u64;
                }
                None => {
                    tracing::warn!(
                        "Missing fragment {} while assembling {}, file will be incomplete",
                        index,
                        path.display()
                    );
                    missing.push(index as u32);
                }
            }
        }

        writer.flush().await?;

        Ok(AssemblyOutcome {
            bytes_written,
            missing,
        })
    }
}
