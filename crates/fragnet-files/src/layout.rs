//! Fragment addressing.

use crate::FRAGMENT_SIZE;
use std::ops::Range;

/// Maps fragment indices to byte ranges of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentLayout {
    fragment_size: u64,
}

impl FragmentLayout {
    /// Create a layout with the default fragment size
    pub fn new() -> Self {
        Self::with_fragment_size(FRAGMENT_SIZE)
    }

    /// Create a layout with a custom fragment size
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn with_fragment_size(size: u64) -> Self {
        assert!(size > 0, "fragment size must be non-zero");
        Self {
            fragment_size: size,
        }
    }

    /// Get fragment size
    pub fn fragment_size(&self) -> u64 {
        self.fragment_size
    }

    /// Number of fragments needed for a file of `file_size` bytes
    pub fn fragment_count(&self, file_size: u64) -> u64 {
        file_size.div_ceil(self.fragment_size)
    }

    /// Byte offset where fragment `index` starts
    pub fn fragment_offset(&self, index: u32) -> u64 {
        u64::from(index) * self.fragment_size
    }

    /// Byte range of fragment `index`, or `None` when the index is past the
    /// end of a file of `file_size` bytes
    pub fn fragment_range(&self, file_size: u64, index: u32) -> Option<Range<u64>> {
        let start = self.fragment_offset(index);
        if start >= file_size {
            return None;
        }
        let end = start + self.fragment_size.min(file_size - start);
        Some(start..end)
    }

    /// Length of fragment `index`, or `None` when out of range
    pub fn fragment_len(&self, file_size: u64, index: u32) -> Option<u64> {
        self.fragment_range(file_size, index).map(|r| r.end - r.start)
    }
}

impl Default for FragmentLayout {
    fn default() -> Self {
        Self::new()
    }
}
