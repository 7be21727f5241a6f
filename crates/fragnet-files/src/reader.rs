//! Positional fragment reads.
//!
//! Every read opens the file, seeks to the fragment offset and reads exactly
//! the fragment length. Nothing is cached and no handle outlives a request, so
//! repeated reads of an unmodified file return identical bytes.

use crate::layout::FragmentLayout;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Outcome of a fragment read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentRead {
    /// Fragment bytes
    Data(Vec<u8>),
    /// Index is past the end of the file as it currently exists
    OutOfRange,
}

/// Current size of a regular file, or `None` if it does not exist or is not
/// a regular file
///
/// # Errors
///
/// Returns an error for I/O failures other than the file being absent.
pub async fn file_size(path: impl AsRef<Path>) -> io::Result<Option<u64>> {
    match tokio::fs::metadata(path.as_ref()).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read fragment `index` of the file at `path`
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read. A file that shrinks
/// between the size check and the read surfaces as `UnexpectedEof`.
pub async fn read_fragment(
    path: impl AsRef<Path>,
    layout: &FragmentLayout,
    index: u32,
) -> io::Result<FragmentRead> {
    let mut file = File::open(path.as_ref()).await?;
    let size = file.metadata().await?.len();

    let Some(range) = layout.fragment_range(size, index) else {
        return Ok(FragmentRead::OutOfRange);
    };

    let len = usize::try_from(range.end - range.start)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "fragment too large"))?;
    let mut buf = vec![0u8; len];

    file.seek(SeekFrom::Start(range.start)).await?;
    file.read_exact(&mut buf).await?;

    Ok(FragmentRead::Data(buf))
}
