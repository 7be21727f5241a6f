//! Fragment payload compression.
//!
//! Compression is a property of the whole deployment: server and client must
//! agree on the codec, nothing on the wire announces it.

use crate::MAX_PAYLOAD_SIZE;
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payload codec applied to fragment data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Payload is the raw fragment bytes
    #[default]
    None,
    /// LZ4 block with a little-endian size prefix
    Lz4,
}

impl Compression {
    /// Codec name as used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Lz4 => "lz4",
        }
    }

    /// Encode raw fragment bytes into a wire payload
    pub fn compress(&self, data: Vec<u8>) -> Vec<u8> {
        match self {
            Compression::None => data,
            Compression::Lz4 => lz4_flex::compress_prepend_size(&data),
        }
    }

    /// Restore raw fragment bytes from a wire payload
    ///
    /// # Errors
    ///
    /// Returns `Decompression` if the payload is malformed, or
    /// `PayloadTooLarge` if it claims to expand past [`MAX_PAYLOAD_SIZE`].
    pub fn decompress(&self, payload: Vec<u8>) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Compression::None => Ok(payload),
            Compression::Lz4 => {
                let claimed = payload
                    .get(..4)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
                    .ok_or_else(|| ProtocolError::Decompression("missing size prefix".into()))?;
                if claimed > MAX_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooLarge(claimed));
                }
                lz4_flex::decompress_size_prepended(&payload)
                    .map_err(|e| ProtocolError::Decompression(e.to_string()))
            }
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "lz4" => Ok(Compression::Lz4),
            other => Err(format!("unknown compression: {other}")),
        }
    }
}
