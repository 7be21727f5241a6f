//! Error types for the FRAGNET wire protocol.

use thiserror::Error;

/// Wire protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Underlying stream failed or ended early
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown request opcode
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Unknown size reply presence flag
    #[error("invalid presence flag: 0x{0:02X}")]
    InvalidPresence(u8),

    /// Unknown fragment reply status
    #[error("invalid fragment status: 0x{0:02X}")]
    InvalidStatus(u8),

    /// File name does not fit the 16-bit length prefix
    #[error("file name too long: {0} bytes")]
    NameTooLong(usize),

    /// File name bytes are not UTF-8
    #[error("file name is not valid UTF-8")]
    InvalidName,

    /// Payload exceeds the protocol limit
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// Compressed payload could not be restored
    #[error("decompression failed: {0}")]
    Decompression(String),
}
