//! Fragment wire protocol.
//!
//! One request and one response per connection. All multi-byte fields are
//! big-endian (network byte order).
//!
//! ```text
//! SIZE_QUERY       01 | name_len:u16 | name
//! size reply       00                          (absent)
//!                  01 | size:u64               (present)
//!
//! FRAGMENT_QUERY   02 | name_len:u16 | name | index:u32
//! fragment reply   00                          (not found)
//!                  01                          (out of range)
//!                  02 | len:u32 | payload      (ok, possibly compressed)
//! ```

use crate::MAX_PAYLOAD_SIZE;
use crate::error::ProtocolError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Ask for the current size of a file
    SizeQuery = 0x01,
    /// Ask for one fragment of a file
    FragmentQuery = 0x02,
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::SizeQuery),
            0x02 => Ok(Self::FragmentQuery),
            _ => Err(ProtocolError::InvalidOpcode(value)),
        }
    }
}

/// Fragment reply status bytes
const STATUS_NOT_FOUND: u8 = 0x00;
const STATUS_OUT_OF_RANGE: u8 = 0x01;
const STATUS_OK: u8 = 0x02;

/// Size reply presence bytes
const ABSENT: u8 = 0x00;
const PRESENT: u8 = 0x01;

/// Client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Current size of `file`
    SizeQuery {
        /// File name
        file: String,
    },
    /// Fragment `index` of `file`
    FragmentQuery {
        /// File name
        file: String,
        /// Zero-based fragment index
        index: u32,
    },
}

impl Request {
    /// Request opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::SizeQuery { .. } => Opcode::SizeQuery,
            Request::FragmentQuery { .. } => Opcode::FragmentQuery,
        }
    }

    /// File the request is about
    pub fn file(&self) -> &str {
        match self {
            Request::SizeQuery { file } | Request::FragmentQuery { file, .. } => file,
        }
    }

    /// Encode to wire bytes
    ///
    /// # Errors
    ///
    /// Returns `NameTooLong` if the file name exceeds 65535 bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let name = self.file().as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| ProtocolError::NameTooLong(name.len()))?;

        let mut buf = Vec::with_capacity(1 + 2 + name.len() + 4);
        buf.push(self.opcode() as u8);
        buf.extend_from_slice(&name_len.to_be_bytes());
        buf.extend_from_slice(name);

        if let Request::FragmentQuery { index, .. } = self {
            buf.extend_from_slice(&index.to_be_bytes());
        }

        Ok(buf)
    }

    /// Read one request from `reader`
    ///
    /// File names must be UTF-8; any other name is rejected as `InvalidName`.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown opcodes, invalid names or a short read.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, ProtocolError> {
        let opcode = Opcode::try_from(reader.read_u8().await?)?;
        let file = read_name(reader).await?;

        match opcode {
            Opcode::SizeQuery => Ok(Request::SizeQuery { file }),
            Opcode::FragmentQuery => {
                let index = reader.read_u32().await?;
                Ok(Request::FragmentQuery { file, index })
            }
        }
    }

    /// Write this request to `writer`
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        writer.write_all(&self.encode()?).await?;
        writer.flush().await?;
        Ok(())
    }
}

async fn read_name<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, ProtocolError> {
    let len = reader.read_u16().await? as usize;
    let mut name = vec![0u8; len];
    reader.read_exact(&mut name).await?;
    String::from_utf8(name).map_err(|_| ProtocolError::InvalidName)
}

/// Reply to a size query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReply(pub Option<u64>);

impl SizeReply {
    /// Encode to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        match self.0 {
            None => vec![ABSENT],
            Some(size) => {
                let mut buf = Vec::with_capacity(9);
                buf.push(PRESENT);
                buf.extend_from_slice(&size.to_be_bytes());
                buf
            }
        }
    }

    /// Read one size reply from `reader`
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown presence flag or a short read.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, ProtocolError> {
        match reader.read_u8().await? {
            ABSENT => Ok(SizeReply(None)),
            PRESENT => Ok(SizeReply(Some(reader.read_u64().await?))),
            other => Err(ProtocolError::InvalidPresence(other)),
        }
    }

    /// Write this reply to `writer`
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        writer.write_all(&self.encode()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Reply to a fragment query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentReply {
    /// File not shared or not on disk
    NotFound,
    /// Index past the end of the file
    OutOfRange,
    /// Fragment payload (compressed if the server compresses)
    Ok(Vec<u8>),
}

impl FragmentReply {
    /// Encode to wire bytes
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the payload exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            FragmentReply::NotFound => Ok(vec![STATUS_NOT_FOUND]),
            FragmentReply::OutOfRange => Ok(vec![STATUS_OUT_OF_RANGE]),
            FragmentReply::Ok(payload) => {
                if payload.len() > MAX_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooLarge(payload.len()));
                }
                let mut buf = Vec::with_capacity(1 + 4 + payload.len());
                buf.push(STATUS_OK);
                buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                buf.extend_from_slice(payload);
                Ok(buf)
            }
        }
    }

    /// Read one fragment reply from `reader`
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown status, an oversized payload or a short
    /// read.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, ProtocolError> {
        match reader.read_u8().await? {
            STATUS_NOT_FOUND => Ok(FragmentReply::NotFound),
            STATUS_OUT_OF_RANGE => Ok(FragmentReply::OutOfRange),
            STATUS_OK => {
                let len = reader.read_u32().await? as usize;
                if len > MAX_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooLarge(len));
                }
                let mut payload = vec![0u8; len];
                reader.read_exact(&mut payload).await?;
                Ok(FragmentReply::Ok(payload))
            }
            other => Err(ProtocolError::InvalidStatus(other)),
        }
    }

    /// Write this reply to `writer`
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        writer.write_all(&self.encode()?).await?;
        writer.flush().await?;
        Ok(())
    }
}
