//! Client side of the fragment wire protocol.

use crate::compression::Compression;
use crate::error::ProtocolError;
use crate::node::error::{NodeError, Result};
use crate::protocol::{FragmentReply, Request, SizeReply};
use fragnet_registry::Endpoint;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Issues single-shot queries against one fragment server
///
/// Every query opens a fresh connection, sends one request, reads one reply
/// and closes.
#[derive(Debug, Clone)]
pub struct PeerClient {
    endpoint: Endpoint,
    compression: Compression,
    connect_timeout: Option<Duration>,
}

impl PeerClient {
    /// Client for `endpoint` with no payload compression and no connect timeout
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            compression: Compression::None,
            connect_timeout: None,
        }
    }

    /// Set the payload codec
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Peer this client talks to
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Ask the peer for the current size of `file`
    ///
    /// Returns `Ok(None)` when the peer reports the file as absent.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the exchange fails at any point.
    pub async fn size_query(&self, file: &str) -> Result<Option<u64>> {
        let request = Request::SizeQuery {
            file: file.to_string(),
        };

        let mut stream = self.connect().await?;
        let reply = async {
            request.write_to(&mut stream).await?;
            SizeReply::read_from(&mut stream).await
        }
        .await
        .map_err(|e| NodeError::connection(&self.endpoint, e))?;

        let _ = stream.shutdown().await;
        Ok(reply.0)
    }

    /// Fetch fragment `index` of `file`, decompressed
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `OutOfRange` when the peer says so,
    /// `Connection` if the exchange fails, and `Protocol` if the payload
    /// cannot be decompressed.
    pub async fn fragment_query(&self, file: &str, index: u32) -> Result<Vec<u8>> {
        let request = Request::FragmentQuery {
            file: file.to_string(),
            index,
        };

        let mut stream = self.connect().await?;
        let reply = async {
            request.write_to(&mut stream).await?;
            FragmentReply::read_from(&mut stream).await
        }
        .await
        .map_err(|e: ProtocolError| NodeError::connection(&self.endpoint, e))?;

        let _ = stream.shutdown().await;

        match reply {
            FragmentReply::NotFound => Err(NodeError::NotFound(file.to_string())),
            FragmentReply::OutOfRange => Err(NodeError::OutOfRange {
                file: file.to_string(),
                index,
            }),
            FragmentReply::Ok(payload) => Ok(self.compression.decompress(payload)?),
        }
    }

    async fn connect(&self) -> Result<TcpStream> {
        let addr = (self.endpoint.host.as_str(), self.endpoint.port);
        let connected = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| NodeError::connection(&self.endpoint, "connect timed out"))?,
            None => TcpStream::connect(addr).await,
        };

        connected.map_err(|e| NodeError::connection(&self.endpoint, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Listener that answers one connection with `reply` after draining the request
    async fn one_shot(reply: Vec<u8>) -> Endpoint {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = Request::read_from(&mut stream).await;
            stream.write_all(&reply).await.unwrap();
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest).await;
        });
        Endpoint::from(addr)
    }

    #[tokio::test]
    async fn test_size_query_present_and_absent() {
        let endpoint = one_shot(SizeReply(Some(77)).encode()).await;
        let size = PeerClient::new(endpoint).size_query("f").await.unwrap();
        assert_eq!(size, Some(77));

        let endpoint = one_shot(SizeReply(None).encode()).await;
        let size = PeerClient::new(endpoint).size_query("f").await.unwrap();
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_fragment_query_statuses() {
        let endpoint = one_shot(FragmentReply::NotFound.encode().unwrap()).await;
        let result = PeerClient::new(endpoint).fragment_query("f", 0).await;
        assert!(matches!(result, Err(NodeError::NotFound(_))));

        let endpoint = one_shot(FragmentReply::OutOfRange.encode().unwrap()).await;
        let result = PeerClient::new(endpoint).fragment_query("f", 3).await;
        assert!(matches!(result, Err(NodeError::OutOfRange { index: 3, .. })));

        let endpoint = one_shot(FragmentReply::Ok(vec![5; 10]).encode().unwrap()).await;
        let data = PeerClient::new(endpoint).fragment_query("f", 0).await.unwrap();
        assert_eq!(data, vec![5; 10]);
    }

    #[tokio::test]
    async fn test_fragment_query_decompresses() {
        let payload = Compression::Lz4.compress(vec![1; 4096]);
        let endpoint = one_shot(FragmentReply::Ok(payload).encode().unwrap()).await;
        let data = PeerClient::new(endpoint)
            .with_compression(Compression::Lz4)
            .fragment_query("f", 0)
            .await
            .unwrap();
        assert_eq!(data, vec![1; 4096]);
    }

    #[tokio::test]
    async fn test_truncated_reply_is_connection_error() {
        let endpoint = one_shot(vec![0x02, 0, 0, 0, 9, 1]).await;
        let result = PeerClient::new(endpoint).fragment_query("f", 0).await;
        assert!(matches!(result, Err(NodeError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::from(listener.local_addr().unwrap());
        drop(listener);

        let result = PeerClient::new(endpoint).size_query("f").await;
        assert!(matches!(result, Err(NodeError::Connection { .. })));
    }
}
