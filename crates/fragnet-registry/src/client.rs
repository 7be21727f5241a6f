//! Registry RPC client.

use crate::REGISTRY_CONNECT_TIMEOUT;
use crate::endpoint::Endpoint;
use crate::protocol::{RegistryError, RegistryRequest, RegistryResponse, read_message, write_message};
use crate::service::RegistryService;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

/// Client for a remote [`RegistryServer`](crate::RegistryServer)
///
/// Each call opens one connection, sends one request and reads one response.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Registry location as `host:port`
    addr: String,
    /// Connect timeout
    timeout: Duration,
}

impl RegistryClient {
    /// Create a client for the registry at `addr` (`host:port`)
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: REGISTRY_CONNECT_TIMEOUT,
        }
    }

    /// Override the connect timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registry location
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one request and wait for its response
    async fn call(&self, request: RegistryRequest) -> Result<RegistryResponse, RegistryError> {
        let mut stream = time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| RegistryError::Timeout)??;

        write_message(&mut stream, &request).await?;

        match read_message(&mut stream).await? {
            RegistryResponse::Error { code, message } => {
                Err(RegistryError::Remote { code, message })
            }
            response => Ok(response),
        }
    }
}

#[async_trait]
impl RegistryService for RegistryClient {
    async fn register(&self, file: &str, endpoint: &Endpoint) -> Result<(), RegistryError> {
        let request = RegistryRequest::Register {
            file: file.to_string(),
            endpoint: endpoint.clone(),
        };
        match self.call(request).await? {
            RegistryResponse::Ack => Ok(()),
            _ => Err(RegistryError::UnexpectedResponse("Register")),
        }
    }

    async fn unregister(&self, file: &str, endpoint: &Endpoint) -> Result<(), RegistryError> {
        let request = RegistryRequest::Unregister {
            file: file.to_string(),
            endpoint: endpoint.clone(),
        };
        match self.call(request).await? {
            RegistryResponse::Ack => Ok(()),
            _ => Err(RegistryError::UnexpectedResponse("Unregister")),
        }
    }

    async fn lookup(&self, file: &str) -> Result<Vec<Endpoint>, RegistryError> {
        let request = RegistryRequest::Lookup {
            file: file.to_string(),
        };
        match self.call(request).await? {
            RegistryResponse::Endpoints(endpoints) => Ok(endpoints),
            _ => Err(RegistryError::UnexpectedResponse("Lookup")),
        }
    }

    async fn files(&self) -> Result<Vec<String>, RegistryError> {
        match self.call(RegistryRequest::ListFiles).await? {
            RegistryResponse::Files(files) => Ok(files),
            _ => Err(RegistryError::UnexpectedResponse("ListFiles")),
        }
    }
}
