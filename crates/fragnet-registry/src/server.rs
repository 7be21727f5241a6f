//! Registry RPC server.

use crate::protocol::{
    RegistryError, RegistryErrorCode, RegistryRequest, RegistryResponse, read_message,
    write_message,
};
use crate::registry::Registry;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Registry server configuration
#[derive(Debug, Clone, Default)]
pub struct RegistryServerConfig {
    /// Maximum concurrently handled connections (0 = unbounded)
    pub max_connections: usize,
}

/// TCP front end for a [`Registry`]
pub struct RegistryServer {
    /// Bound listener
    listener: TcpListener,
    /// Catalog served by this instance
    registry: Arc<Registry>,
    /// Connection ceiling, if any
    limiter: Option<Arc<Semaphore>>,
}

impl RegistryServer {
    /// Bind a server with an empty registry
    ///
    /// # Errors
    ///
    /// Returns error if socket binding fails.
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, RegistryError> {
        Self::bind_with_config(
            bind_addr,
            Arc::new(Registry::new()),
            RegistryServerConfig::default(),
        )
        .await
    }

    /// Bind a server around an existing registry with custom configuration
    ///
    /// # Errors
    ///
    /// Returns error if socket binding fails.
    pub async fn bind_with_config(
        bind_addr: SocketAddr,
        registry: Arc<Registry>,
        config: RegistryServerConfig,
    ) -> Result<Self, RegistryError> {
        let listener = TcpListener::bind(bind_addr).await?;
        let limiter =
            (config.max_connections > 0).then(|| Arc::new(Semaphore::new(config.max_connections)));

        Ok(Self {
            listener,
            registry,
            limiter,
        })
    }

    /// Address the server is listening on
    ///
    /// # Errors
    ///
    /// Returns error if the local address cannot be read from the socket.
    pub fn local_addr(&self) -> Result<SocketAddr, RegistryError> {
        Ok(self.listener.local_addr()?)
    }

    /// Catalog served by this instance
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Serve until the task is dropped
    ///
    /// # Errors
    ///
    /// Returns error if the connection limiter is closed.
    pub async fn run(&self) -> Result<(), RegistryError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes
    ///
    /// Each accepted connection is handled by its own task. Connections in
    /// flight when shutdown fires are left to finish on their own.
    ///
    /// # Errors
    ///
    /// Returns error if the connection limiter is closed.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), RegistryError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Registry server listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            let (stream, from) = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Registry server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Accept error: {}", e);
                        continue;
                    }
                },
            };

            let permit = match &self.limiter {
                Some(limiter) => Some(
                    Arc::clone(limiter)
                        .acquire_owned()
                        .await
                        .map_err(|_| RegistryError::Io(std::io::Error::other("limiter closed")))?,
                ),
                None => None,
            };

            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = handle_connection(stream, &registry).await {
                    tracing::debug!("Registry connection from {} failed: {}", from, e);
                }
            });
        }
    }
}

/// Serve one request on `stream`
async fn handle_connection(mut stream: TcpStream, registry: &Registry) -> Result<(), RegistryError> {
    let response = match read_message::<_, RegistryRequest>(&mut stream).await {
        Ok(request) => {
            tracing::debug!("Registry request: {}", request.request_type());
            dispatch(registry, request)
        }
        Err(RegistryError::Deserialization(e)) => RegistryResponse::Error {
            code: RegistryErrorCode::InvalidMessage,
            message: e,
        },
        Err(e) => return Err(e),
    };

    write_message(&mut stream, &response).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Apply a request to the catalog
fn dispatch(registry: &Registry, request: RegistryRequest) -> RegistryResponse {
    match request {
        RegistryRequest::Register { file, endpoint } => {
            registry.register(&file, endpoint);
            RegistryResponse::Ack
        }
        RegistryRequest::Unregister { file, endpoint } => {
            registry.unregister(&file, &endpoint);
            RegistryResponse::Ack
        }
        RegistryRequest::Lookup { file } => RegistryResponse::Endpoints(registry.lookup(&file)),
        RegistryRequest::ListFiles => RegistryResponse::Files(registry.files()),
    }
}
