//! Fragment server.
//!
//! Answers size and fragment queries for a fixed set of shared files. Every
//! answer reflects the file as it exists on disk at the moment of the query.

use crate::compression::Compression;
use crate::node::config::ServerConfig;
use crate::node::error::{NodeError, Result};
use crate::protocol::{FragmentReply, Request, SizeReply};
use fragnet_files::{FragmentLayout, FragmentRead};
use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Read-only view of the files a server shares
#[derive(Debug)]
struct Share {
    root: PathBuf,
    files: HashSet<String>,
    layout: FragmentLayout,
    compression: Compression,
}

impl Share {
    fn resolve(&self, file: &str) -> Option<PathBuf> {
        self.files.contains(file).then(|| self.root.join(file))
    }

    async fn size_query(&self, file: &str) -> io::Result<Option<u64>> {
        match self.resolve(file) {
            Some(path) => fragnet_files::file_size(&path).await,
            None => Ok(None),
        }
    }

    async fn fragment_query(&self, file: &str, index: u32) -> io::Result<FragmentReply> {
        let Some(path) = self.resolve(file) else {
            return Ok(FragmentReply::NotFound);
        };
        if fragnet_files::file_size(&path).await?.is_none() {
            return Ok(FragmentReply::NotFound);
        }

        match fragnet_files::read_fragment(&path, &self.layout, index).await {
            Ok(FragmentRead::Data(data)) => Ok(FragmentReply::Ok(self.compression.compress(data))),
            Ok(FragmentRead::OutOfRange) => Ok(FragmentReply::OutOfRange),
            // Removed between the size check and the open
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FragmentReply::NotFound),
            Err(e) => Err(e),
        }
    }
}

/// TCP server answering fragment protocol queries
pub struct FragmentServer {
    /// Bound listener
    listener: TcpListener,
    /// Shared files
    share: Arc<Share>,
    /// Connection ceiling, if any
    limiter: Option<Arc<Semaphore>>,
}

impl FragmentServer {
    /// Validate `config` and bind its listen address
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration is invalid, or `Io` if
    /// binding fails.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen_addr).await?;
        let limiter = (config.max_connections > 0)
            .then(|| Arc::new(Semaphore::new(config.max_connections)));

        tracing::debug!(
            "Fragment server sharing {} file(s) from {}",
            config.shared_files.len(),
            config.share_root.display()
        );

        Ok(Self {
            listener,
            share: Arc::new(Share {
                root: config.share_root,
                files: config.shared_files,
                layout: FragmentLayout::with_fragment_size(config.fragment_size),
                compression: config.compression,
            }),
            limiter,
        })
    }

    /// Address the server is listening on
    ///
    /// # Errors
    ///
    /// Returns error if the local address cannot be read from the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Directory shared names resolve against
    #[must_use]
    pub fn share_root(&self) -> &Path {
        &self.share.root
    }

    /// Names this server answers for, sorted
    #[must_use]
    pub fn shared_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.share.files.iter().cloned().collect();
        files.sort();
        files
    }

    /// Current size of a shared file, or `None` if it is not shared or not
    /// present on disk
    ///
    /// # Errors
    ///
    /// Returns `Io` for filesystem failures other than absence.
    pub async fn size_query(&self, file: &str) -> Result<Option<u64>> {
        Ok(self.share.size_query(file).await?)
    }

    /// Fragment `index` of a shared file, compressed with the server's codec
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read.
    pub async fn fragment_query(&self, file: &str, index: u32) -> Result<FragmentReply> {
        Ok(self.share.fragment_query(file, index).await?)
    }

    /// Serve until the task is dropped
    ///
    /// # Errors
    ///
    /// Returns error if the connection limiter is closed.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes
    ///
    /// Each accepted connection is handled by its own task and answers exactly
    /// one request.
    ///
    /// # Errors
    ///
    /// Returns error if the connection limiter is closed.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Fragment server listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            let (stream, from) = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Fragment server shutting down");
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
                        .map_err(|_| NodeError::invalid_state("connection limiter closed"))?,
                ),
                None => None,
            };

            let share = Arc::clone(&self.share);
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = handle_connection(stream, &share).await {
                    tracing::debug!("Fragment connection from {} dropped: {}", from, e);
                }
            });
        }
    }
}

/// Serve one request on `stream`
///
/// Malformed requests and read failures close the connection without a reply.
async fn handle_connection(mut stream: TcpStream, share: &Share) -> Result<()> {
    let request = Request::read_from(&mut stream).await?;

    match request {
        Request::SizeQuery { file } => {
            let size = share.size_query(&file).await?;
            tracing::debug!("Size query for {}: {:?}", file, size);
            SizeReply(size).write_to(&mut stream).await?;
        }
        Request::FragmentQuery { file, index } => {
            let reply = share.fragment_query(&file, index).await?;
            tracing::debug!(
                "Fragment query for {}[{}]: {}",
                file,
                index,
                match &reply {
                    FragmentReply::NotFound => "not found",
                    FragmentReply::OutOfRange => "out of range",
                    FragmentReply::Ok(_) => "ok",
                }
            );
            reply.write_to(&mut stream).await?;
        }
    }

    stream.shutdown().await?;
    Ok(())
}
