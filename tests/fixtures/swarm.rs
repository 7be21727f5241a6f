//! Registry-plus-peers fixture
//!
//! Runs a real registry server and any number of fragment servers on
//! loopback, each peer sharing files from its own temporary directory.
//!
//! # Example
//!
//! ```no_run
//! use fragnet_integration_tests::fixtures::{Swarm, patterned_data};
//!
//! #[tokio::test]
//! async fn test_download() {
//!     let mut swarm = Swarm::new().await;
//!     swarm.add_peer(&[("a.bin", patterned_data(4096))]).await;
//!
//!     let orchestrator = swarm.orchestrator(Default::default());
//!     let report = orchestrator.download("a.bin", "/tmp/a.bin").await.unwrap();
//!     assert!(report.is_complete());
//! }
//! ```

use fragnet_core::node::{
    DownloadConfig, DownloadOrchestrator, FragmentServer, Registration, ServerConfig,
};
use fragnet_core::protocol::{Request, SizeReply};
use fragnet_registry::{Endpoint, RegistryClient, RegistryServer, RegistryService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Deterministic, non-repeating-per-fragment test data
pub fn patterned_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7 + i / 251) % 256) as u8).collect()
}

/// Endpoint with nothing listening behind it
pub async fn dead_endpoint() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let endpoint = Endpoint::from(listener.local_addr().expect("probe addr"));
    drop(listener);
    endpoint
}

/// Peer that answers one size query with `size`, then stops listening
pub async fn vanishing_peer(size: u64) -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind vanishing peer");
    let endpoint = Endpoint::from(listener.local_addr().expect("vanishing peer addr"));

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            if let Ok(Request::SizeQuery { .. }) = Request::read_from(&mut stream).await {
                let _ = SizeReply(Some(size)).write_to(&mut stream).await;
            }
            let _ = stream.shutdown().await;
        }
    });

    endpoint
}

/// One peer in a [`Swarm`]
pub struct Peer {
    /// Registered endpoint
    pub endpoint: Endpoint,
    /// Directory the peer shares from
    pub dir: TempDir,
    registration: Option<Registration>,
    task: JoinHandle<()>,
}

impl Peer {
    /// Path of a shared file on disk
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }
}

/// Registry server plus fragment servers on loopback
pub struct Swarm {
    /// Registry address
    pub registry_addr: SocketAddr,
    /// Running peers, in the order they were added
    pub peers: Vec<Peer>,
    registry_task: JoinHandle<()>,
}

impl Swarm {
    /// Start a registry with no peers
    pub async fn new() -> Self {
        let server = RegistryServer::bind("127.0.0.1:0".parse().expect("addr"))
            .await
            .expect("bind registry");
        let registry_addr = server.local_addr().expect("registry addr");

        let registry_task = tokio::spawn(async move {
            let _ = server.run().await;
        });

        Self {
            registry_addr,
            peers: Vec::new(),
            registry_task,
        }
    }

    /// Client for the swarm's registry
    pub fn registry(&self) -> Arc<dyn RegistryService> {
        Arc::new(RegistryClient::new(self.registry_addr.to_string()))
    }

    /// Start a peer sharing `files` and register them
    pub async fn add_peer(&mut self, files: &[(&str, Vec<u8>)]) -> Endpoint {
        self.add_peer_with(files, |_| {}).await
    }

    /// Start a peer with a customized server configuration
    pub async fn add_peer_with<F>(&mut self, files: &[(&str, Vec<u8>)], customize: F) -> Endpoint
    where
        F: FnOnce(&mut ServerConfig),
    {
        let dir = TempDir::new().expect("peer dir");
        for (name, data) in files {
            std::fs::write(dir.path().join(name), data).expect("write shared file");
        }

        let mut config = ServerConfig::new(
            "127.0.0.1:0".parse().expect("addr"),
            dir.path(),
            files.iter().map(|(name, _)| name.to_string()),
        );
        customize(&mut config);

        let server = FragmentServer::bind(config).await.expect("bind peer");
        let endpoint = Endpoint::from(server.local_addr().expect("peer addr"));
        let task = tokio::spawn(async move {
            let _ = server.run().await;
        });

        let registration = Registration::acquire(
            self.registry(),
            endpoint.clone(),
            files.iter().map(|(name, _)| name.to_string()),
        )
        .await
        .expect("register peer");

        self.peers.push(Peer {
            endpoint: endpoint.clone(),
            dir,
            registration: Some(registration),
            task,
        });
        endpoint
    }

    /// Register `file` under an endpoint the swarm does not run
    pub async fn register_external(&self, file: &str, endpoint: &Endpoint) {
        self.registry()
            .register(file, endpoint)
            .await
            .expect("register external endpoint");
    }

    /// Stop a peer's server and unregister its files
    pub async fn stop_peer(&mut self, endpoint: &Endpoint) {
        if let Some(peer) = self.peers.iter_mut().find(|p| &p.endpoint == endpoint) {
            peer.task.abort();
            if let Some(registration) = peer.registration.take() {
                registration.release().await;
            }
        }
    }

    /// Orchestrator resolving peers through the swarm's registry
    pub fn orchestrator(&self, config: DownloadConfig) -> DownloadOrchestrator {
        DownloadOrchestrator::new(self.registry(), config).expect("download config")
    }
}

impl Drop for Swarm {
    fn drop(&mut self) {
        for peer in &self.peers {
            peer.task.abort();
        }
        self.registry_task.abort();
    }
}
