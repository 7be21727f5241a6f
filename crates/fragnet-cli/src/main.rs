//! FRAGNET CLI
//!
//! Fragmented peer-to-peer file distribution

mod config;
mod progress;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use fragnet_core::node::{DownloadOrchestrator, FragmentServer, Registration};
use fragnet_registry::{
    Endpoint, Registry, RegistryClient, RegistryServer, RegistryServerConfig, RegistryService,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::Config;
use progress::DownloadProgress;

/// FRAGNET - fragmented peer-to-peer file distribution
#[derive(Parser)]
#[command(name = "fragnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the file registry
    Registry {
        /// Listen address
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Serve files to downloaders and list them in the registry
    Serve {
        /// Listen address for fragment queries
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Endpoint to register (host:port), if different from the listen address
        #[arg(short, long)]
        advertise: Option<Endpoint>,

        /// Registry address (host:port)
        #[arg(short, long)]
        registry: Option<String>,

        /// Directory the shared files live in
        #[arg(short = 'd', long)]
        share_root: Option<PathBuf>,

        /// File names to share
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Download a file from every peer that has it
    Download {
        /// Registry address (host:port)
        #[arg(short, long)]
        registry: Option<String>,

        /// File name to download
        #[arg(required = true)]
        file: String,

        /// Destination path
        #[arg(required = true)]
        destination: PathBuf,
    },

    /// List files currently registered
    Files {
        /// Registry address (host:port)
        #[arg(short, long)]
        registry: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load_or_default()?,
    };

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Registry { bind } => {
            run_registry(bind, &config).await?;
        }
        Commands::Serve {
            bind,
            advertise,
            registry,
            share_root,
            files,
        } => {
            let mut config = config;
            if let Some(root) = share_root {
                config.peer.share_root = root;
            }
            let registry = registry.unwrap_or_else(|| config.registry.addr.clone());
            serve_files(bind, advertise, registry, files, &config).await?;
        }
        Commands::Download {
            registry,
            file,
            destination,
        } => {
            let registry = registry.unwrap_or_else(|| config.registry.addr.clone());
            download_file(registry, file, destination, &config).await?;
        }
        Commands::Files { registry } => {
            let registry = registry.unwrap_or_else(|| config.registry.addr.clone());
            list_files(registry).await?;
        }
    }

    Ok(())
}

/// Completes on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Run the registry until Ctrl+C
async fn run_registry(bind: Option<SocketAddr>, config: &Config) -> anyhow::Result<()> {
    let bind = match bind {
        Some(addr) => addr,
        None => config.registry_bind_addr()?,
    };

    let server = RegistryServer::bind_with_config(
        bind,
        Arc::new(Registry::new()),
        RegistryServerConfig {
            max_connections: config.registry.max_connections,
        },
    )
    .await
    .with_context(|| format!("failed to bind registry on {bind}"))?;

    println!("FRAGNET Registry");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Listen: {}", server.local_addr()?);
    println!("Press Ctrl+C to stop");

    server.run_until(shutdown_signal()).await?;
    println!("\nShutting down...");

    Ok(())
}

/// Serve `files` until Ctrl+C, registered under the advertised endpoint
async fn serve_files(
    bind: Option<SocketAddr>,
    advertise: Option<Endpoint>,
    registry_addr: String,
    files: Vec<String>,
    config: &Config,
) -> anyhow::Result<()> {
    let bind = match bind {
        Some(addr) => addr,
        None => config.peer_listen_addr()?,
    };

    let server = FragmentServer::bind(config.server_config(bind, &files))
        .await
        .with_context(|| format!("failed to start fragment server on {bind}"))?;
    let local = server.local_addr()?;

    for file in &files {
        if server.size_query(file).await?.is_none() {
            tracing::warn!(
                "{} not found under {}; it will be reported absent until it appears",
                file,
                server.share_root().display()
            );
        }
    }

    let endpoint = match advertise {
        Some(endpoint) => endpoint,
        None => match config.advertised_endpoint()? {
            Some(endpoint) => endpoint,
            None => advertised_from_local(local),
        },
    };

    let registry: Arc<dyn RegistryService> = Arc::new(RegistryClient::new(registry_addr.clone()));
    let registration = Registration::acquire(registry, endpoint.clone(), files.iter().cloned())
        .await
        .with_context(|| format!("failed to register with {registry_addr}"))?;

    println!("FRAGNET Peer");
    println!("Listen: {}", local);
    println!("Advertised as: {}", endpoint);
    println!("Registry: {}", registry_addr);
    println!("Sharing {} file(s) from {}", files.len(), server.share_root().display());
    println!("Press Ctrl+C to stop");

    let served = server.run_until(shutdown_signal()).await;

    println!("\nShutting down...");
    registration.release().await;
    served?;

    Ok(())
}

/// Endpoint derived from the bound address; wildcard binds advertise loopback
fn advertised_from_local(local: SocketAddr) -> Endpoint {
    if local.ip().is_unspecified() {
        tracing::warn!(
            "Listening on a wildcard address; advertising loopback. Use --advertise for remote peers"
        );
        Endpoint::from(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port()))
    } else {
        Endpoint::from(local)
    }
}

/// Download `file` into `destination`
async fn download_file(
    registry_addr: String,
    file: String,
    destination: PathBuf,
    config: &Config,
) -> anyhow::Result<()> {
    tracing::info!("Downloading {} via registry {}", file, registry_addr);

    let registry = Arc::new(RegistryClient::new(registry_addr));
    let orchestrator = DownloadOrchestrator::new(registry, config.download_config())?;

    let progress = DownloadProgress::new(&file);
    match orchestrator.download(&file, &destination).await {
        Ok(report) => {
            progress.finish(&report);
            if !report.is_complete() {
                eprintln!(
                    "{} destination is shorter than the original file",
                    style("warning:").yellow().bold()
                );
            }
            Ok(())
        }
        Err(e) => {
            progress.abandon();
            Err(e).with_context(|| format!("download of {file} failed"))
        }
    }
}

/// Print every registered file name
async fn list_files(registry_addr: String) -> anyhow::Result<()> {
    let client = RegistryClient::new(registry_addr.clone());
    let files = client
        .files()
        .await
        .with_context(|| format!("failed to query registry {registry_addr}"))?;

    if files.is_empty() {
        println!("No files registered");
        return Ok(());
    }

    for file in &files {
        let peers = client.lookup(file).await?;
        println!("{} ({} peer(s))", file, peers.len());
    }

    Ok(())
}
