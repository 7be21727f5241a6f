//! Configuration system for the FRAGNET CLI.

use fragnet_core::Compression;
use fragnet_core::node::{
    DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_CONNECTIONS, DEFAULT_PEER_PORT, DownloadConfig,
    ServerConfig,
};
use fragnet_registry::{DEFAULT_REGISTRY_PORT, Endpoint};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// FRAGNET configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Fragment server configuration
    #[serde(default)]
    pub peer: PeerConfig,
    /// Download configuration
    #[serde(default)]
    pub download: DownloadSection,
    /// Settings every peer and downloader of a deployment must agree on
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry location used by peers and downloaders (`host:port`)
    #[serde(default = "default_registry_addr")]
    pub addr: String,
    /// Listen address when running the registry itself
    #[serde(default = "default_registry_bind")]
    pub bind_addr: String,
    /// Maximum concurrently handled registry connections (0 = unbounded)
    #[serde(default)]
    pub max_connections: usize,
}

/// Fragment server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Listen address for fragment queries
    #[serde(default = "default_peer_listen")]
    pub listen_addr: String,
    /// Endpoint registered for this peer (`host:port`); derived from the
    /// listen address when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise: Option<String>,
    /// Directory shared file names resolve against
    #[serde(default = "default_share_root")]
    pub share_root: PathBuf,
    /// Maximum concurrently handled connections (0 = unbounded)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSection {
    /// Maximum fragments in flight (0 = unbounded)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Peer connect timeout in seconds; unset waits on the OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

/// Transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Fragment size in bytes
    #[serde(default = "default_fragment_size")]
    pub fragment_size: u64,
    /// Fragment payload compression
    #[serde(default)]
    pub compression: Compression,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_registry_addr() -> String {
    format!("127.0.0.1:{DEFAULT_REGISTRY_PORT}")
}

fn default_registry_bind() -> String {
    format!("0.0.0.0:{DEFAULT_REGISTRY_PORT}")
}

fn default_peer_listen() -> String {
    format!("0.0.0.0:{DEFAULT_PEER_PORT}")
}

fn default_share_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_fragment_size() -> u64 {
    fragnet_core::FRAGMENT_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            addr: default_registry_addr(),
            bind_addr: default_registry_bind(),
            max_connections: 0,
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_peer_listen(),
            advertise: None,
            share_root: default_share_root(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            connect_timeout_secs: None,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            fragment_size: default_fragment_size(),
            compression: Compression::None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("fragnet/config.toml")
    }

    /// Load config from default path, or create default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if reading or creating the config fails.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Parse the registry bind address
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn registry_bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.registry.bind_addr.parse()?)
    }

    /// Parse the fragment server listen address
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn peer_listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.peer.listen_addr.parse()?)
    }

    /// Parse the configured advertised endpoint, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be parsed.
    pub fn advertised_endpoint(&self) -> anyhow::Result<Option<Endpoint>> {
        self.peer
            .advertise
            .as_deref()
            .map(|s| s.parse::<Endpoint>().map_err(anyhow::Error::from))
            .transpose()
    }

    /// Fragment server settings for sharing `files`
    #[must_use]
    pub fn server_config(&self, listen_addr: SocketAddr, files: &[String]) -> ServerConfig {
        let mut config = ServerConfig::new(listen_addr, &self.peer.share_root, files.iter().cloned());
        config.fragment_size = self.transfer.fragment_size;
        config.compression = self.transfer.compression;
        config.max_connections = self.peer.max_connections;
        config
    }

    /// Download orchestrator settings
    #[must_use]
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            fragment_size: self.transfer.fragment_size,
            compression: self.transfer.compression,
            max_concurrent_fetches: self.download.max_concurrent_fetches,
            connect_timeout: self.download.connect_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_host_port(&self.registry.addr, "Registry address")?;
        self.registry_bind_addr()?;
        self.peer_listen_addr()?;

        if let Some(advertise) = &self.peer.advertise {
            self.validate_host_port(advertise, "Advertised endpoint")?;
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if self.transfer.fragment_size == 0
            || self.transfer.fragment_size > fragnet_core::MAX_FRAGMENT_SIZE
        {
            anyhow::bail!("Fragment size must be between 1 and 16MB");
        }

        if self.download.connect_timeout_secs == Some(0) {
            anyhow::bail!("Connect timeout must be at least 1 second");
        }

        Ok(())
    }

    /// Validate host:port format
    fn validate_host_port(&self, addr: &str, name: &str) -> anyhow::Result<()> {
        addr.parse::<Endpoint>()
            .map_err(|e| anyhow::anyhow!("{}: {}", name, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.registry.addr, "127.0.0.1:4000");
        assert_eq!(config.peer.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.transfer.fragment_size, 1024 * 1024);
        assert_eq!(config.transfer.compression, Compression::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        config.transfer.fragment_size = 0;
        assert!(config.validate().is_err());

        config.transfer.fragment_size = 4096;
        config.registry.addr = "no-port".to_string();
        assert!(config.validate().is_err());

        config.registry.addr = "registry.lan:4000".to_string();
        config.peer.advertise = Some("host:0".to_string());
        assert!(config.validate().is_err());

        config.peer.advertise = Some("10.1.2.3:5000".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = Config::default();
        config.transfer.compression = Compression::Lz4;
        config.download.connect_timeout_secs = Some(5);

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.registry.addr, deserialized.registry.addr);
        assert_eq!(deserialized.transfer.compression, Compression::Lz4);
        assert_eq!(deserialized.download.connect_timeout_secs, Some(5));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [transfer]
            compression = "lz4"

            [registry]
            addr = "10.0.0.1:4000"
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.addr, "10.0.0.1:4000");
        assert_eq!(config.transfer.compression, Compression::Lz4);
        assert_eq!(config.transfer.fragment_size, 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.peer.share_root = PathBuf::from("/srv/share");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.peer.share_root, PathBuf::from("/srv/share"));
    }

    #[test]
    fn test_derived_library_configs() {
        let mut config = Config::default();
        config.transfer.fragment_size = 4096;
        config.download.connect_timeout_secs = Some(3);

        let download = config.download_config();
        assert_eq!(download.fragment_size, 4096);
        assert_eq!(download.connect_timeout, Some(Duration::from_secs(3)));

        let server = config.server_config("127.0.0.1:0".parse().unwrap(), &["a".to_string()]);
        assert_eq!(server.fragment_size, 4096);
        assert!(server.shared_files.contains("a"));
    }

    #[test]
    fn test_advertised_endpoint() {
        let mut config = Config::default();
        assert!(config.advertised_endpoint().unwrap().is_none());

        config.peer.advertise = Some("peer.lan:5001".to_string());
        assert_eq!(
            config.advertised_endpoint().unwrap(),
            Some(Endpoint::new("peer.lan", 5001))
        );
    }
}
