//! Parallel download orchestration.
//!
//! A download looks the file up in the registry, asks the first listed peer
//! for the file size, then fetches every fragment in parallel with fragment
//! `i` assigned to peer `i % peers`. Failed fetches are not retried; their
//! slots stay empty and are skipped when the destination is written.

use crate::node::config::DownloadConfig;
use crate::node::error::{NodeError, Result};
use crate::node::peer::PeerClient;
use fragnet_files::{AssemblyBuffer, FragmentLayout};
use fragnet_registry::{Endpoint, RegistryService};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

/// Summary of a finished download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    /// Downloaded file name
    pub file_name: String,
    /// Where the file was written
    pub destination: PathBuf,
    /// Size reported by the first peer
    pub file_size: u64,
    /// Number of fragments requested
    pub fragment_count: u32,
    /// Bytes written to the destination
    pub bytes_written: u64,
    /// Indices of fragments that could not be fetched, ascending
    pub missing: Vec<u32>,
    /// Wall-clock time of the whole download
    pub elapsed: Duration,
}

impl DownloadReport {
    /// Whether every fragment was written
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Average throughput in bytes per second
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_written as f64 / secs
        } else {
            0.0
        }
    }
}

/// Downloads files from the peers a registry lists for them
pub struct DownloadOrchestrator {
    registry: Arc<dyn RegistryService>,
    config: DownloadConfig,
    layout: FragmentLayout,
}

impl DownloadOrchestrator {
    /// Create an orchestrator resolving peers through `registry`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn new(registry: Arc<dyn RegistryService>, config: DownloadConfig) -> Result<Self> {
        config.validate()?;
        let layout = FragmentLayout::with_fragment_size(config.fragment_size);

        Ok(Self {
            registry,
            config,
            layout,
        })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download `file` into `destination`
    ///
    /// The destination is created or truncated. Missing fragments do not fail
    /// the download: they are listed in [`DownloadReport::missing`] and the
    /// written file is correspondingly shorter.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no peer is registered for `file` (no peer is
    /// contacted), `SizeQuery` if the first peer cannot report a size, and
    /// `Io` if the destination cannot be written.
    pub async fn download(
        &self,
        file: &str,
        destination: impl AsRef<Path>,
    ) -> Result<DownloadReport> {
        let destination = destination.as_ref();
        let started = Instant::now();

        let endpoints = self.registry.lookup(file).await?;
        let Some(first) = endpoints.first() else {
            return Err(NodeError::NotFound(file.to_string()));
        };
        tracing::info!("Found {} peer(s) for {}", endpoints.len(), file);

        let file_size = self
            .peer(first.clone())
            .size_query(file)
            .await
            .map_err(|e| NodeError::SizeQuery {
                file: file.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| NodeError::SizeQuery {
                file: file.to_string(),
                reason: format!("{first} does not have it"),
            })?;

        let fragment_count = u32::try_from(self.layout.fragment_count(file_size))
            .map_err(|_| NodeError::invalid_state("file has too many fragments to address"))?;
        tracing::info!(
            "Downloading {} ({} bytes, {} fragments)",
            file,
            file_size,
            fragment_count
        );

        let buffer = self.fetch_all(file, &endpoints, fragment_count).await?;
        let outcome = buffer.write_to(destination).await.map_err(|e| match e {
            fragnet_files::FragmentError::Io(io) => NodeError::Io(io),
            other => NodeError::InvalidState(other.to_string().into()),
        })?;

        let report = DownloadReport {
            file_name: file.to_string(),
            destination: destination.to_path_buf(),
            file_size,
            fragment_count,
            bytes_written: outcome.bytes_written,
            missing: outcome.missing,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Downloaded {} to {} in {:.2?} ({}/{} fragments)",
            file,
            destination.display(),
            report.elapsed,
            report.fragment_count as usize - report.missing.len(),
            report.fragment_count
        );

        Ok(report)
    }

    /// Fetch every fragment, one task per fragment, and collect the results
    async fn fetch_all(
        &self,
        file: &str,
        endpoints: &[Endpoint],
        fragment_count: u32,
    ) -> Result<AssemblyBuffer> {
        let limiter = (self.config.max_concurrent_fetches > 0)
            .then(|| Arc::new(Semaphore::new(self.config.max_concurrent_fetches)));
        let file: Arc<str> = Arc::from(file);
        let mut tasks = JoinSet::new();
        let mut indices = HashMap::with_capacity(fragment_count as usize);

        for index in 0..fragment_count {
            let peer = self.peer(endpoints[index as usize % endpoints.len()].clone());
            let limiter = limiter.clone();
            let file = Arc::clone(&file);

            let handle = tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                let result = peer.fragment_query(&file, index).await;
                (index, peer.endpoint().clone(), result)
            });
            indices.insert(handle.id(), index);
        }

        let mut buffer = AssemblyBuffer::new(fragment_count as usize);
        collect_fragments(&mut tasks, &indices, &mut buffer, &file).await?;
        tracing::debug!(
            "Fetched {}/{} fragments of {}",
            buffer.filled(),
            buffer.len(),
            file
        );

        Ok(buffer)
    }

    fn peer(&self, endpoint: Endpoint) -> PeerClient {
        PeerClient::new(endpoint)
            .with_compression(self.config.compression)
            .with_connect_timeout(self.config.connect_timeout)
    }
}

type FetchResult = (u32, Endpoint, Result<Vec<u8>>);

/// Drain `tasks` into `buffer`
///
/// A fetch that fails, or a task that panics, leaves its slot empty. The gap
/// is reported when the buffer is written, so failures here log at debug.
async fn collect_fragments(
    tasks: &mut JoinSet<FetchResult>,
    indices: &HashMap<task::Id, u32>,
    buffer: &mut AssemblyBuffer,
    file: &str,
) -> Result<()> {
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, (index, endpoint, Ok(data)))) => {
                tracing::debug!("Fragment {} of {} from {}", index, file, endpoint);
                buffer
                    .insert(index, data)
                    .map_err(|e| NodeError::InvalidState(e.to_string().into()))?;
            }
            Ok((_, (index, endpoint, Err(e)))) => {
                tracing::debug!(
                    "Fragment {} of {} from {} failed: {}",
                    index,
                    file,
                    endpoint,
                    e
                );
            }
            Err(e) => {
                tracing::debug!(
                    "Fetch task for fragment {:?} of {} did not finish: {}",
                    indices.get(&e.id()),
                    file,
                    e
                );
            }
        }
    }

    Ok(())
}
