//! In-memory file catalog.
//!
//! Maps a file name to the ordered set of endpoints serving it. Entries live in
//! a sharded [`DashMap`]: mutations on different file names do not contend,
//! mutations on the same name are serialized by that entry's shard lock, and a
//! lookup clones the endpoint list under a read guard, so it never observes a
//! half-applied mutation.

use crate::endpoint::Endpoint;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Concurrent file name -> endpoints catalog
///
/// An entry's endpoint list is never empty: removing the last endpoint removes
/// the entry in the same critical section.
#[derive(Debug, Default)]
pub struct Registry {
    /// file name -> endpoints in registration order
    entries: DashMap<String, Vec<Endpoint>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` as a server of `file`
    ///
    /// Idempotent. Returns `true` if the endpoint was newly added.
    pub fn register(&self, file: &str, endpoint: Endpoint) -> bool {
        let mut endpoints = self.entries.entry(file.to_string()).or_default();
        if endpoints.contains(&endpoint) {
            return false;
        }

        tracing::info!("Registered {} at {}", file, endpoint);
        endpoints.push(endpoint);
        true
    }

    /// Remove `endpoint` from the servers of `file`
    ///
    /// Unknown files and endpoints are a no-op. Returns `true` if an endpoint
    /// was removed.
    pub fn unregister(&self, file: &str, endpoint: &Endpoint) -> bool {
        let Entry::Occupied(mut entry) = self.entries.entry(file.to_string()) else {
            return false;
        };

        let endpoints = entry.get_mut();
        let before = endpoints.len();
        endpoints.retain(|e| e != endpoint);
        let removed = endpoints.len() != before;

        if endpoints.is_empty() {
            entry.remove();
            tracing::debug!("Last endpoint for {} gone, entry removed", file);
        }

        if removed {
            tracing::info!("Unregistered {} at {}", file, endpoint);
        }
        removed
    }

    /// Endpoints currently serving `file`, in registration order
    ///
    /// An unknown file yields an empty list.
    pub fn lookup(&self, file: &str) -> Vec<Endpoint> {
        self.entries
            .get(file)
            .map(|endpoints| endpoints.value().clone())
            .unwrap_or_default()
    }

    /// Every registered file name, sorted
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        files.sort();
        files
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no file is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
