//! Scoped peer registration.
//!
//! A [`Registration`] lists a peer's shared files in the registry for as long
//! as it is held. Releasing it, explicitly or by drop, removes them again.
//! A process that dies without releasing leaves its entries behind; the
//! registry has no liveness tracking.

use crate::node::error::Result;
use fragnet_registry::{Endpoint, RegistryService};
use std::sync::Arc;

/// Handle that keeps a peer's files registered
pub struct Registration {
    registry: Arc<dyn RegistryService>,
    endpoint: Endpoint,
    files: Vec<String>,
    released: bool,
}

impl Registration {
    /// Register every file in `files` under `endpoint`
    ///
    /// Files registered before a failure are unregistered again before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Registry` if any registration call fails.
    pub async fn acquire<I, S>(
        registry: Arc<dyn RegistryService>,
        endpoint: Endpoint,
        files: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registration = Self {
            registry,
            endpoint,
            files: Vec::new(),
            released: false,
        };

        for file in files {
            let file = file.into();
            if let Err(e) = registration.registry.register(&file, &registration.endpoint).await {
                registration.release().await;
                return Err(e.into());
            }
            registration.files.push(file);
        }

        tracing::info!(
            "Registered {} file(s) as {}",
            registration.files.len(),
            registration.endpoint
        );
        Ok(registration)
    }

    /// Endpoint the files are registered under
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Registered file names
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Unregister every file
    ///
    /// Failures are logged and do not stop the remaining files from being
    /// unregistered.
    pub async fn release(mut self) {
        self.released = true;
        let files = std::mem::take(&mut self.files);
        unregister_all(self.registry.as_ref(), &self.endpoint, &files).await;
    }
}

async fn unregister_all(registry: &dyn RegistryService, endpoint: &Endpoint, files: &[String]) {
    for file in files {
        if let Err(e) = registry.unregister(file, endpoint).await {
            tracing::warn!("Failed to unregister {} for {}: {}", file, endpoint, e);
        }
    }
    tracing::info!("Unregistered {} file(s) for {}", files.len(), endpoint);
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.released || self.files.is_empty() {
            return;
        }

        let files = std::mem::take(&mut self.files);
        let registry = Arc::clone(&self.registry);
        let endpoint = self.endpoint.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    unregister_all(registry.as_ref(), &endpoint, &files).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    "Registration for {} dropped outside a runtime; {} file(s) stay registered",
                    endpoint,
                    files.len()
                );
            }
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("endpoint", &self.endpoint)
            .field("files", &self.files)
            .field("released", &self.released)
            .finish()
    }
}
