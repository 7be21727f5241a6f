//! Registry access seam.

use crate::endpoint::Endpoint;
use crate::protocol::RegistryError;
use crate::registry::Registry;
use async_trait::async_trait;

/// Operations a peer or downloader needs from the registry
///
/// Implemented by the in-process [`Registry`] and by
/// [`RegistryClient`](crate::RegistryClient), so callers work the same against
/// a local catalog or a remote registry server.
#[async_trait]
pub trait RegistryService: Send + Sync {
    /// Register `endpoint` as a server of `file`
    async fn register(&self, file: &str, endpoint: &Endpoint) -> Result<(), RegistryError>;

    /// Remove `endpoint` from the servers of `file`
    async fn unregister(&self, file: &str, endpoint: &Endpoint) -> Result<(), RegistryError>;

    /// Endpoints serving `file`, in registration order (empty if unknown)
    async fn lookup(&self, file: &str) -> Result<Vec<Endpoint>, RegistryError>;

    /// Every registered file name
    async fn files(&self) -> Result<Vec<String>, RegistryError>;
}

#[async_trait]
impl RegistryService for Registry {
    async fn register(&self, file: &str, endpoint: &Endpoint) -> Result<(), RegistryError> {
        Registry::register(self, file, endpoint.clone());
        Ok(())
    }

    async fn unregister(&self, file: &str, endpoint: &Endpoint) -> Result<(), RegistryError> {
        Registry::unregister(self, file, endpoint);
        Ok(())
    }

    async fn lookup(&self, file: &str) -> Result<Vec<Endpoint>, RegistryError> {
        Ok(Registry::lookup(self, file))
    }

    async fn files(&self) -> Result<Vec<String>, RegistryError> {
        Ok(Registry::files(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_local_registry_through_trait() {
        let service: Arc<dyn RegistryService> = Arc::new(Registry::new());
        let endpoint = Endpoint::new("127.0.0.1", 5000);

        service.register("a.bin", &endpoint).await.unwrap();
        assert_eq!(service.lookup("a.bin").await.unwrap(), vec![endpoint.clone()]);
        assert_eq!(service.files().await.unwrap(), vec!["a.bin"]);

        service.unregister("a.bin", &endpoint).await.unwrap();
        assert!(service.lookup("a.bin").await.unwrap().is_empty());
    }
}
