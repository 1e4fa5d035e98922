//! Persistence traits for the storage abstraction layer
//!
//! Each trait covers one group of collections. Backends implement all of
//! them and are exposed to services through [`PersistenceService`].

pub mod audit;
pub mod config;
pub mod secret;
pub mod watch;

pub use audit::AuditPersistence;
pub use config::ConfigPersistence;
pub use secret::SecretPersistence;
pub use watch::WatchPersistence;

use async_trait::async_trait;

/// Unified persistence service trait
#[async_trait]
pub trait PersistenceService:
    ConfigPersistence + SecretPersistence + AuditPersistence + WatchPersistence + Send + Sync
{
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
