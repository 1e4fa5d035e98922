//! Cache abstraction
//!
//! Read-through caching for config lookups. Values are opaque strings; the
//! caller owns the encoding. Every operation is best-effort from the
//! caller's side, so failures are reported but never fatal to a write.

pub mod moka_cache;

use std::time::Duration;

use async_trait::async_trait;

pub use moka_cache::MokaCacheService;

/// Stored in place of a value to remember that a key does not exist
pub const NEGATIVE_MARKER: &str = "__tamarind_absent__";

#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
