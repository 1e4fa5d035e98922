//! In-process cache backed by `moka`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry, future::Cache};

use super::CacheService;

pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Clone, Debug)]
struct CachedEntry {
    payload: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was inserted with
struct PerEntryTtl;

impl Expiry<String, CachedEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct MokaCacheService {
    cache: Cache<String, CachedEntry>,
}

impl MokaCacheService {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaCacheService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPACITY)
    }
}

#[async_trait]
impl CacheService for MokaCacheService {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.payload))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        self.cache
            .insert(
                key.to_string(),
                CachedEntry {
                    payload: value,
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}
