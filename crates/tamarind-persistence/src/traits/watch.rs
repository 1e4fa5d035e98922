//! Watch subscription persistence trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entity::WatchSubscription;
use crate::model::{Page, PageRequest};

#[async_trait]
pub trait WatchPersistence: Send + Sync {
    /// Returns `false` when the subscriber id is already registered
    async fn watch_create(&self, subscription: WatchSubscription) -> anyhow::Result<bool>;

    async fn watch_find_by_id(&self, id: &str) -> anyhow::Result<Option<WatchSubscription>>;

    async fn watch_find_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> anyhow::Result<Option<WatchSubscription>>;

    async fn watch_list(&self, page: PageRequest) -> anyhow::Result<Page<WatchSubscription>>;

    async fn watch_find_active(&self) -> anyhow::Result<Vec<WatchSubscription>>;

    /// Replace a subscription; returns `false` if it does not exist
    async fn watch_replace(&self, subscription: WatchSubscription) -> anyhow::Result<bool>;

    async fn watch_delete(&self, id: &str) -> anyhow::Result<bool>;

    /// Reset the failure count and stamp `last_notified`
    async fn watch_record_success(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<WatchSubscription>>;

    /// Increment the failure count, pausing the subscription once it
    /// reaches `threshold`
    async fn watch_record_failure(
        &self,
        id: &str,
        threshold: u32,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<WatchSubscription>>;
}
