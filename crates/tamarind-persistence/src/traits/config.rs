//! Config persistence trait
//!
//! Defines the interface for config and config version storage. The write
//! primitives are atomic: backends must apply each one as a single unit so
//! that at most one version per config is ever active.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tamarind_common::Environment;

use crate::entity::{Config, ConfigStatus, ConfigVersion};
use crate::model::{
    ActivationOutcome, AppendOutcome, HistoryCursor, Page, PageRequest, VersionAppend,
};

/// Config persistence operations
#[async_trait]
pub trait ConfigPersistence: Send + Sync {
    /// Insert a config together with its first version
    ///
    /// Returns `false` without writing anything when the
    /// `(tenant, environment, key)` identity is already taken.
    async fn config_create(
        &self,
        config: Config,
        first_version: ConfigVersion,
    ) -> anyhow::Result<bool>;

    async fn config_find_by_id(&self, id: &str) -> anyhow::Result<Option<Config>>;

    async fn config_find_by_key(
        &self,
        tenant_id: Option<&str>,
        environment: Environment,
        key: &str,
    ) -> anyhow::Result<Option<Config>>;

    /// List configs ordered by key, optionally filtered
    async fn config_list(
        &self,
        tenant_id: Option<&str>,
        environment: Option<Environment>,
        page: PageRequest,
    ) -> anyhow::Result<Page<Config>>;

    /// Set the lifecycle status of a config, returning the updated record
    async fn config_set_status(
        &self,
        id: &str,
        status: ConfigStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Config>>;

    /// Compare-and-swap append of a version on `Config.version`
    async fn config_version_append(
        &self,
        append: VersionAppend,
    ) -> anyhow::Result<AppendOutcome>;

    /// Make an existing version the served one
    ///
    /// Archives the previously active version and copies the target's value
    /// into the config in the same atomic step.
    async fn config_version_activate(
        &self,
        config_id: &str,
        version_number: u32,
        actor: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<ActivationOutcome>;

    async fn config_version_find(
        &self,
        config_id: &str,
        version_number: u32,
    ) -> anyhow::Result<Option<ConfigVersion>>;

    /// Newest-first batch of versions strictly older than the cursor
    async fn config_version_batch(
        &self,
        config_id: &str,
        cursor: HistoryCursor,
        limit: usize,
    ) -> anyhow::Result<Vec<ConfigVersion>>;
}
