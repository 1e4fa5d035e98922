//! Secret persistence trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tamarind_common::Environment;

use crate::entity::{Secret, SecretAccessLog};
use crate::model::{Page, PageRequest, SecretWriteOutcome};

/// Secret and secret access log persistence operations
#[async_trait]
pub trait SecretPersistence: Send + Sync {
    /// Returns `false` when the `(tenant, environment, key)` identity is taken
    async fn secret_create(&self, secret: Secret) -> anyhow::Result<bool>;

    async fn secret_find_by_id(&self, id: &str) -> anyhow::Result<Option<Secret>>;

    async fn secret_find_by_key(
        &self,
        tenant_id: Option<&str>,
        environment: Environment,
        key: &str,
    ) -> anyhow::Result<Option<Secret>>;

    async fn secret_list(
        &self,
        tenant_id: Option<&str>,
        environment: Option<Environment>,
        page: PageRequest,
    ) -> anyhow::Result<Page<Secret>>;

    /// Replace a secret if its stored version still equals `expected_version`
    async fn secret_update(
        &self,
        secret: Secret,
        expected_version: u32,
    ) -> anyhow::Result<SecretWriteOutcome>;

    /// Increment the access counter and stamp the access time
    async fn secret_record_access(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Secret>>;

    async fn secret_delete(&self, id: &str) -> anyhow::Result<bool>;

    /// Active secrets with the auto rotation policy
    async fn secret_find_auto_rotating(&self) -> anyhow::Result<Vec<Secret>>;

    async fn secret_access_log_insert(&self, entry: SecretAccessLog) -> anyhow::Result<()>;

    /// Access log for one secret, newest first
    async fn secret_access_log_page(
        &self,
        secret_id: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<SecretAccessLog>>;
}
