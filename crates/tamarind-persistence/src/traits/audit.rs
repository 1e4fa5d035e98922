//! Audit persistence trait

use async_trait::async_trait;

use crate::entity::AuditLog;
use crate::model::{Page, PageRequest};

/// Append-only audit trail storage
#[async_trait]
pub trait AuditPersistence: Send + Sync {
    async fn audit_insert(&self, entry: AuditLog) -> anyhow::Result<()>;

    /// Entries for one resource, newest first
    async fn audit_page_by_resource(
        &self,
        resource_id: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<AuditLog>>;

    /// Entries for one resource type, newest first
    async fn audit_page_by_resource_type(
        &self,
        resource_type: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<AuditLog>>;
}
