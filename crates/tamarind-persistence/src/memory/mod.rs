//! In-memory persistence backend
//!
//! Reference implementation of every persistence trait, used by the server
//! binary and by tests. Each atomic primitive holds the config entry lock
//! before the version list lock, and no lock is held across an await.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::RwLock;
use tamarind_common::Environment;

use crate::entity::{
    AuditLog, Config, ConfigStatus, ConfigVersion, ResourceIdentity, RotationPolicy, Secret,
    SecretAccessLog, SecretStatus, VersionStatus, WatchStatus, WatchSubscription, collections,
};
use crate::model::{
    ActivationOutcome, AppendOutcome, HistoryCursor, Page, PageRequest, SecretWriteOutcome,
    VersionAppend,
};
use crate::traits::{
    AuditPersistence, ConfigPersistence, PersistenceService, SecretPersistence, WatchPersistence,
};

#[derive(Default)]
pub struct MemoryPersistService {
    configs: DashMap<String, Config>,
    config_index: DashMap<ResourceIdentity, String>,
    versions: DashMap<String, Vec<ConfigVersion>>,
    secrets: DashMap<String, Secret>,
    secret_index: DashMap<ResourceIdentity, String>,
    access_logs: RwLock<Vec<SecretAccessLog>>,
    audit_logs: RwLock<Vec<AuditLog>>,
    watches: DashMap<String, WatchSubscription>,
    subscriber_index: DashMap<String, String>,
}

impl MemoryPersistService {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_scope(
    tenant: Option<&str>,
    environment: Environment,
    tenant_filter: Option<&str>,
    environment_filter: Option<Environment>,
) -> bool {
    tenant_filter.is_none_or(|t| tenant == Some(t))
        && environment_filter.is_none_or(|e| environment == e)
}

#[async_trait]
impl ConfigPersistence for MemoryPersistService {
    async fn config_create(
        &self,
        config: Config,
        first_version: ConfigVersion,
    ) -> anyhow::Result<bool> {
        match self.config_index.entry(config.identity()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                let id = config.id.clone();
                self.versions.insert(id.clone(), vec![first_version]);
                self.configs.insert(id.clone(), config);
                slot.insert(id);
                tracing::debug!(collection = collections::CONFIGS, "Inserted config");
                Ok(true)
            }
        }
    }

    async fn config_find_by_id(&self, id: &str) -> anyhow::Result<Option<Config>> {
        Ok(self.configs.get(id).map(|c| c.clone()))
    }

    async fn config_find_by_key(
        &self,
        tenant_id: Option<&str>,
        environment: Environment,
        key: &str,
    ) -> anyhow::Result<Option<Config>> {
        let identity = ResourceIdentity::new(tenant_id, environment, key);
        let Some(id) = self.config_index.get(&identity).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.configs.get(&id).map(|c| c.clone()))
    }

    async fn config_list(
        &self,
        tenant_id: Option<&str>,
        environment: Option<Environment>,
        page: PageRequest,
    ) -> anyhow::Result<Page<Config>> {
        let mut items: Vec<Config> = self
            .configs
            .iter()
            .filter(|c| in_scope(c.tenant(), c.environment, tenant_id, environment))
            .map(|c| c.clone())
            .collect();
        // Newest update first
        items.sort_by(|a, b| (b.updated_at, &b.id).cmp(&(a.updated_at, &a.id)));
        Ok(Page::from_ordered(items, page))
    }

    async fn config_set_status(
        &self,
        id: &str,
        status: ConfigStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Config>> {
        let Some(mut config) = self.configs.get_mut(id) else {
            return Ok(None);
        };
        config.status = status;
        config.updated_by = actor.to_string();
        config.updated_at = at;
        Ok(Some(config.clone()))
    }

    async fn config_version_append(&self, append: VersionAppend) -> anyhow::Result<AppendOutcome> {
        let Some(mut config) = self.configs.get_mut(&append.config_id) else {
            return Ok(AppendOutcome::NotFound);
        };
        if config.status == ConfigStatus::Archived {
            return Ok(AppendOutcome::ConfigArchived);
        }
        if config.version != append.expected_version {
            return Ok(AppendOutcome::VersionMismatch {
                current: config.version,
            });
        }

        let mut versions = self.versions.entry(append.config_id.clone()).or_default();
        let version = append.version;

        if append.activate {
            for existing in versions.iter_mut().filter(|v| v.is_active) {
                existing.is_active = false;
                existing.status = VersionStatus::Archived;
            }
            config.value = version.value.clone();
            config.active_version = version.version_number;
        }

        config.version = version.version_number;
        if let Some(description) = append.description {
            config.description = Some(description);
        }
        if let Some(tags) = append.tags {
            config.tags = tags;
        }
        config.updated_by = append.updated_by;
        config.updated_at = append.updated_at;
        versions.push(version);

        tracing::debug!(
            collection = collections::CONFIG_VERSIONS,
            config_id = %config.id,
            version = config.version,
            "Appended config version"
        );
        Ok(AppendOutcome::Appended(config.clone()))
    }

    async fn config_version_activate(
        &self,
        config_id: &str,
        version_number: u32,
        actor: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<ActivationOutcome> {
        let Some(mut config) = self.configs.get_mut(config_id) else {
            return Ok(ActivationOutcome::ConfigNotFound);
        };
        if config.status == ConfigStatus::Archived {
            return Ok(ActivationOutcome::ConfigArchived);
        }
        let Some(mut versions) = self.versions.get_mut(config_id) else {
            return Ok(ActivationOutcome::VersionNotFound);
        };
        let Some(target) = versions
            .iter()
            .position(|v| v.version_number == version_number)
        else {
            return Ok(ActivationOutcome::VersionNotFound);
        };

        if versions[target].is_active {
            return Ok(ActivationOutcome::AlreadyActive(config.clone()));
        }
        if versions[target].status == VersionStatus::Archived {
            return Ok(ActivationOutcome::VersionArchived);
        }

        let previous_value = config.value.clone();
        let mut previous_version = None;
        for existing in versions.iter_mut().filter(|v| v.is_active) {
            existing.is_active = false;
            existing.status = VersionStatus::Archived;
            previous_version = Some(existing.version_number);
        }

        let activated = &mut versions[target];
        activated.is_active = true;
        activated.status = VersionStatus::Active;

        config.value = activated.value.clone();
        config.active_version = version_number;
        config.updated_by = actor.to_string();
        config.updated_at = at;

        Ok(ActivationOutcome::Activated {
            config: config.clone(),
            previous_version,
            previous_value,
        })
    }

    async fn config_version_find(
        &self,
        config_id: &str,
        version_number: u32,
    ) -> anyhow::Result<Option<ConfigVersion>> {
        Ok(self.versions.get(config_id).and_then(|versions| {
            versions
                .iter()
                .find(|v| v.version_number == version_number)
                .cloned()
        }))
    }

    async fn config_version_batch(
        &self,
        config_id: &str,
        cursor: HistoryCursor,
        limit: usize,
    ) -> anyhow::Result<Vec<ConfigVersion>> {
        let upper = match cursor {
            HistoryCursor::Done => return Ok(Vec::new()),
            HistoryCursor::Start => u32::MAX,
            HistoryCursor::Before(n) => n,
        };
        let Some(versions) = self.versions.get(config_id) else {
            return Ok(Vec::new());
        };

        let mut batch: Vec<ConfigVersion> = versions
            .iter()
            .filter(|v| cursor == HistoryCursor::Start || v.version_number < upper)
            .cloned()
            .collect();
        batch.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        batch.truncate(limit);
        Ok(batch)
    }
}

#[async_trait]
impl SecretPersistence for MemoryPersistService {
    async fn secret_create(&self, secret: Secret) -> anyhow::Result<bool> {
        match self.secret_index.entry(secret.identity()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                let id = secret.id.clone();
                self.secrets.insert(id.clone(), secret);
                slot.insert(id);
                tracing::debug!(collection = collections::SECRETS, "Inserted secret");
                Ok(true)
            }
        }
    }

    async fn secret_find_by_id(&self, id: &str) -> anyhow::Result<Option<Secret>> {
        Ok(self.secrets.get(id).map(|s| s.clone()))
    }

    async fn secret_find_by_key(
        &self,
        tenant_id: Option<&str>,
        environment: Environment,
        key: &str,
    ) -> anyhow::Result<Option<Secret>> {
        let identity = ResourceIdentity::new(tenant_id, environment, key);
        let Some(id) = self.secret_index.get(&identity).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.secrets.get(&id).map(|s| s.clone()))
    }

    async fn secret_list(
        &self,
        tenant_id: Option<&str>,
        environment: Option<Environment>,
        page: PageRequest,
    ) -> anyhow::Result<Page<Secret>> {
        let mut items: Vec<Secret> = self
            .secrets
            .iter()
            .filter(|s| in_scope(s.tenant(), s.environment, tenant_id, environment))
            .map(|s| s.clone())
            .collect();
        items.sort_by(|a, b| (b.updated_at, &b.id).cmp(&(a.updated_at, &a.id)));
        Ok(Page::from_ordered(items, page))
    }

    async fn secret_update(
        &self,
        secret: Secret,
        expected_version: u32,
    ) -> anyhow::Result<SecretWriteOutcome> {
        let Some(mut stored) = self.secrets.get_mut(&secret.id) else {
            return Ok(SecretWriteOutcome::NotFound);
        };
        if stored.version != expected_version {
            return Ok(SecretWriteOutcome::VersionMismatch {
                current: stored.version,
            });
        }
        *stored = secret;
        Ok(SecretWriteOutcome::Written(stored.clone()))
    }

    async fn secret_record_access(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Secret>> {
        let Some(mut secret) = self.secrets.get_mut(id) else {
            return Ok(None);
        };
        secret.access_count += 1;
        secret.last_accessed_at = Some(at);
        Ok(Some(secret.clone()))
    }

    async fn secret_delete(&self, id: &str) -> anyhow::Result<bool> {
        let Some((_, secret)) = self.secrets.remove(id) else {
            return Ok(false);
        };
        self.secret_index.remove(&secret.identity());
        Ok(true)
    }

    async fn secret_find_auto_rotating(&self) -> anyhow::Result<Vec<Secret>> {
        Ok(self
            .secrets
            .iter()
            .filter(|s| {
                s.rotation_policy == RotationPolicy::Auto && s.status == SecretStatus::Active
            })
            .map(|s| s.clone())
            .collect())
    }

    async fn secret_access_log_insert(&self, entry: SecretAccessLog) -> anyhow::Result<()> {
        self.access_logs.write().push(entry);
        Ok(())
    }

    async fn secret_access_log_page(
        &self,
        secret_id: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<SecretAccessLog>> {
        let items: Vec<SecretAccessLog> = self
            .access_logs
            .read()
            .iter()
            .rev()
            .filter(|log| log.secret_id == secret_id)
            .cloned()
            .collect();
        Ok(Page::from_ordered(items, page))
    }
}

#[async_trait]
impl AuditPersistence for MemoryPersistService {
    async fn audit_insert(&self, entry: AuditLog) -> anyhow::Result<()> {
        self.audit_logs.write().push(entry);
        Ok(())
    }

    async fn audit_page_by_resource(
        &self,
        resource_id: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<AuditLog>> {
        let items: Vec<AuditLog> = self
            .audit_logs
            .read()
            .iter()
            .rev()
            .filter(|log| log.resource_id == resource_id)
            .cloned()
            .collect();
        Ok(Page::from_ordered(items, page))
    }

    async fn audit_page_by_resource_type(
        &self,
        resource_type: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<AuditLog>> {
        let items: Vec<AuditLog> = self
            .audit_logs
            .read()
            .iter()
            .rev()
            .filter(|log| log.resource_type == resource_type)
            .cloned()
            .collect();
        Ok(Page::from_ordered(items, page))
    }
}

#[async_trait]
impl WatchPersistence for MemoryPersistService {
    async fn watch_create(&self, subscription: WatchSubscription) -> anyhow::Result<bool> {
        match self
            .subscriber_index
            .entry(subscription.subscriber_id.clone())
        {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                let id = subscription.id.clone();
                self.watches.insert(id.clone(), subscription);
                slot.insert(id);
                tracing::debug!(
                    collection = collections::WATCH_SUBSCRIPTIONS,
                    "Inserted subscription"
                );
                Ok(true)
            }
        }
    }

    async fn watch_find_by_id(&self, id: &str) -> anyhow::Result<Option<WatchSubscription>> {
        Ok(self.watches.get(id).map(|w| w.clone()))
    }

    async fn watch_find_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> anyhow::Result<Option<WatchSubscription>> {
        let Some(id) = self.subscriber_index.get(subscriber_id).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.watches.get(&id).map(|w| w.clone()))
    }

    async fn watch_list(&self, page: PageRequest) -> anyhow::Result<Page<WatchSubscription>> {
        let mut items: Vec<WatchSubscription> = self.watches.iter().map(|w| w.clone()).collect();
        items.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        Ok(Page::from_ordered(items, page))
    }

    async fn watch_find_active(&self) -> anyhow::Result<Vec<WatchSubscription>> {
        Ok(self
            .watches
            .iter()
            .filter(|w| w.is_active())
            .map(|w| w.clone())
            .collect())
    }

    async fn watch_replace(&self, subscription: WatchSubscription) -> anyhow::Result<bool> {
        let Some(mut stored) = self.watches.get_mut(&subscription.id) else {
            return Ok(false);
        };
        *stored = subscription;
        Ok(true)
    }

    async fn watch_delete(&self, id: &str) -> anyhow::Result<bool> {
        let Some((_, subscription)) = self.watches.remove(id) else {
            return Ok(false);
        };
        self.subscriber_index.remove(&subscription.subscriber_id);
        Ok(true)
    }

    async fn watch_record_success(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<WatchSubscription>> {
        let Some(mut subscription) = self.watches.get_mut(id) else {
            return Ok(None);
        };
        subscription.failure_count = 0;
        subscription.last_notified = Some(at);
        subscription.updated_at = at;
        Ok(Some(subscription.clone()))
    }

    async fn watch_record_failure(
        &self,
        id: &str,
        threshold: u32,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<WatchSubscription>> {
        let Some(mut subscription) = self.watches.get_mut(id) else {
            return Ok(None);
        };
        subscription.failure_count = subscription.failure_count.saturating_add(1);
        if subscription.failure_count >= threshold && subscription.status == WatchStatus::Active {
            subscription.status = WatchStatus::Paused;
        }
        subscription.updated_at = at;
        Ok(Some(subscription.clone()))
    }
}

#[async_trait]
impl PersistenceService for MemoryPersistService {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

