//! Versioned config store
//!
//! Writes follow a fixed order: validate everything, commit the atomic
//! storage primitive, append the audit record, drop the cache entry, emit the
//! change event. Updates stage a draft version; the served value only moves
//! on activation or rollback.

use std::sync::Arc;
use std::time::Duration;

use tamarind_common::{
    Clock, Environment, Result, SystemClock, TamarindError, actor_or_system, cache_key,
    normalize_tenant, validate_key, with_deadline,
};
use tamarind_persistence::cache::NEGATIVE_MARKER;
use tamarind_persistence::entity::{
    AuditLog, Config, ConfigStatus, ConfigValue, ConfigVersion, VersionStatus,
};
use tamarind_persistence::{
    ActivationOutcome, AppendOutcome, CacheService, ConfigPersistence, Page, PageRequest,
    VersionAppend,
};

use super::audit::{AuditLogBuilder, AuditLogEntry, AuditRecorder, action, resource};
use super::emitter::ChangeEmitter;
use super::history::VersionHistory;
use crate::model::{
    ChangeType, ConfigChangeNotification, CreateConfigRequest, ListQuery, UpdateConfigRequest,
    VersionComparison, diff_values,
};

/// Cache namespace for config entries
pub const CONFIG_CACHE_KIND: &str = "config";

#[derive(Clone, Debug)]
pub struct ConfigStoreOptions {
    pub cache_ttl: Duration,
    pub negative_cache_ttl: Duration,
    pub storage_timeout: Duration,
    pub history_batch_size: usize,
}

impl Default for ConfigStoreOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            negative_cache_ttl: Duration::from_secs(60),
            storage_timeout: Duration::from_secs(5),
            history_batch_size: 50,
        }
    }
}

pub struct ConfigVersionStore {
    persistence: Arc<dyn ConfigPersistence>,
    audit: AuditRecorder,
    cache: Arc<dyn CacheService>,
    emitter: ChangeEmitter,
    clock: Arc<dyn Clock>,
    options: ConfigStoreOptions,
}

impl ConfigVersionStore {
    pub fn new(
        persistence: Arc<dyn ConfigPersistence>,
        audit: AuditRecorder,
        cache: Arc<dyn CacheService>,
        emitter: ChangeEmitter,
    ) -> Self {
        Self {
            persistence,
            audit,
            cache,
            emitter,
            clock: Arc::new(SystemClock),
            options: ConfigStoreOptions::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: ConfigStoreOptions) -> Self {
        self.options = options;
        self
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Create a config with version 1 as its active version
    pub async fn create(&self, form: CreateConfigRequest, actor: Option<&str>) -> Result<Config> {
        validate_key("config_key", &form.config_key)?;
        let environment: Environment = form.environment.parse()?;
        let tenant_id = normalize_tenant(form.tenant_id.as_deref())?;
        let status = match form.status.as_deref() {
            Some(s) => s.parse()?,
            None => ConfigStatus::Active,
        };
        let actor = actor_or_system(actor);
        let now = self.clock.now();

        let config = Config {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            config_key: form.config_key,
            environment,
            value: form.value,
            version: 1,
            active_version: 1,
            status,
            description: form.description,
            tags: form.tags,
            metadata: form.metadata,
            created_at: now,
            updated_at: now,
            created_by: actor.clone(),
            updated_by: actor.clone(),
        };
        let first_version = ConfigVersion {
            id: uuid::Uuid::new_v4().to_string(),
            config_id: config.id.clone(),
            config_key: config.config_key.clone(),
            tenant_id: config.tenant_id.clone(),
            environment,
            version_number: 1,
            value: config.value.clone(),
            change_reason: Some("initial version".to_string()),
            status: VersionStatus::Active,
            is_active: true,
            validation_error: None,
            created_at: now,
            created_by: actor.clone(),
        };
        let audit = self
            .audit_entry(&config, action::CREATE, &actor)
            .new_value(Some(config.value.clone()))
            .detail("version", 1)
            .build();
        audit.validate()?;

        let created = with_deadline(
            self.options.storage_timeout,
            "config_create",
            self.persistence
                .config_create(config.clone(), first_version),
        )
        .await?;
        if !created {
            return Err(TamarindError::conflict(format!(
                "config '{}' already exists in {}",
                config.config_key, config.environment
            )));
        }

        tracing::info!(
            config_id = %config.id,
            config_key = %config.config_key,
            environment = %config.environment,
            "Created config"
        );
        self.after_write(&config, audit, action::CREATE).await;
        self.emitter.emit(ConfigChangeNotification::for_config(
            &config,
            ChangeType::Create,
            None,
            Some(config.value.clone()),
            1,
            &actor,
            now,
        ));
        Ok(config)
    }

    /// Stage a new draft version without changing the served value
    pub async fn update(
        &self,
        config_id: &str,
        form: UpdateConfigRequest,
        actor: Option<&str>,
    ) -> Result<Config> {
        let current = self.get_by_id(config_id).await?;
        if current.status == ConfigStatus::Archived {
            return Err(config_archived(&current.config_key));
        }
        let actor = actor_or_system(actor);
        let now = self.clock.now();
        let version_number = current.version + 1;

        let draft = self.new_version(
            &current,
            version_number,
            form.value,
            form.change_reason,
            VersionStatus::Draft,
            &actor,
        );
        let audit = self
            .audit_entry(&current, action::UPDATE, &actor)
            .old_value(Some(current.value.clone()))
            .new_value(Some(draft.value.clone()))
            .detail("version", version_number)
            .detail("active_version", current.active_version)
            .build();
        audit.validate()?;

        let new_value = draft.value.clone();
        let append = VersionAppend {
            config_id: current.id.clone(),
            expected_version: current.version,
            version: draft,
            activate: false,
            description: form.description,
            tags: form.tags,
            updated_by: actor.clone(),
            updated_at: now,
        };
        let config = self.commit_append(append).await?;

        tracing::info!(
            config_id = %config.id,
            version = version_number,
            "Staged config version"
        );
        self.after_write(&config, audit, action::UPDATE).await;
        self.emitter.emit(
            ConfigChangeNotification::for_config(
                &config,
                ChangeType::Update,
                Some(current.value),
                Some(new_value),
                version_number,
                &actor,
                now,
            )
            .with_metadata("staged", "true"),
        );
        Ok(config)
    }

    /// Make `version_number` the served version
    ///
    /// Activating the version that is already active leaves state untouched
    /// and writes a single audit record.
    pub async fn activate_version(
        &self,
        config_id: &str,
        version_number: u32,
        actor: Option<&str>,
    ) -> Result<Config> {
        if version_number == 0 {
            return Err(TamarindError::validation("version number must be at least 1"));
        }
        let actor = actor_or_system(actor);
        let now = self.clock.now();

        let outcome = with_deadline(
            self.options.storage_timeout,
            "config_version_activate",
            self.persistence
                .config_version_activate(config_id, version_number, &actor, now),
        )
        .await?;

        match outcome {
            ActivationOutcome::ConfigNotFound => Err(config_not_found(config_id)),
            ActivationOutcome::ConfigArchived => Err(config_archived(config_id)),
            ActivationOutcome::VersionNotFound => Err(version_not_found(config_id, version_number)),
            ActivationOutcome::VersionArchived => Err(TamarindError::validation(format!(
                "version {} is archived; roll back to restore it",
                version_number
            ))),
            ActivationOutcome::AlreadyActive(config) => {
                let audit = self
                    .audit_entry(&config, action::ACTIVATE, &actor)
                    .detail("version", version_number)
                    .detail("noop", true)
                    .build();
                self.audit.record(audit).await;
                metrics::counter!("config_mutations_total", "action" => action::ACTIVATE)
                    .increment(1);
                Ok(config)
            }
            ActivationOutcome::Activated {
                config,
                previous_version,
                previous_value,
            } => {
                let mut audit = self
                    .audit_entry(&config, action::ACTIVATE, &actor)
                    .old_value(Some(previous_value.clone()))
                    .new_value(Some(config.value.clone()))
                    .detail("version", version_number);
                if let Some(previous) = previous_version {
                    audit = audit.detail("previous_version", previous);
                }

                tracing::info!(
                    config_id = %config.id,
                    version = version_number,
                    previous_version = ?previous_version,
                    "Activated config version"
                );
                self.after_write(&config, audit.build(), action::ACTIVATE)
                    .await;
                self.emitter.emit(ConfigChangeNotification::for_config(
                    &config,
                    ChangeType::Activate,
                    Some(previous_value),
                    Some(config.value.clone()),
                    version_number,
                    &actor,
                    now,
                ));
                Ok(config)
            }
        }
    }

    /// Append a copy of an earlier version and activate it
    pub async fn rollback(
        &self,
        config_id: &str,
        target_version: u32,
        actor: Option<&str>,
    ) -> Result<Config> {
        let current = self.get_by_id(config_id).await?;
        if current.status == ConfigStatus::Archived {
            return Err(config_archived(&current.config_key));
        }
        let target = self.get_version(config_id, target_version).await?;
        let actor = actor_or_system(actor);
        let now = self.clock.now();
        let version_number = current.version + 1;

        let restored = self.new_version(
            &current,
            version_number,
            target.value.clone(),
            Some(format!("rollback to version {}", target_version)),
            VersionStatus::Active,
            &actor,
        );
        let audit = self
            .audit_entry(&current, action::ROLLBACK, &actor)
            .old_value(Some(current.value.clone()))
            .new_value(Some(target.value.clone()))
            .detail("version", version_number)
            .detail("target_version", target_version)
            .detail("previous_version", current.active_version)
            .build();
        audit.validate()?;

        let append = VersionAppend {
            config_id: current.id.clone(),
            expected_version: current.version,
            version: restored,
            activate: true,
            description: None,
            tags: None,
            updated_by: actor.clone(),
            updated_at: now,
        };
        let config = self.commit_append(append).await?;

        tracing::info!(
            config_id = %config.id,
            target_version,
            version = version_number,
            "Rolled back config"
        );
        self.after_write(&config, audit, action::ROLLBACK).await;
        self.emitter.emit(
            ConfigChangeNotification::for_config(
                &config,
                ChangeType::Rollback,
                Some(current.value),
                Some(config.value.clone()),
                version_number,
                &actor,
                now,
            )
            .with_metadata("target_version", target_version.to_string()),
        );
        Ok(config)
    }

    /// Logically delete a config by archiving it
    pub async fn delete(&self, config_id: &str, actor: Option<&str>) -> Result<Config> {
        let current = self.get_by_id(config_id).await?;
        let actor = actor_or_system(actor);
        let now = self.clock.now();

        let audit = self
            .audit_entry(&current, action::DELETE, &actor)
            .old_value(Some(current.value.clone()))
            .build();
        audit.validate()?;

        let config = with_deadline(
            self.options.storage_timeout,
            "config_set_status",
            self.persistence
                .config_set_status(config_id, ConfigStatus::Archived, &actor, now),
        )
        .await?
        .ok_or_else(|| config_not_found(config_id))?;

        tracing::info!(config_id = %config.id, "Archived config");
        self.after_write(&config, audit, action::DELETE).await;
        self.emitter.emit(ConfigChangeNotification::for_config(
            &config,
            ChangeType::Delete,
            Some(current.value),
            None,
            config.version,
            &actor,
            now,
        ));
        Ok(config)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get_by_id(&self, config_id: &str) -> Result<Config> {
        with_deadline(
            self.options.storage_timeout,
            "config_find_by_id",
            self.persistence.config_find_by_id(config_id),
        )
        .await?
        .ok_or_else(|| config_not_found(config_id))
    }

    /// Read-through lookup of the served config
    ///
    /// Misses are cached as a negative marker for a short TTL. Archived
    /// configs are reported as not found.
    pub async fn get_by_key(
        &self,
        tenant_id: Option<&str>,
        environment: &str,
        key: &str,
    ) -> Result<Config> {
        validate_key("config_key", key)?;
        let environment: Environment = environment.parse()?;
        let tenant_id = normalize_tenant(tenant_id)?;
        let cache_key = cache_key(CONFIG_CACHE_KIND, tenant_id.as_deref(), environment, key);

        match self.cache.get(&cache_key).await {
            Ok(Some(cached)) if cached == NEGATIVE_MARKER => {
                metrics::counter!("cache_hits_total").increment(1);
                return Err(TamarindError::not_found(format!("config '{}'", key)));
            }
            Ok(Some(cached)) => match serde_json::from_str::<Config>(&cached) {
                Ok(config) => {
                    metrics::counter!("cache_hits_total").increment(1);
                    return Ok(config);
                }
                Err(e) => {
                    tracing::warn!(cache_key = %cache_key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(cache_key = %cache_key, error = %e, "Cache read failed");
            }
        }
        metrics::counter!("cache_misses_total").increment(1);

        let found = with_deadline(
            self.options.storage_timeout,
            "config_find_by_key",
            self.persistence
                .config_find_by_key(tenant_id.as_deref(), environment, key),
        )
        .await?
        .filter(|c| c.status != ConfigStatus::Archived);

        let Some(config) = found else {
            self.cache_put(&cache_key, NEGATIVE_MARKER.to_string(), self.options.negative_cache_ttl)
                .await;
            return Err(TamarindError::not_found(format!("config '{}'", key)));
        };

        match serde_json::to_string(&config) {
            Ok(encoded) => {
                self.cache_put(&cache_key, encoded, self.options.cache_ttl)
                    .await
            }
            Err(e) => tracing::warn!(config_id = %config.id, error = %e, "Config not cacheable"),
        }
        Ok(config)
    }

    pub async fn list(&self, query: ListQuery) -> Result<Page<Config>> {
        let tenant_id = normalize_tenant(query.tenant_id.as_deref())?;
        let environment = query
            .environment
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(str::parse::<Environment>)
            .transpose()?;

        with_deadline(
            self.options.storage_timeout,
            "config_list",
            self.persistence.config_list(
                tenant_id.as_deref(),
                environment,
                PageRequest::new(query.page, query.per_page),
            ),
        )
        .await
    }

    pub async fn get_version(&self, config_id: &str, version_number: u32) -> Result<ConfigVersion> {
        with_deadline(
            self.options.storage_timeout,
            "config_version_find",
            self.persistence
                .config_version_find(config_id, version_number),
        )
        .await?
        .ok_or_else(|| version_not_found(config_id, version_number))
    }

    /// Lazy newest-first history of a config
    pub async fn get_history(&self, config_id: &str) -> Result<VersionHistory> {
        self.get_by_id(config_id).await?;
        Ok(VersionHistory::new(
            self.persistence.clone(),
            config_id.to_string(),
            self.options.history_batch_size,
            self.options.storage_timeout,
        ))
    }

    pub async fn compare_versions(
        &self,
        config_id: &str,
        from_version: u32,
        to_version: u32,
    ) -> Result<VersionComparison> {
        let from = self.get_version(config_id, from_version).await?;
        let to = self.get_version(config_id, to_version).await?;
        let diff = diff_values(&from.value, &to.value);
        Ok(VersionComparison {
            config_id: config_id.to_string(),
            from,
            to,
            diff,
        })
    }

    pub async fn get_audit_logs(
        &self,
        config_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<Page<AuditLog>> {
        self.audit.query(config_id, page, per_page).await
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn audit_entry(&self, config: &Config, action: &str, actor: &str) -> AuditLogBuilder {
        AuditLogEntry::builder()
            .resource_type(resource::CONFIG)
            .resource_id(config.id.clone())
            .resource_key(config.config_key.clone())
            .tenant_id(config.tenant())
            .environment(config.environment)
            .action(action)
            .actor(actor)
    }

    fn new_version(
        &self,
        config: &Config,
        version_number: u32,
        value: ConfigValue,
        change_reason: Option<String>,
        status: VersionStatus,
        actor: &str,
    ) -> ConfigVersion {
        ConfigVersion {
            id: uuid::Uuid::new_v4().to_string(),
            config_id: config.id.clone(),
            config_key: config.config_key.clone(),
            tenant_id: config.tenant_id.clone(),
            environment: config.environment,
            version_number,
            value,
            change_reason,
            status,
            is_active: status == VersionStatus::Active,
            validation_error: None,
            created_at: self.clock.now(),
            created_by: actor.to_string(),
        }
    }

    async fn commit_append(&self, append: VersionAppend) -> Result<Config> {
        let config_id = append.config_id.clone();
        let outcome = with_deadline(
            self.options.storage_timeout,
            "config_version_append",
            self.persistence.config_version_append(append),
        )
        .await?;

        match outcome {
            AppendOutcome::Appended(config) => Ok(config),
            AppendOutcome::NotFound => Err(config_not_found(&config_id)),
            AppendOutcome::ConfigArchived => Err(config_archived(&config_id)),
            AppendOutcome::VersionMismatch { current } => {
                tracing::warn!(config_id = %config_id, current, "Concurrent config modification");
                Err(TamarindError::conflict(format!(
                    "config '{}' was modified concurrently (now at version {})",
                    config_id, current
                )))
            }
        }
    }

    /// Audit, invalidate and count a committed write
    async fn after_write(&self, config: &Config, audit: AuditLogEntry, action: &'static str) {
        self.audit.record(audit).await;
        self.invalidate(config).await;
        metrics::counter!("config_mutations_total", "action" => action).increment(1);
    }

    async fn invalidate(&self, config: &Config) {
        let key = cache_key(
            CONFIG_CACHE_KIND,
            config.tenant(),
            config.environment,
            &config.config_key,
        );
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!(cache_key = %key, error = %e, "Cache invalidation failed");
        }
    }

    async fn cache_put(&self, key: &str, value: String, ttl: Duration) {
        if let Err(e) = self.cache.set(key, value, ttl).await {
            tracing::warn!(cache_key = %key, error = %e, "Cache write failed");
        }
    }
}

fn config_not_found(config_id: &str) -> TamarindError {
    TamarindError::not_found(format!("config '{}'", config_id))
}

fn config_archived(config: &str) -> TamarindError {
    TamarindError::validation(format!("config '{}' is archived", config))
}

fn version_not_found(config_id: &str, version_number: u32) -> TamarindError {
    TamarindError::not_found(format!(
        "version {} of config '{}'",
        version_number, config_id
    ))
}
