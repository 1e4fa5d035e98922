//! Secret vault
//!
//! Secrets are encrypted before they reach storage and are never cached.
//! Every attempted operation leaves a [`SecretAccessLog`] row; mutations
//! additionally write a masked audit record.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tamarind_common::{
    Clock, Encryptor, Environment, MASKED_VALUE, Result, SystemClock, TamarindError,
    actor_or_system, normalize_tenant, validate_key, with_deadline,
};
use tamarind_persistence::entity::{
    AuditLog, ConfigValue, RotationPolicy, Secret, SecretAccessLog, SecretAction, SecretStatus,
    SecretView,
};
use tamarind_persistence::{Page, PageRequest, SecretPersistence, SecretWriteOutcome};

use super::audit::{AuditLogBuilder, AuditLogEntry, AuditRecorder, action, resource};
use super::emitter::ChangeEmitter;
use crate::model::{
    ChangeType, ConfigChangeNotification, CreateSecretRequest, ListQuery, SecretLookup,
};

/// Decrypted secret returned by [`SecretVault::get_by_key`]
#[derive(Clone)]
pub struct RevealedSecret {
    pub secret: SecretView,
    pub value: String,
}

impl fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealedSecret")
            .field("secret", &self.secret)
            .field("value", &MASKED_VALUE)
            .finish()
    }
}

/// Who a secret access log row is about
struct AccessTarget<'a> {
    secret_id: &'a str,
    secret_key: &'a str,
    tenant_id: Option<&'a str>,
    environment: Environment,
}

impl<'a> From<&'a Secret> for AccessTarget<'a> {
    fn from(secret: &'a Secret) -> Self {
        Self {
            secret_id: &secret.id,
            secret_key: &secret.secret_key,
            tenant_id: secret.tenant(),
            environment: secret.environment,
        }
    }
}

fn masked() -> Option<ConfigValue> {
    Some(ConfigValue::Text(MASKED_VALUE.to_string()))
}

pub struct SecretVault {
    persistence: Arc<dyn SecretPersistence>,
    encryptor: Arc<Encryptor>,
    audit: AuditRecorder,
    emitter: ChangeEmitter,
    clock: Arc<dyn Clock>,
    storage_timeout: Duration,
}

impl SecretVault {
    pub fn new(
        persistence: Arc<dyn SecretPersistence>,
        encryptor: Arc<Encryptor>,
        audit: AuditRecorder,
        emitter: ChangeEmitter,
    ) -> Self {
        Self {
            persistence,
            encryptor,
            audit,
            emitter,
            clock: Arc::new(SystemClock),
            storage_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    pub async fn create(
        &self,
        form: CreateSecretRequest,
        actor: Option<&str>,
    ) -> Result<SecretView> {
        validate_key("secret_key", &form.secret_key)?;
        let environment: Environment = form.environment.parse()?;
        let tenant_id = normalize_tenant(form.tenant_id.as_deref())?;
        let rotation_policy = match form.rotation_policy.as_deref() {
            Some(p) => p.parse()?,
            None => RotationPolicy::Manual,
        };
        if rotation_policy == RotationPolicy::Auto && form.rotation_days == 0 {
            return Err(TamarindError::validation(
                "rotation_days must be positive for auto rotation",
            ));
        }
        let actor = actor_or_system(actor);
        let now = self.clock.now();
        if form.expires_at.is_some_and(|at| at <= now) {
            return Err(TamarindError::validation("expires_at must be in the future"));
        }

        let encrypted_value = self.encryptor.encrypt(&form.value)?;
        let secret = Secret {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            secret_key: form.secret_key,
            environment,
            encrypted_value,
            encryption_key_id: self.encryptor.key_id().to_string(),
            description: form.description,
            rotation_policy,
            rotation_days: form.rotation_days,
            last_rotated_at: None,
            expires_at: form.expires_at,
            status: SecretStatus::Active,
            version: 1,
            metadata: form.metadata,
            access_count: 0,
            last_accessed_at: None,
            created_at: now,
            updated_at: now,
            created_by: actor.clone(),
            updated_by: actor.clone(),
        };
        let audit = self
            .audit_entry(&secret, action::CREATE, &actor)
            .new_value(masked())
            .detail("version", 1)
            .build();
        audit.validate()?;

        let created = with_deadline(
            self.storage_timeout,
            "secret_create",
            self.persistence.secret_create(secret.clone()),
        )
        .await?;
        if !created {
            self.log_access(
                (&secret).into(),
                SecretAction::Create,
                Err("secret already exists"),
                &actor,
                None,
            )
            .await;
            return Err(TamarindError::conflict(format!(
                "secret '{}' already exists in {}",
                secret.secret_key, secret.environment
            )));
        }

        tracing::info!(
            secret_id = %secret.id,
            secret_key = %secret.secret_key,
            environment = %secret.environment,
            "Created secret"
        );
        self.log_access((&secret).into(), SecretAction::Create, Ok(()), &actor, None)
            .await;
        self.audit.record(audit).await;
        self.emitter.emit(ConfigChangeNotification::for_secret(
            &secret,
            ChangeType::Create,
            &actor,
            now,
        ));
        Ok(SecretView::from(secret))
    }

    /// Decrypting read
    ///
    /// Missing and expired secrets are `NotFound`. A ciphertext that fails
    /// to decrypt is logged and reported as a generic `Internal` error.
    pub async fn get_by_key(
        &self,
        lookup: SecretLookup,
        actor: Option<&str>,
    ) -> Result<RevealedSecret> {
        validate_key("secret_key", &lookup.secret_key)?;
        let environment: Environment = lookup.environment.parse()?;
        let tenant_id = normalize_tenant(lookup.tenant_id.as_deref())?;
        let actor = actor_or_system(actor);
        let service_name = lookup.service_name.as_deref();
        let now = self.clock.now();

        let found = with_deadline(
            self.storage_timeout,
            "secret_find_by_key",
            self.persistence.secret_find_by_key(
                tenant_id.as_deref(),
                environment,
                &lookup.secret_key,
            ),
        )
        .await?;

        let Some(secret) = found else {
            let target = AccessTarget {
                secret_id: "",
                secret_key: &lookup.secret_key,
                tenant_id: tenant_id.as_deref(),
                environment,
            };
            self.log_access(target, SecretAction::Read, Err("secret not found"), &actor, service_name)
                .await;
            return Err(TamarindError::not_found(format!(
                "secret '{}'",
                lookup.secret_key
            )));
        };

        if secret.is_expired(now) {
            self.log_access(
                (&secret).into(),
                SecretAction::Read,
                Err("secret expired"),
                &actor,
                service_name,
            )
            .await;
            return Err(TamarindError::not_found(format!(
                "secret '{}'",
                lookup.secret_key
            )));
        }

        let value = match self.encryptor.decrypt(&secret.encrypted_value) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    secret_id = %secret.id,
                    key_id = %secret.encryption_key_id,
                    error = %e,
                    "Secret decryption failed"
                );
                self.log_access(
                    (&secret).into(),
                    SecretAction::Read,
                    Err("decryption failed"),
                    &actor,
                    service_name,
                )
                .await;
                return Err(TamarindError::internal("failed to read secret"));
            }
        };

        let recorded = with_deadline(
            self.storage_timeout,
            "secret_record_access",
            self.persistence.secret_record_access(&secret.id, now),
        )
        .await?;
        let accessed = recorded.unwrap_or(secret);

        self.log_access(
            (&accessed).into(),
            SecretAction::Read,
            Ok(()),
            &actor,
            service_name,
        )
        .await;
        Ok(RevealedSecret {
            secret: SecretView::from(accessed),
            value,
        })
    }

    /// Masked lookup by id
    pub async fn get_by_id(&self, secret_id: &str) -> Result<SecretView> {
        self.find(secret_id).await.map(SecretView::from)
    }

    pub async fn list(&self, query: ListQuery) -> Result<Page<SecretView>> {
        let tenant_id = normalize_tenant(query.tenant_id.as_deref())?;
        let environment = query
            .environment
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(str::parse::<Environment>)
            .transpose()?;

        let page = with_deadline(
            self.storage_timeout,
            "secret_list",
            self.persistence.secret_list(
                tenant_id.as_deref(),
                environment,
                PageRequest::new(query.page, query.per_page),
            ),
        )
        .await?;
        Ok(page.map(SecretView::from))
    }

    /// Replace the value, bumping the version
    pub async fn update(
        &self,
        secret_id: &str,
        new_value: &str,
        actor: Option<&str>,
    ) -> Result<SecretView> {
        self.replace_value(secret_id, new_value, actor, SecretAction::Update)
            .await
    }

    /// Replace the value and stamp `last_rotated_at`
    pub async fn rotate(
        &self,
        secret_id: &str,
        new_value: &str,
        actor: Option<&str>,
    ) -> Result<SecretView> {
        self.replace_value(secret_id, new_value, actor, SecretAction::Rotate)
            .await
    }

    pub async fn delete(&self, secret_id: &str, actor: Option<&str>) -> Result<()> {
        let secret = self.find(secret_id).await?;
        let actor = actor_or_system(actor);
        let now = self.clock.now();

        let audit = self
            .audit_entry(&secret, action::DELETE, &actor)
            .old_value(masked())
            .detail("version", secret.version)
            .build();
        audit.validate()?;

        let deleted = with_deadline(
            self.storage_timeout,
            "secret_delete",
            self.persistence.secret_delete(secret_id),
        )
        .await?;
        if !deleted {
            return Err(TamarindError::not_found(format!("secret '{}'", secret_id)));
        }

        tracing::info!(secret_id = %secret.id, "Deleted secret");
        self.log_access((&secret).into(), SecretAction::Delete, Ok(()), &actor, None)
            .await;
        self.audit.record(audit).await;
        self.emitter.emit(ConfigChangeNotification::for_secret(
            &secret,
            ChangeType::Delete,
            &actor,
            now,
        ));
        Ok(())
    }

    /// Auto-rotating secrets whose rotation interval has elapsed
    pub async fn get_secrets_needing_rotation(&self) -> Result<Vec<SecretView>> {
        let now = self.clock.now();
        let candidates = with_deadline(
            self.storage_timeout,
            "secret_find_auto_rotating",
            self.persistence.secret_find_auto_rotating(),
        )
        .await?;

        let mut due: Vec<SecretView> = candidates
            .iter()
            .filter(|s| s.is_rotation_due(now))
            .map(SecretView::from)
            .collect();
        due.sort_by(|a, b| a.secret_key.cmp(&b.secret_key));
        Ok(due)
    }

    pub async fn get_access_logs(
        &self,
        secret_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<Page<SecretAccessLog>> {
        with_deadline(
            self.storage_timeout,
            "secret_access_log_page",
            self.persistence
                .secret_access_log_page(secret_id, PageRequest::new(page, per_page)),
        )
        .await
    }

    pub async fn get_audit_logs(
        &self,
        secret_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<Page<AuditLog>> {
        self.audit.query(secret_id, page, per_page).await
    }

    async fn find(&self, secret_id: &str) -> Result<Secret> {
        with_deadline(
            self.storage_timeout,
            "secret_find_by_id",
            self.persistence.secret_find_by_id(secret_id),
        )
        .await?
        .ok_or_else(|| TamarindError::not_found(format!("secret '{}'", secret_id)))
    }

    async fn replace_value(
        &self,
        secret_id: &str,
        new_value: &str,
        actor: Option<&str>,
        access: SecretAction,
    ) -> Result<SecretView> {
        let current = self.find(secret_id).await?;
        let actor = actor_or_system(actor);
        let now = self.clock.now();
        let rotating = access == SecretAction::Rotate;

        if current.is_expired(now) {
            self.log_access((&current).into(), access, Err("secret expired"), &actor, None)
                .await;
            return Err(TamarindError::validation(format!(
                "secret '{}' is expired",
                current.secret_key
            )));
        }

        let encrypted_value = match self.encryptor.encrypt(new_value) {
            Ok(v) => v,
            Err(e) => {
                self.log_access((&current).into(), access, Err("invalid value"), &actor, None)
                    .await;
                return Err(e);
            }
        };

        let mut next = current.clone();
        next.encrypted_value = encrypted_value;
        next.encryption_key_id = self.encryptor.key_id().to_string();
        next.version = current.version + 1;
        next.updated_at = now;
        next.updated_by = actor.clone();
        if rotating {
            // Rotated is transient: the single write lands back at Active
            next.last_rotated_at = Some(now);
            next.status = SecretStatus::Active;
        }

        let audit_action = if rotating {
            action::ROTATE
        } else {
            action::UPDATE
        };
        let mut audit = self
            .audit_entry(&current, audit_action, &actor)
            .old_value(masked())
            .new_value(masked())
            .detail("version", next.version);
        if rotating {
            audit = audit.detail(
                "status_transition",
                format!(
                    "{}->{}->{}",
                    current.status.as_str(),
                    SecretStatus::Rotated.as_str(),
                    SecretStatus::Active.as_str()
                ),
            );
        }
        let audit = audit.build();
        audit.validate()?;

        let written = match self.commit(next, current.version).await {
            Ok(written) => written,
            Err(e) => {
                self.log_access((&current).into(), access, Err("write failed"), &actor, None)
                    .await;
                return Err(e);
            }
        };

        tracing::info!(
            secret_id = %written.id,
            version = written.version,
            action = %access,
            "Replaced secret value"
        );
        self.log_access((&written).into(), access, Ok(()), &actor, None)
            .await;
        self.audit.record(audit).await;
        let change_type = if rotating {
            ChangeType::Rotate
        } else {
            ChangeType::Update
        };
        self.emitter.emit(ConfigChangeNotification::for_secret(
            &written,
            change_type,
            &actor,
            now,
        ));
        Ok(SecretView::from(written))
    }

    async fn commit(&self, secret: Secret, expected_version: u32) -> Result<Secret> {
        let secret_id = secret.id.clone();
        let outcome = with_deadline(
            self.storage_timeout,
            "secret_update",
            self.persistence.secret_update(secret, expected_version),
        )
        .await?;

        match outcome {
            SecretWriteOutcome::Written(secret) => Ok(secret),
            SecretWriteOutcome::NotFound => {
                Err(TamarindError::not_found(format!("secret '{}'", secret_id)))
            }
            SecretWriteOutcome::VersionMismatch { current } => {
                Err(TamarindError::conflict(format!(
                    "secret '{}' was modified concurrently (now at version {})",
                    secret_id, current
                )))
            }
        }
    }

    fn audit_entry(&self, secret: &Secret, action: &str, actor: &str) -> AuditLogBuilder {
        AuditLogEntry::builder()
            .resource_type(resource::SECRET)
            .resource_id(secret.id.clone())
            .resource_key(secret.secret_key.clone())
            .tenant_id(secret.tenant())
            .environment(secret.environment)
            .action(action)
            .actor(actor)
    }

    /// Best-effort access log append
    async fn log_access(
        &self,
        target: AccessTarget<'_>,
        action: SecretAction,
        outcome: std::result::Result<(), &str>,
        actor: &str,
        service_name: Option<&str>,
    ) {
        let entry = SecretAccessLog {
            id: uuid::Uuid::new_v4().to_string(),
            secret_id: target.secret_id.to_string(),
            secret_key: target.secret_key.to_string(),
            tenant_id: target.tenant_id.map(str::to_string),
            environment: target.environment,
            actor: actor.to_string(),
            service_name: service_name.map(str::to_string),
            action,
            success: outcome.is_ok(),
            fail_reason: outcome.err().map(str::to_string),
            timestamp: self.clock.now(),
        };
        let label = if entry.success { "success" } else { "failure" };
        metrics::counter!(
            "secret_access_total",
            "action" => action.as_str(),
            "outcome" => label
        )
        .increment(1);

        if let Err(e) = with_deadline(
            self.storage_timeout,
            "secret_access_log_insert",
            self.persistence.secret_access_log_insert(entry),
        )
        .await
        {
            tracing::error!(
                secret_key = %target.secret_key,
                action = %action,
                error = %e,
                "Failed to write secret access log"
            );
        }
    }
}
