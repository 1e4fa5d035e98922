//! Shared fixtures for the config crate integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tamarind_common::{Encryptor, Environment, ManualClock, Result, TamarindError};
use tamarind_config::service::ChangeEmitter;
use tamarind_config::watch::{DispatcherOptions, NotificationDispatcher, RetryPolicy, WebhookClient};
use tamarind_config::{AuditRecorder, ConfigChangeNotification, ConfigVersionStore, SecretVault};
use tamarind_persistence::entity::{Secret, SecretAccessLog};
use tamarind_persistence::{
    MemoryPersistService, MokaCacheService, Page, PageRequest, SecretPersistence,
    SecretWriteOutcome,
};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub persistence: Arc<MemoryPersistService>,
    pub cache: Arc<MokaCacheService>,
    pub clock: Arc<ManualClock>,
    pub audit: AuditRecorder,
}

impl Harness {
    pub fn new() -> Self {
        let persistence = Arc::new(MemoryPersistService::default());
        let clock = Arc::new(ManualClock::new(epoch()));
        let audit = AuditRecorder::new(persistence.clone(), clock.clone(), Duration::from_secs(1));
        Self {
            persistence,
            cache: Arc::new(MokaCacheService::default()),
            clock,
            audit,
        }
    }

    pub fn store(&self, emitter: ChangeEmitter) -> ConfigVersionStore {
        ConfigVersionStore::new(
            self.persistence.clone(),
            self.audit.clone(),
            self.cache.clone(),
            emitter,
        )
        .with_clock(self.clock.clone())
    }

    pub fn vault(&self, encryptor: Encryptor, emitter: ChangeEmitter) -> SecretVault {
        SecretVault::new(
            self.persistence.clone(),
            Arc::new(encryptor),
            self.audit.clone(),
            emitter,
        )
        .with_clock(self.clock.clone())
    }

    /// Vault over a custom secret store, sharing the harness audit trail
    pub fn vault_over(
        &self,
        secrets: Arc<dyn SecretPersistence>,
        encryptor: Encryptor,
        emitter: ChangeEmitter,
    ) -> SecretVault {
        SecretVault::new(secrets, Arc::new(encryptor), self.audit.clone(), emitter)
            .with_clock(self.clock.clone())
    }

    pub fn dispatcher(&self, client: Arc<dyn WebhookClient>) -> NotificationDispatcher {
        NotificationDispatcher::new(self.persistence.clone(), client)
            .with_clock(self.clock.clone())
            .with_options(DispatcherOptions {
                retry: RetryPolicy::single_attempt(),
                delivery_timeout: Duration::from_secs(1),
                ..Default::default()
            })
    }
}

pub fn encryptor() -> Encryptor {
    Encryptor::new(&Encryptor::generate_key()).unwrap()
}

/// Webhook client that records every attempt
///
/// Fails the first `fail_first` attempts, or every attempt while `always_fail`
/// is set, and succeeds otherwise.
#[derive(Default)]
pub struct RecordingWebhook {
    attempts: AtomicU32,
    fail_first: AtomicU32,
    always_fail: Mutex<bool>,
    delivered: Mutex<Vec<(String, ConfigChangeNotification)>>,
}

impl RecordingWebhook {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let client = Self::default();
        *client.always_fail.lock() = true;
        Arc::new(client)
    }

    pub fn failing_first(n: u32) -> Arc<Self> {
        let client = Self::default();
        client.fail_first.store(n, Ordering::SeqCst);
        Arc::new(client)
    }

    pub fn set_failing(&self, failing: bool) {
        *self.always_fail.lock() = failing;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<(String, ConfigChangeNotification)> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl WebhookClient for RecordingWebhook {
    async fn deliver(
        &self,
        callback_url: &str,
        notification: &ConfigChangeNotification,
        _timeout: Duration,
    ) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.always_fail.lock() || attempt <= self.fail_first.load(Ordering::SeqCst) {
            return Err(TamarindError::Delivery("callback returned 503".to_string()));
        }
        self.delivered
            .lock()
            .push((callback_url.to_string(), notification.clone()));
        Ok(())
    }
}

/// Secret store that fails `secret_update` from the `fail_from`-th call on
pub struct FailingSecretUpdates {
    inner: Arc<MemoryPersistService>,
    fail_from: u32,
    updates: AtomicU32,
}

impl FailingSecretUpdates {
    pub fn new(inner: Arc<MemoryPersistService>, fail_from: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_from,
            updates: AtomicU32::new(0),
        })
    }

    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretPersistence for FailingSecretUpdates {
    async fn secret_create(&self, secret: Secret) -> anyhow::Result<bool> {
        self.inner.secret_create(secret).await
    }

    async fn secret_find_by_id(&self, id: &str) -> anyhow::Result<Option<Secret>> {
        self.inner.secret_find_by_id(id).await
    }

    async fn secret_find_by_key(
        &self,
        tenant_id: Option<&str>,
        environment: Environment,
        key: &str,
    ) -> anyhow::Result<Option<Secret>> {
        self.inner.secret_find_by_key(tenant_id, environment, key).await
    }

    async fn secret_list(
        &self,
        tenant_id: Option<&str>,
        environment: Option<Environment>,
        page: PageRequest,
    ) -> anyhow::Result<Page<Secret>> {
        self.inner.secret_list(tenant_id, environment, page).await
    }

    async fn secret_update(
        &self,
        secret: Secret,
        expected_version: u32,
    ) -> anyhow::Result<SecretWriteOutcome> {
        let call = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.fail_from {
            anyhow::bail!("document store unavailable");
        }
        self.inner.secret_update(secret, expected_version).await
    }

    async fn secret_record_access(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Secret>> {
        self.inner.secret_record_access(id, at).await
    }

    async fn secret_delete(&self, id: &str) -> anyhow::Result<bool> {
        self.inner.secret_delete(id).await
    }

    async fn secret_find_auto_rotating(&self) -> anyhow::Result<Vec<Secret>> {
        self.inner.secret_find_auto_rotating().await
    }

    async fn secret_access_log_insert(&self, entry: SecretAccessLog) -> anyhow::Result<()> {
        self.inner.secret_access_log_insert(entry).await
    }

    async fn secret_access_log_page(
        &self,
        secret_id: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<SecretAccessLog>> {
        self.inner.secret_access_log_page(secret_id, page).await
    }
}
