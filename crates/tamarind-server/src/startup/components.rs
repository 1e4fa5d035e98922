//! Service wiring
//!
//! Builds every core component over one in-memory document store and one
//! cache, connected to the dispatcher through a change channel.

use std::sync::Arc;

use tamarind_common::{Result, SystemClock};
use tamarind_config::service::{ChangeEmitter, ChangeReceiver};
use tamarind_config::watch::ReqwestWebhookClient;
use tamarind_config::{AuditRecorder, ConfigVersionStore, NotificationDispatcher, SecretVault};
use tamarind_persistence::{MemoryPersistService, MokaCacheService, PersistenceService};

use crate::model::Configuration;

pub struct Components {
    pub persistence: Arc<MemoryPersistService>,
    pub cache: Arc<MokaCacheService>,
    pub audit: AuditRecorder,
    pub config_store: Arc<ConfigVersionStore>,
    pub secret_vault: Arc<SecretVault>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl Components {
    /// Build all components; the receiver feeds [`NotificationDispatcher::run`]
    pub fn build(configuration: &Configuration) -> Result<(Self, ChangeReceiver)> {
        let encryptor = Arc::new(configuration.encryptor()?);
        let dispatcher_options = configuration.dispatcher_options()?;
        let storage_timeout = configuration.storage_timeout();
        let clock = Arc::new(SystemClock);

        let persistence = Arc::new(MemoryPersistService::default());
        let cache = Arc::new(MokaCacheService::new(configuration.cache_max_capacity()));
        let (emitter, events) = ChangeEmitter::with_capacity(configuration.change_buffer());
        let audit = AuditRecorder::new(persistence.clone(), clock.clone(), storage_timeout);

        let config_store = ConfigVersionStore::new(
            persistence.clone(),
            audit.clone(),
            cache.clone(),
            emitter.clone(),
        )
        .with_clock(clock.clone())
        .with_options(configuration.config_store_options());

        let secret_vault = SecretVault::new(persistence.clone(), encryptor.clone(), audit.clone(), emitter)
            .with_clock(clock.clone())
            .with_storage_timeout(storage_timeout);

        let dispatcher = NotificationDispatcher::new(
            persistence.clone(),
            Arc::new(ReqwestWebhookClient::new()?),
        )
        .with_clock(clock)
        .with_options(dispatcher_options);

        tracing::info!(
            backend = persistence.backend_name(),
            key_id = %encryptor.key_id(),
            cache_capacity = configuration.cache_max_capacity(),
            "Components initialized"
        );

        Ok((
            Self {
                persistence,
                cache,
                audit,
                config_store: Arc::new(config_store),
                secret_vault: Arc::new(secret_vault),
                dispatcher: Arc::new(dispatcher),
            },
            events,
        ))
    }
}
