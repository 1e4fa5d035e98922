//! Configuration management for Tamarind server
//!
//! Settings are layered: `conf/application.yml` (optional), then
//! `TAMARIND__`-prefixed environment variables, then command line flags. The
//! core crates never read settings themselves; this module turns them into
//! the typed option structs they accept.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use tamarind_common::{Encryptor, Result, TamarindError};
use tamarind_config::ConfigStoreOptions;
use tamarind_config::watch::{BackoffKind, DispatcherOptions, RetryPolicy};

use super::constants::*;
use crate::startup::LoggingConfig;

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(name = "tamarind-server", version, about)]
pub struct Cli {
    /// Path of the YAML settings file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
    /// Base64 of the 32-byte secret encryption key
    #[arg(
        long = "encryption-key",
        env = "TAMARIND_ENCRYPTION_KEY",
        hide_env_values = true
    )]
    pub encryption_key: Option<String>,
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name(&cli.config_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .keep_prefix(true)
                    .try_parsing(true),
            );

        if let Some(key) = &cli.encryption_key {
            builder = builder
                .set_override(ENCRYPTION_KEY_PROPERTY, key.as_str())
                .map_err(config_error)?;
        }
        if let Some(level) = &cli.log_level {
            builder = builder
                .set_override(LOG_LEVEL_PROPERTY, level.as_str())
                .map_err(config_error)?;
        }

        let config = builder.build().map_err(config_error)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Security
    // ========================================================================

    /// Build the secret encryptor; a missing or malformed key aborts start-up
    pub fn encryptor(&self) -> Result<Encryptor> {
        let key = self
            .config
            .get_string(ENCRYPTION_KEY_PROPERTY)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TamarindError::Configuration(format!("{} is required", ENCRYPTION_KEY_PROPERTY))
            })?;
        Encryptor::from_base64_key(key.trim())
    }

    // ========================================================================
    // Cache and storage
    // ========================================================================

    pub fn cache_max_capacity(&self) -> u64 {
        self.get_u64(CACHE_MAX_CAPACITY_PROPERTY, DEFAULT_CACHE_MAX_CAPACITY)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.get_u64(STORAGE_TIMEOUT_PROPERTY, DEFAULT_STORAGE_TIMEOUT_MS))
    }

    pub fn config_store_options(&self) -> ConfigStoreOptions {
        ConfigStoreOptions {
            cache_ttl: Duration::from_secs(
                self.get_u64(CACHE_CONFIG_TTL_PROPERTY, DEFAULT_CONFIG_TTL_SECONDS),
            ),
            negative_cache_ttl: Duration::from_secs(
                self.get_u64(CACHE_NEGATIVE_TTL_PROPERTY, DEFAULT_NEGATIVE_TTL_SECONDS),
            ),
            storage_timeout: self.storage_timeout(),
            history_batch_size: self
                .get_u64(HISTORY_BATCH_SIZE_PROPERTY, DEFAULT_HISTORY_BATCH_SIZE)
                .max(1) as usize,
        }
    }

    // ========================================================================
    // Watch
    // ========================================================================

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let kind: BackoffKind = self
            .config
            .get_string(WATCH_RETRY_BACKOFF_PROPERTY)
            .unwrap_or_else(|_| DEFAULT_RETRY_BACKOFF.to_string())
            .parse()?;
        let backoff = kind.with_delays(
            Duration::from_millis(
                self.get_u64(WATCH_RETRY_BASE_DELAY_PROPERTY, DEFAULT_RETRY_BASE_DELAY_MS),
            ),
            Duration::from_millis(
                self.get_u64(WATCH_RETRY_MAX_DELAY_PROPERTY, DEFAULT_RETRY_MAX_DELAY_MS),
            ),
        );
        let max_attempts =
            self.get_u32(WATCH_RETRY_MAX_ATTEMPTS_PROPERTY, DEFAULT_RETRY_MAX_ATTEMPTS);
        Ok(RetryPolicy::new(max_attempts, backoff))
    }

    pub fn dispatcher_options(&self) -> Result<DispatcherOptions> {
        Ok(DispatcherOptions {
            failure_threshold: self
                .get_u32(WATCH_FAILURE_THRESHOLD_PROPERTY, DEFAULT_FAILURE_THRESHOLD)
                .max(1),
            delivery_timeout: Duration::from_millis(
                self.get_u64(WATCH_TIMEOUT_PROPERTY, DEFAULT_WATCH_TIMEOUT_MS),
            ),
            retry: self.retry_policy()?,
            storage_timeout: self.storage_timeout(),
        })
    }

    /// Change events buffered for the dispatcher before new ones are dropped
    pub fn change_buffer(&self) -> usize {
        usize::try_from(self.get_u64(WATCH_EVENT_BUFFER_PROPERTY, DEFAULT_WATCH_EVENT_BUFFER))
            .unwrap_or(usize::MAX)
            .max(1)
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    pub fn rotation_scan_interval(&self) -> Duration {
        Duration::from_secs(
            self.get_u64(
                ROTATION_SCAN_INTERVAL_PROPERTY,
                DEFAULT_ROTATION_SCAN_INTERVAL_SECONDS,
            )
            .max(1),
        )
    }

    // ========================================================================
    // Logging
    // ========================================================================

    /// Logging settings from the config file, overridden by `TAMARIND_LOG_*`
    pub fn logging_config(&self) -> LoggingConfig {
        let base = LoggingConfig::from_config(
            self.config.get_string(LOG_DIR_PROPERTY).ok().map(PathBuf::from),
            self.config.get_bool(LOG_CONSOLE_PROPERTY).unwrap_or(true),
            self.config.get_bool(LOG_FILE_PROPERTY).unwrap_or(true),
            self.config
                .get_string(LOG_LEVEL_PROPERTY)
                .unwrap_or_else(|_| "info".to_string()),
        );
        base.with_env_overrides()
    }

    fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.config
            .get_int(key)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(default)
    }

    fn get_u32(&self, key: &str, default: u64) -> u32 {
        u32::try_from(self.get_u64(key, default)).unwrap_or(u32::MAX)
    }
}

fn config_error(e: config::ConfigError) -> TamarindError {
    TamarindError::Configuration(e.to_string())
}
