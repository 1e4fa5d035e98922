//! Configuration keys and their defaults

pub const ENCRYPTION_KEY_PROPERTY: &str = "tamarind.security.encryption_key";

pub const CACHE_CONFIG_TTL_PROPERTY: &str = "tamarind.cache.config_ttl_seconds";
pub const CACHE_NEGATIVE_TTL_PROPERTY: &str = "tamarind.cache.negative_ttl_seconds";
pub const CACHE_MAX_CAPACITY_PROPERTY: &str = "tamarind.cache.max_capacity";

pub const STORAGE_TIMEOUT_PROPERTY: &str = "tamarind.storage.timeout_ms";
pub const HISTORY_BATCH_SIZE_PROPERTY: &str = "tamarind.storage.history_batch_size";

pub const WATCH_FAILURE_THRESHOLD_PROPERTY: &str = "tamarind.watch.failure_threshold";
pub const WATCH_TIMEOUT_PROPERTY: &str = "tamarind.watch.timeout_ms";
pub const WATCH_EVENT_BUFFER_PROPERTY: &str = "tamarind.watch.event_buffer";
pub const WATCH_RETRY_MAX_ATTEMPTS_PROPERTY: &str = "tamarind.watch.retry.max_attempts";
pub const WATCH_RETRY_BACKOFF_PROPERTY: &str = "tamarind.watch.retry.backoff";
pub const WATCH_RETRY_BASE_DELAY_PROPERTY: &str = "tamarind.watch.retry.base_delay_ms";
pub const WATCH_RETRY_MAX_DELAY_PROPERTY: &str = "tamarind.watch.retry.max_delay_ms";

pub const ROTATION_SCAN_INTERVAL_PROPERTY: &str = "tamarind.rotation.scan_interval_seconds";

pub const LOG_DIR_PROPERTY: &str = "tamarind.logs.path";
pub const LOG_LEVEL_PROPERTY: &str = "tamarind.logs.level";
pub const LOG_CONSOLE_PROPERTY: &str = "tamarind.logs.console";
pub const LOG_FILE_PROPERTY: &str = "tamarind.logs.file";

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const ENV_PREFIX: &str = "TAMARIND";

pub const DEFAULT_CONFIG_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_NEGATIVE_TTL_SECONDS: u64 = 60;
pub const DEFAULT_CACHE_MAX_CAPACITY: u64 = 10_000;
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_HISTORY_BATCH_SIZE: u64 = 50;
pub const DEFAULT_FAILURE_THRESHOLD: u64 = 5;
pub const DEFAULT_WATCH_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_WATCH_EVENT_BUFFER: u64 = 1024;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u64 = 3;
pub const DEFAULT_RETRY_BACKOFF: &str = "exponential";
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;
pub const DEFAULT_ROTATION_SCAN_INTERVAL_SECONDS: u64 = 3600;
