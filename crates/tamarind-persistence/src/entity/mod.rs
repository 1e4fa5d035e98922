//! Stored entities
//!
//! Collection names used by document-store backends are listed in
//! [`collections`].

pub mod audit_log;
pub mod config;
pub mod config_version;
pub mod secret;
pub mod secret_access_log;
pub mod value;
pub mod watch_subscription;

pub use audit_log::AuditLog;
pub use config::{Config, ConfigStatus};
pub use config_version::{ConfigVersion, VersionStatus};
pub use secret::{RotationPolicy, Secret, SecretStatus, SecretView};
pub use secret_access_log::{SecretAccessLog, SecretAction};
pub use value::ConfigValue;
pub use watch_subscription::{WatchStatus, WatchSubscription};

use tamarind_common::Environment;

/// `(tenant, environment, key)` identity, unique per resource kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub tenant_id: Option<String>,
    pub environment: Environment,
    pub key: String,
}

impl ResourceIdentity {
    pub fn new(tenant_id: Option<&str>, environment: Environment, key: &str) -> Self {
        Self {
            tenant_id: tenant_id.map(str::to_string),
            environment,
            key: key.to_string(),
        }
    }
}

pub mod collections {
    pub const CONFIGS: &str = "configs";
    pub const CONFIG_VERSIONS: &str = "config_versions";
    pub const AUDIT_LOG: &str = "config_audit_log";
    pub const SECRETS: &str = "secrets";
    pub const SECRET_ACCESS_LOG: &str = "secret_access_log";
    pub const WATCH_SUBSCRIPTIONS: &str = "watch_subscriptions";
}
