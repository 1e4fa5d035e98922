//! Change notifications delivered to watch subscribers
//!
//! Field names are part of the webhook wire contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tamarind_common::Environment;
use tamarind_persistence::entity::{Config, ConfigValue, Secret};

/// Metadata key naming the resource kind that changed
pub const META_RESOURCE_TYPE: &str = "resource_type";

/// Config and secret change event types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
    Activate,
    Rollback,
    Rotate,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
            ChangeType::Activate => "activate",
            ChangeType::Rollback => "rollback",
            ChangeType::Rotate => "rotate",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigChangeNotification {
    pub config_key: String,
    pub tenant_id: Option<String>,
    pub environment: Environment,
    pub old_value: Option<ConfigValue>,
    pub new_value: Option<ConfigValue>,
    pub version: u32,
    pub change_type: ChangeType,
    pub changed_by: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ConfigChangeNotification {
    /// Notification for a config change
    pub fn for_config(
        config: &Config,
        change_type: ChangeType,
        old_value: Option<ConfigValue>,
        new_value: Option<ConfigValue>,
        version: u32,
        changed_by: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_RESOURCE_TYPE.to_string(), "config".to_string());
        Self {
            config_key: config.config_key.clone(),
            tenant_id: config.tenant_id.clone(),
            environment: config.environment,
            old_value,
            new_value,
            version,
            change_type,
            changed_by: changed_by.to_string(),
            timestamp,
            metadata,
        }
    }

    /// Notification for a secret change; never carries values
    pub fn for_secret(
        secret: &Secret,
        change_type: ChangeType,
        changed_by: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_RESOURCE_TYPE.to_string(), "secret".to_string());
        Self {
            config_key: secret.secret_key.clone(),
            tenant_id: secret.tenant_id.clone(),
            environment: secret.environment,
            old_value: None,
            new_value: None,
            version: secret.version,
            change_type,
            changed_by: changed_by.to_string(),
            timestamp,
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}
