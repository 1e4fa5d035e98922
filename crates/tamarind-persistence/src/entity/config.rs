//! Config entity
//!
//! A named, environment-scoped value with a monotonically increasing version
//! counter. The served value always equals the value of the active version.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tamarind_common::{Environment, TamarindError};

use super::{ConfigValue, ResourceIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigStatus {
    #[default]
    Active,
    Inactive,
    Archived,
}

impl ConfigStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigStatus::Active => "active",
            ConfigStatus::Inactive => "inactive",
            ConfigStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConfigStatus {
    type Err = TamarindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ConfigStatus::Active),
            "inactive" => Ok(ConfigStatus::Inactive),
            "archived" => Ok(ConfigStatus::Archived),
            other => Err(TamarindError::validation(format!(
                "config status '{}' must be one of active, inactive, archived",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub id: String,
    /// `None` for global configs
    pub tenant_id: Option<String>,
    pub config_key: String,
    pub environment: Environment,
    /// Served value, mirrors the active version
    pub value: ConfigValue,
    /// Highest version number written for this config
    pub version: u32,
    /// Version number currently served
    pub active_version: u32,
    pub status: ConfigStatus,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl Config {
    pub fn tenant(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Identity triple, unique across the store
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(self.tenant(), self.environment, &self.config_key)
    }
}
