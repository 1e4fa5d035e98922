//! Config version entity
//!
//! Immutable snapshot of a config value. Only `status` and `is_active`
//! change after insertion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tamarind_common::Environment;

use super::ConfigValue;

/// Version lifecycle: `draft -> active -> archived`
///
/// `archived` is terminal; restoring an archived value goes through a
/// rollback, which appends a fresh version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Draft,
    Active,
    Archived,
}

impl VersionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Active => "active",
            VersionStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigVersion {
    pub id: String,
    pub config_id: String,
    pub config_key: String,
    pub tenant_id: Option<String>,
    pub environment: Environment,
    pub version_number: u32,
    pub value: ConfigValue,
    pub change_reason: Option<String>,
    pub status: VersionStatus,
    pub is_active: bool,
    pub validation_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}
