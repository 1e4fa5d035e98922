//! Watch subscription entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tamarind_common::{Environment, TamarindError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    #[default]
    Active,
    Paused,
    Inactive,
}

impl WatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchStatus::Active => "active",
            WatchStatus::Paused => "paused",
            WatchStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WatchStatus {
    type Err = TamarindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(WatchStatus::Active),
            "paused" => Ok(WatchStatus::Paused),
            "inactive" => Ok(WatchStatus::Inactive),
            other => Err(TamarindError::validation(format!(
                "subscription status '{}' must be one of active, paused, inactive",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSubscription {
    pub id: String,
    /// Caller-chosen identity, unique across subscriptions
    pub subscriber_id: String,
    /// `None` subscribes to every tenant
    pub tenant_id: Option<String>,
    pub service_name: String,
    pub callback_url: String,
    pub patterns: Vec<String>,
    /// Empty list means every environment
    pub environments: Vec<Environment>,
    pub status: WatchStatus,
    pub last_notified: Option<DateTime<Utc>>,
    pub failure_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchSubscription {
    pub fn is_active(&self) -> bool {
        self.status == WatchStatus::Active
    }

    pub fn watches_environment(&self, environment: Environment) -> bool {
        self.environments.is_empty() || self.environments.contains(&environment)
    }

    pub fn watches_tenant(&self, tenant: Option<&str>) -> bool {
        match self.tenant_id.as_deref() {
            None => true,
            Some(t) => tenant == Some(t),
        }
    }
}
