//! Request forms accepted by the services
//!
//! Enumerated fields arrive as strings and are parsed during validation, so
//! bad input surfaces as a `Validation` error rather than a decode failure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tamarind_persistence::entity::ConfigValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConfigRequest {
    pub config_key: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub environment: String,
    pub value: ConfigValue,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CreateConfigRequest {
    pub fn new(
        config_key: impl Into<String>,
        environment: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Self {
        Self {
            config_key: config_key.into(),
            tenant_id: None,
            environment: environment.into(),
            value: value.into(),
            status: None,
            description: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfigRequest {
    pub value: ConfigValue,
    #[serde(default)]
    pub change_reason: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl UpdateConfigRequest {
    pub fn new(value: impl Into<ConfigValue>) -> Self {
        Self {
            value: value.into(),
            change_reason: None,
            description: None,
            tags: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.change_reason = Some(reason.into());
        self
    }
}

/// Listing filter shared by configs and secrets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub per_page: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub secret_key: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub environment: String,
    /// Plaintext, encrypted before it reaches storage
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rotation_policy: Option<String>,
    #[serde(default)]
    pub rotation_days: u32,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CreateSecretRequest {
    pub fn new(
        secret_key: impl Into<String>,
        environment: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            secret_key: secret_key.into(),
            tenant_id: None,
            environment: environment.into(),
            value: value.into(),
            description: None,
            rotation_policy: None,
            rotation_days: 0,
            expires_at: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_auto_rotation(mut self, days: u32) -> Self {
        self.rotation_policy = Some("auto".to_string());
        self.rotation_days = days;
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_expiry(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Identifies a secret for a decrypting read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretLookup {
    pub secret_key: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub environment: String,
    /// Calling service, recorded in the access log
    #[serde(default)]
    pub service_name: Option<String>,
}

impl SecretLookup {
    pub fn new(secret_key: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            tenant_id: None,
            environment: environment.into(),
            service_name: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub subscriber_id: String,
    pub service_name: String,
    pub callback_url: String,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Partial update of a subscription; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSubscriptionRequest {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
    #[serde(default)]
    pub environments: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
}
