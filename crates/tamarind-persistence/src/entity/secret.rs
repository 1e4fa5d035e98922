//! Secret entity
//!
//! The ciphertext lives only on [`Secret`] and is skipped by serde and
//! redacted from `Debug`. Everything handed back to callers goes through
//! [`SecretView`], which carries the masked placeholder instead.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tamarind_common::{Environment, MASKED_VALUE, TamarindError};

use super::ResourceIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Manual,
    Auto,
}

impl RotationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationPolicy::Manual => "manual",
            RotationPolicy::Auto => "auto",
        }
    }
}

impl std::str::FromStr for RotationPolicy {
    type Err = TamarindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(RotationPolicy::Manual),
            "auto" => Ok(RotationPolicy::Auto),
            other => Err(TamarindError::validation(format!(
                "rotation_policy '{}' must be manual or auto",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretStatus {
    #[default]
    Active,
    /// Transient rotation state; recorded in the audit trail, never stored
    Rotated,
    Expired,
}

impl SecretStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SecretStatus::Active => "active",
            SecretStatus::Rotated => "rotated",
            SecretStatus::Expired => "expired",
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    pub tenant_id: Option<String>,
    pub secret_key: String,
    pub environment: Environment,
    #[serde(skip)]
    pub encrypted_value: String,
    pub encryption_key_id: String,
    pub description: Option<String>,
    pub rotation_policy: RotationPolicy,
    pub rotation_days: u32,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: SecretStatus,
    pub version: u32,
    pub metadata: BTreeMap<String, String>,
    pub access_count: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl Secret {
    pub fn tenant(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(self.tenant(), self.environment, &self.secret_key)
    }

    pub fn masked_value(&self) -> &'static str {
        MASKED_VALUE
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SecretStatus::Expired || self.expires_at.is_some_and(|at| at <= now)
    }

    /// Reference point for rotation scheduling
    ///
    /// A secret that was never rotated counts its creation as the first
    /// rotation.
    pub fn rotation_anchor(&self) -> DateTime<Utc> {
        self.last_rotated_at.unwrap_or(self.created_at)
    }

    /// Whether an auto-rotating secret has reached its rotation interval
    pub fn is_rotation_due(&self, now: DateTime<Utc>) -> bool {
        self.rotation_policy == RotationPolicy::Auto
            && self.status == SecretStatus::Active
            && self.rotation_days > 0
            && !self.is_expired(now)
            && now.signed_duration_since(self.rotation_anchor())
                >= TimeDelta::days(i64::from(self.rotation_days))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("secret_key", &self.secret_key)
            .field("environment", &self.environment)
            .field("encrypted_value", &MASKED_VALUE)
            .field("status", &self.status)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Caller-facing projection of a secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretView {
    pub id: String,
    pub tenant_id: Option<String>,
    pub secret_key: String,
    pub environment: Environment,
    pub masked_value: String,
    pub encryption_key_id: String,
    pub description: Option<String>,
    pub rotation_policy: RotationPolicy,
    pub rotation_days: u32,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: SecretStatus,
    pub version: u32,
    pub metadata: BTreeMap<String, String>,
    pub access_count: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl From<&Secret> for SecretView {
    fn from(secret: &Secret) -> Self {
        Self {
            id: secret.id.clone(),
            tenant_id: secret.tenant_id.clone(),
            secret_key: secret.secret_key.clone(),
            environment: secret.environment,
            masked_value: secret.masked_value().to_string(),
            encryption_key_id: secret.encryption_key_id.clone(),
            description: secret.description.clone(),
            rotation_policy: secret.rotation_policy,
            rotation_days: secret.rotation_days,
            last_rotated_at: secret.last_rotated_at,
            expires_at: secret.expires_at,
            status: secret.status,
            version: secret.version,
            metadata: secret.metadata.clone(),
            access_count: secret.access_count,
            last_accessed_at: secret.last_accessed_at,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
            created_by: secret.created_by.clone(),
            updated_by: secret.updated_by.clone(),
        }
    }
}

impl From<Secret> for SecretView {
    fn from(secret: Secret) -> Self {
        SecretView::from(&secret)
    }
}
