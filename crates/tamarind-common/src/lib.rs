//! Tamarind Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Tamarind components:
//! - Error types and error codes
//! - Secret encryption
//! - Deployment environments and cache key layout
//! - Time source abstraction
//! - Utility functions

pub mod clock;
pub mod crypto;
pub mod error;
pub mod utils;

use std::fmt;

use serde::{Deserialize, Serialize};

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::Encryptor;
pub use error::{ErrorCode, Result, TamarindError};
pub use utils::{
    SYSTEM_ACTOR, actor_or_system, is_valid_ident, is_valid_key, normalize_tenant, validate_key,
    with_deadline,
};

/// Placeholder shown wherever a secret value would otherwise appear
pub const MASKED_VALUE: &str = "***MASKED***";

/// Prefix shared by every cache entry this service writes
pub const CACHE_KEY_PREFIX: &str = "system-config";

/// Deployment environment a config or secret belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = TamarindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(TamarindError::validation(format!(
                "environment '{}' must be one of development, staging, production",
                other
            ))),
        }
    }
}

/// Build the cache key for a resource
///
/// Layout: `system-config:{kind}:{tenant}:{environment}:{key}` with an empty
/// tenant segment for global resources.
pub fn cache_key(kind: &str, tenant: Option<&str>, environment: Environment, key: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        CACHE_KEY_PREFIX,
        kind,
        tenant.unwrap_or_default(),
        environment,
        key
    )
}
