//! Secret access log entity
//!
//! One row per attempted secret operation, successful or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tamarind_common::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretAction {
    Create,
    Read,
    Update,
    Rotate,
    Delete,
}

impl SecretAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SecretAction::Create => "create",
            SecretAction::Read => "read",
            SecretAction::Update => "update",
            SecretAction::Rotate => "rotate",
            SecretAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SecretAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretAccessLog {
    pub id: String,
    /// Empty when the lookup did not resolve to a stored secret
    pub secret_id: String,
    pub secret_key: String,
    pub tenant_id: Option<String>,
    pub environment: Environment,
    pub actor: String,
    pub service_name: Option<String>,
    pub action: SecretAction,
    pub success: bool,
    pub fail_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}
