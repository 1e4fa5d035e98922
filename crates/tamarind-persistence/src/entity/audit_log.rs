//! Audit log entity
//!
//! Append-only record of a mutation. Secret entries never carry values;
//! their `old_value`/`new_value` hold the masked placeholder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tamarind_common::Environment;

use super::ConfigValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub resource_key: Option<String>,
    pub tenant_id: Option<String>,
    pub environment: Option<Environment>,
    pub action: String,
    pub old_value: Option<ConfigValue>,
    pub new_value: Option<ConfigValue>,
    pub actor: String,
    pub details: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}
