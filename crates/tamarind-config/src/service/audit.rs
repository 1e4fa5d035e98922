//! Audit trail recording
//!
//! Every mutating operation builds an [`AuditLogEntry`] up front, validates
//! it before touching storage, and appends it once the mutation is durable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tamarind_common::{Clock, Environment, Result, SYSTEM_ACTOR, TamarindError, with_deadline};
use tamarind_persistence::entity::{AuditLog, ConfigValue};
use tamarind_persistence::{AuditPersistence, Page, PageRequest};

/// Action constants
pub mod action {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const ACTIVATE: &str = "activate";
    pub const ROLLBACK: &str = "rollback";
    pub const ROTATE: &str = "rotate";
}

/// Resource type constants
pub mod resource {
    pub const CONFIG: &str = "config";
    pub const SECRET: &str = "secret";
}

/// Audit record before it is stamped with an id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
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
}

impl Default for AuditLogEntry {
    fn default() -> Self {
        Self {
            resource_type: String::new(),
            resource_id: String::new(),
            resource_key: None,
            tenant_id: None,
            environment: None,
            action: String::new(),
            old_value: None,
            new_value: None,
            actor: SYSTEM_ACTOR.to_string(),
            details: BTreeMap::new(),
        }
    }
}

impl AuditLogEntry {
    /// Create a new audit log entry builder
    pub fn builder() -> AuditLogBuilder {
        AuditLogBuilder::new()
    }

    /// Reject entries missing their required fields
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("resource_type", &self.resource_type),
            ("resource_id", &self.resource_id),
            ("action", &self.action),
        ] {
            if value.trim().is_empty() {
                return Err(TamarindError::validation(format!(
                    "audit {} is required",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Builder for AuditLogEntry
pub struct AuditLogBuilder {
    entry: AuditLogEntry,
}

impl AuditLogBuilder {
    pub fn new() -> Self {
        Self {
            entry: AuditLogEntry::default(),
        }
    }

    pub fn resource_type(mut self, rt: &str) -> Self {
        self.entry.resource_type = rt.to_string();
        self
    }

    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.entry.resource_id = id.into();
        self
    }

    pub fn resource_key(mut self, key: impl Into<String>) -> Self {
        self.entry.resource_key = Some(key.into());
        self
    }

    pub fn tenant_id(mut self, tenant: Option<&str>) -> Self {
        self.entry.tenant_id = tenant.map(str::to_string);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.entry.environment = Some(environment);
        self
    }

    pub fn action(mut self, action: &str) -> Self {
        self.entry.action = action.to_string();
        self
    }

    pub fn old_value(mut self, value: Option<ConfigValue>) -> Self {
        self.entry.old_value = value;
        self
    }

    pub fn new_value(mut self, value: Option<ConfigValue>) -> Self {
        self.entry.new_value = value;
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.entry.actor = actor.into();
        self
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.entry.details.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> AuditLogEntry {
        self.entry
    }
}

impl Default for AuditLogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends and queries audit records
#[derive(Clone)]
pub struct AuditRecorder {
    persistence: Arc<dyn AuditPersistence>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl AuditRecorder {
    pub fn new(
        persistence: Arc<dyn AuditPersistence>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            persistence,
            clock,
            timeout,
        }
    }

    /// Validate, stamp and persist an entry
    pub async fn append(&self, entry: AuditLogEntry) -> Result<AuditLog> {
        entry.validate()?;

        let record = AuditLog {
            id: uuid::Uuid::new_v4().to_string(),
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            resource_key: entry.resource_key,
            tenant_id: entry.tenant_id,
            environment: entry.environment,
            action: entry.action,
            old_value: entry.old_value,
            new_value: entry.new_value,
            actor: entry.actor,
            details: entry.details,
            timestamp: self.clock.now(),
        };

        with_deadline(
            self.timeout,
            "audit_insert",
            self.persistence.audit_insert(record.clone()),
        )
        .await?;

        Ok(record)
    }

    /// Append after a mutation has already committed
    ///
    /// The mutation stands even if the audit write fails, so the failure is
    /// logged rather than returned.
    pub(crate) async fn record(&self, entry: AuditLogEntry) {
        let resource_id = entry.resource_id.clone();
        let action = entry.action.clone();
        if let Err(e) = self.append(entry).await {
            tracing::error!(
                resource_id = %resource_id,
                action = %action,
                error = %e,
                "Failed to write audit log entry"
            );
        }
    }

    /// Entries for one resource, newest first
    pub async fn query(&self, resource_id: &str, page: u64, per_page: u64) -> Result<Page<AuditLog>> {
        with_deadline(
            self.timeout,
            "audit_page_by_resource",
            self.persistence
                .audit_page_by_resource(resource_id, PageRequest::new(page, per_page)),
        )
        .await
    }

    /// Entries for one resource type, newest first
    pub async fn query_by_resource_type(
        &self,
        resource_type: &str,
        page: u64,
        per_page: u64,
    ) -> Result<Page<AuditLog>> {
        with_deadline(
            self.timeout,
            "audit_page_by_resource_type",
            self.persistence
                .audit_page_by_resource_type(resource_type, PageRequest::new(page, per_page)),
        )
        .await
    }
}
