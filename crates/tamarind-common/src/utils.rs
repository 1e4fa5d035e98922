//! Utility functions for Tamarind
//!
//! Identifier validation, actor defaults, and storage deadline handling.

use std::{future::Future, sync::LazyLock, time::Duration};

use crate::error::{Result, TamarindError};

/// Dot-separated key: one or more non-empty segments of `[A-Za-z0-9_-]`
static KEY_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").expect("Invalid regex pattern")
});

/// Tenant and subscriber identifiers
static IDENT_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:-]+$").expect("Invalid regex pattern"));

/// Actor recorded when the caller supplies none
pub const SYSTEM_ACTOR: &str = "system";

/// Maximum accepted key length
pub const MAX_KEY_LEN: usize = 256;

/// Validate a dot-separated config or secret key
///
/// # Examples
///
/// ```
/// use tamarind_common::is_valid_key;
///
/// assert!(is_valid_key("db.primary.host"));
/// assert!(is_valid_key("feature_flags"));
/// assert!(!is_valid_key("db..host"));
/// assert!(!is_valid_key("with spaces"));
/// assert!(!is_valid_key(""));
/// ```
pub fn is_valid_key(key: &str) -> bool {
    key.len() <= MAX_KEY_LEN && KEY_PATTERN.is_match(key)
}

/// Validate a tenant or subscriber identifier
pub fn is_valid_ident(ident: &str) -> bool {
    IDENT_PATTERN.is_match(ident)
}

/// Check a key and produce a `Validation` error naming the field
pub fn validate_key(field: &str, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(TamarindError::validation(format!("{} is required", field)));
    }
    if !is_valid_key(key) {
        return Err(TamarindError::validation(format!(
            "{} '{}' must be dot-separated segments of letters, digits, '_' or '-'",
            field, key
        )));
    }
    Ok(())
}

/// Normalize an optional tenant: blank means global
pub fn normalize_tenant(tenant: Option<&str>) -> Result<Option<String>> {
    match tenant.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) if is_valid_ident(t) => Ok(Some(t.to_string())),
        Some(t) => Err(TamarindError::validation(format!(
            "tenant_id '{}' contains invalid characters",
            t
        ))),
    }
}

/// Resolve the actor for an operation, defaulting to [`SYSTEM_ACTOR`]
pub fn actor_or_system(actor: Option<&str>) -> String {
    match actor.map(str::trim) {
        Some(a) if !a.is_empty() => a.to_string(),
        _ => SYSTEM_ACTOR.to_string(),
    }
}

/// Run a storage call under a deadline
///
/// Storage errors and timeouts are logged with their cause and surfaced as
/// `Internal` carrying only the operation name.
pub async fn with_deadline<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(operation, error = %e, "Storage operation failed");
            Err(TamarindError::internal(format!("{} failed", operation)))
        }
        Err(_) => {
            tracing::error!(operation, timeout_ms = timeout.as_millis() as u64, "Storage operation timed out");
            Err(TamarindError::internal(format!("{} timed out", operation)))
        }
    }
}
