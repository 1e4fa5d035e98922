//! Service layer
//!
//! - Versioned config store with staged drafts, activation and rollback
//! - Secret vault with encrypted storage and access logging
//! - Append-only audit recording
//! - Change event hand-off to the notification dispatcher

pub mod audit;
pub mod emitter;
pub mod history;
pub mod secret;
pub mod version;

pub use audit::{AuditLogBuilder, AuditLogEntry, AuditRecorder};
pub use emitter::{ChangeEmitter, ChangeReceiver, DEFAULT_CHANGE_BUFFER};
pub use history::VersionHistory;
pub use secret::{RevealedSecret, SecretVault};
pub use version::{CONFIG_CACHE_KIND, ConfigStoreOptions, ConfigVersionStore};
