//! Tamarind Config - Versioned configuration and secret management
//!
//! This crate provides:
//! - Config versioning with staged drafts, activation, rollback and diffs
//! - Encrypted secret storage with rotation tracking
//! - Audit trail for every mutation
//! - Change notification to webhook subscribers

pub mod model;
pub mod service;
pub mod watch;

// Re-export commonly used types
pub use model::*;
pub use service::{
    AuditRecorder, ChangeEmitter, ChangeReceiver, ConfigStoreOptions, ConfigVersionStore,
    RevealedSecret, SecretVault, VersionHistory,
};
pub use watch::{DispatchReport, DispatcherOptions, NotificationDispatcher, WebhookClient};
