//! Tamarind Persistence - Entities and storage layer
//!
//! This crate provides:
//! - Entity definitions for configs, versions, secrets, audit and watch records
//! - Persistence trait abstractions with atomic write primitives
//! - An in-memory backend and a moka-backed cache

pub mod cache;
pub mod entity;
pub mod memory;
pub mod model;
pub mod traits;

// Re-export persistence traits
pub use traits::{
    AuditPersistence, ConfigPersistence, PersistenceService, SecretPersistence, WatchPersistence,
};

// Re-export backends
pub use cache::{CacheService, MokaCacheService};
pub use memory::MemoryPersistService;

// Re-export model types
pub use model::{
    ActivationOutcome, AppendOutcome, HistoryCursor, Page, PageRequest, SecretWriteOutcome,
    VersionAppend,
};
