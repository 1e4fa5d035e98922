//! Request, response and event types

pub mod diff;
pub mod form;
pub mod notification;

pub use diff::{ConfigDiff, DiffEntry, DiffKind, VersionComparison, diff_values};
pub use form::{
    CreateConfigRequest, CreateSecretRequest, ListQuery, SecretLookup, SubscribeRequest,
    UpdateConfigRequest, UpdateSubscriptionRequest,
};
pub use notification::{ChangeType, ConfigChangeNotification};
