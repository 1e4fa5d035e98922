//! Watch subscriptions and webhook fan-out

pub mod dispatcher;
pub mod pattern;
pub mod retry;
pub mod webhook;

pub use dispatcher::{DispatchReport, DispatcherOptions, NotificationDispatcher};
pub use pattern::KeyPattern;
pub use retry::{Backoff, BackoffKind, RetryPolicy};
pub use webhook::{EVENT_HEADER, ReqwestWebhookClient, WebhookClient};
