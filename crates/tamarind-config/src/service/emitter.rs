//! Hand-off of change events to the notification dispatcher
//!
//! Writers push onto a bounded channel and never wait for delivery. When the
//! dispatcher falls behind and the buffer is full, new events are dropped and
//! counted. The dispatcher worker owns the receiving end.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::model::ConfigChangeNotification;

/// Events buffered between the stores and the dispatcher
pub const DEFAULT_CHANGE_BUFFER: usize = 1024;

pub type ChangeReceiver = mpsc::Receiver<ConfigChangeNotification>;

#[derive(Clone, Debug, Default)]
pub struct ChangeEmitter {
    sender: Option<mpsc::Sender<ConfigChangeNotification>>,
}

impl ChangeEmitter {
    /// Create a connected emitter and its receiver
    pub fn channel() -> (Self, ChangeReceiver) {
        Self::with_capacity(DEFAULT_CHANGE_BUFFER)
    }

    /// Connected emitter buffering at most `capacity` events (minimum 1)
    pub fn with_capacity(capacity: usize) -> (Self, ChangeReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Emitter that drops every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, notification: ConfigChangeNotification) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                metrics::counter!("change_events_dropped_total", "reason" => "full").increment(1);
                tracing::warn!(
                    config_key = %dropped.config_key,
                    change_type = %dropped.change_type,
                    "Change event dropped, dispatcher buffer is full"
                );
            }
            Err(TrySendError::Closed(dropped)) => {
                metrics::counter!("change_events_dropped_total", "reason" => "closed")
                    .increment(1);
                tracing::warn!(
                    config_key = %dropped.config_key,
                    change_type = %dropped.change_type,
                    "Change event dropped, dispatcher is not running"
                );
            }
        }
    }
}
