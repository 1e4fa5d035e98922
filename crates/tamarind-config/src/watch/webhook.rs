//! Webhook delivery client

use std::time::Duration;

use async_trait::async_trait;
use tamarind_common::{Result, TamarindError};

use crate::model::ConfigChangeNotification;

/// Header carrying the change type of the delivered event
pub const EVENT_HEADER: &str = "X-Tamarind-Event";

const USER_AGENT: &str = concat!("tamarind-watch/", env!("CARGO_PKG_VERSION"));

/// Delivers one notification to one callback URL
///
/// Implementations must treat a non-2xx response and a timeout as
/// `Delivery` errors.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn deliver(
        &self,
        callback_url: &str,
        notification: &ConfigChangeNotification,
        timeout: Duration,
    ) -> Result<()>;
}

/// JSON POST over `reqwest`
#[derive(Clone, Debug)]
pub struct ReqwestWebhookClient {
    client: reqwest::Client,
}

impl ReqwestWebhookClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TamarindError::Configuration(format!("http client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookClient for ReqwestWebhookClient {
    async fn deliver(
        &self,
        callback_url: &str,
        notification: &ConfigChangeNotification,
        timeout: Duration,
    ) -> Result<()> {
        let response = self
            .client
            .post(callback_url)
            .timeout(timeout)
            .header(EVENT_HEADER, notification.change_type.as_str())
            .json(notification)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TamarindError::Delivery(format!("timed out after {}ms", timeout.as_millis()))
                } else {
                    TamarindError::Delivery(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TamarindError::Delivery(format!(
                "callback returned {}",
                status
            )))
        }
    }
}
