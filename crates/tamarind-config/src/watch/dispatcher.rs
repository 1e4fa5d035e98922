//! Notification dispatcher
//!
//! Fans each change event out to the active subscriptions whose tenant,
//! environment and key patterns match. Deliveries for one event run
//! concurrently; events are processed one at a time in arrival order, so a
//! subscriber sees events in the order they were emitted.
//!
//! An event whose every retry attempt fails counts as one failure. Once a
//! subscription's consecutive failure count reaches the threshold it is
//! paused and receives nothing further until reactivated.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tamarind_common::{
    Clock, Environment, Result, SystemClock, TamarindError, actor_or_system, is_valid_ident,
    normalize_tenant, validate_key, with_deadline,
};
use tamarind_persistence::entity::{WatchStatus, WatchSubscription};
use tamarind_persistence::{Page, PageRequest, WatchPersistence};

use super::pattern::KeyPattern;
use super::retry::RetryPolicy;
use super::webhook::WebhookClient;
use crate::model::{
    ChangeType, ConfigChangeNotification, SubscribeRequest, UpdateSubscriptionRequest,
};
use crate::service::ChangeReceiver;

#[derive(Clone, Debug)]
pub struct DispatcherOptions {
    /// Consecutive failed events before a subscription is paused
    pub failure_threshold: u32,
    /// Per-attempt webhook timeout
    pub delivery_timeout: Duration,
    pub retry: RetryPolicy,
    pub storage_timeout: Duration,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            delivery_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            storage_timeout: Duration::from_secs(5),
        }
    }
}

/// Summary of one event's fan-out
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub matched: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Subscription ids paused as a result of this event
    pub paused: Vec<String>,
}

enum Delivery {
    Delivered,
    Failed { paused: bool },
}

pub struct NotificationDispatcher {
    persistence: Arc<dyn WatchPersistence>,
    client: Arc<dyn WebhookClient>,
    clock: Arc<dyn Clock>,
    options: DispatcherOptions,
}

impl NotificationDispatcher {
    pub fn new(persistence: Arc<dyn WatchPersistence>, client: Arc<dyn WebhookClient>) -> Self {
        Self {
            persistence,
            client,
            clock: Arc::new(SystemClock),
            options: DispatcherOptions::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// A failure threshold below 1 is raised to 1
    pub fn with_options(mut self, options: DispatcherOptions) -> Self {
        self.options = DispatcherOptions {
            failure_threshold: options.failure_threshold.max(1),
            ..options
        };
        self
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Subscription management
    // ------------------------------------------------------------------

    pub async fn subscribe(&self, form: SubscribeRequest) -> Result<WatchSubscription> {
        let subscriber_id = form.subscriber_id.trim();
        if subscriber_id.is_empty() || !is_valid_ident(subscriber_id) {
            return Err(TamarindError::validation(
                "subscriber_id is required and may contain letters, digits, '_', '.', ':' or '-'",
            ));
        }
        let service_name = form.service_name.trim();
        if service_name.is_empty() {
            return Err(TamarindError::validation("service_name is required"));
        }
        validate_callback_url(&form.callback_url)?;
        let patterns = parse_patterns(&form.patterns)?;
        let environments = parse_environments(&form.environments)?;
        let tenant_id = normalize_tenant(form.tenant_id.as_deref())?;
        let now = self.clock.now();

        let subscription = WatchSubscription {
            id: uuid::Uuid::new_v4().to_string(),
            subscriber_id: subscriber_id.to_string(),
            tenant_id,
            service_name: service_name.to_string(),
            callback_url: form.callback_url.trim().to_string(),
            patterns,
            environments,
            status: WatchStatus::Active,
            last_notified: None,
            failure_count: 0,
            created_at: now,
            updated_at: now,
        };

        let created = with_deadline(
            self.options.storage_timeout,
            "watch_create",
            self.persistence.watch_create(subscription.clone()),
        )
        .await?;
        if !created {
            return Err(TamarindError::conflict(format!(
                "subscriber '{}' is already registered",
                subscription.subscriber_id
            )));
        }

        tracing::info!(
            subscription_id = %subscription.id,
            subscriber_id = %subscription.subscriber_id,
            patterns = ?subscription.patterns,
            "Registered watch subscription"
        );
        Ok(subscription)
    }

    pub async fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        let deleted = with_deadline(
            self.options.storage_timeout,
            "watch_delete",
            self.persistence.watch_delete(subscription_id),
        )
        .await?;
        if !deleted {
            return Err(subscription_not_found(subscription_id));
        }
        tracing::info!(subscription_id, "Removed watch subscription");
        Ok(())
    }

    pub async fn get_by_id(&self, subscription_id: &str) -> Result<WatchSubscription> {
        with_deadline(
            self.options.storage_timeout,
            "watch_find_by_id",
            self.persistence.watch_find_by_id(subscription_id),
        )
        .await?
        .ok_or_else(|| subscription_not_found(subscription_id))
    }

    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<WatchSubscription>> {
        with_deadline(
            self.options.storage_timeout,
            "watch_list",
            self.persistence.watch_list(PageRequest::new(page, per_page)),
        )
        .await
    }

    /// Patch a subscription
    ///
    /// Setting the status back to `active` clears the failure count.
    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        form: UpdateSubscriptionRequest,
    ) -> Result<WatchSubscription> {
        let mut subscription = self.get_by_id(subscription_id).await?;

        if let Some(service_name) = form.service_name {
            if service_name.trim().is_empty() {
                return Err(TamarindError::validation("service_name must not be empty"));
            }
            subscription.service_name = service_name.trim().to_string();
        }
        if let Some(callback_url) = form.callback_url {
            validate_callback_url(&callback_url)?;
            subscription.callback_url = callback_url.trim().to_string();
        }
        if let Some(patterns) = form.patterns {
            subscription.patterns = parse_patterns(&patterns)?;
        }
        if let Some(environments) = form.environments {
            subscription.environments = parse_environments(&environments)?;
        }
        if let Some(status) = form.status {
            let status: WatchStatus = status.parse()?;
            if status == WatchStatus::Active && subscription.status != WatchStatus::Active {
                subscription.failure_count = 0;
            }
            subscription.status = status;
        }
        subscription.updated_at = self.clock.now();

        let replaced = with_deadline(
            self.options.storage_timeout,
            "watch_replace",
            self.persistence.watch_replace(subscription.clone()),
        )
        .await?;
        if !replaced {
            return Err(subscription_not_found(subscription_id));
        }

        tracing::info!(
            subscription_id,
            status = %subscription.status,
            "Updated watch subscription"
        );
        Ok(subscription)
    }

    /// Active subscriptions that would receive an event for this key
    pub async fn get_matching_subscriptions(
        &self,
        config_key: &str,
        tenant_id: Option<&str>,
        environment: &str,
    ) -> Result<Vec<WatchSubscription>> {
        validate_key("config_key", config_key)?;
        let environment: Environment = environment.parse()?;
        let tenant_id = normalize_tenant(tenant_id)?;
        self.matching(config_key, tenant_id.as_deref(), environment)
            .await
    }

    // ------------------------------------------------------------------
    // Delivery
    // ------------------------------------------------------------------

    /// Deliver one event to every matching active subscription
    pub async fn dispatch(&self, notification: &ConfigChangeNotification) -> Result<DispatchReport> {
        let targets = self
            .matching(
                &notification.config_key,
                notification.tenant(),
                notification.environment,
            )
            .await?;

        let mut report = DispatchReport {
            matched: targets.len(),
            ..Default::default()
        };
        if targets.is_empty() {
            tracing::debug!(config_key = %notification.config_key, "No subscribers for change");
            return Ok(report);
        }

        let outcomes = join_all(
            targets
                .iter()
                .map(|subscription| self.deliver_to(subscription, notification)),
        )
        .await;

        for (subscription, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Failed { paused } => {
                    report.failed += 1;
                    if paused {
                        report.paused.push(subscription.id.clone());
                    }
                }
            }
        }

        tracing::info!(
            config_key = %notification.config_key,
            change_type = %notification.change_type,
            matched = report.matched,
            delivered = report.delivered,
            failed = report.failed,
            "Dispatched change notification"
        );
        Ok(report)
    }

    /// Synthesize an update event for a key and dispatch it
    pub async fn trigger_notification(
        &self,
        config_key: &str,
        tenant_id: Option<&str>,
        environment: &str,
        actor: Option<&str>,
    ) -> Result<DispatchReport> {
        validate_key("config_key", config_key)?;
        let environment: Environment = environment.parse()?;
        let tenant_id = normalize_tenant(tenant_id)?;

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("trigger".to_string(), "manual".to_string());
        let notification = ConfigChangeNotification {
            config_key: config_key.to_string(),
            tenant_id,
            environment,
            old_value: None,
            new_value: None,
            version: 0,
            change_type: ChangeType::Update,
            changed_by: actor_or_system(actor),
            timestamp: self.clock.now(),
            metadata,
        };
        self.dispatch(&notification).await
    }

    /// Drain emitted events until every sender is dropped
    pub async fn run(self: Arc<Self>, mut events: ChangeReceiver) {
        tracing::info!("Notification dispatcher started");
        while let Some(notification) = events.recv().await {
            if let Err(e) = self.dispatch(&notification).await {
                tracing::error!(
                    config_key = %notification.config_key,
                    error = %e,
                    "Failed to dispatch change notification"
                );
            }
        }
        tracing::info!("Notification dispatcher stopped");
    }

    async fn matching(
        &self,
        config_key: &str,
        tenant_id: Option<&str>,
        environment: Environment,
    ) -> Result<Vec<WatchSubscription>> {
        let active = with_deadline(
            self.options.storage_timeout,
            "watch_find_active",
            self.persistence.watch_find_active(),
        )
        .await?;

        let mut matched: Vec<WatchSubscription> = active
            .into_iter()
            .filter(|s| subscription_matches(s, config_key, tenant_id, environment))
            .collect();
        matched.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(matched)
    }

    async fn deliver_to(
        &self,
        subscription: &WatchSubscription,
        notification: &ConfigChangeNotification,
    ) -> Delivery {
        let policy = self.options.retry;
        let mut last_error = None;

        for attempt in 1..=policy.max_attempts() {
            match self
                .client
                .deliver(
                    &subscription.callback_url,
                    notification,
                    self.options.delivery_timeout,
                )
                .await
            {
                Ok(()) => {
                    metrics::counter!("watch_deliveries_total", "outcome" => "success")
                        .increment(1);
                    self.record_success(subscription).await;
                    return Delivery::Delivered;
                }
                Err(e) => {
                    tracing::debug!(
                        subscription_id = %subscription.id,
                        attempt,
                        error = %e,
                        "Webhook attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < policy.max_attempts() {
                        tokio::time::sleep(policy.delay_after(attempt)).await;
                    }
                }
            }
        }

        metrics::counter!("watch_deliveries_total", "outcome" => "failure").increment(1);
        tracing::warn!(
            subscription_id = %subscription.id,
            callback_url = %subscription.callback_url,
            attempts = policy.max_attempts(),
            error = ?last_error,
            "Webhook delivery failed"
        );
        let paused = self.record_failure(subscription).await;
        Delivery::Failed { paused }
    }

    async fn record_success(&self, subscription: &WatchSubscription) {
        if let Err(e) = with_deadline(
            self.options.storage_timeout,
            "watch_record_success",
            self.persistence
                .watch_record_success(&subscription.id, self.clock.now()),
        )
        .await
        {
            tracing::error!(subscription_id = %subscription.id, error = %e, "Failed to record delivery");
        }
    }

    /// Returns whether this failure paused the subscription
    async fn record_failure(&self, subscription: &WatchSubscription) -> bool {
        let threshold = self.options.failure_threshold;
        let updated = match with_deadline(
            self.options.storage_timeout,
            "watch_record_failure",
            self.persistence
                .watch_record_failure(&subscription.id, threshold, self.clock.now()),
        )
        .await
        {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(subscription_id = %subscription.id, error = %e, "Failed to record delivery failure");
                return false;
            }
        };

        // Only the failure that moves the subscription out of Active reports
        let paused = subscription.status == WatchStatus::Active
            && updated.is_some_and(|s| s.status == WatchStatus::Paused);
        if paused {
            metrics::counter!("watch_subscriptions_paused_total").increment(1);
            tracing::warn!(
                subscription_id = %subscription.id,
                subscriber_id = %subscription.subscriber_id,
                threshold,
                "Paused watch subscription after consecutive failures"
            );
        }
        paused
    }
}

/// Tenant, environment and pattern match for one subscription
pub fn subscription_matches(
    subscription: &WatchSubscription,
    config_key: &str,
    tenant_id: Option<&str>,
    environment: Environment,
) -> bool {
    subscription.watches_tenant(tenant_id)
        && subscription.watches_environment(environment)
        && subscription
            .patterns
            .iter()
            .any(|raw| match KeyPattern::parse(raw) {
                Ok(pattern) => pattern.matches(config_key),
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        pattern = %raw,
                        error = %e,
                        "Skipping unparseable stored pattern"
                    );
                    false
                }
            })
}

fn subscription_not_found(subscription_id: &str) -> TamarindError {
    TamarindError::not_found(format!("subscription '{}'", subscription_id))
}

fn validate_callback_url(callback_url: &str) -> Result<()> {
    let parsed = url::Url::parse(callback_url.trim()).map_err(|e| {
        TamarindError::validation(format!("callback_url '{}' is invalid: {}", callback_url, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(TamarindError::validation(format!(
            "callback_url scheme '{}' must be http or https",
            other
        ))),
    }
}

fn parse_patterns(patterns: &[String]) -> Result<Vec<String>> {
    if patterns.is_empty() {
        return Err(TamarindError::validation("at least one pattern is required"));
    }
    patterns
        .iter()
        .map(|p| KeyPattern::parse(p).map(|parsed| parsed.as_str().to_string()))
        .collect()
}

fn parse_environments(environments: &[String]) -> Result<Vec<Environment>> {
    let mut parsed = Vec::with_capacity(environments.len());
    for raw in environments {
        let environment: Environment = raw.parse()?;
        if !parsed.contains(&environment) {
            parsed.push(environment);
        }
    }
    Ok(parsed)
}
