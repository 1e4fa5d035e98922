//! NotificationDispatcher fan-out, failure tracking and worker loop

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::{Harness, RecordingWebhook};
use serde_json::json;
use tamarind_common::{Clock, Environment, TamarindError};
use tamarind_config::service::ChangeEmitter;
use tamarind_config::watch::{
    Backoff, DispatcherOptions, EVENT_HEADER, ReqwestWebhookClient, RetryPolicy,
};
use tamarind_config::{
    ChangeType, ConfigChangeNotification, CreateConfigRequest, NotificationDispatcher,
    SubscribeRequest, UpdateSubscriptionRequest,
};
use tamarind_persistence::entity::{ConfigValue, WatchStatus};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn subscribe_db(callback_url: &str) -> SubscribeRequest {
    SubscribeRequest {
        subscriber_id: "billing-1".to_string(),
        service_name: "billing".to_string(),
        callback_url: callback_url.to_string(),
        patterns: vec!["db.*".to_string()],
        environments: vec!["production".to_string()],
        tenant_id: None,
    }
}

fn change(key: &str, environment: Environment, at: chrono::DateTime<chrono::Utc>) -> ConfigChangeNotification {
    ConfigChangeNotification {
        config_key: key.to_string(),
        tenant_id: None,
        environment,
        old_value: Some(ConfigValue::Json(json!(30))),
        new_value: Some(ConfigValue::Json(json!(60))),
        version: 2,
        change_type: ChangeType::Activate,
        changed_by: "alice".to_string(),
        timestamp: at,
        metadata: BTreeMap::new(),
    }
}

#[tokio::test]
async fn test_environment_filter_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header(EVENT_HEADER, "activate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let dispatcher =
        harness.dispatcher(Arc::new(ReqwestWebhookClient::new().unwrap()));
    dispatcher
        .subscribe(subscribe_db(&format!("{}/hook", server.uri())))
        .await
        .unwrap();

    let now = harness.clock.now();
    let delivered = dispatcher
        .dispatch(&change("db.timeout", Environment::Production, now))
        .await
        .unwrap();
    assert_eq!(delivered.matched, 1);
    assert_eq!(delivered.delivered, 1);

    let skipped = dispatcher
        .dispatch(&change("db.timeout", Environment::Staging, now))
        .await
        .unwrap();
    assert_eq!(skipped.matched, 0);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["config_key"], "db.timeout");
    assert_eq!(body["environment"], "production");
    assert_eq!(body["change_type"], "activate");
}

#[tokio::test]
async fn test_subscription_pauses_at_failure_threshold() {
    let harness = Harness::new();
    let client = RecordingWebhook::failing();
    let dispatcher = harness.dispatcher(client.clone());
    let sub = dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();
    let event = change("db.timeout", Environment::Production, harness.clock.now());

    for expected in 1..=4u32 {
        let report = dispatcher.dispatch(&event).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(report.paused.is_empty());
        let stored = dispatcher.get_by_id(&sub.id).await.unwrap();
        assert_eq!(stored.failure_count, expected);
        assert_eq!(stored.status, WatchStatus::Active);
    }

    let fifth = dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(fifth.paused, vec![sub.id.clone()]);
    let paused = dispatcher.get_by_id(&sub.id).await.unwrap();
    assert_eq!(paused.status, WatchStatus::Paused);
    assert_eq!(paused.failure_count, 5);

    // Paused subscriptions receive no attempts at all
    let sixth = dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(sixth.matched, 0);
    assert_eq!(client.attempts(), 5);

    client.set_failing(false);
    let reactivated = dispatcher
        .update_subscription(
            &sub.id,
            UpdateSubscriptionRequest {
                status: Some("active".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reactivated.status, WatchStatus::Active);
    assert_eq!(reactivated.failure_count, 0);

    let report = dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(client.delivered().len(), 1);
}

#[tokio::test]
async fn test_zero_threshold_pauses_and_reports_on_first_failure() {
    let harness = Harness::new();
    let client = RecordingWebhook::failing();
    let dispatcher = harness.dispatcher(client.clone()).with_options(DispatcherOptions {
        failure_threshold: 0,
        retry: RetryPolicy::single_attempt(),
        ..Default::default()
    });
    assert_eq!(dispatcher.options().failure_threshold, 1);
    let sub = dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();
    let event = change("db.timeout", Environment::Production, harness.clock.now());

    let report = dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.paused, vec![sub.id.clone()]);
    let stored = dispatcher.get_by_id(&sub.id).await.unwrap();
    assert_eq!(stored.status, WatchStatus::Paused);
    assert_eq!(stored.failure_count, 1);
}

#[tokio::test]
async fn test_zero_attempt_policy_still_delivers_once() {
    let harness = Harness::new();
    let client = RecordingWebhook::succeeding();
    let dispatcher = harness.dispatcher(client.clone()).with_options(DispatcherOptions {
        retry: RetryPolicy::new(0, Backoff::None),
        ..Default::default()
    });
    dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();
    let event = change("db.timeout", Environment::Production, harness.clock.now());

    let report = dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(client.attempts(), 1);
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let harness = Harness::new();
    let client = RecordingWebhook::failing();
    let dispatcher = harness.dispatcher(client.clone());
    let sub = dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();
    let event = change("db.timeout", Environment::Production, harness.clock.now());

    dispatcher.dispatch(&event).await.unwrap();
    dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(dispatcher.get_by_id(&sub.id).await.unwrap().failure_count, 2);

    client.set_failing(false);
    dispatcher.dispatch(&event).await.unwrap();
    let stored = dispatcher.get_by_id(&sub.id).await.unwrap();
    assert_eq!(stored.failure_count, 0);
    assert_eq!(stored.last_notified, Some(harness.clock.now()));
}

#[tokio::test(start_paused = true)]
async fn test_retries_within_one_event_count_as_one_failure() {
    let harness = Harness::new();
    let options = DispatcherOptions {
        retry: RetryPolicy::new(
            3,
            Backoff::Exponential {
                base: Duration::from_millis(200),
                max: Duration::from_secs(2),
            },
        ),
        ..Default::default()
    };

    let flaky = RecordingWebhook::failing_first(2);
    let dispatcher = harness.dispatcher(flaky.clone()).with_options(options.clone());
    let sub = dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();
    let event = change("db.timeout", Environment::Production, harness.clock.now());

    let report = dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(flaky.attempts(), 3);
    assert_eq!(dispatcher.get_by_id(&sub.id).await.unwrap().failure_count, 0);

    flaky.set_failing(true);
    let report = dispatcher.dispatch(&event).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(flaky.attempts(), 6);
    assert_eq!(dispatcher.get_by_id(&sub.id).await.unwrap().failure_count, 1);
}

#[tokio::test]
async fn test_one_failing_subscriber_does_not_block_others() {
    let harness = Harness::new();
    let good = RecordingWebhook::succeeding();
    let dispatcher = harness.dispatcher(good.clone());
    dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();
    dispatcher
        .subscribe(SubscribeRequest {
            subscriber_id: "search-1".to_string(),
            service_name: "search".to_string(),
            callback_url: "https://search.internal/hook".to_string(),
            patterns: vec!["db.**".to_string(), "cache.*".to_string()],
            environments: Vec::new(),
            tenant_id: None,
        })
        .await
        .unwrap();

    let report = dispatcher
        .dispatch(&change("db.timeout", Environment::Production, harness.clock.now()))
        .await
        .unwrap();
    assert_eq!(report.matched, 2);
    assert_eq!(report.delivered, 2);
    let mut urls: Vec<String> = good.delivered().into_iter().map(|(url, _)| url).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "http://billing.internal/hook".to_string(),
            "https://search.internal/hook".to_string()
        ]
    );
}

#[tokio::test]
async fn test_subscribe_validation() {
    let harness = Harness::new();
    let dispatcher = harness.dispatcher(RecordingWebhook::succeeding());

    let cases = [
        SubscribeRequest {
            subscriber_id: String::new(),
            ..subscribe_db("http://a/hook")
        },
        SubscribeRequest {
            service_name: " ".to_string(),
            ..subscribe_db("http://a/hook")
        },
        subscribe_db("ftp://a/hook"),
        subscribe_db("not a url"),
        SubscribeRequest {
            patterns: Vec::new(),
            ..subscribe_db("http://a/hook")
        },
        SubscribeRequest {
            patterns: vec!["db.**.host".to_string()],
            ..subscribe_db("http://a/hook")
        },
        SubscribeRequest {
            environments: vec!["qa".to_string()],
            ..subscribe_db("http://a/hook")
        },
    ];
    for form in cases {
        assert!(
            matches!(dispatcher.subscribe(form.clone()).await, Err(TamarindError::Validation(_))),
            "{form:?} should be rejected"
        );
    }

    dispatcher.subscribe(subscribe_db("http://a/hook")).await.unwrap();
    assert!(matches!(
        dispatcher.subscribe(subscribe_db("http://b/hook")).await,
        Err(TamarindError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_matching_respects_tenant_scope() {
    let harness = Harness::new();
    let dispatcher = harness.dispatcher(RecordingWebhook::succeeding());
    dispatcher
        .subscribe(SubscribeRequest {
            tenant_id: Some("acme".to_string()),
            ..subscribe_db("http://acme/hook")
        })
        .await
        .unwrap();
    dispatcher
        .subscribe(SubscribeRequest {
            subscriber_id: "all-tenants".to_string(),
            ..subscribe_db("http://all/hook")
        })
        .await
        .unwrap();

    let acme = dispatcher
        .get_matching_subscriptions("db.host", Some("acme"), "production")
        .await
        .unwrap();
    assert_eq!(acme.len(), 2);

    let other = dispatcher
        .get_matching_subscriptions("db.host", Some("globex"), "production")
        .await
        .unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].subscriber_id, "all-tenants");

    assert!(
        dispatcher
            .get_matching_subscriptions("db.host", None, "staging")
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        dispatcher
            .get_matching_subscriptions("db.host", None, "qa")
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_subscription_management() {
    let harness = Harness::new();
    let dispatcher = harness.dispatcher(RecordingWebhook::succeeding());
    let sub = dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();
    assert_eq!(sub.status, WatchStatus::Active);
    assert_eq!(sub.environments, vec![Environment::Production]);

    let updated = dispatcher
        .update_subscription(
            &sub.id,
            UpdateSubscriptionRequest {
                patterns: Some(vec!["cache.*".to_string()]),
                environments: Some(Vec::new()),
                status: Some("paused".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.patterns, vec!["cache.*".to_string()]);
    assert_eq!(updated.status, WatchStatus::Paused);
    assert!(
        dispatcher
            .get_matching_subscriptions("cache.ttl", None, "staging")
            .await
            .unwrap()
            .is_empty()
    );

    assert!(matches!(
        dispatcher
            .update_subscription(
                &sub.id,
                UpdateSubscriptionRequest {
                    callback_url: Some("mailto:ops@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await,
        Err(TamarindError::Validation(_))
    ));

    let page = dispatcher.list(1, 10).await.unwrap();
    assert_eq!(page.total_count, 1);

    dispatcher.unsubscribe(&sub.id).await.unwrap();
    assert!(dispatcher.get_by_id(&sub.id).await.unwrap_err().is_not_found());
    assert!(dispatcher.unsubscribe(&sub.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_trigger_notification_dispatches_synthetic_event() {
    let harness = Harness::new();
    let client = RecordingWebhook::succeeding();
    let dispatcher = harness.dispatcher(client.clone());
    dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();

    let report = dispatcher
        .trigger_notification("db.host", None, "production", Some("ops"))
        .await
        .unwrap();
    assert_eq!(report.delivered, 1);

    let (_, sent) = &client.delivered()[0];
    assert_eq!(sent.config_key, "db.host");
    assert_eq!(sent.changed_by, "ops");
    assert_eq!(sent.metadata.get("trigger").map(String::as_str), Some("manual"));
}

#[tokio::test]
async fn test_worker_delivers_emitted_changes_in_order() {
    let harness = Harness::new();
    let (emitter, events) = ChangeEmitter::channel();
    let store = harness.store(emitter);
    let client = RecordingWebhook::succeeding();
    let dispatcher: Arc<NotificationDispatcher> = Arc::new(harness.dispatcher(client.clone()));
    dispatcher
        .subscribe(subscribe_db("http://billing.internal/hook"))
        .await
        .unwrap();

    let worker = tokio::spawn(dispatcher.clone().run(events));

    let created = store
        .create(
            CreateConfigRequest::new("db.timeout", "production", ConfigValue::Json(json!(30))),
            Some("alice"),
        )
        .await
        .unwrap();
    store
        .create(
            CreateConfigRequest::new("cache.ttl", "production", ConfigValue::Json(json!(5))),
            None,
        )
        .await
        .unwrap();
    store.delete(&created.id, None).await.unwrap();
    drop(store);

    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();

    let kinds: Vec<ChangeType> = client
        .delivered()
        .into_iter()
        .map(|(_, n)| n.change_type)
        .collect();
    assert_eq!(kinds, vec![ChangeType::Create, ChangeType::Delete]);
}
