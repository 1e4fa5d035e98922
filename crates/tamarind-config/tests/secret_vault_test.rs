//! SecretVault behaviour against the in-memory document store

mod common;

use chrono::TimeDelta;
use common::{FailingSecretUpdates, Harness, encryptor};
use tamarind_common::{Clock, MASKED_VALUE, TamarindError};
use tamarind_config::service::ChangeEmitter;
use tamarind_config::{ChangeType, CreateSecretRequest, ListQuery, SecretLookup};
use tamarind_persistence::entity::{ConfigValue, RotationPolicy, SecretAction, SecretStatus};

fn db_password() -> CreateSecretRequest {
    CreateSecretRequest::new("db.password", "production", "hunter2")
}

fn lookup() -> SecretLookup {
    SecretLookup::new("db.password", "production")
}

#[tokio::test]
async fn test_metadata_views_are_masked() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());

    let created = vault.create(db_password(), Some("alice")).await.unwrap();
    assert_eq!(created.masked_value, MASKED_VALUE);
    assert_eq!(created.version, 1);
    assert_eq!(created.status, SecretStatus::Active);
    assert_eq!(created.rotation_policy, RotationPolicy::Manual);

    let by_id = vault.get_by_id(&created.id).await.unwrap();
    assert_eq!(by_id.masked_value, MASKED_VALUE);

    let listed = vault.list(ListQuery::default()).await.unwrap();
    assert_eq!(listed.total_count, 1);
    assert!(listed.page_items.iter().all(|s| s.masked_value == MASKED_VALUE));

    let rendered = serde_json::to_string(&listed).unwrap();
    assert!(!rendered.contains("hunter2"));
}

#[tokio::test]
async fn test_read_decrypts_and_records_access() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());
    let created = vault.create(db_password(), None).await.unwrap();

    let revealed = vault
        .get_by_key(lookup().with_service("billing"), Some("svc-billing"))
        .await
        .unwrap();
    assert_eq!(revealed.value, "hunter2");
    assert_eq!(revealed.secret.access_count, 1);
    assert_eq!(revealed.secret.last_accessed_at, Some(harness.clock.now()));
    assert!(!format!("{:?}", revealed).contains("hunter2"));

    vault.get_by_key(lookup(), None).await.unwrap();
    assert_eq!(vault.get_by_id(&created.id).await.unwrap().access_count, 2);

    let logs = vault.get_access_logs(&created.id, 1, 10).await.unwrap();
    let actions: Vec<SecretAction> = logs.page_items.iter().map(|l| l.action).collect();
    assert_eq!(
        actions,
        vec![SecretAction::Read, SecretAction::Read, SecretAction::Create]
    );
    assert!(logs.page_items.iter().all(|l| l.success));
    let billing_read = &logs.page_items[1];
    assert_eq!(billing_read.actor, "svc-billing");
    assert_eq!(billing_read.service_name.as_deref(), Some("billing"));
}

#[tokio::test]
async fn test_missing_secret_is_not_found() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());

    let err = vault.get_by_key(lookup(), None).await.unwrap_err();
    assert!(err.is_not_found());

    let failed = vault.get_access_logs("", 1, 10).await.unwrap();
    assert_eq!(failed.total_count, 1);
    let entry = &failed.page_items[0];
    assert!(!entry.success);
    assert_eq!(entry.secret_key, "db.password");
    assert_eq!(entry.fail_reason.as_deref(), Some("secret not found"));
}

#[tokio::test]
async fn test_wrong_key_read_fails_without_leaking_cause() {
    let harness = Harness::new();
    let writer = harness.vault(encryptor(), ChangeEmitter::disabled());
    let created = writer.create(db_password(), None).await.unwrap();

    let reader = harness.vault(encryptor(), ChangeEmitter::disabled());
    let err = reader.get_by_key(lookup(), None).await.unwrap_err();
    assert_eq!(err, TamarindError::internal("failed to read secret"));

    let logs = reader.get_access_logs(&created.id, 1, 10).await.unwrap();
    let read = &logs.page_items[0];
    assert_eq!(read.action, SecretAction::Read);
    assert!(!read.success);
    assert_eq!(read.fail_reason.as_deref(), Some("decryption failed"));
    assert_eq!(reader.get_by_id(&created.id).await.unwrap().access_count, 0);
}

#[tokio::test]
async fn test_rotation_becomes_due_after_interval() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());
    let created = vault
        .create(db_password().with_auto_rotation(1), None)
        .await
        .unwrap();
    vault
        .create(
            CreateSecretRequest::new("api.token", "production", "manual"),
            None,
        )
        .await
        .unwrap();

    assert!(vault.get_secrets_needing_rotation().await.unwrap().is_empty());

    harness.clock.advance(TimeDelta::hours(23));
    assert!(vault.get_secrets_needing_rotation().await.unwrap().is_empty());

    harness.clock.advance(TimeDelta::hours(1));
    let due = vault.get_secrets_needing_rotation().await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, created.id);

    vault.rotate(&created.id, "hunter3", Some("rotator")).await.unwrap();
    assert!(vault.get_secrets_needing_rotation().await.unwrap().is_empty());

    harness.clock.advance(TimeDelta::days(1));
    assert_eq!(vault.get_secrets_needing_rotation().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rotation_commits_in_a_single_write() {
    let harness = Harness::new();
    let secrets = FailingSecretUpdates::new(harness.persistence.clone(), 2);
    let vault = harness.vault_over(secrets.clone(), encryptor(), ChangeEmitter::disabled());
    let created = vault
        .create(db_password().with_auto_rotation(1), None)
        .await
        .unwrap();

    let rotated = vault.rotate(&created.id, "hunter3", Some("rotator")).await.unwrap();
    assert_eq!(secrets.updates(), 1);
    assert_eq!(rotated.version, 2);
    assert_eq!(rotated.status, SecretStatus::Active);

    let stored = vault.get_by_id(&created.id).await.unwrap();
    assert_eq!(stored.status, SecretStatus::Active);
    assert_eq!(stored.version, 2);

    let audits = vault.get_audit_logs(&created.id, 1, 10).await.unwrap();
    assert_eq!(audits.page_items[0].action, "rotate");
    assert_eq!(
        audits.page_items[0]
            .details
            .get("status_transition")
            .map(String::as_str),
        Some("active->rotated->active")
    );

    harness.clock.advance(TimeDelta::days(5));
    assert_eq!(vault.get_secrets_needing_rotation().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_rotation_write_leaves_secret_unchanged() {
    let harness = Harness::new();
    let secrets = FailingSecretUpdates::new(harness.persistence.clone(), 1);
    let vault = harness.vault_over(secrets, encryptor(), ChangeEmitter::disabled());
    let created = vault
        .create(db_password().with_auto_rotation(1), None)
        .await
        .unwrap();
    harness.clock.advance(TimeDelta::days(2));

    assert!(matches!(
        vault.rotate(&created.id, "hunter3", None).await,
        Err(TamarindError::Internal(_))
    ));

    let stored = vault.get_by_id(&created.id).await.unwrap();
    assert_eq!(stored.status, SecretStatus::Active);
    assert_eq!(stored.version, 1);
    assert_eq!(stored.last_rotated_at, None);

    let logs = vault.get_access_logs(&created.id, 1, 10).await.unwrap();
    let attempt = &logs.page_items[0];
    assert_eq!(attempt.action, SecretAction::Rotate);
    assert!(!attempt.success);
    assert_eq!(attempt.fail_reason.as_deref(), Some("write failed"));

    assert_eq!(vault.get_secrets_needing_rotation().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rotate_replaces_value_and_stamps_rotation() {
    let harness = Harness::new();
    let (emitter, mut events) = ChangeEmitter::channel();
    let vault = harness.vault(encryptor(), emitter);
    let created = vault
        .create(db_password().with_auto_rotation(30), None)
        .await
        .unwrap();

    harness.clock.advance(TimeDelta::minutes(5));
    let rotated = vault.rotate(&created.id, "hunter3", Some("rotator")).await.unwrap();
    assert_eq!(rotated.version, 2);
    assert_eq!(rotated.status, SecretStatus::Active);
    assert_eq!(rotated.last_rotated_at, Some(harness.clock.now()));
    assert_eq!(rotated.updated_by, "rotator");

    let revealed = vault.get_by_key(lookup(), None).await.unwrap();
    assert_eq!(revealed.value, "hunter3");

    let create = events.recv().await.unwrap();
    assert_eq!(create.change_type, ChangeType::Create);
    let rotate = events.recv().await.unwrap();
    assert_eq!(rotate.change_type, ChangeType::Rotate);
    assert_eq!(rotate.version, 2);
    assert_eq!(rotate.old_value, None);
    assert_eq!(rotate.new_value, None);
    assert_eq!(
        rotate.metadata.get("resource_type").map(String::as_str),
        Some("secret")
    );
}

#[tokio::test]
async fn test_update_keeps_rotation_anchor() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());
    let created = vault.create(db_password(), None).await.unwrap();

    let updated = vault.update(&created.id, "correct-horse", None).await.unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.last_rotated_at, None);
    assert_eq!(
        vault.get_by_key(lookup(), None).await.unwrap().value,
        "correct-horse"
    );

    assert!(matches!(
        vault.update(&created.id, "", None).await,
        Err(TamarindError::Validation(_))
    ));
    assert!(vault.update("missing", "x", None).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_expired_secret_is_unreadable() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());
    let expires_at = harness.clock.now() + TimeDelta::hours(1);
    let created = vault
        .create(db_password().with_auto_rotation(1).with_expiry(expires_at), None)
        .await
        .unwrap();
    assert_eq!(vault.get_by_key(lookup(), None).await.unwrap().value, "hunter2");

    harness.clock.advance(TimeDelta::days(2));
    assert!(vault.get_by_key(lookup(), None).await.unwrap_err().is_not_found());
    assert!(matches!(
        vault.rotate(&created.id, "late", None).await,
        Err(TamarindError::Validation(_))
    ));
    assert!(vault.get_secrets_needing_rotation().await.unwrap().is_empty());

    let logs = vault.get_access_logs(&created.id, 1, 10).await.unwrap();
    assert_eq!(
        logs.page_items[1].fail_reason.as_deref(),
        Some("secret expired")
    );
}

#[tokio::test]
async fn test_create_validation() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());

    let zero_days = db_password().with_auto_rotation(0);
    assert!(matches!(
        vault.create(zero_days, None).await,
        Err(TamarindError::Validation(_))
    ));

    let past = db_password().with_expiry(harness.clock.now() - TimeDelta::seconds(1));
    assert!(matches!(
        vault.create(past, None).await,
        Err(TamarindError::Validation(_))
    ));

    let empty = CreateSecretRequest::new("db.password", "production", "");
    assert!(matches!(
        vault.create(empty, None).await,
        Err(TamarindError::Validation(_))
    ));

    vault.create(db_password(), None).await.unwrap();
    assert!(matches!(
        vault.create(db_password(), None).await,
        Err(TamarindError::Conflict(_))
    ));
    vault
        .create(db_password().with_tenant("acme"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_removes_secret_and_audits_masked() {
    let harness = Harness::new();
    let vault = harness.vault(encryptor(), ChangeEmitter::disabled());
    let created = vault.create(db_password(), Some("alice")).await.unwrap();
    vault.update(&created.id, "rotated-by-hand", Some("alice")).await.unwrap();

    vault.delete(&created.id, Some("bob")).await.unwrap();
    assert!(vault.get_by_id(&created.id).await.unwrap_err().is_not_found());
    assert!(vault.get_by_key(lookup(), None).await.unwrap_err().is_not_found());
    assert!(vault.delete(&created.id, None).await.unwrap_err().is_not_found());

    let audits = vault.get_audit_logs(&created.id, 1, 10).await.unwrap();
    let actions: Vec<&str> = audits.page_items.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(actions, vec!["delete", "update", "create"]);
    let masked = Some(ConfigValue::Text(MASKED_VALUE.to_string()));
    for audit in &audits.page_items {
        assert_eq!(audit.resource_type, "secret");
        assert!(audit.old_value.is_none() || audit.old_value == masked);
        assert!(audit.new_value.is_none() || audit.new_value == masked);
    }

    let access = vault.get_access_logs(&created.id, 1, 10).await.unwrap();
    assert_eq!(access.page_items[0].action, SecretAction::Delete);
    assert_eq!(access.page_items[0].actor, "bob");
}
