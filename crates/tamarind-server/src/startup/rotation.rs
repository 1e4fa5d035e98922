//! Periodic scan for secrets whose rotation interval has elapsed
//!
//! The scanner only reports; the new value has to come from whoever owns the
//! credential, so rotation itself stays an explicit `rotate` call.

use std::sync::Arc;
use std::time::Duration;

use tamarind_common::Result;
use tamarind_config::SecretVault;
use tokio::sync::watch;

use super::shutdown::shutdown_requested;

/// Run one scan, returning how many secrets are due
pub async fn scan_rotation_due(vault: &SecretVault) -> Result<usize> {
    let due = vault.get_secrets_needing_rotation().await?;
    for secret in &due {
        tracing::warn!(
            secret_id = %secret.id,
            secret_key = %secret.secret_key,
            environment = %secret.environment,
            tenant_id = ?secret.tenant_id,
            rotation_days = secret.rotation_days,
            "Secret is due for rotation"
        );
    }
    crate::metrics::set_rotation_due(due.len());
    Ok(due.len())
}

pub async fn run_rotation_scanner(
    vault: Arc<SecretVault>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Rotation scanner started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match scan_rotation_due(&vault).await {
                    Ok(0) => tracing::debug!("No secrets due for rotation"),
                    Ok(due) => tracing::info!(due, "Rotation scan finished"),
                    Err(e) => tracing::error!(error = %e, "Rotation scan failed"),
                }
            }
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }
    tracing::info!("Rotation scanner stopped");
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use tamarind_common::{Encryptor, ManualClock};
    use tamarind_config::service::ChangeEmitter;
    use tamarind_config::{AuditRecorder, CreateSecretRequest};
    use tamarind_persistence::MemoryPersistService;

    use super::*;
    use crate::startup::ShutdownSignal;

    fn vault(clock: Arc<ManualClock>) -> Arc<SecretVault> {
        let persistence = Arc::new(MemoryPersistService::default());
        let audit = AuditRecorder::new(persistence.clone(), clock.clone(), Duration::from_secs(1));
        let encryptor = Encryptor::new(&Encryptor::generate_key()).unwrap();
        Arc::new(
            SecretVault::new(
                persistence,
                Arc::new(encryptor),
                audit,
                ChangeEmitter::disabled(),
            )
            .with_clock(clock),
        )
    }

    #[tokio::test]
    async fn test_scan_counts_due_secrets() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
        ));
        let vault = vault(clock.clone());
        vault
            .create(
                CreateSecretRequest::new("db.password", "production", "s3cret").with_auto_rotation(7),
                None,
            )
            .await
            .unwrap();

        assert_eq!(scan_rotation_due(&vault).await.unwrap(), 0);
        clock.advance(TimeDelta::days(7));
        assert_eq!(scan_rotation_due(&vault).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scanner_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let signal = ShutdownSignal::new();
        let scanner = tokio::spawn(run_rotation_scanner(
            vault(clock),
            Duration::from_secs(60),
            signal.subscribe(),
        ));

        tokio::time::sleep(Duration::from_secs(150)).await;
        signal.shutdown();
        tokio::time::timeout(Duration::from_secs(1), scanner)
            .await
            .unwrap()
            .unwrap();
    }
}
