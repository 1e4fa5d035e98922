// Metric descriptions for the counters recorded by the core crates
// No exporter is installed here; a recorder is wired by the embedding process

use metrics::{describe_counter, describe_gauge, gauge};

/// Register all metric descriptions; call once at start-up
pub fn init_metrics() {
    describe_counter!(
        "config_mutations_total",
        "Total number of config mutations by action"
    );
    describe_counter!("cache_hits_total", "Total number of config cache hits");
    describe_counter!("cache_misses_total", "Total number of config cache misses");

    describe_counter!(
        "secret_access_total",
        "Total number of secret operations by action and outcome"
    );
    describe_gauge!(
        "secrets_rotation_due",
        "Auto-rotating secrets whose interval has elapsed at the last scan"
    );

    describe_counter!(
        "change_events_dropped_total",
        "Change events dropped before reaching the dispatcher, by reason"
    );
    describe_counter!(
        "watch_deliveries_total",
        "Total number of webhook deliveries by outcome"
    );
    describe_counter!(
        "watch_subscriptions_paused_total",
        "Total number of subscriptions paused after consecutive failures"
    );

    tracing::info!("Metrics initialized");
}

pub fn set_rotation_due(count: usize) {
    gauge!("secrets_rotation_due").set(count as f64);
}
