use clap::Parser;
use tamarind_server::model::{Cli, Configuration};
use tamarind_server::startup::{
    Components, ShutdownSignal, init_logging, run_rotation_scanner, wait_for_os_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let configuration = Configuration::load(&cli)?;

    let _logging_guard = init_logging(&configuration.logging_config())
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    tamarind_server::metrics::init_metrics();

    let (components, events) = Components::build(&configuration)?;
    let shutdown = ShutdownSignal::new();

    let dispatcher = tokio::spawn(components.dispatcher.clone().run(events));
    let scanner = tokio::spawn(run_rotation_scanner(
        components.secret_vault.clone(),
        configuration.rotation_scan_interval(),
        shutdown.subscribe(),
    ));

    tracing::info!("Tamarind server started");
    wait_for_os_signal().await;
    shutdown.shutdown();

    // Dropping the stores closes the change channel, letting the dispatcher
    // drain what was already emitted
    drop(components);
    if let Err(e) = scanner.await {
        tracing::error!(error = %e, "Rotation scanner panicked");
    }
    if let Err(e) = dispatcher.await {
        tracing::error!(error = %e, "Notification dispatcher panicked");
    }

    tracing::info!("Tamarind server stopped");
    Ok(())
}
