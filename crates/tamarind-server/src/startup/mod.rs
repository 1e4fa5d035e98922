//! Application startup utilities

mod components;
mod logging;
mod rotation;
mod shutdown;

pub use components::Components;
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use rotation::{run_rotation_scanner, scan_rotation_due};
pub use shutdown::{ShutdownSignal, shutdown_requested, wait_for_os_signal};
