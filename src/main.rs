//! # RC433 Link
//!
//! Loopback bench for the 433 MHz RC car link.
//!
//! Drives a scripted joystick sweep through the remote pipeline, over a
//! virtual radio medium, into the pulse receiver and the car's motor and
//! servo outputs, logging link statistics as it goes.

use anyhow::{Context, Result};
use rc433_link::bench::{Bench, SweepJoystick};
use rc433_link::config::{Config, LoggingConfig};
use std::future::Future;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "rc433-link.log";

/// Set up console logging and, if enabled, a daily rolling log file
///
/// `RUST_LOG` overrides the configured level.
///
/// # Returns
///
/// * `Option<WorkerGuard>` - Must be held until exit so buffered file output is flushed
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = if config.file_enabled {
        let appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Resolve once `signal` fires
///
/// If the signal handler cannot be installed this never resolves, so the
/// bench keeps running instead of exiting on its first poll.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Failed to listen for Ctrl+C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Main entry point for the RC433 link bench
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration from the first argument, or use defaults
///    - Set up logging
///    - Wire remote, loopback medium, receiver and vehicle
///
/// 2. **Main Loop**
///    - Run one transmit/receive cycle every `cycle_interval_ms`
///    - Log link statistics every `status_interval_cycles`
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration file cannot be read or is invalid
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO rc433_link: RC433 link v0.1.0 starting...
/// INFO rc433_link::bench: Starting bench loop every 20 ms
/// INFO rc433_link::bench: Cycle 50: sent 24 commands, 26 keep-alives | rx accepted=24 ...
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);

    info!("RC433 link v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Symbols {}/{} us, threshold {} us, frame timeout {} us",
        config.timing.short_pulse_us,
        config.timing.long_pulse_us,
        config.timing.bit_threshold_us,
        config.timing.frame_timeout_us
    );

    let mut bench =
        Bench::new(&config, SweepJoystick::new()).context("Failed to initialize bench")?;

    info!("Press Ctrl+C to exit");

    let cycles = bench
        .run(wait_for_shutdown(tokio::signal::ctrl_c()), None)
        .await;

    bench.log_status();
    info!("Total cycles: {}", cycles);

    Ok(())
}
