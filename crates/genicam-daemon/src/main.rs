//! GenICam Device Daemon - Main entry point
//!
//! Hosts the device plugin outside of an orchestrator: fingerprints the
//! configured device inventory, logs every fingerprint, and optionally checks
//! a reservation.

mod config;

use anyhow::Result;
use clap::Parser;
use genicam_core::StaticEnumerator;
use genicam_plugin::{CancellationToken, GenicamDevicePlugin};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "genicam-device")]
#[command(about = "GenICam camera fingerprinting and reservation daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "genicam-device.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single fingerprint cycle, print it as JSON and exit
    #[arg(long)]
    scan_once: bool,

    /// Serial numbers to reserve after the first fingerprint (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    reserve: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", genicam_plugin::PLUGIN_NAME, env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;

    let enumerator = Arc::new(StaticEnumerator::new(config.static_devices()));
    let plugin = GenicamDevicePlugin::new(enumerator);
    plugin.set_config(&config.plugin).await?;

    if args.scan_once {
        let event = plugin.fingerprint_once().await;
        println!("{}", serde_json::to_string_pretty(&event)?);
        if !args.reserve.is_empty() {
            let reservation = plugin.reserve(args.reserve.as_slice()).await?;
            println!("{}", serde_json::to_string_pretty(&reservation)?);
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
            cancel.cancel();
        });
    }

    if config.daemon.stats_interval_secs > 0 {
        let interval = Duration::from_secs(config.daemon.stats_interval_secs);
        let mut stats = plugin.start_stats(cancel.clone(), interval)?;
        tokio::spawn(async move {
            while let Some(sample) = stats.recv().await {
                debug!(groups = sample.groups.len(), "Stats sample");
            }
        });
    }

    let mut events = plugin.start_fingerprinting(cancel.clone());
    let mut pending_reservation = !args.reserve.is_empty();

    while let Some(event) = events.recv().await {
        for group in &event.groups {
            info!(
                group = %group.name,
                devices = ?group.device_ids(),
                "Device group"
            );
        }
        info!(groups = event.groups.len(), devices = event.device_count(), "Fingerprint");

        if pending_reservation {
            pending_reservation = false;
            match plugin.reserve(args.reserve.as_slice()).await {
                Ok(reservation) => {
                    for (name, value) in &reservation.envs {
                        info!(env = %name, value = %value, "Reservation");
                    }
                }
                Err(e) => warn!(error = %e, "Reservation failed"),
            }
        }
    }

    info!("Fingerprint stream closed");
    Ok(())
}
