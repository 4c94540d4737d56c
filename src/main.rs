//! Catpoint - home security status service
//!
//! Reads commands from stdin (`arm home`, `activate Front Door`,
//! `image frame.jpg`, ...) and applies them to the alarm state.
//!
//! Module structure:
//! - `domain/` - Status enums, sensors, errors, collaborator ports
//! - `io/` - Store, detector and listener adapters
//! - `services/` - Transition table, SecurityService, command worker
//! - `infra/` - Config, Metrics

use anyhow::Context;
use catpoint_security::domain::ports::StatusStore;
use catpoint_security::domain::types::Sensor;
use catpoint_security::infra::{Config, Metrics};
use catpoint_security::io::{
    FakeCatDetector, InMemoryStatusStore, JsonFileStatusStore, LoggingListener,
};
use catpoint_security::services::{create_security_worker, SecurityCommand, SecurityService};
use clap::Parser;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Catpoint - alarm status service driven by sensors and a cat detector
#[derive(Parser, Debug)]
#[command(name = "catpoint", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

fn open_store(config: &Config) -> anyhow::Result<Box<dyn StatusStore>> {
    if config.store_in_memory() {
        info!("status_store_in_memory");
        return Ok(Box::new(InMemoryStatusStore::new()));
    }
    let store = JsonFileStatusStore::open(config.store_path())
        .with_context(|| format!("Failed to open status store {}", config.store_path()))?;
    Ok(Box::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), git = %env!("GIT_HASH"), "catpoint starting");

    let args = Args::parse();
    let config = Config::load(args.config.as_deref());

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        confidence_threshold = %config.confidence_threshold(),
        store_path = %config.store_path(),
        store_in_memory = %config.store_in_memory(),
        sensors = %config.sensors().len(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let store = open_store(&config)?;
    let mut service = SecurityService::new(store, FakeCatDetector::new())
        .with_confidence_threshold(config.confidence_threshold())
        .with_metrics(metrics.clone());
    service.add_listener(Arc::new(LoggingListener::new(config.site_id())));

    // Register configured sensors the store does not know yet
    let known: Vec<String> = service.sensors()?.into_iter().map(|s| s.name).collect();
    for seed in config.sensors() {
        if !known.contains(&seed.name) {
            service.add_sensor(Sensor::new(seed.name.clone(), seed.sensor_type))?;
        }
    }

    let (cmd_tx, _snapshot_rx, worker) = create_security_worker(service, 64)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    // Periodic metrics report
    let metrics_interval = config.metrics_interval_secs().max(1);
    let report_metrics = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            report_metrics.report().log();
        }
    });

    // Stdin is read on a plain thread so a pending read never holds up shutdown.
    // EOF drops cmd_tx, which stops the worker.
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "stdin_read_failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<SecurityCommand>() {
                Ok(cmd) => {
                    if cmd_tx.blocking_send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(line = %line, error = %e, "command_parse_failed"),
            }
        }
        info!("stdin_closed");
    });

    let service = worker.run(shutdown_rx).await;

    metrics.report().log();
    info!(alarm_status = %service.alarm_status()?, "catpoint shutdown complete");
    Ok(())
}
