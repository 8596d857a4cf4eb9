//! # Quantix-vDC Control Plane Server
//!
//! Serves the Connect JSON API, drives node daemons over gRPC, and runs the
//! heartbeat sweeper and VM reconciliation loops.
//!
//! ## Usage
//! ```bash
//! quantix-vdc --config /etc/quantix/vdc.yaml
//! quantix-vdc --dev   # in-memory repositories, mock daemons
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use quantix_vdc::api;
use quantix_vdc::cli::Args;
use quantix_vdc::config::Config;
use quantix_vdc::daemon::{DaemonClientFactory, GrpcDaemonClientFactory, MockDaemonClientFactory};
use quantix_vdc::repo::postgres;
use quantix_vdc::services::{MemoryNorthboundWriter, Repositories, Services};
use quantix_vdc::tasks;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut log_options = quantix_common::LogOptions::default().with_level(&args.log_level);
    if args.json_logs {
        log_options = log_options.json();
    }
    if let Some(path) = &args.log_file {
        log_options = log_options.with_file(path);
    }
    quantix_common::init_logging(&log_options)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Quantix-vDC control plane"
    );

    let config = match Config::load(&args.config) {
        Ok(cfg) => {
            info!(config_path = %args.config, "Configuration loaded");
            cfg
        }
        Err(e) if args.config == "/etc/quantix/vdc.yaml" => {
            info!(error = %e, "No config file found, using defaults");
            Config::default()
        }
        Err(e) => {
            error!(error = %e, path = %args.config, "Failed to load configuration");
            return Err(e);
        }
    };
    let config = config.with_cli_overrides(&args);

    // Repositories and daemon transport: Postgres + gRPC in production,
    // in-memory + mock in dev mode.
    let (repos, factory): (Repositories, Arc<dyn DaemonClientFactory>) = if args.dev {
        info!("🔧 Dev mode: in-memory repositories and mock node daemons");
        (Repositories::in_memory(), Arc::new(MockDaemonClientFactory::new()))
    } else {
        let pool = postgres::connect(&config.database.url, config.database.max_connections)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        info!(max_connections = config.database.max_connections, "Database ready");
        (
            Repositories::postgres(pool),
            Arc::new(GrpcDaemonClientFactory::new(Duration::from_secs(
                config.daemon.connect_timeout_secs,
            ))),
        )
    };

    // The SDN backend is an external collaborator; the recording writer
    // stands in until one is wired up.
    let writer = Arc::new(MemoryNorthboundWriter::new());

    let services = Arc::new(Services::wire(repos, factory, writer, &config));

    // Background tasks with a shutdown signal they must honor within 5 s.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task_handles = tasks::spawn_background_tasks(
        services.nodes.clone(),
        services.vms.clone(),
        config.heartbeat,
        shutdown_rx,
    );

    let router = api::router(services.clone());
    let listener = tokio::net::TcpListener::bind(&config.server.listen_address).await?;
    info!(
        listen = %config.server.listen_address,
        daemon_port = config.daemon.port,
        "📡 API server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🌙 Shutting down");
    shutdown_tx.send(true).ok();
    for mut handle in task_handles {
        if tokio::time::timeout(Duration::from_secs(5), &mut handle).await.is_err() {
            warn!("Background task did not stop within 5s, aborting");
            handle.abort();
        }
    }
    services.daemon_pool.close_all();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
