//! Background tasks: the stale-node sweeper and the VM reconciliation loop.
//!
//! Both honor the shutdown signal and exit promptly when it flips; the
//! server gives them five seconds before aborting.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::HeartbeatConfig;
use crate::services::{NodeService, VmService};

/// Spawn the sweeper and reconciliation loops.
pub fn spawn_background_tasks(
    node_service: Arc<NodeService>,
    vm_service: Arc<VmService>,
    config: HeartbeatConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(sweeper_loop(node_service, config, shutdown.clone())),
        tokio::spawn(reconcile_loop(vm_service, config, shutdown)),
    ]
}

/// Every 30 s, transition nodes without recent heartbeats to Disconnected.
async fn sweeper_loop(
    node_service: Arc<NodeService>,
    config: HeartbeatConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(
        interval_secs = config.sweep_interval_secs,
        timeout_secs = config.timeout_secs,
        "🔄 Stale-node sweeper started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match node_service.sweep_stale_nodes(Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => quantix_common::log_reconcile!(
                        "node-sweeper",
                        count,
                        "disconnected {} stale node(s)",
                        count
                    ),
                    Err(e) => warn!(error = %e, "Sweeper pass failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("🌙 Stale-node sweeper stopping");
                    return;
                }
            }
        }
    }
}

/// Slower loop marking managed VMs Lost when their host stopped reporting
/// them.
async fn reconcile_loop(
    vm_service: Arc<VmService>,
    config: HeartbeatConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.reconcile_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(
        interval_secs = config.reconcile_interval_secs,
        lost_grace_secs = config.lost_grace_secs,
        "🔄 VM reconciliation loop started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match vm_service.mark_lost_vms(Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => quantix_common::log_reconcile!(
                        "vm-lost",
                        count,
                        "marked {} VM(s) Lost",
                        count
                    ),
                    Err(e) => warn!(error = %e, "Reconciliation pass failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("🌙 VM reconciliation loop stopping");
                    return;
                }
            }
        }
    }
}
