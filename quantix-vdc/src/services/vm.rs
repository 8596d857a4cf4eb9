//! Virtual machine service: CRUD, placement, power operations with
//! rollback, snapshots, guest-agent operations, and host-report
//! reconciliation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DaemonConfig, HeartbeatConfig};
use crate::daemon::{with_retry, DaemonPool, PooledDaemon};
use crate::domain::{
    Error, Node, Resources, Result, Toleration, VirtualMachine, VmOrigin, VmPowerState, VmSpec,
};
use crate::events::EventLog;
use crate::repo::{NodeRepository, VmFilter, VmRepository};
use crate::scheduler::{schedule, PlacementHints};

use super::network::NetworkService;
use super::node::VmStateReport;
use super::with_conflict_retry;

/// Project used when a request does not name one.
pub const DEFAULT_PROJECT_ID: Uuid = Uuid::nil();

/// Request to create a VM.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVmRequest {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    pub name: String,
    pub spec: VmSpec,
    /// Explicit placement; bypasses the scheduler.
    #[serde(default)]
    pub node_id: Option<Uuid>,
    #[serde(default)]
    pub node_selector: HashMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
}

/// Snapshot metadata surfaced to API clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at_unix: i64,
    pub has_memory: bool,
}

impl From<quantix_proto::SnapshotInfo> for VmSnapshot {
    fn from(info: quantix_proto::SnapshotInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            description: info.description,
            created_at_unix: info.created_at_unix,
            has_memory: info.has_memory,
        }
    }
}

/// Result of a filesystem quiesce: the token scopes the freeze and must be
/// presented to thaw; the guest auto-thaws at the deadline regardless.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuiesceInfo {
    pub quiesce_token: String,
    pub frozen_mount_points: Vec<String>,
    pub auto_thaw_at_unix: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleInfo {
    pub protocol: String,
    pub host: String,
    pub port: u32,
    pub password: String,
}

pub struct VmService {
    vms: Arc<dyn VmRepository>,
    nodes: Arc<dyn NodeRepository>,
    daemon_pool: Arc<DaemonPool>,
    events: Arc<EventLog>,
    network: Option<Arc<NetworkService>>,
    daemon: DaemonConfig,
    heartbeat: HeartbeatConfig,
}

impl VmService {
    pub fn new(
        vms: Arc<dyn VmRepository>,
        nodes: Arc<dyn NodeRepository>,
        daemon_pool: Arc<DaemonPool>,
        events: Arc<EventLog>,
        network: Option<Arc<NetworkService>>,
        daemon: DaemonConfig,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        Self { vms, nodes, daemon_pool, events, network, daemon, heartbeat }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.request_timeout_secs)
    }

    fn daemon_address(&self, node: &Node) -> String {
        format!("{}:{}", node.management_ip, self.daemon.port)
    }

    async fn daemon_for_vm(&self, vm: &VirtualMachine) -> Result<Arc<PooledDaemon>> {
        let node_id = vm.status.node_id.ok_or_else(|| {
            Error::FailedPrecondition(format!("VM {} has no node assignment", vm.name))
        })?;
        let node = self.nodes.get(node_id).await?;
        self.daemon_pool
            .get_or_connect(node.id, &self.daemon_address(&node))
            .await
    }

    /// Persist a state change, optionally with a status message.
    async fn set_state(
        &self,
        id: Uuid,
        state: VmPowerState,
        message: Option<String>,
    ) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        let mut status = vm.status.clone();
        status.state = state;
        if let Some(message) = message {
            status.message = message;
        } else {
            status.message.clear();
        }
        self.vms.update_status(id, &status).await
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Create a VM: validate, place, persist intent, reserve node resources
    /// and push the definition to the chosen daemon.
    ///
    /// A failed push keeps the persisted record with the failure in
    /// `status.message`; `reconcile` retries the provisioning.
    pub async fn create(&self, request: CreateVmRequest) -> Result<VirtualMachine> {
        if request.name.trim().is_empty() {
            return Err(Error::InvalidArgument("VM name must not be empty".to_string()));
        }
        request.spec.validate()?;

        let project_id = request.project_id.unwrap_or(DEFAULT_PROJECT_ID);
        if self.vms.get_by_name(project_id, &request.name).await?.is_some() {
            return Err(Error::already_exists("VM", &request.name));
        }

        let hints = PlacementHints {
            node_id: request.node_id,
            node_selector: request.node_selector.clone(),
            tolerations: request.tolerations.clone(),
        };
        let nodes = self.nodes.list(&Default::default()).await?;
        let placement = schedule(&nodes, &request.spec, &hints)
            .map_err(|reason| Error::FailedPrecondition(reason.to_string()))?;

        let mut vm = VirtualMachine::new(project_id, request.name, request.spec);
        vm.status.node_id = Some(placement.node_id);
        let vm = self.vms.create(&vm).await?;

        // Reservation happens in the same logical unit as the insert; if the
        // node filled up since scheduling, withdraw the intent.
        if let Err(e) = self.reserve_on_node(placement.node_id, &placement.requested).await {
            self.vms.delete(vm.id).await.ok();
            return Err(e);
        }

        quantix_common::log_placement!(
            vm.id,
            placement.node_id,
            "VM {} placed ({} vCPU, {} MiB)",
            vm.name,
            placement.requested.cpu_cores,
            placement.requested.memory_mib
        );

        match self.push_create(&vm).await {
            Ok(()) => self.vms.get(vm.id).await,
            Err(e) => {
                warn!(vm_id = %vm.id, error = %e, "🖥️ Hypervisor provisioning failed, intent retained");
                self.set_state(
                    vm.id,
                    VmPowerState::Stopped,
                    Some(format!("hypervisor provisioning failed: {}", e)),
                )
                .await
            }
        }
    }

    async fn push_create(&self, vm: &VirtualMachine) -> Result<()> {
        let daemon = self.daemon_for_vm(vm).await?;
        let _permit = daemon.try_acquire()?;
        let request = quantix_proto::CreateVmOnNodeRequest {
            vm_id: vm.id.to_string(),
            name: vm.name.clone(),
            spec: Some(to_proto_spec(&vm.spec)),
        };
        // Create is not idempotent by construction, so no automatic retry.
        daemon
            .client()
            .create_vm(request, self.request_timeout())
            .await
            .map(|_| ())
    }

    /// Retry hypervisor provisioning for a VM whose create push failed.
    pub async fn reconcile(&self, id: Uuid) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        match self.push_create(&vm).await {
            // The daemon already knows the VM: converged.
            Ok(()) | Err(Error::AlreadyExists(_)) => {
                self.set_state(id, vm.status.state, None).await
            }
            Err(e) => {
                self.set_state(
                    id,
                    vm.status.state,
                    Some(format!("hypervisor provisioning failed: {}", e)),
                )
                .await?;
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<VirtualMachine> {
        self.vms.get(id).await
    }

    pub async fn list(&self, filter: &VmFilter) -> Result<Vec<VirtualMachine>> {
        self.vms.list(filter).await
    }

    /// Spec mutation. Tag-based security groups are resynced when labels
    /// change.
    pub async fn update(&self, vm: &VirtualMachine) -> Result<VirtualMachine> {
        vm.spec.validate()?;
        let previous = self.vms.get(vm.id).await?;
        let updated = self.vms.update(vm).await?;
        if previous.spec.labels != updated.spec.labels {
            if let Some(network) = &self.network {
                network.on_vm_labels_changed(&updated).await;
            }
        }
        Ok(updated)
    }

    /// Flip a host-discovered VM to managed.
    pub async fn adopt(&self, id: Uuid) -> Result<VirtualMachine> {
        with_conflict_retry(|| async {
            let mut vm = self.vms.get(id).await?;
            vm.adopt()?;
            self.vms.update(&vm).await
        })
        .await
    }

    /// Delete a VM. Running VMs require `force`. When the daemon cannot be
    /// reached the record is retained in `Deleting` until the host confirms
    /// or the admin purges.
    pub async fn delete(&self, id: Uuid, force: bool) -> Result<()> {
        let vm = self.vms.get(id).await?;
        if vm.status.state.is_active() && !force {
            return Err(Error::FailedPrecondition(format!(
                "VM {} is {}; stop it first or use force",
                vm.name, vm.status.state
            )));
        }

        if let Some(node_id) = vm.status.node_id {
            let push = async {
                let daemon = self.daemon_for_vm(&vm).await?;
                let _permit = daemon.try_acquire()?;
                with_retry(|| async {
                    daemon
                        .client()
                        .delete_vm(&vm.id.to_string(), self.request_timeout())
                        .await
                })
                .await
            }
            .await;

            match push {
                Ok(_) | Err(Error::NotFound(_)) => {}
                Err(e) => {
                    warn!(
                        vm_id = %id,
                        error = %e,
                        "🖥️ Daemon unreachable; VM retained in Deleting"
                    );
                    self.set_state(
                        id,
                        VmPowerState::Deleting,
                        Some(format!("waiting for host to confirm deletion: {}", e)),
                    )
                    .await?;
                    return Ok(());
                }
            }
            self.release_on_node(node_id, &vm.spec.requested_resources()).await;
        }

        self.vms.delete(id).await?;
        info!(vm_id = %id, name = %vm.name, "🖥️ [DELETE] VM removed");
        Ok(())
    }

    /// Remove the record without waiting for the host.
    pub async fn force_purge(&self, id: Uuid) -> Result<()> {
        let vm = self.vms.get(id).await?;
        if let Some(node_id) = vm.status.node_id {
            self.release_on_node(node_id, &vm.spec.requested_resources()).await;
        }
        self.vms.delete(id).await?;
        info!(vm_id = %id, name = %vm.name, "🖥️ [PURGE] VM record removed");
        Ok(())
    }

    // =========================================================================
    // Placement reservation
    // =========================================================================

    async fn reserve_on_node(&self, node_id: Uuid, requested: &Resources) -> Result<()> {
        with_conflict_retry(|| async {
            let mut node = self.nodes.get(node_id).await?;
            node.reserve(requested)?;
            self.nodes.update(&node).await
        })
        .await?;
        Ok(())
    }

    /// Release is best-effort; the sweeper reconciles any drift.
    async fn release_on_node(&self, node_id: Uuid, requested: &Resources) {
        let result = with_conflict_retry(|| async {
            let mut node = self.nodes.get(node_id).await?;
            node.release(requested);
            self.nodes.update(&node).await
        })
        .await;
        if let Err(e) = result {
            warn!(node_id = %node_id, error = %e, "Failed to release reserved resources");
        }
    }

    // =========================================================================
    // Power operations
    // =========================================================================

    /// Start a placed VM: Stopped -> Starting -> Running, rolling back to
    /// the previous state when the daemon call fails.
    pub async fn start(&self, id: Uuid) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        if !vm.status.state.can_start() {
            return Err(Error::FailedPrecondition(format!(
                "cannot start VM {} in state {}",
                vm.name, vm.status.state
            )));
        }
        if vm.status.node_id.is_none() {
            return Err(Error::FailedPrecondition(format!(
                "VM {} has no node assignment",
                vm.name
            )));
        }
        let previous = vm.status.state;
        self.set_state(id, VmPowerState::Starting, None).await?;

        let call = async {
            let daemon = self.daemon_for_vm(&vm).await?;
            let _permit = daemon.try_acquire()?;
            with_retry(|| async {
                daemon
                    .client()
                    .start_vm(&vm.id.to_string(), self.request_timeout())
                    .await
            })
            .await
        }
        .await;

        match call {
            Ok(_) => {
                info!(vm_id = %id, "🖥️ [START] VM running");
                self.set_state(id, VmPowerState::Running, None).await
            }
            Err(e) => {
                self.set_state(id, previous, Some(format!("start failed: {}", e))).await?;
                Err(e)
            }
        }
    }

    /// Stop a VM: Running -> Stopping -> Stopped. The daemon prefers a
    /// graceful shutdown and escalates to force-off after `timeout` when
    /// `force` is set.
    pub async fn stop(&self, id: Uuid, timeout: Duration, force: bool) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        if !vm.status.state.can_stop() {
            return Err(Error::FailedPrecondition(format!(
                "cannot stop VM {} in state {}",
                vm.name, vm.status.state
            )));
        }
        let previous = vm.status.state;
        self.set_state(id, VmPowerState::Stopping, None).await?;

        let call = async {
            let daemon = self.daemon_for_vm(&vm).await?;
            let _permit = daemon.try_acquire()?;
            with_retry(|| async {
                daemon
                    .client()
                    .stop_vm(&vm.id.to_string(), timeout, force, self.request_timeout() + timeout)
                    .await
            })
            .await
        }
        .await;

        match call {
            Ok(_) => {
                info!(vm_id = %id, "🖥️ [STOP] VM stopped");
                self.set_state(id, VmPowerState::Stopped, None).await
            }
            Err(e) => {
                self.set_state(id, previous, Some(format!("stop failed: {}", e))).await?;
                Err(e)
            }
        }
    }

    /// Immediate power-off, valid from any active state.
    pub async fn force_stop(&self, id: Uuid) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        if !vm.status.state.is_active() {
            return Err(Error::FailedPrecondition(format!(
                "cannot force-stop VM {} in state {}",
                vm.name, vm.status.state
            )));
        }
        let previous = vm.status.state;
        self.set_state(id, VmPowerState::Stopping, None).await?;

        let call = async {
            let daemon = self.daemon_for_vm(&vm).await?;
            let _permit = daemon.try_acquire()?;
            with_retry(|| async {
                daemon
                    .client()
                    .force_stop_vm(&vm.id.to_string(), self.request_timeout())
                    .await
            })
            .await
        }
        .await;

        match call {
            Ok(_) => self.set_state(id, VmPowerState::Stopped, None).await,
            Err(e) => {
                self.set_state(id, previous, Some(format!("force-stop failed: {}", e))).await?;
                Err(e)
            }
        }
    }

    pub async fn reboot(&self, id: Uuid) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        if !vm.status.state.can_reboot() {
            return Err(Error::FailedPrecondition(format!(
                "cannot reboot VM {} in state {}",
                vm.name, vm.status.state
            )));
        }

        let call = async {
            let daemon = self.daemon_for_vm(&vm).await?;
            let _permit = daemon.try_acquire()?;
            with_retry(|| async {
                daemon
                    .client()
                    .reboot_vm(&vm.id.to_string(), self.request_timeout())
                    .await
            })
            .await
        }
        .await;

        match call {
            Ok(_) => self.set_state(id, VmPowerState::Running, None).await,
            Err(e) => {
                self.set_state(id, vm.status.state, Some(format!("reboot failed: {}", e)))
                    .await?;
                Err(e)
            }
        }
    }

    pub async fn pause(&self, id: Uuid) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        if !vm.status.state.can_pause() {
            return Err(Error::FailedPrecondition(format!(
                "cannot pause VM {} in state {}",
                vm.name, vm.status.state
            )));
        }

        let call = async {
            let daemon = self.daemon_for_vm(&vm).await?;
            let _permit = daemon.try_acquire()?;
            with_retry(|| async {
                daemon
                    .client()
                    .pause_vm(&vm.id.to_string(), self.request_timeout())
                    .await
            })
            .await
        }
        .await;

        match call {
            Ok(_) => self.set_state(id, VmPowerState::Paused, None).await,
            Err(e) => {
                self.set_state(id, vm.status.state, Some(format!("pause failed: {}", e)))
                    .await?;
                Err(e)
            }
        }
    }

    /// Resume a paused or suspended VM. The guest clock drifted while
    /// frozen, so a time sync follows on success.
    pub async fn resume(&self, id: Uuid) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        if !vm.status.state.can_resume() {
            return Err(Error::FailedPrecondition(format!(
                "cannot resume VM {} in state {}",
                vm.name, vm.status.state
            )));
        }

        let call = async {
            let daemon = self.daemon_for_vm(&vm).await?;
            let _permit = daemon.try_acquire()?;
            with_retry(|| async {
                daemon
                    .client()
                    .resume_vm(&vm.id.to_string(), self.request_timeout())
                    .await
            })
            .await?;
            if let Err(e) = daemon
                .client()
                .sync_guest_time(&vm.id.to_string(), self.request_timeout())
                .await
            {
                debug!(vm_id = %id, error = %e, "Guest time sync after resume failed");
            }
            Ok(())
        }
        .await;

        match call {
            Ok(()) => self.set_state(id, VmPowerState::Running, None).await,
            Err(e) => {
                self.set_state(id, vm.status.state, Some(format!("resume failed: {}", e)))
                    .await?;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub async fn create_snapshot(
        &self,
        id: Uuid,
        name: String,
        description: String,
        include_memory: bool,
    ) -> Result<VmSnapshot> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        let response = daemon
            .client()
            .create_snapshot(
                quantix_proto::CreateSnapshotRequest {
                    vm_id: vm.id.to_string(),
                    name,
                    description,
                    include_memory,
                },
                self.request_timeout(),
            )
            .await?;
        response
            .snapshot
            .map(VmSnapshot::from)
            .ok_or_else(|| Error::Internal("daemon returned no snapshot".to_string()))
    }

    pub async fn list_snapshots(&self, id: Uuid) -> Result<Vec<VmSnapshot>> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        let response = with_retry(|| async {
            daemon
                .client()
                .list_snapshots(&vm.id.to_string(), self.request_timeout())
                .await
        })
        .await?;
        Ok(response.snapshots.into_iter().map(VmSnapshot::from).collect())
    }

    /// Revert to a snapshot. The hypervisor leaves the VM stopped;
    /// `start_after_revert` chains a start.
    pub async fn revert_snapshot(
        &self,
        id: Uuid,
        snapshot_id: &str,
        start_after_revert: bool,
    ) -> Result<VirtualMachine> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        {
            let _permit = daemon.try_acquire()?;
            daemon
                .client()
                .revert_snapshot(&vm.id.to_string(), snapshot_id, self.request_timeout())
                .await?;
        }
        let vm = self.set_state(id, VmPowerState::Stopped, None).await?;
        if start_after_revert {
            return self.start(id).await;
        }
        Ok(vm)
    }

    pub async fn delete_snapshot(&self, id: Uuid, snapshot_id: &str) -> Result<()> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        daemon
            .client()
            .delete_snapshot(&vm.id.to_string(), snapshot_id, self.request_timeout())
            .await?;
        Ok(())
    }

    // =========================================================================
    // Guest agent
    // =========================================================================

    pub async fn ping_guest_agent(&self, id: Uuid) -> Result<quantix_proto::AgentPingResponse> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        with_retry(|| async {
            daemon
                .client()
                .ping_guest_agent(&vm.id.to_string(), self.request_timeout())
                .await
        })
        .await
    }

    pub async fn execute_in_guest(
        &self,
        id: Uuid,
        command: String,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<GuestExecResult> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        let response = daemon
            .client()
            .execute_in_guest(
                quantix_proto::ExecuteInGuestRequest {
                    vm_id: vm.id.to_string(),
                    command,
                    args,
                    timeout_seconds: timeout.as_secs() as u32,
                },
                self.request_timeout() + timeout,
            )
            .await?;
        Ok(GuestExecResult {
            exit_code: response.exit_code,
            stdout: String::from_utf8_lossy(&response.stdout).to_string(),
            stderr: String::from_utf8_lossy(&response.stderr).to_string(),
        })
    }

    pub async fn quiesce_filesystems(
        &self,
        id: Uuid,
        mount_points: Vec<String>,
        timeout: Duration,
    ) -> Result<QuiesceInfo> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        let response = daemon
            .client()
            .quiesce_filesystems(
                quantix_proto::QuiesceFilesystemsRequest {
                    vm_id: vm.id.to_string(),
                    mount_points,
                    timeout_seconds: timeout.as_secs() as u32,
                },
                self.request_timeout(),
            )
            .await?;
        Ok(QuiesceInfo {
            quiesce_token: response.quiesce_token,
            frozen_mount_points: response.frozen_mount_points,
            auto_thaw_at_unix: response.auto_thaw_at_unix,
        })
    }

    pub async fn thaw_filesystems(&self, id: Uuid, quiesce_token: &str) -> Result<Vec<String>> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        let response = daemon
            .client()
            .thaw_filesystems(&vm.id.to_string(), quiesce_token, self.request_timeout())
            .await?;
        Ok(response.thawed_mount_points)
    }

    /// Idempotent guest clock sync.
    pub async fn sync_guest_time(&self, id: Uuid) -> Result<i64> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        let response = with_retry(|| async {
            daemon
                .client()
                .sync_guest_time(&vm.id.to_string(), self.request_timeout())
                .await
        })
        .await?;
        Ok(response.guest_offset_ms)
    }

    pub async fn get_console(&self, id: Uuid) -> Result<ConsoleInfo> {
        let vm = self.vms.get(id).await?;
        let daemon = self.daemon_for_vm(&vm).await?;
        let _permit = daemon.try_acquire()?;
        let response = with_retry(|| async {
            daemon
                .client()
                .get_console_info(&vm.id.to_string(), self.request_timeout())
                .await
        })
        .await?;
        Ok(ConsoleInfo {
            protocol: response.protocol,
            host: response.host,
            port: response.port,
            password: response.password,
        })
    }

    // =========================================================================
    // Reconciliation against host reports
    // =========================================================================

    /// Ingest the VM state reports carried by one node's heartbeat. Known
    /// VMs get their host-authoritative status refreshed, unknown VMs are
    /// adopted as discovered, and VMs reported by the wrong node are
    /// relocated (the host wins).
    pub async fn reconcile_node_vms(
        &self,
        node_id: Uuid,
        reports: &[VmStateReport],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        for report in reports {
            if let Err(e) = self.apply_vm_report(node_id, report, now).await {
                warn!(node_id = %node_id, vm_id = %report.vm_id, error = %e, "VM report rejected");
                errors.push(format!("{}: {}", report.vm_id, e));
            }
        }
        errors
    }

    async fn apply_vm_report(
        &self,
        node_id: Uuid,
        report: &VmStateReport,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let vm_id = Uuid::parse_str(&report.vm_id)
            .map_err(|_| Error::InvalidArgument("VM ID is not a UUID".to_string()))?;

        let vm = match self.vms.get(vm_id).await {
            Ok(vm) => vm,
            Err(Error::NotFound(_)) => return self.discover_vm(node_id, vm_id, report, now).await,
            Err(e) => return Err(e),
        };

        // The host wins placement disagreements.
        if vm.status.node_id != Some(node_id) {
            let previous = vm.status.node_id;
            if let Some(old_node) = previous {
                self.release_on_node(old_node, &vm.spec.requested_resources()).await;
            }
            self.reserve_on_node(node_id, &vm.spec.requested_resources())
                .await
                .ok();
            self.events
                .vm_relocated(vm.id, &vm.name, previous, node_id)
                .await;
        }

        let was_lost = vm.status.state == VmPowerState::Lost;
        let mut status = vm.status.clone();
        status.node_id = Some(node_id);
        status.last_seen = Some(now);
        if !report.ip_addresses.is_empty() {
            status.ip_addresses = report.ip_addresses.clone();
        }

        let in_transition = matches!(
            vm.status.state,
            VmPowerState::Starting | VmPowerState::Stopping | VmPowerState::Deleting
        );
        if was_lost {
            status.state = report.state;
            status.lost_reason = None;
            status.lost_at = None;
        } else if !in_transition {
            status.state = report.state;
        }

        self.vms.update_status(vm_id, &status).await?;
        if was_lost {
            self.events.vm_found(vm.id, &vm.name).await;
        }
        Ok(())
    }

    async fn discover_vm(
        &self,
        node_id: Uuid,
        vm_id: Uuid,
        report: &VmStateReport,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let name = report
            .name
            .clone()
            .unwrap_or_else(|| format!("vm-{}", vm_id));
        let mut vm = VirtualMachine::new(DEFAULT_PROJECT_ID, name.clone(), VmSpec::default());
        vm.id = vm_id;
        vm.origin = VmOrigin::HostDiscovered;
        vm.is_managed = false;
        vm.status.state = report.state;
        vm.status.node_id = Some(node_id);
        vm.status.last_seen = Some(now);
        vm.status.ip_addresses = report.ip_addresses.clone();

        match self.vms.create(&vm).await {
            Ok(vm) => {
                self.events.vm_discovered(vm.id, &vm.name, node_id).await;
                Ok(())
            }
            // A concurrent report won the race.
            Err(Error::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Mark managed VMs Lost when their node heartbeats but stopped
    /// reporting them, and finalize `Deleting` records once the host no
    /// longer reports the VM. Called by the reconciliation loop; a later
    /// sighting restores a Lost VM's reported state.
    pub async fn mark_lost_vms(&self, now: DateTime<Utc>) -> Result<usize> {
        let grace = chrono::Duration::seconds(self.heartbeat.lost_grace_secs as i64);
        let vms = self
            .vms
            .list(&VmFilter { managed_only: true, ..VmFilter::default() })
            .await?;

        let mut marked = 0;
        for vm in vms {
            let Some(node_id) = vm.status.node_id else { continue };
            // Only the host's silence about one VM counts; a disconnected
            // node is handled by the node sweeper.
            let node = match self.nodes.get(node_id).await {
                Ok(node) => node,
                Err(_) => continue,
            };
            if node.status.phase != crate::domain::NodePhase::Ready {
                continue;
            }
            let reference = vm.status.last_seen.unwrap_or(vm.updated_at);
            if now - reference <= grace {
                continue;
            }

            if vm.status.state == VmPowerState::Deleting {
                // The host stopped reporting a VM we asked it to delete:
                // the deletion converged, drop the record.
                info!(vm_id = %vm.id, name = %vm.name, "🖥️ Host confirmed deletion, removing record");
                self.release_on_node(node_id, &vm.spec.requested_resources()).await;
                self.vms.delete(vm.id).await?;
                continue;
            }
            if matches!(
                vm.status.state,
                VmPowerState::Lost | VmPowerState::Starting | VmPowerState::Stopping
            ) {
                continue;
            }

            let mut updated = vm.clone();
            updated.mark_lost("not reported by host", now);
            self.vms.update_status(vm.id, &updated.status).await?;
            self.events.vm_lost(vm.id, &vm.name).await;
            marked += 1;
        }
        Ok(marked)
    }

    /// Full VM sync pushed by a daemon (on registration or on demand).
    /// Per-VM failures accumulate; the sync itself succeeds.
    pub async fn sync_node_vms(
        &self,
        node_id: Uuid,
        reports: &[VmStateReport],
    ) -> Result<Vec<String>> {
        self.nodes.get(node_id).await?;
        Ok(self.reconcile_node_vms(node_id, reports, Utc::now()).await)
    }
}

/// Translate the domain spec into the daemon's wire format.
fn to_proto_spec(spec: &VmSpec) -> quantix_proto::VmSpec {
    quantix_proto::VmSpec {
        cpu_sockets: spec.cpu.sockets,
        cpu_cores: spec.cpu.cores,
        cpu_threads_per_core: spec.cpu.threads_per_core,
        memory_mib: spec.memory_mib,
        firmware: match spec.firmware {
            crate::domain::Firmware::Bios => quantix_proto::Firmware::Bios as i32,
            crate::domain::Firmware::Uefi => quantix_proto::Firmware::Uefi as i32,
        },
        disks: spec
            .disks
            .iter()
            .map(|disk| quantix_proto::DiskSpec {
                id: disk.id.clone(),
                size_gib: disk.size_gib,
                bus: match disk.bus.as_str() {
                    "scsi" => quantix_proto::DiskBus::Scsi as i32,
                    "sata" => quantix_proto::DiskBus::Sata as i32,
                    "ide" => quantix_proto::DiskBus::Ide as i32,
                    _ => quantix_proto::DiskBus::Virtio as i32,
                },
                backing_file: disk.backing_file.clone().unwrap_or_default(),
                pool_id: disk.pool_id.map(|id| id.to_string()).unwrap_or_default(),
                bootable: disk.bootable,
            })
            .collect(),
        nics: spec
            .nics
            .iter()
            .map(|nic| quantix_proto::NicSpec {
                id: nic.id.clone(),
                network_id: nic.network_id.map(|id| id.to_string()).unwrap_or_default(),
                mac_address: nic.mac_address.clone().unwrap_or_default(),
            })
            .collect(),
        vnc_enabled: spec.console.vnc_enabled,
        labels: spec.labels.clone().into_iter().collect(),
        cloud_init: spec.cloud_init.as_ref().map(|ci| quantix_proto::CloudInitSpec {
            user_data: ci.user_data.clone(),
            meta_data: ci.meta_data.clone(),
        }),
    }
}
