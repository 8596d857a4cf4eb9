//! Node service: registration, heartbeat ingestion, the phase state
//! machine, the stale-node sweeper, and node operations.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DaemonConfig, HeartbeatConfig};
use crate::daemon::DaemonPool;
use crate::domain::{
    CpuTopology, Error, HostPoolStatus, MemoryInfo, NetworkDevice, Node, NodeCondition, NodePhase,
    NodeRoles, PoolHealth, Resources, Result, StorageBackend, StorageDevice, SystemInfo,
    VirtualMachine, VmPowerState,
};
use crate::events::EventLog;
use crate::repo::{NodeFilter, NodeRepository, VmFilter, VmRepository};

use super::storage::StoragePoolService;
use super::vm::VmService;
use super::with_conflict_retry;

/// Registration payload pushed by a node daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeRequest {
    pub hostname: String,
    /// May carry a `:port` suffix; stored without it.
    pub management_ip: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub roles: NodeRoles,
    #[serde(default)]
    pub cpu: CpuTopology,
    #[serde(default)]
    pub memory: MemoryInfo,
    #[serde(default)]
    pub storage_devices: Vec<StorageDevice>,
    #[serde(default)]
    pub network_devices: Vec<NetworkDevice>,
    #[serde(default)]
    pub system_info: Option<SystemInfo>,
}

/// One storage pool's status as carried by a heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatusReport {
    #[serde(default)]
    pub pool_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub backend: Option<StorageBackend>,
    pub healthy: bool,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub used_bytes: u64,
    #[serde(default)]
    pub available_bytes: u64,
    #[serde(default)]
    pub mount_path: Option<String>,
    #[serde(default)]
    pub device_path: Option<String>,
    #[serde(default)]
    pub volume_count: u32,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PoolStatusReport {
    pub fn to_host_status(&self) -> HostPoolStatus {
        HostPoolStatus {
            health: if self.healthy { PoolHealth::Healthy } else { PoolHealth::Error },
            total_bytes: self.total_bytes,
            used_bytes: self.used_bytes,
            available_bytes: if self.available_bytes > 0 {
                self.available_bytes
            } else {
                self.total_bytes.saturating_sub(self.used_bytes)
            },
            mount_path: self.mount_path.clone(),
            device_path: self.device_path.clone(),
            volume_count: self.volume_count,
            error_message: self.error_message.clone(),
            reported_at: Utc::now(),
        }
    }
}

/// One VM's state as carried by a heartbeat or a sync push.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmStateReport {
    pub vm_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub state: VmPowerState,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

/// Heartbeat payload pushed by a node daemon every ~30 s.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub node_id: Uuid,
    #[serde(default)]
    pub cpu_usage_percent: f64,
    #[serde(default)]
    pub memory_used_mib: u64,
    #[serde(default)]
    pub running_vm_count: u32,
    /// Self-reported health; `false` flips the node to NotReady.
    #[serde(default)]
    pub healthy: Option<bool>,
    /// Monotonic-ish stamp used to coalesce overlapping retries.
    #[serde(default)]
    pub server_time_unix: Option<i64>,
    #[serde(default)]
    pub storage_pools: Vec<PoolStatusReport>,
    #[serde(default)]
    pub vms: Vec<VmStateReport>,
}

/// Heartbeat acknowledgment; carries the server-suggested interval.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    pub node_id: Uuid,
    pub heartbeat_interval_secs: u64,
    pub server_time_unix: i64,
    /// True when an older overlapping heartbeat was dropped instead of
    /// being processed.
    pub coalesced: bool,
}

/// Snapshot of a node's last reported utilization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    pub node_id: Uuid,
    pub phase: NodePhase,
    pub cpu_usage_percent: f64,
    pub memory_used_mib: u64,
    pub running_vm_count: u32,
    pub allocatable: Resources,
    pub allocated: Resources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

pub struct NodeService {
    nodes: Arc<dyn NodeRepository>,
    vms: Arc<dyn VmRepository>,
    daemon_pool: Arc<DaemonPool>,
    events: Arc<EventLog>,
    vm_service: Arc<VmService>,
    storage_service: Arc<StoragePoolService>,
    daemon: DaemonConfig,
    heartbeat_config: HeartbeatConfig,
    /// Newest processed heartbeat stamp per node, for coalescing.
    heartbeat_stamps: Mutex<HashMap<Uuid, i64>>,
}

impl NodeService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nodes: Arc<dyn NodeRepository>,
        vms: Arc<dyn VmRepository>,
        daemon_pool: Arc<DaemonPool>,
        events: Arc<EventLog>,
        vm_service: Arc<VmService>,
        storage_service: Arc<StoragePoolService>,
        daemon: DaemonConfig,
        heartbeat_config: HeartbeatConfig,
    ) -> Self {
        Self {
            nodes,
            vms,
            daemon_pool,
            events,
            vm_service,
            storage_service,
            daemon,
            heartbeat_config,
            heartbeat_stamps: Mutex::new(HashMap::new()),
        }
    }

    fn daemon_address(&self, node: &Node) -> String {
        format!("{}:{}", node.management_ip, self.daemon.port)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register or re-register a node by hostname.
    ///
    /// Concurrent first-time registrations race on the unique hostname; the
    /// loser detects `AlreadyExists` and falls through to re-registration.
    pub async fn register(&self, request: RegisterNodeRequest) -> Result<Node> {
        if request.hostname.trim().is_empty() {
            return Err(Error::InvalidArgument("hostname must not be empty".to_string()));
        }
        let management_ip = strip_port(&request.management_ip);
        if management_ip.is_empty() {
            return Err(Error::InvalidArgument("management IP must not be empty".to_string()));
        }

        let node = match self.nodes.get_by_hostname(&request.hostname).await? {
            Some(existing) => self.reregister(existing.id, &request, &management_ip).await?,
            None => {
                let mut node = Node::new(request.hostname.clone(), management_ip.clone());
                apply_registration(&mut node, &request, &management_ip);
                node.status.phase = NodePhase::Ready;
                node.status.allocatable = node.compute_allocatable();
                node.status.allocated = Resources::default();
                node.status.last_heartbeat = Some(Utc::now());

                match self.nodes.create(&node).await {
                    Ok(node) => {
                        self.events.node_registered(node.id, &node.hostname, false).await;
                        node
                    }
                    Err(Error::AlreadyExists(_)) => {
                        // Lost the race to another registration of the same
                        // hostname; treat ours as a re-registration.
                        let existing = self
                            .nodes
                            .get_by_hostname(&request.hostname)
                            .await?
                            .ok_or_else(|| Error::not_found("node", &request.hostname))?;
                        self.reregister(existing.id, &request, &management_ip).await?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        // Warm the daemon connection; heartbeats converge if the daemon is
        // not reachable yet.
        if let Err(e) = self
            .daemon_pool
            .connect(node.id, &self.daemon_address(&node))
            .await
        {
            warn!(node_id = %node.id, error = %e, "🔌 Daemon not reachable at registration");
        }

        Ok(node)
    }

    async fn reregister(
        &self,
        id: Uuid,
        request: &RegisterNodeRequest,
        management_ip: &str,
    ) -> Result<Node> {
        let node = with_conflict_retry(|| async {
            let mut node = self.nodes.get(id).await?;
            apply_registration(&mut node, request, management_ip);
            // Re-registration is the explicit admin recovery path, so it may
            // leave Error directly.
            node.status.phase = NodePhase::Ready;
            node.status.allocatable = node.compute_allocatable();
            node.status.last_heartbeat = Some(Utc::now());
            node.add_condition(NodeCondition::new(
                "Reregistered",
                "NodeRegistration",
                "node re-registered with the control plane",
            ));
            self.nodes.update(&node).await
        })
        .await?;
        self.events.node_registered(node.id, &node.hostname, true).await;
        Ok(node)
    }

    // =========================================================================
    // Heartbeat
    // =========================================================================

    /// Ingest a heartbeat: refresh liveness, forward the storage and VM
    /// reports, and hand back the suggested interval.
    ///
    /// Overlapping heartbeats for one node (daemon retries) are coalesced by
    /// dropping all but the newest stamp.
    pub async fn heartbeat(&self, request: HeartbeatRequest) -> Result<HeartbeatAck> {
        let now = Utc::now();
        let stamp = request.server_time_unix.unwrap_or_else(|| now.timestamp());

        {
            let mut stamps = self
                .heartbeat_stamps
                .lock()
                .map_err(|_| Error::Internal("heartbeat stamp lock poisoned".to_string()))?;
            match stamps.get(&request.node_id) {
                Some(&newest) if newest >= stamp && request.server_time_unix.is_some() => {
                    debug!(node_id = %request.node_id, "💓 Stale heartbeat coalesced");
                    return Ok(HeartbeatAck {
                        node_id: request.node_id,
                        heartbeat_interval_secs: self.heartbeat_config.interval_secs,
                        server_time_unix: now.timestamp(),
                        coalesced: true,
                    });
                }
                _ => {
                    stamps.insert(request.node_id, stamp);
                }
            }
        }

        let node = self.nodes.get(request.node_id).await?;
        let was_disconnected = node.status.phase == NodePhase::Disconnected;

        let mut status = node.status.clone();
        // Parked (Maintenance/Draining) and Error phases only move by
        // explicit operator action; a heartbeat never clears them.
        if !matches!(
            status.phase,
            NodePhase::Maintenance | NodePhase::Draining | NodePhase::Error
        ) {
            // Liveness first: the only edge out of Disconnected (or Pending)
            // is back to Ready.
            if status.phase != NodePhase::Ready
                && NodePhase::can_transition(status.phase, NodePhase::Ready)
            {
                status.phase = NodePhase::Ready;
            }
            // Self-reported degraded health then moves Ready <-> NotReady.
            let target_phase = if request.healthy == Some(false) {
                NodePhase::NotReady
            } else {
                NodePhase::Ready
            };
            if NodePhase::can_transition(status.phase, target_phase) {
                status.phase = target_phase;
            }
        }
        status.cpu_usage_percent = request.cpu_usage_percent;
        status.memory_used_mib = request.memory_used_mib;
        status.running_vm_count = request.running_vm_count;
        status.last_heartbeat = Some(now);

        if was_disconnected {
            status.conditions.push(NodeCondition::new(
                "Reconnected",
                "HeartbeatReceived",
                "node resumed heartbeating",
            ));
        }
        self.nodes.update_status(node.id, &status).await?;

        if was_disconnected {
            self.events.host_reconnected(node.id, &node.hostname).await;
        }

        for report in &request.storage_pools {
            if let Err(e) = self
                .storage_service
                .update_host_pool_status(node.id, report)
                .await
            {
                warn!(node_id = %node.id, error = %e, "💾 Storage report rejected");
            }
        }

        if !request.vms.is_empty() {
            self.vm_service
                .reconcile_node_vms(node.id, &request.vms, now)
                .await;
        }

        quantix_common::log_heartbeat!(
            node.id,
            "processed ({} pool report(s), {} VM report(s))",
            request.storage_pools.len(),
            request.vms.len()
        );

        Ok(HeartbeatAck {
            node_id: node.id,
            heartbeat_interval_secs: self.heartbeat_config.interval_secs,
            server_time_unix: now.timestamp(),
            coalesced: false,
        })
    }

    // =========================================================================
    // Stale-node sweeper
    // =========================================================================

    /// One sweeper pass: nodes without a heartbeat for longer than the
    /// timeout transition to Disconnected. Nodes are never deleted here.
    pub async fn sweep_stale_nodes(&self, now: DateTime<Utc>) -> Result<usize> {
        let timeout = chrono::Duration::seconds(self.heartbeat_config.timeout_secs as i64);
        let nodes = self.nodes.list(&NodeFilter::default()).await?;

        let mut disconnected = 0;
        for node in nodes {
            if matches!(
                node.status.phase,
                NodePhase::Maintenance | NodePhase::Draining | NodePhase::Disconnected
            ) {
                continue;
            }
            let timed_out = match node.status.last_heartbeat {
                Some(last) => last < now - timeout,
                None => node.created_at < now - timeout,
            };
            if !timed_out {
                continue;
            }

            let mut status = node.status.clone();
            status.phase = NodePhase::Disconnected;
            status.conditions.push(NodeCondition::new(
                "Disconnected",
                "HeartbeatTimeout",
                format!(
                    "no heartbeat for more than {} s",
                    self.heartbeat_config.timeout_secs
                ),
            ));
            self.nodes.update_status(node.id, &status).await?;

            let affected: Vec<Uuid> = self
                .vms
                .list(&VmFilter::on_node(node.id))
                .await?
                .into_iter()
                .map(|vm| vm.id)
                .collect();
            self.events
                .host_disconnected(node.id, &node.hostname, &affected)
                .await;
            disconnected += 1;
        }
        Ok(disconnected)
    }

    // =========================================================================
    // Node operations
    // =========================================================================

    pub async fn get(&self, id: Uuid) -> Result<Node> {
        self.nodes.get(id).await
    }

    pub async fn list(&self, filter: &NodeFilter) -> Result<Vec<Node>> {
        self.nodes.list(filter).await
    }

    /// Mutate labels and scheduling configuration.
    pub async fn update(&self, node: &Node) -> Result<Node> {
        self.nodes.update(node).await
    }

    /// Bring a parked node back into scheduling.
    pub async fn enable(&self, id: Uuid) -> Result<Node> {
        self.transition(id, NodePhase::Ready).await
    }

    /// Park a node for maintenance.
    pub async fn disable(&self, id: Uuid) -> Result<Node> {
        self.transition(id, NodePhase::Maintenance).await
    }

    /// Mark a node Draining and report the VMs that still live there.
    /// Migration itself is a workflow above the VM service.
    pub async fn drain(&self, id: Uuid) -> Result<(Node, Vec<Uuid>)> {
        let node = self.transition(id, NodePhase::Draining).await?;
        let residents = self
            .vms
            .list(&VmFilter::on_node(id))
            .await?
            .into_iter()
            .map(|vm| vm.id)
            .collect();
        Ok((node, residents))
    }

    async fn transition(&self, id: Uuid, to: NodePhase) -> Result<Node> {
        with_conflict_retry(|| async {
            let mut node = self.nodes.get(id).await?;
            node.transition(to)?;
            node.add_condition(NodeCondition::new(
                "PhaseChanged",
                "OperatorAction",
                format!("phase set to {}", to),
            ));
            self.nodes.update(&node).await
        })
        .await
    }

    /// Remove a node. Rejected while VMs reside on it unless `force`; with
    /// force the residents lose their assignment (invariant: a VM's node ID
    /// always refers to an existing node).
    pub async fn decommission(&self, id: Uuid, force: bool) -> Result<()> {
        let node = self.nodes.get(id).await?;
        let residents = self.vms.list(&VmFilter::on_node(id)).await?;
        if !residents.is_empty() && !force {
            return Err(Error::FailedPrecondition(format!(
                "node {} still hosts {} VM(s)",
                node.hostname,
                residents.len()
            )));
        }
        for vm in residents {
            let mut status = vm.status.clone();
            status.node_id = None;
            status.message = format!("node {} was decommissioned", node.hostname);
            self.vms.update_status(vm.id, &status).await.ok();
        }

        self.daemon_pool.disconnect(id);
        self.nodes.delete(id).await?;
        {
            let mut stamps = self.heartbeat_stamps.lock().map_err(|_| {
                Error::Internal("heartbeat stamp lock poisoned".to_string())
            })?;
            stamps.remove(&id);
        }
        self.events.node_decommissioned(id, &node.hostname).await;
        info!(node_id = %id, hostname = %node.hostname, "🗄️ [DECOMMISSION] Node removed");
        Ok(())
    }

    pub async fn get_metrics(&self, id: Uuid) -> Result<NodeMetrics> {
        let node = self.nodes.get(id).await?;
        Ok(NodeMetrics {
            node_id: node.id,
            phase: node.status.phase,
            cpu_usage_percent: node.status.cpu_usage_percent,
            memory_used_mib: node.status.memory_used_mib,
            running_vm_count: node.status.running_vm_count,
            allocatable: node.status.allocatable,
            allocated: node.status.allocated,
            last_heartbeat: node.status.last_heartbeat,
        })
    }

    /// Full VM inventory sync pushed by the daemon.
    pub async fn sync_vms(&self, node_id: Uuid, reports: &[VmStateReport]) -> Result<Vec<String>> {
        self.vm_service.sync_node_vms(node_id, reports).await
    }

    /// VMs currently assigned to a node.
    pub async fn vms_on_node(&self, node_id: Uuid) -> Result<Vec<VirtualMachine>> {
        self.vms.list(&VmFilter::on_node(node_id)).await
    }
}

fn apply_registration(node: &mut Node, request: &RegisterNodeRequest, management_ip: &str) {
    node.management_ip = management_ip.to_string();
    node.labels = request.labels.clone();
    node.roles = request.roles;
    node.cpu = request.cpu;
    node.memory = request.memory;
    node.storage_devices = request.storage_devices.clone();
    node.network_devices = request.network_devices.clone();
    if let Some(info) = &request.system_info {
        node.status.system_info = Some(info.clone());
    }
}

/// Drop a `:port` suffix from an address, leaving bare IPv6 alone.
fn strip_port(address: &str) -> String {
    if let Some(idx) = address.rfind(':') {
        let (host, port) = address.split_at(idx);
        if !host.contains(':') && port[1..].parse::<u16>().is_ok() {
            return host.to_string();
        }
    }
    address.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("10.0.0.1:9090"), "10.0.0.1");
        assert_eq!(strip_port("10.0.0.1"), "10.0.0.1");
        assert_eq!(strip_port("fe80::1"), "fe80::1");
        assert_eq!(strip_port("node-7.lab:9090"), "node-7.lab");
    }
}
