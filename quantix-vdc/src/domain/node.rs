//! Hypervisor node entity and the node phase state machine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{Error, Result};

/// CPU topology reported by the node at registration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CpuTopology {
    pub sockets: u32,
    pub cores_per_socket: u32,
    pub threads_per_core: u32,
}

impl CpuTopology {
    /// Total schedulable threads.
    pub fn total_threads(&self) -> u32 {
        self.sockets * self.cores_per_socket * self.threads_per_core
    }
}

/// Memory totals in MiB.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInfo {
    pub total_mib: u64,
    pub allocatable_mib: u64,
}

/// A physical disk on the node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDevice {
    pub path: String,
    pub model: String,
    pub size_bytes: u64,
    pub device_type: String,
}

/// A physical NIC on the node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDevice {
    pub name: String,
    pub mac_address: String,
    pub speed_mbps: u64,
    pub mtu: u32,
}

/// Role flags assigned to the node.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeRoles {
    pub compute: bool,
    pub storage: bool,
    pub control_plane: bool,
}

/// A taint bars placement unless the VM spec carries a matching toleration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Declares that a VM tolerates a taint. An empty value tolerates any value
/// for the key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Toleration {
    pub fn tolerates(&self, taint: &Taint) -> bool {
        self.key == taint.key && (self.value.is_empty() || self.value == taint.value)
    }
}

/// Per-node overcommit ratios applied to allocatable resources at scheduling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OvercommitRatios {
    pub cpu: f64,
    pub memory: f64,
}

impl Default for OvercommitRatios {
    fn default() -> Self {
        Self { cpu: 4.0, memory: 1.0 }
    }
}

/// Resources withheld from scheduling for the host OS and daemon.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservedResources {
    pub cpu_cores: u32,
    pub memory_mib: u64,
}

/// Scheduling configuration for a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingConfig {
    pub schedulable: bool,
    #[serde(default)]
    pub taints: Vec<Taint>,
    #[serde(default)]
    pub overcommit: OvercommitRatios,
    #[serde(default)]
    pub reserved: ReservedResources,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            schedulable: true,
            taints: Vec::new(),
            overcommit: OvercommitRatios::default(),
            reserved: ReservedResources::default(),
        }
    }
}

/// Node lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodePhase {
    Pending,
    Ready,
    NotReady,
    Maintenance,
    Draining,
    Disconnected,
    Error,
    Unknown,
}

impl std::fmt::Display for NodePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodePhase::Pending => "Pending",
            NodePhase::Ready => "Ready",
            NodePhase::NotReady => "NotReady",
            NodePhase::Maintenance => "Maintenance",
            NodePhase::Draining => "Draining",
            NodePhase::Disconnected => "Disconnected",
            NodePhase::Error => "Error",
            NodePhase::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl NodePhase {
    /// Whether the `from -> to` transition is one of the valid edges of the
    /// node state machine. Self-transitions are always allowed (they refresh
    /// timestamps without changing phase).
    pub fn can_transition(from: NodePhase, to: NodePhase) -> bool {
        use NodePhase::*;
        if from == to {
            return true;
        }
        match (from, to) {
            (Pending, Ready) => true,
            (Ready, NotReady) | (NotReady, Ready) => true,
            (Ready, Maintenance) => true,
            (Maintenance, Ready) => true,
            (Ready, Draining) | (NotReady, Draining) => true,
            (Draining, Ready) | (Draining, Maintenance) => true,
            // Sweeper timeout: anything that is not already parked.
            (from, Disconnected) => !matches!(from, Maintenance | Draining | Disconnected),
            (Disconnected, Ready) => true,
            // Explicit fatal; never auto-cleared.
            (_, Error) => true,
            _ => false,
        }
    }
}

/// A typed entry in the node's condition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCondition {
    pub condition_type: String,
    pub reason: String,
    pub message: String,
    pub last_transition: DateTime<Utc>,
}

impl NodeCondition {
    pub fn new(condition_type: &str, reason: &str, message: impl Into<String>) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            reason: reason.to_string(),
            message: message.into(),
            last_transition: Utc::now(),
        }
    }
}

/// CPU cores and memory MiB, used for both allocatable and allocated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub cpu_cores: u32,
    pub memory_mib: u64,
}

impl Resources {
    pub fn new(cpu_cores: u32, memory_mib: u64) -> Self {
        Self { cpu_cores, memory_mib }
    }

    pub fn checked_add(&self, other: &Resources) -> Resources {
        Resources {
            cpu_cores: self.cpu_cores.saturating_add(other.cpu_cores),
            memory_mib: self.memory_mib.saturating_add(other.memory_mib),
        }
    }

    pub fn checked_sub(&self, other: &Resources) -> Resources {
        Resources {
            cpu_cores: self.cpu_cores.saturating_sub(other.cpu_cores),
            memory_mib: self.memory_mib.saturating_sub(other.memory_mib),
        }
    }

    pub fn fits_within(&self, limit: &Resources) -> bool {
        self.cpu_cores <= limit.cpu_cores && self.memory_mib <= limit.memory_mib
    }
}

/// OS and hypervisor identification reported by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub hypervisor_name: String,
    pub hypervisor_version: String,
}

/// Observed node state. Host-authoritative: produced by heartbeats, command
/// results, and the sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub phase: NodePhase,
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
    pub allocatable: Resources,
    pub allocated: Resources,
    /// VMs the control plane believes reside on this node.
    #[serde(default)]
    pub vm_ids: Vec<Uuid>,
    pub cpu_usage_percent: f64,
    pub memory_used_mib: u64,
    pub running_vm_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_info: Option<SystemInfo>,
    /// Receive time of the newest heartbeat, None until the first one lands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self {
            phase: NodePhase::Pending,
            conditions: Vec::new(),
            allocatable: Resources::default(),
            allocated: Resources::default(),
            vm_ids: Vec::new(),
            cpu_usage_percent: 0.0,
            memory_used_mib: 0,
            running_vm_count: 0,
            system_info: None,
            last_heartbeat: None,
        }
    }
}

/// Maximum conditions retained per node; the oldest are dropped first.
const MAX_CONDITIONS: usize = 64;

/// A hypervisor host managed by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: Uuid,
    /// Globally unique.
    pub hostname: String,
    /// Stored without a port suffix.
    pub management_ip: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub roles: NodeRoles,
    pub cpu: CpuTopology,
    pub memory: MemoryInfo,
    #[serde(default)]
    pub storage_devices: Vec<StorageDevice>,
    #[serde(default)]
    pub network_devices: Vec<NetworkDevice>,
    pub scheduling: SchedulingConfig,
    pub status: NodeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token maintained by the repository.
    #[serde(default)]
    pub version: i64,
}

impl Node {
    /// Build a new node in phase Ready with zero allocated resources.
    pub fn new(hostname: String, management_ip: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            hostname,
            management_ip,
            labels: HashMap::new(),
            roles: NodeRoles::default(),
            cpu: CpuTopology::default(),
            memory: MemoryInfo::default(),
            storage_devices: Vec::new(),
            network_devices: Vec::new(),
            scheduling: SchedulingConfig::default(),
            status: NodeStatus::default(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Allocatable resources derived from the hardware spec. Memory falls
    /// back from allocatable to total when allocatable is zero.
    pub fn compute_allocatable(&self) -> Resources {
        let memory_mib = if self.memory.allocatable_mib > 0 {
            self.memory.allocatable_mib
        } else {
            self.memory.total_mib
        };
        Resources {
            cpu_cores: self.cpu.total_threads(),
            memory_mib,
        }
    }

    /// Transition the node phase, rejecting edges outside the state machine.
    pub fn transition(&mut self, to: NodePhase) -> Result<()> {
        let from = self.status.phase;
        if !NodePhase::can_transition(from, to) {
            return Err(Error::FailedPrecondition(format!(
                "node {} cannot transition {} -> {}",
                self.hostname, from, to
            )));
        }
        self.status.phase = to;
        Ok(())
    }

    /// Append a condition, keeping the log bounded.
    pub fn add_condition(&mut self, condition: NodeCondition) {
        self.status.conditions.push(condition);
        if self.status.conditions.len() > MAX_CONDITIONS {
            let overflow = self.status.conditions.len() - MAX_CONDITIONS;
            self.status.conditions.drain(..overflow);
        }
    }

    /// Reserve resources for a placed VM. Fails if the reservation would
    /// exceed raw allocatable scaled by the overcommit ratios.
    pub fn reserve(&mut self, requested: &Resources) -> Result<()> {
        let limit = self.overcommitted_allocatable();
        let next = self.status.allocated.checked_add(requested);
        if !next.fits_within(&limit) {
            return Err(Error::FailedPrecondition(format!(
                "node {} cannot fit {}c/{}MiB (allocated {}c/{}MiB of {}c/{}MiB)",
                self.hostname,
                requested.cpu_cores,
                requested.memory_mib,
                self.status.allocated.cpu_cores,
                self.status.allocated.memory_mib,
                limit.cpu_cores,
                limit.memory_mib,
            )));
        }
        self.status.allocated = next;
        Ok(())
    }

    /// Release resources when a VM leaves the node.
    pub fn release(&mut self, requested: &Resources) {
        self.status.allocated = self.status.allocated.checked_sub(requested);
    }

    /// Allocatable scaled by overcommit, minus reserved resources.
    pub fn overcommitted_allocatable(&self) -> Resources {
        let base = self
            .status
            .allocatable
            .checked_sub(&Resources::new(
                self.scheduling.reserved.cpu_cores,
                self.scheduling.reserved.memory_mib,
            ));
        Resources {
            cpu_cores: (base.cpu_cores as f64 * self.scheduling.overcommit.cpu) as u32,
            memory_mib: (base.memory_mib as f64 * self.scheduling.overcommit.memory) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_topology_total_threads() {
        let cpu = CpuTopology { sockets: 1, cores_per_socket: 8, threads_per_core: 2 };
        assert_eq!(cpu.total_threads(), 16);
    }

    #[test]
    fn test_allocatable_falls_back_to_total_memory() {
        let mut node = Node::new("h1".into(), "10.0.0.1".into());
        node.cpu = CpuTopology { sockets: 1, cores_per_socket: 8, threads_per_core: 2 };
        node.memory = MemoryInfo { total_mib: 32768, allocatable_mib: 0 };
        assert_eq!(node.compute_allocatable(), Resources::new(16, 32768));

        node.memory.allocatable_mib = 16384;
        assert_eq!(node.compute_allocatable(), Resources::new(16, 16384));
    }

    #[test]
    fn test_phase_transitions() {
        use NodePhase::*;
        assert!(NodePhase::can_transition(Pending, Ready));
        assert!(NodePhase::can_transition(Ready, Maintenance));
        assert!(NodePhase::can_transition(Maintenance, Ready));
        assert!(NodePhase::can_transition(Ready, Disconnected));
        assert!(NodePhase::can_transition(Disconnected, Ready));
        assert!(NodePhase::can_transition(Draining, Maintenance));
        assert!(NodePhase::can_transition(NotReady, Error));

        // The sweeper never disconnects parked nodes.
        assert!(!NodePhase::can_transition(Maintenance, Disconnected));
        assert!(!NodePhase::can_transition(Draining, Disconnected));
        // No shortcut from Maintenance into Draining.
        assert!(!NodePhase::can_transition(Maintenance, Draining));
        assert!(!NodePhase::can_transition(Pending, Maintenance));
    }

    #[test]
    fn test_reserve_respects_overcommit() {
        let mut node = Node::new("h1".into(), "10.0.0.1".into());
        node.status.allocatable = Resources::new(16, 16384);
        node.scheduling.overcommit = OvercommitRatios { cpu: 1.0, memory: 1.0 };

        assert!(node.reserve(&Resources::new(8, 8192)).is_ok());
        assert!(node.reserve(&Resources::new(8, 8192)).is_ok());
        // Full now.
        let err = node.reserve(&Resources::new(1, 0)).unwrap_err();
        assert!(matches!(err, Error::FailedPrecondition(_)));

        node.release(&Resources::new(8, 8192));
        assert_eq!(node.status.allocated, Resources::new(8, 8192));
    }

    #[test]
    fn test_toleration_matching() {
        let taint = Taint { key: "gpu".into(), value: "a100".into() };
        assert!(Toleration { key: "gpu".into(), value: String::new() }.tolerates(&taint));
        assert!(Toleration { key: "gpu".into(), value: "a100".into() }.tolerates(&taint));
        assert!(!Toleration { key: "gpu".into(), value: "h100".into() }.tolerates(&taint));
        assert!(!Toleration { key: "ssd".into(), value: String::new() }.tolerates(&taint));
    }

    #[test]
    fn test_condition_log_is_bounded() {
        let mut node = Node::new("h1".into(), "10.0.0.1".into());
        for i in 0..100 {
            node.add_condition(NodeCondition::new("Test", "Reason", format!("c{}", i)));
        }
        assert_eq!(node.status.conditions.len(), MAX_CONDITIONS);
        assert_eq!(node.status.conditions.last().unwrap().message, "c99");
    }
}
