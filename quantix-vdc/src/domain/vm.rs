//! Virtual machine entity, power state machine and spec validation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{Error, Result};
use super::node::Resources;

/// Observed power state of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmPowerState {
    Stopped,
    Starting,
    Running,
    Paused,
    Suspended,
    Stopping,
    Failed,
    /// Managed but not reported by its host for longer than the grace window.
    Lost,
    /// Delete was accepted but the host has not yet confirmed removal.
    Deleting,
}

impl std::fmt::Display for VmPowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VmPowerState::Stopped => "Stopped",
            VmPowerState::Starting => "Starting",
            VmPowerState::Running => "Running",
            VmPowerState::Paused => "Paused",
            VmPowerState::Suspended => "Suspended",
            VmPowerState::Stopping => "Stopping",
            VmPowerState::Failed => "Failed",
            VmPowerState::Lost => "Lost",
            VmPowerState::Deleting => "Deleting",
        };
        write!(f, "{}", s)
    }
}

impl VmPowerState {
    pub fn can_start(&self) -> bool {
        matches!(self, VmPowerState::Stopped | VmPowerState::Failed)
    }

    pub fn can_stop(&self) -> bool {
        matches!(
            self,
            VmPowerState::Running | VmPowerState::Paused | VmPowerState::Suspended
        )
    }

    pub fn can_reboot(&self) -> bool {
        matches!(self, VmPowerState::Running)
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, VmPowerState::Running)
    }

    pub fn can_resume(&self) -> bool {
        matches!(self, VmPowerState::Paused | VmPowerState::Suspended)
    }

    /// States that count as "on" for delete/decommission guards.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            VmPowerState::Running
                | VmPowerState::Starting
                | VmPowerState::Paused
                | VmPowerState::Stopping
        )
    }
}

/// Where a VM record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VmOrigin {
    ControlPlane,
    HostDiscovered,
    Imported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Firmware {
    Bios,
    Uefi,
}

impl Default for Firmware {
    fn default() -> Self {
        Firmware::Bios
    }
}

/// vCPU topology requested for a VM.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CpuSpec {
    pub sockets: u32,
    pub cores: u32,
    pub threads_per_core: u32,
}

impl Default for CpuSpec {
    fn default() -> Self {
        Self { sockets: 1, cores: 1, threads_per_core: 1 }
    }
}

impl CpuSpec {
    pub fn total_vcpus(&self) -> u32 {
        self.sockets * self.cores * self.threads_per_core
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    pub id: String,
    pub size_gib: u64,
    #[serde(default = "default_disk_bus")]
    pub bus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<Uuid>,
    #[serde(default)]
    pub bootable: bool,
}

fn default_disk_bus() -> String {
    "virtio".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicSpec {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSpec {
    pub vnc_enabled: bool,
    pub spice_enabled: bool,
}

impl Default for ConsoleSpec {
    fn default() -> Self {
        Self { vnc_enabled: true, spice_enabled: false }
    }
}

/// First-boot provisioning payload (cloud-init or sysprep).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudInit {
    #[serde(default)]
    pub user_data: String,
    #[serde(default)]
    pub meta_data: String,
}

/// Desired VM configuration, owned by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSpec {
    pub cpu: CpuSpec,
    pub memory_mib: u64,
    #[serde(default)]
    pub firmware: Firmware,
    #[serde(default)]
    pub disks: Vec<DiskSpec>,
    #[serde(default)]
    pub nics: Vec<NicSpec>,
    #[serde(default)]
    pub console: ConsoleSpec,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_init: Option<CloudInit>,
}

impl Default for VmSpec {
    fn default() -> Self {
        Self {
            cpu: CpuSpec::default(),
            memory_mib: 1024,
            firmware: Firmware::default(),
            disks: Vec::new(),
            nics: Vec::new(),
            console: ConsoleSpec::default(),
            labels: HashMap::new(),
            folder_id: None,
            cloud_init: None,
        }
    }
}

/// Minimum guest memory the platform will provision.
pub const MIN_MEMORY_MIB: u64 = 128;

impl VmSpec {
    /// Validate the spec. Called on create and on spec updates.
    pub fn validate(&self) -> Result<()> {
        if self.cpu.total_vcpus() == 0 {
            return Err(Error::InvalidArgument(
                "cpu topology must yield at least one vCPU".to_string(),
            ));
        }
        if self.memory_mib < MIN_MEMORY_MIB {
            return Err(Error::InvalidArgument(format!(
                "memory must be at least {} MiB, got {}",
                MIN_MEMORY_MIB, self.memory_mib
            )));
        }
        for disk in &self.disks {
            // Overlays over a backing image inherit the image size.
            if disk.size_gib == 0 && disk.backing_file.is_none() {
                return Err(Error::InvalidArgument(format!(
                    "disk {} must have a positive size",
                    disk.id
                )));
            }
        }
        for key in self.labels.keys() {
            if !is_valid_label_key(key) {
                return Err(Error::InvalidArgument(format!(
                    "invalid label key {:?}: must match [a-z0-9A-Z]([-._/a-z0-9A-Z]*[a-z0-9A-Z])?",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Resources the scheduler reserves for this VM.
    pub fn requested_resources(&self) -> Resources {
        Resources::new(self.cpu.total_vcpus(), self.memory_mib)
    }
}

fn is_valid_label_key(key: &str) -> bool {
    if key.is_empty() || key.len() > 63 {
        return false;
    }
    let bytes = key.as_bytes();
    let inner = |c: u8| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'.' | b'_' | b'/');
    bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes.iter().all(|&c| inner(c))
}

/// Resource usage snapshot from the most recent host report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub cpu_usage_percent: f64,
    pub memory_rss_bytes: u64,
}

/// Guest agent details surfaced by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestAgentInfo {
    pub connected: bool,
    pub version: String,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

/// Observed VM state. Host-authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmStatus {
    pub state: VmPowerState,
    /// The node this VM is placed on; empty until scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<Uuid>,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResourceUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_agent: Option<GuestAgentInfo>,
    /// Human-readable detail for the last failure or pending work.
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_at: Option<DateTime<Utc>>,
}

impl Default for VmStatus {
    fn default() -> Self {
        Self {
            state: VmPowerState::Stopped,
            node_id: None,
            ip_addresses: Vec::new(),
            usage: None,
            guest_agent: None,
            message: String::new(),
            last_seen: None,
            lost_reason: None,
            lost_at: None,
        }
    }
}

/// A virtual machine with desired spec and observed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Unique within the project.
    pub name: String,
    pub spec: VmSpec,
    pub status: VmStatus,
    pub origin: VmOrigin,
    pub is_managed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl VirtualMachine {
    pub fn new(project_id: Uuid, name: String, spec: VmSpec) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            name,
            spec,
            status: VmStatus::default(),
            origin: VmOrigin::ControlPlane,
            is_managed: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Mark the VM lost. Idempotent.
    pub fn mark_lost(&mut self, reason: &str, at: DateTime<Utc>) {
        if self.status.state != VmPowerState::Lost {
            self.status.state = VmPowerState::Lost;
            self.status.lost_reason = Some(reason.to_string());
            self.status.lost_at = Some(at);
        }
    }

    /// Clear Lost after the host reports the VM again.
    pub fn clear_lost(&mut self, reported_state: VmPowerState) {
        self.status.state = reported_state;
        self.status.lost_reason = None;
        self.status.lost_at = None;
    }

    /// Flip a discovered VM to managed. An unmanaged VM may be adopted
    /// exactly once.
    pub fn adopt(&mut self) -> Result<()> {
        if self.is_managed {
            return Err(Error::FailedPrecondition(format!(
                "VM {} is already managed",
                self.name
            )));
        }
        self.is_managed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(cores: u32, memory_mib: u64) -> VmSpec {
        VmSpec {
            cpu: CpuSpec { sockets: 1, cores, threads_per_core: 1 },
            memory_mib,
            ..VmSpec::default()
        }
    }

    #[test]
    fn test_validate_rejects_small_memory() {
        let err = spec(2, 64).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(spec(2, 128).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_cpu() {
        let mut s = spec(0, 2048);
        assert!(s.validate().is_err());
        s.cpu.cores = 2;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_disk_sizes() {
        let mut s = spec(2, 2048);
        s.disks.push(DiskSpec {
            id: "disk0".into(),
            size_gib: 0,
            bus: "virtio".into(),
            backing_file: None,
            pool_id: None,
            bootable: true,
        });
        assert!(s.validate().is_err());

        // A zero-size overlay over a cloud image is allowed.
        s.disks[0].backing_file = Some("/data/images/noble.qcow2".into());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_label_keys() {
        let mut s = spec(1, 1024);
        s.labels.insert("tier".into(), "web".into());
        s.labels.insert("app.kubernetes.io/name".into(), "db".into());
        assert!(s.validate().is_ok());

        s.labels.insert("-leading-dash".into(), "x".into());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_power_state_guards() {
        assert!(VmPowerState::Stopped.can_start());
        assert!(VmPowerState::Failed.can_start());
        assert!(!VmPowerState::Running.can_start());
        assert!(VmPowerState::Running.can_stop());
        assert!(VmPowerState::Paused.can_resume());
        assert!(!VmPowerState::Stopped.can_stop());
        assert!(!VmPowerState::Lost.can_start());
        assert!(VmPowerState::Stopping.is_active());
    }

    #[test]
    fn test_lost_roundtrip() {
        let mut vm = VirtualMachine::new(Uuid::new_v4(), "v1".into(), spec(2, 2048));
        vm.status.state = VmPowerState::Running;

        let now = Utc::now();
        vm.mark_lost("not reported by host", now);
        assert_eq!(vm.status.state, VmPowerState::Lost);
        assert_eq!(vm.status.lost_reason.as_deref(), Some("not reported by host"));

        vm.clear_lost(VmPowerState::Running);
        assert_eq!(vm.status.state, VmPowerState::Running);
        assert!(vm.status.lost_reason.is_none());
        assert!(vm.status.lost_at.is_none());
    }

    #[test]
    fn test_adopt_only_once() {
        let mut vm = VirtualMachine::new(Uuid::new_v4(), "v1".into(), spec(1, 512));
        vm.origin = VmOrigin::HostDiscovered;
        vm.is_managed = false;

        assert!(vm.adopt().is_ok());
        assert!(vm.is_managed);
        assert!(vm.adopt().is_err());
    }

    #[test]
    fn test_requested_resources() {
        let s = VmSpec {
            cpu: CpuSpec { sockets: 2, cores: 4, threads_per_core: 2 },
            memory_mib: 4096,
            ..VmSpec::default()
        };
        assert_eq!(s.requested_resources(), Resources::new(16, 4096));
    }
}
