#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HealthCheckRequest {}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HealthCheckResponse {
    #[prost(bool, tag = "1")]
    pub healthy: bool,
    #[prost(string, tag = "2")]
    pub version: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub hypervisor: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub hypervisor_version: ::prost::alloc::string::String,
    #[prost(uint64, tag = "5")]
    pub uptime_seconds: u64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetNodeInfoRequest {}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeInfoResponse {
    #[prost(string, tag = "1")]
    pub node_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub hostname: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub management_ip: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub cpu_model: ::prost::alloc::string::String,
    #[prost(uint32, tag = "5")]
    pub cpu_cores: u32,
    #[prost(uint64, tag = "6")]
    pub memory_total_bytes: u64,
    #[prost(uint64, tag = "7")]
    pub memory_available_bytes: u64,
    #[prost(string, tag = "8")]
    pub kernel_version: ::prost::alloc::string::String,
    #[prost(string, tag = "9")]
    pub hypervisor_name: ::prost::alloc::string::String,
    #[prost(string, tag = "10")]
    pub hypervisor_version: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VmIdRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiskSpec {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub size_gib: u64,
    #[prost(enumeration = "DiskBus", tag = "3")]
    pub bus: i32,
    /// Backing image for copy-on-write overlays (cloud images).
    #[prost(string, tag = "4")]
    pub backing_file: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(bool, tag = "6")]
    pub bootable: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NicSpec {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub network_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub mac_address: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloudInitSpec {
    #[prost(string, tag = "1")]
    pub user_data: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub meta_data: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VmSpec {
    #[prost(uint32, tag = "1")]
    pub cpu_sockets: u32,
    #[prost(uint32, tag = "2")]
    pub cpu_cores: u32,
    #[prost(uint32, tag = "3")]
    pub cpu_threads_per_core: u32,
    #[prost(uint64, tag = "4")]
    pub memory_mib: u64,
    #[prost(enumeration = "Firmware", tag = "5")]
    pub firmware: i32,
    #[prost(message, repeated, tag = "6")]
    pub disks: ::prost::alloc::vec::Vec<DiskSpec>,
    #[prost(message, repeated, tag = "7")]
    pub nics: ::prost::alloc::vec::Vec<NicSpec>,
    #[prost(bool, tag = "8")]
    pub vnc_enabled: bool,
    #[prost(map = "string, string", tag = "9")]
    pub labels: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
    #[prost(message, optional, tag = "10")]
    pub cloud_init: ::core::option::Option<CloudInitSpec>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateVmOnNodeRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub spec: ::core::option::Option<VmSpec>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateVmOnNodeResponse {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(enumeration = "PowerState", tag = "2")]
    pub state: i32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopVmRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    /// Graceful shutdown budget before giving up (or escalating when force is set).
    #[prost(uint32, tag = "2")]
    pub timeout_seconds: u32,
    #[prost(bool, tag = "3")]
    pub force: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VmOpResponse {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(enumeration = "PowerState", tag = "2")]
    pub state: i32,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VmStatusResponse {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "PowerState", tag = "3")]
    pub state: i32,
    #[prost(string, repeated, tag = "4")]
    pub ip_addresses: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(uint64, tag = "5")]
    pub memory_rss_bytes: u64,
    #[prost(double, tag = "6")]
    pub cpu_usage_percent: f64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListVmsRequest {}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListVmsResponse {
    #[prost(message, repeated, tag = "1")]
    pub vms: ::prost::alloc::vec::Vec<VmStatusResponse>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsoleInfoResponse {
    #[prost(string, tag = "1")]
    pub protocol: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub host: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub port: u32,
    #[prost(string, tag = "4")]
    pub password: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateSnapshotRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub description: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub include_memory: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SnapshotInfo {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub description: ::prost::alloc::string::String,
    #[prost(int64, tag = "4")]
    pub created_at_unix: i64,
    #[prost(bool, tag = "5")]
    pub has_memory: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SnapshotResponse {
    #[prost(message, optional, tag = "1")]
    pub snapshot: ::core::option::Option<SnapshotInfo>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListSnapshotsResponse {
    #[prost(message, repeated, tag = "1")]
    pub snapshots: ::prost::alloc::vec::Vec<SnapshotInfo>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RevertSnapshotRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub snapshot_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteSnapshotRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub snapshot_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AgentPingResponse {
    #[prost(bool, tag = "1")]
    pub connected: bool,
    #[prost(string, tag = "2")]
    pub version: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteInGuestRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub command: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "3")]
    pub args: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(uint32, tag = "4")]
    pub timeout_seconds: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteInGuestResponse {
    #[prost(int32, tag = "1")]
    pub exit_code: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub stdout: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub stderr: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QuiesceFilesystemsRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    /// Empty means all mounted filesystems.
    #[prost(string, repeated, tag = "2")]
    pub mount_points: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(uint32, tag = "3")]
    pub timeout_seconds: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QuiesceFilesystemsResponse {
    /// Opaque token required to thaw; scoped to the frozen mount points.
    #[prost(string, tag = "1")]
    pub quiesce_token: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pub frozen_mount_points: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// The guest auto-thaws at this time even if no thaw arrives.
    #[prost(int64, tag = "3")]
    pub auto_thaw_at_unix: i64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThawFilesystemsRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub quiesce_token: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThawFilesystemsResponse {
    #[prost(string, repeated, tag = "1")]
    pub thawed_mount_points: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncTimeRequest {
    #[prost(string, tag = "1")]
    pub vm_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncTimeResponse {
    #[prost(int64, tag = "1")]
    pub guest_offset_ms: i64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InitStoragePoolRequest {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "StoragePoolType", tag = "3")]
    pub r#type: i32,
    /// Backend-specific configuration, carried opaquely.
    #[prost(string, tag = "4")]
    pub config_json: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoragePoolIdRequest {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoragePoolInfoResponse {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(enumeration = "StoragePoolType", tag = "2")]
    pub r#type: i32,
    #[prost(bool, tag = "3")]
    pub healthy: bool,
    #[prost(uint64, tag = "4")]
    pub total_bytes: u64,
    #[prost(uint64, tag = "5")]
    pub used_bytes: u64,
    #[prost(uint64, tag = "6")]
    pub available_bytes: u64,
    #[prost(string, tag = "7")]
    pub mount_path: ::prost::alloc::string::String,
    #[prost(string, tag = "8")]
    pub device_path: ::prost::alloc::string::String,
    #[prost(uint32, tag = "9")]
    pub volume_count: u32,
    #[prost(string, tag = "10")]
    pub message: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoragePoolOpResponse {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub success: bool,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateVolumeRequest {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub volume_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub size_bytes: u64,
    #[prost(bool, tag = "5")]
    pub thin: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VolumeIdRequest {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub volume_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VolumeInfoResponse {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub volume_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub size_bytes: u64,
    #[prost(string, tag = "5")]
    pub path: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResizeVolumeRequest {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub volume_id: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub new_size_bytes: u64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloneVolumeRequest {
    #[prost(string, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub source_volume_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub clone_volume_id: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub name: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BindNetworkPortRequest {
    #[prost(string, tag = "1")]
    pub port_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub vm_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub network_id: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub mac_address: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnbindNetworkPortRequest {
    #[prost(string, tag = "1")]
    pub port_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub vm_id: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkPortOpResponse {
    #[prost(string, tag = "1")]
    pub port_id: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub success: bool,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PowerState {
    Unspecified = 0,
    Stopped = 1,
    Starting = 2,
    Running = 3,
    Paused = 4,
    Suspended = 5,
    Stopping = 6,
    Crashed = 7,
}
impl PowerState {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            PowerState::Unspecified => "POWER_STATE_UNSPECIFIED",
            PowerState::Stopped => "POWER_STATE_STOPPED",
            PowerState::Starting => "POWER_STATE_STARTING",
            PowerState::Running => "POWER_STATE_RUNNING",
            PowerState::Paused => "POWER_STATE_PAUSED",
            PowerState::Suspended => "POWER_STATE_SUSPENDED",
            PowerState::Stopping => "POWER_STATE_STOPPING",
            PowerState::Crashed => "POWER_STATE_CRASHED",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "POWER_STATE_UNSPECIFIED" => Some(Self::Unspecified),
            "POWER_STATE_STOPPED" => Some(Self::Stopped),
            "POWER_STATE_STARTING" => Some(Self::Starting),
            "POWER_STATE_RUNNING" => Some(Self::Running),
            "POWER_STATE_PAUSED" => Some(Self::Paused),
            "POWER_STATE_SUSPENDED" => Some(Self::Suspended),
            "POWER_STATE_STOPPING" => Some(Self::Stopping),
            "POWER_STATE_CRASHED" => Some(Self::Crashed),
            _ => None,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DiskBus {
    Unspecified = 0,
    Virtio = 1,
    Scsi = 2,
    Sata = 3,
    Ide = 4,
}
impl DiskBus {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            DiskBus::Unspecified => "DISK_BUS_UNSPECIFIED",
            DiskBus::Virtio => "DISK_BUS_VIRTIO",
            DiskBus::Scsi => "DISK_BUS_SCSI",
            DiskBus::Sata => "DISK_BUS_SATA",
            DiskBus::Ide => "DISK_BUS_IDE",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "DISK_BUS_UNSPECIFIED" => Some(Self::Unspecified),
            "DISK_BUS_VIRTIO" => Some(Self::Virtio),
            "DISK_BUS_SCSI" => Some(Self::Scsi),
            "DISK_BUS_SATA" => Some(Self::Sata),
            "DISK_BUS_IDE" => Some(Self::Ide),
            _ => None,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Firmware {
    Unspecified = 0,
    Bios = 1,
    Uefi = 2,
}
impl Firmware {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Firmware::Unspecified => "FIRMWARE_UNSPECIFIED",
            Firmware::Bios => "FIRMWARE_BIOS",
            Firmware::Uefi => "FIRMWARE_UEFI",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "FIRMWARE_UNSPECIFIED" => Some(Self::Unspecified),
            "FIRMWARE_BIOS" => Some(Self::Bios),
            "FIRMWARE_UEFI" => Some(Self::Uefi),
            _ => None,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StoragePoolType {
    Unspecified = 0,
    Local = 1,
    Nfs = 2,
    Ceph = 3,
    Iscsi = 4,
}
impl StoragePoolType {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            StoragePoolType::Unspecified => "STORAGE_POOL_TYPE_UNSPECIFIED",
            StoragePoolType::Local => "STORAGE_POOL_TYPE_LOCAL",
            StoragePoolType::Nfs => "STORAGE_POOL_TYPE_NFS",
            StoragePoolType::Ceph => "STORAGE_POOL_TYPE_CEPH",
            StoragePoolType::Iscsi => "STORAGE_POOL_TYPE_ISCSI",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "STORAGE_POOL_TYPE_UNSPECIFIED" => Some(Self::Unspecified),
            "STORAGE_POOL_TYPE_LOCAL" => Some(Self::Local),
            "STORAGE_POOL_TYPE_NFS" => Some(Self::Nfs),
            "STORAGE_POOL_TYPE_CEPH" => Some(Self::Ceph),
            "STORAGE_POOL_TYPE_ISCSI" => Some(Self::Iscsi),
            _ => None,
        }
    }
}
/// Generated client implementations.
pub mod node_daemon_service_client {
    #![allow(
        unused_variables,
        dead_code,
        missing_docs,
        clippy::wildcard_imports,
        clippy::let_unit_value,
    )]
    use tonic::codegen::*;
    use tonic::codegen::http::Uri;
    #[derive(Debug, Clone)]
    pub struct NodeDaemonServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl NodeDaemonServiceClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> NodeDaemonServiceClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_origin(inner: T, origin: Uri) -> Self {
            let inner = tonic::client::Grpc::with_origin(inner, origin);
            Self { inner }
        }
        pub fn with_interceptor<F>(
            inner: T,
            interceptor: F,
        ) -> NodeDaemonServiceClient<InterceptedService<T, F>>
        where
            F: tonic::service::Interceptor,
            T::ResponseBody: Default,
            T: tonic::codegen::Service<
                http::Request<tonic::body::BoxBody>,
                Response = http::Response<
                    <T as tonic::client::GrpcService<tonic::body::BoxBody>>::ResponseBody,
                >,
            >,
            <T as tonic::codegen::Service<
                http::Request<tonic::body::BoxBody>,
            >>::Error: Into<StdError> + Send + Sync,
        {
            NodeDaemonServiceClient::new(InterceptedService::new(inner, interceptor))
        }
        /// Compress requests with the given encoding.
        ///
        /// This requires the server to support it otherwise it might respond with an
        /// error.
        #[must_use]
        pub fn send_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.inner = self.inner.send_compressed(encoding);
            self
        }
        /// Enable decompressing responses.
        #[must_use]
        pub fn accept_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.inner = self.inner.accept_compressed(encoding);
            self
        }
        /// Limits the maximum size of a decoded message.
        ///
        /// Default: `4MB`
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_decoding_message_size(limit);
            self
        }
        /// Limits the maximum size of an encoded message.
        ///
        /// Default: `usize::MAX`
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_encoding_message_size(limit);
            self
        }
        /// Liveness and daemon identity.
        pub async fn health_check(
            &mut self,
            request: impl tonic::IntoRequest<super::HealthCheckRequest>,
        ) -> std::result::Result<
            tonic::Response<super::HealthCheckResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/HealthCheck",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "HealthCheck"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn get_node_info(
            &mut self,
            request: impl tonic::IntoRequest<super::GetNodeInfoRequest>,
        ) -> std::result::Result<
            tonic::Response<super::NodeInfoResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/GetNodeInfo",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "GetNodeInfo"),
                );
            self.inner.unary(req, path, codec).await
        }
        /// VM lifecycle.
        pub async fn create_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::CreateVmOnNodeRequest>,
        ) -> std::result::Result<
            tonic::Response<super::CreateVmOnNodeResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/CreateVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "CreateVm"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn start_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/StartVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "StartVm"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn stop_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::StopVmRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/StopVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "StopVm"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn force_stop_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/ForceStopVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "ForceStopVm"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn reboot_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/RebootVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "RebootVm"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn pause_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/PauseVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "PauseVm"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn resume_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/ResumeVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "ResumeVm"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn delete_vm(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/DeleteVm",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "DeleteVm"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn get_vm_status(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<
            tonic::Response<super::VmStatusResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/GetVmStatus",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "GetVmStatus"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn list_vms(
            &mut self,
            request: impl tonic::IntoRequest<super::ListVmsRequest>,
        ) -> std::result::Result<
            tonic::Response<super::ListVmsResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/ListVms",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("quantix.node.v1.NodeDaemonService", "ListVms"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn get_console_info(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<
            tonic::Response<super::ConsoleInfoResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/GetConsoleInfo",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "GetConsoleInfo"),
                );
            self.inner.unary(req, path, codec).await
        }
        /// Snapshots.
        pub async fn create_snapshot(
            &mut self,
            request: impl tonic::IntoRequest<super::CreateSnapshotRequest>,
        ) -> std::result::Result<
            tonic::Response<super::SnapshotResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/CreateSnapshot",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "CreateSnapshot"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn list_snapshots(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<
            tonic::Response<super::ListSnapshotsResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/ListSnapshots",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "ListSnapshots"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn revert_snapshot(
            &mut self,
            request: impl tonic::IntoRequest<super::RevertSnapshotRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/RevertSnapshot",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "RevertSnapshot"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn delete_snapshot(
            &mut self,
            request: impl tonic::IntoRequest<super::DeleteSnapshotRequest>,
        ) -> std::result::Result<tonic::Response<super::VmOpResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/DeleteSnapshot",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "DeleteSnapshot"),
                );
            self.inner.unary(req, path, codec).await
        }
        /// Guest agent (proxied through the daemon's virtio-serial channel).
        pub async fn ping_guest_agent(
            &mut self,
            request: impl tonic::IntoRequest<super::VmIdRequest>,
        ) -> std::result::Result<
            tonic::Response<super::AgentPingResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/PingGuestAgent",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "PingGuestAgent"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn execute_in_guest(
            &mut self,
            request: impl tonic::IntoRequest<super::ExecuteInGuestRequest>,
        ) -> std::result::Result<
            tonic::Response<super::ExecuteInGuestResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/ExecuteInGuest",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "ExecuteInGuest"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn quiesce_filesystems(
            &mut self,
            request: impl tonic::IntoRequest<super::QuiesceFilesystemsRequest>,
        ) -> std::result::Result<
            tonic::Response<super::QuiesceFilesystemsResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/QuiesceFilesystems",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "quantix.node.v1.NodeDaemonService",
                        "QuiesceFilesystems",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn thaw_filesystems(
            &mut self,
            request: impl tonic::IntoRequest<super::ThawFilesystemsRequest>,
        ) -> std::result::Result<
            tonic::Response<super::ThawFilesystemsResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/ThawFilesystems",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "quantix.node.v1.NodeDaemonService",
                        "ThawFilesystems",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn sync_guest_time(
            &mut self,
            request: impl tonic::IntoRequest<super::SyncTimeRequest>,
        ) -> std::result::Result<
            tonic::Response<super::SyncTimeResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/SyncGuestTime",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "SyncGuestTime"),
                );
            self.inner.unary(req, path, codec).await
        }
        /// Storage pools and volumes.
        pub async fn init_storage_pool(
            &mut self,
            request: impl tonic::IntoRequest<super::InitStoragePoolRequest>,
        ) -> std::result::Result<
            tonic::Response<super::StoragePoolInfoResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/InitStoragePool",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "quantix.node.v1.NodeDaemonService",
                        "InitStoragePool",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn destroy_storage_pool(
            &mut self,
            request: impl tonic::IntoRequest<super::StoragePoolIdRequest>,
        ) -> std::result::Result<
            tonic::Response<super::StoragePoolOpResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/DestroyStoragePool",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "quantix.node.v1.NodeDaemonService",
                        "DestroyStoragePool",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn get_storage_pool_info(
            &mut self,
            request: impl tonic::IntoRequest<super::StoragePoolIdRequest>,
        ) -> std::result::Result<
            tonic::Response<super::StoragePoolInfoResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/GetStoragePoolInfo",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "quantix.node.v1.NodeDaemonService",
                        "GetStoragePoolInfo",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn create_volume(
            &mut self,
            request: impl tonic::IntoRequest<super::CreateVolumeRequest>,
        ) -> std::result::Result<
            tonic::Response<super::VolumeInfoResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/CreateVolume",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "CreateVolume"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn delete_volume(
            &mut self,
            request: impl tonic::IntoRequest<super::VolumeIdRequest>,
        ) -> std::result::Result<
            tonic::Response<super::StoragePoolOpResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/DeleteVolume",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "DeleteVolume"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn resize_volume(
            &mut self,
            request: impl tonic::IntoRequest<super::ResizeVolumeRequest>,
        ) -> std::result::Result<
            tonic::Response<super::VolumeInfoResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/ResizeVolume",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "ResizeVolume"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn clone_volume(
            &mut self,
            request: impl tonic::IntoRequest<super::CloneVolumeRequest>,
        ) -> std::result::Result<
            tonic::Response<super::VolumeInfoResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/CloneVolume",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("quantix.node.v1.NodeDaemonService", "CloneVolume"),
                );
            self.inner.unary(req, path, codec).await
        }
        /// Network ports (OVS attachment on the host).
        pub async fn bind_network_port(
            &mut self,
            request: impl tonic::IntoRequest<super::BindNetworkPortRequest>,
        ) -> std::result::Result<
            tonic::Response<super::NetworkPortOpResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/BindNetworkPort",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "quantix.node.v1.NodeDaemonService",
                        "BindNetworkPort",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn unbind_network_port(
            &mut self,
            request: impl tonic::IntoRequest<super::UnbindNetworkPortRequest>,
        ) -> std::result::Result<
            tonic::Response<super::NetworkPortOpResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/quantix.node.v1.NodeDaemonService/UnbindNetworkPort",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "quantix.node.v1.NodeDaemonService",
                        "UnbindNetworkPort",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
    }
}
