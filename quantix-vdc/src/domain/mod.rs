//! Domain model for the Quantix-vDC control plane.
//!
//! Entities carry a desired `spec` owned by the control plane and an observed
//! `status` that is host-authoritative: status fields are only produced by
//! heartbeats and explicit command results. Nothing here talks to the network
//! or the database.

mod error;
mod event;
mod folder;
mod network;
mod node;
mod storage;
mod vm;

pub use error::{Error, Result};
pub use event::{EventCategory, EventLevel, SystemEvent};
pub use folder::{Folder, FolderType};
pub use network::{
    BgpSpeaker, FloatingIp, LoadBalancer, LoadBalancerMember, NetworkPhase, Port, RuleDirection,
    SecurityGroup, SecurityGroupRule, VirtualNetwork, VpnService,
};
pub use node::{
    CpuTopology, MemoryInfo, NetworkDevice, Node, NodeCondition, NodePhase, NodeRoles, NodeStatus,
    OvercommitRatios, ReservedResources, Resources, SchedulingConfig, StorageDevice, SystemInfo,
    Taint, Toleration,
};
pub use storage::{
    HostPoolStatus, PoolCapacity, PoolHealth, Provisioning, StorageBackend, StoragePool, Volume,
    VolumePhase,
};
pub use vm::{
    CloudInit, ConsoleSpec, CpuSpec, DiskSpec, Firmware, GuestAgentInfo, NicSpec, ResourceUsage,
    VirtualMachine, VmOrigin, VmPowerState, VmSpec, VmStatus,
};
