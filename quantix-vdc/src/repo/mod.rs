//! Persistence contracts for each entity family.
//!
//! Two backends implement these traits with identical semantics: a Postgres
//! backend for the appliance and an in-memory backend for tests and `--dev`
//! mode. Repositories are safe for concurrent readers; writes to a single
//! entity are serialized by the backing store. `update` performs an
//! optimistic-concurrency check on `version` and returns `Conflict` on a
//! lost race; status writes are host-authoritative and last-writer-wins.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    BgpSpeaker, EventCategory, EventLevel, Folder, FloatingIp, HostPoolStatus, LoadBalancer, Node,
    NodePhase, NodeStatus, Port, Result, SecurityGroup, StoragePool, SystemEvent, VirtualMachine,
    VirtualNetwork, VmPowerState, VmStatus, Volume, VpnService,
};

/// Filter for node listings.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub phase: Option<NodePhase>,
    pub schedulable: Option<bool>,
    pub label_selector: HashMap<String, String>,
}

impl NodeFilter {
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(phase) = self.phase {
            if node.status.phase != phase {
                return false;
            }
        }
        if let Some(schedulable) = self.schedulable {
            if node.scheduling.schedulable != schedulable {
                return false;
            }
        }
        self.label_selector
            .iter()
            .all(|(k, v)| node.labels.get(k) == Some(v))
    }
}

/// Filter for VM listings.
#[derive(Debug, Clone, Default)]
pub struct VmFilter {
    pub project_id: Option<Uuid>,
    pub node_id: Option<Uuid>,
    pub state: Option<VmPowerState>,
    pub folder_id: Option<Uuid>,
    pub managed_only: bool,
}

impl VmFilter {
    pub fn on_node(node_id: Uuid) -> Self {
        Self { node_id: Some(node_id), ..Self::default() }
    }

    pub fn matches(&self, vm: &VirtualMachine) -> bool {
        if let Some(project_id) = self.project_id {
            if vm.project_id != project_id {
                return false;
            }
        }
        if let Some(node_id) = self.node_id {
            if vm.status.node_id != Some(node_id) {
                return false;
            }
        }
        if let Some(state) = self.state {
            if vm.status.state != state {
                return false;
            }
        }
        if let Some(folder_id) = self.folder_id {
            if vm.spec.folder_id != Some(folder_id) {
                return false;
            }
        }
        if self.managed_only && !vm.is_managed {
            return false;
        }
        true
    }
}

/// Filter for event queries. Newest events are returned first.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub level: Option<EventLevel>,
    pub category: Option<EventCategory>,
    pub resource_id: Option<Uuid>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn create(&self, node: &Node) -> Result<Node>;
    async fn get(&self, id: Uuid) -> Result<Node>;
    async fn get_by_hostname(&self, hostname: &str) -> Result<Option<Node>>;
    async fn list(&self, filter: &NodeFilter) -> Result<Vec<Node>>;
    async fn update(&self, node: &Node) -> Result<Node>;
    async fn update_status(&self, id: Uuid, status: &NodeStatus) -> Result<Node>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait VmRepository: Send + Sync {
    async fn create(&self, vm: &VirtualMachine) -> Result<VirtualMachine>;
    async fn get(&self, id: Uuid) -> Result<VirtualMachine>;
    async fn get_by_name(&self, project_id: Uuid, name: &str) -> Result<Option<VirtualMachine>>;
    async fn list(&self, filter: &VmFilter) -> Result<Vec<VirtualMachine>>;
    async fn update(&self, vm: &VirtualMachine) -> Result<VirtualMachine>;
    async fn update_status(&self, id: Uuid, status: &VmStatus) -> Result<VirtualMachine>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait StoragePoolRepository: Send + Sync {
    async fn create(&self, pool: &StoragePool) -> Result<StoragePool>;
    async fn get(&self, id: Uuid) -> Result<StoragePool>;
    async fn get_by_name(&self, name: &str) -> Result<Option<StoragePool>>;
    async fn list(&self) -> Result<Vec<StoragePool>>;
    async fn update(&self, pool: &StoragePool) -> Result<StoragePool>;
    /// Upsert the status entry reported by one host.
    async fn set_host_status(
        &self,
        id: Uuid,
        node_id: Uuid,
        status: &HostPoolStatus,
    ) -> Result<StoragePool>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait VolumeRepository: Send + Sync {
    async fn create(&self, volume: &Volume) -> Result<Volume>;
    async fn get(&self, id: Uuid) -> Result<Volume>;
    async fn get_by_name(&self, pool_id: Uuid, name: &str) -> Result<Option<Volume>>;
    async fn list(&self, pool_id: Option<Uuid>) -> Result<Vec<Volume>>;
    async fn update(&self, volume: &Volume) -> Result<Volume>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// One repository covers the SDN entity families; they share the same
/// lifecycle shape and are always accessed through the network service.
#[async_trait]
pub trait NetworkRepository: Send + Sync {
    async fn create_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork>;
    async fn get_network(&self, id: Uuid) -> Result<VirtualNetwork>;
    async fn get_network_by_name(&self, name: &str) -> Result<Option<VirtualNetwork>>;
    async fn list_networks(&self) -> Result<Vec<VirtualNetwork>>;
    async fn update_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork>;
    async fn delete_network(&self, id: Uuid) -> Result<()>;

    async fn create_port(&self, port: &Port) -> Result<Port>;
    async fn get_port(&self, id: Uuid) -> Result<Port>;
    async fn list_ports(&self, network_id: Option<Uuid>, vm_id: Option<Uuid>) -> Result<Vec<Port>>;
    async fn update_port(&self, port: &Port) -> Result<Port>;
    async fn delete_port(&self, id: Uuid) -> Result<()>;

    async fn create_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup>;
    async fn get_security_group(&self, id: Uuid) -> Result<SecurityGroup>;
    async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>>;
    async fn update_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup>;
    async fn delete_security_group(&self, id: Uuid) -> Result<()>;

    async fn create_floating_ip(&self, fip: &FloatingIp) -> Result<FloatingIp>;
    async fn get_floating_ip(&self, id: Uuid) -> Result<FloatingIp>;
    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>>;
    async fn update_floating_ip(&self, fip: &FloatingIp) -> Result<FloatingIp>;
    async fn delete_floating_ip(&self, id: Uuid) -> Result<()>;

    async fn create_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer>;
    async fn get_load_balancer(&self, id: Uuid) -> Result<LoadBalancer>;
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>>;
    async fn update_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer>;
    async fn delete_load_balancer(&self, id: Uuid) -> Result<()>;

    async fn create_vpn_service(&self, vpn: &VpnService) -> Result<VpnService>;
    async fn get_vpn_service(&self, id: Uuid) -> Result<VpnService>;
    async fn list_vpn_services(&self) -> Result<Vec<VpnService>>;
    async fn update_vpn_service(&self, vpn: &VpnService) -> Result<VpnService>;
    async fn delete_vpn_service(&self, id: Uuid) -> Result<()>;

    async fn create_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<BgpSpeaker>;
    async fn get_bgp_speaker(&self, id: Uuid) -> Result<BgpSpeaker>;
    async fn list_bgp_speakers(&self) -> Result<Vec<BgpSpeaker>>;
    async fn update_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<BgpSpeaker>;
    async fn delete_bgp_speaker(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait FolderRepository: Send + Sync {
    async fn create(&self, folder: &Folder) -> Result<Folder>;
    async fn get(&self, id: Uuid) -> Result<Folder>;
    async fn list(&self, project_id: Option<Uuid>) -> Result<Vec<Folder>>;
    async fn list_children(&self, parent_id: Option<Uuid>, project_id: Uuid) -> Result<Vec<Folder>>;
    async fn update(&self, folder: &Folder) -> Result<Folder>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// The event log is append-only: no update or delete.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn append(&self, event: &SystemEvent) -> Result<()>;
    async fn list(&self, filter: &EventFilter) -> Result<Vec<SystemEvent>>;
}

/// Common surface both backends need from every versioned entity.
pub(crate) trait Persistable: Clone + Send + Sync {
    fn id(&self) -> Uuid;
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);
    fn touch(&mut self);
}

macro_rules! impl_persistable {
    ($($ty:ty),* $(,)?) => {
        $(impl Persistable for $ty {
            fn id(&self) -> Uuid { self.id }
            fn version(&self) -> i64 { self.version }
            fn set_version(&mut self, version: i64) { self.version = version; }
            fn touch(&mut self) { self.updated_at = chrono::Utc::now(); }
        })*
    };
}

impl_persistable!(
    Node,
    VirtualMachine,
    StoragePool,
    Volume,
    VirtualNetwork,
    Port,
    SecurityGroup,
    FloatingIp,
    LoadBalancer,
    VpnService,
    BgpSpeaker,
    Folder,
);
