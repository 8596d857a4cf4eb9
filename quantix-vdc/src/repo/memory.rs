//! In-memory repositories for tests and development mode.
//!
//! Semantics are identical to the Postgres backend: unique-key violations
//! return `AlreadyExists`, version mismatches on `update` return `Conflict`,
//! and status writes are last-writer-wins.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    BgpSpeaker, Error, FloatingIp, Folder, HostPoolStatus, LoadBalancer, Node, NodeStatus, Port,
    Result, SecurityGroup, StoragePool, SystemEvent, VirtualMachine, VirtualNetwork, VmStatus,
    Volume, VpnService,
};

use super::{
    EventFilter, EventRepository, FolderRepository, NetworkRepository, NodeFilter, NodeRepository,
    Persistable, StoragePoolRepository, VmFilter, VmRepository, VolumeRepository,
};

/// One locked map per entity family.
struct Table<T: Persistable> {
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Persistable> Table<T> {
    fn new() -> Self {
        Self { rows: RwLock::new(HashMap::new()) }
    }

    fn create(&self, entity: &T, kind: &str, unique: impl Fn(&T) -> bool) -> Result<T> {
        let mut rows = self.write()?;
        if rows.contains_key(&entity.id()) {
            return Err(Error::already_exists(kind, entity.id()));
        }
        if rows.values().any(|row| unique(row)) {
            return Err(Error::already_exists(kind, "unique key"));
        }
        let mut stored = entity.clone();
        stored.set_version(1);
        rows.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    fn get(&self, id: Uuid, kind: &str) -> Result<T> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(kind, id))
    }

    fn find(&self, pred: impl Fn(&T) -> bool) -> Result<Option<T>> {
        Ok(self.read()?.values().find(|row| pred(row)).cloned())
    }

    fn list(&self, pred: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        let mut rows: Vec<T> = self.read()?.values().filter(|row| pred(row)).cloned().collect();
        rows.sort_by_key(|row| row.id());
        Ok(rows)
    }

    /// Optimistic update: the caller's version must match the stored one.
    fn update(&self, entity: &T, kind: &str) -> Result<T> {
        let mut rows = self.write()?;
        let stored = rows
            .get(&entity.id())
            .ok_or_else(|| Error::not_found(kind, entity.id()))?;
        if stored.version() != entity.version() {
            return Err(Error::Conflict(format!(
                "{} {} modified concurrently (version {} != {})",
                kind,
                entity.id(),
                stored.version(),
                entity.version()
            )));
        }
        let mut next = entity.clone();
        next.set_version(stored.version() + 1);
        next.touch();
        rows.insert(next.id(), next.clone());
        Ok(next)
    }

    /// Status write: serialized, last-writer-wins, no version check.
    fn mutate(&self, id: Uuid, kind: &str, f: impl FnOnce(&mut T)) -> Result<T> {
        let mut rows = self.write()?;
        let row = rows.get_mut(&id).ok_or_else(|| Error::not_found(kind, id))?;
        f(row);
        row.set_version(row.version() + 1);
        row.touch();
        Ok(row.clone())
    }

    fn delete(&self, id: Uuid, kind: &str) -> Result<()> {
        self.write()?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(kind, id))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, T>>> {
        self.rows
            .read()
            .map_err(|_| Error::Internal("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, T>>> {
        self.rows
            .write()
            .map_err(|_| Error::Internal("lock poisoned".to_string()))
    }
}

// =============================================================================
// Nodes
// =============================================================================

pub struct MemoryNodeRepository {
    table: Table<Node>,
}

impl MemoryNodeRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl Default for MemoryNodeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeRepository for MemoryNodeRepository {
    async fn create(&self, node: &Node) -> Result<Node> {
        self.table
            .create(node, "node", |row| row.hostname == node.hostname)
    }

    async fn get(&self, id: Uuid) -> Result<Node> {
        self.table.get(id, "node")
    }

    async fn get_by_hostname(&self, hostname: &str) -> Result<Option<Node>> {
        self.table.find(|row| row.hostname == hostname)
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<Node>> {
        self.table.list(|row| filter.matches(row))
    }

    async fn update(&self, node: &Node) -> Result<Node> {
        self.table.update(node, "node")
    }

    async fn update_status(&self, id: Uuid, status: &NodeStatus) -> Result<Node> {
        self.table
            .mutate(id, "node", |row| row.status = status.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.delete(id, "node")
    }
}

// =============================================================================
// Virtual machines
// =============================================================================

pub struct MemoryVmRepository {
    table: Table<VirtualMachine>,
}

impl MemoryVmRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl Default for MemoryVmRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VmRepository for MemoryVmRepository {
    async fn create(&self, vm: &VirtualMachine) -> Result<VirtualMachine> {
        self.table.create(vm, "VM", |row| {
            row.project_id == vm.project_id && row.name == vm.name
        })
    }

    async fn get(&self, id: Uuid) -> Result<VirtualMachine> {
        self.table.get(id, "VM")
    }

    async fn get_by_name(&self, project_id: Uuid, name: &str) -> Result<Option<VirtualMachine>> {
        self.table
            .find(|row| row.project_id == project_id && row.name == name)
    }

    async fn list(&self, filter: &VmFilter) -> Result<Vec<VirtualMachine>> {
        self.table.list(|row| filter.matches(row))
    }

    async fn update(&self, vm: &VirtualMachine) -> Result<VirtualMachine> {
        self.table.update(vm, "VM")
    }

    async fn update_status(&self, id: Uuid, status: &VmStatus) -> Result<VirtualMachine> {
        self.table.mutate(id, "VM", |row| row.status = status.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.delete(id, "VM")
    }
}

// =============================================================================
// Storage pools and volumes
// =============================================================================

pub struct MemoryStoragePoolRepository {
    table: Table<StoragePool>,
}

impl MemoryStoragePoolRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl Default for MemoryStoragePoolRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoragePoolRepository for MemoryStoragePoolRepository {
    async fn create(&self, pool: &StoragePool) -> Result<StoragePool> {
        self.table
            .create(pool, "storage pool", |row| row.name == pool.name)
    }

    async fn get(&self, id: Uuid) -> Result<StoragePool> {
        self.table.get(id, "storage pool")
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<StoragePool>> {
        self.table.find(|row| row.name == name)
    }

    async fn list(&self) -> Result<Vec<StoragePool>> {
        self.table.list(|_| true)
    }

    async fn update(&self, pool: &StoragePool) -> Result<StoragePool> {
        self.table.update(pool, "storage pool")
    }

    async fn set_host_status(
        &self,
        id: Uuid,
        node_id: Uuid,
        status: &HostPoolStatus,
    ) -> Result<StoragePool> {
        self.table.mutate(id, "storage pool", |row| {
            row.host_statuses.insert(node_id, status.clone());
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.delete(id, "storage pool")
    }
}

pub struct MemoryVolumeRepository {
    table: Table<Volume>,
}

impl MemoryVolumeRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl Default for MemoryVolumeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolumeRepository for MemoryVolumeRepository {
    async fn create(&self, volume: &Volume) -> Result<Volume> {
        self.table.create(volume, "volume", |row| {
            row.pool_id == volume.pool_id && row.name == volume.name
        })
    }

    async fn get(&self, id: Uuid) -> Result<Volume> {
        self.table.get(id, "volume")
    }

    async fn get_by_name(&self, pool_id: Uuid, name: &str) -> Result<Option<Volume>> {
        self.table
            .find(|row| row.pool_id == pool_id && row.name == name)
    }

    async fn list(&self, pool_id: Option<Uuid>) -> Result<Vec<Volume>> {
        self.table
            .list(|row| pool_id.map_or(true, |id| row.pool_id == id))
    }

    async fn update(&self, volume: &Volume) -> Result<Volume> {
        self.table.update(volume, "volume")
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.delete(id, "volume")
    }
}

// =============================================================================
// Network entities
// =============================================================================

pub struct MemoryNetworkRepository {
    networks: Table<VirtualNetwork>,
    ports: Table<Port>,
    security_groups: Table<SecurityGroup>,
    floating_ips: Table<FloatingIp>,
    load_balancers: Table<LoadBalancer>,
    vpn_services: Table<VpnService>,
    bgp_speakers: Table<BgpSpeaker>,
}

impl MemoryNetworkRepository {
    pub fn new() -> Self {
        Self {
            networks: Table::new(),
            ports: Table::new(),
            security_groups: Table::new(),
            floating_ips: Table::new(),
            load_balancers: Table::new(),
            vpn_services: Table::new(),
            bgp_speakers: Table::new(),
        }
    }
}

impl Default for MemoryNetworkRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkRepository for MemoryNetworkRepository {
    async fn create_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.networks
            .create(network, "network", |row| row.name == network.name)
    }

    async fn get_network(&self, id: Uuid) -> Result<VirtualNetwork> {
        self.networks.get(id, "network")
    }

    async fn get_network_by_name(&self, name: &str) -> Result<Option<VirtualNetwork>> {
        self.networks.find(|row| row.name == name)
    }

    async fn list_networks(&self) -> Result<Vec<VirtualNetwork>> {
        self.networks.list(|_| true)
    }

    async fn update_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.networks.update(network, "network")
    }

    async fn delete_network(&self, id: Uuid) -> Result<()> {
        self.networks.delete(id, "network")
    }

    async fn create_port(&self, port: &Port) -> Result<Port> {
        self.ports.create(port, "port", |row| {
            // Port <-> VM NIC binding is 1:1.
            port.vm_id.is_some()
                && row.vm_id == port.vm_id
                && row.nic_id == port.nic_id
        })
    }

    async fn get_port(&self, id: Uuid) -> Result<Port> {
        self.ports.get(id, "port")
    }

    async fn list_ports(&self, network_id: Option<Uuid>, vm_id: Option<Uuid>) -> Result<Vec<Port>> {
        self.ports.list(|row| {
            network_id.map_or(true, |id| row.network_id == id)
                && vm_id.map_or(true, |id| row.vm_id == Some(id))
        })
    }

    async fn update_port(&self, port: &Port) -> Result<Port> {
        self.ports.update(port, "port")
    }

    async fn delete_port(&self, id: Uuid) -> Result<()> {
        self.ports.delete(id, "port")
    }

    async fn create_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup> {
        self.security_groups
            .create(group, "security group", |row| row.name == group.name)
    }

    async fn get_security_group(&self, id: Uuid) -> Result<SecurityGroup> {
        self.security_groups.get(id, "security group")
    }

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        self.security_groups.list(|_| true)
    }

    async fn update_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup> {
        self.security_groups.update(group, "security group")
    }

    async fn delete_security_group(&self, id: Uuid) -> Result<()> {
        self.security_groups.delete(id, "security group")
    }

    async fn create_floating_ip(&self, fip: &FloatingIp) -> Result<FloatingIp> {
        self.floating_ips
            .create(fip, "floating IP", |row| row.address == fip.address)
    }

    async fn get_floating_ip(&self, id: Uuid) -> Result<FloatingIp> {
        self.floating_ips.get(id, "floating IP")
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>> {
        self.floating_ips.list(|_| true)
    }

    async fn update_floating_ip(&self, fip: &FloatingIp) -> Result<FloatingIp> {
        self.floating_ips.update(fip, "floating IP")
    }

    async fn delete_floating_ip(&self, id: Uuid) -> Result<()> {
        self.floating_ips.delete(id, "floating IP")
    }

    async fn create_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer> {
        self.load_balancers
            .create(lb, "load balancer", |row| row.name == lb.name)
    }

    async fn get_load_balancer(&self, id: Uuid) -> Result<LoadBalancer> {
        self.load_balancers.get(id, "load balancer")
    }

    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        self.load_balancers.list(|_| true)
    }

    async fn update_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer> {
        self.load_balancers.update(lb, "load balancer")
    }

    async fn delete_load_balancer(&self, id: Uuid) -> Result<()> {
        self.load_balancers.delete(id, "load balancer")
    }

    async fn create_vpn_service(&self, vpn: &VpnService) -> Result<VpnService> {
        self.vpn_services
            .create(vpn, "VPN service", |row| row.name == vpn.name)
    }

    async fn get_vpn_service(&self, id: Uuid) -> Result<VpnService> {
        self.vpn_services.get(id, "VPN service")
    }

    async fn list_vpn_services(&self) -> Result<Vec<VpnService>> {
        self.vpn_services.list(|_| true)
    }

    async fn update_vpn_service(&self, vpn: &VpnService) -> Result<VpnService> {
        self.vpn_services.update(vpn, "VPN service")
    }

    async fn delete_vpn_service(&self, id: Uuid) -> Result<()> {
        self.vpn_services.delete(id, "VPN service")
    }

    async fn create_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<BgpSpeaker> {
        self.bgp_speakers
            .create(speaker, "BGP speaker", |row| row.name == speaker.name)
    }

    async fn get_bgp_speaker(&self, id: Uuid) -> Result<BgpSpeaker> {
        self.bgp_speakers.get(id, "BGP speaker")
    }

    async fn list_bgp_speakers(&self) -> Result<Vec<BgpSpeaker>> {
        self.bgp_speakers.list(|_| true)
    }

    async fn update_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<BgpSpeaker> {
        self.bgp_speakers.update(speaker, "BGP speaker")
    }

    async fn delete_bgp_speaker(&self, id: Uuid) -> Result<()> {
        self.bgp_speakers.delete(id, "BGP speaker")
    }
}

// =============================================================================
// Folders
// =============================================================================

pub struct MemoryFolderRepository {
    table: Table<Folder>,
}

impl MemoryFolderRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl Default for MemoryFolderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FolderRepository for MemoryFolderRepository {
    async fn create(&self, folder: &Folder) -> Result<Folder> {
        self.table.create(folder, "folder", |row| {
            row.parent_id == folder.parent_id
                && row.name == folder.name
                && row.project_id == folder.project_id
        })
    }

    async fn get(&self, id: Uuid) -> Result<Folder> {
        self.table.get(id, "folder")
    }

    async fn list(&self, project_id: Option<Uuid>) -> Result<Vec<Folder>> {
        self.table
            .list(|row| project_id.map_or(true, |id| row.project_id == id))
    }

    async fn list_children(&self, parent_id: Option<Uuid>, project_id: Uuid) -> Result<Vec<Folder>> {
        self.table
            .list(|row| row.parent_id == parent_id && row.project_id == project_id)
    }

    async fn update(&self, folder: &Folder) -> Result<Folder> {
        self.table.update(folder, "folder")
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.table.delete(id, "folder")
    }
}

// =============================================================================
// Events
// =============================================================================

pub struct MemoryEventRepository {
    events: RwLock<Vec<SystemEvent>>,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self { events: RwLock::new(Vec::new()) }
    }
}

impl Default for MemoryEventRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn append(&self, event: &SystemEvent) -> Result<()> {
        self.events
            .write()
            .map_err(|_| Error::Internal("lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<SystemEvent>> {
        let events = self
            .events
            .read()
            .map_err(|_| Error::Internal("lock poisoned".to_string()))?;
        let mut out: Vec<SystemEvent> = events
            .iter()
            .rev()
            .filter(|e| {
                filter.level.map_or(true, |l| e.level == l)
                    && filter.category.map_or(true, |c| e.category == c)
                    && filter.resource_id.map_or(true, |r| e.resource_id == Some(r))
            })
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{VmSpec, VmPowerState};

    #[tokio::test]
    async fn test_create_get_roundtrip() {
        let repo = MemoryNodeRepository::new();
        let node = Node::new("h1".into(), "10.0.0.1".into());
        let stored = repo.create(&node).await.unwrap();
        assert_eq!(stored.version, 1);

        let fetched = repo.get(node.id).await.unwrap();
        assert_eq!(fetched.hostname, "h1");
    }

    #[tokio::test]
    async fn test_duplicate_hostname_rejected() {
        let repo = MemoryNodeRepository::new();
        repo.create(&Node::new("h1".into(), "10.0.0.1".into()))
            .await
            .unwrap();
        let err = repo
            .create(&Node::new("h1".into(), "10.0.0.2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = MemoryNodeRepository::new();
        let node = repo
            .create(&Node::new("h1".into(), "10.0.0.1".into()))
            .await
            .unwrap();

        let mut fresh = node.clone();
        fresh.labels.insert("zone".into(), "a".into());
        repo.update(&fresh).await.unwrap();

        // `node` still carries the old version.
        let mut stale = node;
        stale.labels.insert("zone".into(), "b".into());
        let err = repo.update(&stale).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_status_roundtrip() {
        let repo = MemoryVmRepository::new();
        let vm = repo
            .create(&VirtualMachine::new(Uuid::new_v4(), "v1".into(), VmSpec::default()))
            .await
            .unwrap();

        let mut status = vm.status.clone();
        status.state = VmPowerState::Running;
        repo.update_status(vm.id, &status).await.unwrap();

        let fetched = repo.get(vm.id).await.unwrap();
        assert_eq!(fetched.status.state, VmPowerState::Running);
    }

    #[tokio::test]
    async fn test_event_filtering_newest_first() {
        use crate::domain::{EventCategory, EventLevel};
        let repo = MemoryEventRepository::new();
        for i in 0..5 {
            repo.append(&SystemEvent::new(
                EventLevel::Info,
                EventCategory::Node,
                "HOST_RECONNECTED",
                format!("e{}", i),
            ))
            .await
            .unwrap();
        }
        let events = repo
            .list(&EventFilter { limit: Some(2), ..EventFilter::default() })
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "e4");
    }
}
