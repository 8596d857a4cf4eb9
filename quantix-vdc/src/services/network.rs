//! Network service: virtual network, port, security group, floating IP,
//! load balancer, VPN and BGP lifecycle against an opaque northbound writer.
//!
//! The control plane never partially commits: either all required
//! northbound operations succeed and the entity goes Ready, or the entity
//! phase is Error carrying the writer's message.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    BgpSpeaker, Error, FloatingIp, LoadBalancer, LoadBalancerMember, NetworkPhase, Port, Result,
    SecurityGroup, SecurityGroupRule, VirtualMachine, VirtualNetwork, VpnService,
};
use crate::events::EventLog;
use crate::repo::NetworkRepository;

use super::with_conflict_retry;

/// The external component that realizes declarative network intent. Its
/// identity is opaque to the control plane; every op returns the external
/// ID the backend assigned.
#[async_trait]
pub trait NorthboundWriter: Send + Sync {
    async fn create_logical_switch(
        &self,
        name: &str,
        subnet_cidr: &str,
        vlan_id: Option<u32>,
    ) -> Result<String>;
    async fn delete_logical_switch(&self, external_id: &str) -> Result<()>;

    async fn create_logical_port(
        &self,
        switch_external_id: &str,
        name: &str,
        mac_address: &str,
    ) -> Result<String>;
    async fn delete_logical_port(&self, external_id: &str) -> Result<()>;

    async fn upsert_address_set(&self, tag: &str, addresses: &[String]) -> Result<()>;
    async fn upsert_acl(&self, group: &SecurityGroup) -> Result<String>;
    async fn delete_acl(&self, external_id: &str) -> Result<()>;

    async fn create_nat_rule(&self, external_ip: &str, internal_ip: &str) -> Result<String>;
    async fn delete_nat_rule(&self, external_id: &str) -> Result<()>;

    async fn create_load_balancer(&self, lb: &LoadBalancer) -> Result<String>;
    async fn delete_load_balancer(&self, external_id: &str) -> Result<()>;

    async fn create_vpn_service(&self, vpn: &VpnService) -> Result<String>;
    async fn delete_vpn_service(&self, external_id: &str) -> Result<()>;

    async fn create_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<String>;
    async fn delete_bgp_speaker(&self, external_id: &str) -> Result<()>;
}

/// Recording in-memory writer for tests and dev mode.
pub struct MemoryNorthboundWriter {
    counter: AtomicU64,
    ops: Mutex<Vec<String>>,
    fail_next: Mutex<Option<String>>,
}

impl MemoryNorthboundWriter {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            ops: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    /// Fail the next writer op once with the given message.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) -> Result<()> {
        self.ops.lock().unwrap().push(op);
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(Error::Internal(message));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MemoryNorthboundWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NorthboundWriter for MemoryNorthboundWriter {
    async fn create_logical_switch(
        &self,
        name: &str,
        subnet_cidr: &str,
        _vlan_id: Option<u32>,
    ) -> Result<String> {
        self.record(format!("create_logical_switch {} {}", name, subnet_cidr))?;
        Ok(self.next_id("ls"))
    }

    async fn delete_logical_switch(&self, external_id: &str) -> Result<()> {
        self.record(format!("delete_logical_switch {}", external_id))
    }

    async fn create_logical_port(
        &self,
        switch_external_id: &str,
        name: &str,
        _mac_address: &str,
    ) -> Result<String> {
        self.record(format!("create_logical_port {} {}", switch_external_id, name))?;
        Ok(self.next_id("lsp"))
    }

    async fn delete_logical_port(&self, external_id: &str) -> Result<()> {
        self.record(format!("delete_logical_port {}", external_id))
    }

    async fn upsert_address_set(&self, tag: &str, addresses: &[String]) -> Result<()> {
        self.record(format!("upsert_address_set {} [{}]", tag, addresses.join(",")))
    }

    async fn upsert_acl(&self, group: &SecurityGroup) -> Result<String> {
        self.record(format!("upsert_acl {} ({} rules)", group.name, group.rules.len()))?;
        Ok(self.next_id("acl"))
    }

    async fn delete_acl(&self, external_id: &str) -> Result<()> {
        self.record(format!("delete_acl {}", external_id))
    }

    async fn create_nat_rule(&self, external_ip: &str, internal_ip: &str) -> Result<String> {
        self.record(format!("create_nat_rule {} -> {}", external_ip, internal_ip))?;
        Ok(self.next_id("nat"))
    }

    async fn delete_nat_rule(&self, external_id: &str) -> Result<()> {
        self.record(format!("delete_nat_rule {}", external_id))
    }

    async fn create_load_balancer(&self, lb: &LoadBalancer) -> Result<String> {
        self.record(format!("create_load_balancer {}", lb.name))?;
        Ok(self.next_id("lb"))
    }

    async fn delete_load_balancer(&self, external_id: &str) -> Result<()> {
        self.record(format!("delete_load_balancer {}", external_id))
    }

    async fn create_vpn_service(&self, vpn: &VpnService) -> Result<String> {
        self.record(format!("create_vpn_service {}", vpn.name))?;
        Ok(self.next_id("vpn"))
    }

    async fn delete_vpn_service(&self, external_id: &str) -> Result<()> {
        self.record(format!("delete_vpn_service {}", external_id))
    }

    async fn create_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<String> {
        self.record(format!("create_bgp_speaker {}", speaker.name))?;
        Ok(self.next_id("bgp"))
    }

    async fn delete_bgp_speaker(&self, external_id: &str) -> Result<()> {
        self.record(format!("delete_bgp_speaker {}", external_id))
    }
}

/// Per-tag VM addresses; tracked per VM so label changes can retract them.
type TagAddresses = HashMap<String, BTreeMap<Uuid, Vec<String>>>;

pub struct NetworkService {
    repo: Arc<dyn NetworkRepository>,
    writer: Arc<dyn NorthboundWriter>,
    events: Arc<EventLog>,
    /// In-memory address sets for tag-based ACLs, one lock per network.
    address_sets: RwLock<HashMap<Uuid, Arc<tokio::sync::Mutex<TagAddresses>>>>,
}

impl NetworkService {
    pub fn new(
        repo: Arc<dyn NetworkRepository>,
        writer: Arc<dyn NorthboundWriter>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            repo,
            writer,
            events,
            address_sets: RwLock::new(HashMap::new()),
        }
    }

    fn network_lock(&self, network_id: Uuid) -> Arc<tokio::sync::Mutex<TagAddresses>> {
        if let Some(lock) = self.address_sets.read().unwrap().get(&network_id) {
            return lock.clone();
        }
        self.address_sets
            .write()
            .unwrap()
            .entry(network_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(HashMap::new())))
            .clone()
    }

    // =========================================================================
    // Virtual networks
    // =========================================================================

    pub async fn create_network(
        &self,
        name: String,
        subnet_cidr: String,
        gateway_ip: Option<String>,
        vlan_id: Option<u32>,
    ) -> Result<VirtualNetwork> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("network name must not be empty".to_string()));
        }
        if !subnet_cidr.contains('/') {
            return Err(Error::InvalidArgument(format!(
                "subnet {:?} is not CIDR notation",
                subnet_cidr
            )));
        }
        if self.repo.get_network_by_name(&name).await?.is_some() {
            return Err(Error::already_exists("network", &name));
        }

        let mut network = VirtualNetwork::new(name, subnet_cidr);
        network.gateway_ip = gateway_ip;
        network.vlan_id = vlan_id;
        let network = self.repo.create_network(&network).await?;

        match self
            .writer
            .create_logical_switch(&network.name, &network.subnet_cidr, network.vlan_id)
            .await
        {
            Ok(external_id) => {
                let mut network = self.repo.get_network(network.id).await?;
                network.external_id = Some(external_id);
                network.phase = NetworkPhase::Ready;
                network.status_message.clear();
                let network = self.repo.update_network(&network).await?;
                info!(network_id = %network.id, name = %network.name, "🌐 [CREATE] Network realized");
                Ok(network)
            }
            Err(e) => {
                self.mark_network_error(network.id, &e).await;
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    async fn mark_network_error(&self, id: Uuid, error: &Error) {
        let result = with_conflict_retry(|| async {
            let mut network = self.repo.get_network(id).await?;
            network.phase = NetworkPhase::Error;
            network.status_message = error.to_string();
            self.repo.update_network(&network).await
        })
        .await;
        match result {
            Ok(network) => {
                self.events
                    .emit(
                        crate::domain::SystemEvent::new(
                            crate::domain::EventLevel::Error,
                            crate::domain::EventCategory::Network,
                            "NETWORK_REALIZE_FAILED",
                            format!("network {}: {}", network.name, error),
                        )
                        .with_resource(id),
                    )
                    .await;
            }
            Err(e) => {
                warn!(network_id = %id, error = %e, "Failed to record network error phase");
            }
        }
    }

    pub async fn get_network(&self, id: Uuid) -> Result<VirtualNetwork> {
        self.repo.get_network(id).await
    }

    pub async fn list_networks(&self) -> Result<Vec<VirtualNetwork>> {
        self.repo.list_networks().await
    }

    pub async fn update_network(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.repo.update_network(network).await
    }

    pub async fn delete_network(&self, id: Uuid) -> Result<()> {
        let network = self.repo.get_network(id).await?;
        let ports = self.repo.list_ports(Some(id), None).await?;
        if !ports.is_empty() {
            return Err(Error::FailedPrecondition(format!(
                "network {} still has {} port(s)",
                network.name,
                ports.len()
            )));
        }
        if let Some(external_id) = &network.external_id {
            if let Err(e) = self.writer.delete_logical_switch(external_id).await {
                self.mark_network_error(id, &e).await;
                return Err(Error::Internal(format!("northbound writer failed: {}", e)));
            }
        }
        self.repo.delete_network(id).await?;
        self.address_sets.write().unwrap().remove(&id);
        Ok(())
    }

    // =========================================================================
    // Ports
    // =========================================================================

    pub async fn create_port(
        &self,
        network_id: Uuid,
        vm_id: Option<Uuid>,
        nic_id: Option<String>,
        mac_address: String,
        ip_address: Option<String>,
    ) -> Result<Port> {
        let network = self.repo.get_network(network_id).await?;
        if network.phase != NetworkPhase::Ready {
            return Err(Error::FailedPrecondition(format!(
                "network {} is {}",
                network.name, network.phase
            )));
        }
        if mac_address.trim().is_empty() {
            return Err(Error::InvalidArgument("port needs a MAC address".to_string()));
        }
        // Port <-> VM NIC binding is 1:1.
        if let (Some(vm), Some(nic)) = (vm_id, nic_id.as_deref()) {
            let bound = self.repo.list_ports(None, Some(vm)).await?;
            if bound.iter().any(|p| p.nic_id.as_deref() == Some(nic)) {
                return Err(Error::already_exists("port for VM NIC", nic));
            }
        }

        let now = chrono::Utc::now();
        let mut port = Port {
            id: Uuid::new_v4(),
            network_id,
            vm_id,
            nic_id,
            mac_address,
            ip_address,
            external_id: None,
            phase: NetworkPhase::Pending,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let switch_external_id = network
            .external_id
            .ok_or_else(|| Error::FailedPrecondition("network has no external ID".to_string()))?;
        let port_name = format!("port-{}", port.id);
        match self
            .writer
            .create_logical_port(&switch_external_id, &port_name, &port.mac_address)
            .await
        {
            Ok(external_id) => {
                port.external_id = Some(external_id);
                port.phase = NetworkPhase::Ready;
                self.repo.create_port(&port).await
            }
            Err(e) => {
                port.phase = NetworkPhase::Error;
                self.repo.create_port(&port).await.ok();
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    pub async fn get_port(&self, id: Uuid) -> Result<Port> {
        self.repo.get_port(id).await
    }

    pub async fn list_ports(&self, network_id: Option<Uuid>, vm_id: Option<Uuid>) -> Result<Vec<Port>> {
        self.repo.list_ports(network_id, vm_id).await
    }

    pub async fn update_port(&self, port: &Port) -> Result<Port> {
        self.repo.update_port(port).await
    }

    pub async fn delete_port(&self, id: Uuid) -> Result<()> {
        let port = self.repo.get_port(id).await?;
        let bound_fip = self
            .repo
            .list_floating_ips()
            .await?
            .into_iter()
            .find(|fip| fip.port_id == Some(id));
        if let Some(fip) = bound_fip {
            return Err(Error::FailedPrecondition(format!(
                "port is bound to floating IP {}",
                fip.address
            )));
        }
        if let Some(external_id) = &port.external_id {
            self.writer
                .delete_logical_port(external_id)
                .await
                .map_err(|e| Error::Internal(format!("northbound writer failed: {}", e)))?;
        }
        self.repo.delete_port(id).await
    }

    // =========================================================================
    // Security groups and tag-based address sets
    // =========================================================================

    pub async fn create_security_group(
        &self,
        name: String,
        network_id: Uuid,
        rules: Vec<SecurityGroupRule>,
    ) -> Result<SecurityGroup> {
        self.repo.get_network(network_id).await?;

        let now = chrono::Utc::now();
        let mut group = SecurityGroup {
            id: Uuid::new_v4(),
            name,
            network_id,
            rules,
            external_id: None,
            phase: NetworkPhase::Pending,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        match self.realize_security_group(&group).await {
            Ok(external_id) => {
                group.external_id = Some(external_id);
                group.phase = NetworkPhase::Ready;
                self.repo.create_security_group(&group).await
            }
            Err(e) => {
                group.phase = NetworkPhase::Error;
                self.repo.create_security_group(&group).await.ok();
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    /// Push the group's address sets (possibly empty) and its ACL batch.
    async fn realize_security_group(&self, group: &SecurityGroup) -> Result<String> {
        let lock = self.network_lock(group.network_id);
        let sets = lock.lock().await;
        for tag in referenced_tags(&group.rules) {
            let addresses = flatten_addresses(sets.get(&tag));
            self.writer.upsert_address_set(&tag, &addresses).await?;
        }
        self.writer.upsert_acl(group).await
    }

    pub async fn get_security_group(&self, id: Uuid) -> Result<SecurityGroup> {
        self.repo.get_security_group(id).await
    }

    pub async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        self.repo.list_security_groups().await
    }

    pub async fn update_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup> {
        match self.realize_security_group(group).await {
            Ok(external_id) => {
                let mut group = group.clone();
                group.external_id = Some(external_id);
                group.phase = NetworkPhase::Ready;
                self.repo.update_security_group(&group).await
            }
            Err(e) => {
                let mut group = group.clone();
                group.phase = NetworkPhase::Error;
                self.repo.update_security_group(&group).await.ok();
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    pub async fn delete_security_group(&self, id: Uuid) -> Result<()> {
        let group = self.repo.get_security_group(id).await?;
        if let Some(external_id) = &group.external_id {
            self.writer
                .delete_acl(external_id)
                .await
                .map_err(|e| Error::Internal(format!("northbound writer failed: {}", e)))?;
        }
        self.repo.delete_security_group(id).await
    }

    /// Rewrite the address sets a VM contributes to after its labels or
    /// addresses changed. Tag-based rules reference VMs by `key=value`
    /// label pairs.
    pub async fn on_vm_labels_changed(&self, vm: &VirtualMachine) {
        let groups = match self.repo.list_security_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(error = %e, "Failed to list security groups for address set rewrite");
                return;
            }
        };

        for group in groups {
            let tags = referenced_tags(&group.rules);
            if tags.is_empty() {
                continue;
            }
            let lock = self.network_lock(group.network_id);
            let mut sets = lock.lock().await;
            for tag in tags {
                let entry = sets.entry(tag.clone()).or_default();
                let matches = vm_matches_tag(vm, &tag);
                let changed = if matches && !vm.status.ip_addresses.is_empty() {
                    entry.insert(vm.id, vm.status.ip_addresses.clone()) !=
                        Some(vm.status.ip_addresses.clone())
                } else {
                    entry.remove(&vm.id).is_some()
                };
                if changed {
                    let addresses = flatten_addresses(Some(entry));
                    if let Err(e) = self.writer.upsert_address_set(&tag, &addresses).await {
                        warn!(tag = %tag, error = %e, "🌐 Address set rewrite failed");
                    }
                }
            }
        }
    }

    // =========================================================================
    // Floating IPs
    // =========================================================================

    pub async fn create_floating_ip(&self, address: String) -> Result<FloatingIp> {
        if address.trim().is_empty() {
            return Err(Error::InvalidArgument("floating IP address required".to_string()));
        }
        let now = chrono::Utc::now();
        let fip = FloatingIp {
            id: Uuid::new_v4(),
            address,
            port_id: None,
            external_id: None,
            phase: NetworkPhase::Ready,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.repo.create_floating_ip(&fip).await
    }

    /// Bind a floating IP to a port. Binding is exclusive in both
    /// directions.
    pub async fn attach_floating_ip(&self, id: Uuid, port_id: Uuid) -> Result<FloatingIp> {
        let fip = self.repo.get_floating_ip(id).await?;
        if fip.port_id.is_some() {
            return Err(Error::FailedPrecondition(format!(
                "floating IP {} is already bound",
                fip.address
            )));
        }
        let taken = self
            .repo
            .list_floating_ips()
            .await?
            .into_iter()
            .any(|other| other.port_id == Some(port_id));
        if taken {
            return Err(Error::FailedPrecondition(
                "port already has a floating IP".to_string(),
            ));
        }
        let port = self.repo.get_port(port_id).await?;
        let internal_ip = port.ip_address.ok_or_else(|| {
            Error::FailedPrecondition("port has no IP address to NAT to".to_string())
        })?;

        match self.writer.create_nat_rule(&fip.address, &internal_ip).await {
            Ok(external_id) => {
                let mut fip = fip;
                fip.port_id = Some(port_id);
                fip.external_id = Some(external_id);
                fip.phase = NetworkPhase::Ready;
                self.repo.update_floating_ip(&fip).await
            }
            Err(e) => {
                let mut fip = fip;
                fip.phase = NetworkPhase::Error;
                self.repo.update_floating_ip(&fip).await.ok();
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    pub async fn detach_floating_ip(&self, id: Uuid) -> Result<FloatingIp> {
        let mut fip = self.repo.get_floating_ip(id).await?;
        if fip.port_id.is_none() {
            return Ok(fip);
        }
        if let Some(external_id) = &fip.external_id {
            self.writer
                .delete_nat_rule(external_id)
                .await
                .map_err(|e| Error::Internal(format!("northbound writer failed: {}", e)))?;
        }
        fip.port_id = None;
        fip.external_id = None;
        fip.phase = NetworkPhase::Ready;
        self.repo.update_floating_ip(&fip).await
    }

    pub async fn get_floating_ip(&self, id: Uuid) -> Result<FloatingIp> {
        self.repo.get_floating_ip(id).await
    }

    pub async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>> {
        self.repo.list_floating_ips().await
    }

    pub async fn delete_floating_ip(&self, id: Uuid) -> Result<()> {
        let fip = self.repo.get_floating_ip(id).await?;
        if fip.port_id.is_some() {
            self.detach_floating_ip(id).await?;
        }
        self.repo.delete_floating_ip(id).await
    }

    // =========================================================================
    // Load balancers, VPN services, BGP speakers
    // =========================================================================

    pub async fn create_load_balancer(
        &self,
        name: String,
        network_id: Uuid,
        vip: String,
        protocol_port: u16,
        members: Vec<LoadBalancerMember>,
    ) -> Result<LoadBalancer> {
        self.repo.get_network(network_id).await?;
        let now = chrono::Utc::now();
        let mut lb = LoadBalancer {
            id: Uuid::new_v4(),
            name,
            network_id,
            vip,
            protocol_port,
            members,
            external_id: None,
            phase: NetworkPhase::Pending,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        match self.writer.create_load_balancer(&lb).await {
            Ok(external_id) => {
                lb.external_id = Some(external_id);
                lb.phase = NetworkPhase::Ready;
                self.repo.create_load_balancer(&lb).await
            }
            Err(e) => {
                lb.phase = NetworkPhase::Error;
                self.repo.create_load_balancer(&lb).await.ok();
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    pub async fn get_load_balancer(&self, id: Uuid) -> Result<LoadBalancer> {
        self.repo.get_load_balancer(id).await
    }

    pub async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        self.repo.list_load_balancers().await
    }

    pub async fn update_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer> {
        self.repo.update_load_balancer(lb).await
    }

    pub async fn delete_load_balancer(&self, id: Uuid) -> Result<()> {
        let lb = self.repo.get_load_balancer(id).await?;
        if let Some(external_id) = &lb.external_id {
            self.writer
                .delete_load_balancer(external_id)
                .await
                .map_err(|e| Error::Internal(format!("northbound writer failed: {}", e)))?;
        }
        self.repo.delete_load_balancer(id).await
    }

    pub async fn create_vpn_service(
        &self,
        name: String,
        network_id: Uuid,
        peer_address: String,
    ) -> Result<VpnService> {
        self.repo.get_network(network_id).await?;
        let now = chrono::Utc::now();
        let mut vpn = VpnService {
            id: Uuid::new_v4(),
            name,
            network_id,
            peer_address,
            external_id: None,
            phase: NetworkPhase::Pending,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        match self.writer.create_vpn_service(&vpn).await {
            Ok(external_id) => {
                vpn.external_id = Some(external_id);
                vpn.phase = NetworkPhase::Ready;
                self.repo.create_vpn_service(&vpn).await
            }
            Err(e) => {
                vpn.phase = NetworkPhase::Error;
                self.repo.create_vpn_service(&vpn).await.ok();
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    pub async fn get_vpn_service(&self, id: Uuid) -> Result<VpnService> {
        self.repo.get_vpn_service(id).await
    }

    pub async fn list_vpn_services(&self) -> Result<Vec<VpnService>> {
        self.repo.list_vpn_services().await
    }

    pub async fn update_vpn_service(&self, vpn: &VpnService) -> Result<VpnService> {
        self.repo.update_vpn_service(vpn).await
    }

    pub async fn delete_vpn_service(&self, id: Uuid) -> Result<()> {
        let vpn = self.repo.get_vpn_service(id).await?;
        if let Some(external_id) = &vpn.external_id {
            self.writer
                .delete_vpn_service(external_id)
                .await
                .map_err(|e| Error::Internal(format!("northbound writer failed: {}", e)))?;
        }
        self.repo.delete_vpn_service(id).await
    }

    pub async fn create_bgp_speaker(
        &self,
        name: String,
        local_as: u32,
        peers: Vec<String>,
    ) -> Result<BgpSpeaker> {
        if local_as == 0 {
            return Err(Error::InvalidArgument("local AS must be non-zero".to_string()));
        }
        let now = chrono::Utc::now();
        let mut speaker = BgpSpeaker {
            id: Uuid::new_v4(),
            name,
            local_as,
            peers,
            external_id: None,
            phase: NetworkPhase::Pending,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        match self.writer.create_bgp_speaker(&speaker).await {
            Ok(external_id) => {
                speaker.external_id = Some(external_id);
                speaker.phase = NetworkPhase::Ready;
                self.repo.create_bgp_speaker(&speaker).await
            }
            Err(e) => {
                speaker.phase = NetworkPhase::Error;
                self.repo.create_bgp_speaker(&speaker).await.ok();
                Err(Error::Internal(format!("northbound writer failed: {}", e)))
            }
        }
    }

    pub async fn get_bgp_speaker(&self, id: Uuid) -> Result<BgpSpeaker> {
        self.repo.get_bgp_speaker(id).await
    }

    pub async fn list_bgp_speakers(&self) -> Result<Vec<BgpSpeaker>> {
        self.repo.list_bgp_speakers().await
    }

    pub async fn update_bgp_speaker(&self, speaker: &BgpSpeaker) -> Result<BgpSpeaker> {
        self.repo.update_bgp_speaker(speaker).await
    }

    pub async fn delete_bgp_speaker(&self, id: Uuid) -> Result<()> {
        let speaker = self.repo.get_bgp_speaker(id).await?;
        if let Some(external_id) = &speaker.external_id {
            self.writer
                .delete_bgp_speaker(external_id)
                .await
                .map_err(|e| Error::Internal(format!("northbound writer failed: {}", e)))?;
        }
        self.repo.delete_bgp_speaker(id).await
    }
}

/// Tags referenced by a rule set.
fn referenced_tags(rules: &[SecurityGroupRule]) -> Vec<String> {
    let mut tags: Vec<String> = rules
        .iter()
        .filter_map(|rule| rule.remote_tag.clone())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// A VM belongs to tag `key=value` when its labels carry that pair, and to
/// a bare `key` tag when the label key exists.
fn vm_matches_tag(vm: &VirtualMachine, tag: &str) -> bool {
    match tag.split_once('=') {
        Some((key, value)) => vm.spec.labels.get(key).map(String::as_str) == Some(value),
        None => vm.spec.labels.contains_key(tag),
    }
}

fn flatten_addresses(entry: Option<&BTreeMap<Uuid, Vec<String>>>) -> Vec<String> {
    let mut addresses: Vec<String> = entry
        .map(|vms| vms.values().flatten().cloned().collect())
        .unwrap_or_default();
    addresses.sort();
    addresses.dedup();
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{VmSpec, RuleDirection};
    use crate::repo::memory::{MemoryEventRepository, MemoryNetworkRepository};

    fn service() -> (Arc<MemoryNorthboundWriter>, NetworkService) {
        let writer = Arc::new(MemoryNorthboundWriter::new());
        let events = Arc::new(EventLog::new(Arc::new(MemoryEventRepository::new())));
        let service = NetworkService::new(
            Arc::new(MemoryNetworkRepository::new()),
            writer.clone(),
            events,
        );
        (writer, service)
    }

    #[tokio::test]
    async fn test_create_network_records_external_id() {
        let (writer, service) = service();
        let network = service
            .create_network("web".into(), "10.10.0.0/24".into(), None, None)
            .await
            .unwrap();
        assert_eq!(network.phase, NetworkPhase::Ready);
        assert!(network.external_id.is_some());
        assert!(writer.ops()[0].starts_with("create_logical_switch web"));
    }

    #[tokio::test]
    async fn test_writer_failure_leaves_error_phase() {
        let (writer, service) = service();
        writer.fail_next("nb down");
        let err = service
            .create_network("web".into(), "10.10.0.0/24".into(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));

        let networks = service.list_networks().await.unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].phase, NetworkPhase::Error);
        assert!(networks[0].status_message.contains("nb down"));
    }

    #[tokio::test]
    async fn test_floating_ip_binding_is_exclusive() {
        let (_writer, service) = service();
        let network = service
            .create_network("web".into(), "10.10.0.0/24".into(), None, None)
            .await
            .unwrap();
        let port = service
            .create_port(network.id, None, None, "52:54:00:00:00:01".into(), Some("10.10.0.5".into()))
            .await
            .unwrap();

        let a = service.create_floating_ip("203.0.113.10".into()).await.unwrap();
        let b = service.create_floating_ip("203.0.113.11".into()).await.unwrap();

        service.attach_floating_ip(a.id, port.id).await.unwrap();
        let err = service.attach_floating_ip(b.id, port.id).await.unwrap_err();
        assert!(matches!(err, Error::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_label_change_rewrites_address_set() {
        let (writer, service) = service();
        let network = service
            .create_network("web".into(), "10.10.0.0/24".into(), None, None)
            .await
            .unwrap();
        service
            .create_security_group(
                "allow-web".into(),
                network.id,
                vec![SecurityGroupRule {
                    direction: RuleDirection::Ingress,
                    protocol: "tcp".into(),
                    port_min: Some(443),
                    port_max: Some(443),
                    remote_cidr: None,
                    remote_tag: Some("tier=web".into()),
                }],
            )
            .await
            .unwrap();

        let mut vm = VirtualMachine::new(Uuid::new_v4(), "v1".into(), VmSpec::default());
        vm.spec.labels.insert("tier".into(), "web".into());
        vm.status.ip_addresses = vec!["10.10.0.7".into()];
        service.on_vm_labels_changed(&vm).await;

        let ops = writer.ops();
        assert!(
            ops.iter().any(|op| op.contains("upsert_address_set tier=web [10.10.0.7]")),
            "ops: {:?}",
            ops
        );

        // Label removed: the address retracts.
        vm.spec.labels.clear();
        service.on_vm_labels_changed(&vm).await;
        let ops = writer.ops();
        assert!(ops.last().unwrap().contains("upsert_address_set tier=web []"));
    }
}
