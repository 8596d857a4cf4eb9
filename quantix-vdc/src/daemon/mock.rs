//! Mock daemon backend for testing and development.
//!
//! Simulates one node daemon in memory: VM power operations flip states
//! instantly, storage pools report a configurable capacity, and failures can
//! be injected per client to exercise rollback paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::domain::{Error, Result};
use quantix_proto::{
    AgentPingResponse, BindNetworkPortRequest, CloneVolumeRequest, ConsoleInfoResponse,
    CreateSnapshotRequest, CreateVmOnNodeRequest, CreateVmOnNodeResponse, CreateVolumeRequest,
    ExecuteInGuestRequest, ExecuteInGuestResponse, HealthCheckResponse, InitStoragePoolRequest,
    ListSnapshotsResponse, ListVmsResponse, NetworkPortOpResponse, NodeInfoResponse, PowerState,
    QuiesceFilesystemsRequest, QuiesceFilesystemsResponse, SnapshotInfo, SnapshotResponse,
    StoragePoolInfoResponse, StoragePoolOpResponse, SyncTimeResponse, ThawFilesystemsResponse,
    VmOpResponse, VmStatusResponse, VolumeInfoResponse,
};

use super::{DaemonClient, DaemonClientFactory};

struct MockVm {
    name: String,
    state: PowerState,
}

/// Mock daemon client. One instance simulates one node.
pub struct MockDaemonClient {
    address: String,
    vms: RwLock<HashMap<String, MockVm>>,
    snapshots: RwLock<HashMap<String, Vec<SnapshotInfo>>>,
    volumes: RwLock<HashMap<(String, String), VolumeInfoResponse>>,
    quiesce_tokens: RwLock<HashMap<String, String>>,
    /// All calls fail with `Unavailable` while set.
    unavailable: AtomicBool,
    /// Next InitStoragePool fails once with this message.
    fail_next_pool_init: Mutex<Option<String>>,
    pool_capacity: Mutex<(u64, u64)>,
    token_counter: AtomicU64,
    calls: Mutex<Vec<String>>,
}

impl MockDaemonClient {
    pub fn new(address: &str) -> Self {
        info!(address = %address, "Creating mock daemon client");
        Self {
            address: address.to_string(),
            vms: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
            volumes: RwLock::new(HashMap::new()),
            quiesce_tokens: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            fail_next_pool_init: Mutex::new(None),
            pool_capacity: Mutex::new((2 << 40, 500 << 30)), // 2 TiB total, 500 GiB used
            token_counter: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every call fail with `Unavailable` until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `InitStoragePool` with the given message.
    pub fn fail_next_pool_init(&self, message: &str) {
        *self.fail_next_pool_init.lock().unwrap() = Some(message.to_string());
    }

    pub fn set_pool_capacity(&self, total_bytes: u64, used_bytes: u64) {
        *self.pool_capacity.lock().unwrap() = (total_bytes, used_bytes);
    }

    /// Method names invoked on this client, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn vm_state(&self, vm_id: &str) -> Option<PowerState> {
        self.vms.read().unwrap().get(vm_id).map(|vm| vm.state)
    }

    fn record(&self, method: &str) -> Result<()> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Unavailable(format!(
                "daemon {}: connection refused",
                self.address
            )));
        }
        Ok(())
    }

    fn vm_op(&self, vm_id: &str, to: PowerState) -> Result<VmOpResponse> {
        let mut vms = self.vms.write().unwrap();
        let vm = vms
            .get_mut(vm_id)
            .ok_or_else(|| Error::not_found("VM", vm_id))?;
        vm.state = to;
        Ok(VmOpResponse {
            vm_id: vm_id.to_string(),
            state: to as i32,
            message: String::new(),
        })
    }
}

#[async_trait]
impl DaemonClient for MockDaemonClient {
    async fn health_check(&self, _timeout: Duration) -> Result<HealthCheckResponse> {
        self.record("health_check")?;
        Ok(HealthCheckResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            hypervisor: "mock".to_string(),
            hypervisor_version: "1.0.0".to_string(),
            uptime_seconds: 3600,
        })
    }

    async fn get_node_info(&self, _timeout: Duration) -> Result<NodeInfoResponse> {
        self.record("get_node_info")?;
        Ok(NodeInfoResponse {
            node_id: String::new(),
            hostname: self.address.clone(),
            management_ip: self.address.clone(),
            cpu_model: "Mock CPU".to_string(),
            cpu_cores: 16,
            memory_total_bytes: 32 << 30,
            memory_available_bytes: 24 << 30,
            kernel_version: "6.6.0-mock".to_string(),
            hypervisor_name: "mock".to_string(),
            hypervisor_version: "1.0.0".to_string(),
        })
    }

    async fn create_vm(
        &self,
        request: CreateVmOnNodeRequest,
        _timeout: Duration,
    ) -> Result<CreateVmOnNodeResponse> {
        self.record("create_vm")?;
        let mut vms = self.vms.write().unwrap();
        if vms.contains_key(&request.vm_id) {
            return Err(Error::already_exists("VM", &request.vm_id));
        }
        debug!(vm_id = %request.vm_id, name = %request.name, "Mock VM created");
        vms.insert(
            request.vm_id.clone(),
            MockVm { name: request.name, state: PowerState::Stopped },
        );
        Ok(CreateVmOnNodeResponse {
            vm_id: request.vm_id,
            state: PowerState::Stopped as i32,
        })
    }

    async fn start_vm(&self, vm_id: &str, _timeout: Duration) -> Result<VmOpResponse> {
        self.record("start_vm")?;
        self.vm_op(vm_id, PowerState::Running)
    }

    async fn stop_vm(
        &self,
        vm_id: &str,
        _stop_timeout: Duration,
        _force: bool,
        _timeout: Duration,
    ) -> Result<VmOpResponse> {
        self.record("stop_vm")?;
        self.vm_op(vm_id, PowerState::Stopped)
    }

    async fn force_stop_vm(&self, vm_id: &str, _timeout: Duration) -> Result<VmOpResponse> {
        self.record("force_stop_vm")?;
        self.vm_op(vm_id, PowerState::Stopped)
    }

    async fn reboot_vm(&self, vm_id: &str, _timeout: Duration) -> Result<VmOpResponse> {
        self.record("reboot_vm")?;
        self.vm_op(vm_id, PowerState::Running)
    }

    async fn pause_vm(&self, vm_id: &str, _timeout: Duration) -> Result<VmOpResponse> {
        self.record("pause_vm")?;
        self.vm_op(vm_id, PowerState::Paused)
    }

    async fn resume_vm(&self, vm_id: &str, _timeout: Duration) -> Result<VmOpResponse> {
        self.record("resume_vm")?;
        self.vm_op(vm_id, PowerState::Running)
    }

    async fn delete_vm(&self, vm_id: &str, _timeout: Duration) -> Result<VmOpResponse> {
        self.record("delete_vm")?;
        self.vms.write().unwrap().remove(vm_id);
        self.snapshots.write().unwrap().remove(vm_id);
        Ok(VmOpResponse {
            vm_id: vm_id.to_string(),
            state: PowerState::Stopped as i32,
            message: String::new(),
        })
    }

    async fn get_vm_status(&self, vm_id: &str, _timeout: Duration) -> Result<VmStatusResponse> {
        self.record("get_vm_status")?;
        let vms = self.vms.read().unwrap();
        let vm = vms
            .get(vm_id)
            .ok_or_else(|| Error::not_found("VM", vm_id))?;
        Ok(VmStatusResponse {
            vm_id: vm_id.to_string(),
            name: vm.name.clone(),
            state: vm.state as i32,
            ip_addresses: vec![],
            memory_rss_bytes: 0,
            cpu_usage_percent: 0.0,
        })
    }

    async fn list_vms(&self, _timeout: Duration) -> Result<ListVmsResponse> {
        self.record("list_vms")?;
        let vms = self.vms.read().unwrap();
        Ok(ListVmsResponse {
            vms: vms
                .iter()
                .map(|(id, vm)| VmStatusResponse {
                    vm_id: id.clone(),
                    name: vm.name.clone(),
                    state: vm.state as i32,
                    ip_addresses: vec![],
                    memory_rss_bytes: 0,
                    cpu_usage_percent: 0.0,
                })
                .collect(),
        })
    }

    async fn get_console_info(
        &self,
        vm_id: &str,
        _timeout: Duration,
    ) -> Result<ConsoleInfoResponse> {
        self.record("get_console_info")?;
        if !self.vms.read().unwrap().contains_key(vm_id) {
            return Err(Error::not_found("VM", vm_id));
        }
        Ok(ConsoleInfoResponse {
            protocol: "vnc".to_string(),
            host: self.address.clone(),
            port: 5900,
            password: String::new(),
        })
    }

    async fn create_snapshot(
        &self,
        request: CreateSnapshotRequest,
        _timeout: Duration,
    ) -> Result<SnapshotResponse> {
        self.record("create_snapshot")?;
        if !self.vms.read().unwrap().contains_key(&request.vm_id) {
            return Err(Error::not_found("VM", &request.vm_id));
        }
        let snapshot = SnapshotInfo {
            id: format!("snap-{}", self.token_counter.fetch_add(1, Ordering::SeqCst)),
            name: request.name,
            description: request.description,
            created_at_unix: Utc::now().timestamp(),
            has_memory: request.include_memory,
        };
        self.snapshots
            .write()
            .unwrap()
            .entry(request.vm_id)
            .or_default()
            .push(snapshot.clone());
        Ok(SnapshotResponse { snapshot: Some(snapshot) })
    }

    async fn list_snapshots(
        &self,
        vm_id: &str,
        _timeout: Duration,
    ) -> Result<ListSnapshotsResponse> {
        self.record("list_snapshots")?;
        Ok(ListSnapshotsResponse {
            snapshots: self
                .snapshots
                .read()
                .unwrap()
                .get(vm_id)
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn revert_snapshot(
        &self,
        vm_id: &str,
        snapshot_id: &str,
        _timeout: Duration,
    ) -> Result<VmOpResponse> {
        self.record("revert_snapshot")?;
        let snapshots = self.snapshots.read().unwrap();
        let known = snapshots
            .get(vm_id)
            .map(|s| s.iter().any(|snap| snap.id == snapshot_id))
            .unwrap_or(false);
        if !known {
            return Err(Error::not_found("snapshot", snapshot_id));
        }
        drop(snapshots);
        // Reverting leaves the VM stopped, matching hypervisor behavior.
        self.vm_op(vm_id, PowerState::Stopped)
    }

    async fn delete_snapshot(
        &self,
        vm_id: &str,
        snapshot_id: &str,
        _timeout: Duration,
    ) -> Result<VmOpResponse> {
        self.record("delete_snapshot")?;
        let mut snapshots = self.snapshots.write().unwrap();
        if let Some(list) = snapshots.get_mut(vm_id) {
            list.retain(|snap| snap.id != snapshot_id);
        }
        let state = self
            .vms
            .read()
            .unwrap()
            .get(vm_id)
            .map(|vm| vm.state)
            .unwrap_or(PowerState::Stopped);
        Ok(VmOpResponse {
            vm_id: vm_id.to_string(),
            state: state as i32,
            message: String::new(),
        })
    }

    async fn ping_guest_agent(&self, vm_id: &str, _timeout: Duration) -> Result<AgentPingResponse> {
        self.record("ping_guest_agent")?;
        let running = self
            .vms
            .read()
            .unwrap()
            .get(vm_id)
            .map(|vm| vm.state == PowerState::Running)
            .unwrap_or(false);
        Ok(AgentPingResponse {
            connected: running,
            version: "1.0.0".to_string(),
        })
    }

    async fn execute_in_guest(
        &self,
        request: ExecuteInGuestRequest,
        _timeout: Duration,
    ) -> Result<ExecuteInGuestResponse> {
        self.record("execute_in_guest")?;
        if !self.vms.read().unwrap().contains_key(&request.vm_id) {
            return Err(Error::not_found("VM", &request.vm_id));
        }
        Ok(ExecuteInGuestResponse {
            exit_code: 0,
            stdout: format!("{} ok\n", request.command).into_bytes(),
            stderr: Vec::new(),
        })
    }

    async fn quiesce_filesystems(
        &self,
        request: QuiesceFilesystemsRequest,
        _timeout: Duration,
    ) -> Result<QuiesceFilesystemsResponse> {
        self.record("quiesce_filesystems")?;
        let token = format!(
            "quiesce-{}-{}",
            request.vm_id,
            self.token_counter.fetch_add(1, Ordering::SeqCst)
        );
        self.quiesce_tokens
            .write()
            .unwrap()
            .insert(request.vm_id.clone(), token.clone());
        let timeout_secs = if request.timeout_seconds > 0 { request.timeout_seconds } else { 60 };
        let frozen = if request.mount_points.is_empty() {
            vec!["/".to_string()]
        } else {
            request.mount_points
        };
        Ok(QuiesceFilesystemsResponse {
            quiesce_token: token,
            frozen_mount_points: frozen,
            auto_thaw_at_unix: Utc::now().timestamp() + i64::from(timeout_secs),
        })
    }

    async fn thaw_filesystems(
        &self,
        vm_id: &str,
        quiesce_token: &str,
        _timeout: Duration,
    ) -> Result<ThawFilesystemsResponse> {
        self.record("thaw_filesystems")?;
        let mut tokens = self.quiesce_tokens.write().unwrap();
        match tokens.get(vm_id) {
            Some(token) if token == quiesce_token => {
                tokens.remove(vm_id);
                Ok(ThawFilesystemsResponse {
                    thawed_mount_points: vec!["/".to_string()],
                })
            }
            Some(_) => Err(Error::FailedPrecondition(
                "quiesce token does not match".to_string(),
            )),
            None => Err(Error::FailedPrecondition(
                "filesystems are not frozen".to_string(),
            )),
        }
    }

    async fn sync_guest_time(&self, vm_id: &str, _timeout: Duration) -> Result<SyncTimeResponse> {
        self.record("sync_guest_time")?;
        if !self.vms.read().unwrap().contains_key(vm_id) {
            return Err(Error::not_found("VM", vm_id));
        }
        Ok(SyncTimeResponse { guest_offset_ms: 0 })
    }

    async fn init_storage_pool(
        &self,
        request: InitStoragePoolRequest,
        _timeout: Duration,
    ) -> Result<StoragePoolInfoResponse> {
        self.record("init_storage_pool")?;
        if let Some(message) = self.fail_next_pool_init.lock().unwrap().take() {
            return Err(Error::Internal(message));
        }
        let (total, used) = *self.pool_capacity.lock().unwrap();
        Ok(StoragePoolInfoResponse {
            pool_id: request.pool_id,
            r#type: request.r#type,
            healthy: true,
            total_bytes: total,
            used_bytes: used,
            available_bytes: total.saturating_sub(used),
            mount_path: format!("/var/lib/quantix/mnt/{}", request.name),
            device_path: String::new(),
            volume_count: 0,
            message: String::new(),
        })
    }

    async fn destroy_storage_pool(
        &self,
        pool_id: &str,
        _timeout: Duration,
    ) -> Result<StoragePoolOpResponse> {
        self.record("destroy_storage_pool")?;
        Ok(StoragePoolOpResponse {
            pool_id: pool_id.to_string(),
            success: true,
            message: String::new(),
        })
    }

    async fn get_storage_pool_info(
        &self,
        pool_id: &str,
        _timeout: Duration,
    ) -> Result<StoragePoolInfoResponse> {
        self.record("get_storage_pool_info")?;
        let (total, used) = *self.pool_capacity.lock().unwrap();
        Ok(StoragePoolInfoResponse {
            pool_id: pool_id.to_string(),
            r#type: 0,
            healthy: true,
            total_bytes: total,
            used_bytes: used,
            available_bytes: total.saturating_sub(used),
            mount_path: String::new(),
            device_path: String::new(),
            volume_count: self.volumes.read().unwrap().len() as u32,
            message: String::new(),
        })
    }

    async fn create_volume(
        &self,
        request: CreateVolumeRequest,
        _timeout: Duration,
    ) -> Result<VolumeInfoResponse> {
        self.record("create_volume")?;
        let info = VolumeInfoResponse {
            pool_id: request.pool_id.clone(),
            volume_id: request.volume_id.clone(),
            name: request.name,
            size_bytes: request.size_bytes,
            path: format!("/var/lib/quantix/volumes/{}", request.volume_id),
        };
        self.volumes
            .write()
            .unwrap()
            .insert((request.pool_id, request.volume_id), info.clone());
        Ok(info)
    }

    async fn delete_volume(
        &self,
        pool_id: &str,
        volume_id: &str,
        _timeout: Duration,
    ) -> Result<StoragePoolOpResponse> {
        self.record("delete_volume")?;
        self.volumes
            .write()
            .unwrap()
            .remove(&(pool_id.to_string(), volume_id.to_string()));
        Ok(StoragePoolOpResponse {
            pool_id: pool_id.to_string(),
            success: true,
            message: String::new(),
        })
    }

    async fn resize_volume(
        &self,
        pool_id: &str,
        volume_id: &str,
        new_size_bytes: u64,
        _timeout: Duration,
    ) -> Result<VolumeInfoResponse> {
        self.record("resize_volume")?;
        let mut volumes = self.volumes.write().unwrap();
        let volume = volumes
            .get_mut(&(pool_id.to_string(), volume_id.to_string()))
            .ok_or_else(|| Error::not_found("volume", volume_id))?;
        volume.size_bytes = new_size_bytes;
        Ok(volume.clone())
    }

    async fn clone_volume(
        &self,
        request: CloneVolumeRequest,
        _timeout: Duration,
    ) -> Result<VolumeInfoResponse> {
        self.record("clone_volume")?;
        let source = self
            .volumes
            .read()
            .unwrap()
            .get(&(request.pool_id.clone(), request.source_volume_id.clone()))
            .cloned()
            .ok_or_else(|| Error::not_found("volume", &request.source_volume_id))?;
        let clone = VolumeInfoResponse {
            pool_id: request.pool_id.clone(),
            volume_id: request.clone_volume_id.clone(),
            name: request.name,
            size_bytes: source.size_bytes,
            path: format!("/var/lib/quantix/volumes/{}", request.clone_volume_id),
        };
        self.volumes
            .write()
            .unwrap()
            .insert((request.pool_id, request.clone_volume_id), clone.clone());
        Ok(clone)
    }

    async fn bind_network_port(
        &self,
        request: BindNetworkPortRequest,
        _timeout: Duration,
    ) -> Result<NetworkPortOpResponse> {
        self.record("bind_network_port")?;
        Ok(NetworkPortOpResponse {
            port_id: request.port_id,
            success: true,
            message: String::new(),
        })
    }

    async fn unbind_network_port(
        &self,
        port_id: &str,
        _vm_id: &str,
        _timeout: Duration,
    ) -> Result<NetworkPortOpResponse> {
        self.record("unbind_network_port")?;
        Ok(NetworkPortOpResponse {
            port_id: port_id.to_string(),
            success: true,
            message: String::new(),
        })
    }
}

/// Factory handing out one mock client per address, so tests can inject
/// failures on the same instance the pool uses.
pub struct MockDaemonClientFactory {
    clients: Mutex<HashMap<String, Arc<MockDaemonClient>>>,
}

impl MockDaemonClientFactory {
    pub fn new() -> Self {
        Self { clients: Mutex::new(HashMap::new()) }
    }

    /// The mock instance serving `address`, creating it if needed.
    pub fn client_for(&self, address: &str) -> Arc<MockDaemonClient> {
        self.clients
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(MockDaemonClient::new(address)))
            .clone()
    }
}

impl Default for MockDaemonClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DaemonClientFactory for MockDaemonClientFactory {
    async fn connect(&self, address: &str) -> Result<Arc<dyn DaemonClient>> {
        Ok(self.client_for(address))
    }
}
