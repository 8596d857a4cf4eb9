//! gRPC implementation of the daemon client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::domain::{Error, Result};
use quantix_proto::{
    AgentPingResponse, BindNetworkPortRequest, CloneVolumeRequest, ConsoleInfoResponse,
    CreateSnapshotRequest, CreateVmOnNodeRequest, CreateVmOnNodeResponse, CreateVolumeRequest,
    DeleteSnapshotRequest, ExecuteInGuestRequest, ExecuteInGuestResponse, GetNodeInfoRequest,
    HealthCheckRequest, HealthCheckResponse, InitStoragePoolRequest, ListSnapshotsResponse,
    ListVmsRequest, ListVmsResponse, NetworkPortOpResponse, NodeDaemonServiceClient,
    NodeInfoResponse, QuiesceFilesystemsRequest, QuiesceFilesystemsResponse, ResizeVolumeRequest,
    RevertSnapshotRequest, SnapshotResponse, StopVmRequest, StoragePoolIdRequest,
    StoragePoolInfoResponse, StoragePoolOpResponse, SyncTimeRequest, SyncTimeResponse,
    ThawFilesystemsRequest, ThawFilesystemsResponse, UnbindNetworkPortRequest, VmIdRequest,
    VmOpResponse, VmStatusResponse, VolumeIdRequest, VolumeInfoResponse,
};

use super::{map_status, DaemonClient, DaemonClientFactory};

/// Client for one node daemon over gRPC. Cloning the underlying channel is
/// cheap; one channel is shared for all in-flight calls to the node.
pub struct GrpcDaemonClient {
    channel: Channel,
    address: String,
}

impl GrpcDaemonClient {
    /// Connect to a daemon at `host:port`.
    pub async fn connect(address: &str, connect_timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{}", address))
            .map_err(|e| Error::InvalidArgument(format!("invalid daemon address: {}", e)))?
            .connect_timeout(connect_timeout)
            .tcp_keepalive(Some(Duration::from_secs(30)));

        debug!(address = %address, "🔌 Connecting to node daemon");
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Error::Unavailable(format!("daemon {}: {}", address, e)))?;

        Ok(Self { channel, address: address.to_string() })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn stub(&self) -> NodeDaemonServiceClient<Channel> {
        NodeDaemonServiceClient::new(self.channel.clone())
    }
}

fn request<T>(message: T, timeout: Duration) -> tonic::Request<T> {
    let mut req = tonic::Request::new(message);
    req.set_timeout(timeout);
    req
}

#[async_trait]
impl DaemonClient for GrpcDaemonClient {
    async fn health_check(&self, timeout: Duration) -> Result<HealthCheckResponse> {
        self.stub()
            .health_check(request(HealthCheckRequest {}, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn get_node_info(&self, timeout: Duration) -> Result<NodeInfoResponse> {
        self.stub()
            .get_node_info(request(GetNodeInfoRequest {}, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn create_vm(
        &self,
        req: CreateVmOnNodeRequest,
        timeout: Duration,
    ) -> Result<CreateVmOnNodeResponse> {
        self.stub()
            .create_vm(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn start_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse> {
        self.stub()
            .start_vm(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn stop_vm(
        &self,
        vm_id: &str,
        stop_timeout: Duration,
        force: bool,
        timeout: Duration,
    ) -> Result<VmOpResponse> {
        self.stub()
            .stop_vm(request(
                StopVmRequest {
                    vm_id: vm_id.to_string(),
                    timeout_seconds: stop_timeout.as_secs() as u32,
                    force,
                },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn force_stop_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse> {
        self.stub()
            .force_stop_vm(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn reboot_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse> {
        self.stub()
            .reboot_vm(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn pause_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse> {
        self.stub()
            .pause_vm(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn resume_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse> {
        self.stub()
            .resume_vm(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn delete_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse> {
        self.stub()
            .delete_vm(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn get_vm_status(&self, vm_id: &str, timeout: Duration) -> Result<VmStatusResponse> {
        self.stub()
            .get_vm_status(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn list_vms(&self, timeout: Duration) -> Result<ListVmsResponse> {
        self.stub()
            .list_vms(request(ListVmsRequest {}, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn get_console_info(
        &self,
        vm_id: &str,
        timeout: Duration,
    ) -> Result<ConsoleInfoResponse> {
        self.stub()
            .get_console_info(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn create_snapshot(
        &self,
        req: CreateSnapshotRequest,
        timeout: Duration,
    ) -> Result<SnapshotResponse> {
        self.stub()
            .create_snapshot(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn list_snapshots(
        &self,
        vm_id: &str,
        timeout: Duration,
    ) -> Result<ListSnapshotsResponse> {
        self.stub()
            .list_snapshots(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn revert_snapshot(
        &self,
        vm_id: &str,
        snapshot_id: &str,
        timeout: Duration,
    ) -> Result<VmOpResponse> {
        self.stub()
            .revert_snapshot(request(
                RevertSnapshotRequest {
                    vm_id: vm_id.to_string(),
                    snapshot_id: snapshot_id.to_string(),
                },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn delete_snapshot(
        &self,
        vm_id: &str,
        snapshot_id: &str,
        timeout: Duration,
    ) -> Result<VmOpResponse> {
        self.stub()
            .delete_snapshot(request(
                DeleteSnapshotRequest {
                    vm_id: vm_id.to_string(),
                    snapshot_id: snapshot_id.to_string(),
                },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn ping_guest_agent(&self, vm_id: &str, timeout: Duration) -> Result<AgentPingResponse> {
        self.stub()
            .ping_guest_agent(request(VmIdRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn execute_in_guest(
        &self,
        req: ExecuteInGuestRequest,
        timeout: Duration,
    ) -> Result<ExecuteInGuestResponse> {
        self.stub()
            .execute_in_guest(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn quiesce_filesystems(
        &self,
        req: QuiesceFilesystemsRequest,
        timeout: Duration,
    ) -> Result<QuiesceFilesystemsResponse> {
        self.stub()
            .quiesce_filesystems(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn thaw_filesystems(
        &self,
        vm_id: &str,
        quiesce_token: &str,
        timeout: Duration,
    ) -> Result<ThawFilesystemsResponse> {
        self.stub()
            .thaw_filesystems(request(
                ThawFilesystemsRequest {
                    vm_id: vm_id.to_string(),
                    quiesce_token: quiesce_token.to_string(),
                },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn sync_guest_time(&self, vm_id: &str, timeout: Duration) -> Result<SyncTimeResponse> {
        self.stub()
            .sync_guest_time(request(SyncTimeRequest { vm_id: vm_id.to_string() }, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn init_storage_pool(
        &self,
        req: InitStoragePoolRequest,
        timeout: Duration,
    ) -> Result<StoragePoolInfoResponse> {
        self.stub()
            .init_storage_pool(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn destroy_storage_pool(
        &self,
        pool_id: &str,
        timeout: Duration,
    ) -> Result<StoragePoolOpResponse> {
        self.stub()
            .destroy_storage_pool(request(
                StoragePoolIdRequest { pool_id: pool_id.to_string() },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn get_storage_pool_info(
        &self,
        pool_id: &str,
        timeout: Duration,
    ) -> Result<StoragePoolInfoResponse> {
        self.stub()
            .get_storage_pool_info(request(
                StoragePoolIdRequest { pool_id: pool_id.to_string() },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn create_volume(
        &self,
        req: CreateVolumeRequest,
        timeout: Duration,
    ) -> Result<VolumeInfoResponse> {
        self.stub()
            .create_volume(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn delete_volume(
        &self,
        pool_id: &str,
        volume_id: &str,
        timeout: Duration,
    ) -> Result<StoragePoolOpResponse> {
        self.stub()
            .delete_volume(request(
                VolumeIdRequest {
                    pool_id: pool_id.to_string(),
                    volume_id: volume_id.to_string(),
                },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn resize_volume(
        &self,
        pool_id: &str,
        volume_id: &str,
        new_size_bytes: u64,
        timeout: Duration,
    ) -> Result<VolumeInfoResponse> {
        self.stub()
            .resize_volume(request(
                ResizeVolumeRequest {
                    pool_id: pool_id.to_string(),
                    volume_id: volume_id.to_string(),
                    new_size_bytes,
                },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn clone_volume(
        &self,
        req: CloneVolumeRequest,
        timeout: Duration,
    ) -> Result<VolumeInfoResponse> {
        self.stub()
            .clone_volume(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn bind_network_port(
        &self,
        req: BindNetworkPortRequest,
        timeout: Duration,
    ) -> Result<NetworkPortOpResponse> {
        self.stub()
            .bind_network_port(request(req, timeout))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }

    async fn unbind_network_port(
        &self,
        port_id: &str,
        vm_id: &str,
        timeout: Duration,
    ) -> Result<NetworkPortOpResponse> {
        self.stub()
            .unbind_network_port(request(
                UnbindNetworkPortRequest {
                    port_id: port_id.to_string(),
                    vm_id: vm_id.to_string(),
                },
                timeout,
            ))
            .await
            .map(|r| r.into_inner())
            .map_err(map_status)
    }
}

/// Factory producing gRPC clients for the pool.
pub struct GrpcDaemonClientFactory {
    connect_timeout: Duration,
}

impl GrpcDaemonClientFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl DaemonClientFactory for GrpcDaemonClientFactory {
    async fn connect(&self, address: &str) -> Result<Arc<dyn DaemonClient>> {
        let client = GrpcDaemonClient::connect(address, self.connect_timeout).await?;
        Ok(Arc::new(client))
    }
}
