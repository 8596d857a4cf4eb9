//! Typed client to the per-node daemons and the process-wide connection pool.
//!
//! Services depend on the [`DaemonClient`] trait; the gRPC implementation
//! talks to real daemons on port 9090 and the mock backend simulates a node
//! for tests and `--dev` mode.

mod grpc;
mod mock;
mod pool;

pub use grpc::{GrpcDaemonClient, GrpcDaemonClientFactory};
pub use mock::{MockDaemonClient, MockDaemonClientFactory};
pub use pool::{DaemonPool, PooledDaemon};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Error, Result};
use quantix_proto::{
    AgentPingResponse, CloneVolumeRequest, ConsoleInfoResponse, CreateSnapshotRequest,
    CreateVmOnNodeRequest, CreateVmOnNodeResponse, CreateVolumeRequest, ExecuteInGuestRequest,
    ExecuteInGuestResponse, HealthCheckResponse, InitStoragePoolRequest, ListSnapshotsResponse,
    ListVmsResponse, NodeInfoResponse, QuiesceFilesystemsRequest, QuiesceFilesystemsResponse,
    StoragePoolInfoResponse, StoragePoolOpResponse, SyncTimeResponse, ThawFilesystemsResponse,
    VmOpResponse, VmStatusResponse, VolumeInfoResponse,
};

/// Typed operations against one node daemon. Every call carries a deadline;
/// implementations translate it into the transport's timeout.
#[async_trait]
pub trait DaemonClient: Send + Sync {
    async fn health_check(&self, timeout: Duration) -> Result<HealthCheckResponse>;
    async fn get_node_info(&self, timeout: Duration) -> Result<NodeInfoResponse>;

    async fn create_vm(
        &self,
        request: CreateVmOnNodeRequest,
        timeout: Duration,
    ) -> Result<CreateVmOnNodeResponse>;
    async fn start_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse>;
    async fn stop_vm(
        &self,
        vm_id: &str,
        stop_timeout: Duration,
        force: bool,
        timeout: Duration,
    ) -> Result<VmOpResponse>;
    async fn force_stop_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse>;
    async fn reboot_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse>;
    async fn pause_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse>;
    async fn resume_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse>;
    async fn delete_vm(&self, vm_id: &str, timeout: Duration) -> Result<VmOpResponse>;
    async fn get_vm_status(&self, vm_id: &str, timeout: Duration) -> Result<VmStatusResponse>;
    async fn list_vms(&self, timeout: Duration) -> Result<ListVmsResponse>;
    async fn get_console_info(&self, vm_id: &str, timeout: Duration)
        -> Result<ConsoleInfoResponse>;

    async fn create_snapshot(
        &self,
        request: CreateSnapshotRequest,
        timeout: Duration,
    ) -> Result<quantix_proto::SnapshotResponse>;
    async fn list_snapshots(&self, vm_id: &str, timeout: Duration)
        -> Result<ListSnapshotsResponse>;
    async fn revert_snapshot(
        &self,
        vm_id: &str,
        snapshot_id: &str,
        timeout: Duration,
    ) -> Result<VmOpResponse>;
    async fn delete_snapshot(
        &self,
        vm_id: &str,
        snapshot_id: &str,
        timeout: Duration,
    ) -> Result<VmOpResponse>;

    async fn ping_guest_agent(&self, vm_id: &str, timeout: Duration) -> Result<AgentPingResponse>;
    async fn execute_in_guest(
        &self,
        request: ExecuteInGuestRequest,
        timeout: Duration,
    ) -> Result<ExecuteInGuestResponse>;
    async fn quiesce_filesystems(
        &self,
        request: QuiesceFilesystemsRequest,
        timeout: Duration,
    ) -> Result<QuiesceFilesystemsResponse>;
    async fn thaw_filesystems(
        &self,
        vm_id: &str,
        quiesce_token: &str,
        timeout: Duration,
    ) -> Result<ThawFilesystemsResponse>;
    async fn sync_guest_time(&self, vm_id: &str, timeout: Duration) -> Result<SyncTimeResponse>;

    async fn init_storage_pool(
        &self,
        request: InitStoragePoolRequest,
        timeout: Duration,
    ) -> Result<StoragePoolInfoResponse>;
    async fn destroy_storage_pool(
        &self,
        pool_id: &str,
        timeout: Duration,
    ) -> Result<StoragePoolOpResponse>;
    async fn get_storage_pool_info(
        &self,
        pool_id: &str,
        timeout: Duration,
    ) -> Result<StoragePoolInfoResponse>;
    async fn create_volume(
        &self,
        request: CreateVolumeRequest,
        timeout: Duration,
    ) -> Result<VolumeInfoResponse>;
    async fn delete_volume(
        &self,
        pool_id: &str,
        volume_id: &str,
        timeout: Duration,
    ) -> Result<StoragePoolOpResponse>;
    async fn resize_volume(
        &self,
        pool_id: &str,
        volume_id: &str,
        new_size_bytes: u64,
        timeout: Duration,
    ) -> Result<VolumeInfoResponse>;
    async fn clone_volume(
        &self,
        request: CloneVolumeRequest,
        timeout: Duration,
    ) -> Result<VolumeInfoResponse>;

    async fn bind_network_port(
        &self,
        request: quantix_proto::BindNetworkPortRequest,
        timeout: Duration,
    ) -> Result<quantix_proto::NetworkPortOpResponse>;
    async fn unbind_network_port(
        &self,
        port_id: &str,
        vm_id: &str,
        timeout: Duration,
    ) -> Result<quantix_proto::NetworkPortOpResponse>;
}

/// Builds a client for a daemon address. Seam between the pool and the
/// transport so tests can hand out mock clients.
#[async_trait]
pub trait DaemonClientFactory: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Arc<dyn DaemonClient>>;
}

/// Map a gRPC status onto the control plane error kinds.
pub(crate) fn map_status(status: tonic::Status) -> Error {
    use tonic::Code;
    let message = status.message().to_string();
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
            Error::Unavailable(message)
        }
        Code::NotFound => Error::NotFound(message),
        Code::AlreadyExists => Error::AlreadyExists(message),
        Code::FailedPrecondition => Error::FailedPrecondition(message),
        Code::InvalidArgument => Error::InvalidArgument(message),
        Code::ResourceExhausted => Error::ResourceExhausted(message),
        _ => Error::Internal(message),
    }
}

/// Retry budget for idempotent daemon calls.
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Retry an idempotent operation on `Unavailable` with exponential backoff
/// (100 ms, 400 ms, 1.6 s, capped at 5 s). Non-idempotent creates must not
/// go through here; callers issue an explicit reconcile instead.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 0;
    loop {
        match op().await {
            Err(Error::Unavailable(message)) if attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "📞 Daemon unavailable, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 4).min(MAX_BACKOFF);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_three_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Unavailable("down".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(Error::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4); // initial + 3 retries
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers() {
        let calls = AtomicU32::new(0);
        let result = with_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Unavailable("down".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_no_retry_on_validation_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::InvalidArgument("bad".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
