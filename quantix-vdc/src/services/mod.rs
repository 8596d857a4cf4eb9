//! Control plane services.
//!
//! Each service owns one entity family: durable intent goes through the
//! repositories, placement goes through the scheduler, and commands fan out
//! to node daemons through the connection pool. Heartbeats enter through the
//! node service and are forwarded to the storage and VM services for
//! reconciliation.

mod folder;
mod network;
mod node;
mod storage;
mod vm;

pub use folder::{FolderService, FolderTree};
pub use network::{MemoryNorthboundWriter, NetworkService, NorthboundWriter};
pub use node::{
    HeartbeatAck, HeartbeatRequest, NodeMetrics, NodeService, PoolStatusReport,
    RegisterNodeRequest, VmStateReport,
};
pub use storage::{CreateStoragePoolRequest, StoragePoolService};
pub use vm::{
    ConsoleInfo, CreateVmRequest, GuestExecResult, QuiesceInfo, VmService, VmSnapshot,
    DEFAULT_PROJECT_ID,
};

use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::daemon::{DaemonClientFactory, DaemonPool};
use crate::domain::{Error, Result};
use crate::events::EventLog;
use crate::repo::{
    EventRepository, FolderRepository, NetworkRepository, NodeRepository, StoragePoolRepository,
    VmRepository, VolumeRepository,
};

/// Optimistic-concurrency retry budget for read-modify-write cycles.
const CONFLICT_RETRIES: u32 = 3;

/// Re-run a read-modify-write cycle when the repository reports a lost
/// race, bounded to three attempts.
pub(crate) async fn with_conflict_retry<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(Error::Conflict(message)) if attempt < CONFLICT_RETRIES => {
                attempt += 1;
                tracing::debug!(attempt, error = %message, "Lost optimistic-concurrency race, retrying");
            }
            other => return other,
        }
    }
}

/// All repositories, bundled for wiring.
pub struct Repositories {
    pub nodes: Arc<dyn NodeRepository>,
    pub vms: Arc<dyn VmRepository>,
    pub pools: Arc<dyn StoragePoolRepository>,
    pub volumes: Arc<dyn VolumeRepository>,
    pub networks: Arc<dyn NetworkRepository>,
    pub folders: Arc<dyn FolderRepository>,
    pub events: Arc<dyn EventRepository>,
}

impl Repositories {
    /// In-memory repositories for tests and dev mode.
    pub fn in_memory() -> Self {
        use crate::repo::memory::*;
        Self {
            nodes: Arc::new(MemoryNodeRepository::new()),
            vms: Arc::new(MemoryVmRepository::new()),
            pools: Arc::new(MemoryStoragePoolRepository::new()),
            volumes: Arc::new(MemoryVolumeRepository::new()),
            networks: Arc::new(MemoryNetworkRepository::new()),
            folders: Arc::new(MemoryFolderRepository::new()),
            events: Arc::new(MemoryEventRepository::new()),
        }
    }

    /// Postgres-backed repositories sharing one connection pool.
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        use crate::repo::postgres::*;
        Self {
            nodes: Arc::new(PostgresNodeRepository::new(pool.clone())),
            vms: Arc::new(PostgresVmRepository::new(pool.clone())),
            pools: Arc::new(PostgresStoragePoolRepository::new(pool.clone())),
            volumes: Arc::new(PostgresVolumeRepository::new(pool.clone())),
            networks: Arc::new(PostgresNetworkRepository::new(pool.clone())),
            folders: Arc::new(PostgresFolderRepository::new(pool.clone())),
            events: Arc::new(PostgresEventRepository::new(pool)),
        }
    }
}

/// Fully wired service graph.
pub struct Services {
    pub nodes: Arc<NodeService>,
    pub vms: Arc<VmService>,
    pub storage: Arc<StoragePoolService>,
    pub network: Arc<NetworkService>,
    pub folders: Arc<FolderService>,
    pub events: Arc<EventLog>,
    pub daemon_pool: Arc<DaemonPool>,
}

impl Services {
    pub fn wire(
        repos: Repositories,
        factory: Arc<dyn DaemonClientFactory>,
        writer: Arc<dyn NorthboundWriter>,
        config: &Config,
    ) -> Self {
        let events = Arc::new(EventLog::new(repos.events.clone()));
        let daemon_pool = Arc::new(DaemonPool::new(factory, config.daemon.max_in_flight));

        let network = Arc::new(NetworkService::new(
            repos.networks.clone(),
            writer,
            events.clone(),
        ));
        let storage = Arc::new(StoragePoolService::new(
            repos.pools.clone(),
            repos.volumes.clone(),
            repos.nodes.clone(),
            daemon_pool.clone(),
            events.clone(),
            config.daemon,
            config.storage,
        ));
        let vms = Arc::new(VmService::new(
            repos.vms.clone(),
            repos.nodes.clone(),
            daemon_pool.clone(),
            events.clone(),
            Some(network.clone()),
            config.daemon,
            config.heartbeat,
        ));
        let nodes = Arc::new(NodeService::new(
            repos.nodes.clone(),
            repos.vms.clone(),
            daemon_pool.clone(),
            events.clone(),
            vms.clone(),
            storage.clone(),
            config.daemon,
            config.heartbeat,
        ));
        let folders = Arc::new(FolderService::new(
            repos.folders.clone(),
            repos.vms.clone(),
        ));

        Self { nodes, vms, storage, network, folders, events, daemon_pool }
    }
}
