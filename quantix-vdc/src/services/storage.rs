//! Storage pool service: definition, host assignment, orchestrated
//! init/destroy push, and heartbeat-driven status aggregation.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{DaemonConfig, StorageConfig};
use crate::daemon::DaemonPool;
use crate::domain::{
    Error, HostPoolStatus, Node, PoolHealth, Provisioning, Result, StorageBackend, StoragePool,
    Volume, VolumePhase, VmOrigin,
};
use crate::events::EventLog;
use crate::repo::{NodeRepository, StoragePoolRepository, VolumeRepository};

use super::node::PoolStatusReport;
use super::with_conflict_retry;

/// Condition recorded when healthy hosts of a shared backend disagree on
/// capacity beyond the configured tolerance.
const CAPACITY_MISMATCH: &str = "CapacityMismatch";

/// Request to define a storage pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoragePoolRequest {
    pub name: String,
    pub backend: StorageBackend,
    #[serde(default)]
    pub config: serde_json::Value,
    pub assigned_node_ids: Vec<Uuid>,
}

pub struct StoragePoolService {
    pools: Arc<dyn StoragePoolRepository>,
    volumes: Arc<dyn VolumeRepository>,
    nodes: Arc<dyn NodeRepository>,
    daemon_pool: Arc<DaemonPool>,
    events: Arc<EventLog>,
    daemon: DaemonConfig,
    storage: StorageConfig,
}

impl StoragePoolService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pools: Arc<dyn StoragePoolRepository>,
        volumes: Arc<dyn VolumeRepository>,
        nodes: Arc<dyn NodeRepository>,
        daemon_pool: Arc<DaemonPool>,
        events: Arc<EventLog>,
        daemon: DaemonConfig,
        storage: StorageConfig,
    ) -> Self {
        Self { pools, volumes, nodes, daemon_pool, events, daemon, storage }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.request_timeout_secs)
    }

    fn daemon_address(&self, node: &Node) -> String {
        format!("{}:{}", node.management_ip, self.daemon.port)
    }

    /// Define a pool and push `InitStoragePool` to every assigned host.
    ///
    /// The pool record is persisted regardless of the push outcome; the call
    /// succeeds once at least one host reports Healthy and returns `Conflict`
    /// otherwise, leaving the pool Degraded/Error awaiting retry.
    pub async fn create(&self, request: CreateStoragePoolRequest) -> Result<StoragePool> {
        if request.name.trim().is_empty() {
            return Err(Error::InvalidArgument("pool name must not be empty".to_string()));
        }
        if request.assigned_node_ids.is_empty() {
            return Err(Error::InvalidArgument(
                "a pool needs at least one assigned node".to_string(),
            ));
        }
        validate_backend_config(request.backend, &request.config)?;
        if self.pools.get_by_name(&request.name).await?.is_some() {
            return Err(Error::already_exists("storage pool", &request.name));
        }
        for node_id in &request.assigned_node_ids {
            self.nodes.get(*node_id).await?;
        }

        let mut pool = StoragePool::new(request.name, request.backend, request.config);
        pool.assigned_node_ids = request.assigned_node_ids;
        let pool = self.pools.create(&pool).await?;

        info!(
            pool_id = %pool.id,
            name = %pool.name,
            backend = %pool.backend,
            hosts = pool.assigned_node_ids.len(),
            "💾 [INIT] Pushing storage pool to assigned hosts"
        );

        for node_id in pool.assigned_node_ids.clone() {
            quantix_common::log_fanout!(node_id, "init_storage_pool", "pushing pool {}", pool.name);
            let status = self.push_init(&pool, node_id).await;
            self.pools.set_host_status(pool.id, node_id, &status).await?;
        }

        let pool = self.pools.get(pool.id).await?;
        let healthy = pool
            .host_statuses
            .values()
            .any(|s| s.health == PoolHealth::Healthy);
        if !healthy {
            return Err(Error::Conflict(format!(
                "storage pool {} has no healthy host yet; it is retained in phase {} awaiting retry",
                pool.name,
                pool.overall_phase()
            )));
        }
        Ok(pool)
    }

    /// Push `InitStoragePool` to one host; the outcome becomes that host's
    /// status entry.
    async fn push_init(&self, pool: &StoragePool, node_id: Uuid) -> HostPoolStatus {
        let node = match self.nodes.get(node_id).await {
            Ok(node) => node,
            Err(e) => return HostPoolStatus::error(e.to_string()),
        };
        let request = quantix_proto::InitStoragePoolRequest {
            pool_id: pool.id.to_string(),
            name: pool.name.clone(),
            r#type: proto_backend(pool.backend),
            config_json: pool.config.to_string(),
        };
        let result = async {
            let daemon = self
                .daemon_pool
                .get_or_connect(node.id, &self.daemon_address(&node))
                .await?;
            let _permit = daemon.try_acquire()?;
            daemon
                .client()
                .init_storage_pool(request, self.request_timeout())
                .await
        }
        .await;

        match result {
            Ok(info) => {
                let mut status =
                    HostPoolStatus::healthy(info.total_bytes, info.used_bytes, None);
                status.available_bytes = info.available_bytes;
                status.mount_path =
                    (!info.mount_path.is_empty()).then(|| info.mount_path.clone());
                status.device_path =
                    (!info.device_path.is_empty()).then(|| info.device_path.clone());
                status.volume_count = info.volume_count;
                status
            }
            Err(e) => {
                warn!(
                    pool_id = %pool.id,
                    node_id = %node_id,
                    error = %e,
                    "💾 Storage pool init failed on host"
                );
                HostPoolStatus::error(e.to_string())
            }
        }
    }

    /// Ingest one host's pool status report from a heartbeat.
    ///
    /// Unknown pools are adopted as host-discovered and unmanaged.
    pub async fn update_host_pool_status(
        &self,
        node_id: Uuid,
        report: &PoolStatusReport,
    ) -> Result<()> {
        let pool = self.resolve_or_adopt(node_id, report).await?;
        let old_phase = pool.overall_phase();

        let status = report.to_host_status();
        let updated = self.pools.set_host_status(pool.id, node_id, &status).await?;

        let new_phase = updated.overall_phase();
        if new_phase != old_phase {
            self.events
                .pool_phase_changed(updated.id, &updated.name, old_phase, new_phase)
                .await;
        }

        self.reconcile_capacity_condition(updated).await
    }

    async fn resolve_or_adopt(
        &self,
        node_id: Uuid,
        report: &PoolStatusReport,
    ) -> Result<StoragePool> {
        if let Some(pool_id) = report.pool_id {
            if let Ok(pool) = self.pools.get(pool_id).await {
                return Ok(pool);
            }
        }
        if let Some(name) = &report.name {
            if let Some(pool) = self.pools.get_by_name(name).await? {
                // Discovered pools grow their assignment as hosts report them.
                if !pool.is_managed && !pool.assigned_node_ids.contains(&node_id) {
                    return with_conflict_retry(|| async {
                        let mut pool = self
                            .pools
                            .get_by_name(name)
                            .await?
                            .ok_or_else(|| Error::not_found("storage pool", name))?;
                        if !pool.assigned_node_ids.contains(&node_id) {
                            pool.assigned_node_ids.push(node_id);
                        }
                        self.pools.update(&pool).await
                    })
                    .await;
                }
                return Ok(pool);
            }
        }

        // Unknown to the control plane: adopt as discovered.
        let name = report
            .name
            .clone()
            .or_else(|| report.pool_id.map(|id| format!("discovered-{}", id)))
            .unwrap_or_else(|| format!("discovered-{}", Uuid::new_v4()));
        let mut pool = StoragePool::new(
            name,
            report.backend.unwrap_or(StorageBackend::Local),
            serde_json::json!({}),
        );
        if let Some(pool_id) = report.pool_id {
            pool.id = pool_id;
        }
        pool.origin = VmOrigin::HostDiscovered;
        pool.is_managed = false;
        pool.assigned_node_ids = vec![node_id];

        info!(
            pool_id = %pool.id,
            name = %pool.name,
            node_id = %node_id,
            "💾 [DISCOVER] Host reported an unknown storage pool, adopting as unmanaged"
        );
        match self.pools.create(&pool).await {
            Ok(pool) => Ok(pool),
            // A concurrent heartbeat won the creation race.
            Err(Error::AlreadyExists(_)) => self.pools.get(pool.id).await,
            Err(e) => Err(e),
        }
    }

    async fn reconcile_capacity_condition(&self, pool: StoragePool) -> Result<()> {
        let mismatched = pool.capacity_mismatches(self.storage.capacity_tolerance_percent);
        let has_condition = pool.conditions.iter().any(|c| c == CAPACITY_MISMATCH);
        if mismatched.is_empty() == !has_condition {
            return Ok(());
        }
        let pool_id = pool.id;
        with_conflict_retry(|| async {
            let mut pool = self.pools.get(pool_id).await?;
            let mismatched = pool.capacity_mismatches(self.storage.capacity_tolerance_percent);
            if mismatched.is_empty() {
                pool.conditions.retain(|c| c != CAPACITY_MISMATCH);
            } else if !pool.conditions.iter().any(|c| c == CAPACITY_MISMATCH) {
                warn!(
                    pool_id = %pool.id,
                    nodes = ?mismatched,
                    "💾 Healthy hosts disagree on shared pool capacity"
                );
                pool.conditions.push(CAPACITY_MISMATCH.to_string());
            }
            self.pools.update(&pool).await
        })
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<StoragePool> {
        self.pools.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<StoragePool>> {
        self.pools.list().await
    }

    /// Spec mutation (name/config); status fields are host-authoritative.
    pub async fn update(&self, pool: &StoragePool) -> Result<StoragePool> {
        validate_backend_config(pool.backend, &pool.config)?;
        self.pools.update(pool).await
    }

    /// Push `DestroyStoragePool` to every assigned host; remove the record
    /// only when all hosts succeed or `force` is set.
    pub async fn delete(&self, id: Uuid, force: bool) -> Result<()> {
        let pool = self.pools.get(id).await?;

        let volumes = self.volumes.list(Some(id)).await?;
        if !volumes.is_empty() && !force {
            return Err(Error::FailedPrecondition(format!(
                "storage pool {} still has {} volume(s)",
                pool.name,
                volumes.len()
            )));
        }

        let mut failed: Vec<Uuid> = Vec::new();
        for node_id in &pool.assigned_node_ids {
            if let Err(e) = self.push_destroy(&pool, *node_id).await {
                warn!(pool_id = %id, node_id = %node_id, error = %e, "💾 Pool destroy failed on host");
                failed.push(*node_id);
            }
        }

        if !failed.is_empty() && !force {
            return Err(Error::FailedPrecondition(format!(
                "storage pool {} could not be destroyed on {} host(s); retry or use force",
                pool.name,
                failed.len()
            )));
        }

        for volume in volumes {
            self.volumes.delete(volume.id).await.ok();
        }
        self.pools.delete(id).await?;
        info!(pool_id = %id, name = %pool.name, "💾 [DELETE] Storage pool removed");
        Ok(())
    }

    async fn push_destroy(&self, pool: &StoragePool, node_id: Uuid) -> Result<()> {
        let node = self.nodes.get(node_id).await?;
        let daemon = self
            .daemon_pool
            .get_or_connect(node.id, &self.daemon_address(&node))
            .await?;
        let _permit = daemon.try_acquire()?;
        let response = daemon
            .client()
            .destroy_storage_pool(&pool.id.to_string(), self.request_timeout())
            .await?;
        if !response.success {
            return Err(Error::Internal(response.message));
        }
        Ok(())
    }

    /// Flip a discovered pool to managed and record the intended assignment.
    pub async fn adopt(&self, id: Uuid, assigned_node_ids: Vec<Uuid>) -> Result<StoragePool> {
        for node_id in &assigned_node_ids {
            self.nodes.get(*node_id).await?;
        }
        with_conflict_retry(|| {
            let assigned = assigned_node_ids.clone();
            async move {
                let mut pool = self.pools.get(id).await?;
                if pool.is_managed {
                    return Err(Error::FailedPrecondition(format!(
                        "storage pool {} is already managed",
                        pool.name
                    )));
                }
                pool.is_managed = true;
                if !assigned.is_empty() {
                    pool.assigned_node_ids = assigned;
                }
                self.pools.update(&pool).await
            }
        })
        .await
    }

    pub async fn assign_hosts(&self, id: Uuid, node_ids: Vec<Uuid>) -> Result<StoragePool> {
        for node_id in &node_ids {
            self.nodes.get(*node_id).await?;
        }
        let pool = with_conflict_retry(|| {
            let node_ids = node_ids.clone();
            async move {
                let mut pool = self.pools.get(id).await?;
                for node_id in node_ids {
                    if !pool.assigned_node_ids.contains(&node_id) {
                        pool.assigned_node_ids.push(node_id);
                    }
                }
                self.pools.update(&pool).await
            }
        })
        .await?;

        // Newly assigned hosts get the init push; their heartbeats converge
        // the status map afterwards.
        for node_id in node_ids {
            if !pool.host_statuses.contains_key(&node_id) {
                let status = self.push_init(&pool, node_id).await;
                self.pools.set_host_status(pool.id, node_id, &status).await?;
            }
        }
        self.pools.get(id).await
    }

    pub async fn unassign_hosts(&self, id: Uuid, node_ids: Vec<Uuid>) -> Result<StoragePool> {
        let pool = self.pools.get(id).await?;
        for node_id in &node_ids {
            if pool.assigned_node_ids.contains(node_id) {
                if let Err(e) = self.push_destroy(&pool, *node_id).await {
                    warn!(pool_id = %id, node_id = %node_id, error = %e, "💾 Unassign: destroy push failed");
                }
            }
        }
        with_conflict_retry(|| {
            let node_ids = node_ids.clone();
            async move {
                let mut pool = self.pools.get(id).await?;
                pool.assigned_node_ids.retain(|n| !node_ids.contains(n));
                for node_id in &node_ids {
                    pool.host_statuses.remove(node_id);
                }
                self.pools.update(&pool).await
            }
        })
        .await
    }

    // =========================================================================
    // Volumes
    // =========================================================================

    /// First assigned host currently reporting Healthy.
    async fn healthy_host(&self, pool: &StoragePool) -> Result<Node> {
        for node_id in &pool.assigned_node_ids {
            let healthy = pool
                .host_statuses
                .get(node_id)
                .map(|s| s.health == PoolHealth::Healthy)
                .unwrap_or(false);
            if healthy {
                if let Ok(node) = self.nodes.get(*node_id).await {
                    return Ok(node);
                }
            }
        }
        Err(Error::FailedPrecondition(format!(
            "storage pool {} has no healthy host",
            pool.name
        )))
    }

    pub async fn create_volume(
        &self,
        pool_id: Uuid,
        name: String,
        size_bytes: u64,
        provisioning: Provisioning,
    ) -> Result<Volume> {
        if size_bytes == 0 {
            return Err(Error::InvalidArgument("volume size must be positive".to_string()));
        }
        let pool = self.pools.get(pool_id).await?;
        if self.volumes.get_by_name(pool_id, &name).await?.is_some() {
            return Err(Error::already_exists("volume", &name));
        }
        let node = self.healthy_host(&pool).await?;

        let volume = self
            .volumes
            .create(&Volume::new(pool_id, name.clone(), size_bytes, provisioning))
            .await?;

        let daemon = self
            .daemon_pool
            .get_or_connect(node.id, &self.daemon_address(&node))
            .await?;
        let _permit = daemon.try_acquire()?;
        let request = quantix_proto::CreateVolumeRequest {
            pool_id: pool_id.to_string(),
            volume_id: volume.id.to_string(),
            name,
            size_bytes,
            thin: provisioning == Provisioning::Thin,
        };
        match daemon.client().create_volume(request, self.request_timeout()).await {
            Ok(info) => {
                let mut volume = self.volumes.get(volume.id).await?;
                volume.path = Some(info.path);
                volume.phase = VolumePhase::Available;
                self.volumes.update(&volume).await
            }
            Err(e) => {
                let mut volume = self.volumes.get(volume.id).await?;
                volume.phase = VolumePhase::Error;
                self.volumes.update(&volume).await.ok();
                Err(e)
            }
        }
    }

    pub async fn delete_volume(&self, id: Uuid) -> Result<()> {
        let volume = self.volumes.get(id).await?;
        if let Some(vm_id) = volume.attached_vm_id {
            return Err(Error::FailedPrecondition(format!(
                "volume {} is attached to VM {}",
                volume.name, vm_id
            )));
        }
        let pool = self.pools.get(volume.pool_id).await?;
        let node = self.healthy_host(&pool).await?;
        let daemon = self
            .daemon_pool
            .get_or_connect(node.id, &self.daemon_address(&node))
            .await?;
        let _permit = daemon.try_acquire()?;
        daemon
            .client()
            .delete_volume(
                &volume.pool_id.to_string(),
                &volume.id.to_string(),
                self.request_timeout(),
            )
            .await?;
        self.volumes.delete(id).await
    }

    pub async fn resize_volume(&self, id: Uuid, new_size_bytes: u64) -> Result<Volume> {
        let volume = self.volumes.get(id).await?;
        if new_size_bytes <= volume.size_bytes {
            return Err(Error::InvalidArgument(
                "volumes can only grow; shrink is not supported".to_string(),
            ));
        }
        let pool = self.pools.get(volume.pool_id).await?;
        let node = self.healthy_host(&pool).await?;
        let daemon = self
            .daemon_pool
            .get_or_connect(node.id, &self.daemon_address(&node))
            .await?;
        let _permit = daemon.try_acquire()?;
        daemon
            .client()
            .resize_volume(
                &volume.pool_id.to_string(),
                &volume.id.to_string(),
                new_size_bytes,
                self.request_timeout(),
            )
            .await?;
        with_conflict_retry(|| async {
            let mut volume = self.volumes.get(id).await?;
            volume.size_bytes = new_size_bytes;
            self.volumes.update(&volume).await
        })
        .await
    }

    pub async fn clone_volume(&self, id: Uuid, clone_name: String) -> Result<Volume> {
        let source = self.volumes.get(id).await?;
        let pool = self.pools.get(source.pool_id).await?;
        if self.volumes.get_by_name(pool.id, &clone_name).await?.is_some() {
            return Err(Error::already_exists("volume", &clone_name));
        }
        let node = self.healthy_host(&pool).await?;

        let mut clone = Volume::new(
            source.pool_id,
            clone_name.clone(),
            source.size_bytes,
            source.provisioning,
        );
        let daemon = self
            .daemon_pool
            .get_or_connect(node.id, &self.daemon_address(&node))
            .await?;
        let _permit = daemon.try_acquire()?;
        let info = daemon
            .client()
            .clone_volume(
                quantix_proto::CloneVolumeRequest {
                    pool_id: source.pool_id.to_string(),
                    source_volume_id: source.id.to_string(),
                    clone_volume_id: clone.id.to_string(),
                    name: clone_name,
                },
                self.request_timeout(),
            )
            .await?;
        clone.path = Some(info.path);
        clone.phase = VolumePhase::Available;
        self.volumes.create(&clone).await
    }

    pub async fn get_volume(&self, id: Uuid) -> Result<Volume> {
        self.volumes.get(id).await
    }

    pub async fn list_volumes(&self, pool_id: Option<Uuid>) -> Result<Vec<Volume>> {
        self.volumes.list(pool_id).await
    }
}

fn validate_backend_config(backend: StorageBackend, config: &serde_json::Value) -> Result<()> {
    for key in backend.required_config_keys() {
        let present = config
            .get(key)
            .map(|v| !v.is_null() && v.as_str() != Some(""))
            .unwrap_or(false);
        if !present {
            return Err(Error::InvalidArgument(format!(
                "{} pool config requires {:?}",
                backend, key
            )));
        }
    }
    Ok(())
}

fn proto_backend(backend: StorageBackend) -> i32 {
    match backend {
        StorageBackend::Local => quantix_proto::StoragePoolType::Local as i32,
        StorageBackend::Nfs => quantix_proto::StoragePoolType::Nfs as i32,
        StorageBackend::Ceph => quantix_proto::StoragePoolType::Ceph as i32,
        StorageBackend::Iscsi => quantix_proto::StoragePoolType::Iscsi as i32,
    }
}
