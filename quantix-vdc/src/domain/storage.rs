//! Storage pool and volume entities, per-host status aggregation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::vm::VmOrigin;

/// Storage backend kind. The backend-specific configuration is carried
/// opaquely on the pool and interpreted by the node daemons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Nfs,
    Ceph,
    Iscsi,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StorageBackend::Local => "local",
            StorageBackend::Nfs => "nfs",
            StorageBackend::Ceph => "ceph",
            StorageBackend::Iscsi => "iscsi",
        };
        write!(f, "{}", s)
    }
}

impl StorageBackend {
    /// Shared backends report the same backend capacity to every host that
    /// mounts them; local capacity aggregates by summation.
    pub fn is_shared(&self) -> bool {
        !matches!(self, StorageBackend::Local)
    }

    /// Required fields in the opaque config, by backend.
    pub fn required_config_keys(&self) -> &'static [&'static str] {
        match self {
            StorageBackend::Local => &["path"],
            StorageBackend::Nfs => &["server", "exportPath"],
            StorageBackend::Ceph => &["monitors", "pool"],
            StorageBackend::Iscsi => &["portal", "target"],
        }
    }
}

/// Health of a pool as seen from one host, and the derived overall phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolHealth {
    Healthy,
    Degraded,
    Error,
    Unknown,
}

impl std::fmt::Display for PoolHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PoolHealth::Healthy => "Healthy",
            PoolHealth::Degraded => "Degraded",
            PoolHealth::Error => "Error",
            PoolHealth::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Pool status as reported by one assigned host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPoolStatus {
    pub health: PoolHealth,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_path: Option<String>,
    pub volume_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub reported_at: DateTime<Utc>,
}

impl HostPoolStatus {
    pub fn healthy(total_bytes: u64, used_bytes: u64, mount_path: Option<String>) -> Self {
        Self {
            health: PoolHealth::Healthy,
            total_bytes,
            used_bytes,
            available_bytes: total_bytes.saturating_sub(used_bytes),
            mount_path,
            device_path: None,
            volume_count: 0,
            error_message: None,
            reported_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            health: PoolHealth::Error,
            total_bytes: 0,
            used_bytes: 0,
            available_bytes: 0,
            mount_path: None,
            device_path: None,
            volume_count: 0,
            error_message: Some(message.into()),
            reported_at: Utc::now(),
        }
    }
}

/// Aggregate capacity derived from the per-host reports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolCapacity {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

/// A named storage backend assigned to one or more nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePool {
    pub id: Uuid,
    /// Globally unique.
    pub name: String,
    pub backend: StorageBackend,
    /// Backend-specific configuration, opaque to the control plane.
    pub config: serde_json::Value,
    #[serde(default)]
    pub assigned_node_ids: Vec<Uuid>,
    /// node ID -> last reported status.
    #[serde(default)]
    pub host_statuses: HashMap<Uuid, HostPoolStatus>,
    #[serde(default)]
    pub conditions: Vec<String>,
    pub origin: VmOrigin,
    pub is_managed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl StoragePool {
    pub fn new(name: String, backend: StorageBackend, config: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            backend,
            config,
            assigned_node_ids: Vec::new(),
            host_statuses: HashMap::new(),
            conditions: Vec::new(),
            origin: VmOrigin::ControlPlane,
            is_managed: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Overall phase derived from the per-host reports:
    /// Healthy iff all assigned hosts report Healthy, Degraded iff at least
    /// one does, Error iff none do, Unknown before the first report.
    pub fn overall_phase(&self) -> PoolHealth {
        if self.host_statuses.is_empty() {
            return PoolHealth::Unknown;
        }
        let assigned = self.assigned_node_ids.len().max(1);
        let healthy = self
            .assigned_node_ids
            .iter()
            .filter(|id| {
                self.host_statuses
                    .get(id)
                    .map(|s| s.health == PoolHealth::Healthy)
                    .unwrap_or(false)
            })
            .count();
        if healthy == 0 {
            PoolHealth::Error
        } else if healthy == assigned {
            PoolHealth::Healthy
        } else {
            PoolHealth::Degraded
        }
    }

    /// Aggregate capacity. Shared backends take the first healthy host's
    /// report (ordered by assignment for determinism); local backends sum
    /// across healthy hosts.
    pub fn aggregate_capacity(&self) -> Option<PoolCapacity> {
        let healthy = |id: &Uuid| {
            self.host_statuses
                .get(id)
                .filter(|s| s.health == PoolHealth::Healthy)
        };
        if self.backend.is_shared() {
            self.assigned_node_ids.iter().find_map(healthy).map(|s| PoolCapacity {
                total_bytes: s.total_bytes,
                used_bytes: s.used_bytes,
                available_bytes: s.available_bytes,
            })
        } else {
            let mut cap = PoolCapacity::default();
            let mut any = false;
            for s in self.assigned_node_ids.iter().filter_map(healthy) {
                any = true;
                cap.total_bytes += s.total_bytes;
                cap.used_bytes += s.used_bytes;
                cap.available_bytes += s.available_bytes;
            }
            any.then_some(cap)
        }
    }

    /// Detect healthy hosts of a shared backend disagreeing on capacity by
    /// more than `tolerance_percent`. Returns the offending node IDs.
    pub fn capacity_mismatches(&self, tolerance_percent: f64) -> Vec<Uuid> {
        if !self.backend.is_shared() {
            return Vec::new();
        }
        let reference = match self.aggregate_capacity() {
            Some(c) if c.total_bytes > 0 => c.total_bytes as f64,
            _ => return Vec::new(),
        };
        self.assigned_node_ids
            .iter()
            .filter(|id| {
                self.host_statuses
                    .get(id)
                    .filter(|s| s.health == PoolHealth::Healthy)
                    .map(|s| {
                        let delta = (s.total_bytes as f64 - reference).abs();
                        delta / reference * 100.0 > tolerance_percent
                    })
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }
}

/// Thin vs thick provisioning for volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provisioning {
    Thin,
    Thick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumePhase {
    Creating,
    Available,
    InUse,
    Deleting,
    Error,
}

/// A volume inside a pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: Uuid,
    pub pool_id: Uuid,
    /// Unique within the pool.
    pub name: String,
    pub size_bytes: u64,
    pub provisioning: Provisioning,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_vm_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub phase: VolumePhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl Volume {
    pub fn new(pool_id: Uuid, name: String, size_bytes: u64, provisioning: Provisioning) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            pool_id,
            name,
            size_bytes,
            provisioning,
            attached_vm_id: None,
            path: None,
            phase: VolumePhase::Creating,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool_with_hosts(backend: StorageBackend, hosts: &[(Uuid, HostPoolStatus)]) -> StoragePool {
        let mut pool = StoragePool::new("p1".into(), backend, json!({}));
        pool.assigned_node_ids = hosts.iter().map(|(id, _)| *id).collect();
        pool.host_statuses = hosts.iter().cloned().collect();
        pool
    }

    #[test]
    fn test_overall_phase_unknown_before_reports() {
        let mut pool = StoragePool::new("p1".into(), StorageBackend::Nfs, json!({}));
        pool.assigned_node_ids = vec![Uuid::new_v4()];
        assert_eq!(pool.overall_phase(), PoolHealth::Unknown);
    }

    #[test]
    fn test_overall_phase_degraded_and_recovery() {
        let h1 = Uuid::new_v4();
        let h2 = Uuid::new_v4();
        let mut pool = pool_with_hosts(
            StorageBackend::Nfs,
            &[
                (h1, HostPoolStatus::healthy(2 << 40, 500 << 30, None)),
                (h2, HostPoolStatus::error("connection refused")),
            ],
        );
        assert_eq!(pool.overall_phase(), PoolHealth::Degraded);

        // h2 recovers via a later heartbeat.
        pool.host_statuses
            .insert(h2, HostPoolStatus::healthy(2 << 40, 500 << 30, None));
        assert_eq!(pool.overall_phase(), PoolHealth::Healthy);
    }

    #[test]
    fn test_overall_phase_error_when_no_healthy_host() {
        let h1 = Uuid::new_v4();
        let pool = pool_with_hosts(
            StorageBackend::Nfs,
            &[(h1, HostPoolStatus::error("mount failed"))],
        );
        assert_eq!(pool.overall_phase(), PoolHealth::Error);
    }

    #[test]
    fn test_shared_capacity_from_first_healthy_host() {
        let h1 = Uuid::new_v4();
        let h2 = Uuid::new_v4();
        let pool = pool_with_hosts(
            StorageBackend::Nfs,
            &[
                (h1, HostPoolStatus::healthy(2 << 40, 500 << 30, None)),
                (h2, HostPoolStatus::error("connection refused")),
            ],
        );
        let cap = pool.aggregate_capacity().unwrap();
        assert_eq!(cap.total_bytes, 2 << 40);
        assert_eq!(cap.used_bytes, 500 << 30);
    }

    #[test]
    fn test_local_capacity_sums() {
        let h1 = Uuid::new_v4();
        let h2 = Uuid::new_v4();
        let pool = pool_with_hosts(
            StorageBackend::Local,
            &[
                (h1, HostPoolStatus::healthy(1000, 100, None)),
                (h2, HostPoolStatus::healthy(500, 50, None)),
            ],
        );
        let cap = pool.aggregate_capacity().unwrap();
        assert_eq!(cap.total_bytes, 1500);
        assert_eq!(cap.used_bytes, 150);
    }

    #[test]
    fn test_capacity_mismatch_detection() {
        let h1 = Uuid::new_v4();
        let h2 = Uuid::new_v4();
        let pool = pool_with_hosts(
            StorageBackend::Nfs,
            &[
                (h1, HostPoolStatus::healthy(1000, 0, None)),
                (h2, HostPoolStatus::healthy(1200, 0, None)),
            ],
        );
        assert_eq!(pool.capacity_mismatches(5.0), vec![h2]);
        assert!(pool.capacity_mismatches(25.0).is_empty());
    }

    #[test]
    fn test_required_config_keys() {
        assert!(StorageBackend::Nfs.required_config_keys().contains(&"server"));
        assert!(StorageBackend::Local.required_config_keys().contains(&"path"));
        assert!(StorageBackend::Nfs.is_shared());
        assert!(!StorageBackend::Local.is_shared());
    }
}
