//! End-to-end control plane scenarios against in-memory repositories and
//! mock node daemons.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use quantix_vdc::config::Config;
use quantix_vdc::daemon::MockDaemonClientFactory;
use quantix_vdc::domain::{
    CpuSpec, CpuTopology, Error, MemoryInfo, NodePhase, PoolHealth, Resources, StorageBackend,
    VmPowerState, VmSpec,
};
use quantix_vdc::repo::{EventFilter, NodeRepository, VmRepository};
use quantix_vdc::services::{
    CreateStoragePoolRequest, CreateVmRequest, HeartbeatRequest, MemoryNorthboundWriter,
    PoolStatusReport, RegisterNodeRequest, Repositories, Services, VmStateReport,
};

struct Cluster {
    factory: Arc<MockDaemonClientFactory>,
    services: Services,
    nodes_repo: Arc<dyn NodeRepository>,
    vms_repo: Arc<dyn VmRepository>,
}

fn cluster() -> Cluster {
    let repos = Repositories::in_memory();
    let nodes_repo = repos.nodes.clone();
    let vms_repo = repos.vms.clone();
    let factory = Arc::new(MockDaemonClientFactory::new());
    let writer = Arc::new(MemoryNorthboundWriter::new());
    let services = Services::wire(repos, factory.clone(), writer, &Config::default());
    Cluster { factory, services, nodes_repo, vms_repo }
}

fn register_request(hostname: &str, ip: &str) -> RegisterNodeRequest {
    RegisterNodeRequest {
        hostname: hostname.to_string(),
        management_ip: format!("{}:9090", ip),
        labels: Default::default(),
        roles: Default::default(),
        cpu: CpuTopology { sockets: 1, cores_per_socket: 8, threads_per_core: 2 },
        memory: MemoryInfo { total_mib: 32768, allocatable_mib: 16384 },
        storage_devices: vec![],
        network_devices: vec![],
        system_info: None,
    }
}

fn heartbeat_request(node_id: Uuid) -> HeartbeatRequest {
    HeartbeatRequest {
        node_id,
        cpu_usage_percent: 12.5,
        memory_used_mib: 2048,
        running_vm_count: 0,
        healthy: None,
        server_time_unix: None,
        storage_pools: vec![],
        vms: vec![],
    }
}

fn vm_spec(cores: u32, memory_mib: u64) -> VmSpec {
    VmSpec {
        cpu: CpuSpec { sockets: 1, cores, threads_per_core: 1 },
        memory_mib,
        ..VmSpec::default()
    }
}

fn create_vm_request(name: &str, cores: u32, memory_mib: u64) -> CreateVmRequest {
    CreateVmRequest {
        project_id: None,
        name: name.to_string(),
        spec: vm_spec(cores, memory_mib),
        node_id: None,
        node_selector: Default::default(),
        tolerations: vec![],
    }
}

/// Age a node's last heartbeat so the sweeper sees it as stale.
async fn age_heartbeat(cluster: &Cluster, node_id: Uuid, secs: i64) {
    let node = cluster.nodes_repo.get(node_id).await.unwrap();
    let mut status = node.status.clone();
    status.last_heartbeat = Some(Utc::now() - chrono::Duration::seconds(secs));
    cluster.nodes_repo.update_status(node_id, &status).await.unwrap();
}

// =============================================================================
// S1 / S2 — register, heartbeat, disconnect, reconnect
// =============================================================================

#[tokio::test]
async fn register_heartbeat_disconnect_reconnect() {
    let cluster = cluster();

    // S1: register.
    let node = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(node.status.phase, NodePhase::Ready);
    assert_eq!(node.status.allocatable, Resources::new(16, 16384));
    assert_eq!(node.management_ip, "10.0.0.1"); // port suffix stripped

    // Heartbeat refreshes liveness without changing phase.
    let before = cluster.nodes_repo.get(node.id).await.unwrap().status.last_heartbeat;
    let ack = cluster
        .services
        .nodes
        .heartbeat(heartbeat_request(node.id))
        .await
        .unwrap();
    assert_eq!(ack.heartbeat_interval_secs, 30);
    let after = cluster.nodes_repo.get(node.id).await.unwrap();
    assert_eq!(after.status.phase, NodePhase::Ready);
    assert!(after.status.last_heartbeat >= before);

    // Heartbeats stop; after the 90 s timeout the sweeper disconnects.
    age_heartbeat(&cluster, node.id, 91).await;
    let swept = cluster
        .services
        .nodes
        .sweep_stale_nodes(Utc::now())
        .await
        .unwrap();
    assert_eq!(swept, 1);

    let node_after = cluster.nodes_repo.get(node.id).await.unwrap();
    assert_eq!(node_after.status.phase, NodePhase::Disconnected);
    assert!(node_after
        .status
        .conditions
        .iter()
        .any(|c| c.reason == "HeartbeatTimeout"));

    let events = cluster
        .services
        .events
        .list(&EventFilter::default())
        .await
        .unwrap();
    assert!(events.iter().any(|e| e.event_type == "HOST_DISCONNECTED"));

    // A second sweep is a no-op: disconnected nodes are skipped.
    assert_eq!(
        cluster.services.nodes.sweep_stale_nodes(Utc::now()).await.unwrap(),
        0
    );

    // S2: a new heartbeat reconnects.
    cluster
        .services
        .nodes
        .heartbeat(heartbeat_request(node.id))
        .await
        .unwrap();
    let node_back = cluster.nodes_repo.get(node.id).await.unwrap();
    assert_eq!(node_back.status.phase, NodePhase::Ready);
    assert!(node_back
        .status
        .conditions
        .iter()
        .any(|c| c.condition_type == "Reconnected"));

    let events = cluster
        .services
        .events
        .list(&EventFilter::default())
        .await
        .unwrap();
    assert!(events.iter().any(|e| e.event_type == "HOST_RECONNECTED"));
}

#[tokio::test]
async fn unhealthy_heartbeat_from_disconnected_goes_through_ready() {
    let cluster = cluster();
    let node = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    age_heartbeat(&cluster, node.id, 91).await;
    cluster.services.nodes.sweep_stale_nodes(Utc::now()).await.unwrap();
    assert_eq!(
        cluster.nodes_repo.get(node.id).await.unwrap().status.phase,
        NodePhase::Disconnected
    );

    // A reconnecting node self-reporting degraded health lands in NotReady,
    // but only via the Disconnected -> Ready edge, recording Reconnected.
    let mut hb = heartbeat_request(node.id);
    hb.healthy = Some(false);
    cluster.services.nodes.heartbeat(hb).await.unwrap();

    let node_after = cluster.nodes_repo.get(node.id).await.unwrap();
    assert_eq!(node_after.status.phase, NodePhase::NotReady);
    assert!(node_after
        .status
        .conditions
        .iter()
        .any(|c| c.condition_type == "Reconnected"));

    let events = cluster
        .services
        .events
        .list(&EventFilter::default())
        .await
        .unwrap();
    assert!(events.iter().any(|e| e.event_type == "HOST_RECONNECTED"));

    // A healthy heartbeat then clears NotReady.
    cluster.services.nodes.heartbeat(heartbeat_request(node.id)).await.unwrap();
    assert_eq!(
        cluster.nodes_repo.get(node.id).await.unwrap().status.phase,
        NodePhase::Ready
    );
}

#[tokio::test]
async fn reregistration_updates_existing_node() {
    let cluster = cluster();
    let first = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();

    // Same hostname, new address: same record, updated in place.
    let second = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.99"))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.management_ip, "10.0.0.99");

    let all = cluster
        .services
        .nodes
        .list(&Default::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

// =============================================================================
// S3 / S4 — scheduling, placement reservation, daemon failure rollback
// =============================================================================

#[tokio::test]
async fn schedule_and_create_vm_reserves_resources() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let h2 = cluster
        .services
        .nodes
        .register(register_request("h2", "10.0.0.2"))
        .await
        .unwrap();

    // Pre-load h2: 14/16 CPU, 12288/16384 MiB.
    let mut status = cluster.nodes_repo.get(h2.id).await.unwrap().status;
    status.allocated = Resources::new(14, 12288);
    cluster.nodes_repo.update_status(h2.id, &status).await.unwrap();

    let vm = cluster
        .services
        .vms
        .create(create_vm_request("web-1", 2, 2048))
        .await
        .unwrap();

    assert_eq!(vm.status.node_id, Some(h1.id));
    assert_eq!(vm.status.state, VmPowerState::Stopped);
    assert!(vm.status.message.is_empty(), "{}", vm.status.message);

    let h1_after = cluster.nodes_repo.get(h1.id).await.unwrap();
    assert_eq!(h1_after.status.allocated, Resources::new(2, 2048));

    // The daemon on h1 received the definition.
    let daemon = cluster.factory.client_for("10.0.0.1:9090");
    assert!(daemon.calls().contains(&"create_vm".to_string()));
}

#[tokio::test(start_paused = true)]
async fn start_rolls_back_when_daemon_unavailable() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("web-1", 2, 2048))
        .await
        .unwrap();

    cluster.factory.client_for("10.0.0.1:9090").set_unavailable(true);

    let err = cluster.services.vms.start(vm.id).await.unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));

    // Stopped -> Starting -> back to Stopped, with the failure recorded.
    let vm_after = cluster.vms_repo.get(vm.id).await.unwrap();
    assert_eq!(vm_after.status.state, VmPowerState::Stopped);
    assert!(vm_after.status.message.contains("start failed"));

    // Nothing else changed.
    let h1_after = cluster.nodes_repo.get(h1.id).await.unwrap();
    assert_eq!(h1_after.status.allocated, Resources::new(2, 2048));
}

#[tokio::test]
async fn power_cycle_roundtrip() {
    let cluster = cluster();
    cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("web-1", 2, 2048))
        .await
        .unwrap();

    let vm = cluster.services.vms.start(vm.id).await.unwrap();
    assert_eq!(vm.status.state, VmPowerState::Running);

    // Start from Running is a state-guard violation, surfaced unmutated.
    let err = cluster.services.vms.start(vm.id).await.unwrap_err();
    assert!(matches!(err, Error::FailedPrecondition(_)));

    let vm = cluster.services.vms.pause(vm.id).await.unwrap();
    assert_eq!(vm.status.state, VmPowerState::Paused);
    let vm = cluster.services.vms.resume(vm.id).await.unwrap();
    assert_eq!(vm.status.state, VmPowerState::Running);
    let vm = cluster
        .services
        .vms
        .stop(vm.id, Duration::from_secs(30), false)
        .await
        .unwrap();
    assert_eq!(vm.status.state, VmPowerState::Stopped);
}

#[tokio::test]
async fn create_rejects_small_memory() {
    let cluster = cluster();
    cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let err = cluster
        .services
        .vms
        .create(create_vm_request("tiny", 1, 64))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// =============================================================================
// S5 — storage pool on two hosts, one fails, heartbeat recovery
// =============================================================================

#[tokio::test]
async fn storage_pool_degraded_then_recovers() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let h2 = cluster
        .services
        .nodes
        .register(register_request("h2", "10.0.0.2"))
        .await
        .unwrap();

    cluster
        .factory
        .client_for("10.0.0.2:9090")
        .fail_next_pool_init("connection refused");

    let pool = cluster
        .services
        .storage
        .create(CreateStoragePoolRequest {
            name: "nfs-shared".to_string(),
            backend: StorageBackend::Nfs,
            config: serde_json::json!({ "server": "10.0.0.100", "exportPath": "/export/vms" }),
            assigned_node_ids: vec![h1.id, h2.id],
        })
        .await
        .unwrap();

    assert_eq!(pool.overall_phase(), PoolHealth::Degraded);
    let capacity = pool.aggregate_capacity().unwrap();
    assert_eq!(capacity.total_bytes, 2 << 40); // h1's report wins
    assert_eq!(capacity.used_bytes, 500 << 30);
    assert_eq!(
        pool.host_statuses[&h2.id].error_message.as_deref(),
        Some("connection refused")
    );

    // h2 later reports the pool healthy via heartbeat: no operator action.
    let mut hb = heartbeat_request(h2.id);
    hb.storage_pools = vec![PoolStatusReport {
        pool_id: Some(pool.id),
        name: Some(pool.name.clone()),
        backend: Some(StorageBackend::Nfs),
        healthy: true,
        total_bytes: 2 << 40,
        used_bytes: 500 << 30,
        available_bytes: (2u64 << 40) - (500u64 << 30),
        mount_path: Some("/var/lib/quantix/mnt/nfs-shared".to_string()),
        device_path: None,
        volume_count: 0,
        error_message: None,
    }];
    cluster.services.nodes.heartbeat(hb).await.unwrap();

    let pool_after = cluster.services.storage.get(pool.id).await.unwrap();
    assert_eq!(pool_after.overall_phase(), PoolHealth::Healthy);

    let events = cluster
        .services
        .events
        .list(&EventFilter::default())
        .await
        .unwrap();
    assert!(events.iter().any(|e| e.event_type == "POOL_RECOVERED"));
}

#[tokio::test]
async fn storage_pool_with_no_healthy_host_is_conflict_but_retained() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();

    cluster
        .factory
        .client_for("10.0.0.1:9090")
        .fail_next_pool_init("mount failed");

    let err = cluster
        .services
        .storage
        .create(CreateStoragePoolRequest {
            name: "nfs-shared".to_string(),
            backend: StorageBackend::Nfs,
            config: serde_json::json!({ "server": "10.0.0.100", "exportPath": "/export/vms" }),
            assigned_node_ids: vec![h1.id],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // The intent is retained, awaiting retry.
    let pools = cluster.services.storage.list().await.unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].overall_phase(), PoolHealth::Error);
}

#[tokio::test]
async fn heartbeat_adopts_unknown_pool_as_unmanaged() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();

    let mut hb = heartbeat_request(h1.id);
    hb.storage_pools = vec![PoolStatusReport {
        pool_id: None,
        name: Some("datastore".to_string()),
        backend: Some(StorageBackend::Local),
        healthy: true,
        total_bytes: 500 << 30,
        used_bytes: 100 << 30,
        available_bytes: 400 << 30,
        mount_path: Some("/data".to_string()),
        device_path: None,
        volume_count: 3,
        error_message: None,
    }];
    cluster.services.nodes.heartbeat(hb).await.unwrap();

    let pools = cluster.services.storage.list().await.unwrap();
    assert_eq!(pools.len(), 1);
    let discovered = &pools[0];
    assert_eq!(discovered.name, "datastore");
    assert!(!discovered.is_managed);
    assert_eq!(discovered.assigned_node_ids, vec![h1.id]);

    // Adoption flips it to managed exactly once.
    let adopted = cluster
        .services
        .storage
        .adopt(discovered.id, vec![h1.id])
        .await
        .unwrap();
    assert!(adopted.is_managed);
    let err = cluster
        .services
        .storage
        .adopt(discovered.id, vec![h1.id])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FailedPrecondition(_)));
}

// =============================================================================
// S6 — lost VM and restoration
// =============================================================================

#[tokio::test]
async fn lost_vm_marked_and_restored() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("v1", 2, 2048))
        .await
        .unwrap();
    let vm = cluster.services.vms.start(vm.id).await.unwrap();
    assert_eq!(vm.status.state, VmPowerState::Running);

    // Keep the node heartbeating, but age the VM's last sighting past the
    // grace window.
    cluster.services.nodes.heartbeat(heartbeat_request(h1.id)).await.unwrap();
    let mut status = cluster.vms_repo.get(vm.id).await.unwrap().status;
    status.last_seen = Some(Utc::now() - chrono::Duration::seconds(120));
    cluster.vms_repo.update_status(vm.id, &status).await.unwrap();

    let marked = cluster.services.vms.mark_lost_vms(Utc::now()).await.unwrap();
    assert_eq!(marked, 1);
    let lost = cluster.vms_repo.get(vm.id).await.unwrap();
    assert_eq!(lost.status.state, VmPowerState::Lost);
    assert_eq!(lost.status.lost_reason.as_deref(), Some("not reported by host"));

    // The next heartbeat re-includes the VM: state restored.
    let mut hb = heartbeat_request(h1.id);
    hb.vms = vec![VmStateReport {
        vm_id: vm.id.to_string(),
        name: Some("v1".to_string()),
        state: VmPowerState::Running,
        ip_addresses: vec!["10.10.0.5".to_string()],
    }];
    cluster.services.nodes.heartbeat(hb).await.unwrap();

    let found = cluster.vms_repo.get(vm.id).await.unwrap();
    assert_eq!(found.status.state, VmPowerState::Running);
    assert!(found.status.lost_reason.is_none());
    assert!(found.status.lost_at.is_none());

    let events = cluster
        .services
        .events
        .list(&EventFilter::default())
        .await
        .unwrap();
    assert!(events.iter().any(|e| e.event_type == "VM_LOST"));
    assert!(events.iter().any(|e| e.event_type == "VM_FOUND"));
}

#[tokio::test]
async fn host_report_relocates_vm() {
    let cluster = cluster();
    cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let h2 = cluster
        .services
        .nodes
        .register(register_request("h2", "10.0.0.2"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("v1", 2, 2048))
        .await
        .unwrap();
    assert_ne!(vm.status.node_id, Some(h2.id));

    // h2 claims the VM; the host is authoritative.
    let mut hb = heartbeat_request(h2.id);
    hb.vms = vec![VmStateReport {
        vm_id: vm.id.to_string(),
        name: Some("v1".to_string()),
        state: VmPowerState::Running,
        ip_addresses: vec![],
    }];
    cluster.services.nodes.heartbeat(hb).await.unwrap();

    let relocated = cluster.vms_repo.get(vm.id).await.unwrap();
    assert_eq!(relocated.status.node_id, Some(h2.id));

    let events = cluster
        .services
        .events
        .list(&EventFilter::default())
        .await
        .unwrap();
    assert!(events.iter().any(|e| e.event_type == "VM_RELOCATED"));
}

#[tokio::test]
async fn heartbeat_discovers_unknown_vm() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();

    let rogue_id = Uuid::new_v4();
    let mut hb = heartbeat_request(h1.id);
    hb.vms = vec![VmStateReport {
        vm_id: rogue_id.to_string(),
        name: Some("hand-built".to_string()),
        state: VmPowerState::Running,
        ip_addresses: vec![],
    }];
    cluster.services.nodes.heartbeat(hb).await.unwrap();

    let vm = cluster.vms_repo.get(rogue_id).await.unwrap();
    assert!(!vm.is_managed);
    assert_eq!(vm.name, "hand-built");
    assert_eq!(vm.status.node_id, Some(h1.id));
    assert_eq!(vm.status.state, VmPowerState::Running);
}

// =============================================================================
// Node operations
// =============================================================================

#[tokio::test]
async fn decommission_with_vms_requires_force() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("v1", 2, 2048))
        .await
        .unwrap();

    let err = cluster.services.nodes.decommission(h1.id, false).await.unwrap_err();
    assert!(matches!(err, Error::FailedPrecondition(_)));

    cluster.services.nodes.decommission(h1.id, true).await.unwrap();
    assert!(matches!(
        cluster.services.nodes.get(h1.id).await.unwrap_err(),
        Error::NotFound(_)
    ));

    // The orphaned VM record keeps no dangling node reference.
    let vm_after = cluster.vms_repo.get(vm.id).await.unwrap();
    assert_eq!(vm_after.status.node_id, None);
}

#[tokio::test]
async fn drain_reports_resident_vms_and_parks_on_request() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("v1", 2, 2048))
        .await
        .unwrap();

    let (node, residents) = cluster.services.nodes.drain(h1.id).await.unwrap();
    assert_eq!(node.status.phase, NodePhase::Draining);
    assert_eq!(residents, vec![vm.id]);

    // Draining -> Maintenance only on explicit request.
    let parked = cluster.services.nodes.disable(h1.id).await.unwrap();
    assert_eq!(parked.status.phase, NodePhase::Maintenance);

    // A heartbeat does not clear Maintenance.
    cluster.services.nodes.heartbeat(heartbeat_request(h1.id)).await.unwrap();
    assert_eq!(
        cluster.services.nodes.get(h1.id).await.unwrap().status.phase,
        NodePhase::Maintenance
    );

    let enabled = cluster.services.nodes.enable(h1.id).await.unwrap();
    assert_eq!(enabled.status.phase, NodePhase::Ready);
}

#[tokio::test]
async fn maintenance_node_is_not_swept() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    cluster.services.nodes.disable(h1.id).await.unwrap();
    age_heartbeat(&cluster, h1.id, 3600).await;

    let swept = cluster.services.nodes.sweep_stale_nodes(Utc::now()).await.unwrap();
    assert_eq!(swept, 0);
    assert_eq!(
        cluster.services.nodes.get(h1.id).await.unwrap().status.phase,
        NodePhase::Maintenance
    );
}

#[tokio::test]
async fn stale_heartbeat_is_coalesced() {
    let cluster = cluster();
    let h1 = cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();

    let mut newer = heartbeat_request(h1.id);
    newer.server_time_unix = Some(1_700_000_100);
    let ack = cluster.services.nodes.heartbeat(newer).await.unwrap();
    assert!(!ack.coalesced);

    // A delayed retry with an older stamp is dropped.
    let mut older = heartbeat_request(h1.id);
    older.server_time_unix = Some(1_700_000_050);
    older.cpu_usage_percent = 99.9;
    let ack = cluster.services.nodes.heartbeat(older).await.unwrap();
    assert!(ack.coalesced);

    let node = cluster.services.nodes.get(h1.id).await.unwrap();
    assert_ne!(node.status.cpu_usage_percent, 99.9);
}

// =============================================================================
// Guest agent and snapshots through the daemon
// =============================================================================

#[tokio::test]
async fn quiesce_thaw_token_roundtrip() {
    let cluster = cluster();
    cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("db-1", 2, 2048))
        .await
        .unwrap();
    cluster.services.vms.start(vm.id).await.unwrap();

    let quiesce = cluster
        .services
        .vms
        .quiesce_filesystems(vm.id, vec!["/var/lib/postgresql".to_string()], Duration::from_secs(60))
        .await
        .unwrap();
    assert!(!quiesce.quiesce_token.is_empty());
    assert_eq!(quiesce.frozen_mount_points, vec!["/var/lib/postgresql".to_string()]);

    // The wrong token is rejected; the right one thaws.
    let err = cluster
        .services
        .vms
        .thaw_filesystems(vm.id, "bogus-token")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FailedPrecondition(_)));

    let thawed = cluster
        .services
        .vms
        .thaw_filesystems(vm.id, &quiesce.quiesce_token)
        .await
        .unwrap();
    assert!(!thawed.is_empty());
}

#[tokio::test]
async fn snapshot_revert_can_chain_start() {
    let cluster = cluster();
    cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();
    let vm = cluster
        .services
        .vms
        .create(create_vm_request("db-1", 2, 2048))
        .await
        .unwrap();
    cluster.services.vms.start(vm.id).await.unwrap();

    let snapshot = cluster
        .services
        .vms
        .create_snapshot(vm.id, "pre-upgrade".to_string(), String::new(), false)
        .await
        .unwrap();
    let listed = cluster.services.vms.list_snapshots(vm.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    let vm_after = cluster
        .services
        .vms
        .revert_snapshot(vm.id, &snapshot.id, true)
        .await
        .unwrap();
    assert_eq!(vm_after.status.state, VmPowerState::Running);
}

// =============================================================================
// Create-push failure keeps intent
// =============================================================================

#[tokio::test]
async fn failed_provisioning_keeps_intent_and_reconciles() {
    let cluster = cluster();
    cluster
        .services
        .nodes
        .register(register_request("h1", "10.0.0.1"))
        .await
        .unwrap();

    let daemon = cluster.factory.client_for("10.0.0.1:9090");
    daemon.set_unavailable(true);

    let vm = cluster
        .services
        .vms
        .create(create_vm_request("web-1", 2, 2048))
        .await
        .unwrap();
    assert!(vm.status.message.contains("hypervisor provisioning failed"));

    // The daemon recovers; an explicit reconcile converges.
    daemon.set_unavailable(false);
    let vm = cluster.services.vms.reconcile(vm.id).await.unwrap();
    assert!(vm.status.message.is_empty());
    assert!(daemon.vm_state(&vm.id.to_string()).is_some());
}
