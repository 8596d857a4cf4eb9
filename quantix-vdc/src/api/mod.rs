//! Connect-RPC style JSON API.
//!
//! One POST route per operation, named `/<package>.<Service>/<Method>`,
//! with camelCase JSON bodies. This is the surface the dashboard, the CLI
//! and the node daemons (registration and heartbeats) talk to.

mod error;
mod events;
mod folder;
mod network;
mod node;
mod storage;
mod vm;

pub use error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Services;

pub type AppState = Arc<Services>;

/// Build the full API router.
pub fn router(services: AppState) -> Router {
    Router::new()
        // Node service (also consumed by the node daemons)
        .route("/quantix.compute.v1.NodeService/RegisterNode", post(node::register))
        .route("/quantix.compute.v1.NodeService/UpdateHeartbeat", post(node::update_heartbeat))
        .route("/quantix.compute.v1.NodeService/GetNode", post(node::get))
        .route("/quantix.compute.v1.NodeService/ListNodes", post(node::list))
        .route("/quantix.compute.v1.NodeService/UpdateNode", post(node::update))
        .route("/quantix.compute.v1.NodeService/EnableNode", post(node::enable))
        .route("/quantix.compute.v1.NodeService/DisableNode", post(node::disable))
        .route("/quantix.compute.v1.NodeService/DrainNode", post(node::drain))
        .route("/quantix.compute.v1.NodeService/DecommissionNode", post(node::decommission))
        .route("/quantix.compute.v1.NodeService/GetNodeMetrics", post(node::get_metrics))
        .route("/quantix.compute.v1.NodeService/SyncNodeVMs", post(node::sync_vms))
        // VM service
        .route("/quantix.compute.v1.VirtualMachineService/CreateVm", post(vm::create))
        .route("/quantix.compute.v1.VirtualMachineService/GetVm", post(vm::get))
        .route("/quantix.compute.v1.VirtualMachineService/ListVms", post(vm::list))
        .route("/quantix.compute.v1.VirtualMachineService/UpdateVm", post(vm::update))
        .route("/quantix.compute.v1.VirtualMachineService/DeleteVm", post(vm::delete))
        .route("/quantix.compute.v1.VirtualMachineService/ReconcileVm", post(vm::reconcile))
        .route("/quantix.compute.v1.VirtualMachineService/AdoptVm", post(vm::adopt))
        .route("/quantix.compute.v1.VirtualMachineService/ForcePurgeVm", post(vm::force_purge))
        .route("/quantix.compute.v1.VirtualMachineService/StartVm", post(vm::start))
        .route("/quantix.compute.v1.VirtualMachineService/StopVm", post(vm::stop))
        .route("/quantix.compute.v1.VirtualMachineService/ForceStopVm", post(vm::force_stop))
        .route("/quantix.compute.v1.VirtualMachineService/RebootVm", post(vm::reboot))
        .route("/quantix.compute.v1.VirtualMachineService/PauseVm", post(vm::pause))
        .route("/quantix.compute.v1.VirtualMachineService/ResumeVm", post(vm::resume))
        .route("/quantix.compute.v1.VirtualMachineService/CreateSnapshot", post(vm::create_snapshot))
        .route("/quantix.compute.v1.VirtualMachineService/ListSnapshots", post(vm::list_snapshots))
        .route("/quantix.compute.v1.VirtualMachineService/RevertSnapshot", post(vm::revert_snapshot))
        .route("/quantix.compute.v1.VirtualMachineService/DeleteSnapshot", post(vm::delete_snapshot))
        .route("/quantix.compute.v1.VirtualMachineService/PingGuestAgent", post(vm::ping_guest_agent))
        .route("/quantix.compute.v1.VirtualMachineService/ExecuteInGuest", post(vm::execute_in_guest))
        .route("/quantix.compute.v1.VirtualMachineService/QuiesceFilesystems", post(vm::quiesce_filesystems))
        .route("/quantix.compute.v1.VirtualMachineService/ThawFilesystems", post(vm::thaw_filesystems))
        .route("/quantix.compute.v1.VirtualMachineService/SyncGuestTime", post(vm::sync_guest_time))
        .route("/quantix.compute.v1.VirtualMachineService/GetConsole", post(vm::get_console))
        // Storage pool service
        .route("/quantix.storage.v1.StoragePoolService/CreateStoragePool", post(storage::create))
        .route("/quantix.storage.v1.StoragePoolService/GetStoragePool", post(storage::get))
        .route("/quantix.storage.v1.StoragePoolService/ListStoragePools", post(storage::list))
        .route("/quantix.storage.v1.StoragePoolService/UpdateStoragePool", post(storage::update))
        .route("/quantix.storage.v1.StoragePoolService/DeleteStoragePool", post(storage::delete))
        .route("/quantix.storage.v1.StoragePoolService/AdoptStoragePool", post(storage::adopt))
        .route("/quantix.storage.v1.StoragePoolService/AssignHosts", post(storage::assign_hosts))
        .route("/quantix.storage.v1.StoragePoolService/UnassignHosts", post(storage::unassign_hosts))
        .route("/quantix.storage.v1.StoragePoolService/CreateVolume", post(storage::create_volume))
        .route("/quantix.storage.v1.StoragePoolService/GetVolume", post(storage::get_volume))
        .route("/quantix.storage.v1.StoragePoolService/ListVolumes", post(storage::list_volumes))
        .route("/quantix.storage.v1.StoragePoolService/DeleteVolume", post(storage::delete_volume))
        .route("/quantix.storage.v1.StoragePoolService/ResizeVolume", post(storage::resize_volume))
        .route("/quantix.storage.v1.StoragePoolService/CloneVolume", post(storage::clone_volume))
        // Network service
        .route("/quantix.network.v1.NetworkService/CreateNetwork", post(network::create_network))
        .route("/quantix.network.v1.NetworkService/GetNetwork", post(network::get_network))
        .route("/quantix.network.v1.NetworkService/ListNetworks", post(network::list_networks))
        .route("/quantix.network.v1.NetworkService/UpdateNetwork", post(network::update_network))
        .route("/quantix.network.v1.NetworkService/DeleteNetwork", post(network::delete_network))
        .route("/quantix.network.v1.NetworkService/CreatePort", post(network::create_port))
        .route("/quantix.network.v1.NetworkService/GetPort", post(network::get_port))
        .route("/quantix.network.v1.NetworkService/ListPorts", post(network::list_ports))
        .route("/quantix.network.v1.NetworkService/UpdatePort", post(network::update_port))
        .route("/quantix.network.v1.NetworkService/DeletePort", post(network::delete_port))
        .route("/quantix.network.v1.NetworkService/CreateSecurityGroup", post(network::create_security_group))
        .route("/quantix.network.v1.NetworkService/GetSecurityGroup", post(network::get_security_group))
        .route("/quantix.network.v1.NetworkService/ListSecurityGroups", post(network::list_security_groups))
        .route("/quantix.network.v1.NetworkService/UpdateSecurityGroup", post(network::update_security_group))
        .route("/quantix.network.v1.NetworkService/DeleteSecurityGroup", post(network::delete_security_group))
        .route("/quantix.network.v1.NetworkService/CreateFloatingIp", post(network::create_floating_ip))
        .route("/quantix.network.v1.NetworkService/GetFloatingIp", post(network::get_floating_ip))
        .route("/quantix.network.v1.NetworkService/AttachFloatingIp", post(network::attach_floating_ip))
        .route("/quantix.network.v1.NetworkService/DetachFloatingIp", post(network::detach_floating_ip))
        .route("/quantix.network.v1.NetworkService/ListFloatingIps", post(network::list_floating_ips))
        .route("/quantix.network.v1.NetworkService/DeleteFloatingIp", post(network::delete_floating_ip))
        .route("/quantix.network.v1.NetworkService/CreateLoadBalancer", post(network::create_load_balancer))
        .route("/quantix.network.v1.NetworkService/GetLoadBalancer", post(network::get_load_balancer))
        .route("/quantix.network.v1.NetworkService/ListLoadBalancers", post(network::list_load_balancers))
        .route("/quantix.network.v1.NetworkService/UpdateLoadBalancer", post(network::update_load_balancer))
        .route("/quantix.network.v1.NetworkService/DeleteLoadBalancer", post(network::delete_load_balancer))
        .route("/quantix.network.v1.NetworkService/CreateVpnService", post(network::create_vpn_service))
        .route("/quantix.network.v1.NetworkService/GetVpnService", post(network::get_vpn_service))
        .route("/quantix.network.v1.NetworkService/ListVpnServices", post(network::list_vpn_services))
        .route("/quantix.network.v1.NetworkService/UpdateVpnService", post(network::update_vpn_service))
        .route("/quantix.network.v1.NetworkService/DeleteVpnService", post(network::delete_vpn_service))
        .route("/quantix.network.v1.NetworkService/CreateBgpSpeaker", post(network::create_bgp_speaker))
        .route("/quantix.network.v1.NetworkService/GetBgpSpeaker", post(network::get_bgp_speaker))
        .route("/quantix.network.v1.NetworkService/ListBgpSpeakers", post(network::list_bgp_speakers))
        .route("/quantix.network.v1.NetworkService/UpdateBgpSpeaker", post(network::update_bgp_speaker))
        .route("/quantix.network.v1.NetworkService/DeleteBgpSpeaker", post(network::delete_bgp_speaker))
        // Folder service
        .route("/quantix.compute.v1.FolderService/CreateFolder", post(folder::create))
        .route("/quantix.compute.v1.FolderService/GetFolder", post(folder::get))
        .route("/quantix.compute.v1.FolderService/ListFolders", post(folder::list))
        .route("/quantix.compute.v1.FolderService/UpdateFolder", post(folder::update))
        .route("/quantix.compute.v1.FolderService/DeleteFolder", post(folder::delete))
        .route("/quantix.compute.v1.FolderService/GetFolderTree", post(folder::get_tree))
        // Event log
        .route("/quantix.core.v1.EventService/ListEvents", post(events::list))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}
