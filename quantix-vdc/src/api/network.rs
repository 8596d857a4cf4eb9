//! Network service endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    BgpSpeaker, FloatingIp, LoadBalancer, LoadBalancerMember, Port, SecurityGroup,
    SecurityGroupRule, VirtualNetwork, VpnService,
};

use super::{ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdRequest {
    pub id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyResponse {}

// =============================================================================
// Virtual networks
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNetworkRequest {
    pub name: String,
    pub subnet_cidr: String,
    #[serde(default)]
    pub gateway_ip: Option<String>,
    #[serde(default)]
    pub vlan_id: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNetworksResponse {
    pub networks: Vec<VirtualNetwork>,
}

pub async fn create_network(
    State(state): State<AppState>,
    Json(request): Json<CreateNetworkRequest>,
) -> ApiResult<VirtualNetwork> {
    Ok(Json(
        state
            .network
            .create_network(request.name, request.subnet_cidr, request.gateway_ip, request.vlan_id)
            .await?,
    ))
}

pub async fn get_network(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<VirtualNetwork> {
    Ok(Json(state.network.get_network(request.id).await?))
}

pub async fn list_networks(
    State(state): State<AppState>,
    Json(_request): Json<serde_json::Value>,
) -> ApiResult<ListNetworksResponse> {
    Ok(Json(ListNetworksResponse {
        networks: state.network.list_networks().await?,
    }))
}

pub async fn update_network(
    State(state): State<AppState>,
    Json(network): Json<VirtualNetwork>,
) -> ApiResult<VirtualNetwork> {
    Ok(Json(state.network.update_network(&network).await?))
}

pub async fn delete_network(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<EmptyResponse> {
    state.network.delete_network(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

// =============================================================================
// Ports
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortRequest {
    pub network_id: Uuid,
    #[serde(default)]
    pub vm_id: Option<Uuid>,
    #[serde(default)]
    pub nic_id: Option<String>,
    pub mac_address: String,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPortsRequest {
    #[serde(default)]
    pub network_id: Option<Uuid>,
    #[serde(default)]
    pub vm_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPortsResponse {
    pub ports: Vec<Port>,
}

pub async fn create_port(
    State(state): State<AppState>,
    Json(request): Json<CreatePortRequest>,
) -> ApiResult<Port> {
    Ok(Json(
        state
            .network
            .create_port(
                request.network_id,
                request.vm_id,
                request.nic_id,
                request.mac_address,
                request.ip_address,
            )
            .await?,
    ))
}

pub async fn get_port(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<Port> {
    Ok(Json(state.network.get_port(request.id).await?))
}

pub async fn list_ports(
    State(state): State<AppState>,
    Json(request): Json<ListPortsRequest>,
) -> ApiResult<ListPortsResponse> {
    Ok(Json(ListPortsResponse {
        ports: state.network.list_ports(request.network_id, request.vm_id).await?,
    }))
}

pub async fn update_port(
    State(state): State<AppState>,
    Json(port): Json<Port>,
) -> ApiResult<Port> {
    Ok(Json(state.network.update_port(&port).await?))
}

pub async fn delete_port(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<EmptyResponse> {
    state.network.delete_port(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

// =============================================================================
// Security groups
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecurityGroupRequest {
    pub name: String,
    pub network_id: Uuid,
    #[serde(default)]
    pub rules: Vec<SecurityGroupRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSecurityGroupsResponse {
    pub security_groups: Vec<SecurityGroup>,
}

pub async fn create_security_group(
    State(state): State<AppState>,
    Json(request): Json<CreateSecurityGroupRequest>,
) -> ApiResult<SecurityGroup> {
    Ok(Json(
        state
            .network
            .create_security_group(request.name, request.network_id, request.rules)
            .await?,
    ))
}

pub async fn get_security_group(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<SecurityGroup> {
    Ok(Json(state.network.get_security_group(request.id).await?))
}

pub async fn list_security_groups(
    State(state): State<AppState>,
    Json(_request): Json<serde_json::Value>,
) -> ApiResult<ListSecurityGroupsResponse> {
    Ok(Json(ListSecurityGroupsResponse {
        security_groups: state.network.list_security_groups().await?,
    }))
}

pub async fn update_security_group(
    State(state): State<AppState>,
    Json(group): Json<SecurityGroup>,
) -> ApiResult<SecurityGroup> {
    Ok(Json(state.network.update_security_group(&group).await?))
}

pub async fn delete_security_group(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<EmptyResponse> {
    state.network.delete_security_group(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

// =============================================================================
// Floating IPs
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFloatingIpRequest {
    pub address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachFloatingIpRequest {
    pub id: Uuid,
    pub port_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFloatingIpsResponse {
    pub floating_ips: Vec<FloatingIp>,
}

pub async fn create_floating_ip(
    State(state): State<AppState>,
    Json(request): Json<CreateFloatingIpRequest>,
) -> ApiResult<FloatingIp> {
    Ok(Json(state.network.create_floating_ip(request.address).await?))
}

pub async fn attach_floating_ip(
    State(state): State<AppState>,
    Json(request): Json<AttachFloatingIpRequest>,
) -> ApiResult<FloatingIp> {
    Ok(Json(
        state.network.attach_floating_ip(request.id, request.port_id).await?,
    ))
}

pub async fn detach_floating_ip(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<FloatingIp> {
    Ok(Json(state.network.detach_floating_ip(request.id).await?))
}

pub async fn get_floating_ip(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<FloatingIp> {
    Ok(Json(state.network.get_floating_ip(request.id).await?))
}

pub async fn list_floating_ips(
    State(state): State<AppState>,
    Json(_request): Json<serde_json::Value>,
) -> ApiResult<ListFloatingIpsResponse> {
    Ok(Json(ListFloatingIpsResponse {
        floating_ips: state.network.list_floating_ips().await?,
    }))
}

pub async fn delete_floating_ip(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<EmptyResponse> {
    state.network.delete_floating_ip(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

// =============================================================================
// Load balancers, VPN services, BGP speakers
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerRequest {
    pub name: String,
    pub network_id: Uuid,
    pub vip: String,
    pub protocol_port: u16,
    #[serde(default)]
    pub members: Vec<LoadBalancerMember>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLoadBalancersResponse {
    pub load_balancers: Vec<LoadBalancer>,
}

pub async fn create_load_balancer(
    State(state): State<AppState>,
    Json(request): Json<CreateLoadBalancerRequest>,
) -> ApiResult<LoadBalancer> {
    Ok(Json(
        state
            .network
            .create_load_balancer(
                request.name,
                request.network_id,
                request.vip,
                request.protocol_port,
                request.members,
            )
            .await?,
    ))
}

pub async fn get_load_balancer(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<LoadBalancer> {
    Ok(Json(state.network.get_load_balancer(request.id).await?))
}

pub async fn list_load_balancers(
    State(state): State<AppState>,
    Json(_request): Json<serde_json::Value>,
) -> ApiResult<ListLoadBalancersResponse> {
    Ok(Json(ListLoadBalancersResponse {
        load_balancers: state.network.list_load_balancers().await?,
    }))
}

pub async fn update_load_balancer(
    State(state): State<AppState>,
    Json(lb): Json<LoadBalancer>,
) -> ApiResult<LoadBalancer> {
    Ok(Json(state.network.update_load_balancer(&lb).await?))
}

pub async fn delete_load_balancer(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<EmptyResponse> {
    state.network.delete_load_balancer(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVpnServiceRequest {
    pub name: String,
    pub network_id: Uuid,
    pub peer_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVpnServicesResponse {
    pub vpn_services: Vec<VpnService>,
}

pub async fn create_vpn_service(
    State(state): State<AppState>,
    Json(request): Json<CreateVpnServiceRequest>,
) -> ApiResult<VpnService> {
    Ok(Json(
        state
            .network
            .create_vpn_service(request.name, request.network_id, request.peer_address)
            .await?,
    ))
}

pub async fn get_vpn_service(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<VpnService> {
    Ok(Json(state.network.get_vpn_service(request.id).await?))
}

pub async fn list_vpn_services(
    State(state): State<AppState>,
    Json(_request): Json<serde_json::Value>,
) -> ApiResult<ListVpnServicesResponse> {
    Ok(Json(ListVpnServicesResponse {
        vpn_services: state.network.list_vpn_services().await?,
    }))
}

pub async fn update_vpn_service(
    State(state): State<AppState>,
    Json(vpn): Json<VpnService>,
) -> ApiResult<VpnService> {
    Ok(Json(state.network.update_vpn_service(&vpn).await?))
}

pub async fn delete_vpn_service(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<EmptyResponse> {
    state.network.delete_vpn_service(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBgpSpeakerRequest {
    pub name: String,
    pub local_as: u32,
    #[serde(default)]
    pub peers: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBgpSpeakersResponse {
    pub bgp_speakers: Vec<BgpSpeaker>,
}

pub async fn create_bgp_speaker(
    State(state): State<AppState>,
    Json(request): Json<CreateBgpSpeakerRequest>,
) -> ApiResult<BgpSpeaker> {
    Ok(Json(
        state
            .network
            .create_bgp_speaker(request.name, request.local_as, request.peers)
            .await?,
    ))
}

pub async fn get_bgp_speaker(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<BgpSpeaker> {
    Ok(Json(state.network.get_bgp_speaker(request.id).await?))
}

pub async fn list_bgp_speakers(
    State(state): State<AppState>,
    Json(_request): Json<serde_json::Value>,
) -> ApiResult<ListBgpSpeakersResponse> {
    Ok(Json(ListBgpSpeakersResponse {
        bgp_speakers: state.network.list_bgp_speakers().await?,
    }))
}

pub async fn update_bgp_speaker(
    State(state): State<AppState>,
    Json(speaker): Json<BgpSpeaker>,
) -> ApiResult<BgpSpeaker> {
    Ok(Json(state.network.update_bgp_speaker(&speaker).await?))
}

pub async fn delete_bgp_speaker(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<EmptyResponse> {
    state.network.delete_bgp_speaker(request.id).await?;
    Ok(Json(EmptyResponse {}))
}
