//! Node service endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Node, NodePhase};
use crate::repo::NodeFilter;
use crate::services::{
    HeartbeatAck, HeartbeatRequest, NodeMetrics, RegisterNodeRequest, VmStateReport,
};

use super::{ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdRequest {
    pub id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNodesRequest {
    #[serde(default)]
    pub phase: Option<NodePhase>,
    #[serde(default)]
    pub schedulable: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNodesResponse {
    pub nodes: Vec<Node>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecommissionRequest {
    pub id: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainResponse {
    pub node: Node,
    /// VMs still resident on the node, for the operator to migrate.
    pub vm_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncNodeVmsRequest {
    pub node_id: Uuid,
    #[serde(default)]
    pub vms: Vec<VmStateReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncNodeVmsResponse {
    pub errors: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyResponse {}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterNodeRequest>,
) -> ApiResult<Node> {
    Ok(Json(state.nodes.register(request).await?))
}

pub async fn update_heartbeat(
    State(state): State<AppState>,
    Json(request): Json<HeartbeatRequest>,
) -> ApiResult<HeartbeatAck> {
    Ok(Json(state.nodes.heartbeat(request).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Json(request): Json<NodeIdRequest>,
) -> ApiResult<Node> {
    Ok(Json(state.nodes.get(request.id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Json(request): Json<ListNodesRequest>,
) -> ApiResult<ListNodesResponse> {
    let filter = NodeFilter {
        phase: request.phase,
        schedulable: request.schedulable,
        ..NodeFilter::default()
    };
    Ok(Json(ListNodesResponse {
        nodes: state.nodes.list(&filter).await?,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Json(node): Json<Node>,
) -> ApiResult<Node> {
    Ok(Json(state.nodes.update(&node).await?))
}

pub async fn enable(
    State(state): State<AppState>,
    Json(request): Json<NodeIdRequest>,
) -> ApiResult<Node> {
    Ok(Json(state.nodes.enable(request.id).await?))
}

pub async fn disable(
    State(state): State<AppState>,
    Json(request): Json<NodeIdRequest>,
) -> ApiResult<Node> {
    Ok(Json(state.nodes.disable(request.id).await?))
}

pub async fn drain(
    State(state): State<AppState>,
    Json(request): Json<NodeIdRequest>,
) -> ApiResult<DrainResponse> {
    let (node, vm_ids) = state.nodes.drain(request.id).await?;
    Ok(Json(DrainResponse { node, vm_ids }))
}

pub async fn decommission(
    State(state): State<AppState>,
    Json(request): Json<DecommissionRequest>,
) -> ApiResult<EmptyResponse> {
    state.nodes.decommission(request.id, request.force).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn get_metrics(
    State(state): State<AppState>,
    Json(request): Json<NodeIdRequest>,
) -> ApiResult<NodeMetrics> {
    Ok(Json(state.nodes.get_metrics(request.id).await?))
}

pub async fn sync_vms(
    State(state): State<AppState>,
    Json(request): Json<SyncNodeVmsRequest>,
) -> ApiResult<SyncNodeVmsResponse> {
    let errors = state.nodes.sync_vms(request.node_id, &request.vms).await?;
    Ok(Json(SyncNodeVmsResponse { errors }))
}
