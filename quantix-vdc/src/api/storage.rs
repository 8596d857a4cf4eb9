//! Storage pool service endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Provisioning, StoragePool, Volume};
use crate::services::CreateStoragePoolRequest;

use super::{ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolIdRequest {
    pub id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePoolRequest {
    pub id: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptPoolRequest {
    pub id: Uuid,
    #[serde(default)]
    pub assigned_node_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAssignmentRequest {
    pub id: Uuid,
    pub node_ids: Vec<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPoolsResponse {
    pub pools: Vec<StoragePool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeRequest {
    pub pool_id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    #[serde(default = "default_provisioning")]
    pub provisioning: Provisioning,
}

fn default_provisioning() -> Provisioning {
    Provisioning::Thin
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeIdRequest {
    pub id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVolumesRequest {
    #[serde(default)]
    pub pool_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVolumesResponse {
    pub volumes: Vec<Volume>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeVolumeRequest {
    pub id: Uuid,
    pub new_size_bytes: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneVolumeRequest {
    pub id: Uuid,
    pub clone_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyResponse {}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateStoragePoolRequest>,
) -> ApiResult<StoragePool> {
    Ok(Json(state.storage.create(request).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Json(request): Json<PoolIdRequest>,
) -> ApiResult<StoragePool> {
    Ok(Json(state.storage.get(request.id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Json(_request): Json<serde_json::Value>,
) -> ApiResult<ListPoolsResponse> {
    Ok(Json(ListPoolsResponse { pools: state.storage.list().await? }))
}

pub async fn update(
    State(state): State<AppState>,
    Json(pool): Json<StoragePool>,
) -> ApiResult<StoragePool> {
    Ok(Json(state.storage.update(&pool).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Json(request): Json<DeletePoolRequest>,
) -> ApiResult<EmptyResponse> {
    state.storage.delete(request.id, request.force).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn adopt(
    State(state): State<AppState>,
    Json(request): Json<AdoptPoolRequest>,
) -> ApiResult<StoragePool> {
    Ok(Json(
        state.storage.adopt(request.id, request.assigned_node_ids).await?,
    ))
}

pub async fn assign_hosts(
    State(state): State<AppState>,
    Json(request): Json<HostAssignmentRequest>,
) -> ApiResult<StoragePool> {
    Ok(Json(
        state.storage.assign_hosts(request.id, request.node_ids).await?,
    ))
}

pub async fn unassign_hosts(
    State(state): State<AppState>,
    Json(request): Json<HostAssignmentRequest>,
) -> ApiResult<StoragePool> {
    Ok(Json(
        state.storage.unassign_hosts(request.id, request.node_ids).await?,
    ))
}

pub async fn create_volume(
    State(state): State<AppState>,
    Json(request): Json<CreateVolumeRequest>,
) -> ApiResult<Volume> {
    Ok(Json(
        state
            .storage
            .create_volume(request.pool_id, request.name, request.size_bytes, request.provisioning)
            .await?,
    ))
}

pub async fn get_volume(
    State(state): State<AppState>,
    Json(request): Json<VolumeIdRequest>,
) -> ApiResult<Volume> {
    Ok(Json(state.storage.get_volume(request.id).await?))
}

pub async fn list_volumes(
    State(state): State<AppState>,
    Json(request): Json<ListVolumesRequest>,
) -> ApiResult<ListVolumesResponse> {
    Ok(Json(ListVolumesResponse {
        volumes: state.storage.list_volumes(request.pool_id).await?,
    }))
}

pub async fn delete_volume(
    State(state): State<AppState>,
    Json(request): Json<VolumeIdRequest>,
) -> ApiResult<EmptyResponse> {
    state.storage.delete_volume(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn resize_volume(
    State(state): State<AppState>,
    Json(request): Json<ResizeVolumeRequest>,
) -> ApiResult<Volume> {
    Ok(Json(
        state.storage.resize_volume(request.id, request.new_size_bytes).await?,
    ))
}

pub async fn clone_volume(
    State(state): State<AppState>,
    Json(request): Json<CloneVolumeRequest>,
) -> ApiResult<Volume> {
    Ok(Json(
        state.storage.clone_volume(request.id, request.clone_name).await?,
    ))
}
