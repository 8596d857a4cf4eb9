//! Folder service endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Folder, FolderType};
use crate::services::FolderTree;

use super::{ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderIdRequest {
    pub id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub project_id: Uuid,
    pub folder_type: FolderType,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFoldersRequest {
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFoldersResponse {
    pub folders: Vec<Folder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFolderRequest {
    pub id: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTreeRequest {
    #[serde(default)]
    pub root_id: Option<Uuid>,
    pub project_id: Uuid,
    #[serde(default = "default_tree_depth")]
    pub depth: usize,
}

fn default_tree_depth() -> usize {
    16
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTreeResponse {
    pub roots: Vec<FolderTree>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyResponse {}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateFolderRequest>,
) -> ApiResult<Folder> {
    Ok(Json(
        state
            .folders
            .create(request.name, request.parent_id, request.project_id, request.folder_type)
            .await?,
    ))
}

pub async fn get(
    State(state): State<AppState>,
    Json(request): Json<FolderIdRequest>,
) -> ApiResult<Folder> {
    Ok(Json(state.folders.get(request.id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Json(request): Json<ListFoldersRequest>,
) -> ApiResult<ListFoldersResponse> {
    Ok(Json(ListFoldersResponse {
        folders: state.folders.list(request.project_id).await?,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Json(folder): Json<Folder>,
) -> ApiResult<Folder> {
    Ok(Json(state.folders.update(&folder).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Json(request): Json<DeleteFolderRequest>,
) -> ApiResult<EmptyResponse> {
    state.folders.delete(request.id, request.force).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn get_tree(
    State(state): State<AppState>,
    Json(request): Json<GetTreeRequest>,
) -> ApiResult<GetTreeResponse> {
    Ok(Json(GetTreeResponse {
        roots: state
            .folders
            .get_tree(request.root_id, request.project_id, request.depth)
            .await?,
    }))
}
