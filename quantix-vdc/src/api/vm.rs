//! VM service endpoints.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{VirtualMachine, VmPowerState};
use crate::repo::VmFilter;
use crate::services::{ConsoleInfo, CreateVmRequest, GuestExecResult, QuiesceInfo, VmSnapshot};

use super::{ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmIdRequest {
    pub id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVmsRequest {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub node_id: Option<Uuid>,
    #[serde(default)]
    pub state: Option<VmPowerState>,
    #[serde(default)]
    pub folder_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVmsResponse {
    pub vms: Vec<VirtualMachine>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVmRequest {
    pub id: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopVmRequest {
    pub id: Uuid,
    /// Graceful shutdown budget in seconds.
    #[serde(default = "default_stop_timeout")]
    pub timeout_secs: u64,
    /// Escalate to a hard power-off after the timeout.
    #[serde(default)]
    pub force: bool,
}

fn default_stop_timeout() -> u64 {
    30
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub include_memory: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshotsResponse {
    pub snapshots: Vec<VmSnapshot>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertSnapshotRequest {
    pub id: Uuid,
    pub snapshot_id: String,
    #[serde(default)]
    pub start_after_revert: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotIdRequest {
    pub id: Uuid,
    pub snapshot_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPingResponse {
    pub connected: bool,
    pub version: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteInGuestRequest {
    pub id: Uuid,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_exec_timeout")]
    pub timeout_secs: u64,
}

fn default_exec_timeout() -> u64 {
    60
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuiesceRequest {
    pub id: Uuid,
    #[serde(default)]
    pub mount_points: Vec<String>,
    #[serde(default = "default_quiesce_timeout")]
    pub timeout_secs: u64,
}

fn default_quiesce_timeout() -> u64 {
    60
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThawRequest {
    pub id: Uuid,
    pub quiesce_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThawResponse {
    pub thawed_mount_points: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTimeResponse {
    pub guest_offset_ms: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyResponse {}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateVmRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.create(request).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.get(request.id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Json(request): Json<ListVmsRequest>,
) -> ApiResult<ListVmsResponse> {
    let filter = VmFilter {
        project_id: request.project_id,
        node_id: request.node_id,
        state: request.state,
        folder_id: request.folder_id,
        managed_only: false,
    };
    Ok(Json(ListVmsResponse { vms: state.vms.list(&filter).await? }))
}

pub async fn update(
    State(state): State<AppState>,
    Json(vm): Json<VirtualMachine>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.update(&vm).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Json(request): Json<DeleteVmRequest>,
) -> ApiResult<EmptyResponse> {
    state.vms.delete(request.id, request.force).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn reconcile(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.reconcile(request.id).await?))
}

pub async fn adopt(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.adopt(request.id).await?))
}

pub async fn force_purge(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<EmptyResponse> {
    state.vms.force_purge(request.id).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.start(request.id).await?))
}

pub async fn stop(
    State(state): State<AppState>,
    Json(request): Json<StopVmRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(
        state
            .vms
            .stop(request.id, Duration::from_secs(request.timeout_secs), request.force)
            .await?,
    ))
}

pub async fn force_stop(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.force_stop(request.id).await?))
}

pub async fn reboot(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.reboot(request.id).await?))
}

pub async fn pause(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.pause(request.id).await?))
}

pub async fn resume(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(state.vms.resume(request.id).await?))
}

pub async fn create_snapshot(
    State(state): State<AppState>,
    Json(request): Json<CreateSnapshotRequest>,
) -> ApiResult<VmSnapshot> {
    Ok(Json(
        state
            .vms
            .create_snapshot(request.id, request.name, request.description, request.include_memory)
            .await?,
    ))
}

pub async fn list_snapshots(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<ListSnapshotsResponse> {
    Ok(Json(ListSnapshotsResponse {
        snapshots: state.vms.list_snapshots(request.id).await?,
    }))
}

pub async fn revert_snapshot(
    State(state): State<AppState>,
    Json(request): Json<RevertSnapshotRequest>,
) -> ApiResult<VirtualMachine> {
    Ok(Json(
        state
            .vms
            .revert_snapshot(request.id, &request.snapshot_id, request.start_after_revert)
            .await?,
    ))
}

pub async fn delete_snapshot(
    State(state): State<AppState>,
    Json(request): Json<SnapshotIdRequest>,
) -> ApiResult<EmptyResponse> {
    state.vms.delete_snapshot(request.id, &request.snapshot_id).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn ping_guest_agent(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<AgentPingResponse> {
    let response = state.vms.ping_guest_agent(request.id).await?;
    Ok(Json(AgentPingResponse {
        connected: response.connected,
        version: response.version,
    }))
}

pub async fn execute_in_guest(
    State(state): State<AppState>,
    Json(request): Json<ExecuteInGuestRequest>,
) -> ApiResult<GuestExecResult> {
    Ok(Json(
        state
            .vms
            .execute_in_guest(
                request.id,
                request.command,
                request.args,
                Duration::from_secs(request.timeout_secs),
            )
            .await?,
    ))
}

pub async fn quiesce_filesystems(
    State(state): State<AppState>,
    Json(request): Json<QuiesceRequest>,
) -> ApiResult<QuiesceInfo> {
    Ok(Json(
        state
            .vms
            .quiesce_filesystems(
                request.id,
                request.mount_points,
                Duration::from_secs(request.timeout_secs),
            )
            .await?,
    ))
}

pub async fn thaw_filesystems(
    State(state): State<AppState>,
    Json(request): Json<ThawRequest>,
) -> ApiResult<ThawResponse> {
    let thawed = state
        .vms
        .thaw_filesystems(request.id, &request.quiesce_token)
        .await?;
    Ok(Json(ThawResponse { thawed_mount_points: thawed }))
}

pub async fn sync_guest_time(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<SyncTimeResponse> {
    let offset = state.vms.sync_guest_time(request.id).await?;
    Ok(Json(SyncTimeResponse { guest_offset_ms: offset }))
}

pub async fn get_console(
    State(state): State<AppState>,
    Json(request): Json<VmIdRequest>,
) -> ApiResult<ConsoleInfo> {
    Ok(Json(state.vms.get_console(request.id).await?))
}
