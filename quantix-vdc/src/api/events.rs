//! Event log endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EventCategory, EventLevel, SystemEvent};
use crate::repo::EventFilter;

use super::{ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsRequest {
    #[serde(default)]
    pub level: Option<EventLevel>,
    #[serde(default)]
    pub category: Option<EventCategory>,
    #[serde(default)]
    pub resource_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsResponse {
    pub events: Vec<SystemEvent>,
}

pub async fn list(
    State(state): State<AppState>,
    Json(request): Json<ListEventsRequest>,
) -> ApiResult<ListEventsResponse> {
    let filter = EventFilter {
        level: request.level,
        category: request.category,
        resource_id: request.resource_id,
        limit: request.limit,
    };
    Ok(Json(ListEventsResponse {
        events: state.events.list(&filter).await?,
    }))
}
