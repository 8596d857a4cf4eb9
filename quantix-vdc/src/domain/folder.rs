//! Inventory folders: a tree held together by parent IDs, never by handles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Vm,
    Datastore,
    Network,
    Host,
}

/// A grouping folder. `(parent_id, name, project_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub project_id: Uuid,
    pub folder_type: FolderType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl Folder {
    pub fn new(
        name: String,
        parent_id: Option<Uuid>,
        project_id: Uuid,
        folder_type: FolderType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            parent_id,
            project_id,
            folder_type,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}
