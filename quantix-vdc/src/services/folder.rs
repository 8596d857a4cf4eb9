//! Folder service: hierarchical inventory grouping of VMs.
//!
//! The tree is held together by parent IDs; cycle checks run on every move.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Error, Folder, FolderType, Result};
use crate::repo::{FolderRepository, VmFilter, VmRepository};

use super::with_conflict_retry;

/// Walks deeper than any sane inventory; treated as a corrupt tree.
const MAX_TREE_DEPTH: usize = 64;

/// A folder with its resolved children, as returned by `get_tree`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderTree {
    #[serde(flatten)]
    pub folder: Folder,
    pub children: Vec<FolderTree>,
}

pub struct FolderService {
    folders: Arc<dyn FolderRepository>,
    vms: Arc<dyn VmRepository>,
}

impl FolderService {
    pub fn new(folders: Arc<dyn FolderRepository>, vms: Arc<dyn VmRepository>) -> Self {
        Self { folders, vms }
    }

    pub async fn create(
        &self,
        name: String,
        parent_id: Option<Uuid>,
        project_id: Uuid,
        folder_type: FolderType,
    ) -> Result<Folder> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("folder name must not be empty".to_string()));
        }
        if let Some(parent) = parent_id {
            let parent_folder = self.folders.get(parent).await?;
            if parent_folder.project_id != project_id {
                return Err(Error::InvalidArgument(
                    "parent folder belongs to a different project".to_string(),
                ));
            }
        }
        self.folders
            .create(&Folder::new(name, parent_id, project_id, folder_type))
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Folder> {
        self.folders.get(id).await
    }

    pub async fn list(&self, project_id: Option<Uuid>) -> Result<Vec<Folder>> {
        self.folders.list(project_id).await
    }

    /// Rename and/or move a folder. A folder cannot become its own
    /// descendant.
    pub async fn update(&self, folder: &Folder) -> Result<Folder> {
        if folder.name.trim().is_empty() {
            return Err(Error::InvalidArgument("folder name must not be empty".to_string()));
        }
        if let Some(new_parent) = folder.parent_id {
            self.reject_cycle(folder.id, new_parent).await?;
        }
        self.folders.update(folder).await
    }

    /// Walk up from `new_parent`; finding `folder_id` on the way means the
    /// move would create a cycle.
    async fn reject_cycle(&self, folder_id: Uuid, new_parent: Uuid) -> Result<()> {
        if folder_id == new_parent {
            return Err(Error::Conflict("a folder cannot be its own parent".to_string()));
        }
        let mut cursor = Some(new_parent);
        let mut depth = 0;
        while let Some(current) = cursor {
            if current == folder_id {
                return Err(Error::Conflict(
                    "a folder cannot become its own descendant".to_string(),
                ));
            }
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                return Err(Error::Internal("folder tree too deep".to_string()));
            }
            cursor = self.folders.get(current).await?.parent_id;
        }
        Ok(())
    }

    /// Delete a folder. Rejected while VMs or subfolders reference it
    /// unless `force`, which reassigns both to the parent.
    pub async fn delete(&self, id: Uuid, force: bool) -> Result<()> {
        let folder = self.folders.get(id).await?;
        let vms = self
            .vms
            .list(&VmFilter { folder_id: Some(id), ..VmFilter::default() })
            .await?;
        let children = self
            .folders
            .list_children(Some(id), folder.project_id)
            .await?;

        if (!vms.is_empty() || !children.is_empty()) && !force {
            return Err(Error::FailedPrecondition(format!(
                "folder {} has {} VM(s) and {} subfolder(s)",
                folder.name,
                vms.len(),
                children.len()
            )));
        }

        for vm in vms {
            with_conflict_retry(|| async {
                let mut vm = self.vms.get(vm.id).await?;
                vm.spec.folder_id = folder.parent_id;
                self.vms.update(&vm).await
            })
            .await?;
        }
        for child in children {
            with_conflict_retry(|| async {
                let mut child = self.folders.get(child.id).await?;
                child.parent_id = folder.parent_id;
                self.folders.update(&child).await
            })
            .await?;
        }

        self.folders.delete(id).await?;
        info!(folder_id = %id, name = %folder.name, "🗑️ Folder removed");
        Ok(())
    }

    /// Resolve the tree under `root` (or the project's roots when None) up
    /// to `depth` levels of children; `depth = 0` returns only the root.
    pub async fn get_tree(
        &self,
        root: Option<Uuid>,
        project_id: Uuid,
        depth: usize,
    ) -> Result<Vec<FolderTree>> {
        let roots = match root {
            Some(id) => vec![self.folders.get(id).await?],
            None => self.folders.list_children(None, project_id).await?,
        };
        let mut trees = Vec::with_capacity(roots.len());
        for folder in roots {
            trees.push(self.build_subtree(folder, depth).await?);
        }
        Ok(trees)
    }

    fn build_subtree(
        &self,
        folder: Folder,
        depth: usize,
    ) -> futures::future::BoxFuture<'_, Result<FolderTree>> {
        Box::pin(async move {
            let mut node = FolderTree { folder, children: Vec::new() };
            if depth == 0 {
                return Ok(node);
            }
            let children = self
                .folders
                .list_children(Some(node.folder.id), node.folder.project_id)
                .await?;
            for child in children {
                node.children.push(self.build_subtree(child, depth - 1).await?);
            }
            Ok(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::memory::{MemoryFolderRepository, MemoryVmRepository};

    fn service() -> FolderService {
        FolderService::new(
            Arc::new(MemoryFolderRepository::new()),
            Arc::new(MemoryVmRepository::new()),
        )
    }

    #[tokio::test]
    async fn test_sibling_names_are_unique() {
        let service = service();
        let project = Uuid::new_v4();
        service
            .create("prod".into(), None, project, FolderType::Vm)
            .await
            .unwrap();
        let err = service
            .create("prod".into(), None, project, FolderType::Vm)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_move_rejects_cycle() {
        let service = service();
        let project = Uuid::new_v4();
        let a = service.create("a".into(), None, project, FolderType::Vm).await.unwrap();
        let b = service
            .create("b".into(), Some(a.id), project, FolderType::Vm)
            .await
            .unwrap();
        let c = service
            .create("c".into(), Some(b.id), project, FolderType::Vm)
            .await
            .unwrap();

        // a under c would close the loop a -> b -> c -> a.
        let mut moved = service.get(a.id).await.unwrap();
        moved.parent_id = Some(c.id);
        let err = service.update(&moved).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Sibling moves still work.
        let mut moved = service.get(c.id).await.unwrap();
        moved.parent_id = Some(a.id);
        assert!(service.update(&moved).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_tree_depth_limit() {
        let service = service();
        let project = Uuid::new_v4();
        let a = service.create("a".into(), None, project, FolderType::Vm).await.unwrap();
        let b = service
            .create("b".into(), Some(a.id), project, FolderType::Vm)
            .await
            .unwrap();
        service
            .create("c".into(), Some(b.id), project, FolderType::Vm)
            .await
            .unwrap();

        let tree = service.get_tree(Some(a.id), project, 0).await.unwrap();
        assert!(tree[0].children.is_empty());

        let tree = service.get_tree(Some(a.id), project, 1).await.unwrap();
        assert_eq!(tree[0].children.len(), 1);
        assert!(tree[0].children[0].children.is_empty());

        let tree = service.get_tree(Some(a.id), project, 5).await.unwrap();
        assert_eq!(tree[0].children[0].children.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_nonempty_requires_force() {
        let service = service();
        let project = Uuid::new_v4();
        let a = service.create("a".into(), None, project, FolderType::Vm).await.unwrap();
        let b = service
            .create("b".into(), Some(a.id), project, FolderType::Vm)
            .await
            .unwrap();

        let err = service.delete(a.id, false).await.unwrap_err();
        assert!(matches!(err, Error::FailedPrecondition(_)));

        service.delete(a.id, true).await.unwrap();
        // The child was reassigned to a's parent (the root).
        let b = service.get(b.id).await.unwrap();
        assert_eq!(b.parent_id, None);
    }
}
