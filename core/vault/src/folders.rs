//! Folder operations.

use tracing::debug;

use crate::manager::VaultManager;
use hushvault_common::{Error, FolderId, Result};
use hushvault_storage::{ItemFilter, VaultFolder};

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("Folder name cannot be empty".to_string()));
    }
    Ok(())
}

impl VaultManager {
    /// Create a folder under `parent`, or at the root with `None`.
    ///
    /// The folder is appended after its existing siblings.
    ///
    /// # Errors
    /// - `NotFound` if `parent` names no folder
    /// - `DepthExceeded` if the new folder would nest deeper than allowed
    /// - `InvalidInput` if the name is blank
    pub async fn create_folder(
        &self,
        name: impl Into<String>,
        parent: Option<&FolderId>,
        color: Option<String>,
    ) -> Result<VaultFolder> {
        let name = name.into();
        validate_name(&name)?;

        let _session = self.active_session_mut().await?;

        let depth = match parent {
            Some(id) => {
                let parent = self
                    .store
                    .get_folder(id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Folder {}", id)))?;
                parent.depth.saturating_add(1)
            }
            None => 0,
        };
        let max = self.settings.max_folder_depth;
        if depth > max {
            return Err(Error::DepthExceeded { depth, max });
        }

        let siblings = self
            .store
            .list_folders()
            .await?
            .iter()
            .filter(|f| f.parent_id.as_ref() == parent)
            .count();

        let folder = VaultFolder {
            id: FolderId::generate(),
            name,
            parent_id: parent.cloned(),
            depth,
            created_at: self.clock.now(),
            color,
            order_index: u32::try_from(siblings).unwrap_or(u32::MAX),
        };
        self.store.insert_folder(&folder).await?;

        debug!(folder = %folder.id, depth, "Folder created");
        Ok(folder)
    }

    /// All folders, parents before children.
    pub async fn get_folders(&self) -> Result<Vec<VaultFolder>> {
        let _session = self.active_session().await?;
        self.store.list_folders().await
    }

    pub async fn rename_folder(
        &self,
        id: &FolderId,
        name: impl Into<String>,
    ) -> Result<VaultFolder> {
        let name = name.into();
        validate_name(&name)?;

        let _session = self.active_session_mut().await?;

        let mut folder = self
            .store
            .get_folder(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Folder {}", id)))?;
        folder.name = name;

        self.store.update_folder(&folder).await?;
        Ok(folder)
    }

    /// Delete an empty folder.
    ///
    /// # Errors
    /// - `NotFound` if the folder does not exist
    /// - `InvalidInput` if it still holds items or subfolders
    pub async fn delete_folder(&self, id: &FolderId) -> Result<()> {
        let _session = self.active_session_mut().await?;

        self.require_folder_exists(id).await?;

        let items = self
            .store
            .list_items(&ItemFilter::InFolder(Some(id.clone())))
            .await?;
        let has_children = self
            .store
            .list_folders()
            .await?
            .iter()
            .any(|f| f.parent_id.as_ref() == Some(id));
        if !items.is_empty() || has_children {
            return Err(Error::InvalidInput(format!("Folder {} is not empty", id)));
        }

        self.store.delete_folder(id).await?;
        debug!(folder = %id, "Folder deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::tests::unlocked;
    use hushvault_storage::ItemType;

    #[tokio::test]
    async fn test_depth_limit() {
        let (manager, _clock) = unlocked().await;

        let mut parent: Option<VaultFolder> = None;
        for expected in 0..=3u8 {
            let folder = manager
                .create_folder(format!("level {}", expected), parent.as_ref().map(|f| &f.id), None)
                .await
                .unwrap();
            assert_eq!(folder.depth, expected);
            parent = Some(folder);
        }

        let deepest = parent.unwrap();
        assert!(matches!(
            manager.create_folder("too deep", Some(&deepest.id), None).await,
            Err(Error::DepthExceeded { depth: 4, max: 3 })
        ));
    }

    #[tokio::test]
    async fn test_order_index_counts_siblings() {
        let (manager, _clock) = unlocked().await;

        let a = manager.create_folder("a", None, None).await.unwrap();
        let b = manager.create_folder("b", None, Some("#ff0000".into())).await.unwrap();
        let child = manager.create_folder("c", Some(&a.id), None).await.unwrap();

        assert_eq!(a.order_index, 0);
        assert_eq!(b.order_index, 1);
        assert_eq!(b.color.as_deref(), Some("#ff0000"));
        assert_eq!(child.order_index, 0);
        assert_eq!(manager.get_folders().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_parent() {
        let (manager, _clock) = unlocked().await;
        assert!(matches!(
            manager
                .create_folder("orphan", Some(&FolderId::generate()), None)
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (manager, _clock) = unlocked().await;
        assert!(matches!(
            manager.create_folder("  ", None, None).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_rename() {
        let (manager, _clock) = unlocked().await;
        let folder = manager.create_folder("old", None, None).await.unwrap();

        let renamed = manager.rename_folder(&folder.id, "new").await.unwrap();

        assert_eq!(renamed.name, "new");
        assert_eq!(manager.get_folders().await.unwrap()[0].name, "new");
    }

    #[tokio::test]
    async fn test_delete_only_empty() {
        let (manager, _clock) = unlocked().await;
        let folder = manager.create_folder("f", None, None).await.unwrap();
        let note = manager
            .create_item(ItemType::Note, "n", b"x", Some(&folder.id), None)
            .await
            .unwrap();

        assert!(matches!(
            manager.delete_folder(&folder.id).await,
            Err(Error::InvalidInput(_))
        ));

        manager.move_item(&note.item.id, None).await.unwrap();
        let child = manager.create_folder("child", Some(&folder.id), None).await.unwrap();
        assert!(matches!(
            manager.delete_folder(&folder.id).await,
            Err(Error::InvalidInput(_))
        ));

        manager.delete_folder(&child.id).await.unwrap();
        manager.delete_folder(&folder.id).await.unwrap();
        assert!(manager.get_folders().await.unwrap().is_empty());
        assert!(matches!(
            manager.delete_folder(&folder.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
