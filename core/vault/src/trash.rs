//! Trash: soft deletion, restore and retention.

use tracing::{debug, info};

use crate::manager::VaultManager;
use hushvault_common::{Error, ItemId, Result, TrashId};
use hushvault_storage::{TrashEntry, VaultItem};

impl VaultManager {
    /// Move an item to the trash.
    ///
    /// This is the only way to delete an item. The snapshot and the removal
    /// of the live record happen in one store transaction.
    pub async fn delete_item(&self, id: &ItemId) -> Result<TrashEntry> {
        let _session = self.active_session_mut().await?;

        let item = self.require_item(id).await?;
        let entry = TrashEntry::snapshot(item, self.clock.now());
        self.store.trash_item(&entry).await?;

        info!(item = %id, trash = %entry.id, "Item moved to trash");
        Ok(entry)
    }

    /// Trash entries, most recently deleted first.
    pub async fn get_trash(&self) -> Result<Vec<TrashEntry>> {
        let _session = self.active_session().await?;
        self.store.list_trash().await
    }

    /// Reinstate a trashed item under its original id.
    ///
    /// If its folder has been deleted in the meantime the item lands in the
    /// root.
    pub async fn restore_from_trash(&self, trash_id: &TrashId) -> Result<VaultItem> {
        let _session = self.active_session_mut().await?;

        let entry = self
            .store
            .get_trash_entry(trash_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Trash entry {}", trash_id)))?;

        let mut item = entry.item;
        item.id = entry.original_item_id;
        item.folder_id = None;
        if let Some(folder) = entry.original_folder_id {
            if self.store.get_folder(&folder).await?.is_some() {
                item.folder_id = Some(folder);
            } else {
                debug!(item = %item.id, folder = %folder, "Original folder gone, restoring to root");
            }
        }
        self.store.restore_item(trash_id, &item).await?;

        info!(item = %item.id, trash = %trash_id, "Item restored");
        Ok(item)
    }

    /// Permanently remove trash entries older than the retention period.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired_trash(&self) -> Result<usize> {
        let _session = self.active_session_mut().await?;

        let now = self.clock.now();
        let Some(cutoff) = now.checked_sub_signed(self.settings.trash_retention()) else {
            return Ok(0);
        };
        let purged = self.store.purge_trash_before(cutoff).await?;

        if purged > 0 {
            info!(purged, "Expired trash purged");
        }
        Ok(purged)
    }
}
