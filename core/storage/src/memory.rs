//! In-memory vault store for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::records::{ItemFilter, TrashEntry, VaultFolder, VaultItem};
use crate::store::{sort_folders, sort_items, sort_trash, VaultStore};
use hushvault_common::{Error, FolderId, ItemId, Result, TrashId};

#[derive(Default)]
struct Tables {
    items: HashMap<ItemId, VaultItem>,
    folders: HashMap<FolderId, VaultFolder>,
    trash: HashMap<TrashId, TrashEntry>,
}

/// In-memory vault store.
///
/// Useful for testing and development. All records are held in memory
/// and lost on drop. One lock covers every table, so the trash moves are
/// atomic.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert_item(&self, item: &VaultItem) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.items.contains_key(&item.id) {
            return Err(Error::AlreadyExists(format!("Item {}", item.id)));
        }
        tables.items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &VaultItem) -> Result<()> {
        let mut tables = self.tables.write();
        match tables.items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("Item {}", item.id))),
        }
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<VaultItem>> {
        Ok(self.tables.read().items.get(id).cloned())
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<VaultItem>> {
        let mut items: Vec<VaultItem> = self
            .tables
            .read()
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        sort_items(&mut items);
        Ok(items)
    }

    async fn insert_folder(&self, folder: &VaultFolder) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.folders.contains_key(&folder.id) {
            return Err(Error::AlreadyExists(format!("Folder {}", folder.id)));
        }
        tables.folders.insert(folder.id.clone(), folder.clone());
        Ok(())
    }

    async fn update_folder(&self, folder: &VaultFolder) -> Result<()> {
        let mut tables = self.tables.write();
        match tables.folders.get_mut(&folder.id) {
            Some(existing) => {
                *existing = folder.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("Folder {}", folder.id))),
        }
    }

    async fn get_folder(&self, id: &FolderId) -> Result<Option<VaultFolder>> {
        Ok(self.tables.read().folders.get(id).cloned())
    }

    async fn list_folders(&self) -> Result<Vec<VaultFolder>> {
        let mut folders: Vec<VaultFolder> = self.tables.read().folders.values().cloned().collect();
        sort_folders(&mut folders);
        Ok(folders)
    }

    async fn delete_folder(&self, id: &FolderId) -> Result<()> {
        self.tables
            .write()
            .folders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Folder {}", id)))
    }

    async fn trash_item(&self, entry: &TrashEntry) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.items.remove(&entry.original_item_id).is_none() {
            return Err(Error::NotFound(format!("Item {}", entry.original_item_id)));
        }
        tables.trash.insert(entry.id.clone(), entry.clone());
        debug!(item = %entry.original_item_id, trash = %entry.id, "Item moved to trash");
        Ok(())
    }

    async fn restore_item(&self, trash_id: &TrashId, item: &VaultItem) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.trash.contains_key(trash_id) {
            return Err(Error::NotFound(format!("Trash entry {}", trash_id)));
        }
        if tables.items.contains_key(&item.id) {
            return Err(Error::AlreadyExists(format!("Item {}", item.id)));
        }
        tables.trash.remove(trash_id);
        tables.items.insert(item.id.clone(), item.clone());
        debug!(item = %item.id, trash = %trash_id, "Item restored from trash");
        Ok(())
    }

    async fn get_trash_entry(&self, id: &TrashId) -> Result<Option<TrashEntry>> {
        Ok(self.tables.read().trash.get(id).cloned())
    }

    async fn list_trash(&self) -> Result<Vec<TrashEntry>> {
        let mut entries: Vec<TrashEntry> = self.tables.read().trash.values().cloned().collect();
        sort_trash(&mut entries);
        Ok(entries)
    }

    async fn purge_trash_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut tables = self.tables.write();
        let before = tables.trash.len();
        tables.trash.retain(|_, entry| entry.deleted_at >= cutoff);
        Ok(before - tables.trash.len())
    }

    async fn clear(&self) -> Result<()> {
        *self.tables.write() = Tables::default();
        Ok(())
    }
}
