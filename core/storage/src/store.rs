//! Vault store abstraction.
//!
//! Defines the interface every persistence backend must implement. Stores
//! only see encrypted records; they never hold keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::records::{ItemFilter, TrashEntry, VaultFolder, VaultItem};
use hushvault_common::{FolderId, ItemId, Result, TrashId};

/// Persistence backend for vault records.
///
/// All implementations must be thread-safe (Send + Sync). Scans return
/// items ordered by creation time, folders by depth, parent and `order_index`,
/// and trash newest first.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Name of the backend (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// Insert a new item.
    ///
    /// # Errors
    /// Returns `AlreadyExists` if an item with the same id is stored.
    async fn insert_item(&self, item: &VaultItem) -> Result<()>;

    /// Replace an existing item.
    ///
    /// # Errors
    /// Returns `NotFound` if the item does not exist.
    async fn update_item(&self, item: &VaultItem) -> Result<()>;

    async fn get_item(&self, id: &ItemId) -> Result<Option<VaultItem>>;

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<VaultItem>>;

    /// Insert a new folder.
    async fn insert_folder(&self, folder: &VaultFolder) -> Result<()>;

    /// Replace an existing folder.
    async fn update_folder(&self, folder: &VaultFolder) -> Result<()>;

    async fn get_folder(&self, id: &FolderId) -> Result<Option<VaultFolder>>;

    async fn list_folders(&self) -> Result<Vec<VaultFolder>>;

    /// Remove a folder record. Does not touch items or subfolders.
    async fn delete_folder(&self, id: &FolderId) -> Result<()>;

    /// Move a live item into the trash.
    ///
    /// Stores `entry` and removes the live item `entry.original_item_id` as
    /// one atomic step: either both happen or neither does.
    ///
    /// # Errors
    /// Returns `NotFound` if the live item does not exist.
    async fn trash_item(&self, entry: &TrashEntry) -> Result<()>;

    /// Bring a trashed item back.
    ///
    /// Removes the trash entry and inserts `item` atomically.
    ///
    /// # Errors
    /// - `NotFound` if the trash entry does not exist
    /// - `AlreadyExists` if a live item with the same id exists
    async fn restore_item(&self, trash_id: &TrashId, item: &VaultItem) -> Result<()>;

    async fn get_trash_entry(&self, id: &TrashId) -> Result<Option<TrashEntry>>;

    async fn list_trash(&self) -> Result<Vec<TrashEntry>>;

    /// Remove every trash entry deleted strictly before `cutoff`.
    ///
    /// Returns the number of entries removed.
    async fn purge_trash_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Remove every record.
    async fn clear(&self) -> Result<()>;
}

pub(crate) fn sort_items(items: &mut [VaultItem]) {
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

pub(crate) fn sort_folders(folders: &mut [VaultFolder]) {
    folders.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| a.parent_id.cmp(&b.parent_id))
            .then_with(|| a.order_index.cmp(&b.order_index))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub(crate) fn sort_trash(entries: &mut [TrashEntry]) {
    entries.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then_with(|| a.id.cmp(&b.id)));
}
