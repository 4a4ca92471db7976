//! Item operations.
//!
//! Content, metadata and thumbnails are each sealed separately under the
//! session key with a fresh nonce. Titles stay in the clear so lists can be
//! shown without decrypting anything.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::manager::VaultManager;
use crate::metadata::VaultMetadata;
use hushvault_common::{Error, FolderId, ItemId, Result, SensitiveBytes};
use hushvault_crypto::{
    decrypt_with_key, digests_equal, encrypt_with_key, hash, EncryptedData, VaultKey,
};
use hushvault_storage::{ItemFilter, ItemType, VaultItem};

/// An item with its content and metadata decrypted.
#[derive(Debug, Clone)]
pub struct DecryptedItem {
    pub item: VaultItem,
    pub content: SensitiveBytes,
    pub metadata: Option<VaultMetadata>,
}

pub(crate) fn seal(key: &VaultKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    Ok(encrypt_with_key(key, plaintext)?.to_bytes())
}

pub(crate) fn open(key: &VaultKey, sealed: &[u8]) -> Result<SensitiveBytes> {
    let data = EncryptedData::from_key_bytes(sealed)?;
    decrypt_with_key(key, &data)
}

/// Timestamps on an item never move backwards, even if the clock does.
pub(crate) fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    previous.max(now)
}

fn open_metadata(key: &VaultKey, item: &VaultItem) -> Result<Option<VaultMetadata>> {
    item.encrypted_metadata
        .as_deref()
        .map(|sealed| VaultMetadata::from_bytes(open(key, sealed)?.as_bytes()))
        .transpose()
}

impl VaultManager {
    pub(crate) async fn require_item(&self, id: &ItemId) -> Result<VaultItem> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Item {}", id)))
    }

    pub(crate) async fn require_folder_exists(&self, id: &FolderId) -> Result<()> {
        match self.store.get_folder(id).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("Folder {}", id))),
        }
    }

    /// Create an item.
    ///
    /// # Postconditions
    /// - Content and metadata are stored encrypted, each with its own nonce
    /// - The returned item carries the plaintext it was created from; storage
    ///   is not read back
    ///
    /// # Errors
    /// - `SessionNotActive` if the vault is locked
    /// - `NotFound` if `folder_id` names no folder
    /// - `InvalidInput` if the metadata variant does not match `item_type`
    pub async fn create_item(
        &self,
        item_type: ItemType,
        title: impl Into<String>,
        content: &[u8],
        folder_id: Option<&FolderId>,
        metadata: Option<VaultMetadata>,
    ) -> Result<DecryptedItem> {
        if let Some(metadata) = &metadata {
            metadata.ensure_matches(item_type)?;
        }

        let session = self.active_session_mut().await?;
        let key = session.key()?;

        if let Some(folder) = folder_id {
            self.require_folder_exists(folder).await?;
        }

        let encrypted_metadata = metadata
            .as_ref()
            .map(|m| seal(key, &m.to_bytes()?))
            .transpose()?;
        let now = self.clock.now();

        let item = VaultItem {
            id: ItemId::generate(),
            item_type,
            title: title.into(),
            folder_id: folder_id.cloned(),
            encrypted_content: seal(key, content)?,
            content_hash: hash(content),
            encrypted_thumbnail: None,
            created_at: now,
            updated_at: now,
            accessed_at: now,
            starred: false,
            encrypted_metadata,
        };
        self.store.insert_item(&item).await?;

        debug!(item = %item.id, item_type = %item_type, bytes = content.len(), "Item created");
        Ok(DecryptedItem {
            item,
            content: SensitiveBytes::new(content.to_vec()),
            metadata,
        })
    }

    /// Read and decrypt an item, recording the access.
    ///
    /// # Errors
    /// - `NotFound` if the item does not exist
    /// - `AuthenticationFailure` if the ciphertext does not authenticate
    /// - `IntegrityMismatch` if it authenticates but the content hash differs
    pub async fn get_item(&self, id: &ItemId) -> Result<DecryptedItem> {
        let session = self.active_session().await?;
        let key = session.key()?;

        let mut item = self.require_item(id).await?;
        let content = open(key, &item.encrypted_content)?;
        if !digests_equal(&hash(content.as_bytes()), &item.content_hash) {
            warn!(item = %id, "Content hash mismatch");
            return Err(Error::IntegrityMismatch(id.to_string()));
        }
        let metadata = open_metadata(key, &item)?;

        item.accessed_at = advance(item.accessed_at, self.clock.now());
        self.store.update_item(&item).await?;

        Ok(DecryptedItem {
            item,
            content,
            metadata,
        })
    }

    /// All items, without decrypted content.
    pub async fn get_all_items(&self) -> Result<Vec<VaultItem>> {
        self.list_items(ItemFilter::All).await
    }

    pub async fn items_by_type(&self, item_type: ItemType) -> Result<Vec<VaultItem>> {
        self.list_items(ItemFilter::ByType(item_type)).await
    }

    /// Items directly inside `folder`; `None` lists the root.
    pub async fn items_in_folder(&self, folder: Option<&FolderId>) -> Result<Vec<VaultItem>> {
        self.list_items(ItemFilter::InFolder(folder.cloned())).await
    }

    pub async fn starred_items(&self) -> Result<Vec<VaultItem>> {
        self.list_items(ItemFilter::Starred).await
    }

    async fn list_items(&self, filter: ItemFilter) -> Result<Vec<VaultItem>> {
        let _session = self.active_session().await?;
        self.store.list_items(&filter).await
    }

    /// Replace an item's content.
    ///
    /// The content is re-encrypted under a fresh nonce and its hash
    /// recomputed. With `metadata` set to `None` the existing metadata is
    /// kept as is.
    pub async fn update_item(
        &self,
        id: &ItemId,
        content: &[u8],
        metadata: Option<VaultMetadata>,
    ) -> Result<VaultItem> {
        let session = self.active_session_mut().await?;
        let key = session.key()?;

        let mut item = self.require_item(id).await?;
        if let Some(metadata) = &metadata {
            metadata.ensure_matches(item.item_type)?;
            item.encrypted_metadata = Some(seal(key, &metadata.to_bytes()?)?);
        }
        item.encrypted_content = seal(key, content)?;
        item.content_hash = hash(content);
        item.updated_at = advance(item.updated_at, self.clock.now());

        self.store.update_item(&item).await?;
        debug!(item = %id, bytes = content.len(), "Item updated");
        Ok(item)
    }

    pub async fn rename_item(&self, id: &ItemId, title: impl Into<String>) -> Result<VaultItem> {
        let _session = self.active_session_mut().await?;

        let mut item = self.require_item(id).await?;
        item.title = title.into();
        item.updated_at = advance(item.updated_at, self.clock.now());

        self.store.update_item(&item).await?;
        Ok(item)
    }

    /// Move an item into `folder`, or to the root with `None`.
    pub async fn move_item(&self, id: &ItemId, folder: Option<&FolderId>) -> Result<VaultItem> {
        let _session = self.active_session_mut().await?;

        let mut item = self.require_item(id).await?;
        if let Some(folder) = folder {
            self.require_folder_exists(folder).await?;
        }
        item.folder_id = folder.cloned();
        item.updated_at = advance(item.updated_at, self.clock.now());

        self.store.update_item(&item).await?;
        debug!(item = %id, folder = ?item.folder_id, "Item moved");
        Ok(item)
    }

    pub async fn set_thumbnail(&self, id: &ItemId, thumbnail: &[u8]) -> Result<VaultItem> {
        let session = self.active_session_mut().await?;
        let key = session.key()?;

        let mut item = self.require_item(id).await?;
        item.encrypted_thumbnail = Some(seal(key, thumbnail)?);
        item.updated_at = advance(item.updated_at, self.clock.now());

        self.store.update_item(&item).await?;
        Ok(item)
    }

    pub async fn get_thumbnail(&self, id: &ItemId) -> Result<Option<SensitiveBytes>> {
        let session = self.active_session().await?;
        let key = session.key()?;

        let item = self.require_item(id).await?;
        item.encrypted_thumbnail
            .as_deref()
            .map(|sealed| open(key, sealed))
            .transpose()
    }

    /// Flip the starred flag. Returns the new value.
    pub async fn toggle_starred(&self, id: &ItemId) -> Result<bool> {
        let _session = self.active_session_mut().await?;

        let mut item = self.require_item(id).await?;
        item.starred = !item.starred;
        item.updated_at = advance(item.updated_at, self.clock.now());

        self.store.update_item(&item).await?;
        Ok(item.starred)
    }
}
