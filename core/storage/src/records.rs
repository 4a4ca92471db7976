//! Persistent vault records.
//!
//! Everything here is what the store sees: titles, ids, timestamps and
//! opaque ciphertext. Decrypted content never reaches this layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use hushvault_common::types::base64_bytes;
use hushvault_common::{Error, FolderId, ItemId, TrashId};

/// Kind of content an item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Photo,
    Video,
    Document,
    Note,
    Password,
    Audio,
    Contact,
}

impl ItemType {
    pub const ALL: [ItemType; 7] = [
        ItemType::Photo,
        ItemType::Video,
        ItemType::Document,
        ItemType::Note,
        ItemType::Password,
        ItemType::Audio,
        ItemType::Contact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Photo => "photo",
            ItemType::Video => "video",
            ItemType::Document => "document",
            ItemType::Note => "note",
            ItemType::Password => "password",
            ItemType::Audio => "audio",
            ItemType::Contact => "contact",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown item type: {}", s)))
    }
}

/// A stored vault item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultItem {
    pub id: ItemId,
    pub item_type: ItemType,
    pub title: String,
    pub folder_id: Option<FolderId>,
    #[serde(with = "base64_bytes")]
    pub encrypted_content: Vec<u8>,
    /// BLAKE2b-256 of the plaintext content.
    pub content_hash: [u8; 32],
    #[serde(with = "base64_bytes::option", default)]
    pub encrypted_thumbnail: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub starred: bool,
    #[serde(with = "base64_bytes::option", default)]
    pub encrypted_metadata: Option<Vec<u8>>,
}

/// A folder. Depth 0 sits at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultFolder {
    pub id: FolderId,
    pub name: String,
    pub parent_id: Option<FolderId>,
    pub depth: u8,
    pub created_at: DateTime<Utc>,
    pub color: Option<String>,
    pub order_index: u32,
}

/// A deleted item awaiting restore or purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub id: TrashId,
    pub item: VaultItem,
    pub original_item_id: ItemId,
    pub original_folder_id: Option<FolderId>,
    pub deleted_at: DateTime<Utc>,
}

impl TrashEntry {
    /// Snapshot `item` as deleted at `deleted_at`.
    pub fn snapshot(item: VaultItem, deleted_at: DateTime<Utc>) -> Self {
        Self {
            id: TrashId::generate(),
            original_item_id: item.id.clone(),
            original_folder_id: item.folder_id.clone(),
            item,
            deleted_at,
        }
    }
}

/// Which items a scan returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFilter {
    All,
    ByType(ItemType),
    /// Items directly in a folder; `None` is the root.
    InFolder(Option<FolderId>),
    Starred,
}

impl ItemFilter {
    pub fn matches(&self, item: &VaultItem) -> bool {
        match self {
            ItemFilter::All => true,
            ItemFilter::ByType(t) => item.item_type == *t,
            ItemFilter::InFolder(folder) => item.folder_id == *folder,
            ItemFilter::Starred => item.starred,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(item_type: ItemType, folder: Option<FolderId>) -> VaultItem {
        let now = Utc::now();
        VaultItem {
            id: ItemId::generate(),
            item_type,
            title: "title".to_string(),
            folder_id: folder,
            encrypted_content: vec![1, 2, 3, 4],
            content_hash: [7u8; 32],
            encrypted_thumbnail: None,
            created_at: now,
            updated_at: now,
            accessed_at: now,
            starred: false,
            encrypted_metadata: Some(vec![9, 9]),
        }
    }

    pub(crate) fn folder(name: &str, parent: Option<&VaultFolder>) -> VaultFolder {
        VaultFolder {
            id: FolderId::generate(),
            name: name.to_string(),
            parent_id: parent.map(|p| p.id.clone()),
            depth: parent.map_or(0, |p| p.depth + 1),
            created_at: Utc::now(),
            color: None,
            order_index: 0,
        }
    }

    #[test]
    fn test_item_type_strings() {
        for t in ItemType::ALL {
            assert_eq!(t.as_str().parse::<ItemType>().unwrap(), t);
        }
        assert!("spreadsheet".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_item_json_uses_base64() {
        let item = item(ItemType::Note, None);
        let json = serde_json::to_string(&item).unwrap();

        assert!(json.contains("\"AQIDBA==\""));
        assert!(json.contains("\"note\""));

        let back: VaultItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_trash_snapshot() {
        let folder = FolderId::generate();
        let item = item(ItemType::Photo, Some(folder.clone()));
        let id = item.id.clone();

        let entry = TrashEntry::snapshot(item, Utc::now());

        assert_eq!(entry.original_item_id, id);
        assert_eq!(entry.original_folder_id, Some(folder));
        assert_eq!(entry.item.id, id);
    }

    #[test]
    fn test_filter_matches() {
        let folder = FolderId::generate();
        let mut photo = item(ItemType::Photo, Some(folder.clone()));
        let note = item(ItemType::Note, None);
        photo.starred = true;

        assert!(ItemFilter::All.matches(&note));
        assert!(ItemFilter::ByType(ItemType::Photo).matches(&photo));
        assert!(!ItemFilter::ByType(ItemType::Photo).matches(&note));
        assert!(ItemFilter::InFolder(Some(folder)).matches(&photo));
        assert!(ItemFilter::InFolder(None).matches(&note));
        assert!(!ItemFilter::InFolder(None).matches(&photo));
        assert!(ItemFilter::Starred.matches(&photo));
        assert!(!ItemFilter::Starred.matches(&note));
    }
}
