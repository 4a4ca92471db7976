//! Type-specific item metadata.
//!
//! Metadata is serialized and encrypted as a whole; the store only ever
//! sees the ciphertext.

use serde::{Deserialize, Serialize};

use hushvault_common::{Error, Result};
use hushvault_storage::ItemType;

/// Structured details for an item, one variant per item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultMetadata {
    Photo {
        width: u32,
        height: u32,
        size: u64,
        mime: String,
    },
    Video {
        duration_ms: u64,
        width: u32,
        height: u32,
        size: u64,
        mime: String,
    },
    Document {
        size: u64,
        mime: String,
        page_count: Option<u32>,
    },
    Note {
        word_count: u32,
        is_formatted: bool,
    },
    Password {
        username: Option<String>,
        url: Option<String>,
        /// Strength score, 0 (weakest) to 4.
        strength: u8,
    },
    Audio {
        duration_ms: u64,
        size: u64,
        mime: String,
    },
    Contact {
        phone: Option<String>,
        email: Option<String>,
    },
}

impl VaultMetadata {
    /// Item type this variant belongs to.
    pub fn item_type(&self) -> ItemType {
        match self {
            VaultMetadata::Photo { .. } => ItemType::Photo,
            VaultMetadata::Video { .. } => ItemType::Video,
            VaultMetadata::Document { .. } => ItemType::Document,
            VaultMetadata::Note { .. } => ItemType::Note,
            VaultMetadata::Password { .. } => ItemType::Password,
            VaultMetadata::Audio { .. } => ItemType::Audio,
            VaultMetadata::Contact { .. } => ItemType::Contact,
        }
    }

    /// Reject metadata attached to an item of a different type.
    pub fn ensure_matches(&self, item_type: ItemType) -> Result<()> {
        if self.item_type() != item_type {
            return Err(Error::InvalidInput(format!(
                "{} metadata cannot be attached to a {} item",
                self.item_type(),
                item_type
            )));
        }
        Ok(())
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_correspondence() {
        let note = VaultMetadata::Note {
            word_count: 1,
            is_formatted: false,
        };
        assert_eq!(note.item_type(), ItemType::Note);
        assert!(note.ensure_matches(ItemType::Note).is_ok());
        assert!(matches!(
            note.ensure_matches(ItemType::Photo),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tagged_json() {
        let password = VaultMetadata::Password {
            username: Some("alice".into()),
            url: None,
            strength: 3,
        };
        let bytes = password.to_bytes().unwrap();
        let json = String::from_utf8(bytes.clone()).unwrap();

        assert!(json.contains("\"type\":\"password\""));
        assert_eq!(VaultMetadata::from_bytes(&bytes).unwrap(), password);
    }
}
