//! Vault-wide statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::manager::VaultManager;
use hushvault_common::Result;
use hushvault_storage::{ItemFilter, ItemType};

/// Aggregate counts for capacity display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStats {
    /// Live items per type. Every type is present, possibly with zero.
    pub counts: BTreeMap<ItemType, usize>,
    pub total_items: usize,
    /// Sum of encrypted content sizes, excluding thumbnails and metadata.
    pub total_encrypted_bytes: u64,
    pub starred: usize,
    pub folders: usize,
    pub trash: usize,
}

impl VaultStats {
    pub fn count(&self, item_type: ItemType) -> usize {
        self.counts.get(&item_type).copied().unwrap_or(0)
    }
}

impl VaultManager {
    /// Compute statistics with a full scan.
    pub async fn get_vault_stats(&self) -> Result<VaultStats> {
        let _session = self.active_session().await?;

        let items = self.store.list_items(&ItemFilter::All).await?;
        let mut stats = VaultStats {
            counts: ItemType::ALL.iter().map(|t| (*t, 0)).collect(),
            total_items: items.len(),
            folders: self.store.list_folders().await?.len(),
            trash: self.store.list_trash().await?.len(),
            ..Default::default()
        };

        for item in &items {
            *stats.counts.entry(item.item_type).or_default() += 1;
            stats.total_encrypted_bytes += item.encrypted_content.len() as u64;
            if item.starred {
                stats.starred += 1;
            }
        }
        Ok(stats)
    }
}
