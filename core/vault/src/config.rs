//! Vault settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use hushvault_common::{Error, Result};
use hushvault_crypto::KdfParams;

/// Tunables for a vault instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSettings {
    /// Argon2id parameters for the password verifier.
    pub kdf_params: KdfParams,
    /// Time in background after which the session is destroyed.
    pub auto_lock_timeout: Duration,
    /// Age past which trash entries may be purged.
    pub trash_retention: Duration,
    /// Deepest allowed folder depth (root folders are depth 0). May be
    /// lowered but never raised above the default.
    pub max_folder_depth: u8,
    /// How often the retention sweeper runs.
    pub purge_interval: Duration,
}

impl VaultSettings {
    pub const DEFAULT_AUTO_LOCK_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_TRASH_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);
    pub const DEFAULT_MAX_FOLDER_DEPTH: u8 = 3;
    pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

    /// Check the settings are usable.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a zero purge interval, a folder depth
    /// above [`Self::DEFAULT_MAX_FOLDER_DEPTH`], or a duration too large to
    /// do date arithmetic with.
    pub fn validate(&self) -> Result<()> {
        if self.max_folder_depth > Self::DEFAULT_MAX_FOLDER_DEPTH {
            return Err(Error::InvalidInput(format!(
                "max_folder_depth must be at most {}",
                Self::DEFAULT_MAX_FOLDER_DEPTH
            )));
        }
        if self.purge_interval.is_zero() {
            return Err(Error::InvalidInput("purge_interval must be non-zero".to_string()));
        }
        for (name, value) in [
            ("auto_lock_timeout", self.auto_lock_timeout),
            ("trash_retention", self.trash_retention),
        ] {
            chrono::Duration::from_std(value)
                .map_err(|_| Error::InvalidInput(format!("{} is too large", name)))?;
        }
        Ok(())
    }

    /// Serialize settings to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub(crate) fn auto_lock_timeout(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.auto_lock_timeout).unwrap_or(chrono::Duration::MAX)
    }

    pub(crate) fn trash_retention(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.trash_retention).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            kdf_params: KdfParams::default(),
            auto_lock_timeout: Self::DEFAULT_AUTO_LOCK_TIMEOUT,
            trash_retention: Self::DEFAULT_TRASH_RETENTION,
            max_folder_depth: Self::DEFAULT_MAX_FOLDER_DEPTH,
            purge_interval: Self::DEFAULT_PURGE_INTERVAL,
        }
    }
}
