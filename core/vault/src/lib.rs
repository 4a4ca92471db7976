//! Vault lifecycle for HushVault.
//!
//! This module provides:
//! - Vault creation, unlock, lock and auto-lock
//! - Encrypted item, folder and trash operations
//! - Session handling with secure key management
//! - Periodic trash retention
//!
//! # Architecture
//! [`VaultManager`] sits between the embedding app and the key custodian
//! and record store. It owns the only copy of the session key and encrypts
//! every item before the store sees it.

pub mod config;
pub mod folders;
pub mod items;
pub mod manager;
pub mod metadata;
pub mod retention;
pub mod session;
pub mod stats;
pub mod trash;

pub use config::VaultSettings;
pub use items::DecryptedItem;
pub use manager::VaultManager;
pub use metadata::VaultMetadata;
pub use retention::RetentionSweeper;
pub use session::{SessionHandle, SessionState, VaultSession};
pub use stats::VaultStats;
