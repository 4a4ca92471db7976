//! Vault record persistence for HushVault.
//!
//! This module provides a trait-based interface over the encrypted record
//! store, plus an in-memory backend for tests and a SQLite backend for
//! devices.
//!
//! # Design Principles
//! - Stores never see keys or plaintext, only ciphertext and titles
//! - Async operations: the vault manager awaits every store call
//! - Moves into and out of the trash are atomic
//! - Unified error semantics: backend failures surface as `Storage` errors

pub mod memory;
pub mod records;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use records::{ItemFilter, ItemType, TrashEntry, VaultFolder, VaultItem};
pub use sqlite::SqliteStore;
pub use store::VaultStore;
