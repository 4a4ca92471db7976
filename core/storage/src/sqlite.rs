//! SQLite-backed vault store.
//!
//! Records are stored as JSON documents next to the few columns scans
//! filter on. Byte blobs inside the documents are base64, and every blob is
//! already ciphertext, so the database file itself holds nothing readable
//! beyond titles, ids and timestamps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};

use crate::records::{ItemFilter, TrashEntry, VaultFolder, VaultItem};
use crate::store::{sort_folders, sort_items, sort_trash, VaultStore};
use hushvault_common::{Error, FolderId, ItemId, Result, TrashId};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        item_type TEXT NOT NULL,
        folder_id TEXT,
        starred INTEGER NOT NULL,
        data TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS folders (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS trash (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_items_type ON items(item_type);
    CREATE INDEX IF NOT EXISTS idx_items_folder ON items(folder_id);
"#;

fn db_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Vault store persisted in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a store database.
    ///
    /// # Errors
    /// Returns `Storage` if the database cannot be opened or migrated.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        info!(path = %db_path.as_ref().display(), "Vault store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_one<T: DeserializeOwned>(conn: &Connection, sql: &str, id: &str) -> Result<Option<T>> {
        let data = conn.query_row(sql, params![id], |row| row.get::<_, String>(0));
        match data {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn load_all<T: DeserializeOwned>(
        conn: &Connection,
        sql: &str,
        args: &[&dyn ToSql],
    ) -> Result<Vec<T>> {
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(args, |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row.map_err(db_err)?)?);
        }
        Ok(records)
    }

    fn exists(conn: &Connection, sql: &str, id: &str) -> Result<bool> {
        let count: i64 = conn
            .query_row(sql, params![id], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count > 0)
    }

    fn write_item(conn: &Connection, item: &VaultItem) -> Result<()> {
        let data = serde_json::to_string(item)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO items (id, item_type, folder_id, starred, data)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                item.id.as_str(),
                item.item_type.as_str(),
                item.folder_id.as_ref().map(|f| f.as_str()),
                item.starred as i32,
                data,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn write_folder(conn: &Connection, folder: &VaultFolder) -> Result<()> {
        let data = serde_json::to_string(folder)?;
        conn.execute(
            "INSERT OR REPLACE INTO folders (id, data) VALUES (?1, ?2)",
            params![folder.id.as_str(), data],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl VaultStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert_item(&self, item: &VaultItem) -> Result<()> {
        let conn = self.conn.lock();
        if Self::exists(&conn, "SELECT COUNT(*) FROM items WHERE id = ?1", item.id.as_str())? {
            return Err(Error::AlreadyExists(format!("Item {}", item.id)));
        }
        debug!(item = %item.id, bytes = item.encrypted_content.len(), "Inserting item");
        Self::write_item(&conn, item)
    }

    async fn update_item(&self, item: &VaultItem) -> Result<()> {
        let conn = self.conn.lock();
        if !Self::exists(&conn, "SELECT COUNT(*) FROM items WHERE id = ?1", item.id.as_str())? {
            return Err(Error::NotFound(format!("Item {}", item.id)));
        }
        Self::write_item(&conn, item)
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<VaultItem>> {
        let conn = self.conn.lock();
        Self::load_one(&conn, "SELECT data FROM items WHERE id = ?1", id.as_str())
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<VaultItem>> {
        let conn = self.conn.lock();
        let mut items: Vec<VaultItem> = match filter {
            ItemFilter::All => Self::load_all(&conn, "SELECT data FROM items", &[])?,
            ItemFilter::ByType(t) => Self::load_all(
                &conn,
                "SELECT data FROM items WHERE item_type = ?1",
                &[&t.as_str()],
            )?,
            ItemFilter::InFolder(Some(folder)) => Self::load_all(
                &conn,
                "SELECT data FROM items WHERE folder_id = ?1",
                &[&folder.as_str()],
            )?,
            ItemFilter::InFolder(None) => Self::load_all(
                &conn,
                "SELECT data FROM items WHERE folder_id IS NULL",
                &[],
            )?,
            ItemFilter::Starred => {
                Self::load_all(&conn, "SELECT data FROM items WHERE starred = 1", &[])?
            }
        };
        sort_items(&mut items);
        Ok(items)
    }

    async fn insert_folder(&self, folder: &VaultFolder) -> Result<()> {
        let conn = self.conn.lock();
        if Self::exists(&conn, "SELECT COUNT(*) FROM folders WHERE id = ?1", folder.id.as_str())? {
            return Err(Error::AlreadyExists(format!("Folder {}", folder.id)));
        }
        Self::write_folder(&conn, folder)
    }

    async fn update_folder(&self, folder: &VaultFolder) -> Result<()> {
        let conn = self.conn.lock();
        if !Self::exists(&conn, "SELECT COUNT(*) FROM folders WHERE id = ?1", folder.id.as_str())? {
            return Err(Error::NotFound(format!("Folder {}", folder.id)));
        }
        Self::write_folder(&conn, folder)
    }

    async fn get_folder(&self, id: &FolderId) -> Result<Option<VaultFolder>> {
        let conn = self.conn.lock();
        Self::load_one(&conn, "SELECT data FROM folders WHERE id = ?1", id.as_str())
    }

    async fn list_folders(&self) -> Result<Vec<VaultFolder>> {
        let conn = self.conn.lock();
        let mut folders: Vec<VaultFolder> = Self::load_all(&conn, "SELECT data FROM folders", &[])?;
        sort_folders(&mut folders);
        Ok(folders)
    }

    async fn delete_folder(&self, id: &FolderId) -> Result<()> {
        let conn = self.conn.lock();
        let removed = conn
            .execute("DELETE FROM folders WHERE id = ?1", params![id.as_str()])
            .map_err(db_err)?;
        if removed == 0 {
            return Err(Error::NotFound(format!("Folder {}", id)));
        }
        Ok(())
    }

    async fn trash_item(&self, entry: &TrashEntry) -> Result<()> {
        let data = serde_json::to_string(entry)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let removed = tx
            .execute(
                "DELETE FROM items WHERE id = ?1",
                params![entry.original_item_id.as_str()],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(Error::NotFound(format!("Item {}", entry.original_item_id)));
        }
        tx.execute(
            "INSERT INTO trash (id, data) VALUES (?1, ?2)",
            params![entry.id.as_str(), data],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        debug!(item = %entry.original_item_id, trash = %entry.id, "Item moved to trash");
        Ok(())
    }

    async fn restore_item(&self, trash_id: &TrashId, item: &VaultItem) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        if Self::exists(&tx, "SELECT COUNT(*) FROM items WHERE id = ?1", item.id.as_str())? {
            return Err(Error::AlreadyExists(format!("Item {}", item.id)));
        }
        let removed = tx
            .execute("DELETE FROM trash WHERE id = ?1", params![trash_id.as_str()])
            .map_err(db_err)?;
        if removed == 0 {
            return Err(Error::NotFound(format!("Trash entry {}", trash_id)));
        }
        Self::write_item(&tx, item)?;

        tx.commit().map_err(db_err)?;
        debug!(item = %item.id, trash = %trash_id, "Item restored from trash");
        Ok(())
    }

    async fn get_trash_entry(&self, id: &TrashId) -> Result<Option<TrashEntry>> {
        let conn = self.conn.lock();
        Self::load_one(&conn, "SELECT data FROM trash WHERE id = ?1", id.as_str())
    }

    async fn list_trash(&self) -> Result<Vec<TrashEntry>> {
        let conn = self.conn.lock();
        let mut entries: Vec<TrashEntry> = Self::load_all(&conn, "SELECT data FROM trash", &[])?;
        sort_trash(&mut entries);
        Ok(entries)
    }

    async fn purge_trash_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let entries: Vec<TrashEntry> = Self::load_all(&tx, "SELECT data FROM trash", &[])?;
        let mut purged = 0;
        for entry in entries.iter().filter(|e| e.deleted_at < cutoff) {
            purged += tx
                .execute("DELETE FROM trash WHERE id = ?1", params![entry.id.as_str()])
                .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(purged)
    }

    async fn clear(&self) -> Result<()> {
        info!("Clearing vault store");
        self.conn
            .lock()
            .execute_batch("DELETE FROM items; DELETE FROM folders; DELETE FROM trash;")
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{folder, item};
    use crate::records::ItemType;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_item_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut note = item(ItemType::Note, None);
        note.encrypted_thumbnail = Some(vec![0xff; 64]);

        store.insert_item(&note).await.unwrap();

        assert_eq!(store.get_item(&note.id).await.unwrap().unwrap(), note);
        assert!(matches!(
            store.insert_item(&note).await,
            Err(Error::AlreadyExists(_))
        ));
        assert!(store.get_item(&ItemId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_item() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.update_item(&item(ItemType::Note, None)).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_filters() {
        let store = SqliteStore::in_memory().unwrap();
        let dir = folder("docs", None);
        store.insert_folder(&dir).await.unwrap();

        let mut photo = item(ItemType::Photo, Some(dir.id.clone()));
        photo.starred = true;
        let note = item(ItemType::Note, None);
        store.insert_item(&photo).await.unwrap();
        store.insert_item(&note).await.unwrap();

        assert_eq!(store.list_items(&ItemFilter::All).await.unwrap().len(), 2);
        assert_eq!(
            store.list_items(&ItemFilter::ByType(ItemType::Photo)).await.unwrap()[0].id,
            photo.id
        );
        assert_eq!(
            store.list_items(&ItemFilter::InFolder(Some(dir.id.clone()))).await.unwrap()[0].id,
            photo.id
        );
        assert_eq!(
            store.list_items(&ItemFilter::InFolder(None)).await.unwrap()[0].id,
            note.id
        );
        assert_eq!(
            store.list_items(&ItemFilter::Starred).await.unwrap()[0].id,
            photo.id
        );
    }

    #[tokio::test]
    async fn test_trash_restore_and_purge() {
        let store = SqliteStore::in_memory().unwrap();
        let now = Utc::now();

        let old = item(ItemType::Note, None);
        let recent = item(ItemType::Note, None);
        store.insert_item(&old).await.unwrap();
        store.insert_item(&recent).await.unwrap();

        let old_entry = TrashEntry::snapshot(old.clone(), now - Duration::days(31));
        let recent_entry = TrashEntry::snapshot(recent.clone(), now - Duration::days(29));
        store.trash_item(&old_entry).await.unwrap();
        store.trash_item(&recent_entry).await.unwrap();

        assert!(store.list_items(&ItemFilter::All).await.unwrap().is_empty());
        assert_eq!(store.list_trash().await.unwrap()[0].id, recent_entry.id);

        let purged = store
            .purge_trash_before(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(purged, 1);

        store
            .restore_item(&recent_entry.id, &recent_entry.item)
            .await
            .unwrap();
        assert!(store.list_trash().await.unwrap().is_empty());
        assert_eq!(store.get_item(&recent.id).await.unwrap().unwrap(), recent);
    }

    #[tokio::test]
    async fn test_trash_missing_item_is_atomic() {
        let store = SqliteStore::in_memory().unwrap();
        let ghost = item(ItemType::Note, None);

        let entry = TrashEntry::snapshot(ghost, Utc::now());
        assert!(matches!(
            store.trash_item(&entry).await,
            Err(Error::NotFound(_))
        ));
        assert!(store.list_trash().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let note = item(ItemType::Note, None);
        let root = folder("root", None);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_item(&note).await.unwrap();
            store.insert_folder(&root).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_item(&note.id).await.unwrap().unwrap(), note);
        assert_eq!(store.list_folders().await.unwrap(), vec![root]);

        store.clear().await.unwrap();
        assert!(store.get_item(&note.id).await.unwrap().is_none());
    }
}
