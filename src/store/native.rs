use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use super::{schema, BackendKind, KeyValueStore, StoreError};
use crate::config::StorageOptions;

/// SQLite-backed store. Opens a fresh connection per operation.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    wal_autocheckpoint: u32,
}

impl SqliteStore {
    pub fn open(options: &StorageOptions) -> Result<Self, StoreError> {
        let db_path = &options.database_path;
        let open_error = |message: String| StoreError::Open {
            backend: BackendKind::Native,
            path: db_path.clone(),
            message,
        };
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| open_error(format!("creating {}: {err}", parent.display())))?;
        }
        let store = Self {
            db_path: Arc::new(db_path.clone()),
            wal_autocheckpoint: options.wal_autocheckpoint,
        };
        let conn = store.connect().map_err(|err| open_error(err.to_string()))?;
        schema::apply(&conn).map_err(|err| open_error(err.to_string()))?;
        Ok(store)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, self.wal_autocheckpoint)?;
        Ok(conn)
    }

    fn with_connection<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }
}

impl KeyValueStore for SqliteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .map_err(|err| StoreError::Read {
            backend: BackendKind::Native,
            key: key.to_string(),
            message: err.to_string(),
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )
        })
        .map(|_| ())
        .map_err(|err| StoreError::Write {
            backend: BackendKind::Native,
            key: key.to_string(),
            message: err.to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_connection(|conn| conn.execute("DELETE FROM kv_store WHERE key = ?1", [key]))
            .map(|_| ())
            .map_err(|err| StoreError::Write {
                backend: BackendKind::Native,
                key: key.to_string(),
                message: err.to_string(),
            })
    }
}

fn prepare_connection(conn: &Connection, wal_autocheckpoint: u32) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "wal_autocheckpoint", wal_autocheckpoint.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_store() -> anyhow::Result<(TempDir, SqliteStore)> {
        let temp = TempDir::new()?;
        let options = StorageOptions {
            database_path: temp.path().join("data/notes.db"),
            ..StorageOptions::default()
        };
        let store = SqliteStore::open(&options)?;
        Ok((temp, store))
    }

    #[test]
    fn missing_key_reads_as_none() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        assert_eq!(store.get("notes")?, None);
        Ok(())
    }

    #[test]
    fn set_overwrites_and_is_visible_to_other_handles() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        store.set("notes", "[1]")?;
        store.set("notes", "[1,2]")?;

        let other = store.clone();
        assert_eq!(other.get("notes")?.as_deref(), Some("[1,2]"));
        Ok(())
    }

    #[test]
    fn remove_deletes_only_the_named_key() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        store.set("noteTitle", "Draft")?;
        store.set("noteContent", "Body")?;
        store.remove("noteTitle")?;
        store.remove("never-set")?;

        assert_eq!(store.get("noteTitle")?, None);
        assert_eq!(store.get("noteContent")?.as_deref(), Some("Body"));
        Ok(())
    }
}
