//! Key/value persistence backends.
//!
//! Everything the app persists goes through [`KeyValueStore`]: a string key
//! mapped to a string value. Two backends exist, chosen once at startup by
//! [`open`]: an SQLite table (the native store) and a JSON file (the local
//! fallback). Callers only ever see the trait.

use std::path::PathBuf;

use strum::Display;
use thiserror::Error;

use crate::config::{BackendChoice, StorageOptions};

mod local;
mod native;
mod schema;

pub use local::LocalFileStore;
pub use native::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    Native,
    Local,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("opening {backend} store at {path}: {message}")]
    Open {
        backend: BackendKind,
        path: PathBuf,
        message: String,
    },
    #[error("reading `{key}` from {backend} store: {message}")]
    Read {
        backend: BackendKind,
        key: String,
        message: String,
    },
    #[error("writing `{key}` to {backend} store: {message}")]
    Write {
        backend: BackendKind,
        key: String,
        message: String,
    },
}

pub trait KeyValueStore: Send {
    fn kind(&self) -> BackendKind;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub enum StoreBackend {
    Native(SqliteStore),
    Local(LocalFileStore),
}

impl KeyValueStore for StoreBackend {
    fn kind(&self) -> BackendKind {
        match self {
            StoreBackend::Native(store) => store.kind(),
            StoreBackend::Local(store) => store.kind(),
        }
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            StoreBackend::Native(store) => store.get(key),
            StoreBackend::Local(store) => store.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            StoreBackend::Native(store) => store.set(key, value),
            StoreBackend::Local(store) => store.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            StoreBackend::Native(store) => store.remove(key),
            StoreBackend::Local(store) => store.remove(key),
        }
    }
}

/// Selects and opens the backend for this process.
///
/// `Auto` probes the native store first and falls back to the local file
/// when the database cannot be opened.
pub fn open(options: &StorageOptions) -> Result<StoreBackend, StoreError> {
    match options.backend {
        BackendChoice::Native => SqliteStore::open(options).map(StoreBackend::Native),
        BackendChoice::Local => {
            LocalFileStore::open(&options.local_store_path).map(StoreBackend::Local)
        }
        BackendChoice::Auto => match SqliteStore::open(options) {
            Ok(store) => {
                tracing::info!(path = %options.database_path.display(), "using native store");
                Ok(StoreBackend::Native(store))
            }
            Err(err) => {
                tracing::warn!(?err, "native store unavailable, falling back to local file");
                let store = LocalFileStore::open(&options.local_store_path)?;
                tracing::info!(path = %options.local_store_path.display(), "using local store");
                Ok(StoreBackend::Local(store))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    fn options(root: &TempDir, backend: BackendChoice) -> StorageOptions {
        StorageOptions {
            backend,
            database_path: root.path().join("data/notes.db"),
            local_store_path: root.path().join("data/notes.json"),
            ..StorageOptions::default()
        }
    }

    #[test]
    fn auto_prefers_native_store() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = open(&options(&temp, BackendChoice::Auto))?;
        assert_eq!(store.kind(), BackendKind::Native);
        Ok(())
    }

    #[test]
    fn auto_falls_back_to_local_when_database_unusable() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let opts = options(&temp, BackendChoice::Auto);
        // A directory where the database file should be cannot be opened.
        fs::create_dir_all(&opts.database_path)?;

        let store = open(&opts)?;
        assert_eq!(store.kind(), BackendKind::Local);
        store.set("notes", "[]")?;
        assert_eq!(store.get("notes")?.as_deref(), Some("[]"));
        Ok(())
    }

    #[test]
    fn explicit_native_surfaces_open_failure() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let opts = options(&temp, BackendChoice::Native);
        fs::create_dir_all(&opts.database_path)?;

        assert_matches!(open(&opts), Err(StoreError::Open { .. }));
        Ok(())
    }

    #[test]
    fn both_backends_round_trip_identical_values() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let value = "[{\"title\":\"Ünïcode ✓\",\"content\":\"<b>x</b>\\n\"}]";
        for choice in [BackendChoice::Native, BackendChoice::Local] {
            let store = open(&options(&temp, choice))?;
            store.set("notes", value)?;
            assert_eq!(store.get("notes")?.as_deref(), Some(value), "{choice}");
        }
        Ok(())
    }
}
