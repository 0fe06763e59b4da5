use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use super::{BackendKind, KeyValueStore, StoreError};

const TMP_EXTENSION: &str = "json.tmp";

/// JSON-file store: one object mapping keys to string values.
///
/// The whole file is rewritten on every `set`, through a temporary file and
/// a rename so a crash never leaves a half-written map behind.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    path: Arc<PathBuf>,
}

type Entries = IndexMap<String, String>;

impl LocalFileStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::Open {
                backend: BackendKind::Local,
                path: path.to_path_buf(),
                message: format!("creating {}: {err}", parent.display()),
            })?;
        }
        if path.is_dir() {
            return Err(StoreError::Open {
                backend: BackendKind::Local,
                path: path.to_path_buf(),
                message: "path is a directory".into(),
            });
        }
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, String> {
        let raw = match fs::read_to_string(&*self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(err) => return Err(format!("reading {}: {err}", self.path.display())),
        };
        if raw.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&raw).map_err(|err| format!("parsing {}: {err}", self.path.display()))
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), String> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|err| format!("serialising store: {err}"))?;
        let tmp_path = self.path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .map_err(|err| format!("writing {}: {err}", tmp_path.display()))?;
        fs::rename(&tmp_path, &*self.path)
            .map_err(|err| format!("replacing {}: {err}", self.path.display()))?;
        Ok(())
    }

    fn update<F>(&self, key: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Entries) -> bool,
    {
        let write_error = |message: String| StoreError::Write {
            backend: BackendKind::Local,
            key: key.to_string(),
            message,
        };
        let mut entries = self.read_entries().map_err(write_error)?;
        if !f(&mut entries) {
            return Ok(());
        }
        self.write_entries(&entries).map_err(write_error)
    }
}

impl KeyValueStore for LocalFileStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.read_entries().map_err(|message| StoreError::Read {
            backend: BackendKind::Local,
            key: key.to_string(),
            message,
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(key, |entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(key, |entries| entries.shift_remove(key).is_some())
    }
}
