//! The note collection and its persistence.
//!
//! The whole collection lives in memory as an ordered list and is written
//! back as one JSON array under [`NOTES_KEY`] after every mutation. Newly
//! created notes are prepended; the order is never re-sorted.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::store::{BackendKind, KeyValueStore, StoreError};

pub mod dates;
pub mod legacy;
pub mod markup;

pub const NOTES_KEY: &str = "notes";
pub const DEFAULT_TITLE: &str = "Untitled Note";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// ISO-8601 UTC timestamp, millisecond precision.
    pub last_modified: String,
}

impl Note {
    pub fn modified_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.last_modified, &Rfc3339).ok()
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            DEFAULT_TITLE
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Error)]
pub enum NotesError {
    #[error("failed to read notes from storage")]
    StorageRead(#[source] StoreError),
    #[error("failed to write notes to storage")]
    StorageWrite(#[source] StoreError),
    #[error("persisted notes are malformed")]
    Malformed(#[source] serde_json::Error),
    #[error("serialising notes")]
    Serialize(#[source] serde_json::Error),
}

pub struct NoteRepository {
    store: Box<dyn KeyValueStore>,
    notes: Vec<Note>,
    last_issued_id: i128,
}

impl NoteRepository {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            notes: Vec::new(),
            last_issued_id: 0,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.store.kind()
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn first_id(&self) -> Option<&str> {
        self.notes.first().map(|note| note.id.as_str())
    }

    /// Replaces the in-memory collection with the persisted one.
    ///
    /// Missing data yields an empty collection. Unreadable or malformed data
    /// also leaves the collection empty, but is reported so the caller can
    /// warn the user.
    pub fn load_all(&mut self) -> Result<usize, NotesError> {
        self.notes.clear();
        let raw = self.store.get(NOTES_KEY).map_err(NotesError::StorageRead)?;
        let Some(raw) = raw else {
            tracing::debug!("no persisted notes yet");
            return Ok(0);
        };
        self.notes = serde_json::from_str(&raw).map_err(NotesError::Malformed)?;
        tracing::info!(count = self.notes.len(), backend = %self.store.kind(), "notes loaded");
        Ok(self.notes.len())
    }

    pub fn save_all(&self) -> Result<(), NotesError> {
        let json = serde_json::to_string(&self.notes).map_err(NotesError::Serialize)?;
        self.store
            .set(NOTES_KEY, &json)
            .map_err(NotesError::StorageWrite)?;
        tracing::debug!(count = self.notes.len(), "notes saved");
        Ok(())
    }

    /// Prepends a fresh note and persists the collection.
    ///
    /// The note stays in memory even when the write fails.
    pub fn create(&mut self, now: OffsetDateTime) -> Result<String, NotesError> {
        let id = self.next_id(now);
        self.notes.insert(
            0,
            Note {
                id: id.clone(),
                title: DEFAULT_TITLE.to_string(),
                content: String::new(),
                last_modified: iso_timestamp(now),
            },
        );
        tracing::info!(note_id = %id, "note created");
        self.save_all()?;
        Ok(id)
    }

    /// Overwrites a note's editable fields and persists the collection.
    ///
    /// Returns `Ok(false)` when no note has this id.
    pub fn update(
        &mut self,
        id: &str,
        title: &str,
        content: &str,
        now: OffsetDateTime,
    ) -> Result<bool, NotesError> {
        let Some(note) = self.notes.iter_mut().find(|note| note.id == id) else {
            return Ok(false);
        };
        note.title = normalize_title(title);
        note.content = content.to_string();
        note.last_modified = iso_timestamp(now);
        self.save_all()?;
        Ok(true)
    }

    /// Removes a note and persists the remainder.
    pub fn delete(&mut self, id: &str) -> Result<bool, NotesError> {
        let before = self.notes.len();
        self.notes.retain(|note| note.id != id);
        if self.notes.len() == before {
            return Ok(false);
        }
        tracing::info!(note_id = %id, "note deleted");
        self.save_all()?;
        Ok(true)
    }

    fn next_id(&mut self, now: OffsetDateTime) -> String {
        let mut candidate = (now.unix_timestamp_nanos() / 1_000_000).max(self.last_issued_id + 1);
        while self
            .notes
            .iter()
            .any(|note| note.id == candidate.to_string())
        {
            candidate += 1;
        }
        self.last_issued_id = candidate;
        candidate.to_string()
    }
}

/// Only an empty title takes the default; whitespace is kept as typed.
pub fn normalize_title(title: &str) -> String {
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Formats `dt` in UTC as `2024-03-05T12:00:00.000Z`.
pub fn iso_timestamp(dt: OffsetDateTime) -> String {
    let utc = dt.to_offset(time::UtcOffset::UTC);
    utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
    .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::store::{BackendKind, KeyValueStore, LocalFileStore, StoreError};

    /// Local store wrapper that counts writes and can be told to fail.
    #[derive(Clone)]
    pub struct ProbeStore {
        inner: LocalFileStore,
        pub writes: Arc<AtomicUsize>,
        pub fail_writes: Arc<AtomicBool>,
        pub fail_reads: Arc<AtomicBool>,
    }

    impl ProbeStore {
        pub fn new(inner: LocalFileStore) -> Self {
            Self {
                inner,
                writes: Arc::new(AtomicUsize::new(0)),
                fail_writes: Arc::new(AtomicBool::new(false)),
                fail_reads: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    impl KeyValueStore for ProbeStore {
        fn kind(&self) -> BackendKind {
            self.inner.kind()
        }

        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Read {
                    backend: BackendKind::Local,
                    key: key.to_string(),
                    message: "injected failure".into(),
                });
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Write {
                    backend: BackendKind::Local,
                    key: key.to_string(),
                    message: "injected failure".into(),
                });
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }
}
