//! Single-note notepad schema used by the first release of the app.
//!
//! One title and one body under two separate keys. It does not share data
//! with the multi-note collection stored under [`super::NOTES_KEY`].

use crate::store::{KeyValueStore, StoreError};

pub const TITLE_KEY: &str = "noteTitle";
pub const CONTENT_KEY: &str = "noteContent";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyNote {
    pub title: String,
    pub content: String,
}

impl LegacyNote {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }
}

pub struct LegacyNotepad<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> LegacyNotepad<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<LegacyNote, StoreError> {
        Ok(LegacyNote {
            title: self.store.get(TITLE_KEY)?.unwrap_or_default(),
            content: self.store.get(CONTENT_KEY)?.unwrap_or_default(),
        })
    }

    pub fn save(&self, note: &LegacyNote) -> Result<(), StoreError> {
        self.store.set(TITLE_KEY, &note.title)?;
        self.store.set(CONTENT_KEY, &note.content)?;
        tracing::info!("legacy note saved");
        Ok(())
    }

    /// Starts a new legacy note by forgetting the stored one.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(TITLE_KEY)?;
        self.store.remove(CONTENT_KEY)?;
        Ok(())
    }
}
