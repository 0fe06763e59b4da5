//! Editing session for the active note: title buffer, rich-text surface and
//! the autosave timer.

use std::time::Instant;

use crate::config::AutoSaveConfig;
use crate::notes::{dates, Note};
use crate::richtext::{self, Document, FormatIndicators, FormatKind};

pub mod autosave;

pub use autosave::{AutoSaveStatus, AutoSaveTimer, TimerState};

#[derive(Debug)]
pub struct EditorState {
    current_note_id: Option<String>,
    title: String,
    document: Document,
    /// Raw `lastModified` of the last load or save.
    last_saved: Option<String>,
    autosave: AutoSaveTimer,
}

impl EditorState {
    pub fn new(config: &AutoSaveConfig) -> Self {
        Self {
            current_note_id: None,
            title: String::new(),
            document: Document::new(),
            last_saved: None,
            autosave: AutoSaveTimer::new(config),
        }
    }

    pub fn current_note_id(&self) -> Option<&str> {
        self.current_note_id.as_deref()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.current_note_id.as_deref() == Some(id)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn autosave(&self) -> &AutoSaveTimer {
        &self.autosave
    }

    pub fn autosave_mut(&mut self) -> &mut AutoSaveTimer {
        &mut self.autosave
    }

    /// Shows `note` in the editor. The autosave timer is left alone.
    pub fn load(&mut self, note: &Note) {
        self.current_note_id = Some(note.id.clone());
        self.title = note.title.clone();
        self.document = richtext::from_markup(&note.content);
        self.last_saved = Some(note.last_modified.clone());
    }

    pub fn clear(&mut self) {
        self.current_note_id = None;
        self.title.clear();
        self.document = Document::new();
        self.last_saved = None;
    }

    /// Title and serialized content as they should be persisted.
    pub fn snapshot(&self) -> (String, String) {
        (self.title.clone(), richtext::to_markup(&self.document))
    }

    pub fn mark_saved(&mut self, last_modified: String, at: time::OffsetDateTime) {
        self.last_saved = Some(last_modified);
        self.autosave.record_saved(at);
    }

    pub fn set_title(&mut self, title: &str, now: Instant) -> bool {
        if self.title == title {
            return false;
        }
        self.title = title.to_string();
        self.autosave.schedule(now);
        true
    }

    pub fn push_title_char(&mut self, ch: char, now: Instant) {
        self.title.push(ch);
        self.autosave.schedule(now);
    }

    pub fn pop_title_char(&mut self, now: Instant) -> bool {
        if self.title.pop().is_none() {
            return false;
        }
        self.autosave.schedule(now);
        true
    }

    /// Runs a content edit; re-arms autosave when it changed anything.
    pub fn edit<F>(&mut self, now: Instant, edit: F) -> bool
    where
        F: FnOnce(&mut Document) -> bool,
    {
        let changed = edit(&mut self.document);
        if changed {
            self.autosave.schedule(now);
        }
        changed
    }

    /// Caret and selection changes: never a qualifying event.
    pub fn navigate<F>(&mut self, navigate: F) -> bool
    where
        F: FnOnce(&mut Document) -> bool,
    {
        navigate(&mut self.document)
    }

    pub fn apply_format(&mut self, kind: FormatKind, now: Instant) -> bool {
        self.edit(now, |doc| kind.apply(doc))
    }

    pub fn indicators(&self) -> FormatIndicators {
        FormatIndicators::capture(&self.document)
    }

    pub fn word_count(&self) -> usize {
        self.document.word_count()
    }

    pub fn last_saved_label(&self) -> String {
        match &self.last_saved {
            Some(raw) => format!("Last saved: {}", dates::datetime_label(raw)),
            None => "Last saved: Never".to_string(),
        }
    }
}
