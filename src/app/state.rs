use std::time::Instant;

use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::editor::{AutoSaveStatus, EditorState};
use crate::notes::{iso_timestamp, NoteRepository, NotesError};
use crate::richtext::{Document, FormatKind};
use crate::search::{build_entries, ListEntry, ListView};
use crate::toast::ToastQueue;

pub const LOAD_FAILED: &str = "Error loading notes. Using empty notes list.";
pub const SAVE_FAILED: &str = "Error saving note. Please try again.";
pub const NOTE_CREATED: &str = "New note created";
pub const NOTE_SAVED: &str = "Note saved";
pub const NOTE_DELETED: &str = "Note deleted";
pub const NOTHING_TO_DELETE: &str = "No note selected to delete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    List,
    Title,
    Content,
}

impl FocusPane {
    pub fn next(self, list_visible: bool) -> Self {
        match self {
            FocusPane::List => FocusPane::Title,
            FocusPane::Title => FocusPane::Content,
            FocusPane::Content if list_visible => FocusPane::List,
            FocusPane::Content => FocusPane::Title,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteNoteOverlay {
    pub note_id: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    DeleteNote(DeleteNoteOverlay),
}

/// The whole editing session: the collection, the active note, the list
/// pane and pending notifications.
pub struct AppState {
    repo: NoteRepository,
    editor: EditorState,
    list: ListView,
    toasts: ToastQueue,
    toolbar: Vec<FormatKind>,
    flush_on_switch: bool,
    preview_chars: usize,
    pub focus: FocusPane,
    search_active: bool,
    overlay: Option<OverlayState>,
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(repo: NoteRepository, config: &AppConfig, toolbar: Vec<FormatKind>) -> Self {
        Self {
            repo,
            editor: EditorState::new(&config.auto_save),
            list: ListView::new(config.list.start_visible),
            toasts: ToastQueue::new(config.toasts.duration()),
            toolbar,
            flush_on_switch: config.auto_save.flush_on_switch,
            preview_chars: config.list.preview_chars,
            focus: FocusPane::Title,
            search_active: false,
            overlay: None,
            status_message: None,
        }
    }

    /// Loads the collection and opens the first note, creating one when the
    /// collection is empty.
    pub fn initialize(&mut self, now: Instant) {
        // Loading a note hides the list, so the configured visibility is
        // restored afterwards.
        let start_visible = self.list.is_visible();
        if let Err(err) = self.repo.load_all() {
            tracing::warn!(?err, "falling back to an empty collection");
            self.toasts.error(LOAD_FAILED, now);
        }
        match self.repo.first_id().map(str::to_string) {
            Some(id) => {
                self.load_note(&id);
            }
            None => self.new_note(now),
        }
        if start_visible {
            self.list.show();
            if let Some(id) = self.editor.current_note_id().map(str::to_string) {
                let entries = self.list_entries();
                self.list.focus_entry(&entries, &id);
            }
        }
        tracing::info!(
            notes = self.repo.len(),
            backend = %self.repo.backend_kind(),
            "session initialised"
        );
    }

    pub fn repo(&self) -> &NoteRepository {
        &self.repo
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListView {
        &mut self.list
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn toolbar(&self) -> &[FormatKind] {
        &self.toolbar
    }

    pub fn autosave_status(&self) -> AutoSaveStatus {
        self.editor.autosave().status()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn new_note(&mut self, now: Instant) {
        self.flush_before_switch(now);
        let id = match self.repo.create(OffsetDateTime::now_utc()) {
            Ok(id) => id,
            Err(err) => {
                self.report_write_failure(&err, now);
                // The note exists in memory even though it was not persisted.
                match self.repo.first_id() {
                    Some(id) => id.to_string(),
                    None => return,
                }
            }
        };
        self.load_note(&id);
        self.focus = FocusPane::Title;
        self.toasts.success(NOTE_CREATED, now);
    }

    /// Writes the editor's title and content into the active note.
    ///
    /// Returns `true` when the collection was persisted. Without an active
    /// note this does nothing.
    pub fn save_current_note(&mut self, manual: bool, now: Instant) -> bool {
        let Some(id) = self.editor.current_note_id().map(str::to_string) else {
            return false;
        };
        if manual {
            self.editor.autosave_mut().cancel();
        }
        let (title, content) = self.editor.snapshot();
        let stamp = OffsetDateTime::now_utc();
        match self.repo.update(&id, &title, &content, stamp) {
            Ok(true) => {
                self.editor.mark_saved(iso_timestamp(stamp), stamp);
                tracing::debug!(note_id = %id, manual, "note saved");
                if manual {
                    self.toasts.success(NOTE_SAVED, now);
                }
                true
            }
            Ok(false) => {
                tracing::warn!(note_id = %id, "active note missing from collection");
                false
            }
            Err(err) => {
                self.editor.autosave_mut().record_error(err.to_string());
                self.report_write_failure(&err, now);
                false
            }
        }
    }

    /// Opens the confirmation overlay for deleting the active note.
    pub fn request_delete(&mut self, now: Instant) {
        let Some(id) = self.editor.current_note_id() else {
            self.toasts.error(NOTHING_TO_DELETE, now);
            return;
        };
        let title = self
            .repo
            .get(id)
            .map(|note| note.display_title().to_string())
            .unwrap_or_default();
        self.overlay = Some(OverlayState::DeleteNote(DeleteNoteOverlay {
            note_id: id.to_string(),
            title,
        }));
    }

    /// Deletes the active note and activates the first remaining one.
    pub fn delete_current_note(&mut self, now: Instant) {
        self.overlay = None;
        let Some(id) = self.editor.current_note_id().map(str::to_string) else {
            self.toasts.error(NOTHING_TO_DELETE, now);
            return;
        };
        if self.flush_on_switch {
            self.editor.autosave_mut().cancel();
        }
        if let Err(err) = self.repo.delete(&id) {
            self.report_write_failure(&err, now);
        }
        match self.repo.first_id().map(str::to_string) {
            Some(next) => {
                self.load_note(&next);
            }
            None => self.editor.clear(),
        }
        let len = self.list_entries().len();
        self.list.clamp(len);
        self.toasts.success(NOTE_DELETED, now);
    }

    /// Switches the editor to another note.
    pub fn select_note(&mut self, id: &str, now: Instant) -> bool {
        if self.repo.get(id).is_none() {
            return false;
        }
        if !self.editor.is_active(id) {
            self.flush_before_switch(now);
        }
        self.load_note(id)
    }

    /// Direct load, no debounce involved. Unknown ids are ignored.
    pub fn load_note(&mut self, id: &str) -> bool {
        let Some(note) = self.repo.get(id) else {
            return false;
        };
        self.editor.load(note);
        tracing::debug!(note_id = %id, "note loaded");
        self.list.hide();
        if self.focus == FocusPane::List {
            self.focus = FocusPane::Content;
        }
        true
    }

    fn flush_before_switch(&mut self, now: Instant) {
        if self.flush_on_switch && self.editor.autosave().is_pending() {
            self.editor.autosave_mut().cancel();
            self.save_current_note(false, now);
        }
    }

    /// Saves a pending autosave immediately, used before exiting.
    pub fn flush_pending(&mut self, now: Instant) {
        if self.editor.autosave().is_pending() {
            self.editor.autosave_mut().cancel();
            self.save_current_note(false, now);
        }
    }

    fn report_write_failure(&mut self, err: &NotesError, now: Instant) {
        tracing::error!(?err, "persisting notes failed");
        self.toasts.error(SAVE_FAILED, now);
    }

    pub fn set_search(&mut self, query: &str) {
        self.list.set_query(query);
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn begin_search(&mut self) {
        self.search_active = true;
        self.list.show();
        self.focus = FocusPane::List;
    }

    pub fn finish_search(&mut self) {
        self.search_active = false;
    }

    pub fn push_search_char(&mut self, ch: char) {
        let mut query = self.list.query().to_string();
        query.push(ch);
        self.set_search(&query);
    }

    pub fn pop_search_char(&mut self) {
        let mut query = self.list.query().to_string();
        query.pop();
        self.set_search(&query);
    }

    pub fn toggle_list_view(&mut self) {
        self.list.toggle();
        if self.list.is_visible() {
            if let Some(id) = self.editor.current_note_id().map(str::to_string) {
                let entries = self.list_entries();
                self.list.focus_entry(&entries, &id);
            }
            self.focus = FocusPane::List;
        } else if self.focus == FocusPane::List {
            self.focus = FocusPane::Content;
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next(self.list.is_visible());
        match self.focus {
            FocusPane::Content => self.editor_navigate(|doc| {
                doc.focus();
                true
            }),
            _ => self.editor_navigate(|doc| {
                doc.blur();
                true
            }),
        };
    }

    pub fn input_title_char(&mut self, ch: char, now: Instant) {
        self.editor.push_title_char(ch, now);
    }

    pub fn title_backspace(&mut self, now: Instant) -> bool {
        self.editor.pop_title_char(now)
    }

    pub fn set_title(&mut self, title: &str, now: Instant) -> bool {
        self.editor.set_title(title, now)
    }

    pub fn edit_content<F>(&mut self, now: Instant, edit: F) -> bool
    where
        F: FnOnce(&mut Document) -> bool,
    {
        self.editor.edit(now, edit)
    }

    pub fn editor_navigate<F>(&mut self, navigate: F) -> bool
    where
        F: FnOnce(&mut Document) -> bool,
    {
        self.editor.navigate(navigate)
    }

    pub fn apply_format(&mut self, kind: FormatKind, now: Instant) -> bool {
        let applied = self.editor.apply_format(kind, now);
        if !applied {
            tracing::debug!(%kind, "format ignored without a selection");
        }
        applied
    }

    /// Fires a due autosave and expires old toasts.
    pub fn tick(&mut self, now: Instant) {
        self.toasts.prune(now);
        if self.editor.autosave_mut().poll(now) {
            self.save_current_note(false, now);
        }
    }

    pub fn list_entries(&self) -> Vec<ListEntry> {
        build_entries(
            self.repo.notes(),
            self.list.query(),
            self.preview_chars,
            self.editor.current_note_id(),
        )
    }

    pub fn word_count(&self) -> usize {
        self.editor.word_count()
    }

    pub fn last_saved_label(&self) -> String {
        self.editor.last_saved_label()
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }
}
