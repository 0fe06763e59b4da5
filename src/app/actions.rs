use std::time::Instant;

use crate::richtext::FormatKind;

use super::state::AppState;

/// User intents that reach the session from the surface, independent of the
/// key or command that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceAction {
    NewNote,
    SaveNote,
    /// Confirmed deletion of the active note.
    DeleteNote,
    Search(String),
    SelectNote(String),
    ApplyFormat(FormatKind),
    ToggleListView,
}

impl AppState {
    pub fn dispatch(&mut self, action: SurfaceAction, now: Instant) {
        tracing::trace!(?action, "dispatch");
        match action {
            SurfaceAction::NewNote => self.new_note(now),
            SurfaceAction::SaveNote => {
                self.save_current_note(true, now);
            }
            SurfaceAction::DeleteNote => self.delete_current_note(now),
            SurfaceAction::Search(query) => self.set_search(&query),
            SurfaceAction::SelectNote(id) => {
                if !self.select_note(&id, now) {
                    tracing::warn!(note_id = %id, "selected note no longer exists");
                }
            }
            SurfaceAction::ApplyFormat(kind) => {
                self.apply_format(kind, now);
            }
            SurfaceAction::ToggleListView => self.toggle_list_view(),
        }
    }
}
