//! Filtering and presentation of the note list.

use crate::notes::{dates, markup, Note};

/// Notes whose title or raw content contains `query`, ignoring case.
///
/// Content is matched as stored, tags included. Repository order is kept and
/// an empty query matches everything.
pub fn filter_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    if query.is_empty() {
        return notes.iter().collect();
    }
    let needle = query.to_lowercase();
    notes
        .iter()
        .filter(|note| {
            note.title.to_lowercase().contains(&needle)
                || note.content.to_lowercase().contains(&needle)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub date_label: String,
    pub active: bool,
}

impl ListEntry {
    pub fn from_note(note: &Note, preview_chars: usize, active_id: Option<&str>) -> Self {
        Self {
            id: note.id.clone(),
            title: note.display_title().to_string(),
            preview: markup::preview(&note.content, preview_chars),
            date_label: dates::date_label(&note.last_modified),
            active: active_id == Some(note.id.as_str()),
        }
    }
}

pub fn build_entries(
    notes: &[Note],
    query: &str,
    preview_chars: usize,
    active_id: Option<&str>,
) -> Vec<ListEntry> {
    filter_notes(notes, query)
        .into_iter()
        .map(|note| ListEntry::from_note(note, preview_chars, active_id))
        .collect()
}

/// Visibility, query text and cursor of the list pane.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    query: String,
    visible: bool,
    cursor: usize,
}

impl ListView {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.cursor = 0;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let max = len as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }

    /// Puts the cursor on `id` when it is listed.
    pub fn focus_entry(&mut self, entries: &[ListEntry], id: &str) {
        if let Some(index) = entries.iter().position(|entry| entry.id == id) {
            self.cursor = index;
        }
    }

    pub fn clamp(&mut self, len: usize) {
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, title: &str, content: &str) -> Note {
        Note {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            last_modified: "2024-03-05T12:00:00.000Z".into(),
        }
    }

    fn sample() -> Vec<Note> {
        vec![
            note("3", "Groceries", "<ul><li>milk</li></ul>"),
            note("2", "Taxes", "<p>forms</p>"),
            note("1", "Meeting Notes", "<p><b>Discuss</b> Q3</p>"),
        ]
    }

    #[test]
    fn filter_matches_title_case_insensitively() {
        let notes = sample();
        let ids: Vec<_> = filter_notes(&notes, "gro").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
        let ids: Vec<_> = filter_notes(&notes, "DISCUSS").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn empty_query_keeps_everything_in_order() {
        let notes = sample();
        let ids: Vec<_> = filter_notes(&notes, "").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn raw_markup_is_searchable() {
        let notes = sample();
        let ids: Vec<_> = filter_notes(&notes, "<li>").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
        assert!(filter_notes(&notes, "pineapple").is_empty());
    }

    #[test]
    fn entries_carry_preview_and_active_flag() {
        let mut notes = sample();
        notes.push(Note {
            last_modified: "not a date".into(),
            ..note("0", "", "<p>x</p>")
        });
        let entries = build_entries(&notes, "", 50, Some("1"));

        assert_eq!(entries[2].preview, "Discuss Q3");
        assert!(entries[2].active);
        assert!(!entries[0].active);
        assert_eq!(entries[3].title, "Untitled Note");
        assert_eq!(entries[3].date_label, dates::INVALID_DATE);
    }

    #[test]
    fn list_view_cursor_stays_in_bounds() {
        let mut view = ListView::new(true);
        view.move_cursor(5, 3);
        assert_eq!(view.cursor(), 2);
        view.move_cursor(-9, 3);
        assert_eq!(view.cursor(), 0);
        view.toggle();
        assert!(!view.is_visible());
        view.set_query("tax");
        assert_eq!(view.query(), "tax");
    }
}
