use ratatui::layout::{Alignment as TextAlign, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use regex::Regex;
use time::{macros::format_description, OffsetDateTime};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::state::{AppState, FocusPane, OverlayState};
use crate::editor::AutoSaveStatus;
use crate::highlight::{build_highlight_regex, split_matches};
use crate::richtext::{self, BlockKind, Document, InlineStyle, Position, Selection};
use crate::search::ListEntry;
use crate::toast::ToastKind;

const BULLET: &str = "• ";

/// Widget state that outlives a single frame.
#[derive(Debug, Default)]
pub struct ViewState {
    pub list: ListState,
    content_scroll: usize,
}

impl ViewState {
    pub fn content_scroll(&self) -> usize {
        self.content_scroll
    }

    /// Moves the content viewport just enough to keep the caret row on screen.
    fn follow_caret(
        &mut self,
        caret_row: Option<usize>,
        total_rows: usize,
        height: usize,
    ) -> usize {
        let height = height.max(1);
        self.content_scroll = self.content_scroll.min(total_rows.saturating_sub(height));
        if let Some(row) = caret_row {
            if row < self.content_scroll {
                self.content_scroll = row;
            } else if row >= self.content_scroll + height {
                self.content_scroll = row + 1 - height;
            }
        }
        self.content_scroll
    }
}

pub fn draw_app(frame: &mut Frame, state: &AppState, view: &mut ViewState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(2)])
        .split(frame.size());

    let editor_area = if state.list().is_visible() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(vertical[0]);
        draw_list(frame, state, &mut view.list, columns[0]);
        columns[1]
    } else {
        vertical[0]
    };

    draw_editor(frame, state, view, editor_area);

    let status = build_status_line(state);
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Gray)),
        vertical[1],
    );

    render_overlay(frame, state);
}

fn focus_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn draw_list(frame: &mut Frame, state: &AppState, list_state: &mut ListState, area: Rect) {
    let entries = state.list_entries();
    let highlight_regex = build_highlight_regex(state.list().query());
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let mut items: Vec<ListItem> = entries
        .iter()
        .map(|entry| list_item(entry, highlight_regex.as_ref(), highlight_style))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No matching notes. Ctrl-n creates one."));
        list_state.select(None);
    } else {
        list_state.select(Some(state.list().cursor().min(entries.len() - 1)));
    }

    let title = if state.list().query().is_empty() {
        format!("Notes ({})", state.repo().len())
    } else {
        format!("Notes ({}/{})", entries.len(), state.repo().len())
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(state.focus == FocusPane::List)),
        )
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::Black))
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn list_item<'a>(entry: &ListEntry, regex: Option<&Regex>, highlight_style: Style) -> ListItem<'a> {
    let mut title_spans = Vec::new();
    if entry.active {
        title_spans.push(Span::styled(
            "● ",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));
    }
    title_spans.extend(highlight_line(
        &entry.title,
        regex,
        highlight_style,
        Style::default().add_modifier(Modifier::BOLD),
    ));
    title_spans.push(Span::styled(
        format!("  {}", entry.date_label),
        Style::default().fg(Color::Gray),
    ));
    let preview = Line::from(highlight_line(
        &entry.preview,
        regex,
        highlight_style,
        Style::default().fg(Color::DarkGray),
    ));
    ListItem::new(vec![Line::from(title_spans), preview])
}

fn draw_editor(frame: &mut Frame, state: &AppState, view: &mut ViewState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(area);

    let editor = state.editor();
    let title_focused = state.focus == FocusPane::Title;
    let title = Paragraph::new(editor.title().to_string()).block(
        Block::default()
            .title("Title")
            .borders(Borders::ALL)
            .border_style(focus_style(title_focused)),
    );
    frame.render_widget(title, rows[0]);

    frame.render_widget(Paragraph::new(toolbar_line(state)), rows[1]);

    let content_focused = state.focus == FocusPane::Content;
    let content_area = rows[2];
    let inner_width = content_area.width.saturating_sub(2) as usize;
    let inner_height = content_area.height.saturating_sub(2) as usize;
    let (body, caret) = if editor.current_note_id().is_none() {
        view.content_scroll = 0;
        let hint = Text::from(Span::styled(
            "No note open. Ctrl-n creates one.",
            Style::default().fg(Color::DarkGray),
        ));
        (hint, None)
    } else {
        let layout = layout_document(editor.document(), inner_width);
        let caret_row = layout.caret.map(|(row, _)| row);
        let scroll = view.follow_caret(caret_row, layout.lines.len(), inner_height);
        let caret = layout
            .caret
            .map(|(row, col)| (row.saturating_sub(scroll), col));
        (Text::from(layout.lines), caret)
    };
    frame.render_widget(Clear, content_area);
    frame.render_widget(
        Paragraph::new(body)
            .scroll((view.content_scroll as u16, 0))
            .block(
                Block::default()
                    .title("Content")
                    .borders(Borders::ALL)
                    .border_style(focus_style(content_focused)),
            ),
        content_area,
    );

    if title_focused && state.overlay().is_none() {
        let col = UnicodeWidthStr::width(editor.title()) as u16;
        let max = rows[0].width.saturating_sub(3);
        frame.set_cursor(rows[0].x + 1 + col.min(max), rows[0].y + 1);
    } else if content_focused && state.overlay().is_none() && inner_width > 0 && inner_height > 0
    {
        if let Some((row, col)) = caret {
            let col = col.min(inner_width - 1) as u16;
            let row = row.min(inner_height - 1) as u16;
            frame.set_cursor(content_area.x + 1 + col, content_area.y + 1 + row);
        }
    }
}

fn toolbar_line(state: &AppState) -> Line<'static> {
    let indicators = state.editor().indicators();
    let mut spans = Vec::with_capacity(state.toolbar().len() * 2);
    for kind in state.toolbar() {
        let style = if indicators.is_active(*kind) {
            Style::default()
                .bg(Color::Yellow)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("[{}]", kind.label()), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn layout_alignment(align: richtext::Alignment) -> TextAlign {
    match align {
        richtext::Alignment::Center => TextAlign::Center,
        richtext::Alignment::Right => TextAlign::Right,
        richtext::Alignment::Left | richtext::Alignment::Justify => TextAlign::Left,
    }
}

fn glyph_style(base: Style, style: InlineStyle, selected: bool) -> Style {
    let mut out = base;
    if style.contains(InlineStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.contains(InlineStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.contains(InlineStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    if selected {
        out = out.add_modifier(Modifier::REVERSED);
    }
    out
}

fn in_selection(selection: Option<Selection>, at: Position) -> bool {
    selection
        .map(|sel| sel.start() <= at && at < sel.end())
        .unwrap_or(false)
}

/// The document as screen rows, wrapped at `width` columns.
pub(crate) struct DocumentLayout {
    pub lines: Vec<Line<'static>>,
    /// Row and column of the caret among `lines`.
    pub caret: Option<(usize, usize)>,
}

#[derive(Default)]
struct RowBuilder {
    spans: Vec<Span<'static>>,
    run: String,
    run_style: Option<Style>,
    width: usize,
}

impl RowBuilder {
    fn indented(indent: usize) -> Self {
        let mut row = Self::default();
        if indent > 0 {
            row.spans.push(Span::raw(" ".repeat(indent)));
            row.width = indent;
        }
        row
    }

    fn push(&mut self, ch: char, style: Style, width: usize) {
        if self.run_style != Some(style) {
            self.flush_run();
            self.run_style = Some(style);
        }
        self.run.push(ch);
        self.width += width;
    }

    fn flush_run(&mut self) {
        if !self.run.is_empty() {
            let style = self.run_style.unwrap_or_default();
            self.spans
                .push(Span::styled(std::mem::take(&mut self.run), style));
        }
    }

    fn finish(mut self, align: TextAlign) -> (Line<'static>, usize) {
        self.flush_run();
        (Line::from(self.spans).alignment(align), self.width)
    }
}

/// Same offset ratatui gives an aligned line inside a paragraph.
fn line_offset(line_width: usize, area_width: usize, align: TextAlign) -> usize {
    match align {
        TextAlign::Center => (area_width / 2).saturating_sub(line_width / 2),
        TextAlign::Right => area_width.saturating_sub(line_width),
        TextAlign::Left => 0,
    }
}

pub(crate) fn layout_document(doc: &Document, width: usize) -> DocumentLayout {
    let width = width.max(1);
    let selection = doc.selection();
    let caret = doc.caret();
    let mut lines = Vec::new();
    let mut caret_at = None;

    for (index, block) in doc.blocks().iter().enumerate() {
        let base = match block.kind {
            BlockKind::Heading => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            _ => Style::default(),
        };
        let align = layout_alignment(block.align);
        let mut row = RowBuilder::default();
        let indent = if block.kind == BlockKind::ListItem {
            row.spans
                .push(Span::styled(BULLET, Style::default().fg(Color::Cyan)));
            row.width = UnicodeWidthStr::width(BULLET);
            row.width
        } else {
            0
        };
        let mut rows = Vec::new();
        // (row within the block, column within that row)
        let mut block_caret = None;
        let caret_offset = caret
            .filter(|pos| pos.block == index)
            .map(|pos| pos.offset.min(block.len()));

        for (offset, glyph) in block.glyphs.iter().enumerate() {
            let glyph_width = glyph.ch.width().unwrap_or(0);
            if glyph_width > 0 && row.width > indent && row.width + glyph_width > width {
                rows.push(std::mem::replace(&mut row, RowBuilder::indented(indent)));
            }
            if caret_offset == Some(offset) {
                block_caret = Some((rows.len(), row.width));
            }
            let selected = in_selection(selection, Position::new(index, offset));
            row.push(glyph.ch, glyph_style(base, glyph.style, selected), glyph_width);
        }
        if caret_offset == Some(block.len()) {
            block_caret = Some((rows.len(), row.width));
        }
        rows.push(row);

        let first_row = lines.len();
        for (row_index, row) in rows.into_iter().enumerate() {
            let (line, line_width) = row.finish(align);
            if let Some((caret_row, caret_col)) = block_caret.filter(|(r, _)| *r == row_index) {
                let col = line_offset(line_width, width, align) + caret_col;
                caret_at = Some((first_row + caret_row, col));
            }
            lines.push(line);
        }
    }

    DocumentLayout {
        lines,
        caret: caret_at,
    }
}

fn build_status_line(state: &AppState) -> Text<'static> {
    let mut spans = vec![
        Span::raw(state.last_saved_label()),
        Span::raw(" | Words: "),
        Span::styled(
            state.word_count().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" | Store: {}", state.repo().backend_kind())),
    ];

    match state.autosave_status() {
        AutoSaveStatus::Disabled => spans.push(Span::raw(" | Autosave: off")),
        AutoSaveStatus::Idle { .. } => {}
        AutoSaveStatus::Pending { since } => {
            spans.push(Span::raw(" | Autosave: "));
            spans.push(Span::styled(
                "pending",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(format!(" since {}", format_time_short(since))));
        }
        AutoSaveStatus::Error { message, .. } => {
            spans.push(Span::raw(" | Autosave: "));
            spans.push(Span::styled(
                format!("error ({message})"),
                Style::default().fg(Color::Red),
            ));
        }
    }

    if state.is_search_active() || !state.list().query().is_empty() {
        let label_style = if state.is_search_active() {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled("Search: ", label_style));
        spans.push(Span::styled(
            state.list().query().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        if state.is_search_active() {
            spans.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
        }
    }

    let second = if let Some(toast) = state.toasts().latest() {
        let style = match toast.kind {
            ToastKind::Success => Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            ToastKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        };
        Line::from(Span::styled(toast.message.clone(), style))
    } else if let Some(message) = &state.status_message {
        Line::from(Span::styled(message.clone(), Style::default().fg(Color::Cyan)))
    } else {
        Line::from(Span::styled(
            "^N new • ^S save • ^D delete • ^F search • ^L list • Tab focus • Alt-b/i/u/l/h/1-4 format • ^Q quit",
            Style::default().fg(Color::DarkGray),
        ))
    };

    Text::from(vec![Line::from(spans), second])
}

fn format_time_short(dt: OffsetDateTime) -> String {
    dt.to_offset(crate::notes::dates::local_offset())
        .format(&format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    split_matches(text, regex)
        .into_iter()
        .map(|(matched, piece)| {
            let style = if matched { highlight_style } else { base_style };
            Span::styled(piece.to_string(), style)
        })
        .collect()
}

fn render_overlay(frame: &mut Frame, state: &AppState) {
    match state.overlay() {
        Some(OverlayState::DeleteNote(overlay)) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Are you sure you want to delete this note?",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(overlay.title.clone()),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter or y delete • Esc cancel",
                    Style::default().fg(Color::Red),
                )),
            ])
            .block(
                Block::default()
                    .title("Delete Note")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::notes::NoteRepository;
    use crate::richtext::FormatKind;
    use crate::store::LocalFileStore;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::time::Instant;
    use strum::IntoEnumIterator;
    use tempfile::TempDir;

    fn span_texts(spans: &[Span<'static>]) -> Vec<String> {
        spans
            .iter()
            .map(|span| span.content.clone().into_owned())
            .collect()
    }

    #[test]
    fn highlight_marks_query_matches() {
        let regex = build_highlight_regex("note").expect("regex");
        let spans = highlight_line("Notebook", Some(&regex), Style::default(), Style::default());
        assert_eq!(
            span_texts(&spans),
            vec![String::from("Note"), String::from("book")]
        );
    }

    fn rendered_rows(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn document_lines_follow_block_shape() {
        let mut doc = richtext::from_markup(
            "<h2 style=\"text-align: center;\">Plan</h2><ul><li>a <b>b</b></li></ul>",
        );
        doc.focus();
        let lines = layout_document(&doc, 80).lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].alignment, Some(TextAlign::Center));
        assert_eq!(
            span_texts(&lines[1].spans),
            vec![BULLET.to_string(), "a ".to_string(), "b".to_string()]
        );
        assert!(lines[1].spans[2].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn renders_session_into_a_buffer() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = LocalFileStore::open(&temp.path().join("notes.json"))?;
        let mut state = AppState::new(
            NoteRepository::new(Box::new(store)),
            &AppConfig::default(),
            FormatKind::iter().collect(),
        );
        state.initialize(Instant::now());

        let mut terminal = Terminal::new(TestBackend::new(120, 30))?;
        let mut view = ViewState::default();
        terminal.draw(|frame| draw_app(frame, &state, &mut view))?;

        let rendered: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Untitled Note"));
        assert!(rendered.contains("[B]"));
        assert!(rendered.contains("New note created"));
        Ok(())
    }

    #[test]
    fn long_blocks_wrap_and_track_the_caret() {
        let mut doc = Document::from_plain_text("abcdefghijKLM");
        doc.focus();
        let layout = layout_document(&doc, 10);
        let rows: Vec<String> = layout
            .lines
            .iter()
            .map(|line| span_texts(&line.spans).concat())
            .collect();
        assert_eq!(rows, vec!["abcdefghij", "KLM"]);
        assert_eq!(layout.caret, Some((1, 3)));

        let mut list = richtext::from_markup("<ul><li>abcdefghij</li></ul>");
        list.focus();
        let layout = layout_document(&list, 6);
        let rows: Vec<String> = layout
            .lines
            .iter()
            .map(|line| span_texts(&line.spans).concat())
            .collect();
        assert_eq!(rows, vec![format!("{BULLET}abcd"), "  efgh".into(), "  ij".into()]);
        assert_eq!(layout.caret, Some((2, 4)));
    }

    #[test]
    fn content_pane_scrolls_to_the_caret() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = LocalFileStore::open(&temp.path().join("notes.json"))?;
        let mut state = AppState::new(
            NoteRepository::new(Box::new(store)),
            &AppConfig::default(),
            FormatKind::iter().collect(),
        );
        let now = Instant::now();
        state.initialize(now);

        let mut text = format!("{} ENDMARKER", "x".repeat(140));
        for n in 0..40 {
            text.push_str(&format!("\nline {n}"));
        }
        text.push_str("\nLASTLINE");
        state.edit_content(now, |doc| {
            doc.focus();
            doc.insert_text(&text)
        });
        state.focus = FocusPane::Content;

        let mut terminal = Terminal::new(TestBackend::new(80, 24))?;
        let mut view = ViewState::default();
        terminal.draw(|frame| draw_app(frame, &state, &mut view))?;
        assert!(view.content_scroll() > 0);
        let (_, cursor_y) = terminal.get_cursor()?;
        let rows = rendered_rows(&terminal);
        assert!(rows[cursor_y as usize].contains("LASTLINE"));
        assert!(!rows.iter().any(|row| row.contains("ENDMARKER")));

        state.editor_navigate(|doc| {
            doc.select(Position::new(0, 0), Position::new(0, 0));
            true
        });
        terminal.draw(|frame| draw_app(frame, &state, &mut view))?;
        assert_eq!(view.content_scroll(), 0);
        let rows = rendered_rows(&terminal);
        assert!(rows.iter().any(|row| row.contains("ENDMARKER")));
        assert!(rows.iter().any(|row| row.contains(&"x".repeat(40))));
        Ok(())
    }
}
