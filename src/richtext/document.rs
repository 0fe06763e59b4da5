use std::ops::RangeInclusive;

use bitflags::bitflags;
use strum::{Display, EnumIter, EnumString};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InlineStyle: u8 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading,
    ListItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub style: InlineStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub kind: BlockKind,
    pub align: Alignment,
    pub glyphs: Vec<Glyph>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn styled(kind: BlockKind, align: Alignment, text: &str, style: InlineStyle) -> Self {
        Self {
            kind,
            align,
            glyphs: text.chars().map(|ch| Glyph { ch, style }).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn text(&self) -> String {
        self.glyphs.iter().map(|glyph| glyph.ch).collect()
    }

    /// Adjacent glyphs sharing a style, merged.
    pub fn runs(&self) -> Vec<(InlineStyle, String)> {
        let mut runs: Vec<(InlineStyle, String)> = Vec::new();
        for glyph in &self.glyphs {
            match runs.last_mut() {
                Some((style, text)) if *style == glyph.style => text.push(glyph.ch),
                _ => runs.push((glyph.style, glyph.ch.to_string())),
            }
        }
        runs
    }
}

/// A caret location: block index and char offset inside that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn caret(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> Position {
        self.anchor.min(self.focus)
    }

    pub fn end(&self) -> Position {
        self.anchor.max(self.focus)
    }
}

/// The editing surface: blocks of styled glyphs plus the live selection.
///
/// A document always holds at least one block. `selection` is `None` while
/// the surface is unfocused; formatting commands do nothing in that state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
    selection: Option<Selection>,
    pending_style: Option<InlineStyle>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    /// One unstyled paragraph per line. Nothing in `text` is read as markup.
    pub fn from_plain_text(text: &str) -> Self {
        Self::from_blocks(
            text.lines()
                .map(|line| {
                    Block::styled(
                        BlockKind::Paragraph,
                        Alignment::Left,
                        line.trim_end_matches('\r'),
                        InlineStyle::empty(),
                    )
                })
                .collect(),
        )
    }

    pub fn from_blocks(mut blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            blocks.push(Block::default());
        }
        Self {
            blocks,
            selection: None,
            pending_style: None,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// True for the state of a freshly created note: one empty, unformatted
    /// paragraph.
    pub fn is_blank(&self) -> bool {
        self.blocks.len() == 1 && self.blocks[0] == Block::default()
    }

    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn word_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| block.text().split_whitespace().count())
            .sum()
    }

    pub fn is_focused(&self) -> bool {
        self.selection.is_some()
    }

    /// Gives the surface a caret, at the end of the text when it had none.
    pub fn focus(&mut self) {
        if self.selection.is_none() {
            self.selection = Some(Selection::caret(self.end_position()));
        }
    }

    pub fn blur(&mut self) {
        self.selection = None;
        self.pending_style = None;
    }

    pub fn select(&mut self, anchor: Position, focus: Position) {
        self.selection = Some(Selection {
            anchor: self.clamp(anchor),
            focus: self.clamp(focus),
        });
        self.pending_style = None;
    }

    pub fn select_all(&mut self) {
        self.select(Position::default(), self.end_position());
    }

    pub fn caret(&self) -> Option<Position> {
        self.selection.map(|sel| sel.focus)
    }

    pub fn end_position(&self) -> Position {
        let last = self.blocks.len() - 1;
        Position::new(last, self.blocks[last].len())
    }

    fn clamp(&self, pos: Position) -> Position {
        let block = pos.block.min(self.blocks.len() - 1);
        Position::new(block, pos.offset.min(self.blocks[block].len()))
    }

    pub fn selected_block_range(&self) -> Option<RangeInclusive<usize>> {
        self.selection
            .map(|sel| sel.start().block..=sel.end().block)
    }

    // ---- text editing -------------------------------------------------

    pub fn insert_text(&mut self, text: &str) -> bool {
        let mut changed = false;
        for ch in text.chars() {
            changed |= self.insert_char(ch);
        }
        changed
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch == '\n' {
            return self.insert_newline();
        }
        if self.selection.is_none() {
            return false;
        }
        let pos = self.delete_selection_range();
        let style = self.caret_style(pos);
        self.blocks[pos.block]
            .glyphs
            .insert(pos.offset, Glyph { ch, style });
        self.selection = Some(Selection::caret(Position::new(pos.block, pos.offset + 1)));
        self.pending_style = None;
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        if self.selection.is_none() {
            return false;
        }
        let pos = self.delete_selection_range();
        let block = &mut self.blocks[pos.block];
        if block.kind == BlockKind::ListItem && block.is_empty() {
            // Enter on an empty bullet leaves the list.
            block.kind = BlockKind::Paragraph;
            self.selection = Some(Selection::caret(pos));
            return true;
        }
        let tail = block.glyphs.split_off(pos.offset);
        let kind = match block.kind {
            BlockKind::Heading => BlockKind::Paragraph,
            other => other,
        };
        let next = Block {
            kind,
            align: block.align,
            glyphs: tail,
        };
        self.blocks.insert(pos.block + 1, next);
        self.selection = Some(Selection::caret(Position::new(pos.block + 1, 0)));
        true
    }

    pub fn backspace(&mut self) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if !sel.is_collapsed() {
            self.delete_selection_range();
            return true;
        }
        let pos = sel.focus;
        if pos.offset > 0 {
            self.blocks[pos.block].glyphs.remove(pos.offset - 1);
            self.selection = Some(Selection::caret(Position::new(pos.block, pos.offset - 1)));
            return true;
        }
        if self.blocks[pos.block].kind != BlockKind::Paragraph {
            self.blocks[pos.block].kind = BlockKind::Paragraph;
            return true;
        }
        if pos.block == 0 {
            return false;
        }
        let glyphs = self.blocks.remove(pos.block).glyphs;
        let prev = &mut self.blocks[pos.block - 1];
        let offset = prev.len();
        prev.glyphs.extend(glyphs);
        self.selection = Some(Selection::caret(Position::new(pos.block - 1, offset)));
        true
    }

    pub fn delete_forward(&mut self) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if !sel.is_collapsed() {
            self.delete_selection_range();
            return true;
        }
        let pos = sel.focus;
        if pos.offset < self.blocks[pos.block].len() {
            self.blocks[pos.block].glyphs.remove(pos.offset);
            return true;
        }
        if pos.block + 1 >= self.blocks.len() {
            return false;
        }
        let glyphs = self.blocks.remove(pos.block + 1).glyphs;
        self.blocks[pos.block].glyphs.extend(glyphs);
        true
    }

    /// Removes the selected text, collapsing the selection to its start.
    fn delete_selection_range(&mut self) -> Position {
        let Some(sel) = self.selection else {
            return self.end_position();
        };
        let (start, end) = (sel.start(), sel.end());
        if start != end {
            if start.block == end.block {
                self.blocks[start.block]
                    .glyphs
                    .drain(start.offset..end.offset);
            } else {
                let tail = self.blocks[end.block].glyphs.split_off(end.offset);
                let head = &mut self.blocks[start.block].glyphs;
                head.truncate(start.offset);
                head.extend(tail);
                self.blocks.drain(start.block + 1..=end.block);
            }
        }
        self.selection = Some(Selection::caret(start));
        start
    }

    // ---- caret movement -------------------------------------------------

    pub fn move_left(&mut self, extend: bool) -> bool {
        self.move_caret(extend, |doc, sel| {
            if !extend && !sel.is_collapsed() {
                return sel.start();
            }
            let pos = sel.focus;
            if pos.offset > 0 {
                Position::new(pos.block, pos.offset - 1)
            } else if pos.block > 0 {
                Position::new(pos.block - 1, doc.blocks[pos.block - 1].len())
            } else {
                pos
            }
        })
    }

    pub fn move_right(&mut self, extend: bool) -> bool {
        self.move_caret(extend, |doc, sel| {
            if !extend && !sel.is_collapsed() {
                return sel.end();
            }
            let pos = sel.focus;
            if pos.offset < doc.blocks[pos.block].len() {
                Position::new(pos.block, pos.offset + 1)
            } else if pos.block + 1 < doc.blocks.len() {
                Position::new(pos.block + 1, 0)
            } else {
                pos
            }
        })
    }

    pub fn move_up(&mut self, extend: bool) -> bool {
        self.move_caret(extend, |doc, sel| {
            let pos = sel.focus;
            if pos.block == 0 {
                Position::new(0, 0)
            } else {
                doc.clamp(Position::new(pos.block - 1, pos.offset))
            }
        })
    }

    pub fn move_down(&mut self, extend: bool) -> bool {
        self.move_caret(extend, |doc, sel| {
            let pos = sel.focus;
            if pos.block + 1 < doc.blocks.len() {
                doc.clamp(Position::new(pos.block + 1, pos.offset))
            } else {
                doc.end_position()
            }
        })
    }

    pub fn move_home(&mut self, extend: bool) -> bool {
        self.move_caret(extend, |_, sel| Position::new(sel.focus.block, 0))
    }

    pub fn move_end(&mut self, extend: bool) -> bool {
        self.move_caret(extend, |doc, sel| {
            Position::new(sel.focus.block, doc.blocks[sel.focus.block].len())
        })
    }

    fn move_caret<F>(&mut self, extend: bool, target: F) -> bool
    where
        F: FnOnce(&Self, Selection) -> Position,
    {
        let Some(sel) = self.selection else {
            return false;
        };
        let focus = target(self, sel);
        let next = if extend {
            Selection {
                anchor: sel.anchor,
                focus,
            }
        } else {
            Selection::caret(focus)
        };
        if next == sel {
            return false;
        }
        self.selection = Some(next);
        self.pending_style = None;
        true
    }

    // ---- formatting -----------------------------------------------------

    /// Style that text typed at `pos` would get.
    fn caret_style(&self, pos: Position) -> InlineStyle {
        if let Some(style) = self.pending_style {
            return style;
        }
        let glyphs = &self.blocks[pos.block].glyphs;
        let neighbour = if pos.offset > 0 {
            glyphs.get(pos.offset - 1)
        } else {
            glyphs.first()
        };
        neighbour.map(|glyph| glyph.style).unwrap_or_default()
    }

    fn selected_glyphs(&self, sel: Selection) -> impl Iterator<Item = &Glyph> + '_ {
        let (start, end) = (sel.start(), sel.end());
        (start.block..=end.block).flat_map(move |index| {
            let glyphs = &self.blocks[index].glyphs;
            let from = if index == start.block { start.offset } else { 0 };
            let to = if index == end.block {
                end.offset
            } else {
                glyphs.len()
            };
            glyphs[from..to].iter()
        })
    }

    pub fn inline_active(&self, flag: InlineStyle) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if sel.is_collapsed() {
            return self.caret_style(sel.focus).contains(flag);
        }
        let mut seen = false;
        for glyph in self.selected_glyphs(sel) {
            if !glyph.style.contains(flag) {
                return false;
            }
            seen = true;
        }
        seen || self.caret_style(sel.start()).contains(flag)
    }

    /// Adds `flag` to the whole selection, or removes it when every selected
    /// glyph already carries it. A collapsed selection toggles the style used
    /// for the next typed characters instead.
    pub fn toggle_inline(&mut self, flag: InlineStyle) -> bool {
        let Some(sel) = self.selection else {
            return false;
        };
        if sel.is_collapsed() {
            let current = self.caret_style(sel.focus);
            self.pending_style = Some(current ^ flag);
            return true;
        }
        let enable = !self.inline_active(flag);
        let (start, end) = (sel.start(), sel.end());
        for index in start.block..=end.block {
            let glyphs = &mut self.blocks[index].glyphs;
            let from = if index == start.block { start.offset } else { 0 };
            let to = if index == end.block {
                end.offset
            } else {
                glyphs.len()
            };
            for glyph in &mut glyphs[from..to] {
                glyph.style.set(flag, enable);
            }
        }
        true
    }

    pub fn list_active(&self) -> bool {
        let Some(range) = self.selected_block_range() else {
            return false;
        };
        self.blocks[range]
            .iter()
            .all(|block| block.kind == BlockKind::ListItem)
    }

    pub fn toggle_list(&mut self) -> bool {
        let Some(range) = self.selected_block_range() else {
            return false;
        };
        let kind = if self.list_active() {
            BlockKind::Paragraph
        } else {
            BlockKind::ListItem
        };
        for block in &mut self.blocks[range] {
            block.kind = kind;
        }
        true
    }

    pub fn heading_active(&self) -> bool {
        self.selection
            .map(|sel| self.blocks[sel.anchor.block].kind == BlockKind::Heading)
            .unwrap_or(false)
    }

    /// Heading when the anchor's block is not one, paragraph when it is.
    pub fn toggle_heading(&mut self) -> bool {
        let Some(range) = self.selected_block_range() else {
            return false;
        };
        let kind = if self.heading_active() {
            BlockKind::Paragraph
        } else {
            BlockKind::Heading
        };
        for block in &mut self.blocks[range] {
            block.kind = kind;
        }
        true
    }

    pub fn alignment(&self) -> Option<Alignment> {
        self.selection
            .map(|sel| self.blocks[sel.start().block].align)
    }

    pub fn set_alignment(&mut self, align: Alignment) -> bool {
        let Some(range) = self.selected_block_range() else {
            return false;
        };
        for block in &mut self.blocks[range] {
            block.align = align;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> Document {
        let mut doc = Document::new();
        doc.focus();
        doc.insert_text(text);
        doc
    }

    #[test]
    fn typing_builds_blocks_and_moves_caret() {
        let doc = typed("Discuss Q3\nbudget");
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.plain_text(), "Discuss Q3\nbudget");
        assert_eq!(doc.caret(), Some(Position::new(1, 6)));
        assert_eq!(doc.word_count(), 3);
    }

    #[test]
    fn unfocused_surface_ignores_input() {
        let mut doc = Document::new();
        assert!(!doc.insert_char('x'));
        assert!(!doc.toggle_inline(InlineStyle::BOLD));
        assert!(!doc.set_alignment(Alignment::Center));
        assert!(doc.is_blank());
    }

    #[test]
    fn bold_toggles_over_selection() {
        let mut doc = typed("hello world");
        doc.select(Position::new(0, 0), Position::new(0, 5));
        assert!(!doc.inline_active(InlineStyle::BOLD));

        assert!(doc.toggle_inline(InlineStyle::BOLD));
        assert!(doc.inline_active(InlineStyle::BOLD));
        assert_eq!(
            doc.blocks()[0].runs(),
            vec![
                (InlineStyle::BOLD, "hello".to_string()),
                (InlineStyle::empty(), " world".to_string()),
            ]
        );

        // Mixed selection: one pass bolds everything.
        doc.select_all();
        assert!(!doc.inline_active(InlineStyle::BOLD));
        doc.toggle_inline(InlineStyle::BOLD);
        assert!(doc.inline_active(InlineStyle::BOLD));
        doc.toggle_inline(InlineStyle::BOLD);
        assert_eq!(doc.blocks()[0].runs().len(), 1);
        assert!(!doc.inline_active(InlineStyle::BOLD));
    }

    #[test]
    fn collapsed_toggle_styles_next_characters() {
        let mut doc = typed("plain ");
        doc.toggle_inline(InlineStyle::ITALIC);
        assert!(doc.inline_active(InlineStyle::ITALIC));
        doc.insert_text("slanted");

        let runs = doc.blocks()[0].runs();
        assert_eq!(runs[1], (InlineStyle::ITALIC, "slanted".to_string()));

        // Moving the caret drops the pending style.
        doc.toggle_inline(InlineStyle::UNDERLINE);
        doc.move_home(false);
        assert!(!doc.inline_active(InlineStyle::UNDERLINE));
    }

    #[test]
    fn heading_is_a_binary_toggle() {
        let mut doc = typed("Title\nbody");
        doc.select(Position::new(0, 2), Position::new(0, 2));
        assert!(doc.toggle_heading());
        assert_eq!(doc.blocks()[0].kind, BlockKind::Heading);
        assert!(doc.heading_active());
        assert!(doc.toggle_heading());
        assert_eq!(doc.blocks()[0].kind, BlockKind::Paragraph);
        assert_eq!(doc.blocks()[1].kind, BlockKind::Paragraph);
    }

    #[test]
    fn list_toggle_spans_selected_blocks() {
        let mut doc = typed("milk\neggs\nbread");
        doc.select(Position::new(0, 1), Position::new(1, 1));
        doc.toggle_list();
        let kinds: Vec<_> = doc.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::ListItem, BlockKind::ListItem, BlockKind::Paragraph]
        );
        assert!(doc.list_active());
        doc.toggle_list();
        assert!(doc.blocks().iter().all(|b| b.kind == BlockKind::Paragraph));
    }

    #[test]
    fn enter_on_empty_list_item_leaves_list() {
        let mut doc = typed("milk");
        doc.toggle_list();
        doc.insert_newline();
        assert_eq!(doc.blocks()[1].kind, BlockKind::ListItem);
        doc.insert_newline();
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.blocks()[1].kind, BlockKind::Paragraph);
    }

    #[test]
    fn backspace_merges_and_deletes_ranges() {
        let mut doc = typed("ab\ncd");
        doc.move_home(false);
        assert!(doc.backspace());
        assert_eq!(doc.plain_text(), "abcd");
        assert_eq!(doc.caret(), Some(Position::new(0, 2)));

        doc.select(Position::new(0, 1), Position::new(0, 3));
        doc.backspace();
        assert_eq!(doc.plain_text(), "ad");
        doc.move_home(false);
        assert!(!doc.backspace());
    }

    #[test]
    fn typing_replaces_multi_block_selection() {
        let mut doc = typed("one\ntwo\nthree");
        doc.select(Position::new(0, 1), Position::new(2, 2));
        doc.insert_char('X');
        assert_eq!(doc.plain_text(), "oXree");
        assert_eq!(doc.blocks().len(), 1);
    }

    #[test]
    fn shift_moves_extend_selection() {
        let mut doc = typed("abc");
        doc.move_left(true);
        doc.move_left(true);
        let sel = doc.selection().expect("selection");
        assert_eq!(sel.start(), Position::new(0, 1));
        assert_eq!(sel.end(), Position::new(0, 3));
        doc.move_left(false);
        assert_eq!(doc.caret(), Some(Position::new(0, 1)));
    }
}
