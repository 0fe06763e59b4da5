//! Conversion between [`Document`] and the HTML-like markup stored in
//! `Note::content`.
//!
//! The writer emits `p`, `h2` and `ul > li` blocks, `b`/`i`/`u` inline tags
//! and `style="text-align: ..."` for non-left alignment. The reader accepts
//! that subset plus the common variants browsers produce (`div`, `strong`,
//! `em`, other heading levels, `align=` attributes) and treats anything it
//! does not know as transparent.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use super::document::{Alignment, Block, BlockKind, Document, Glyph, InlineStyle};
use crate::notes::markup::decode_entities;

static TEXT_ALIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:text-align\s*:\s*|\balign\s*=\s*"?)(left|center|right|justify)"#)
        .expect("valid alignment pattern")
});

pub fn to_markup(doc: &Document) -> String {
    if doc.is_blank() {
        return String::new();
    }
    let mut out = String::new();
    let mut in_list = false;
    for block in doc.blocks() {
        let is_item = block.kind == BlockKind::ListItem;
        if is_item && !in_list {
            out.push_str("<ul>");
        } else if !is_item && in_list {
            out.push_str("</ul>");
        }
        in_list = is_item;

        let tag = match block.kind {
            BlockKind::Paragraph => "p",
            BlockKind::Heading => "h2",
            BlockKind::ListItem => "li",
        };
        out.push('<');
        out.push_str(tag);
        if block.align != Alignment::Left {
            out.push_str(&format!(" style=\"text-align: {};\"", block.align));
        }
        out.push('>');
        if block.is_empty() {
            out.push_str("<br>");
        }
        for (style, text) in block.runs() {
            write_run(&mut out, style, &text);
        }
        out.push_str(&format!("</{tag}>"));
    }
    if in_list {
        out.push_str("</ul>");
    }
    out
}

const INLINE_TAGS: [(InlineStyle, &str); 3] = [
    (InlineStyle::BOLD, "b"),
    (InlineStyle::ITALIC, "i"),
    (InlineStyle::UNDERLINE, "u"),
];

fn write_run(out: &mut String, style: InlineStyle, text: &str) {
    for (flag, tag) in INLINE_TAGS {
        if style.contains(flag) {
            out.push_str(&format!("<{tag}>"));
        }
    }
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    for (flag, tag) in INLINE_TAGS.iter().rev() {
        if style.contains(*flag) {
            out.push_str(&format!("</{tag}>"));
        }
    }
}

/// Parses stored markup. Never fails: unknown tags are skipped and bare text
/// becomes paragraphs, one per line.
pub fn from_markup(markup: &str) -> Document {
    let mut reader = Reader::default();
    let mut rest = markup;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('<') {
            let starts_tag =
                after.starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '/' || ch == '!');
            match after.find('>') {
                Some(end) if starts_tag => {
                    reader.tag(&after[..end]);
                    rest = &after[end + 1..];
                }
                _ => {
                    reader.text("<");
                    rest = after;
                }
            }
            continue;
        }
        let next = rest.find('<').unwrap_or(rest.len());
        reader.text(&rest[..next]);
        rest = &rest[next..];
    }
    reader.finish()
}

#[derive(Default)]
struct Reader {
    blocks: Vec<Block>,
    current: Option<Block>,
    // Opened by a tag, so kept even when it ends up empty.
    explicit: bool,
    pending_break: bool,
    bold: usize,
    italic: usize,
    underline: usize,
}

impl Reader {
    fn style(&self) -> InlineStyle {
        let mut style = InlineStyle::empty();
        style.set(InlineStyle::BOLD, self.bold > 0);
        style.set(InlineStyle::ITALIC, self.italic > 0);
        style.set(InlineStyle::UNDERLINE, self.underline > 0);
        style
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if self.explicit || !block.is_empty() {
                self.blocks.push(block);
            }
        }
        self.explicit = false;
        self.pending_break = false;
    }

    fn open_block(&mut self, kind: BlockKind, align: Alignment) {
        self.flush();
        self.current = Some(Block {
            kind,
            align,
            glyphs: Vec::new(),
        });
        self.explicit = true;
    }

    /// Ends the current line and continues in a sibling of the same shape.
    fn split_block(&mut self, explicit: bool) {
        let (kind, align) = self
            .current
            .as_ref()
            .map(|block| (block.kind, block.align))
            .unwrap_or_default();
        self.flush();
        self.current = Some(Block {
            kind,
            align,
            glyphs: Vec::new(),
        });
        self.explicit = explicit;
    }

    fn tag(&mut self, raw: &str) {
        let raw = raw.trim();
        let closing = raw.starts_with('/');
        let body = raw.trim_start_matches('/');
        let name: String = body
            .chars()
            .take_while(|ch| !ch.is_whitespace() && *ch != '/')
            .collect::<String>()
            .to_ascii_lowercase();

        let counter = match name.as_str() {
            "b" | "strong" => Some(&mut self.bold),
            "i" | "em" => Some(&mut self.italic),
            "u" | "ins" => Some(&mut self.underline),
            _ => None,
        };
        if let Some(counter) = counter {
            *counter = if closing {
                counter.saturating_sub(1)
            } else {
                *counter + 1
            };
            return;
        }

        let kind = match name.as_str() {
            "p" | "div" => BlockKind::Paragraph,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => BlockKind::Heading,
            "li" => BlockKind::ListItem,
            "br" => {
                self.line_break();
                return;
            }
            _ => return,
        };
        if closing {
            self.flush();
        } else {
            self.open_block(kind, parse_alignment(body));
        }
    }

    fn line_break(&mut self) {
        let Some(block) = &self.current else {
            self.blocks.push(Block::default());
            return;
        };
        if self.pending_break {
            // Second break in a row: keep an empty line between the two.
            self.split_block(true);
            self.pending_break = true;
        } else if !block.is_empty() {
            self.pending_break = true;
        }
    }

    fn text(&mut self, raw: &str) {
        if self.current.is_none() && raw.trim().is_empty() {
            return;
        }
        let text = decode_entities(raw);
        let style = self.style();
        for ch in text.chars() {
            if ch == '\r' {
                continue;
            }
            if ch == '\n' {
                if self.current.is_some() {
                    self.split_block(false);
                }
                continue;
            }
            if self.pending_break {
                self.split_block(false);
            }
            let block = self.current.get_or_insert_with(Block::default);
            block.glyphs.push(Glyph { ch, style });
        }
    }

    fn finish(mut self) -> Document {
        self.flush();
        Document::from_blocks(self.blocks)
    }
}

fn parse_alignment(attributes: &str) -> Alignment {
    TEXT_ALIGN
        .captures(attributes)
        .and_then(|caps| Alignment::from_str(&caps[1].to_ascii_lowercase()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_document_writes_empty_content() {
        assert_eq!(to_markup(&Document::new()), "");
        assert!(from_markup("").is_blank());
    }

    #[test]
    fn writer_output_reads_back_identically() {
        let doc = Document::from_blocks(vec![
            Block::styled(BlockKind::Heading, Alignment::Center, "Plan", InlineStyle::empty()),
            Block {
                kind: BlockKind::Paragraph,
                align: Alignment::Left,
                glyphs: "a "
                    .chars()
                    .map(|ch| Glyph {
                        ch,
                        style: InlineStyle::empty(),
                    })
                    .chain("b<c".chars().map(|ch| Glyph {
                        ch,
                        style: InlineStyle::BOLD | InlineStyle::ITALIC,
                    }))
                    .collect(),
            },
            Block::styled(BlockKind::ListItem, Alignment::Left, "milk", InlineStyle::empty()),
            Block::new(BlockKind::ListItem),
            Block::styled(BlockKind::Paragraph, Alignment::Right, "", InlineStyle::empty()),
        ]);

        let markup = to_markup(&doc);
        assert_eq!(
            markup,
            "<h2 style=\"text-align: center;\">Plan</h2>\
             <p>a <b><i>b&lt;c</i></b></p>\
             <ul><li>milk</li><li><br></li></ul>\
             <p style=\"text-align: right;\"><br></p>"
        );
        assert_eq!(from_markup(&markup).blocks(), doc.blocks());
    }

    #[test]
    fn reads_browser_flavoured_markup() {
        let doc = from_markup(
            "<div align=\"center\"><strong>Hi</strong> there</div>\
             <h1>Big</h1>line one<br>line two",
        );
        let blocks = doc.blocks();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].align, Alignment::Center);
        assert_eq!(blocks[0].runs()[0], (InlineStyle::BOLD, "Hi".to_string()));
        assert_eq!(blocks[1].kind, BlockKind::Heading);
        assert_eq!(blocks[2].text(), "line one");
        assert_eq!(blocks[3].text(), "line two");
    }

    #[test]
    fn plain_text_content_becomes_paragraphs() {
        let doc = from_markup("milk & eggs\nbread");
        assert_eq!(doc.plain_text(), "milk & eggs\nbread");
        assert_eq!(doc.blocks().len(), 2);
    }

    #[test]
    fn unknown_tags_and_stray_brackets_are_tolerated() {
        let doc = from_markup("<p><span class=\"x\">a</span> < b</p><!-- note -->");
        assert_eq!(doc.plain_text(), "a < b");
    }
}
