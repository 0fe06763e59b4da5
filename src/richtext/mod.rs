//! Structured rich-text model behind the editing surface.

mod document;
mod format;
mod markup;

pub use document::{
    Alignment, Block, BlockKind, Document, Glyph, InlineStyle, Position, Selection,
};
pub use format::{FormatIndicators, FormatKind};
pub use markup::{from_markup, to_markup};
