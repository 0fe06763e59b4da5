use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use super::document::{Alignment, Document, InlineStyle};

/// A toolbar control. The string form is the control's configuration name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum FormatKind {
    Bold,
    Italic,
    Underline,
    List,
    Heading,
    AlignLeft,
    AlignCenter,
    AlignRight,
    AlignJustify,
}

impl FormatKind {
    pub fn label(self) -> &'static str {
        match self {
            FormatKind::Bold => "B",
            FormatKind::Italic => "I",
            FormatKind::Underline => "U",
            FormatKind::List => "List",
            FormatKind::Heading => "H2",
            FormatKind::AlignLeft => "Left",
            FormatKind::AlignCenter => "Center",
            FormatKind::AlignRight => "Right",
            FormatKind::AlignJustify => "Justify",
        }
    }

    fn inline_flag(self) -> Option<InlineStyle> {
        match self {
            FormatKind::Bold => Some(InlineStyle::BOLD),
            FormatKind::Italic => Some(InlineStyle::ITALIC),
            FormatKind::Underline => Some(InlineStyle::UNDERLINE),
            _ => None,
        }
    }

    pub fn alignment(self) -> Option<Alignment> {
        match self {
            FormatKind::AlignLeft => Some(Alignment::Left),
            FormatKind::AlignCenter => Some(Alignment::Center),
            FormatKind::AlignRight => Some(Alignment::Right),
            FormatKind::AlignJustify => Some(Alignment::Justify),
            _ => None,
        }
    }

    /// Applies the command to the current selection. Returns `false`, leaving
    /// the document untouched, when the surface has no selection.
    pub fn apply(self, doc: &mut Document) -> bool {
        if let Some(flag) = self.inline_flag() {
            return doc.toggle_inline(flag);
        }
        if let Some(align) = self.alignment() {
            return doc.set_alignment(align);
        }
        match self {
            FormatKind::List => doc.toggle_list(),
            FormatKind::Heading => doc.toggle_heading(),
            _ => false,
        }
    }

    pub fn is_active(self, doc: &Document) -> bool {
        if let Some(flag) = self.inline_flag() {
            return doc.inline_active(flag);
        }
        if let Some(align) = self.alignment() {
            return doc.alignment() == Some(align);
        }
        match self {
            FormatKind::List => doc.list_active(),
            FormatKind::Heading => doc.heading_active(),
            _ => false,
        }
    }
}

/// Snapshot of which toolbar controls read as active for the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatIndicators {
    states: Vec<(FormatKind, bool)>,
}

impl FormatIndicators {
    pub fn capture(doc: &Document) -> Self {
        Self::capture_for(doc, FormatKind::iter())
    }

    pub fn capture_for(doc: &Document, controls: impl IntoIterator<Item = FormatKind>) -> Self {
        Self {
            states: controls
                .into_iter()
                .map(|kind| (kind, kind.is_active(doc)))
                .collect(),
        }
    }

    pub fn is_active(&self, kind: FormatKind) -> bool {
        self.states
            .iter()
            .any(|(candidate, active)| *candidate == kind && *active)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormatKind, bool)> + '_ {
        self.states.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::document::Position;
    use std::str::FromStr;

    #[test]
    fn names_round_trip_through_strings() {
        assert_eq!(FormatKind::AlignJustify.to_string(), "alignJustify");
        assert_eq!(FormatKind::from_str("bold").ok(), Some(FormatKind::Bold));
        assert!(FormatKind::from_str("strikethrough").is_err());
    }

    #[test]
    fn alignment_is_mutually_exclusive() {
        let mut doc = Document::new();
        doc.focus();
        doc.insert_text("centered text");

        assert!(FormatKind::AlignCenter.apply(&mut doc));
        let indicators = FormatIndicators::capture(&doc);
        let active: Vec<_> = [
            FormatKind::AlignLeft,
            FormatKind::AlignCenter,
            FormatKind::AlignRight,
            FormatKind::AlignJustify,
        ]
        .into_iter()
        .filter(|kind| indicators.is_active(*kind))
        .collect();
        assert_eq!(active, vec![FormatKind::AlignCenter]);

        FormatKind::AlignRight.apply(&mut doc);
        assert!(!FormatKind::AlignCenter.is_active(&doc));
        assert!(FormatKind::AlignRight.is_active(&doc));
    }

    #[test]
    fn commands_without_selection_do_nothing() {
        let mut doc = Document::new();
        for kind in FormatKind::iter() {
            assert!(!kind.apply(&mut doc), "{kind} applied without a selection");
        }
        assert!(doc.is_blank());
        assert!(FormatIndicators::capture(&doc).iter().all(|(_, on)| !on));
    }

    #[test]
    fn indicators_follow_selection() {
        let mut doc = Document::new();
        doc.focus();
        doc.insert_text("Discuss Q3");
        doc.select(Position::new(0, 0), Position::new(0, 7));
        FormatKind::Bold.apply(&mut doc);
        FormatKind::Heading.apply(&mut doc);

        let indicators = FormatIndicators::capture(&doc);
        assert!(indicators.is_active(FormatKind::Bold));
        assert!(indicators.is_active(FormatKind::Heading));
        assert!(!indicators.is_active(FormatKind::Italic));

        doc.select(Position::new(0, 8), Position::new(0, 10));
        assert!(!FormatKind::Bold.is_active(&doc));
    }
}
