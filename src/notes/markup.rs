//! Text views over opaque note markup: previews, plain text, word counts.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

static BLOCK_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(p|div|h[1-6]|li|ul|ol|br)\b[^>]*>").expect("valid block pattern")
});

/// Removes every `<...>` tag, leaving text (and entities) as they are.
pub fn strip_markup(content: &str) -> String {
    TAG.replace_all(content, "").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// First `max` grapheme clusters of the tag-stripped content.
pub fn preview(content: &str, max: usize) -> String {
    let text = decode_entities(&strip_markup(content));
    text.graphemes(true).take(max).collect()
}

/// Content as plain text, one line per block.
pub fn plain_text(content: &str) -> String {
    let separated = BLOCK_BOUNDARY.replace_all(content, "\n");
    let text = decode_entities(&strip_markup(&separated));
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn word_count(content: &str) -> usize {
    plain_text(content).split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_strips_tags_and_truncates() {
        let content = "<h2>Plan</h2><p><b>Discuss</b> the Q3 roadmap &amp; hiring for the platform team</p>";
        let preview = preview(content, 50);
        assert_eq!(preview.chars().count(), 50);
        assert!(preview.starts_with("PlanDiscuss the Q3 roadmap & hiring"));
        assert!(!preview.contains('<'));
    }

    #[test]
    fn preview_counts_graphemes_not_bytes() {
        let preview = preview("<p>naïve café 👍🏽 done</p>", 13);
        assert_eq!(preview, "naïve café 👍🏽 ");
    }

    #[test]
    fn word_count_treats_blocks_as_separators() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("<p>one</p><p>two three</p>"), 3);
        assert_eq!(word_count("<ul><li>milk</li><li>eggs</li></ul>"), 2);
        assert_eq!(word_count("<b>bold</b>face"), 1);
    }

    #[test]
    fn plain_text_keeps_block_lines() {
        assert_eq!(
            plain_text("<h2>Title</h2><p>a &lt; b</p><p><br></p>"),
            "Title\na < b"
        );
    }
}
