use regex::{Regex, RegexBuilder};

/// Case-insensitive literal matcher for the current search query.
pub fn build_highlight_regex(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into `(matched, piece)` segments, in order.
pub fn split_matches<'t>(text: &'t str, regex: Option<&Regex>) -> Vec<(bool, &'t str)> {
    let Some(regex) = regex else {
        return vec![(false, text)];
    };
    let mut pieces = Vec::new();
    let mut last = 0;
    for found in regex.find_iter(text) {
        if found.start() > last {
            pieces.push((false, &text[last..found.start()]));
        }
        pieces.push((true, found.as_str()));
        last = found.end();
    }
    if last < text.len() || pieces.is_empty() {
        pieces.push((false, &text[last..]));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignore_case_and_metacharacters() {
        let regex = build_highlight_regex("q3 (draft)").expect("regex");
        assert!(regex.is_match("Plan Q3 (Draft) review"));
        assert!(build_highlight_regex("").is_none());
    }

    #[test]
    fn splits_around_every_match() {
        let regex = build_highlight_regex("gro");
        let pieces = split_matches("Groceries and grout", regex.as_ref());
        assert_eq!(
            pieces,
            vec![
                (true, "Gro"),
                (false, "ceries and "),
                (true, "gro"),
                (false, "ut"),
            ]
        );
        assert_eq!(split_matches("plain", None), vec![(false, "plain")]);
    }
}
