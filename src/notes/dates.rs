//! Localized display of `lastModified` values.

use once_cell::sync::Lazy;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub const INVALID_DATE: &str = "Invalid Date";

// Read once: the offset lookup is only reliable before other threads exist.
static LOCAL_OFFSET: Lazy<UtcOffset> =
    Lazy::new(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC));

pub fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET
}

/// `M/D/YYYY` in local time, or [`INVALID_DATE`].
pub fn date_label(raw: &str) -> String {
    date_label_at(raw, local_offset())
}

/// `M/D/YYYY, h:mm:ss AM` in local time, or [`INVALID_DATE`].
pub fn datetime_label(raw: &str) -> String {
    datetime_label_at(raw, local_offset())
}

pub fn date_label_at(raw: &str, offset: UtcOffset) -> String {
    parse(raw, offset)
        .and_then(|dt| {
            dt.format(format_description!(
                "[month padding:none]/[day padding:none]/[year]"
            ))
            .ok()
        })
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

pub fn datetime_label_at(raw: &str, offset: UtcOffset) -> String {
    parse(raw, offset)
        .and_then(|dt| {
            dt.format(format_description!(
                "[month padding:none]/[day padding:none]/[year], [hour repr:12 padding:none]:[minute]:[second] [period]"
            ))
            .ok()
        })
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

fn parse(raw: &str, offset: UtcOffset) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .ok()
        .map(|dt| dt.to_offset(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::offset;

    #[test]
    fn formats_in_the_given_offset() {
        let raw = "2024-03-05T12:00:00.000Z";
        assert_eq!(date_label_at(raw, UtcOffset::UTC), "3/5/2024");
        assert_eq!(date_label_at(raw, offset!(-13)), "3/4/2024");
        assert_eq!(
            datetime_label_at(raw, offset!(+2)),
            "3/5/2024, 2:00:00 PM"
        );
    }

    #[test]
    fn unparsable_dates_do_not_fail() {
        assert_eq!(date_label_at("yesterday", UtcOffset::UTC), INVALID_DATE);
        assert_eq!(datetime_label_at("", UtcOffset::UTC), INVALID_DATE);
    }
}
