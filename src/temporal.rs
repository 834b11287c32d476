//! Tolerant date and time parsing.
//!
//! Source exports mix several textual date layouts. [`resolve_date`] tries a
//! fixed list of grammars and returns `None` when none match; it never fails
//! or panics. Ambiguous `a/b/yyyy` values are read month-first, and
//! two-digit years map to 1970-2069. Timestamps carrying a UTC offset keep
//! the date as written. Times use a single strict format, `%H:%M` by default.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};

/// Time layout used when none is configured.
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

/// Date-only grammars, tried in order. The two-digit `%y` forms come last so
/// a four-digit year is never cut short.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y", "%Y%m%d", "%m/%d/%y", "%m-%d-%y",
];

/// Date-with-time grammars; only the date part is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M",
];

/// Offset-carrying timestamps not covered by RFC 3339.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// chrono's `%Y` also reads one to three digit years; only four-digit years
/// are real calendar input.
fn four_digit_year(date: NaiveDate) -> Option<NaiveDate> {
    (1000..=9999).contains(&date.year()).then_some(date)
}

/// Parse a calendar date from any accepted layout.
///
/// ```
/// use chrono::NaiveDate;
/// use yearload::temporal::resolve_date;
///
/// let d = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
/// assert_eq!(resolve_date("2022-03-01"), Some(d));
/// assert_eq!(resolve_date("03/01/2022"), Some(d));
/// assert_eq!(resolve_date("3/1/22"), Some(d));
/// assert_eq!(resolve_date("2022-03-01T00:00:00Z"), Some(d));
/// assert_eq!(resolve_date("notadate"), None);
/// ```
#[must_use]
pub fn resolve_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    // Compact digits only make sense as YYYYMMDD.
    if s.len() != 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().and_then(four_digit_year))
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                NaiveDateTime::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|dt| four_digit_year(dt.date()))
            })
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .or_else(|| {
                    ZONED_FORMATS
                        .iter()
                        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
                })
                .and_then(|dt| four_digit_year(dt.date_naive()))
        })
}

/// Parse a clock time with a single strict `format`.
///
/// Values carrying more than the format describes (e.g. seconds under
/// `%H:%M`) do not match.
#[must_use]
pub fn resolve_time(text: &str, format: &str) -> Option<NaiveTime> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(s, format).ok()
}
