//! Tolerant date parsing for RSS/Atom timestamps.
//!
//! Feeds in the wild mix RFC 822 dates (`Wed, 22 Oct 2025 07:00:00 GMT`),
//! RFC 822 without seconds, named US zones, and ISO 8601 with or without
//! fractional seconds. [`parse_date`] tries each known shape in order and
//! returns `None` when nothing matches. Choosing a fallback is the caller's
//! job.

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Utc};

use super::text::collapse_whitespace;

/// RFC 822 layouts with a numeric offset, applied after the weekday prefix
/// has been removed.
const RFC822_NUMERIC_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z", // 22 Oct 2025 07:00:00 +0000
    "%d %b %Y %H:%M %z",    // no seconds
];

/// Trailing zone names that mean UTC and are rewritten to `+0000`.
const UTC_ZONE_NAMES: &[&str] = &["GMT", "UTC", "UT", "Z"];

/// `%Y` accepts any digit count; a two-digit RFC 822 year must reach the
/// RFC 2822 parser, which expands it to 19xx/20xx.
const MIN_NUMERIC_YEAR: i32 = 1000;

/// ISO 8601 layouts with a numeric offset.
const ISO_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",   // 2025-10-22T07:00:00+0000
    "%Y-%m-%dT%H:%M:%S%.f%z", // fractional seconds
];

/// Parses a single raw date string into a UTC instant.
///
/// The input is trimmed, whitespace runs are collapsed, and a trailing
/// `GMT`, `UTC`, `UT` or `Z` zone is rewritten to `+0000` before any
/// format is tried. Attempts, in order:
///
/// 1. RFC 822 with a numeric offset, with and without seconds
/// 2. RFC 822 with a named zone (`UT`, `EST`, `PDT`, ...)
/// 3. ISO 8601 with a numeric offset, with and without fractional seconds
/// 4. RFC 3339 (accepts the `Z` designator)
///
/// The leading weekday of an RFC 822 date is ignored for step 1, so a feed
/// with a wrong day name still yields its stated date.
///
/// # Examples
///
/// ```
/// use build_feed::util::{format_iso, parse_date};
///
/// let dt = parse_date("Wed, 22 Oct 2025 07:00:00 GMT").unwrap();
/// assert_eq!(format_iso(&dt), "2025-10-22T07:00:00+00:00");
///
/// assert!(parse_date("next tuesday").is_none());
/// ```
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = normalize_zone(&collapse_whitespace(&raw.replace("GMT", "+0000")));
    if normalized.is_empty() {
        return None;
    }

    let without_weekday = strip_weekday(&normalized);

    let parsed = RFC822_NUMERIC_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(without_weekday, fmt).ok())
        .filter(|dt| dt.year() >= MIN_NUMERIC_YEAR)
        .or_else(|| DateTime::parse_from_rfc2822(&normalized).ok())
        .or_else(|| {
            ISO_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
        })
        .or_else(|| DateTime::parse_from_rfc3339(&normalized).ok());

    parsed.map(|dt: DateTime<FixedOffset>| dt.with_timezone(&Utc))
}

/// Tries each candidate in order and returns the first one that parses.
///
/// `None` and blank candidates are skipped.
pub fn normalize_date(candidates: &[Option<&str>]) -> Option<DateTime<Utc>> {
    candidates
        .iter()
        .flatten()
        .filter(|raw| !raw.trim().is_empty())
        .find_map(|raw| parse_date(raw))
}

/// Formats an instant as ISO 8601 with an explicit `+00:00` offset.
///
/// Fractional seconds appear only when non-zero.
pub fn format_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Rewrites a space-separated trailing UTC zone name to `+0000`.
fn normalize_zone(s: &str) -> String {
    match s.rsplit_once(' ') {
        Some((head, zone)) if UTC_ZONE_NAMES.contains(&zone) => format!("{head} +0000"),
        _ => s.to_string(),
    }
}

/// Drops a leading `Wed, ` style day name if present.
fn strip_weekday(s: &str) -> &str {
    match s.split_once(',') {
        Some((day, rest)) if day.len() <= 9 && day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_start()
        }
        _ => s,
    }
}
