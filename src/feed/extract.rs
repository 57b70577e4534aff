use chrono::{SubsecRound, Utc};
use serde::Serialize;

use crate::feed::parser::RawItem;
use crate::util::{first_image, format_iso, normalize_date, summarize};

/// One post as published to the site.
///
/// Field order here is the key order in the output JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub title: String,
    /// Plaintext summary, at most 220 characters plus an ellipsis.
    pub subtitle: String,
    /// ISO 8601 instant in UTC, e.g. `2025-10-22T07:00:00+00:00`.
    pub date: String,
    pub url: String,
    pub image: Option<String>,
}

/// Treats empty strings the same as missing elements.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Builds the output record for one feed item.
///
/// Never fails: missing fields become empty strings or `None`, and an
/// item with no parseable date is stamped with the current time.
///
/// - Summary text prefers `<description>` and falls back to
///   `<content:encoded>`.
/// - Image lookup prefers an explicit `<media:content url>`, then the first
///   `<img>` in `<content:encoded>`, then in `<description>`.
pub fn build_record(item: &RawItem) -> PostRecord {
    let title = item.title.as_deref().unwrap_or_default().trim().to_string();
    let url = item.link.as_deref().unwrap_or_default().trim().to_string();

    let date = match normalize_date(&[
        item.pub_date.as_deref(),
        item.dc_date.as_deref(),
        item.atom_updated.as_deref(),
    ]) {
        Some(dt) => dt,
        None => {
            tracing::warn!(
                title = %title,
                pub_date = ?item.pub_date,
                dc_date = ?item.dc_date,
                atom_updated = ?item.atom_updated,
                "No parseable date, using current time"
            );
            Utc::now().trunc_subsecs(0)
        }
    };

    let description = non_empty(&item.description);
    let content = non_empty(&item.content_encoded);

    let subtitle = description.or(content).map(summarize).unwrap_or_default();

    let image = match &item.media_url {
        Some(Some(media)) if !media.is_empty() => Some(media.clone()),
        _ => content.or(description).and_then(first_image),
    };

    tracing::debug!(title = %title, url = %url, has_image = image.is_some(), "Extracted post");

    PostRecord {
        title,
        subtitle,
        date: format_iso(&date),
        url,
        image,
    }
}
