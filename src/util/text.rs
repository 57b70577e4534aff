use std::sync::LazyLock;

use regex::Regex;

/// Maximum subtitle length in characters before truncation kicks in.
pub const SUBTITLE_MAX_CHARS: usize = 220;

/// Characters kept when a subtitle is truncated (room for the ellipsis).
const SUBTITLE_KEEP_CHARS: usize = 217;

/// Ellipsis appended to truncated subtitles (U+2026, a single character).
const ELLIPSIS: char = '…';

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static IMG_SRC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("img pattern is valid")
});

/// Collapses every whitespace run to a single space and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_PATTERN.replace_all(s, " ").trim().to_string()
}

/// Converts an HTML fragment into a single line of plain text.
///
/// Each tag is replaced by a space so adjacent block elements don't run
/// together (`<p>a</p><p>b</p>` becomes `a b`). A `<` with no closing `>`
/// is not a tag; it and any stray `>` are dropped so the output never
/// contains angle brackets.
///
/// # Examples
///
/// ```
/// use build_feed::util::strip_html;
///
/// assert_eq!(strip_html("<p>Hello</p>\n<p>World</p>"), "Hello World");
/// assert_eq!(strip_html("1 < 2"), "1 2");
/// ```
pub fn strip_html(html: &str) -> String {
    let untagged = TAG_PATTERN.replace_all(html, " ");
    let cleaned: String = untagged.chars().filter(|&c| c != '<' && c != '>').collect();
    collapse_whitespace(&cleaned)
}

/// Produces the bounded plaintext summary used as a post subtitle.
///
/// Text longer than [`SUBTITLE_MAX_CHARS`] characters is cut to 217
/// characters, trailing whitespace is dropped, and `…` is appended.
/// Lengths are counted in `char`s, never bytes, so multi-byte text is
/// never split mid-codepoint.
pub fn summarize(html: &str) -> String {
    let text = strip_html(html);
    if text.chars().count() <= SUBTITLE_MAX_CHARS {
        return text;
    }

    let mut cut: String = text.chars().take(SUBTITLE_KEEP_CHARS).collect();
    cut.truncate(cut.trim_end().len());
    cut.push(ELLIPSIS);
    cut
}

/// Returns the `src` of the first `<img>` tag in an HTML fragment.
///
/// Matching is case-insensitive and accepts single or double quotes.
pub fn first_image(html: &str) -> Option<String> {
    IMG_SRC_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
