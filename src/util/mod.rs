//! Text and date helpers shared by the record extractor.
//!
//! - **Text**: HTML stripping, subtitle truncation, first-image lookup
//! - **Dates**: multi-format feed date parsing and ISO 8601 output
//!
//! # Examples
//!
//! ```
//! use build_feed::util::{first_image, format_iso, parse_date, summarize};
//!
//! assert_eq!(summarize("<p>Hello <b>there</b></p>"), "Hello there");
//! assert_eq!(first_image(r#"<img src="a.png">"#).as_deref(), Some("a.png"));
//!
//! let dt = parse_date("2025-10-22T07:00:00Z").unwrap();
//! assert_eq!(format_iso(&dt), "2025-10-22T07:00:00+00:00");
//! ```

mod date;
mod text;

pub use date::{format_iso, normalize_date, parse_date};
pub use text::{collapse_whitespace, first_image, strip_html, summarize, SUBTITLE_MAX_CHARS};
