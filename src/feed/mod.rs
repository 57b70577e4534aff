//! Feed retrieval and record extraction.
//!
//! - [`fetcher`] - HTTP download with browser headers and linear backoff
//! - [`parser`] - namespace-aware RSS item collection using `quick-xml`
//! - [`extract`] - turns a raw item into a [`PostRecord`]
//!
//! # Example
//!
//! ```ignore
//! use build_feed::feed::{build_client, build_record, fetch_feed, parse_feed};
//!
//! let client = build_client(&config)?;
//! let bytes = fetch_feed(&client, &config).await?;
//! let parsed = parse_feed(&bytes, config.max_posts)?;
//! let posts: Vec<_> = parsed.items.iter().map(build_record).collect();
//! ```

mod extract;
mod fetcher;
mod parser;

pub use extract::{build_record, PostRecord};
pub use fetcher::{build_client, fetch_feed, FetchError};
pub use parser::{parse_feed, ParseError, ParseResult, RawItem};
