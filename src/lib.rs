//! Turns an RSS feed into the `posts.json` consumed by a static site.
//!
//! One run fetches the feed ([`feed::fetch_feed`]), collects the first
//! items of its channel ([`feed::parse_feed`]), normalizes each into a
//! [`feed::PostRecord`], and writes them as a JSON array
//! ([`output::render_json`], [`output::write_atomic`]). [`pipeline::run`] wires these together from a
//! [`config::Config`].

pub mod config;
pub mod feed;
pub mod output;
pub mod pipeline;
pub mod util;
