use thiserror::Error;

use crate::config::Config;
use crate::feed::{build_record, fetch_feed, parse_feed, FetchError, ParseError, PostRecord};
use crate::output::{render_json, write_atomic};

/// Reasons a run produces no output file.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Failed to serialize posts: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

impl PipelineError {
    /// Names the step that failed, as printed in the CLI diagnostic.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetching feed",
            PipelineError::Parse(_) => "parsing XML",
            PipelineError::Serialize(_) => "serializing output",
            PipelineError::Write(_) => "writing output",
        }
    }
}

/// Fetches and parses the feed, returning at most `config.max_posts`
/// records in feed order.
pub async fn collect_posts(
    config: &Config,
    client: &reqwest::Client,
) -> Result<Vec<PostRecord>, PipelineError> {
    let bytes = fetch_feed(client, config).await?;
    let parsed = parse_feed(&bytes, config.max_posts)?;

    if parsed.skipped > 0 {
        tracing::debug!(
            kept = parsed.items.len(),
            skipped = parsed.skipped,
            "Ignoring items past the post limit"
        );
    }

    Ok(parsed.items.iter().map(build_record).collect())
}

/// Runs the whole pipeline once: fetch, parse, extract, write.
///
/// The output file is only touched after every earlier step succeeded.
/// Returns the number of records written.
pub async fn run(config: &Config, client: &reqwest::Client) -> Result<usize, PipelineError> {
    let posts = collect_posts(config, client).await?;
    let body = render_json(&posts)?;
    write_atomic(&config.output_path, &body)?;
    tracing::info!(
        path = %config.output_path.display(),
        count = posts.len(),
        "Wrote posts"
    );
    Ok(posts.len())
}
