use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use build_feed::config::Config;
use build_feed::feed::build_client;
use build_feed::pipeline;

#[derive(Parser, Debug)]
#[command(name = "build-feed", about = "Builds posts.json from an RSS feed")]
struct Args {
    /// TOML file overriding the built-in settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed to fetch instead of the configured one
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Where to write the JSON array
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum number of posts to keep
    #[arg(long, value_name = "N")]
    max_posts: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_required(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(url) = self.feed_url {
            config.feed_url = url;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(max_posts) = self.max_posts {
            config.max_posts = max_posts;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config()?;
    tracing::debug!(?config, "Starting run");

    let client = build_client(&config).context("Failed to build HTTP client")?;

    match pipeline::run(&config, &client).await {
        Ok(count) => {
            println!(
                "[build_feed] wrote {} with {} items",
                config.output_path.display(),
                count
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("[build_feed] ERROR {}: {}", e.stage(), e);
            std::process::exit(1);
        }
    }
}
