//! Pipeline configuration.
//!
//! Every tunable of a run lives in [`Config`]. Defaults reproduce the
//! built-in constants; a TOML file and CLI flags may override them.
//! A missing config file yields `Config::default()` from [`Config::load`];
//! a file named on the command line must exist ([`Config::load_required`]).
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_FEED_URL: &str = "https://substack-feed-proxy.piero-ferrando.workers.dev/";
pub const DEFAULT_OUTPUT_PATH: &str = "posts.json";
pub const DEFAULT_MAX_POSTS: usize = 12;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://theshiftingtide.com/";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Settings for one pipeline run.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RSS feed to fetch.
    pub feed_url: String,

    /// Where the JSON array is written. Overwritten on every run.
    pub output_path: PathBuf,

    /// Items beyond this count are ignored.
    pub max_posts: usize,

    /// Total HTTP attempts, including the first one.
    pub max_attempts: u32,

    /// Base backoff; attempt `n` waits `n * retry_delay_ms` before retrying.
    pub retry_delay_ms: u64,

    /// Per-attempt timeout covering both the request and the body read.
    pub timeout_secs: u64,

    pub user_agent: String,

    pub referer: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            max_posts: DEFAULT_MAX_POSTS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "feed_url",
        "output_path",
        "max_posts",
        "max_attempts",
        "retry_delay_ms",
        "timeout_secs",
        "user_agent",
        "referer",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feed = %config.feed_url, "Loaded configuration");
        Ok(config)
    }

    /// Load a configuration file the user asked for by name.
    ///
    /// Same as [`Config::load`], except a missing file is
    /// `Err(ConfigError::NotFound)` instead of the defaults.
    pub fn load_required(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(ConfigError::Io(e)),
            Ok(_) => Self::load(path),
        }
    }

    /// Checks settings that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.feed_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.feed_url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::InvalidUrl {
                    url: self.feed_url.clone(),
                    reason: format!("unsupported scheme '{scheme}' (only http/https allowed)"),
                })
            }
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
