use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Config;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Statuses that are worth another attempt. Feed proxies and CDNs answer
/// 403 or 429 under load as often as they answer 5xx.
const RETRYABLE_STATUSES: [StatusCode; 6] = [
    StatusCode::FORBIDDEN,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Errors that can occur while downloading the feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code. After retries are used up
    /// this carries the last status seen.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// An attempt exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Builds the HTTP client used for feed requests.
///
/// Sends the headers of a desktop browser; some feed hosts answer 403 to
/// anything that looks like a script.
pub fn build_client(config: &Config) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/rss+xml, application/xml;q=0.9, */*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    match HeaderValue::from_str(&config.referer) {
        Ok(value) => {
            headers.insert(header::REFERER, value);
        }
        Err(e) => {
            tracing::warn!(referer = %config.referer, error = %e, "Invalid Referer, sending none");
        }
    }

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.request_timeout())
        .build()?;
    Ok(client)
}

/// Downloads the feed body, retrying transient failures.
///
/// Makes up to `config.max_attempts` requests. A response whose status is
/// 403, 429, 500, 502, 503 or 504 is retried after sleeping
/// `retry_delay * attempt` (2s, 4s, 6s with defaults). Any other non-2xx
/// status, a network error, or a timeout fails immediately.
///
/// # Errors
///
/// - [`FetchError::HttpStatus`] - non-retryable status, or the last status
///   once attempts are exhausted
/// - [`FetchError::Network`] - connection or TLS errors
/// - [`FetchError::Timeout`] - an attempt exceeded `config.timeout_secs`
/// - [`FetchError::ResponseTooLarge`] - body exceeded 10MB
pub async fn fetch_feed(client: &reqwest::Client, config: &Config) -> Result<Vec<u8>, FetchError> {
    let url = config.feed_url.as_str();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        let bytes = tokio::time::timeout(config.request_timeout(), fetch_once(client, url))
            .await
            .map_err(|_| FetchError::Timeout)?;

        match bytes {
            Ok(bytes) => {
                tracing::info!(url = %url, bytes = bytes.len(), attempt = attempt, "Fetched feed");
                return Ok(bytes);
            }
            Err(FetchError::HttpStatus(code))
                if is_retryable(code) && attempt < max_attempts =>
            {
                let delay = config.retry_delay() * attempt;
                tracing::warn!(
                    url = %url,
                    status = code,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transient HTTP error, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(url = %url, attempt = attempt, error = %e, "Giving up on feed fetch");
                return Err(e);
            }
        }
    }
}

fn is_retryable(code: u16) -> bool {
    RETRYABLE_STATUSES.iter().any(|s| s.as_u16() == code)
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e)
        }
    })?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
