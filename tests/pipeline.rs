//! End-to-end tests for a pipeline run: mocked feed server in, JSON file out.
//!
//! Each test gets its own temp directory and wiremock server so runs are
//! isolated. Retry delays are shortened to keep the suite fast.

use std::path::PathBuf;

use build_feed::config::Config;
use build_feed::feed::{build_client, build_record, parse_feed};
use build_feed::pipeline::{run, PipelineError};
use build_feed::util::parse_date;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use wiremock::matchers::{any, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NAMESPACES: &str = r#"xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:media="http://search.yahoo.com/mrss/"
     xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:atom="http://www.w3.org/2005/Atom""#;

fn rss(items: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" {NAMESPACES}>
<channel>
  <title>The Shifting Tide</title>
  <link>https://theshiftingtide.com</link>
  {items}
</channel>
</rss>"#
    )
}

fn numbered_items(n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                "<item><title>Post {i}</title><link>https://example.com/p/{i}</link>\
                 <pubDate>Wed, 22 Oct 2025 07:00:00 GMT</pubDate></item>"
            )
        })
        .collect()
}

fn temp_output(name: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("build_feed_it_{name}"));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("posts.json");
    (dir, path)
}

fn test_config(server: &MockServer, output_path: PathBuf) -> Config {
    Config {
        feed_url: format!("{}/feed", server.uri()),
        output_path,
        retry_delay_ms: 10,
        timeout_secs: 5,
        ..Config::default()
    }
}

async fn serve(body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(&server)
        .await;
    server
}

async fn run_and_read(config: &Config) -> Value {
    let client = build_client(config).unwrap();
    run(config, &client).await.unwrap();
    serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap()
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_single_item_scenario() {
    let server = serve(rss(
        r#"<item>
    <title>Hello</title>
    <link>https://theshiftingtide.com/p/hello</link>
    <pubDate>Wed, 22 Oct 2025 07:00:00 GMT</pubDate>
    <description>&lt;p&gt;World&lt;/p&gt;</description>
  </item>"#,
    ))
    .await;
    let (dir, path) = temp_output("single");
    let config = test_config(&server, path);

    let posts = run_and_read(&config).await;

    assert_eq!(
        posts,
        json!([{
            "title": "Hello",
            "subtitle": "World",
            "date": "2025-10-22T07:00:00+00:00",
            "url": "https://theshiftingtide.com/p/hello",
            "image": null
        }])
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_substack_style_item() {
    let long_body = "word ".repeat(100);
    let server = serve(rss(&format!(
        r#"<item>
    <title><![CDATA[Tides & Currents]]></title>
    <description><![CDATA[A short teaser]]></description>
    <link>https://theshiftingtide.com/p/tides</link>
    <dc:creator><![CDATA[Piero]]></dc:creator>
    <pubDate>Thu, 16 Oct 2025 12:30:00 GMT</pubDate>
    <enclosure url="https://substack-post-media.s3.amazonaws.com/enclosure.jpeg" type="image/jpeg"/>
    <content:encoded><![CDATA[<div><img src="https://substack-post-media.s3.amazonaws.com/inline.png"/><p>{long_body}</p></div>]]></content:encoded>
  </item>"#
    )))
    .await;
    let (dir, path) = temp_output("substack");
    let config = test_config(&server, path);

    let posts = run_and_read(&config).await;
    let post = &posts[0];

    assert_eq!(post["title"], "Tides & Currents");
    assert_eq!(post["subtitle"], "A short teaser");
    assert_eq!(post["date"], "2025-10-16T12:30:00+00:00");
    assert_eq!(
        post["image"],
        "https://substack-post-media.s3.amazonaws.com/inline.png"
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_limits_to_twelve_in_feed_order() {
    let server = serve(rss(&numbered_items(15))).await;
    let (dir, path) = temp_output("limit");
    let config = test_config(&server, path);

    let posts = run_and_read(&config).await;
    let titles: Vec<&str> = posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();

    let expected: Vec<String> = (0..12).map(|i| format!("Post {i}")).collect();
    assert_eq!(titles, expected);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_empty_feed_writes_empty_array() {
    let server = serve(rss("")).await;
    let (dir, path) = temp_output("empty");
    let config = test_config(&server, path.clone());

    let client = build_client(&config).unwrap();
    assert_eq!(run(&config, &client).await.unwrap(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_unparseable_date_still_produces_record() {
    let server = serve(rss(
        "<item><title>Undated</title><pubDate>sometime soon</pubDate></item>",
    ))
    .await;
    let (dir, path) = temp_output("undated");
    let config = test_config(&server, path);

    let posts = run_and_read(&config).await;
    let date = posts[0]["date"].as_str().unwrap();
    assert!(parse_date(date).is_some(), "fallback date {date} must be ISO 8601");

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_recovers_from_transient_403() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&numbered_items(1))))
        .mount(&server)
        .await;

    let (dir, path) = temp_output("transient");
    let config = test_config(&server, path);

    let posts = run_and_read(&config).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Failures leave no output
// ============================================================================

#[tokio::test]
async fn test_fetch_failure_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let (dir, path) = temp_output("fetch_fail");
    let config = test_config(&server, path.clone());

    let client = build_client(&config).unwrap();
    let err = run(&config, &client).await.unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(_)));
    assert!(err.to_string().contains("404"));
    assert!(!path.exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_malformed_xml_keeps_previous_output() {
    let server = serve("<rss><channel><item></channel>".to_string()).await;
    let (dir, path) = temp_output("parse_fail");
    std::fs::write(&path, "[\"previous\"]").unwrap();
    let config = test_config(&server, path.clone());

    let client = build_client(&config).unwrap();
    let err = run(&config, &client).await.unwrap_err();

    assert!(matches!(err, PipelineError::Parse(_)));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\"previous\"]");

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_output_length_is_min_of_items_and_limit(n in 0usize..40) {
        let doc = rss(&numbered_items(n));
        let parsed = parse_feed(doc.as_bytes(), 12).unwrap();
        let records: Vec<_> = parsed.items.iter().map(build_record).collect();
        prop_assert_eq!(records.len(), n.min(12));
        prop_assert_eq!(parsed.skipped, n.saturating_sub(12));
    }

    #[test]
    fn prop_subtitles_are_bounded(body in "[a-zA-Z <>/=\"]{0,500}") {
        let escaped = body
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        let doc = rss(&format!("<item><description>{escaped}</description></item>"));
        let parsed = parse_feed(doc.as_bytes(), 12).unwrap();
        let record = build_record(&parsed.items[0]);
        prop_assert!(record.subtitle.chars().count() <= 221);
        prop_assert!(!record.subtitle.contains('<') && !record.subtitle.contains('>'));
    }
}
