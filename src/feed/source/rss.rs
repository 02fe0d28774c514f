//! RSS/Atom adapters: generic feeds and YouTube channel feeds.

use async_trait::async_trait;
use feed_rs::parser;
use tracing::debug;

use super::{validate_url, HttpFetcher, SourceAdapter};
use crate::feed::types::{item_key, NormalizedItem, Platform};
use crate::{RelayError, Result};

/// Base URL of YouTube channel feeds.
const YOUTUBE_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";

/// Generic RSS or Atom feed.
pub struct RssSource {
    http: HttpFetcher,
}

impl RssSource {
    /// Create a new adapter.
    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for RssSource {
    fn platform(&self) -> Platform {
        Platform::Rss
    }

    async fn fetch_latest(&self, source: &str) -> Result<Vec<NormalizedItem>> {
        fetch_feed(&self.http, source.trim()).await
    }
}

/// YouTube channel video feed.
///
/// `source` is either a feed URL or a bare channel ID.
pub struct YoutubeSource {
    http: HttpFetcher,
}

impl YoutubeSource {
    /// Create a new adapter.
    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceAdapter for YoutubeSource {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch_latest(&self, source: &str) -> Result<Vec<NormalizedItem>> {
        fetch_feed(&self.http, &youtube_feed_url(source)).await
    }
}

/// Build the channel feed URL unless `source` already is a URL.
pub fn youtube_feed_url(source: &str) -> String {
    let source = source.trim();
    if source.starts_with("http") {
        source.to_string()
    } else {
        format!("{YOUTUBE_FEED_BASE}{source}")
    }
}

async fn fetch_feed(http: &HttpFetcher, url: &str) -> Result<Vec<NormalizedItem>> {
    validate_url(url)?;
    let bytes = http.get_bytes(url).await?;
    let items = parse_feed(&bytes)?;
    debug!("Parsed {} item(s) from {}", items.len(), url);
    Ok(items)
}

/// Parse feed bytes into items, keeping document order.
///
/// Entries without any usable identifier are dropped.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<NormalizedItem>> {
    let feed = parser::parse(bytes)
        .map_err(|e| RelayError::SourceFetch(format!("failed to parse feed: {}", e)))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let id = item_key(Some(entry.id.as_str()), None, link.as_deref())?;

            let body = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .or_else(|| {
                    entry
                        .media
                        .into_iter()
                        .find_map(|m| m.description.map(|d| d.content))
                })
                .map(|html| strip_html(&html))
                .filter(|text| !text.is_empty());

            Some(NormalizedItem {
                id,
                title: entry.title.map(|t| t.content),
                link,
                author: entry.authors.first().map(|a| a.name.clone()),
                creator: entry.contributors.first().map(|c| c.name.clone()),
                body,
                published_at: entry.published.or(entry.updated),
            })
        })
        .collect();

    Ok(items)
}

/// Strip HTML tags and decode common entities.
fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut entity: Option<String> = None;

    for ch in html.chars() {
        if let Some(buf) = entity.as_mut() {
            if ch == ';' {
                push_entity(&mut result, buf);
                entity = None;
            } else if ch.is_ascii_alphanumeric() || ch == '#' {
                buf.push(ch);
            } else {
                // Bare ampersand.
                result.push('&');
                result.push_str(buf);
                entity = None;
                if ch == '<' {
                    in_tag = true;
                } else {
                    result.push(ch);
                }
            }
            continue;
        }

        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '&' if !in_tag => entity = Some(String::new()),
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    if let Some(buf) = entity {
        result.push('&');
        result.push_str(&buf);
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_entity(out: &mut String, entity: &str) {
    let decoded = match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => parse_numeric_entity(entity).and_then(char::from_u32),
    };
    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push('&');
            out.push_str(entity);
            out.push(';');
        }
    }
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    let digits = entity.strip_prefix('#')?;
    match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => digits.parse().ok(),
    }
}
