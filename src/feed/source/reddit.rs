//! Reddit adapters: subreddit new posts and new comments on a post.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::{HttpFetcher, SourceAdapter};
use crate::feed::types::{NormalizedItem, Platform};
use crate::{RelayError, Result};

/// Links posted to chat point here regardless of the API host.
const REDDIT_LINK_BASE: &str = "https://reddit.com";

/// Posts requested from a subreddit listing.
const POST_LIMIT: usize = 5;

/// Comments requested from a comment tree.
const COMMENT_LIMIT: usize = 20;

/// Listing wrapper returned by the JSON endpoints.
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

/// One listing child. `kind` is `t3` for posts, `t1` for comments,
/// `more` for collapsed replies.
#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    #[serde(default)]
    data: ThingData,
}

#[derive(Debug, Default, Deserialize)]
struct ThingData {
    id: Option<String>,
    title: Option<String>,
    permalink: Option<String>,
    author: Option<String>,
    body: Option<String>,
    selftext: Option<String>,
    created_utc: Option<f64>,
}

impl ThingData {
    fn link(&self) -> Option<String> {
        self.permalink
            .as_deref()
            .map(|p| format!("{REDDIT_LINK_BASE}{p}"))
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.created_utc
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
    }
}

/// New posts of a subreddit.
pub struct RedditSource {
    http: HttpFetcher,
    base_url: String,
}

impl RedditSource {
    /// Create a new adapter against `base_url` (e.g. `https://www.reddit.com`).
    pub fn new(http: HttpFetcher, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self, source: &str) -> String {
        format!(
            "{}/r/{}/new.json?limit={}",
            self.base_url,
            subreddit_name(source),
            POST_LIMIT
        )
    }
}

#[async_trait]
impl SourceAdapter for RedditSource {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn fetch_latest(&self, source: &str) -> Result<Vec<NormalizedItem>> {
        let url = self.listing_url(source);
        let bytes = self.http.get_bytes(&url).await?;
        let items = parse_listing(&bytes)?;
        debug!("Fetched {} post(s) from {}", items.len(), url);
        Ok(items)
    }
}

/// New top-level comments on one post.
pub struct RedditCommentsSource {
    http: HttpFetcher,
    base_url: String,
}

impl RedditCommentsSource {
    /// Create a new adapter against `base_url`.
    pub fn new(http: HttpFetcher, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn comments_url(&self, post_id: &str) -> String {
        format!(
            "{}/comments/{}.json?sort=new&limit={}",
            self.base_url, post_id, COMMENT_LIMIT
        )
    }
}

#[async_trait]
impl SourceAdapter for RedditCommentsSource {
    fn platform(&self) -> Platform {
        Platform::RedditComments
    }

    async fn fetch_latest(&self, source: &str) -> Result<Vec<NormalizedItem>> {
        let post_id = resolve_post_id(source)?;
        let url = self.comments_url(&post_id);
        let bytes = self.http.get_bytes(&url).await?;
        let items = parse_comment_tree(&bytes)?;
        debug!("Fetched {} comment(s) from {}", items.len(), url);
        Ok(items)
    }
}

/// Strip a leading `r/` (or `/r/`) from a subreddit source.
pub fn subreddit_name(source: &str) -> &str {
    let name = source.trim().trim_start_matches('/');
    name.strip_prefix("r/").unwrap_or(name).trim_end_matches('/')
}

/// Resolve a post source to a bare post ID.
///
/// Permalinks are matched on `comments/<id>/`; anything without a
/// `comments/` segment that is not a URL is taken as the ID itself.
pub fn resolve_post_id(source: &str) -> Result<String> {
    let source = source.trim();

    if let Some((_, rest)) = source.split_once("comments/") {
        let id = rest.split(['/', '?', '#']).next().unwrap_or("");
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    } else if !source.is_empty() && !source.contains("://") && !source.contains('/') {
        return Ok(source.to_string());
    }

    Err(RelayError::SourceFetch(format!(
        "cannot resolve a post ID from {source:?}"
    )))
}

fn parse_json<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| RelayError::SourceFetch(format!("failed to parse Reddit response: {}", e)))
}

/// Parse a subreddit "new" listing into items.
fn parse_listing(bytes: &[u8]) -> Result<Vec<NormalizedItem>> {
    let listing: Listing = parse_json(bytes)?;

    Ok(listing
        .data
        .children
        .into_iter()
        .filter_map(|child| {
            let data = child.data;
            let id = data.id.clone()?;
            Some(NormalizedItem {
                id,
                link: data.link(),
                published_at: data.published_at(),
                body: data.selftext.clone().filter(|s| !s.is_empty()),
                title: data.title,
                author: data.author,
                creator: None,
            })
        })
        .collect())
}

/// Parse a comment tree response: `[post listing, comment listing]`.
///
/// Only top-level `t1` entries are kept; each carries the post title.
fn parse_comment_tree(bytes: &[u8]) -> Result<Vec<NormalizedItem>> {
    let mut parts: Vec<Listing> = parse_json(bytes)?;
    if parts.len() < 2 {
        return Err(RelayError::SourceFetch(format!(
            "expected post and comment listings, got {} element(s)",
            parts.len()
        )));
    }

    let comments = parts.swap_remove(1);
    let post_title = parts[0]
        .data
        .children
        .first()
        .and_then(|post| post.data.title.clone());

    Ok(comments
        .data
        .children
        .into_iter()
        .filter(|child| child.kind == "t1")
        .filter_map(|child| {
            let data = child.data;
            let id = data.id.clone()?;
            Some(NormalizedItem {
                id,
                title: post_title.clone(),
                link: data.link(),
                published_at: data.published_at(),
                author: data.author,
                creator: None,
                body: data.body,
            })
        })
        .collect())
}
