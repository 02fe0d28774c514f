//! Feed types for the relay.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{RelayError, Result};

/// Polling interval used when a feed does not set a positive one.
pub const DEFAULT_CHECK_INTERVAL_MINUTES: i64 = 15;

/// Template used when a feed has none configured.
pub const DEFAULT_TEMPLATE: &str = "**New Post:** {url}";

/// Maximum characters of `{body}` before truncation.
pub const MAX_BODY_LENGTH: usize = 1500;

/// Author name of the Reddit moderation bot.
pub const AUTOMOD_AUTHOR: &str = "AutoModerator";

/// Source platform of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Generic RSS or Atom feed.
    Rss,
    /// YouTube channel video feed.
    Youtube,
    /// New posts of a subreddit.
    Reddit,
    /// New top-level comments on one Reddit post.
    RedditComments,
}

impl Platform {
    /// Every supported platform.
    pub const ALL: [Platform; 4] = [
        Platform::Rss,
        Platform::Youtube,
        Platform::Reddit,
        Platform::RedditComments,
    ];

    /// The tag stored in the database and substituted for `{platform}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Rss => "rss",
            Platform::Youtube => "youtube",
            Platform::Reddit => "reddit",
            Platform::RedditComments => "reddit_comments",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "rss" => Ok(Platform::Rss),
            "youtube" => Ok(Platform::Youtube),
            "reddit" => Ok(Platform::Reddit),
            "reddit_comments" => Ok(Platform::RedditComments),
            other => Err(RelayError::Validation(format!("unknown platform: {other}"))),
        }
    }
}

/// Optional filter settings of a feed, stored as JSON.
///
/// Only applied to `reddit_comments` feeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMeta {
    /// Minimum comment body length in characters.
    #[serde(default, deserialize_with = "lenient_usize")]
    pub min_length: Option<usize>,
    /// Drop comments written by AutoModerator.
    #[serde(default)]
    pub ignore_automod: bool,
    /// Comma-separated keyword allow-list.
    #[serde(default)]
    pub keywords: Option<String>,
}

impl FeedMeta {
    /// Parse the JSON blob stored in the `meta` column.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RelayError::Validation(format!("invalid feed meta: {e}")))
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> String {
        // A struct of plain fields always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Trimmed, lower-cased, non-empty keywords.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// The dashboard writes numbers from form fields, sometimes as strings.
fn lenient_usize<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A configured feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Feed ID.
    pub id: i64,
    /// Source platform.
    pub platform: Platform,
    /// Platform-specific locator.
    pub source: String,
    /// Destination channel ID.
    pub channel_id: String,
    /// Message template with `{title}`, `{url}`, `{author}`, `{platform}`, `{body}`.
    pub message_template: Option<String>,
    /// Polling interval in minutes. `None` uses the configured default.
    pub check_interval_minutes: Option<i64>,
    /// Watermark: ID of the last item posted.
    pub last_posted_id: Option<String>,
    /// Whether the feed is polled.
    pub is_enabled: bool,
    /// Filter settings.
    pub meta: Option<FeedMeta>,
}

impl FeedConfig {
    /// Polling interval as a duration.
    ///
    /// Missing or non-positive intervals use `default_minutes`. Intervals
    /// too large for a [`Duration`] saturate to [`Duration::MAX`].
    pub fn check_interval(&self, default_minutes: i64) -> Duration {
        let minutes = self
            .check_interval_minutes
            .filter(|m| *m > 0)
            .unwrap_or(default_minutes);
        Duration::try_minutes(minutes).unwrap_or(Duration::MAX)
    }

    /// Check if the feed has somewhere to post.
    pub fn has_destination(&self) -> bool {
        !self.channel_id.trim().is_empty()
    }

    /// Check if the feed is due given the time of its last check attempt.
    ///
    /// A feed that was never checked is always due.
    pub fn is_due(
        &self,
        last_checked: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        default_minutes: i64,
    ) -> bool {
        match last_checked {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.check_interval(default_minutes),
        }
    }
}

/// New feed configuration for creation.
#[derive(Debug, Clone)]
pub struct NewFeedConfig {
    /// Source platform.
    pub platform: Platform,
    /// Platform-specific locator.
    pub source: String,
    /// Destination channel ID.
    pub channel_id: String,
    /// Message template.
    pub message_template: Option<String>,
    /// Polling interval in minutes.
    pub check_interval_minutes: Option<i64>,
    /// Initial watermark.
    pub last_posted_id: Option<String>,
    /// Whether the feed is polled.
    pub is_enabled: bool,
    /// Filter settings.
    pub meta: Option<FeedMeta>,
}

impl NewFeedConfig {
    /// Create a new enabled feed with defaults.
    pub fn new(platform: Platform, source: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            platform,
            source: source.into(),
            channel_id: channel_id.into(),
            message_template: None,
            check_interval_minutes: None,
            last_posted_id: None,
            is_enabled: true,
            meta: None,
        }
    }

    /// Set the message template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = Some(template.into());
        self
    }

    /// Set the polling interval.
    pub fn with_interval(mut self, minutes: i64) -> Self {
        self.check_interval_minutes = Some(minutes);
        self
    }

    /// Set the initial watermark.
    pub fn with_last_posted_id(mut self, id: impl Into<String>) -> Self {
        self.last_posted_id = Some(id.into());
        self
    }

    /// Set the filter settings.
    pub fn with_meta(mut self, meta: FeedMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Create the feed disabled.
    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

/// An item produced by a source adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedItem {
    /// Stable identifier compared against the watermark.
    pub id: String,
    /// Item title.
    pub title: Option<String>,
    /// Item link.
    pub link: Option<String>,
    /// Item author.
    pub author: Option<String>,
    /// Secondary author-like field (e.g. a contributor or creator).
    pub creator: Option<String>,
    /// Item text.
    pub body: Option<String>,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
}

impl NormalizedItem {
    /// Create an item with only an ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Pick an item ID: explicit ID, else GUID, else link.
///
/// Empty candidates are skipped. Returns `None` when nothing identifies the item.
pub fn item_key(explicit: Option<&str>, guid: Option<&str>, link: Option<&str>) -> Option<String> {
    [explicit, guid, link]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
