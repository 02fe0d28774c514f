//! Feed configuration persistence.

use async_trait::async_trait;
use tracing::warn;

use super::types::{FeedConfig, FeedMeta, NewFeedConfig, Platform};
use crate::db::{Database, DbPool};
use crate::{RelayError, Result};

/// Persistence collaborator of the feed engine.
///
/// The engine only reads enabled feeds and advances watermarks; everything
/// else about a feed is edited elsewhere.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// List every enabled feed.
    async fn list_enabled_feeds(&self) -> Result<Vec<FeedConfig>>;

    /// Record `item_id` as the last item posted for `feed_id`.
    async fn update_watermark(&self, feed_id: i64, item_id: &str) -> Result<()>;
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, platform, source, channel_id, message_template, check_interval_minutes,
           last_posted_id, is_enabled, meta
    FROM feed_configs
"#;

/// Row type for a feed configuration from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedConfigRow {
    id: i64,
    platform: String,
    source: String,
    channel_id: String,
    message_template: Option<String>,
    check_interval_minutes: Option<i64>,
    last_posted_id: Option<String>,
    is_enabled: bool,
    meta: Option<String>,
}

impl TryFrom<FeedConfigRow> for FeedConfig {
    type Error = RelayError;

    fn try_from(row: FeedConfigRow) -> Result<Self> {
        let platform: Platform = row.platform.parse()?;

        let meta = match row.meta.as_deref().map(str::trim) {
            None | Some("") | Some("null") => None,
            Some(json) => match FeedMeta::from_json(json) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!("Ignoring filters of feed {}: {}", row.id, e);
                    None
                }
            },
        };

        Ok(FeedConfig {
            id: row.id,
            platform,
            source: row.source,
            channel_id: row.channel_id,
            message_template: row.message_template,
            check_interval_minutes: row.check_interval_minutes.filter(|m| *m > 0),
            last_posted_id: row.last_posted_id,
            is_enabled: row.is_enabled,
            meta,
        })
    }
}

/// Convert rows, skipping any with an unknown platform.
fn convert_rows(rows: Vec<FeedConfigRow>) -> Vec<FeedConfig> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match FeedConfig::try_from(row) {
                Ok(feed) => Some(feed),
                Err(e) => {
                    warn!("Skipping feed {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

/// Repository for feed configuration operations.
pub struct FeedConfigRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedConfigRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    pub async fn create(&self, feed: &NewFeedConfig) -> Result<FeedConfig> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feed_configs (platform, source, channel_id, message_template,
                                      check_interval_minutes, last_posted_id, is_enabled, meta)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(feed.platform.as_str())
        .bind(&feed.source)
        .bind(&feed.channel_id)
        .bind(&feed.message_template)
        .bind(feed.check_interval_minutes)
        .bind(&feed.last_posted_id)
        .bind(feed.is_enabled)
        .bind(feed.meta.as_ref().map(FeedMeta::to_json))
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| RelayError::NotFound("feed".into()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FeedConfig>> {
        let row = sqlx::query_as::<_, FeedConfigRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(FeedConfig::try_from).transpose()
    }

    /// List all feeds, enabled or not.
    pub async fn list_all(&self) -> Result<Vec<FeedConfig>> {
        let rows = sqlx::query_as::<_, FeedConfigRow>(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .fetch_all(self.pool)
            .await?;

        Ok(convert_rows(rows))
    }

    /// List enabled feeds.
    pub async fn list_enabled(&self) -> Result<Vec<FeedConfig>> {
        let rows = sqlx::query_as::<_, FeedConfigRow>(&format!(
            "{SELECT_COLUMNS} WHERE is_enabled = 1 ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(convert_rows(rows))
    }

    /// Set the watermark of a feed.
    ///
    /// Returns `false` if the feed does not exist.
    pub async fn update_watermark(&self, id: i64, item_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feed_configs
            SET last_posted_id = $1, updated_at = datetime('now')
            WHERE id = $2
            "#,
        )
        .bind(item_id)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Enable or disable a feed.
    ///
    /// Returns `false` if the feed does not exist.
    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE feed_configs SET is_enabled = $1, updated_at = datetime('now') WHERE id = $2",
        )
        .bind(enabled)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a feed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_configs WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FeedStore for Database {
    async fn list_enabled_feeds(&self) -> Result<Vec<FeedConfig>> {
        FeedConfigRepository::new(self.pool()).list_enabled().await
    }

    async fn update_watermark(&self, feed_id: i64, item_id: &str) -> Result<()> {
        if FeedConfigRepository::new(self.pool())
            .update_watermark(feed_id, item_id)
            .await?
        {
            Ok(())
        } else {
            Err(RelayError::NotFound(format!("feed {feed_id}")))
        }
    }
}
