//! Database schema and migrations for the feed relay.
//!
//! Migrations are applied in order; `schema_version` records which ones
//! have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Feed configurations edited by the dashboard
    r#"
CREATE TABLE feed_configs (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    platform          TEXT NOT NULL,           -- 'rss', 'youtube', 'reddit', 'reddit_comments'
    source            TEXT NOT NULL,           -- URL, channel id, subreddit or post
    channel_id        TEXT NOT NULL DEFAULT '',
    message_template  TEXT,
    last_posted_id    TEXT,                    -- watermark, NULL until first post
    is_enabled        INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at        TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_feed_configs_is_enabled ON feed_configs(is_enabled);
"#,
    // v2: Per-feed polling interval and filter settings
    r#"
ALTER TABLE feed_configs ADD COLUMN check_interval_minutes INTEGER DEFAULT 15;
ALTER TABLE feed_configs ADD COLUMN meta TEXT;                 -- JSON filter settings
"#,
];
