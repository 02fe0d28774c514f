//! Feed relay - the feed engine of a community chat bot.
//!
//! Polls RSS, YouTube and Reddit sources on per-feed intervals and posts
//! the newest item of each feed to its chat channel.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;

pub use config::Config;
pub use db::Database;
pub use error::{RelayError, Result};
pub use feed::{
    Channel, Delivery, DiscordDelivery, FeedConfig, FeedConfigRepository, FeedMeta, FeedOutcome,
    FeedReport, FeedScheduler, FeedStore, NewFeedConfig, NormalizedItem, Pipeline, Platform,
    SourceAdapter, SourceRegistry,
};
