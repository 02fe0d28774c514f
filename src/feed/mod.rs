//! Feed engine.
//!
//! Polls configured RSS, YouTube and Reddit sources and relays the newest
//! item of each feed to its chat channel.

pub mod delivery;
pub mod filter;
pub mod pipeline;
pub mod repository;
pub mod scheduler;
pub mod source;
pub mod template;
pub mod types;

pub use delivery::{Channel, Delivery, DiscordDelivery};
pub use filter::{apply_filters, FilterRejection};
pub use pipeline::{FeedOutcome, FeedReport, Pipeline, SkipReason};
pub use repository::{FeedConfigRepository, FeedStore};
pub use scheduler::{start_feed_scheduler, FeedScheduler, DEFAULT_TICK_INTERVAL_SECS};
pub use source::{HttpFetcher, SourceAdapter, SourceRegistry};
pub use template::render;
pub use types::{
    FeedConfig, FeedMeta, NewFeedConfig, NormalizedItem, Platform, DEFAULT_CHECK_INTERVAL_MINUTES,
    DEFAULT_TEMPLATE, MAX_BODY_LENGTH,
};
