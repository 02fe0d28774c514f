//! Per-feed dispatch pipeline.
//!
//! One run takes one feed through fetch, watermark comparison, filtering,
//! rendering, delivery, and the watermark update. Errors stop at
//! [`Pipeline::run_feed`] and never reach other feeds.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::delivery::Delivery;
use super::filter::{apply_filters, FilterRejection};
use super::repository::FeedStore;
use super::source::SourceRegistry;
use super::template::render;
use super::types::{FeedConfig, NormalizedItem, Platform};
use crate::{RelayError, Result};

/// Why a feed was not processed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The feed is disabled.
    Disabled,
    /// The feed has no destination channel.
    NoDestination,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Not processed.
    Skipped(SkipReason),
    /// The source returned no items.
    Empty,
    /// The newest item is already the watermark.
    Unchanged,
    /// The newest item was held back; the watermark is untouched.
    Filtered {
        item_id: String,
        reason: FilterRejection,
    },
    /// The newest item was delivered.
    ///
    /// `watermark_saved` is false when the post succeeded but the
    /// watermark write failed, so the item may be posted again.
    Posted {
        item_id: String,
        message_id: String,
        watermark_saved: bool,
    },
}

/// Outcome of one feed attempt, as seen by the scheduler.
#[derive(Debug)]
pub struct FeedReport {
    /// Feed ID.
    pub feed_id: i64,
    /// Pipeline result.
    pub outcome: Result<FeedOutcome>,
}

impl FeedReport {
    /// Check if the attempt delivered a message.
    pub fn posted(&self) -> bool {
        matches!(self.outcome, Ok(FeedOutcome::Posted { .. }))
    }
}

/// The collaborators one pipeline run needs.
pub struct Pipeline {
    store: Arc<dyn FeedStore>,
    delivery: Arc<dyn Delivery>,
    sources: SourceRegistry,
    fetch_timeout: Duration,
}

impl Pipeline {
    /// Create a pipeline.
    pub fn new(
        store: Arc<dyn FeedStore>,
        delivery: Arc<dyn Delivery>,
        sources: SourceRegistry,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            delivery,
            sources,
            fetch_timeout,
        }
    }

    /// The persistence collaborator.
    pub fn store(&self) -> &Arc<dyn FeedStore> {
        &self.store
    }

    /// Run one feed and log any failure with the feed's identity.
    pub async fn run_feed(&self, feed: &FeedConfig) -> FeedReport {
        let outcome = self.process_feed(feed).await;

        match &outcome {
            Ok(FeedOutcome::Filtered { item_id, reason }) => {
                debug!("Feed {} held back item {}: {}", feed.id, item_id, reason);
            }
            Ok(other) => debug!("Feed {} finished: {:?}", feed.id, other),
            Err(e @ (RelayError::SourceFetch(_) | RelayError::DestinationUnresolved(_))) => {
                warn!(
                    "Error processing feed {} ({} {}): {}",
                    feed.id, feed.platform, feed.source, e
                );
            }
            Err(e) => {
                error!(
                    "Error processing feed {} ({} {}): {}",
                    feed.id, feed.platform, feed.source, e
                );
            }
        }

        FeedReport {
            feed_id: feed.id,
            outcome,
        }
    }

    /// Take one feed through the pipeline.
    ///
    /// Only the newest item is considered. The watermark advances only
    /// after a successful delivery.
    pub async fn process_feed(&self, feed: &FeedConfig) -> Result<FeedOutcome> {
        if !feed.is_enabled {
            return Ok(FeedOutcome::Skipped(SkipReason::Disabled));
        }
        if !feed.has_destination() {
            return Ok(FeedOutcome::Skipped(SkipReason::NoDestination));
        }

        let items = self.fetch(feed.platform, &feed.source).await?;

        let Some(latest) = items.into_iter().next() else {
            return Ok(FeedOutcome::Empty);
        };

        if feed.last_posted_id.as_deref() == Some(latest.id.as_str()) {
            return Ok(FeedOutcome::Unchanged);
        }

        if let Err(reason) = apply_filters(feed, &latest) {
            return Ok(FeedOutcome::Filtered {
                item_id: latest.id,
                reason,
            });
        }

        let channel = self
            .delivery
            .resolve_channel(&feed.channel_id)
            .await?
            .ok_or_else(|| {
                RelayError::DestinationUnresolved(format!(
                    "channel {} not found for feed {}",
                    feed.channel_id, feed.id
                ))
            })?;

        let text = render(feed.message_template.as_deref(), &latest, feed.platform);
        let message_id = self.delivery.send(&channel, &text).await?;

        info!(
            "Posted new {} item to {}: {}",
            feed.platform,
            channel.name.as_deref().unwrap_or(&channel.id),
            latest.title.as_deref().unwrap_or(&latest.id)
        );

        let watermark_saved = match self.store.update_watermark(feed.id, &latest.id).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Posted item {} for feed {} but failed to save watermark: {}",
                    latest.id, feed.id, e
                );
                false
            }
        };

        Ok(FeedOutcome::Posted {
            item_id: latest.id,
            message_id,
            watermark_saved,
        })
    }

    /// Fetch through the registry under the per-attempt deadline.
    async fn fetch(&self, platform: Platform, source: &str) -> Result<Vec<NormalizedItem>> {
        tokio::time::timeout(self.fetch_timeout, self.sources.fetch_latest(platform, source))
            .await
            .map_err(|_| {
                RelayError::SourceFetch(format!(
                    "timed out after {}s fetching {}",
                    self.fetch_timeout.as_secs(),
                    source
                ))
            })?
    }
}
