//! Feed poll loop.
//!
//! This module provides the background task that decides, once per tick,
//! which feeds are due and hands each of them to the [`Pipeline`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::delivery::Delivery;
use super::pipeline::{FeedReport, Pipeline};
use super::repository::FeedStore;
use super::source::SourceRegistry;
use super::types::DEFAULT_CHECK_INTERVAL_MINUTES;
use crate::config::FeedsConfig;

/// Default tick period in seconds (1 minute).
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;

/// Feed poll loop.
///
/// Keeps the time of each feed's last check attempt in memory only, so
/// every feed is due right after a restart.
pub struct FeedScheduler {
    pipeline: Arc<Pipeline>,
    tick_interval: Duration,
    default_check_interval_minutes: i64,
    last_checked: HashMap<i64, DateTime<Utc>>,
}

impl FeedScheduler {
    /// Create a scheduler with the default tick period.
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self::with_interval(pipeline, DEFAULT_TICK_INTERVAL_SECS)
    }

    /// Create a scheduler with a custom tick period.
    pub fn with_interval(pipeline: Arc<Pipeline>, interval_secs: u64) -> Self {
        Self {
            pipeline,
            tick_interval: Duration::from_secs(interval_secs),
            default_check_interval_minutes: DEFAULT_CHECK_INTERVAL_MINUTES,
            last_checked: HashMap::new(),
        }
    }

    /// Set the interval for feeds without one of their own.
    pub fn with_default_check_interval(mut self, minutes: i64) -> Self {
        self.default_check_interval_minutes = minutes;
        self
    }

    /// Wire up a scheduler from configuration and collaborators.
    pub fn from_config(
        config: &FeedsConfig,
        store: Arc<dyn FeedStore>,
        delivery: Arc<dyn Delivery>,
        sources: SourceRegistry,
    ) -> Self {
        let pipeline = Pipeline::new(
            store,
            delivery,
            sources,
            Duration::from_secs(config.fetch_timeout_secs),
        );
        Self::with_interval(Arc::new(pipeline), config.tick_interval_secs)
            .with_default_check_interval(config.default_check_interval_minutes)
    }

    /// Time of the last check attempt of a feed.
    pub fn last_checked(&self, feed_id: i64) -> Option<DateTime<Utc>> {
        self.last_checked.get(&feed_id).copied()
    }

    /// Run the poll loop for the life of the process.
    ///
    /// The first tick fires immediately, giving one full pass at startup.
    pub async fn run(mut self) {
        info!(
            "Feed scheduler started (tick interval: {} seconds)",
            self.tick_interval.as_secs()
        );

        let mut timer = interval(self.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            // Dropping the handles detaches the feed tasks.
            let handles = self.tick(Utc::now()).await;
            debug!("Dispatched {} feed(s)", handles.len());
        }
    }

    /// Dispatch every due feed as its own task.
    ///
    /// Each dispatched feed's last-check time is set to `now` before its
    /// task starts, whatever the task's result. Check times of feeds no
    /// longer listed are forgotten. Returns the task handles without
    /// awaiting them.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Vec<JoinHandle<FeedReport>> {
        let feeds = match self.pipeline.store().list_enabled_feeds().await {
            Ok(feeds) => feeds,
            Err(e) => {
                error!("Failed to list enabled feeds: {}", e);
                return Vec::new();
            }
        };

        let listed: HashSet<i64> = feeds.iter().map(|feed| feed.id).collect();
        self.last_checked.retain(|id, _| listed.contains(id));

        let default_minutes = self.default_check_interval_minutes;
        let due: Vec<_> = feeds
            .into_iter()
            .filter(|feed| {
                feed.is_enabled && feed.is_due(self.last_checked(feed.id), now, default_minutes)
            })
            .collect();

        if due.is_empty() {
            debug!("No feeds due");
            return Vec::new();
        }

        info!("Checking {} feed(s)", due.len());

        due.into_iter()
            .map(|feed| {
                self.last_checked.insert(feed.id, now);
                let pipeline = Arc::clone(&self.pipeline);
                tokio::spawn(async move { pipeline.run_feed(&feed).await })
            })
            .collect()
    }

    /// Dispatch due feeds and wait for all of them to finish.
    pub async fn tick_and_wait(&mut self, now: DateTime<Utc>) -> Vec<FeedReport> {
        let mut reports = Vec::new();
        for handle in self.tick(now).await {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => error!("Feed task failed: {}", e),
            }
        }
        reports
    }
}

/// Start the scheduler as a background task.
pub fn start_feed_scheduler(scheduler: FeedScheduler) -> JoinHandle<()> {
    tokio::spawn(scheduler.run())
}
