//! Test helpers for feed engine integration tests.
//!
//! Provides in-process fakes of the source, delivery and persistence
//! collaborators, plus database setup helpers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use feed_relay::feed::{Channel, Delivery, FeedStore, SourceAdapter, SourceRegistry};
use feed_relay::{
    Database, FeedConfig, FeedConfigRepository, NewFeedConfig, NormalizedItem, Pipeline,
    Platform, RelayError, Result,
};

/// Fetch deadline used by test pipelines.
pub const TEST_FETCH_TIMEOUT: Duration = Duration::from_millis(200);

/// What a fake source returns for one locator.
#[derive(Debug, Clone)]
pub enum SourceResponse {
    Items(Vec<NormalizedItem>),
    Fail(String),
    /// Never completes.
    Hang,
}

/// Scriptable source adapter that records every fetch.
pub struct FakeSource {
    platform: Platform,
    responses: Mutex<HashMap<String, SourceResponse>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Self {
            platform,
            responses: Mutex::new(HashMap::new()),
            fetches: Mutex::new(Vec::new()),
        })
    }

    pub fn respond(&self, source: &str, response: SourceResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(source.to_string(), response);
    }

    pub fn respond_items(&self, source: &str, items: Vec<NormalizedItem>) {
        self.respond(source, SourceResponse::Items(items));
    }

    /// Number of fetches of `source` so far.
    pub fn fetch_count(&self, source: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == source)
            .count()
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_latest(&self, source: &str) -> Result<Vec<NormalizedItem>> {
        self.fetches.lock().unwrap().push(source.to_string());
        let response = self.responses.lock().unwrap().get(source).cloned();
        match response {
            Some(SourceResponse::Items(items)) => Ok(items),
            Some(SourceResponse::Fail(msg)) => Err(RelayError::SourceFetch(msg)),
            Some(SourceResponse::Hang) => std::future::pending().await,
            None => Err(RelayError::SourceFetch(format!("no response for {source}"))),
        }
    }
}

/// Delivery fake with a fixed set of existing channels.
pub struct FakeDelivery {
    channels: HashSet<String>,
    sent: Mutex<Vec<(String, String)>>,
    fail_send: bool,
}

impl FakeDelivery {
    pub fn new(channels: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
            fail_send: false,
        })
    }

    pub fn failing(channels: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
            fail_send: true,
        })
    }

    /// Messages sent so far as `(channel_id, text)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, channel_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(c, _)| c == channel_id)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        Ok(self.channels.contains(channel_id).then(|| Channel {
            id: channel_id.to_string(),
            name: Some(format!("channel-{channel_id}")),
        }))
    }

    async fn send(&self, channel: &Channel, text: &str) -> Result<String> {
        if self.fail_send {
            return Err(RelayError::Delivery("missing permissions".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((channel.id.clone(), text.to_string()));
        Ok(format!("msg-{}", sent.len()))
    }
}

/// Store wrapper whose operations can be made to fail.
pub struct FlakyStore {
    inner: Arc<Database>,
    fail_list: bool,
    fail_watermark: bool,
}

impl FlakyStore {
    pub fn failing_watermarks(inner: Arc<Database>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_list: false,
            fail_watermark: true,
        })
    }

    pub fn failing_listing(inner: Arc<Database>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_list: true,
            fail_watermark: false,
        })
    }
}

#[async_trait]
impl FeedStore for FlakyStore {
    async fn list_enabled_feeds(&self) -> Result<Vec<FeedConfig>> {
        if self.fail_list {
            return Err(RelayError::Database("database is locked".to_string()));
        }
        self.inner.list_enabled_feeds().await
    }

    async fn update_watermark(&self, feed_id: i64, item_id: &str) -> Result<()> {
        if self.fail_watermark {
            return Err(RelayError::Database("disk I/O error".to_string()));
        }
        self.inner.update_watermark(feed_id, item_id).await
    }
}

/// Open an in-memory database.
pub async fn setup_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().await.unwrap())
}

/// Insert a feed and return it.
pub async fn create_feed(db: &Database, feed: NewFeedConfig) -> FeedConfig {
    FeedConfigRepository::new(db.pool())
        .create(&feed)
        .await
        .unwrap()
}

/// Reload a feed from the database.
pub async fn reload(db: &Database, id: i64) -> FeedConfig {
    FeedConfigRepository::new(db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

/// Registry serving every given fake.
pub fn registry(sources: &[Arc<FakeSource>]) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for source in sources {
        registry.register(source.clone());
    }
    registry
}

/// Pipeline over the given collaborators.
pub fn pipeline(
    store: Arc<dyn FeedStore>,
    delivery: Arc<dyn Delivery>,
    sources: &[Arc<FakeSource>],
) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(
        store,
        delivery,
        registry(sources),
        TEST_FETCH_TIMEOUT,
    ))
}
