//! Source adapters.
//!
//! Each platform tag maps to one [`SourceAdapter`]. The
//! [`SourceRegistry`] selects the adapter for a feed by lookup.

pub mod reddit;
pub mod rss;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::types::{NormalizedItem, Platform};
use crate::config::FeedsConfig;
use crate::{RelayError, Result};

pub use reddit::{RedditCommentsSource, RedditSource};
pub use rss::{RssSource, YoutubeSource};

/// Fetches and normalizes the newest items of one platform.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The platform this adapter serves.
    fn platform(&self) -> Platform;

    /// Fetch the newest items of `source`, newest first.
    async fn fetch_latest(&self, source: &str) -> Result<Vec<NormalizedItem>>;
}

/// Platform-to-adapter lookup table.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    adapters: HashMap<Platform, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the HTTP adapters for every platform.
    pub fn from_config(config: &FeedsConfig) -> Result<Self> {
        let http = HttpFetcher::new(config)?;
        let base = config.reddit_base_url.as_str();

        Ok(Self::new()
            .with_adapter(Arc::new(RssSource::new(http.clone())))
            .with_adapter(Arc::new(YoutubeSource::new(http.clone())))
            .with_adapter(Arc::new(RedditSource::new(http.clone(), base)))
            .with_adapter(Arc::new(RedditCommentsSource::new(http, base))))
    }

    /// Register an adapter, replacing any previous one for its platform.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Get the adapter for a platform.
    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&platform)
    }

    /// Fetch through the adapter registered for `platform`.
    pub async fn fetch_latest(&self, platform: Platform, source: &str) -> Result<Vec<NormalizedItem>> {
        let adapter = self.get(platform).ok_or_else(|| {
            RelayError::SourceFetch(format!("no adapter registered for {platform}"))
        })?;
        adapter.fetch_latest(source).await
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("platforms", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared HTTP client for source requests.
///
/// Carries the client identifier header, timeouts, and a response size cap.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_size: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the feed settings.
    pub fn new(config: &FeedsConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| RelayError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_size: config.max_feed_size_bytes,
        })
    }

    /// GET `url` and return the body.
    ///
    /// Non-2xx statuses and oversized bodies are errors.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::SourceFetch(format!("failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(RelayError::SourceFetch(format!(
                "HTTP error from {}: {}",
                url,
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(too_large(content_length, self.max_size));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::SourceFetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_size {
            return Err(too_large(bytes.len() as u64, self.max_size));
        }

        Ok(bytes.to_vec())
    }
}

fn too_large(size: u64, max: u64) -> RelayError {
    RelayError::SourceFetch(format!("response too large: {} bytes (max {} bytes)", size, max))
}

/// Validate a feed URL before fetching it.
///
/// Only http and https are allowed, and the host must not be a
/// loopback, private, link-local, or reserved address or hostname.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| RelayError::SourceFetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(RelayError::SourceFetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| RelayError::SourceFetch("URL has no host".to_string()))?;

    let forbidden = match host {
        url::Host::Domain(domain) => is_forbidden_hostname(domain),
        url::Host::Ipv4(ip) => is_private_ip(&IpAddr::V4(ip)),
        url::Host::Ipv6(ip) => is_private_ip(&IpAddr::V6(ip)),
    };

    if forbidden {
        return Err(RelayError::SourceFetch(format!("forbidden host: {}", host)));
    }
    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: [&str; 5] = [".local", ".localhost", ".internal", ".lan", ".home"];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // Documentation ranges
                || (a == 192 && b == 0 && c == 2)
                || (a == 198 && b == 51 && c == 100)
                || (a == 203 && b == 0 && c == 113)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link-local
        }
    }
}
