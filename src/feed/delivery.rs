//! Message delivery to chat channels.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DiscordConfig;
use crate::{RelayError, Result};

/// Request timeout for chat API calls.
const API_TIMEOUT_SECS: u64 = 15;

/// A resolved destination channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Channel ID.
    pub id: String,
    /// Channel name, when the platform reports one.
    pub name: Option<String>,
}

/// Delivery collaborator of the feed engine.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Look up a channel. `Ok(None)` means it does not exist or is not visible.
    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<Channel>>;

    /// Send a text message, returning the new message's ID.
    async fn send(&self, channel: &Channel, text: &str) -> Result<String>;
}

/// Delivery through the Discord REST API with a bot token.
pub struct DiscordDelivery {
    client: Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

impl DiscordDelivery {
    /// Create a delivery client.
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(RelayError::Config("bot token is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .user_agent(concat!("DiscordBot (feed-relay, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn channel_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}", self.api_base, channel_id)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }
}

#[async_trait]
impl Delivery for DiscordDelivery {
    async fn resolve_channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        if channel_id.is_empty() || !channel_id.chars().all(|c| c.is_ascii_digit()) {
            return Ok(None);
        }

        let response = self
            .client
            .get(self.channel_url(channel_id))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| RelayError::DestinationUnresolved(format!("channel {channel_id}: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => {
                return Err(RelayError::DestinationUnresolved(format!(
                    "channel {channel_id}: HTTP {status}"
                )));
            }
            _ => {}
        }

        let channel: ChannelResponse = response.json().await.map_err(|e| {
            RelayError::DestinationUnresolved(format!("channel {channel_id}: {e}"))
        })?;

        Ok(Some(Channel {
            id: channel.id,
            name: channel.name,
        }))
    }

    async fn send(&self, channel: &Channel, text: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/messages", self.channel_url(&channel.id)))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&CreateMessage { content: text })
            .send()
            .await
            .map_err(|e| RelayError::Delivery(format!("channel {}: {}", channel.id, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RelayError::Delivery(format!(
                "channel {}: HTTP {}: {}",
                channel.id, status, detail
            )));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Delivery(format!("channel {}: {}", channel.id, e)))?;

        debug!("Sent message {} to channel {}", message.id, channel.id);
        Ok(message.id)
    }
}
