//! Configuration module for the feed relay.

use serde::Deserialize;
use std::path::Path;

use crate::{RelayError, Result};

/// Environment variable that overrides `discord.token`.
pub const TOKEN_ENV_VAR: &str = "DISCORD_TOKEN";

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feed-relay.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feed-relay.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Feed engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Whether the poll loop runs at all.
    #[serde(default = "default_feeds_enabled")]
    pub enabled: bool,
    /// Scheduler tick period in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Interval used for feeds without a positive `check_interval_minutes`.
    #[serde(default = "default_check_interval")]
    pub default_check_interval_minutes: i64,
    /// Deadline for one adapter call, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Client identifier sent with every source request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Base URL of the Reddit JSON endpoints.
    #[serde(default = "default_reddit_base_url")]
    pub reddit_base_url: String,
}

fn default_feeds_enabled() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    60 // 1 minute
}

fn default_check_interval() -> i64 {
    15
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    concat!("feed-relay/", env!("CARGO_PKG_VERSION"), " (community feed bot)").to_string()
}

fn default_reddit_base_url() -> String {
    "https://www.reddit.com".to_string()
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            enabled: default_feeds_enabled(),
            tick_interval_secs: default_tick_interval(),
            default_check_interval_minutes: default_check_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
            reddit_base_url: default_reddit_base_url(),
        }
    }
}

/// Chat platform configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Prefer setting it through `DISCORD_TOKEN`.
    #[serde(default)]
    pub token: String,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed engine configuration.
    #[serde(default)]
    pub feeds: FeedsConfig,
    /// Chat platform configuration.
    #[serde(default)]
    pub discord: DiscordConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RelayError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RelayError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            self.apply_token(token);
        }
    }

    fn apply_token(&mut self, token: String) {
        if !token.is_empty() {
            self.discord.token = token;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.feeds.enabled && self.discord.token.is_empty() {
            return Err(RelayError::Validation(format!(
                "feeds are enabled but no bot token is set. \
                 Set discord.token in config.toml or the {TOKEN_ENV_VAR} environment variable."
            )));
        }
        if self.feeds.tick_interval_secs == 0 {
            return Err(RelayError::Validation(
                "feeds.tick_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.feeds.fetch_timeout_secs == 0 || self.feeds.connect_timeout_secs == 0 {
            return Err(RelayError::Validation(
                "feed fetch timeouts must be greater than zero".to_string(),
            ));
        }
        if self.feeds.default_check_interval_minutes <= 0 {
            return Err(RelayError::Validation(
                "feeds.default_check_interval_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.database.path, "data/feed-relay.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/feed-relay.log");

        assert!(config.feeds.enabled);
        assert_eq!(config.feeds.tick_interval_secs, 60);
        assert_eq!(config.feeds.default_check_interval_minutes, 15);
        assert_eq!(config.feeds.fetch_timeout_secs, 30);
        assert_eq!(config.feeds.connect_timeout_secs, 10);
        assert_eq!(config.feeds.max_redirects, 5);
        assert_eq!(config.feeds.max_feed_size_bytes, 5 * 1024 * 1024);
        assert!(config.feeds.user_agent.starts_with("feed-relay/"));
        assert_eq!(config.feeds.reddit_base_url, "https://www.reddit.com");

        assert!(config.discord.token.is_empty());
        assert_eq!(config.discord.api_base, "https://discord.com/api/v10");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[database]
path = "custom/relay.db"

[logging]
level = "debug"
file = "custom/logs/relay.log"

[feeds]
enabled = false
tick_interval_secs = 30
default_check_interval_minutes = 5
fetch_timeout_secs = 12
connect_timeout_secs = 4
max_redirects = 2
max_feed_size_bytes = 1048576
user_agent = "goat-bot/2.0"
reddit_base_url = "https://old.reddit.com"

[discord]
token = "abc"
api_base = "http://localhost:9999/api"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.database.path, "custom/relay.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/relay.log");
        assert!(!config.feeds.enabled);
        assert_eq!(config.feeds.tick_interval_secs, 30);
        assert_eq!(config.feeds.default_check_interval_minutes, 5);
        assert_eq!(config.feeds.fetch_timeout_secs, 12);
        assert_eq!(config.feeds.connect_timeout_secs, 4);
        assert_eq!(config.feeds.max_redirects, 2);
        assert_eq!(config.feeds.max_feed_size_bytes, 1048576);
        assert_eq!(config.feeds.user_agent, "goat-bot/2.0");
        assert_eq!(config.feeds.reddit_base_url, "https://old.reddit.com");
        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.discord.api_base, "http://localhost:9999/api");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[feeds]
tick_interval_secs = 120
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.feeds.tick_interval_secs, 120);
        assert_eq!(config.feeds.default_check_interval_minutes, 15);
        assert_eq!(config.database.path, "data/feed-relay.db");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[feeds\nenabled = ");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"from/file.db\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database.path, "from/file.db");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("does/not/exist.toml");
        assert!(matches!(result, Err(RelayError::Io(_))));
    }

    #[test]
    fn test_token_override() {
        let mut config = Config::parse("[discord]\ntoken = \"file-token\"").unwrap();

        config.apply_token(String::new());
        assert_eq!(config.discord.token, "file-token");

        config.apply_token("env-token".to_string());
        assert_eq!(config.discord.token, "env-token");
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.discord.token = "token".to_string();
        assert!(config.validate().is_ok());

        config.feeds.tick_interval_secs = 0;
        assert!(config.validate().is_err());
        config.feeds.tick_interval_secs = 60;

        config.feeds.fetch_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.feeds.fetch_timeout_secs = 30;

        config.feeds.default_check_interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_disabled_feeds_without_token() {
        let mut config = Config::default();
        config.feeds.enabled = false;
        assert!(config.validate().is_ok());
    }
}
