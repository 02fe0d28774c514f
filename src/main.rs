use std::sync::Arc;

use tracing::{error, info};

use feed_relay::feed::start_feed_scheduler;
use feed_relay::{Config, Database, DiscordDelivery, FeedScheduler, SourceRegistry};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = feed_relay::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feed_relay::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> feed_relay::Result<()> {
    config.validate()?;

    info!("Feed relay starting");

    if !config.feeds.enabled {
        info!("Feeds are disabled in configuration; nothing to do");
        return Ok(());
    }

    let db = Arc::new(Database::open(&config.database.path).await?);
    let sources = SourceRegistry::from_config(&config.feeds)?;
    let delivery = Arc::new(DiscordDelivery::new(&config.discord)?);

    let scheduler = FeedScheduler::from_config(&config.feeds, db, delivery, sources);
    let handle = start_feed_scheduler(scheduler);

    tokio::select! {
        result = handle => {
            if let Err(e) = result {
                error!("Feed scheduler stopped unexpectedly: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
