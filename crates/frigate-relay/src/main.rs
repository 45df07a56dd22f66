//! Frigate Relay binary.
//!
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx TELEGRAM_CHAT_ID=-100123 frigate-relay -c config.yaml
//! ```

mod cli;

use std::sync::Arc;

use clap::Parser;
use relay_core::{CacheBackend, RelayConfig};
use relay_dedup::{DedupStore, ExpiringCache, MemoryCache, RedisCache};
use relay_media::{FrigateClient, MediaFetcher};
use relay_orchestrator::{mqtt_options, EventOrchestrator, MqttSubscriber, OrchestratorConfig};
use relay_telegram::{CommandOrchestrator, DeliveryRouter, Notifier, RelayBot, TelegramNotifier};
use teloxide::prelude::*;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{log_filter, Args};

const STARTUP_MESSAGE: &str = "🚀 Frigate Relay started, waiting for events";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _ = dotenvy::dotenv();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(args.verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RelayConfig::load(&args.config)?;
    run(config).await
}

async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let routing = Arc::new(config.routing_table());
    info!(
        routes = routing.routes().len(),
        use_thread_ids = config.use_thread_ids,
        "Routing table loaded"
    );

    let cache: Arc<dyn ExpiringCache> = match config.cache_backend {
        CacheBackend::Redis => Arc::new(RedisCache::connect(&config.redis_url()).await?),
        CacheBackend::Memory => {
            warn!("Using in-memory dedup cache, handled events are forgotten on restart");
            Arc::new(MemoryCache::new())
        }
    };
    let dedup = DedupStore::new(cache, config.dedup_ttl());

    let frigate = Arc::new(FrigateClient::new(
        &config.frigate_url,
        config.snapshot_timeout(),
    ));
    info!(url = %frigate.base_url(), "Frigate client ready");

    let bot = Bot::new(&config.telegram_token);
    let me = bot.get_me().await?;
    info!(username = %me.username(), "Telegram bot initialized");

    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
        bot.clone(),
        DeliveryRouter::new(Arc::clone(&routing), config.use_thread_ids),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let orchestrator = Arc::new(EventOrchestrator::new(
        dedup.clone(),
        frigate.clone(),
        MediaFetcher::new(frigate.clone()),
        Arc::clone(&notifier),
        OrchestratorConfig::from(&config),
    ));
    let commands = Arc::new(CommandOrchestrator::new(
        frigate,
        Arc::clone(&notifier),
        dedup,
        Arc::clone(&routing),
        shutdown_tx,
    ));

    let subscriber = MqttSubscriber::new(
        mqtt_options(&config)?,
        config.mqtt_topic.clone(),
        orchestrator,
        shutdown_rx.clone(),
    );
    let relay_bot = RelayBot::new(bot, commands, Arc::clone(&notifier));

    if let Err(e) = notifier
        .send_text_to(routing.default_destination(), STARTUP_MESSAGE)
        .await
    {
        warn!(error = %e, "Failed to send startup message");
    }

    let mut restart = shutdown_rx;
    tokio::select! {
        result = relay_bot.run() => {
            warn!("Telegram dispatcher exited");
            result?;
        }
        result = subscriber.run() => {
            info!("MQTT subscriber exited");
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
        _ = shutdown_requested(&mut restart) => {
            info!("Restart requested, shutting down");
        }
    }

    Ok(())
}

/// Resolves once the shutdown flag is set.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
