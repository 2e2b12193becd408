// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finsight_social::api::{self, AppState};
use finsight_social::config::Config;
use finsight_social::db::init_database;
use finsight_social::delivery::{DeliveryChannel, LiveStreamChannel, PushChannel};
use finsight_social::fanout::NotificationEngine;
use finsight_social::ledger::RelationshipLedger;
use finsight_social::store::{PgStore, SocialStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,finsight_social=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::get();
    info!("Initialized configuration");

    // Initialize database and run migrations
    let db = init_database().await?;
    info!("Connected to database");

    let store: Arc<dyn SocialStore> = Arc::new(PgStore::new(&db));
    let ledger = Arc::new(RelationshipLedger::new(
        store.clone(),
        config.notifications.page_limit,
    ));

    // Delivery channels shared between the engine and the API
    let stream = Arc::new(LiveStreamChannel::new(config.notifications.stream_buffer));
    let push = Arc::new(PushChannel::new());
    let channels: Vec<Arc<dyn DeliveryChannel>> = vec![push.clone(), stream.clone()];

    let engine = Arc::new(NotificationEngine::new(
        store.clone(),
        ledger.clone(),
        channels,
        config.notifications.page_limit,
    ));

    let state = AppState {
        store,
        ledger,
        engine,
        stream,
        push,
    };

    // Start API server
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::start_api_server(state).await {
            error!("API server error: {}", e);
        }
    });

    // Handle shutdown signals
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, initiating graceful shutdown"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let _ = api_handle.await;

    info!("Finsight social service shutdown complete");
    Ok(())
}
