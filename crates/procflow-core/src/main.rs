// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! procflow-recover - crash recovery for a procflow-core database
//!
//! Runs the start-up resets (claimed waiting events and message instances go
//! back to matchable), then reports how many message/event couples are ready
//! to be handed to workers.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use procflow_core::config::Config;
use procflow_core::definition::{DefinitionCache, InMemoryDefinitionSource};
use procflow_core::persistence::{Persistence, SqlitePersistence};
use procflow_core::runtime::EngineRuntime;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("procflow_core=info".parse()?),
        )
        .init();

    info!("Starting procflow-recover");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        max_connections = config.max_connections,
        sweep_page_size = config.settings.sweep_page_size,
        couple_batch_size = config.couple_batch_size,
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let persistence =
        Arc::new(SqlitePersistence::connect(&config.database_url, config.max_connections).await?);

    if !persistence.health_check_db().await? {
        anyhow::bail!("database health check failed");
    }
    info!("Database health check passed");

    // Definitions are not needed to reset or list couples.
    let definitions = Arc::new(DefinitionCache::new(Arc::new(
        InMemoryDefinitionSource::new(),
    )));

    let runtime = EngineRuntime::builder()
        .persistence(persistence.clone())
        .definitions(definitions)
        .settings(config.settings)
        .build()?
        .start()
        .await?;

    let recovery = runtime.recovery();
    let couples = runtime
        .events()
        .get_message_event_couples(0, config.couple_batch_size as usize)
        .await?;

    info!(
        waiting_events = recovery.waiting_events,
        messages = recovery.messages,
        couples = couples.len(),
        "Recovery complete"
    );

    persistence.pool().close().await;
    Ok(())
}
