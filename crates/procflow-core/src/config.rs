// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

/// Default number of rows fetched per bulk sweep page.
pub const DEFAULT_SWEEP_PAGE_SIZE: i64 = 100;

/// procflow-core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Engine tuning shared by the correlation engine and the archiver
    pub settings: EngineSettings,
    /// Maximum couples reported by the recovery tool after a reset
    pub couple_batch_size: i64,
}

/// Tuning knobs for the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Rows fetched per page by every bulk sweep (delete-in-pages and
    /// archive-in-pages loops).
    pub sweep_page_size: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sweep_page_size: DEFAULT_SWEEP_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `PROCFLOW_DATABASE_URL`: SQLite connection string
    ///
    /// Optional (with defaults):
    /// - `PROCFLOW_MAX_CONNECTIONS`: pool size (default: 5)
    /// - `PROCFLOW_SWEEP_PAGE_SIZE`: bulk sweep page size (default: 100)
    /// - `PROCFLOW_COUPLE_BATCH_SIZE`: couples reported after recovery (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("PROCFLOW_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("PROCFLOW_DATABASE_URL"))?;

        let max_connections: u32 = std::env::var("PROCFLOW_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("PROCFLOW_MAX_CONNECTIONS", "must be a positive integer")
            })?;

        let sweep_page_size = positive_i64("PROCFLOW_SWEEP_PAGE_SIZE", DEFAULT_SWEEP_PAGE_SIZE)?;
        let couple_batch_size = positive_i64("PROCFLOW_COUPLE_BATCH_SIZE", 100)?;

        Ok(Self {
            database_url,
            max_connections,
            settings: EngineSettings { sweep_page_size },
            couple_batch_size,
        })
    }
}

fn positive_i64(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::Invalid(var, "must be a positive integer")),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
