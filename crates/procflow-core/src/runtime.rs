// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for procflow-core.
//!
//! [`EngineRuntime`] wires the correlation engine and the archiver over one
//! persistence handle and runs crash recovery before handing them out, so no
//! matching can happen against rows a crashed worker left claimed.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use procflow_core::definition::{DefinitionCache, InMemoryDefinitionSource};
//! use procflow_core::persistence::SqlitePersistence;
//! use procflow_core::runtime::EngineRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let persistence = Arc::new(SqlitePersistence::from_path(".data/procflow.db").await?);
//!     let definitions = Arc::new(DefinitionCache::new(Arc::new(InMemoryDefinitionSource::new())));
//!
//!     let runtime = EngineRuntime::builder()
//!         .persistence(persistence)
//!         .definitions(definitions)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     let couples = runtime.events().get_message_event_couples(0, 100).await?;
//!     // ... hand couples to workers ...
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::archive::Archiver;
use crate::config::EngineSettings;
use crate::definition::ProcessDefinitionLookup;
use crate::events::EventService;
use crate::notifier::{ChangeNotifier, NoopNotifier};
use crate::persistence::Persistence;

/// Builder for creating an [`EngineRuntime`].
pub struct EngineRuntimeBuilder {
    persistence: Option<Arc<dyn Persistence>>,
    definitions: Option<Arc<dyn ProcessDefinitionLookup>>,
    notifier: Arc<dyn ChangeNotifier>,
    settings: EngineSettings,
}

impl std::fmt::Debug for EngineRuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntimeBuilder")
            .field("persistence", &self.persistence.as_ref().map(|_| "..."))
            .field("definitions", &self.definitions.as_ref().map(|_| "..."))
            .field("settings", &self.settings)
            .finish()
    }
}

impl Default for EngineRuntimeBuilder {
    fn default() -> Self {
        Self {
            persistence: None,
            definitions: None,
            notifier: Arc::new(NoopNotifier),
            settings: EngineSettings::default(),
        }
    }
}

impl EngineRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persistence layer (required).
    pub fn persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Set the process definition lookup (required).
    pub fn definitions(mut self, definitions: Arc<dyn ProcessDefinitionLookup>) -> Self {
        self.definitions = Some(definitions);
        self
    }

    /// Set the change notifier.
    ///
    /// Default: [`NoopNotifier`]
    pub fn notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the engine settings.
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<EngineRuntimeConfig> {
        let persistence = self
            .persistence
            .ok_or_else(|| anyhow::anyhow!("persistence is required"))?;
        let definitions = self
            .definitions
            .ok_or_else(|| anyhow::anyhow!("definitions are required"))?;
        if self.settings.sweep_page_size <= 0 {
            anyhow::bail!("sweep_page_size must be positive");
        }

        Ok(EngineRuntimeConfig {
            persistence,
            definitions,
            notifier: self.notifier,
            settings: self.settings,
        })
    }
}

/// Configuration for an [`EngineRuntime`].
pub struct EngineRuntimeConfig {
    persistence: Arc<dyn Persistence>,
    definitions: Arc<dyn ProcessDefinitionLookup>,
    notifier: Arc<dyn ChangeNotifier>,
    settings: EngineSettings,
}

impl std::fmt::Debug for EngineRuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntimeConfig")
            .field("persistence", &"...")
            .field("definitions", &"...")
            .field("settings", &self.settings)
            .finish()
    }
}

impl EngineRuntimeConfig {
    /// Run crash recovery, then build the services.
    ///
    /// Both in-progress resets complete before this returns; nothing else
    /// in the crate issues them.
    pub async fn start(self) -> Result<EngineRuntime> {
        let events = Arc::new(EventService::new(
            self.persistence.clone(),
            self.definitions.clone(),
            self.notifier,
            self.settings,
        ));

        let waiting_events = events.reset_in_progress_waiting_events().await?;
        let messages = events.reset_in_progress_message_instances().await?;
        let recovery = RecoveryReport {
            waiting_events,
            messages,
        };

        let archiver = Arc::new(Archiver::new(
            self.persistence.clone(),
            self.definitions,
            events.clone(),
            self.settings,
        ));

        info!(
            waiting_events = recovery.waiting_events,
            messages = recovery.messages,
            "EngineRuntime started"
        );

        Ok(EngineRuntime {
            persistence: self.persistence,
            events,
            archiver,
            recovery,
        })
    }
}

/// Rows released by start-up crash recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Waiting events moved back to WAITING.
    pub waiting_events: u64,
    /// Message instances moved back to TO_PROCESS.
    pub messages: u64,
}

/// A started engine: crash recovery has run and the services are ready.
pub struct EngineRuntime {
    persistence: Arc<dyn Persistence>,
    events: Arc<EventService>,
    archiver: Arc<Archiver>,
    recovery: RecoveryReport,
}

impl std::fmt::Debug for EngineRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("persistence", &"...")
            .field("recovery", &self.recovery)
            .finish()
    }
}

impl EngineRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> EngineRuntimeBuilder {
        EngineRuntimeBuilder::new()
    }

    /// The correlation engine.
    pub fn events(&self) -> &Arc<EventService> {
        &self.events
    }

    /// The archiver.
    pub fn archiver(&self) -> &Arc<Archiver> {
        &self.archiver
    }

    /// Get a reference to the persistence layer.
    pub fn persistence(&self) -> &Arc<dyn Persistence> {
        &self.persistence
    }

    /// What start-up recovery released.
    pub fn recovery(&self) -> RecoveryReport {
        self.recovery
    }
}
