// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process definition lookup.
//!
//! The process definition repository lives outside this crate. The core only
//! needs to know, per process and per flow node, whether connectors or data
//! definitions are declared, and which flow nodes a definition contains.
//!
//! [`DefinitionCache`] keeps resolved definitions keyed by id together with
//! the last update date they were loaded at. Every lookup asks the source for
//! the current last update date; an entry whose token differs is stale and is
//! reloaded. Entries are never evicted by size.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

/// Definition of one flow node of a process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowNodeDefinition {
    /// Flow-node definition id.
    pub id: i64,
    /// Node name.
    pub name: String,
    /// Names of the connectors declared on the node.
    #[serde(default)]
    pub connectors: Vec<String>,
    /// Names of the local data definitions declared on the node.
    #[serde(default)]
    pub data_definitions: Vec<String>,
}

impl FlowNodeDefinition {
    /// Whether the node declares connectors.
    pub fn has_connectors(&self) -> bool {
        !self.connectors.is_empty()
    }

    /// Whether the node declares local data.
    pub fn has_data_definitions(&self) -> bool {
        !self.data_definitions.is_empty()
    }
}

/// A deployed process definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Process definition id.
    pub id: i64,
    /// Process name.
    pub name: String,
    /// Process version.
    pub version: String,
    /// Last time the definition changed; used as the cache freshness token.
    pub last_update_date: DateTime<Utc>,
    /// Process-level connectors.
    #[serde(default)]
    pub connectors: Vec<String>,
    /// Flow nodes of the process, including nested sub-process nodes.
    #[serde(default)]
    pub flow_nodes: Vec<FlowNodeDefinition>,
}

impl ProcessDefinition {
    /// Whether the process itself declares connectors.
    pub fn has_connectors(&self) -> bool {
        !self.connectors.is_empty()
    }

    /// Find a flow node by definition id.
    pub fn flow_node(&self, flow_node_definition_id: i64) -> Option<&FlowNodeDefinition> {
        self.flow_nodes
            .iter()
            .find(|node| node.id == flow_node_definition_id)
    }
}

/// Resolves process definitions for the correlation engine and the archiver.
#[async_trait]
pub trait ProcessDefinitionLookup: Send + Sync {
    /// Resolve a definition, `None` when it does not exist.
    async fn get_definition(
        &self,
        process_definition_id: i64,
    ) -> Result<Option<Arc<ProcessDefinition>>>;
}

/// Durable definition repository backing a [`DefinitionCache`].
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Current last update date of a definition, `None` when it does not exist.
    async fn last_update_date(&self, process_definition_id: i64)
    -> Result<Option<DateTime<Utc>>>;

    /// Load a definition from durable storage.
    async fn load(&self, process_definition_id: i64) -> Result<Option<ProcessDefinition>>;
}

/// A cached definition with the freshness token it was loaded at.
#[derive(Debug, Clone)]
pub struct CachedDefinition {
    /// The resolved definition.
    pub definition: Arc<ProcessDefinition>,
    /// Last update date the definition had when it was loaded.
    pub freshness: DateTime<Utc>,
}

impl CachedDefinition {
    /// An entry is stale when the source reports a different last update date.
    pub fn is_stale(&self, current: DateTime<Utc>) -> bool {
        self.freshness != current
    }
}

/// Freshness-checked definition cache.
pub struct DefinitionCache<S: DefinitionSource> {
    source: Arc<S>,
    entries: RwLock<HashMap<i64, CachedDefinition>>,
}

impl<S: DefinitionSource> DefinitionCache<S> {
    /// Create an empty cache over `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop the entry for a definition.
    pub async fn invalidate(&self, process_definition_id: i64) {
        self.entries.write().await.remove(&process_definition_id);
    }

    /// Number of cached definitions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<S: DefinitionSource> ProcessDefinitionLookup for DefinitionCache<S> {
    async fn get_definition(
        &self,
        process_definition_id: i64,
    ) -> Result<Option<Arc<ProcessDefinition>>> {
        let Some(current) = self.source.last_update_date(process_definition_id).await? else {
            self.invalidate(process_definition_id).await;
            return Ok(None);
        };

        if let Some(entry) = self.entries.read().await.get(&process_definition_id)
            && !entry.is_stale(current)
        {
            return Ok(Some(entry.definition.clone()));
        }

        debug!(process_definition_id, "Loading process definition");
        let Some(definition) = self.source.load(process_definition_id).await? else {
            self.invalidate(process_definition_id).await;
            return Ok(None);
        };

        let entry = CachedDefinition {
            freshness: definition.last_update_date,
            definition: Arc::new(definition),
        };
        let definition = entry.definition.clone();
        self.entries
            .write()
            .await
            .insert(process_definition_id, entry);

        Ok(Some(definition))
    }
}

/// In-memory definition repository for embedding and tests.
#[derive(Default)]
pub struct InMemoryDefinitionSource {
    definitions: RwLock<HashMap<i64, ProcessDefinition>>,
}

impl InMemoryDefinitionSource {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy (or redeploy) a definition as-is.
    pub async fn deploy(&self, definition: ProcessDefinition) {
        self.definitions
            .write()
            .await
            .insert(definition.id, definition);
    }

    /// Replace a definition and move its last update date forward, so cached
    /// copies become stale.
    pub async fn update(&self, mut definition: ProcessDefinition) {
        let mut definitions = self.definitions.write().await;
        let previous = definitions
            .get(&definition.id)
            .map(|d| d.last_update_date)
            .unwrap_or(definition.last_update_date);
        let now = Utc::now();
        definition.last_update_date = if now > previous {
            now
        } else {
            previous + chrono::Duration::milliseconds(1)
        };
        definitions.insert(definition.id, definition);
    }

    /// Remove a definition.
    pub async fn undeploy(&self, process_definition_id: i64) {
        self.definitions
            .write()
            .await
            .remove(&process_definition_id);
    }
}

#[async_trait]
impl DefinitionSource for InMemoryDefinitionSource {
    async fn last_update_date(
        &self,
        process_definition_id: i64,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .definitions
            .read()
            .await
            .get(&process_definition_id)
            .map(|d| d.last_update_date))
    }

    async fn load(&self, process_definition_id: i64) -> Result<Option<ProcessDefinition>> {
        Ok(self
            .definitions
            .read()
            .await
            .get(&process_definition_id)
            .cloned())
    }
}
