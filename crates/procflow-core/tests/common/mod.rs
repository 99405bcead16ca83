// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for procflow-core integration tests.
//!
//! Provides TestContext: a file-backed SQLite database in a temp directory,
//! an in-memory definition repository and a started runtime.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use procflow_core::config::EngineSettings;
use procflow_core::definition::{
    DefinitionCache, FlowNodeDefinition, InMemoryDefinitionSource, ProcessDefinition,
};
use procflow_core::model::{
    BpmnEventType, Comment, ConnectorInstance, ContainerType, ContractData, ContractScope,
    CorrelationKeys, DataInstance, DocumentMapping, FlowNodeInstance, FlowNodeKind,
    FlowNodeState, MessageInstance, MessageProgress, ProcessInstance, ProcessInstanceState,
    RefBusinessDataInstance, WaitingEvent, WaitingEventKind, WaitingProgress,
};
use procflow_core::notifier::ChangeNotifier;
use procflow_core::persistence::{Persistence, SqlitePersistence};
use procflow_core::runtime::EngineRuntime;

/// Process definition every fixture uses unless stated otherwise.
pub const PROCESS_DEFINITION_ID: i64 = 1;
/// Flow-node definition with connectors and local data.
pub const SERVICE_NODE: i64 = 10;
/// Flow-node definition without connectors or data.
pub const PLAIN_NODE: i64 = 11;
/// Catching event node definition.
pub const CATCH_NODE: i64 = 12;

/// Test context owning the database and the started runtime.
pub struct TestContext {
    pub dir: TempDir,
    pub persistence: Arc<SqlitePersistence>,
    pub source: Arc<InMemoryDefinitionSource>,
    pub runtime: EngineRuntime,
}

impl TestContext {
    /// Context with default settings and the standard definition deployed.
    pub async fn new() -> Self {
        Self::with_settings(EngineSettings::default(), None).await
    }

    /// Context with a custom sweep page size.
    pub async fn with_page_size(sweep_page_size: i64) -> Self {
        Self::with_settings(EngineSettings { sweep_page_size }, None).await
    }

    /// Context with explicit settings and an optional notifier.
    pub async fn with_settings(
        settings: EngineSettings,
        notifier: Option<Arc<dyn ChangeNotifier>>,
    ) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let persistence = Arc::new(
            SqlitePersistence::from_path(dir.path().join("procflow.db"))
                .await
                .expect("Failed to open test database"),
        );

        let source = Arc::new(InMemoryDefinitionSource::new());
        source.deploy(definition(PROCESS_DEFINITION_ID, true)).await;

        let mut builder = EngineRuntime::builder()
            .persistence(persistence.clone())
            .definitions(Arc::new(DefinitionCache::new(source.clone())))
            .settings(settings);
        if let Some(notifier) = notifier {
            builder = builder.notifier(notifier);
        }
        let runtime = builder
            .build()
            .expect("Failed to build runtime")
            .start()
            .await
            .expect("Failed to start runtime");

        Self {
            dir,
            persistence,
            source,
            runtime,
        }
    }

    /// Start a second runtime over the same database, as after a restart.
    pub async fn restart(&self) -> EngineRuntime {
        EngineRuntime::builder()
            .persistence(self.persistence.clone())
            .definitions(Arc::new(DefinitionCache::new(self.source.clone())))
            .build()
            .expect("Failed to build runtime")
            .start()
            .await
            .expect("Failed to restart runtime")
    }

    /// Run raw SQL against the test database.
    pub async fn execute(&self, sql: &str) {
        sqlx::query(sql)
            .execute(self.persistence.pool())
            .await
            .expect("Failed to execute SQL");
    }

    pub async fn insert_process(&self, instance: &ProcessInstance) {
        self.persistence
            .insert_process_instance(instance)
            .await
            .expect("Failed to insert process instance");
    }

    pub async fn insert_flow_node(&self, node: &FlowNodeInstance) {
        self.persistence
            .insert_flow_node_instance(node)
            .await
            .expect("Failed to insert flow node instance");
    }

    pub async fn insert_connector(&self, connector: &ConnectorInstance) {
        self.persistence
            .insert_connector_instance(connector)
            .await
            .expect("Failed to insert connector instance");
    }
}

/// Standard definition: one service node with connectors and data, one
/// plain node, one catch event node.
pub fn definition(id: i64, process_connectors: bool) -> ProcessDefinition {
    ProcessDefinition {
        id,
        name: "Order".to_string(),
        version: "1.0".to_string(),
        last_update_date: Utc::now(),
        connectors: if process_connectors {
            vec!["notify".to_string()]
        } else {
            vec![]
        },
        flow_nodes: vec![
            FlowNodeDefinition {
                id: SERVICE_NODE,
                name: "charge".to_string(),
                connectors: vec!["payment".to_string()],
                data_definitions: vec!["receipt".to_string()],
            },
            FlowNodeDefinition {
                id: PLAIN_NODE,
                name: "review".to_string(),
                connectors: vec![],
                data_definitions: vec![],
            },
            FlowNodeDefinition {
                id: CATCH_NODE,
                name: "wait".to_string(),
                connectors: vec![],
                data_definitions: vec![],
            },
        ],
    }
}

pub fn process_instance(id: i64, end_date: Option<DateTime<Utc>>) -> ProcessInstance {
    let start = Utc::now() - chrono::Duration::hours(1);
    ProcessInstance {
        id,
        name: "Order".to_string(),
        process_definition_id: PROCESS_DEFINITION_ID,
        root_process_instance_id: id,
        caller_id: None,
        state: ProcessInstanceState::Completed,
        start_date: start,
        end_date,
        started_by: 7,
        last_update: start,
    }
}

pub fn flow_node(
    id: i64,
    process_instance_id: i64,
    definition_id: i64,
    kind: FlowNodeKind,
) -> FlowNodeInstance {
    let now = Utc::now();
    FlowNodeInstance {
        id,
        name: "node".to_string(),
        kind,
        state: FlowNodeState::Completed,
        flow_node_definition_id: definition_id,
        process_definition_id: PROCESS_DEFINITION_ID,
        parent_container_id: process_instance_id,
        parent_process_instance_id: process_instance_id,
        root_process_instance_id: process_instance_id,
        reached_state_date: now,
        last_update_date: now,
    }
}

pub fn event_node(id: i64, process_instance_id: i64) -> FlowNodeInstance {
    flow_node(
        id,
        process_instance_id,
        CATCH_NODE,
        FlowNodeKind::Event {
            event_type: BpmnEventType::IntermediateCatch,
            attached_to: None,
        },
    )
}

pub fn comment(id: i64, process_instance_id: i64) -> Comment {
    Comment {
        id,
        process_instance_id,
        user_id: Some(7),
        content: format!("comment {}", id),
        post_date: Utc::now(),
    }
}

pub fn document_mapping(id: i64, process_instance_id: i64) -> DocumentMapping {
    DocumentMapping {
        id,
        process_instance_id,
        document_id: 900 + id,
        name: "invoice".to_string(),
        description: None,
        version: "1".to_string(),
        list_index: None,
    }
}

pub fn connector(id: i64, container_id: i64, container_type: ContainerType) -> ConnectorInstance {
    ConnectorInstance {
        id,
        container_id,
        container_type,
        connector_id: "mail".to_string(),
        version: "1.0.0".to_string(),
        name: format!("connector {}", id),
        activation_event: "on_finish".to_string(),
        state: "done".to_string(),
    }
}

pub fn ref_business_data(id: i64, process_instance_id: i64) -> RefBusinessDataInstance {
    RefBusinessDataInstance {
        id,
        process_instance_id: Some(process_instance_id),
        flow_node_instance_id: None,
        name: "customer".to_string(),
        data_class_name: "com.acme.Customer".to_string(),
        data_ids: vec![41, 42],
    }
}

pub fn contract_data(id: i64, scope_id: i64, scope: ContractScope) -> ContractData {
    ContractData {
        id,
        scope_id,
        scope,
        name: "approved".to_string(),
        value: serde_json::json!(true),
    }
}

pub fn data_instance(id: i64, container_id: i64) -> DataInstance {
    DataInstance {
        id,
        container_id,
        container_type: ContainerType::FlowNode,
        name: "receipt".to_string(),
        class_name: "java.lang.String".to_string(),
        value: serde_json::json!("r-1"),
    }
}

/// Active message waiting event on the catch node.
pub fn message_waiting(id: i64, message_name: &str, correlations: CorrelationKeys) -> WaitingEvent {
    WaitingEvent {
        id,
        kind: WaitingEventKind::Message {
            message_name: message_name.to_string(),
            correlations,
        },
        event_type: BpmnEventType::IntermediateCatch,
        process_definition_id: PROCESS_DEFINITION_ID,
        process_name: Some("Order".to_string()),
        flow_node_definition_id: CATCH_NODE,
        flow_node_name: "wait".to_string(),
        flow_node_instance_id: Some(100 + id),
        parent_process_instance_id: Some(1),
        root_process_instance_id: Some(1),
        progress: WaitingProgress::Waiting,
        active: true,
    }
}

pub fn error_waiting(id: i64, activity_instance_id: i64, error_code: Option<&str>) -> WaitingEvent {
    WaitingEvent {
        id,
        kind: WaitingEventKind::Error {
            error_code: error_code.map(str::to_string),
            related_activity_instance_id: Some(activity_instance_id),
        },
        event_type: BpmnEventType::Boundary,
        process_definition_id: PROCESS_DEFINITION_ID,
        process_name: None,
        flow_node_definition_id: CATCH_NODE,
        flow_node_name: "onError".to_string(),
        flow_node_instance_id: Some(500 + id),
        parent_process_instance_id: Some(1),
        root_process_instance_id: Some(1),
        progress: WaitingProgress::Waiting,
        active: true,
    }
}

/// Message addressed to the "Order" process.
pub fn message(id: i64, message_name: &str, correlations: CorrelationKeys) -> MessageInstance {
    MessageInstance {
        id,
        message_name: message_name.to_string(),
        target_process: "Order".to_string(),
        target_flow_node: None,
        process_definition_id: 2,
        flow_node_name: Some("send".to_string()),
        correlations,
        payload: Some(serde_json::json!({"order": id})),
        progress: MessageProgress::ToProcess,
        creation_date: Utc::now(),
    }
}

/// Correlation keys with the given leading values.
pub fn keys(values: &[&str]) -> CorrelationKeys {
    let mut keys: CorrelationKeys = Default::default();
    for (slot, value) in keys.iter_mut().zip(values) {
        *slot = Some(value.to_string());
    }
    keys
}
