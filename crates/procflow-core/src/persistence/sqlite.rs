// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed persistence implementation.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::error::CoreError;
use crate::migrations::SQLITE as MIGRATOR;
use crate::model::{
    ArchivedComment, ArchivedConnectorInstance, ArchivedContractData, ArchivedDocumentMapping,
    ArchivedFlowNodeInstance, ArchivedFlowNodeKind, ArchivedProcessInstance,
    ArchivedRefBusinessDataInstance, BpmnEventType, Comment, ConnectorInstance, ContainerType,
    ContractData, ContractScope, CorrelationKeys, DataInstance, DocumentMapping, EventTrigger,
    EventTriggerInstance, FlowNodeInstance, FlowNodeKind, FlowNodeState, MessageEventCouple,
    MessageInstance, MessageProgress, ProcessInstance, ProcessInstanceState,
    RefBusinessDataInstance, WaitingEvent, WaitingEventKind, WaitingProgress,
};

use super::{Persistence, QueryOptions};

/// SQLite-backed persistence provider.
#[derive(Clone)]
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    /// Create a new SQLite persistence provider from an existing pool.
    ///
    /// The schema must already be migrated (see [`crate::migrations::run_sqlite`]).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`, run migrations and return the provider.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::Database {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {}: {}", database_url, e),
            })?;

        Self::migrated(pool).await
    }

    /// Create and initialize a new SQLite persistence from a file path.
    ///
    /// Creates parent directories and the database file when missing, then
    /// runs all migrations.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let persistence = SqlitePersistence::from_path(".data/procflow.db").await?;
    /// ```
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Database {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        Self::connect(&url, 5).await
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, CoreError> {
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CoreError::Database {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }
}

// ============================================================================
// Row types and conversions
// ============================================================================

fn decode_error(column: &str, value: &str) -> CoreError {
    CoreError::Database {
        operation: "decode".to_string(),
        details: format!("unexpected value '{}' in column '{}'", value, column),
    }
}

fn correlations(
    c1: Option<String>,
    c2: Option<String>,
    c3: Option<String>,
    c4: Option<String>,
    c5: Option<String>,
) -> CorrelationKeys {
    [c1, c2, c3, c4, c5]
}

#[derive(sqlx::FromRow)]
struct FlowNodeRow {
    id: i64,
    name: String,
    details: String,
    state: String,
    flow_node_definition_id: i64,
    process_definition_id: i64,
    parent_container_id: i64,
    parent_process_instance_id: i64,
    root_process_instance_id: i64,
    reached_state_date: DateTime<Utc>,
    last_update_date: DateTime<Utc>,
}

impl TryFrom<FlowNodeRow> for FlowNodeInstance {
    type Error = CoreError;

    fn try_from(row: FlowNodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            kind: serde_json::from_str::<FlowNodeKind>(&row.details)?,
            state: FlowNodeState::parse(&row.state)
                .ok_or_else(|| decode_error("state", &row.state))?,
            flow_node_definition_id: row.flow_node_definition_id,
            process_definition_id: row.process_definition_id,
            parent_container_id: row.parent_container_id,
            parent_process_instance_id: row.parent_process_instance_id,
            root_process_instance_id: row.root_process_instance_id,
            reached_state_date: row.reached_state_date,
            last_update_date: row.last_update_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TriggerRow {
    id: i64,
    event_instance_id: i64,
    details: String,
}

impl TryFrom<TriggerRow> for EventTriggerInstance {
    type Error = CoreError;

    fn try_from(row: TriggerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            event_instance_id: row.event_instance_id,
            trigger: serde_json::from_str::<EventTrigger>(&row.details)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WaitingEventRow {
    id: i64,
    kind: String,
    event_type: String,
    message_name: Option<String>,
    signal_name: Option<String>,
    error_code: Option<String>,
    related_activity_instance_id: Option<i64>,
    process_definition_id: i64,
    process_name: Option<String>,
    flow_node_definition_id: i64,
    flow_node_name: String,
    flow_node_instance_id: Option<i64>,
    parent_process_instance_id: Option<i64>,
    root_process_instance_id: Option<i64>,
    progress: i64,
    active: bool,
    correlation1: Option<String>,
    correlation2: Option<String>,
    correlation3: Option<String>,
    correlation4: Option<String>,
    correlation5: Option<String>,
}

impl TryFrom<WaitingEventRow> for WaitingEvent {
    type Error = CoreError;

    fn try_from(row: WaitingEventRow) -> Result<Self, Self::Error> {
        let kind = match row.kind.as_str() {
            "message" => WaitingEventKind::Message {
                message_name: row
                    .message_name
                    .ok_or_else(|| decode_error("message_name", "NULL"))?,
                correlations: correlations(
                    row.correlation1,
                    row.correlation2,
                    row.correlation3,
                    row.correlation4,
                    row.correlation5,
                ),
            },
            "signal" => WaitingEventKind::Signal {
                signal_name: row
                    .signal_name
                    .ok_or_else(|| decode_error("signal_name", "NULL"))?,
            },
            "error" => WaitingEventKind::Error {
                error_code: row.error_code,
                related_activity_instance_id: row.related_activity_instance_id,
            },
            other => return Err(decode_error("kind", other)),
        };

        Ok(Self {
            id: row.id,
            kind,
            event_type: BpmnEventType::parse(&row.event_type)
                .ok_or_else(|| decode_error("event_type", &row.event_type))?,
            process_definition_id: row.process_definition_id,
            process_name: row.process_name,
            flow_node_definition_id: row.flow_node_definition_id,
            flow_node_name: row.flow_node_name,
            flow_node_instance_id: row.flow_node_instance_id,
            parent_process_instance_id: row.parent_process_instance_id,
            root_process_instance_id: row.root_process_instance_id,
            progress: WaitingProgress::from_code(row.progress)
                .ok_or_else(|| decode_error("progress", &row.progress.to_string()))?,
            active: row.active,
        })
    }
}

/// Column values of a waiting event, flattened out of its kind.
struct WaitingEventColumns<'a> {
    message_name: Option<&'a str>,
    signal_name: Option<&'a str>,
    error_code: Option<&'a str>,
    related_activity_instance_id: Option<i64>,
    correlations: Option<&'a CorrelationKeys>,
}

impl<'a> WaitingEventColumns<'a> {
    fn of(kind: &'a WaitingEventKind) -> Self {
        match kind {
            WaitingEventKind::Message {
                message_name,
                correlations,
            } => Self {
                message_name: Some(message_name),
                signal_name: None,
                error_code: None,
                related_activity_instance_id: None,
                correlations: Some(correlations),
            },
            WaitingEventKind::Signal { signal_name } => Self {
                message_name: None,
                signal_name: Some(signal_name),
                error_code: None,
                related_activity_instance_id: None,
                correlations: None,
            },
            WaitingEventKind::Error {
                error_code,
                related_activity_instance_id,
            } => Self {
                message_name: None,
                signal_name: None,
                error_code: error_code.as_deref(),
                related_activity_instance_id: *related_activity_instance_id,
                correlations: None,
            },
        }
    }

    fn correlation(&self, index: usize) -> Option<&'a str> {
        self.correlations.and_then(|keys| keys[index].as_deref())
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    message_name: String,
    target_process: String,
    target_flow_node: Option<String>,
    process_definition_id: i64,
    flow_node_name: Option<String>,
    correlation1: Option<String>,
    correlation2: Option<String>,
    correlation3: Option<String>,
    correlation4: Option<String>,
    correlation5: Option<String>,
    payload: Option<String>,
    progress: i64,
    creation_date: DateTime<Utc>,
}

impl TryFrom<MessageRow> for MessageInstance {
    type Error = CoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            message_name: row.message_name,
            target_process: row.target_process,
            target_flow_node: row.target_flow_node,
            process_definition_id: row.process_definition_id,
            flow_node_name: row.flow_node_name,
            correlations: correlations(
                row.correlation1,
                row.correlation2,
                row.correlation3,
                row.correlation4,
                row.correlation5,
            ),
            payload: row
                .payload
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            progress: MessageProgress::from_code(row.progress)
                .ok_or_else(|| decode_error("progress", &row.progress.to_string()))?,
            creation_date: row.creation_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CoupleRow {
    waiting_event_id: i64,
    waiting_event_type: String,
    flow_node_instance_id: Option<i64>,
    message_instance_id: i64,
    message_name: String,
}

impl TryFrom<CoupleRow> for MessageEventCouple {
    type Error = CoreError;

    fn try_from(row: CoupleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            waiting_event_id: row.waiting_event_id,
            waiting_event_type: BpmnEventType::parse(&row.waiting_event_type)
                .ok_or_else(|| decode_error("event_type", &row.waiting_event_type))?,
            flow_node_instance_id: row.flow_node_instance_id,
            message_instance_id: row.message_instance_id,
            message_name: row.message_name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProcessRow {
    id: i64,
    name: String,
    process_definition_id: i64,
    root_process_instance_id: i64,
    caller_id: Option<i64>,
    state: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    started_by: i64,
    last_update: DateTime<Utc>,
}

impl TryFrom<ProcessRow> for ProcessInstance {
    type Error = CoreError;

    fn try_from(row: ProcessRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            process_definition_id: row.process_definition_id,
            root_process_instance_id: row.root_process_instance_id,
            caller_id: row.caller_id,
            state: ProcessInstanceState::parse(&row.state)
                .ok_or_else(|| decode_error("state", &row.state))?,
            start_date: row.start_date,
            end_date: row.end_date,
            started_by: row.started_by,
            last_update: row.last_update,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConnectorRow {
    id: i64,
    container_id: i64,
    container_type: String,
    connector_id: String,
    version: String,
    name: String,
    activation_event: String,
    state: String,
}

impl TryFrom<ConnectorRow> for ConnectorInstance {
    type Error = CoreError;

    fn try_from(row: ConnectorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            container_id: row.container_id,
            container_type: ContainerType::parse(&row.container_type)
                .ok_or_else(|| decode_error("container_type", &row.container_type))?,
            connector_id: row.connector_id,
            version: row.version,
            name: row.name,
            activation_event: row.activation_event,
            state: row.state,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RefBusinessDataRow {
    id: i64,
    process_instance_id: Option<i64>,
    flow_node_instance_id: Option<i64>,
    name: String,
    data_class_name: String,
    data_ids: String,
}

impl TryFrom<RefBusinessDataRow> for RefBusinessDataInstance {
    type Error = CoreError;

    fn try_from(row: RefBusinessDataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            process_instance_id: row.process_instance_id,
            flow_node_instance_id: row.flow_node_instance_id,
            name: row.name,
            data_class_name: row.data_class_name,
            data_ids: serde_json::from_str(&row.data_ids)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ContractDataRow {
    id: i64,
    scope_id: i64,
    scope: String,
    name: String,
    value: String,
}

impl TryFrom<ContractDataRow> for ContractData {
    type Error = CoreError;

    fn try_from(row: ContractDataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            scope_id: row.scope_id,
            scope: ContractScope::parse(&row.scope)
                .ok_or_else(|| decode_error("scope", &row.scope))?,
            name: row.name,
            value: serde_json::from_str(&row.value)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DataInstanceRow {
    id: i64,
    container_id: i64,
    container_type: String,
    name: String,
    class_name: String,
    value: String,
}

impl TryFrom<DataInstanceRow> for DataInstance {
    type Error = CoreError;

    fn try_from(row: DataInstanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            container_id: row.container_id,
            container_type: ContainerType::parse(&row.container_type)
                .ok_or_else(|| decode_error("container_type", &row.container_type))?,
            name: row.name,
            class_name: row.class_name,
            value: serde_json::from_str(&row.value)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArchivedProcessRow {
    id: i64,
    source_object_id: i64,
    archive_date: DateTime<Utc>,
    name: String,
    process_definition_id: i64,
    root_process_instance_id: i64,
    caller_id: Option<i64>,
    state: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    started_by: i64,
}

impl TryFrom<ArchivedProcessRow> for ArchivedProcessInstance {
    type Error = CoreError;

    fn try_from(row: ArchivedProcessRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            source_object_id: row.source_object_id,
            archive_date: row.archive_date,
            name: row.name,
            process_definition_id: row.process_definition_id,
            root_process_instance_id: row.root_process_instance_id,
            caller_id: row.caller_id,
            state: ProcessInstanceState::parse(&row.state)
                .ok_or_else(|| decode_error("state", &row.state))?,
            start_date: row.start_date,
            end_date: row.end_date,
            started_by: row.started_by,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArchivedFlowNodeRow {
    id: i64,
    source_object_id: i64,
    archive_date: DateTime<Utc>,
    name: String,
    details: String,
    state: String,
    flow_node_definition_id: i64,
    process_definition_id: i64,
    parent_container_id: i64,
    parent_process_instance_id: i64,
    root_process_instance_id: i64,
    reached_state_date: DateTime<Utc>,
    last_update_date: DateTime<Utc>,
}

impl TryFrom<ArchivedFlowNodeRow> for ArchivedFlowNodeInstance {
    type Error = CoreError;

    fn try_from(row: ArchivedFlowNodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            source_object_id: row.source_object_id,
            archive_date: row.archive_date,
            name: row.name,
            kind: serde_json::from_str::<ArchivedFlowNodeKind>(&row.details)?,
            state: FlowNodeState::parse(&row.state)
                .ok_or_else(|| decode_error("state", &row.state))?,
            flow_node_definition_id: row.flow_node_definition_id,
            process_definition_id: row.process_definition_id,
            parent_container_id: row.parent_container_id,
            parent_process_instance_id: row.parent_process_instance_id,
            root_process_instance_id: row.root_process_instance_id,
            reached_state_date: row.reached_state_date,
            last_update_date: row.last_update_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArchivedConnectorRow {
    id: i64,
    source_object_id: i64,
    archive_date: DateTime<Utc>,
    container_id: i64,
    container_type: String,
    connector_id: String,
    version: String,
    name: String,
    activation_event: String,
    state: String,
}

impl TryFrom<ArchivedConnectorRow> for ArchivedConnectorInstance {
    type Error = CoreError;

    fn try_from(row: ArchivedConnectorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            source_object_id: row.source_object_id,
            archive_date: row.archive_date,
            container_id: row.container_id,
            container_type: ContainerType::parse(&row.container_type)
                .ok_or_else(|| decode_error("container_type", &row.container_type))?,
            connector_id: row.connector_id,
            version: row.version,
            name: row.name,
            activation_event: row.activation_event,
            state: row.state,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArchivedRefBusinessDataRow {
    id: i64,
    source_object_id: i64,
    archive_date: DateTime<Utc>,
    process_instance_id: Option<i64>,
    flow_node_instance_id: Option<i64>,
    name: String,
    data_class_name: String,
    data_ids: String,
}

impl TryFrom<ArchivedRefBusinessDataRow> for ArchivedRefBusinessDataInstance {
    type Error = CoreError;

    fn try_from(row: ArchivedRefBusinessDataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            source_object_id: row.source_object_id,
            archive_date: row.archive_date,
            process_instance_id: row.process_instance_id,
            flow_node_instance_id: row.flow_node_instance_id,
            name: row.name,
            data_class_name: row.data_class_name,
            data_ids: serde_json::from_str(&row.data_ids)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArchivedContractDataRow {
    id: i64,
    source_object_id: i64,
    archive_date: DateTime<Utc>,
    scope_id: i64,
    scope: String,
    name: String,
    value: String,
}

impl TryFrom<ArchivedContractDataRow> for ArchivedContractData {
    type Error = CoreError;

    fn try_from(row: ArchivedContractDataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            source_object_id: row.source_object_id,
            archive_date: row.archive_date,
            scope_id: row.scope_id,
            scope: ContractScope::parse(&row.scope)
                .ok_or_else(|| decode_error("scope", &row.scope))?,
            name: row.name,
            value: serde_json::from_str(&row.value)?,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, CoreError>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const WAITING_EVENT_COLUMNS: &str = "id, kind, event_type, message_name, signal_name, error_code, \
     related_activity_instance_id, process_definition_id, process_name, flow_node_definition_id, \
     flow_node_name, flow_node_instance_id, parent_process_instance_id, root_process_instance_id, \
     progress, active, correlation1, correlation2, correlation3, correlation4, correlation5";

const MESSAGE_COLUMNS: &str = "id, message_name, target_process, target_flow_node, \
     process_definition_id, flow_node_name, correlation1, correlation2, correlation3, \
     correlation4, correlation5, payload, progress, creation_date";

const FLOW_NODE_COLUMNS: &str = "id, name, details, state, flow_node_definition_id, \
     process_definition_id, parent_container_id, parent_process_instance_id, \
     root_process_instance_id, reached_state_date, last_update_date";

#[async_trait::async_trait]
impl Persistence for SqlitePersistence {
    // ========================================================================
    // Flow-node instances
    // ========================================================================

    async fn insert_flow_node_instance(&self, node: &FlowNodeInstance) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO flow_node_instances (id, name, kind, details, state,
                flow_node_definition_id, process_definition_id, parent_container_id,
                parent_process_instance_id, root_process_instance_id,
                reached_state_date, last_update_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(node.id)
        .bind(&node.name)
        .bind(node.kind.as_str())
        .bind(serde_json::to_string(&node.kind)?)
        .bind(node.state.as_str())
        .bind(node.flow_node_definition_id)
        .bind(node.process_definition_id)
        .bind(node.parent_container_id)
        .bind(node.parent_process_instance_id)
        .bind(node.root_process_instance_id)
        .bind(node.reached_state_date)
        .bind(node.last_update_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_flow_node_instance(
        &self,
        id: i64,
    ) -> Result<Option<FlowNodeInstance>, CoreError> {
        let row = sqlx::query_as::<_, FlowNodeRow>(&format!(
            "SELECT {} FROM flow_node_instances WHERE id = ?",
            FLOW_NODE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FlowNodeInstance::try_from).transpose()
    }

    async fn delete_flow_node_instance(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM flow_node_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Event trigger instances
    // ========================================================================

    async fn insert_event_trigger_instance(
        &self,
        trigger: &EventTriggerInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO event_trigger_instances (id, event_instance_id, kind, details)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(trigger.id)
        .bind(trigger.event_instance_id)
        .bind(trigger.trigger.kind())
        .bind(serde_json::to_string(&trigger.trigger)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_event_trigger_instance(
        &self,
        id: i64,
    ) -> Result<Option<EventTriggerInstance>, CoreError> {
        let row = sqlx::query_as::<_, TriggerRow>(
            "SELECT id, event_instance_id, details FROM event_trigger_instances WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventTriggerInstance::try_from).transpose()
    }

    async fn list_event_trigger_instances(
        &self,
        event_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<EventTriggerInstance>, CoreError> {
        let rows = sqlx::query_as::<_, TriggerRow>(
            r#"
            SELECT id, event_instance_id, details
            FROM event_trigger_instances
            WHERE event_instance_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(event_instance_id)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn update_event_trigger_instance(
        &self,
        trigger: &EventTriggerInstance,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE event_trigger_instances
            SET event_instance_id = ?, kind = ?, details = ?
            WHERE id = ?
            "#,
        )
        .bind(trigger.event_instance_id)
        .bind(trigger.trigger.kind())
        .bind(serde_json::to_string(&trigger.trigger)?)
        .bind(trigger.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_event_trigger_instance(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM event_trigger_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Waiting events
    // ========================================================================

    async fn insert_waiting_event(&self, waiting: &WaitingEvent) -> Result<(), CoreError> {
        let columns = WaitingEventColumns::of(&waiting.kind);
        sqlx::query(
            r#"
            INSERT INTO waiting_events (id, kind, event_type, message_name, signal_name,
                error_code, related_activity_instance_id, process_definition_id, process_name,
                flow_node_definition_id, flow_node_name, flow_node_instance_id,
                parent_process_instance_id, root_process_instance_id, progress, active,
                correlation1, correlation2, correlation3, correlation4, correlation5)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(waiting.id)
        .bind(waiting.kind.as_str())
        .bind(waiting.event_type.as_str())
        .bind(columns.message_name)
        .bind(columns.signal_name)
        .bind(columns.error_code)
        .bind(columns.related_activity_instance_id)
        .bind(waiting.process_definition_id)
        .bind(&waiting.process_name)
        .bind(waiting.flow_node_definition_id)
        .bind(&waiting.flow_node_name)
        .bind(waiting.flow_node_instance_id)
        .bind(waiting.parent_process_instance_id)
        .bind(waiting.root_process_instance_id)
        .bind(waiting.progress.code())
        .bind(waiting.active)
        .bind(columns.correlation(0))
        .bind(columns.correlation(1))
        .bind(columns.correlation(2))
        .bind(columns.correlation(3))
        .bind(columns.correlation(4))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_waiting_event(&self, id: i64) -> Result<Option<WaitingEvent>, CoreError> {
        let row = sqlx::query_as::<_, WaitingEventRow>(&format!(
            "SELECT {} FROM waiting_events WHERE id = ?",
            WAITING_EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WaitingEvent::try_from).transpose()
    }

    async fn list_waiting_events_of_flow_node(
        &self,
        flow_node_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError> {
        let rows = sqlx::query_as::<_, WaitingEventRow>(&format!(
            r#"
            SELECT {}
            FROM waiting_events
            WHERE flow_node_instance_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
            WAITING_EVENT_COLUMNS
        ))
        .bind(flow_node_instance_id)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn list_waiting_signal_events(
        &self,
        signal_name: &str,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError> {
        let rows = sqlx::query_as::<_, WaitingEventRow>(&format!(
            r#"
            SELECT {}
            FROM waiting_events
            WHERE kind = 'signal' AND signal_name = ? AND active = 1
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
            WAITING_EVENT_COLUMNS
        ))
        .bind(signal_name)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn list_boundary_waiting_error_events(
        &self,
        activity_instance_id: i64,
        error_code: Option<&str>,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError> {
        let rows = sqlx::query_as::<_, WaitingEventRow>(&format!(
            r#"
            SELECT {}
            FROM waiting_events
            WHERE kind = 'error'
              AND event_type = 'boundary'
              AND active = 1
              AND related_activity_instance_id = ?1
              AND ((?2 IS NULL AND error_code IS NULL) OR error_code = ?2)
            ORDER BY id ASC
            LIMIT ?3 OFFSET ?4
            "#,
            WAITING_EVENT_COLUMNS
        ))
        .bind(activity_instance_id)
        .bind(error_code)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn list_start_waiting_events(
        &self,
        process_definition_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError> {
        let rows = sqlx::query_as::<_, WaitingEventRow>(&format!(
            r#"
            SELECT {}
            FROM waiting_events
            WHERE process_definition_id = ?
              AND event_type = 'start'
              AND flow_node_instance_id IS NULL
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
            WAITING_EVENT_COLUMNS
        ))
        .bind(process_definition_id)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn update_waiting_event(&self, waiting: &WaitingEvent) -> Result<bool, CoreError> {
        let columns = WaitingEventColumns::of(&waiting.kind);
        let result = sqlx::query(
            r#"
            UPDATE waiting_events
            SET kind = ?, event_type = ?, message_name = ?, signal_name = ?, error_code = ?,
                related_activity_instance_id = ?, process_definition_id = ?, process_name = ?,
                flow_node_definition_id = ?, flow_node_name = ?, flow_node_instance_id = ?,
                parent_process_instance_id = ?, root_process_instance_id = ?, progress = ?,
                active = ?, correlation1 = ?, correlation2 = ?, correlation3 = ?,
                correlation4 = ?, correlation5 = ?
            WHERE id = ?
            "#,
        )
        .bind(waiting.kind.as_str())
        .bind(waiting.event_type.as_str())
        .bind(columns.message_name)
        .bind(columns.signal_name)
        .bind(columns.error_code)
        .bind(columns.related_activity_instance_id)
        .bind(waiting.process_definition_id)
        .bind(&waiting.process_name)
        .bind(waiting.flow_node_definition_id)
        .bind(&waiting.flow_node_name)
        .bind(waiting.flow_node_instance_id)
        .bind(waiting.parent_process_instance_id)
        .bind(waiting.root_process_instance_id)
        .bind(waiting.progress.code())
        .bind(waiting.active)
        .bind(columns.correlation(0))
        .bind(columns.correlation(1))
        .bind(columns.correlation(2))
        .bind(columns.correlation(3))
        .bind(columns.correlation(4))
        .bind(waiting.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_set_waiting_progress(
        &self,
        id: i64,
        expected: WaitingProgress,
        new: WaitingProgress,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE waiting_events
            SET progress = ?
            WHERE id = ? AND progress = ?
            "#,
        )
        .bind(new.code())
        .bind(id)
        .bind(expected.code())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reset_in_progress_waiting_events(&self) -> Result<u64, CoreError> {
        let result = sqlx::query("UPDATE waiting_events SET progress = ? WHERE progress = ?")
            .bind(WaitingProgress::Waiting.code())
            .bind(WaitingProgress::InProgress.code())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_waiting_event(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM waiting_events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Message instances and matching
    // ========================================================================

    async fn insert_message_instance(&self, message: &MessageInstance) -> Result<(), CoreError> {
        let payload = message
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        sqlx::query(
            r#"
            INSERT INTO message_instances (id, message_name, target_process, target_flow_node,
                process_definition_id, flow_node_name, correlation1, correlation2, correlation3,
                correlation4, correlation5, payload, progress, creation_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.id)
        .bind(&message.message_name)
        .bind(&message.target_process)
        .bind(&message.target_flow_node)
        .bind(message.process_definition_id)
        .bind(&message.flow_node_name)
        .bind(&message.correlations[0])
        .bind(&message.correlations[1])
        .bind(&message.correlations[2])
        .bind(&message.correlations[3])
        .bind(&message.correlations[4])
        .bind(payload)
        .bind(message.progress.code())
        .bind(message.creation_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_message_instance(&self, id: i64) -> Result<Option<MessageInstance>, CoreError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM message_instances WHERE id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MessageInstance::try_from).transpose()
    }

    async fn update_message_instance(
        &self,
        message: &MessageInstance,
    ) -> Result<bool, CoreError> {
        let payload = message
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let result = sqlx::query(
            r#"
            UPDATE message_instances
            SET message_name = ?, target_process = ?, target_flow_node = ?,
                process_definition_id = ?, flow_node_name = ?, correlation1 = ?,
                correlation2 = ?, correlation3 = ?, correlation4 = ?, correlation5 = ?,
                payload = ?, progress = ?, creation_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&message.message_name)
        .bind(&message.target_process)
        .bind(&message.target_flow_node)
        .bind(message.process_definition_id)
        .bind(&message.flow_node_name)
        .bind(&message.correlations[0])
        .bind(&message.correlations[1])
        .bind(&message.correlations[2])
        .bind(&message.correlations[3])
        .bind(&message.correlations[4])
        .bind(payload)
        .bind(message.progress.code())
        .bind(message.creation_date)
        .bind(message.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_set_message_progress(
        &self,
        id: i64,
        expected: MessageProgress,
        new: MessageProgress,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE message_instances
            SET progress = ?
            WHERE id = ? AND progress = ?
            "#,
        )
        .bind(new.code())
        .bind(id)
        .bind(expected.code())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reset_in_progress_message_instances(&self) -> Result<u64, CoreError> {
        let result = sqlx::query("UPDATE message_instances SET progress = ? WHERE progress = ?")
            .bind(MessageProgress::ToProcess.code())
            .bind(MessageProgress::InProgress.code())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_message_instance(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM message_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_message_event_couples(
        &self,
        options: QueryOptions,
    ) -> Result<Vec<MessageEventCouple>, CoreError> {
        let rows = sqlx::query_as::<_, CoupleRow>(
            r#"
            SELECT w.id AS waiting_event_id,
                   w.event_type AS waiting_event_type,
                   w.flow_node_instance_id AS flow_node_instance_id,
                   m.id AS message_instance_id,
                   m.message_name AS message_name
            FROM message_instances m
            JOIN waiting_events w
              ON w.kind = 'message'
             AND w.message_name = m.message_name
            WHERE w.active = 1
              AND w.progress = 0
              AND m.progress = 0
              AND (w.process_name IS NULL OR w.process_name = m.target_process)
              AND (m.target_flow_node IS NULL OR m.target_flow_node = w.flow_node_name)
              AND (w.correlation1 IS NULL OR w.correlation1 = m.correlation1)
              AND (w.correlation2 IS NULL OR w.correlation2 = m.correlation2)
              AND (w.correlation3 IS NULL OR w.correlation3 = m.correlation3)
              AND (w.correlation4 IS NULL OR w.correlation4 = m.correlation4)
              AND (w.correlation5 IS NULL OR w.correlation5 = m.correlation5)
            ORDER BY m.id ASC, w.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    // ========================================================================
    // Process instances
    // ========================================================================

    async fn insert_process_instance(&self, instance: &ProcessInstance) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO process_instances (id, name, process_definition_id,
                root_process_instance_id, caller_id, state, start_date, end_date, started_by,
                last_update)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(instance.id)
        .bind(&instance.name)
        .bind(instance.process_definition_id)
        .bind(instance.root_process_instance_id)
        .bind(instance.caller_id)
        .bind(instance.state.as_str())
        .bind(instance.start_date)
        .bind(instance.end_date)
        .bind(instance.started_by)
        .bind(instance.last_update)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_process_instance(&self, id: i64) -> Result<Option<ProcessInstance>, CoreError> {
        let row = sqlx::query_as::<_, ProcessRow>(
            r#"
            SELECT id, name, process_definition_id, root_process_instance_id, caller_id, state,
                   start_date, end_date, started_by, last_update
            FROM process_instances
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProcessInstance::try_from).transpose()
    }

    async fn delete_process_instance(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM process_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Process dependents
    // ========================================================================

    async fn insert_comment(&self, comment: &Comment) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, process_instance_id, user_id, content, post_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.id)
        .bind(comment.process_instance_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(comment.post_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_comments(
        &self,
        process_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<Comment>, CoreError> {
        let rows = sqlx::query_as::<_, (i64, i64, Option<i64>, String, DateTime<Utc>)>(
            r#"
            SELECT id, process_instance_id, user_id, content, post_date
            FROM comments
            WHERE process_instance_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(process_instance_id)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, process_instance_id, user_id, content, post_date)| Comment {
                    id,
                    process_instance_id,
                    user_id,
                    content,
                    post_date,
                },
            )
            .collect())
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_document_mapping(&self, mapping: &DocumentMapping) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO document_mappings (id, process_instance_id, document_id, name,
                description, version, list_index)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(mapping.id)
        .bind(mapping.process_instance_id)
        .bind(mapping.document_id)
        .bind(&mapping.name)
        .bind(&mapping.description)
        .bind(&mapping.version)
        .bind(mapping.list_index)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_document_mappings(
        &self,
        process_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<DocumentMapping>, CoreError> {
        let rows = sqlx::query_as::<
            _,
            (i64, i64, i64, String, Option<String>, String, Option<i32>),
        >(
            r#"
            SELECT id, process_instance_id, document_id, name, description, version, list_index
            FROM document_mappings
            WHERE process_instance_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(process_instance_id)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, process_instance_id, document_id, name, description, version, list_index)| {
                    DocumentMapping {
                        id,
                        process_instance_id,
                        document_id,
                        name,
                        description,
                        version,
                        list_index,
                    }
                },
            )
            .collect())
    }

    async fn delete_document_mapping(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM document_mappings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_connector_instance(
        &self,
        connector: &ConnectorInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO connector_instances (id, container_id, container_type, connector_id,
                version, name, activation_event, state)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(connector.id)
        .bind(connector.container_id)
        .bind(connector.container_type.as_str())
        .bind(&connector.connector_id)
        .bind(&connector.version)
        .bind(&connector.name)
        .bind(&connector.activation_event)
        .bind(&connector.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_connector_instances(
        &self,
        container_id: i64,
        container_type: ContainerType,
        options: QueryOptions,
    ) -> Result<Vec<ConnectorInstance>, CoreError> {
        let rows = sqlx::query_as::<_, ConnectorRow>(
            r#"
            SELECT id, container_id, container_type, connector_id, version, name,
                   activation_event, state
            FROM connector_instances
            WHERE container_id = ? AND container_type = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(container_id)
        .bind(container_type.as_str())
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn delete_connector_instance(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM connector_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_ref_business_data(
        &self,
        reference: &RefBusinessDataInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO ref_business_data (id, process_instance_id, flow_node_instance_id, name,
                data_class_name, data_ids)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reference.id)
        .bind(reference.process_instance_id)
        .bind(reference.flow_node_instance_id)
        .bind(&reference.name)
        .bind(&reference.data_class_name)
        .bind(serde_json::to_string(&reference.data_ids)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_ref_business_data(
        &self,
        process_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<RefBusinessDataInstance>, CoreError> {
        let rows = sqlx::query_as::<_, RefBusinessDataRow>(
            r#"
            SELECT id, process_instance_id, flow_node_instance_id, name, data_class_name, data_ids
            FROM ref_business_data
            WHERE process_instance_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(process_instance_id)
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn delete_ref_business_data(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM ref_business_data WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_contract_data(&self, data: &ContractData) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO contract_data (id, scope_id, scope, name, value)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.id)
        .bind(data.scope_id)
        .bind(data.scope.as_str())
        .bind(&data.name)
        .bind(serde_json::to_string(&data.value)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_contract_data(
        &self,
        scope_id: i64,
        scope: ContractScope,
        options: QueryOptions,
    ) -> Result<Vec<ContractData>, CoreError> {
        let rows = sqlx::query_as::<_, ContractDataRow>(
            r#"
            SELECT id, scope_id, scope, name, value
            FROM contract_data
            WHERE scope_id = ? AND scope = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(scope_id)
        .bind(scope.as_str())
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn delete_contract_data(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM contract_data WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_data_instance(&self, data: &DataInstance) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO data_instances (id, container_id, container_type, name, class_name, value)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.id)
        .bind(data.container_id)
        .bind(data.container_type.as_str())
        .bind(&data.name)
        .bind(&data.class_name)
        .bind(serde_json::to_string(&data.value)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_data_instances(
        &self,
        container_id: i64,
        container_type: ContainerType,
        options: QueryOptions,
    ) -> Result<Vec<DataInstance>, CoreError> {
        let rows = sqlx::query_as::<_, DataInstanceRow>(
            r#"
            SELECT id, container_id, container_type, name, class_name, value
            FROM data_instances
            WHERE container_id = ? AND container_type = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(container_id)
        .bind(container_type.as_str())
        .bind(options.limit)
        .bind(options.offset)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn delete_data_instance(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM data_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Archive
    // ========================================================================

    async fn insert_archived_process_instance(
        &self,
        archived: &ArchivedProcessInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO archived_process_instances (source_object_id, archive_date, name,
                process_definition_id, root_process_instance_id, caller_id, state, start_date,
                end_date, started_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(archived.source_object_id)
        .bind(archived.archive_date)
        .bind(&archived.name)
        .bind(archived.process_definition_id)
        .bind(archived.root_process_instance_id)
        .bind(archived.caller_id)
        .bind(archived.state.as_str())
        .bind(archived.start_date)
        .bind(archived.end_date)
        .bind(archived.started_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_archived_process_instances(
        &self,
        source_object_id: i64,
    ) -> Result<Vec<ArchivedProcessInstance>, CoreError> {
        let rows = sqlx::query_as::<_, ArchivedProcessRow>(
            r#"
            SELECT id, source_object_id, archive_date, name, process_definition_id,
                   root_process_instance_id, caller_id, state, start_date, end_date, started_by
            FROM archived_process_instances
            WHERE source_object_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(source_object_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_archived_flow_node_instance(
        &self,
        archived: &ArchivedFlowNodeInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO archived_flow_node_instances (source_object_id, archive_date, name, kind,
                details, state, flow_node_definition_id, process_definition_id,
                parent_container_id, parent_process_instance_id, root_process_instance_id,
                reached_state_date, last_update_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(archived.source_object_id)
        .bind(archived.archive_date)
        .bind(&archived.name)
        .bind(archived.kind.as_str())
        .bind(serde_json::to_string(&archived.kind)?)
        .bind(archived.state.as_str())
        .bind(archived.flow_node_definition_id)
        .bind(archived.process_definition_id)
        .bind(archived.parent_container_id)
        .bind(archived.parent_process_instance_id)
        .bind(archived.root_process_instance_id)
        .bind(archived.reached_state_date)
        .bind(archived.last_update_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_archived_flow_node_instances(
        &self,
        source_object_id: i64,
    ) -> Result<Vec<ArchivedFlowNodeInstance>, CoreError> {
        let rows = sqlx::query_as::<_, ArchivedFlowNodeRow>(
            r#"
            SELECT id, source_object_id, archive_date, name, details, state,
                   flow_node_definition_id, process_definition_id, parent_container_id,
                   parent_process_instance_id, root_process_instance_id, reached_state_date,
                   last_update_date
            FROM archived_flow_node_instances
            WHERE source_object_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(source_object_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_archived_comment(&self, archived: &ArchivedComment) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO archived_comments (source_object_id, archive_date, process_instance_id,
                user_id, content, post_date)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_object_id) DO UPDATE SET
                archive_date = excluded.archive_date,
                process_instance_id = excluded.process_instance_id,
                user_id = excluded.user_id,
                content = excluded.content,
                post_date = excluded.post_date
            "#,
        )
        .bind(archived.source_object_id)
        .bind(archived.archive_date)
        .bind(archived.process_instance_id)
        .bind(archived.user_id)
        .bind(&archived.content)
        .bind(archived.post_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_archived_comments(
        &self,
        process_instance_id: i64,
    ) -> Result<Vec<ArchivedComment>, CoreError> {
        let rows = sqlx::query_as::<
            _,
            (i64, i64, DateTime<Utc>, i64, Option<i64>, String, DateTime<Utc>),
        >(
            r#"
            SELECT id, source_object_id, archive_date, process_instance_id, user_id, content,
                   post_date
            FROM archived_comments
            WHERE process_instance_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(process_instance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    id,
                    source_object_id,
                    archive_date,
                    process_instance_id,
                    user_id,
                    content,
                    post_date,
                )| ArchivedComment {
                    id: Some(id),
                    source_object_id,
                    archive_date,
                    process_instance_id,
                    user_id,
                    content,
                    post_date,
                },
            )
            .collect())
    }

    async fn insert_archived_document_mapping(
        &self,
        archived: &ArchivedDocumentMapping,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO archived_document_mappings (source_object_id, archive_date,
                process_instance_id, document_id, name, description, version, list_index)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_object_id) DO UPDATE SET
                archive_date = excluded.archive_date,
                process_instance_id = excluded.process_instance_id,
                document_id = excluded.document_id,
                name = excluded.name,
                description = excluded.description,
                version = excluded.version,
                list_index = excluded.list_index
            "#,
        )
        .bind(archived.source_object_id)
        .bind(archived.archive_date)
        .bind(archived.process_instance_id)
        .bind(archived.document_id)
        .bind(&archived.name)
        .bind(&archived.description)
        .bind(&archived.version)
        .bind(archived.list_index)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_archived_document_mappings(
        &self,
        process_instance_id: i64,
    ) -> Result<Vec<ArchivedDocumentMapping>, CoreError> {
        let rows = sqlx::query_as::<
            _,
            (
                i64,
                i64,
                DateTime<Utc>,
                i64,
                i64,
                String,
                Option<String>,
                String,
                Option<i32>,
            ),
        >(
            r#"
            SELECT id, source_object_id, archive_date, process_instance_id, document_id, name,
                   description, version, list_index
            FROM archived_document_mappings
            WHERE process_instance_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(process_instance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    id,
                    source_object_id,
                    archive_date,
                    process_instance_id,
                    document_id,
                    name,
                    description,
                    version,
                    list_index,
                )| ArchivedDocumentMapping {
                    id: Some(id),
                    source_object_id,
                    archive_date,
                    process_instance_id,
                    document_id,
                    name,
                    description,
                    version,
                    list_index,
                },
            )
            .collect())
    }

    async fn insert_archived_connector_instance(
        &self,
        archived: &ArchivedConnectorInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO archived_connector_instances (source_object_id, archive_date,
                container_id, container_type, connector_id, version, name, activation_event,
                state)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_object_id) DO UPDATE SET
                archive_date = excluded.archive_date,
                container_id = excluded.container_id,
                container_type = excluded.container_type,
                connector_id = excluded.connector_id,
                version = excluded.version,
                name = excluded.name,
                activation_event = excluded.activation_event,
                state = excluded.state
            "#,
        )
        .bind(archived.source_object_id)
        .bind(archived.archive_date)
        .bind(archived.container_id)
        .bind(archived.container_type.as_str())
        .bind(&archived.connector_id)
        .bind(&archived.version)
        .bind(&archived.name)
        .bind(&archived.activation_event)
        .bind(&archived.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_archived_connector_instances(
        &self,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Vec<ArchivedConnectorInstance>, CoreError> {
        let rows = sqlx::query_as::<_, ArchivedConnectorRow>(
            r#"
            SELECT id, source_object_id, archive_date, container_id, container_type,
                   connector_id, version, name, activation_event, state
            FROM archived_connector_instances
            WHERE container_id = ? AND container_type = ?
            ORDER BY id ASC
            "#,
        )
        .bind(container_id)
        .bind(container_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_archived_ref_business_data(
        &self,
        archived: &ArchivedRefBusinessDataInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO archived_ref_business_data (source_object_id, archive_date,
                process_instance_id, flow_node_instance_id, name, data_class_name, data_ids)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_object_id) DO UPDATE SET
                archive_date = excluded.archive_date,
                process_instance_id = excluded.process_instance_id,
                flow_node_instance_id = excluded.flow_node_instance_id,
                name = excluded.name,
                data_class_name = excluded.data_class_name,
                data_ids = excluded.data_ids
            "#,
        )
        .bind(archived.source_object_id)
        .bind(archived.archive_date)
        .bind(archived.process_instance_id)
        .bind(archived.flow_node_instance_id)
        .bind(&archived.name)
        .bind(&archived.data_class_name)
        .bind(serde_json::to_string(&archived.data_ids)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_archived_ref_business_data(
        &self,
        process_instance_id: i64,
    ) -> Result<Vec<ArchivedRefBusinessDataInstance>, CoreError> {
        let rows = sqlx::query_as::<_, ArchivedRefBusinessDataRow>(
            r#"
            SELECT id, source_object_id, archive_date, process_instance_id,
                   flow_node_instance_id, name, data_class_name, data_ids
            FROM archived_ref_business_data
            WHERE process_instance_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(process_instance_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_archived_contract_data(
        &self,
        archived: &ArchivedContractData,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO archived_contract_data (source_object_id, archive_date, scope_id, scope,
                name, value)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_object_id) DO UPDATE SET
                archive_date = excluded.archive_date,
                scope_id = excluded.scope_id,
                scope = excluded.scope,
                name = excluded.name,
                value = excluded.value
            "#,
        )
        .bind(archived.source_object_id)
        .bind(archived.archive_date)
        .bind(archived.scope_id)
        .bind(archived.scope.as_str())
        .bind(&archived.name)
        .bind(serde_json::to_string(&archived.value)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_archived_contract_data(
        &self,
        scope_id: i64,
        scope: ContractScope,
    ) -> Result<Vec<ArchivedContractData>, CoreError> {
        let rows = sqlx::query_as::<_, ArchivedContractDataRow>(
            r#"
            SELECT id, source_object_id, archive_date, scope_id, scope, name, value
            FROM archived_contract_data
            WHERE scope_id = ? AND scope = ?
            ORDER BY id ASC
            "#,
        )
        .bind(scope_id)
        .bind(scope.as_str())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    // ========================================================================
    // Health
    // ========================================================================

    async fn health_check_db(&self) -> Result<bool, CoreError> {
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}
