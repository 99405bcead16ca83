// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for procflow-core.
//!
//! [`Persistence`] is the gateway every service talks to. It is typed per
//! entity: one method per logical query, never raw SQL in the services.
//! List queries are always ordered by id ascending and paginated with
//! [`QueryOptions`], which keeps bulk sweeps deterministic.
//!
//! Process and flow-node snapshots are keyed by source row and state, so a
//! second insert for the same end state is a no-op. Dependent rows (comments,
//! documents, connectors, business data, contract data) keep one snapshot per
//! source row and a second insert replaces it. An archival interrupted between
//! "insert snapshot" and "delete live row" can be re-run from scratch, and the
//! final archive always carries the latest archive date.

pub mod sqlite;

pub use self::sqlite::SqlitePersistence;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{
    ArchivedComment, ArchivedConnectorInstance, ArchivedContractData, ArchivedDocumentMapping,
    ArchivedFlowNodeInstance, ArchivedProcessInstance, ArchivedRefBusinessDataInstance, Comment,
    ConnectorInstance, ContainerType, ContractData, ContractScope, DataInstance, DocumentMapping,
    EventTriggerInstance, FlowNodeInstance, MessageEventCouple, MessageInstance, MessageProgress,
    ProcessInstance, RefBusinessDataInstance, WaitingEvent, WaitingProgress,
};

/// Pagination for list queries. Results are ordered by id ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Rows to skip.
    pub offset: i64,
    /// Maximum rows to return.
    pub limit: i64,
}

impl QueryOptions {
    /// Page starting at `offset`.
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    /// First page of `limit` rows. Bulk sweeps always refetch this page.
    pub fn first(limit: i64) -> Self {
        Self { offset: 0, limit }
    }
}

/// Persistence interface used by the correlation engine and the archiver.
#[async_trait]
pub trait Persistence: Send + Sync {
    // ========================================================================
    // Flow-node instances (event instances are flow nodes of kind `event`)
    // ========================================================================

    /// Insert a flow-node instance. Fails on duplicate id.
    async fn insert_flow_node_instance(&self, node: &FlowNodeInstance) -> Result<(), CoreError>;

    /// Get a flow-node instance.
    async fn get_flow_node_instance(&self, id: i64)
    -> Result<Option<FlowNodeInstance>, CoreError>;

    /// Delete a flow-node row. Returns false when no row existed.
    async fn delete_flow_node_instance(&self, id: i64) -> Result<bool, CoreError>;

    // ========================================================================
    // Event trigger instances
    // ========================================================================

    /// Insert a trigger. Fails on duplicate id.
    async fn insert_event_trigger_instance(
        &self,
        trigger: &EventTriggerInstance,
    ) -> Result<(), CoreError>;

    /// Get a trigger.
    async fn get_event_trigger_instance(
        &self,
        id: i64,
    ) -> Result<Option<EventTriggerInstance>, CoreError>;

    /// List the triggers of an event instance.
    async fn list_event_trigger_instances(
        &self,
        event_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<EventTriggerInstance>, CoreError>;

    /// Overwrite a trigger row. Returns false when no row existed.
    async fn update_event_trigger_instance(
        &self,
        trigger: &EventTriggerInstance,
    ) -> Result<bool, CoreError>;

    /// Delete a trigger. Returns false when no row existed.
    async fn delete_event_trigger_instance(&self, id: i64) -> Result<bool, CoreError>;

    // ========================================================================
    // Waiting events
    // ========================================================================

    /// Insert a waiting event. Fails on duplicate id.
    async fn insert_waiting_event(&self, waiting: &WaitingEvent) -> Result<(), CoreError>;

    /// Get a waiting event.
    async fn get_waiting_event(&self, id: i64) -> Result<Option<WaitingEvent>, CoreError>;

    /// Waiting events registered by a flow-node instance.
    async fn list_waiting_events_of_flow_node(
        &self,
        flow_node_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError>;

    /// Active signal waiting events for a signal name.
    async fn list_waiting_signal_events(
        &self,
        signal_name: &str,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError>;

    /// Active boundary error waiting events guarding an activity. A `None`
    /// error code matches only catch-all handlers.
    async fn list_boundary_waiting_error_events(
        &self,
        activity_instance_id: i64,
        error_code: Option<&str>,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError>;

    /// Waiting events of start events of a process definition.
    async fn list_start_waiting_events(
        &self,
        process_definition_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>, CoreError>;

    /// Overwrite a waiting event row. Returns false when no row existed.
    async fn update_waiting_event(&self, waiting: &WaitingEvent) -> Result<bool, CoreError>;

    /// Move a waiting event from `expected` to `new` progress. Affects at most
    /// one row; returns false when the row was not in `expected`.
    async fn compare_and_set_waiting_progress(
        &self,
        id: i64,
        expected: WaitingProgress,
        new: WaitingProgress,
    ) -> Result<bool, CoreError>;

    /// Reset every in-progress waiting event. Returns rows affected.
    async fn reset_in_progress_waiting_events(&self) -> Result<u64, CoreError>;

    /// Delete a waiting event. Returns false when no row existed.
    async fn delete_waiting_event(&self, id: i64) -> Result<bool, CoreError>;

    // ========================================================================
    // Message instances and matching
    // ========================================================================

    /// Insert a message instance. Fails on duplicate id.
    async fn insert_message_instance(&self, message: &MessageInstance) -> Result<(), CoreError>;

    /// Get a message instance.
    async fn get_message_instance(&self, id: i64) -> Result<Option<MessageInstance>, CoreError>;

    /// Overwrite a message instance row. Returns false when no row existed.
    async fn update_message_instance(&self, message: &MessageInstance)
    -> Result<bool, CoreError>;

    /// Move a message instance from `expected` to `new` progress.
    async fn compare_and_set_message_progress(
        &self,
        id: i64,
        expected: MessageProgress,
        new: MessageProgress,
    ) -> Result<bool, CoreError>;

    /// Reset every in-progress message instance. Returns rows affected.
    async fn reset_in_progress_message_instances(&self) -> Result<u64, CoreError>;

    /// Delete a message instance. Returns false when no row existed.
    async fn delete_message_instance(&self, id: i64) -> Result<bool, CoreError>;

    /// Every compatible (waiting message event, message instance) pair with
    /// both sides unclaimed, ordered by message id then waiting event id.
    async fn list_message_event_couples(
        &self,
        options: QueryOptions,
    ) -> Result<Vec<MessageEventCouple>, CoreError>;

    // ========================================================================
    // Process instances
    // ========================================================================

    /// Insert a process instance.
    async fn insert_process_instance(&self, instance: &ProcessInstance) -> Result<(), CoreError>;

    /// Get a process instance.
    async fn get_process_instance(&self, id: i64) -> Result<Option<ProcessInstance>, CoreError>;

    /// Delete a process instance row. Returns false when no row existed.
    async fn delete_process_instance(&self, id: i64) -> Result<bool, CoreError>;

    // ========================================================================
    // Process dependents
    // ========================================================================

    /// Insert a comment.
    async fn insert_comment(&self, comment: &Comment) -> Result<(), CoreError>;

    /// Comments of a process instance.
    async fn list_comments(
        &self,
        process_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<Comment>, CoreError>;

    /// Delete a comment.
    async fn delete_comment(&self, id: i64) -> Result<bool, CoreError>;

    /// Insert a document mapping.
    async fn insert_document_mapping(&self, mapping: &DocumentMapping) -> Result<(), CoreError>;

    /// Document mappings of a process instance.
    async fn list_document_mappings(
        &self,
        process_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<DocumentMapping>, CoreError>;

    /// Delete a document mapping.
    async fn delete_document_mapping(&self, id: i64) -> Result<bool, CoreError>;

    /// Insert a connector instance.
    async fn insert_connector_instance(
        &self,
        connector: &ConnectorInstance,
    ) -> Result<(), CoreError>;

    /// Connector instances of a container.
    async fn list_connector_instances(
        &self,
        container_id: i64,
        container_type: ContainerType,
        options: QueryOptions,
    ) -> Result<Vec<ConnectorInstance>, CoreError>;

    /// Delete a connector instance.
    async fn delete_connector_instance(&self, id: i64) -> Result<bool, CoreError>;

    /// Insert a business data reference.
    async fn insert_ref_business_data(
        &self,
        reference: &RefBusinessDataInstance,
    ) -> Result<(), CoreError>;

    /// Business data references of a process instance.
    async fn list_ref_business_data(
        &self,
        process_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<RefBusinessDataInstance>, CoreError>;

    /// Delete a business data reference.
    async fn delete_ref_business_data(&self, id: i64) -> Result<bool, CoreError>;

    /// Insert a contract input.
    async fn insert_contract_data(&self, data: &ContractData) -> Result<(), CoreError>;

    /// Contract inputs of a process instance or user task.
    async fn list_contract_data(
        &self,
        scope_id: i64,
        scope: ContractScope,
        options: QueryOptions,
    ) -> Result<Vec<ContractData>, CoreError>;

    /// Delete a contract input.
    async fn delete_contract_data(&self, id: i64) -> Result<bool, CoreError>;

    /// Insert a local data instance.
    async fn insert_data_instance(&self, data: &DataInstance) -> Result<(), CoreError>;

    /// Local data instances of a container.
    async fn list_data_instances(
        &self,
        container_id: i64,
        container_type: ContainerType,
        options: QueryOptions,
    ) -> Result<Vec<DataInstance>, CoreError>;

    /// Delete a local data instance.
    async fn delete_data_instance(&self, id: i64) -> Result<bool, CoreError>;

    // ========================================================================
    // Archive
    // ========================================================================

    /// Insert an archived process instance (no-op if this instance was
    /// already archived in the same state).
    async fn insert_archived_process_instance(
        &self,
        archived: &ArchivedProcessInstance,
    ) -> Result<(), CoreError>;

    /// Archived snapshots of a process instance.
    async fn list_archived_process_instances(
        &self,
        source_object_id: i64,
    ) -> Result<Vec<ArchivedProcessInstance>, CoreError>;

    /// Insert an archived flow-node instance (no-op if this node was already
    /// archived in the same state).
    async fn insert_archived_flow_node_instance(
        &self,
        archived: &ArchivedFlowNodeInstance,
    ) -> Result<(), CoreError>;

    /// Archived snapshots of a flow-node instance.
    async fn list_archived_flow_node_instances(
        &self,
        source_object_id: i64,
    ) -> Result<Vec<ArchivedFlowNodeInstance>, CoreError>;

    /// Insert an archived comment, replacing an earlier snapshot of the same
    /// comment.
    async fn insert_archived_comment(&self, archived: &ArchivedComment) -> Result<(), CoreError>;

    /// Archived comments of a process instance.
    async fn list_archived_comments(
        &self,
        process_instance_id: i64,
    ) -> Result<Vec<ArchivedComment>, CoreError>;

    /// Insert an archived document mapping (replaces an earlier snapshot).
    async fn insert_archived_document_mapping(
        &self,
        archived: &ArchivedDocumentMapping,
    ) -> Result<(), CoreError>;

    /// Archived document mappings of a process instance.
    async fn list_archived_document_mappings(
        &self,
        process_instance_id: i64,
    ) -> Result<Vec<ArchivedDocumentMapping>, CoreError>;

    /// Insert an archived connector instance (replaces an earlier snapshot).
    async fn insert_archived_connector_instance(
        &self,
        archived: &ArchivedConnectorInstance,
    ) -> Result<(), CoreError>;

    /// Archived connector instances of a container.
    async fn list_archived_connector_instances(
        &self,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Vec<ArchivedConnectorInstance>, CoreError>;

    /// Insert an archived business data reference (replaces an earlier snapshot).
    async fn insert_archived_ref_business_data(
        &self,
        archived: &ArchivedRefBusinessDataInstance,
    ) -> Result<(), CoreError>;

    /// Archived business data references of a process instance.
    async fn list_archived_ref_business_data(
        &self,
        process_instance_id: i64,
    ) -> Result<Vec<ArchivedRefBusinessDataInstance>, CoreError>;

    /// Insert an archived contract input (replaces an earlier snapshot).
    async fn insert_archived_contract_data(
        &self,
        archived: &ArchivedContractData,
    ) -> Result<(), CoreError>;

    /// Archived contract inputs of a process instance or user task.
    async fn list_archived_contract_data(
        &self,
        scope_id: i64,
        scope: ContractScope,
    ) -> Result<Vec<ArchivedContractData>, CoreError>;

    // ========================================================================
    // Health
    // ========================================================================

    /// Check storage connectivity.
    async fn health_check_db(&self) -> Result<bool, CoreError>;
}
