// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Immutable archive snapshots.
//!
//! Every archived row keeps the id of the live row it was copied from
//! (`source_object_id`) and the archive date of the operation that produced
//! it. The archive row's own `id` is assigned by storage and is `None`
//! before insertion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::process::{
    Comment, ConnectorInstance, ContainerType, ContractData, ContractScope, DocumentMapping,
    FlowNodeInstance, FlowNodeState, GatewayType, HumanTask, ProcessInstance,
    ProcessInstanceState, RefBusinessDataInstance,
};

/// Archived process instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedProcessInstance {
    /// Archive row id.
    pub id: Option<i64>,
    /// Live process instance id.
    pub source_object_id: i64,
    /// Archive date shared by every row of the archival operation.
    pub archive_date: DateTime<Utc>,
    /// Process name.
    pub name: String,
    /// Process definition.
    pub process_definition_id: i64,
    /// Top-level process instance.
    pub root_process_instance_id: i64,
    /// Calling activity.
    pub caller_id: Option<i64>,
    /// Final state.
    pub state: ProcessInstanceState,
    /// Start date.
    pub start_date: DateTime<Utc>,
    /// End date.
    pub end_date: Option<DateTime<Utc>>,
    /// Starting user.
    pub started_by: i64,
}

impl ArchivedProcessInstance {
    /// Snapshot a live process instance.
    pub fn new(live: &ProcessInstance, archive_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            source_object_id: live.id,
            archive_date,
            name: live.name.clone(),
            process_definition_id: live.process_definition_id,
            root_process_instance_id: live.root_process_instance_id,
            caller_id: live.caller_id,
            state: live.state,
            start_date: live.start_date,
            end_date: live.end_date,
            started_by: live.started_by,
        }
    }
}

/// Archive shape of a flow node, one per archivable runtime subtype.
///
/// Event nodes have no variant: they are never archived as standalone
/// flow-node snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArchivedFlowNodeKind {
    /// Archived automatic task.
    AutomaticTask,
    /// Archived user task.
    UserTask(HumanTask),
    /// Archived manual task.
    ManualTask(HumanTask),
    /// Archived receive task.
    ReceiveTask,
    /// Archived send task.
    SendTask,
    /// Archived gateway.
    Gateway {
        /// Gateway flavour.
        gateway_type: GatewayType,
        /// Incoming transitions that reached the gateway.
        hit_bys: String,
    },
    /// Archived loop activity.
    LoopActivity {
        /// Iterations done.
        loop_counter: i32,
        /// Iteration cap.
        loop_max: Option<i32>,
    },
    /// Archived call activity.
    CallActivity,
    /// Archived multi-instance activity.
    MultiInstanceActivity {
        /// Sequential or parallel.
        sequential: bool,
        /// Total number of instances.
        loop_cardinality: i32,
        /// Instances running at archive time.
        number_of_active_instances: i32,
        /// Instances completed.
        number_of_completed_instances: i32,
        /// Instances terminated.
        number_of_terminated_instances: i32,
    },
    /// Archived sub-process activity.
    SubProcessActivity {
        /// Whether an event started the sub-process.
        triggered_by_event: bool,
    },
}

impl ArchivedFlowNodeKind {
    /// Discriminant stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutomaticTask => "automatic_task",
            Self::UserTask(_) => "user_task",
            Self::ManualTask(_) => "manual_task",
            Self::ReceiveTask => "receive_task",
            Self::SendTask => "send_task",
            Self::Gateway { .. } => "gateway",
            Self::LoopActivity { .. } => "loop_activity",
            Self::CallActivity => "call_activity",
            Self::MultiInstanceActivity { .. } => "multi_instance_activity",
            Self::SubProcessActivity { .. } => "sub_process_activity",
        }
    }
}

/// Archived flow-node instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedFlowNodeInstance {
    /// Archive row id.
    pub id: Option<i64>,
    /// Live flow-node instance id.
    pub source_object_id: i64,
    /// Archive date.
    pub archive_date: DateTime<Utc>,
    /// Node name.
    pub name: String,
    /// Subtype-specific snapshot.
    pub kind: ArchivedFlowNodeKind,
    /// State at archive time.
    pub state: FlowNodeState,
    /// Flow-node definition.
    pub flow_node_definition_id: i64,
    /// Process definition.
    pub process_definition_id: i64,
    /// Direct container.
    pub parent_container_id: i64,
    /// Containing process instance.
    pub parent_process_instance_id: i64,
    /// Top-level process instance.
    pub root_process_instance_id: i64,
    /// When the node reached its final state.
    pub reached_state_date: DateTime<Utc>,
    /// Last modification of the live row.
    pub last_update_date: DateTime<Utc>,
}

impl ArchivedFlowNodeInstance {
    /// Snapshot the fields common to every flow-node subtype.
    pub fn new(
        live: &FlowNodeInstance,
        kind: ArchivedFlowNodeKind,
        archive_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            source_object_id: live.id,
            archive_date,
            name: live.name.clone(),
            kind,
            state: live.state,
            flow_node_definition_id: live.flow_node_definition_id,
            process_definition_id: live.process_definition_id,
            parent_container_id: live.parent_container_id,
            parent_process_instance_id: live.parent_process_instance_id,
            root_process_instance_id: live.root_process_instance_id,
            reached_state_date: live.reached_state_date,
            last_update_date: live.last_update_date,
        }
    }
}

/// Archived comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedComment {
    /// Archive row id.
    pub id: Option<i64>,
    /// Live comment id.
    pub source_object_id: i64,
    /// Archive date.
    pub archive_date: DateTime<Utc>,
    /// Process instance commented on.
    pub process_instance_id: i64,
    /// Author.
    pub user_id: Option<i64>,
    /// Text.
    pub content: String,
    /// When the comment was posted.
    pub post_date: DateTime<Utc>,
}

impl ArchivedComment {
    /// Snapshot a live comment.
    pub fn new(live: &Comment, archive_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            source_object_id: live.id,
            archive_date,
            process_instance_id: live.process_instance_id,
            user_id: live.user_id,
            content: live.content.clone(),
            post_date: live.post_date,
        }
    }
}

/// Archived document mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedDocumentMapping {
    /// Archive row id.
    pub id: Option<i64>,
    /// Live mapping id.
    pub source_object_id: i64,
    /// Archive date.
    pub archive_date: DateTime<Utc>,
    /// Owning process instance.
    pub process_instance_id: i64,
    /// Referenced document.
    pub document_id: i64,
    /// Document name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Document version.
    pub version: String,
    /// Position in a document list.
    pub list_index: Option<i32>,
}

impl ArchivedDocumentMapping {
    /// Snapshot a live document mapping.
    pub fn new(live: &DocumentMapping, archive_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            source_object_id: live.id,
            archive_date,
            process_instance_id: live.process_instance_id,
            document_id: live.document_id,
            name: live.name.clone(),
            description: live.description.clone(),
            version: live.version.clone(),
            list_index: live.list_index,
        }
    }
}

/// Archived connector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedConnectorInstance {
    /// Archive row id.
    pub id: Option<i64>,
    /// Live connector instance id.
    pub source_object_id: i64,
    /// Archive date.
    pub archive_date: DateTime<Utc>,
    /// Owning container.
    pub container_id: i64,
    /// Kind of owning container.
    pub container_type: ContainerType,
    /// Connector definition id.
    pub connector_id: String,
    /// Connector definition version.
    pub version: String,
    /// Connector name.
    pub name: String,
    /// Activation event.
    pub activation_event: String,
    /// Execution state.
    pub state: String,
}

impl ArchivedConnectorInstance {
    /// Snapshot a live connector instance.
    pub fn new(live: &ConnectorInstance, archive_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            source_object_id: live.id,
            archive_date,
            container_id: live.container_id,
            container_type: live.container_type,
            connector_id: live.connector_id.clone(),
            version: live.version.clone(),
            name: live.name.clone(),
            activation_event: live.activation_event.clone(),
            state: live.state.clone(),
        }
    }
}

/// Archived business data reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedRefBusinessDataInstance {
    /// Archive row id.
    pub id: Option<i64>,
    /// Live reference id.
    pub source_object_id: i64,
    /// Archive date.
    pub archive_date: DateTime<Utc>,
    /// Owning process instance.
    pub process_instance_id: Option<i64>,
    /// Owning flow-node instance.
    pub flow_node_instance_id: Option<i64>,
    /// Reference name.
    pub name: String,
    /// Business data class.
    pub data_class_name: String,
    /// Referenced business data ids.
    pub data_ids: Vec<i64>,
}

impl ArchivedRefBusinessDataInstance {
    /// Snapshot a live business data reference.
    pub fn new(live: &RefBusinessDataInstance, archive_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            source_object_id: live.id,
            archive_date,
            process_instance_id: live.process_instance_id,
            flow_node_instance_id: live.flow_node_instance_id,
            name: live.name.clone(),
            data_class_name: live.data_class_name.clone(),
            data_ids: live.data_ids.clone(),
        }
    }
}

/// Archived contract input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedContractData {
    /// Archive row id.
    pub id: Option<i64>,
    /// Live contract data id.
    pub source_object_id: i64,
    /// Archive date.
    pub archive_date: DateTime<Utc>,
    /// Process instance or user task id.
    pub scope_id: i64,
    /// Contract scope.
    pub scope: ContractScope,
    /// Input name.
    pub name: String,
    /// Submitted value.
    pub value: serde_json::Value,
}

impl ArchivedContractData {
    /// Snapshot a live contract input.
    pub fn new(live: &ContractData, archive_date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            source_object_id: live.id,
            archive_date,
            scope_id: live.scope_id,
            scope: live.scope,
            name: live.name.clone(),
            value: live.value.clone(),
        }
    }
}
