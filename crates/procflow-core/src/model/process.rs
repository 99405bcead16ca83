// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Live process instances, flow-node instances and their dependents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::BpmnEventType;

/// Process instance lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessInstanceState {
    /// Being initialized.
    Initializing,
    /// Running.
    Started,
    /// Finished normally.
    Completed,
    /// Aborted by an end event or parent.
    Aborted,
    /// Cancelled by a user.
    Cancelled,
    /// Failed.
    Error,
}

impl ProcessInstanceState {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    /// Parse a state from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initializing" => Some(Self::Initializing),
            "started" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            "cancelled" => Some(Self::Cancelled),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether the instance has finished and may be archived.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Aborted | Self::Cancelled | Self::Error
        )
    }
}

/// Flow-node instance lifecycle state.
///
/// ```text
/// CREATED -> RUNNING -> (COMPLETED | CANCELLED | ABORTED) -> archived -> deleted
/// ```
///
/// The archived and deleted steps are not states of the live row: the
/// archiver inserts the snapshot and then removes the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowNodeState {
    /// Created, not started.
    Created,
    /// Executing.
    Running,
    /// Finished normally.
    Completed,
    /// Cancelled.
    Cancelled,
    /// Aborted.
    Aborted,
}

impl FlowNodeState {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        }
    }

    /// Parse a state from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Whether the node has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Aborted)
    }
}

/// A process instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInstance {
    /// Process instance id.
    pub id: i64,
    /// Process name.
    pub name: String,
    /// Process definition.
    pub process_definition_id: i64,
    /// Top-level process instance (itself for root instances).
    pub root_process_instance_id: i64,
    /// Call activity that started this instance, if any.
    pub caller_id: Option<i64>,
    /// Lifecycle state.
    pub state: ProcessInstanceState,
    /// When the instance started.
    pub start_date: DateTime<Utc>,
    /// When the instance finished.
    pub end_date: Option<DateTime<Utc>>,
    /// User that started the instance.
    pub started_by: i64,
    /// Last modification.
    pub last_update: DateTime<Utc>,
}

/// Task priority of human tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Lowest.
    Lowest,
    /// Under normal.
    UnderNormal,
    /// Normal.
    #[default]
    Normal,
    /// Above normal.
    AboveNormal,
    /// Highest.
    Highest,
}

/// Fields shared by user and manual tasks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HumanTask {
    /// Assigned user.
    pub assignee_id: Option<i64>,
    /// Priority.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Expected completion date.
    pub expected_end_date: Option<DateTime<Utc>>,
    /// When the task was claimed.
    pub claimed_date: Option<DateTime<Utc>>,
}

/// Gateway flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayType {
    /// Exclusive (XOR).
    Exclusive,
    /// Inclusive (OR).
    Inclusive,
    /// Parallel (AND).
    Parallel,
}

/// Runtime subtype of a flow-node instance with its subtype-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowNodeKind {
    /// Service task executed by the engine.
    AutomaticTask,
    /// Human task driven through a contract.
    UserTask(HumanTask),
    /// Human task without a contract.
    ManualTask(HumanTask),
    /// Task waiting for a message.
    ReceiveTask,
    /// Task sending a message.
    SendTask,
    /// Gateway.
    Gateway {
        /// Gateway flavour.
        gateway_type: GatewayType,
        /// Incoming transitions that reached the gateway.
        hit_bys: String,
    },
    /// Standard loop activity.
    LoopActivity {
        /// Iterations done.
        loop_counter: i32,
        /// Iteration cap.
        loop_max: Option<i32>,
    },
    /// Call activity starting another process.
    CallActivity,
    /// Multi-instance activity.
    MultiInstanceActivity {
        /// Sequential or parallel.
        sequential: bool,
        /// Total number of instances.
        loop_cardinality: i32,
        /// Instances running.
        number_of_active_instances: i32,
        /// Instances completed.
        number_of_completed_instances: i32,
        /// Instances terminated.
        number_of_terminated_instances: i32,
    },
    /// Embedded or event sub-process.
    SubProcessActivity {
        /// Whether an event started the sub-process.
        triggered_by_event: bool,
    },
    /// BPMN event node.
    Event {
        /// Event flavour.
        event_type: BpmnEventType,
        /// Activity a boundary event is attached to.
        attached_to: Option<i64>,
    },
}

impl FlowNodeKind {
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
            Self::Event { .. } => "event",
        }
    }

    /// Activities own data instances and connectors; gateways and events do not.
    pub fn is_activity(&self) -> bool {
        !matches!(self, Self::Gateway { .. } | Self::Event { .. })
    }

    /// Whether this is an event node.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event { .. })
    }

    /// Whether this is a user task (carries contract data).
    pub fn is_user_task(&self) -> bool {
        matches!(self, Self::UserTask(_))
    }
}

/// A flow-node instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNodeInstance {
    /// Flow-node instance id.
    pub id: i64,
    /// Node name.
    pub name: String,
    /// Runtime subtype.
    pub kind: FlowNodeKind,
    /// Lifecycle state.
    pub state: FlowNodeState,
    /// Flow-node definition.
    pub flow_node_definition_id: i64,
    /// Process definition of the containing process.
    pub process_definition_id: i64,
    /// Direct container (process instance or multi-instance/loop parent).
    pub parent_container_id: i64,
    /// Process instance containing the node.
    pub parent_process_instance_id: i64,
    /// Top-level process instance.
    pub root_process_instance_id: i64,
    /// When the node reached its current state.
    pub reached_state_date: DateTime<Utc>,
    /// Last modification.
    pub last_update_date: DateTime<Utc>,
}

/// Kind of container that owns connectors and data instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    /// A process instance.
    Process,
    /// A flow-node instance.
    FlowNode,
}

impl ContainerType {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::FlowNode => "flow_node",
        }
    }

    /// Parse a container type from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "process" => Some(Self::Process),
            "flow_node" => Some(Self::FlowNode),
            _ => None,
        }
    }
}

/// A comment posted on a process instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    pub id: i64,
    /// Process instance commented on.
    pub process_instance_id: i64,
    /// Author, `None` for system comments.
    pub user_id: Option<i64>,
    /// Text.
    pub content: String,
    /// When the comment was posted.
    pub post_date: DateTime<Utc>,
}

/// Link between a process instance and a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMapping {
    /// Mapping id.
    pub id: i64,
    /// Owning process instance.
    pub process_instance_id: i64,
    /// Referenced document.
    pub document_id: i64,
    /// Document name in the process.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Document version.
    pub version: String,
    /// Position in a document list.
    pub list_index: Option<i32>,
}

/// A connector instance attached to a process or flow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorInstance {
    /// Connector instance id.
    pub id: i64,
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
    /// Activation event (`on_enter` / `on_finish`).
    pub activation_event: String,
    /// Execution state.
    pub state: String,
}

/// Reference from a process or flow node to business data rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefBusinessDataInstance {
    /// Reference id.
    pub id: i64,
    /// Owning process instance.
    pub process_instance_id: Option<i64>,
    /// Owning flow-node instance.
    pub flow_node_instance_id: Option<i64>,
    /// Reference name.
    pub name: String,
    /// Business data class.
    pub data_class_name: String,
    /// Referenced business data ids (one for simple, several for multiple).
    pub data_ids: Vec<i64>,
}

/// Scope of contract input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractScope {
    /// Process instantiation contract.
    Process,
    /// User task execution contract.
    UserTask,
}

impl ContractScope {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::UserTask => "user_task",
        }
    }

    /// Parse a scope from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "process" => Some(Self::Process),
            "user_task" => Some(Self::UserTask),
            _ => None,
        }
    }
}

/// One contract input submitted to a process or user task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractData {
    /// Contract data id.
    pub id: i64,
    /// Process instance or user task instance id.
    pub scope_id: i64,
    /// Which contract the input belongs to.
    pub scope: ContractScope,
    /// Input name.
    pub name: String,
    /// Submitted value.
    pub value: serde_json::Value,
}

/// A local data instance of a process or activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInstance {
    /// Data instance id.
    pub id: i64,
    /// Owning container.
    pub container_id: i64,
    /// Kind of owning container.
    pub container_type: ContainerType,
    /// Variable name.
    pub name: String,
    /// Declared type.
    pub class_name: String,
    /// Current value.
    pub value: serde_json::Value,
}
