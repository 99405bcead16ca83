// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event instances, event triggers, waiting events and message instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::process::{FlowNodeInstance, FlowNodeKind, FlowNodeState};

/// Number of correlation key slots carried by message waiting events and
/// message instances.
pub const MAX_CORRELATION_KEYS: usize = 5;

/// Positional correlation keys. A key that is unset on a waiting event does
/// not constrain matching.
pub type CorrelationKeys = [Option<String>; MAX_CORRELATION_KEYS];

/// BPMN event node flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BpmnEventType {
    /// Start event (message/signal/timer start or plain start).
    Start,
    /// End event.
    End,
    /// Intermediate catch event.
    IntermediateCatch,
    /// Intermediate throw event.
    IntermediateThrow,
    /// Boundary event attached to an activity.
    Boundary,
}

impl BpmnEventType {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::IntermediateCatch => "intermediate_catch",
            Self::IntermediateThrow => "intermediate_throw",
            Self::Boundary => "boundary",
        }
    }

    /// Parse an event type from its stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "intermediate_catch" => Some(Self::IntermediateCatch),
            "intermediate_throw" => Some(Self::IntermediateThrow),
            "boundary" => Some(Self::Boundary),
            _ => None,
        }
    }
}

/// A flow-node instance specialized as a BPMN event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInstance {
    /// Flow-node instance id.
    pub id: i64,
    /// Event node name.
    pub name: String,
    /// BPMN event flavour.
    pub event_type: BpmnEventType,
    /// Flow-node definition this event was instantiated from.
    pub flow_node_definition_id: i64,
    /// Process instance directly containing the event.
    pub parent_process_instance_id: i64,
    /// Top-level process instance.
    pub root_process_instance_id: i64,
    /// Process definition of the containing process.
    pub process_definition_id: i64,
    /// Lifecycle state.
    pub state: FlowNodeState,
    /// Activity instance a boundary event is attached to.
    pub attached_to: Option<i64>,
    /// When the event node last changed state.
    pub reached_state_date: DateTime<Utc>,
}

impl EventInstance {
    /// The flow-node row backing this event.
    pub fn to_flow_node(&self) -> FlowNodeInstance {
        FlowNodeInstance {
            id: self.id,
            name: self.name.clone(),
            kind: FlowNodeKind::Event {
                event_type: self.event_type,
                attached_to: self.attached_to,
            },
            state: self.state,
            flow_node_definition_id: self.flow_node_definition_id,
            process_definition_id: self.process_definition_id,
            parent_container_id: self.parent_process_instance_id,
            parent_process_instance_id: self.parent_process_instance_id,
            root_process_instance_id: self.root_process_instance_id,
            reached_state_date: self.reached_state_date,
            last_update_date: self.reached_state_date,
        }
    }

    /// View a flow-node row as an event, if it is one.
    pub fn from_flow_node(node: FlowNodeInstance) -> Option<Self> {
        match node.kind {
            FlowNodeKind::Event {
                event_type,
                attached_to,
            } => Some(Self {
                id: node.id,
                name: node.name,
                event_type,
                flow_node_definition_id: node.flow_node_definition_id,
                parent_process_instance_id: node.parent_process_instance_id,
                root_process_instance_id: node.root_process_instance_id,
                process_definition_id: node.process_definition_id,
                state: node.state,
                attached_to,
                reached_state_date: node.reached_state_date,
            }),
            _ => None,
        }
    }
}

/// Timer flavour of a timer trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerType {
    /// Fires at a fixed date.
    Date,
    /// Fires after a duration.
    Duration,
    /// Fires repeatedly.
    Cycle,
}

/// Trigger configuration attached to an event instance. Exactly one kind
/// per row; the fields of one kind are meaningless for the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum EventTrigger {
    /// Timer trigger scheduled with the job scheduler.
    Timer {
        /// Timer flavour.
        timer_type: TimerType,
        /// Next execution date.
        execution_date: DateTime<Utc>,
        /// Name of the scheduler job trigger.
        job_trigger_name: String,
    },
    /// Signal thrown by the event.
    ThrowSignal {
        /// Signal name.
        signal_name: String,
    },
    /// Error thrown by the event.
    ThrowError {
        /// Error code.
        error_code: String,
    },
    /// Message thrown by the event.
    ThrowMessage {
        /// Message name.
        message_name: String,
        /// Name of the process the message is sent to.
        target_process: String,
        /// Name of the flow node the message is sent to.
        target_flow_node: Option<String>,
    },
}

impl EventTrigger {
    /// Discriminant stored in the `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timer { .. } => "timer",
            Self::ThrowSignal { .. } => "throw_signal",
            Self::ThrowError { .. } => "throw_error",
            Self::ThrowMessage { .. } => "throw_message",
        }
    }
}

/// Trigger row attached to an event instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTriggerInstance {
    /// Trigger id.
    pub id: i64,
    /// Owning event instance.
    pub event_instance_id: i64,
    /// Kind-specific configuration.
    #[serde(flatten)]
    pub trigger: EventTrigger,
}

/// Progress flag of a waiting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingProgress {
    /// Eligible for matching.
    #[default]
    Waiting,
    /// Claimed by a consumer.
    InProgress,
}

impl WaitingProgress {
    /// Integer code stored in the database.
    pub fn code(&self) -> i64 {
        match self {
            Self::Waiting => 0,
            Self::InProgress => 1,
        }
    }

    /// Parse a stored integer code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Waiting),
            1 => Some(Self::InProgress),
            _ => None,
        }
    }
}

/// Progress flag of a message instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageProgress {
    /// Pending delivery.
    #[default]
    ToProcess,
    /// Claimed by a consumer.
    InProgress,
}

impl MessageProgress {
    /// Integer code stored in the database.
    pub fn code(&self) -> i64 {
        match self {
            Self::ToProcess => 0,
            Self::InProgress => 1,
        }
    }

    /// Parse a stored integer code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::ToProcess),
            1 => Some(Self::InProgress),
            _ => None,
        }
    }
}

/// What a waiting event is waiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitingEventKind {
    /// Waiting for a message.
    Message {
        /// Message name.
        message_name: String,
        /// Correlation keys the message must carry.
        #[serde(default)]
        correlations: CorrelationKeys,
    },
    /// Waiting for a signal broadcast.
    Signal {
        /// Signal name.
        signal_name: String,
    },
    /// Waiting for an error thrown inside an activity.
    Error {
        /// Error code, `None` for the catch-all handler.
        error_code: Option<String>,
        /// Activity instance the boundary event guards.
        related_activity_instance_id: Option<i64>,
    },
}

impl WaitingEventKind {
    /// Discriminant stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Signal { .. } => "signal",
            Self::Error { .. } => "error",
        }
    }
}

/// A catch registration: "this flow node resumes when X arrives".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitingEvent {
    /// Waiting event id.
    pub id: i64,
    /// What is awaited.
    #[serde(flatten)]
    pub kind: WaitingEventKind,
    /// Flavour of the catching event node.
    pub event_type: BpmnEventType,
    /// Process definition containing the catching node.
    pub process_definition_id: i64,
    /// Process name, `None` when any target process is accepted.
    pub process_name: Option<String>,
    /// Flow-node definition of the catching node.
    pub flow_node_definition_id: i64,
    /// Name of the catching node.
    pub flow_node_name: String,
    /// Flow-node instance to resume; `None` for start events.
    pub flow_node_instance_id: Option<i64>,
    /// Process instance containing the catching node.
    pub parent_process_instance_id: Option<i64>,
    /// Top-level process instance.
    pub root_process_instance_id: Option<i64>,
    /// Claim flag.
    #[serde(default)]
    pub progress: WaitingProgress,
    /// Inactive waiting events are ignored by matching.
    pub active: bool,
}

impl WaitingEvent {
    /// Message name for message waiting events.
    pub fn message_name(&self) -> Option<&str> {
        match &self.kind {
            WaitingEventKind::Message { message_name, .. } => Some(message_name),
            _ => None,
        }
    }
}

/// A throw registration: "message X was sent to process/flow node Y".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInstance {
    /// Message instance id.
    pub id: i64,
    /// Message name.
    pub message_name: String,
    /// Name of the target process.
    pub target_process: String,
    /// Name of the target flow node, `None` when any node may receive it.
    pub target_flow_node: Option<String>,
    /// Process definition of the sender.
    pub process_definition_id: i64,
    /// Name of the sending flow node.
    pub flow_node_name: Option<String>,
    /// Correlation keys carried by the message.
    #[serde(default)]
    pub correlations: CorrelationKeys,
    /// Message content.
    pub payload: Option<serde_json::Value>,
    /// Claim flag.
    #[serde(default)]
    pub progress: MessageProgress,
    /// When the message was thrown.
    pub creation_date: DateTime<Utc>,
}

/// A matched (waiting message event, message instance) pair.
///
/// Produced by the matching query and consumed immediately by the scheduler;
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEventCouple {
    /// Matched waiting event.
    pub waiting_event_id: i64,
    /// Flavour of the catching node (start events create a new instance).
    pub waiting_event_type: BpmnEventType,
    /// Flow-node instance to resume, `None` for start events.
    pub flow_node_instance_id: Option<i64>,
    /// Matched message instance.
    pub message_instance_id: i64,
    /// Message name.
    pub message_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trips_through_str() {
        for ty in [
            BpmnEventType::Start,
            BpmnEventType::End,
            BpmnEventType::IntermediateCatch,
            BpmnEventType::IntermediateThrow,
            BpmnEventType::Boundary,
        ] {
            assert_eq!(BpmnEventType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(BpmnEventType::parse("gateway"), None);
    }

    #[test]
    fn test_progress_codes() {
        assert_eq!(WaitingProgress::default(), WaitingProgress::Waiting);
        assert_eq!(WaitingProgress::from_code(1), Some(WaitingProgress::InProgress));
        assert_eq!(WaitingProgress::from_code(7), None);
        assert_eq!(MessageProgress::default().code(), 0);
        assert_eq!(MessageProgress::from_code(1), Some(MessageProgress::InProgress));
    }

    #[test]
    fn test_waiting_event_serializes_flat() {
        let waiting = WaitingEvent {
            id: 1,
            kind: WaitingEventKind::Signal {
                signal_name: "go".to_string(),
            },
            event_type: BpmnEventType::IntermediateCatch,
            process_definition_id: 10,
            process_name: Some("Order".to_string()),
            flow_node_definition_id: 100,
            flow_node_name: "wait".to_string(),
            flow_node_instance_id: Some(5),
            parent_process_instance_id: Some(2),
            root_process_instance_id: Some(2),
            progress: WaitingProgress::Waiting,
            active: true,
        };

        let json = serde_json::to_value(&waiting).unwrap();
        assert_eq!(json["kind"], "signal");
        assert_eq!(json["signal_name"], "go");
        assert_eq!(json["progress"], "waiting");

        let back: WaitingEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, waiting);
    }

    #[test]
    fn test_event_instance_flow_node_view() {
        let event = EventInstance {
            id: 3,
            name: "timeout".to_string(),
            event_type: BpmnEventType::Boundary,
            flow_node_definition_id: 30,
            parent_process_instance_id: 1,
            root_process_instance_id: 1,
            process_definition_id: 9,
            state: FlowNodeState::Running,
            attached_to: Some(2),
            reached_state_date: Utc::now(),
        };

        let node = event.to_flow_node();
        assert!(node.kind.is_event());
        assert_eq!(EventInstance::from_flow_node(node), Some(event));
    }
}
