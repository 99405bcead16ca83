// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record types owned by the persistence layer.
//!
//! The core never keeps these longer than one operation; storage is the
//! source of truth.

pub mod archive;
pub mod event;
pub mod process;

pub use self::archive::{
    ArchivedComment, ArchivedConnectorInstance, ArchivedContractData, ArchivedDocumentMapping,
    ArchivedFlowNodeInstance, ArchivedFlowNodeKind, ArchivedProcessInstance,
    ArchivedRefBusinessDataInstance,
};
pub use self::event::{
    BpmnEventType, CorrelationKeys, EventInstance, EventTrigger, EventTriggerInstance,
    MAX_CORRELATION_KEYS, MessageEventCouple, MessageInstance, MessageProgress, TimerType,
    WaitingEvent, WaitingEventKind, WaitingProgress,
};
pub use self::process::{
    Comment, ConnectorInstance, ContainerType, ContractData, ContractScope, DataInstance,
    DocumentMapping, FlowNodeInstance, FlowNodeKind, FlowNodeState, GatewayType, HumanTask,
    ProcessInstance, ProcessInstanceState, RefBusinessDataInstance, TaskPriority,
};
