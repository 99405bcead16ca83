// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flow-node archive snapshots.

use chrono::{DateTime, Utc};

use crate::model::{ArchivedFlowNodeInstance, ArchivedFlowNodeKind, FlowNodeInstance, FlowNodeKind};

/// Archive shape for a runtime flow-node subtype. Event nodes have none.
pub fn archived_kind(kind: &FlowNodeKind) -> Option<ArchivedFlowNodeKind> {
    let archived = match kind {
        FlowNodeKind::AutomaticTask => ArchivedFlowNodeKind::AutomaticTask,
        FlowNodeKind::UserTask(task) => ArchivedFlowNodeKind::UserTask(task.clone()),
        FlowNodeKind::ManualTask(task) => ArchivedFlowNodeKind::ManualTask(task.clone()),
        FlowNodeKind::ReceiveTask => ArchivedFlowNodeKind::ReceiveTask,
        FlowNodeKind::SendTask => ArchivedFlowNodeKind::SendTask,
        FlowNodeKind::Gateway {
            gateway_type,
            hit_bys,
        } => ArchivedFlowNodeKind::Gateway {
            gateway_type: *gateway_type,
            hit_bys: hit_bys.clone(),
        },
        FlowNodeKind::LoopActivity {
            loop_counter,
            loop_max,
        } => ArchivedFlowNodeKind::LoopActivity {
            loop_counter: *loop_counter,
            loop_max: *loop_max,
        },
        FlowNodeKind::CallActivity => ArchivedFlowNodeKind::CallActivity,
        FlowNodeKind::MultiInstanceActivity {
            sequential,
            loop_cardinality,
            number_of_active_instances,
            number_of_completed_instances,
            number_of_terminated_instances,
        } => ArchivedFlowNodeKind::MultiInstanceActivity {
            sequential: *sequential,
            loop_cardinality: *loop_cardinality,
            number_of_active_instances: *number_of_active_instances,
            number_of_completed_instances: *number_of_completed_instances,
            number_of_terminated_instances: *number_of_terminated_instances,
        },
        FlowNodeKind::SubProcessActivity { triggered_by_event } => {
            ArchivedFlowNodeKind::SubProcessActivity {
                triggered_by_event: *triggered_by_event,
            }
        }
        FlowNodeKind::Event { .. } => return None,
    };
    Some(archived)
}

/// Build the archive row for `live`, or `None` for event nodes.
pub fn flow_node_snapshot(
    live: &FlowNodeInstance,
    archive_date: DateTime<Utc>,
) -> Option<ArchivedFlowNodeInstance> {
    archived_kind(&live.kind).map(|kind| ArchivedFlowNodeInstance::new(live, kind, archive_date))
}
