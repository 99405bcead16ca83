// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Message correlation rules.
//!
//! The storage query in [`crate::persistence::Persistence::list_message_event_couples`]
//! applies the same predicate in SQL; [`is_compatible`] is the reference
//! form used to check candidate pairs in memory.

use std::collections::HashSet;

use crate::model::{
    MessageEventCouple, MessageInstance, MessageProgress, WaitingEvent, WaitingEventKind,
    WaitingProgress,
};

/// Whether a waiting event can consume a message instance.
///
/// Both rows must be unclaimed and the waiting event active. Names must be
/// equal; the process name and flow-node target are enforced only when the
/// constraining side sets them; each correlation key set on the waiting
/// event must equal the message key at the same position.
pub fn is_compatible(waiting: &WaitingEvent, message: &MessageInstance) -> bool {
    let WaitingEventKind::Message {
        message_name,
        correlations,
    } = &waiting.kind
    else {
        return false;
    };

    if !waiting.active
        || waiting.progress != WaitingProgress::Waiting
        || message.progress != MessageProgress::ToProcess
    {
        return false;
    }

    if *message_name != message.message_name {
        return false;
    }

    if let Some(process_name) = &waiting.process_name
        && *process_name != message.target_process
    {
        return false;
    }

    if let Some(target) = &message.target_flow_node
        && *target != waiting.flow_node_name
    {
        return false;
    }

    correlations
        .iter()
        .zip(message.correlations.iter())
        .all(|(expected, actual)| match expected {
            Some(key) => actual.as_deref() == Some(key.as_str()),
            None => true,
        })
}

/// Keep the first couple for each waiting event and each message instance.
///
/// Input order decides which pairing wins, so callers pass couples ordered
/// by message id then waiting event id.
pub fn unique_couples(couples: Vec<MessageEventCouple>) -> Vec<MessageEventCouple> {
    let mut waiting_taken = HashSet::new();
    let mut messages_taken = HashSet::new();

    couples
        .into_iter()
        .filter(|couple| {
            if waiting_taken.contains(&couple.waiting_event_id)
                || messages_taken.contains(&couple.message_instance_id)
            {
                return false;
            }
            waiting_taken.insert(couple.waiting_event_id);
            messages_taken.insert(couple.message_instance_id);
            true
        })
        .collect()
}
