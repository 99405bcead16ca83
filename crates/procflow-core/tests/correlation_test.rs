// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for waiting events, messages and couple matching.

mod common;

use std::sync::Arc;

use common::*;
use procflow_core::config::EngineSettings;
use procflow_core::error::CoreError;
use procflow_core::events::matching::is_compatible;
use procflow_core::events::UpdateDescriptor;
use procflow_core::model::{
    BpmnEventType, EventTrigger, EventTriggerInstance, MessageProgress, WaitingProgress,
};
use procflow_core::notifier::{BroadcastNotifier, ChangeAction, EntityType};
use procflow_core::persistence::QueryOptions;

#[tokio::test]
async fn test_matching_couple_is_found() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    events
        .create_waiting_event(&message_waiting(1, "payment", keys(&["order-1"])))
        .await
        .unwrap();
    events
        .create_message_instance(&message(1, "payment", keys(&["order-1", "extra"])))
        .await
        .unwrap();

    let couples = events.get_message_event_couples(0, 10).await.unwrap();
    assert_eq!(couples.len(), 1);
    assert_eq!(couples[0].waiting_event_id, 1);
    assert_eq!(couples[0].message_instance_id, 1);
    assert_eq!(couples[0].flow_node_instance_id, Some(101));
    assert_eq!(couples[0].message_name, "payment");
}

#[tokio::test]
async fn test_incompatible_pairs_never_couple() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    // Each waiting event differs from message 1 in exactly one rule.
    let wrong_name = message_waiting(1, "refund", keys(&["order-1"]));
    let wrong_key = message_waiting(2, "payment", keys(&["order-2"]));
    let mut wrong_process = message_waiting(3, "payment", keys(&["order-1"]));
    wrong_process.process_name = Some("Invoice".to_string());
    let mut inactive = message_waiting(4, "payment", keys(&["order-1"]));
    inactive.active = false;
    let mut wrong_node = message_waiting(5, "payment", keys(&["order-1"]));
    wrong_node.flow_node_name = "other".to_string();

    let mut msg = message(1, "payment", keys(&["order-1"]));
    msg.target_flow_node = Some("wait".to_string());

    for waiting in [&wrong_name, &wrong_key, &wrong_process, &inactive, &wrong_node] {
        assert!(!is_compatible(waiting, &msg), "waiting event {}", waiting.id);
        events.create_waiting_event(waiting).await.unwrap();
    }
    events.create_message_instance(&msg).await.unwrap();

    assert!(
        events
            .get_message_event_couples(0, 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_missing_correlation_on_message_blocks_match() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    events
        .create_waiting_event(&message_waiting(1, "payment", keys(&["order-1", "eu"])))
        .await
        .unwrap();
    events
        .create_message_instance(&message(1, "payment", keys(&["order-1"])))
        .await
        .unwrap();

    assert!(
        events
            .get_message_event_couples(0, 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_couples_are_unique_per_side() {
    let ctx = TestContext::with_page_size(2).await;
    let events = ctx.runtime.events();

    // Two waiting events and three messages, all mutually compatible.
    for id in 1..=2 {
        events
            .create_waiting_event(&message_waiting(id, "payment", keys(&[])))
            .await
            .unwrap();
    }
    for id in 1..=3 {
        events
            .create_message_instance(&message(id, "payment", keys(&[])))
            .await
            .unwrap();
    }

    let couples = events.get_message_event_couples(0, 10).await.unwrap();
    let pairs: Vec<_> = couples
        .iter()
        .map(|c| (c.message_instance_id, c.waiting_event_id))
        .collect();
    assert_eq!(pairs, vec![(1, 1), (2, 2)]);

    let second = events.get_message_event_couples(1, 10).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].message_instance_id, 2);

    let first_only = events.get_message_event_couples(0, 1).await.unwrap();
    assert_eq!(first_only.len(), 1);
    assert_eq!(first_only[0].message_instance_id, 1);
}

#[tokio::test]
async fn test_concurrent_claim_has_single_winner() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events().clone();

    events
        .create_waiting_event(&message_waiting(1, "payment", keys(&[])))
        .await
        .unwrap();
    events
        .create_message_instance(&message(1, "payment", keys(&[])))
        .await
        .unwrap();

    let (a, b) = futures::join!(events.claim_waiting_event(1), events.claim_waiting_event(1));
    let wins = [a.unwrap(), b.unwrap()].iter().filter(|w| **w).count();
    assert_eq!(wins, 1);

    let (a, b) = futures::join!(
        events.claim_message_instance(1),
        events.claim_message_instance(1)
    );
    let wins = [a.unwrap(), b.unwrap()].iter().filter(|w| **w).count();
    assert_eq!(wins, 1);

    // Claimed rows are invisible to matching.
    assert!(
        events
            .get_message_event_couples(0, 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_release_makes_couple_visible_again() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    events
        .create_waiting_event(&message_waiting(1, "payment", keys(&[])))
        .await
        .unwrap();
    events
        .create_message_instance(&message(1, "payment", keys(&[])))
        .await
        .unwrap();

    assert!(events.claim_waiting_event(1).await.unwrap());
    assert!(events.get_message_event_couples(0, 10).await.unwrap().is_empty());

    assert!(events.release_waiting_event(1).await.unwrap());
    assert!(!events.release_waiting_event(1).await.unwrap());
    assert_eq!(events.get_message_event_couples(0, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restart_resets_claims_once() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    events
        .create_waiting_event(&message_waiting(1, "payment", keys(&[])))
        .await
        .unwrap();
    events
        .create_message_instance(&message(1, "payment", keys(&[])))
        .await
        .unwrap();
    assert!(events.claim_waiting_event(1).await.unwrap());
    assert!(events.claim_message_instance(1).await.unwrap());

    let restarted = ctx.restart().await;
    assert_eq!(restarted.recovery().waiting_events, 1);
    assert_eq!(restarted.recovery().messages, 1);

    let waiting = restarted.events().get_waiting_event(1).await.unwrap();
    assert_eq!(waiting.progress, WaitingProgress::Waiting);
    let msg = restarted.events().get_message_instance(1).await.unwrap();
    assert_eq!(msg.progress, MessageProgress::ToProcess);
    assert_eq!(
        restarted
            .events()
            .get_message_event_couples(0, 10)
            .await
            .unwrap()
            .len(),
        1
    );

    // Nothing left to reset.
    let again = ctx.restart().await;
    assert_eq!(again.recovery().waiting_events, 0);
    assert_eq!(again.recovery().messages, 0);
}

#[tokio::test]
async fn test_create_forces_initial_progress() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    let mut waiting = message_waiting(1, "payment", keys(&[]));
    waiting.progress = WaitingProgress::InProgress;
    events.create_waiting_event(&waiting).await.unwrap();

    let mut msg = message(1, "payment", keys(&[]));
    msg.progress = MessageProgress::InProgress;
    events.create_message_instance(&msg).await.unwrap();

    assert_eq!(
        events.get_waiting_event(1).await.unwrap().progress,
        WaitingProgress::Waiting
    );
    assert_eq!(
        events.get_message_instance(1).await.unwrap().progress,
        MessageProgress::ToProcess
    );
}

#[tokio::test]
async fn test_create_waiting_event_requires_definition() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    let mut unknown_process = message_waiting(1, "payment", keys(&[]));
    unknown_process.process_definition_id = 999;
    let err = events
        .create_waiting_event(&unknown_process)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let mut unknown_node = message_waiting(2, "payment", keys(&[]));
    unknown_node.flow_node_definition_id = 999;
    let err = events.create_waiting_event(&unknown_node).await.unwrap_err();
    assert!(err.is_not_found());

    assert!(events.get_waiting_event(1).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_duplicate_waiting_event_is_creation_error() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    let waiting = message_waiting(1, "payment", keys(&[]));
    events.create_waiting_event(&waiting).await.unwrap();
    let err = events.create_waiting_event(&waiting).await.unwrap_err();
    assert_eq!(err.error_code(), "CREATION_ERROR");
}

#[tokio::test]
async fn test_update_deactivates_waiting_event() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    let waiting = message_waiting(1, "payment", keys(&[]));
    events.create_waiting_event(&waiting).await.unwrap();
    events
        .create_message_instance(&message(1, "payment", keys(&[])))
        .await
        .unwrap();

    let stored = events.get_waiting_event(1).await.unwrap();
    let updated = events
        .update_waiting_event(&stored, &UpdateDescriptor::new().set("active", false))
        .await
        .unwrap();
    assert!(!updated.active);
    assert!(!events.get_waiting_event(1).await.unwrap().active);
    assert!(events.get_message_event_couples(0, 10).await.unwrap().is_empty());

    let err = events
        .update_waiting_event(&stored, &UpdateDescriptor::new().set("id", 2))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_UPDATE");
}

#[tokio::test]
async fn test_update_of_deleted_row_is_not_found() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    let msg = message(1, "payment", keys(&[]));
    events.create_message_instance(&msg).await.unwrap();
    let stored = events.get_message_instance(1).await.unwrap();
    events.delete_message_instance(&stored).await.unwrap();

    let err = events
        .update_message_instance(
            &stored,
            &UpdateDescriptor::new().set("target_process", "Invoice"),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = events.delete_message_instance(&stored).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_signal_events_are_all_returned() {
    let ctx = TestContext::with_page_size(2).await;
    let events = ctx.runtime.events();

    for id in 1..=5 {
        let mut waiting = message_waiting(id, "unused", keys(&[]));
        waiting.kind = procflow_core::model::WaitingEventKind::Signal {
            signal_name: if id == 3 { "stop" } else { "go" }.to_string(),
        };
        events.create_waiting_event(&waiting).await.unwrap();
    }

    let go = events.get_waiting_signal_events("go").await.unwrap();
    let ids: Vec<_> = go.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![1, 2, 4, 5]);
    assert!(events.get_waiting_signal_events("none").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_boundary_error_lookup() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    events
        .create_waiting_event(&error_waiting(1, 40, Some("E_PAY")))
        .await
        .unwrap();
    events
        .create_waiting_event(&error_waiting(2, 40, None))
        .await
        .unwrap();

    let coded = events
        .get_boundary_waiting_error_event(40, Some("E_PAY"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coded.id, 1);

    let catch_all = events
        .get_boundary_waiting_error_event(40, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(catch_all.id, 2);

    assert!(
        events
            .get_boundary_waiting_error_event(41, Some("E_PAY"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_boundary_error_lookup_reports_ambiguity() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    for id in 1..=2 {
        events
            .create_waiting_event(&error_waiting(id, 40, Some("E_PAY")))
            .await
            .unwrap();
    }

    let err = events
        .get_boundary_waiting_error_event(40, Some("E_PAY"))
        .await
        .unwrap_err();
    match err {
        CoreError::AmbiguousWaitingEvent {
            activity_instance_id,
            matches,
            ..
        } => {
            assert_eq!(activity_instance_id, 40);
            assert_eq!(matches, 2);
        }
        other => panic!("Expected AmbiguousWaitingEvent, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bulk_waiting_event_delete_for_boundary_sizes() {
    let page_size = 3;
    for n in [0, 1, page_size, page_size + 1] {
        let ctx = TestContext::with_page_size(page_size).await;
        let events = ctx.runtime.events();

        for id in 1..=n {
            let mut waiting = message_waiting(id, "payment", keys(&[]));
            waiting.flow_node_instance_id = Some(77);
            events.create_waiting_event(&waiting).await.unwrap();
        }
        let mut other = message_waiting(100, "payment", keys(&[]));
        other.flow_node_instance_id = Some(78);
        events.create_waiting_event(&other).await.unwrap();

        let deleted = events.delete_waiting_events(77).await.unwrap();
        assert_eq!(deleted, n as u64, "n = {}", n);
        assert!(
            events
                .get_waiting_events_of_flow_node(77, QueryOptions::first(10))
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            events
                .get_waiting_events_of_flow_node(78, QueryOptions::first(10))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}

#[tokio::test]
async fn test_changes_are_published_to_subscribers() {
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let mut rx = notifier.subscribe([
        (EntityType::MessageInstance, ChangeAction::Insert),
        (EntityType::MessageInstance, ChangeAction::Delete),
    ]);
    let ctx = TestContext::with_settings(EngineSettings::default(), Some(notifier.clone())).await;
    let events = ctx.runtime.events();

    events
        .create_message_instance(&message(5, "payment", keys(&[])))
        .await
        .unwrap();
    let stored = events.get_message_instance(5).await.unwrap();
    // Updates have no subscriber and publish nothing.
    let updated = events
        .update_message_instance(
            &stored,
            &UpdateDescriptor::new().set("payload", serde_json::Value::Null),
        )
        .await
        .unwrap();
    events.delete_message_instance(&updated).await.unwrap();

    let inserted = rx.recv().await.unwrap();
    assert_eq!(inserted.action, ChangeAction::Insert);
    assert_eq!(inserted.id, 5);
    assert!(inserted.old.is_none());

    let deleted = rx.recv().await.unwrap();
    assert_eq!(deleted.action, ChangeAction::Delete);
    assert_eq!(deleted.entity, EntityType::MessageInstance);
    assert_eq!(deleted.old.unwrap()["payload"], serde_json::Value::Null);
}

fn signal_trigger(id: i64, event_instance_id: i64) -> EventTriggerInstance {
    EventTriggerInstance {
        id,
        event_instance_id,
        trigger: EventTrigger::ThrowSignal {
            signal_name: "go".to_string(),
        },
    }
}

#[tokio::test]
async fn test_update_publishes_old_and_new_snapshots() {
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let mut rx = notifier.subscribe([
        (EntityType::WaitingEvent, ChangeAction::Update),
        (EntityType::MessageInstance, ChangeAction::Update),
        (EntityType::EventTriggerInstance, ChangeAction::Update),
    ]);
    let ctx = TestContext::with_settings(EngineSettings::default(), Some(notifier.clone())).await;
    let events = ctx.runtime.events();

    events
        .create_waiting_event(&message_waiting(1, "payment", keys(&[])))
        .await
        .unwrap();
    events
        .create_message_instance(&message(2, "payment", keys(&[])))
        .await
        .unwrap();
    ctx.insert_flow_node(&event_node(30, 1)).await;
    events
        .create_event_trigger_instance(&signal_trigger(3, 30))
        .await
        .unwrap();

    let waiting = events.get_waiting_event(1).await.unwrap();
    events
        .update_waiting_event(&waiting, &UpdateDescriptor::new().set("active", false))
        .await
        .unwrap();
    let msg = events.get_message_instance(2).await.unwrap();
    events
        .update_message_instance(&msg, &UpdateDescriptor::new().set("target_process", "Invoice"))
        .await
        .unwrap();
    let trigger = events.get_event_trigger_instance(3).await.unwrap();
    events
        .update_event_trigger_instance(
            &trigger,
            &UpdateDescriptor::new().set("signal_name", "stop"),
        )
        .await
        .unwrap();

    // Inserts have no subscriber, so the first event is the waiting-event update.
    let change = rx.recv().await.unwrap();
    assert_eq!(change.entity, EntityType::WaitingEvent);
    assert_eq!(change.action, ChangeAction::Update);
    assert_eq!(change.id, 1);
    assert_eq!(change.old.unwrap()["active"], true);
    assert_eq!(change.new.unwrap()["active"], false);

    let change = rx.recv().await.unwrap();
    assert_eq!(change.entity, EntityType::MessageInstance);
    assert_eq!(change.id, 2);
    assert_eq!(change.old.unwrap()["target_process"], "Order");
    assert_eq!(change.new.unwrap()["target_process"], "Invoice");

    let change = rx.recv().await.unwrap();
    assert_eq!(change.entity, EntityType::EventTriggerInstance);
    assert_eq!(change.id, 3);
    assert_eq!(change.old.unwrap()["signal_name"], "go");
    assert_eq!(change.new.unwrap()["signal_name"], "stop");

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_bulk_trigger_delete_for_boundary_sizes() {
    let page_size = 3;
    for n in [0, 1, page_size, page_size + 1] {
        let ctx = TestContext::with_page_size(page_size).await;
        let events = ctx.runtime.events();
        ctx.insert_flow_node(&event_node(30, 1)).await;
        ctx.insert_flow_node(&event_node(31, 1)).await;

        for id in 1..=n {
            events
                .create_event_trigger_instance(&signal_trigger(id, 30))
                .await
                .unwrap();
        }
        events
            .create_event_trigger_instance(&signal_trigger(100, 31))
            .await
            .unwrap();

        let deleted = events.delete_event_trigger_instances(30).await.unwrap();
        assert_eq!(deleted, n as u64, "n = {}", n);
        assert!(
            events
                .get_event_trigger_instances(30, QueryOptions::first(10))
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            events
                .get_event_trigger_instances(31, QueryOptions::first(10))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}

#[tokio::test]
async fn test_single_deletes_report_missing_rows() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    let waiting = message_waiting(1, "payment", keys(&[]));
    events.create_waiting_event(&waiting).await.unwrap();
    events.delete_waiting_event(&waiting).await.unwrap();
    assert!(events.get_waiting_event(1).await.unwrap_err().is_not_found());
    let err = events.delete_waiting_event(&waiting).await.unwrap_err();
    assert!(err.is_not_found());

    ctx.insert_flow_node(&event_node(30, 1)).await;
    let trigger = signal_trigger(1, 30);
    events.create_event_trigger_instance(&trigger).await.unwrap();
    events.delete_event_trigger_instance(&trigger).await.unwrap();
    assert!(
        events
            .get_event_trigger_instance(1)
            .await
            .unwrap_err()
            .is_not_found()
    );
    let err = events.delete_event_trigger_instance(&trigger).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_start_waiting_events_of_definition() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();

    for id in 1..=3 {
        let mut start = message_waiting(id, "order", keys(&[]));
        start.event_type = BpmnEventType::Start;
        start.flow_node_instance_id = None;
        start.parent_process_instance_id = None;
        start.root_process_instance_id = None;
        events.create_waiting_event(&start).await.unwrap();
    }
    // Bound to a running instance, so not a start event of the definition.
    let mut bound = message_waiting(4, "order", keys(&[]));
    bound.event_type = BpmnEventType::Start;
    events.create_waiting_event(&bound).await.unwrap();
    events
        .create_waiting_event(&message_waiting(5, "order", keys(&[])))
        .await
        .unwrap();

    let first = events
        .get_start_waiting_events(PROCESS_DEFINITION_ID, QueryOptions::first(2))
        .await
        .unwrap();
    assert_eq!(first.iter().map(|w| w.id).collect::<Vec<_>>(), vec![1, 2]);
    let rest = events
        .get_start_waiting_events(PROCESS_DEFINITION_ID, QueryOptions::new(2, 2))
        .await
        .unwrap();
    assert_eq!(rest.iter().map(|w| w.id).collect::<Vec<_>>(), vec![3]);

    assert!(
        events
            .get_start_waiting_events(2, QueryOptions::first(10))
            .await
            .unwrap()
            .is_empty()
    );
}
