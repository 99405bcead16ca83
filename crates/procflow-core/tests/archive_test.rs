// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for process and flow-node archiving.

mod common;

use chrono::{TimeZone, Utc};

use common::*;
use procflow_core::model::{
    ContainerType, ContractScope, EventTrigger, EventTriggerInstance, FlowNodeKind, HumanTask,
    ProcessInstanceState,
};
use procflow_core::persistence::{Persistence, QueryOptions};

fn ended_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Process 1 with two of every dependent.
async fn seed_process(ctx: &TestContext) -> procflow_core::model::ProcessInstance {
    let instance = process_instance(1, Some(ended_at()));
    ctx.insert_process(&instance).await;

    let p = &ctx.persistence;
    for id in 1..=2 {
        p.insert_comment(&comment(id, 1)).await.unwrap();
        p.insert_document_mapping(&document_mapping(id, 1)).await.unwrap();
        p.insert_connector_instance(&connector(id, 1, ContainerType::Process))
            .await
            .unwrap();
        p.insert_ref_business_data(&ref_business_data(id, 1)).await.unwrap();
        p.insert_contract_data(&contract_data(id, 1, ContractScope::Process))
            .await
            .unwrap();
    }
    instance
}

#[tokio::test]
async fn test_process_archive_round_trip() {
    let ctx = TestContext::new().await;
    let instance = seed_process(&ctx).await;

    ctx.runtime
        .archiver()
        .archive_and_delete_process_instance(&instance)
        .await
        .unwrap();

    let p = &ctx.persistence;
    assert!(p.get_process_instance(1).await.unwrap().is_none());
    assert!(p.list_comments(1, QueryOptions::first(10)).await.unwrap().is_empty());
    assert!(
        p.list_connector_instances(1, ContainerType::Process, QueryOptions::first(10))
            .await
            .unwrap()
            .is_empty()
    );

    let archived = p.list_archived_process_instances(1).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].archive_date, ended_at());
    assert_eq!(archived[0].name, "Order");

    let comments = p.list_archived_comments(1).await.unwrap();
    let documents = p.list_archived_document_mappings(1).await.unwrap();
    let connectors = p
        .list_archived_connector_instances(1, ContainerType::Process)
        .await
        .unwrap();
    let references = p.list_archived_ref_business_data(1).await.unwrap();
    let contracts = p
        .list_archived_contract_data(1, ContractScope::Process)
        .await
        .unwrap();

    assert_eq!(comments.len(), 2);
    assert_eq!(documents.len(), 2);
    assert_eq!(connectors.len(), 2);
    assert_eq!(references.len(), 2);
    assert_eq!(contracts.len(), 2);
    assert_eq!(references[0].data_ids, vec![41, 42]);

    let dates = comments
        .iter()
        .map(|c| c.archive_date)
        .chain(documents.iter().map(|d| d.archive_date))
        .chain(connectors.iter().map(|c| c.archive_date))
        .chain(references.iter().map(|r| r.archive_date))
        .chain(contracts.iter().map(|c| c.archive_date));
    for date in dates {
        assert_eq!(date, ended_at());
    }
}

#[tokio::test]
async fn test_process_without_declared_connectors_keeps_them() {
    let ctx = TestContext::new().await;
    ctx.source.deploy(definition(PROCESS_DEFINITION_ID, false)).await;
    let instance = seed_process(&ctx).await;

    ctx.runtime
        .archiver()
        .archive_and_delete_process_instance(&instance)
        .await
        .unwrap();

    let p = &ctx.persistence;
    assert!(
        p.list_archived_connector_instances(1, ContainerType::Process)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        p.list_connector_instances(1, ContainerType::Process, QueryOptions::first(10))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_archive_without_delete_keeps_live_rows() {
    let ctx = TestContext::new().await;
    let instance = seed_process(&ctx).await;

    ctx.runtime
        .archiver()
        .archive_process_instance(&instance, false)
        .await
        .unwrap();
    // Repeatable per source row.
    ctx.runtime
        .archiver()
        .archive_process_instance(&instance, false)
        .await
        .unwrap();

    let p = &ctx.persistence;
    assert!(p.get_process_instance(1).await.unwrap().is_some());
    assert_eq!(p.list_comments(1, QueryOptions::first(10)).await.unwrap().len(), 2);
    assert_eq!(p.list_archived_comments(1).await.unwrap().len(), 2);
    assert_eq!(p.list_archived_process_instances(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_step_leaves_process_live_and_resumes() {
    let ctx = TestContext::new().await;
    let instance = seed_process(&ctx).await;

    ctx.execute(
        "CREATE TRIGGER fail_connector_archive BEFORE INSERT ON archived_connector_instances \
         WHEN NEW.source_object_id = 2 BEGIN SELECT RAISE(ABORT, 'forced'); END;",
    )
    .await;

    let err = ctx
        .runtime
        .archiver()
        .archive_and_delete_process_instance(&instance)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ARCHIVING_ERROR");

    let p = &ctx.persistence;
    assert!(p.get_process_instance(1).await.unwrap().is_some());
    assert!(p.list_archived_process_instances(1).await.unwrap().is_empty());
    assert_eq!(
        p.list_archived_connector_instances(1, ContainerType::Process)
            .await
            .unwrap()
            .len(),
        1
    );
    // Steps before the failure completed.
    assert!(p.list_comments(1, QueryOptions::first(10)).await.unwrap().is_empty());
    assert_eq!(p.list_archived_comments(1).await.unwrap().len(), 2);

    ctx.execute("DROP TRIGGER fail_connector_archive;").await;
    ctx.runtime
        .archiver()
        .archive_and_delete_process_instance(&instance)
        .await
        .unwrap();

    assert!(p.get_process_instance(1).await.unwrap().is_none());
    assert_eq!(
        p.list_archived_connector_instances(1, ContainerType::Process)
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(p.list_archived_comments(1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_definition_aborts_process_archive() {
    let ctx = TestContext::new().await;
    let mut instance = process_instance(1, Some(ended_at()));
    instance.process_definition_id = 999;
    ctx.insert_process(&instance).await;

    let err = ctx
        .runtime
        .archiver()
        .archive_and_delete_process_instance(&instance)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ARCHIVING_ERROR");
    assert!(ctx.persistence.get_process_instance(1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_process_without_end_date_is_archived_now() {
    let ctx = TestContext::new().await;
    let instance = process_instance(1, None);
    ctx.insert_process(&instance).await;

    let before = Utc::now();
    ctx.runtime
        .archiver()
        .archive_and_delete_process_instance(&instance)
        .await
        .unwrap();

    let archived = ctx.persistence.list_archived_process_instances(1).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert!(archived[0].archive_date >= before - chrono::Duration::seconds(1));
}

#[tokio::test]
async fn test_final_archive_replaces_checkpoint_dependents() {
    let ctx = TestContext::new().await;
    let mut instance = process_instance(1, None);
    instance.state = ProcessInstanceState::Started;
    ctx.insert_process(&instance).await;
    ctx.persistence.insert_comment(&comment(1, 1)).await.unwrap();

    let archiver = ctx.runtime.archiver();
    archiver.archive_process_instance(&instance, false).await.unwrap();

    let finished = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    instance.state = ProcessInstanceState::Completed;
    instance.end_date = Some(finished);
    archiver
        .archive_and_delete_process_instance(&instance)
        .await
        .unwrap();

    let p = &ctx.persistence;
    let comments = p.list_archived_comments(1).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].archive_date, finished);

    let processes = p.list_archived_process_instances(1).await.unwrap();
    assert_eq!(processes.len(), 2);
    assert!(
        processes
            .iter()
            .any(|archived| archived.state == ProcessInstanceState::Completed
                && archived.archive_date == finished)
    );
}

#[tokio::test]
async fn test_connector_sweep_for_boundary_sizes() {
    let page_size = 3;
    for n in [0, 1, page_size, page_size + 1] {
        let ctx = TestContext::with_page_size(page_size).await;
        let instance = process_instance(1, Some(ended_at()));
        ctx.insert_process(&instance).await;
        for id in 1..=n {
            ctx.insert_connector(&connector(id, 1, ContainerType::Process)).await;
        }

        ctx.runtime
            .archiver()
            .archive_and_delete_process_instance(&instance)
            .await
            .unwrap();

        let p = &ctx.persistence;
        assert_eq!(
            p.list_archived_connector_instances(1, ContainerType::Process)
                .await
                .unwrap()
                .len(),
            n as usize,
            "n = {}",
            n
        );
        assert!(
            p.list_connector_instances(1, ContainerType::Process, QueryOptions::first(10))
                .await
                .unwrap()
                .is_empty()
        );
    }
}

#[tokio::test]
async fn test_service_node_archive_deletes_data_and_connectors() {
    let ctx = TestContext::new().await;
    let node = flow_node(20, 1, SERVICE_NODE, FlowNodeKind::AutomaticTask);
    ctx.insert_flow_node(&node).await;

    let p = &ctx.persistence;
    p.insert_data_instance(&data_instance(1, 20)).await.unwrap();
    p.insert_connector_instance(&connector(1, 20, ContainerType::FlowNode))
        .await
        .unwrap();

    ctx.runtime
        .archiver()
        .archive_and_delete_flow_node_instance(&node, PROCESS_DEFINITION_ID)
        .await
        .unwrap();

    assert!(p.get_flow_node_instance(20).await.unwrap().is_none());
    assert!(
        p.list_data_instances(20, ContainerType::FlowNode, QueryOptions::first(10))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        p.list_connector_instances(20, ContainerType::FlowNode, QueryOptions::first(10))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        p.list_archived_connector_instances(20, ContainerType::FlowNode)
            .await
            .unwrap()
            .len(),
        1
    );

    let archived = p.list_archived_flow_node_instances(20).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].kind.as_str(), "automatic_task");
}

#[tokio::test]
async fn test_user_task_archive_includes_contract_data() {
    let ctx = TestContext::new().await;
    let node = flow_node(21, 1, PLAIN_NODE, FlowNodeKind::UserTask(HumanTask::default()));
    ctx.insert_flow_node(&node).await;
    ctx.persistence
        .insert_contract_data(&contract_data(1, 21, ContractScope::UserTask))
        .await
        .unwrap();

    ctx.runtime
        .archiver()
        .archive_and_delete_flow_node_instance(&node, PROCESS_DEFINITION_ID)
        .await
        .unwrap();

    let p = &ctx.persistence;
    assert_eq!(
        p.list_archived_contract_data(21, ContractScope::UserTask)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(
        p.list_contract_data(21, ContractScope::UserTask, QueryOptions::first(10))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(p.list_archived_flow_node_instances(21).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_event_node_is_deleted_without_snapshot() {
    let ctx = TestContext::new().await;
    let events = ctx.runtime.events();
    let node = event_node(30, 1);
    ctx.insert_flow_node(&node).await;

    let mut waiting = message_waiting(1, "payment", keys(&[]));
    waiting.flow_node_instance_id = Some(30);
    events.create_waiting_event(&waiting).await.unwrap();
    events
        .create_event_trigger_instance(&EventTriggerInstance {
            id: 1,
            event_instance_id: 30,
            trigger: EventTrigger::ThrowSignal {
                signal_name: "go".to_string(),
            },
        })
        .await
        .unwrap();

    ctx.runtime
        .archiver()
        .archive_and_delete_flow_node_instance(&node, PROCESS_DEFINITION_ID)
        .await
        .unwrap();

    let p = &ctx.persistence;
    assert!(p.get_flow_node_instance(30).await.unwrap().is_none());
    assert!(p.list_archived_flow_node_instances(30).await.unwrap().is_empty());
    assert!(events.get_waiting_event(1).await.unwrap_err().is_not_found());
    assert!(
        events
            .get_event_trigger_instances(30, QueryOptions::first(10))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_unknown_node_definition_aborts_flow_node_archive() {
    let ctx = TestContext::new().await;
    let node = flow_node(22, 1, 999, FlowNodeKind::CallActivity);
    ctx.insert_flow_node(&node).await;
    ctx.insert_connector(&connector(1, 22, ContainerType::FlowNode)).await;

    let err = ctx
        .runtime
        .archiver()
        .archive_and_delete_flow_node_instance(&node, PROCESS_DEFINITION_ID)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ARCHIVING_ERROR");

    let p = &ctx.persistence;
    assert!(p.get_flow_node_instance(22).await.unwrap().is_some());
    assert!(p.list_archived_flow_node_instances(22).await.unwrap().is_empty());
    assert_eq!(
        p.list_connector_instances(22, ContainerType::FlowNode, QueryOptions::first(10))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_undeclared_flow_node_connectors_are_archived_before_delete() {
    let ctx = TestContext::new().await;
    let node = flow_node(23, 1, PLAIN_NODE, FlowNodeKind::AutomaticTask);
    ctx.insert_flow_node(&node).await;
    ctx.insert_connector(&connector(1, 23, ContainerType::FlowNode)).await;

    ctx.runtime
        .archiver()
        .archive_and_delete_flow_node_instance(&node, PROCESS_DEFINITION_ID)
        .await
        .unwrap();

    let p = &ctx.persistence;
    assert!(p.get_flow_node_instance(23).await.unwrap().is_none());
    assert!(
        p.list_connector_instances(23, ContainerType::FlowNode, QueryOptions::first(10))
            .await
            .unwrap()
            .is_empty()
    );
    let archived = p
        .list_archived_connector_instances(23, ContainerType::FlowNode)
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].source_object_id, 1);
}

#[tokio::test]
async fn test_delete_flow_node_archives_leftover_connectors() {
    let ctx = TestContext::with_page_size(2).await;
    let node = flow_node(25, 1, PLAIN_NODE, FlowNodeKind::AutomaticTask);
    ctx.insert_flow_node(&node).await;
    for id in 1..=3 {
        ctx.insert_connector(&connector(id, 25, ContainerType::FlowNode)).await;
    }

    ctx.runtime
        .archiver()
        .delete_flow_node_instance(&node)
        .await
        .unwrap();

    let p = &ctx.persistence;
    assert!(p.get_flow_node_instance(25).await.unwrap().is_none());
    assert_eq!(
        p.list_archived_connector_instances(25, ContainerType::FlowNode)
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn test_flow_node_archive_without_delete_is_repeatable() {
    let ctx = TestContext::new().await;
    let node = flow_node(23, 1, SERVICE_NODE, FlowNodeKind::AutomaticTask);
    ctx.insert_flow_node(&node).await;
    ctx.persistence
        .insert_data_instance(&data_instance(1, 23))
        .await
        .unwrap();

    for _ in 0..2 {
        ctx.runtime
            .archiver()
            .archive_flow_node_instance(&node, PROCESS_DEFINITION_ID, false)
            .await
            .unwrap();
    }

    let p = &ctx.persistence;
    assert!(p.get_flow_node_instance(23).await.unwrap().is_some());
    assert_eq!(
        p.list_data_instances(23, ContainerType::FlowNode, QueryOptions::first(10))
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(p.list_archived_flow_node_instances(23).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_flow_node_of_already_deleted_row() {
    let ctx = TestContext::new().await;
    let node = flow_node(24, 1, PLAIN_NODE, FlowNodeKind::AutomaticTask);
    ctx.insert_flow_node(&node).await;

    let archiver = ctx.runtime.archiver();
    archiver.delete_flow_node_instance(&node).await.unwrap();
    archiver.delete_flow_node_instance(&node).await.unwrap();

    assert!(ctx.persistence.get_flow_node_instance(24).await.unwrap().is_none());
}
