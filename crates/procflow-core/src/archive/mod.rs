// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Archiver: moves finished process and flow-node instances into history.
//!
//! Every dependent row is archived before it is deleted, and every dependent
//! is handled before the container's own archive-then-delete. The steps are
//! individually durable rather than one transaction; a failure at any step
//! aborts with [`CoreError::Archiving`] and leaves the container row live.
//! Re-archiving a source row either is a no-op (same end state) or replaces
//! the earlier snapshot, so an aborted archival is resumed by calling it
//! again.
//!
//! | Step | Process instance | Flow-node instance |
//! |------|------------------|--------------------|
//! | 1 | resolve definition (fatal if missing) | definition and node definition, both required |
//! | 2 | comments | delete local data (activities with data definitions) |
//! | 3 | document mappings | connectors (activities declaring connectors) |
//! | 4 | connectors (definition declares connectors) | contract data (user tasks) |
//! | 5 | business data references | snapshot (not for event nodes) |
//! | 6 | contract data | refetch, archive leftover connectors, delete |
//! | 7 | snapshot, then delete the row | |
//!
//! With `delete_after_archive = false` dependents are archived in place and
//! the container row stays live.

pub mod snapshot;

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineSettings;
use crate::definition::{ProcessDefinition, ProcessDefinitionLookup};
use crate::error::{CoreError, Result};
use crate::events::EventService;
use crate::model::{
    ArchivedComment, ArchivedConnectorInstance, ArchivedContractData, ArchivedDocumentMapping,
    ArchivedProcessInstance, ArchivedRefBusinessDataInstance, ContainerType, ContractScope,
    FlowNodeInstance, ProcessInstance,
};
use crate::persistence::{Persistence, QueryOptions};
use crate::sweep;

const PROCESS_INSTANCE: &str = "process_instance";
const FLOW_NODE_INSTANCE: &str = "flow_node_instance";

/// Archives and deletes finished instances.
pub struct Archiver {
    persistence: Arc<dyn Persistence>,
    definitions: Arc<dyn ProcessDefinitionLookup>,
    events: Arc<EventService>,
    settings: EngineSettings,
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver")
            .field("persistence", &"...")
            .field("definitions", &"...")
            .field("settings", &self.settings)
            .finish()
    }
}

impl Archiver {
    /// Create an archiver. `events` performs the waiting-event and trigger
    /// sweeps of the flow-node deletion path.
    pub fn new(
        persistence: Arc<dyn Persistence>,
        definitions: Arc<dyn ProcessDefinitionLookup>,
        events: Arc<EventService>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            persistence,
            definitions,
            events,
            settings,
        }
    }

    /// Archive a finished process instance and its dependents, then delete
    /// the live rows.
    pub async fn archive_and_delete_process_instance(
        &self,
        instance: &ProcessInstance,
    ) -> Result<()> {
        self.archive_process_instance(instance, true).await
    }

    /// Archive a process instance and its dependents.
    ///
    /// Every row produced shares one archive date: the instance end date,
    /// or the current time when the instance has none.
    #[instrument(skip(self, instance), fields(process_instance_id = instance.id))]
    pub async fn archive_process_instance(
        &self,
        instance: &ProcessInstance,
        delete_after_archive: bool,
    ) -> Result<()> {
        let id = instance.id;
        let fail = |e: CoreError| CoreError::archiving(PROCESS_INSTANCE, id, e);

        let definition = self
            .resolve_definition(instance.process_definition_id)
            .await
            .map_err(fail)?;

        let archive_date = match instance.end_date {
            Some(end_date) => end_date,
            None => {
                warn!("Process instance has no end date, archiving with the current time");
                Utc::now()
            }
        };

        let comments = self
            .archive_comments(id, archive_date, delete_after_archive)
            .await
            .map_err(fail)?;
        let documents = self
            .archive_document_mappings(id, archive_date, delete_after_archive)
            .await
            .map_err(fail)?;
        let connectors = if definition.has_connectors() {
            self.archive_connectors(id, ContainerType::Process, archive_date, delete_after_archive)
                .await
                .map_err(fail)?
        } else {
            0
        };
        let business_data = self
            .archive_ref_business_data(id, archive_date, delete_after_archive)
            .await
            .map_err(fail)?;
        let contract_data = self
            .archive_contract_data(id, ContractScope::Process, archive_date, delete_after_archive)
            .await
            .map_err(fail)?;

        self.persistence
            .insert_archived_process_instance(&ArchivedProcessInstance::new(instance, archive_date))
            .await
            .map_err(fail)?;

        if delete_after_archive {
            let deleted = self
                .persistence
                .delete_process_instance(id)
                .await
                .map_err(fail)?;
            if !deleted {
                warn!("Process instance row was already gone after archiving");
            }
        }

        info!(
            comments,
            documents,
            connectors,
            business_data,
            contract_data,
            deleted = delete_after_archive,
            "Process instance archived"
        );
        Ok(())
    }

    /// Archive a finished flow-node instance, then delete it through the
    /// flow-node deletion path.
    pub async fn archive_and_delete_flow_node_instance(
        &self,
        node: &FlowNodeInstance,
        process_definition_id: i64,
    ) -> Result<()> {
        self.archive_flow_node_instance(node, process_definition_id, true)
            .await
    }

    /// Archive a flow-node instance according to its subtype.
    ///
    /// Rows produced by one call share the current time as archive date.
    /// Event nodes get no snapshot of their own.
    #[instrument(
        skip(self, node),
        fields(flow_node_instance_id = node.id, kind = node.kind.as_str())
    )]
    pub async fn archive_flow_node_instance(
        &self,
        node: &FlowNodeInstance,
        process_definition_id: i64,
        delete_after_archive: bool,
    ) -> Result<()> {
        let id = node.id;
        let fail = |e: CoreError| CoreError::archiving(FLOW_NODE_INSTANCE, id, e);

        let definition = self
            .resolve_definition(process_definition_id)
            .await
            .map_err(fail)?;
        let node_definition = definition
            .flow_node(node.flow_node_definition_id)
            .ok_or(CoreError::NotFound {
                entity: "flow_node_definition",
                id: node.flow_node_definition_id,
            })
            .map_err(fail)?;

        let archive_date = Utc::now();

        if node.kind.is_activity() {
            if delete_after_archive && node_definition.has_data_definitions() {
                let deleted = self.delete_data_instances(id).await.map_err(fail)?;
                debug!(deleted, "Local data instances deleted");
            }
            if node_definition.has_connectors() {
                self.archive_connectors(
                    id,
                    ContainerType::FlowNode,
                    archive_date,
                    delete_after_archive,
                )
                .await
                .map_err(fail)?;
            }
        }

        if node.kind.is_user_task() {
            self.archive_contract_data(
                id,
                ContractScope::UserTask,
                archive_date,
                delete_after_archive,
            )
            .await
            .map_err(fail)?;
        }

        match snapshot::flow_node_snapshot(node, archive_date) {
            Some(archived) => self
                .persistence
                .insert_archived_flow_node_instance(&archived)
                .await
                .map_err(fail)?,
            None => debug!("Event node, no flow-node snapshot"),
        }

        if delete_after_archive {
            // Work on the stored row, not the caller's copy.
            let live = self
                .persistence
                .get_flow_node_instance(id)
                .await
                .map_err(fail)?;
            match live {
                Some(live) => self
                    .delete_scoped_rows(&live, archive_date)
                    .await
                    .map_err(fail)?,
                None => warn!("Flow-node instance row was already gone after archiving"),
            }
        }

        info!(deleted = delete_after_archive, "Flow-node instance archived");
        Ok(())
    }

    /// Delete a flow-node instance with everything scoped to it: waiting
    /// events, triggers (event nodes), leftover connectors, then the row.
    ///
    /// Leftover connectors are archived before they are deleted, whatever
    /// the node definition declares.
    #[instrument(skip(self, node), fields(flow_node_instance_id = node.id))]
    pub async fn delete_flow_node_instance(&self, node: &FlowNodeInstance) -> Result<()> {
        self.delete_scoped_rows(node, Utc::now()).await
    }

    async fn delete_scoped_rows(
        &self,
        node: &FlowNodeInstance,
        archive_date: DateTime<Utc>,
    ) -> Result<()> {
        let node_id = node.id;
        self.events.delete_waiting_events(node_id).await?;

        if node.kind.is_event() {
            self.events.delete_event_trigger_instances(node_id).await?;
        }

        let connectors = self
            .archive_connectors(node_id, ContainerType::FlowNode, archive_date, true)
            .await
            .map_err(|e| CoreError::archiving(FLOW_NODE_INSTANCE, node_id, e))?;
        if connectors > 0 {
            debug!(connectors, "Leftover connector instances archived");
        }

        let deleted = self
            .persistence
            .delete_flow_node_instance(node_id)
            .await
            .map_err(|e| CoreError::deletion(FLOW_NODE_INSTANCE, node_id, e))?;
        if !deleted {
            debug!("Flow-node instance row already deleted");
        }
        Ok(())
    }

    async fn resolve_definition(
        &self,
        process_definition_id: i64,
    ) -> Result<Arc<ProcessDefinition>> {
        self.definitions
            .get_definition(process_definition_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "process_definition",
                id: process_definition_id,
            })
    }

    async fn archive_comments(
        &self,
        process_instance_id: i64,
        archive_date: DateTime<Utc>,
        delete: bool,
    ) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        self.pages(
            delete,
            |options| persistence.list_comments(process_instance_id, options),
            |comment| async move {
                persistence
                    .insert_archived_comment(&ArchivedComment::new(&comment, archive_date))
                    .await?;
                if delete {
                    persistence.delete_comment(comment.id).await?;
                }
                Ok::<_, CoreError>(())
            },
        )
        .await
    }

    async fn archive_document_mappings(
        &self,
        process_instance_id: i64,
        archive_date: DateTime<Utc>,
        delete: bool,
    ) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        self.pages(
            delete,
            |options| persistence.list_document_mappings(process_instance_id, options),
            |mapping| async move {
                persistence
                    .insert_archived_document_mapping(&ArchivedDocumentMapping::new(
                        &mapping,
                        archive_date,
                    ))
                    .await?;
                if delete {
                    persistence.delete_document_mapping(mapping.id).await?;
                }
                Ok::<_, CoreError>(())
            },
        )
        .await
    }

    async fn archive_connectors(
        &self,
        container_id: i64,
        container_type: ContainerType,
        archive_date: DateTime<Utc>,
        delete: bool,
    ) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        self.pages(
            delete,
            |options| persistence.list_connector_instances(container_id, container_type, options),
            |connector| async move {
                persistence
                    .insert_archived_connector_instance(&ArchivedConnectorInstance::new(
                        &connector,
                        archive_date,
                    ))
                    .await?;
                if delete {
                    persistence.delete_connector_instance(connector.id).await?;
                }
                Ok::<_, CoreError>(())
            },
        )
        .await
    }

    async fn archive_ref_business_data(
        &self,
        process_instance_id: i64,
        archive_date: DateTime<Utc>,
        delete: bool,
    ) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        self.pages(
            delete,
            |options| persistence.list_ref_business_data(process_instance_id, options),
            |reference| async move {
                persistence
                    .insert_archived_ref_business_data(&ArchivedRefBusinessDataInstance::new(
                        &reference,
                        archive_date,
                    ))
                    .await?;
                if delete {
                    persistence.delete_ref_business_data(reference.id).await?;
                }
                Ok::<_, CoreError>(())
            },
        )
        .await
    }

    async fn archive_contract_data(
        &self,
        scope_id: i64,
        scope: ContractScope,
        archive_date: DateTime<Utc>,
        delete: bool,
    ) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        self.pages(
            delete,
            |options| persistence.list_contract_data(scope_id, scope, options),
            |data| async move {
                persistence
                    .insert_archived_contract_data(&ArchivedContractData::new(&data, archive_date))
                    .await?;
                if delete {
                    persistence.delete_contract_data(data.id).await?;
                }
                Ok::<_, CoreError>(())
            },
        )
        .await
    }

    async fn delete_data_instances(&self, flow_node_instance_id: i64) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        sweep::drain(
            self.settings.sweep_page_size,
            |options| {
                persistence.list_data_instances(
                    flow_node_instance_id,
                    ContainerType::FlowNode,
                    options,
                )
            },
            |data| async move {
                persistence.delete_data_instance(data.id).await?;
                Ok::<_, CoreError>(())
            },
        )
        .await
    }

    /// Drain the set when rows are deleted as they are archived, otherwise
    /// walk it with an advancing offset.
    async fn pages<T, F, FFut, A, AFut>(&self, consume: bool, fetch: F, act: A) -> Result<u64>
    where
        F: FnMut(QueryOptions) -> FFut,
        FFut: Future<Output = Result<Vec<T>>>,
        A: FnMut(T) -> AFut,
        AFut: Future<Output = Result<()>>,
    {
        if consume {
            sweep::drain(self.settings.sweep_page_size, fetch, act).await
        } else {
            sweep::scan(self.settings.sweep_page_size, fetch, act).await
        }
    }
}
