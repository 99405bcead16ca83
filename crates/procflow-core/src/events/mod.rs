// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event correlation engine.
//!
//! [`EventService`] persists the runtime side of BPMN events: event
//! instances, their triggers, waiting events (catch registrations) and
//! message instances (throw registrations). It also exposes the matching
//! query that pairs waiting message events with messages, and the claim
//! primitives the scheduler uses to consume a pair.
//!
//! # Consuming a couple
//!
//! ```ignore
//! for couple in events.get_message_event_couples(0, 100).await? {
//!     if !events.claim_waiting_event(couple.waiting_event_id).await? {
//!         continue; // claimed by another worker
//!     }
//!     if !events.claim_message_instance(couple.message_instance_id).await? {
//!         events.release_waiting_event(couple.waiting_event_id).await?;
//!         continue;
//!     }
//!     // deliver, then delete both rows (or release both on failure)
//! }
//! ```
//!
//! Rows left claimed by a crashed worker are released by the
//! `reset_in_progress_*` operations, which must run once at start-up before
//! any matching (see [`crate::runtime::EngineRuntime`]).

pub mod matching;
pub mod update;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::EngineSettings;
use crate::definition::ProcessDefinitionLookup;
use crate::error::{CoreError, Result};
use crate::model::{
    EventInstance, EventTriggerInstance, MessageEventCouple, MessageInstance, MessageProgress,
    WaitingEvent, WaitingProgress,
};
use crate::notifier::{ChangeAction, ChangeEvent, ChangeNotifier, EntityType};
use crate::persistence::{Persistence, QueryOptions};
use crate::sweep;

pub use self::update::{Updatable, UpdateDescriptor};

const EVENT_INSTANCE: &str = "event_instance";
const EVENT_TRIGGER_INSTANCE: &str = "event_trigger_instance";
const WAITING_EVENT: &str = "waiting_event";
const MESSAGE_INSTANCE: &str = "message_instance";

/// Event lifecycle and correlation operations.
pub struct EventService {
    persistence: Arc<dyn Persistence>,
    definitions: Arc<dyn ProcessDefinitionLookup>,
    notifier: Arc<dyn ChangeNotifier>,
    settings: EngineSettings,
}

impl std::fmt::Debug for EventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventService")
            .field("persistence", &"...")
            .field("definitions", &"...")
            .field("settings", &self.settings)
            .finish()
    }
}

impl EventService {
    /// Create the service over shared collaborators.
    pub fn new(
        persistence: Arc<dyn Persistence>,
        definitions: Arc<dyn ProcessDefinitionLookup>,
        notifier: Arc<dyn ChangeNotifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            persistence,
            definitions,
            notifier,
            settings,
        }
    }

    fn publish_insert<T: Serialize>(&self, entity: EntityType, id: i64, record: &T) {
        if self.notifier.has_handlers(entity, ChangeAction::Insert)
            && let Ok(new) = serde_json::to_value(record)
        {
            self.notifier.publish(ChangeEvent::insert(entity, id, new));
        }
    }

    fn publish_update<T: Serialize>(&self, entity: EntityType, id: i64, old: &T, new: &T) {
        if self.notifier.has_handlers(entity, ChangeAction::Update)
            && let (Ok(old), Ok(new)) = (serde_json::to_value(old), serde_json::to_value(new))
        {
            self.notifier.publish(ChangeEvent::update(entity, id, old, new));
        }
    }

    fn publish_delete<T: Serialize>(&self, entity: EntityType, id: i64, record: &T) {
        if self.notifier.has_handlers(entity, ChangeAction::Delete)
            && let Ok(old) = serde_json::to_value(record)
        {
            self.notifier.publish(ChangeEvent::delete(entity, id, old));
        }
    }

    // ========================================================================
    // Event instances
    // ========================================================================

    /// Insert an event instance (a flow-node row of kind `event`).
    #[instrument(skip(self, event), fields(event_instance_id = event.id))]
    pub async fn create_event_instance(&self, event: &EventInstance) -> Result<()> {
        self.persistence
            .insert_flow_node_instance(&event.to_flow_node())
            .await
            .map_err(|e| CoreError::creation(EVENT_INSTANCE, e))?;

        self.publish_insert(EntityType::EventInstance, event.id, event);
        Ok(())
    }

    /// Get an event instance. Flow nodes that are not events are reported
    /// as not found.
    pub async fn get_event_instance(&self, id: i64) -> Result<EventInstance> {
        self.persistence
            .get_flow_node_instance(id)
            .await
            .map_err(|e| CoreError::read(EVENT_INSTANCE, e))?
            .and_then(EventInstance::from_flow_node)
            .ok_or(CoreError::NotFound {
                entity: EVENT_INSTANCE,
                id,
            })
    }

    // ========================================================================
    // Event trigger instances
    // ========================================================================

    /// Insert a trigger.
    #[instrument(
        skip(self, trigger),
        fields(trigger_id = trigger.id, kind = trigger.trigger.kind())
    )]
    pub async fn create_event_trigger_instance(
        &self,
        trigger: &EventTriggerInstance,
    ) -> Result<()> {
        self.persistence
            .insert_event_trigger_instance(trigger)
            .await
            .map_err(|e| CoreError::creation(EVENT_TRIGGER_INSTANCE, e))?;

        self.publish_insert(EntityType::EventTriggerInstance, trigger.id, trigger);
        Ok(())
    }

    /// Get a trigger.
    pub async fn get_event_trigger_instance(&self, id: i64) -> Result<EventTriggerInstance> {
        self.persistence
            .get_event_trigger_instance(id)
            .await
            .map_err(|e| CoreError::read(EVENT_TRIGGER_INSTANCE, e))?
            .ok_or(CoreError::NotFound {
                entity: EVENT_TRIGGER_INSTANCE,
                id,
            })
    }

    /// One page of the triggers of an event instance, ordered by id.
    pub async fn get_event_trigger_instances(
        &self,
        event_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<EventTriggerInstance>> {
        self.persistence
            .list_event_trigger_instances(event_instance_id, options)
            .await
            .map_err(|e| CoreError::read(EVENT_TRIGGER_INSTANCE, e))
    }

    /// Apply `update` to `trigger` and store the result.
    ///
    /// The update notification carries `trigger` as the old snapshot.
    #[instrument(skip(self, trigger, update), fields(trigger_id = trigger.id))]
    pub async fn update_event_trigger_instance(
        &self,
        trigger: &EventTriggerInstance,
        update: &UpdateDescriptor,
    ) -> Result<EventTriggerInstance> {
        self.apply_update(
            trigger,
            update,
            EntityType::EventTriggerInstance,
            |p, updated| async move {
                let found = p.update_event_trigger_instance(&updated).await;
                found.map(|found| (found, updated))
            },
        )
        .await
    }

    /// Delete one trigger.
    #[instrument(skip(self, trigger), fields(trigger_id = trigger.id))]
    pub async fn delete_event_trigger_instance(
        &self,
        trigger: &EventTriggerInstance,
    ) -> Result<()> {
        if !self.remove_event_trigger_instance(trigger).await? {
            return Err(CoreError::NotFound {
                entity: EVENT_TRIGGER_INSTANCE,
                id: trigger.id,
            });
        }
        Ok(())
    }

    async fn remove_event_trigger_instance(&self, trigger: &EventTriggerInstance) -> Result<bool> {
        let deleted = self
            .persistence
            .delete_event_trigger_instance(trigger.id)
            .await
            .map_err(|e| CoreError::deletion(EVENT_TRIGGER_INSTANCE, trigger.id, e))?;

        if deleted {
            self.publish_delete(EntityType::EventTriggerInstance, trigger.id, trigger);
        }
        Ok(deleted)
    }

    /// Delete every trigger of an event instance (bulk sweep). Returns the
    /// number of rows processed.
    #[instrument(skip(self))]
    pub async fn delete_event_trigger_instances(&self, event_instance_id: i64) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        let deleted = sweep::drain(
            self.settings.sweep_page_size,
            |options| async move {
                persistence
                    .list_event_trigger_instances(event_instance_id, options)
                    .await
                    .map_err(|e| CoreError::deletion(EVENT_TRIGGER_INSTANCE, event_instance_id, e))
            },
            |trigger| async move {
                self.remove_event_trigger_instance(&trigger).await?;
                Ok::<_, CoreError>(())
            },
        )
        .await?;

        debug!(deleted, "Event trigger instances deleted");
        Ok(deleted)
    }

    // ========================================================================
    // Waiting events
    // ========================================================================

    /// Insert a waiting event in the WAITING state.
    ///
    /// The process definition must resolve and contain the catching flow
    /// node, otherwise `NotFound` is returned and nothing is written.
    #[instrument(
        skip(self, waiting),
        fields(waiting_event_id = waiting.id, kind = waiting.kind.as_str())
    )]
    pub async fn create_waiting_event(&self, waiting: &WaitingEvent) -> Result<()> {
        let definition = self
            .definitions
            .get_definition(waiting.process_definition_id)
            .await
            .map_err(|e| CoreError::read("process_definition", e))?
            .ok_or(CoreError::NotFound {
                entity: "process_definition",
                id: waiting.process_definition_id,
            })?;
        if definition.flow_node(waiting.flow_node_definition_id).is_none() {
            return Err(CoreError::NotFound {
                entity: "flow_node_definition",
                id: waiting.flow_node_definition_id,
            });
        }

        let waiting = WaitingEvent {
            progress: WaitingProgress::Waiting,
            ..waiting.clone()
        };
        self.persistence
            .insert_waiting_event(&waiting)
            .await
            .map_err(|e| CoreError::creation(WAITING_EVENT, e))?;

        self.publish_insert(EntityType::WaitingEvent, waiting.id, &waiting);
        Ok(())
    }

    /// Get a waiting event.
    pub async fn get_waiting_event(&self, id: i64) -> Result<WaitingEvent> {
        self.persistence
            .get_waiting_event(id)
            .await
            .map_err(|e| CoreError::read(WAITING_EVENT, e))?
            .ok_or(CoreError::NotFound {
                entity: WAITING_EVENT,
                id,
            })
    }

    /// One page of the waiting events registered by a flow-node instance.
    pub async fn get_waiting_events_of_flow_node(
        &self,
        flow_node_instance_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>> {
        self.persistence
            .list_waiting_events_of_flow_node(flow_node_instance_id, options)
            .await
            .map_err(|e| CoreError::read(WAITING_EVENT, e))
    }

    /// One page of the start-event waiting events of a process definition.
    pub async fn get_start_waiting_events(
        &self,
        process_definition_id: i64,
        options: QueryOptions,
    ) -> Result<Vec<WaitingEvent>> {
        self.persistence
            .list_start_waiting_events(process_definition_id, options)
            .await
            .map_err(|e| CoreError::read(WAITING_EVENT, e))
    }

    /// Every active waiting event for `signal_name`. The caller notifies each.
    #[instrument(skip(self))]
    pub async fn get_waiting_signal_events(&self, signal_name: &str) -> Result<Vec<WaitingEvent>> {
        let persistence = self.persistence.as_ref();
        sweep::collect(self.settings.sweep_page_size, |options| async move {
            persistence
                .list_waiting_signal_events(signal_name, options)
                .await
                .map_err(|e| CoreError::read(WAITING_EVENT, e))
        })
        .await
    }

    /// The boundary error waiting event guarding `activity_instance_id` for
    /// `error_code`. `None` looks up the catch-all handler.
    ///
    /// More than one match is a data-integrity failure and is reported as
    /// `AmbiguousWaitingEvent` instead of picking one.
    #[instrument(skip(self))]
    pub async fn get_boundary_waiting_error_event(
        &self,
        activity_instance_id: i64,
        error_code: Option<&str>,
    ) -> Result<Option<WaitingEvent>> {
        let persistence = self.persistence.as_ref();
        let mut matches = sweep::collect(self.settings.sweep_page_size, |options| async move {
            persistence
                .list_boundary_waiting_error_events(activity_instance_id, error_code, options)
                .await
                .map_err(|e| CoreError::read(WAITING_EVENT, e))
        })
        .await?;

        if matches.len() > 1 {
            return Err(CoreError::AmbiguousWaitingEvent {
                activity_instance_id,
                error_code: error_code.map(str::to_string),
                matches: matches.len(),
            });
        }
        Ok(matches.pop())
    }

    /// Apply `update` to `waiting` and store the result.
    #[instrument(skip(self, waiting, update), fields(waiting_event_id = waiting.id))]
    pub async fn update_waiting_event(
        &self,
        waiting: &WaitingEvent,
        update: &UpdateDescriptor,
    ) -> Result<WaitingEvent> {
        self.apply_update(
            waiting,
            update,
            EntityType::WaitingEvent,
            |p, updated| async move {
                let found = p.update_waiting_event(&updated).await;
                found.map(|found| (found, updated))
            },
        )
        .await
    }

    /// Delete one waiting event.
    #[instrument(skip(self, waiting), fields(waiting_event_id = waiting.id))]
    pub async fn delete_waiting_event(&self, waiting: &WaitingEvent) -> Result<()> {
        if !self.remove_waiting_event(waiting).await? {
            return Err(CoreError::NotFound {
                entity: WAITING_EVENT,
                id: waiting.id,
            });
        }
        Ok(())
    }

    async fn remove_waiting_event(&self, waiting: &WaitingEvent) -> Result<bool> {
        let deleted = self
            .persistence
            .delete_waiting_event(waiting.id)
            .await
            .map_err(|e| CoreError::deletion(WAITING_EVENT, waiting.id, e))?;

        if deleted {
            self.publish_delete(EntityType::WaitingEvent, waiting.id, waiting);
        }
        Ok(deleted)
    }

    /// Delete every waiting event registered by a flow-node instance (bulk
    /// sweep). Returns the number of rows processed.
    #[instrument(skip(self))]
    pub async fn delete_waiting_events(&self, flow_node_instance_id: i64) -> Result<u64> {
        let persistence = self.persistence.as_ref();
        let deleted = sweep::drain(
            self.settings.sweep_page_size,
            |options| async move {
                persistence
                    .list_waiting_events_of_flow_node(flow_node_instance_id, options)
                    .await
                    .map_err(|e| CoreError::deletion(WAITING_EVENT, flow_node_instance_id, e))
            },
            |waiting| async move {
                self.remove_waiting_event(&waiting).await?;
                Ok::<_, CoreError>(())
            },
        )
        .await?;

        debug!(deleted, "Waiting events deleted");
        Ok(deleted)
    }

    /// Claim a waiting event (WAITING to IN_PROGRESS). Returns false when it
    /// was already claimed or no longer exists.
    pub async fn claim_waiting_event(&self, id: i64) -> Result<bool> {
        self.persistence
            .compare_and_set_waiting_progress(
                id,
                WaitingProgress::Waiting,
                WaitingProgress::InProgress,
            )
            .await
            .map_err(|e| CoreError::modification(WAITING_EVENT, id, e))
    }

    /// Revert a claim (IN_PROGRESS to WAITING).
    pub async fn release_waiting_event(&self, id: i64) -> Result<bool> {
        self.persistence
            .compare_and_set_waiting_progress(
                id,
                WaitingProgress::InProgress,
                WaitingProgress::Waiting,
            )
            .await
            .map_err(|e| CoreError::modification(WAITING_EVENT, id, e))
    }

    /// Put every IN_PROGRESS waiting event back to WAITING. Start-up only.
    #[instrument(skip(self))]
    pub async fn reset_in_progress_waiting_events(&self) -> Result<u64> {
        let reset = self
            .persistence
            .reset_in_progress_waiting_events()
            .await
            .map_err(|e| CoreError::modification(WAITING_EVENT, 0, e))?;

        info!(reset, "In-progress waiting events reset");
        Ok(reset)
    }

    // ========================================================================
    // Message instances
    // ========================================================================

    /// Insert a message instance in the TO_PROCESS state.
    #[instrument(
        skip(self, message),
        fields(message_instance_id = message.id, message_name = %message.message_name)
    )]
    pub async fn create_message_instance(&self, message: &MessageInstance) -> Result<()> {
        let message = MessageInstance {
            progress: MessageProgress::ToProcess,
            ..message.clone()
        };
        self.persistence
            .insert_message_instance(&message)
            .await
            .map_err(|e| CoreError::creation(MESSAGE_INSTANCE, e))?;

        self.publish_insert(EntityType::MessageInstance, message.id, &message);
        Ok(())
    }

    /// Get a message instance.
    pub async fn get_message_instance(&self, id: i64) -> Result<MessageInstance> {
        self.persistence
            .get_message_instance(id)
            .await
            .map_err(|e| CoreError::read(MESSAGE_INSTANCE, e))?
            .ok_or(CoreError::NotFound {
                entity: MESSAGE_INSTANCE,
                id,
            })
    }

    /// Apply `update` to `message` and store the result.
    #[instrument(skip(self, message, update), fields(message_instance_id = message.id))]
    pub async fn update_message_instance(
        &self,
        message: &MessageInstance,
        update: &UpdateDescriptor,
    ) -> Result<MessageInstance> {
        self.apply_update(
            message,
            update,
            EntityType::MessageInstance,
            |p, updated| async move {
                let found = p.update_message_instance(&updated).await;
                found.map(|found| (found, updated))
            },
        )
        .await
    }

    /// Delete one message instance.
    #[instrument(skip(self, message), fields(message_instance_id = message.id))]
    pub async fn delete_message_instance(&self, message: &MessageInstance) -> Result<()> {
        let deleted = self
            .persistence
            .delete_message_instance(message.id)
            .await
            .map_err(|e| CoreError::deletion(MESSAGE_INSTANCE, message.id, e))?;

        if !deleted {
            return Err(CoreError::NotFound {
                entity: MESSAGE_INSTANCE,
                id: message.id,
            });
        }
        self.publish_delete(EntityType::MessageInstance, message.id, message);
        Ok(())
    }

    /// Claim a message instance (TO_PROCESS to IN_PROGRESS).
    pub async fn claim_message_instance(&self, id: i64) -> Result<bool> {
        self.persistence
            .compare_and_set_message_progress(
                id,
                MessageProgress::ToProcess,
                MessageProgress::InProgress,
            )
            .await
            .map_err(|e| CoreError::modification(MESSAGE_INSTANCE, id, e))
    }

    /// Revert a claim (IN_PROGRESS to TO_PROCESS).
    pub async fn release_message_instance(&self, id: i64) -> Result<bool> {
        self.persistence
            .compare_and_set_message_progress(
                id,
                MessageProgress::InProgress,
                MessageProgress::ToProcess,
            )
            .await
            .map_err(|e| CoreError::modification(MESSAGE_INSTANCE, id, e))
    }

    /// Put every IN_PROGRESS message instance back to TO_PROCESS. Start-up only.
    #[instrument(skip(self))]
    pub async fn reset_in_progress_message_instances(&self) -> Result<u64> {
        let reset = self
            .persistence
            .reset_in_progress_message_instances()
            .await
            .map_err(|e| CoreError::modification(MESSAGE_INSTANCE, 0, e))?;

        info!(reset, "In-progress message instances reset");
        Ok(reset)
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Matchable (waiting event, message) pairs, skipping `from_index`
    /// couples and returning at most `max_results`.
    ///
    /// Each waiting event and each message appears in at most one couple;
    /// the first pairing in (message id, waiting event id) order wins. The
    /// query is read-only: consumers claim both sides before acting.
    #[instrument(skip(self))]
    pub async fn get_message_event_couples(
        &self,
        from_index: usize,
        max_results: usize,
    ) -> Result<Vec<MessageEventCouple>> {
        let wanted = from_index.saturating_add(max_results);
        let page_size = self.settings.sweep_page_size.max(1);
        let mut raw = Vec::new();
        let mut unique = Vec::new();
        let mut offset = 0i64;

        while unique.len() < wanted {
            let page = self
                .persistence
                .list_message_event_couples(QueryOptions::new(offset, page_size))
                .await
                .map_err(|e| CoreError::read("message_event_couple", e))?;
            let fetched = page.len() as i64;
            offset += fetched;
            raw.extend(page);
            unique = matching::unique_couples(raw.clone());

            if fetched < page_size {
                break;
            }
        }

        let couples: Vec<_> = unique
            .into_iter()
            .skip(from_index)
            .take(max_results)
            .collect();
        debug!(count = couples.len(), "Message event couples found");
        Ok(couples)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn apply_update<'a, T, W, Fut>(
        &'a self,
        record: &T,
        update: &UpdateDescriptor,
        entity: EntityType,
        write: W,
    ) -> Result<T>
    where
        T: Updatable,
        W: FnOnce(&'a dyn Persistence, T) -> Fut,
        Fut: std::future::Future<Output = Result<(bool, T)>>,
    {
        let id = record.id();
        // The caller's record is the pre-update snapshot; apply returns a copy.
        let updated = update.apply(record)?;

        let (found, updated) = write(self.persistence.as_ref(), updated)
            .await
            .map_err(|e| CoreError::modification(T::ENTITY, id, e))?;
        if !found {
            return Err(CoreError::NotFound {
                entity: T::ENTITY,
                id,
            });
        }

        self.publish_update(entity, id, record, &updated);
        Ok(updated)
    }
}
