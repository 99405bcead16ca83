// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Change notifications for tracked entity types.
//!
//! The core publishes insert/update/delete events so outside caches and
//! listeners can react; it never consumes them itself. Snapshots are built
//! only when [`ChangeNotifier::has_handlers`] reports a listener.

use std::collections::HashSet;
use std::sync::RwLock;

use serde::Serialize;
use tokio::sync::broadcast;

/// Entity types that publish change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Event instance.
    EventInstance,
    /// Event trigger instance.
    EventTriggerInstance,
    /// Waiting event.
    WaitingEvent,
    /// Message instance.
    MessageInstance,
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Row inserted.
    Insert,
    /// Row updated.
    Update,
    /// Row deleted.
    Delete,
}

/// A published change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    /// Entity type.
    pub entity: EntityType,
    /// Action.
    pub action: ChangeAction,
    /// Id of the changed row.
    pub id: i64,
    /// State before the change (updates and deletes).
    pub old: Option<serde_json::Value>,
    /// State after the change (inserts and updates).
    pub new: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// Insert event carrying the new row.
    pub fn insert(entity: EntityType, id: i64, new: serde_json::Value) -> Self {
        Self {
            entity,
            action: ChangeAction::Insert,
            id,
            old: None,
            new: Some(new),
        }
    }

    /// Update event carrying both snapshots.
    pub fn update(
        entity: EntityType,
        id: i64,
        old: serde_json::Value,
        new: serde_json::Value,
    ) -> Self {
        Self {
            entity,
            action: ChangeAction::Update,
            id,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Delete event carrying the removed row.
    pub fn delete(entity: EntityType, id: i64, old: serde_json::Value) -> Self {
        Self {
            entity,
            action: ChangeAction::Delete,
            id,
            old: Some(old),
            new: None,
        }
    }
}

/// Publish/subscribe hook for entity changes.
pub trait ChangeNotifier: Send + Sync {
    /// Whether any listener is registered for this entity type and action.
    fn has_handlers(&self, entity: EntityType, action: ChangeAction) -> bool;

    /// Publish a change. Delivery failures are the notifier's concern.
    fn publish(&self, event: ChangeEvent);
}

/// Notifier with no listeners.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn has_handlers(&self, _entity: EntityType, _action: ChangeAction) -> bool {
        false
    }

    fn publish(&self, _event: ChangeEvent) {}
}

/// Notifier fanning events out over a tokio broadcast channel.
///
/// Listeners declare which (entity, action) pairs they care about with
/// [`BroadcastNotifier::subscribe`]; only those pairs report handlers.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChangeEvent>,
    interests: RwLock<HashSet<(EntityType, ChangeAction)>>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            interests: RwLock::new(HashSet::new()),
        }
    }

    /// Register interest in the given pairs and return a receiver.
    pub fn subscribe(
        &self,
        pairs: impl IntoIterator<Item = (EntityType, ChangeAction)>,
    ) -> broadcast::Receiver<ChangeEvent> {
        let mut interests = self
            .interests
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        interests.extend(pairs);
        self.sender.subscribe()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn has_handlers(&self, entity: EntityType, action: ChangeAction) -> bool {
        self.interests
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&(entity, action))
    }

    fn publish(&self, event: ChangeEvent) {
        // No receivers left is not an error for the publisher.
        let _ = self.sender.send(event);
    }
}
