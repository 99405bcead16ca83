// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Field-level update descriptors.
//!
//! A descriptor is a set of field to JSON value pairs applied to the serde
//! representation of a record. Applying never touches the input: it returns
//! a new record, so the pre-update snapshot stays valid for notifications.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::model::{EventTriggerInstance, MessageInstance, WaitingEvent};

/// Records that can be modified through an [`UpdateDescriptor`].
pub trait Updatable: Serialize + DeserializeOwned + Clone {
    /// Entity name used in errors.
    const ENTITY: &'static str;

    /// Fields a descriptor may not name.
    const IMMUTABLE: &'static [&'static str];

    /// Row id.
    fn id(&self) -> i64;
}

impl Updatable for WaitingEvent {
    const ENTITY: &'static str = "waiting_event";
    const IMMUTABLE: &'static [&'static str] = &["id", "kind"];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Updatable for MessageInstance {
    const ENTITY: &'static str = "message_instance";
    const IMMUTABLE: &'static [&'static str] = &["id"];

    fn id(&self) -> i64 {
        self.id
    }
}

impl Updatable for EventTriggerInstance {
    const ENTITY: &'static str = "event_trigger_instance";
    const IMMUTABLE: &'static [&'static str] = &["id", "trigger"];

    fn id(&self) -> i64 {
        self.id
    }
}

/// Set of field to value pairs to apply to a record.
///
/// # Example
///
/// ```ignore
/// let update = UpdateDescriptor::new()
///     .set("active", false)
///     .set("process_name", "Billing");
/// events.update_waiting_event(&waiting, &update).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateDescriptor {
    fields: BTreeMap<String, Value>,
}

impl UpdateDescriptor {
    /// Empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Later values for the same field replace earlier ones.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Fields named by this descriptor.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the descriptor names no field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply to `record`, returning the updated copy.
    pub fn apply<T: Updatable>(&self, record: &T) -> Result<T> {
        let invalid = |field: &str, reason: String| CoreError::InvalidUpdate {
            entity: T::ENTITY,
            field: field.to_string(),
            reason,
        };

        let mut object = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            _ => return Err(invalid("*", "record is not a JSON object".to_string())),
        };

        for (field, value) in &self.fields {
            if T::IMMUTABLE.contains(&field.as_str()) {
                return Err(invalid(field, "field is immutable".to_string()));
            }
            match object.get_mut(field) {
                Some(slot) => *slot = value.clone(),
                None => return Err(invalid(field, "unknown field".to_string())),
            }
        }

        serde_json::from_value(Value::Object(object)).map_err(|e| {
            let fields: Vec<&str> = self.fields.keys().map(String::as_str).collect();
            invalid(&fields.join(","), e.to_string())
        })
    }
}
