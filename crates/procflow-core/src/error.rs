// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for procflow-core.
//!
//! Storage failures surface from the persistence layer as
//! [`CoreError::Database`]; the services wrap them into the operation-tagged
//! variants so callers can tell a failed insert from a failed delete.

use thiserror::Error;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors returned by the correlation engine and the archiver.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Inserting a record failed (constraint violation or storage failure).
    #[error("Failed to create {entity}: {details}")]
    Creation {
        /// Entity type that could not be created.
        entity: &'static str,
        /// Error details.
        details: String,
    },

    /// Reading records failed.
    #[error("Failed to read {entity}: {details}")]
    Read {
        /// Entity type being read.
        entity: &'static str,
        /// Error details.
        details: String,
    },

    /// Updating a record failed.
    #[error("Failed to modify {entity} {id}: {details}")]
    Modification {
        /// Entity type being modified.
        entity: &'static str,
        /// Id of the record, or 0 for bulk updates.
        id: i64,
        /// Error details.
        details: String,
    },

    /// Deleting a record failed.
    #[error("Failed to delete {entity} {id}: {details}")]
    Deletion {
        /// Entity type being deleted.
        entity: &'static str,
        /// Id of the record or of the container being swept.
        id: i64,
        /// Error details.
        details: String,
    },

    /// Archiving a process or flow-node instance failed. The live instance
    /// was left in place.
    #[error("Failed to archive {entity} {id}: {reason}")]
    Archiving {
        /// Entity type being archived.
        entity: &'static str,
        /// Id of the instance being archived.
        id: i64,
        /// Why archiving was aborted.
        reason: String,
    },

    /// More than one boundary error waiting event matched an
    /// (activity, error code) pair.
    #[error(
        "{matches} boundary error waiting events match activity {activity_instance_id} and error code {}",
        error_code.as_deref().unwrap_or("<catch-all>")
    )]
    AmbiguousWaitingEvent {
        /// Activity instance the boundary events are attached to.
        activity_instance_id: i64,
        /// Error code that was looked up.
        error_code: Option<String>,
        /// Number of rows that matched.
        matches: usize,
    },

    /// Record was not found.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity type.
        entity: &'static str,
        /// The id that was not found.
        id: i64,
    },

    /// An update descriptor could not be applied.
    #[error("Invalid update of {entity}.{field}: {reason}")]
    InvalidUpdate {
        /// Entity type being updated.
        entity: &'static str,
        /// Field named by the descriptor.
        field: String,
        /// Why the field was rejected.
        reason: String,
    },

    /// Raw storage failure from the persistence layer.
    #[error("Database error during '{operation}': {details}")]
    Database {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl CoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Creation { .. } => "CREATION_ERROR",
            Self::Read { .. } => "READ_ERROR",
            Self::Modification { .. } => "MODIFICATION_ERROR",
            Self::Deletion { .. } => "DELETION_ERROR",
            Self::Archiving { .. } => "ARCHIVING_ERROR",
            Self::AmbiguousWaitingEvent { .. } => "AMBIGUOUS_WAITING_EVENT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidUpdate { .. } => "INVALID_UPDATE",
            Self::Database { .. } => "DATABASE_ERROR",
        }
    }

    /// Wrap a storage failure raised while inserting `entity`.
    pub fn creation(entity: &'static str, err: CoreError) -> Self {
        Self::Creation {
            entity,
            details: err.to_string(),
        }
    }

    /// Wrap a storage failure raised while reading `entity`.
    pub fn read(entity: &'static str, err: CoreError) -> Self {
        match err {
            // Integrity errors are already specific; keep them as they are.
            err @ (Self::AmbiguousWaitingEvent { .. } | Self::NotFound { .. }) => err,
            err => Self::Read {
                entity,
                details: err.to_string(),
            },
        }
    }

    /// Wrap a storage failure raised while modifying `entity` `id`.
    pub fn modification(entity: &'static str, id: i64, err: CoreError) -> Self {
        match err {
            err @ Self::InvalidUpdate { .. } => err,
            err => Self::Modification {
                entity,
                id,
                details: err.to_string(),
            },
        }
    }

    /// Wrap a storage failure raised while deleting `entity` `id`.
    pub fn deletion(entity: &'static str, id: i64, err: CoreError) -> Self {
        Self::Deletion {
            entity,
            id,
            details: err.to_string(),
        }
    }

    /// Wrap any failure raised during an archival step of `entity` `id`.
    pub fn archiving(entity: &'static str, id: i64, err: impl std::fmt::Display) -> Self {
        Self::Archiving {
            entity,
            id,
            reason: err.to_string(),
        }
    }

    /// Whether this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Database {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_error() -> CoreError {
        CoreError::Database {
            operation: "insert".to_string(),
            details: "UNIQUE constraint failed".to_string(),
        }
    }

    #[test]
    fn test_error_codes() {
        let test_cases = vec![
            (CoreError::creation("waiting_event", db_error()), "CREATION_ERROR"),
            (CoreError::read("message_instance", db_error()), "READ_ERROR"),
            (
                CoreError::modification("event_trigger_instance", 4, db_error()),
                "MODIFICATION_ERROR",
            ),
            (CoreError::deletion("waiting_event", 9, db_error()), "DELETION_ERROR"),
            (
                CoreError::archiving("process_instance", 1, "boom"),
                "ARCHIVING_ERROR",
            ),
            (
                CoreError::AmbiguousWaitingEvent {
                    activity_instance_id: 3,
                    error_code: Some("E1".to_string()),
                    matches: 2,
                },
                "AMBIGUOUS_WAITING_EVENT",
            ),
            (
                CoreError::NotFound {
                    entity: "message_instance",
                    id: 5,
                },
                "NOT_FOUND",
            ),
            (
                CoreError::InvalidUpdate {
                    entity: "waiting_event",
                    field: "id".to_string(),
                    reason: "immutable".to_string(),
                },
                "INVALID_UPDATE",
            ),
            (db_error(), "DATABASE_ERROR"),
        ];

        for (error, expected_code) in test_cases {
            assert_eq!(
                error.error_code(),
                expected_code,
                "Error {:?} should have code {}",
                error,
                expected_code
            );
            assert!(!error.to_string().is_empty(), "Message should not be empty");
        }
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::creation("waiting_event", db_error());
        assert_eq!(
            err.to_string(),
            "Failed to create waiting_event: Database error during 'insert': UNIQUE constraint failed"
        );

        let err = CoreError::NotFound {
            entity: "event_instance",
            id: 42,
        };
        assert_eq!(err.to_string(), "event_instance 42 not found");

        let err = CoreError::AmbiguousWaitingEvent {
            activity_instance_id: 7,
            error_code: None,
            matches: 3,
        };
        assert_eq!(
            err.to_string(),
            "3 boundary error waiting events match activity 7 and error code <catch-all>"
        );
    }

    #[test]
    fn test_read_keeps_integrity_errors() {
        let ambiguous = CoreError::AmbiguousWaitingEvent {
            activity_instance_id: 1,
            error_code: Some("E".to_string()),
            matches: 2,
        };
        let wrapped = CoreError::read("waiting_event", ambiguous);
        assert_eq!(wrapped.error_code(), "AMBIGUOUS_WAITING_EVENT");

        let not_found = CoreError::NotFound {
            entity: "waiting_event",
            id: 1,
        };
        assert!(CoreError::read("waiting_event", not_found).is_not_found());
    }

    #[test]
    fn test_modification_keeps_invalid_update() {
        let invalid = CoreError::InvalidUpdate {
            entity: "message_instance",
            field: "nope".to_string(),
            reason: "unknown field".to_string(),
        };
        let wrapped = CoreError::modification("message_instance", 1, invalid);
        assert_eq!(wrapped.error_code(), "INVALID_UPDATE");
    }
}
