// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! procflow-core - Event Correlation and Archiving
//!
//! This crate provides the part of a BPMN process engine that pairs incoming
//! messages with the catch events waiting for them, and moves finished
//! process and flow-node instances into archive tables. All state lives in
//! SQLite; the services hold nothing between calls.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Engine workers                            │
//! │   (execute flow nodes, send messages, complete processes)    │
//! └──────────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌───────────────────────┐          ┌───────────────────────────┐
//! │     EventService      │◄─────────│         Archiver          │
//! │ waiting events,       │  delete  │ snapshot + delete live    │
//! │ messages, couples     │  waiting │ rows of finished work     │
//! └───────────────────────┘  events  └───────────────────────────┘
//!            │                                   │
//!            └─────────────────┬─────────────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │  Persistence (SQLite) │
//!                  └───────────────────────┘
//! ```
//!
//! # Message Correlation
//!
//! A message couples with a waiting event when:
//!
//! | Rule | Description |
//! |------|-------------|
//! | Kind | The waiting event is a message waiting event and is active |
//! | Progress | Neither side is claimed |
//! | Name | Message name equals the waiting event's message name |
//! | Process | A waiting event bound to a process only accepts that process |
//! | Flow node | A message targeting a flow node only reaches that node |
//! | Correlation | Every key the waiting event sets is equal on the message |
//!
//! Couples are unique: one waiting event and one message appear in at most
//! one returned pair, first pairing by message id then waiting event id wins.
//! A worker consumes a couple by claiming both sides with a conditional
//! update; losing either claim means another worker took it.
//!
//! # Claim State Machine
//!
//! ```text
//!   WAITING / TO_PROCESS ──claim──► IN_PROGRESS ──consume──► (deleted)
//!            ▲                           │
//!            └─────release / reset───────┘
//! ```
//!
//! Resets run once, at [`runtime::EngineRuntime`] start, before any matching.
//!
//! # Archiving
//!
//! | Entity | Archived | Deleted after archive |
//! |--------|----------|-----------------------|
//! | Process instance | yes | yes |
//! | Comments, document mappings | yes | yes |
//! | Connector instances | when declared | yes |
//! | Ref business data, contract data | yes | yes |
//! | Activity / gateway nodes | yes | yes |
//! | Event nodes | no | yes, with waiting events and triggers |
//! | Activity data instances | no | yes |
//!
//! # Configuration
//!
//! The recovery binary loads configuration from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PROCFLOW_DATABASE_URL` | Yes | - | SQLite connection string |
//! | `PROCFLOW_MAX_CONNECTIONS` | No | `5` | Pool size |
//! | `PROCFLOW_SWEEP_PAGE_SIZE` | No | `100` | Rows per bulk sweep page |
//! | `PROCFLOW_COUPLE_BATCH_SIZE` | No | `100` | Couples reported after recovery |
//!
//! # Modules
//!
//! - [`archive`]: Process and flow-node archiving
//! - [`config`]: Configuration from environment variables
//! - [`definition`]: Process definition lookup and cache
//! - [`error`]: Error types with stable error codes
//! - [`events`]: Correlation engine over waiting events and messages
//! - [`notifier`]: Change notifications for interested handlers
//! - [`persistence`]: Persistence trait and SQLite backend
//! - [`runtime`]: Runtime wiring and start-up recovery

#![deny(missing_docs)]

/// Process and flow-node archiving.
pub mod archive;

/// Configuration loaded from environment variables.
pub mod config;

/// Process definition lookup with freshness-checked caching.
pub mod definition;

/// Error types with stable error codes.
pub mod error;

/// Correlation engine: waiting events, message instances and couples.
pub mod events;

/// Embedded database migrations.
pub mod migrations;

/// Persisted record types.
pub mod model;

/// Change notifications.
pub mod notifier;

/// Persistence trait and backends.
pub mod persistence;

/// Runtime wiring and start-up recovery.
pub mod runtime;

mod sweep;

pub use archive::Archiver;
pub use error::{CoreError, Result};
pub use events::{EventService, UpdateDescriptor};
pub use persistence::{Persistence, QueryOptions, SqlitePersistence};
pub use runtime::{EngineRuntime, EngineRuntimeBuilder};
