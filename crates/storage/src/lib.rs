// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage contracts for the execution core (§4.A, §4.B, §4.C, §4.I):
//! event store, mutable state store, timer store, and visibility store,
//! each with an in-memory implementation plus a file-backed, WAL-durable
//! combination of the first two for single-node deployments.

pub mod checkpoint;
pub mod durable;
pub mod durable_record;
pub mod error;
pub mod event_store;
pub mod migration;
pub mod mutable_state_store;
pub mod snapshot;
pub mod timer_store;
pub mod visibility_store;
pub mod wal;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use checkpoint::{CheckpointError, CheckpointResult, CheckpointWriter, Checkpointer, FsCheckpointWriter};
pub use durable::{FileBackedExecutionStore, StorageSnapshotData};
pub use durable_record::StorageRecord;
pub use error::{StorageError, StorageResult};
pub use event_store::{EventStore, InMemoryEventStore};
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use mutable_state_store::{checksum_of, ChecksumMode, InMemoryMutableStateStore, MutableStateStore};
pub use snapshot::{Snapshot, SnapshotError};
pub use timer_store::{InMemoryTimerStore, TimerStore};
pub use visibility_store::{InMemoryVisibilityStore, VisibilityPage, VisibilityStore};
pub use wal::{Wal, WalEntry, WalError};
