// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit of durability the file-backed WAL journals: a storage-layer
//! write, logged before it is reflected in the in-memory stores, so startup
//! can replay it after loading the last snapshot.

use linkflow_core::{ExecutionKey, HistoryEvent, MutableState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageRecord {
    EventsAppended { key: ExecutionKey, events: Vec<HistoryEvent> },
    StateUpdated { key: ExecutionKey, state: MutableState },
}
