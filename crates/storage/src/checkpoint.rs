// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background checkpointing with zstd compression and durable fsync.
//!
//! The checkpointer runs I/O off the caller's thread. The key invariant:
//! the snapshot must be durable (including directory fsync) before the WAL
//! is truncated up to the checkpointed sequence.
//!
//! ```text
//! Caller                         Background Thread
//! ───────────────────────────    ─────────────────────────────
//! clone state
//!   │
//!   └─────────────────────────→  serialize + zstd compress
//!                                write to .tmp, fsync .tmp
//!                                rename → snapshot, fsync dir
//!   ←────────────────────────────┘ (completion signal)
//! truncate WAL (safe now)
//! ```
//!
//! [`CheckpointWriter`] abstracts the filesystem calls so tests can inject a
//! fake and verify fsync ordering without touching disk.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use thiserror::Error;

use crate::durable::StorageSnapshotData;
use crate::migration::MigrationRegistry;
use crate::snapshot::{Snapshot, SnapshotError};

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
    #[error("checkpoint failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub seq: u64,
    pub size_bytes: u64,
}

/// Abstracts checkpoint I/O for testability.
pub trait CheckpointWriter: Send + Sync + 'static {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError>;
    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError>;
    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError>;
    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError>;
}

#[derive(Clone)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError> {
        Ok(std::fs::metadata(path)?.len())
    }
}

/// Handle to a background checkpoint. Call [`CheckpointHandle::wait`] before
/// truncating the WAL up to `seq`.
pub struct CheckpointHandle {
    pub seq: u64,
    receiver: mpsc::Receiver<Result<CheckpointResult, CheckpointError>>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl CheckpointHandle {
    pub fn wait(self) -> Result<CheckpointResult, CheckpointError> {
        self.receiver.recv().map_err(|_| CheckpointError::Failed("checkpoint thread panicked".into()))?
    }

    pub fn try_wait(&self) -> Option<Result<CheckpointResult, CheckpointError>> {
        self.receiver.try_recv().ok()
    }
}

/// Manages background snapshot operations for the execution store.
pub struct Checkpointer<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    snapshot_path: PathBuf,
    compression_level: i32,
}

impl Checkpointer<FsCheckpointWriter> {
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self::with_writer(FsCheckpointWriter, snapshot_path)
    }
}

impl<W: CheckpointWriter + Clone> Checkpointer<W> {
    pub fn with_writer(writer: W, snapshot_path: PathBuf) -> Self {
        Self { writer, snapshot_path, compression_level: 3 }
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Clone `state` and spawn a background thread to serialize, compress,
    /// and durably write the snapshot.
    pub fn start(&self, seq: u64, state: &StorageSnapshotData) -> CheckpointHandle {
        let state_clone = state.clone();
        let writer = self.writer.clone();
        let snapshot_path = self.snapshot_path.clone();
        let compression_level = self.compression_level;

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let result = checkpoint_blocking(&writer, seq, &state_clone, &snapshot_path, compression_level);
            let _ = tx.send(result);
        });

        CheckpointHandle { seq, receiver: rx, handle }
    }

    /// Synchronous checkpoint, used on graceful shutdown.
    pub fn checkpoint_sync(
        &self,
        seq: u64,
        state: &StorageSnapshotData,
    ) -> Result<CheckpointResult, CheckpointError> {
        checkpoint_blocking(&self.writer, seq, state, &self.snapshot_path, self.compression_level)
    }
}

fn checkpoint_blocking<W: CheckpointWriter>(
    writer: &W,
    seq: u64,
    state: &StorageSnapshotData,
    snapshot_path: &Path,
    compression_level: i32,
) -> Result<CheckpointResult, CheckpointError> {
    let tmp_path = snapshot_path.with_extension("tmp");

    let snapshot = Snapshot::new(seq, state.clone(), Utc::now());
    let mut json_value = serde_json::to_value(&snapshot)?;
    if let Some(obj) = json_value.as_object_mut() {
        obj.insert("v".into(), CURRENT_SNAPSHOT_VERSION.into());
    }
    let json_bytes = serde_json::to_vec(&json_value)?;

    let compressed =
        zstd::encode_all(json_bytes.as_slice(), compression_level).map_err(|e| CheckpointError::Compress(e.to_string()))?;

    writer.write_tmp(&tmp_path, &compressed)?;
    writer.fsync_file(&tmp_path)?;
    writer.rename(&tmp_path, snapshot_path)?;

    if let Some(parent) = snapshot_path.parent() {
        writer.fsync_dir(parent)?;
    }

    let size_bytes = writer.file_size(snapshot_path).unwrap_or(compressed.len() as u64);
    Ok(CheckpointResult { seq, size_bytes })
}

/// Load a zstd-compressed snapshot, migrating forward if its `"v"` is stale.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot<StorageSnapshotData>>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let decoder =
        zstd::stream::read::Decoder::new(file).map_err(|e| SnapshotError::Io(std::io::Error::other(e.to_string())))?;
    let value: serde_json::Value = serde_json::from_reader(decoder)?;

    let registry = MigrationRegistry::new();
    let migrated = registry
        .migrate_to(value, CURRENT_SNAPSHOT_VERSION)
        .map_err(|e| SnapshotError::Io(std::io::Error::other(e.to_string())))?;
    let snapshot: Snapshot<StorageSnapshotData> = serde_json::from_value(migrated)?;
    Ok(Some(snapshot))
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
