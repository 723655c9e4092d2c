// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL write-ahead log with group commit support.
//!
//! Storage writes ([`StorageRecord`]s) are durably logged before the
//! in-memory stores are updated, enabling crash recovery via snapshot +
//! replay. Group commit batches writes (~10ms) for performance.
//!
//! Each entry is a single line of JSON: `{"seq":N,"record":{...}}\n`

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::durable_record::StorageRecord;

const FLUSH_INTERVAL: Duration = Duration::from_millis(10);
const FLUSH_THRESHOLD: usize = 100;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    record: &'a StorageRecord,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    record: StorageRecord,
}

#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub record: StorageRecord,
}

/// JSONL WAL for durable storage-write logging with group commit.
pub struct Wal {
    file: File,
    read_file: File,
    path: PathBuf,
    write_seq: u64,
    processed_seq: u64,
    write_buffer: Vec<Vec<u8>>,
    last_flush: Instant,
    read_offset: u64,
}

impl Wal {
    /// Open or create a WAL at `path`. `processed_seq` should come from the
    /// last snapshot (or 0 if none).
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).read(true).append(true).open(path)?;

        let (mut write_seq, mut read_offset, corrupt) = Self::scan_wal(&file, processed_seq)?;

        if corrupt {
            let valid_lines = Self::read_valid_lines(&file)?;
            drop(file);

            let bak_path = crate::snapshot::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = valid_lines.len(),
                "corrupt WAL detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;

            {
                let mut new_file = File::create(path)?;
                for line in &valid_lines {
                    new_file.write_all(line.as_bytes())?;
                    new_file.write_all(b"\n")?;
                }
                new_file.sync_all()?;
            }

            file = OpenOptions::new().create(true).read(true).append(true).open(path)?;
            let scan = Self::scan_wal(&file, processed_seq)?;
            write_seq = scan.0;
            read_offset = scan.1;
        }

        let read_file = file.try_clone()?;

        Ok(Self {
            file,
            read_file,
            path: path.to_owned(),
            write_seq,
            processed_seq,
            write_buffer: Vec::new(),
            last_flush: Instant::now(),
            read_offset,
        })
    }

    fn scan_wal(file: &File, processed_seq: u64) -> Result<(u64, u64, bool), WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut max_seq = 0u64;
        let mut read_offset = 0u64;
        let mut current_offset = 0u64;
        let mut corrupt = false;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                current_offset += bytes_read as u64;
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => {
                    corrupt = true;
                    break;
                }
            };

            max_seq = max_seq.max(record.seq);
            if record.seq > processed_seq && read_offset == 0 {
                read_offset = current_offset;
            }
            current_offset += bytes_read as u64;
        }

        if read_offset == 0 {
            read_offset = current_offset;
        }

        Ok((max_seq, read_offset, corrupt))
    }

    fn read_valid_lines(file: &File) -> Result<Vec<String>, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut valid_lines = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let _: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => break,
            };
            valid_lines.push(trimmed.to_string());
        }

        Ok(valid_lines)
    }

    /// Buffer a record for append. Returns the assigned sequence number; not
    /// durable until [`Wal::flush`].
    pub fn append(&mut self, record: &StorageRecord) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let json_bytes = serde_json::to_vec(&WalRecordRef { seq, record })?;
        self.write_buffer.push(json_bytes);
        Ok(seq)
    }

    pub fn needs_flush(&self) -> bool {
        !self.write_buffer.is_empty()
            && (self.last_flush.elapsed() >= FLUSH_INTERVAL || self.write_buffer.len() >= FLUSH_THRESHOLD)
    }

    /// Flush all buffered entries with a single fsync. The durability point.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }
        for mut json_bytes in self.write_buffer.drain(..) {
            json_bytes.push(b'\n');
            self.file.write_all(&json_bytes)?;
        }
        self.file.sync_all()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = seq;
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Iterate all entries after `seq`. Used for recovery replay.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut line = String::new();
        let mut current_offset = 0u64;

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                current_offset += bytes_read as u64;
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    warn!(offset = current_offset, error = %e, "corrupt WAL entry during replay, stopping");
                    break;
                }
            };
            current_offset += bytes_read as u64;

            if record.seq > seq {
                entries.push(WalEntry { seq: record.seq, record: record.record });
            }
        }

        Ok(entries)
    }

    /// Truncate entries at or before `seq`, keeping later entries. Called
    /// after a checkpoint has made the corresponding snapshot durable.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;
        let tmp_path = self.path.with_extension("tmp");

        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut kept_lines: Vec<(u64, String)> = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => break,
            };
            if record.seq >= seq {
                kept_lines.push((record.seq, trimmed.to_string()));
            }
        }

        let new_read_offset;
        {
            let mut tmp_file = File::create(&tmp_path)?;
            let mut current_offset = 0u64;
            let mut found_unprocessed = false;
            let mut first_unprocessed_offset = 0u64;

            for (entry_seq, kept_line) in &kept_lines {
                if *entry_seq > self.processed_seq && !found_unprocessed {
                    first_unprocessed_offset = current_offset;
                    found_unprocessed = true;
                }
                tmp_file.write_all(kept_line.as_bytes())?;
                tmp_file.write_all(b"\n")?;
                current_offset += kept_line.len() as u64 + 1;
            }

            new_read_offset = if found_unprocessed { first_unprocessed_offset } else { current_offset };
            tmp_file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new().create(true).read(true).append(true).open(&self.path)?;
        self.read_file = self.file.try_clone()?;
        self.read_offset = new_read_offset;

        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
