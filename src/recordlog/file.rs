//! Record Log file
//!
//! Owns the append handle and hands out bounded scans.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{KvError, Result};
use super::{LogRecovery, LogScanner, Record, RecoveryReport};

/// Append-only, file-backed record log
///
/// ## Concurrency:
/// - Appends are serialized by `writer` (single writer)
/// - Scans open their own read handle and stop at the committed length
///   observed when they started, so they never see a half-written line
/// - All methods use `&self`
pub struct RecordLog {
    /// Path of the log file (scans re-open it)
    path: PathBuf,

    /// Append handle; `None` once the log is closed
    writer: Mutex<Option<File>>,

    /// Bytes covered by fully appended and synced records
    committed_len: AtomicU64,

    closed: AtomicBool,

    /// What the startup verification found
    recovery: RecoveryReport,
}

impl RecordLog {
    /// Open or create the log at `path`
    ///
    /// On startup:
    /// 1. Open in append + create + read-write mode
    /// 2. Verify existing records and seal a torn tail
    /// 3. Ready to append and scan
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let recovery = LogRecovery::recover(path, &mut file)?;

        if recovery.malformed > 0 || recovery.sealed {
            tracing::warn!(
                "Record log recovery: {} records, {} malformed, torn tail sealed: {}",
                recovery.records,
                recovery.malformed,
                recovery.sealed
            );
        } else {
            tracing::debug!("Record log opened with {} records", recovery.records);
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(Some(file)),
            committed_len: AtomicU64::new(recovery.len),
            closed: AtomicBool::new(false),
            recovery,
        })
    }

    /// Append a record at the end of the log
    ///
    /// Writes `key:value\n` through a buffer, flushes and fsyncs before
    /// returning. Returns the number of bytes in the encoded line.
    ///
    /// Durability is best effort: a crash mid-write can leave a fragment,
    /// which the next open seals. A failed append is rolled back to the
    /// committed length and never made visible to scans. If the rollback
    /// itself fails, every later append retries it and fails until it
    /// succeeds.
    pub fn append(&self, record: &Record) -> Result<usize> {
        let line = record.encode();

        let mut guard = self.writer.lock();
        let file = guard.as_mut().ok_or(KvError::Closed)?;
        let committed = self.committed_len.load(Ordering::Acquire);

        if file.metadata()?.len() > committed {
            Self::rollback(file, committed)?;
        }

        if let Err(e) = Self::write_line(file, line.as_bytes()) {
            if let Err(rollback_err) = Self::rollback(file, committed) {
                tracing::error!(
                    "Failed to roll back append to {}: {}",
                    self.path.display(),
                    rollback_err
                );
            }
            return Err(e);
        }

        self.committed_len
            .fetch_add(line.len() as u64, Ordering::Release);

        Ok(line.len())
    }

    /// Start a scan from the beginning of the log
    ///
    /// The scan sees every record committed before this call and nothing
    /// appended afterwards.
    pub fn scan(&self) -> Result<LogScanner> {
        if self.closed.load(Ordering::Acquire) {
            return Err(KvError::Closed);
        }
        let limit = self.committed_len.load(Ordering::Acquire);
        tracing::debug!("Creating reader for log file: {}", self.path.display());
        let file = File::open(&self.path)?;
        Ok(LogScanner::new(file, limit))
    }

    /// Sync and release the append handle
    ///
    /// Later appends and scans fail with `KvError::Closed`. Closing twice
    /// is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.writer.lock();
        self.closed.store(true, Ordering::Release);
        if let Some(file) = guard.take() {
            file.sync_all()?;
            tracing::debug!("Record log closed: {}", self.path.display());
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes covered by committed records
    pub fn committed_len(&self) -> u64 {
        self.committed_len.load(Ordering::Acquire)
    }

    /// Report produced by the startup verification
    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    fn write_line(file: &File, line: &[u8]) -> Result<()> {
        let mut writer = BufWriter::new(file);
        writer.write_all(line)?;
        writer.flush()?;
        drop(writer);
        file.sync_all()?;
        Ok(())
    }

    /// Drop bytes past the committed length (called with the writer lock
    /// held). Committed records are never touched.
    fn rollback(file: &File, committed: u64) -> Result<()> {
        file.set_len(committed)?;
        file.sync_all()?;
        tracing::warn!("Discarded uncommitted bytes past offset {}", committed);
        Ok(())
    }
}
