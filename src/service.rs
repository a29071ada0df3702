//! Store Service
//!
//! The protocol-facing facade over the record log.
//!
//! ## Responsibilities
//! - Validate requests before they touch the log
//! - Route reads to the scan engine and writes to the log
//! - Shape outcomes into `Response` values
//! - Track the Running → ShuttingDown lifecycle and release the log

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::config::Config;
use crate::error::Result;
use crate::protocol::Response;
use crate::recordlog::{validate_key, LogScanner, Record, RecordLog};
use crate::scan::{Lookup, ScanEngine};

/// Service lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    Running = 0,
    ShuttingDown = 1,
}

/// Key-value store service
///
/// Exclusively owns the record log for its lifetime. Shared between
/// connection workers behind an `Arc`.
pub struct StoreService {
    log: RecordLog,
    state: AtomicU8,
}

impl StoreService {
    /// Open the service on the configured record log
    ///
    /// Any failure here is fatal: there is no partially initialized service.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::open_path(&config.db_file)
    }

    /// Open the service directly on a log file path
    pub fn open_path(path: &Path) -> Result<Self> {
        tracing::info!("Initialising from DB file: {}", path.display());
        let log = RecordLog::open(path)?;
        Ok(Self {
            log,
            state: AtomicU8::new(Lifecycle::Running as u8),
        })
    }

    /// Look up the effective value of `key`
    ///
    /// A missing key is a normal `Response::Error`, not a failure.
    pub fn get(&self, key: &str) -> Result<Response> {
        tracing::info!("Executing Get command");
        validate_key(key)?;

        let response = match ScanEngine::new(&self.log).get(key)? {
            Lookup::Found(value) => Response::Value(value),
            Lookup::NotFound(key) => Response::not_found(&key),
        };
        Ok(response)
    }

    /// Append `key:value` to the log
    ///
    /// Returns the number of bytes written in the `Value` arm. Validation
    /// and I/O failures come back as `Err`.
    pub fn set(&self, key: &str, value: &str) -> Result<Response> {
        tracing::info!("Executing Set command");
        let record = Record::new(key, value);
        record.validate()?;

        let written = self.log.append(&record).map_err(|e| {
            tracing::error!("Failed to append record for key {}: {}", key, e);
            e
        })?;

        Ok(Response::Value(format!("Number of bytes written: {}", written)))
    }

    /// Every record in log order, duplicates included
    pub fn list(&self) -> Result<LogScanner> {
        tracing::info!("Executing List command");
        ScanEngine::new(&self.log).list()
    }

    /// Removal is not supported; the log is never touched
    pub fn remove(&self, _key: &str) -> Response {
        tracing::info!("Executing Remove command");
        Response::unsupported("Remove")
    }

    /// Move to ShuttingDown. Requests already running still complete.
    pub fn begin_shutdown(&self) {
        let previous = self
            .state
            .swap(Lifecycle::ShuttingDown as u8, Ordering::AcqRel);
        if previous == Lifecycle::Running as u8 {
            tracing::info!("Shutting down");
        }
    }

    /// Release the record log. Operations afterwards fail with `KvError::Closed`.
    pub fn close(&self) -> Result<()> {
        self.begin_shutdown();
        self.log.close()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.state.load(Ordering::Acquire) == Lifecycle::Running as u8 {
            Lifecycle::Running
        } else {
            Lifecycle::ShuttingDown
        }
    }

    /// Get the underlying record log
    pub fn log(&self) -> &RecordLog {
        &self.log
    }
}
