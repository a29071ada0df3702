//! Scan Engine
//!
//! Answers reads by scanning the record log from the start. No index is
//! kept, so every read costs one pass over the log.

use crate::error::Result;
use crate::recordlog::{LogScanner, RecordLog};

/// Result of a point lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Effective value of the key
    Found(String),

    /// No record carries the queried key
    NotFound(String),
}

/// Read-side view over a record log
pub struct ScanEngine<'a> {
    log: &'a RecordLog,
}

impl<'a> ScanEngine<'a> {
    pub fn new(log: &'a RecordLog) -> Self {
        Self { log }
    }

    /// Effective value of `key`: the last record whose key matches
    /// case-insensitively (last write wins)
    pub fn get(&self, key: &str) -> Result<Lookup> {
        let mut latest = None;
        for record in self.log.scan()? {
            let record = record?;
            if record.key_matches(key) {
                latest = Some(record.value);
            }
        }

        Ok(match latest {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound(key.to_string()),
        })
    }

    /// Every record in log order, duplicates included
    pub fn list(&self) -> Result<LogScanner> {
        self.log.scan()
    }
}
