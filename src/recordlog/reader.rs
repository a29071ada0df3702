//! Log Scanner
//!
//! Reads records from the start of the log up to a fixed byte limit.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Take};

use crate::error::Result;
use super::Record;

/// Iterator over the records of one scan
///
/// Owns its own file handle, so scans never disturb the append cursor or
/// each other. Malformed lines are skipped and counted.
pub struct LogScanner {
    reader: BufReader<Take<File>>,
    line: Vec<u8>,
    line_no: u64,
    skipped: u64,
    done: bool,
}

impl LogScanner {
    /// Scan `file` from its current position, reading at most `limit` bytes
    pub fn new(file: File, limit: u64) -> Self {
        Self {
            reader: BufReader::new(file.take(limit)),
            line: Vec::new(),
            line_no: 0,
            skipped: 0,
            done: false,
        }
    }

    /// Number of malformed lines skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Read the next well-formed record
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.line.clear();
            let n = self.reader.read_until(b'\n', &mut self.line)?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let parsed = std::str::from_utf8(&self.line)
                .ok()
                .and_then(Record::parse);
            match parsed {
                Some(record) => return Ok(Some(record)),
                None => {
                    // Blank lines carry no record and are not counted as corruption
                    if self.line.iter().all(|b| *b == b'\n' || *b == b'\r') {
                        continue;
                    }
                    self.skipped += 1;
                    tracing::debug!("Skipping malformed record at line {}", self.line_no);
                }
            }
        }
    }
}

impl Iterator for LogScanner {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
