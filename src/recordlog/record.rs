//! Record definitions
//!
//! A record is one `key:value` line of the log.

use crate::error::{KvError, Result};

/// Separator between key and value on a log line
pub const DELIMITER: char = ':';

/// A single key-value pair as stored in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Check that the record survives a round trip through the line format
    ///
    /// Rejects:
    /// - empty keys
    /// - keys containing the delimiter (the first `:` must end the key)
    /// - line breaks anywhere (one record per line)
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key)?;
        if self.key.contains(DELIMITER) {
            return Err(KvError::InvalidArgument(format!(
                "key must not contain '{}'",
                DELIMITER
            )));
        }
        if self.value.contains(['\n', '\r']) {
            return Err(KvError::InvalidArgument(
                "value must not contain line breaks".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize to a log line, including the trailing newline
    pub fn encode(&self) -> String {
        let mut line = String::with_capacity(self.encoded_len());
        line.push_str(&self.key);
        line.push(DELIMITER);
        line.push_str(&self.value);
        line.push('\n');
        line
    }

    /// Length in bytes of the encoded line
    pub fn encoded_len(&self) -> usize {
        self.key.len() + self.value.len() + 2
    }

    /// Parse a log line (with or without its trailing newline)
    ///
    /// Returns `None` when the line carries no delimiter.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let (key, value) = line.split_once(DELIMITER)?;
        Some(Self::new(key, value))
    }

    /// Case-insensitive key comparison used by point lookups
    pub fn key_matches(&self, key: &str) -> bool {
        self.key
            .chars()
            .flat_map(char::to_lowercase)
            .eq(key.chars().flat_map(char::to_lowercase))
    }
}

/// Keys used for lookups must be non-empty
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidArgument("key must not be empty".to_string()));
    }
    if key.contains(['\n', '\r']) {
        return Err(KvError::InvalidArgument(
            "key must not contain line breaks".to_string(),
        ));
    }
    Ok(())
}
