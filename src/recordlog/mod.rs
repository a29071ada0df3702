//! Record Log Module
//!
//! The single source of truth: an append-only text file of `key:value`
//! records.
//!
//! ## Responsibilities
//! - Append records durably (write, flush, fsync) under a single-writer lock
//! - Hand out independent scans bounded by the committed length
//! - Verify the file on open and seal a torn tail left by a crash
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────┐
//! │ key:value\n                     │
//! │ key:value:with:colons\n         │
//! │ other_key:\n                    │
//! │ ...                             │
//! └─────────────────────────────────┘
//! ```
//!
//! The first `:` on a line splits key from value. Keys may repeat; the
//! last occurrence of a key is its effective value.

mod record;
mod file;
mod reader;
mod recovery;

pub use record::{validate_key, Record, DELIMITER};
pub use file::RecordLog;
pub use reader::LogScanner;
pub use recovery::{LogRecovery, RecoveryReport};
