//! # kvlog
//!
//! A minimal networked key-value store with:
//! - A single append-only record log as the only state
//! - Last-write-wins reads computed by scanning the log
//! - Get / Set / List / Remove over a framed TCP protocol (List streams)
//! - Graceful drain on shutdown before the log is released
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │            (one worker thread per connection)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Store Service                             │
//! │        (validation, response shaping, lifecycle)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ read                    │ write
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Scan Engine │          │ Record Log  │
//!   │ (full scan) │─────────▶│  (append)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod recordlog;
pub mod scan;
pub mod service;
pub mod protocol;
pub mod network;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use service::StoreService;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
