//! Tests for RecordLog
//!
//! These tests verify:
//! - File creation and append-only growth
//! - Bytes written per append
//! - Scan order and snapshot bounds
//! - Persistence across reopen
//! - Bytes left by a failed append are discarded, never committed
//! - Closed-log behavior
//! - Concurrent appends never tear lines

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use kvlog::recordlog::{Record, RecordLog};
use kvlog::scan::{Lookup, ScanEngine};
use kvlog::KvError;
use parking_lot::Mutex;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("data.db");
    (temp_dir, log_path)
}

fn scan_all(log: &RecordLog) -> Vec<Record> {
    log.scan().unwrap().map(|r| r.unwrap()).collect()
}

/// Leave bytes past the committed length, as an append that failed
/// part-way through does
fn leave_fragment(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

/// Log output captured by a test subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, path) = setup_temp_log();
    assert!(!path.exists());

    let log = RecordLog::open(&path).unwrap();

    assert!(path.exists());
    assert_eq!(log.committed_len(), 0);
    assert_eq!(log.path(), path.as_path());
    assert!(scan_all(&log).is_empty());
}

#[test]
fn test_open_missing_directory_fails() {
    let (temp, _) = setup_temp_log();
    let path = temp.path().join("missing").join("data.db");

    let result = RecordLog::open(&path);
    assert!(matches!(result, Err(KvError::Io(_))));
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_returns_bytes_written() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();

    let written = log.append(&Record::new("x", "1")).unwrap();

    assert_eq!(written, 4); // "x:1\n"
    assert_eq!(log.committed_len(), 4);
    assert_eq!(fs::read_to_string(&path).unwrap(), "x:1\n");
}

#[test]
fn test_append_only_growth() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();

    log.append(&Record::new("a", "1")).unwrap();
    let before = fs::read(&path).unwrap();

    log.append(&Record::new("a", "2")).unwrap();
    let after = fs::read(&path).unwrap();

    assert!(after.starts_with(&before));
    assert_eq!(&after[before.len()..], b"a:2\n");
}

#[test]
fn test_scan_returns_records_in_order() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();

    for i in 0..10 {
        log.append(&Record::new(format!("k{}", i), format!("v{}", i)))
            .unwrap();
    }

    let records = scan_all(&log);
    assert_eq!(records.len(), 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.key, format!("k{}", i));
        assert_eq!(record.value, format!("v{}", i));
    }
}

#[test]
fn test_scan_is_a_snapshot() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();
    log.append(&Record::new("before", "1")).unwrap();

    let scanner = log.scan().unwrap();
    log.append(&Record::new("after", "2")).unwrap();

    let keys: Vec<String> = scanner.map(|r| r.unwrap().key).collect();
    assert_eq!(keys, vec!["before".to_string()]);

    // A fresh scan sees both
    assert_eq!(scan_all(&log).len(), 2);
}

#[test]
fn test_independent_scans() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();
    log.append(&Record::new("a", "1")).unwrap();
    log.append(&Record::new("b", "2")).unwrap();

    let mut first = log.scan().unwrap();
    let mut second = log.scan().unwrap();

    assert_eq!(first.next().unwrap().unwrap().key, "a");
    assert_eq!(second.next().unwrap().unwrap().key, "a");
    assert_eq!(first.next().unwrap().unwrap().key, "b");
    assert!(first.next().is_none());
    assert_eq!(second.next().unwrap().unwrap().key, "b");
}

// =============================================================================
// Failed Append Tests
// =============================================================================

#[test]
fn test_fragment_is_discarded_by_next_append() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();
    log.append(&Record::new("a", "1")).unwrap();

    leave_fragment(&path, b"k:correct-value-");

    log.append(&Record::new("z", "1")).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a:1\nz:1\n");
    assert_eq!(log.committed_len(), 8);
    assert_eq!(
        scan_all(&log),
        vec![Record::new("a", "1"), Record::new("z", "1")]
    );
}

#[test]
fn test_fragment_never_shadows_previous_value() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();
    log.append(&Record::new("k", "old")).unwrap();

    leave_fragment(&path, b"k:trunc");

    // Not visible before the next append either
    let engine = ScanEngine::new(&log);
    assert_eq!(engine.get("k").unwrap(), Lookup::Found("old".to_string()));

    log.append(&Record::new("other", "x")).unwrap();
    assert_eq!(engine.get("k").unwrap(), Lookup::Found("old".to_string()));
    assert_eq!(
        engine.get("missing").unwrap(),
        Lookup::NotFound("missing".to_string())
    );

    // And gone for good after a restart
    log.close().unwrap();
    let log = RecordLog::open(&path).unwrap();
    assert_eq!(log.recovery().records, 2);
    assert!(!log.recovery().torn_tail);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_preserves_records() {
    let (_temp, path) = setup_temp_log();
    {
        let log = RecordLog::open(&path).unwrap();
        log.append(&Record::new("a", "1")).unwrap();
        log.append(&Record::new("b", "2")).unwrap();
        log.close().unwrap();
    }

    let log = RecordLog::open(&path).unwrap();
    assert_eq!(log.recovery().records, 2);
    assert_eq!(log.committed_len(), 8);

    log.append(&Record::new("c", "3")).unwrap();
    let keys: Vec<String> = scan_all(&log).into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_scan_skips_malformed_lines() {
    let (_temp, path) = setup_temp_log();
    fs::write(&path, "a:1\ngarbage\n\nb:2\n").unwrap();

    let log = RecordLog::open(&path).unwrap();
    let mut scanner = log.scan().unwrap();
    let keys: Vec<String> = scanner.by_ref().map(|r| r.unwrap().key).collect();

    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(scanner.skipped(), 1);
}

#[test]
fn test_scan_does_not_warn_on_malformed_lines() {
    let (_temp, path) = setup_temp_log();
    fs::write(&path, "a:1\ngarbage\nb:2\n").unwrap();
    let log = RecordLog::open(&path).unwrap();

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        for _ in 0..3 {
            assert_eq!(scan_all(&log).len(), 2);
        }
    });

    assert!(logs.contents().is_empty(), "unexpected output: {}", logs.contents());
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_closed_log_rejects_operations() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();
    log.append(&Record::new("a", "1")).unwrap();

    log.close().unwrap();

    assert!(log.is_closed());
    assert!(matches!(log.append(&Record::new("b", "2")), Err(KvError::Closed)));
    assert!(matches!(log.scan(), Err(KvError::Closed)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "a:1\n");
}

#[test]
fn test_close_twice() {
    let (_temp, path) = setup_temp_log();
    let log = RecordLog::open(&path).unwrap();
    log.close().unwrap();
    log.close().unwrap();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_appends_and_scans() {
    let (_temp, path) = setup_temp_log();
    let log = Arc::new(RecordLog::open(&path).unwrap());

    let mut handles = vec![];
    for t in 0..4 {
        let log = Arc::clone(&log);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                log.append(&Record::new(
                    format!("thread{}_key{}", t, i),
                    format!("thread{}_value{}", t, i),
                ))
                .unwrap();
            }
        }));
    }

    // Readers run alongside the writers and must only ever see whole records
    for _ in 0..2 {
        let log = Arc::clone(&log);
        handles.push(thread::spawn(move || {
            for _ in 0..20 {
                let mut scanner = log.scan().unwrap();
                for record in scanner.by_ref() {
                    let record = record.unwrap();
                    let suffix = record.key.replace("_key", "_value");
                    assert_eq!(record.value, suffix);
                }
                assert_eq!(scanner.skipped(), 0);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let records = scan_all(&log);
    assert_eq!(records.len(), 100);
    assert_eq!(log.committed_len(), fs::metadata(&path).unwrap().len());
}
