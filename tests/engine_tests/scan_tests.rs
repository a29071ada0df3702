//! Tests for ScanEngine
//!
//! These tests verify:
//! - Last-write-wins point lookups
//! - Case-insensitive key matching
//! - Not-found results carry the queried key
//! - List returns raw history, duplicates included

use std::path::PathBuf;

use kvlog::recordlog::{Record, RecordLog};
use kvlog::scan::{Lookup, ScanEngine};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log(records: &[(&str, &str)]) -> (TempDir, RecordLog) {
    let temp_dir = TempDir::new().unwrap();
    let path: PathBuf = temp_dir.path().join("scan.db");
    let log = RecordLog::open(&path).unwrap();
    for (key, value) in records {
        log.append(&Record::new(*key, *value)).unwrap();
    }
    (temp_dir, log)
}

// =============================================================================
// Get Tests
// =============================================================================

#[test]
fn test_get_empty_log() {
    let (_temp, log) = setup_temp_log(&[]);

    let result = ScanEngine::new(&log).get("x").unwrap();

    assert_eq!(result, Lookup::NotFound("x".to_string()));
}

#[test]
fn test_get_last_write_wins() {
    let (_temp, log) = setup_temp_log(&[("k", "a"), ("other", "z"), ("k", "b")]);

    let result = ScanEngine::new(&log).get("k").unwrap();

    assert_eq!(result, Lookup::Found("b".to_string()));
}

#[test]
fn test_get_case_insensitive() {
    let (_temp, log) = setup_temp_log(&[("Color", "red"), ("COLOR", "blue")]);

    let engine = ScanEngine::new(&log);

    assert_eq!(engine.get("color").unwrap(), Lookup::Found("blue".to_string()));
    assert_eq!(engine.get("CoLoR").unwrap(), Lookup::Found("blue".to_string()));
}

#[test]
fn test_get_empty_value_is_found() {
    let (_temp, log) = setup_temp_log(&[("k", "v"), ("k", "")]);

    let result = ScanEngine::new(&log).get("k").unwrap();

    assert_eq!(result, Lookup::Found(String::new()));
}

#[test]
fn test_get_value_with_colons() {
    let (_temp, log) = setup_temp_log(&[("addr", "127.0.0.1:9090")]);

    let result = ScanEngine::new(&log).get("addr").unwrap();

    assert_eq!(result, Lookup::Found("127.0.0.1:9090".to_string()));
}

#[test]
fn test_get_prefix_is_not_a_match() {
    let (_temp, log) = setup_temp_log(&[("key1", "v")]);

    let result = ScanEngine::new(&log).get("key").unwrap();

    assert_eq!(result, Lookup::NotFound("key".to_string()));
}

// =============================================================================
// List Tests
// =============================================================================

#[test]
fn test_list_keeps_duplicates_in_order() {
    let (_temp, log) = setup_temp_log(&[("x", "1"), ("y", "9"), ("x", "2")]);

    let records: Vec<Record> = ScanEngine::new(&log)
        .list()
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(
        records,
        vec![
            Record::new("x", "1"),
            Record::new("y", "9"),
            Record::new("x", "2"),
        ]
    );
}

#[test]
fn test_list_empty_log() {
    let (_temp, log) = setup_temp_log(&[]);

    assert_eq!(ScanEngine::new(&log).list().unwrap().count(), 0);
}
