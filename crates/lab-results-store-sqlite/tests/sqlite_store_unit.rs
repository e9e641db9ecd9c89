// crates/lab-results-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Trial Store Tests
// Description: Tests for durable trial persistence and snapshot conflicts.
// Purpose: Validate atomic batch application against a real database file.
// Dependencies: lab-results-core, lab-results-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Exercises the `SQLite` trial store against temporary database files:
//! batch application, ordered reads, snapshot-conflict refusal, reopening,
//! and the pending-review listing.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use lab_results_core::EmployeeId;
use lab_results_core::SampleId;
use lab_results_core::StatusCode;
use lab_results_core::StoreError;
use lab_results_core::TestId;
use lab_results_core::Timestamp;
use lab_results_core::TrialBatch;
use lab_results_core::TrialMutation;
use lab_results_core::TrialNumber;
use lab_results_core::TrialRecord;
use lab_results_core::TrialStore;
use lab_results_store_sqlite::SqliteStoreConfig;
use lab_results_store_sqlite::SqliteTrialStore;
use tempfile::TempDir;

fn config(dir: &TempDir) -> SqliteStoreConfig {
    SqliteStoreConfig {
        path: dir.path().join("trials.sqlite3"),
        busy_timeout_ms: 1_000,
        journal_mode: lab_results_store_sqlite::SqliteStoreMode::Wal,
        sync_mode: lab_results_store_sqlite::SqliteSyncMode::Normal,
    }
}

fn sample() -> SampleId {
    SampleId::from_raw(7).expect("nonzero sample id")
}

fn test_id(raw: u16) -> TestId {
    TestId::from_raw(raw).expect("nonzero test id")
}

fn trial(raw: u16) -> TrialNumber {
    TrialNumber::from_raw(raw).expect("nonzero trial number")
}

fn record(raw_trial: u16, status: StatusCode, value: f64) -> TrialRecord {
    TrialRecord {
        sample_id: sample(),
        test_id: test_id(50),
        trial_number: trial(raw_trial),
        value1: Some(value),
        value2: None,
        value3: None,
        trial_calc: None,
        id1: Some("NEG".to_string()),
        id2: None,
        id3: None,
        status,
        main_comments: Some("bench two".to_string()),
        entry_id: Some(EmployeeId::new("tech")),
        entry_date: Some(Timestamp::UnixMillis(1_700_000_000_000)),
        validate_id: None,
        validate_date: None,
    }
}

fn batch(
    expected: Vec<(TrialNumber, StatusCode)>,
    mutations: Vec<TrialMutation>,
) -> TrialBatch {
    TrialBatch {
        sample_id: sample(),
        test_id: test_id(50),
        expected,
        mutations,
    }
}

/// Verifies a batch writes rows readable in trial order with full fidelity.
#[test]
fn apply_and_list_round_trips_rows() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTrialStore::new(config(&dir)).unwrap();

    let first = record(2, StatusCode::Saved, 8.4);
    let second = record(1, StatusCode::Saved, 8.1);
    store
        .apply(&batch(
            Vec::new(),
            vec![
                TrialMutation::Upsert(first.clone()),
                TrialMutation::Upsert(second.clone()),
            ],
        ))
        .unwrap();

    let rows = store.list_trials(sample(), test_id(50)).unwrap();
    assert_eq!(rows, vec![second, first]);
}

/// Verifies a batch planned from a stale snapshot is refused atomically.
#[test]
fn stale_snapshot_is_refused_and_nothing_commits() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTrialStore::new(config(&dir)).unwrap();
    store
        .apply(&batch(
            Vec::new(),
            vec![TrialMutation::Upsert(record(1, StatusCode::Saved, 8.1))],
        ))
        .unwrap();

    // The pair now holds a Saved row; a batch expecting it empty must fail
    // without deleting anything.
    let error = store
        .apply(&batch(Vec::new(), vec![TrialMutation::DeleteAll]))
        .unwrap_err();
    assert!(matches!(error, StoreError::Conflict(_)));
    assert_eq!(store.list_trials(sample(), test_id(50)).unwrap().len(), 1);
}

/// Verifies a matching snapshot lets updates and deletes through.
#[test]
fn matching_snapshot_applies_mixed_mutations() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTrialStore::new(config(&dir)).unwrap();
    store
        .apply(&batch(
            Vec::new(),
            vec![
                TrialMutation::Upsert(record(1, StatusCode::Saved, 8.1)),
                TrialMutation::Upsert(record(2, StatusCode::Saved, 8.4)),
            ],
        ))
        .unwrap();

    let mut replacement = record(1, StatusCode::AcceptedPartial, 9.9);
    replacement.validate_id = Some(EmployeeId::new("lead"));
    replacement.validate_date = Some(Timestamp::Logical(5));
    store
        .apply(&batch(
            vec![(trial(1), StatusCode::Saved), (trial(2), StatusCode::Saved)],
            vec![TrialMutation::DeleteAll, TrialMutation::Upsert(replacement.clone())],
        ))
        .unwrap();

    let rows = store.list_trials(sample(), test_id(50)).unwrap();
    assert_eq!(rows, vec![replacement]);
}

/// Verifies rows survive closing and reopening the database.
#[test]
fn rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = SqliteTrialStore::new(config(&dir)).unwrap();
        store
            .apply(&batch(
                Vec::new(),
                vec![TrialMutation::Upsert(record(1, StatusCode::Saved, 8.1))],
            ))
            .unwrap();
    }

    let reopened = SqliteTrialStore::new(config(&dir)).unwrap();
    let rows = reopened.list_trials(sample(), test_id(50)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, StatusCode::Saved);
    assert_eq!(rows[0].entry_id, Some(EmployeeId::new("tech")));
}

/// Verifies the pending-review listing filters by the supplied statuses.
#[test]
fn pending_review_listing_filters_by_status() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTrialStore::new(config(&dir)).unwrap();
    store
        .apply(&batch(
            Vec::new(),
            vec![
                TrialMutation::Upsert(record(1, StatusCode::Saved, 8.1)),
                TrialMutation::Upsert(record(2, StatusCode::ReadyForMicroscope, 8.4)),
                TrialMutation::Upsert(record(3, StatusCode::Validated, 8.6)),
            ],
        ))
        .unwrap();

    let pending = store
        .list_pending_review(&[StatusCode::Saved, StatusCode::ReadyForMicroscope])
        .unwrap();
    let statuses: Vec<StatusCode> = pending.iter().map(|row| row.status).collect();
    assert_eq!(statuses, vec![StatusCode::Saved, StatusCode::ReadyForMicroscope]);
}

/// Verifies an empty pair reads as empty and readiness succeeds.
#[test]
fn empty_pair_reads_empty() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTrialStore::new(config(&dir)).unwrap();
    store.readiness().unwrap();
    assert!(store.list_trials(sample(), test_id(50)).unwrap().is_empty());
}

/// Verifies a directory store path is rejected before opening.
#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let bad = SqliteStoreConfig {
        path: dir.path().to_path_buf(),
        busy_timeout_ms: 1_000,
        journal_mode: lab_results_store_sqlite::SqliteStoreMode::Wal,
        sync_mode: lab_results_store_sqlite::SqliteSyncMode::Full,
    };
    assert!(SqliteTrialStore::new(bad).is_err());
}
