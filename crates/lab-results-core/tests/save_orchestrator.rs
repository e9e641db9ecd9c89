// crates/lab-results-core/tests/save_orchestrator.rs
// ============================================================================
// Module: Save Orchestrator Tests
// Description: Tests for entry and review saves through the orchestrator.
// Purpose: Validate authorization, status determination, and atomicity.
// Dependencies: lab-results-core
// ============================================================================

//! ## Overview
//! Drives full save requests through the orchestrator against the standard
//! tables and the in-memory store, covering entry saves, partial saves,
//! review accept/reject, delete, and the no-partial-write guarantee.

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

use lab_results_core::AcceptAllValidator;
use lab_results_core::EmployeeId;
use lab_results_core::InMemoryTrialStore;
use lab_results_core::QualificationLevel;
use lab_results_core::QualificationResolver;
use lab_results_core::QualificationTable;
use lab_results_core::SampleId;
use lab_results_core::SaveEngineConfig;
use lab_results_core::SaveError;
use lab_results_core::SaveMode;
use lab_results_core::SaveOrchestrator;
use lab_results_core::SaveRequest;
use lab_results_core::StatusCatalog;
use lab_results_core::StatusCode;
use lab_results_core::StoreError;
use lab_results_core::TableTestRegistry;
use lab_results_core::TestId;
use lab_results_core::TestStandId;
use lab_results_core::Timestamp;
use lab_results_core::TransitionValidator;
use lab_results_core::TrialBatch;
use lab_results_core::TrialEntry;
use lab_results_core::TrialMutation;
use lab_results_core::TrialNumber;
use lab_results_core::TrialStore;
use lab_results_core::WorkflowTable;

type Engine = SaveOrchestrator<TableTestRegistry, AcceptAllValidator, InMemoryTrialStore>;

const SAMPLE: u32 = 7;

fn sample() -> SampleId {
    SampleId::from_raw(SAMPLE).expect("nonzero sample id")
}

fn test_id(raw: u16) -> TestId {
    TestId::from_raw(raw).expect("nonzero test id")
}

fn stand(raw: u16) -> TestStandId {
    TestStandId::from_raw(raw).expect("nonzero stand id")
}

fn trial(raw: u16) -> TrialNumber {
    TrialNumber::from_raw(raw).expect("nonzero trial number")
}

fn tech() -> EmployeeId {
    EmployeeId::new("tech")
}

fn lead() -> EmployeeId {
    EmployeeId::new("lead")
}

fn scope() -> EmployeeId {
    EmployeeId::new("scope")
}

fn now() -> Timestamp {
    Timestamp::Logical(100)
}

/// Builds an orchestrator over the standard tables and a shared store handle.
///
/// Tests 10, 50, and 210 sit on stand 1; the microscope test 120 sits on
/// stand 2. `tech` holds Q and `lead` holds QAG on both stands; `scope`
/// holds MicrE on the microscope stand only.
fn engine() -> (Engine, InMemoryTrialStore) {
    let registry = TableTestRegistry::new(vec![
        (test_id(10), stand(1)),
        (test_id(50), stand(1)),
        (test_id(210), stand(1)),
        (test_id(120), stand(2)),
        // Registered on a stand but carrying no workflow definition.
        (test_id(999), stand(1)),
    ]);
    let qualifications = QualificationTable::new(vec![
        (tech(), stand(1), QualificationLevel::Qualified),
        (tech(), stand(2), QualificationLevel::Qualified),
        (lead(), stand(1), QualificationLevel::QualifiedReviewer),
        (lead(), stand(2), QualificationLevel::QualifiedReviewer),
        (scope(), stand(2), QualificationLevel::MicroscopySpecialist),
    ]);
    let resolver = QualificationResolver::new(registry, qualifications);
    let transitions = TransitionValidator::new(StatusCatalog::standard(), WorkflowTable::standard());
    let store = InMemoryTrialStore::new();
    let orchestrator = SaveOrchestrator::new(
        resolver,
        AcceptAllValidator,
        transitions,
        store.clone(),
        SaveEngineConfig::default(),
    );
    (orchestrator, store)
}

fn entry(raw_trial: u16, value: f64) -> TrialEntry {
    TrialEntry {
        trial_number: trial(raw_trial),
        value1: Some(value),
        value2: None,
        value3: None,
        trial_calc: None,
        id1: None,
        id2: None,
        id3: None,
        main_comments: None,
    }
}

fn request(raw_test: u16, mode: SaveMode, entries: Vec<TrialEntry>) -> SaveRequest {
    SaveRequest {
        sample_id: sample(),
        test_id: test_id(raw_test),
        mode,
        entries,
        is_partial_save: false,
        is_media_ready: false,
        is_delete: false,
    }
}

/// Verifies a full entry save lands rows on Saved with entry stamps.
#[test]
fn entry_save_records_saved_rows_with_stamps() {
    let (engine, store) = engine();
    let request = request(10, SaveMode::Entry, vec![entry(1, 42.5), entry(2, 43.0)]);

    engine.execute(&request, &tech(), now()).unwrap();

    let rows = store.list_trials(sample(), test_id(10)).unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.status, StatusCode::Saved);
        assert_eq!(row.entry_id, Some(tech()));
        assert_eq!(row.entry_date, Some(now()));
        assert_eq!(row.validate_id, None);
        assert_eq!(row.validate_date, None);
    }
}

/// Verifies a partial save lands on AcceptedPartial for a partial-capable test.
#[test]
fn partial_save_maps_to_accepted_partial() {
    let (engine, store) = engine();
    let mut request = request(50, SaveMode::Entry, vec![entry(1, 8.1)]);
    request.is_partial_save = true;

    engine.execute(&request, &tech(), now()).unwrap();

    let rows = store.list_trials(sample(), test_id(50)).unwrap();
    assert_eq!(rows[0].status, StatusCode::AcceptedPartial);
}

/// Verifies the Ferrogram-class test maps partial saves to Partial instead.
#[test]
fn ferrogram_partial_save_maps_to_partial() {
    let (engine, store) = engine();
    let mut request = request(210, SaveMode::Entry, vec![entry(1, 8.1)]);
    request.is_partial_save = true;

    engine.execute(&request, &tech(), now()).unwrap();

    let rows = store.list_trials(sample(), test_id(210)).unwrap();
    assert_eq!(rows[0].status, StatusCode::Partial);
}

/// Verifies media-ready moves accepted rows to ReadyForMicroscope.
#[test]
fn media_ready_moves_accepted_rows_to_microscope() {
    let (engine, store) = engine();
    let mut first = request(120, SaveMode::Entry, vec![entry(1, 3.2)]);
    first.is_partial_save = true;
    engine.execute(&first, &tech(), now()).unwrap();

    let mut second = request(120, SaveMode::Entry, vec![entry(1, 3.4)]);
    second.is_media_ready = true;
    engine.execute(&second, &tech(), now()).unwrap();

    let rows = store.list_trials(sample(), test_id(120)).unwrap();
    assert_eq!(rows[0].status, StatusCode::ReadyForMicroscope);
    assert_eq!(rows[0].value1, Some(3.4));
}

/// Verifies media-ready on a fresh pair is refused and writes nothing.
///
/// NotStarted -> ReadyForMicroscope is not a catalog transition, so the
/// legality check inside planning must refuse the whole batch.
#[test]
fn media_ready_from_not_started_is_refused() {
    let (engine, store) = engine();
    let mut request = request(120, SaveMode::Entry, vec![entry(1, 3.2)]);
    request.is_media_ready = true;

    let error = engine.execute(&request, &tech(), now()).unwrap_err();
    assert!(matches!(error, SaveError::Transaction(_)));
    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies partial save is refused where the workflow forbids it.
#[test]
fn partial_save_refused_on_plain_workflow() {
    let (engine, store) = engine();
    let mut request = request(10, SaveMode::Entry, vec![entry(1, 42.5)]);
    request.is_partial_save = true;

    let error = engine.execute(&request, &tech(), now()).unwrap_err();
    assert!(matches!(error, SaveError::ValidationFailed(_)));
    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies the microscopy specialist cannot enter results.
#[test]
fn specialist_entry_is_unauthorized() {
    let (engine, store) = engine();
    let request = request(120, SaveMode::Entry, vec![entry(1, 3.2)]);

    let error = engine.execute(&request, &scope(), now()).unwrap_err();
    assert!(matches!(error, SaveError::Unauthorized(_)));
    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies an unqualified employee cannot save at all.
#[test]
fn unqualified_employee_is_unauthorized() {
    let (engine, store) = engine();
    let request = request(10, SaveMode::Entry, vec![entry(1, 42.5)]);

    let error = engine
        .execute(&request, &EmployeeId::new("stranger"), now())
        .unwrap_err();
    assert!(matches!(error, SaveError::Unauthorized(_)));
    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies review-accept validates every row and stamps the reviewer.
#[test]
fn review_accept_validates_all_rows() {
    let (engine, store) = engine();
    let save = request(10, SaveMode::Entry, vec![entry(1, 42.5), entry(2, 43.0)]);
    engine.execute(&save, &tech(), now()).unwrap();

    let accept = request(10, SaveMode::ReviewAccept, Vec::new());
    let later = Timestamp::Logical(200);
    engine.execute(&accept, &lead(), later).unwrap();

    let rows = store.list_trials(sample(), test_id(10)).unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.status, StatusCode::Validated);
        assert_eq!(row.validate_id, Some(lead()));
        assert_eq!(row.validate_date, Some(later));
        // Entry stamps survive review.
        assert_eq!(row.entry_id, Some(tech()));
        assert_eq!(row.entry_date, Some(now()));
    }
}

/// Verifies entry-level qualification cannot review.
#[test]
fn entry_qualification_cannot_review() {
    let (engine, store) = engine();
    let save = request(10, SaveMode::Entry, vec![entry(1, 42.5)]);
    engine.execute(&save, &tech(), now()).unwrap();

    let accept = request(10, SaveMode::ReviewAccept, Vec::new());
    let error = engine.execute(&accept, &tech(), now()).unwrap_err();
    assert!(matches!(error, SaveError::Unauthorized(_)));

    let rows = store.list_trials(sample(), test_id(10)).unwrap();
    assert_eq!(rows[0].status, StatusCode::Saved);
}

/// Verifies review-reject discards history and restarts the pair.
#[test]
fn review_reject_discards_history() {
    let (engine, store) = engine();
    let save = request(50, SaveMode::Entry, vec![entry(1, 8.1), entry(2, 8.4)]);
    engine.execute(&save, &tech(), now()).unwrap();

    let reject = request(50, SaveMode::ReviewReject, Vec::new());
    engine.execute(&reject, &lead(), Timestamp::Logical(200)).unwrap();

    let rows = store.list_trials(sample(), test_id(50)).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.trial_number, trial(1));
    assert_eq!(row.status, StatusCode::AcceptedPartial);
    assert_eq!(row.value1, None);
    assert_eq!(row.entry_id, None);
    assert_eq!(row.entry_date, None);
    assert_eq!(row.validate_id, None);
}

/// Verifies review-accept with no persisted rows is a successful no-op.
#[test]
fn review_accept_with_no_rows_is_noop() {
    let (engine, store) = engine();
    let accept = request(10, SaveMode::ReviewAccept, Vec::new());

    engine.execute(&accept, &lead(), now()).unwrap();
    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies resubmitting at the same status updates values and keeps the
/// first enterer on record.
#[test]
fn resubmission_is_idempotent_and_preserves_first_enterer() {
    let (engine, store) = engine();
    let first = request(10, SaveMode::Entry, vec![entry(1, 42.5)]);
    engine.execute(&first, &tech(), now()).unwrap();

    let second = request(10, SaveMode::Entry, vec![entry(1, 99.9)]);
    engine.execute(&second, &lead(), Timestamp::Logical(200)).unwrap();

    let rows = store.list_trials(sample(), test_id(10)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, StatusCode::Saved);
    assert_eq!(rows[0].value1, Some(99.9));
    assert_eq!(rows[0].entry_id, Some(tech()));
    assert_eq!(rows[0].entry_date, Some(now()));
}

/// Verifies entering over validated rows is refused and nothing changes.
#[test]
fn entry_after_validation_is_refused() {
    let (engine, store) = engine();
    let save = request(10, SaveMode::Entry, vec![entry(1, 42.5)]);
    engine.execute(&save, &tech(), now()).unwrap();
    let accept = request(10, SaveMode::ReviewAccept, Vec::new());
    engine.execute(&accept, &lead(), now()).unwrap();

    let again = request(10, SaveMode::Entry, vec![entry(1, 50.0)]);
    let error = engine.execute(&again, &tech(), now()).unwrap_err();
    assert!(matches!(error, SaveError::Transaction(_)));

    let rows = store.list_trials(sample(), test_id(10)).unwrap();
    assert_eq!(rows[0].status, StatusCode::Validated);
    assert_eq!(rows[0].value1, Some(42.5));
}

/// Verifies a failed apply surfaces the store error and writes nothing.
#[test]
fn failed_apply_leaves_rows_untouched() {
    let (engine, store) = engine();
    store.fail_next_applies(1).unwrap();

    let save = request(10, SaveMode::Entry, vec![entry(1, 42.5), entry(2, 43.0)]);
    let error = engine.execute(&save, &tech(), now()).unwrap_err();
    assert!(matches!(error, SaveError::Store(_)));
    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies an entry-mode delete removes every row for the pair.
#[test]
fn delete_removes_all_rows() {
    let (engine, store) = engine();
    let save = request(50, SaveMode::Entry, vec![entry(1, 8.1), entry(2, 8.4)]);
    engine.execute(&save, &tech(), now()).unwrap();

    let mut delete = request(50, SaveMode::Entry, Vec::new());
    delete.is_delete = true;
    engine.execute(&delete, &tech(), now()).unwrap();

    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies a test without a workflow definition is refused after the
/// capability gate but before any store interaction.
#[test]
fn test_without_workflow_is_refused() {
    let (engine, store) = engine();
    let error = engine
        .execute(&request(999, SaveMode::Entry, vec![entry(1, 1.0)]), &tech(), now())
        .unwrap_err();
    assert!(matches!(error, SaveError::UnknownTest { .. }));
    assert_eq!(store.row_count().unwrap(), 0);
}

/// Verifies the response wrapper reports failures without panicking.
#[test]
fn save_response_carries_failure_message() {
    let (engine, _store) = engine();
    let response = engine.save(
        &request(10, SaveMode::Entry, vec![entry(1, 1.0)]),
        &EmployeeId::new("stranger"),
        now(),
    );
    assert!(!response.success);
    assert!(response.error_message.is_some());

    let ok = engine.save(&request(10, SaveMode::Entry, vec![entry(1, 1.0)]), &tech(), now());
    assert!(ok.success);
    assert_eq!(ok.error_message, None);
}

/// Verifies the store refuses a batch planned from a stale snapshot.
#[test]
fn stale_snapshot_batch_is_refused_by_store() {
    let (engine, store) = engine();
    let save = request(10, SaveMode::Entry, vec![entry(1, 42.5)]);
    engine.execute(&save, &tech(), now()).unwrap();

    // A batch claiming the pair is still empty must conflict.
    let stale = TrialBatch {
        sample_id: sample(),
        test_id: test_id(10),
        expected: Vec::new(),
        mutations: vec![TrialMutation::DeleteAll],
    };
    let error = store.apply(&stale).unwrap_err();
    assert!(matches!(error, StoreError::Conflict(_)));

    let rows = store.list_trials(sample(), test_id(10)).unwrap();
    assert_eq!(rows.len(), 1);
}
