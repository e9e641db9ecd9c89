// crates/lab-results-core/tests/transition_validator.rs
// ============================================================================
// Module: Transition Validator Tests
// Description: Tests for per-test transition legality and next-status listing.
// Purpose: Validate the catalog-and-workflow conjunction rule.
// Dependencies: lab-results-core
// ============================================================================

//! ## Overview
//! Ensures a transition is allowed only when both the catalog and the test's
//! workflow permit the target, and that next-status listings intersect the
//! two tables correctly.

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

use lab_results_core::StatusCatalog;
use lab_results_core::StatusCode;
use lab_results_core::TestId;
use lab_results_core::TransitionValidator;
use lab_results_core::WorkflowTable;

fn validator() -> TransitionValidator {
    TransitionValidator::new(StatusCatalog::standard(), WorkflowTable::standard())
}

fn test_id(raw: u16) -> TestId {
    TestId::from_raw(raw).expect("nonzero test id")
}

/// Verifies a move allowed by both tables is accepted.
#[test]
fn allowed_by_catalog_and_workflow_passes() {
    let validator = validator();
    let decision = validator.validate(StatusCode::NotStarted, StatusCode::Saved, test_id(10));
    assert!(decision.allowed);
    assert!(decision.reason.is_none());
}

/// Verifies the workflow restriction refuses a catalog-legal move.
///
/// The catalog allows NotStarted -> AcceptedPartial, but the plain viscosity
/// workflow never carries AcceptedPartial, so the move must be refused there
/// while passing on a partial-save workflow.
#[test]
fn workflow_subset_refuses_catalog_legal_move() {
    let validator = validator();
    let refused =
        validator.validate(StatusCode::NotStarted, StatusCode::AcceptedPartial, test_id(10));
    assert!(!refused.allowed);
    assert_eq!(
        refused.reason.as_deref(),
        Some("Status transition not allowed for this test")
    );

    let allowed =
        validator.validate(StatusCode::NotStarted, StatusCode::AcceptedPartial, test_id(50));
    assert!(allowed.allowed);
}

/// Verifies terminal statuses admit no further moves.
#[test]
fn terminal_statuses_refuse_all_moves() {
    let validator = validator();
    for from in [StatusCode::Validated, StatusCode::Cancelled] {
        for to in StatusCode::ALL {
            let decision = validator.validate(from, to, test_id(210));
            assert!(!decision.allowed, "{from} -> {to} must be refused");
        }
    }
}

/// Verifies an unknown test yields the lookup-failure reason.
#[test]
fn unknown_test_is_refused_with_lookup_reason() {
    let validator = validator();
    let decision = validator.validate(StatusCode::NotStarted, StatusCode::Saved, test_id(999));
    assert!(!decision.allowed);
    assert_eq!(
        decision.reason.as_deref(),
        Some("Invalid status or test workflow not found")
    );
}

/// Verifies next-status listing intersects catalog transitions with the flow.
#[test]
fn next_statuses_intersect_catalog_and_workflow() {
    let validator = validator();

    // Ferrogram carries every intermediate status, so Training fans out fully.
    let ferrogram: Vec<StatusCode> = validator
        .next_possible_statuses(StatusCode::Training, test_id(210))
        .into_iter()
        .map(|record| record.code)
        .collect();
    assert_eq!(
        ferrogram,
        vec![
            StatusCode::Saved,
            StatusCode::AcceptedPartial,
            StatusCode::Partial,
            StatusCode::ReadyForMicroscope,
        ]
    );

    // The plain flow keeps only Saved from the same starting point.
    let plain: Vec<StatusCode> = validator
        .next_possible_statuses(StatusCode::Training, test_id(10))
        .into_iter()
        .map(|record| record.code)
        .collect();
    assert_eq!(plain, vec![StatusCode::Saved]);
}

/// Verifies next-status listing is empty for unknown tests.
#[test]
fn next_statuses_empty_for_unknown_test() {
    let validator = validator();
    assert!(
        validator
            .next_possible_statuses(StatusCode::Saved, test_id(999))
            .is_empty()
    );
}
