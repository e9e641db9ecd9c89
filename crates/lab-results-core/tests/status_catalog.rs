// crates/lab-results-core/tests/status_catalog.rs
// ============================================================================
// Module: Status Catalog Tests
// Description: Tests for the standard status catalog and wire code mapping.
// Purpose: Validate catalog contents, terminal statuses, and code decoding.
// Dependencies: lab-results-core
// ============================================================================

//! ## Overview
//! Ensures the standard catalog carries the expected statuses, flags, and
//! transition sets, and that one-letter wire codes decode fail-closed.

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

use lab_results_core::CatalogError;
use lab_results_core::StatusCatalog;
use lab_results_core::StatusCode;

/// Verifies every standard status is present with matching record code.
#[test]
fn standard_catalog_covers_all_codes() {
    let catalog = StatusCatalog::standard();
    for code in StatusCode::ALL {
        let record = catalog.record(code).expect("standard catalog record");
        assert_eq!(record.code, code);
        assert!(!record.description.is_empty());
        assert!(record.color.starts_with('#'));
    }
}

/// Verifies terminal statuses have empty transition sets.
#[test]
fn terminal_statuses_have_no_successors() {
    let catalog = StatusCatalog::standard();
    for code in [StatusCode::Validated, StatusCode::Cancelled] {
        let record = catalog.record(code).unwrap();
        assert!(record.is_final);
        assert!(record.transitions.is_empty());
    }
}

/// Verifies only Saved and ReadyForMicroscope require review.
#[test]
fn review_flags_match_standard_table() {
    let catalog = StatusCatalog::standard();
    for code in StatusCode::ALL {
        let expected =
            matches!(code, StatusCode::Saved | StatusCode::ReadyForMicroscope);
        assert_eq!(catalog.requires_review(code).unwrap(), expected, "status {code}");
    }
}

/// Verifies the standard transition sets for the entry-side statuses.
#[test]
fn entry_side_transitions_match_standard_table() {
    let catalog = StatusCatalog::standard();
    assert!(catalog.can_transition(StatusCode::NotStarted, StatusCode::Training).unwrap());
    assert!(catalog.can_transition(StatusCode::NotStarted, StatusCode::Saved).unwrap());
    assert!(
        !catalog
            .can_transition(StatusCode::NotStarted, StatusCode::ReadyForMicroscope)
            .unwrap()
    );
    assert!(
        catalog
            .can_transition(StatusCode::AcceptedPartial, StatusCode::ReadyForMicroscope)
            .unwrap()
    );
    assert!(!catalog.can_transition(StatusCode::Saved, StatusCode::Partial).unwrap());
    assert!(catalog.can_transition(StatusCode::Saved, StatusCode::Validated).unwrap());
}

/// Verifies wire codes decode to their statuses and back.
#[test]
fn wire_codes_decode_and_encode() {
    for code in StatusCode::ALL {
        assert_eq!(StatusCode::from_code(code.as_code()), Some(code));
    }
    assert_eq!(StatusCode::from_code('Z'), None);
    assert_eq!(StatusCode::from_code('x'), None);
}

/// Verifies status codes serialize as their one-letter wire forms.
#[test]
fn status_codes_serialize_as_letters() {
    let encoded = serde_json::to_string(&StatusCode::Validated).unwrap();
    assert_eq!(encoded, "\"D\"");
    let decoded: StatusCode = serde_json::from_str("\"E\"").unwrap();
    assert_eq!(decoded, StatusCode::ReadyForMicroscope);
    assert!(serde_json::from_str::<StatusCode>("\"Q\"").is_err());
}

/// Verifies lookups against an empty catalog fail closed.
#[test]
fn empty_catalog_rejects_lookups() {
    let catalog = StatusCatalog::new(Vec::new());
    let error = catalog.record(StatusCode::Saved).unwrap_err();
    assert_eq!(
        error,
        CatalogError::UnknownStatus {
            code: StatusCode::Saved
        }
    );
}
