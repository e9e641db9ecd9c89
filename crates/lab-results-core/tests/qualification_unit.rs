// crates/lab-results-core/tests/qualification_unit.rs
// ============================================================================
// Module: Qualification Resolver Tests
// Description: Tests for level-to-capability mapping and resolution.
// Purpose: Validate capability triples and the all-false fallback.
// Dependencies: lab-results-core
// ============================================================================

//! ## Overview
//! Ensures each qualification level maps to its fixed capability triple and
//! that unknown tests or missing qualifications resolve to no capability
//! rather than an error.

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

use lab_results_core::Capability;
use lab_results_core::EmployeeId;
use lab_results_core::QualificationLevel;
use lab_results_core::QualificationResolver;
use lab_results_core::QualificationTable;
use lab_results_core::TableTestRegistry;
use lab_results_core::TestId;
use lab_results_core::TestStandId;

fn test_id(raw: u16) -> TestId {
    TestId::from_raw(raw).expect("nonzero test id")
}

fn stand(raw: u16) -> TestStandId {
    TestStandId::from_raw(raw).expect("nonzero stand id")
}

fn resolver() -> QualificationResolver<TableTestRegistry> {
    let registry = TableTestRegistry::new(vec![(test_id(10), stand(1)), (test_id(120), stand(2))]);
    let qualifications = QualificationTable::new(vec![
        (EmployeeId::new("tech"), stand(1), QualificationLevel::Qualified),
        (
            EmployeeId::new("lead"),
            stand(1),
            QualificationLevel::QualifiedReviewer,
        ),
        (
            EmployeeId::new("scope"),
            stand(2),
            QualificationLevel::MicroscopySpecialist,
        ),
    ]);
    QualificationResolver::new(registry, qualifications)
}

/// Verifies the fixed level-to-capability mapping.
#[test]
fn level_mapping_is_fixed() {
    let qualified = Capability::from_level(QualificationLevel::Qualified);
    assert!(qualified.can_enter);
    assert!(!qualified.can_review);
    assert!(qualified.can_review_own);

    let reviewer = Capability::from_level(QualificationLevel::QualifiedReviewer);
    assert!(reviewer.can_enter);
    assert!(reviewer.can_review);
    assert!(reviewer.can_review_own);

    let specialist = Capability::from_level(QualificationLevel::MicroscopySpecialist);
    assert!(!specialist.can_enter);
    assert!(specialist.can_review);
    assert!(specialist.can_review_own);
}

/// Verifies resolution goes through the test's stand.
#[test]
fn resolution_uses_test_stand() {
    let resolver = resolver();
    let capability = resolver.resolve(&EmployeeId::new("tech"), test_id(10)).unwrap();
    assert!(capability.can_enter);

    // The same employee holds nothing on the microscope stand.
    let elsewhere = resolver.resolve(&EmployeeId::new("tech"), test_id(120)).unwrap();
    assert_eq!(elsewhere, Capability::NONE);
}

/// Verifies an unknown test resolves to no capability.
#[test]
fn unknown_test_resolves_to_none() {
    let resolver = resolver();
    let capability = resolver.resolve(&EmployeeId::new("lead"), test_id(999)).unwrap();
    assert_eq!(capability, Capability::NONE);
}

/// Verifies an unqualified employee resolves to no capability.
#[test]
fn missing_qualification_resolves_to_none() {
    let resolver = resolver();
    let capability = resolver.resolve(&EmployeeId::new("stranger"), test_id(10)).unwrap();
    assert_eq!(capability, Capability::NONE);
}

/// Verifies the microscopy specialist never gains entry capability.
#[test]
fn specialist_reviews_without_entering() {
    let resolver = resolver();
    let capability = resolver.resolve(&EmployeeId::new("scope"), test_id(120)).unwrap();
    assert!(!capability.can_enter);
    assert!(capability.can_review);
}
