// crates/lab-results-core/src/core/qualification.rs
// ============================================================================
// Module: Lab Results Qualification Model
// Description: Qualification levels, capability triples, and the assignment table.
// Purpose: Map employees' per-test-stand qualification levels to capabilities.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Authorization derives from a qualification level an employee holds on a
//! test stand. Each level maps to a fixed capability triple (enter results,
//! review results, review own results). Absence of a qualification is a
//! routine outcome that yields the all-false capability, never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EmployeeId;
use crate::core::identifiers::TestStandId;

// ============================================================================
// SECTION: Qualification Levels
// ============================================================================

/// Qualification level an employee holds on a test stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualificationLevel {
    /// Qualified: may enter results and review their own entries.
    #[serde(rename = "Q")]
    Qualified,
    /// Qualified reviewer: full entry and review capability.
    #[serde(rename = "QAG")]
    QualifiedReviewer,
    /// Microscopy specialist: reviews only, never enters.
    #[serde(rename = "MicrE")]
    MicroscopySpecialist,
}

/// Capability triple derived from a qualification level.
///
/// # Invariants
/// - The all-false triple is the default for unknown tests or missing qualifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Capability {
    /// May enter trial results.
    pub can_enter: bool,
    /// May review trial results entered by others.
    pub can_review: bool,
    /// May review trial results they entered themselves.
    pub can_review_own: bool,
}

impl Capability {
    /// The all-false capability returned when no qualification applies.
    pub const NONE: Self = Self {
        can_enter: false,
        can_review: false,
        can_review_own: false,
    };

    /// Returns the fixed capability triple for a qualification level.
    #[must_use]
    pub const fn from_level(level: QualificationLevel) -> Self {
        match level {
            QualificationLevel::Qualified => Self {
                can_enter: true,
                can_review: false,
                can_review_own: true,
            },
            QualificationLevel::QualifiedReviewer => Self {
                can_enter: true,
                can_review: true,
                can_review_own: true,
            },
            QualificationLevel::MicroscopySpecialist => Self {
                can_enter: false,
                can_review: true,
                can_review_own: true,
            },
        }
    }
}

// ============================================================================
// SECTION: Qualification Table
// ============================================================================

/// Immutable table of qualification levels keyed by (employee, test stand).
///
/// # Invariants
/// - Constructed once at startup; never mutated afterward.
/// - At most one level per (employee, test stand) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationTable {
    /// Levels keyed by employee and test stand.
    levels: BTreeMap<(EmployeeId, TestStandId), QualificationLevel>,
}

impl QualificationTable {
    /// Builds a table from explicit assignments (later entries win on duplicate keys).
    #[must_use]
    pub fn new(assignments: Vec<(EmployeeId, TestStandId, QualificationLevel)>) -> Self {
        let levels = assignments
            .into_iter()
            .map(|(employee, stand, level)| ((employee, stand), level))
            .collect();
        Self { levels }
    }

    /// Looks up the level an employee holds on a test stand.
    #[must_use]
    pub fn level(&self, employee: &EmployeeId, stand: TestStandId) -> Option<QualificationLevel> {
        self.levels.get(&(employee.clone(), stand)).copied()
    }
}
