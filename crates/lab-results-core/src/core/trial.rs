// crates/lab-results-core/src/core/trial.rs
// ============================================================================
// Module: Lab Results Trial Records
// Description: Trial rows, save modes, and the save request/response surface.
// Purpose: Define the data carried through entry, review, and persistence.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A trial row holds one trial's measured values for a (sample, test) pair,
//! together with its workflow status and entry/validation stamps. Save
//! requests arrive with a mode string that is decoded once into the closed
//! [`SaveMode`] enum; unknown modes are rejected at the boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EmployeeId;
use crate::core::identifiers::SampleId;
use crate::core::identifiers::TestId;
use crate::core::identifiers::TrialNumber;
use crate::core::status::StatusCode;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Trial Rows
// ============================================================================

/// One persisted trial row for a (sample, test) pair.
///
/// # Invariants
/// - Entry stamps are set when the row is first inserted and preserved on update.
/// - Validation stamps are set only when a review accepts the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Sample this trial belongs to.
    pub sample_id: SampleId,
    /// Test this trial belongs to.
    pub test_id: TestId,
    /// Trial number within the (sample, test) pair.
    pub trial_number: TrialNumber,
    /// First measured value.
    pub value1: Option<f64>,
    /// Second measured value.
    pub value2: Option<f64>,
    /// Third measured value.
    pub value3: Option<f64>,
    /// Derived calculation result for the trial.
    pub trial_calc: Option<f64>,
    /// First characterization code.
    pub id1: Option<String>,
    /// Second characterization code.
    pub id2: Option<String>,
    /// Third characterization code.
    pub id3: Option<String>,
    /// Current workflow status.
    pub status: StatusCode,
    /// Free-form comments attached to the trial.
    pub main_comments: Option<String>,
    /// Employee who first entered the row.
    pub entry_id: Option<EmployeeId>,
    /// When the row was first entered.
    pub entry_date: Option<Timestamp>,
    /// Employee who validated the row.
    pub validate_id: Option<EmployeeId>,
    /// When the row was validated.
    pub validate_date: Option<Timestamp>,
}

/// One trial's worth of values submitted in an entry-mode save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialEntry {
    /// Trial number the values apply to.
    pub trial_number: TrialNumber,
    /// First measured value.
    pub value1: Option<f64>,
    /// Second measured value.
    pub value2: Option<f64>,
    /// Third measured value.
    pub value3: Option<f64>,
    /// Derived calculation result for the trial.
    pub trial_calc: Option<f64>,
    /// First characterization code.
    pub id1: Option<String>,
    /// Second characterization code.
    pub id2: Option<String>,
    /// Third characterization code.
    pub id3: Option<String>,
    /// Free-form comments attached to the trial.
    pub main_comments: Option<String>,
}

// ============================================================================
// SECTION: Save Modes
// ============================================================================

/// Closed set of save modes.
///
/// # Invariants
/// - Wire strings decode case-insensitively; unknown strings are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Technician entry or update of trial values.
    Entry,
    /// Reviewer accepts all trials for the (sample, test) pair.
    ReviewAccept,
    /// Reviewer rejects the (sample, test) pair back to entry.
    ReviewReject,
}

impl SaveMode {
    /// Decodes a wire mode string (returns `None` for unknown modes).
    #[must_use]
    pub fn from_wire(mode: &str) -> Option<Self> {
        match mode.to_ascii_lowercase().as_str() {
            "entry" => Some(Self::Entry),
            "reviewaccept" => Some(Self::ReviewAccept),
            "reviewreject" => Some(Self::ReviewReject),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Save Requests
// ============================================================================

/// A batch save request for one (sample, test) pair.
///
/// # Invariants
/// - `entries` is consulted in entry mode only; review modes operate on the
///   rows already persisted for the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Sample the save applies to.
    pub sample_id: SampleId,
    /// Test the save applies to.
    pub test_id: TestId,
    /// Decoded save mode.
    pub mode: SaveMode,
    /// Trial values submitted with an entry-mode save.
    pub entries: Vec<TrialEntry>,
    /// Whether the save is an intentionally incomplete partial save.
    pub is_partial_save: bool,
    /// Whether the results are ready for the microscope stage.
    pub is_media_ready: bool,
    /// Whether the save deletes all trial rows for the pair.
    pub is_delete: bool,
}

/// Outcome of a save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    /// Whether the save committed.
    pub success: bool,
    /// Failure description when the save did not commit.
    pub error_message: Option<String>,
}

impl SaveResponse {
    /// Builds the success response.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    /// Builds a failure response with a description.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}
