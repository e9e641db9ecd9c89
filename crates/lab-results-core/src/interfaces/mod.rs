// crates/lab-results-core/src/interfaces/mod.rs
// ============================================================================
// Module: Lab Results Interfaces
// Description: Backend-agnostic interfaces for storage, test metadata, and validation.
// Purpose: Define the contract surfaces used by the save orchestrator.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the engine integrates with external systems without
//! embedding backend-specific details. Implementations must be deterministic
//! and fail closed on missing or invalid data. The trial store contract is
//! snapshot-guarded: a batch carries the statuses the planner observed, and
//! the store must refuse to commit if the persisted rows have since moved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::SampleId;
use crate::core::identifiers::TestId;
use crate::core::identifiers::TestStandId;
use crate::core::identifiers::TrialNumber;
use crate::core::status::StatusCode;
use crate::core::trial::SaveRequest;
use crate::core::trial::TrialRecord;

// ============================================================================
// SECTION: Trial Store
// ============================================================================

/// One mutation within a trial batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrialMutation {
    /// Inserts or replaces one trial row.
    Upsert(TrialRecord),
    /// Deletes every trial row for the batch's (sample, test) pair.
    DeleteAll,
}

/// An atomic batch of mutations for one (sample, test) pair.
///
/// # Invariants
/// - `expected` captures the trial statuses observed when the batch was
///   planned; the store must verify them inside the write transaction.
/// - Either every mutation commits or none do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBatch {
    /// Sample the batch applies to.
    pub sample_id: SampleId,
    /// Test the batch applies to.
    pub test_id: TestId,
    /// Trial statuses observed at planning time, in trial order.
    pub expected: Vec<(TrialNumber, StatusCode)>,
    /// Mutations to apply atomically.
    pub mutations: Vec<TrialMutation>,
}

/// Trial store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("trial store io error: {0}")]
    Io(String),
    /// Persisted rows no longer match the batch's planning snapshot.
    #[error("trial store conflict: {0}")]
    Conflict(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("trial store corruption: {0}")]
    Corrupt(String),
    /// Store data is invalid.
    #[error("trial store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("trial store error: {0}")]
    Store(String),
}

/// Persistence surface for trial rows.
pub trait TrialStore {
    /// Lists every trial row for a (sample, test) pair, ordered by trial number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when reading fails.
    fn list_trials(
        &self,
        sample_id: SampleId,
        test_id: TestId,
    ) -> Result<Vec<TrialRecord>, StoreError>;

    /// Applies a batch atomically after verifying its planning snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when persisted rows moved since the
    /// snapshot was taken (nothing is committed), or another [`StoreError`]
    /// when the write fails.
    fn apply(&self, batch: &TrialBatch) -> Result<(), StoreError>;

    /// Reports whether the store is ready to serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Test Registry
// ============================================================================

/// Test registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registry reported an error.
    #[error("test registry error: {0}")]
    Registry(String),
}

/// Metadata surface mapping tests to their test stands.
pub trait TestRegistry {
    /// Resolves the test stand a test belongs to (`None` for unknown tests).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the lookup itself fails; an unknown
    /// test is `Ok(None)`, not an error.
    fn test_stand_of(&self, test_id: TestId) -> Result<Option<TestStandId>, RegistryError>;
}

// ============================================================================
// SECTION: Result Validator
// ============================================================================

/// Result validator errors.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Validator reported an error.
    #[error("result validator error: {0}")]
    Validator(String),
}

/// Payload validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    /// Payload is acceptable.
    Accepted,
    /// Payload is rejected with a description.
    Rejected(String),
}

/// Domain validation surface for save payloads.
///
/// Per-test numeric calculation rules live behind this trait; the engine
/// consumes the verdict without knowing the rules.
pub trait ResultValidator {
    /// Validates a save request's payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] when validation itself fails; a rejected
    /// payload is a [`ValidationOutcome::Rejected`], not an error.
    fn validate(&self, request: &SaveRequest) -> Result<ValidationOutcome, ValidatorError>;
}

/// Validator that accepts every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl ResultValidator for AcceptAllValidator {
    fn validate(&self, _request: &SaveRequest) -> Result<ValidationOutcome, ValidatorError> {
        Ok(ValidationOutcome::Accepted)
    }
}
