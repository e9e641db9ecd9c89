// crates/lab-results-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Lab Results Save Orchestrator
// Description: Transactional save entry point for entry and review modes.
// Purpose: Authorize, validate, plan, and atomically apply trial batches.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The save orchestrator is the single write path for trial results. Every
//! save follows the same protocol: authorize the employee for the mode,
//! validate the payload, plan the batch of row mutations from a snapshot of
//! the persisted rows, and apply the batch atomically. The store verifies
//! the snapshot inside its write transaction; when rows moved concurrently
//! the apply is refused, the orchestrator re-reads and replans, and after a
//! bounded number of attempts the save fails. A stale read is never
//! committed, and a failed save leaves the rows untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::EmployeeId;
use crate::core::identifiers::TestId;
use crate::core::identifiers::TrialNumber;
use crate::core::qualification::Capability;
use crate::core::status::StatusCode;
use crate::core::time::Timestamp;
use crate::core::trial::SaveMode;
use crate::core::trial::SaveRequest;
use crate::core::trial::SaveResponse;
use crate::core::trial::TrialEntry;
use crate::core::trial::TrialRecord;
use crate::interfaces::RegistryError;
use crate::interfaces::ResultValidator;
use crate::interfaces::StoreError;
use crate::interfaces::TestRegistry;
use crate::interfaces::TrialBatch;
use crate::interfaces::TrialMutation;
use crate::interfaces::TrialStore;
use crate::interfaces::ValidationOutcome;
use crate::interfaces::ValidatorError;
use crate::runtime::resolver::QualificationResolver;
use crate::runtime::validator::TransitionValidator;

// ============================================================================
// SECTION: Engine Configuration
// ============================================================================

/// Configuration for the save orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveEngineConfig {
    /// Test id whose partial saves map to `Partial` rather than
    /// `AcceptedPartial` (the Ferrogram-class test), when one exists.
    pub ferrogram_test_id: Option<TestId>,
    /// Maximum snapshot-apply attempts before a save fails on conflict.
    pub max_apply_attempts: u32,
}

impl Default for SaveEngineConfig {
    fn default() -> Self {
        Self {
            ferrogram_test_id: TestId::from_raw(210),
            max_apply_attempts: 3,
        }
    }
}

// ============================================================================
// SECTION: Save Errors
// ============================================================================

/// Errors raised by the save orchestrator.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Test has no workflow definition.
    #[error("unknown test: {test_id}")]
    UnknownTest {
        /// Test id with no workflow entry.
        test_id: TestId,
    },
    /// Employee lacks the capability the mode requires.
    #[error("not authorized: {0}")]
    Unauthorized(String),
    /// Payload or request flags failed validation.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    /// The atomic apply failed; nothing was committed.
    #[error("transaction failed: {0}")]
    Transaction(String),
    /// Test registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Result validator failed.
    #[error(transparent)]
    Validator(#[from] ValidatorError),
    /// Trial store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Save Orchestrator
// ============================================================================

/// Transactional save engine for trial results.
///
/// # Invariants
/// - Authorization and payload validation run before any store write.
/// - Batches commit atomically; a refused or failed batch leaves rows unchanged.
/// - Planning snapshots are verified by the store; stale plans are replanned.
pub struct SaveOrchestrator<R: TestRegistry, V, S> {
    /// Capability resolution for the requesting employee.
    resolver: QualificationResolver<R>,
    /// Domain payload validator.
    validator: V,
    /// Status transition validator.
    transitions: TransitionValidator,
    /// Trial row persistence.
    store: S,
    /// Engine configuration.
    config: SaveEngineConfig,
}

impl<R, V, S> SaveOrchestrator<R, V, S>
where
    R: TestRegistry,
    V: ResultValidator,
    S: TrialStore,
{
    /// Creates a save orchestrator over its collaborators.
    #[must_use]
    pub const fn new(
        resolver: QualificationResolver<R>,
        validator: V,
        transitions: TransitionValidator,
        store: S,
        config: SaveEngineConfig,
    ) -> Self {
        Self {
            resolver,
            validator,
            transitions,
            store,
            config,
        }
    }

    /// Returns the transition validator backing this orchestrator.
    #[must_use]
    pub const fn transitions(&self) -> &TransitionValidator {
        &self.transitions
    }

    /// Returns the trial store backing this orchestrator.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Executes a save request and reports the outcome as a response.
    ///
    /// Every failure class surfaces as an unsuccessful response carrying the
    /// failure description; no partial write is ever left behind.
    #[must_use]
    pub fn save(
        &self,
        request: &SaveRequest,
        employee: &EmployeeId,
        saved_at: Timestamp,
    ) -> SaveResponse {
        match self.execute(request, employee, saved_at) {
            Ok(()) => SaveResponse::ok(),
            Err(error) => SaveResponse::failure(error.to_string()),
        }
    }

    /// Executes a save request.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] when authorization, validation, planning, or the
    /// atomic apply fails. No rows are modified on any error.
    pub fn execute(
        &self,
        request: &SaveRequest,
        employee: &EmployeeId,
        saved_at: Timestamp,
    ) -> Result<(), SaveError> {
        let capability = self.resolver.resolve(employee, request.test_id)?;
        self.authorize_mode(request, employee, capability)?;

        if let ValidationOutcome::Rejected(reason) = self.validator.validate(request)? {
            return Err(SaveError::ValidationFailed(reason));
        }

        let workflow =
            self.transitions
                .workflows()
                .workflow(request.test_id)
                .map_err(|_| SaveError::UnknownTest {
                    test_id: request.test_id,
                })?;

        if request.mode == SaveMode::Entry {
            if request.is_partial_save && !workflow.partial_save_allowed {
                return Err(SaveError::ValidationFailed(format!(
                    "partial save is not permitted for test {}",
                    request.test_id
                )));
            }
            if request.is_delete && !workflow.delete_allowed {
                return Err(SaveError::ValidationFailed(format!(
                    "delete is not permitted for test {}",
                    request.test_id
                )));
            }
        }

        self.apply_with_retry(request, employee, saved_at, capability)
    }

    /// Checks the mode-level capability gate.
    fn authorize_mode(
        &self,
        request: &SaveRequest,
        employee: &EmployeeId,
        capability: Capability,
    ) -> Result<(), SaveError> {
        let permitted = match request.mode {
            SaveMode::Entry => capability.can_enter,
            SaveMode::ReviewAccept | SaveMode::ReviewReject => capability.can_review,
        };
        if permitted {
            Ok(())
        } else {
            let action = match request.mode {
                SaveMode::Entry => "enter results",
                SaveMode::ReviewAccept | SaveMode::ReviewReject => "review results",
            };
            Err(SaveError::Unauthorized(format!(
                "employee {employee} may not {action} for test {}",
                request.test_id
            )))
        }
    }

    /// Plans and applies the batch, replanning on snapshot conflicts.
    fn apply_with_retry(
        &self,
        request: &SaveRequest,
        employee: &EmployeeId,
        saved_at: Timestamp,
        capability: Capability,
    ) -> Result<(), SaveError> {
        let attempts = self.config.max_apply_attempts.max(1);
        for attempt in 0..attempts {
            let snapshot = self.store.list_trials(request.sample_id, request.test_id)?;

            if request.mode == SaveMode::ReviewAccept && snapshot.is_empty() {
                return Ok(());
            }

            let batch = self.plan(request, employee, saved_at, capability, &snapshot)?;
            match self.store.apply(&batch) {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict(_)) if attempt + 1 < attempts => {
                    // Rows moved under the plan; re-read and replan.
                }
                Err(StoreError::Conflict(reason)) => {
                    return Err(SaveError::Transaction(format!(
                        "concurrent modification persisted after {attempts} attempts: {reason}"
                    )));
                }
                Err(error) => return Err(error.into()),
            }
        }
        Err(SaveError::Transaction(
            "save attempts exhausted without commit".to_owned(),
        ))
    }

    /// Plans the batch of mutations for one save request.
    fn plan(
        &self,
        request: &SaveRequest,
        employee: &EmployeeId,
        saved_at: Timestamp,
        capability: Capability,
        snapshot: &[TrialRecord],
    ) -> Result<TrialBatch, SaveError> {
        let expected = snapshot
            .iter()
            .map(|row| (row.trial_number, row.status))
            .collect();
        let mutations = match request.mode {
            SaveMode::Entry => self.plan_entry(request, employee, saved_at, snapshot)?,
            SaveMode::ReviewAccept => {
                plan_review_accept(employee, saved_at, capability, snapshot)?
            }
            SaveMode::ReviewReject => {
                plan_review_reject(request, employee, capability, snapshot)?
            }
        };
        Ok(TrialBatch {
            sample_id: request.sample_id,
            test_id: request.test_id,
            expected,
            mutations,
        })
    }

    /// Plans entry-mode mutations: delete-all, or one upsert per submitted trial.
    fn plan_entry(
        &self,
        request: &SaveRequest,
        employee: &EmployeeId,
        saved_at: Timestamp,
        snapshot: &[TrialRecord],
    ) -> Result<Vec<TrialMutation>, SaveError> {
        if request.is_delete {
            return Ok(vec![TrialMutation::DeleteAll]);
        }

        let determined = self.determine_entry_status(request);
        let mut mutations = Vec::with_capacity(request.entries.len());
        for entry in &request.entries {
            let existing = find_trial(snapshot, entry.trial_number);
            let current = existing.map_or(StatusCode::NotStarted, |row| row.status);
            // Resubmitting at the same status is idempotent; only moves are checked.
            if current != determined {
                let decision = self.transitions.validate(current, determined, request.test_id);
                if !decision.allowed {
                    let reason = decision.reason.unwrap_or_else(|| {
                        "Status transition not allowed for this test".to_owned()
                    });
                    return Err(SaveError::Transaction(format!(
                        "trial {} may not move from {current} to {determined}: {reason}",
                        entry.trial_number
                    )));
                }
            }
            mutations.push(TrialMutation::Upsert(build_entry_row(
                request, entry, existing, determined, employee, saved_at,
            )));
        }
        Ok(mutations)
    }

    /// Determines the status every entry-mode row lands on.
    fn determine_entry_status(&self, request: &SaveRequest) -> StatusCode {
        if request.is_partial_save {
            if Some(request.test_id) == self.config.ferrogram_test_id {
                StatusCode::Partial
            } else {
                StatusCode::AcceptedPartial
            }
        } else if request.is_media_ready {
            StatusCode::ReadyForMicroscope
        } else {
            StatusCode::Saved
        }
    }
}

// ============================================================================
// SECTION: Planning Helpers
// ============================================================================

/// Plans review-accept mutations: every row moves to `Validated` with stamps.
fn plan_review_accept(
    employee: &EmployeeId,
    saved_at: Timestamp,
    capability: Capability,
    snapshot: &[TrialRecord],
) -> Result<Vec<TrialMutation>, SaveError> {
    check_self_review(employee, capability, snapshot)?;
    Ok(snapshot
        .iter()
        .map(|row| {
            let mut accepted = row.clone();
            accepted.status = StatusCode::Validated;
            accepted.validate_id = Some(employee.clone());
            accepted.validate_date = Some(saved_at);
            TrialMutation::Upsert(accepted)
        })
        .collect())
}

/// Plans review-reject mutations: discard every row and restart the pair at
/// trial one with `AcceptedPartial`.
fn plan_review_reject(
    request: &SaveRequest,
    employee: &EmployeeId,
    capability: Capability,
    snapshot: &[TrialRecord],
) -> Result<Vec<TrialMutation>, SaveError> {
    check_self_review(employee, capability, snapshot)?;
    Ok(vec![
        TrialMutation::DeleteAll,
        TrialMutation::Upsert(blank_reject_row(request)),
    ])
}

/// Finds a snapshot row by trial number.
fn find_trial(snapshot: &[TrialRecord], trial_number: TrialNumber) -> Option<&TrialRecord> {
    snapshot.iter().find(|row| row.trial_number == trial_number)
}

/// Refuses a review touching the reviewer's own rows without that capability.
fn check_self_review(
    employee: &EmployeeId,
    capability: Capability,
    snapshot: &[TrialRecord],
) -> Result<(), SaveError> {
    if capability.can_review_own {
        return Ok(());
    }
    let touches_own = snapshot
        .iter()
        .any(|row| row.entry_id.as_ref() == Some(employee));
    if touches_own {
        return Err(SaveError::Unauthorized(format!(
            "employee {employee} may not review their own entries"
        )));
    }
    Ok(())
}

/// Builds the upserted row for one entry-mode trial.
///
/// Entry stamps are set on insert and preserved on update; the first enterer
/// stays on record.
fn build_entry_row(
    request: &SaveRequest,
    entry: &TrialEntry,
    existing: Option<&TrialRecord>,
    determined: StatusCode,
    employee: &EmployeeId,
    saved_at: Timestamp,
) -> TrialRecord {
    let (entry_id, entry_date) = existing.map_or_else(
        || (Some(employee.clone()), Some(saved_at)),
        |row| (row.entry_id.clone(), row.entry_date),
    );
    TrialRecord {
        sample_id: request.sample_id,
        test_id: request.test_id,
        trial_number: entry.trial_number,
        value1: entry.value1,
        value2: entry.value2,
        value3: entry.value3,
        trial_calc: entry.trial_calc,
        id1: entry.id1.clone(),
        id2: entry.id2.clone(),
        id3: entry.id3.clone(),
        status: determined,
        main_comments: entry.main_comments.clone(),
        entry_id,
        entry_date,
        validate_id: None,
        validate_date: None,
    }
}

/// Builds the single fresh row a review-reject leaves behind.
fn blank_reject_row(request: &SaveRequest) -> TrialRecord {
    TrialRecord {
        sample_id: request.sample_id,
        test_id: request.test_id,
        trial_number: TrialNumber::FIRST,
        value1: None,
        value2: None,
        value3: None,
        trial_calc: None,
        id1: None,
        id2: None,
        id3: None,
        status: StatusCode::AcceptedPartial,
        main_comments: None,
        entry_id: None,
        entry_date: None,
        validate_id: None,
        validate_date: None,
    }
}
