// crates/lab-results-core/src/runtime/store.rs
// ============================================================================
// Module: Lab Results In-Memory Store
// Description: In-memory trial store for tests, examples, and ephemeral runs.
// Purpose: Provide a snapshot-verifying TrialStore without external storage.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The in-memory store keeps trial rows in a mutex-guarded map and honors
//! the same snapshot-verification contract as durable stores: a batch whose
//! planning snapshot no longer matches the live rows is refused with a
//! conflict and nothing is applied. An injectable failure count lets tests
//! exercise the orchestrator's no-partial-write guarantee.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::identifiers::SampleId;
use crate::core::identifiers::TestId;
use crate::core::identifiers::TrialNumber;
use crate::core::status::StatusCode;
use crate::core::trial::TrialRecord;
use crate::interfaces::StoreError;
use crate::interfaces::TrialBatch;
use crate::interfaces::TrialMutation;
use crate::interfaces::TrialStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Row key within the in-memory map.
type RowKey = (SampleId, TestId, TrialNumber);

/// In-memory trial store.
///
/// # Invariants
/// - `apply` verifies the batch snapshot before mutating; a conflict leaves
///   the map untouched.
/// - Cloning the store shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrialStore {
    /// Trial rows keyed by (sample, test, trial).
    rows: Arc<Mutex<BTreeMap<RowKey, TrialRecord>>>,
    /// Number of upcoming applies to fail, for fault-injection tests.
    fail_applies: Arc<Mutex<u32>>,
}

impl InMemoryTrialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arranges for the next `count` applies to fail with a store error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the internal lock is poisoned.
    pub fn fail_next_applies(&self, count: u32) -> Result<(), StoreError> {
        let mut failures = lock(&self.fail_applies)?;
        *failures = count;
        Ok(())
    }

    /// Returns the total number of rows across all pairs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the internal lock is poisoned.
    pub fn row_count(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.rows)?.len())
    }
}

/// Locks a mutex, mapping poisoning into a store error.
fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Store("in-memory store lock poisoned".to_owned()))
}

/// Collects the live (trial, status) pairs for one (sample, test) pair.
fn live_statuses(
    rows: &BTreeMap<RowKey, TrialRecord>,
    sample_id: SampleId,
    test_id: TestId,
) -> Vec<(TrialNumber, StatusCode)> {
    rows.iter()
        .filter(|((sample, test, _), _)| *sample == sample_id && *test == test_id)
        .map(|((_, _, trial), row)| (*trial, row.status))
        .collect()
}

impl TrialStore for InMemoryTrialStore {
    fn list_trials(
        &self,
        sample_id: SampleId,
        test_id: TestId,
    ) -> Result<Vec<TrialRecord>, StoreError> {
        let rows = lock(&self.rows)?;
        Ok(rows
            .iter()
            .filter(|((sample, test, _), _)| *sample == sample_id && *test == test_id)
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn apply(&self, batch: &TrialBatch) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows)?;

        let live = live_statuses(&rows, batch.sample_id, batch.test_id);
        let mut expected = batch.expected.clone();
        expected.sort_unstable_by_key(|(trial, _)| *trial);
        if live != expected {
            return Err(StoreError::Conflict(format!(
                "rows for sample {} test {} moved since the batch was planned",
                batch.sample_id, batch.test_id
            )));
        }

        {
            let mut failures = lock(&self.fail_applies)?;
            if *failures > 0 {
                *failures -= 1;
                return Err(StoreError::Store("injected apply failure".to_owned()));
            }
        }

        // Stage on a copy so a malformed batch cannot leave partial effects.
        let mut staged = rows.clone();
        for mutation in &batch.mutations {
            match mutation {
                TrialMutation::Upsert(record) => {
                    staged.insert(
                        (record.sample_id, record.test_id, record.trial_number),
                        record.clone(),
                    );
                }
                TrialMutation::DeleteAll => {
                    staged.retain(|(sample, test, _), _| {
                        *sample != batch.sample_id || *test != batch.test_id
                    });
                }
            }
        }
        *rows = staged;
        Ok(())
    }
}
