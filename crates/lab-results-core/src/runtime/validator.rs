// crates/lab-results-core/src/runtime/validator.rs
// ============================================================================
// Module: Lab Results Transition Validator
// Description: Per-test status transition checks over catalog and workflow.
// Purpose: Decide transition legality and enumerate next possible statuses.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A transition is legal only when the catalog permits the move and the
//! target status lies in the test's workflow. Both checks must pass; the
//! catalog alone is insufficient because a workflow can carry a strict
//! subset of the catalog's statuses. A disallowed transition is a routine
//! decision carrying a reason, not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TestId;
use crate::core::status::StatusCatalog;
use crate::core::status::StatusCode;
use crate::core::status::StatusRecord;
use crate::core::workflow::WorkflowTable;

// ============================================================================
// SECTION: Transition Decisions
// ============================================================================

/// Outcome of a transition legality check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDecision {
    /// Whether the transition is legal.
    pub allowed: bool,
    /// Reason the transition was refused, when it was.
    pub reason: Option<String>,
}

impl TransitionDecision {
    /// Builds the allowed decision.
    #[must_use]
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Builds a refused decision with a reason.
    #[must_use]
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// SECTION: Transition Validator
// ============================================================================

/// Validates status transitions against a catalog and workflow table.
///
/// # Invariants
/// - A transition is allowed only when both the catalog transition set and
///   the test's workflow status flow contain the target status.
#[derive(Debug, Clone)]
pub struct TransitionValidator {
    /// Immutable status catalog.
    catalog: StatusCatalog,
    /// Immutable per-test workflow table.
    workflows: WorkflowTable,
}

impl TransitionValidator {
    /// Creates a validator over a catalog and workflow table.
    #[must_use]
    pub const fn new(catalog: StatusCatalog, workflows: WorkflowTable) -> Self {
        Self { catalog, workflows }
    }

    /// Returns the underlying status catalog.
    #[must_use]
    pub const fn catalog(&self) -> &StatusCatalog {
        &self.catalog
    }

    /// Returns the underlying workflow table.
    #[must_use]
    pub const fn workflows(&self) -> &WorkflowTable {
        &self.workflows
    }

    /// Decides whether `from -> to` is legal for a test.
    #[must_use]
    pub fn validate(&self, from: StatusCode, to: StatusCode, test_id: TestId) -> TransitionDecision {
        let Ok(from_record) = self.catalog.record(from) else {
            return TransitionDecision::refused("Invalid status or test workflow not found");
        };
        let Ok(workflow) = self.workflows.workflow(test_id) else {
            return TransitionDecision::refused("Invalid status or test workflow not found");
        };
        if from_record.transitions.contains(&to) && workflow.status_flow.contains(&to) {
            TransitionDecision::allowed()
        } else {
            TransitionDecision::refused("Status transition not allowed for this test")
        }
    }

    /// Lists the statuses reachable from `current` for a test, resolved to
    /// full catalog records.
    ///
    /// An unknown status or test yields the empty list.
    #[must_use]
    pub fn next_possible_statuses(
        &self,
        current: StatusCode,
        test_id: TestId,
    ) -> Vec<StatusRecord> {
        let Ok(record) = self.catalog.record(current) else {
            return Vec::new();
        };
        let Ok(workflow) = self.workflows.workflow(test_id) else {
            return Vec::new();
        };
        record
            .transitions
            .iter()
            .filter(|target| workflow.status_flow.contains(target))
            .filter_map(|target| self.catalog.record(*target).ok())
            .cloned()
            .collect()
    }
}
