// crates/lab-results-core/src/core/workflow.rs
// ============================================================================
// Module: Lab Results Workflow Table
// Description: Per-test-type workflow definitions over the status catalog.
// Purpose: Restrict each test type to its reachable status subset and flags.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Each laboratory test type runs through a subset of the status catalog.
//! The workflow table records that subset (`status_flow`) along with the
//! review, partial-save, and delete flags. A status transition is legal only
//! when both the catalog and the test's workflow allow the target status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TestId;
use crate::core::status::StatusCatalog;
use crate::core::status::StatusCode;

// ============================================================================
// SECTION: Workflow Records
// ============================================================================

/// Workflow definition for one test type.
///
/// # Invariants
/// - `status_flow` lists the statuses reachable for this test, in workflow order.
/// - Flags gate request handling; they do not alter transition legality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestWorkflow {
    /// Test type this workflow applies to.
    pub test_id: TestId,
    /// Statuses reachable for this test, in workflow order.
    pub status_flow: Vec<StatusCode>,
    /// Whether results must be reviewed before validation.
    pub review_required: bool,
    /// Whether partial saves are permitted.
    pub partial_save_allowed: bool,
    /// Whether entry-mode deletes are permitted.
    pub delete_allowed: bool,
}

/// Errors raised by workflow lookups and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// Test has no workflow definition.
    #[error("unknown test: {test_id}")]
    UnknownTest {
        /// Test id with no workflow entry.
        test_id: TestId,
    },
    /// Workflow references a status absent from the catalog.
    #[error("workflow for test {test_id} references status {status} not in the catalog")]
    StatusNotInCatalog {
        /// Test whose workflow is invalid.
        test_id: TestId,
        /// Status missing from the catalog.
        status: StatusCode,
    },
    /// Workflow has an empty status flow.
    #[error("workflow for test {test_id} has an empty status flow")]
    EmptyStatusFlow {
        /// Test whose workflow is invalid.
        test_id: TestId,
    },
}

// ============================================================================
// SECTION: Workflow Table
// ============================================================================

/// Immutable table of per-test workflows.
///
/// # Invariants
/// - Constructed once at startup; never mutated afterward.
/// - Lookups for tests absent from the table fail with [`WorkflowError::UnknownTest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTable {
    /// Workflows keyed by test id.
    workflows: BTreeMap<TestId, TestWorkflow>,
}

impl WorkflowTable {
    /// Builds a table from explicit workflows (later entries win on duplicate test ids).
    #[must_use]
    pub fn new(workflows: Vec<TestWorkflow>) -> Self {
        let workflows = workflows
            .into_iter()
            .map(|workflow| (workflow.test_id, workflow))
            .collect();
        Self { workflows }
    }

    /// Builds the standard workflow table covering the laboratory's test types.
    ///
    /// Three workflow shapes exist: the plain entry/review flow, partial-save
    /// flows with and without a microscope stage, and the Ferrogram flow that
    /// carries every intermediate status.
    #[must_use]
    pub fn standard() -> Self {
        use StatusCode::AcceptedPartial;
        use StatusCode::NotStarted;
        use StatusCode::Partial;
        use StatusCode::ReadyForMicroscope;
        use StatusCode::Saved;
        use StatusCode::Training;
        use StatusCode::Validated;

        /// Builds one standard workflow entry (review and delete always on).
        fn workflow(raw_test_id: u16, flow: &[StatusCode], partial: bool) -> Option<TestWorkflow> {
            TestId::from_raw(raw_test_id).map(|test_id| TestWorkflow {
                test_id,
                status_flow: flow.to_vec(),
                review_required: true,
                partial_save_allowed: partial,
                delete_allowed: true,
            })
        }

        let plain: [StatusCode; 4] = [NotStarted, Training, Saved, Validated];
        let partial_flow: [StatusCode; 6] =
            [NotStarted, Training, AcceptedPartial, Partial, Saved, Validated];
        let microscope_flow: [StatusCode; 6] = [
            NotStarted,
            Training,
            AcceptedPartial,
            ReadyForMicroscope,
            Saved,
            Validated,
        ];
        let ferrogram_flow: [StatusCode; 7] = [
            NotStarted,
            Training,
            AcceptedPartial,
            Partial,
            ReadyForMicroscope,
            Saved,
            Validated,
        ];

        let plain_ids: [u16; 17] = [
            10, 30, 40, 70, 80, 110, 130, 140, 160, 170, 220, 230, 250, 270, 284, 285, 286,
        ];
        let partial_ids: [u16; 2] = [50, 60];
        let microscope_ids: [u16; 3] = [120, 180, 240];

        let mut workflows = Vec::new();
        for raw in plain_ids {
            workflows.extend(workflow(raw, &plain, false));
        }
        for raw in partial_ids {
            workflows.extend(workflow(raw, &partial_flow, true));
        }
        for raw in microscope_ids {
            workflows.extend(workflow(raw, &microscope_flow, true));
        }
        workflows.extend(workflow(210, &ferrogram_flow, true));

        Self::new(workflows)
    }

    /// Looks up the workflow for a test.
    ///
    /// # Errors
    /// Returns [`WorkflowError::UnknownTest`] when the test has no workflow.
    pub fn workflow(&self, test_id: TestId) -> Result<&TestWorkflow, WorkflowError> {
        self.workflows
            .get(&test_id)
            .ok_or(WorkflowError::UnknownTest { test_id })
    }

    /// Returns whether a test has a workflow definition.
    #[must_use]
    pub fn contains(&self, test_id: TestId) -> bool {
        self.workflows.contains_key(&test_id)
    }

    /// Iterates workflows in test-id order.
    pub fn iter(&self) -> impl Iterator<Item = &TestWorkflow> {
        self.workflows.values()
    }

    /// Cross-checks every workflow's status flow against a catalog.
    ///
    /// # Errors
    /// Returns [`WorkflowError::EmptyStatusFlow`] for an empty flow and
    /// [`WorkflowError::StatusNotInCatalog`] for a flow status the catalog
    /// does not define.
    pub fn validate_against(&self, catalog: &StatusCatalog) -> Result<(), WorkflowError> {
        for workflow in self.workflows.values() {
            if workflow.status_flow.is_empty() {
                return Err(WorkflowError::EmptyStatusFlow {
                    test_id: workflow.test_id,
                });
            }
            for status in &workflow.status_flow {
                if !catalog.contains(*status) {
                    return Err(WorkflowError::StatusNotInCatalog {
                        test_id: workflow.test_id,
                        status: *status,
                    });
                }
            }
        }
        Ok(())
    }
}
