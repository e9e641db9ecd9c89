// crates/lab-results-core/src/runtime/resolver.rs
// ============================================================================
// Module: Lab Results Qualification Resolver
// Description: Resolves employee capabilities for a test via its test stand.
// Purpose: Answer (employee, test) -> capability from the qualification table.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The resolver maps an employee and a test to a capability triple: the test
//! resolves to its test stand through the registry, and the employee's level
//! on that stand maps to a fixed capability. An unknown test or a missing
//! qualification yields the all-false capability; neither is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::identifiers::EmployeeId;
use crate::core::identifiers::TestId;
use crate::core::identifiers::TestStandId;
use crate::core::qualification::Capability;
use crate::core::qualification::QualificationTable;
use crate::interfaces::RegistryError;
use crate::interfaces::TestRegistry;

// ============================================================================
// SECTION: Table-Backed Registry
// ============================================================================

/// Test registry backed by an immutable test-to-stand table.
///
/// # Invariants
/// - Constructed once at startup; never mutated afterward.
#[derive(Debug, Clone, Default)]
pub struct TableTestRegistry {
    /// Test stand assignments keyed by test id.
    stands: BTreeMap<TestId, TestStandId>,
}

impl TableTestRegistry {
    /// Builds a registry from explicit assignments (later entries win on duplicate ids).
    #[must_use]
    pub fn new(assignments: Vec<(TestId, TestStandId)>) -> Self {
        Self {
            stands: assignments.into_iter().collect(),
        }
    }
}

impl TestRegistry for TableTestRegistry {
    fn test_stand_of(&self, test_id: TestId) -> Result<Option<TestStandId>, RegistryError> {
        Ok(self.stands.get(&test_id).copied())
    }
}

// ============================================================================
// SECTION: Qualification Resolver
// ============================================================================

/// Resolves capabilities from the qualification table.
///
/// # Invariants
/// - Resolution is a pure read; no state changes.
/// - Unknown tests and missing qualifications resolve to [`Capability::NONE`].
#[derive(Debug, Clone)]
pub struct QualificationResolver<R: TestRegistry> {
    /// Registry mapping tests to test stands.
    registry: R,
    /// Immutable qualification assignments.
    qualifications: QualificationTable,
}

impl<R: TestRegistry> QualificationResolver<R> {
    /// Creates a resolver over a registry and qualification table.
    #[must_use]
    pub const fn new(registry: R, qualifications: QualificationTable) -> Self {
        Self {
            registry,
            qualifications,
        }
    }

    /// Resolves the capability an employee holds for a test.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] only when the registry lookup itself fails.
    pub fn resolve(
        &self,
        employee: &EmployeeId,
        test_id: TestId,
    ) -> Result<Capability, RegistryError> {
        let Some(stand) = self.registry.test_stand_of(test_id)? else {
            return Ok(Capability::NONE);
        };
        let capability = self
            .qualifications
            .level(employee, stand)
            .map_or(Capability::NONE, Capability::from_level);
        Ok(capability)
    }
}
