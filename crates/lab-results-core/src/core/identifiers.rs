// crates/lab-results-core/src/core/identifiers.rs
// ============================================================================
// Module: Lab Results Identifiers
// Description: Canonical opaque identifiers for samples, tests, and personnel.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout the lab
//! results engine. Identifiers are opaque and serialize as numbers or
//! strings on the wire. Numeric identifiers enforce non-zero, 1-based
//! invariants at construction boundaries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU16;
use std::num::NonZeroU32;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Used-lubricant sample identifier.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(NonZeroU32);

impl SampleId {
    /// Creates a new sample identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU32) -> Self {
        Self(id)
    }

    /// Creates a sample identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Laboratory test type identifier.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(NonZeroU16);

impl TestId {
    /// Creates a new test identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU16) -> Self {
        Self(id)
    }

    /// Creates a test identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        NonZeroU16::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Test stand identifier grouping tests that share a qualification pool.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestStandId(NonZeroU16);

impl TestStandId {
    /// Creates a new test stand identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU16) -> Self {
        Self(id)
    }

    /// Creates a test stand identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        NonZeroU16::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for TestStandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Trial number within a (sample, test) pair.
///
/// # Invariants
/// - Always >= 1; trial zero does not exist and is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialNumber(NonZeroU16);

impl TrialNumber {
    /// The first trial for any (sample, test) pair.
    pub const FIRST: Self = Self(NonZeroU16::MIN);

    /// Creates a new trial number from a non-zero value.
    #[must_use]
    pub const fn new(number: NonZeroU16) -> Self {
        Self(number)
    }

    /// Creates a trial number from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        NonZeroU16::new(raw).map(Self)
    }

    /// Returns the raw trial number (always >= 1).
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for TrialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Employee identifier supplied by the caller's authentication context.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Creates a new employee identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EmployeeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EmployeeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
