// crates/lab-results-core/src/core/status.rs
// ============================================================================
// Module: Lab Results Status Catalog
// Description: Closed status code set and the per-status transition catalog.
// Purpose: Define workflow statuses, their flags, and allowed direct transitions.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every trial row carries exactly one status from a closed set of eight
//! codes. The catalog records each status's description, display color,
//! allowed direct transitions, and review/terminal flags. Codes cross the
//! wire as one-letter strings and are decoded into [`StatusCode`] once at
//! the boundary; all internal logic works on the enum.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Status Codes
// ============================================================================

/// Closed set of trial workflow statuses.
///
/// # Invariants
/// - The wire form of each code is the single letter in its serde rename.
/// - `Validated` and `Cancelled` are terminal in the standard catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusCode {
    /// Not started; no results entered yet.
    #[serde(rename = "X")]
    NotStarted,
    /// Entered by a trainee-level technician.
    #[serde(rename = "T")]
    Training,
    /// Partial results accepted for a multi-trial test.
    #[serde(rename = "A")]
    AcceptedPartial,
    /// Partial results saved mid-entry.
    #[serde(rename = "P")]
    Partial,
    /// Results saved and awaiting microscope work.
    #[serde(rename = "E")]
    ReadyForMicroscope,
    /// Results saved and awaiting review.
    #[serde(rename = "S")]
    Saved,
    /// Results reviewed and accepted; terminal.
    #[serde(rename = "D")]
    Validated,
    /// Test cancelled; terminal.
    #[serde(rename = "C")]
    Cancelled,
}

impl StatusCode {
    /// All status codes in catalog order.
    pub const ALL: [Self; 8] = [
        Self::NotStarted,
        Self::Training,
        Self::AcceptedPartial,
        Self::Partial,
        Self::ReadyForMicroscope,
        Self::Saved,
        Self::Validated,
        Self::Cancelled,
    ];

    /// Decodes a one-letter wire code (returns `None` for unknown letters).
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'X' => Some(Self::NotStarted),
            'T' => Some(Self::Training),
            'A' => Some(Self::AcceptedPartial),
            'P' => Some(Self::Partial),
            'E' => Some(Self::ReadyForMicroscope),
            'S' => Some(Self::Saved),
            'D' => Some(Self::Validated),
            'C' => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns the one-letter wire code.
    #[must_use]
    pub const fn as_code(self) -> char {
        match self {
            Self::NotStarted => 'X',
            Self::Training => 'T',
            Self::AcceptedPartial => 'A',
            Self::Partial => 'P',
            Self::ReadyForMicroscope => 'E',
            Self::Saved => 'S',
            Self::Validated => 'D',
            Self::Cancelled => 'C',
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

// ============================================================================
// SECTION: Status Records
// ============================================================================

/// Catalog entry describing one status.
///
/// # Invariants
/// - `transitions` lists direct successors only; reachability is not transitive.
/// - A status with `is_final` set has an empty transition set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Status code this record describes.
    pub code: StatusCode,
    /// Human-readable description.
    pub description: String,
    /// Display color as a `#rrggbb` hex string.
    pub color: String,
    /// Statuses directly reachable from this one.
    pub transitions: Vec<StatusCode>,
    /// Whether rows at this status await review.
    pub requires_review: bool,
    /// Whether this status is terminal.
    pub is_final: bool,
}

/// Errors raised by catalog lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Status code is not present in the catalog.
    #[error("unknown status code: {code}")]
    UnknownStatus {
        /// Missing status code.
        code: StatusCode,
    },
}

// ============================================================================
// SECTION: Status Catalog
// ============================================================================

/// Immutable per-status transition catalog.
///
/// # Invariants
/// - Constructed once at startup; never mutated afterward.
/// - Lookups for codes absent from the catalog fail with [`CatalogError::UnknownStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCatalog {
    /// Status records keyed by code.
    records: BTreeMap<StatusCode, StatusRecord>,
}

impl StatusCatalog {
    /// Builds a catalog from explicit records (later records win on duplicate codes).
    #[must_use]
    pub fn new(records: Vec<StatusRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.code, record))
            .collect();
        Self { records }
    }

    /// Builds the standard eight-status catalog.
    #[must_use]
    pub fn standard() -> Self {
        /// Shorthand for building one standard catalog record.
        fn record(
            code: StatusCode,
            description: &str,
            color: &str,
            transitions: &[StatusCode],
            requires_review: bool,
            is_final: bool,
        ) -> StatusRecord {
            StatusRecord {
                code,
                description: description.to_owned(),
                color: color.to_owned(),
                transitions: transitions.to_vec(),
                requires_review,
                is_final,
            }
        }

        use StatusCode::AcceptedPartial;
        use StatusCode::Cancelled;
        use StatusCode::NotStarted;
        use StatusCode::Partial;
        use StatusCode::ReadyForMicroscope;
        use StatusCode::Saved;
        use StatusCode::Training;
        use StatusCode::Validated;

        Self::new(vec![
            record(
                NotStarted,
                "Not Started",
                "#6c757d",
                &[Training, Saved, AcceptedPartial, Partial],
                false,
                false,
            ),
            record(
                Training,
                "Training",
                "#ffc107",
                &[Saved, AcceptedPartial, Partial, ReadyForMicroscope],
                false,
                false,
            ),
            record(
                AcceptedPartial,
                "Accepted (Partial)",
                "#17a2b8",
                &[Saved, Partial, ReadyForMicroscope],
                false,
                false,
            ),
            record(
                Partial,
                "Partial",
                "#fd7e14",
                &[Saved, ReadyForMicroscope],
                false,
                false,
            ),
            record(
                ReadyForMicroscope,
                "Ready for Microscope",
                "#6f42c1",
                &[Saved, Validated],
                true,
                false,
            ),
            record(Saved, "Saved", "#28a745", &[Validated], true, false),
            record(Validated, "Validated", "#007bff", &[], false, true),
            record(Cancelled, "Cancelled", "#dc3545", &[], false, true),
        ])
    }

    /// Looks up the record for a status code.
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownStatus`] when the code is absent.
    pub fn record(&self, code: StatusCode) -> Result<&StatusRecord, CatalogError> {
        self.records
            .get(&code)
            .ok_or(CatalogError::UnknownStatus { code })
    }

    /// Returns whether `from` may transition directly to `to`.
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownStatus`] when `from` is absent.
    pub fn can_transition(&self, from: StatusCode, to: StatusCode) -> Result<bool, CatalogError> {
        Ok(self.record(from)?.transitions.contains(&to))
    }

    /// Returns whether a status is terminal.
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownStatus`] when the code is absent.
    pub fn is_final(&self, code: StatusCode) -> Result<bool, CatalogError> {
        Ok(self.record(code)?.is_final)
    }

    /// Returns whether rows at a status await review.
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownStatus`] when the code is absent.
    pub fn requires_review(&self, code: StatusCode) -> Result<bool, CatalogError> {
        Ok(self.record(code)?.requires_review)
    }

    /// Returns whether a status code is present in the catalog.
    #[must_use]
    pub fn contains(&self, code: StatusCode) -> bool {
        self.records.contains_key(&code)
    }

    /// Iterates catalog records in code order.
    pub fn iter(&self) -> impl Iterator<Item = &StatusRecord> {
        self.records.values()
    }
}
