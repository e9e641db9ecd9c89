// crates/lab-results-core/src/core/time.rs
// ============================================================================
// Module: Lab Results Time Model
// Description: Canonical timestamp representation for entry and validation stamps.
// Purpose: Provide deterministic, host-supplied time values for trial records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Trial records carry entry and validation stamps as explicit time values.
//! The engine never reads wall-clock time directly; hosts supply timestamps
//! with each save request, which keeps save processing replayable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in trial entry and validation stamps.
///
/// # Invariants
/// - Values are explicitly provided by callers; the engine never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}
