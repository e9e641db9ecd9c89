// crates/lab-results-store-sqlite/src/lib.rs
// ============================================================================
// Module: Lab Results SQLite Store Library
// Description: Durable TrialStore implementation backed by SQLite.
// Purpose: Expose the SQLite trial store and its configuration surface.
// Dependencies: lab-results-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate provides a durable [`lab_results_core::TrialStore`] backed by
//! `SQLite` in WAL mode. Batches apply inside immediate transactions with
//! snapshot verification, so a save planned from a stale read is refused
//! rather than committed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStoreConfig;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteTrialStore;
pub use store::SqliteTrialStoreError;
