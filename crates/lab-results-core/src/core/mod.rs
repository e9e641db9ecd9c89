// crates/lab-results-core/src/core/mod.rs
// ============================================================================
// Module: Lab Results Core Types
// Description: Canonical identifiers, tables, and record structures.
// Purpose: Provide stable, serializable types for the lab results engine.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types define the status catalog, workflow table, qualification model,
//! and trial record structures. These types are the canonical source of truth
//! for any derived API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod qualification;
pub mod status;
pub mod time;
pub mod trial;
pub mod workflow;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::EmployeeId;
pub use identifiers::SampleId;
pub use identifiers::TestId;
pub use identifiers::TestStandId;
pub use identifiers::TrialNumber;
pub use qualification::Capability;
pub use qualification::QualificationLevel;
pub use qualification::QualificationTable;
pub use status::CatalogError;
pub use status::StatusCatalog;
pub use status::StatusCode;
pub use status::StatusRecord;
pub use time::Timestamp;
pub use trial::SaveMode;
pub use trial::SaveRequest;
pub use trial::SaveResponse;
pub use trial::TrialEntry;
pub use trial::TrialRecord;
pub use workflow::TestWorkflow;
pub use workflow::WorkflowError;
pub use workflow::WorkflowTable;
