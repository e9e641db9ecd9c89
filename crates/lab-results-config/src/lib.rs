// crates/lab-results-config/src/lib.rs
// ============================================================================
// Module: Lab Results Config Library
// Description: Strict TOML configuration for the lab results engine.
// Purpose: Expose fail-closed config loading and immutable table builders.
// Dependencies: lab-results-core, lab-results-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded once at process start from a TOML file and turned
//! into the immutable status, workflow, test, and qualification tables the
//! engine is constructed with. Loading fails closed on oversized files,
//! malformed paths, unknown fields, and tables that do not cross-validate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::EngineSettings;
pub use config::LabResultsConfig;
pub use config::QualificationEntry;
pub use config::StatusEntry;
pub use config::TestEntry;
pub use config::WorkflowEntry;
