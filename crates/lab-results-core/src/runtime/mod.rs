// crates/lab-results-core/src/runtime/mod.rs
// ============================================================================
// Module: Lab Results Runtime
// Description: Qualification resolution, transition checks, and save execution.
// Purpose: Execute the workflow and authorization logic over the core tables.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement capability resolution, transition validation,
//! and the transactional save path. All write surfaces must call into the
//! same orchestrator logic to preserve the no-partial-write guarantee.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use orchestrator::SaveEngineConfig;
pub use orchestrator::SaveError;
pub use orchestrator::SaveOrchestrator;
pub use resolver::QualificationResolver;
pub use resolver::TableTestRegistry;
pub use store::InMemoryTrialStore;
pub use validator::TransitionDecision;
pub use validator::TransitionValidator;
