// crates/lab-results-core/src/lib.rs
// ============================================================================
// Module: Lab Results Core Library
// Description: Public API surface for the lab results workflow engine.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Lab results core provides qualification resolution, status transition
//! validation, and transactional save orchestration for used-lubricant
//! laboratory samples. It is backend-agnostic and integrates through
//! explicit interfaces rather than embedding into a storage layer.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AcceptAllValidator;
pub use interfaces::RegistryError;
pub use interfaces::ResultValidator;
pub use interfaces::StoreError;
pub use interfaces::TestRegistry;
pub use interfaces::TrialBatch;
pub use interfaces::TrialMutation;
pub use interfaces::TrialStore;
pub use interfaces::ValidationOutcome;
pub use interfaces::ValidatorError;
pub use runtime::InMemoryTrialStore;
pub use runtime::QualificationResolver;
pub use runtime::SaveEngineConfig;
pub use runtime::SaveError;
pub use runtime::SaveOrchestrator;
pub use runtime::TableTestRegistry;
pub use runtime::TransitionDecision;
pub use runtime::TransitionValidator;
