// crates/lab-results-config/src/config.rs
// ============================================================================
// Module: Lab Results Configuration
// Description: Configuration loading and validation for the lab results engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: lab-results-core, lab-results-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Status, workflow, test, and qualification tables omitted from the file
//! fall back to the built-in standard tables; tables that are present are
//! cross-validated before any engine is constructed. Missing or invalid
//! configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use lab_results_core::EmployeeId;
use lab_results_core::QualificationLevel;
use lab_results_core::QualificationTable;
use lab_results_core::SaveEngineConfig;
use lab_results_core::StatusCatalog;
use lab_results_core::StatusCode;
use lab_results_core::StatusRecord;
use lab_results_core::TableTestRegistry;
use lab_results_core::TestId;
use lab_results_core::TestStandId;
use lab_results_core::TestWorkflow;
use lab_results_core::WorkflowTable;
use lab_results_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "lab-results.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "LAB_RESULTS_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file I/O error.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config contents failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Lab results engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabResultsConfig {
    /// Trial store configuration.
    pub store: SqliteStoreConfig,
    /// Save engine settings.
    #[serde(default)]
    pub engine: EngineSettings,
    /// Status catalog entries (built-in standard catalog when empty).
    #[serde(default)]
    pub statuses: Vec<StatusEntry>,
    /// Workflow entries (built-in standard table when empty).
    #[serde(default)]
    pub workflows: Vec<WorkflowEntry>,
    /// Test-to-stand assignments.
    #[serde(default)]
    pub tests: Vec<TestEntry>,
    /// Qualification assignments.
    #[serde(default)]
    pub qualifications: Vec<QualificationEntry>,
}

/// Save engine settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    /// Test whose partial saves land on Partial rather than AcceptedPartial.
    #[serde(default = "default_ferrogram_test_id")]
    pub ferrogram_test_id: Option<TestId>,
    /// Maximum snapshot-apply attempts before a save fails on conflict.
    #[serde(default = "default_max_apply_attempts")]
    pub max_apply_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ferrogram_test_id: default_ferrogram_test_id(),
            max_apply_attempts: default_max_apply_attempts(),
        }
    }
}

/// Returns the default Ferrogram-class test id.
fn default_ferrogram_test_id() -> Option<TestId> {
    SaveEngineConfig::default().ferrogram_test_id
}

/// Returns the default apply attempt bound.
fn default_max_apply_attempts() -> u32 {
    SaveEngineConfig::default().max_apply_attempts
}

/// One status catalog entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusEntry {
    /// Status code (one-letter wire form).
    pub code: StatusCode,
    /// Human-readable description.
    pub description: String,
    /// Display color as a `#rrggbb` hex string.
    pub color: String,
    /// Statuses directly reachable from this one.
    pub transitions: Vec<StatusCode>,
    /// Whether rows at this status await review.
    #[serde(default)]
    pub requires_review: bool,
    /// Whether this status is terminal.
    #[serde(default)]
    pub is_final: bool,
}

/// One workflow entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowEntry {
    /// Test type this workflow applies to.
    pub test_id: TestId,
    /// Statuses reachable for this test, in workflow order.
    pub status_flow: Vec<StatusCode>,
    /// Whether results must be reviewed before validation.
    #[serde(default = "default_true")]
    pub review_required: bool,
    /// Whether partial saves are permitted.
    #[serde(default)]
    pub partial_save_allowed: bool,
    /// Whether entry-mode deletes are permitted.
    #[serde(default = "default_true")]
    pub delete_allowed: bool,
}

/// Returns true; serde default helper for flags that default on.
const fn default_true() -> bool {
    true
}

/// One test-to-stand assignment.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestEntry {
    /// Test identifier.
    pub test_id: TestId,
    /// Test stand the test belongs to.
    pub test_stand_id: TestStandId,
}

/// One qualification assignment.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualificationEntry {
    /// Employee holding the qualification.
    pub employee_id: EmployeeId,
    /// Test stand the qualification applies to.
    pub test_stand_id: TestStandId,
    /// Qualification level held.
    pub level: QualificationLevel,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl LabResultsConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the tables do not cross-validate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_apply_attempts == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_apply_attempts must be at least 1".to_string(),
            ));
        }

        let mut seen_statuses = Vec::new();
        for entry in &self.statuses {
            if seen_statuses.contains(&entry.code) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate status entry for code {}",
                    entry.code
                )));
            }
            seen_statuses.push(entry.code);
            if entry.is_final && !entry.transitions.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "final status {} must have no transitions",
                    entry.code
                )));
            }
        }

        let mut seen_tests = Vec::new();
        for entry in &self.workflows {
            if seen_tests.contains(&entry.test_id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate workflow entry for test {}",
                    entry.test_id
                )));
            }
            seen_tests.push(entry.test_id);
        }

        let catalog = self.status_catalog();
        self.workflow_table()
            .validate_against(&catalog)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;

        let mut seen_assignments = Vec::new();
        for entry in &self.qualifications {
            let key = (entry.employee_id.clone(), entry.test_stand_id);
            if seen_assignments.contains(&key) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate qualification for employee {} on stand {}",
                    entry.employee_id, entry.test_stand_id
                )));
            }
            seen_assignments.push(key);
        }
        Ok(())
    }

    /// Builds the status catalog (standard when no entries are configured).
    #[must_use]
    pub fn status_catalog(&self) -> StatusCatalog {
        if self.statuses.is_empty() {
            return StatusCatalog::standard();
        }
        StatusCatalog::new(
            self.statuses
                .iter()
                .map(|entry| StatusRecord {
                    code: entry.code,
                    description: entry.description.clone(),
                    color: entry.color.clone(),
                    transitions: entry.transitions.clone(),
                    requires_review: entry.requires_review,
                    is_final: entry.is_final,
                })
                .collect(),
        )
    }

    /// Builds the workflow table (standard when no entries are configured).
    #[must_use]
    pub fn workflow_table(&self) -> WorkflowTable {
        if self.workflows.is_empty() {
            return WorkflowTable::standard();
        }
        WorkflowTable::new(
            self.workflows
                .iter()
                .map(|entry| TestWorkflow {
                    test_id: entry.test_id,
                    status_flow: entry.status_flow.clone(),
                    review_required: entry.review_required,
                    partial_save_allowed: entry.partial_save_allowed,
                    delete_allowed: entry.delete_allowed,
                })
                .collect(),
        )
    }

    /// Builds the test registry from the configured assignments.
    #[must_use]
    pub fn test_registry(&self) -> TableTestRegistry {
        TableTestRegistry::new(
            self.tests
                .iter()
                .map(|entry| (entry.test_id, entry.test_stand_id))
                .collect(),
        )
    }

    /// Builds the qualification table from the configured assignments.
    #[must_use]
    pub fn qualification_table(&self) -> QualificationTable {
        QualificationTable::new(
            self.qualifications
                .iter()
                .map(|entry| (entry.employee_id.clone(), entry.test_stand_id, entry.level))
                .collect(),
        )
    }

    /// Builds the save engine configuration.
    #[must_use]
    pub const fn engine_config(&self) -> SaveEngineConfig {
        SaveEngineConfig {
            ferrogram_test_id: self.engine.ferrogram_test_id,
            max_apply_attempts: self.engine.max_apply_attempts,
        }
    }
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Resolves the config path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(explicit) = path {
        return Ok(explicit.to_path_buf());
    }
    if let Ok(from_env) = env::var(CONFIG_ENV_VAR)
        && !from_env.trim().is_empty()
    {
        return Ok(PathBuf::from(from_env));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates config paths for safety limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(
                "config path contains an overlong component".to_string(),
            ));
        }
    }
    Ok(())
}
