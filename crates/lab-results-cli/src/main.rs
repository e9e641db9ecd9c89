// crates/lab-results-cli/src/main.rs
// ============================================================================
// Module: Lab Results CLI Entry Point
// Description: Command dispatcher for workflow queries and batch saves.
// Purpose: Provide an operator CLI over the lab results engine and store.
// Dependencies: clap, lab-results-config, lab-results-core, lab-results-store-sqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The lab results CLI loads configuration, builds the immutable tables,
//! opens the `SQLite` trial store, and drives the save orchestrator. Output
//! is JSON on stdout; failures map to a non-zero exit code. Inputs are
//! untrusted and validated before use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Parser;
use clap::Subcommand;
use lab_results_config::LabResultsConfig;
use lab_results_core::AcceptAllValidator;
use lab_results_core::EmployeeId;
use lab_results_core::QualificationResolver;
use lab_results_core::SampleId;
use lab_results_core::SaveMode;
use lab_results_core::SaveOrchestrator;
use lab_results_core::SaveRequest;
use lab_results_core::StatusCode;
use lab_results_core::TableTestRegistry;
use lab_results_core::TestId;
use lab_results_core::Timestamp;
use lab_results_core::TransitionValidator;
use lab_results_core::TrialEntry;
use lab_results_store_sqlite::SqliteTrialStore;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a trial entries JSON input file.
const MAX_ENTRIES_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "lab-results", version, about = "Lab test-result workflow engine")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the workflow definition for a test.
    Workflow {
        /// Test identifier.
        #[arg(long)]
        test: u16,
    },
    /// List the statuses reachable from a current status for a test.
    Next {
        /// Test identifier.
        #[arg(long)]
        test: u16,
        /// Current status code (one-letter wire form).
        #[arg(long)]
        status: String,
    },
    /// Resolve the capability an employee holds for a test.
    Resolve {
        /// Employee identifier.
        #[arg(long)]
        employee: String,
        /// Test identifier.
        #[arg(long)]
        test: u16,
    },
    /// Execute a batch save for one (sample, test) pair.
    Save {
        /// Employee identifier performing the save.
        #[arg(long)]
        employee: String,
        /// Sample identifier.
        #[arg(long)]
        sample: u32,
        /// Test identifier.
        #[arg(long)]
        test: u16,
        /// Save mode (entry, reviewaccept, reviewreject; case-insensitive).
        #[arg(long)]
        mode: String,
        /// Path to a JSON array of trial entries (entry mode).
        #[arg(long, value_name = "PATH")]
        entries: Option<PathBuf>,
        /// Mark the save as an intentionally incomplete partial save.
        #[arg(long)]
        partial: bool,
        /// Mark the results as ready for the microscope stage.
        #[arg(long)]
        media_ready: bool,
        /// Delete all trial rows for the pair instead of writing.
        #[arg(long)]
        delete: bool,
    },
    /// List every trial row awaiting review.
    PendingReview,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self { message }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = LabResultsConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;

    match cli.command {
        Commands::Workflow { test } => command_workflow(&config, test),
        Commands::Next { test, status } => command_next(&config, test, &status),
        Commands::Resolve { employee, test } => command_resolve(&config, &employee, test),
        Commands::Save {
            employee,
            sample,
            test,
            mode,
            entries,
            partial,
            media_ready,
            delete,
        } => {
            let options = SaveOptions {
                employee,
                sample,
                test,
                mode,
                entries,
                partial,
                media_ready,
                delete,
            };
            command_save(&config, options)
        }
        Commands::PendingReview => command_pending_review(&config),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Prints the workflow definition for one test.
fn command_workflow(config: &LabResultsConfig, raw_test: u16) -> CliResult<ExitCode> {
    let test_id = parse_test_id(raw_test)?;
    let workflows = config.workflow_table();
    let workflow = workflows
        .workflow(test_id)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(workflow)?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the statuses reachable from a current status for one test.
fn command_next(config: &LabResultsConfig, raw_test: u16, raw_status: &str) -> CliResult<ExitCode> {
    let test_id = parse_test_id(raw_test)?;
    let status = parse_status(raw_status)?;
    let validator = TransitionValidator::new(config.status_catalog(), config.workflow_table());
    let next = validator.next_possible_statuses(status, test_id);
    write_json(&next)?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the capability an employee holds for one test.
fn command_resolve(
    config: &LabResultsConfig,
    employee: &str,
    raw_test: u16,
) -> CliResult<ExitCode> {
    let test_id = parse_test_id(raw_test)?;
    let resolver =
        QualificationResolver::new(config.test_registry(), config.qualification_table());
    let capability = resolver
        .resolve(&EmployeeId::new(employee), test_id)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&capability)?;
    Ok(ExitCode::SUCCESS)
}

/// Arguments for the save command.
struct SaveOptions {
    /// Employee identifier performing the save.
    employee: String,
    /// Sample identifier.
    sample: u32,
    /// Test identifier.
    test: u16,
    /// Raw save mode string.
    mode: String,
    /// Optional path to a JSON array of trial entries.
    entries: Option<PathBuf>,
    /// Partial-save flag.
    partial: bool,
    /// Media-ready flag.
    media_ready: bool,
    /// Delete flag.
    delete: bool,
}

/// Executes a batch save against the configured store.
fn command_save(config: &LabResultsConfig, options: SaveOptions) -> CliResult<ExitCode> {
    let sample_id = SampleId::from_raw(options.sample)
        .ok_or_else(|| CliError::new("sample id must be at least 1".to_string()))?;
    let test_id = parse_test_id(options.test)?;
    let mode = SaveMode::from_wire(&options.mode)
        .ok_or_else(|| CliError::new(format!("unknown save mode: {}", options.mode)))?;
    let entries = match options.entries.as_deref() {
        Some(path) => read_entries(path)?,
        None => Vec::new(),
    };

    let request = SaveRequest {
        sample_id,
        test_id,
        mode,
        entries,
        is_partial_save: options.partial,
        is_media_ready: options.media_ready,
        is_delete: options.delete,
    };

    let orchestrator = build_orchestrator(config)?;
    let response = orchestrator.save(&request, &EmployeeId::new(options.employee), wall_clock()?);
    write_json(&response)?;
    if response.success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Prints every trial row awaiting review.
fn command_pending_review(config: &LabResultsConfig) -> CliResult<ExitCode> {
    let catalog = config.status_catalog();
    let review_statuses: Vec<StatusCode> = catalog
        .iter()
        .filter(|record| record.requires_review)
        .map(|record| record.code)
        .collect();
    let store = open_store(config)?;
    let pending = store
        .list_pending_review(&review_statuses)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&pending)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the save orchestrator from configuration.
fn build_orchestrator(
    config: &LabResultsConfig,
) -> CliResult<SaveOrchestrator<TableTestRegistry, AcceptAllValidator, SqliteTrialStore>> {
    let resolver =
        QualificationResolver::new(config.test_registry(), config.qualification_table());
    let transitions = TransitionValidator::new(config.status_catalog(), config.workflow_table());
    let store = open_store(config)?;
    Ok(SaveOrchestrator::new(
        resolver,
        AcceptAllValidator,
        transitions,
        store,
        config.engine_config(),
    ))
}

/// Opens the configured `SQLite` trial store.
fn open_store(config: &LabResultsConfig) -> CliResult<SqliteTrialStore> {
    SqliteTrialStore::new(config.store.clone()).map_err(|err| CliError::new(err.to_string()))
}

/// Reads and decodes a trial entries JSON file with a size limit.
fn read_entries(path: &Path) -> CliResult<Vec<TrialEntry>> {
    let bytes = fs::read(path)
        .map_err(|err| CliError::new(format!("cannot read entries file: {err}")))?;
    if bytes.len() > MAX_ENTRIES_BYTES {
        return Err(CliError::new("entries file exceeds size limit".to_string()));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("cannot parse entries file: {err}")))
}

/// Parses a raw test id argument.
fn parse_test_id(raw: u16) -> CliResult<TestId> {
    TestId::from_raw(raw).ok_or_else(|| CliError::new("test id must be at least 1".to_string()))
}

/// Parses a one-letter status code argument.
fn parse_status(raw: &str) -> CliResult<StatusCode> {
    let mut chars = raw.chars();
    if let Some(code) = chars.next()
        && chars.next().is_none()
        && let Some(status) = StatusCode::from_code(code)
    {
        return Ok(status);
    }
    Err(CliError::new(format!("unknown status code: {raw}")))
}

/// Returns the current wall-clock time as a timestamp.
fn wall_clock() -> CliResult<Timestamp> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| CliError::new(format!("system clock error: {err}")))?
        .as_millis();
    let millis = i64::try_from(millis)
        .map_err(|err| CliError::new(format!("system clock out of range: {err}")))?;
    Ok(Timestamp::UnixMillis(millis))
}

/// Serializes a value as pretty JSON on stdout.
fn write_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("cannot encode output: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(format!("stdout error: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error to stderr and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
