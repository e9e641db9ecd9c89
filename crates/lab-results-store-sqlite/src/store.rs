// crates/lab-results-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Trial Store
// Description: Durable TrialStore backed by SQLite WAL.
// Purpose: Persist trial rows with snapshot-verified atomic batches.
// Dependencies: lab-results-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`TrialStore`] using `SQLite`. Each batch
//! applies inside a `BEGIN IMMEDIATE` transaction; before any mutation the
//! store re-reads the (sample, test) pair's statuses and compares them with
//! the batch's planning snapshot. A mismatch aborts the transaction with a
//! conflict, leaving the rows untouched. Database contents are untrusted;
//! reads fail closed on rows that do not decode.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use lab_results_core::EmployeeId;
use lab_results_core::SampleId;
use lab_results_core::StatusCode;
use lab_results_core::StoreError;
use lab_results_core::TestId;
use lab_results_core::Timestamp;
use lab_results_core::TrialBatch;
use lab_results_core::TrialMutation;
use lab_results_core::TrialNumber;
use lab_results_core::TrialRecord;
use lab_results_core::TrialStore;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` trial store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` trial store errors.
#[derive(Debug, Error)]
pub enum SqliteTrialStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Persisted rows no longer match the batch snapshot.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Store corruption or undecodable rows.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteTrialStoreError> for StoreError {
    fn from(error: SqliteTrialStoreError) -> Self {
        match error {
            SqliteTrialStoreError::Io(message) => Self::Io(message),
            SqliteTrialStoreError::Db(message) => Self::Store(message),
            SqliteTrialStoreError::Conflict(message) => Self::Conflict(message),
            SqliteTrialStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteTrialStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed trial store with WAL support.
#[derive(Clone)]
pub struct SqliteTrialStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTrialStore {
    /// Opens an `SQLite`-backed trial store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteTrialStoreError`] when the database cannot be opened
    /// or initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteTrialStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Lists every trial row currently awaiting review.
    ///
    /// The caller supplies the statuses its catalog marks as review-pending;
    /// the store holds no workflow knowledge of its own.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteTrialStoreError`] when reading or decoding fails.
    pub fn list_pending_review(
        &self,
        review_statuses: &[StatusCode],
    ) -> Result<Vec<TrialRecord>, SqliteTrialStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteTrialStoreError::Db("mutex poisoned".to_string()))?;
        let mut rows = Vec::new();
        let mut statement = guard
            .prepare(
                "SELECT sample_id, test_id, trial_number, value1, value2, value3, trial_calc, \
                 id1, id2, id3, status, main_comments, entry_id, entry_date, validate_id, \
                 validate_date FROM trial_readings ORDER BY sample_id, test_id, trial_number",
            )
            .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
        let mut query = statement
            .query(params![])
            .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
        while let Some(row) = query.next().map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?
        {
            let record = decode_row(row)?;
            if review_statuses.contains(&record.status) {
                rows.push(record);
            }
        }
        Ok(rows)
    }

    /// Lists trial rows for one (sample, test) pair, ordered by trial number.
    fn list_pair(
        &self,
        sample_id: SampleId,
        test_id: TestId,
    ) -> Result<Vec<TrialRecord>, SqliteTrialStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteTrialStoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT sample_id, test_id, trial_number, value1, value2, value3, trial_calc, \
                 id1, id2, id3, status, main_comments, entry_id, entry_date, validate_id, \
                 validate_date FROM trial_readings WHERE sample_id = ?1 AND test_id = ?2 ORDER BY \
                 trial_number",
            )
            .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
        let mut query = statement
            .query(params![i64::from(sample_id.get()), i64::from(test_id.get())])
            .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
        let mut rows = Vec::new();
        while let Some(row) = query.next().map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?
        {
            rows.push(decode_row(row)?);
        }
        Ok(rows)
    }

    /// Applies a batch inside an immediate transaction.
    fn apply_batch(&self, batch: &TrialBatch) -> Result<(), SqliteTrialStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteTrialStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;

        verify_snapshot(&tx, batch)?;

        for mutation in &batch.mutations {
            match mutation {
                TrialMutation::Upsert(record) => upsert_row(&tx, record)?,
                TrialMutation::DeleteAll => {
                    tx.execute(
                        "DELETE FROM trial_readings WHERE sample_id = ?1 AND test_id = ?2",
                        params![i64::from(batch.sample_id.get()), i64::from(batch.test_id.get())],
                    )
                    .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
                }
            }
        }

        tx.commit().map_err(|err| SqliteTrialStoreError::Db(err.to_string()))
    }
}

impl TrialStore for SqliteTrialStore {
    fn list_trials(
        &self,
        sample_id: SampleId,
        test_id: TestId,
    ) -> Result<Vec<TrialRecord>, StoreError> {
        self.list_pair(sample_id, test_id).map_err(StoreError::from)
    }

    fn apply(&self, batch: &TrialBatch) -> Result<(), StoreError> {
        self.apply_batch(batch).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| StoreError::Store("mutex poisoned".to_string()))?;
        guard
            .query_row("SELECT 1", params![], |_| Ok(()))
            .map_err(|err| StoreError::Store(err.to_string()))
    }
}

// ============================================================================
// SECTION: Row Codec
// ============================================================================

/// Decodes one `trial_readings` row, failing closed on bad data.
fn decode_row(row: &rusqlite::Row<'_>) -> Result<TrialRecord, SqliteTrialStoreError> {
    let sample_raw: i64 = get_column(row, 0)?;
    let test_raw: i64 = get_column(row, 1)?;
    let trial_raw: i64 = get_column(row, 2)?;
    let status_raw: String = get_column(row, 10)?;
    let entry_id: Option<String> = get_column(row, 12)?;
    let entry_date_raw: Option<String> = get_column(row, 13)?;
    let validate_id: Option<String> = get_column(row, 14)?;
    let validate_date_raw: Option<String> = get_column(row, 15)?;

    let sample_id = u32::try_from(sample_raw)
        .ok()
        .and_then(SampleId::from_raw)
        .ok_or_else(|| SqliteTrialStoreError::Corrupt(format!("bad sample id {sample_raw}")))?;
    let test_id = u16::try_from(test_raw)
        .ok()
        .and_then(TestId::from_raw)
        .ok_or_else(|| SqliteTrialStoreError::Corrupt(format!("bad test id {test_raw}")))?;
    let trial_number = u16::try_from(trial_raw)
        .ok()
        .and_then(TrialNumber::from_raw)
        .ok_or_else(|| SqliteTrialStoreError::Corrupt(format!("bad trial number {trial_raw}")))?;
    let status = decode_status(&status_raw)?;

    Ok(TrialRecord {
        sample_id,
        test_id,
        trial_number,
        value1: get_column(row, 3)?,
        value2: get_column(row, 4)?,
        value3: get_column(row, 5)?,
        trial_calc: get_column(row, 6)?,
        id1: get_column(row, 7)?,
        id2: get_column(row, 8)?,
        id3: get_column(row, 9)?,
        status,
        main_comments: get_column(row, 11)?,
        entry_id: entry_id.map(EmployeeId::new),
        entry_date: decode_timestamp(entry_date_raw.as_deref())?,
        validate_id: validate_id.map(EmployeeId::new),
        validate_date: decode_timestamp(validate_date_raw.as_deref())?,
    })
}

/// Reads one column, mapping driver errors into store errors.
fn get_column<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> Result<T, SqliteTrialStoreError> {
    row.get(index).map_err(|err| SqliteTrialStoreError::Db(err.to_string()))
}

/// Decodes a one-letter status column.
fn decode_status(raw: &str) -> Result<StatusCode, SqliteTrialStoreError> {
    let mut chars = raw.chars();
    if let Some(code) = chars.next()
        && chars.next().is_none()
        && let Some(status) = StatusCode::from_code(code)
    {
        return Ok(status);
    }
    Err(SqliteTrialStoreError::Corrupt(format!("bad status code {raw:?}")))
}

/// Decodes a JSON timestamp column.
fn decode_timestamp(raw: Option<&str>) -> Result<Option<Timestamp>, SqliteTrialStoreError> {
    raw.map(|text| {
        serde_json::from_str(text)
            .map_err(|err| SqliteTrialStoreError::Corrupt(format!("bad timestamp: {err}")))
    })
    .transpose()
}

/// Encodes a timestamp as JSON for storage.
fn encode_timestamp(
    timestamp: Option<Timestamp>,
) -> Result<Option<String>, SqliteTrialStoreError> {
    timestamp
        .map(|value| {
            serde_json::to_string(&value)
                .map_err(|err| SqliteTrialStoreError::Invalid(err.to_string()))
        })
        .transpose()
}

/// Inserts or replaces one trial row within the transaction.
fn upsert_row(tx: &Transaction<'_>, record: &TrialRecord) -> Result<(), SqliteTrialStoreError> {
    tx.execute(
        "INSERT INTO trial_readings (sample_id, test_id, trial_number, value1, value2, value3, \
         trial_calc, id1, id2, id3, status, main_comments, entry_id, entry_date, validate_id, \
         validate_date) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
         ?15, ?16) ON CONFLICT(sample_id, test_id, trial_number) DO UPDATE SET value1 = \
         excluded.value1, value2 = excluded.value2, value3 = excluded.value3, trial_calc = \
         excluded.trial_calc, id1 = excluded.id1, id2 = excluded.id2, id3 = excluded.id3, status \
         = excluded.status, main_comments = excluded.main_comments, entry_id = excluded.entry_id, \
         entry_date = excluded.entry_date, validate_id = excluded.validate_id, validate_date = \
         excluded.validate_date",
        params![
            i64::from(record.sample_id.get()),
            i64::from(record.test_id.get()),
            i64::from(record.trial_number.get()),
            record.value1,
            record.value2,
            record.value3,
            record.trial_calc,
            record.id1,
            record.id2,
            record.id3,
            record.status.as_code().to_string(),
            record.main_comments,
            record.entry_id.as_ref().map(EmployeeId::as_str),
            encode_timestamp(record.entry_date)?,
            record.validate_id.as_ref().map(EmployeeId::as_str),
            encode_timestamp(record.validate_date)?,
        ],
    )
    .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Verifies the batch snapshot against the live rows inside the transaction.
fn verify_snapshot(tx: &Transaction<'_>, batch: &TrialBatch) -> Result<(), SqliteTrialStoreError> {
    let mut statement = tx
        .prepare(
            "SELECT trial_number, status FROM trial_readings WHERE sample_id = ?1 AND test_id = \
             ?2 ORDER BY trial_number",
        )
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    let mut query = statement
        .query(params![i64::from(batch.sample_id.get()), i64::from(batch.test_id.get())])
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    let mut live: Vec<(TrialNumber, StatusCode)> = Vec::new();
    while let Some(row) = query.next().map_err(|err| SqliteTrialStoreError::Db(err.to_string()))? {
        let trial_raw: i64 = get_column(row, 0)?;
        let status_raw: String = get_column(row, 1)?;
        let trial_number = u16::try_from(trial_raw)
            .ok()
            .and_then(TrialNumber::from_raw)
            .ok_or_else(|| {
                SqliteTrialStoreError::Corrupt(format!("bad trial number {trial_raw}"))
            })?;
        live.push((trial_number, decode_status(&status_raw)?));
    }

    let mut expected = batch.expected.clone();
    expected.sort_unstable_by_key(|(trial, _)| *trial);
    if live == expected {
        Ok(())
    } else {
        Err(SqliteTrialStoreError::Conflict(format!(
            "rows for sample {} test {} moved since the batch was planned",
            batch.sample_id, batch.test_id
        )))
    }
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteTrialStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteTrialStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteTrialStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteTrialStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteTrialStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteTrialStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteTrialStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteTrialStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteTrialStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteTrialStoreError> {
    let tx = connection
        .transaction()
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute(
                "INSERT INTO store_meta (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
        }
        Some(found) if found == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(SqliteTrialStoreError::Invalid(format!(
                "unsupported store schema version {found} (expected {SCHEMA_VERSION})"
            )));
        }
    }
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS trial_readings (
            sample_id INTEGER NOT NULL,
            test_id INTEGER NOT NULL,
            trial_number INTEGER NOT NULL,
            value1 REAL,
            value2 REAL,
            value3 REAL,
            trial_calc REAL,
            id1 TEXT,
            id2 TEXT,
            id3 TEXT,
            status TEXT NOT NULL,
            main_comments TEXT,
            entry_id TEXT,
            entry_date TEXT,
            validate_id TEXT,
            validate_date TEXT,
            PRIMARY KEY (sample_id, test_id, trial_number)
        );",
    )
    .map_err(|err| SqliteTrialStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteTrialStoreError::Db(err.to_string()))
}
