// crates/cy-dictionary-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Dictionary Store
// Description: Durable EntryPersistence backed by SQLite WAL.
// Purpose: Persist dictionary entries and upload records in one transaction per save.
// Dependencies: cy-dictionary-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`EntryPersistence`] using `SQLite`. Each
//! save writes a fresh upload record and the entry in a single transaction;
//! the upload record it supersedes is removed in the same transaction.
//! Uniqueness violations are reported with the violated constraint name,
//! resolved from the engine's failure message. Rows read back are validated
//! and fail closed on corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::os::raw::c_int;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use cy_dictionary_core::DictionaryEntry;
use cy_dictionary_core::ENGLISH_PHRASE_UNIQUE_CONSTRAINT;
use cy_dictionary_core::EntryId;
use cy_dictionary_core::EntryPage;
use cy_dictionary_core::EntryPersistence;
use cy_dictionary_core::EntryWrite;
use cy_dictionary_core::PageRequest;
use cy_dictionary_core::PersistenceError;
use cy_dictionary_core::Timestamp;
use cy_dictionary_core::UploadRecord;
use cy_dictionary_core::UploadVersionId;
use cy_dictionary_core::WriteTarget;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
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
/// Column targets of declared uniqueness constraints, by constraint name.
const UNIQUE_CONSTRAINTS: &[(&str, &str)] =
    &[("dictionary.english_phrase", ENGLISH_PHRASE_UNIQUE_CONSTRAINT)];
/// Entry projection joined with its upload record.
const SELECT_ENTRIES: &str = "SELECT d.id, d.english_phrase, d.translation_phrase, \
                              u.version_id, u.uploaded_at, u.uploaded_by FROM dictionary d \
                              JOIN uploads u ON u.version_id = d.upload_version_id";

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
    /// Delete journal mode.
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
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
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

/// Configuration for the `SQLite` dictionary store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
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

impl SqliteStoreConfig {
    /// Builds a config with default pragmas for the given path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// A schema constraint rejected the write.
    #[error("sqlite store constraint violation: {message}")]
    Constraint {
        /// Constraint name when it could be resolved.
        constraint: Option<String>,
        /// Engine-provided message.
        message: String,
    },
    /// Updated entry does not exist.
    #[error("sqlite store missing row: {0}")]
    NotFound(String),
    /// Store corruption.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or arguments.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for PersistenceError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Constraint {
                constraint,
                message,
            } => Self::IntegrityViolation {
                constraint,
                message,
            },
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::Invalid(message) => {
                Self::Invalid(message)
            }
            SqliteStoreError::VersionMismatch(message) => {
                Self::Store(format!("version mismatch: {message}"))
            }
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed dictionary store with WAL support.
#[derive(Clone)]
pub struct SqliteDictionaryStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteDictionaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDictionaryStore").field("config", &self.config).finish_non_exhaustive()
    }
}

impl SqliteDictionaryStore {
    /// Opens an `SQLite`-backed dictionary store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }
}

impl EntryPersistence for SqliteDictionaryStore {
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, PersistenceError> {
        self.save_entry(write).map_err(PersistenceError::from)
    }

    fn find_all(&self) -> Result<Vec<DictionaryEntry>, PersistenceError> {
        self.load_all().map_err(PersistenceError::from)
    }

    fn find_page(&self, page: PageRequest) -> Result<EntryPage, PersistenceError> {
        self.load_page(page).map_err(PersistenceError::from)
    }

    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, PersistenceError> {
        self.load_by_phrase(phrase).map_err(PersistenceError::from)
    }

    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, PersistenceError> {
        self.delete_prefixed(prefix).map_err(PersistenceError::from)
    }
}

impl SqliteDictionaryStore {
    /// Writes one entry and its upload record in a single transaction.
    fn save_entry(&self, write: &EntryWrite) -> Result<DictionaryEntry, SqliteStoreError> {
        let uploaded_at = write.upload.uploaded_at.as_unix_millis();
        let (entry_row, version_row) = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            tx.execute(
                "INSERT INTO uploads (uploaded_at, uploaded_by) VALUES (?1, ?2)",
                params![uploaded_at, write.upload.uploaded_by],
            )
            .map_err(db_error)?;
            let version_row = tx.last_insert_rowid();
            let entry_row = match write.target {
                WriteTarget::Insert => {
                    tx.execute(
                        "INSERT INTO dictionary (english_phrase, translation_phrase, \
                         upload_version_id) VALUES (?1, ?2, ?3)",
                        params![write.english_phrase, write.translation_phrase, version_row],
                    )
                    .map_err(db_error)?;
                    tx.last_insert_rowid()
                }
                WriteTarget::Update(id) => {
                    let entry_row = i64::try_from(id.get())
                        .map_err(|_| SqliteStoreError::Invalid(format!("entry id {id} out of range")))?;
                    let superseded: Option<i64> = tx
                        .query_row(
                            "SELECT upload_version_id FROM dictionary WHERE id = ?1",
                            params![entry_row],
                            |row| row.get(0),
                        )
                        .optional()
                        .map_err(db_error)?;
                    let Some(superseded) = superseded else {
                        return Err(SqliteStoreError::NotFound(format!("entry {id}")));
                    };
                    tx.execute(
                        "UPDATE dictionary SET english_phrase = ?1, translation_phrase = ?2, \
                         upload_version_id = ?3 WHERE id = ?4",
                        params![
                            write.english_phrase,
                            write.translation_phrase,
                            version_row,
                            entry_row
                        ],
                    )
                    .map_err(db_error)?;
                    tx.execute("DELETE FROM uploads WHERE version_id = ?1", params![superseded])
                        .map_err(db_error)?;
                    entry_row
                }
            };
            tx.commit().map_err(db_error)?;
            drop(guard);
            (entry_row, version_row)
        };
        EntryRow {
            id: entry_row,
            english_phrase: write.english_phrase.clone(),
            translation_phrase: write.translation_phrase.clone(),
            version_id: version_row,
            uploaded_at,
            uploaded_by: write.upload.uploaded_by.clone(),
        }
        .into_entry()
    }

    /// Loads every entry ordered by id.
    fn load_all(&self) -> Result<Vec<DictionaryEntry>, SqliteStoreError> {
        let rows = {
            let guard = self.lock()?;
            let mut stmt =
                guard.prepare(&format!("{SELECT_ENTRIES} ORDER BY d.id")).map_err(db_error)?;
            let rows = stmt
                .query_map(params![], read_row)
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            drop(stmt);
            drop(guard);
            rows
        };
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Loads one page ordered by english phrase.
    fn load_page(&self, page: PageRequest) -> Result<EntryPage, SqliteStoreError> {
        if page.limit == 0 {
            return Err(SqliteStoreError::Invalid("page limit must be greater than zero".to_string()));
        }
        let offset = i64::try_from(page.offset)
            .map_err(|_| SqliteStoreError::Invalid("page offset out of range".to_string()))?;
        let (rows, total) = {
            let guard = self.lock()?;
            let total: i64 = guard
                .query_row("SELECT COUNT(*) FROM dictionary", params![], |row| row.get(0))
                .map_err(db_error)?;
            let mut stmt = guard
                .prepare(&format!("{SELECT_ENTRIES} ORDER BY d.english_phrase LIMIT ?1 OFFSET ?2"))
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![i64::from(page.limit), offset], read_row)
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            drop(stmt);
            drop(guard);
            (rows, total)
        };
        let total = u64::try_from(total)
            .map_err(|_| SqliteStoreError::Corrupt("negative entry count".to_string()))?;
        let items = rows.into_iter().map(EntryRow::into_entry).collect::<Result<Vec<_>, _>>()?;
        Ok(EntryPage {
            items,
            total,
        })
    }

    /// Loads the entry for an exact english phrase.
    fn load_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, SqliteStoreError> {
        let row = {
            let guard = self.lock()?;
            let row = guard
                .query_row(
                    &format!("{SELECT_ENTRIES} WHERE d.english_phrase = ?1"),
                    params![phrase],
                    read_row,
                )
                .optional()
                .map_err(db_error)?;
            drop(guard);
            row
        };
        row.map(EntryRow::into_entry).transpose()
    }

    /// Deletes prefixed entries and their orphaned upload records.
    fn delete_prefixed(&self, prefix: &str) -> Result<u64, SqliteStoreError> {
        let deleted = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            let deleted = tx
                .execute(
                    "DELETE FROM dictionary WHERE substr(english_phrase, 1, length(?1)) = ?1",
                    params![prefix],
                )
                .map_err(db_error)?;
            tx.execute(
                "DELETE FROM uploads WHERE version_id NOT IN (SELECT upload_version_id FROM \
                 dictionary)",
                params![],
            )
            .map_err(db_error)?;
            tx.commit().map_err(db_error)?;
            drop(guard);
            deleted
        };
        u64::try_from(deleted)
            .map_err(|_| SqliteStoreError::Invalid("deleted row count out of range".to_string()))
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Raw entry row as stored.
struct EntryRow {
    /// Entry row id.
    id: i64,
    /// English phrase.
    english_phrase: String,
    /// Optional translation.
    translation_phrase: Option<String>,
    /// Upload record row id.
    version_id: i64,
    /// Upload time in unix millis.
    uploaded_at: i64,
    /// Uploader label.
    uploaded_by: String,
}

impl EntryRow {
    /// Validates the raw row and converts it into an entry.
    fn into_entry(self) -> Result<DictionaryEntry, SqliteStoreError> {
        let id = EntryId::from_row_id(self.id)
            .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid entry id {}", self.id)))?;
        let version_id = UploadVersionId::from_row_id(self.version_id).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("invalid upload version id {}", self.version_id))
        })?;
        if self.english_phrase.trim().is_empty() {
            return Err(SqliteStoreError::Corrupt(format!("blank english phrase for entry {id}")));
        }
        Ok(DictionaryEntry {
            id,
            english_phrase: self.english_phrase,
            translation_phrase: self.translation_phrase,
            upload: UploadRecord {
                version_id,
                uploaded_at: Timestamp::from_unix_millis(self.uploaded_at),
                uploaded_by: self.uploaded_by,
            },
        })
    }
}

/// Reads an entry row from the joined projection.
fn read_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        english_phrase: row.get(1)?,
        translation_phrase: row.get(2)?,
        version_id: row.get(3)?,
        uploaded_at: row.get(4)?,
        uploaded_by: row.get(5)?,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps an engine error, surfacing constraint violations by name.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err
        && failure.code == ErrorCode::ConstraintViolation
    {
        let message = message.clone().unwrap_or_else(|| err.to_string());
        return SqliteStoreError::Constraint {
            constraint: constraint_name(failure.extended_code, &message),
            message,
        };
    }
    SqliteStoreError::Db(err.to_string())
}

/// Resolves the violated constraint from the engine's failure message.
///
/// `SQLite` reports column targets (`UNIQUE constraint failed: table.column`)
/// rather than constraint names; declared unique targets map to their name.
fn constraint_name(extended_code: c_int, message: &str) -> Option<String> {
    let (_, target) = message.split_once("constraint failed: ")?;
    let target = target.trim();
    if extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        && let Some((_, name)) = UNIQUE_CONSTRAINTS.iter().find(|(column, _)| *column == target)
    {
        return Some((*name).to_string());
    }
    Some(target.to_string())
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS uploads (
                    version_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uploaded_at INTEGER NOT NULL,
                    uploaded_by TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS dictionary (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    english_phrase TEXT NOT NULL,
                    translation_phrase TEXT,
                    upload_version_id INTEGER NOT NULL REFERENCES uploads(version_id),
                    CONSTRAINT dictionary_english_phrase_key UNIQUE (english_phrase)
                );
                CREATE INDEX IF NOT EXISTS idx_dictionary_upload_version_id
                    ON dictionary (upload_version_id);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
