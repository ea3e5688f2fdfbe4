// crates/cy-dictionary-core/src/interfaces/mod.rs
// ============================================================================
// Module: Dictionary Interfaces
// Description: Persistence port and repository contracts for dictionary entries.
// Purpose: Define the seams between the upsert runtime and concrete stores.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Two layers separate the runtime from storage engines:
//! - [`EntryPersistence`] is the raw persistence port. Store adapters report
//!   integrity violations together with the violated constraint name and
//!   never interpret them.
//! - [`DictionaryRepository`] is the conflict-aware contract consumed by the
//!   dictionary service. It distinguishes [`RepositoryError::Conflict`] (the
//!   english-phrase uniqueness constraint was hit) from every other failure.
//!
//! Security posture: store contents are untrusted; adapters must validate
//! identifiers read back from storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::DictionaryEntry;
use crate::core::EntryPage;
use crate::core::EntryWrite;
use crate::core::PageRequest;

// ============================================================================
// SECTION: Persistence Port
// ============================================================================

/// Raw persistence errors reported by store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// A store integrity constraint rejected the write.
    #[error(
        "integrity violation on {}: {message}",
        .constraint.as_deref().unwrap_or("unknown constraint")
    )]
    IntegrityViolation {
        /// Violated constraint name when the engine reports one.
        constraint: Option<String>,
        /// Engine-provided detail.
        message: String,
    },
    /// An update addressed an entry that no longer exists.
    #[error("entry not found: {0}")]
    NotFound(String),
    /// Store I/O failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Store engine failure.
    #[error("store error: {0}")]
    Store(String),
    /// Store returned data that violates entry invariants.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

/// Raw persistence port for dictionary entries.
///
/// # Invariants
/// - Each `save_and_flush` call commits exactly one store transaction.
/// - Inserting an existing English phrase fails with
///   [`PersistenceError::IntegrityViolation`] naming
///   [`crate::ENGLISH_PHRASE_UNIQUE_CONSTRAINT`]; it never overwrites.
pub trait EntryPersistence: Send + Sync {
    /// Writes one entry and commits it.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write is rejected or fails.
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, PersistenceError>;

    /// Loads every stored entry.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the read fails.
    fn find_all(&self) -> Result<Vec<DictionaryEntry>, PersistenceError>;

    /// Loads one page of entries ordered by English phrase.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the read fails or the page is invalid.
    fn find_page(&self, page: PageRequest) -> Result<EntryPage, PersistenceError>;

    /// Loads the entry for an exact English phrase.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the read fails.
    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, PersistenceError>;

    /// Deletes every entry whose English phrase starts with `prefix`.
    ///
    /// Matching is literal and case-sensitive. Returns the number of deleted entries.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the delete fails.
    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, PersistenceError>;
}

// ============================================================================
// SECTION: Repository Contract
// ============================================================================

/// Conflict-aware repository errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The english-phrase uniqueness constraint rejected the write.
    #[error("conflicting write for phrase '{phrase}'")]
    Conflict {
        /// Phrase whose write conflicted.
        phrase: String,
    },
    /// Any other persistence failure, unchanged.
    #[error(transparent)]
    Storage(#[from] PersistenceError),
}

/// Repository contract consumed by the dictionary service.
pub trait DictionaryRepository: Send + Sync {
    /// Writes one entry and commits it, classifying uniqueness conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] for english-phrase uniqueness
    /// violations and [`RepositoryError::Storage`] for anything else.
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, RepositoryError>;

    /// Loads every stored entry.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] when the read fails.
    fn find_all(&self) -> Result<Vec<DictionaryEntry>, RepositoryError>;

    /// Loads one page of entries ordered by English phrase.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] when the read fails.
    fn find_page(&self, page: PageRequest) -> Result<EntryPage, RepositoryError>;

    /// Loads the entry for an exact English phrase.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] when the read fails.
    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, RepositoryError>;

    /// Deletes every entry whose English phrase starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] when the delete fails.
    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, RepositoryError>;
}
