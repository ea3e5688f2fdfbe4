// crates/cy-dictionary-core/src/core/entry.rs
// ============================================================================
// Module: Dictionary Entries
// Description: Stored dictionary entries, upload records, and write commands.
// Purpose: Describe what the store persists and how writes are addressed.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`DictionaryEntry`] is identified by its English phrase, which is unique
//! across the store. Each entry exclusively owns the [`UploadRecord`] that
//! describes who last wrote it and when. Writes are expressed as
//! [`EntryWrite`] commands that either insert a new row or update an existing
//! row by identifier; the store never decides between the two on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EntryId;
use crate::core::identifiers::UploadVersionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the store constraint enforcing english-phrase uniqueness.
///
/// Store adapters report integrity violations with this constraint name so
/// the repository can classify them as conflicts.
pub const ENGLISH_PHRASE_UNIQUE_CONSTRAINT: &str = "dictionary_english_phrase_key";

// ============================================================================
// SECTION: Upload Records
// ============================================================================

/// Upload metadata stamped on every entry written by one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// Caller identity string recorded as the uploader.
    pub uploaded_by: String,
    /// Time the batch was accepted.
    pub uploaded_at: Timestamp,
}

impl UploadMetadata {
    /// Creates upload metadata for a write batch.
    #[must_use]
    pub fn new(uploaded_by: impl Into<String>, uploaded_at: Timestamp) -> Self {
        Self {
            uploaded_by: uploaded_by.into(),
            uploaded_at,
        }
    }
}

/// Persisted upload record owned by a single dictionary entry.
///
/// # Invariants
/// - `version_id` is assigned by the store and increases monotonically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Store-assigned version identifier.
    pub version_id: UploadVersionId,
    /// Time the owning batch was accepted.
    pub uploaded_at: Timestamp,
    /// Caller identity string recorded as the uploader.
    pub uploaded_by: String,
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Stored dictionary entry.
///
/// # Invariants
/// - `english_phrase` is unique across the store (case-sensitive).
/// - `translation_phrase` is `None` when the phrase is known but untranslated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Store-assigned entry identifier.
    pub id: EntryId,
    /// English phrase (entry identity).
    pub english_phrase: String,
    /// Welsh translation, absent when untranslated.
    pub translation_phrase: Option<String>,
    /// Upload record owned by this entry.
    pub upload: UploadRecord,
}

impl DictionaryEntry {
    /// Returns the translation rendered for public output (`""` when absent).
    #[must_use]
    pub fn rendered_translation(&self) -> String {
        self.translation_phrase.clone().unwrap_or_default()
    }
}

/// Addressing mode for a single entry write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// Insert a new row; fails with a uniqueness violation if the phrase exists.
    Insert,
    /// Replace the translation and upload record of an existing row.
    Update(EntryId),
}

/// Single entry write command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWrite {
    /// Insert or update addressing.
    pub target: WriteTarget,
    /// English phrase being written.
    pub english_phrase: String,
    /// Translation to store (`None` clears the translation).
    pub translation_phrase: Option<String>,
    /// Upload metadata for the new upload record.
    pub upload: UploadMetadata,
}

impl EntryWrite {
    /// Builds an insert command.
    #[must_use]
    pub fn insert(
        english_phrase: impl Into<String>,
        translation_phrase: Option<String>,
        upload: UploadMetadata,
    ) -> Self {
        Self {
            target: WriteTarget::Insert,
            english_phrase: english_phrase.into(),
            translation_phrase,
            upload,
        }
    }

    /// Builds an update command for an existing entry.
    #[must_use]
    pub fn update(
        id: EntryId,
        english_phrase: impl Into<String>,
        translation_phrase: Option<String>,
        upload: UploadMetadata,
    ) -> Self {
        Self {
            target: WriteTarget::Update(id),
            english_phrase: english_phrase.into(),
            translation_phrase,
            upload,
        }
    }
}

// ============================================================================
// SECTION: Paging
// ============================================================================

/// Offset/limit page request; entries are ordered by English phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of entries to skip.
    pub offset: u64,
    /// Maximum number of entries to return (must be > 0).
    pub limit: u32,
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(offset: u64, limit: u32) -> Self {
        Self {
            offset,
            limit,
        }
    }
}

/// Page of stored entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPage {
    /// Entries in this page, ordered by English phrase.
    pub items: Vec<DictionaryEntry>,
    /// Total number of entries in the store.
    pub total: u64,
}
