// crates/cy-dictionary-core/src/runtime/service.rs
// ============================================================================
// Module: Dictionary Service
// Description: Read, lookup, upsert, and test-reset orchestration.
// Purpose: Drive the conflict-safe per-phrase upsert with a bounded retry.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! [`DictionaryService`] is the only writer of dictionary entries. For each
//! phrase in a write batch it looks the phrase up, inserts when absent or
//! updates when present, and treats a uniqueness conflict as a lost race:
//! the current row is re-fetched and the write re-attempted, up to
//! [`MAX_SAVE_ATTEMPTS`] saves in total. Phrases are processed sequentially
//! and independently; a failing phrase never rolls back or blocks the
//! others, and [`PutReport`] records each phrase's outcome.
//!
//! ## Invariants
//! - Stored translations are never rendered as `null`; absent becomes `""`.
//! - Reading a store with two entries for one English phrase fails loudly.
//! - Lookups never create entries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use thiserror::Error;

use crate::core::Dictionary;
use crate::core::DictionaryRequest;
use crate::core::EntryPage;
use crate::core::EntryWrite;
use crate::core::PageRequest;
use crate::core::TranslationRequest;
use crate::core::UploadMetadata;
use crate::core::ValidationError;
use crate::core::WriteTarget;
use crate::core::normalize_translation;
use crate::interfaces::DictionaryRepository;
use crate::interfaces::RepositoryError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of save attempts per phrase before the conflict is surfaced.
pub const MAX_SAVE_ATTEMPTS: u32 = 3;
/// Maximum page size accepted by [`DictionaryService::list_entries`].
pub const MAX_PAGE_LIMIT: u32 = 1_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dictionary service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    /// Request failed validation.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    /// A phrase kept conflicting until the retry ceiling was reached.
    #[error("write for phrase '{phrase}' still conflicting after {attempts} attempts")]
    StorageExhausted {
        /// Phrase whose write was abandoned.
        phrase: String,
        /// Number of save attempts made.
        attempts: u32,
    },
    /// Non-conflict storage failure, propagated unchanged.
    #[error("storage failure: {0}")]
    Storage(#[from] RepositoryError),
    /// Two stored entries share one English phrase.
    #[error("duplicate english phrase in store: '{0}'")]
    DuplicatePhrase(String),
}

impl DictionaryError {
    /// Returns the stable error code for this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_request",
            Self::StorageExhausted {
                ..
            } => "storage_exhausted",
            Self::Storage(_) => "storage_error",
            Self::DuplicatePhrase(_) => "data_integrity",
        }
    }

    /// Returns true when the failure was caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// ============================================================================
// SECTION: Write Reports
// ============================================================================

/// Action taken for a successfully saved phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    /// A new entry was inserted.
    Inserted,
    /// An existing entry was updated.
    Updated,
}

/// Outcome of writing one phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseResult {
    /// English phrase that was written.
    pub phrase: String,
    /// Number of save attempts made.
    pub attempts: u32,
    /// Save action or the error that ended the phrase.
    pub outcome: Result<SaveAction, DictionaryError>,
}

/// Per-phrase outcomes of a write batch.
///
/// # Invariants
/// - Contains one result per requested phrase, in phrase order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutReport {
    /// Per-phrase results.
    pub results: Vec<PhraseResult>,
}

impl PutReport {
    /// Returns true when every phrase was saved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|result| result.outcome.is_ok())
    }

    /// Returns the phrases that failed.
    pub fn failures(&self) -> impl Iterator<Item = &PhraseResult> {
        self.results.iter().filter(|result| result.outcome.is_err())
    }

    /// Returns the number of phrases saved.
    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.results.iter().filter(|result| result.outcome.is_ok()).count()
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Dictionary service over a conflict-aware repository.
#[derive(Debug, Clone)]
pub struct DictionaryService<R> {
    /// Conflict-aware repository.
    repository: R,
}

impl<R: DictionaryRepository> DictionaryService<R> {
    /// Creates a service over the given repository.
    #[must_use]
    pub const fn new(repository: R) -> Self {
        Self {
            repository,
        }
    }

    /// Returns every stored phrase mapped to its translation.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::DuplicatePhrase`] when two entries share an
    /// English phrase and [`DictionaryError::Storage`] when the read fails.
    pub fn get_dictionary_contents(&self) -> Result<Dictionary, DictionaryError> {
        let entries = self.repository.find_all()?;
        let mut translations = BTreeMap::new();
        for entry in entries {
            let translation = entry.translation_phrase.unwrap_or_default();
            match translations.entry(entry.english_phrase) {
                Entry::Vacant(slot) => {
                    slot.insert(translation);
                }
                Entry::Occupied(existing) => {
                    return Err(DictionaryError::DuplicatePhrase(existing.key().clone()));
                }
            }
        }
        Ok(Dictionary {
            translations,
        })
    }

    /// Looks up translations for the requested phrases.
    ///
    /// Phrases without a stored entry are omitted from the result; stored but
    /// untranslated phrases map to `""`.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::Validation`] for invalid requests and
    /// [`DictionaryError::Storage`] when a read fails.
    pub fn get_translations(
        &self,
        request: &TranslationRequest,
    ) -> Result<Dictionary, DictionaryError> {
        request.validate()?;
        let mut dictionary = Dictionary::new();
        for phrase in &request.phrases {
            if let Some(entry) = self.repository.find_by_phrase(phrase)? {
                dictionary.translations.insert(phrase.clone(), entry.rendered_translation());
            }
        }
        Ok(dictionary)
    }

    /// Writes every phrase of the request, one independent upsert per phrase.
    ///
    /// The returned report must be inspected: individual phrases may have
    /// failed while others were saved.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::Validation`] when the request is invalid;
    /// nothing is written in that case.
    pub fn put_dictionary(
        &self,
        request: &DictionaryRequest,
        upload: &UploadMetadata,
    ) -> Result<PutReport, DictionaryError> {
        request.validate()?;
        let results = request
            .translations
            .iter()
            .map(|(phrase, translation)| {
                self.save_phrase(phrase, normalize_translation(translation.as_deref()), upload)
            })
            .collect();
        Ok(PutReport {
            results,
        })
    }

    /// Deletes entries whose English phrase starts with the test prefix.
    ///
    /// Deleting zero entries is a success.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::Validation`] for a blank prefix and
    /// [`DictionaryError::Storage`] when the delete fails.
    pub fn delete_test_phrases(&self, prefix: &str) -> Result<u64, DictionaryError> {
        if prefix.trim().is_empty() {
            return Err(ValidationError::Invalid {
                field: "test_phrase_prefix",
                reason: "must be non-empty",
            }
            .into());
        }
        Ok(self.repository.delete_by_phrase_prefix(prefix)?)
    }

    /// Lists one page of stored entries with their upload records.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError::Validation`] for an out-of-range limit and
    /// [`DictionaryError::Storage`] when the read fails.
    pub fn list_entries(&self, page: PageRequest) -> Result<EntryPage, DictionaryError> {
        if page.limit == 0 || page.limit > MAX_PAGE_LIMIT {
            return Err(ValidationError::Invalid {
                field: "limit",
                reason: "must be between 1 and 1000",
            }
            .into());
        }
        Ok(self.repository.find_page(page)?)
    }

    /// Upserts one phrase with a bounded conflict retry.
    fn save_phrase(
        &self,
        phrase: &str,
        translation: Option<String>,
        upload: &UploadMetadata,
    ) -> PhraseResult {
        let mut attempts = 0;
        while attempts < MAX_SAVE_ATTEMPTS {
            let existing = match self.repository.find_by_phrase(phrase) {
                Ok(existing) => existing,
                Err(err) => return phrase_result(phrase, attempts, Err(err.into())),
            };
            let write = match existing {
                Some(entry) => {
                    EntryWrite::update(entry.id, phrase, translation.clone(), upload.clone())
                }
                None => EntryWrite::insert(phrase, translation.clone(), upload.clone()),
            };
            let action = match write.target {
                WriteTarget::Insert => SaveAction::Inserted,
                WriteTarget::Update(_) => SaveAction::Updated,
            };
            attempts += 1;
            match self.repository.save_and_flush(&write) {
                Ok(_) => return phrase_result(phrase, attempts, Ok(action)),
                Err(RepositoryError::Conflict {
                    ..
                }) => {}
                Err(err) => return phrase_result(phrase, attempts, Err(err.into())),
            }
        }
        phrase_result(
            phrase,
            attempts,
            Err(DictionaryError::StorageExhausted {
                phrase: phrase.to_string(),
                attempts,
            }),
        )
    }
}

/// Builds a phrase result.
fn phrase_result(
    phrase: &str,
    attempts: u32,
    outcome: Result<SaveAction, DictionaryError>,
) -> PhraseResult {
    PhraseResult {
        phrase: phrase.to_string(),
        attempts,
        outcome,
    }
}
