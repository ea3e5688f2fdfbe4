// crates/cy-dictionary-core/src/runtime/repository.rs
// ============================================================================
// Module: Conflict-Aware Repository
// Description: Repository adapter classifying english-phrase uniqueness violations.
// Purpose: Turn raw integrity violations into a typed conflict signal.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`ConflictAwareRepository`] wraps any [`EntryPersistence`] port. A save
//! rejected by the english-phrase uniqueness constraint becomes
//! [`RepositoryError::Conflict`]; every other failure, including integrity
//! violations on other constraints, is re-raised unchanged as
//! [`RepositoryError::Storage`]. Reads and deletes pass straight through.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::DictionaryEntry;
use crate::core::ENGLISH_PHRASE_UNIQUE_CONSTRAINT;
use crate::core::EntryPage;
use crate::core::EntryWrite;
use crate::core::PageRequest;
use crate::interfaces::DictionaryRepository;
use crate::interfaces::EntryPersistence;
use crate::interfaces::PersistenceError;
use crate::interfaces::RepositoryError;

// ============================================================================
// SECTION: Repository
// ============================================================================

/// Repository adapter over a raw persistence port.
#[derive(Debug, Clone)]
pub struct ConflictAwareRepository<P> {
    /// Wrapped persistence port.
    persistence: P,
}

impl<P: EntryPersistence> ConflictAwareRepository<P> {
    /// Wraps a persistence port.
    #[must_use]
    pub const fn new(persistence: P) -> Self {
        Self {
            persistence,
        }
    }
}

impl<P: EntryPersistence> DictionaryRepository for ConflictAwareRepository<P> {
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, RepositoryError> {
        self.persistence.save_and_flush(write).map_err(|err| classify(&write.english_phrase, err))
    }

    fn find_all(&self) -> Result<Vec<DictionaryEntry>, RepositoryError> {
        Ok(self.persistence.find_all()?)
    }

    fn find_page(&self, page: PageRequest) -> Result<EntryPage, RepositoryError> {
        Ok(self.persistence.find_page(page)?)
    }

    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, RepositoryError> {
        Ok(self.persistence.find_by_phrase(phrase)?)
    }

    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, RepositoryError> {
        Ok(self.persistence.delete_by_phrase_prefix(prefix)?)
    }
}

/// Classifies a persistence failure for the phrase being written.
fn classify(phrase: &str, error: PersistenceError) -> RepositoryError {
    match error {
        PersistenceError::IntegrityViolation {
            constraint: Some(constraint),
            ..
        } if constraint == ENGLISH_PHRASE_UNIQUE_CONSTRAINT => RepositoryError::Conflict {
            phrase: phrase.to_string(),
        },
        other => RepositoryError::Storage(other),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
