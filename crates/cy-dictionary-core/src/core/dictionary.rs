// crates/cy-dictionary-core/src/core/dictionary.rs
// ============================================================================
// Module: Dictionary Payloads
// Description: Public request and response payloads for dictionary operations.
// Purpose: Define wire shapes and request-level validation rules.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Payloads map English phrases to Welsh translations. An empty translation
//! string means "known but not yet translated"; responses never carry `null`
//! translations. Requests are untrusted and must pass [`DictionaryRequest::validate`]
//! or [`TranslationRequest::validate`] before reaching the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a single phrase or translation in bytes.
pub const MAX_PHRASE_BYTES: usize = 4 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request carried no phrases.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// A phrase was empty or whitespace-only.
    #[error("{0} must not contain blank phrases")]
    BlankPhrase(&'static str),
    /// A phrase or translation exceeded the size limit.
    #[error("{field} entry exceeds {max_bytes} bytes")]
    TooLong {
        /// Field label.
        field: &'static str,
        /// Maximum allowed bytes.
        max_bytes: usize,
    },
    /// A scalar argument was out of range.
    #[error("{field} {reason}")]
    Invalid {
        /// Field label.
        field: &'static str,
        /// Constraint that was violated.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Dictionary
// ============================================================================

/// Phrase to translation mapping used by dictionary and lookup responses.
///
/// # Invariants
/// - Translation values are never `null`; untranslated phrases map to `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    /// English phrase to Welsh translation.
    pub translations: BTreeMap<String, String>,
}

impl Dictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            translations: BTreeMap::new(),
        }
    }

    /// Returns true when the dictionary has no phrases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

/// Dictionary write payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRequest {
    /// English phrase to Welsh translation (`null` or blank = untranslated).
    pub translations: BTreeMap<String, Option<String>>,
}

impl DictionaryRequest {
    /// Validates request-level invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the mapping is empty, contains a blank
    /// phrase, or contains an oversized phrase or translation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.translations.is_empty() {
            return Err(ValidationError::Empty("translations"));
        }
        for (phrase, translation) in &self.translations {
            validate_phrase("translations", phrase)?;
            if let Some(translation) = translation
                && translation.len() > MAX_PHRASE_BYTES
            {
                return Err(ValidationError::TooLong {
                    field: "translations",
                    max_bytes: MAX_PHRASE_BYTES,
                });
            }
        }
        Ok(())
    }
}

/// Normalizes an incoming translation; blank values clear the translation.
#[must_use]
pub fn normalize_translation(translation: Option<&str>) -> Option<String> {
    translation.filter(|value| !value.trim().is_empty()).map(str::to_string)
}

// ============================================================================
// SECTION: Lookup
// ============================================================================

/// Translation lookup payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Unique phrases to look up.
    pub phrases: BTreeSet<String>,
}

impl TranslationRequest {
    /// Builds a lookup request from phrases.
    #[must_use]
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }

    /// Validates request-level invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the set is empty or contains a blank
    /// or oversized phrase.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.phrases.is_empty() {
            return Err(ValidationError::Empty("phrases"));
        }
        for phrase in &self.phrases {
            validate_phrase("phrases", phrase)?;
        }
        Ok(())
    }
}

/// Validates a single phrase.
fn validate_phrase(field: &'static str, phrase: &str) -> Result<(), ValidationError> {
    if phrase.trim().is_empty() {
        return Err(ValidationError::BlankPhrase(field));
    }
    if phrase.len() > MAX_PHRASE_BYTES {
        return Err(ValidationError::TooLong {
            field,
            max_bytes: MAX_PHRASE_BYTES,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
