// crates/cy-dictionary-core/src/core/mod.rs
// ============================================================================
// Module: Dictionary Core Types
// Description: Canonical dictionary entries, request payloads, and identities.
// Purpose: Provide stable, serializable types for the dictionary service.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Dictionary core types define stored entries and their upload records, the
//! public request/response payloads, and the caller identity consumed by the
//! write authorization gate. These types are the source of truth for the HTTP
//! surface and the store adapters.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod caller;
pub mod dictionary;
pub mod entry;
pub mod identifiers;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use caller::CallerIdentity;
pub use dictionary::Dictionary;
pub use dictionary::DictionaryRequest;
pub use dictionary::MAX_PHRASE_BYTES;
pub use dictionary::TranslationRequest;
pub use dictionary::ValidationError;
pub use dictionary::normalize_translation;
pub use entry::DictionaryEntry;
pub use entry::ENGLISH_PHRASE_UNIQUE_CONSTRAINT;
pub use entry::EntryPage;
pub use entry::EntryWrite;
pub use entry::PageRequest;
pub use entry::UploadMetadata;
pub use entry::UploadRecord;
pub use entry::WriteTarget;
pub use identifiers::EntryId;
pub use identifiers::UploadVersionId;
pub use time::Timestamp;
