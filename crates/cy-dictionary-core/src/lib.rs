// crates/cy-dictionary-core/src/lib.rs
// ============================================================================
// Module: Dictionary Core Library
// Description: Public API surface for the translation dictionary core.
// Purpose: Expose dictionary types, persistence interfaces, and the upsert runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The dictionary core stores English phrases alongside their Welsh
//! translations and owns the conflict-safe upsert pipeline: persistence
//! failures caused by the english-phrase uniqueness constraint are classified
//! as conflicts and recovered through a bounded retry loop, while every other
//! storage failure propagates unchanged. The core is backend-agnostic and
//! integrates with stores through the [`EntryPersistence`] port.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::DictionaryRepository;
pub use interfaces::EntryPersistence;
pub use interfaces::PersistenceError;
pub use interfaces::RepositoryError;
pub use runtime::AuthzError;
pub use runtime::ConflictAwareRepository;
pub use runtime::DictionaryError;
pub use runtime::DictionaryService;
pub use runtime::InMemoryEntryPersistence;
pub use runtime::MAX_PAGE_LIMIT;
pub use runtime::MAX_SAVE_ATTEMPTS;
pub use runtime::PhraseResult;
pub use runtime::PutReport;
pub use runtime::SaveAction;
pub use runtime::SharedEntryPersistence;
pub use runtime::WriteAuthorizer;
pub use runtime::WriteDecision;
