// crates/cy-dictionary-core/src/runtime/mod.rs
// ============================================================================
// Module: Dictionary Runtime
// Description: Upsert pipeline, repository adapter, write gate, and stores.
// Purpose: Group the runtime components that operate on dictionary entries.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime components are composed leaf to root: a persistence adapter
//! ([`InMemoryEntryPersistence`] or an external store) is wrapped by
//! [`ConflictAwareRepository`], which is driven by [`DictionaryService`].
//! [`WriteAuthorizer`] decides whether a caller may reach the write path.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod authz;
pub mod repository;
pub mod service;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authz::AuthzError;
pub use authz::WriteAuthorizer;
pub use authz::WriteDecision;
pub use repository::ConflictAwareRepository;
pub use service::DictionaryError;
pub use service::DictionaryService;
pub use service::MAX_PAGE_LIMIT;
pub use service::MAX_SAVE_ATTEMPTS;
pub use service::PhraseResult;
pub use service::PutReport;
pub use service::SaveAction;
pub use store::InMemoryEntryPersistence;
pub use store::SharedEntryPersistence;
