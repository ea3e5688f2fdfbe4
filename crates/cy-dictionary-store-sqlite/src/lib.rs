// crates/cy-dictionary-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Dictionary Store
// Description: Durable EntryPersistence backend using SQLite WAL.
// Purpose: Provide production persistence for dictionary entries and uploads.
// Dependencies: cy-dictionary-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`EntryPersistence`] implementation
//! that stores dictionary entries next to the upload record of their latest
//! write. The english-phrase uniqueness constraint is declared in the schema
//! and reported back by name so the core can classify write conflicts.
//! Security posture: database contents are untrusted and re-validated on read.
//!
//! [`EntryPersistence`]: cy_dictionary_core::EntryPersistence

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteDictionaryStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
