// crates/cy-dictionary-config/src/lib.rs
// ============================================================================
// Module: Dictionary Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for cy-dictionary.toml semantics.
// Dependencies: cy-dictionary-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `cy-dictionary-config` defines the configuration model for the translation
//! dictionary service. It provides strict, fail-closed validation and a
//! canonical example file. Config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
