// crates/cy-dictionary-http/src/lib.rs
// ============================================================================
// Module: Dictionary HTTP Surface
// Description: axum server, caller identity extraction, and audit sinks.
// Purpose: Expose dictionary operations over HTTP behind a trusted auth proxy.
// Dependencies: cy-dictionary-core, cy-dictionary-config, axum, serde_json
// ============================================================================

//! ## Overview
//! This crate wires the dictionary service onto HTTP routes. Caller identity
//! arrives in headers set by an upstream authentication proxy; write access is
//! decided by [`cy_dictionary_core::WriteAuthorizer`]. Every request emits a
//! JSON-line audit event. Security posture: request bodies and headers are
//! untrusted and size-limited before use.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod identity;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::PhraseFailureAuditEvent;
pub use audit::RequestAuditEvent;
pub use audit::SecurityAuditEvent;
pub use audit::StderrAuditSink;
pub use audit::WriteAuthzAuditEvent;
pub use audit::audit_sink_from_config;
pub use identity::IdentityHeaders;
pub use identity::RequestContext;
pub use server::DictionaryServer;
pub use server::ServerError;
