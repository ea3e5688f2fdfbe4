// crates/cy-dictionary-core/src/core/caller.rs
// ============================================================================
// Module: Caller Identity
// Description: Authenticated caller context passed explicitly to the gate.
// Purpose: Replace ambient security context with plain inputs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`CallerIdentity`] carries what an upstream authenticator established
//! about the caller: a subject, the caller's roles, and the declared
//! service-to-service client name. Authorization decisions consume these
//! values as plain inputs; nothing is read from global state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Caller Identity
// ============================================================================

/// Authenticated caller context.
///
/// # Invariants
/// - Role names and the service name are compared exactly (case-sensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Caller subject (user id or client label) when known.
    pub subject: Option<String>,
    /// Roles granted to the caller.
    pub roles: BTreeSet<String>,
    /// Declared service-to-service client name.
    pub service_name: Option<String>,
}

impl CallerIdentity {
    /// Creates an identity with no subject, roles, or service name.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns a copy with the subject set.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Returns a copy with an additional role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Returns a copy with the service name set.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// Returns the label recorded as the uploader of a write batch.
    ///
    /// Prefers the subject, then the service name, then `"unknown"`.
    #[must_use]
    pub fn uploader_label(&self) -> String {
        let non_blank = |value: &&str| !value.trim().is_empty();
        self.subject
            .as_deref()
            .filter(non_blank)
            .or_else(|| self.service_name.as_deref().filter(non_blank))
            .unwrap_or("unknown")
            .to_string()
    }
}
