// crates/cy-dictionary-core/src/runtime/authz.rs
// ============================================================================
// Module: Write Authorization
// Description: Role and service-bypass gate for dictionary writes.
// Purpose: Decide, fail-closed, whether a caller may reach the write path.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! A write is allowed when the caller holds the manage role, or when the
//! caller's service name is in the configured bypass list. The bypass exists
//! for trusted upstream services and should stay empty in production. Role
//! and service names are matched exactly; an empty service name never
//! matches a bypass entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::CallerIdentity;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// Caller lacks the required role and has no bypass.
    #[error("caller lacks required role `{missing_role}`")]
    Forbidden {
        /// Role the caller would need.
        missing_role: String,
    },
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Outcome of a write authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    /// Caller holds the manage role.
    Role,
    /// Caller's service is on the bypass list.
    ServiceBypass,
    /// Caller may not write.
    Denied,
}

impl WriteDecision {
    /// Returns true when the write may proceed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        !matches!(self, Self::Denied)
    }

    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::ServiceBypass => "service_bypass",
            Self::Denied => "denied",
        }
    }
}

// ============================================================================
// SECTION: Authorizer
// ============================================================================

/// Write gate configured with the manage role and bypass services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAuthorizer {
    /// Role required for writes.
    manage_role: String,
    /// Services allowed to write without the role.
    bypass_services: BTreeSet<String>,
}

impl WriteAuthorizer {
    /// Builds an authorizer; blank bypass entries are discarded.
    #[must_use]
    pub fn new<I, S>(manage_role: impl Into<String>, bypass_services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            manage_role: manage_role.into(),
            bypass_services: bypass_services
                .into_iter()
                .map(Into::into)
                .filter(|service: &String| !service.trim().is_empty())
                .collect(),
        }
    }

    /// Returns the role required for writes.
    #[must_use]
    pub fn manage_role(&self) -> &str {
        &self.manage_role
    }

    /// Returns the configured bypass services.
    #[must_use]
    pub const fn bypass_services(&self) -> &BTreeSet<String> {
        &self.bypass_services
    }

    /// Returns true when the role set or service name permits a write.
    #[must_use]
    pub fn is_write_authorized(&self, roles: &BTreeSet<String>, service_name: Option<&str>) -> bool {
        self.decide(roles, service_name).is_allowed()
    }

    /// Decides whether the caller may write.
    #[must_use]
    pub fn decide_write(&self, caller: &CallerIdentity) -> WriteDecision {
        self.decide(&caller.roles, caller.service_name.as_deref())
    }

    /// Authorizes a write for the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Forbidden`] naming the manage role when the
    /// caller has neither the role nor a bypass.
    pub fn authorize_write(&self, caller: &CallerIdentity) -> Result<WriteDecision, AuthzError> {
        match self.decide_write(caller) {
            WriteDecision::Denied => Err(self.forbidden()),
            decision => Ok(decision),
        }
    }

    /// Requires the manage role with no service bypass.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Forbidden`] when the caller lacks the role.
    pub fn require_role(&self, caller: &CallerIdentity) -> Result<(), AuthzError> {
        if caller.roles.contains(&self.manage_role) { Ok(()) } else { Err(self.forbidden()) }
    }

    /// Shared decision over roles and service name.
    fn decide(&self, roles: &BTreeSet<String>, service_name: Option<&str>) -> WriteDecision {
        if roles.contains(&self.manage_role) {
            return WriteDecision::Role;
        }
        match service_name {
            Some(service) if !service.is_empty() && self.bypass_services.contains(service) => {
                WriteDecision::ServiceBypass
            }
            _ => WriteDecision::Denied,
        }
    }

    /// Builds the forbidden error for this gate.
    fn forbidden(&self) -> AuthzError {
        AuthzError::Forbidden {
            missing_role: self.manage_role.clone(),
        }
    }
}
