// crates/cy-dictionary-http/src/identity.rs
// ============================================================================
// Module: Caller Identity Extraction
// Description: Build caller identities from trusted-proxy headers.
// Purpose: Pass identity explicitly into authorization instead of ambient state.
// Dependencies: axum, cy-dictionary-config, cy-dictionary-core
// ============================================================================

//! ## Overview
//! Tokens are validated upstream by an authentication proxy, which forwards
//! the caller's subject, roles and service name as headers. This module reads
//! those headers into a [`CallerIdentity`]. A request carrying none of them
//! has no identity at all and is rejected by gated routes as unauthenticated.
//! Header values that are oversized or not valid UTF-8 are ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;

use axum::http::HeaderMap;
use cy_dictionary_config::AuthConfig;
use cy_dictionary_core::CallerIdentity;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size of a single identity header value.
const MAX_IDENTITY_HEADER_BYTES: usize = 8 * 1024;
/// Maximum accepted size of the request id header value.
const MAX_REQUEST_ID_BYTES: usize = 128;
/// Header carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for authorization and auditing.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Caller identity when any identity header was present.
    pub caller: Option<CallerIdentity>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
}

impl RequestContext {
    /// Returns a copy with the peer address set.
    #[must_use]
    pub const fn with_peer_ip(mut self, peer_ip: IpAddr) -> Self {
        self.peer_ip = Some(peer_ip);
        self
    }

    /// Returns the caller subject, if any.
    #[must_use]
    pub fn caller_subject(&self) -> Option<String> {
        self.caller.as_ref().and_then(|caller| caller.subject.clone())
    }

    /// Returns the caller service name, if any.
    #[must_use]
    pub fn caller_service(&self) -> Option<String> {
        self.caller.as_ref().and_then(|caller| caller.service_name.clone())
    }
}

// ============================================================================
// SECTION: Header Mapping
// ============================================================================

/// Configured identity header names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    /// Header carrying comma-separated roles.
    roles: String,
    /// Header carrying the calling service name.
    service: String,
    /// Header carrying the calling user id.
    user: String,
}

impl IdentityHeaders {
    /// Builds the header mapping from auth configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            roles: config.roles_header.clone(),
            service: config.service_header.clone(),
            user: config.user_header.clone(),
        }
    }

    /// Extracts the request context from request headers.
    #[must_use]
    pub fn request_context(&self, headers: &HeaderMap) -> RequestContext {
        RequestContext {
            caller: self.caller_identity(headers),
            request_id: header_value(headers, REQUEST_ID_HEADER, MAX_REQUEST_ID_BYTES),
            peer_ip: None,
        }
    }

    /// Extracts the caller identity, or `None` when no identity header is set.
    #[must_use]
    pub fn caller_identity(&self, headers: &HeaderMap) -> Option<CallerIdentity> {
        let roles = header_value(headers, &self.roles, MAX_IDENTITY_HEADER_BYTES);
        let service = header_value(headers, &self.service, MAX_IDENTITY_HEADER_BYTES);
        let user = header_value(headers, &self.user, MAX_IDENTITY_HEADER_BYTES);
        if roles.is_none() && service.is_none() && user.is_none() {
            return None;
        }
        let mut caller = CallerIdentity::anonymous();
        if let Some(user) = user {
            caller = caller.with_subject(user);
        }
        if let Some(service) = service {
            caller = caller.with_service_name(service);
        }
        for role in roles.iter().flat_map(|roles| roles.split(',')) {
            let role = role.trim();
            if !role.is_empty() {
                caller = caller.with_role(role);
            }
        }
        Some(caller)
    }
}

/// Reads a trimmed, non-empty header value within the size limit.
fn header_value(headers: &HeaderMap, name: &str, max_bytes: usize) -> Option<String> {
    let value = headers.get(name)?;
    if value.len() > max_bytes {
        return None;
    }
    let value = value.to_str().ok()?.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only header fixtures."
    )]

    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn mapping() -> IdentityHeaders {
        IdentityHeaders::from_config(&AuthConfig::default())
    }

    #[test]
    fn roles_are_split_and_trimmed() {
        let caller = mapping()
            .caller_identity(&headers(&[("x-caller-roles", " caseworker, manage-translations ,,")]))
            .unwrap();
        let roles: Vec<&str> = caller.roles.iter().map(String::as_str).collect();
        assert_eq!(roles, vec!["caseworker", "manage-translations"]);
        assert_eq!(caller.subject, None);
    }

    #[test]
    fn missing_headers_yield_no_identity() {
        assert!(mapping().caller_identity(&HeaderMap::new()).is_none());
        assert!(mapping().caller_identity(&headers(&[("x-caller-roles", "  ")])).is_none());
    }

    #[test]
    fn service_and_user_headers_populate_identity() {
        let caller = mapping()
            .caller_identity(&headers(&[
                ("x-caller-service", "xui_webapp"),
                ("x-caller-id", "user-7"),
            ]))
            .unwrap();
        assert_eq!(caller.service_name.as_deref(), Some("xui_webapp"));
        assert_eq!(caller.subject.as_deref(), Some("user-7"));
        assert!(caller.roles.is_empty());
    }

    #[test]
    fn request_id_is_propagated_when_within_limit() {
        let context = mapping().request_context(&headers(&[("x-request-id", "abc-123")]));
        assert_eq!(context.request_id.as_deref(), Some("abc-123"));
        let long = "r".repeat(MAX_REQUEST_ID_BYTES + 1);
        let context = mapping().request_context(&headers(&[("x-request-id", long.as_str())]));
        assert_eq!(context.request_id, None);
    }
}
