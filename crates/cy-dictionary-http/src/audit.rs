// crates/cy-dictionary-http/src/audit.rs
// ============================================================================
// Module: Dictionary Audit Logging
// Description: Structured audit events for dictionary request handling.
// Purpose: Emit JSON-line audit records without a logging framework dependency.
// Dependencies: cy-dictionary-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line and routed through
//! an [`AuditSink`]. Storage causes are recorded here in full; HTTP responses
//! only ever carry the stable error code and a generic reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use cy_dictionary_config::AuditConfig;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Request completed with a 2xx status.
    Ok,
    /// Request was rejected as a client error.
    Rejected,
    /// Request failed server-side.
    Error,
}

impl RequestOutcome {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Ok,
            400..=499 => Self::Rejected,
            _ => Self::Error,
        }
    }
}

/// Per-request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// HTTP method.
    pub method: String,
    /// Route path.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// Stable error code when the request failed.
    pub error_code: Option<&'static str>,
    /// Full internal cause for server-side failures.
    pub error_cause: Option<String>,
    /// Caller subject when provided.
    pub caller_subject: Option<String>,
    /// Caller service name when provided.
    pub caller_service: Option<String>,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Inputs required to construct a request audit event.
pub struct RequestAuditEventParams {
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// HTTP method.
    pub method: String,
    /// Route path.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Stable error code when the request failed.
    pub error_code: Option<&'static str>,
    /// Full internal cause for server-side failures.
    pub error_cause: Option<String>,
    /// Caller subject when provided.
    pub caller_subject: Option<String>,
    /// Caller service name when provided.
    pub caller_service: Option<String>,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Write authorization audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct WriteAuthzAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Whether the write was allowed.
    pub allowed: bool,
    /// Decision path label (`role`, `service_bypass`, `denied`).
    pub decision: &'static str,
    /// Missing role on deny.
    pub missing_role: Option<String>,
    /// Caller subject when provided.
    pub caller_subject: Option<String>,
    /// Caller service name when provided.
    pub caller_service: Option<String>,
}

/// Per-phrase failure audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct PhraseFailureAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// English phrase that failed.
    pub phrase: String,
    /// Stable error code.
    pub error_code: &'static str,
    /// Save attempts made.
    pub attempts: u32,
    /// Full failure cause.
    pub cause: String,
}

/// Startup security posture event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Services allowed to write without the manage role.
    pub bypass_services: Vec<String>,
    /// Whether the test-support route is mounted.
    pub testing_support: bool,
}

impl RequestAuditEvent {
    /// Creates a new request event with a consistent timestamp.
    #[must_use]
    pub fn new(params: RequestAuditEventParams) -> Self {
        Self {
            event: "dictionary_request",
            timestamp_ms: now_millis(),
            request_id: params.request_id,
            method: params.method,
            route: params.route,
            status: params.status,
            outcome: RequestOutcome::from_status(params.status),
            error_code: params.error_code,
            error_cause: params.error_cause,
            caller_subject: params.caller_subject,
            caller_service: params.caller_service,
            peer_ip: params.peer_ip,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
        }
    }
}

impl WriteAuthzAuditEvent {
    /// Creates a new write authorization event.
    #[must_use]
    pub fn new(
        request_id: Option<String>,
        decision: &'static str,
        missing_role: Option<String>,
        caller_subject: Option<String>,
        caller_service: Option<String>,
    ) -> Self {
        Self {
            event: "dictionary_write_authz",
            timestamp_ms: now_millis(),
            request_id,
            allowed: missing_role.is_none(),
            decision,
            missing_role,
            caller_subject,
            caller_service,
        }
    }
}

impl PhraseFailureAuditEvent {
    /// Creates a new phrase failure event.
    #[must_use]
    pub fn new(
        request_id: Option<String>,
        phrase: impl Into<String>,
        error_code: &'static str,
        attempts: u32,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            event: "dictionary_phrase_failure",
            timestamp_ms: now_millis(),
            request_id,
            phrase: phrase.into(),
            error_code,
            attempts,
            cause: cause.into(),
        }
    }
}

impl SecurityAuditEvent {
    /// Creates the startup warning emitted when write bypass is configured.
    #[must_use]
    pub fn bypass_enabled(bypass_services: Vec<String>, testing_support: bool) -> Self {
        Self {
            event: "security_audit",
            timestamp_ms: now_millis(),
            kind: "write_bypass_enabled",
            message: "dictionary writes are allowed without the manage role for the listed \
                      services; keep auth.bypass_services empty in production"
                .to_string(),
            bypass_services,
            testing_support,
        }
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for dictionary events.
pub trait AuditSink: Send + Sync {
    /// Record a request event.
    fn record(&self, event: &RequestAuditEvent);

    /// Record a write authorization event.
    fn record_authz(&self, _event: &WriteAuthzAuditEvent) {}

    /// Record a per-phrase failure event.
    fn record_phrase_failure(&self, _event: &PhraseFailureAuditEvent) {}

    /// Record a security posture event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event line to stderr.
    fn write_line(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        Self::write_line(event);
    }

    fn record_authz(&self, event: &WriteAuthzAuditEvent) {
        Self::write_line(event);
    }

    fn record_phrase_failure(&self, event: &PhraseFailureAuditEvent) {
        Self::write_line(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        Self::write_line(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event line and flushes.
    fn write_line(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        self.write_line(event);
    }

    fn record_authz(&self, event: &WriteAuthzAuditEvent) {
        self.write_line(event);
    }

    fn record_phrase_failure(&self, event: &PhraseFailureAuditEvent) {
        self.write_line(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &RequestAuditEvent) {}
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the configured audit file cannot be opened.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => Ok(Arc::new(FileAuditSink::new(Path::new(path))?)),
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
