// crates/cy-dictionary-http/src/server.rs
// ============================================================================
// Module: Dictionary HTTP Server
// Description: axum routes for dictionary reads, lookups, writes and resets.
// Purpose: Expose the dictionary service over HTTP with stable error codes.
// Dependencies: cy-dictionary-core, cy-dictionary-config, axum, tokio
// ============================================================================

//! ## Overview
//! The server maps each route onto a [`DictionaryService`] operation. Request
//! bodies are untrusted: size is checked before parsing, JSON is parsed
//! manually, and every failure is returned as `{"code", "message"}` with a
//! generic message. Store work runs in a blocking section so the async
//! executor is never stalled by `SQLite` I/O. The test-support reset route is
//! only mounted when enabled; otherwise it falls through to 404.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use cy_dictionary_config::DictionaryConfig;
use cy_dictionary_config::StoreType;
use cy_dictionary_core::AuthzError;
use cy_dictionary_core::ConflictAwareRepository;
use cy_dictionary_core::DictionaryError;
use cy_dictionary_core::DictionaryRequest;
use cy_dictionary_core::DictionaryService;
use cy_dictionary_core::InMemoryEntryPersistence;
use cy_dictionary_core::PutReport;
use cy_dictionary_core::SharedEntryPersistence;
use cy_dictionary_core::Timestamp;
use cy_dictionary_core::TranslationRequest;
use cy_dictionary_core::UploadMetadata;
use cy_dictionary_core::WriteAuthorizer;
use cy_dictionary_core::WriteDecision;
use cy_dictionary_store_sqlite::SqliteDictionaryStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::audit::AuditSink;
use crate::audit::PhraseFailureAuditEvent;
use crate::audit::RequestAuditEvent;
use crate::audit::RequestAuditEventParams;
use crate::audit::SecurityAuditEvent;
use crate::audit::WriteAuthzAuditEvent;
use crate::audit::audit_sink_from_config;
use crate::identity::IdentityHeaders;
use crate::identity::RequestContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Dictionary read and write route.
const DICTIONARY_ROUTE: &str = "/dictionary";
/// Welsh lookup route.
const TRANSLATION_ROUTE: &str = "/translation/cy";
/// Test-support reset route.
const TEST_PHRASES_ROUTE: &str = "/testing-support/dictionary/test-phrases";
/// Liveness route.
const HEALTH_ROUTE: &str = "/health";

/// Dictionary service bound to the shared entry store.
type DictionaryHandle = DictionaryService<ConflictAwareRepository<SharedEntryPersistence>>;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Dictionary HTTP server instance.
pub struct DictionaryServer {
    /// Validated bind address.
    bind: SocketAddr,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl DictionaryServer {
    /// Builds a server from configuration, opening the configured store and
    /// audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store or
    /// audit sink cannot be opened.
    pub fn from_config(config: &DictionaryConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = build_entry_store(config)?;
        let audit = audit_sink_from_config(&config.audit)
            .map_err(|err| ServerError::Init(format!("audit sink: {err}")))?;
        Self::from_parts(config, store, audit)
    }

    /// Builds a server over an explicit store and audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when configuration is invalid.
    pub fn from_parts(
        config: &DictionaryConfig,
        store: SharedEntryPersistence,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let authorizer = WriteAuthorizer::new(
            config.auth.manage_role.clone(),
            config.auth.effective_bypass_services(),
        );
        let test_phrase_prefix = config
            .testing_support
            .enabled
            .then(|| config.testing_support.test_phrase_prefix.clone());
        emit_bypass_warning(&authorizer, test_phrase_prefix.is_some(), audit.as_ref());
        let state = ServerState {
            service: DictionaryService::new(ConflictAwareRepository::new(store)),
            authorizer,
            identity: IdentityHeaders::from_config(&config.auth),
            audit,
            max_body_bytes: config.server.max_body_bytes,
            test_phrase_prefix,
        };
        Ok(Self {
            bind,
            state: Arc::new(state),
        })
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_listener(listener, std::future::pending()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_listener<F>(
        self,
        listener: tokio::net::TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }

    /// Builds the route table.
    fn router(&self) -> Router {
        let mut router = Router::new()
            .route(DICTIONARY_ROUTE, get(handle_get_dictionary).put(handle_put_dictionary))
            .route(TRANSLATION_ROUTE, post(handle_lookup))
            .route(HEALTH_ROUTE, get(handle_health));
        if self.state.test_phrase_prefix.is_some() {
            router = router.route(TEST_PHRASES_ROUTE, delete(handle_delete_test_phrases));
        }
        router
            .fallback(handle_not_found)
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }
}

/// Builds the entry store selected by configuration.
fn build_entry_store(config: &DictionaryConfig) -> Result<SharedEntryPersistence, ServerError> {
    let store = match config.store.store_type {
        StoreType::Memory => SharedEntryPersistence::from_persistence(InMemoryEntryPersistence::new()),
        StoreType::Sqlite => {
            let sqlite_config = config
                .store
                .sqlite_config()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let store = SqliteDictionaryStore::new(sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            SharedEntryPersistence::from_persistence(store)
        }
    };
    Ok(store)
}

/// Warns at startup when writes can bypass the manage role.
fn emit_bypass_warning(authorizer: &WriteAuthorizer, testing_support: bool, audit: &dyn AuditSink) {
    if authorizer.bypass_services().is_empty() {
        return;
    }
    let services: Vec<String> = authorizer.bypass_services().iter().cloned().collect();
    let _ = writeln!(
        std::io::stderr(),
        "cy-dictionary: WARNING: write bypass enabled for services [{}]; keep \
         auth.bypass_services empty in production",
        services.join(", ")
    );
    audit.record_security(&SecurityAuditEvent::bypass_enabled(services, testing_support));
}

// ============================================================================
// SECTION: Handler State
// ============================================================================

/// Shared state for HTTP handlers.
struct ServerState {
    /// Dictionary operations.
    service: DictionaryHandle,
    /// Write gate.
    authorizer: WriteAuthorizer,
    /// Identity header mapping.
    identity: IdentityHeaders,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// Reserved test prefix when test support is enabled.
    test_phrase_prefix: Option<String>,
}

impl ServerState {
    /// Builds the request context for a call.
    fn context(&self, peer: SocketAddr, headers: &HeaderMap) -> RequestContext {
        self.identity.request_context(headers).with_peer_ip(peer.ip())
    }

    /// Records the request event and converts the reply into a response.
    fn finish(
        &self,
        context: &RequestContext,
        method: &Method,
        route: &str,
        request_bytes: usize,
        reply: Reply,
    ) -> Response {
        self.audit.record(&RequestAuditEvent::new(RequestAuditEventParams {
            request_id: context.request_id.clone(),
            method: method.as_str().to_string(),
            route: route.to_string(),
            status: reply.status.as_u16(),
            error_code: reply.error_code,
            error_cause: reply.error_cause.clone(),
            caller_subject: context.caller_subject(),
            caller_service: context.caller_service(),
            peer_ip: context.peer_ip.map(|ip| ip.to_string()),
            request_bytes,
            response_bytes: reply.body.as_ref().map_or(0, Vec::len),
        }));
        reply.into_response()
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `GET /dictionary`: full dictionary, manage role required.
async fn handle_get_dictionary(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let context = state.context(peer, &headers);
    let reply = get_dictionary(&state, &context).unwrap_or_else(Reply::from);
    state.finish(&context, &Method::GET, DICTIONARY_ROUTE, 0, reply)
}

/// `PUT /dictionary`: upsert phrases, manage role or service bypass required.
async fn handle_put_dictionary(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let context = state.context(peer, &headers);
    let request_bytes = body.as_ref().map_or(0, Bytes::len);
    let reply = put_dictionary(&state, &context, body).unwrap_or_else(Reply::from);
    state.finish(&context, &Method::PUT, DICTIONARY_ROUTE, request_bytes, reply)
}

/// `POST /translation/cy`: look up phrases, no authentication.
async fn handle_lookup(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let context = state.context(peer, &headers);
    let request_bytes = body.as_ref().map_or(0, Bytes::len);
    let reply = lookup(&state, body).unwrap_or_else(Reply::from);
    state.finish(&context, &Method::POST, TRANSLATION_ROUTE, request_bytes, reply)
}

/// `DELETE /testing-support/dictionary/test-phrases`: remove test data.
async fn handle_delete_test_phrases(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let context = state.context(peer, &headers);
    let reply = delete_test_phrases(&state).unwrap_or_else(Reply::from);
    state.finish(&context, &Method::DELETE, TEST_PHRASES_ROUTE, 0, reply)
}

/// `GET /health`: liveness without touching the store.
async fn handle_health() -> Response {
    Reply::json(StatusCode::OK, &HealthResponse {
        status: "UP",
    })
    .into_response()
}

/// Fallback for unknown routes and unmounted test support.
async fn handle_not_found(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let context = state.context(peer, &headers);
    state.finish(&context, &method, uri.path(), 0, Reply::from(ApiError::NotFound))
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Reads the full dictionary for a caller holding the manage role.
fn get_dictionary(state: &ServerState, context: &RequestContext) -> Result<Reply, ApiError> {
    let caller = context.caller.as_ref().ok_or(ApiError::Unauthenticated)?;
    state.authorizer.require_role(caller)?;
    let dictionary = run_blocking(|| state.service.get_dictionary_contents())?;
    Ok(Reply::json(StatusCode::OK, &dictionary))
}

/// Authorizes and applies a dictionary upsert batch.
fn put_dictionary(
    state: &ServerState,
    context: &RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<Reply, ApiError> {
    let bytes = checked_body(state, body)?;
    let caller = context.caller.as_ref().ok_or(ApiError::Unauthenticated)?;
    let decision = state.authorizer.decide_write(caller);
    let missing_role = (decision == WriteDecision::Denied)
        .then(|| state.authorizer.manage_role().to_string());
    state.audit.record_authz(&WriteAuthzAuditEvent::new(
        context.request_id.clone(),
        decision.as_str(),
        missing_role,
        context.caller_subject(),
        context.caller_service(),
    ));
    state.authorizer.authorize_write(caller)?;
    let request: DictionaryRequest = parse_json(&bytes)?;
    let upload = UploadMetadata::new(caller.uploader_label(), now_timestamp());
    let report = run_blocking(|| state.service.put_dictionary(&request, &upload))?;
    record_phrase_failures(state, context, &report);
    if report.is_complete() {
        Ok(Reply::empty(StatusCode::CREATED))
    } else {
        Err(ApiError::WriteFailures(report))
    }
}

/// Looks up translations for the requested phrases.
fn lookup(state: &ServerState, body: Result<Bytes, BytesRejection>) -> Result<Reply, ApiError> {
    let bytes = checked_body(state, body)?;
    let request: TranslationRequest = parse_json(&bytes)?;
    let dictionary = run_blocking(|| state.service.get_translations(&request))?;
    Ok(Reply::json(StatusCode::OK, &dictionary))
}

/// Deletes every phrase carrying the reserved test prefix.
fn delete_test_phrases(state: &ServerState) -> Result<Reply, ApiError> {
    let prefix = state.test_phrase_prefix.as_deref().ok_or(ApiError::NotFound)?;
    run_blocking(|| state.service.delete_test_phrases(prefix))?;
    Ok(Reply::empty(StatusCode::NO_CONTENT))
}

/// Audits each phrase that failed within a batch.
fn record_phrase_failures(state: &ServerState, context: &RequestContext, report: &PutReport) {
    for failure in report.failures() {
        if let Err(err) = &failure.outcome {
            state.audit.record_phrase_failure(&PhraseFailureAuditEvent::new(
                context.request_id.clone(),
                failure.phrase.clone(),
                err.code(),
                failure.attempts,
                err.to_string(),
            ));
        }
    }
}

/// Enforces the body size limit and surfaces extractor failures.
fn checked_body(
    state: &ServerState,
    body: Result<Bytes, BytesRejection>,
) -> Result<Bytes, ApiError> {
    match body {
        Ok(bytes) if bytes.len() > state.max_body_bytes => Err(ApiError::PayloadTooLarge),
        Ok(bytes) => Ok(bytes),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(ApiError::PayloadTooLarge)
        }
        Err(_) => Err(ApiError::InvalidRequest("request body could not be read".to_string())),
    }
}

/// Parses a JSON request body.
fn parse_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(bytes.as_ref())
        .map_err(|_| ApiError::InvalidRequest("malformed request body".to_string()))
}

/// Runs store work, shifting to a blocking section on a multi-thread runtime.
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Returns the current wall-clock time as an upload timestamp.
fn now_timestamp() -> Timestamp {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Health response payload.
#[derive(Serialize)]
struct HealthResponse {
    /// Liveness status.
    status: &'static str,
}

/// Error response payload.
#[derive(Serialize)]
struct ErrorBody {
    /// Stable error code.
    code: &'static str,
    /// Generic human-readable reason.
    message: String,
    /// Failed phrases for partial write failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<PhraseFailureBody>,
}

/// One failed phrase in a write response.
#[derive(Serialize)]
struct PhraseFailureBody {
    /// English phrase that failed.
    phrase: String,
    /// Stable error code.
    code: &'static str,
}

/// Serialized reply plus audit annotations.
struct Reply {
    /// Response status.
    status: StatusCode,
    /// JSON body, if any.
    body: Option<Vec<u8>>,
    /// Stable error code for audit.
    error_code: Option<&'static str>,
    /// Internal cause for audit only.
    error_cause: Option<String>,
}

impl Reply {
    /// Builds a JSON reply.
    fn json(status: StatusCode, payload: &impl Serialize) -> Self {
        serde_json::to_vec(payload).map_or_else(
            |err| Self::from(ApiError::Serialization(err.to_string())),
            |body| Self {
                status,
                body: Some(body),
                error_code: None,
                error_cause: None,
            },
        )
    }

    /// Builds an empty reply.
    const fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: None,
            error_code: None,
            error_cause: None,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => {
                (self.status, [(CONTENT_TYPE, HeaderValue::from_static("application/json"))], body)
                    .into_response()
            }
            None => self.status.into_response(),
        }
    }
}

impl From<ApiError> for Reply {
    fn from(error: ApiError) -> Self {
        let status = error.status();
        let code = error.code();
        let cause = error.cause();
        let body = ErrorBody {
            code,
            message: error.message(),
            failures: error.failures(),
        };
        let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| {
            br#"{"code":"internal_error","message":"serialization failed"}"#.to_vec()
        });
        Self {
            status,
            body: Some(bytes),
            error_code: Some(code),
            error_cause: cause,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request failures mapped to HTTP responses.
#[derive(Debug)]
enum ApiError {
    /// Body exceeded the configured limit.
    PayloadTooLarge,
    /// Body unreadable or malformed.
    InvalidRequest(String),
    /// Gated route called without identity headers.
    Unauthenticated,
    /// Caller lacks the manage role and has no bypass.
    Forbidden(AuthzError),
    /// Dictionary operation failed.
    Dictionary(DictionaryError),
    /// One or more phrases of a batch failed.
    WriteFailures(PutReport),
    /// Route does not exist.
    NotFound,
    /// Response serialization failed.
    Serialization(String),
}

impl From<AuthzError> for ApiError {
    fn from(error: AuthzError) -> Self {
        Self::Forbidden(error)
    }
}

impl From<DictionaryError> for ApiError {
    fn from(error: DictionaryError) -> Self {
        Self::Dictionary(error)
    }
}

impl ApiError {
    /// HTTP status for the error.
    const fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Dictionary(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Dictionary(_) | Self::WriteFailures(_) | Self::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable error code.
    fn code(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge => "payload_too_large",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::Dictionary(err) => err.code(),
            Self::WriteFailures(report) => report
                .failures()
                .find_map(|failure| failure.outcome.as_ref().err().map(DictionaryError::code))
                .unwrap_or("storage_error"),
            Self::NotFound => "not_found",
            Self::Serialization(_) => "internal_error",
        }
    }

    /// Client-facing message; storage causes are never included.
    fn message(&self) -> String {
        match self {
            Self::PayloadTooLarge => "request body too large".to_string(),
            Self::InvalidRequest(message) => message.clone(),
            Self::Unauthenticated => "caller identity required".to_string(),
            Self::Forbidden(err) => err.to_string(),
            Self::Dictionary(err) => match err {
                DictionaryError::Validation(validation) => validation.to_string(),
                DictionaryError::DuplicatePhrase(_) => {
                    "stored dictionary failed an integrity check".to_string()
                }
                DictionaryError::StorageExhausted {
                    ..
                } => "phrase could not be saved after retries".to_string(),
                DictionaryError::Storage(_) => "storage failure".to_string(),
            },
            Self::WriteFailures(_) => "one or more phrases could not be saved".to_string(),
            Self::NotFound => "route not found".to_string(),
            Self::Serialization(_) => "serialization failed".to_string(),
        }
    }

    /// Internal cause recorded in the audit log.
    fn cause(&self) -> Option<String> {
        match self {
            Self::Dictionary(err) if !err.is_client_error() => Some(err.to_string()),
            Self::Serialization(cause) => Some(cause.clone()),
            _ => None,
        }
    }

    /// Failed phrases listed in a partial write response.
    fn failures(&self) -> Vec<PhraseFailureBody> {
        match self {
            Self::WriteFailures(report) => report
                .failures()
                .filter_map(|failure| {
                    failure.outcome.as_ref().err().map(|err| PhraseFailureBody {
                        phrase: failure.phrase.clone(),
                        code: err.code(),
                    })
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Dictionary server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
