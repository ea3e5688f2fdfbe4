// crates/cy-dictionary-config/src/config.rs
// ============================================================================
// Module: Dictionary Configuration
// Description: Configuration loading and validation for the dictionary service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: cy-dictionary-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. The write-bypass list is
//! read once here and never changes while the service runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use cy_dictionary_store_sqlite::SqliteStoreConfig;
use cy_dictionary_store_sqlite::SqliteStoreMode;
use cy_dictionary_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "cy-dictionary.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CY_DICTIONARY_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of write-bypass services.
pub(crate) const MAX_BYPASS_SERVICES: usize = 64;
/// Maximum length of a bypass service name or role name.
pub(crate) const MAX_NAME_LENGTH: usize = 256;
/// Maximum length of a configured header name.
pub(crate) const MAX_HEADER_NAME_LENGTH: usize = 128;
/// Default role required for dictionary writes.
pub const DEFAULT_MANAGE_ROLE: &str = "manage-translations";
/// Default reserved prefix for test phrases.
pub const DEFAULT_TEST_PHRASE_PREFIX: &str = "TEST-";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Dictionary service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DictionaryConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Caller identity and write authorization configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Test-support endpoint configuration.
    #[serde(default)]
    pub testing_support: TestingSupportConfig,
    /// Entry store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl DictionaryConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.testing_support.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is missing or invalid.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("server.bind is required".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid server.bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.bind_addr()?;
        Ok(())
    }
}

/// Caller identity headers and write authorization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Role required for dictionary writes and full reads.
    #[serde(default = "default_manage_role")]
    pub manage_role: String,
    /// Service names allowed to write without the manage role.
    #[serde(default)]
    pub bypass_services: Vec<String>,
    /// Header carrying comma-separated caller roles.
    #[serde(default = "default_roles_header")]
    pub roles_header: String,
    /// Header carrying the calling service name.
    #[serde(default = "default_service_header")]
    pub service_header: String,
    /// Header carrying the calling user id.
    #[serde(default = "default_user_header")]
    pub user_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            manage_role: default_manage_role(),
            bypass_services: Vec::new(),
            roles_header: default_roles_header(),
            service_header: default_service_header(),
            user_header: default_user_header(),
        }
    }
}

impl AuthConfig {
    /// Returns the effective bypass services; blank entries mean "no bypass".
    #[must_use]
    pub fn effective_bypass_services(&self) -> Vec<String> {
        self.bypass_services.iter().filter(|service| !service.is_empty()).cloned().collect()
    }

    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let role = self.manage_role.trim();
        if role.is_empty() {
            return Err(ConfigError::Invalid("auth.manage_role must be non-empty".to_string()));
        }
        if role != self.manage_role || self.manage_role.len() > MAX_NAME_LENGTH {
            return Err(ConfigError::Invalid(
                "auth.manage_role must be trimmed and at most 256 bytes".to_string(),
            ));
        }
        if self.bypass_services.len() > MAX_BYPASS_SERVICES {
            return Err(ConfigError::Invalid("auth.bypass_services exceeds 64 entries".to_string()));
        }
        for service in &self.bypass_services {
            if service.len() > MAX_NAME_LENGTH {
                return Err(ConfigError::Invalid(
                    "auth.bypass_services entry exceeds 256 bytes".to_string(),
                ));
            }
            if service.trim() != service {
                return Err(ConfigError::Invalid(
                    "auth.bypass_services entries must not have surrounding whitespace"
                        .to_string(),
                ));
            }
        }
        validate_header_name("auth.roles_header", &self.roles_header)?;
        validate_header_name("auth.service_header", &self.service_header)?;
        validate_header_name("auth.user_header", &self.user_header)?;
        Ok(())
    }
}

/// Test-support endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TestingSupportConfig {
    /// Expose the test-phrase reset route.
    #[serde(default)]
    pub enabled: bool,
    /// Reserved prefix identifying test phrases.
    #[serde(default = "default_test_phrase_prefix")]
    pub test_phrase_prefix: String,
}

impl Default for TestingSupportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            test_phrase_prefix: default_test_phrase_prefix(),
        }
    }
}

impl TestingSupportConfig {
    /// Validates test-support configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.test_phrase_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "testing_support.test_phrase_prefix must be non-empty when enabled".to_string(),
            ));
        }
        if self.test_phrase_prefix.len() > MAX_NAME_LENGTH {
            return Err(ConfigError::Invalid(
                "testing_support.test_phrase_prefix exceeds 256 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Entry store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }
}

/// Entry store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a lowercase HTTP header name.
fn validate_header_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_HEADER_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} must be 1 to 128 bytes")));
    }
    let valid = value.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-');
    if !valid {
        return Err(ConfigError::Invalid(format!(
            "{field} must contain only lowercase letters, digits, and '-'"
        )));
    }
    Ok(())
}

/// Default max request body size.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default manage role.
fn default_manage_role() -> String {
    DEFAULT_MANAGE_ROLE.to_string()
}

/// Default roles header.
fn default_roles_header() -> String {
    "x-caller-roles".to_string()
}

/// Default service header.
fn default_service_header() -> String {
    "x-caller-service".to_string()
}

/// Default user header.
fn default_user_header() -> String {
    "x-caller-id".to_string()
}

/// Default test phrase prefix.
fn default_test_phrase_prefix() -> String {
    DEFAULT_TEST_PHRASE_PREFIX.to_string()
}

/// Default busy timeout for the sqlite store.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
