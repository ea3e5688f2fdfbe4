// crates/cy-dictionary-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `cy-dictionary.toml`. The example must always pass
//! [`crate::DictionaryConfig::validate`].

/// Returns a canonical example `cy-dictionary.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:4550"
max_body_bytes = 1048576

[auth]
manage_role = "manage-translations"
bypass_services = []
roles_header = "x-caller-roles"
service_header = "x-caller-service"
user_header = "x-caller-id"

[testing_support]
enabled = false
test_phrase_prefix = "TEST-"

[store]
type = "sqlite"
path = "data/dictionary.sqlite"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"

[audit]
enabled = true
# path = "logs/audit.jsonl"
"#,
    )
}
