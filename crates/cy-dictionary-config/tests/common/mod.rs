// crates/cy-dictionary-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for cy-dictionary-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use cy_dictionary_config::ConfigError;
use cy_dictionary_config::DictionaryConfig;

/// Parses a TOML string into a `DictionaryConfig` without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<DictionaryConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal valid config with all defaults applied.
pub fn minimal_config() -> Result<DictionaryConfig, toml::de::Error> {
    config_from_toml("[server]\nbind = \"127.0.0.1:4550\"\n")
}

/// Asserts that validation failed with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
