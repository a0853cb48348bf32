// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::JobcastConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &JobcastConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.storage.auth_dir.trim().is_empty() {
        errors.push(ConfigError::validation("storage.auth_dir must not be empty"));
    }

    if config.session.default_session_id.trim().is_empty() {
        errors.push(ConfigError::validation(
            "session.default_session_id must not be empty",
        ));
    }

    let url = config.session.transport_url.as_str();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(ConfigError::validation(format!(
            "session.transport_url `{url}` must be a ws:// or wss:// URL"
        )));
    }

    if config.session.connect_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "session.connect_timeout_secs must be at least 1",
        ));
    }

    let code = config.dispatch.country_code.as_str();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        errors.push(ConfigError::validation(format!(
            "dispatch.country_code must be digits only, got `{code}`"
        )));
    }

    if config.dispatch.send_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "dispatch.send_timeout_secs must be at least 1",
        ));
    }

    if config.broadcast.max_attempts == 0 {
        errors.push(ConfigError::validation(
            "broadcast.max_attempts must be at least 1",
        ));
    }

    if config.broadcast.backoff_secs.is_empty() {
        errors.push(ConfigError::validation(
            "broadcast.backoff_secs must list at least one delay",
        ));
    }

    if config.broadcast.max_recipients == 0 {
        errors.push(ConfigError::validation(
            "broadcast.max_recipients must be at least 1",
        ));
    }

    if config.broadcast.run_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "broadcast.run_timeout_secs must be at least 1",
        ));
    }

    if let Some(url) = &config.webhook.url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::validation(format!(
            "webhook.url `{url}` must be an http(s) URL"
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&JobcastConfig::default()).is_ok());
    }

    #[test]
    fn non_numeric_country_code_fails() {
        let mut config = JobcastConfig::default();
        config.dispatch.country_code = "+62".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "country_code"));
    }

    #[test]
    fn retry_policy_must_be_usable() {
        let mut config = JobcastConfig::default();
        config.broadcast.max_attempts = 0;
        config.broadcast.backoff_secs.clear();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_message(&errors, "max_attempts"));
        assert!(has_message(&errors, "backoff_secs"));
    }

    #[test]
    fn zero_connect_timeout_fails() {
        let mut config = JobcastConfig::default();
        config.session.connect_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "connect_timeout_secs"));
    }

    #[test]
    fn webhook_url_must_be_http() {
        let mut config = JobcastConfig::default();
        config.webhook.url = Some("ftp://example.com".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "webhook.url"));
    }
}
