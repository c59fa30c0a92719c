// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::MotofleetConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &MotofleetConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.conversation.timeout_minutes < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "conversation.timeout_minutes must be at least 1, got {}",
                config.conversation.timeout_minutes
            ),
        });
    }

    if config.conversation.max_error_count < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "conversation.max_error_count must be at least 1, got {}",
                config.conversation.max_error_count
            ),
        });
    }

    if config.conversation.cleanup_interval_secs < 1 {
        errors.push(ConfigError::Validation {
            message: "conversation.cleanup_interval_secs must be at least 1".to_string(),
        });
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if !config.gateway.webhook_path.starts_with('/') {
        errors.push(ConfigError::Validation {
            message: format!(
                "gateway.webhook_path must start with `/`, got `{}`",
                config.gateway.webhook_path
            ),
        });
    }

    let base = config.whatsapp.api_base_url.as_str();
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        errors.push(ConfigError::Validation {
            message: format!("whatsapp.api_base_url `{base}` must be an http(s) URL"),
        });
    }

    if config.whatsapp.request_timeout_secs < 1 {
        errors.push(ConfigError::Validation {
            message: "whatsapp.request_timeout_secs must be at least 1".to_string(),
        });
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
        let config = MotofleetConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = MotofleetConfig::default();
        config.conversation.timeout_minutes = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "timeout_minutes"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = MotofleetConfig::default();
        config.storage.database_path = " ".to_string();
        config.conversation.max_error_count = 0;
        config.gateway.webhook_path = "webhook".to_string();
        config.whatsapp.api_base_url = "graph.facebook.com".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(has_message(&errors, "database_path"));
        assert!(has_message(&errors, "max_error_count"));
        assert!(has_message(&errors, "webhook_path"));
        assert!(has_message(&errors, "api_base_url"));
    }

    #[test]
    fn bad_host_fails_validation() {
        let mut config = MotofleetConfig::default();
        config.gateway.host = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "gateway.host"));
    }

    #[test]
    fn ipv6_host_is_accepted() {
        let mut config = MotofleetConfig::default();
        config.gateway.host = "::1".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
