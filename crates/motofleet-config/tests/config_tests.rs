// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Motofleet configuration system.

use motofleet_config::diagnostic::ConfigError;
use motofleet_config::model::MotofleetConfig;
use motofleet_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[bot]
name = "fleet-bot"
log_level = "debug"

[conversation]
timeout_minutes = 10
max_error_count = 4
cleanup_interval_secs = 60

[storage]
database_path = "/tmp/motofleet-test.db"
wal_mode = false

[whatsapp]
access_token = "EAAG..."
phone_number_id = "1098765"
api_base_url = "http://localhost:9000/v21.0"
verify_token = "hush"
app_secret = "s3cret"
request_timeout_secs = 5

[gateway]
host = "0.0.0.0"
port = 3000
webhook_path = "/hooks/whatsapp"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.name, "fleet-bot");
    assert_eq!(config.bot.log_level, "debug");
    assert_eq!(config.conversation.timeout_minutes, 10);
    assert_eq!(config.conversation.max_error_count, 4);
    assert_eq!(config.conversation.cleanup_interval_secs, 60);
    assert_eq!(config.storage.database_path, "/tmp/motofleet-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.whatsapp.access_token.as_deref(), Some("EAAG..."));
    assert_eq!(config.whatsapp.phone_number_id.as_deref(), Some("1098765"));
    assert_eq!(config.whatsapp.api_base_url, "http://localhost:9000/v21.0");
    assert_eq!(config.whatsapp.verify_token.as_deref(), Some("hush"));
    assert_eq!(config.whatsapp.app_secret.as_deref(), Some("s3cret"));
    assert_eq!(config.whatsapp.request_timeout_secs, 5);
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 3000);
    assert_eq!(config.gateway.webhook_path, "/hooks/whatsapp");
}

#[test]
fn empty_toml_uses_documented_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.bot.name, "motofleet");
    assert_eq!(config.bot.log_level, "info");
    assert_eq!(config.conversation.timeout_minutes, 30);
    assert_eq!(config.conversation.max_error_count, 3);
    assert_eq!(config.conversation.cleanup_interval_secs, 300);
    assert!(config.storage.wal_mode);
    assert!(config.storage.database_path.ends_with("motofleet.db"));
    assert!(config.whatsapp.access_token.is_none());
    assert_eq!(config.whatsapp.api_base_url, "https://graph.facebook.com/v21.0");
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.webhook_path, "/webhook");
}

#[test]
fn unknown_key_is_rejected_with_suggestion() {
    let toml = r#"
[conversation]
timeout_minuts = 5
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            valid_keys,
            span,
            ..
        } => {
            assert_eq!(key, "timeout_minuts");
            assert_eq!(suggestion.as_deref(), Some("timeout_minutes"));
            assert!(valid_keys.contains("max_error_count"));
            assert!(span.is_some());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::UnknownKey { key, .. } if key == "telegram"));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::InvalidType { key, .. } if key.contains("port")));
}

#[test]
fn zero_timeout_fails_validation() {
    let errors = load_and_validate_str("[conversation]\ntimeout_minutes = 0\n").unwrap_err();
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("timeout_minutes"))
    ));
}

#[test]
fn env_overrides_apply_to_file_config() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "fleet.toml",
            "[whatsapp]\naccess_token = \"from-file\"\n",
        )?;
        jail.set_env("MOTOFLEET_WHATSAPP_ACCESS_TOKEN", "from-env");
        jail.set_env("MOTOFLEET_GATEWAY_WEBHOOK_PATH", "/wa");
        let config = load_and_validate_path(std::path::Path::new("fleet.toml"))
            .map_err(|errs| format!("{errs:?}"))?;
        assert_eq!(config.whatsapp.access_token.as_deref(), Some("from-env"));
        assert_eq!(config.gateway.webhook_path, "/wa");
        Ok(())
    });
}

#[test]
fn serialized_defaults_roundtrip_through_toml() {
    let rendered = toml::to_string(&MotofleetConfig::default()).unwrap();
    let config = load_and_validate_str(&rendered).expect("defaults should validate");
    assert_eq!(config.conversation.max_error_count, 3);
}
