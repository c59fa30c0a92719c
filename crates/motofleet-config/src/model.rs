// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Motofleet configuration.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MotofleetConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Conversation timeout and escalation policy.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API credentials.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Webhook HTTP listener.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs and the health endpoint.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "motofleet".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Conversation lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Idle window applied to a conversation on every touch.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u32,

    /// Consecutive invalid inputs that force a reset to idle.
    #[serde(default = "default_max_error_count")]
    pub max_error_count: u32,

    /// How often the sweeper deletes expired conversations.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            max_error_count: default_max_error_count(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl ConversationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_minutes) * 60)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_timeout_minutes() -> u32 {
    30
}

fn default_max_error_count() -> u32 {
    3
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("motofleet").join("motofleet.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("motofleet.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Permanent or system-user access token. `None` disables the transport.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Sender phone number id from the Meta app dashboard.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Graph API base URL including the version segment.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Token echoed back during the webhook verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret for `X-Hub-Signature-256` checks. `None` skips verification.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Timeout for outbound API calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            api_base_url: default_api_base_url(),
            verify_token: None,
            app_secret: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WhatsAppConfig {
    /// Whether both credentials needed for sending are present.
    pub fn is_configured(&self) -> bool {
        self.access_token.is_some() && self.phone_number_id.is_some()
    }
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Webhook listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the WhatsApp webhook is mounted on.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}
