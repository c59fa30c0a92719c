// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `motofleet doctor` command implementation.
//!
//! Prints a configuration summary and runs diagnostic checks against the
//! database and the WhatsApp Cloud API.

use std::time::{Duration, Instant};

use motofleet_config::MotofleetConfig;
use motofleet_config::model::WhatsAppConfig;
use motofleet_core::{FleetError, HealthStatus, PluginAdapter};
use motofleet_storage::SqliteStorage;
use motofleet_whatsapp::WhatsAppChannel;

use crate::serve::conversation_settings;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `motofleet doctor` command.
///
/// Fails when any check fails. Warnings are reported but do not fail.
pub async fn run_doctor(config: &MotofleetConfig) -> Result<(), FleetError> {
    print_summary(config);

    let results = vec![
        check_database(config).await,
        check_credentials(&config.whatsapp),
        check_webhook_security(&config.whatsapp),
        check_whatsapp_api(&config.whatsapp).await,
    ];

    println!("  checks");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => {
                warn_count += 1;
                "[WARN]"
            }
            CheckStatus::Fail => {
                fail_count += 1;
                "[FAIL]"
            }
        };
        println!(
            "    {tag} {:<20} {} ({}ms)",
            result.name,
            result.message,
            result.duration.as_millis()
        );
    }
    println!();

    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if fail_count > 0 {
        return Err(FleetError::Config(format!("{fail_count} check(s) failed")));
    }
    Ok(())
}

fn print_summary(config: &MotofleetConfig) {
    println!();
    println!("  motofleet doctor");
    println!("  {}", "-".repeat(50));
    println!("    {:<20} {}", "bot.name", config.bot.name);
    println!("    {:<20} {}", "storage", config.storage.database_path);
    println!(
        "    {:<20} {} min, {} strikes, sweep every {}s",
        "conversation",
        config.conversation.timeout_minutes,
        config.conversation.max_error_count,
        config.conversation.cleanup_interval_secs
    );
    println!(
        "    {:<20} {}:{}{}",
        "webhook", config.gateway.host, config.gateway.port, config.gateway.webhook_path
    );
    println!("    {:<20} {}", "whatsapp api", config.whatsapp.api_base_url);
    println!();
}

/// Opens the database (running migrations) and pings it.
async fn check_database(config: &MotofleetConfig) -> CheckResult {
    let start = Instant::now();
    let storage = SqliteStorage::new(
        config.storage.clone(),
        conversation_settings(&config.conversation),
    );
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let result = match storage.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("Database", CheckStatus::Pass, "connected", start)
        }
        Ok(HealthStatus::Degraded(msg)) => {
            CheckResult::new("Database", CheckStatus::Warn, msg, start)
        }
        Ok(HealthStatus::Unhealthy(msg)) => {
            CheckResult::new("Database", CheckStatus::Fail, msg, start)
        }
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    };
    if let Err(e) = storage.shutdown().await {
        tracing::warn!(error = %e, "database checkpoint failed during doctor");
    }
    result
}

fn check_credentials(config: &WhatsAppConfig) -> CheckResult {
    let start = Instant::now();
    if config.is_configured() {
        CheckResult::new("WhatsApp credentials", CheckStatus::Pass, "present", start)
    } else {
        CheckResult::new(
            "WhatsApp credentials",
            CheckStatus::Fail,
            "access_token and phone_number_id are required",
            start,
        )
    }
}

fn check_webhook_security(config: &WhatsAppConfig) -> CheckResult {
    let start = Instant::now();
    match (&config.verify_token, &config.app_secret) {
        (Some(_), Some(_)) => CheckResult::new(
            "Webhook security",
            CheckStatus::Pass,
            "verify token and app secret set",
            start,
        ),
        (None, _) => CheckResult::new(
            "Webhook security",
            CheckStatus::Warn,
            "verify_token not set, handshake will be refused",
            start,
        ),
        (Some(_), None) => CheckResult::new(
            "Webhook security",
            CheckStatus::Warn,
            "app_secret not set, deliveries are not authenticated",
            start,
        ),
    }
}

/// Reads the phone number node with the configured token.
async fn check_whatsapp_api(config: &WhatsAppConfig) -> CheckResult {
    let start = Instant::now();
    let channel = match WhatsAppChannel::new(config) {
        Ok(channel) => channel,
        Err(e) => {
            return CheckResult::new("WhatsApp API", CheckStatus::Warn, format!("skipped: {e}"), start);
        }
    };
    match channel.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new("WhatsApp API", CheckStatus::Pass, "reachable", start),
        Ok(HealthStatus::Degraded(msg)) => CheckResult::new("WhatsApp API", CheckStatus::Warn, msg, start),
        Ok(HealthStatus::Unhealthy(msg)) => CheckResult::new("WhatsApp API", CheckStatus::Fail, msg, start),
        Err(e) => CheckResult::new("WhatsApp API", CheckStatus::Fail, e.to_string(), start),
    }
}
