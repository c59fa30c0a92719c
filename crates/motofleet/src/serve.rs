// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `motofleet serve` command implementation.
//!
//! Wires storage, the WhatsApp transport, the webhook server, the bot loop
//! and the expiry sweeper, then runs until a shutdown signal arrives.

use std::sync::Arc;

use chrono::TimeDelta;
use motofleet_bot::{Bot, Sweeper, install_signal_handler};
use motofleet_config::MotofleetConfig;
use motofleet_config::model::ConversationConfig;
use motofleet_conversation::StateMachine;
use motofleet_core::{ConversationSettings, FleetError, PluginAdapter};
use motofleet_storage::SqliteStorage;
use motofleet_whatsapp::{WebhookState, WhatsAppChannel, webhook_router};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Maps the conversation config section onto the runtime policy.
pub fn conversation_settings(config: &ConversationConfig) -> ConversationSettings {
    ConversationSettings {
        timeout: TimeDelta::minutes(i64::from(config.timeout_minutes)),
        max_error_count: config.max_error_count,
    }
}

/// Run the `motofleet serve` command.
pub async fn run_serve(config: MotofleetConfig) -> Result<(), FleetError> {
    init_tracing(&config.bot.log_level);

    info!(name = %config.bot.name, "starting motofleet serve");

    let settings = conversation_settings(&config.conversation);
    let storage = Arc::new(SqliteStorage::new(config.storage.clone(), settings));
    storage.initialize().await?;

    let channel = Arc::new(WhatsAppChannel::new(&config.whatsapp)?);
    if config.whatsapp.verify_token.is_none() {
        warn!("whatsapp.verify_token not set, webhook verification will be refused");
    }
    if config.whatsapp.app_secret.is_none() {
        warn!("whatsapp.app_secret not set, webhook deliveries are not authenticated");
    }

    let machine = Arc::new(StateMachine::new(
        storage.clone(),
        storage.clone(),
        storage.clone(),
        settings,
    ));
    let bot = Arc::new(Bot::new(machine, storage.clone(), channel.clone()));

    let cancel = install_signal_handler();

    let server = spawn_webhook_server(&config, &channel, cancel.clone());

    let sweeper = tokio::spawn(
        Sweeper::new(storage.clone(), config.conversation.cleanup_interval()).run(cancel.clone()),
    );
    info!(
        interval_secs = config.conversation.cleanup_interval_secs,
        timeout_minutes = config.conversation.timeout_minutes,
        "conversation sweeper started"
    );

    bot.run(cancel.clone()).await?;
    cancel.cancel();

    let server_result = match server.await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "webhook server task panicked");
            Ok(())
        }
    };
    if let Err(e) = sweeper.await {
        error!(error = %e, "sweeper task panicked");
    }

    channel.shutdown().await?;
    storage.shutdown().await?;

    info!("motofleet serve shutdown complete");
    server_result
}

/// Starts the webhook server in the background.
///
/// A server failure cancels `cancel`, which stops the rest of `serve`.
fn spawn_webhook_server(
    config: &MotofleetConfig,
    channel: &WhatsAppChannel,
    cancel: CancellationToken,
) -> JoinHandle<Result<(), FleetError>> {
    let router = webhook_router(
        &config.gateway.webhook_path,
        WebhookState::new(channel.inbound_sender(), &config.whatsapp),
    );
    let gateway = config.gateway.clone();
    tokio::spawn(async move {
        let result = motofleet_whatsapp::serve(&gateway, router, cancel.clone()).await;
        if let Err(ref e) = result {
            error!(error = %e, "webhook server failed");
            cancel.cancel();
        }
        result
    })
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("motofleet={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
