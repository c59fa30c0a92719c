// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `motofleet cleanup` command implementation.

use std::sync::Arc;

use motofleet_bot::Sweeper;
use motofleet_config::MotofleetConfig;
use motofleet_core::{FleetError, PluginAdapter};
use motofleet_storage::SqliteStorage;

use crate::serve::conversation_settings;

/// Run the `motofleet cleanup` command.
pub async fn run_cleanup(config: &MotofleetConfig) -> Result<(), FleetError> {
    let removed = sweep_expired(config).await?;
    println!("motofleet cleanup: removed {removed} expired conversation(s)");
    Ok(())
}

/// Deletes every expired conversation once and returns how many went.
async fn sweep_expired(config: &MotofleetConfig) -> Result<u64, FleetError> {
    let storage = Arc::new(SqliteStorage::new(
        config.storage.clone(),
        conversation_settings(&config.conversation),
    ));
    storage.initialize().await?;

    let removed = Sweeper::new(storage.clone(), config.conversation.cleanup_interval())
        .sweep_once()
        .await?;

    storage.shutdown().await?;
    Ok(removed)
}
