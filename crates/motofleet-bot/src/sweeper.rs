// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic deletion of expired conversations.

use std::sync::Arc;
use std::time::Duration;

use motofleet_core::{ConversationStore, FleetError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct Sweeper {
    store: Arc<dyn ConversationStore>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<dyn ConversationStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Runs one sweep and returns the number of conversations removed.
    pub async fn sweep_once(&self) -> Result<u64, FleetError> {
        let removed = self.store.cleanup_expired().await?;
        if removed > 0 {
            info!(removed, "expired conversations swept");
        } else {
            debug!("no expired conversations");
        }
        Ok(removed)
    }

    /// Sweeps every interval until cancelled. Failed sweeps are logged and retried
    /// on the next tick.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        warn!(error = %e, "conversation sweep failed");
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("sweeper stopped");
                    break;
                }
            }
        }
    }
}
