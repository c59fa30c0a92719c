// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridges a messaging transport to the conversation state machine.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use motofleet_conversation::{StateMachine, response};
use motofleet_core::{FleetError, MessagingTransport, TransportMessage, UserDirectory};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::convert::to_inbound;
use crate::shutdown::drain_tasks;

/// How long [`Bot::run`] waits for in-flight messages after cancellation.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a recoverable receive error before polling again.
pub const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl DispatchOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: &FleetError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Sends exactly one reply per inbound message.
///
/// Messages from the same sender are processed one at a time. Different
/// senders never wait on each other.
pub struct Bot {
    machine: Arc<StateMachine>,
    users: Arc<dyn UserDirectory>,
    transport: Arc<dyn MessagingTransport>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl Bot {
    pub fn new(
        machine: Arc<StateMachine>,
        users: Arc<dyn UserDirectory>,
        transport: Arc<dyn MessagingTransport>,
    ) -> Self {
        Self {
            machine,
            users,
            transport,
            in_flight: DashMap::new(),
        }
    }

    /// Handles one message end to end. Never panics or returns an error.
    pub async fn handle_message(&self, message: TransportMessage) -> DispatchOutcome {
        let sender = message.from.clone();
        let lock = self.in_flight.entry(sender.clone()).or_default().clone();
        let outcome = {
            let _guard = lock.lock().await;
            self.dispatch(message).await
        };
        drop(lock);
        self.in_flight
            .remove_if(&sender, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn dispatch(&self, message: TransportMessage) -> DispatchOutcome {
        let inbound = to_inbound(message);
        let from = inbound.from.clone();

        let reply = match self.users.get_or_create_by_phone(&from).await {
            Ok(user) => {
                let result = self.machine.process_transition(&user, &inbound).await;
                debug!(
                    user_id = %user.id,
                    message_id = %inbound.message_id,
                    state = %result.conversation.state,
                    end = result.should_end_conversation,
                    "transition complete"
                );
                result.response
            }
            Err(e) => {
                error!(from = %from, message_id = %inbound.message_id, error = %e, "user lookup failed");
                self.send_apology(&from).await;
                return DispatchOutcome::failed(&e);
            }
        };

        match self.transport.send_text(&from, &reply).await {
            Ok(_) => DispatchOutcome::ok(),
            Err(e) => {
                error!(from = %from, message_id = %inbound.message_id, error = %e, "failed to send reply");
                self.send_apology(&from).await;
                DispatchOutcome::failed(&e)
            }
        }
    }

    async fn send_apology(&self, to: &str) {
        if let Err(e) = self.transport.send_text(to, &response::apology()).await {
            warn!(to = %to, error = %e, "failed to send apology");
        }
    }

    /// Number of senders with a message currently being processed.
    pub fn active_senders(&self) -> usize {
        self.in_flight.len()
    }

    /// Receives until cancelled or the transport closes, one task per message.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<(), FleetError> {
        info!(transport = self.transport.name(), "bot loop running");
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                received = self.transport.receive() => match received {
                    Ok(message) => {
                        let bot = Arc::clone(&self);
                        tasks.spawn(async move {
                            let outcome = bot.handle_message(message).await;
                            if !outcome.success {
                                debug!(error = ?outcome.error, "message handled with failure");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "transport receive error");
                        if matches!(e, FleetError::Transport { .. }) {
                            break;
                        }
                        tokio::select! {
                            _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                            _ = cancel.cancelled() => {
                                info!("shutdown signal received, stopping bot loop");
                                break;
                            }
                        }
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "message task panicked");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping bot loop");
                    break;
                }
            }
        }

        drain_tasks(&mut tasks, DRAIN_TIMEOUT).await;
        info!("bot loop stopped");
        Ok(())
    }
}
