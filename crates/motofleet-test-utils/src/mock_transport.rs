// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging transport for deterministic testing.
//!
//! `MockTransport` implements `MessagingTransport` with injectable inbound
//! messages and captured outbound texts for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};

use motofleet_core::{
    AdapterType, FleetError, HealthStatus, MessageId, MessagingTransport, PluginAdapter,
    TransportMessage, TransportPayload,
};

/// A text passed to `send_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub to: String,
    pub body: String,
}

/// A mock transport for testing.
///
/// Provides two queues:
/// - **inbound**: messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: texts passed to `send_text()` are captured and retrievable via `sent_messages()`
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<TransportMessage>>>,
    sent: Arc<Mutex<Vec<SentText>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    /// Number of upcoming sends that fail before any is captured.
    failing_sends: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            failing_sends: AtomicUsize::new(0),
        }
    }

    /// Queues a message for the next `receive()`.
    pub async fn inject_message(&self, msg: TransportMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Queues a plain-text message from `from`.
    pub async fn inject_text(&self, from: &str, body: &str) {
        self.inject_message(text_message(from, body)).await;
    }

    /// Makes `receive()` fail with a transport error once the queue is empty.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Fails the next `count` sends.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentText> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Body of the most recent captured send.
    pub async fn last_sent(&self) -> Option<String> {
        self.sent.lock().await.last().map(|s| s.body.clone())
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a transport text message with a fresh id.
pub fn text_message(from: &str, body: &str) -> TransportMessage {
    TransportMessage {
        from: from.to_string(),
        message_id: format!("mock-in-{}", uuid::Uuid::new_v4()),
        timestamp: Utc::now(),
        payload: TransportPayload::Text {
            body: body.to_string(),
        },
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FleetError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FleetError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl MessagingTransport for MockTransport {
    async fn send_text(&self, to: &str, body: &str) -> Result<MessageId, FleetError> {
        let failing = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(FleetError::transport("mock send failure"));
        }
        self.sent.lock().await.push(SentText {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }

    async fn receive(&self) -> Result<TransportMessage, FleetError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(FleetError::transport("mock transport closed"));
            }
            notified.await;
        }
    }
}
