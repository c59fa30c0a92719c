// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging transport trait for chat platform integrations.

use async_trait::async_trait;

use crate::error::FleetError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MessageId, TransportMessage};

/// Bidirectional text messaging over a third-party chat API.
#[async_trait]
pub trait MessagingTransport: PluginAdapter {
    /// Sends a plain-text message to `to` (a phone identifier).
    async fn send_text(&self, to: &str, body: &str) -> Result<MessageId, FleetError>;

    /// Waits for the next inbound message.
    ///
    /// Returns [`FleetError::Transport`] once the inbound side is closed.
    async fn receive(&self) -> Result<TransportMessage, FleetError>;
}
