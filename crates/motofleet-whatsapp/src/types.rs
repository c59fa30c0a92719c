// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the WhatsApp Cloud API.
//!
//! Inbound types mirror the webhook notification shape
//! (`entry[].changes[].value.messages[]`). Only the fields the bot reads are
//! modelled; everything else is ignored by serde.

use serde::{Deserialize, Serialize};

/// The `object` value Meta sends for WhatsApp Business notifications.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

/// Top-level webhook notification body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

/// One business account's batch of changes.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: ChangeValue,
}

/// The payload of a `messages` change. Carries either inbound messages or
/// delivery status callbacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<WhatsAppMessage>,
    #[serde(default)]
    pub statuses: Vec<MessageStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    pub name: String,
}

/// A single inbound message.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppMessage {
    pub from: String,
    pub id: String,
    /// Unix seconds, sent as a string.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub interactive: Option<Interactive>,
    /// Quick-reply button on a template message.
    #[serde(default)]
    pub button: Option<TemplateButton>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextBody {
    pub body: String,
}

/// Reply to an interactive button or list message.
#[derive(Debug, Clone, Deserialize)]
pub struct Interactive {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub button_reply: Option<ButtonReply>,
    #[serde(default)]
    pub list_reply: Option<ListReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonReply {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListReply {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateButton {
    pub payload: String,
    pub text: String,
}

/// Delivery status callback (sent, delivered, read, failed).
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

// --- Outbound ---

/// Body for `POST /{phone_number_id}/messages` with a plain text message.
#[derive(Debug, Serialize)]
pub struct SendTextRequest<'a> {
    pub messaging_product: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: OutboundText<'a>,
}

#[derive(Debug, Serialize)]
pub struct OutboundText<'a> {
    pub body: &'a str,
}

impl<'a> SendTextRequest<'a> {
    pub fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: OutboundText { body },
        }
    }
}

/// Successful send response.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessageRef>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessageRef {
    pub id: String,
}

/// Graph API error envelope.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}
