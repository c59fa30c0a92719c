// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API transport for the Motofleet bot.
//!
//! Implements [`MessagingTransport`] with outbound text sends over the Graph
//! API and an inbound queue fed by the axum webhook in [`webhook`].

pub mod handler;
pub mod signature;
pub mod types;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use motofleet_config::model::WhatsAppConfig;
use motofleet_core::{
    AdapterType, FleetError, HealthStatus, MessageId, MessagingTransport, PluginAdapter,
    TransportMessage,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, SendResponse, SendTextRequest};

pub use webhook::{WebhookState, serve, serve_on, webhook_router};

/// Longest text body WhatsApp accepts, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Capacity of the webhook-to-bot queue.
const INBOUND_CAPACITY: usize = 100;

/// WhatsApp channel adapter implementing [`MessagingTransport`].
pub struct WhatsAppChannel {
    client: reqwest::Client,
    phone_url: String,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<TransportMessage>>,
    inbound_tx: mpsc::Sender<TransportMessage>,
}

impl WhatsAppChannel {
    /// Creates a new WhatsApp channel adapter.
    ///
    /// Requires `access_token` and `phone_number_id` to be set.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, FleetError> {
        let token = required(config.access_token.as_deref(), "whatsapp.access_token")?;
        let phone_number_id =
            required(config.phone_number_id.as_deref(), "whatsapp.phone_number_id")?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| FleetError::Config(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FleetError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        Ok(Self {
            client,
            phone_url: format!(
                "{}/{}",
                config.api_base_url.trim_end_matches('/'),
                phone_number_id
            ),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
        })
    }

    /// Sender half of the inbound queue, handed to the webhook state.
    pub fn inbound_sender(&self) -> mpsc::Sender<TransportMessage> {
        self.inbound_tx.clone()
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.phone_url)
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str, FleetError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(FleetError::Config(format!("{key} cannot be empty"))),
        None => Err(FleetError::Config(format!(
            "{key} is required for the WhatsApp transport"
        ))),
    }
}

/// Cuts `body` to at most [`MAX_MESSAGE_LENGTH`] characters.
pub fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(MAX_MESSAGE_LENGTH) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FleetError> {
        // The phone number node is readable with any valid token.
        match self.client.get(&self.phone_url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "WhatsApp API returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "WhatsApp API unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), FleetError> {
        debug!("WhatsApp channel shutting down");
        // Buffered messages stay receivable; receive() errors once drained.
        self.inbound_rx.lock().await.close();
        Ok(())
    }
}

#[async_trait]
impl MessagingTransport for WhatsAppChannel {
    async fn send_text(&self, to: &str, body: &str) -> Result<MessageId, FleetError> {
        let text = truncate_body(body);
        if text.len() < body.len() {
            warn!(to, "outbound text truncated to {MAX_MESSAGE_LENGTH} characters");
        }

        let response = self
            .client
            .post(self.messages_url())
            .json(&SendTextRequest::new(to, text))
            .send()
            .await
            .map_err(|e| FleetError::Transport {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => body,
            };
            return Err(FleetError::transport(format!(
                "WhatsApp API returned {status}: {detail}"
            )));
        }

        let parsed: SendResponse = response.json().await.map_err(|e| FleetError::Transport {
            message: format!("failed to parse send response: {e}"),
            source: Some(Box::new(e)),
        })?;
        let id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| FleetError::transport("send response carried no message id"))?;

        debug!(to, message_id = %id, "text sent");
        Ok(MessageId(id))
    }

    async fn receive(&self) -> Result<TransportMessage, FleetError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| FleetError::transport("WhatsApp inbound queue closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motofleet_core::TransportPayload;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> WhatsAppConfig {
        WhatsAppConfig {
            access_token: Some("test-token".into()),
            phone_number_id: Some("106540352242922".into()),
            api_base_url: base_url.to_string(),
            ..WhatsAppConfig::default()
        }
    }

    #[test]
    fn new_requires_token() {
        let cfg = WhatsAppConfig {
            access_token: None,
            ..config("http://localhost")
        };
        let err = WhatsAppChannel::new(&cfg).err().unwrap();
        assert!(matches!(err, FleetError::Config(msg) if msg.contains("access_token")));
    }

    #[test]
    fn new_rejects_empty_phone_number_id() {
        let cfg = WhatsAppConfig {
            phone_number_id: Some(String::new()),
            ..config("http://localhost")
        };
        assert!(matches!(
            WhatsAppChannel::new(&cfg),
            Err(FleetError::Config(_))
        ));
    }

    #[test]
    fn truncate_counts_characters() {
        let short = "שלום";
        assert_eq!(truncate_body(short), short);

        let long = "א".repeat(MAX_MESSAGE_LENGTH + 10);
        let cut = truncate_body(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_LENGTH);
    }

    #[tokio::test]
    async fn send_text_posts_to_messages_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/106540352242922/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "972500000001",
                "type": "text",
                "text": {"body": "שלום"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "contacts": [{"input": "972500000001", "wa_id": "972500000001"}],
                "messages": [{"id": "wamid.OUT1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(&config(&server.uri())).unwrap();
        let id = channel.send_text("972500000001", "שלום").await.unwrap();
        assert_eq!(id, MessageId("wamid.OUT1".into()));
    }

    #[tokio::test]
    async fn send_text_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Invalid OAuth access token.", "type": "OAuthException", "code": 190}
            })))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(&config(&server.uri())).unwrap();
        let err = channel.send_text("972500000001", "hi").await.unwrap_err();
        match err {
            FleetError::Transport { message, .. } => {
                assert!(message.contains("401"));
                assert!(message.contains("Invalid OAuth access token."));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_text_without_message_id_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": []
            })))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(&config(&server.uri())).unwrap();
        assert!(matches!(
            channel.send_text("972500000001", "hi").await,
            Err(FleetError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn health_check_reports_degraded_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/106540352242922"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(&config(&server.uri())).unwrap();
        assert!(matches!(
            channel.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }

    #[tokio::test]
    async fn receive_drains_queue_then_errors_after_shutdown() {
        let channel = WhatsAppChannel::new(&config("http://localhost")).unwrap();
        let tx = channel.inbound_sender();
        tx.send(TransportMessage {
            from: "972500000001".into(),
            message_id: "wamid.A".into(),
            timestamp: chrono::Utc::now(),
            payload: TransportPayload::Text { body: "1".into() },
        })
        .await
        .unwrap();

        channel.shutdown().await.unwrap();
        assert_eq!(channel.receive().await.unwrap().message_id, "wamid.A");
        assert!(matches!(
            channel.receive().await,
            Err(FleetError::Transport { .. })
        ));
    }
}
