// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload extraction.
//!
//! Flattens a notification into channel-agnostic [`TransportMessage`]s.
//! Status callbacks and non-WhatsApp objects produce nothing.

use chrono::{DateTime, Utc};
use motofleet_core::{MediaKind, TransportMessage, TransportPayload};
use tracing::debug;

use crate::types::{WHATSAPP_OBJECT, WebhookPayload, WhatsAppMessage};

/// Extracts every inbound message in `payload`, in delivery order.
pub fn extract_messages(payload: &WebhookPayload) -> Vec<TransportMessage> {
    if payload.object != WHATSAPP_OBJECT {
        debug!(object = %payload.object, "ignoring non-whatsapp webhook object");
        return Vec::new();
    }

    let mut out = Vec::new();
    for entry in &payload.entry {
        for change in &entry.changes {
            if !change.value.statuses.is_empty() {
                debug!(
                    count = change.value.statuses.len(),
                    "ignoring status callbacks"
                );
            }
            out.extend(change.value.messages.iter().map(convert_message));
        }
    }
    out
}

/// Converts one WhatsApp message.
pub fn convert_message(msg: &WhatsAppMessage) -> TransportMessage {
    TransportMessage {
        from: msg.from.clone(),
        message_id: msg.id.clone(),
        timestamp: parse_timestamp(&msg.timestamp),
        payload: payload_of(msg),
    }
}

fn payload_of(msg: &WhatsAppMessage) -> TransportPayload {
    match msg.kind.as_str() {
        "text" => TransportPayload::Text {
            body: msg
                .text
                .as_ref()
                .map(|t| t.body.clone())
                .unwrap_or_default(),
        },
        "interactive" => {
            let interactive = msg.interactive.as_ref();
            if let Some(reply) = interactive.and_then(|i| i.button_reply.as_ref()) {
                TransportPayload::ButtonReply {
                    id: reply.id.clone(),
                    title: reply.title.clone(),
                }
            } else if let Some(reply) = interactive.and_then(|i| i.list_reply.as_ref()) {
                TransportPayload::ListReply {
                    id: reply.id.clone(),
                    title: reply.title.clone(),
                    description: reply.description.clone(),
                }
            } else {
                TransportPayload::Unsupported {
                    kind: "interactive".to_string(),
                }
            }
        }
        "button" => match msg.button.as_ref() {
            Some(b) => TransportPayload::ButtonReply {
                id: b.payload.clone(),
                title: b.text.clone(),
            },
            None => TransportPayload::Unsupported {
                kind: "button".to_string(),
            },
        },
        "image" => TransportPayload::Media {
            kind: MediaKind::Image,
        },
        "document" => TransportPayload::Media {
            kind: MediaKind::Document,
        },
        "audio" => TransportPayload::Media {
            kind: MediaKind::Audio,
        },
        "video" => TransportPayload::Media {
            kind: MediaKind::Video,
        },
        other => TransportPayload::Unsupported {
            kind: other.to_string(),
        },
    }
}

/// Parses a unix-seconds string. Falls back to now for malformed values.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(|| {
            debug!(raw, "unparseable webhook timestamp, using receive time");
            Utc::now()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(messages: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "102290129340398",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"display_phone_number": "15550783881", "phone_number_id": "106540352242922"},
                        "contacts": [{"profile": {"name": "דני"}, "wa_id": "972500000001"}],
                        "messages": messages
                    }
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn text_message_extracted() {
        let p = payload(serde_json::json!([{
            "from": "972500000001",
            "id": "wamid.A",
            "timestamp": "1760000000",
            "type": "text",
            "text": {"body": "1"}
        }]));
        let msgs = extract_messages(&p);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].from, "972500000001");
        assert_eq!(msgs[0].message_id, "wamid.A");
        assert_eq!(msgs[0].timestamp.timestamp(), 1_760_000_000);
        assert_eq!(msgs[0].payload, TransportPayload::Text { body: "1".into() });
    }

    #[test]
    fn button_reply_extracted() {
        let p = payload(serde_json::json!([{
            "from": "972500000001",
            "id": "wamid.B",
            "timestamp": "1760000001",
            "type": "interactive",
            "interactive": {"type": "button_reply", "button_reply": {"id": "yes", "title": "כן"}}
        }]));
        let msgs = extract_messages(&p);
        assert_eq!(
            msgs[0].payload,
            TransportPayload::ButtonReply {
                id: "yes".into(),
                title: "כן".into()
            }
        );
    }

    #[test]
    fn list_reply_extracted() {
        let p = payload(serde_json::json!([{
            "from": "972500000001",
            "id": "wamid.C",
            "timestamp": "1760000002",
            "type": "interactive",
            "interactive": {"type": "list_reply", "list_reply": {"id": "2", "title": "12-345-67", "description": "Honda PCX"}}
        }]));
        let msgs = extract_messages(&p);
        assert_eq!(
            msgs[0].payload,
            TransportPayload::ListReply {
                id: "2".into(),
                title: "12-345-67".into(),
                description: Some("Honda PCX".into())
            }
        );
    }

    #[test]
    fn image_becomes_media() {
        let p = payload(serde_json::json!([{
            "from": "972500000001",
            "id": "wamid.D",
            "timestamp": "1760000003",
            "type": "image",
            "image": {"id": "media-1", "mime_type": "image/jpeg"}
        }]));
        assert_eq!(
            extract_messages(&p)[0].payload,
            TransportPayload::Media {
                kind: MediaKind::Image
            }
        );
    }

    #[test]
    fn sticker_is_unsupported() {
        let p = payload(serde_json::json!([{
            "from": "972500000001",
            "id": "wamid.E",
            "timestamp": "1760000004",
            "type": "sticker",
            "sticker": {"id": "s-1"}
        }]));
        assert_eq!(
            extract_messages(&p)[0].payload,
            TransportPayload::Unsupported {
                kind: "sticker".into()
            }
        );
    }

    #[test]
    fn template_button_maps_to_button_reply() {
        let p = payload(serde_json::json!([{
            "from": "972500000001",
            "id": "wamid.F",
            "timestamp": "1760000005",
            "type": "button",
            "button": {"payload": "report", "text": "דיווח"}
        }]));
        assert_eq!(
            extract_messages(&p)[0].payload,
            TransportPayload::ButtonReply {
                id: "report".into(),
                title: "דיווח".into()
            }
        );
    }

    #[test]
    fn foreign_object_yields_nothing() {
        let p: WebhookPayload =
            serde_json::from_value(serde_json::json!({"object": "page", "entry": []})).unwrap();
        assert!(extract_messages(&p).is_empty());
    }

    #[test]
    fn bad_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let ts = parse_timestamp("yesterday");
        assert!(ts >= before);
    }
}
