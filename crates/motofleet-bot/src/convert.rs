// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-to-domain message conversion.

use motofleet_core::{InboundMessage, MessageType, TransportMessage, TransportPayload};
use tracing::warn;

/// Extracts the text the state machine matches on.
///
/// Button and list replies carry their reply id, which the transports set to
/// the menu key. Media and unsupported payloads arrive with an empty body.
pub fn to_inbound(message: TransportMessage) -> InboundMessage {
    let TransportMessage {
        from,
        message_id,
        timestamp,
        payload,
    } = message;

    let (body, message_type) = match payload {
        TransportPayload::Text { body } => (body, MessageType::Text),
        TransportPayload::ButtonReply { id, .. } => (id, MessageType::Text),
        TransportPayload::ListReply { id, .. } => (id, MessageType::Text),
        TransportPayload::Media { kind } => {
            warn!(from = %from, message_id = %message_id, kind = %kind, "media message ignored");
            (String::new(), kind.into())
        }
        TransportPayload::Unsupported { kind } => {
            warn!(from = %from, message_id = %message_id, kind = %kind, "unsupported message type");
            (String::new(), MessageType::Text)
        }
    };

    InboundMessage {
        from,
        body,
        message_id,
        timestamp,
        message_type,
    }
}
