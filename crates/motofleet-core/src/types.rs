// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across collaborator traits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier returned by a transport for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
}

// --- Users ---

/// Role of a bot user. Determines menu contents and fleet visibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Courier,
    Client,
}

impl UserRole {
    /// Whether this role carries administrative privilege.
    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// A person talking to the bot, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub role: UserRole,
    /// Owning client for `Client` users; optional scope for others.
    pub client_id: Option<String>,
}

// --- Fleet ---

/// A motorcycle as the bot sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motorcycle {
    pub id: String,
    pub license_plate: String,
    pub model: String,
    pub client_id: Option<String>,
    pub assigned_courier_id: Option<String>,
    pub current_mileage: u32,
    pub last_maintenance_mileage: Option<u32>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub maintenance_interval_km: u32,
}

/// Service status of a motorcycle as computed by the fleet directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceSummary {
    pub last_service_mileage: Option<u32>,
    pub last_service_date: Option<NaiveDate>,
    pub next_service_mileage: u32,
    /// Kilometres until the next service. Negative when overdue.
    pub km_remaining: i64,
}

impl MaintenanceSummary {
    pub fn is_overdue(&self) -> bool {
        self.km_remaining < 0
    }
}

/// Which motorcycles a lookup should return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotorcycleQuery {
    pub assigned_courier_id: Option<String>,
    pub client_id: Option<String>,
}

impl MotorcycleQuery {
    /// Every motorcycle in the fleet.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_courier(courier_id: impl Into<String>) -> Self {
        Self {
            assigned_courier_id: Some(courier_id.into()),
            client_id: None,
        }
    }

    pub fn for_client(client_id: impl Into<String>) -> Self {
        Self {
            assigned_courier_id: None,
            client_id: Some(client_id.into()),
        }
    }
}

/// A confirmed odometer reading routed to the fleet directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MileageReport {
    pub motorcycle_id: String,
    pub mileage: u32,
    pub reported_by: String,
}

// --- Messages ---

/// Kind of an inbound domain message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Document,
    Audio,
    Video,
}

/// The domain message the state machine consumes.
///
/// Only `Text` messages carry a meaningful body; media messages arrive with an
/// empty body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender phone identifier.
    pub from: String,
    pub body: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageType,
}

impl InboundMessage {
    /// Builds a text message stamped with the current time.
    pub fn text(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
            message_id: String::new(),
            timestamp: Utc::now(),
            message_type: MessageType::Text,
        }
    }
}

/// Media categories a transport can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Document,
    Audio,
    Video,
}

impl From<MediaKind> for MessageType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MessageType::Image,
            MediaKind::Document => MessageType::Document,
            MediaKind::Audio => MessageType::Audio,
            MediaKind::Video => MessageType::Video,
        }
    }
}

/// Content of a raw transport message, before domain conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportPayload {
    Text {
        body: String,
    },
    ButtonReply {
        id: String,
        title: String,
    },
    ListReply {
        id: String,
        title: String,
        description: Option<String>,
    },
    Media {
        kind: MediaKind,
    },
    /// Stickers, locations, contacts, reactions and anything newer.
    Unsupported {
        kind: String,
    },
}

/// A channel-agnostic inbound message as produced by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub from: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: TransportPayload,
}
