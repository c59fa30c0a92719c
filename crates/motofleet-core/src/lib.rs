// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Motofleet courier bot.
//!
//! This crate provides the error type, the conversation and fleet domain types,
//! and the collaborator traits that the state machine, storage backends and
//! transports agree on.

pub mod conversation;
pub mod error;
pub mod traits;
pub mod types;

pub use conversation::{
    ContextPatch, Conversation, ConversationContext, ConversationSettings, ConversationState,
    MenuAction, Slot,
};
pub use error::FleetError;
pub use types::{
    AdapterType, HealthStatus, InboundMessage, MaintenanceSummary, MediaKind, MessageId,
    MessageType, MileageReport, Motorcycle, MotorcycleQuery, TransportMessage, TransportPayload,
    User, UserRole,
};

pub use traits::{
    ConversationStore, FleetDirectory, MessagingTransport, PluginAdapter, UserDirectory,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_error_displays_context() {
        let err = FleetError::not_found("conversation", "u1");
        assert_eq!(err.to_string(), "conversation not found: u1");
        assert!(err.is_not_found());

        let err = FleetError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert_eq!(err.to_string(), "storage error: disk full");
        assert!(!err.is_not_found());

        let err = FleetError::transport("closed");
        assert_eq!(err.to_string(), "transport error: closed");
    }

    #[test]
    fn adapter_type_parses() {
        use std::str::FromStr;
        assert_eq!(AdapterType::from_str("Transport").unwrap(), AdapterType::Transport);
        assert_eq!(AdapterType::Storage.to_string(), "Storage");
    }

    struct FixedStore;

    #[async_trait::async_trait]
    impl ConversationStore for FixedStore {
        async fn get_or_create(&self, user_id: &str) -> Result<Conversation, FleetError> {
            Ok(Conversation::placeholder(user_id))
        }
        async fn get_active(&self, _: &str) -> Result<Option<Conversation>, FleetError> {
            Ok(None)
        }
        async fn update_state(
            &self,
            user_id: &str,
            _: ConversationState,
            _: ContextPatch,
        ) -> Result<Conversation, FleetError> {
            Err(FleetError::not_found("conversation", user_id))
        }
        async fn reset(&self, user_id: &str) -> Result<Conversation, FleetError> {
            Ok(Conversation::placeholder(user_id))
        }
        async fn delete(&self, _: &str) -> Result<u64, FleetError> {
            Ok(0)
        }
        async fn cleanup_expired(&self) -> Result<u64, FleetError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn provided_is_expired_uses_current_time() {
        let store = FixedStore;
        let mut conv = store.get_or_create("u1").await.unwrap();
        assert!(!store.is_expired(&conv));
        conv.expires_at = Some(chrono::Utc::now() - chrono::TimeDelta::minutes(1));
        assert!(store.is_expired(&conv));
    }
}
