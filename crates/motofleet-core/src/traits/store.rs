// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation persistence contract consumed by the state machine.

use async_trait::async_trait;
use chrono::Utc;

use crate::conversation::{ContextPatch, Conversation, ConversationState};
use crate::error::FleetError;

/// Persists one active conversation record per user.
///
/// When several non-expired records exist for a user, the most recently
/// updated one is authoritative.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the user's active conversation with a refreshed expiry, or
    /// creates an idle one. Two immediate calls yield one record.
    async fn get_or_create(&self, user_id: &str) -> Result<Conversation, FleetError>;

    /// Reads the active conversation without touching its expiry.
    async fn get_active(&self, user_id: &str) -> Result<Option<Conversation>, FleetError>;

    /// Writes `state`, merges `patch` and refreshes expiry on the active record.
    ///
    /// Fails with [`FleetError::NotFound`] when no active record exists.
    async fn update_state(
        &self,
        user_id: &str,
        state: ConversationState,
        patch: ContextPatch,
    ) -> Result<Conversation, FleetError>;

    /// Resets the most recent record, expired or not, to idle with an empty
    /// context and a fresh expiry. Creates one if the user has none.
    async fn reset(&self, user_id: &str) -> Result<Conversation, FleetError>;

    /// Removes every record of the user. Returns the number removed.
    async fn delete(&self, user_id: &str) -> Result<u64, FleetError>;

    /// Deletes records whose expiry has passed. Returns the number removed.
    async fn cleanup_expired(&self) -> Result<u64, FleetError>;

    fn is_expired(&self, conversation: &Conversation) -> bool {
        conversation.is_expired_at(Utc::now())
    }
}
