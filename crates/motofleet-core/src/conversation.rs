// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation record, state enumeration and typed scratch context.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where a user currently is in the bot dialogue.
///
/// Persisted as the SCREAMING_SNAKE_CASE string form (`IDLE`,
/// `AWAITING_MENU_SELECTION`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    Idle,
    AwaitingMenuSelection,
    AwaitingMotorcycleSelection,
    AwaitingMileageInput,
    AwaitingMotorcycleData,
    AwaitingConfirmation,
}

/// Action bound to a menu option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MenuAction {
    ReportMileage,
    ViewMaintenance,
    AdminActions,
    EndConversation,
    SelectMotorcycle { motorcycle_id: String },
    ShowMore,
    BackToMain,
}

impl MenuAction {
    /// The snake_case tag of this action, as it appears in logs.
    pub fn tag(&self) -> &'static str {
        match self {
            MenuAction::ReportMileage => "report_mileage",
            MenuAction::ViewMaintenance => "view_maintenance",
            MenuAction::AdminActions => "admin_actions",
            MenuAction::EndConversation => "end_conversation",
            MenuAction::SelectMotorcycle { .. } => "select_motorcycle",
            MenuAction::ShowMore => "show_more",
            MenuAction::BackToMain => "back_to_main",
        }
    }
}

/// Scratch data carried across turns within a flow.
///
/// Unknown keys written by older versions are ignored on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_motorcycle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_mileage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_menu_selection: Option<MenuAction>,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motorcycle_page: Option<u32>,
}

impl ConversationContext {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies a shallow merge. Untouched fields survive.
    pub fn apply(&mut self, patch: ContextPatch) {
        patch.selected_motorcycle_id.apply_to(&mut self.selected_motorcycle_id);
        patch.pending_mileage.apply_to(&mut self.pending_mileage);
        patch.last_menu_selection.apply_to(&mut self.last_menu_selection);
        patch.motorcycle_page.apply_to(&mut self.motorcycle_page);
        if let Some(count) = patch.error_count {
            self.error_count = count;
        }
    }

    /// Returns a copy with `patch` applied.
    pub fn merged(&self, patch: ContextPatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }
}

/// One field of a [`ContextPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Slot<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Slot<T> {
    fn apply_to(self, target: &mut Option<T>) {
        match self {
            Slot::Keep => {}
            Slot::Set(value) => *target = Some(value),
            Slot::Clear => *target = None,
        }
    }
}

/// A typed shallow-merge instruction over [`ConversationContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPatch {
    pub selected_motorcycle_id: Slot<String>,
    pub pending_mileage: Slot<u32>,
    pub last_menu_selection: Slot<MenuAction>,
    pub motorcycle_page: Slot<u32>,
    /// `None` leaves the count untouched.
    pub error_count: Option<u32>,
}

impl ContextPatch {
    /// Touches nothing.
    pub fn keep() -> Self {
        Self::default()
    }

    /// Clears every field and zeroes the error count.
    pub fn reset() -> Self {
        Self {
            selected_motorcycle_id: Slot::Clear,
            pending_mileage: Slot::Clear,
            last_menu_selection: Slot::Clear,
            motorcycle_page: Slot::Clear,
            error_count: Some(0),
        }
    }

    pub fn with_error_count(mut self, count: u32) -> Self {
        self.error_count = Some(count);
        self
    }

    pub fn with_selected_motorcycle(mut self, slot: Slot<String>) -> Self {
        self.selected_motorcycle_id = slot;
        self
    }

    pub fn with_pending_mileage(mut self, slot: Slot<u32>) -> Self {
        self.pending_mileage = slot;
        self
    }

    pub fn with_last_menu_selection(mut self, slot: Slot<MenuAction>) -> Self {
        self.last_menu_selection = slot;
        self
    }

    pub fn with_motorcycle_page(mut self, slot: Slot<u32>) -> Self {
        self.motorcycle_page = slot;
        self
    }
}

/// Timeout and escalation policy shared by the store and the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Idle window applied on every touch.
    pub timeout: TimeDelta,
    /// Consecutive invalid inputs that force a reset to idle.
    pub max_error_count: u32,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            timeout: TimeDelta::minutes(30),
            max_error_count: 3,
        }
    }
}

/// One persisted conversation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub state: ConversationState,
    pub context: ConversationContext,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Pure expiry check against `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// An unsaved idle record used when even recovery reads fail.
    pub fn placeholder(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            user_id: user_id.into(),
            state: ConversationState::Idle,
            context: ConversationContext::default(),
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
