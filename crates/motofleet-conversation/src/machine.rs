// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-message conversation state machine.
//!
//! Each inbound message runs one transition: load (or create) the user's
//! conversation, reset it when expired, dispatch on the current state, then
//! persist the outcome with a single store write. Failures anywhere in that
//! cycle are absorbed here and answered with an apology.

use std::sync::Arc;

use motofleet_core::{
    ContextPatch, Conversation, ConversationSettings, ConversationState, ConversationStore,
    FleetDirectory, FleetError, InboundMessage, MenuAction, MileageReport, Slot, User,
    UserDirectory,
};
use tracing::{debug, error, info, warn};

use crate::menu::{MenuBuilder, MotorcycleFilter};
use crate::response::{self, ErrorCode, SuccessNotice};

/// Highest odometer value accepted from a user.
pub const MAX_MILEAGE: u32 = 999_999;

/// Word that returns to the main menu from menus with `allow_back`.
pub const BACK_WORD: &str = "חזור";

const YES_WORD: &str = "כן";
const NO_WORD: &str = "לא";

/// Output of one processed message.
#[derive(Debug, Clone)]
pub struct ProcessMessageResult {
    /// The conversation as persisted after the transition.
    pub conversation: Conversation,
    pub response: String,
    pub should_end_conversation: bool,
    pub metadata: Option<TransitionMetadata>,
}

/// Details of a transition, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionMetadata {
    pub previous_state: Option<ConversationState>,
    pub error_code: Option<ErrorCode>,
    pub error_detail: Option<String>,
    /// Mileage handed to the fleet directory on this turn.
    pub committed_mileage: Option<u32>,
}

/// A handler's decision, before it is written back.
struct Transition {
    state: ConversationState,
    patch: ContextPatch,
    response: String,
    end: bool,
    error_code: Option<ErrorCode>,
    error_detail: Option<String>,
    committed_mileage: Option<u32>,
}

impl Transition {
    fn to(state: ConversationState, patch: ContextPatch, response: String) -> Self {
        Self {
            state,
            patch,
            response,
            end: false,
            error_code: None,
            error_detail: None,
            committed_mileage: None,
        }
    }

    fn ending(mut self) -> Self {
        self.end = true;
        self
    }

    fn with_error(mut self, code: ErrorCode) -> Self {
        self.error_code = Some(code);
        self
    }
}

/// Answer to a yes/no prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confirmation {
    Yes,
    No,
}

fn parse_confirmation(body: &str) -> Option<Confirmation> {
    let lowered = body.to_lowercase();
    match lowered.as_str() {
        "1" | YES_WORD => Some(Confirmation::Yes),
        "2" | NO_WORD => Some(Confirmation::No),
        _ => None,
    }
}

/// An integer in `0..=MAX_MILEAGE`, or `None`.
fn parse_mileage(body: &str) -> Option<u32> {
    let value: i64 = body.parse().ok()?;
    u32::try_from(value).ok().filter(|m| *m <= MAX_MILEAGE)
}

fn is_back_word(body: &str) -> bool {
    body.to_lowercase() == BACK_WORD
}

/// Valid input always zeroes the running error count.
fn valid() -> ContextPatch {
    ContextPatch::keep().with_error_count(0)
}

pub struct StateMachine {
    store: Arc<dyn ConversationStore>,
    fleet: Arc<dyn FleetDirectory>,
    menus: MenuBuilder,
    settings: ConversationSettings,
}

impl StateMachine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        users: Arc<dyn UserDirectory>,
        fleet: Arc<dyn FleetDirectory>,
        settings: ConversationSettings,
    ) -> Self {
        let mut menus = MenuBuilder::new(users, fleet.clone());
        if let Ok(hint) = settings.timeout.to_std() {
            menus = menus.with_timeout_hint(hint);
        }
        Self {
            store,
            fleet,
            menus,
            settings,
        }
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    pub fn menus(&self) -> &MenuBuilder {
        &self.menus
    }

    /// Processes one inbound message for `user`. Never fails.
    pub async fn process_transition(
        &self,
        user: &User,
        message: &InboundMessage,
    ) -> ProcessMessageResult {
        let mut seen_state = None;
        match self.try_process(user, message, &mut seen_state).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    user_id = %user.id,
                    state = ?seen_state,
                    message_id = %message.message_id,
                    error = %e,
                    "conversation transition failed"
                );
                self.recover(user, seen_state, e).await
            }
        }
    }

    async fn try_process(
        &self,
        user: &User,
        message: &InboundMessage,
        seen_state: &mut Option<ConversationState>,
    ) -> Result<ProcessMessageResult, FleetError> {
        let mut conversation = self.store.get_or_create(&user.id).await?;
        *seen_state = Some(conversation.state);

        if self.store.is_expired(&conversation) {
            info!(
                user_id = %user.id,
                state = %conversation.state,
                "conversation expired, resetting"
            );
            conversation = self.store.reset(&user.id).await?;
            *seen_state = Some(conversation.state);
        }

        let previous_state = conversation.state;
        let body = message.body.trim();
        debug!(user_id = %user.id, state = %previous_state, "dispatching message");

        let transition = match previous_state {
            ConversationState::Idle => self.on_idle(user).await?,
            ConversationState::AwaitingMenuSelection => {
                self.on_menu_selection(user, &conversation, body).await?
            }
            ConversationState::AwaitingMotorcycleSelection => {
                self.on_motorcycle_selection(user, &conversation, body)
                    .await?
            }
            ConversationState::AwaitingMileageInput => {
                self.on_mileage_input(&conversation, body).await?
            }
            ConversationState::AwaitingMotorcycleData => self.on_motorcycle_data(user).await?,
            ConversationState::AwaitingConfirmation => {
                self.on_confirmation(user, &conversation, body).await?
            }
        };

        let Transition {
            state,
            patch,
            response,
            end,
            error_code,
            error_detail,
            committed_mileage,
        } = transition;

        let conversation = self.store.update_state(&user.id, state, patch).await?;

        if let Some(code) = error_code {
            debug!(
                user_id = %user.id,
                from = %previous_state,
                to = %state,
                error_code = %code,
                error_count = conversation.context.error_count,
                "input rejected"
            );
        } else {
            debug!(
                user_id = %user.id,
                from = %previous_state,
                to = %state,
                action = conversation
                    .context
                    .last_menu_selection
                    .as_ref()
                    .map_or("none", MenuAction::tag),
                "transition applied"
            );
        }

        Ok(ProcessMessageResult {
            conversation,
            response,
            should_end_conversation: end,
            metadata: Some(TransitionMetadata {
                previous_state: Some(previous_state),
                error_code,
                error_detail,
                committed_mileage,
            }),
        })
    }

    /// Builds the apology result, keeping whatever record the store still has.
    async fn recover(
        &self,
        user: &User,
        seen_state: Option<ConversationState>,
        cause: FleetError,
    ) -> ProcessMessageResult {
        let conversation = match self.store.get_active(&user.id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => Conversation::placeholder(&user.id),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "recovery read failed, using placeholder");
                Conversation::placeholder(&user.id)
            }
        };
        ProcessMessageResult {
            conversation,
            response: response::apology(),
            should_end_conversation: false,
            metadata: Some(TransitionMetadata {
                previous_state: seen_state,
                error_code: Some(ErrorCode::InternalError),
                error_detail: Some(cause.to_string()),
                committed_mileage: None,
            }),
        }
    }

    /// Counts an invalid input and stays in the current state.
    fn reject(&self, conversation: &Conversation, code: ErrorCode, prompt: String) -> Transition {
        self.reject_into(
            conversation,
            code,
            conversation.state,
            ContextPatch::keep(),
            prompt,
        )
    }

    /// Counts an invalid input. Below the threshold the user is re-prompted in
    /// `state`; reaching it resets the conversation to idle.
    fn reject_into(
        &self,
        conversation: &Conversation,
        code: ErrorCode,
        state: ConversationState,
        patch: ContextPatch,
        prompt: String,
    ) -> Transition {
        let count = conversation.context.error_count.saturating_add(1);
        if count >= self.settings.max_error_count {
            info!(
                user_id = %conversation.user_id,
                state = %conversation.state,
                error_count = count,
                "error threshold reached, resetting conversation"
            );
            let mut transition = Transition::to(
                ConversationState::Idle,
                ContextPatch::reset(),
                response::conversation_reset(self.settings.max_error_count),
            )
            .ending()
            .with_error(ErrorCode::TooManyErrors);
            transition.error_detail = Some(code.to_string());
            return transition;
        }
        Transition::to(
            state,
            patch.with_error_count(count),
            response::join(&[response::error(code, None), prompt]),
        )
        .with_error(code)
    }

    async fn main_menu_text(&self, user: &User) -> Result<String, FleetError> {
        let menu = self.menus.build_main_menu(&user.id).await?;
        Ok(response::menu(&menu))
    }

    async fn back_to_main(&self, user: &User) -> Result<Transition, FleetError> {
        Ok(Transition::to(
            ConversationState::AwaitingMenuSelection,
            valid()
                .with_last_menu_selection(Slot::Clear)
                .with_motorcycle_page(Slot::Clear),
            self.main_menu_text(user).await?,
        ))
    }

    async fn plate(&self, motorcycle_id: Option<&str>) -> Result<Option<String>, FleetError> {
        let Some(id) = motorcycle_id else {
            return Ok(None);
        };
        Ok(self
            .fleet
            .get_motorcycle(id)
            .await?
            .map(|m| m.license_plate))
    }

    // Any utterance wakes the bot.
    async fn on_idle(&self, user: &User) -> Result<Transition, FleetError> {
        let response = response::join(&[
            response::welcome(&user.name),
            self.main_menu_text(user).await?,
        ]);
        Ok(Transition::to(
            ConversationState::AwaitingMenuSelection,
            ContextPatch::reset(),
            response,
        ))
    }

    async fn on_menu_selection(
        &self,
        user: &User,
        conversation: &Conversation,
        body: &str,
    ) -> Result<Transition, FleetError> {
        let menu = self.menus.build_main_menu(&user.id).await?;
        let Some(option) = menu.find_enabled(body) else {
            return Ok(self.reject(
                conversation,
                ErrorCode::InvalidMenuSelection,
                response::menu(&menu),
            ));
        };

        match &option.action {
            action @ (MenuAction::ReportMileage | MenuAction::ViewMaintenance) => {
                let motorcycles = self
                    .menus
                    .build_motorcycle_selection_menu(&user.id, &MotorcycleFilter::page(0))
                    .await?;
                Ok(Transition::to(
                    ConversationState::AwaitingMotorcycleSelection,
                    valid()
                        .with_last_menu_selection(Slot::Set(action.clone()))
                        .with_motorcycle_page(Slot::Set(motorcycles.page))
                        .with_selected_motorcycle(Slot::Clear)
                        .with_pending_mileage(Slot::Clear),
                    response::menu(&motorcycles),
                ))
            }
            MenuAction::AdminActions if user.role.is_admin() => Ok(Transition::to(
                ConversationState::AwaitingMotorcycleData,
                valid().with_last_menu_selection(Slot::Set(MenuAction::AdminActions)),
                response::admin_data_prompt(),
            )),
            MenuAction::AdminActions => {
                warn!(user_id = %user.id, role = %user.role, "admin action denied");
                Ok(Transition::to(
                    conversation.state,
                    ContextPatch::keep(),
                    response::join(&[
                        response::error(ErrorCode::Unauthorized, None),
                        response::menu(&menu),
                    ]),
                )
                .with_error(ErrorCode::Unauthorized))
            }
            MenuAction::EndConversation => Ok(Transition::to(
                ConversationState::Idle,
                ContextPatch::reset(),
                response::goodbye(),
            )
            .ending()),
            MenuAction::BackToMain => Ok(Transition::to(
                conversation.state,
                valid(),
                response::menu(&menu),
            )),
            MenuAction::SelectMotorcycle { .. } | MenuAction::ShowMore => Ok(self.reject(
                conversation,
                ErrorCode::InvalidMenuSelection,
                response::menu(&menu),
            )),
        }
    }

    async fn on_motorcycle_selection(
        &self,
        user: &User,
        conversation: &Conversation,
        body: &str,
    ) -> Result<Transition, FleetError> {
        let page = conversation.context.motorcycle_page.unwrap_or(0);
        let menu = self
            .menus
            .build_motorcycle_selection_menu(&user.id, &MotorcycleFilter::page(page))
            .await?;

        if menu.allow_back && is_back_word(body) {
            return self.back_to_main(user).await;
        }

        let Some(option) = menu.find_enabled(body) else {
            return Ok(self.reject(
                conversation,
                ErrorCode::InvalidMotorcycleSelection,
                response::menu(&menu),
            ));
        };

        match &option.action {
            MenuAction::SelectMotorcycle { motorcycle_id } => {
                let intent = conversation.context.last_menu_selection.as_ref();
                if intent == Some(&MenuAction::ViewMaintenance) {
                    return self.show_maintenance(user, motorcycle_id).await;
                }
                let plate = self.plate(Some(motorcycle_id)).await?;
                Ok(Transition::to(
                    ConversationState::AwaitingMileageInput,
                    valid()
                        .with_selected_motorcycle(Slot::Set(motorcycle_id.clone()))
                        .with_pending_mileage(Slot::Clear)
                        .with_motorcycle_page(Slot::Clear),
                    response::mileage_prompt(plate.as_deref()),
                ))
            }
            MenuAction::ShowMore => {
                let next = self
                    .menus
                    .build_motorcycle_selection_menu(
                        &user.id,
                        &MotorcycleFilter::page(menu.page.saturating_add(1)),
                    )
                    .await?;
                Ok(Transition::to(
                    conversation.state,
                    valid().with_motorcycle_page(Slot::Set(next.page)),
                    response::menu(&next),
                ))
            }
            MenuAction::BackToMain => self.back_to_main(user).await,
            _ => Ok(self.reject(
                conversation,
                ErrorCode::InvalidMotorcycleSelection,
                response::menu(&menu),
            )),
        }
    }

    async fn show_maintenance(
        &self,
        user: &User,
        motorcycle_id: &str,
    ) -> Result<Transition, FleetError> {
        let motorcycle = self
            .fleet
            .get_motorcycle(motorcycle_id)
            .await?
            .ok_or_else(|| FleetError::not_found("motorcycle", motorcycle_id))?;
        let summary = self
            .fleet
            .maintenance_summary(motorcycle_id)
            .await?
            .ok_or_else(|| FleetError::not_found("motorcycle", motorcycle_id))?;

        let response = response::join(&[
            response::maintenance_summary(&motorcycle, &summary),
            self.main_menu_text(user).await?,
        ]);
        Ok(Transition::to(
            ConversationState::AwaitingMenuSelection,
            valid()
                .with_selected_motorcycle(Slot::Set(motorcycle_id.to_string()))
                .with_last_menu_selection(Slot::Clear)
                .with_motorcycle_page(Slot::Clear),
            response,
        ))
    }

    async fn on_mileage_input(
        &self,
        conversation: &Conversation,
        body: &str,
    ) -> Result<Transition, FleetError> {
        let plate = self
            .plate(conversation.context.selected_motorcycle_id.as_deref())
            .await?;
        match parse_mileage(body) {
            Some(mileage) => Ok(Transition::to(
                ConversationState::AwaitingConfirmation,
                valid().with_pending_mileage(Slot::Set(mileage)),
                response::mileage_confirmation(mileage, plate.as_deref()),
            )),
            None => Ok(self.reject(
                conversation,
                ErrorCode::InvalidMileage,
                response::mileage_prompt(plate.as_deref()),
            )),
        }
    }

    // Reserved for administrative data entry.
    async fn on_motorcycle_data(&self, user: &User) -> Result<Transition, FleetError> {
        let response = response::join(&[
            response::error(ErrorCode::NotImplemented, None),
            self.main_menu_text(user).await?,
        ]);
        Ok(Transition::to(
            ConversationState::AwaitingMenuSelection,
            valid().with_last_menu_selection(Slot::Clear),
            response,
        )
        .with_error(ErrorCode::NotImplemented))
    }

    async fn on_confirmation(
        &self,
        user: &User,
        conversation: &Conversation,
        body: &str,
    ) -> Result<Transition, FleetError> {
        let context = &conversation.context;
        match parse_confirmation(body) {
            Some(Confirmation::Yes) => {
                let (Some(mileage), Some(motorcycle_id)) =
                    (context.pending_mileage, context.selected_motorcycle_id.clone())
                else {
                    warn!(user_id = %user.id, "confirmation without pending report");
                    return Ok(Transition::to(
                        ConversationState::Idle,
                        ContextPatch::reset(),
                        response::error(ErrorCode::SessionDataMissing, None),
                    )
                    .with_error(ErrorCode::SessionDataMissing));
                };
                self.commit_mileage(user, conversation, motorcycle_id, mileage)
                    .await
            }
            Some(Confirmation::No) => {
                let response = response::join(&[
                    response::cancelled(),
                    self.main_menu_text(user).await?,
                ]);
                Ok(Transition::to(
                    ConversationState::AwaitingMenuSelection,
                    valid().with_pending_mileage(Slot::Clear),
                    response,
                ))
            }
            None => {
                let prompt = match context.pending_mileage {
                    Some(mileage) => {
                        let plate = self
                            .plate(context.selected_motorcycle_id.as_deref())
                            .await?;
                        response::mileage_confirmation(mileage, plate.as_deref())
                    }
                    None => response::yes_no_prompt(),
                };
                Ok(self.reject(conversation, ErrorCode::InvalidConfirmation, prompt))
            }
        }
    }

    async fn commit_mileage(
        &self,
        user: &User,
        conversation: &Conversation,
        motorcycle_id: String,
        mileage: u32,
    ) -> Result<Transition, FleetError> {
        let report = MileageReport {
            motorcycle_id,
            mileage,
            reported_by: user.id.clone(),
        };
        match self.fleet.record_mileage(&report).await {
            Ok(motorcycle) => {
                info!(
                    user_id = %user.id,
                    motorcycle_id = %motorcycle.id,
                    mileage,
                    "mileage committed"
                );
                let mut transition = Transition::to(
                    ConversationState::Idle,
                    ContextPatch::reset(),
                    response::success(&SuccessNotice::MileageRecorded {
                        license_plate: motorcycle.license_plate,
                        mileage,
                    }),
                )
                .ending();
                transition.committed_mileage = Some(mileage);
                Ok(transition)
            }
            Err(FleetError::Validation(detail)) => {
                let plate = self.plate(Some(&report.motorcycle_id)).await?;
                let mut transition = self.reject_into(
                    conversation,
                    ErrorCode::MileageTooLow,
                    ConversationState::AwaitingMileageInput,
                    ContextPatch::keep().with_pending_mileage(Slot::Clear),
                    response::mileage_prompt(plate.as_deref()),
                );
                if transition.error_code == Some(ErrorCode::MileageTooLow) {
                    transition.error_detail = Some(detail);
                }
                Ok(transition)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mileage_boundaries() {
        assert_eq!(parse_mileage("0"), Some(0));
        assert_eq!(parse_mileage("999999"), Some(999_999));
        assert_eq!(parse_mileage("-1"), None);
        assert_eq!(parse_mileage("1000000"), None);
        assert_eq!(parse_mileage("15,000"), None);
        assert_eq!(parse_mileage("abc"), None);
        assert_eq!(parse_mileage(""), None);
    }

    #[test]
    fn confirmation_tokens() {
        assert_eq!(parse_confirmation("1"), Some(Confirmation::Yes));
        assert_eq!(parse_confirmation("כן"), Some(Confirmation::Yes));
        assert_eq!(parse_confirmation("2"), Some(Confirmation::No));
        assert_eq!(parse_confirmation("לא"), Some(Confirmation::No));
        assert_eq!(parse_confirmation("yes"), None);
        assert_eq!(parse_confirmation("3"), None);
        assert_eq!(parse_confirmation("כןכן"), None);
    }

    #[test]
    fn back_word_matches_exactly() {
        assert!(is_back_word("חזור"));
        assert!(!is_back_word("לחזור"));
    }

    proptest! {
        #[test]
        fn in_range_integers_parse(n in 0u32..=MAX_MILEAGE) {
            prop_assert_eq!(parse_mileage(&n.to_string()), Some(n));
        }

        #[test]
        fn out_of_range_integers_are_rejected(n in prop_oneof![i64::MIN..0i64, 1_000_000i64..i64::MAX]) {
            prop_assert_eq!(parse_mileage(&n.to_string()), None);
        }
    }
}
