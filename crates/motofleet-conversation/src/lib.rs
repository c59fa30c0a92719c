// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational core of the Motofleet bot.
//!
//! [`StateMachine`] turns one inbound message into one persisted transition
//! and one Hebrew reply. Menus come from [`MenuBuilder`], replies from the
//! pure functions in [`response`].

pub mod machine;
pub mod menu;
pub mod response;

pub use machine::{
    BACK_WORD, MAX_MILEAGE, ProcessMessageResult, StateMachine, TransitionMetadata,
};
pub use menu::{Menu, MenuBuilder, MenuOption, MotorcycleFilter};
pub use response::{ErrorCode, SuccessNotice};
