// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime side of the Motofleet bot.
//!
//! [`Bot`] receives transport messages, runs them through the conversation
//! state machine and sends one reply each. [`Sweeper`] removes expired
//! conversations out of band.

pub mod convert;
pub mod orchestrator;
pub mod shutdown;
pub mod sweeper;

pub use convert::to_inbound;
pub use orchestrator::{Bot, DRAIN_TIMEOUT, DispatchOutcome, RECEIVE_RETRY_DELAY};
pub use shutdown::{drain_tasks, install_signal_handler};
pub use sweeper::Sweeper;
