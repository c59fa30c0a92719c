// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Storage backends and transports extend [`PluginAdapter`] and use
//! `#[async_trait]` so they can be held as trait objects.

pub mod adapter;
pub mod directory;
pub mod store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use directory::{FleetDirectory, UserDirectory};
pub use store::ConversationStore;
pub use transport::MessagingTransport;
