// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Motofleet courier bot.
//!
//! WAL-mode SQLite with embedded migrations behind a single tokio-rusqlite
//! connection. [`SqliteStorage`] implements the conversation store and the
//! user and fleet directories.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
