// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Motofleet integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock messaging transport with message injection and capture
//! - [`MemoryStore`] / [`MemoryDirectory`] - In-memory collaborators with failure switches
//! - [`TestHarness`] - The full stack over a temp SQLite database

pub mod harness;
pub mod memory;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder, motorcycle};
pub use memory::{MemoryDirectory, MemoryStore};
pub use mock_transport::{MockTransport, SentText, text_message};
