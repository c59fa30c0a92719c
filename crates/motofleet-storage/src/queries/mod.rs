// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Every function takes a [`Database`](crate::Database).

pub mod conversations;
pub mod motorcycles;
pub mod users;
