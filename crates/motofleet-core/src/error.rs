// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Motofleet courier bot.

use thiserror::Error;

/// The primary error type used across all Motofleet collaborator traits.
///
/// Input-validation problems (a bad menu key, an out-of-range mileage) are not
/// represented here; the state machine handles those as part of normal control
/// flow. `FleetError` covers everything that leaves a collaborator boundary.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors (HTTP failure, rejected payload, closed queue).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A record the caller relied on does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A collaborator rejected a value (e.g. mileage lower than the odometer).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The acting user lacks the role required for an operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Shorthand for a [`FleetError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`FleetError::Transport`] without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for errors the state machine may treat as recoverable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
