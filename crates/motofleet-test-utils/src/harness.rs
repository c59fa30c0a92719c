// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full bot stack over a temp SQLite database
//! and a [`MockTransport`]. `send()` drives one message through the
//! orchestrator and returns the reply the transport captured.

use std::sync::Arc;

use chrono::TimeDelta;
use motofleet_bot::{Bot, DispatchOutcome};
use motofleet_config::model::StorageConfig;
use motofleet_conversation::{ProcessMessageResult, StateMachine};
use motofleet_core::{
    Conversation, ConversationSettings, ConversationStore, FleetError, InboundMessage, Motorcycle,
    User, UserRole,
};
use motofleet_storage::SqliteStorage;
use motofleet_storage::queries::{motorcycles, users};

use crate::mock_transport::{MockTransport, text_message};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    settings: ConversationSettings,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: ConversationSettings::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: TimeDelta) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn with_max_error_count(mut self, count: u32) -> Self {
        self.settings.max_error_count = count;
        self
    }

    /// Opens the temp database and wires the stack.
    pub async fn build(self) -> Result<TestHarness, FleetError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FleetError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(
            StorageConfig {
                database_path: db_path.to_string_lossy().into_owned(),
                wal_mode: true,
            },
            self.settings,
        );
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let machine = Arc::new(StateMachine::new(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            self.settings,
        ));
        let transport = Arc::new(MockTransport::new());
        let bot = Arc::new(Bot::new(
            machine.clone(),
            storage.clone(),
            transport.clone(),
        ));

        Ok(TestHarness {
            storage,
            machine,
            bot,
            transport,
            settings: self.settings,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock transport and temp storage.
pub struct TestHarness {
    /// SQLite storage serving as store and both directories.
    pub storage: Arc<SqliteStorage>,
    pub machine: Arc<StateMachine>,
    pub bot: Arc<Bot>,
    pub transport: Arc<MockTransport>,
    pub settings: ConversationSettings,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub async fn new() -> Result<Self, FleetError> {
        Self::builder().build().await
    }

    pub async fn add_client(&self, id: &str, name: &str) -> Result<(), FleetError> {
        users::insert_client(self.storage.database()?, id, name).await
    }

    /// Registers a user whose id is derived from the phone (`user-<phone>`).
    pub async fn add_user(
        &self,
        phone: &str,
        name: &str,
        role: UserRole,
        client_id: Option<&str>,
    ) -> Result<User, FleetError> {
        let user = User {
            id: format!("user-{phone}"),
            phone: phone.to_string(),
            name: name.to_string(),
            role,
            client_id: client_id.map(str::to_string),
        };
        users::insert_user(self.storage.database()?, &user).await?;
        Ok(user)
    }

    pub async fn add_motorcycle(&self, motorcycle: &Motorcycle) -> Result<(), FleetError> {
        motorcycles::insert_motorcycle(self.storage.database()?, motorcycle).await
    }

    /// Sends `body` from `phone` through the bot. Returns the outcome and the
    /// replies captured for that send.
    pub async fn dispatch(
        &self,
        phone: &str,
        body: &str,
    ) -> (DispatchOutcome, Vec<String>) {
        let before = self.transport.sent_count().await;
        let outcome = self.bot.handle_message(text_message(phone, body)).await;
        let replies = self.transport.sent_messages().await[before..]
            .iter()
            .map(|s| s.body.clone())
            .collect();
        (outcome, replies)
    }

    /// Sends `body` from `phone` through the bot and returns the single reply.
    pub async fn send(&self, phone: &str, body: &str) -> Result<String, FleetError> {
        let (outcome, mut replies) = self.dispatch(phone, body).await;
        if replies.len() != 1 {
            return Err(FleetError::Internal(format!(
                "expected one reply, got {} ({outcome:?})",
                replies.len()
            )));
        }
        Ok(replies.remove(0))
    }

    /// Runs `body` through the state machine directly, bypassing the bot.
    pub async fn process(&self, user: &User, body: &str) -> ProcessMessageResult {
        self.machine
            .process_transition(user, &InboundMessage::text(&user.phone, body))
            .await
    }

    /// The user's active conversation, if any.
    pub async fn conversation(&self, user_id: &str) -> Result<Option<Conversation>, FleetError> {
        self.storage.get_active(user_id).await
    }
}

/// A motorcycle with a 5,000 km service interval and no service history.
pub fn motorcycle(
    id: &str,
    license_plate: &str,
    courier_id: Option<&str>,
    client_id: Option<&str>,
    current_mileage: u32,
) -> Motorcycle {
    Motorcycle {
        id: id.to_string(),
        license_plate: license_plate.to_string(),
        model: "Honda PCX".to_string(),
        client_id: client_id.map(str::to_string),
        assigned_courier_id: courier_id.map(str::to_string),
        current_mileage,
        last_maintenance_mileage: None,
        last_maintenance_date: None,
        maintenance_interval_km: 5_000,
    }
}
