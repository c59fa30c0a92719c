// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestrator and sweeper tests over the full stack.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use motofleet_bot::{Bot, RECEIVE_RETRY_DELAY, Sweeper};
use motofleet_conversation::StateMachine;
use motofleet_conversation::response;
use motofleet_core::{
    AdapterType, ConversationSettings, ConversationState, FleetError, HealthStatus,
    MessageId, MessagingTransport, PluginAdapter, TransportMessage, User, UserDirectory,
    UserRole,
};
use motofleet_storage::queries::{conversations, users};
use motofleet_test_utils::{MemoryDirectory, MemoryStore, MockTransport, TestHarness, text_message};
use tokio_util::sync::CancellationToken;

const COURIER_PHONE: &str = "972500000001";

async fn courier_harness() -> (TestHarness, User) {
    let harness = TestHarness::new().await.unwrap();
    let user = harness
        .add_user(COURIER_PHONE, "דני", UserRole::Courier, None)
        .await
        .unwrap();
    (harness, user)
}

/// A user directory that is always down.
struct UnreachableUsers;

#[async_trait]
impl UserDirectory for UnreachableUsers {
    async fn get_or_create_by_phone(&self, _phone: &str) -> Result<User, FleetError> {
        Err(FleetError::Storage {
            source: Box::new(std::io::Error::other("directory offline")),
        })
    }

    async fn get_user(&self, _user_id: &str) -> Result<Option<User>, FleetError> {
        Ok(None)
    }
}

/// A transport whose receive side fails with a non-fatal error every time.
#[derive(Default)]
struct FailingReceive {
    polls: AtomicUsize,
}

#[async_trait]
impl PluginAdapter for FailingReceive {
    fn name(&self) -> &str {
        "failing-receive"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FleetError> {
        Ok(HealthStatus::Degraded("receive failing".into()))
    }

    async fn shutdown(&self) -> Result<(), FleetError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingTransport for FailingReceive {
    async fn send_text(&self, _to: &str, _body: &str) -> Result<MessageId, FleetError> {
        Err(FleetError::Internal("send not expected".into()))
    }

    async fn receive(&self) -> Result<TransportMessage, FleetError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Err(FleetError::Internal("malformed inbound payload".into()))
    }
}

#[tokio::test]
async fn every_message_gets_exactly_one_reply() {
    let (harness, user) = courier_harness().await;

    for body in ["hi", "9", "1"] {
        let (outcome, replies) = harness.dispatch(COURIER_PHONE, body).await;
        assert!(outcome.success, "{body}: {outcome:?}");
        assert_eq!(replies.len(), 1, "{body}");
    }

    let sent = harness.transport.sent_messages().await;
    assert!(sent.iter().all(|s| s.to == COURIER_PHONE));
    assert!(sent[0].body.contains("שלום דני"));

    let conv = harness.conversation(&user.id).await.unwrap().unwrap();
    assert_eq!(conv.state, ConversationState::AwaitingMotorcycleSelection);
}

#[tokio::test]
async fn unknown_sender_is_registered_and_welcomed() {
    let harness = TestHarness::new().await.unwrap();
    let reply = harness.send("972599999999", "hello").await.unwrap();
    assert!(reply.contains("ברוכים הבאים"));

    let user = users::get_user_by_phone(harness.storage.database().unwrap(), "972599999999")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, UserRole::Courier);
}

#[tokio::test]
async fn failed_send_is_followed_by_apology() {
    let (harness, _user) = courier_harness().await;
    harness.transport.fail_next_sends(1);

    let (outcome, replies) = harness.dispatch(COURIER_PHONE, "hi").await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("mock send failure"));
    assert_eq!(replies, vec![response::apology()]);
}

#[tokio::test]
async fn user_lookup_failure_is_answered_with_apology() {
    let settings = ConversationSettings::default();
    let store = Arc::new(MemoryStore::new(settings));
    let directory = Arc::new(MemoryDirectory::new());
    let machine = Arc::new(StateMachine::new(
        store,
        directory.clone(),
        directory,
        settings,
    ));
    let transport = Arc::new(MockTransport::new());
    let bot = Bot::new(machine, Arc::new(UnreachableUsers), transport.clone());

    let outcome = bot.handle_message(text_message(COURIER_PHONE, "hi")).await;
    assert!(!outcome.success);
    assert_eq!(transport.sent_count().await, 1);
    assert_eq!(transport.last_sent().await, Some(response::apology()));
}

#[tokio::test]
async fn same_sender_messages_do_not_lose_updates() {
    let (harness, user) = courier_harness().await;
    harness.send(COURIER_PHONE, "hi").await.unwrap();

    let first = {
        let bot = Arc::clone(&harness.bot);
        tokio::spawn(async move { bot.handle_message(text_message(COURIER_PHONE, "9")).await })
    };
    let second = {
        let bot = Arc::clone(&harness.bot);
        tokio::spawn(async move { bot.handle_message(text_message(COURIER_PHONE, "8")).await })
    };
    assert!(first.await.unwrap().success);
    assert!(second.await.unwrap().success);

    let conv = harness.conversation(&user.id).await.unwrap().unwrap();
    assert_eq!(conv.state, ConversationState::AwaitingMenuSelection);
    assert_eq!(conv.context.error_count, 2);
    assert_eq!(harness.bot.active_senders(), 0);
}

#[tokio::test]
async fn run_loop_drains_queue_and_stops_when_transport_closes() {
    let (harness, _user) = courier_harness().await;
    harness.transport.inject_text(COURIER_PHONE, "hi").await;
    harness.transport.inject_text("972500000002", "hi").await;
    harness.transport.close();

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        Arc::clone(&harness.bot).run(CancellationToken::new()),
    )
    .await
    .unwrap();
    assert!(result.is_ok());

    let sent = harness.transport.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|s| s.to == COURIER_PHONE));
    assert!(sent.iter().any(|s| s.to == "972500000002"));
}

#[tokio::test]
async fn run_loop_stops_on_cancel() {
    let (harness, _user) = courier_harness().await;
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Arc::clone(&harness.bot).run(cancel.clone()));

    harness.transport.inject_text(COURIER_PHONE, "hi").await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.transport.sent_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(harness.transport.sent_count().await, 1);
}

#[tokio::test]
async fn sweep_once_removes_only_expired_conversations() {
    let (harness, courier) = courier_harness().await;
    let other = harness
        .add_user("972500000002", "רון", UserRole::Courier, None)
        .await
        .unwrap();
    harness.send(COURIER_PHONE, "hi").await.unwrap();
    harness.send("972500000002", "hi").await.unwrap();

    let db = harness.storage.database().unwrap();
    conversations::set_expiry(db, &courier.id, Some(Utc::now() - TimeDelta::minutes(1)))
        .await
        .unwrap();

    let sweeper = Sweeper::new(harness.storage.clone(), Duration::from_secs(60));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

    assert_eq!(conversations::count_for_user(db, &courier.id).await.unwrap(), 0);
    assert_eq!(conversations::count_for_user(db, &other.id).await.unwrap(), 1);
}

#[tokio::test]
async fn sweeper_runs_on_interval_until_cancelled() {
    let (harness, courier) = courier_harness().await;
    harness.send(COURIER_PHONE, "hi").await.unwrap();
    let db = harness.storage.database().unwrap();
    conversations::set_expiry(db, &courier.id, Some(Utc::now() - TimeDelta::minutes(1)))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let sweeper = Sweeper::new(harness.storage.clone(), Duration::from_millis(20));
    let handle = tokio::spawn(sweeper.run(cancel.clone()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while conversations::count_for_user(db, &courier.id).await.unwrap() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn expired_conversation_restarts_with_welcome() {
    let (harness, courier) = courier_harness().await;
    harness.send(COURIER_PHONE, "hi").await.unwrap();
    harness.send(COURIER_PHONE, "1").await.unwrap();

    conversations::set_expiry(
        harness.storage.database().unwrap(),
        &courier.id,
        Some(Utc::now() - TimeDelta::seconds(1)),
    )
    .await
    .unwrap();

    let reply = harness.send(COURIER_PHONE, "1").await.unwrap();
    assert!(reply.contains("שלום דני"));
    let conv = harness.conversation(&courier.id).await.unwrap().unwrap();
    assert_eq!(conv.state, ConversationState::AwaitingMenuSelection);
}

#[tokio::test]
async fn recoverable_receive_error_is_retried_after_delay() {
    let settings = ConversationSettings::default();
    let store = Arc::new(MemoryStore::new(settings));
    let directory = Arc::new(MemoryDirectory::new());
    let machine = Arc::new(StateMachine::new(
        store,
        directory.clone(),
        directory.clone(),
        settings,
    ));
    let transport = Arc::new(FailingReceive::default());
    let bot = Arc::new(Bot::new(machine, directory, transport.clone()));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(bot.run(cancel.clone()));
    tokio::time::sleep(RECEIVE_RETRY_DELAY / 4).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(transport.polls.load(Ordering::SeqCst), 1);
}
