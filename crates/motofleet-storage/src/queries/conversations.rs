// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation persistence.
//!
//! Each public function is a single `call` closure, so every
//! read-modify-write below is atomic against other store operations.

use std::str::FromStr;

use chrono::{TimeDelta, Utc};
use motofleet_core::{
    ContextPatch, Conversation, ConversationContext, ConversationState, FleetError,
};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params};

use crate::database::{Database, format_timestamp, map_tr_err, parse_timestamp, truncated_now};

const COLUMNS: &str = "id, user_id, state, context, expires_at, created_at, updated_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let state: String = row.get(2)?;
    let context: String = row.get(3)?;
    let expires_at: Option<String> = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        state: ConversationState::from_str(&state)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        context: serde_json::from_str::<ConversationContext>(&context)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        expires_at: expires_at
            .as_deref()
            .map(|raw| parse_timestamp(4, raw))
            .transpose()?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}

fn encode_context(context: &ConversationContext) -> rusqlite::Result<String> {
    serde_json::to_string(context).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Most recently updated non-expired record of the user.
fn latest_active(
    tx: &Transaction<'_>,
    user_id: &str,
    now: &str,
) -> rusqlite::Result<Option<Conversation>> {
    tx.query_row(
        &format!(
            "SELECT {COLUMNS} FROM conversations
             WHERE user_id = ?1 AND (expires_at IS NULL OR expires_at > ?2)
             ORDER BY updated_at DESC, rowid DESC LIMIT 1"
        ),
        params![user_id, now],
        row_to_conversation,
    )
    .optional()
}

/// Most recently updated record of the user, expired or not.
fn latest_any(tx: &Transaction<'_>, user_id: &str) -> rusqlite::Result<Option<Conversation>> {
    tx.query_row(
        &format!(
            "SELECT {COLUMNS} FROM conversations
             WHERE user_id = ?1 ORDER BY updated_at DESC, rowid DESC LIMIT 1"
        ),
        params![user_id],
        row_to_conversation,
    )
    .optional()
}

/// Writes state, context and a refreshed expiry for row `conversation.id`.
fn write_back(tx: &Transaction<'_>, conversation: &Conversation) -> rusqlite::Result<()> {
    tx.execute(
        "UPDATE conversations
         SET state = ?1, context = ?2, expires_at = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            conversation.state.to_string(),
            encode_context(&conversation.context)?,
            conversation.expires_at.map(format_timestamp),
            format_timestamp(conversation.updated_at),
            conversation.id,
        ],
    )?;
    Ok(())
}

fn insert_idle(
    tx: &Transaction<'_>,
    user_id: &str,
    timeout: TimeDelta,
) -> rusqlite::Result<Conversation> {
    let now = truncated_now();
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        state: ConversationState::Idle,
        context: ConversationContext::default(),
        expires_at: Some(now + timeout),
        created_at: now,
        updated_at: now,
    };
    tx.execute(
        &format!("INSERT INTO conversations ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            conversation.id,
            conversation.user_id,
            conversation.state.to_string(),
            encode_context(&conversation.context)?,
            conversation.expires_at.map(format_timestamp),
            format_timestamp(conversation.created_at),
            format_timestamp(conversation.updated_at),
        ],
    )?;
    Ok(conversation)
}

/// Returns the active conversation with a refreshed expiry, creating an idle
/// one when the user has none.
pub async fn get_or_create(
    db: &Database,
    user_id: &str,
    timeout: TimeDelta,
) -> Result<Conversation, FleetError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = truncated_now();
            let conversation = match latest_active(&tx, &user_id, &format_timestamp(now))? {
                Some(mut existing) => {
                    existing.expires_at = Some(now + timeout);
                    existing.updated_at = now;
                    write_back(&tx, &existing)?;
                    existing
                }
                None => insert_idle(&tx, &user_id, timeout)?,
            };
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Reads the active conversation without touching it.
pub async fn get_active(db: &Database, user_id: &str) -> Result<Option<Conversation>, FleetError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let found = latest_active(&tx, &user_id, &format_timestamp(truncated_now()))?;
            tx.commit()?;
            Ok(found)
        })
        .await
        .map_err(map_tr_err)
}

/// Merges `patch` into the active record and writes `state`.
pub async fn update_state(
    db: &Database,
    user_id: &str,
    state: ConversationState,
    patch: ContextPatch,
    timeout: TimeDelta,
) -> Result<Conversation, FleetError> {
    let owned_user = user_id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = truncated_now();
            let Some(mut conversation) =
                latest_active(&tx, &owned_user, &format_timestamp(now))?
            else {
                return Ok(None);
            };
            conversation.state = state;
            conversation.context.apply(patch);
            conversation.expires_at = Some(now + timeout);
            conversation.updated_at = now;
            write_back(&tx, &conversation)?;
            tx.commit()?;
            Ok(Some(conversation))
        })
        .await
        .map_err(map_tr_err)?;
    updated.ok_or_else(|| FleetError::not_found("active conversation", user_id))
}

/// Resets the most recent record (active or not) to idle with an empty context.
pub async fn reset(
    db: &Database,
    user_id: &str,
    timeout: TimeDelta,
) -> Result<Conversation, FleetError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let conversation = match latest_any(&tx, &user_id)? {
                Some(mut existing) => {
                    let now = truncated_now();
                    existing.state = ConversationState::Idle;
                    existing.context = ConversationContext::default();
                    existing.expires_at = Some(now + timeout);
                    existing.updated_at = now;
                    write_back(&tx, &existing)?;
                    existing
                }
                None => insert_idle(&tx, &user_id, timeout)?,
            };
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes every record of the user.
pub async fn delete_for_user(db: &Database, user_id: &str) -> Result<u64, FleetError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM conversations WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes records whose expiry has been reached.
pub async fn cleanup_expired(db: &Database) -> Result<u64, FleetError> {
    cleanup_expired_at(db, truncated_now()).await
}

/// Deletes records with `expires_at <= now`, matching [`Conversation::is_expired_at`].
pub async fn cleanup_expired_at(
    db: &Database,
    now: chrono::DateTime<Utc>,
) -> Result<u64, FleetError> {
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM conversations WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of records stored for the user, expired ones included.
pub async fn count_for_user(db: &Database, user_id: &str) -> Result<u64, FleetError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM conversations WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Sets `expires_at` on every record of the user.
///
/// Used by maintenance tooling and tests to age conversations.
pub async fn set_expiry(
    db: &Database,
    user_id: &str,
    expires_at: Option<chrono::DateTime<Utc>>,
) -> Result<(), FleetError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET expires_at = ?1 WHERE user_id = ?2",
                params![expires_at.map(format_timestamp), user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
