// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client and user records.

use std::str::FromStr;

use motofleet_core::{FleetError, User, UserRole};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        role: UserRole::from_str(&role)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        client_id: row.get(4)?,
    })
}

/// Create a client organisation.
pub async fn insert_client(db: &Database, id: &str, name: &str) -> Result<(), FleetError> {
    let (id, name) = (id.to_string(), name.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO clients (id, name) VALUES (?1, ?2)",
                params![id, name],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Create a user.
pub async fn insert_user(db: &Database, user: &User) -> Result<(), FleetError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, phone, name, role, client_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.phone,
                    user.name,
                    user.role.to_string(),
                    user.client_id
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, FleetError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, phone, name, role, client_id FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user_by_phone(db: &Database, phone: &str) -> Result<Option<User>, FleetError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, phone, name, role, client_id FROM users WHERE phone = ?1",
                params![phone],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Finds the user owning `phone`, registering an unnamed courier when unknown.
pub async fn get_or_create_by_phone(db: &Database, phone: &str) -> Result<User, FleetError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, phone, role) VALUES (?1, ?2, 'courier')
                 ON CONFLICT(phone) DO NOTHING",
                params![uuid::Uuid::new_v4().to_string(), phone],
            )?;
            conn.query_row(
                "SELECT id, phone, name, role, client_id FROM users WHERE phone = ?1",
                params![phone],
                row_to_user,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Change a user's role, e.g. when promoting a courier to admin.
pub async fn set_role(db: &Database, id: &str, role: UserRole) -> Result<(), FleetError> {
    let id_owned = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                params![role.to_string(), id_owned],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(FleetError::not_found("user", id));
    }
    Ok(())
}
