// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Motorcycle records, mileage reports and maintenance status.

use motofleet_core::{FleetError, MaintenanceSummary, MileageReport, Motorcycle, MotorcycleQuery};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, get_opt_u32, get_u32, map_tr_err, parse_date};

const COLUMNS: &str = "id, license_plate, model, client_id, assigned_courier_id, current_mileage, \
                       last_maintenance_mileage, last_maintenance_date, maintenance_interval_km";

fn row_to_motorcycle(row: &rusqlite::Row<'_>) -> rusqlite::Result<Motorcycle> {
    let last_date: Option<String> = row.get(7)?;
    Ok(Motorcycle {
        id: row.get(0)?,
        license_plate: row.get(1)?,
        model: row.get(2)?,
        client_id: row.get(3)?,
        assigned_courier_id: row.get(4)?,
        current_mileage: get_u32(row, 5)?,
        last_maintenance_mileage: get_opt_u32(row, 6)?,
        last_maintenance_date: last_date.as_deref().map(|d| parse_date(7, d)).transpose()?,
        maintenance_interval_km: get_u32(row, 8)?,
    })
}

fn select_one(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Motorcycle>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM motorcycles WHERE id = ?1"),
        params![id],
        row_to_motorcycle,
    )
    .optional()
}

/// Create a motorcycle.
pub async fn insert_motorcycle(db: &Database, motorcycle: &Motorcycle) -> Result<(), FleetError> {
    let m = motorcycle.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO motorcycles ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    m.id,
                    m.license_plate,
                    m.model,
                    m.client_id,
                    m.assigned_courier_id,
                    m.current_mileage,
                    m.last_maintenance_mileage,
                    m.last_maintenance_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    m.maintenance_interval_km,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_motorcycle(db: &Database, id: &str) -> Result<Option<Motorcycle>, FleetError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_one(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Motorcycles matching every set field of `query`, sorted by plate.
pub async fn list_motorcycles(
    db: &Database,
    query: &MotorcycleQuery,
) -> Result<Vec<Motorcycle>, FleetError> {
    let query = query.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM motorcycles
                 WHERE (?1 IS NULL OR assigned_courier_id = ?1)
                   AND (?2 IS NULL OR client_id = ?2)
                 ORDER BY license_plate ASC"
            ))?;
            let rows = stmt.query_map(
                params![query.assigned_courier_id, query.client_id],
                row_to_motorcycle,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

enum MileageOutcome {
    Recorded(Motorcycle),
    UnknownMotorcycle,
    BelowCurrent { current: u32 },
}

/// Records a reading and advances the odometer.
///
/// Readings below the current odometer are rejected with
/// [`FleetError::Validation`]; an equal reading is accepted.
pub async fn record_mileage(
    db: &Database,
    report: &MileageReport,
) -> Result<Motorcycle, FleetError> {
    let r = report.clone();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut motorcycle) = select_one(&tx, &r.motorcycle_id)? else {
                return Ok(MileageOutcome::UnknownMotorcycle);
            };
            if r.mileage < motorcycle.current_mileage {
                return Ok(MileageOutcome::BelowCurrent {
                    current: motorcycle.current_mileage,
                });
            }
            tx.execute(
                "INSERT INTO mileage_reports (motorcycle_id, mileage, reported_by)
                 VALUES (?1, ?2, ?3)",
                params![r.motorcycle_id, r.mileage, r.reported_by],
            )?;
            tx.execute(
                "UPDATE motorcycles
                 SET current_mileage = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![r.mileage, r.motorcycle_id],
            )?;
            tx.commit()?;
            motorcycle.current_mileage = r.mileage;
            Ok(MileageOutcome::Recorded(motorcycle))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        MileageOutcome::Recorded(motorcycle) => Ok(motorcycle),
        MileageOutcome::UnknownMotorcycle => {
            Err(FleetError::not_found("motorcycle", &report.motorcycle_id))
        }
        MileageOutcome::BelowCurrent { current } => Err(FleetError::Validation(format!(
            "mileage {} is below current odometer {current} for motorcycle {}",
            report.mileage, report.motorcycle_id
        ))),
    }
}

/// Next service is one interval after the last service (or after zero).
pub fn summarize(motorcycle: &Motorcycle) -> MaintenanceSummary {
    let base = motorcycle.last_maintenance_mileage.unwrap_or(0);
    let next = base.saturating_add(motorcycle.maintenance_interval_km);
    MaintenanceSummary {
        last_service_mileage: motorcycle.last_maintenance_mileage,
        last_service_date: motorcycle.last_maintenance_date,
        next_service_mileage: next,
        km_remaining: i64::from(next) - i64::from(motorcycle.current_mileage),
    }
}
