// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User and fleet lookup contracts.

use async_trait::async_trait;

use crate::error::FleetError;
use crate::types::{MaintenanceSummary, MileageReport, Motorcycle, MotorcycleQuery, User};

/// Resolves bot users by phone number.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds the user owning `phone`, registering a courier when unknown.
    async fn get_or_create_by_phone(&self, phone: &str) -> Result<User, FleetError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, FleetError>;
}

/// Read access to motorcycles and the mileage-report sink.
#[async_trait]
pub trait FleetDirectory: Send + Sync {
    /// Motorcycles matching every set field of `query`, sorted by licence plate.
    async fn list_motorcycles(&self, query: &MotorcycleQuery)
    -> Result<Vec<Motorcycle>, FleetError>;

    async fn get_motorcycle(&self, motorcycle_id: &str) -> Result<Option<Motorcycle>, FleetError>;

    /// Commits a confirmed odometer reading.
    ///
    /// Rejects readings below the current mileage with
    /// [`FleetError::Validation`] and unknown motorcycles with
    /// [`FleetError::NotFound`].
    async fn record_mileage(&self, report: &MileageReport) -> Result<Motorcycle, FleetError>;

    async fn maintenance_summary(
        &self,
        motorcycle_id: &str,
    ) -> Result<Option<MaintenanceSummary>, FleetError>;
}
