// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store and directory traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use motofleet_config::model::StorageConfig;
use motofleet_core::{
    AdapterType, ContextPatch, Conversation, ConversationSettings, ConversationState,
    ConversationStore, FleetDirectory, FleetError, HealthStatus, MaintenanceSummary,
    MileageReport, Motorcycle, MotorcycleQuery, PluginAdapter, User, UserDirectory,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed conversation store, user directory and fleet directory.
///
/// The database is opened lazily by [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    settings: ConversationSettings,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig, settings: ConversationSettings) -> Self {
        Self {
            config,
            settings,
            db: OnceCell::new(),
        }
    }

    /// Opens the database and runs migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), FleetError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FleetError::Storage {
            source: "storage already initialized".into(),
        })?;
        info!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// The underlying handle, for fixture and maintenance queries.
    pub fn database(&self) -> Result<&Database, FleetError> {
        self.db.get().ok_or_else(|| FleetError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    pub fn settings(&self) -> ConversationSettings {
        self.settings
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FleetError> {
        let Ok(db) = self.database() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FleetError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn get_or_create(&self, user_id: &str) -> Result<Conversation, FleetError> {
        queries::conversations::get_or_create(self.database()?, user_id, self.settings.timeout)
            .await
    }

    async fn get_active(&self, user_id: &str) -> Result<Option<Conversation>, FleetError> {
        queries::conversations::get_active(self.database()?, user_id).await
    }

    async fn update_state(
        &self,
        user_id: &str,
        state: ConversationState,
        patch: ContextPatch,
    ) -> Result<Conversation, FleetError> {
        queries::conversations::update_state(
            self.database()?,
            user_id,
            state,
            patch,
            self.settings.timeout,
        )
        .await
    }

    async fn reset(&self, user_id: &str) -> Result<Conversation, FleetError> {
        queries::conversations::reset(self.database()?, user_id, self.settings.timeout).await
    }

    async fn delete(&self, user_id: &str) -> Result<u64, FleetError> {
        queries::conversations::delete_for_user(self.database()?, user_id).await
    }

    async fn cleanup_expired(&self) -> Result<u64, FleetError> {
        let removed = queries::conversations::cleanup_expired(self.database()?).await?;
        debug!(removed, "expired conversations removed");
        Ok(removed)
    }
}

#[async_trait]
impl UserDirectory for SqliteStorage {
    async fn get_or_create_by_phone(&self, phone: &str) -> Result<User, FleetError> {
        queries::users::get_or_create_by_phone(self.database()?, phone).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, FleetError> {
        queries::users::get_user(self.database()?, user_id).await
    }
}

#[async_trait]
impl FleetDirectory for SqliteStorage {
    async fn list_motorcycles(
        &self,
        query: &MotorcycleQuery,
    ) -> Result<Vec<Motorcycle>, FleetError> {
        queries::motorcycles::list_motorcycles(self.database()?, query).await
    }

    async fn get_motorcycle(&self, motorcycle_id: &str) -> Result<Option<Motorcycle>, FleetError> {
        queries::motorcycles::get_motorcycle(self.database()?, motorcycle_id).await
    }

    async fn record_mileage(&self, report: &MileageReport) -> Result<Motorcycle, FleetError> {
        let motorcycle = queries::motorcycles::record_mileage(self.database()?, report).await?;
        info!(
            motorcycle_id = %report.motorcycle_id,
            mileage = report.mileage,
            reported_by = %report.reported_by,
            "mileage recorded"
        );
        Ok(motorcycle)
    }

    async fn maintenance_summary(
        &self,
        motorcycle_id: &str,
    ) -> Result<Option<MaintenanceSummary>, FleetError> {
        Ok(
            queries::motorcycles::get_motorcycle(self.database()?, motorcycle_id)
                .await?
                .as_ref()
                .map(queries::motorcycles::summarize),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::tempdir;

    fn make_storage(path: &str) -> SqliteStorage {
        SqliteStorage::new(
            StorageConfig {
                database_path: path.to_string(),
                wal_mode: true,
            },
            ConversationSettings {
                timeout: TimeDelta::minutes(5),
                max_error_count: 3,
            },
        )
    }

    #[tokio::test]
    async fn identifies_as_storage_adapter() {
        let storage = make_storage("unused.db");
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn uninitialized_storage_reports_unhealthy() {
        let storage = make_storage("unused.db");
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        assert!(storage.get_or_create("u1").await.is_err());
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("twice.db");
        let storage = make_storage(db_path.to_str().unwrap());
        storage.initialize().await.unwrap();
        assert!(db_path.exists());
        assert!(storage.initialize().await.is_err());
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn store_applies_configured_timeout() {
        let dir = tempdir().unwrap();
        let storage = make_storage(dir.path().join("t.db").to_str().unwrap());
        storage.initialize().await.unwrap();

        let conv = storage.get_or_create("u1").await.unwrap();
        let window = conv.expires_at.unwrap() - conv.updated_at;
        assert_eq!(window, TimeDelta::minutes(5));
        assert!(!storage.is_expired(&conv));
    }

    #[tokio::test]
    async fn maintenance_summary_for_unknown_motorcycle_is_none() {
        let dir = tempdir().unwrap();
        let storage = make_storage(dir.path().join("m.db").to_str().unwrap());
        storage.initialize().await.unwrap();
        assert!(storage.maintenance_summary("ghost").await.unwrap().is_none());
    }
}
