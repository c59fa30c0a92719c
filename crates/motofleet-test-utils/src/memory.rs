// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory conversation store and directories.
//!
//! Behave like the SQLite implementations for the paths the state machine
//! uses, with switches to make individual operations fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use motofleet_core::{
    ContextPatch, Conversation, ConversationContext, ConversationSettings, ConversationState,
    ConversationStore, FleetDirectory, FleetError, MaintenanceSummary, MileageReport, Motorcycle,
    MotorcycleQuery, User, UserDirectory, UserRole,
};

fn injected(op: &str) -> FleetError {
    FleetError::Internal(format!("injected {op} failure"))
}

/// Conversation store backed by a map of user id to records.
pub struct MemoryStore {
    settings: ConversationSettings,
    records: Mutex<HashMap<String, Vec<Conversation>>>,
    fail_updates: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new(settings: ConversationSettings) -> Self {
        Self {
            settings,
            records: Mutex::new(HashMap::new()),
            fail_updates: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Makes `update_state` fail until switched off.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Makes `get_or_create` and `get_active` fail until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Overwrites the user's latest record, creating one if needed.
    pub async fn seed(&self, user_id: &str, state: ConversationState, context: ConversationContext) {
        let mut records = self.records.lock().await;
        let list = records.entry(user_id.to_string()).or_default();
        if list.is_empty() {
            list.push(self.fresh(user_id));
        }
        if let Some(latest) = list.last_mut() {
            latest.state = state;
            latest.context = context;
            latest.expires_at = Some(Utc::now() + self.settings.timeout);
        }
    }

    /// Moves the expiry of the user's latest record into the past.
    pub async fn expire(&self, user_id: &str) {
        let mut records = self.records.lock().await;
        if let Some(latest) = records.get_mut(user_id).and_then(|l| l.last_mut()) {
            latest.expires_at = Some(Utc::now() - chrono::TimeDelta::seconds(1));
        }
    }

    /// All records of the user, oldest first.
    pub async fn records(&self, user_id: &str) -> Vec<Conversation> {
        self.records
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn fresh(&self, user_id: &str) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            state: ConversationState::Idle,
            context: ConversationContext::default(),
            expires_at: Some(now + self.settings.timeout),
            created_at: now,
            updated_at: now,
        }
    }

    fn active_mut<'a>(&self, list: &'a mut [Conversation]) -> Option<&'a mut Conversation> {
        let now = Utc::now();
        list.iter_mut().rev().find(|c| !c.is_expired_at(now))
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_or_create(&self, user_id: &str) -> Result<Conversation, FleetError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        let mut records = self.records.lock().await;
        let list = records.entry(user_id.to_string()).or_default();
        let timeout = self.settings.timeout;
        if let Some(active) = self.active_mut(list) {
            active.expires_at = Some(Utc::now() + timeout);
            return Ok(active.clone());
        }
        let created = self.fresh(user_id);
        list.push(created.clone());
        Ok(created)
    }

    async fn get_active(&self, user_id: &str) -> Result<Option<Conversation>, FleetError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        let mut records = self.records.lock().await;
        Ok(records
            .get_mut(user_id)
            .and_then(|list| self.active_mut(list))
            .map(|c| c.clone()))
    }

    async fn update_state(
        &self,
        user_id: &str,
        state: ConversationState,
        patch: ContextPatch,
    ) -> Result<Conversation, FleetError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected("update"));
        }
        let mut records = self.records.lock().await;
        let timeout = self.settings.timeout;
        let Some(active) = records
            .get_mut(user_id)
            .and_then(|list| self.active_mut(list))
        else {
            return Err(FleetError::not_found("active conversation", user_id));
        };
        let now = Utc::now();
        active.state = state;
        active.context.apply(patch);
        active.expires_at = Some(now + timeout);
        active.updated_at = now;
        Ok(active.clone())
    }

    async fn reset(&self, user_id: &str) -> Result<Conversation, FleetError> {
        let mut records = self.records.lock().await;
        let list = records.entry(user_id.to_string()).or_default();
        let now = Utc::now();
        match list.last_mut() {
            Some(latest) => {
                latest.state = ConversationState::Idle;
                latest.context = ConversationContext::default();
                latest.expires_at = Some(now + self.settings.timeout);
                latest.updated_at = now;
                Ok(latest.clone())
            }
            None => {
                let created = self.fresh(user_id);
                list.push(created.clone());
                Ok(created)
            }
        }
    }

    async fn delete(&self, user_id: &str) -> Result<u64, FleetError> {
        let removed = self.records.lock().await.remove(user_id);
        Ok(removed.map_or(0, |list| list.len() as u64))
    }

    async fn cleanup_expired(&self) -> Result<u64, FleetError> {
        let now = Utc::now();
        let mut removed = 0u64;
        for list in self.records.lock().await.values_mut() {
            let before = list.len();
            list.retain(|c| !c.is_expired_at(now));
            removed += (before - list.len()) as u64;
        }
        Ok(removed)
    }
}

/// User and fleet directory over plain vectors.
#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<Vec<User>>,
    motorcycles: Mutex<Vec<Motorcycle>>,
    reports: Mutex<Vec<MileageReport>>,
    fail_commits: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.users.lock().await.push(user);
    }

    pub async fn add_motorcycle(&self, motorcycle: Motorcycle) {
        self.motorcycles.lock().await.push(motorcycle);
    }

    pub async fn set_role(&self, user_id: &str, role: UserRole) {
        if let Some(user) = self.users.lock().await.iter_mut().find(|u| u.id == user_id) {
            user.role = role;
        }
    }

    /// Makes `record_mileage` fail with an internal error until switched off.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Reports accepted by `record_mileage`, in order.
    pub async fn reports(&self) -> Vec<MileageReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_or_create_by_phone(&self, phone: &str) -> Result<User, FleetError> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.iter().find(|u| u.phone == phone) {
            return Ok(user.clone());
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            name: String::new(),
            role: UserRole::Courier,
            client_id: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, FleetError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }
}

#[async_trait]
impl FleetDirectory for MemoryDirectory {
    async fn list_motorcycles(
        &self,
        query: &MotorcycleQuery,
    ) -> Result<Vec<Motorcycle>, FleetError> {
        let mut matching: Vec<Motorcycle> = self
            .motorcycles
            .lock()
            .await
            .iter()
            .filter(|m| {
                query
                    .assigned_courier_id
                    .as_ref()
                    .is_none_or(|c| m.assigned_courier_id.as_ref() == Some(c))
                    && query
                        .client_id
                        .as_ref()
                        .is_none_or(|c| m.client_id.as_ref() == Some(c))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(matching)
    }

    async fn get_motorcycle(&self, motorcycle_id: &str) -> Result<Option<Motorcycle>, FleetError> {
        Ok(self
            .motorcycles
            .lock()
            .await
            .iter()
            .find(|m| m.id == motorcycle_id)
            .cloned())
    }

    async fn record_mileage(&self, report: &MileageReport) -> Result<Motorcycle, FleetError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(injected("commit"));
        }
        let mut motorcycles = self.motorcycles.lock().await;
        let Some(motorcycle) = motorcycles.iter_mut().find(|m| m.id == report.motorcycle_id)
        else {
            return Err(FleetError::not_found("motorcycle", &report.motorcycle_id));
        };
        if report.mileage < motorcycle.current_mileage {
            return Err(FleetError::Validation(format!(
                "mileage {} is below current mileage {}",
                report.mileage, motorcycle.current_mileage
            )));
        }
        motorcycle.current_mileage = report.mileage;
        self.reports.lock().await.push(report.clone());
        Ok(motorcycle.clone())
    }

    async fn maintenance_summary(
        &self,
        motorcycle_id: &str,
    ) -> Result<Option<MaintenanceSummary>, FleetError> {
        Ok(self.get_motorcycle(motorcycle_id).await?.map(|m| {
            let next = m
                .last_maintenance_mileage
                .unwrap_or(0)
                .saturating_add(m.maintenance_interval_km);
            MaintenanceSummary {
                last_service_mileage: m.last_maintenance_mileage,
                last_service_date: m.last_maintenance_date,
                next_service_mileage: next,
                km_remaining: i64::from(next) - i64::from(m.current_mileage),
            }
        }))
    }
}
