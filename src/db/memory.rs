use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::LogStore;
use crate::models::{HealthRecord, RecordKind, RecordStats, User};
use crate::types::{AppError, AppResult};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    records: Vec<(Uuid, HealthRecord)>,
    next_id: i64,
}

/// In-process log store, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryLogStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn create_user(&self, name: &str, is_demo: bool) -> AppResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            is_demo,
        };
        let mut guard = self.inner.write().await;
        guard.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let guard = self.inner.read().await;
        Ok(guard.users.get(&user_id).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let guard = self.inner.read().await;
        let mut users: Vec<User> = guard.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn append(&self, user_id: Uuid, mut record: HealthRecord) -> AppResult<i64> {
        let mut guard = self.inner.write().await;
        if !guard.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }
        guard.next_id += 1;
        let id = guard.next_id;
        record.set_id(id);
        guard.records.push((user_id, record));
        Ok(id)
    }

    async fn recent(
        &self,
        user_id: Uuid,
        kind: RecordKind,
        limit: usize,
    ) -> AppResult<Vec<HealthRecord>> {
        let guard = self.inner.read().await;
        let mut records: Vec<HealthRecord> = guard
            .records
            .iter()
            .filter(|(owner, record)| *owner == user_id && record.kind() == kind)
            .map(|(_, record)| record.clone())
            .collect();
        // Ties on timestamp go to the later insert
        records.sort_by(|a, b| {
            b.recorded_at()
                .cmp(&a.recorded_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        records.truncate(limit);
        Ok(records)
    }

    async fn stats(
        &self,
        user_id: Uuid,
        kind: RecordKind,
        window_days: i64,
    ) -> AppResult<RecordStats> {
        let cutoff = Self::now() - Duration::days(window_days);
        let guard = self.inner.read().await;
        Ok(RecordStats::from_values(
            guard
                .records
                .iter()
                .filter(|(owner, record)| {
                    *owner == user_id && record.kind() == kind && record.recorded_at() >= cutoff
                })
                .map(|(_, record)| record.metric()),
        ))
    }
}
