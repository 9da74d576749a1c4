//! Log Store
//!
//! Append-only storage for users and their glucose, meal and exercise logs.
//! Agents only see the [`LogStore`] trait; the process picks Postgres when
//! `DATABASE_URL` is set and the in-memory store otherwise.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    ExerciseRecord, GlucoseReading, HealthRecord, MealRecord, RecordKind, RecordStats, User,
};
use crate::types::AppResult;

pub mod memory;
pub mod operations;
pub mod pool;

pub use memory::MemoryLogStore;
pub use operations::PgLogStore;
pub use pool::{create_pool, health_check, run_migrations};

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn create_user(&self, name: &str, is_demo: bool) -> AppResult<User>;

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Newest first
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Commit one record for `user_id` and return its id. The record's own `id` is ignored.
    async fn append(&self, user_id: Uuid, record: HealthRecord) -> AppResult<i64>;

    /// Up to `limit` records of `kind` for `user_id`, newest first.
    async fn recent(
        &self,
        user_id: Uuid,
        kind: RecordKind,
        limit: usize,
    ) -> AppResult<Vec<HealthRecord>>;

    /// Aggregate over records of `kind` logged in the last `window_days` days.
    async fn stats(
        &self,
        user_id: Uuid,
        kind: RecordKind,
        window_days: i64,
    ) -> AppResult<RecordStats>;

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn recent_glucose(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<GlucoseReading>> {
        let records = self.recent(user_id, RecordKind::Glucose, limit).await?;
        Ok(records.into_iter().filter_map(HealthRecord::into_glucose).collect())
    }

    async fn recent_meals(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<MealRecord>> {
        let records = self.recent(user_id, RecordKind::Meal, limit).await?;
        Ok(records.into_iter().filter_map(HealthRecord::into_meal).collect())
    }

    async fn recent_exercises(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ExerciseRecord>> {
        let records = self.recent(user_id, RecordKind::Exercise, limit).await?;
        Ok(records.into_iter().filter_map(HealthRecord::into_exercise).collect())
    }
}
