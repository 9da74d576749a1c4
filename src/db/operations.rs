use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::LogStore;
use crate::models::*;
use crate::types::{AppError, AppResult};

/// Postgres-backed log store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            is_demo: row.try_get("is_demo")?,
        })
    }

    fn glucose_from_row(row: &PgRow) -> Result<HealthRecord, sqlx::Error> {
        Ok(HealthRecord::Glucose(GlucoseReading {
            id: Some(row.try_get("id")?),
            value: row.try_get("value")?,
            recorded_at: row.try_get::<NaiveDateTime, _>("recorded_at")?,
            notes: row.try_get("notes")?,
            is_demo: row.try_get("is_demo")?,
        }))
    }

    fn meal_from_row(row: &PgRow) -> Result<HealthRecord, sqlx::Error> {
        let meal_type: Option<String> = row.try_get("meal_type")?;
        Ok(HealthRecord::Meal(MealRecord {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            meal_type: MealType::from_label(meal_type.as_deref()),
            calories: row.try_get("calories")?,
            carbs: row.try_get("carbs")?,
            protein: row.try_get("protein")?,
            fats: row.try_get("fats")?,
            recorded_at: row.try_get::<NaiveDateTime, _>("recorded_at")?,
            is_demo: row.try_get("is_demo")?,
        }))
    }

    fn exercise_from_row(row: &PgRow) -> Result<HealthRecord, sqlx::Error> {
        Ok(HealthRecord::Exercise(ExerciseRecord {
            id: Some(row.try_get("id")?),
            activity: row.try_get("activity")?,
            duration_minutes: row.try_get("duration_minutes")?,
            calories_burned: row.try_get("calories_burned")?,
            intensity: row.try_get("intensity")?,
            recorded_at: row.try_get::<NaiveDateTime, _>("recorded_at")?,
            is_demo: row.try_get("is_demo")?,
        }))
    }

    /// Table and aggregated column for each record kind
    fn stats_source(kind: RecordKind) -> (&'static str, &'static str) {
        match kind {
            RecordKind::Glucose => ("glucose_readings", "value"),
            RecordKind::Meal => ("meals", "calories::float8"),
            RecordKind::Exercise => ("exercise", "duration_minutes::float8"),
        }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn create_user(&self, name: &str, is_demo: bool) -> AppResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, is_demo)
            VALUES ($1, $2, $3)
            RETURNING id, name, created_at, is_demo
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(is_demo)
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::user_from_row(&row)?)
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, name, created_at, is_demo FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(Self::user_from_row)
            .transpose()
            .map_err(AppError::from)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, name, created_at, is_demo FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(Self::user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::from)
    }

    async fn append(&self, user_id: Uuid, record: HealthRecord) -> AppResult<i64> {
        let id: i64 = match &record {
            HealthRecord::Glucose(r) => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO glucose_readings (user_id, value, recorded_at, notes, is_demo)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(user_id)
                .bind(r.value)
                .bind(r.recorded_at)
                .bind(&r.notes)
                .bind(r.is_demo)
                .fetch_one(&self.pool)
                .await?
            }
            HealthRecord::Meal(r) => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO meals (user_id, name, meal_type, calories, carbs, protein, fats, recorded_at, is_demo)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    RETURNING id
                    "#,
                )
                .bind(user_id)
                .bind(&r.name)
                .bind(r.meal_type.as_str())
                .bind(r.calories)
                .bind(r.carbs)
                .bind(r.protein)
                .bind(r.fats)
                .bind(r.recorded_at)
                .bind(r.is_demo)
                .fetch_one(&self.pool)
                .await?
            }
            HealthRecord::Exercise(r) => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO exercise (user_id, activity, duration_minutes, calories_burned, intensity, recorded_at, is_demo)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id
                    "#,
                )
                .bind(user_id)
                .bind(&r.activity)
                .bind(r.duration_minutes)
                .bind(r.calories_burned)
                .bind(&r.intensity)
                .bind(r.recorded_at)
                .bind(r.is_demo)
                .fetch_one(&self.pool)
                .await?
            }
        };

        tracing::debug!(%user_id, kind = record.kind().as_str(), id, "Record appended");
        Ok(id)
    }

    async fn recent(
        &self,
        user_id: Uuid,
        kind: RecordKind,
        limit: usize,
    ) -> AppResult<Vec<HealthRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let (sql, mapper): (&str, fn(&PgRow) -> Result<HealthRecord, sqlx::Error>) = match kind {
            RecordKind::Glucose => (
                r#"
                SELECT id, value, recorded_at, notes, is_demo
                FROM glucose_readings
                WHERE user_id = $1
                ORDER BY recorded_at DESC, id DESC
                LIMIT $2
                "#,
                Self::glucose_from_row,
            ),
            RecordKind::Meal => (
                r#"
                SELECT id, name, meal_type, calories, carbs, protein, fats, recorded_at, is_demo
                FROM meals
                WHERE user_id = $1
                ORDER BY recorded_at DESC, id DESC
                LIMIT $2
                "#,
                Self::meal_from_row,
            ),
            RecordKind::Exercise => (
                r#"
                SELECT id, activity, duration_minutes, calories_burned, intensity, recorded_at, is_demo
                FROM exercise
                WHERE user_id = $1
                ORDER BY recorded_at DESC, id DESC
                LIMIT $2
                "#,
                Self::exercise_from_row,
            ),
        };

        let rows = sqlx::query(sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(mapper)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::from)
    }

    async fn stats(
        &self,
        user_id: Uuid,
        kind: RecordKind,
        window_days: i64,
    ) -> AppResult<RecordStats> {
        let (table, column) = Self::stats_source(kind);
        let sql = format!(
            r#"
            SELECT AVG({column})::float8 AS mean,
                   MIN({column})::float8 AS min,
                   MAX({column})::float8 AS max,
                   COUNT(*) AS count
            FROM {table}
            WHERE user_id = $1
              AND recorded_at >= LOCALTIMESTAMP - make_interval(days => $2)
            "#
        );
        let days = i32::try_from(window_days)
            .map_err(|_| AppError::InvalidRequest(format!("window too large: {window_days} days")))?;

        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(days)
            .fetch_one(&self.pool)
            .await?;

        Ok(RecordStats {
            mean: row.try_get("mean")?,
            min: row.try_get("min")?,
            max: row.try_get("max")?,
            count: row.try_get("count")?,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        super::health_check(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}
