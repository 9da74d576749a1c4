use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::agents::{AgentRoute, ChatDispatcher, ChatReply};
use crate::analysis::Finding;
use crate::config::Config;
use crate::db::LogStore;
use crate::middleware::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
    pub dispatcher: Arc<ChatDispatcher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Config,
}

// Core models. Every record is owned by exactly one user; the store keeps that association.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_demo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    pub id: Option<i64>,
    /// mg/dL
    pub value: f64,
    pub recorded_at: NaiveDateTime,
    pub notes: String,
    pub is_demo: bool,
}

impl GlucoseReading {
    pub fn new(value: f64, recorded_at: NaiveDateTime) -> Self {
        Self {
            id: None,
            value,
            recorded_at,
            notes: String::new(),
            is_demo: false,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn demo(mut self) -> Self {
        self.is_demo = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    #[default]
    Unspecified,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Unspecified => "unspecified",
        }
    }

    /// Unknown or missing labels map to `Unspecified`
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_lowercase()).as_deref() {
            Some("breakfast") => MealType::Breakfast,
            Some("lunch") => MealType::Lunch,
            Some("dinner") => MealType::Dinner,
            Some("snack") => MealType::Snack,
            _ => MealType::Unspecified,
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: Option<i64>,
    pub name: String,
    pub meal_type: MealType,
    pub calories: i32,
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
    pub recorded_at: NaiveDateTime,
    pub is_demo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: Option<i64>,
    pub activity: String,
    pub duration_minutes: i32,
    pub calories_burned: i32,
    pub intensity: String,
    pub recorded_at: NaiveDateTime,
    pub is_demo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Glucose,
    Meal,
    Exercise,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Glucose => "glucose",
            RecordKind::Meal => "meal",
            RecordKind::Exercise => "exercise",
        }
    }
}

/// A structured log entry of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HealthRecord {
    Glucose(GlucoseReading),
    Meal(MealRecord),
    Exercise(ExerciseRecord),
}

impl HealthRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            HealthRecord::Glucose(_) => RecordKind::Glucose,
            HealthRecord::Meal(_) => RecordKind::Meal,
            HealthRecord::Exercise(_) => RecordKind::Exercise,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            HealthRecord::Glucose(r) => r.id,
            HealthRecord::Meal(r) => r.id,
            HealthRecord::Exercise(r) => r.id,
        }
    }

    pub fn recorded_at(&self) -> NaiveDateTime {
        match self {
            HealthRecord::Glucose(r) => r.recorded_at,
            HealthRecord::Meal(r) => r.recorded_at,
            HealthRecord::Exercise(r) => r.recorded_at,
        }
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        match self {
            HealthRecord::Glucose(r) => r.id = Some(id),
            HealthRecord::Meal(r) => r.id = Some(id),
            HealthRecord::Exercise(r) => r.id = Some(id),
        }
    }

    /// The numeric value aggregated by `LogStore::stats`
    pub fn metric(&self) -> f64 {
        match self {
            HealthRecord::Glucose(r) => r.value,
            HealthRecord::Meal(r) => f64::from(r.calories),
            HealthRecord::Exercise(r) => f64::from(r.duration_minutes),
        }
    }

    pub fn into_glucose(self) -> Option<GlucoseReading> {
        match self {
            HealthRecord::Glucose(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_meal(self) -> Option<MealRecord> {
        match self {
            HealthRecord::Meal(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_exercise(self) -> Option<ExerciseRecord> {
        match self {
            HealthRecord::Exercise(r) => Some(r),
            _ => None,
        }
    }
}

/// Aggregate over a trailing window. Glucose aggregates the reading value,
/// meals aggregate calories and exercise aggregates duration minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStats {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: i64,
}

impl RecordStats {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut stats = RecordStats::default();
        let mut sum = 0.0;
        for value in values {
            sum += value;
            stats.count += 1;
            stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
            stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
        }
        if stats.count > 0 {
            stats.mean = Some(sum / stats.count as f64);
        }
        stats
    }
}

// API Request/Response types

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<AgentRoute>,
    pub coordinated: bool,
    pub logged: Vec<RecordKind>,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            text: reply.text,
            route: reply.route,
            coordinated: reply.coordinated,
            logged: reply.logged,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub is_demo: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InsightQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub text: String,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Glucose summary window; defaults to a week
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_values() {
        let stats = RecordStats::from_values([100.0, 150.0, 200.0]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, Some(150.0));
        assert_eq!(stats.min, Some(100.0));
        assert_eq!(stats.max, Some(200.0));
    }

    #[test]
    fn test_stats_empty() {
        let stats = RecordStats::from_values(std::iter::empty());
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_none());
    }

    #[test]
    fn test_meal_type_labels() {
        assert_eq!(MealType::from_label(Some("Lunch")), MealType::Lunch);
        assert_eq!(MealType::from_label(Some("brunch")), MealType::Unspecified);
        assert_eq!(MealType::from_label(None), MealType::Unspecified);
        assert_eq!(MealType::Dinner.to_string(), "dinner");
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let record = HealthRecord::Glucose(GlucoseReading::new(120.0, at));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "glucose");
        assert_eq!(json["value"], 120.0);
    }
}
