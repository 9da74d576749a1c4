//! Demo user with a week of plausible history, flagged as demo data.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use tracing::info;

use crate::db::LogStore;
use crate::models::{ExerciseRecord, GlucoseReading, HealthRecord, MealRecord, MealType, User};
use crate::types::{AppError, AppResult};

pub const DEMO_USER_NAME: &str = "Sarah (Demo)";

const DEMO_DAYS: i64 = 7;

/// (time, low, high, note)
const GLUCOSE_SLOTS: &[((u32, u32), u32, u32, &str)] = &[
    ((7, 15), 95, 125, "Morning"),
    ((9, 30), 130, 160, "After breakfast"),
    ((14, 0), 140, 170, "After lunch"),
    ((21, 0), 110, 140, "Evening"),
];

struct DemoMeal {
    at: (u32, u32),
    name: &'static str,
    meal_type: MealType,
    calories: i32,
    carbs: f64,
    protein: f64,
    fats: f64,
}

const DAILY_MEALS: &[DemoMeal] = &[
    DemoMeal { at: (7, 30), name: "Oatmeal with berries", meal_type: MealType::Breakfast, calories: 320, carbs: 48.0, protein: 12.0, fats: 8.0 },
    DemoMeal { at: (12, 30), name: "Chicken salad", meal_type: MealType::Lunch, calories: 420, carbs: 18.0, protein: 35.0, fats: 22.0 },
    DemoMeal { at: (19, 0), name: "Salmon with vegetables", meal_type: MealType::Dinner, calories: 520, carbs: 28.0, protein: 42.0, fats: 24.0 },
];

const EXERCISE_TIME: (u32, u32) = (17, 30);

/// Rest days, counted back from today
const REST_DAYS: &[i64] = &[2, 6];

const ROTATION: &[(&str, i32)] = &[
    ("running", 45),
    ("yoga", 40),
    ("running", 30),
    ("strength training", 35),
    ("cycling", 50),
];

fn at(day: NaiveDate, (hour, minute): (u32, u32)) -> AppResult<NaiveDateTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
        .map(|time| day.and_time(time))
        .ok_or_else(|| AppError::Internal(format!("invalid demo time {hour}:{minute}")))
}

/// Every demo record for a week ending on `today`, oldest day first
pub fn demo_records(today: NaiveDate, rng: &mut impl Rng) -> AppResult<Vec<HealthRecord>> {
    let mut records = Vec::new();

    for days_ago in (0..DEMO_DAYS).rev() {
        let day = today - Duration::days(days_ago);

        for &(time, low, high, note) in GLUCOSE_SLOTS {
            let value = f64::from(rng.gen_range(low..=high));
            records.push(HealthRecord::Glucose(
                GlucoseReading::new(value, at(day, time)?).with_notes(note).demo(),
            ));
        }

        for meal in DAILY_MEALS {
            records.push(HealthRecord::Meal(MealRecord {
                id: None,
                name: meal.name.to_string(),
                meal_type: meal.meal_type,
                calories: meal.calories,
                carbs: meal.carbs,
                protein: meal.protein,
                fats: meal.fats,
                recorded_at: at(day, meal.at)?,
                is_demo: true,
            }));
        }

        if !REST_DAYS.contains(&days_ago) {
            let (activity, duration) = ROTATION[(days_ago as usize) % ROTATION.len()];
            records.push(HealthRecord::Exercise(ExerciseRecord {
                id: None,
                activity: activity.to_string(),
                duration_minutes: duration,
                calories_burned: duration * 8,
                intensity: "moderate".to_string(),
                recorded_at: at(day, EXERCISE_TIME)?,
                is_demo: true,
            }));
        }
    }

    Ok(records)
}

pub async fn seed_demo_user(store: &dyn LogStore) -> AppResult<User> {
    let records = demo_records(Local::now().date_naive(), &mut rand::thread_rng())?;
    let user = store.create_user(DEMO_USER_NAME, true).await?;

    let count = records.len();
    for record in records {
        store.append(user.id, record).await?;
    }

    info!(user_id = %user.id, records = count, "Seeded demo user");
    Ok(user)
}
