//! Input classifiers
//!
//! Pure extraction of structured values from free text plus the keyword-table
//! estimators used when logging. Every extractor answers `None` rather than an
//! error when the text does not carry the value.

use std::sync::LazyLock;

use regex::Regex;

use crate::agents::domain::starts_with_why;
use crate::models::{HealthRecord, MealType};
use crate::types::{AppError, AppResult};

/// Accepted range for a glucose value typed into a message (mg/dL)
pub const GLUCOSE_MESSAGE_RANGE: (f64, f64) = (50.0, 400.0);

static GLUCOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{2,3})\s*(mg\s*/\s*dl|mgdl|minutes?|mins?|hours?|hrs?|kcal|calories|cals?|grams?|g)?\b",
    )
    .expect("valid glucose regex")
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:for\s*)?(\d{1,4})\s*(?:minutes?|mins?)\b").expect("valid duration regex")
});

/// Ordered meal lead-ins. The first one found in the message marks where the name starts.
const MEAL_LEAD_INS: &[&str] = &[
    "i ate ",
    "i had ",
    "i just ate ",
    "i just had ",
    "log meal: ",
    "log meal ",
    "log breakfast: ",
    "log lunch: ",
    "log dinner: ",
    "ate ",
    "had ",
    "meal: ",
    "for breakfast ",
    "for lunch ",
    "for dinner ",
];

struct ActivityEntry {
    label: &'static str,
    pattern: &'static str,
    calories_per_minute: i32,
}

/// Activity vocabulary in match priority order
const ACTIVITIES: &[ActivityEntry] = &[
    ActivityEntry { label: "run", pattern: r"run|runs|running|ran", calories_per_minute: 10 },
    ActivityEntry { label: "jog", pattern: r"jog|jogs|jogged|jogging", calories_per_minute: 8 },
    ActivityEntry { label: "walk", pattern: r"walk|walks|walked|walking", calories_per_minute: 4 },
    ActivityEntry { label: "yoga", pattern: r"yoga", calories_per_minute: 3 },
    ActivityEntry { label: "pilates", pattern: r"pilates", calories_per_minute: 5 },
    ActivityEntry { label: "swim", pattern: r"swim|swims|swam|swimming", calories_per_minute: 9 },
    ActivityEntry { label: "cycling", pattern: r"bike|biked|biking|cycle|cycled|cycling", calories_per_minute: 8 },
    ActivityEntry { label: "gym", pattern: r"gym", calories_per_minute: 6 },
    ActivityEntry { label: "workout", pattern: r"workout|worked out", calories_per_minute: 6 },
    ActivityEntry { label: "exercise", pattern: r"exercise|exercised", calories_per_minute: 5 },
    ActivityEntry { label: "strength", pattern: r"strength|weights|lifting|lifted", calories_per_minute: 5 },
];

const DEFAULT_CALORIES_PER_MINUTE: i32 = 5;

static ACTIVITY_RES: LazyLock<Vec<(&'static ActivityEntry, Regex)>> = LazyLock::new(|| {
    ACTIVITIES
        .iter()
        .map(|entry| {
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", entry.pattern))
                .expect("valid activity regex");
            (entry, re)
        })
        .collect()
});

/// Estimated nutrition for one meal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MealEstimate {
    pub calories: i32,
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
}

impl MealEstimate {
    const fn new(calories: i32, carbs: f64, protein: f64, fats: f64) -> Self {
        Self { calories, carbs, protein, fats }
    }
}

const MEAL_ESTIMATES: &[(&str, MealEstimate)] = &[
    ("salad", MealEstimate::new(200, 15.0, 10.0, 10.0)),
    ("chicken", MealEstimate::new(350, 5.0, 40.0, 15.0)),
    ("oatmeal", MealEstimate::new(300, 50.0, 10.0, 6.0)),
    ("eggs", MealEstimate::new(150, 2.0, 12.0, 10.0)),
    ("yogurt", MealEstimate::new(150, 20.0, 10.0, 3.0)),
    ("sandwich", MealEstimate::new(400, 45.0, 20.0, 15.0)),
    ("pizza", MealEstimate::new(500, 60.0, 20.0, 20.0)),
    ("pasta", MealEstimate::new(450, 70.0, 15.0, 10.0)),
    ("rice", MealEstimate::new(350, 75.0, 7.0, 1.0)),
    ("burger", MealEstimate::new(600, 45.0, 30.0, 30.0)),
];

const DEFAULT_MEAL_ESTIMATE: MealEstimate = MealEstimate::new(300, 40.0, 15.0, 10.0);

/// An (activity, duration) pair taken from one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseInput {
    pub activity: String,
    pub duration_minutes: i32,
}

/// First whole number in the accepted glucose range, skipping numbers that carry a
/// non-glucose unit ("30 minutes", "500 kcal").
///
/// A bare range check would log "walked 60 minutes" as a reading of 60; the unit
/// skip deliberately departs from plain first-number-in-range extraction.
pub fn extract_glucose(message: &str) -> Option<f64> {
    GLUCOSE_RE.captures_iter(message).find_map(|caps| {
        let unit = caps.get(2).map(|m| m.as_str().to_lowercase());
        if let Some(unit) = unit {
            if !unit.starts_with("mg") {
                return None;
            }
        }
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        (GLUCOSE_MESSAGE_RANGE.0..=GLUCOSE_MESSAGE_RANGE.1)
            .contains(&value)
            .then_some(value)
    })
}

/// Text following the first occurrence of `lead_in` that begins a word
fn after_lead_in<'a>(lowered: &'a str, lead_in: &str) -> Option<&'a str> {
    lowered.match_indices(lead_in).find_map(|(start, _)| {
        let at_word_start = lowered[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        at_word_start.then(|| &lowered[start + lead_in.len()..])
    })
}

/// Meal name after the first lead-in in list order, found anywhere in the message,
/// lowercased, cut at the first clause separator and stripped of trailing punctuation.
/// Questions starting with "why" describe a past meal rather than log one.
pub fn extract_meal(message: &str) -> Option<String> {
    if starts_with_why(message) {
        return None;
    }
    let lowered = message.trim().to_lowercase();
    let rest = MEAL_LEAD_INS
        .iter()
        .find_map(|lead_in| after_lead_in(&lowered, lead_in))?;

    let clause = rest.split([',', ';']).next().unwrap_or(rest);
    let name = clause
        .trim()
        .trim_end_matches(['.', ',', '!', '?'])
        .trim();

    (!name.is_empty()).then(|| name.to_string())
}

/// Both an activity keyword and a duration must be present, otherwise no match.
pub fn extract_exercise(message: &str) -> Option<ExerciseInput> {
    let duration: i32 = DURATION_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())?;

    let (entry, _) = ACTIVITY_RES.iter().find(|(_, re)| re.is_match(message))?;

    if !is_valid_duration(duration) {
        return None;
    }

    Some(ExerciseInput {
        activity: entry.label.to_string(),
        duration_minutes: duration,
    })
}

pub fn estimate_meal(name: &str) -> MealEstimate {
    let lowered = name.to_lowercase();
    MEAL_ESTIMATES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, estimate)| *estimate)
        .unwrap_or(DEFAULT_MEAL_ESTIMATE)
}

pub fn estimate_calories_burned(activity: &str, duration_minutes: i32) -> i32 {
    let rate = ACTIVITIES
        .iter()
        .find(|entry| entry.label.eq_ignore_ascii_case(activity))
        .map(|entry| entry.calories_per_minute)
        .unwrap_or(DEFAULT_CALORIES_PER_MINUTE);
    rate * duration_minutes
}

/// Keyword-only; no keyword means `Unspecified`.
pub fn infer_meal_type(message: &str) -> MealType {
    let lowered = message.to_lowercase();
    [
        ("breakfast", MealType::Breakfast),
        ("lunch", MealType::Lunch),
        ("dinner", MealType::Dinner),
        ("snack", MealType::Snack),
    ]
    .into_iter()
    .find(|(keyword, _)| lowered.contains(keyword))
    .map(|(_, meal_type)| meal_type)
    .unwrap_or_default()
}

pub fn is_valid_glucose(value: f64) -> bool {
    (20.0..=600.0).contains(&value)
}

pub fn is_valid_duration(minutes: i32) -> bool {
    (1..=480).contains(&minutes)
}

pub fn is_valid_calories(calories: i32) -> bool {
    (1..=5000).contains(&calories)
}

/// Range checks applied before a record is committed
pub fn validate_record(record: &HealthRecord) -> AppResult<()> {
    match record {
        HealthRecord::Glucose(r) if !is_valid_glucose(r.value) => Err(AppError::InvalidRequest(
            format!("glucose value {} mg/dL is out of range", r.value),
        )),
        HealthRecord::Meal(r) if !is_valid_calories(r.calories) => Err(AppError::InvalidRequest(
            format!("meal calories {} are out of range", r.calories),
        )),
        HealthRecord::Exercise(r) if !is_valid_duration(r.duration_minutes) => {
            Err(AppError::InvalidRequest(format!(
                "exercise duration {} min is out of range",
                r.duration_minutes
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GlucoseReading;

    #[test]
    fn test_extract_glucose() {
        assert_eq!(extract_glucose("Log glucose: 120"), Some(120.0));
        assert_eq!(extract_glucose("My blood sugar is 135"), Some(135.0));
        assert_eq!(extract_glucose("150 mg/dL"), Some(150.0));
        assert_eq!(extract_glucose("reading 95mg/dl after lunch"), Some(95.0));
    }

    #[test]
    fn test_extract_glucose_range_and_units() {
        assert_eq!(extract_glucose("glucose 45"), None);
        assert_eq!(extract_glucose("glucose 450"), None);
        assert_eq!(extract_glucose("I walked 60 minutes"), None);
        assert_eq!(extract_glucose("about 1500 steps"), None);
        assert_eq!(extract_glucose("walked 60 minutes, sugar 142"), Some(142.0));
        assert_eq!(extract_glucose("hello there"), None);
    }

    #[test]
    fn test_extract_meal_strips_lead_in_and_punctuation() {
        assert_eq!(extract_meal("I ate grilled chicken."), Some("grilled chicken".to_string()));
        assert_eq!(extract_meal("Log meal: Oatmeal with berries!"), Some("oatmeal with berries".to_string()));
        assert_eq!(extract_meal("I just had a sandwich"), Some("a sandwich".to_string()));
        assert_eq!(
            extract_meal("I ate pasta, my blood sugar is 160"),
            Some("pasta".to_string())
        );
    }

    #[test]
    fn test_extract_meal_lead_in_anywhere() {
        assert_eq!(extract_meal("For lunch I had a salad"), Some("a salad".to_string()));
        assert_eq!(extract_meal("Today I ate oatmeal"), Some("oatmeal".to_string()));
        assert_eq!(extract_meal("Had pizza for lunch"), Some("pizza for lunch".to_string()));
        assert_eq!(
            extract_meal("This morning I just had eggs; glucose 130"),
            Some("eggs".to_string())
        );
    }

    #[test]
    fn test_extract_meal_requires_lead_in() {
        assert_eq!(extract_meal("What should I eat?"), None);
        assert_eq!(extract_meal("I ate ."), None);
        assert_eq!(extract_meal("Why is my sugar high after I had pizza"), None);
        assert_eq!(extract_meal("I'm late for dinner"), None);
    }

    #[test]
    fn test_extract_exercise_needs_both_fields() {
        assert_eq!(extract_exercise("I ran"), None);
        assert_eq!(extract_exercise("30 minutes"), None);
        assert_eq!(
            extract_exercise("I ran for 30 minutes"),
            Some(ExerciseInput { activity: "run".to_string(), duration_minutes: 30 })
        );
        assert_eq!(
            extract_exercise("Yoga 45 min"),
            Some(ExerciseInput { activity: "yoga".to_string(), duration_minutes: 45 })
        );
    }

    #[test]
    fn test_extract_exercise_word_boundaries_and_limits() {
        // "grand" and "orange" must not read as "ran"
        assert_eq!(extract_exercise("grand orange juice for 10 minutes"), None);
        assert_eq!(extract_exercise("walked for 900 minutes"), None);
        assert_eq!(
            extract_exercise("Went cycling 50 mins"),
            Some(ExerciseInput { activity: "cycling".to_string(), duration_minutes: 50 })
        );
    }

    #[test]
    fn test_estimate_meal_first_keyword_wins() {
        assert_eq!(estimate_meal("grilled chicken salad").calories, 200);
        assert_eq!(estimate_meal("grilled chicken").protein, 40.0);
        assert_eq!(estimate_meal("mystery stew"), DEFAULT_MEAL_ESTIMATE);
    }

    #[test]
    fn test_estimate_calories_burned() {
        assert_eq!(estimate_calories_burned("run", 30), 300);
        assert_eq!(estimate_calories_burned("walk", 20), 80);
        assert_eq!(estimate_calories_burned("trampoline", 10), 50);
    }

    #[test]
    fn test_infer_meal_type() {
        assert_eq!(infer_meal_type("Oatmeal for breakfast"), MealType::Breakfast);
        assert_eq!(infer_meal_type("late night snack"), MealType::Snack);
        assert_eq!(infer_meal_type("pizza"), MealType::Unspecified);
    }

    #[test]
    fn test_validators() {
        assert!(is_valid_glucose(20.0) && is_valid_glucose(600.0));
        assert!(!is_valid_glucose(19.9) && !is_valid_glucose(600.5));
        assert!(is_valid_duration(1) && is_valid_duration(480) && !is_valid_duration(0));
        assert!(is_valid_calories(5000) && !is_valid_calories(5001));
    }

    #[test]
    fn test_validate_record() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert!(validate_record(&HealthRecord::Glucose(GlucoseReading::new(120.0, at))).is_ok());
        assert!(matches!(
            validate_record(&HealthRecord::Glucose(GlucoseReading::new(900.0, at))),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
