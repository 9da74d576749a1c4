//! Pattern statistics over a user's history.
//!
//! Four independent findings, each gated by a minimum sample size and a
//! significance threshold. A gate that is not met yields `None`, never an error.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::models::{ExerciseRecord, GlucoseReading, MealRecord};

pub struct AnalysisConfig {
    pub min_exercise_records: usize,
    pub min_meal_records: usize,
    pub min_meals_with_response: usize,
    pub min_time_of_day_readings: usize,
    /// Exercise-day vs rest-day difference that counts as a finding
    pub exercise_effect_threshold: f64,
    /// Above this the exercise effect is called strong
    pub strong_effect_threshold: f64,
    pub time_of_day_threshold: f64,
    pub exercise_timing_threshold: f64,
    /// Post-meal window, exclusive on both ends
    pub post_meal_window: (Duration, Duration),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_exercise_records: 3,
            min_meal_records: 5,
            min_meals_with_response: 3,
            min_time_of_day_readings: 10,
            exercise_effect_threshold: 10.0,
            strong_effect_threshold: 20.0,
            time_of_day_threshold: 20.0,
            exercise_timing_threshold: 15.0,
            post_meal_window: (Duration::hours(1), Duration::hours(3)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    /// Reading buckets: Morning 6-11, Afternoon 12-17, Evening 18-23
    pub fn of_reading(at: &NaiveDateTime) -> Option<Self> {
        match at.hour() {
            6..=11 => Some(DayPeriod::Morning),
            12..=17 => Some(DayPeriod::Afternoon),
            18..=23 => Some(DayPeriod::Evening),
            _ => None,
        }
    }

    /// Exercise buckets: Morning 5-11, Evening 17-21
    pub fn of_exercise(at: &NaiveDateTime) -> Option<Self> {
        match at.hour() {
            5..=11 => Some(DayPeriod::Morning),
            17..=21 => Some(DayPeriod::Evening),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayPeriod::Morning => "Morning",
            DayPeriod::Afternoon => "Afternoon",
            DayPeriod::Evening => "Evening",
        }
    }
}

impl std::fmt::Display for DayPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    ExerciseGlucose,
    MealImpact,
    TimeOfDay,
    ExerciseTiming,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealResponse {
    pub meal: String,
    pub post_glucose: f64,
}

/// One statistical observation. Rendered to text with `Display`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    ExerciseGlucose {
        exercise_day_mean: f64,
        rest_day_mean: f64,
        strong: bool,
    },
    MealImpact {
        higher: Vec<MealResponse>,
        lower: Vec<MealResponse>,
    },
    TimeOfDay {
        highest: (DayPeriod, f64),
        lowest: (DayPeriod, f64),
    },
    ExerciseTiming {
        better: (DayPeriod, f64),
        worse: (DayPeriod, f64),
    },
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn mean_post_glucose(responses: &[MealResponse]) -> f64 {
    mean(responses.iter().map(|r| r.post_glucose)).unwrap_or_default()
}

/// Mean glucose over readings whose calendar date is (or is not) in `dates`
fn mean_on_dates(glucose: &[GlucoseReading], dates: &HashSet<NaiveDate>, inside: bool) -> Option<f64> {
    mean(
        glucose
            .iter()
            .filter(|r| dates.contains(&r.recorded_at.date()) == inside)
            .map(|r| r.value),
    )
}

impl Finding {
    pub fn kind(&self) -> FindingKind {
        match self {
            Finding::ExerciseGlucose { .. } => FindingKind::ExerciseGlucose,
            Finding::MealImpact { .. } => FindingKind::MealImpact,
            Finding::TimeOfDay { .. } => FindingKind::TimeOfDay,
            Finding::ExerciseTiming { .. } => FindingKind::ExerciseTiming,
        }
    }

    /// Size of the effect in mg/dL
    pub fn magnitude(&self) -> f64 {
        match self {
            Finding::ExerciseGlucose { exercise_day_mean, rest_day_mean, .. } => {
                (rest_day_mean - exercise_day_mean).abs()
            }
            Finding::MealImpact { higher, lower } => {
                mean_post_glucose(higher) - mean_post_glucose(lower)
            }
            Finding::TimeOfDay { highest, lowest } => highest.1 - lowest.1,
            Finding::ExerciseTiming { better, worse } => worse.1 - better.1,
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::ExerciseGlucose { exercise_day_mean, rest_day_mean, strong } => {
                let direction = if rest_day_mean > exercise_day_mean { "lower" } else { "higher" };
                write!(
                    f,
                    "**Exercise-Glucose Correlation**:\n\
                     Your glucose is {:.0} mg/dL {} on days you exercise.\n\
                     - Exercise days: {:.0} mg/dL average\n\
                     - Non-exercise days: {:.0} mg/dL average\n\
                     - Pattern strength: {}",
                    self.magnitude(),
                    direction,
                    exercise_day_mean,
                    rest_day_mean,
                    if *strong { "Strong" } else { "Moderate" }
                )
            }
            Finding::MealImpact { higher, lower } => {
                let names = |list: &Vec<MealResponse>| {
                    list.iter().map(|r| r.meal.as_str()).collect::<Vec<_>>().join(", ")
                };
                let recommended = lower.first().map(|r| r.meal.as_str()).unwrap_or_default();
                write!(
                    f,
                    "**Meal-Glucose Impact**:\n\
                     Your glucose responds differently to different meals:\n\
                     - Higher spikes: {} (avg {:.0} mg/dL)\n\
                     - Lower spikes: {} (avg {:.0} mg/dL)\n\
                     - Recommendation: Stick to meals similar to {} for better control",
                    names(higher),
                    mean_post_glucose(higher),
                    names(lower),
                    mean_post_glucose(lower),
                    recommended
                )
            }
            Finding::TimeOfDay { highest, lowest } => write!(
                f,
                "**Time-of-Day Pattern**:\n\
                 Your glucose varies by time of day:\n\
                 - {}: {:.0} mg/dL (highest)\n\
                 - {}: {:.0} mg/dL (lowest)\n\
                 - Difference: {:.0} mg/dL\n\
                 - Focus on managing {} levels",
                highest.0,
                highest.1,
                lowest.0,
                lowest.1,
                self.magnitude(),
                highest.0.as_str().to_lowercase()
            ),
            Finding::ExerciseTiming { better, worse } => write!(
                f,
                "**Exercise Timing Insight**:\n\
                 Your {} workouts show better results:\n\
                 - {} exercise: {:.0} mg/dL average glucose\n\
                 - {} exercise: {:.0} mg/dL average\n\
                 - Recommendation: Try exercising in the {} more often",
                better.0.as_str().to_lowercase(),
                better.0,
                better.1,
                worse.0,
                worse.1,
                better.0.as_str().to_lowercase()
            ),
        }
    }
}

/// Glucose on days with any exercise vs days without, by calendar date
pub fn exercise_glucose_correlation(
    glucose: &[GlucoseReading],
    exercise: &[ExerciseRecord],
    config: &AnalysisConfig,
) -> Option<Finding> {
    if exercise.len() < config.min_exercise_records {
        return None;
    }

    let exercise_dates: HashSet<NaiveDate> = exercise.iter().map(|e| e.recorded_at.date()).collect();
    let exercise_day_mean = mean_on_dates(glucose, &exercise_dates, true)?;
    let rest_day_mean = mean_on_dates(glucose, &exercise_dates, false)?;

    let difference = (rest_day_mean - exercise_day_mean).abs();
    (difference > config.exercise_effect_threshold).then_some(Finding::ExerciseGlucose {
        exercise_day_mean,
        rest_day_mean,
        strong: difference > config.strong_effect_threshold,
    })
}

/// Mean glucose in the window after each meal, ranked to find the extremes
pub fn meal_glucose_impact(
    glucose: &[GlucoseReading],
    meals: &[MealRecord],
    config: &AnalysisConfig,
) -> Option<Finding> {
    if meals.len() < config.min_meal_records {
        return None;
    }

    let (after, until) = config.post_meal_window;
    let mut responses: Vec<MealResponse> = meals
        .iter()
        .filter_map(|meal| {
            let start = meal.recorded_at + after;
            let end = meal.recorded_at + until;
            mean(
                glucose
                    .iter()
                    .filter(|r| r.recorded_at > start && r.recorded_at < end)
                    .map(|r| r.value),
            )
            .map(|post_glucose| MealResponse {
                meal: meal.name.clone(),
                post_glucose,
            })
        })
        .collect();

    if responses.len() < config.min_meals_with_response {
        return None;
    }

    responses.sort_by(|a, b| b.post_glucose.total_cmp(&a.post_glucose));
    let higher: Vec<MealResponse> = responses.iter().take(2).cloned().collect();
    let lower: Vec<MealResponse> = responses.iter().rev().take(2).cloned().collect();

    Some(Finding::MealImpact { higher, lower })
}

/// Per-period mean glucose; reported when the spread between periods is large
pub fn time_of_day_pattern(glucose: &[GlucoseReading], config: &AnalysisConfig) -> Option<Finding> {
    if glucose.len() < config.min_time_of_day_readings {
        return None;
    }

    let mut buckets: HashMap<DayPeriod, Vec<f64>> = HashMap::new();
    for reading in glucose {
        if let Some(period) = DayPeriod::of_reading(&reading.recorded_at) {
            buckets.entry(period).or_default().push(reading.value);
        }
    }

    // Fixed order so ties resolve the same way every run
    let means: Vec<(DayPeriod, f64)> = [DayPeriod::Morning, DayPeriod::Afternoon, DayPeriod::Evening]
        .into_iter()
        .filter_map(|p| buckets.get(&p).and_then(|v| mean(v.iter().copied())).map(|m| (p, m)))
        .collect();

    let highest = *means.iter().reduce(|a, b| if b.1 > a.1 { b } else { a })?;
    let lowest = *means.iter().reduce(|a, b| if b.1 < a.1 { b } else { a })?;

    (highest.1 - lowest.1 > config.time_of_day_threshold)
        .then_some(Finding::TimeOfDay { highest, lowest })
}

/// Glucose on days with morning exercise vs days with evening exercise
pub fn exercise_timing(
    glucose: &[GlucoseReading],
    exercise: &[ExerciseRecord],
    config: &AnalysisConfig,
) -> Option<Finding> {
    if exercise.len() < config.min_exercise_records {
        return None;
    }

    let dates_for = |period: DayPeriod| -> HashSet<NaiveDate> {
        exercise
            .iter()
            .filter(|e| DayPeriod::of_exercise(&e.recorded_at) == Some(period))
            .map(|e| e.recorded_at.date())
            .collect()
    };

    let morning_dates = dates_for(DayPeriod::Morning);
    let evening_dates = dates_for(DayPeriod::Evening);
    if morning_dates.is_empty() || evening_dates.is_empty() {
        return None;
    }

    let morning = mean_on_dates(glucose, &morning_dates, true)?;
    let evening = mean_on_dates(glucose, &evening_dates, true)?;
    if (morning - evening).abs() <= config.exercise_timing_threshold {
        return None;
    }

    let (better, worse) = if morning < evening {
        ((DayPeriod::Morning, morning), (DayPeriod::Evening, evening))
    } else {
        ((DayPeriod::Evening, evening), (DayPeriod::Morning, morning))
    };
    Some(Finding::ExerciseTiming { better, worse })
}

/// Every finding that passes its gates, in a fixed order
pub fn find_patterns(
    glucose: &[GlucoseReading],
    meals: &[MealRecord],
    exercise: &[ExerciseRecord],
    config: &AnalysisConfig,
) -> Vec<Finding> {
    [
        exercise_glucose_correlation(glucose, exercise, config),
        meal_glucose_impact(glucose, meals, config),
        time_of_day_pattern(glucose, config),
        exercise_timing(glucose, exercise, config),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn reading(day: u32, hour: u32, value: f64) -> GlucoseReading {
        GlucoseReading::new(value, at(day, hour, 0))
    }

    fn session(day: u32, hour: u32) -> ExerciseRecord {
        ExerciseRecord {
            id: None,
            activity: "walk".to_string(),
            duration_minutes: 30,
            calories_burned: 120,
            intensity: "moderate".to_string(),
            recorded_at: at(day, hour, 0),
            is_demo: false,
        }
    }

    fn meal(name: &str, day: u32, hour: u32) -> MealRecord {
        MealRecord {
            id: None,
            name: name.to_string(),
            meal_type: MealType::Unspecified,
            calories: 400,
            carbs: 40.0,
            protein: 20.0,
            fats: 10.0,
            recorded_at: at(day, hour, 0),
            is_demo: false,
        }
    }

    /// Days 1-3 have exercise and read `exercise_value`; days 4-6 read `rest_value`.
    fn exercise_fixture(exercise_value: f64, rest_value: f64) -> (Vec<GlucoseReading>, Vec<ExerciseRecord>) {
        let glucose = (1..=6)
            .map(|day| reading(day, 8, if day <= 3 { exercise_value } else { rest_value }))
            .collect();
        let exercise = (1..=3).map(|day| session(day, 18)).collect();
        (glucose, exercise)
    }

    #[test]
    fn test_exercise_correlation_strong() {
        let (glucose, exercise) = exercise_fixture(115.0, 140.0);
        let finding = exercise_glucose_correlation(&glucose, &exercise, &AnalysisConfig::default()).unwrap();

        assert_eq!(finding.kind(), FindingKind::ExerciseGlucose);
        assert_eq!(finding.magnitude(), 25.0);
        let text = finding.to_string();
        assert!(text.contains("25 mg/dL lower"));
        assert!(text.contains("Pattern strength: Strong"));
    }

    #[test]
    fn test_exercise_correlation_moderate_and_suppressed() {
        let config = AnalysisConfig::default();

        let (glucose, exercise) = exercise_fixture(120.0, 135.0);
        let finding = exercise_glucose_correlation(&glucose, &exercise, &config).unwrap();
        assert!(finding.to_string().contains("Moderate"));

        let (glucose, exercise) = exercise_fixture(120.0, 128.0);
        assert!(exercise_glucose_correlation(&glucose, &exercise, &config).is_none());
    }

    #[test]
    fn test_exercise_correlation_needs_three_sessions_and_both_sides() {
        let config = AnalysisConfig::default();
        let (glucose, mut exercise) = exercise_fixture(100.0, 160.0);
        exercise.truncate(2);
        assert!(exercise_glucose_correlation(&glucose, &exercise, &config).is_none());

        // Every reading falls on an exercise day
        let glucose: Vec<_> = (1..=3).map(|day| reading(day, 8, 100.0)).collect();
        let exercise: Vec<_> = (1..=3).map(|day| session(day, 18)).collect();
        assert!(exercise_glucose_correlation(&glucose, &exercise, &config).is_none());
    }

    #[test]
    fn test_meal_impact_ranks_extremes() {
        let meals = vec![
            meal("pasta", 1, 12),
            meal("salad", 2, 12),
            meal("pizza", 3, 12),
            meal("eggs", 4, 12),
            meal("no reading", 5, 12),
        ];
        let glucose = vec![
            GlucoseReading::new(190.0, at(1, 14, 0)),
            GlucoseReading::new(120.0, at(2, 13, 30)),
            GlucoseReading::new(180.0, at(3, 14, 0)),
            GlucoseReading::new(110.0, at(4, 14, 0)),
            // Exactly +1h is outside the window
            GlucoseReading::new(300.0, at(5, 13, 0)),
        ];

        let finding = meal_glucose_impact(&glucose, &meals, &AnalysisConfig::default()).unwrap();
        match &finding {
            Finding::MealImpact { higher, lower } => {
                assert_eq!(higher[0].meal, "pasta");
                assert_eq!(higher[1].meal, "pizza");
                assert_eq!(lower[0].meal, "eggs");
                assert_eq!(lower[1].meal, "salad");
            }
            other => panic!("unexpected finding {other:?}"),
        }
        let text = finding.to_string();
        assert!(text.contains("Higher spikes: pasta, pizza (avg 185 mg/dL)"));
        assert!(text.contains("meals similar to eggs"));
    }

    #[test]
    fn test_meal_impact_gates() {
        let config = AnalysisConfig::default();
        let meals: Vec<_> = (1..=4).map(|d| meal("oatmeal", d, 8)).collect();
        let glucose: Vec<_> = (1..=4).map(|d| reading(d, 10, 150.0)).collect();
        assert!(meal_glucose_impact(&glucose, &meals, &config).is_none());

        // Five meals but only two with a post-meal reading
        let meals: Vec<_> = (1..=5).map(|d| meal("oatmeal", d, 8)).collect();
        let glucose = vec![reading(1, 10, 150.0), reading(2, 10, 140.0)];
        assert!(meal_glucose_impact(&glucose, &meals, &config).is_none());
    }

    #[test]
    fn test_time_of_day_pattern() {
        let config = AnalysisConfig::default();
        let mut glucose: Vec<_> = (1..=5).map(|d| reading(d, 8, 110.0)).collect();
        glucose.extend((1..=5).map(|d| reading(d, 15, 150.0)));
        glucose.push(reading(6, 3, 400.0)); // overnight, not bucketed

        let finding = time_of_day_pattern(&glucose, &config).unwrap();
        assert_eq!(
            finding,
            Finding::TimeOfDay {
                highest: (DayPeriod::Afternoon, 150.0),
                lowest: (DayPeriod::Morning, 110.0),
            }
        );
        assert!(finding.to_string().contains("Focus on managing afternoon levels"));

        glucose.truncate(9);
        assert!(time_of_day_pattern(&glucose, &config).is_none());
    }

    #[test]
    fn test_time_of_day_bucket_bounds() {
        assert_eq!(DayPeriod::of_reading(&at(1, 6, 0)), Some(DayPeriod::Morning));
        assert_eq!(DayPeriod::of_reading(&at(1, 11, 59)), Some(DayPeriod::Morning));
        assert_eq!(DayPeriod::of_reading(&at(1, 12, 0)), Some(DayPeriod::Afternoon));
        assert_eq!(DayPeriod::of_reading(&at(1, 23, 0)), Some(DayPeriod::Evening));
        assert_eq!(DayPeriod::of_reading(&at(1, 5, 0)), None);
        assert_eq!(DayPeriod::of_exercise(&at(1, 5, 0)), Some(DayPeriod::Morning));
        assert_eq!(DayPeriod::of_exercise(&at(1, 14, 0)), None);
        assert_eq!(DayPeriod::of_exercise(&at(1, 21, 30)), Some(DayPeriod::Evening));
    }

    #[test]
    fn test_exercise_timing_prefers_lower_side() {
        let config = AnalysisConfig::default();
        let exercise = vec![session(1, 7), session(2, 7), session(3, 18)];
        let glucose = vec![reading(1, 12, 110.0), reading(2, 12, 120.0), reading(3, 12, 150.0)];

        let finding = exercise_timing(&glucose, &exercise, &config).unwrap();
        assert_eq!(
            finding,
            Finding::ExerciseTiming {
                better: (DayPeriod::Morning, 115.0),
                worse: (DayPeriod::Evening, 150.0),
            }
        );
        assert!(finding.to_string().contains("Try exercising in the morning more often"));
    }

    #[test]
    fn test_exercise_timing_needs_both_sides() {
        let config = AnalysisConfig::default();
        let exercise = vec![session(1, 7), session(2, 7), session(3, 7)];
        let glucose = vec![reading(1, 12, 110.0), reading(2, 12, 180.0)];
        assert!(exercise_timing(&glucose, &exercise, &config).is_none());

        let exercise = vec![session(1, 7), session(2, 7), session(3, 18)];
        let glucose = vec![reading(1, 12, 130.0), reading(3, 12, 140.0)];
        assert!(exercise_timing(&glucose, &exercise, &config).is_none());
    }

    #[test]
    fn test_find_patterns_keeps_order() {
        let (glucose, exercise) = exercise_fixture(115.0, 140.0);
        let findings = find_patterns(&glucose, &[], &exercise, &AnalysisConfig::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind(), FindingKind::ExerciseGlucose);
    }
}
