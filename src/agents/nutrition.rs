//! Nutrition Agent
//!
//! Logs meals with keyword-table estimates and gives food guidance, grounded in
//! glycemic-index references when a retriever is available.

use tracing::info;
use uuid::Uuid;

use crate::agents::classifiers::{estimate_meal, extract_meal, infer_meal_type, MealEstimate};
use crate::agents::context::{apology, format_timestamp, now, title_case, AgentContext, RECENT_LIMIT};
use crate::models::{HealthRecord, MealRecord, MealType};
use crate::types::AppResult;

const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are a supportive nutrition guide with access to glycemic index data. \
Use GI information when discussing food choices for diabetes.";

const DAILY_WINDOW: usize = 20;

fn insight(estimate: &MealEstimate) -> &'static str {
    if estimate.protein >= 20.0 {
        "Great protein content! Excellent for muscle maintenance."
    } else if estimate.carbs > 60.0 {
        "High in carbs. Pair with protein for balanced energy."
    } else if estimate.calories < 300 {
        "Light meal! Perfect for a healthy snack or light eating."
    } else {
        "Well-balanced meal! Keep up the healthy eating!"
    }
}

fn format_meals(meals: &[MealRecord]) -> String {
    if meals.is_empty() {
        return "No recent meals logged.".to_string();
    }
    let mut text = String::from("Recent meals:\n");
    for meal in meals {
        text.push_str(&format!(
            "- {}: {} ({} cal, {:.0}g carbs)\n",
            format_timestamp(&meal.recorded_at),
            meal.name,
            meal.calories,
            meal.carbs
        ));
    }
    text
}

pub struct NutritionAgent {
    ctx: AgentContext,
}

impl NutritionAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, user_id: Uuid, message: &str) -> String {
        match extract_meal(message) {
            Some(name) => self
                .log_meal(user_id, &name, message)
                .await
                .unwrap_or_else(|e| apology(&e)),
            None => self.advise(user_id, message).await,
        }
    }

    /// Commit `name` as a meal. The meal type comes from keywords in `message`.
    pub async fn log_meal(&self, user_id: Uuid, name: &str, message: &str) -> AppResult<String> {
        let estimate = estimate_meal(name);
        let meal_type = infer_meal_type(message);
        let record = MealRecord {
            id: None,
            name: name.to_string(),
            meal_type,
            calories: estimate.calories,
            carbs: estimate.carbs,
            protein: estimate.protein,
            fats: estimate.fats,
            recorded_at: now(),
            is_demo: false,
        };
        self.ctx.commit(user_id, HealthRecord::Meal(record)).await?;
        info!(%user_id, meal = %name, %meal_type, calories = estimate.calories, "Meal logged");

        Ok(Self::acknowledge(name, meal_type, &estimate))
    }

    pub fn acknowledge(name: &str, meal_type: MealType, estimate: &MealEstimate) -> String {
        let mut text = format!("**Meal logged successfully!**\n\n**Meal**: {}\n", title_case(name));
        if meal_type != MealType::Unspecified {
            text.push_str(&format!("**Type**: {}\n", title_case(meal_type.as_str())));
        }
        text.push_str(&format!(
            "\n**Estimated Nutrition**:\n\
             - Calories: {} cal\n\
             - Carbs: {:.0}g\n\
             - Protein: {:.0}g\n\
             - Fats: {:.0}g\n\n{}",
            estimate.calories,
            estimate.carbs,
            estimate.protein,
            estimate.fats,
            insight(estimate)
        ));
        text
    }

    pub async fn advise(&self, user_id: Uuid, message: &str) -> String {
        let meals = match self.ctx.store.recent_meals(user_id, RECENT_LIMIT).await {
            Ok(meals) => meals,
            Err(e) => return apology(&e),
        };

        let mut prompt = format!(
            "You are a Nutrition Guidance Agent, part of a Personal Health AI Assistant.\n\n\
             Guidelines:\n\
             - Focus on balanced nutrition (carbs, protein, fats)\n\
             - Recommend whole foods when possible\n\
             - Be realistic and non-judgmental\n\
             - Consider portion sizes\n\n\
             Nutritional estimates:\n\
             - Carbs/Protein: ~4 cal/gram\n\
             - Fats: ~9 cal/gram\n\n\
             Available data: {}\n\n\
             User message: {}\n\n\
             Respond in a supportive, informative manner.",
            format_meals(&meals),
            message
        );

        if let Some(references) = self
            .ctx
            .references(&format!("glycemic index nutrition {}", message))
            .await
        {
            prompt.push_str(&format!(
                "\n\n{}\nUse this glycemic index data to provide accurate nutritional guidance. \
                 Mention GI values when relevant.",
                references
            ));
        }

        self.ctx.narrate(SYSTEM_PROMPT, &prompt, TEMPERATURE).await
    }

    /// Totals over the most recent meals with protein and calorie feedback
    pub async fn daily_summary(&self, user_id: Uuid) -> AppResult<String> {
        let meals = self.ctx.store.recent_meals(user_id, DAILY_WINDOW).await?;
        if meals.is_empty() {
            return Ok("No meals logged today. Let's start tracking your nutrition!".to_string());
        }

        let calories: i64 = meals.iter().map(|m| i64::from(m.calories)).sum();
        let carbs: f64 = meals.iter().map(|m| m.carbs).sum();
        let protein: f64 = meals.iter().map(|m| m.protein).sum();
        let fats: f64 = meals.iter().map(|m| m.fats).sum();

        let mut summary = format!(
            "**Daily Nutrition Summary**\n\n\
             **Meals Logged**: {}\n\
             **Total Calories**: {} cal\n\
             **Carbs**: {:.1}g\n\
             **Protein**: {:.1}g\n\
             **Fats**: {:.1}g\n\n",
            meals.len(),
            calories,
            carbs,
            protein,
            fats
        );

        if protein < 50.0 {
            summary.push_str("Try to include more protein-rich foods (chicken, fish, beans, eggs).\n");
        } else if protein > 100.0 {
            summary.push_str("Excellent protein intake! Great for muscle maintenance and recovery.\n");
        }

        summary.push_str(if calories < 1200 {
            "Calories seem low. Make sure you're eating enough to fuel your body."
        } else if calories > 2500 {
            "High calorie intake today. Balance with activity or lighter meals tomorrow."
        } else {
            "Good calorie balance for the day!"
        });

        Ok(summary)
    }
}
