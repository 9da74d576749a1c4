//! Fitness Agent
//!
//! Logs exercise sessions and coaches with exercise-safety references when a
//! retriever is available.

use std::collections::BTreeSet;

use tracing::info;
use uuid::Uuid;

use crate::agents::classifiers::{estimate_calories_burned, extract_exercise, ExerciseInput};
use crate::agents::context::{apology, format_timestamp, now, title_case, AgentContext, RECENT_LIMIT};
use crate::models::{ExerciseRecord, HealthRecord};
use crate::types::AppResult;

const TEMPERATURE: f32 = 0.8;

const SYSTEM_PROMPT: &str =
    "You are an enthusiastic fitness coach. Always consider diabetes exercise safety guidelines.";

const WEEKLY_WINDOW: usize = 50;
const WEEKLY_GOAL_MINUTES: i64 = 150;

fn encouragement(duration_minutes: i32) -> &'static str {
    match duration_minutes {
        d if d >= 45 => "Outstanding effort! That's a solid workout!",
        d if d >= 30 => "Awesome! You're crushing your fitness goals!",
        d if d >= 15 => "Nice work! Every minute counts!",
        _ => "Great start! Keep building that momentum!",
    }
}

fn format_sessions(sessions: &[ExerciseRecord]) -> String {
    if sessions.is_empty() {
        return "No recent exercise logged.".to_string();
    }
    let mut text = String::from("Recent exercise:\n");
    for session in sessions {
        text.push_str(&format!(
            "- {}: {} for {} min\n",
            format_timestamp(&session.recorded_at),
            session.activity,
            session.duration_minutes
        ));
    }
    text
}

pub struct FitnessAgent {
    ctx: AgentContext,
}

impl FitnessAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, user_id: Uuid, message: &str) -> String {
        match extract_exercise(message) {
            Some(input) => self
                .log_exercise(user_id, input)
                .await
                .unwrap_or_else(|e| apology(&e)),
            None => self.advise(user_id, message).await,
        }
    }

    pub async fn log_exercise(&self, user_id: Uuid, input: ExerciseInput) -> AppResult<String> {
        let calories = estimate_calories_burned(&input.activity, input.duration_minutes);
        let record = ExerciseRecord {
            id: None,
            activity: input.activity.clone(),
            duration_minutes: input.duration_minutes,
            calories_burned: calories,
            intensity: "moderate".to_string(),
            recorded_at: now(),
            is_demo: false,
        };
        self.ctx.commit(user_id, HealthRecord::Exercise(record)).await?;
        info!(%user_id, activity = %input.activity, minutes = input.duration_minutes, "Exercise logged");

        Ok(Self::acknowledge(&input.activity, input.duration_minutes, calories))
    }

    pub fn acknowledge(activity: &str, duration_minutes: i32, calories: i32) -> String {
        format!(
            "**Great workout!** You just logged:\n\n\
             **Activity**: {}\n\
             **Duration**: {} minutes\n\
             **Est. Calories Burned**: {} cal\n\n{}",
            title_case(activity),
            duration_minutes,
            calories,
            encouragement(duration_minutes)
        )
    }

    pub async fn advise(&self, user_id: Uuid, message: &str) -> String {
        let sessions = match self.ctx.store.recent_exercises(user_id, RECENT_LIMIT).await {
            Ok(sessions) => sessions,
            Err(e) => return apology(&e),
        };

        let mut prompt = format!(
            "You are a Fitness Coaching Agent, part of a Personal Health AI Assistant.\n\n\
             Guidelines:\n\
             - Recommend 150+ minutes of moderate activity per week\n\
             - Include both cardio and strength training\n\
             - Always prioritize safety (warm-up, proper form)\n\
             - Adjust recommendations based on the user's fitness level\n\n\
             Available data: {}\n\n\
             User message: {}\n\n\
             Respond in an energetic, motivating manner.",
            format_sessions(&sessions),
            message
        );

        if let Some(references) = self
            .ctx
            .references(&format!("exercise safety diabetes {}", message))
            .await
        {
            prompt.push_str(&format!(
                "\n\n{}\nUse these safety guidelines when recommending exercise.",
                references
            ));
        }

        self.ctx.narrate(SYSTEM_PROMPT, &prompt, TEMPERATURE).await
    }

    /// Totals over the most recent sessions with feedback against the weekly goal
    pub async fn weekly_summary(&self, user_id: Uuid) -> AppResult<String> {
        let sessions = self.ctx.store.recent_exercises(user_id, WEEKLY_WINDOW).await?;
        if sessions.is_empty() {
            return Ok("No exercise logged this week. Ready to get started?".to_string());
        }

        let total_minutes: i64 = sessions.iter().map(|s| i64::from(s.duration_minutes)).sum();
        let total_calories: i64 = sessions.iter().map(|s| i64::from(s.calories_burned)).sum();
        let activities: BTreeSet<&str> = sessions.iter().map(|s| s.activity.as_str()).collect();

        let feedback = if total_minutes >= WEEKLY_GOAL_MINUTES {
            "Amazing! You've exceeded the recommended 150 minutes of activity per week (ADA guidelines)!"
        } else if total_minutes >= 100 {
            "Great progress! Keep pushing toward that 150-minute weekly goal!"
        } else if total_minutes >= 50 {
            "Good start! Try to add a few more sessions this week."
        } else {
            "Let's step it up! Aim for at least 150 minutes of activity per week."
        };

        Ok(format!(
            "**Weekly Fitness Summary**\n\n\
             **Total Workouts**: {}\n\
             **Total Time**: {} minutes ({:.1} hours)\n\
             **Total Calories**: {} cal\n\
             **Activities**: {}\n\n{}",
            sessions.len(),
            total_minutes,
            total_minutes as f64 / 60.0,
            total_calories,
            activities.into_iter().collect::<Vec<_>>().join(", "),
            feedback
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LogStore, MemoryLogStore};
    use crate::llm::testing::{scripted_llm, ScriptedAdapter};
    use std::sync::Arc;

    fn agent(adapter: ScriptedAdapter) -> (FitnessAgent, Arc<MemoryLogStore>, Arc<ScriptedAdapter>) {
        let store = Arc::new(MemoryLogStore::new());
        let (llm, adapter) = scripted_llm(adapter);
        (FitnessAgent::new(AgentContext::new(store.clone(), llm)), store, adapter)
    }

    #[test]
    fn test_encouragement_tiers() {
        assert!(encouragement(45).starts_with("Outstanding"));
        assert!(encouragement(30).starts_with("Awesome"));
        assert!(encouragement(15).starts_with("Nice work"));
        assert!(encouragement(14).starts_with("Great start"));
    }

    #[tokio::test]
    async fn test_logs_exercise_with_calorie_estimate() {
        let (agent, store, adapter) = agent(ScriptedAdapter::reply("unused"));
        let user = store.create_user("Alex", false).await.unwrap();

        let reply = agent.process(user.id, "I ran for 30 minutes").await;
        assert!(reply.contains("**Activity**: Run"));
        assert!(reply.contains("**Est. Calories Burned**: 300 cal"));
        assert!(adapter.requests().is_empty());

        let sessions = store.recent_exercises(user.id, 10).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].activity, "run");
        assert_eq!(sessions[0].duration_minutes, 30);
        assert_eq!(sessions[0].intensity, "moderate");
    }

    #[tokio::test]
    async fn test_partial_exercise_falls_through_to_advice() {
        let (agent, store, adapter) = agent(ScriptedAdapter::reply("Try a brisk walk."));
        let user = store.create_user("Alex", false).await.unwrap();

        let reply = agent.process(user.id, "I ran").await;
        assert_eq!(reply, "Try a brisk walk.");
        assert!(adapter.prompts()[0].contains("No recent exercise logged."));
        assert!(store.recent_exercises(user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weekly_summary() {
        let (agent, store, _) = agent(ScriptedAdapter::reply("unused"));
        let user = store.create_user("Alex", false).await.unwrap();
        assert!(agent.weekly_summary(user.id).await.unwrap().starts_with("No exercise"));

        for (activity, minutes) in [("yoga", 40), ("run", 45), ("run", 30)] {
            agent
                .log_exercise(user.id, ExerciseInput { activity: activity.to_string(), duration_minutes: minutes })
                .await
                .unwrap();
        }

        let summary = agent.weekly_summary(user.id).await.unwrap();
        assert!(summary.contains("**Total Workouts**: 3"));
        assert!(summary.contains("**Total Time**: 115 minutes (1.9 hours)"));
        assert!(summary.contains("**Activities**: run, yoga"));
        assert!(summary.contains("Great progress"));
    }
}
