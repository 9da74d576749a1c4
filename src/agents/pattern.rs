//! Pattern Analysis Agent
//!
//! Recomputes the statistical findings on every call and asks the completion
//! service to narrate them. Nothing is cached.

use tracing::{debug, info};
use uuid::Uuid;

use crate::agents::context::{apology, AgentContext};
use crate::analysis::{find_patterns, AnalysisConfig, Finding};
use crate::types::AppResult;

const TEMPERATURE: f32 = 0.5;

const HISTORY_LIMIT: usize = 100;

pub const NO_GLUCOSE_MESSAGE: &str = "Not enough data yet. Log more glucose readings to see patterns.";

pub const NO_FINDINGS_MESSAGE: &str =
    "I need more data to find meaningful patterns. Keep logging for at least 7 days!";

fn summary_prompt(findings: &[Finding]) -> String {
    let analysis = findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a health pattern analyst. Here are the patterns I found in the user's data:\n\n\
         {analysis}\n\n\
         Create a friendly, actionable summary that:\n\
         1. Highlights the most important patterns\n\
         2. Provides specific, personalized recommendations\n\
         3. Uses the user's actual data to be credible\n\
         4. Sounds encouraging and supportive\n\n\
         Keep it concise but impactful."
    )
}

/// Outcome of the statistics pass before narration
enum Analysis {
    NoGlucose,
    Findings(Vec<Finding>),
}

pub struct PatternAgent {
    ctx: AgentContext,
    config: AnalysisConfig,
}

impl PatternAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            config: AnalysisConfig::default(),
        }
    }

    async fn compute(&self, user_id: Uuid) -> AppResult<Analysis> {
        let store = &self.ctx.store;
        let glucose = store.recent_glucose(user_id, HISTORY_LIMIT).await?;
        if glucose.is_empty() {
            return Ok(Analysis::NoGlucose);
        }
        let (meals, exercise) = futures::try_join!(
            store.recent_meals(user_id, HISTORY_LIMIT),
            store.recent_exercises(user_id, HISTORY_LIMIT),
        )?;

        let findings = find_patterns(&glucose, &meals, &exercise, &self.config);
        debug!(
            %user_id,
            readings = glucose.len(),
            meals = meals.len(),
            sessions = exercise.len(),
            findings = findings.len(),
            "Pattern analysis computed"
        );
        Ok(Analysis::Findings(findings))
    }

    pub async fn analyze(&self, user_id: Uuid) -> String {
        self.analyze_with_findings(user_id).await.0
    }

    /// Narrated analysis together with the findings behind it, from one pass over the store
    pub async fn analyze_with_findings(&self, user_id: Uuid) -> (String, Vec<Finding>) {
        let findings = match self.compute(user_id).await {
            Ok(Analysis::NoGlucose) => return (NO_GLUCOSE_MESSAGE.to_string(), Vec::new()),
            Ok(Analysis::Findings(findings)) if findings.is_empty() => {
                return (NO_FINDINGS_MESSAGE.to_string(), findings)
            }
            Ok(Analysis::Findings(findings)) => findings,
            Err(e) => return (apology(&e), Vec::new()),
        };

        info!(%user_id, count = findings.len(), "Narrating patterns");
        let text = self
            .ctx
            .narrate(
                "You are a health data analyst providing personalized insights.",
                &summary_prompt(&findings),
                TEMPERATURE,
            )
            .await;
        (text, findings)
    }

    /// Answer `question` with the current analysis as context
    pub async fn get_specific_insight(&self, user_id: Uuid, question: &str) -> String {
        let patterns = self.analyze(user_id).await;
        let prompt = format!(
            "Based on this user's health patterns:\n\n{patterns}\n\n\
             User's question: {question}\n\n\
             Provide a specific, actionable answer using their actual data. Be direct and helpful."
        );

        self.ctx
            .narrate(
                "You are a health analyst answering specific questions about user patterns.",
                &prompt,
                TEMPERATURE,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LogStore, MemoryLogStore};
    use crate::llm::testing::{scripted_llm, ScriptedAdapter};
    use crate::models::{ExerciseRecord, GlucoseReading, HealthRecord};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    async fn setup(adapter: ScriptedAdapter) -> (PatternAgent, Arc<MemoryLogStore>, Arc<ScriptedAdapter>, Uuid) {
        let store = Arc::new(MemoryLogStore::new());
        let user = store.create_user("Alex", false).await.unwrap();
        let (llm, adapter) = scripted_llm(adapter);
        (PatternAgent::new(AgentContext::new(store.clone(), llm)), store, adapter, user.id)
    }

    async fn seed_exercise_effect(store: &MemoryLogStore, user_id: Uuid) {
        for day in 1..=6 {
            let value = if day <= 3 { 115.0 } else { 140.0 };
            store
                .append(user_id, HealthRecord::Glucose(GlucoseReading::new(value, at(day, 8))))
                .await
                .unwrap();
        }
        for day in 1..=3 {
            let session = ExerciseRecord {
                id: None,
                activity: "walk".to_string(),
                duration_minutes: 30,
                calories_burned: 120,
                intensity: "moderate".to_string(),
                recorded_at: at(day, 18),
                is_demo: false,
            };
            store.append(user_id, HealthRecord::Exercise(session)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_no_glucose_message() {
        let (agent, _, adapter, user_id) = setup(ScriptedAdapter::reply("unused")).await;
        assert_eq!(agent.analyze(user_id).await, NO_GLUCOSE_MESSAGE);
        assert!(adapter.requests().is_empty());
    }

    #[tokio::test]
    async fn test_no_findings_skips_completion() {
        let (agent, store, adapter, user_id) = setup(ScriptedAdapter::reply("unused")).await;
        store
            .append(user_id, HealthRecord::Glucose(GlucoseReading::new(120.0, at(1, 8))))
            .await
            .unwrap();

        assert_eq!(agent.analyze(user_id).await, NO_FINDINGS_MESSAGE);
        assert!(adapter.requests().is_empty());
    }

    #[tokio::test]
    async fn test_findings_are_narrated() {
        let (agent, store, adapter, user_id) = setup(ScriptedAdapter::reply("Exercise helps you.")).await;
        seed_exercise_effect(&store, user_id).await;

        assert_eq!(agent.analyze(user_id).await, "Exercise helps you.");
        let prompt = &adapter.prompts()[0];
        assert!(prompt.contains("**Exercise-Glucose Correlation**"));
        assert!(prompt.contains("25 mg/dL lower"));
        assert_eq!(adapter.requests()[0].temperature, Some(0.5));
    }

    #[tokio::test]
    async fn test_analyze_with_findings_narrates_once() {
        let (agent, store, adapter, user_id) = setup(ScriptedAdapter::reply("Exercise helps you.")).await;
        seed_exercise_effect(&store, user_id).await;

        let (text, findings) = agent.analyze_with_findings(user_id).await;
        assert_eq!(text, "Exercise helps you.");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind(), crate::analysis::FindingKind::ExerciseGlucose);
        assert_eq!(adapter.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_narration_failure_is_apology() {
        let (agent, store, _, user_id) = setup(ScriptedAdapter::fail("rate limited")).await;
        seed_exercise_effect(&store, user_id).await;

        let text = agent.analyze(user_id).await;
        assert!(text.starts_with("I'm having trouble processing that right now."));
    }

    #[tokio::test]
    async fn test_specific_insight_uses_analysis() {
        let (agent, store, adapter, user_id) = setup(ScriptedAdapter::sequence(vec![
            Ok("Your glucose drops on exercise days.".to_string()),
            Ok("Walk after dinner.".to_string()),
        ]))
        .await;
        seed_exercise_effect(&store, user_id).await;

        let answer = agent.get_specific_insight(user_id, "When should I walk?").await;
        assert_eq!(answer, "Walk after dinner.");
        let prompts = adapter.prompts();
        assert!(prompts[1].contains("Your glucose drops on exercise days."));
        assert!(prompts[1].contains("User's question: When should I walk?"));
    }
}
