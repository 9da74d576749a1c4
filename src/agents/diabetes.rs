//! Diabetes Agent
//!
//! Logs glucose readings with band-based guidance and answers glucose questions
//! with the user's recent readings as context.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::classifiers::extract_glucose;
use crate::agents::context::{apology, format_timestamp, now, AgentContext, RECENT_LIMIT};
use crate::models::{GlucoseReading, HealthRecord, RecordKind};
use crate::types::AppResult;

const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are a helpful diabetes management assistant. Use ADA guidelines: \
before-meal target 80-130 mg/dL, after-meal less than 180 mg/dL.";

/// Average at or below which a post-meal-band average still counts as good control
const GOOD_CONTROL_CEILING: f64 = 154.0;

/// Clinical-style band of a glucose value (mg/dL). Bands are checked in order
/// and the first match wins:
///
/// | band | range |
/// |---|---|
/// | `SevereLow` | v < 70 |
/// | `Low` | 70 ≤ v < 80 |
/// | `NormalPreMeal` | 80 ≤ v ≤ 130 |
/// | `NormalPostMeal` | 130 < v ≤ 180 |
/// | `High` | 180 < v ≤ 250 |
/// | `SevereHigh` | v > 250 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlucoseBand {
    SevereLow,
    Low,
    NormalPreMeal,
    NormalPostMeal,
    High,
    SevereHigh,
}

impl GlucoseBand {
    pub fn classify(value: f64) -> Self {
        if value < 70.0 {
            GlucoseBand::SevereLow
        } else if value < 80.0 {
            GlucoseBand::Low
        } else if value <= 130.0 {
            GlucoseBand::NormalPreMeal
        } else if value <= 180.0 {
            GlucoseBand::NormalPostMeal
        } else if value <= 250.0 {
            GlucoseBand::High
        } else {
            GlucoseBand::SevereHigh
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GlucoseBand::SevereLow => "severe-low",
            GlucoseBand::Low => "low",
            GlucoseBand::NormalPreMeal => "normal-pre-meal",
            GlucoseBand::NormalPostMeal => "normal-post-meal",
            GlucoseBand::High => "high",
            GlucoseBand::SevereHigh => "severe-high",
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, GlucoseBand::SevereLow | GlucoseBand::SevereHigh)
    }

    pub fn status(&self) -> &'static str {
        match self {
            GlucoseBand::SevereLow => "Too Low - Hypoglycemia Risk",
            GlucoseBand::Low => "Low - Monitor Closely",
            GlucoseBand::NormalPreMeal => "Normal (Before Meal Range)",
            GlucoseBand::NormalPostMeal => "Good (After Meal Range)",
            GlucoseBand::High => "High - Take Action",
            GlucoseBand::SevereHigh => "Very High - Seek Medical Advice",
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            GlucoseBand::SevereLow => "**This is hypoglycemia (low blood sugar).** Treat immediately with 15g of fast-acting carbs (juice, glucose tablets, or candy). Recheck in 15 minutes. If symptoms persist, seek medical help.",
            GlucoseBand::Low => "This is on the lower end. Consider a small snack to prevent hypoglycemia, especially if you're about to exercise or it's been a while since eating.",
            GlucoseBand::NormalPreMeal => "**Excellent!** This is in the normal **before-meal range (80-130 mg/dL)**. Keep up the great work!",
            GlucoseBand::NormalPostMeal => "**Good!** This is within the target **after-meal range (less than 180 mg/dL)**. Your glucose is well managed!",
            GlucoseBand::High => "**This is elevated.** Stay hydrated, avoid additional carbs for now, and consider light activity like a 15-minute walk. If consistently high, contact your healthcare provider.",
            GlucoseBand::SevereHigh => "**This is very high.** Drink plenty of water, avoid food temporarily, and contact your healthcare provider if this persists or if you feel unwell (nausea, vomiting, confusion).",
        }
    }
}

impl std::fmt::Display for GlucoseBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Interpretation of a multi-day average, refining the band table
fn interpret_average(average: f64) -> &'static str {
    match GlucoseBand::classify(average) {
        GlucoseBand::SevereLow | GlucoseBand::Low => "Your average is **low**. Discuss with your healthcare provider about adjusting medications or meal timing to prevent hypoglycemia.",
        GlucoseBand::NormalPreMeal => "**Excellent control!** Your average is in the ideal before-meal range (80-130 mg/dL). Keep up the great work!",
        GlucoseBand::NormalPostMeal if average <= GOOD_CONTROL_CEILING => "**Good control!** Your average suggests well-managed glucose levels. Continue monitoring regularly.",
        GlucoseBand::NormalPostMeal => "Your average is **slightly elevated**. Consider reviewing your diet, physical activity, and medication adherence with your healthcare provider.",
        GlucoseBand::High | GlucoseBand::SevereHigh => "Your average is **high**. Please consult with your healthcare provider about adjusting your diabetes management plan.",
    }
}

fn format_readings(readings: &[GlucoseReading]) -> String {
    if readings.is_empty() {
        return "No recent glucose readings.".to_string();
    }
    let mut text = String::from("Recent glucose readings:\n");
    for reading in readings {
        text.push_str(&format!(
            "- {}: {:.0} mg/dL\n",
            format_timestamp(&reading.recorded_at),
            reading.value
        ));
    }
    text
}

pub struct DiabetesAgent {
    ctx: AgentContext,
}

impl DiabetesAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Log a glucose value found in `message`, otherwise answer it.
    pub async fn process(&self, user_id: Uuid, message: &str) -> String {
        match extract_glucose(message) {
            Some(value) => self
                .log_reading(user_id, value)
                .await
                .unwrap_or_else(|e| apology(&e)),
            None => self.advise(user_id, message).await,
        }
    }

    /// Commit one reading and return the templated acknowledgment
    pub async fn log_reading(&self, user_id: Uuid, value: f64) -> AppResult<String> {
        let reading = GlucoseReading::new(value, now());
        self.ctx.commit(user_id, HealthRecord::Glucose(reading)).await?;
        let band = GlucoseBand::classify(value);
        if band.is_urgent() {
            warn!(%user_id, value, %band, "Urgent glucose reading logged");
        } else {
            info!(%user_id, value, %band, "Glucose reading logged");
        }
        Ok(Self::acknowledge(value))
    }

    pub fn acknowledge(value: f64) -> String {
        let band = GlucoseBand::classify(value);
        format!(
            "Logged glucose reading: **{:.0} mg/dL**\n\n{}\n\n{}",
            value,
            band.status(),
            band.guidance()
        )
    }

    /// Narrative answer over the last readings and the 7-day aggregate
    pub async fn advise(&self, user_id: Uuid, message: &str) -> String {
        let readings = match self.ctx.store.recent_glucose(user_id, RECENT_LIMIT).await {
            Ok(readings) => readings,
            Err(e) => return apology(&e),
        };
        let mut data = format_readings(&readings);

        match self.ctx.store.stats(user_id, RecordKind::Glucose, 7).await {
            Ok(stats) if stats.count > 0 => {
                if let (Some(mean), Some(min), Some(max)) = (stats.mean, stats.min, stats.max) {
                    data.push_str(&format!(
                        "\n7-day average: {:.1} mg/dL (range {:.0}-{:.0}, {} readings)",
                        mean, min, max, stats.count
                    ));
                }
            }
            Ok(_) => {}
            Err(e) => return apology(&e),
        }

        let mut prompt = format!(
            "You are a Diabetes Management Agent, part of a Personal Health AI Assistant.\n\n\
             Your role:\n\
             - Help users track blood glucose levels\n\
             - Provide insights on glucose patterns\n\
             - Offer diabetes management advice\n\
             - Alert users to concerning readings\n\n\
             Guidelines:\n\
             - Concerning: above 180 mg/dL or below 70 mg/dL\n\
             - Always be supportive and encouraging\n\
             - Recommend seeing a doctor for medical decisions\n\n\
             Available data: {}\n\n\
             User message: {}\n\n\
             Respond in a friendly, helpful manner.",
            data, message
        );

        if let Some(references) = self.ctx.references(&format!("glucose targets diabetes {}", message)).await {
            prompt.push_str(&format!(
                "\n\n{}\nUse these guidelines when they are relevant.",
                references
            ));
        }

        self.ctx.narrate(SYSTEM_PROMPT, &prompt, TEMPERATURE).await
    }

    /// Aggregate over the last `days` days with an interpretation of the average
    pub async fn glucose_summary(&self, user_id: Uuid, days: i64) -> AppResult<String> {
        let stats = self.ctx.store.stats(user_id, RecordKind::Glucose, days).await?;

        let (Some(avg), Some(min), Some(max)) = (stats.mean, stats.min, stats.max) else {
            return Ok(format!("No glucose readings found in the last {} days.", days));
        };

        let mut summary = format!(
            "**Glucose Summary (Last {days} Days)**\n\n\
             **Average**: {avg:.1} mg/dL ({band})\n\
             **Lowest**: {min:.1} mg/dL\n\
             **Highest**: {max:.1} mg/dL\n\
             **Total Readings**: {count}\n\n\
             **Target Ranges (ADA Guidelines)**:\n\
             - Before meals: 80-130 mg/dL\n\
             - After meals: Less than 180 mg/dL\n\n\
             {interpretation}",
            band = GlucoseBand::classify(avg),
            count = stats.count,
            interpretation = interpret_average(avg),
        );

        if min < 70.0 {
            summary.push_str(&format!(
                "\n\n**Note**: You had at least one low reading ({:.1} mg/dL). Be cautious of hypoglycemia.",
                min
            ));
        }
        if max > 180.0 {
            summary.push_str(&format!(
                "\n\n**Note**: You had at least one high reading ({:.1} mg/dL). Monitor for patterns.",
                max
            ));
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LogStore, MemoryLogStore};
    use crate::llm::testing::{scripted_llm, ScriptedAdapter};
    use std::sync::Arc;

    fn agent(adapter: ScriptedAdapter) -> (DiabetesAgent, Arc<MemoryLogStore>, Arc<ScriptedAdapter>) {
        let store = Arc::new(MemoryLogStore::new());
        let (llm, adapter) = scripted_llm(adapter);
        (DiabetesAgent::new(AgentContext::new(store.clone(), llm)), store, adapter)
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(GlucoseBand::classify(69.9), GlucoseBand::SevereLow);
        assert_eq!(GlucoseBand::classify(70.0), GlucoseBand::Low);
        assert_eq!(GlucoseBand::classify(80.0), GlucoseBand::NormalPreMeal);
        assert_eq!(GlucoseBand::classify(130.0), GlucoseBand::NormalPreMeal);
        assert_eq!(GlucoseBand::classify(130.5), GlucoseBand::NormalPostMeal);
        assert_eq!(GlucoseBand::classify(180.0), GlucoseBand::NormalPostMeal);
        assert_eq!(GlucoseBand::classify(250.0), GlucoseBand::High);
        assert_eq!(GlucoseBand::classify(250.1), GlucoseBand::SevereHigh);
    }

    #[test]
    fn test_bands_cover_the_line() {
        for value in (0..=700).map(|v| v as f64 * 0.5) {
            let band = GlucoseBand::classify(value);
            let expected = if value < 70.0 {
                "severe-low"
            } else if value < 80.0 {
                "low"
            } else if value <= 130.0 {
                "normal-pre-meal"
            } else if value <= 180.0 {
                "normal-post-meal"
            } else if value <= 250.0 {
                "high"
            } else {
                "severe-high"
            };
            assert_eq!(band.label(), expected, "value {value}");
        }
    }

    #[test]
    fn test_summary_interpretation_tiers() {
        assert!(interpret_average(75.0).contains("**low**"));
        assert!(interpret_average(120.0).contains("Excellent control"));
        assert!(interpret_average(154.0).contains("Good control"));
        assert!(interpret_average(160.0).contains("slightly elevated"));
        assert!(interpret_average(200.0).contains("**high**"));
    }

    #[tokio::test]
    async fn test_logging_path_skips_completion() {
        let (agent, store, adapter) = agent(ScriptedAdapter::reply("unused"));
        let user = store.create_user("Alex", false).await.unwrap();

        let reply = agent.process(user.id, "My blood sugar is 65").await;
        assert!(reply.contains("**65 mg/dL**"));
        assert!(reply.contains("hypoglycemia"));
        assert!(adapter.requests().is_empty());

        let readings = store.recent_glucose(user.id, 10).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 65.0);
    }

    #[tokio::test]
    async fn test_advice_includes_recent_readings() {
        let (agent, store, adapter) = agent(ScriptedAdapter::reply("Your readings look steady."));
        let user = store.create_user("Alex", false).await.unwrap();
        agent.log_reading(user.id, 142.0).await.unwrap();

        let reply = agent.process(user.id, "How am I doing?").await;
        assert_eq!(reply, "Your readings look steady.");

        let prompt = &adapter.prompts()[0];
        assert!(prompt.contains("142 mg/dL"));
        assert!(prompt.contains("7-day average: 142.0 mg/dL"));
        assert!(prompt.contains("How am I doing?"));
    }

    #[tokio::test]
    async fn test_advice_failure_returns_apology() {
        let (agent, store, _) = agent(ScriptedAdapter::fail("service unavailable"));
        let user = store.create_user("Alex", false).await.unwrap();

        let reply = agent.process(user.id, "What is a good range?").await;
        assert!(reply.contains("trouble processing"));
        assert!(reply.contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_glucose_summary() {
        let (agent, store, _) = agent(ScriptedAdapter::reply("unused"));
        let user = store.create_user("Alex", false).await.unwrap();

        let empty = agent.glucose_summary(user.id, 7).await.unwrap();
        assert_eq!(empty, "No glucose readings found in the last 7 days.");

        for value in [65.0, 120.0, 190.0] {
            agent.log_reading(user.id, value).await.unwrap();
        }
        let summary = agent.glucose_summary(user.id, 7).await.unwrap();
        assert!(summary.contains("**Average**: 125.0 mg/dL (normal-pre-meal)"));
        assert!(summary.contains("**Total Readings**: 3"));
        assert!(summary.contains("low reading (65.0 mg/dL)"));
        assert!(summary.contains("high reading (190.0 mg/dL)"));
    }
}
