//! Insights Coordinator Agent
//!
//! Answers cross-domain questions by consulting pattern analysis and the
//! relevant domain agents concurrently, then synthesizing one reply. Domain
//! agents are consulted through their narrative path only, so coordination
//! never writes to the store.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::agents::domain::{
    matched_tags, mentions_optimization, starts_with_why, DomainTag, GATING_KEYWORDS,
    TRIGGER_KEYWORDS,
};
use crate::agents::Specialists;
use crate::llm::LLM;

const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str =
    "You are an expert at synthesizing multi-agent health insights into actionable advice.";

const NOT_CONSULTED: &str = "Not consulted for this query";

pub const FOOTER: &str = "\n\n---\n*This response coordinated insights from multiple specialized agents with your personal health data.*";

/// True for "why" questions, questions spanning two or more domains, and
/// requests to optimize something.
pub fn should_coordinate(message: &str) -> bool {
    starts_with_why(message)
        || matched_tags(message, GATING_KEYWORDS).len() >= 2
        || mentions_optimization(message)
}

struct AgentFindings {
    pattern: String,
    diabetes: Option<String>,
    nutrition: Option<String>,
    fitness: Option<String>,
}

fn synthesis_prompt(question: &str, findings: &AgentFindings) -> String {
    let or_skipped = |part: &Option<String>| part.clone().unwrap_or_else(|| NOT_CONSULTED.to_string());
    format!(
        "You are a health insights coordinator. Multiple specialized AI agents have analyzed a user's question.\n\n\
         USER QUESTION: {question}\n\n\
         AGENT FINDINGS:\n\n\
         **Pattern Analysis Agent:**\n{}\n\n\
         **Diabetes Agent:**\n{}\n\n\
         **Nutrition Agent:**\n{}\n\n\
         **Fitness Agent:**\n{}\n\n\
         YOUR TASK:\n\
         Synthesize these findings into ONE comprehensive, actionable response that:\n\
         1. Directly answers the user's question\n\
         2. Combines insights from multiple agents coherently\n\
         3. Provides specific, personalized recommendations based on their data\n\
         4. Uses actual numbers and patterns mentioned by agents\n\
         5. Is encouraging and supportive\n\n\
         Focus on the MOST relevant insights. Don't just list what each agent said - weave them together into a cohesive answer.",
        findings.pattern,
        or_skipped(&findings.diabetes),
        or_skipped(&findings.nutrition),
        or_skipped(&findings.fitness),
    )
}

pub struct InsightsCoordinator {
    llm: LLM,
    specialists: Arc<Specialists>,
}

impl InsightsCoordinator {
    pub fn new(llm: LLM, specialists: Arc<Specialists>) -> Self {
        Self { llm, specialists }
    }

    async fn gather(&self, user_id: Uuid, message: &str) -> AgentFindings {
        let triggered = matched_tags(message, TRIGGER_KEYWORDS);
        let consult = |tag| triggered.contains(&tag);
        let s = &self.specialists;

        let diabetes = async {
            if consult(DomainTag::Glucose) {
                Some(s.diabetes.advise(user_id, message).await)
            } else {
                None
            }
        };
        let nutrition = async {
            if consult(DomainTag::Nutrition) {
                Some(s.nutrition.advise(user_id, message).await)
            } else {
                None
            }
        };
        let fitness = async {
            if consult(DomainTag::Exercise) {
                Some(s.fitness.advise(user_id, message).await)
            } else {
                None
            }
        };

        let (pattern, diabetes, nutrition, fitness) =
            tokio::join!(s.pattern.analyze(user_id), diabetes, nutrition, fitness);

        AgentFindings {
            pattern,
            diabetes,
            nutrition,
            fitness,
        }
    }

    pub async fn coordinate(&self, user_id: Uuid, message: &str) -> String {
        let findings = self.gather(user_id, message).await;
        info!(
            %user_id,
            diabetes = findings.diabetes.is_some(),
            nutrition = findings.nutrition.is_some(),
            fitness = findings.fitness.is_some(),
            "Synthesizing coordinated answer"
        );

        match self
            .llm
            .complete(SYSTEM_PROMPT, &synthesis_prompt(message, &findings), TEMPERATURE)
            .await
        {
            Ok(text) => format!("{text}{FOOTER}"),
            Err(e) => {
                error!(error = %e, model = self.llm.model(), "Coordination synthesis failed");
                format!("I'm having trouble coordinating the analysis. Error: {}", e)
            }
        }
    }
}
