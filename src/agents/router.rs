//! Router Agent
//!
//! Classifies a message into one of a closed set of routes using the completion
//! service. The raw completion is never trusted: anything outside the set, and
//! any service failure, routes to [`AgentRoute::General`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::LLM;

const TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = "You are a routing assistant. Respond with only ONE word.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRoute {
    Diabetes,
    Fitness,
    Nutrition,
    General,
}

impl AgentRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRoute::Diabetes => "DIABETES",
            AgentRoute::Fitness => "FITNESS",
            AgentRoute::Nutrition => "NUTRITION",
            AgentRoute::General => "GENERAL",
        }
    }

    /// Accepts a label with or without the `_AGENT` suffix, in any case.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_uppercase();
        let bare = normalized.strip_suffix("_AGENT").unwrap_or(&normalized);
        match bare {
            "DIABETES" => Some(AgentRoute::Diabetes),
            "FITNESS" => Some(AgentRoute::Fitness),
            "NUTRITION" => Some(AgentRoute::Nutrition),
            "GENERAL" => Some(AgentRoute::General),
            _ => None,
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            AgentRoute::Diabetes => "Routing to Diabetes Management...",
            AgentRoute::Fitness => "Routing to Fitness Coach...",
            AgentRoute::Nutrition => "Routing to Nutrition Guide...",
            AgentRoute::General => "General response...",
        }
    }
}

impl std::fmt::Display for AgentRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn routing_prompt(message: &str) -> String {
    format!(
        r#"You are a Router Agent for a Personal Health Management AI Assistant.

Your job is to analyze the user's message and route it to the appropriate specialized agent:

1. **DIABETES_AGENT**: For blood glucose tracking, insulin management, diabetes-related questions
   - Keywords: glucose, blood sugar, diabetes, insulin, A1C, readings, levels
2. **FITNESS_AGENT**: For exercise tracking, workout planning, physical activity
   - Keywords: exercise, workout, run, walk, gym, cardio, strength, training, activity
3. **NUTRITION_AGENT**: For meal tracking, diet planning, nutritional advice
   - Keywords: food, meal, eat, breakfast, lunch, dinner, calories, carbs, protein, diet, nutrition
4. **GENERAL**: For greetings, general questions, or unclear requests

Respond with ONLY ONE of these: DIABETES_AGENT, FITNESS_AGENT, NUTRITION_AGENT, or GENERAL

User message: {message}

Your response (one word only):"#
    )
}

pub struct RouterAgent {
    llm: LLM,
}

impl RouterAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub async fn route(&self, message: &str) -> AgentRoute {
        match self
            .llm
            .complete(SYSTEM_PROMPT, &routing_prompt(message), TEMPERATURE)
            .await
        {
            Ok(label) => match AgentRoute::parse(&label) {
                Some(route) => {
                    debug!(%route, "Message routed");
                    route
                }
                None => {
                    warn!(label = %label, "Unrecognized route label, using GENERAL");
                    AgentRoute::General
                }
            },
            Err(e) => {
                warn!(error = %e, "Routing failed, using GENERAL");
                AgentRoute::General
            }
        }
    }
}
