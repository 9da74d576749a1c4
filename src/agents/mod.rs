//! Agent System
//!
//! The agents that turn a chat message into either a logged record or advice:
//!
//! - **Classifiers**: pull glucose values, meals and exercise sessions out of free text
//! - **Domain agents** (diabetes, fitness, nutrition): log records or answer with context
//! - **Router**: picks a domain agent when nothing could be logged
//! - **Pattern agent**: narrates statistics over a user's history
//! - **Coordinator**: merges several agents for cross-domain questions
//!
//! ## Dispatch Overview
//!
//! ```text
//! User Message
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Classifiers │  → glucose / meal / exercise logged
//! └─────────────┘
//!      │ nothing logged
//!      ▼
//! ┌─────────────┐       ┌─────────────┐
//! │ Coordinator │  or   │   Router    │  → one domain agent
//! │    gate     │       │             │
//! └─────────────┘       └─────────────┘
//!      │
//!      ▼
//!  User Response
//! ```

pub mod classifiers;
pub mod context;
pub mod coordinator;
pub mod diabetes;
pub mod domain;
pub mod fitness;
pub mod nutrition;
pub mod pattern;
pub mod router;

pub use context::AgentContext;
pub use coordinator::{should_coordinate, InsightsCoordinator};
pub use diabetes::{DiabetesAgent, GlucoseBand};
pub use domain::DomainTag;
pub use fitness::FitnessAgent;
pub use nutrition::NutritionAgent;
pub use pattern::PatternAgent;
pub use router::{AgentRoute, RouterAgent};

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::agents::classifiers::{extract_exercise, extract_glucose, extract_meal};
use crate::agents::context::apology;
use crate::config::Config;
use crate::db::LogStore;
use crate::llm::LLM;
use crate::models::RecordKind;
use crate::search::ReferenceRetriever;
use crate::types::AppResult;

/// Readings above this get a follow-up suggestion
const SUGGESTION_THRESHOLD: f64 = 160.0;

const HIGH_READING_SUGGESTION: &str =
    "**Suggestion**: A 15-minute walk can help lower your levels. Would you like some lower-carb meal ideas?";

pub const GENERAL_HELP: &str = "Hi! I can help you track your glucose, meals, and exercise. Try saying:\n\
- 'Log glucose: 120'\n\
- 'I ate chicken salad'\n\
- 'I walked for 30 minutes'";

/// The domain agents plus pattern analysis, sharing one set of collaborators
pub struct Specialists {
    pub diabetes: DiabetesAgent,
    pub fitness: FitnessAgent,
    pub nutrition: NutritionAgent,
    pub pattern: PatternAgent,
}

impl Specialists {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            diabetes: DiabetesAgent::new(ctx.clone()),
            fitness: FitnessAgent::new(ctx.clone()),
            nutrition: NutritionAgent::new(ctx.clone()),
            pattern: PatternAgent::new(ctx),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,
    /// Set when the router picked the handler
    pub route: Option<AgentRoute>,
    pub coordinated: bool,
    pub logged: Vec<RecordKind>,
}

pub struct ChatDispatcher {
    specialists: Arc<Specialists>,
    router: RouterAgent,
    coordinator: InsightsCoordinator,
}

impl ChatDispatcher {
    pub fn new(ctx: AgentContext, router_llm: LLM, coordinator_llm: LLM) -> Self {
        let specialists = Arc::new(Specialists::new(ctx));
        Self {
            coordinator: InsightsCoordinator::new(coordinator_llm, specialists.clone()),
            router: RouterAgent::new(router_llm),
            specialists,
        }
    }

    /// Wire every agent from configuration. Domain agents use the agent model;
    /// the router and coordinator get their own models on the same provider.
    pub fn from_config(
        store: Arc<dyn LogStore>,
        config: &Config,
        retriever: Option<Arc<dyn ReferenceRetriever>>,
    ) -> AppResult<Self> {
        let agent_llm = LLM::from_config(&config.llm, &config.llm.agent_model)?;
        let router_llm = agent_llm.with_model(&config.llm.router_model);
        let coordinator_llm = agent_llm.with_model(&config.llm.coordinator_model);

        let mut ctx = AgentContext::new(store, agent_llm);
        if let Some(retriever) = retriever {
            ctx = ctx.with_retriever(retriever, config.knowledge.top_k);
        }

        Ok(Self::new(ctx, router_llm, coordinator_llm))
    }

    pub fn specialists(&self) -> &Specialists {
        &self.specialists
    }

    pub async fn respond(&self, user_id: Uuid, message: &str) -> ChatReply {
        let mut parts = Vec::new();
        let mut logged = Vec::new();

        if let Some(value) = extract_glucose(message) {
            match self.specialists.diabetes.log_reading(user_id, value).await {
                Ok(ack) => {
                    parts.push(ack);
                    logged.push(RecordKind::Glucose);
                    if value > SUGGESTION_THRESHOLD {
                        parts.push(HIGH_READING_SUGGESTION.to_string());
                    }
                }
                Err(e) => parts.push(apology(&e)),
            }
        }

        if let Some(name) = extract_meal(message) {
            match self.specialists.nutrition.log_meal(user_id, &name, message).await {
                Ok(ack) => {
                    parts.push(ack);
                    logged.push(RecordKind::Meal);
                }
                Err(e) => parts.push(apology(&e)),
            }
        }

        if let Some(input) = extract_exercise(message) {
            match self.specialists.fitness.log_exercise(user_id, input).await {
                Ok(ack) => {
                    parts.push(ack);
                    logged.push(RecordKind::Exercise);
                }
                Err(e) => parts.push(apology(&e)),
            }
        }

        if !parts.is_empty() {
            info!(%user_id, ?logged, "Handled message by logging");
            return ChatReply {
                text: parts.join("\n\n"),
                route: None,
                coordinated: false,
                logged,
            };
        }

        if should_coordinate(message) {
            info!(%user_id, "Coordinating multi-agent answer");
            return ChatReply {
                text: self.coordinator.coordinate(user_id, message).await,
                route: None,
                coordinated: true,
                logged,
            };
        }

        let route = self.router.route(message).await;
        info!(%user_id, %route, "{}", route.explanation());
        let text = match route {
            AgentRoute::Diabetes => self.specialists.diabetes.process(user_id, message).await,
            AgentRoute::Fitness => self.specialists.fitness.process(user_id, message).await,
            AgentRoute::Nutrition => self.specialists.nutrition.process(user_id, message).await,
            AgentRoute::General => GENERAL_HELP.to_string(),
        };

        ChatReply {
            text,
            route: Some(route),
            coordinated: false,
            logged,
        }
    }
}
