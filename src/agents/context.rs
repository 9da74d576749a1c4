//! Collaborators shared by the domain agents.
//!
//! Every agent receives its store, completion service and optional retriever at
//! construction. Failures from those collaborators are turned into text here so
//! that agents never hand an error back to the chat surface.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::agents::classifiers::validate_record;
use crate::db::LogStore;
use crate::llm::LLM;
use crate::models::HealthRecord;
use crate::search::{render_context, ReferenceRetriever};
use crate::types::AppResult;

/// Records pulled into a narrative prompt
pub const RECENT_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AgentContext {
    pub store: Arc<dyn LogStore>,
    pub llm: LLM,
    pub retriever: Option<Arc<dyn ReferenceRetriever>>,
    pub top_k: usize,
}

impl AgentContext {
    pub fn new(store: Arc<dyn LogStore>, llm: LLM) -> Self {
        Self {
            store,
            llm,
            retriever: None,
            top_k: 1,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ReferenceRetriever>, top_k: usize) -> Self {
        self.retriever = Some(retriever);
        self.top_k = top_k.max(1);
        self
    }

    /// Rendered reference passages for `query`. Absence or failure of the
    /// retriever yields `None`.
    pub async fn references(&self, query: &str) -> Option<String> {
        let retriever = self.retriever.as_ref()?;
        match retriever.search(query, self.top_k).await {
            Ok(passages) => {
                debug!(count = passages.len(), "Retrieved reference passages");
                render_context(&passages)
            }
            Err(e) => {
                warn!(error = %e, "Reference retrieval failed, continuing without it");
                None
            }
        }
    }

    /// Ask the completion service; a failure becomes the standard apology.
    pub async fn narrate(&self, system: &str, prompt: &str, temperature: f32) -> String {
        match self.llm.complete(system, prompt, temperature).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, model = self.llm.model(), "Completion failed");
                apology(&e)
            }
        }
    }

    /// Validate and append one record
    pub async fn commit(&self, user_id: Uuid, record: HealthRecord) -> AppResult<i64> {
        validate_record(&record)?;
        let kind = record.kind();
        let id = self.store.append(user_id, record).await?;
        debug!(%user_id, kind = kind.as_str(), id, "Committed record");
        Ok(id)
    }
}

pub fn apology(error: &dyn std::fmt::Display) -> String {
    format!("I'm having trouble processing that right now. Error: {}", error)
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// "Nov 14, 02:30 PM"
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format("%b %d, %I:%M %p").to_string()
}

/// "strength training" -> "Strength Training"
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
