//! Reference Retrieval
//!
//! Optional grounding for narrative answers. Agents hold an
//! `Option<Arc<dyn ReferenceRetriever>>` and skip retrieval entirely when it is absent.
//!
//! The bundled implementation is [`KnowledgeBase`], a directory of plain-text
//! guideline documents ranked by term overlap with the query.

pub mod knowledge;

pub use knowledge::KnowledgeBase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::AppResult;

/// Longest excerpt of a passage placed into a prompt
pub const PASSAGE_EXCERPT_CHARS: usize = 500;

/// A reference passage with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
}

#[async_trait]
pub trait ReferenceRetriever: Send + Sync {
    /// Up to `k` passages, best match first. May be empty.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>>;
}

/// Render passages as a numbered prompt section. Returns `None` for no passages.
pub fn render_context(passages: &[Passage]) -> Option<String> {
    if passages.is_empty() {
        return None;
    }

    let mut context = String::from("**Medical Guidelines:**\n\n");
    for (i, passage) in passages.iter().enumerate() {
        let excerpt: String = passage.text.chars().take(PASSAGE_EXCERPT_CHARS).collect();
        let ellipsis = if passage.text.chars().count() > PASSAGE_EXCERPT_CHARS {
            "..."
        } else {
            ""
        };
        context.push_str(&format!("{}. [{}]\n{}{}\n\n", i + 1, passage.source, excerpt, ellipsis));
    }
    Some(context)
}
