use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Passage, ReferenceRetriever};
use crate::types::{AppError, AppResult};

/// One loaded guideline document
#[derive(Debug, Clone)]
struct Document {
    id: String,
    text: String,
    source: String,
    terms: HashSet<String>,
}

/// In-memory guideline corpus.
///
/// Layout on disk is one sub-directory per category holding `.txt` files:
///
/// ```text
/// knowledge/
///   ada_guidelines/targets.txt
///   glycemic_index/grains.txt
///   exercise_safety/hypoglycemia.txt
/// ```
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<Document>,
}

/// Provenance label for a category directory
pub fn source_label(category: &str) -> &'static str {
    match category {
        "ada_guidelines" => "ADA Guidelines 2024",
        "glycemic_index" => "Glycemic Index Database",
        "exercise_safety" => "Exercise Safety Guidelines",
        _ => "Medical Database",
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, id: impl Into<String>, text: impl Into<String>, source: impl Into<String>) {
        let text = text.into();
        self.documents.push(Document {
            id: id.into(),
            terms: terms(&text),
            text,
            source: source.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Load every `<category>/<name>.txt` below `dir`
    pub fn load_dir(dir: &Path) -> AppResult<Self> {
        let mut kb = Self::new();

        let categories = std::fs::read_dir(dir).map_err(|e| {
            AppError::Retrieval(format!("cannot read knowledge dir {}: {}", dir.display(), e))
        })?;

        for category in categories {
            let category = category.map_err(|e| AppError::Retrieval(e.to_string()))?;
            let path = category.path();
            if !path.is_dir() {
                continue;
            }
            let name = category.file_name().to_string_lossy().to_string();
            let source = source_label(&name);

            let mut files: Vec<_> = std::fs::read_dir(&path)
                .map_err(|e| AppError::Retrieval(e.to_string()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
                .collect();
            files.sort();

            for file in files {
                match std::fs::read_to_string(&file) {
                    Ok(text) => {
                        let stem = file
                            .file_stem()
                            .map(|s| s.to_string_lossy().to_string())
                            .unwrap_or_default();
                        debug!(category = %name, file = %file.display(), "Loaded knowledge document");
                        kb.add_document(format!("{}_{}", name, stem), text, source);
                    }
                    Err(e) => warn!(file = %file.display(), error = %e, "Skipping unreadable document"),
                }
            }
        }

        info!(documents = kb.len(), dir = %dir.display(), "Knowledge base loaded");
        Ok(kb)
    }

    fn rank(&self, query: &str, k: usize) -> Vec<Passage> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, &Document)> = self
            .documents
            .iter()
            .map(|doc| (doc.terms.intersection(&query_terms).count(), doc))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable on id so equal scores come back in a fixed order
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));

        scored
            .into_iter()
            .take(k)
            .map(|(_, doc)| Passage {
                text: doc.text.clone(),
                source: doc.source.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ReferenceRetriever for KnowledgeBase {
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        Ok(self.rank(query, k))
    }
}
