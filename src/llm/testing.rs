// Scripted completion adapter for tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::provider::{LLMAdapter, LLM};
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

enum Script {
    Always(Result<String, String>),
    Sequence(Mutex<VecDeque<Result<String, String>>>),
}

pub struct ScriptedAdapter {
    script: Script,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedAdapter {
    pub fn reply(text: &str) -> Self {
        Self::with_script(Script::Always(Ok(text.to_string())))
    }

    pub fn fail(message: &str) -> Self {
        Self::with_script(Script::Always(Err(message.to_string())))
    }

    /// Replays `outcomes` in order; once exhausted every call fails.
    pub fn sequence(outcomes: Vec<Result<String, String>>) -> Self {
        Self::with_script(Script::Sequence(Mutex::new(outcomes.into())))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// User prompts seen so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let outcome = match &self.script {
            Script::Always(outcome) => outcome.clone(),
            Script::Sequence(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string())),
        };

        outcome
            .map(|content| LLMResponse {
                content,
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            })
            .map_err(AppError::LLMApi)
    }
}

/// An `LLM` handle over a fresh scripted adapter, plus the adapter for inspection
pub fn scripted_llm(adapter: ScriptedAdapter) -> (LLM, Arc<ScriptedAdapter>) {
    let adapter = Arc::new(adapter);
    (LLM::new(adapter.clone(), "test-model"), adapter)
}
