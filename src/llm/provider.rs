use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::LLMConfig;
use crate::llm::openai::OpenAIAdapter;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, LLMResponse};
use crate::utils::retry::with_retry;

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Stand-in used when no API key is configured. Every call fails, so agents
/// answer with their degraded text while logging keeps working.
struct UnconfiguredAdapter {
    provider: String,
}

#[async_trait]
impl LLMAdapter for UnconfiguredAdapter {
    async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
        Err(AppError::LLMApi(format!(
            "no API key configured for provider '{}'",
            self.provider
        )))
    }
}

/// Completion service handle bound to one model. Cheap to clone.
#[derive(Clone)]
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    model: String,
    max_tokens: Option<u32>,
    max_retries: u32,
    retry_delay: Duration,
}

impl LLM {
    pub fn new(adapter: Arc<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            model: model.into(),
            max_tokens: Some(1000),
            max_retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Same adapter, different model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn from_config(config: &LLMConfig, model: &str) -> AppResult<Self> {
        let provider = config.provider();
        let adapter: Arc<dyn LLMAdapter> = match config.active_api_key() {
            Some(key) => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| provider.base_url().to_string());
                Arc::new(OpenAIAdapter::new(
                    &key,
                    &base_url,
                    Duration::from_secs(config.timeout_secs),
                )?)
            }
            None => {
                warn!(%provider, "No API key configured; narrative responses are disabled");
                Arc::new(UnconfiguredAdapter {
                    provider: provider.to_string(),
                })
            }
        };

        Ok(Self::new(adapter, model).with_retries(config.max_retries, Duration::from_millis(500)))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        with_retry(
            || self.adapter.create_chat_completion(request),
            self.max_retries,
            self.retry_delay,
        )
        .await
    }

    /// One system instruction plus one user prompt, returning the generated text
    pub async fn complete(&self, system: &str, prompt: &str, temperature: f32) -> AppResult<String> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: Some(temperature),
            system_instruction: Some(system.to_string()),
        };

        let response = self.create_chat_completion(&request).await?;
        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedAdapter;

    #[tokio::test]
    async fn test_complete_builds_request() {
        let adapter = Arc::new(ScriptedAdapter::reply("  Looks good.  "));
        let llm = LLM::new(adapter.clone(), "gpt-4o-mini");

        let text = llm.complete("system text", "user text", 0.5).await.unwrap();
        assert_eq!(text, "Looks good.");

        let requests = adapter.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].system_instruction.as_deref(), Some("system text"));
        assert_eq!(requests[0].messages, vec![LLMMessage::user("user text")]);
        assert_eq!(requests[0].temperature, Some(0.5));
    }

    #[tokio::test]
    async fn test_complete_retries_transient_failures() {
        let adapter = Arc::new(ScriptedAdapter::sequence(vec![
            Err("timeout".to_string()),
            Ok("recovered".to_string()),
        ]));
        let llm = LLM::new(adapter.clone(), "m").with_retries(2, Duration::ZERO);

        assert_eq!(llm.complete("s", "p", 0.3).await.unwrap(), "recovered");
        assert_eq!(adapter.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_always_fails() {
        let config = LLMConfig {
            provider: "groq".to_string(),
            openai_api_key: String::new(),
            openrouter_api_key: String::new(),
            groq_api_key: String::new(),
            base_url: None,
            router_model: "r".to_string(),
            agent_model: "a".to_string(),
            coordinator_model: "c".to_string(),
            timeout_secs: 5,
            max_retries: 0,
        };
        let llm = LLM::from_config(&config, "a").unwrap();
        let err = llm.complete("s", "p", 0.7).await.unwrap_err();
        assert!(err.to_string().contains("groq"));
    }

    #[test]
    fn test_with_model_keeps_adapter() {
        let adapter = Arc::new(ScriptedAdapter::reply("x"));
        let llm = LLM::new(adapter, "gpt-4o-mini");
        assert_eq!(llm.with_model("gpt-4o").model(), "gpt-4o");
        assert_eq!(llm.model(), "gpt-4o-mini");
    }
}
