use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub knowledge: KnowledgeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL. When unset the process keeps its logs in memory.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub openai_api_key: String,
    pub openrouter_api_key: String,
    pub groq_api_key: String,
    pub base_url: Option<String>,
    pub router_model: String,
    pub agent_model: String,
    pub coordinator_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    pub dir: Option<PathBuf>,
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
}

impl LLMConfig {
    pub fn provider(&self) -> LLMProvider {
        LLMProvider::from_name(&self.provider).unwrap_or(LLMProvider::OpenAI)
    }

    /// API key of the configured provider, if one is set
    pub fn active_api_key(&self) -> Option<String> {
        let key = match self.provider() {
            LLMProvider::OpenAI => &self.openai_api_key,
            LLMProvider::OpenRouter => &self.openrouter_api_key,
            LLMProvider::Groq => &self.groq_api_key,
        };
        if key.trim().is_empty() {
            None
        } else {
            Some(key.clone())
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty()),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            llm: LLMConfig {
                provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                openrouter_api_key: env::var("OPENROUTER_API_KEY").unwrap_or_default(),
                groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
                base_url: env::var("LLM_BASE_URL").ok().filter(|u| !u.trim().is_empty()),
                router_model: env::var("ROUTER_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
                agent_model: env::var("AGENT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                coordinator_model: env::var("COORDINATOR_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
                timeout_secs: env::var("LLM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
                max_retries: env::var("LLM_MAX_RETRIES")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()?,
            },
            knowledge: KnowledgeConfig {
                dir: env::var("KNOWLEDGE_DIR").ok().map(PathBuf::from),
                top_k: env::var("KNOWLEDGE_TOP_K")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            logging: LoggingConfig {
                dir: env::var("LOG_DIR").ok().map(PathBuf::from),
            },
        })
    }
}
