use config::{Config, ConfigError};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub bearer_token: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://biz-api.log1.com/api/v1/analyze".to_string(),
            bearer_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub id: String,
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: "x-ai/grok-4-fast".to_string(),
            temperature: 0.4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegenerationConfig {
    /// Candidate models for the regenerate endpoint, picked at random per request.
    pub model_pool: Vec<String>,
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            model_pool: vec![
                "x-ai/grok-4-fast".to_string(),
                "openai/gpt-4o-mini".to_string(),
                "google/gemini-2.0-flash-001".to_string(),
                "meta-llama/llama-3.3-70b-instruct".to_string(),
                "mistralai/mistral-small-3.1".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 5000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "https://localhost:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub upstream: UpstreamConfig,
    pub provider: ProviderConfig,
    pub model: ModelConfig,
    pub regeneration: RegenerationConfig,
    pub server: ServerSettings,
}

impl ServerConfig {
    /// Load config from an optional TOML file, with environment overrides
    /// (e.g. `OUTREACH__PROVIDER__API_KEY`). Missing keys fall back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("OUTREACH_CONFIG").unwrap_or_else(|_| "config/server".to_string());
        let builder = Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("OUTREACH").separator("__"))
            .build()?;

        builder.try_deserialize()
    }
}

lazy_static! {
    pub static ref cfg: ServerConfig =
        ServerConfig::load().expect("Failed to load server configuration");
}
