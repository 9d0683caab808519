use anyhow::{anyhow, Context};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    server_config::cfg,
    HttpClient,
};

pub mod email_generation;
pub mod gap_analysis;
pub mod parse;

/// Chat-completion client for the LLM provider.
///
/// Base URL and credentials are captured at construction so tests can point
/// the client at a mock server, and the model id is passed per call instead
/// of being read from mutable global state.
#[derive(Clone)]
pub struct PromptClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
    temperature: f64,
}

impl PromptClient {
    pub fn from_cfg(http_client: HttpClient) -> AppResult<Self> {
        if cfg.provider.api_key.is_empty() {
            return Err(AppError::Configuration(
                "provider.api_key is not set (OUTREACH__PROVIDER__API_KEY)".to_string(),
            ));
        }

        Ok(Self::new(
            http_client,
            cfg.provider.base_url.clone(),
            cfg.provider.api_key.clone(),
            cfg.model.temperature,
        ))
    }

    pub fn new(
        http_client: HttpClient,
        base_url: String,
        api_key: String,
        temperature: f64,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key,
            temperature,
        }
    }

    /// Send one system + user prompt pair and return the raw completion text.
    ///
    /// Quota exhaustion (HTTP 402 or an insufficient-credits error body) maps
    /// to `AppError::AccountExhausted` so callers can abort a whole batch.
    pub async fn send_chat_prompt(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> AppResult<String> {
        let resp = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!(
              {
                "model": model,
                "temperature": self.temperature,
                "messages": [
                  {
                    "role": "system",
                    "content": system_prompt
                  },
                  {
                    "role": "user",
                    "content": user_prompt
                  }
                ]
              }
            ))
            .send()
            .await?;

        if resp.status() == StatusCode::PAYMENT_REQUIRED {
            return Err(AppError::AccountExhausted);
        }

        let resp = resp.json::<serde_json::Value>().await?;

        let parsed = serde_json::from_value::<ChatApiResponseOrError>(resp.clone())
            .context(format!("Could not parse chat response: {}", resp))?;

        match parsed {
            ChatApiResponseOrError::Error(body) => {
                if is_credit_exhaustion(&body.error) {
                    return Err(AppError::AccountExhausted);
                }
                Err(anyhow!("Chat API error: {:?}", body.error).into())
            }
            ChatApiResponseOrError::Response(parsed) => {
                let choice = parsed.choices.first().context("No choices in response")?;
                Ok(choice.message.content.clone())
            }
        }
    }
}

/// Single place that decides whether a provider error means the account is
/// out of credits. Prefers the structured code, falls back to text markers.
fn is_credit_exhaustion(error: &ChatApiError) -> bool {
    if error.code == Some(402) {
        return true;
    }
    error.message.contains("Insufficient credits") || error.message.contains("Error code: 402")
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<PromptUsage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiError {
    pub message: String,
    pub code: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiErrorBody {
    pub error: ChatApiError,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatApiResponseOrError {
    Response(ChatApiResponse),
    Error(ChatApiErrorBody),
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(server: &MockServer) -> PromptClient {
        PromptClient::new(
            HttpClient::new(),
            server.uri(),
            "test-key".to_string(),
            0.4,
        )
    }

    #[tokio::test]
    async fn test_send_chat_prompt_returns_completion_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let content = client
            .send_chat_prompt("test-model", "system", "user")
            .await
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn test_http_402_maps_to_account_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(402))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .send_chat_prompt("test-model", "system", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountExhausted));
    }

    #[tokio::test]
    async fn test_error_body_with_credit_marker_maps_to_account_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"message": "Insufficient credits to complete request", "code": 402}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .send_chat_prompt("test-model", "system", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountExhausted));
    }

    #[tokio::test]
    async fn test_other_error_body_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"message": "Model overloaded"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .send_chat_prompt("test-model", "system", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
