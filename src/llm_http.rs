use async_trait::async_trait;
use insight_engine::config::LlmConfig;
use insight_engine::llm::{CompletionOptions, LanguageModelClient, LlmError};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct HttpLanguageModelClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl HttpLanguageModelClient {
    /// `None` when `LLM_API_KEY` is unset or blank.
    pub fn from_env(config: &LlmConfig) -> Option<Self> {
        let api_key = env::var("LLM_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())?;
        Some(Self {
            client: reqwest::Client::new(),
            api_key,
            api_base: config.api_base.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModelClient for HttpLanguageModelClient {
    async fn complete(
        &self,
        prompt: &str,
        purpose: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt(purpose),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };
        debug!(purpose, model = %self.model, "sending completion request");

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .timeout(options.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout(options.timeout)
                } else {
                    LlmError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                detail: error_body.trim().to_string(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Parse(format!("response body: {}", err)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("response missing choices".to_string()))?
            .message
            .content;
        Ok(content.trim().to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

fn system_prompt(purpose: &str) -> String {
    format!(
        "You are an analyst of online discussion communities. Task: {}.\n\
         Rules:\n\
         - Output a single JSON object only, no markdown or commentary.\n\
         - Use decimals with a leading 0 (e.g., 0.42).",
        purpose
    )
}
