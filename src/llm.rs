use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

/// Purpose tag attached to question-generation calls.
pub const QUESTION_GENERATION: &str = "question-generation";

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

impl CompletionOptions {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model request failed: {0}")]
    Transport(String),
    #[error("language model timed out after {0:?}")]
    Timeout(Duration),
    #[error("language model API error: {status} {detail}")]
    Api { status: u16, detail: String },
    #[error("language model response unusable: {0}")]
    Parse(String),
    #[error("language model not configured")]
    NotConfigured,
}

/// External completion provider. Implementations must be safe to share
/// across concurrent analyses.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        purpose: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}

/// Slice from the first `{` to the last `}`, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_fences_and_prose() {
        let raw = "Sure! ```json\n{\"questions\": []}\n``` hope this helps";
        assert_eq!(extract_json(raw), Some("{\"questions\": []}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn errors_render_readable_messages() {
        assert_eq!(
            LlmError::NotConfigured.to_string(),
            "language model not configured"
        );
        assert_eq!(
            LlmError::Api {
                status: 429,
                detail: "slow down".to_string()
            }
            .to_string(),
            "language model API error: 429 slow down"
        );
    }
}
