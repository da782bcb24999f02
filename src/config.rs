use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    pub top_fraction: f64,
    pub bottom_fraction: f64,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            top_fraction: 0.25,
            bottom_fraction: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub min_content_length: usize,
    pub vague_title_words: usize,
    pub comparative_min_records: usize,
    pub trend_min_records: usize,
    pub recommendation_confidence: f64,
    pub surprising_correlation: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_content_length: 50,
            vague_title_words: 4,
            comparative_min_records: 10,
            trend_min_records: 4,
            recommendation_confidence: 0.3,
            surprising_correlation: 0.3,
        }
    }
}

/// Weights for ranking candidate questions.
///
/// `composite = (surprise * s + data_availability * d + actionability * a) / (s + d + a)`
/// and the surprise signal itself is
/// `model_hint_weight * hint + (1 - model_hint_weight) * lexical` when the
/// model supplied a hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionWeights {
    pub surprise: f64,
    pub data_availability: f64,
    pub actionability: f64,
    pub model_hint_weight: f64,
}

impl Default for QuestionWeights {
    fn default() -> Self {
        Self {
            surprise: 0.4,
            data_availability: 0.3,
            actionability: 0.3,
            model_hint_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub model: String,
    pub timeout_ms: u64,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 20_000,
            temperature: 0.7,
            max_tokens: 1200,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cohorts: CohortConfig,
    pub thresholds: ThresholdConfig,
    pub scoring: QuestionWeights,
    pub llm: LlmConfig,
}

impl EngineConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                toml::from_str(&contents)
                    .map_err(|err| format!("failed to parse config: {}", err))?
            } else {
                EngineConfig::default()
            }
        } else {
            EngineConfig::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create config dir: {}", err))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| format!("failed to serialize config: {}", err))?;
        std::fs::write(path, payload).map_err(|err| format!("failed to write config: {}", err))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            if !api_base.trim().is_empty() {
                self.llm.api_base = api_base;
            }
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            if !model.trim().is_empty() {
                self.llm.model = model;
            }
        }
        if let Ok(timeout) = env::var("LLM_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.llm.timeout_ms = value;
            }
        }
        if let Ok(fraction) = env::var("INSIGHT_TOP_FRACTION") {
            if let Ok(value) = fraction.parse::<f64>() {
                self.cohorts.top_fraction = value.clamp(0.01, 1.0);
            }
        }
        if let Ok(min_records) = env::var("INSIGHT_COMPARATIVE_MIN_RECORDS") {
            if let Ok(value) = min_records.parse::<usize>() {
                self.thresholds.comparative_min_records = value.max(2);
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("INSIGHT_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/insight.toml")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str("[scoring]\nsurprise = 0.6\n").unwrap();
        assert!((config.scoring.surprise - 0.6).abs() < 1e-9);
        assert!((config.scoring.actionability - 0.3).abs() < 1e-9);
        assert_eq!(config.thresholds.comparative_min_records, 10);
    }
}
