pub mod config;
pub mod engine;
pub mod features;
pub mod llm;
pub mod model;
pub mod patterns;
pub mod questions;
pub mod recommendations;
pub mod stats;
pub mod synthesis;
pub mod synthetic;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use engine::{
    analyze_success_failure, AnalysisReport, AnalysisRequest, InsightEngine, SuccessFailureReport,
};
pub use features::{extract_features, ContentFeatures};
pub use stats::{correlation, Correlation};
pub use synthesis::{generate_layered_insights, LayeredInsights, SynthesisInput};

/// One sentiment-scored discussion item. Read-only input to every analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "selftext", alias = "content")]
    pub body: String,
    #[serde(alias = "score")]
    pub engagement_score: i64,
    #[serde(default, alias = "num_comments")]
    pub comment_count: u32,
    #[serde(default, alias = "sentiment")]
    pub sentiment_score: f64,
    #[serde(default, alias = "subreddit")]
    pub community: String,
    #[serde(default, alias = "created_utc")]
    pub created_at: i64,
}

impl ContentRecord {
    /// Combined character count of title and body.
    pub fn content_length(&self) -> usize {
        self.title.chars().count() + self.body.chars().count()
    }

    pub fn full_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.body)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityType {
    Dating,
    Product,
    Hobby,
    Support,
    News,
    General,
}

impl CommunityType {
    pub const ALL: [CommunityType; 6] = [
        CommunityType::Dating,
        CommunityType::Product,
        CommunityType::Hobby,
        CommunityType::Support,
        CommunityType::News,
        CommunityType::General,
    ];

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "dating" | "relationships" | "identity" => Some(CommunityType::Dating),
            "product" | "products" | "tech" => Some(CommunityType::Product),
            "hobby" | "hobbies" | "skill" => Some(CommunityType::Hobby),
            "support" | "help" => Some(CommunityType::Support),
            "news" => Some(CommunityType::News),
            "general" => Some(CommunityType::General),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CommunityType::Dating => "dating",
            CommunityType::Product => "product",
            CommunityType::Hobby => "hobby",
            CommunityType::Support => "support",
            CommunityType::News => "news",
            CommunityType::General => "general",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            CommunityType::Dating => "Dating",
            CommunityType::Product => "Product",
            CommunityType::Hobby => "Hobby",
            CommunityType::Support => "Support",
            CommunityType::News => "News",
            CommunityType::General => "General",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityProfile {
    pub primary_type: CommunityType,
    #[serde(default)]
    pub secondary_types: BTreeSet<CommunityType>,
    pub confidence: f64,
}

impl CommunityProfile {
    pub fn new(primary_type: CommunityType, confidence: f64) -> Self {
        Self {
            primary_type,
            secondary_types: BTreeSet::new(),
            confidence: clamp01(confidence),
        }
    }

    pub fn with_secondary(mut self, secondary: impl IntoIterator<Item = CommunityType>) -> Self {
        self.secondary_types.extend(
            secondary
                .into_iter()
                .filter(|kind| *kind != self.primary_type),
        );
        self
    }
}

impl Default for CommunityProfile {
    fn default() -> Self {
        Self::new(CommunityType::General, 0.5)
    }
}

/// Language-level findings produced upstream of this engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticAnalysis {
    #[serde(default)]
    pub jargon: Vec<String>,
    #[serde(default)]
    pub vulnerability_markers: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Stable `analysis_<hex>` id derived from the record ids.
pub fn derive_analysis_id(records: &[ContentRecord]) -> String {
    let payload = records
        .iter()
        .map(|record| record.id.as_str())
        .collect::<Vec<_>>()
        .join(":");
    format!("analysis_{:x}", stable_hash64(&payload))
}

fn stable_hash64(value: &str) -> u64 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

pub(crate) fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.max(0.0).min(1.0)
}

pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unexpected panic".to_string()
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
