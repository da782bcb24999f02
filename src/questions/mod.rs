pub mod answering;
pub mod generation;
pub mod scoring;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use answering::{
    extract_relevant_data_for_question, generate_question_answers, PostDigest, QuestionContext,
};
pub use generation::{
    build_question_prompt, extract_questions_from_response, generate_dynamic_questions,
    generate_fallback_questions_by_type,
};
pub use scoring::{
    score_questions, score_questions_with_weights, SurpriseSignals, MAX_SCORED_QUESTIONS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    Demographic,
    Behavioral,
    Temporal,
    Cultural,
    General,
}

impl QuestionCategory {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "demographic" | "demographics" => Some(QuestionCategory::Demographic),
            "behavioral" | "behavioural" | "behavior" => Some(QuestionCategory::Behavioral),
            "temporal" | "timing" | "time" => Some(QuestionCategory::Temporal),
            "cultural" | "culture" => Some(QuestionCategory::Cultural),
            "general" => Some(QuestionCategory::General),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionCategory::Demographic => "demographic",
            QuestionCategory::Behavioral => "behavioral",
            QuestionCategory::Temporal => "temporal",
            QuestionCategory::Cultural => "cultural",
            QuestionCategory::General => "general",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            QuestionCategory::Demographic => "Demographic",
            QuestionCategory::Behavioral => "Behavioral",
            QuestionCategory::Temporal => "Temporal",
            QuestionCategory::Cultural => "Cultural",
            QuestionCategory::General => "General",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateQuestion {
    pub id: String,
    pub text: String,
    pub category: QuestionCategory,
    pub data_requirements: BTreeSet<String>,
    pub expected_insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_surprise_hint: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredQuestion {
    #[serde(flatten)]
    pub question: CandidateQuestion,
    pub surprise_factor: f64,
    pub data_availability: f64,
    pub actionability: f64,
    pub composite_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    #[serde(flatten)]
    pub scored: ScoredQuestion,
    pub summary: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
    pub insights: Vec<String>,
}

/// Ordered keyword rules for [`infer_question_category`]. The first category
/// with a matching keyword wins. A trailing `*` matches any word with that
/// prefix; a keyword containing a space matches as a phrase.
pub const CATEGORY_RULES: [(QuestionCategory, &[&str]); 4] = [
    (
        QuestionCategory::Temporal,
        &[
            "time", "times", "timing", "when", "hour*", "daily", "week*", "month*", "season*",
            "morning*", "evening*", "night*",
        ],
    ),
    (
        QuestionCategory::Demographic,
        &[
            "who", "whom", "demographic*", "user type", "type of user", "kind of user",
            "newcomer*", "veteran*", "age", "gender",
        ],
    ),
    (
        QuestionCategory::Behavioral,
        &[
            "behav*", "engag*", "drive", "drives", "driving", "driver*", "motivat*",
            "interact*", "participat*", "react*",
        ],
    ),
    (
        QuestionCategory::Cultural,
        &[
            "cultur*", "value", "values", "norm", "norms", "tradition*", "etiquette",
            "belief*", "identity",
        ],
    ),
];

/// Classify free question text with [`CATEGORY_RULES`]; `General` when nothing matches.
pub fn infer_question_category(text: &str) -> QuestionCategory {
    let normalized = normalize_words(text);
    let padded = format!(" {} ", normalized);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| keyword_matches(keyword, &padded, &words))
        })
        .map(|(category, _)| *category)
        .unwrap_or(QuestionCategory::General)
}

pub fn default_requirements(category: QuestionCategory) -> BTreeSet<String> {
    let tags: &[&str] = match category {
        QuestionCategory::Demographic => &["communities", "comments"],
        QuestionCategory::Behavioral => &["posts", "comments", "engagement"],
        QuestionCategory::Temporal => &["timestamps", "engagement"],
        QuestionCategory::Cultural => &["posts", "sentiment"],
        QuestionCategory::General => &["posts"],
    };
    tags.iter().map(|tag| tag.to_string()).collect()
}

pub fn default_expected_insights(category: QuestionCategory) -> Vec<String> {
    let insight = match category {
        QuestionCategory::Demographic => "Which member segments drive the conversation",
        QuestionCategory::Behavioral => "What behaviors separate high and low engagement",
        QuestionCategory::Temporal => "When content gains the most traction",
        QuestionCategory::Cultural => "Which shared values and norms shape reception",
        QuestionCategory::General => "What the community rewards overall",
    };
    vec![insight.to_string()]
}

pub(crate) fn normalize_words(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn keyword_matches(keyword: &str, padded: &str, words: &[&str]) -> bool {
    if keyword.contains(' ') {
        return padded.contains(&format!(" {} ", keyword));
    }
    match keyword.strip_suffix('*') {
        Some(stem) => words.iter().any(|word| word.starts_with(stem)),
        None => words.iter().any(|word| *word == keyword),
    }
}
