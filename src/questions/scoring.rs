use std::collections::BTreeSet;

use crate::config::QuestionWeights;
use crate::questions::{normalize_words, CandidateQuestion, ScoredQuestion};
use crate::{clamp01, round_to, ContentRecord};

/// Upper bound on any scored question list.
pub const MAX_SCORED_QUESTIONS: usize = 8;

/// Neutral availability for questions that declare no requirements.
const UNDECLARED_AVAILABILITY: f64 = 0.5;

const SURPRISE_MARKERS: [&str; 14] = [
    "surprising",
    "unexpected",
    "counterintuitive",
    "despite",
    "paradox",
    "hidden",
    "actually",
    "contrary",
    "rather than",
    "instead of",
    "versus",
    "outperform",
    "underrated",
    "why",
];

const ACTION_MARKERS: [&str; 18] = [
    "should",
    "improve",
    "increase",
    "optimiz",
    "strategy",
    "recommend",
    "best",
    "how",
    "boost",
    "grow",
    "tip",
    "tactic",
    "format",
    "timing",
    "post",
    "create",
    "avoid",
    "reward",
];

/// The two surprise inputs kept apart until [`SurpriseSignals::combine`].
#[derive(Debug, Clone, Copy)]
pub struct SurpriseSignals {
    /// Value supplied by the language model, if any.
    pub model_hint: Option<f64>,
    /// Locally computed from surprise vocabulary.
    pub lexical: f64,
}

impl SurpriseSignals {
    pub fn for_question(question: &CandidateQuestion) -> Self {
        Self {
            model_hint: question.raw_surprise_hint.map(clamp01),
            lexical: lexical_surprise(&question.text),
        }
    }

    pub fn combine(&self, weights: &QuestionWeights) -> f64 {
        match self.model_hint {
            Some(hint) => {
                let weight = clamp01(weights.model_hint_weight);
                clamp01(weight * hint + (1.0 - weight) * self.lexical)
            }
            None => clamp01(self.lexical),
        }
    }
}

pub fn score_questions(
    questions: &[CandidateQuestion],
    records: &[ContentRecord],
) -> Vec<ScoredQuestion> {
    score_questions_with_weights(questions, records, &QuestionWeights::default())
}

/// Rank questions by composite score, best first, keeping at most
/// [`MAX_SCORED_QUESTIONS`].
pub fn score_questions_with_weights(
    questions: &[CandidateQuestion],
    records: &[ContentRecord],
    weights: &QuestionWeights,
) -> Vec<ScoredQuestion> {
    let mut scored: Vec<ScoredQuestion> = questions
        .iter()
        .map(|question| {
            let surprise_factor = SurpriseSignals::for_question(question).combine(weights);
            let data_availability = data_availability(&question.data_requirements, records);
            let actionability = actionability(question);
            ScoredQuestion {
                question: question.clone(),
                surprise_factor: round_to(surprise_factor, 3),
                data_availability: round_to(data_availability, 3),
                actionability: round_to(actionability, 3),
                composite_score: round_to(
                    composite_score(surprise_factor, data_availability, actionability, weights),
                    4,
                ),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    scored.truncate(MAX_SCORED_QUESTIONS);
    scored
}

/// Normalized weighted sum; equal weights when every weight is zero.
pub fn composite_score(
    surprise: f64,
    availability: f64,
    actionability: f64,
    weights: &QuestionWeights,
) -> f64 {
    let parts = [
        (weights.surprise.max(0.0), surprise),
        (weights.data_availability.max(0.0), availability),
        (weights.actionability.max(0.0), actionability),
    ];
    let total: f64 = parts.iter().map(|(weight, _)| weight).sum();
    if total <= 0.0 {
        return clamp01((surprise + availability + actionability) / 3.0);
    }
    clamp01(parts.iter().map(|(weight, value)| weight * value).sum::<f64>() / total)
}

pub fn lexical_surprise(text: &str) -> f64 {
    let padded = format!(" {} ", normalize_words(text));
    let hits = SURPRISE_MARKERS
        .iter()
        .filter(|marker| padded.contains(&format!(" {}", marker)))
        .count();
    clamp01(0.2 + 0.25 * hits as f64)
}

/// Distinct action-vocabulary stems across text and expected insights, saturating at four.
pub fn actionability(question: &CandidateQuestion) -> f64 {
    let mut corpus = normalize_words(&question.text);
    for insight in &question.expected_insights {
        corpus.push(' ');
        corpus.push_str(&normalize_words(insight));
    }
    let padded = format!(" {}", corpus);
    let hits = ACTION_MARKERS
        .iter()
        .filter(|marker| padded.contains(&format!(" {}", marker)))
        .count();
    clamp01(hits as f64 / 4.0)
}

pub fn data_availability(requirements: &BTreeSet<String>, records: &[ContentRecord]) -> f64 {
    if requirements.is_empty() {
        return UNDECLARED_AVAILABILITY;
    }
    let available = requirements
        .iter()
        .filter(|tag| requirement_available(tag, records))
        .count();
    available as f64 / requirements.len() as f64
}

/// Whether a requirement tag resolves to a non-empty slice of the records.
pub fn requirement_available(tag: &str, records: &[ContentRecord]) -> bool {
    match tag.trim().to_lowercase().as_str() {
        "posts" | "content" | "titles" | "engagement" | "scores" => !records.is_empty(),
        "sentiment" => records.iter().any(|r| r.sentiment_score.is_finite()),
        "comments" | "comment_counts" => records.iter().any(|r| r.comment_count > 0),
        "timestamps" | "timing" | "time" => records.iter().any(|r| r.created_at > 0),
        "communities" | "subreddits" | "community" => {
            records.iter().any(|r| !r.community.trim().is_empty())
        }
        _ => false,
    }
}
