use serde::{Deserialize, Serialize};

use crate::config::{CohortConfig, ThresholdConfig};
use crate::features::extract_features;
use crate::patterns::{bottom_cohort, sample_factor, PatternFinding, PatternType};
use crate::stats::correlation;
use crate::{round_to, ContentRecord};

const GENERIC_TITLES: [&str; 9] = [
    "help",
    "help!",
    "need help",
    "question",
    "quick question",
    "advice",
    "thoughts",
    "thoughts?",
    "update",
];

const REJECTION_RULES: [(&str, &[&str]); 3] = [
    (
        "spam",
        &[
            "buy now",
            "discount",
            "promo code",
            "click here",
            "free money",
            "limited offer",
            "dm me for",
        ],
    ),
    (
        "self_promotion",
        &[
            "my channel",
            "subscribe",
            "check out my",
            "my blog",
            "follow me",
            "my website",
            "patreon",
        ],
    ),
    (
        "rule_violation",
        &[
            "[removed]",
            "[deleted]",
            "against the rules",
            "rule violation",
            "banned",
            "nsfw",
        ],
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonMistake {
    pub mistake: String,
    pub description: String,
    pub occurrences: usize,
    pub frequency: f64,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionTrigger {
    pub trigger: String,
    pub matched_keywords: Vec<String>,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownvotePattern {
    pub marker: String,
    /// Share of the low-performing cohort carrying the marker.
    pub cohort_rate: f64,
    pub overall_rate: f64,
    /// Correlation between the marker and engagement across all records.
    pub correlation: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub patterns: Vec<PatternFinding>,
    pub common_mistakes: Vec<CommonMistake>,
    pub rejection_triggers: Vec<RejectionTrigger>,
    pub downvote_patterns: Vec<DownvotePattern>,
    pub cohort_size: usize,
}

pub fn analyze_failure_patterns(records: &[ContentRecord]) -> FailureAnalysis {
    analyze_failure_patterns_with_config(
        records,
        &CohortConfig::default(),
        &ThresholdConfig::default(),
    )
}

pub fn analyze_failure_patterns_with_config(
    records: &[ContentRecord],
    cohorts: &CohortConfig,
    thresholds: &ThresholdConfig,
) -> FailureAnalysis {
    if records.is_empty() {
        return FailureAnalysis::default();
    }

    let cohort = bottom_cohort(records, cohorts.bottom_fraction);
    let common_mistakes = identify_common_mistakes(&cohort, thresholds);
    let rejection_triggers = identify_rejection_triggers(&cohort);
    let downvote_patterns = downvote_patterns(records, &cohort, thresholds);

    let support = sample_factor(cohort.len());
    let mut patterns: Vec<PatternFinding> = common_mistakes
        .iter()
        .map(|mistake| PatternFinding {
            pattern_type: PatternType::Failure,
            description: mistake.description.clone(),
            evidence: mistake.examples.clone(),
            confidence: round_to(support * (0.4 + 0.6 * mistake.frequency), 3),
        })
        .collect();
    patterns.extend(rejection_triggers.iter().map(|trigger| PatternFinding {
        pattern_type: PatternType::Failure,
        description: format!(
            "{} signals found in {} low-performing posts",
            trigger.trigger.replace('_', " "),
            trigger.occurrences
        ),
        evidence: trigger.matched_keywords.clone(),
        confidence: round_to(
            support * (0.5 + 0.5 * trigger.occurrences as f64 / cohort.len() as f64),
            3,
        ),
    }));

    FailureAnalysis {
        patterns,
        common_mistakes,
        rejection_triggers,
        downvote_patterns,
        cohort_size: cohort.len(),
    }
}

pub fn identify_common_mistakes(
    cohort: &[&ContentRecord],
    thresholds: &ThresholdConfig,
) -> Vec<CommonMistake> {
    if cohort.is_empty() {
        return Vec::new();
    }

    let checks: [(&str, String, fn(&ContentRecord, &ThresholdConfig) -> bool); 3] = [
        (
            "overly_brief",
            format!(
                "Overly brief content: title and body together stay under {} characters",
                thresholds.min_content_length
            ),
            |record, thresholds| record.content_length() < thresholds.min_content_length,
        ),
        (
            "vague_title",
            "Vague titles that do not say what the post is about".to_string(),
            |record, thresholds| is_vague_title(&record.title, thresholds),
        ),
        (
            "no_context",
            "No context: the post has no body to explain the title".to_string(),
            |record, _| record.body.trim().is_empty(),
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(mistake, description, check)| {
            let hits: Vec<&ContentRecord> = cohort
                .iter()
                .copied()
                .filter(|record| check(*record, thresholds))
                .collect();
            if hits.is_empty() {
                return None;
            }
            Some(CommonMistake {
                mistake: mistake.to_string(),
                description,
                occurrences: hits.len(),
                frequency: round_to(hits.len() as f64 / cohort.len() as f64, 3),
                examples: hits.iter().take(3).map(|record| record.id.clone()).collect(),
            })
        })
        .collect()
}

pub fn identify_rejection_triggers(cohort: &[&ContentRecord]) -> Vec<RejectionTrigger> {
    let texts: Vec<String> = cohort
        .iter()
        .map(|record| record.full_text().to_lowercase())
        .collect();

    REJECTION_RULES
        .iter()
        .filter_map(|(trigger, keywords)| {
            let matched_keywords: Vec<String> = keywords
                .iter()
                .filter(|keyword| texts.iter().any(|text| text.contains(*keyword)))
                .map(|keyword| keyword.to_string())
                .collect();
            let occurrences = texts
                .iter()
                .filter(|text| keywords.iter().any(|keyword| text.contains(keyword)))
                .count();
            if occurrences == 0 {
                return None;
            }
            Some(RejectionTrigger {
                trigger: trigger.to_string(),
                matched_keywords,
                occurrences,
            })
        })
        .collect()
}

fn downvote_patterns(
    records: &[ContentRecord],
    cohort: &[&ContentRecord],
    thresholds: &ThresholdConfig,
) -> Vec<DownvotePattern> {
    let markers: [(&str, fn(&ContentRecord, &ThresholdConfig) -> bool); 5] = [
        ("all_caps_title", |record, _| shouting(&record.title)),
        ("excessive_punctuation", |record, _| {
            let text = record.full_text();
            text.contains("!!") || text.contains("??")
        }),
        ("links", |record, _| extract_features(record).has_links),
        ("negative_tone", |record, _| record.sentiment_score < -0.3),
        ("very_short", |record, thresholds| {
            record.content_length() < thresholds.min_content_length
        }),
    ];
    let engagement: Vec<i64> = records.iter().map(|r| r.engagement_score).collect();

    let mut patterns: Vec<DownvotePattern> = markers
        .iter()
        .filter_map(|(marker, check)| {
            let flags: Vec<bool> = records.iter().map(|r| check(r, thresholds)).collect();
            let cohort_hits = cohort.iter().filter(|r| check(**r, thresholds)).count();
            if cohort_hits == 0 {
                return None;
            }
            let cohort_rate = cohort_hits as f64 / cohort.len() as f64;
            let overall_rate =
                flags.iter().filter(|flag| **flag).count() as f64 / records.len() as f64;
            let coefficient = correlation(&flags, &engagement);
            if coefficient >= 0.0 && cohort_rate <= overall_rate {
                return None;
            }
            Some(DownvotePattern {
                marker: marker.to_string(),
                cohort_rate: round_to(cohort_rate, 3),
                overall_rate: round_to(overall_rate, 3),
                correlation: round_to(coefficient, 3),
            })
        })
        .collect();
    patterns.sort_by(|a, b| a.correlation.total_cmp(&b.correlation));
    patterns
}

fn is_vague_title(title: &str, thresholds: &ThresholdConfig) -> bool {
    let normalized = title.trim().to_lowercase();
    normalized.split_whitespace().count() < thresholds.vague_title_words
        || GENERIC_TITLES.contains(&normalized.as_str())
}

fn shouting(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if letters.len() < 5 {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_ascii_uppercase()).count();
    upper as f64 / letters.len() as f64 > 0.6
}
