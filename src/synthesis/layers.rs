use std::collections::BTreeMap;

use super::{Insight, InsightDetails, SynthesisInput, TrendDirection};
use crate::config::{EngineConfig, ThresholdConfig};
use crate::patterns::{
    analyze_high_performing_content_with_config, sample_factor, HighPerformingAnalysis,
    PatternFinding, PatternType,
};
use crate::recommendations::RecommendationCategory;
use crate::stats::{mean, median, whole_percentages};
use crate::{format_float, round_to, CommunityType, ContentRecord};

const POSITIVE_SENTIMENT: f64 = 0.1;
const NEGATIVE_SENTIMENT: f64 = -0.1;
const RECENT_SHARE: f64 = 0.3;
const TREND_BAND: f64 = 0.1;
const MAX_PATTERN_INSIGHTS: usize = 5;
const MAX_QUESTION_INSIGHTS: usize = 3;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy)]
pub struct EvolutionForecast {
    pub forecast: &'static str,
    pub timeframe: &'static str,
    pub confidence: f64,
}

pub fn behavioral_drivers(kind: CommunityType) -> &'static [&'static str] {
    match kind {
        CommunityType::Dating => &[
            "vulnerability_sharing",
            "validation_seeking",
            "experience_comparison",
        ],
        CommunityType::Product => &["value_assessment", "comparison_shopping", "troubleshooting"],
        CommunityType::Hobby => &["skill_development", "project_showcase", "knowledge_sharing"],
        CommunityType::Support => &["help_seeking", "empathy_expression", "shared_experience"],
        CommunityType::News => &["information_seeking", "opinion_expression", "debate"],
        CommunityType::General => &[
            "information_exchange",
            "entertainment",
            "social_connection",
        ],
    }
}

pub fn evolution_forecast(kind: CommunityType) -> EvolutionForecast {
    let (forecast, timeframe, confidence) = match kind {
        CommunityType::Dating => (
            "Growing emphasis on authenticity and long-form personal stories",
            "6-12 months",
            0.6,
        ),
        CommunityType::Product => (
            "Shift toward long-term ownership reviews and head-to-head comparisons",
            "3-6 months",
            0.7,
        ),
        CommunityType::Hobby => (
            "Deeper specialization with more tutorials and project showcases",
            "6-12 months",
            0.75,
        ),
        CommunityType::Support => (
            "Stronger peer-support norms and curated resource threads",
            "6-12 months",
            0.65,
        ),
        CommunityType::News => (
            "Faster discussion cycles with more scrutiny of sources",
            "1-3 months",
            0.55,
        ),
        CommunityType::General => (
            "Gradual topic drift as membership turns over",
            "6-12 months",
            0.5,
        ),
    };
    EvolutionForecast {
        forecast,
        timeframe,
        confidence,
    }
}

fn growth_plan(kind: CommunityType) -> (&'static [&'static str], &'static str) {
    match kind {
        CommunityType::Dating => (
            &[
                "Invite members to share honest experiences, not just outcomes",
                "Run recurring feedback threads for profiles and first messages",
                "Moderate pile-ons so vulnerable posts stay safe",
            ],
            "More personal stories and a supportive reply culture",
        ),
        CommunityType::Product => (
            &[
                "Pin comparison templates that cover price, durability and support",
                "Encourage long-term follow-up reviews",
                "Separate promotional posts from genuine recommendations",
            ],
            "Higher trust in reviews and more return visitors",
        ),
        CommunityType::Hobby => (
            &[
                "Feature weekly tutorials and beginner questions threads",
                "Celebrate project showcases with progress write-ups",
                "Build a wiki from the best knowledge-sharing posts",
            ],
            "Faster skill growth among members and steady showcase traffic",
        ),
        CommunityType::Support => (
            &[
                "Open every thread type with an empathetic response guide",
                "Maintain a pinned list of vetted resources",
                "Host regular check-in threads for returning members",
            ],
            "More members receive timely, compassionate replies",
        ),
        CommunityType::News => (
            &[
                "Require a source link on every news submission",
                "Collect follow-up coverage in megathreads",
                "Reward analysis posts that separate fact from opinion",
            ],
            "Better-informed discussion with fewer duplicate threads",
        ),
        CommunityType::General => (
            &[
                "Seed discussion prompts on a regular schedule",
                "Highlight top contributors each month",
                "Clarify posting guidelines with examples",
            ],
            "Steadier participation across member groups",
        ),
    }
}

pub(super) fn stage_fallback(stage: &str) -> Insight {
    Insight::new(
        format!("{} Analysis Unavailable", capitalize(stage)),
        format!("The {} stage could not complete; results are partial", stage),
        0.1,
        InsightDetails::StageFallback {
            stage: stage.to_string(),
        },
    )
}

pub(super) fn surface_layer(input: &SynthesisInput<'_>) -> Result<Vec<Insight>, String> {
    let records = input.records;
    if records.is_empty() {
        return Ok(vec![Insight::new(
            "No Data Available",
            "No content records were supplied, so no surface metrics could be computed",
            0.1,
            InsightDetails::NoData {
                reason: "empty record set".to_string(),
            },
        )]);
    }
    if let Some(bad) = records.iter().find(|r| !r.sentiment_score.is_finite()) {
        return Err(format!("record {} has a non-finite sentiment score", bad.id));
    }

    let volume = surface_confidence(records.len());
    let scores: Vec<f64> = records.iter().map(|r| r.engagement_score as f64).collect();
    let average_engagement = mean(&scores);
    let median_engagement = median(&scores);
    let total_comments: u64 = records.iter().map(|r| u64::from(r.comment_count)).sum();

    let overview = Insight::new(
        "Engagement Overview",
        format!(
            "{} posts average {} engagement (median {}) with {} comments in total",
            records.len(),
            format_float(average_engagement, 1),
            format_float(median_engagement, 1),
            total_comments
        ),
        volume,
        InsightDetails::EngagementOverview {
            total_records: records.len(),
            average_engagement: round_to(average_engagement, 3),
            median_engagement: round_to(median_engagement, 3),
            total_comments,
        },
    );

    let mut buckets = [0usize; 3];
    for record in records {
        let slot = if record.sentiment_score > POSITIVE_SENTIMENT {
            0
        } else if record.sentiment_score < NEGATIVE_SENTIMENT {
            2
        } else {
            1
        };
        buckets[slot] += 1;
    }
    let shares = whole_percentages(&buckets);
    let average_sentiment = mean(&records.iter().map(|r| r.sentiment_score).collect::<Vec<_>>());
    let sentiment = Insight::new(
        "Sentiment Distribution",
        format!(
            "{}% positive, {}% neutral, {}% negative (average {})",
            shares[0],
            shares[1],
            shares[2],
            format_float(average_sentiment, 2)
        ),
        volume,
        InsightDetails::SentimentDistribution {
            positive: shares[0],
            neutral: shares[1],
            negative: shares[2],
            average: round_to(average_sentiment, 3),
        },
    );

    let profile = input.profile;
    let secondary: Vec<CommunityType> = profile.secondary_types.iter().copied().collect();
    let classification_text = if secondary.is_empty() {
        format!("Classified as a {} community", profile.primary_type.label())
    } else {
        format!(
            "Classified as a {} community with {} traits",
            profile.primary_type.label(),
            secondary
                .iter()
                .map(|kind| kind.label())
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    let classification = Insight::new(
        "Community Classification",
        classification_text,
        profile.confidence,
        InsightDetails::CommunityClassification {
            primary_type: profile.primary_type,
            secondary_types: secondary,
        },
    );

    let mut communities: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        let name = match record.community.trim() {
            "" => "unlabeled".to_string(),
            name => name.to_string(),
        };
        *communities.entry(name).or_insert(0) += 1;
    }
    let stamps: Vec<i64> = records
        .iter()
        .map(|r| r.created_at)
        .filter(|ts| *ts > 0)
        .collect();
    let span_days = match (stamps.iter().min(), stamps.iter().max()) {
        (Some(first), Some(last)) => (last - first) as f64 / SECONDS_PER_DAY,
        _ => 0.0,
    };
    let scope = Insight::new(
        "Activity Scope",
        format!(
            "{} posts across {} communities over {} days",
            records.len(),
            communities.len(),
            format_float(span_days, 1)
        ),
        volume,
        InsightDetails::ActivityScope {
            communities,
            span_days: round_to(span_days, 2),
        },
    );

    Ok(vec![overview, sentiment, classification, scope])
}

pub(super) fn pattern_layer(
    input: &SynthesisInput<'_>,
    thresholds: &ThresholdConfig,
) -> Result<Vec<Insight>, String> {
    let kind = input.profile.primary_type;
    let drivers: Vec<String> = behavioral_drivers(kind)
        .iter()
        .map(|driver| driver.to_string())
        .collect();

    let mut insights = vec![Insight::new(
        format!("{} Behavioral Drivers", kind.title()),
        format!(
            "Engagement in {} communities is driven by {}",
            kind.label(),
            drivers.join(", ").replace('_', " ")
        ),
        (input.profile.confidence * 0.9).max(0.2),
        InsightDetails::BehavioralDrivers {
            community_type: kind,
            behavioral_drivers: drivers,
        },
    )];

    let mut findings: Vec<&PatternFinding> = input.patterns.iter().collect();
    findings.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    for finding in findings.into_iter().take(MAX_PATTERN_INSIGHTS) {
        insights.push(Insight::new(
            pattern_title(finding.pattern_type),
            finding.description.clone(),
            finding.confidence,
            InsightDetails::DiscoveredPattern {
                pattern_type: finding.pattern_type,
                evidence: finding.evidence.clone(),
            },
        ));
    }

    if let Some(semantic) = input.semantic {
        if !semantic.jargon.is_empty() || !semantic.vulnerability_markers.is_empty() {
            let mut parts = Vec::new();
            if !semantic.jargon.is_empty() {
                parts.push(format!("shared jargon ({})", semantic.jargon.join(", ")));
            }
            if !semantic.vulnerability_markers.is_empty() {
                parts.push(format!(
                    "vulnerability markers ({})",
                    semantic.vulnerability_markers.join(", ")
                ));
            }
            insights.push(Insight::new(
                "Community Language Signals",
                format!("Members use {}", parts.join(" and ")),
                semantic.confidence.unwrap_or(0.6),
                InsightDetails::SemanticSignals {
                    jargon: semantic.jargon.clone(),
                    vulnerability_markers: semantic.vulnerability_markers.clone(),
                },
            ));
        }
    }

    for entry in input
        .correlations
        .iter()
        .filter(|entry| entry.correlation.strength() >= thresholds.surprising_correlation)
    {
        let coefficient = entry.correlation.coefficient;
        let direction = if coefficient > 0.0 { "rises" } else { "falls" };
        insights.push(Insight::new(
            format!("Surprising Correlation: {}", entry.feature.replace('_', " ")),
            format!(
                "Engagement {} with {} (r = {}, n = {})",
                direction,
                entry.feature.replace('_', " "),
                format_float(coefficient, 2),
                entry.correlation.sample_size
            ),
            entry.correlation.strength() * sample_factor(entry.correlation.sample_size),
            InsightDetails::SurprisingCorrelation {
                feature: entry.feature.clone(),
                coefficient,
                sample_size: entry.correlation.sample_size,
            },
        ));
    }

    let mut answered: Vec<_> = input.questions.iter().collect();
    answered.sort_by(|a, b| b.scored.composite_score.total_cmp(&a.scored.composite_score));
    for answer in answered.into_iter().take(MAX_QUESTION_INSIGHTS) {
        insights.push(Insight::new(
            "Community Question Insight",
            answer.summary.clone(),
            answer.confidence,
            InsightDetails::QuestionInsight {
                question_id: answer.scored.question.id.clone(),
                question: answer.scored.question.text.clone(),
                category: answer.scored.question.category,
                insights: answer.insights.clone(),
            },
        ));
    }

    Ok(insights)
}

pub(super) fn prediction_layer(
    input: &SynthesisInput<'_>,
    thresholds: &ThresholdConfig,
) -> Result<Vec<Insight>, String> {
    let forecast = evolution_forecast(input.profile.primary_type);
    let evolution = Insight::new(
        format!("{} Community Evolution", input.profile.primary_type.title()),
        forecast.forecast,
        forecast.confidence * (0.5 + 0.5 * input.profile.confidence),
        InsightDetails::CommunityEvolution {
            forecast: forecast.forecast.to_string(),
            timeframe: forecast.timeframe.to_string(),
        },
    );
    Ok(vec![engagement_trend(input.records, thresholds), evolution])
}

fn engagement_trend(records: &[ContentRecord], thresholds: &ThresholdConfig) -> Insight {
    let needed = thresholds.trend_min_records.max(2);
    if records.len() < needed {
        return Insight::new(
            "Engagement Trend",
            format!(
                "Insufficient data: {} records, at least {} needed to read a trend",
                records.len(),
                needed
            ),
            0.1,
            InsightDetails::EngagementTrend {
                direction: TrendDirection::InsufficientData,
                recent_average: None,
                historical_average: None,
                change_ratio: None,
            },
        );
    }

    let mut ordered: Vec<&ContentRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.created_at);
    let recent_len =
        ((records.len() as f64 * RECENT_SHARE).ceil() as usize).clamp(1, records.len() - 1);
    let (historical, recent) = ordered.split_at(records.len() - recent_len);

    let average = |slice: &[&ContentRecord]| {
        mean(&slice.iter().map(|r| r.engagement_score as f64).collect::<Vec<_>>())
    };
    let recent_average = average(recent);
    let historical_average = average(historical);
    let change_ratio = (recent_average - historical_average) / historical_average.abs().max(1.0);

    let direction = if change_ratio > TREND_BAND {
        TrendDirection::Rising
    } else if change_ratio < -TREND_BAND {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };
    let verb = match direction {
        TrendDirection::Rising => "is rising",
        TrendDirection::Declining => "is declining",
        _ => "is holding steady",
    };

    Insight::new(
        "Engagement Trend",
        format!(
            "Engagement {}: recent posts average {} versus {} before ({:+.0}%)",
            verb,
            format_float(recent_average, 1),
            format_float(historical_average, 1),
            change_ratio * 100.0
        ),
        sample_factor(records.len()) * (0.4 + 0.4 * change_ratio.abs().min(1.0)),
        InsightDetails::EngagementTrend {
            direction,
            recent_average: Some(round_to(recent_average, 3)),
            historical_average: Some(round_to(historical_average, 3)),
            change_ratio: Some(round_to(change_ratio, 3)),
        },
    )
}

pub(super) fn strategy_layer(
    input: &SynthesisInput<'_>,
    config: &EngineConfig,
) -> Result<Vec<Insight>, String> {
    let kind = input.profile.primary_type;
    let (steps, outcome) = growth_plan(kind);
    let growth = Insight::new(
        format!("{} Community Growth Strategy", kind.title()),
        format!("Grow the {} community by reinforcing what members already value", kind.label()),
        (input.profile.confidence * 0.9).clamp(0.3, 0.9),
        InsightDetails::Strategy {
            recommendations: steps.iter().map(|step| step.to_string()).collect(),
            expected_outcome: outcome.to_string(),
        },
    );

    let computed;
    let high: &HighPerformingAnalysis = match input.success_patterns {
        Some(report) => &report.high_performing_content,
        None => {
            computed = analyze_high_performing_content_with_config(input.records, &config.cohorts);
            &computed
        }
    };

    let mut recommendations = Vec::new();
    let mut signals = Vec::new();
    let length = &high.optimal_length;
    if length.sample_size > 0 && length.optimal_max > 0 {
        recommendations.push(format!(
            "Keep posts between {} and {} characters",
            length.optimal_min, length.optimal_max
        ));
        signals.push(length.confidence);
    }
    if let Some(hour) = high.best_timing.best_hours.first() {
        recommendations.push(format!("Publish around {:02}:00 UTC", hour));
        signals.push(high.best_timing.confidence);
    }
    if let Some(top) = high.effective_formats.ranked.first() {
        recommendations.push(format!("Lean on {} in post structure", top.format));
        signals.push(high.effective_formats.confidence);
    }
    if let Some(report) = input.success_patterns {
        recommendations.extend(
            report
                .optimization_recommendations
                .iter()
                .filter(|rec| {
                    matches!(
                        rec.category,
                        RecommendationCategory::AvoidMistakes | RecommendationCategory::RejectionRisk
                    )
                })
                .map(|rec| rec.recommendation.clone()),
        );
    }

    let confidence = if signals.is_empty() {
        0.2
    } else {
        mean(&signals).clamp(0.1, 0.95)
    };
    if recommendations.is_empty() {
        recommendations.push("Collect more high-performing posts before tuning format".to_string());
    }

    let content = Insight::new(
        "Content Optimization Strategy",
        format!("Shape new posts after the top {} performers", high.cohort_size),
        confidence,
        InsightDetails::Strategy {
            recommendations,
            expected_outcome: "Higher average engagement per post".to_string(),
        },
    );

    Ok(vec![growth, content])
}

fn surface_confidence(records: usize) -> f64 {
    (0.3 + 0.6 * (records as f64 / 20.0).min(1.0)).min(0.9)
}

fn pattern_title(kind: PatternType) -> &'static str {
    match kind {
        PatternType::ContentLength => "Content Length Pattern",
        PatternType::Timing => "Timing Pattern",
        PatternType::Formatting => "Formatting Pattern",
        PatternType::Elements => "Engagement Elements Pattern",
        PatternType::Failure => "Failure Pattern",
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_three_drivers() {
        for kind in CommunityType::ALL {
            assert_eq!(behavioral_drivers(kind).len(), 3);
        }
        assert!(behavioral_drivers(CommunityType::Support).contains(&"empathy_expression"));
    }

    #[test]
    fn trend_needs_minimum_history() {
        let records = vec![ContentRecord::default(); 2];
        let insight = engagement_trend(&records, &ThresholdConfig::default());
        assert!(!insight.carries_signal());
    }

    #[test]
    fn trend_detects_growth() {
        let records: Vec<ContentRecord> = (0..10)
            .map(|i| ContentRecord {
                id: format!("p{}", i),
                engagement_score: if i >= 7 { 100 } else { 10 },
                created_at: 1_700_000_000 + i * 3_600,
                ..ContentRecord::default()
            })
            .collect();
        let insight = engagement_trend(&records, &ThresholdConfig::default());
        match insight.details {
            InsightDetails::EngagementTrend { direction, .. } => {
                assert_eq!(direction, TrendDirection::Rising)
            }
            other => panic!("unexpected details {:?}", other),
        }
    }
}
