use serde::{Deserialize, Serialize};

use crate::features::{extract_features, ContentFeatures};
use crate::stats::Correlation;
use crate::{round_to, CommunityProfile, CommunityType, ContentRecord};

const MAX_SELECTED_FEATURES: usize = 5;
const MIN_ACCURACY: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPrediction {
    pub content_type: String,
    pub predicted_engagement: EngagementLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCorrelation {
    pub feature: String,
    pub correlation: Correlation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementModel {
    /// Selected features, strongest |r| first.
    pub feature_names: Vec<String>,
    pub accuracy: f64,
    pub predictions: Vec<ContentPrediction>,
    /// Every candidate feature with its coefficient against engagement.
    pub feature_correlations: Vec<FeatureCorrelation>,
}

impl EngagementModel {
    /// Coefficient for a feature by name, if it was evaluated.
    pub fn coefficient(&self, feature: &str) -> Option<f64> {
        self.feature_correlations
            .iter()
            .find(|entry| entry.feature == feature)
            .map(|entry| entry.correlation.coefficient)
    }
}

pub fn create_engagement_prediction_model(
    records: &[ContentRecord],
    profile: &CommunityProfile,
) -> EngagementModel {
    let features: Vec<ContentFeatures> = records.iter().map(extract_features).collect();
    let engagement: Vec<i64> = records.iter().map(|r| r.engagement_score).collect();

    let candidates: Vec<(&str, Vec<f64>)> = vec![
        ("title_length", column(&features, |f| f.title_length as f64)),
        ("body_length", column(&features, |f| f.body_length as f64)),
        ("has_question", column(&features, |f| bool_value(f.has_question))),
        ("has_links", column(&features, |f| bool_value(f.has_links))),
        ("has_emojis", column(&features, |f| bool_value(f.has_emojis))),
        ("has_list", column(&features, |f| bool_value(f.has_list))),
        ("sentiment_score", column(&features, |f| f.sentiment_score)),
        ("hour_of_day", column(&features, |f| f.hour_of_day as f64)),
        ("day_of_week", column(&features, |f| f.day_of_week as f64)),
        (
            "comment_count",
            records.iter().map(|r| r.comment_count as f64).collect(),
        ),
    ];

    let mut feature_correlations: Vec<FeatureCorrelation> = candidates
        .into_iter()
        .map(|(feature, values)| {
            let mut correlation = Correlation::between(&values, &engagement);
            correlation.coefficient = round_to(correlation.coefficient, 4);
            FeatureCorrelation {
                feature: feature.to_string(),
                correlation,
            }
        })
        .collect();
    feature_correlations.sort_by(|a, b| {
        b.correlation
            .strength()
            .total_cmp(&a.correlation.strength())
    });

    let selected: Vec<&FeatureCorrelation> = feature_correlations
        .iter()
        .filter(|entry| entry.correlation.strength() > 0.0)
        .take(MAX_SELECTED_FEATURES)
        .collect();

    let accuracy = if selected.is_empty() {
        MIN_ACCURACY
    } else {
        let total: f64 = selected.iter().map(|entry| entry.correlation.strength()).sum();
        (total / selected.len() as f64).clamp(MIN_ACCURACY, 1.0)
    };

    EngagementModel {
        feature_names: selected.iter().map(|entry| entry.feature.clone()).collect(),
        accuracy: round_to(accuracy, 3),
        predictions: community_predictions(profile.primary_type),
        feature_correlations,
    }
}

pub fn community_predictions(kind: CommunityType) -> Vec<ContentPrediction> {
    use EngagementLevel::*;

    let table: &[(&str, EngagementLevel)] = match kind {
        CommunityType::Dating => &[
            ("authentic_personal_story", VeryHigh),
            ("profile_feedback_request", High),
            ("success_story", Medium),
            ("generic_complaint", Low),
        ],
        CommunityType::Product => &[
            ("comparison_review", VeryHigh),
            ("long_term_review", High),
            ("feature_question", Medium),
            ("promotional_post", Low),
        ],
        CommunityType::Hobby => &[
            ("tutorial_content", VeryHigh),
            ("project_showcase", High),
            ("beginner_question", Medium),
            ("low_effort_repost", Low),
        ],
        CommunityType::Support => &[
            ("personal_experience", VeryHigh),
            ("resource_sharing", High),
            ("check_in_thread", Medium),
            ("unsolicited_advice", Low),
        ],
        CommunityType::News => &[
            ("breaking_update", VeryHigh),
            ("analysis_piece", High),
            ("discussion_thread", Medium),
            ("opinion_without_source", Low),
        ],
        CommunityType::General => &[
            ("discussion_prompt", High),
            ("informational_post", Medium),
            ("low_effort_post", Low),
        ],
    };

    table
        .iter()
        .map(|(content_type, level)| ContentPrediction {
            content_type: content_type.to_string(),
            predicted_engagement: *level,
        })
        .collect()
}

fn column(features: &[ContentFeatures], select: fn(&ContentFeatures) -> f64) -> Vec<f64> {
    features.iter().map(select).collect()
}

fn bool_value(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
