use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::patterns::{FailureAnalysis, HighPerformingAnalysis};
use crate::{CommunityProfile, CommunityType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    CommunitySpecific,
    ContentLength,
    Timing,
    Formatting,
    AvoidMistakes,
    RejectionRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub recommendation: String,
    pub expected_outcome: String,
}

impl Recommendation {
    fn new(
        category: RecommendationCategory,
        recommendation: impl Into<String>,
        expected_outcome: impl Into<String>,
    ) -> Self {
        Self {
            category,
            recommendation: recommendation.into(),
            expected_outcome: expected_outcome.into(),
        }
    }
}

pub fn generate_optimization_recommendations(
    high_performing: &HighPerformingAnalysis,
    failure: &FailureAnalysis,
    profile: &CommunityProfile,
) -> Vec<Recommendation> {
    generate_optimization_recommendations_with_thresholds(
        high_performing,
        failure,
        profile,
        &ThresholdConfig::default(),
    )
}

/// Community guidance first, then one entry per finding that clears the
/// confidence threshold.
pub fn generate_optimization_recommendations_with_thresholds(
    high_performing: &HighPerformingAnalysis,
    failure: &FailureAnalysis,
    profile: &CommunityProfile,
    thresholds: &ThresholdConfig,
) -> Vec<Recommendation> {
    let mut recommendations = vec![community_recommendation(profile.primary_type)];
    let min_confidence = thresholds.recommendation_confidence;

    let length = &high_performing.optimal_length;
    if length.sample_size > 0 && length.optimal_max > 0 && length.confidence >= min_confidence {
        recommendations.push(Recommendation::new(
            RecommendationCategory::ContentLength,
            format!(
                "Aim for {}-{} characters across title and body",
                length.optimal_min, length.optimal_max
            ),
            "Matches the length band of the best-performing posts",
        ));
    }

    let timing = &high_performing.best_timing;
    if let Some(hour) = timing.best_hours.first() {
        if timing.confidence >= min_confidence {
            let day = timing
                .best_days
                .first()
                .map(|day| format!(" on {}", day))
                .unwrap_or_default();
            recommendations.push(Recommendation::new(
                RecommendationCategory::Timing,
                format!("Post around {:02}:00 UTC{}", hour, day),
                "Catches the window when top posts gathered most engagement",
            ));
        }
    }

    let formats = &high_performing.effective_formats;
    if let Some(top) = formats.ranked.first() {
        if formats.confidence >= min_confidence {
            recommendations.push(Recommendation::new(
                RecommendationCategory::Formatting,
                format!(
                    "Use {} ({:.0}% of top posts do)",
                    top.format.replace('_', " "),
                    top.frequency * 100.0
                ),
                "Mirrors the structure readers already reward",
            ));
        }
    }

    if let Some(mistake) = failure
        .common_mistakes
        .iter()
        .max_by(|a, b| a.frequency.total_cmp(&b.frequency))
    {
        recommendations.push(Recommendation::new(
            RecommendationCategory::AvoidMistakes,
            format!("Avoid {}", mistake.description.to_lowercase()),
            format!(
                "Removes a trait shared by {:.0}% of low-performing posts",
                mistake.frequency * 100.0
            ),
        ));
    }

    if !failure.rejection_triggers.is_empty() {
        let triggers: Vec<String> = failure
            .rejection_triggers
            .iter()
            .map(|trigger| trigger.trigger.replace('_', " "))
            .collect();
        recommendations.push(Recommendation::new(
            RecommendationCategory::RejectionRisk,
            format!("Steer clear of content that reads as {}", triggers.join(" or ")),
            "Lowers the risk of removal and downvotes",
        ));
    }

    recommendations
}

fn community_recommendation(kind: CommunityType) -> Recommendation {
    let (recommendation, outcome) = match kind {
        CommunityType::Hobby => (
            "Share step-by-step tutorials and progress write-ups that teach a skill",
            "Tutorial content draws saves and follow-up questions from learners",
        ),
        CommunityType::Support => (
            "Lead with empathy: acknowledge the experience before offering advice",
            "An empathetic tone invites more replies and keeps threads supportive",
        ),
        CommunityType::Product => (
            "Frame posts as comparisons that spell out value for money",
            "Comparative, value-focused reviews earn the most trust and discussion",
        ),
        CommunityType::Dating => (
            "Balance vulnerability with confidence; share real experiences without performing",
            "Authentic posts draw supportive engagement instead of critique",
        ),
        CommunityType::News => (
            "Lead with verifiable facts and keep emotional framing secondary",
            "Balanced fact and emotion sustains discussion without flame wars",
        ),
        CommunityType::General => (
            "Open with a clear hook and end with a question for readers",
            "Clear framing lifts both votes and comments",
        ),
    };
    Recommendation::new(RecommendationCategory::CommunitySpecific, recommendation, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::analyze_high_performing_content;
    use crate::ContentRecord;

    #[test]
    fn community_entry_comes_first_even_without_data() {
        let high = analyze_high_performing_content(&[]);
        let failure = FailureAnalysis::default();
        let profile = CommunityProfile::new(CommunityType::Support, 0.9);

        let recs = generate_optimization_recommendations(&high, &failure, &profile);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].category, RecommendationCategory::CommunitySpecific);
        assert!(recs[0].recommendation.contains("empathy"));
    }

    #[test]
    fn confident_length_band_is_recommended() {
        let records: Vec<ContentRecord> = (0..40)
            .map(|i| ContentRecord {
                id: format!("p{}", i),
                title: "A steady title for testing".into(),
                body: "x".repeat(200),
                engagement_score: i,
                ..ContentRecord::default()
            })
            .collect();
        let high = analyze_high_performing_content(&records);
        let recs = generate_optimization_recommendations(
            &high,
            &FailureAnalysis::default(),
            &CommunityProfile::new(CommunityType::Hobby, 0.85),
        );
        assert!(recs[0].recommendation.contains("tutorials"));
        assert!(recs
            .iter()
            .any(|rec| rec.category == RecommendationCategory::ContentLength));
    }
}
