mod layers;

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::SuccessFailureReport;
use crate::model::FeatureCorrelation;
use crate::patterns::{PatternFinding, PatternType};
use crate::questions::{AnsweredQuestion, QuestionCategory};
use crate::stats::mean;
use crate::{
    clamp01, panic_message, round_to, CommunityProfile, CommunityType, ContentRecord,
    SemanticAnalysis,
};

pub use layers::{behavioral_drivers, evolution_forecast, EvolutionForecast};

const LAYER_WEIGHTS: [(Layer, f64); 4] = [
    (Layer::Surface, 0.2),
    (Layer::Patterns, 0.3),
    (Layer::Predictions, 0.25),
    (Layer::Strategy, 0.25),
];

/// Overall confidence reported when no layer carries a usable signal.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Surface,
    Patterns,
    Predictions,
    Strategy,
}

impl Layer {
    fn label(self) -> &'static str {
        match self {
            Layer::Surface => "surface",
            Layer::Patterns => "patterns",
            Layer::Predictions => "predictions",
            Layer::Strategy => "strategy",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub title: String,
    pub description: String,
    pub confidence: f64,
    #[serde(flatten)]
    pub details: InsightDetails,
}

impl Insight {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
        details: InsightDetails,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            confidence: round_to(clamp01(confidence), 3),
            details,
        }
    }

    /// False for placeholders that say nothing about the community.
    pub fn carries_signal(&self) -> bool {
        !matches!(
            self.details,
            InsightDetails::NoData { .. }
                | InsightDetails::StageFallback { .. }
                | InsightDetails::EngagementTrend {
                    direction: TrendDirection::InsufficientData,
                    ..
                }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightDetails {
    EngagementOverview {
        total_records: usize,
        average_engagement: f64,
        median_engagement: f64,
        total_comments: u64,
    },
    SentimentDistribution {
        positive: u32,
        neutral: u32,
        negative: u32,
        average: f64,
    },
    CommunityClassification {
        primary_type: CommunityType,
        secondary_types: Vec<CommunityType>,
    },
    ActivityScope {
        communities: BTreeMap<String, usize>,
        span_days: f64,
    },
    NoData {
        reason: String,
    },
    BehavioralDrivers {
        community_type: CommunityType,
        behavioral_drivers: Vec<String>,
    },
    DiscoveredPattern {
        pattern_type: PatternType,
        evidence: Vec<String>,
    },
    SemanticSignals {
        jargon: Vec<String>,
        vulnerability_markers: Vec<String>,
    },
    SurprisingCorrelation {
        feature: String,
        coefficient: f64,
        sample_size: usize,
    },
    QuestionInsight {
        question_id: String,
        question: String,
        category: QuestionCategory,
        insights: Vec<String>,
    },
    EngagementTrend {
        direction: TrendDirection,
        #[serde(skip_serializing_if = "Option::is_none")]
        recent_average: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        historical_average: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        change_ratio: Option<f64>,
    },
    CommunityEvolution {
        forecast: String,
        timeframe: String,
    },
    Strategy {
        recommendations: Vec<String>,
        expected_outcome: String,
    },
    StageFallback {
        stage: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub records: usize,
    pub start: i64,
    pub end: i64,
    pub average_engagement: f64,
    pub average_sentiment: f64,
    pub average_comments: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodDeltas {
    pub engagement: f64,
    pub sentiment: f64,
    pub comments: f64,
    /// Relative engagement change; absent when the early average is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparativeAnalysis {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub early: Option<PeriodSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late: Option<PeriodSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deltas: Option<PeriodDeltas>,
}

impl ComparativeAnalysis {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            early: None,
            late: None,
            deltas: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightMetadata {
    pub generated_at: String,
    pub analysis_id: String,
    pub total_insights: usize,
    pub confidence_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub community_type: CommunityType,
    pub records_analyzed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayeredInsights {
    pub surface: Vec<Insight>,
    pub patterns: Vec<Insight>,
    pub predictions: Vec<Insight>,
    pub strategy: Vec<Insight>,
    pub comparative: ComparativeAnalysis,
    pub metadata: InsightMetadata,
}

impl LayeredInsights {
    pub fn all_insights(&self) -> impl Iterator<Item = &Insight> {
        self.surface
            .iter()
            .chain(&self.patterns)
            .chain(&self.predictions)
            .chain(&self.strategy)
    }
}

/// Everything the synthesizer reads. Only `analysis_id`, `records` and
/// `profile` are required; the rest default to empty.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub analysis_id: &'a str,
    pub records: &'a [ContentRecord],
    pub profile: &'a CommunityProfile,
    pub patterns: &'a [PatternFinding],
    pub semantic: Option<&'a SemanticAnalysis>,
    pub correlations: &'a [FeatureCorrelation],
    pub questions: &'a [AnsweredQuestion],
    pub success_patterns: Option<&'a SuccessFailureReport>,
    /// Problem reported by an earlier pipeline step, carried into `metadata.error`.
    pub upstream_error: Option<&'a str>,
}

impl<'a> SynthesisInput<'a> {
    pub fn new(
        analysis_id: &'a str,
        records: &'a [ContentRecord],
        profile: &'a CommunityProfile,
    ) -> Self {
        Self {
            analysis_id,
            records,
            profile,
            patterns: &[],
            semantic: None,
            correlations: &[],
            questions: &[],
            success_patterns: None,
            upstream_error: None,
        }
    }

    pub fn with_patterns(mut self, patterns: &'a [PatternFinding]) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_semantic(mut self, semantic: Option<&'a SemanticAnalysis>) -> Self {
        self.semantic = semantic;
        self
    }

    pub fn with_correlations(mut self, correlations: &'a [FeatureCorrelation]) -> Self {
        self.correlations = correlations;
        self
    }

    pub fn with_questions(mut self, questions: &'a [AnsweredQuestion]) -> Self {
        self.questions = questions;
        self
    }

    pub fn with_success_patterns(mut self, report: &'a SuccessFailureReport) -> Self {
        self.success_patterns = Some(report);
        self
    }

    pub fn with_upstream_error(mut self, error: Option<&'a str>) -> Self {
        self.upstream_error = error;
        self
    }
}

pub fn generate_layered_insights(input: &SynthesisInput<'_>) -> LayeredInsights {
    generate_layered_insights_with_config(input, &EngineConfig::default())
}

/// Build all five layers. Each stage is isolated: a failing stage is
/// replaced by fallback content and reported in `metadata.error` while the
/// remaining stages still run.
pub fn generate_layered_insights_with_config(
    input: &SynthesisInput<'_>,
    config: &EngineConfig,
) -> LayeredInsights {
    info!(
        analysis_id = %input.analysis_id,
        records = input.records.len(),
        community_type = input.profile.primary_type.label(),
        "generating layered insights"
    );
    let mut errors: Vec<String> = input
        .upstream_error
        .map(|error| vec![error.to_string()])
        .unwrap_or_default();

    let surface = run_stage(Layer::Surface.label(), &mut errors, || {
        layers::surface_layer(input)
    })
    .unwrap_or_else(|| vec![layers::stage_fallback(Layer::Surface.label())]);

    let patterns = run_stage(Layer::Patterns.label(), &mut errors, || {
        layers::pattern_layer(input, &config.thresholds)
    })
    .unwrap_or_else(|| vec![layers::stage_fallback(Layer::Patterns.label())]);

    let predictions = run_stage(Layer::Predictions.label(), &mut errors, || {
        layers::prediction_layer(input, &config.thresholds)
    })
    .unwrap_or_else(|| vec![layers::stage_fallback(Layer::Predictions.label())]);

    let strategy = run_stage(Layer::Strategy.label(), &mut errors, || {
        layers::strategy_layer(input, config)
    })
    .unwrap_or_else(|| vec![layers::stage_fallback(Layer::Strategy.label())]);

    let comparative = run_stage("comparative", &mut errors, || {
        try_comparative_analysis(input.records, config.thresholds.comparative_min_records)
    })
    .unwrap_or_else(|| ComparativeAnalysis::unavailable("comparative analysis failed"));

    let confidence_score = calculate_overall_confidence(&surface, &patterns, &predictions, &strategy);
    let total_insights = surface.len() + patterns.len() + predictions.len() + strategy.len();
    let error = if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    };

    info!(
        analysis_id = %input.analysis_id,
        total_insights,
        confidence_score,
        failed = error.is_some(),
        "layered insights ready"
    );

    LayeredInsights {
        surface,
        patterns,
        predictions,
        strategy,
        comparative,
        metadata: InsightMetadata {
            generated_at: Utc::now().to_rfc3339(),
            analysis_id: input.analysis_id.to_string(),
            total_insights,
            confidence_score,
            error,
            community_type: input.profile.primary_type,
            records_analyzed: input.records.len(),
        },
    }
}

/// Weighted mean of per-layer average confidence. Layers without a usable
/// insight drop out and the remaining weights are renormalized.
pub fn calculate_overall_confidence(
    surface: &[Insight],
    patterns: &[Insight],
    predictions: &[Insight],
    strategy: &[Insight],
) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for (layer, weight) in LAYER_WEIGHTS {
        let insights = match layer {
            Layer::Surface => surface,
            Layer::Patterns => patterns,
            Layer::Predictions => predictions,
            Layer::Strategy => strategy,
        };
        let usable: Vec<f64> = insights
            .iter()
            .filter(|insight| insight.carries_signal() && insight.confidence.is_finite())
            .map(|insight| insight.confidence)
            .collect();
        if usable.is_empty() {
            continue;
        }
        weighted += weight * mean(&usable);
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return DEFAULT_CONFIDENCE;
    }
    round_to(clamp01(weighted / total_weight), 3)
}

pub fn perform_comparative_analysis(records: &[ContentRecord]) -> ComparativeAnalysis {
    perform_comparative_analysis_with_min_records(
        records,
        EngineConfig::default().thresholds.comparative_min_records,
    )
}

pub fn perform_comparative_analysis_with_min_records(
    records: &[ContentRecord],
    min_records: usize,
) -> ComparativeAnalysis {
    try_comparative_analysis(records, min_records)
        .unwrap_or_else(|err| ComparativeAnalysis::unavailable(err))
}

fn try_comparative_analysis(
    records: &[ContentRecord],
    min_records: usize,
) -> Result<ComparativeAnalysis, String> {
    let min_records = min_records.max(2);
    if records.len() < min_records {
        return Ok(ComparativeAnalysis::unavailable(format!(
            "need at least {} records for comparison, got {}",
            min_records,
            records.len()
        )));
    }
    if let Some(bad) = records.iter().find(|r| !r.sentiment_score.is_finite()) {
        return Err(format!("record {} has a non-finite sentiment score", bad.id));
    }

    let mut ordered: Vec<&ContentRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.created_at);
    let (early, late) = ordered.split_at(ordered.len() / 2);
    let early = summarize_period(early);
    let late = summarize_period(late);

    let engagement_ratio = (early.average_engagement.abs() > f64::EPSILON).then(|| {
        round_to(
            (late.average_engagement - early.average_engagement) / early.average_engagement.abs(),
            3,
        )
    });
    let deltas = PeriodDeltas {
        engagement: round_to(late.average_engagement - early.average_engagement, 3),
        sentiment: round_to(late.average_sentiment - early.average_sentiment, 3),
        comments: round_to(late.average_comments - early.average_comments, 3),
        engagement_ratio,
    };
    debug!(
        early = early.records,
        late = late.records,
        delta = deltas.engagement,
        "comparative analysis"
    );

    Ok(ComparativeAnalysis {
        available: true,
        reason: None,
        early: Some(early),
        late: Some(late),
        deltas: Some(deltas),
    })
}

fn summarize_period(records: &[&ContentRecord]) -> PeriodSummary {
    let engagement: Vec<f64> = records.iter().map(|r| r.engagement_score as f64).collect();
    let sentiment: Vec<f64> = records.iter().map(|r| r.sentiment_score).collect();
    let comments: Vec<f64> = records.iter().map(|r| r.comment_count as f64).collect();
    PeriodSummary {
        records: records.len(),
        start: records.first().map(|r| r.created_at).unwrap_or_default(),
        end: records.last().map(|r| r.created_at).unwrap_or_default(),
        average_engagement: round_to(mean(&engagement), 3),
        average_sentiment: round_to(mean(&sentiment), 3),
        average_comments: round_to(mean(&comments), 3),
    }
}

fn run_stage<T>(
    stage: &str,
    errors: &mut Vec<String>,
    build: impl FnOnce() -> Result<T, String>,
) -> Option<T> {
    let outcome = match catch_unwind(AssertUnwindSafe(build)) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload.as_ref())),
    };
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(stage, error = %err, "synthesis stage failed");
            errors.push(format!("{} stage failed: {}", stage, err));
            None
        }
    }
}
