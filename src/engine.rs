use serde::Serialize;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::llm::{CompletionOptions, LanguageModelClient};
use crate::model::{create_engagement_prediction_model, EngagementModel};
use crate::patterns::{
    analyze_failure_patterns_with_config, analyze_high_performing_content_with_config,
    FailureAnalysis, HighPerformingAnalysis, PatternFinding,
};
use crate::questions::{
    generate_dynamic_questions, generate_question_answers, score_questions_with_weights,
    AnsweredQuestion,
};
use crate::recommendations::{
    generate_optimization_recommendations_with_thresholds, Recommendation,
};
use crate::synthesis::{generate_layered_insights_with_config, LayeredInsights, SynthesisInput};
use crate::{
    derive_analysis_id, panic_message, CommunityProfile, CommunityType, ContentRecord,
    SemanticAnalysis,
};

const CANCELLED_DURING_QUESTIONS: &str = "analysis cancelled during question generation";

#[derive(Debug, Clone, Serialize)]
pub struct SuccessFailureMetadata {
    pub posts_analyzed: usize,
    pub community_type: CommunityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessFailureReport {
    pub high_performing_content: HighPerformingAnalysis,
    pub engagement_prediction: EngagementModel,
    pub failure_patterns: FailureAnalysis,
    pub optimization_recommendations: Vec<Recommendation>,
    pub metadata: SuccessFailureMetadata,
}

impl SuccessFailureReport {
    /// Success findings followed by failure findings.
    pub fn findings(&self) -> Vec<PatternFinding> {
        self.high_performing_content
            .patterns
            .iter()
            .chain(&self.failure_patterns.patterns)
            .cloned()
            .collect()
    }
}

pub fn analyze_success_failure(
    records: &[ContentRecord],
    profile: &CommunityProfile,
) -> SuccessFailureReport {
    analyze_success_failure_with_config(records, profile, &EngineConfig::default())
}

/// Pattern discovery, engagement model and recommendations in one report.
/// A panic in any step is reported in `metadata.error` with empty analyses.
pub fn analyze_success_failure_with_config(
    records: &[ContentRecord],
    profile: &CommunityProfile,
    config: &EngineConfig,
) -> SuccessFailureReport {
    match catch_unwind(AssertUnwindSafe(|| {
        build_success_failure(records, profile, config)
    })) {
        Ok(report) => report,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(error = %reason, "success/failure analysis failed");
            let mut report = build_success_failure(&[], profile, config);
            report.metadata.posts_analyzed = records.len();
            report.metadata.error = Some(format!("success/failure analysis failed: {}", reason));
            report
        }
    }
}

fn build_success_failure(
    records: &[ContentRecord],
    profile: &CommunityProfile,
    config: &EngineConfig,
) -> SuccessFailureReport {
    let high_performing_content =
        analyze_high_performing_content_with_config(records, &config.cohorts);
    let failure_patterns =
        analyze_failure_patterns_with_config(records, &config.cohorts, &config.thresholds);
    let engagement_prediction = create_engagement_prediction_model(records, profile);
    let optimization_recommendations = generate_optimization_recommendations_with_thresholds(
        &high_performing_content,
        &failure_patterns,
        profile,
        &config.thresholds,
    );

    SuccessFailureReport {
        high_performing_content,
        engagement_prediction,
        failure_patterns,
        optimization_recommendations,
        metadata: SuccessFailureMetadata {
            posts_analyzed: records.len(),
            community_type: profile.primary_type,
            error: None,
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Correlation id for logs and metadata; derived from record ids when absent.
    pub analysis_id: Option<String>,
    pub records: Vec<ContentRecord>,
    pub profile: CommunityProfile,
    pub semantic: Option<SemanticAnalysis>,
}

impl AnalysisRequest {
    pub fn new(records: Vec<ContentRecord>, profile: CommunityProfile) -> Self {
        Self {
            analysis_id: None,
            records,
            profile,
            semantic: None,
        }
    }

    pub fn with_analysis_id(mut self, analysis_id: impl Into<String>) -> Self {
        self.analysis_id = Some(analysis_id.into());
        self
    }

    pub fn with_semantic(mut self, semantic: SemanticAnalysis) -> Self {
        self.semantic = Some(semantic);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: String,
    pub insights: LayeredInsights,
    pub success_failure: SuccessFailureReport,
    pub questions: Vec<AnsweredQuestion>,
}

/// Runs the full pipeline. Holds only immutable configuration and an
/// optional shared language-model client, so clones can serve concurrent
/// analyses.
#[derive(Clone)]
pub struct InsightEngine {
    config: Arc<EngineConfig>,
    llm: Option<Arc<dyn LanguageModelClient>>,
}

impl InsightEngine {
    pub fn new(config: EngineConfig, llm: Option<Arc<dyn LanguageModelClient>>) -> Self {
        Self {
            config: Arc::new(config),
            llm,
        }
    }

    pub fn has_language_model(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> AnalysisReport {
        self.analyze_until(request, std::future::pending::<()>()).await
    }

    /// Like [`InsightEngine::analyze`], but stops waiting on the language
    /// model once `cancel` resolves. The synchronous stages still run and
    /// the report records the cancellation in `metadata.error`.
    pub async fn analyze_until<F>(&self, request: AnalysisRequest, cancel: F) -> AnalysisReport
    where
        F: Future<Output = ()>,
    {
        let config = self.config.as_ref();
        let analysis_id = request
            .analysis_id
            .clone()
            .unwrap_or_else(|| derive_analysis_id(&request.records));
        info!(
            analysis_id = %analysis_id,
            records = request.records.len(),
            community_type = request.profile.primary_type.label(),
            "analysis started"
        );

        let success_failure =
            analyze_success_failure_with_config(&request.records, &request.profile, config);
        let patterns = success_failure.findings();

        let mut errors: Vec<String> = success_failure.metadata.error.iter().cloned().collect();
        let options = CompletionOptions::from_config(&config.llm);
        let generation = generate_dynamic_questions(
            self.llm.as_deref(),
            &request.records,
            &request.profile,
            &patterns,
            &options,
        );
        let candidates = tokio::select! {
            biased;
            _ = cancel => {
                warn!(analysis_id = %analysis_id, "analysis cancelled during question generation");
                errors.push(CANCELLED_DURING_QUESTIONS.to_string());
                Vec::new()
            }
            questions = generation => questions,
        };

        let scored = score_questions_with_weights(&candidates, &request.records, &config.scoring);
        let questions = generate_question_answers(&scored, &request.records, &patterns);

        let upstream_error = (!errors.is_empty()).then(|| errors.join("; "));
        let input = SynthesisInput::new(&analysis_id, &request.records, &request.profile)
            .with_patterns(&patterns)
            .with_semantic(request.semantic.as_ref())
            .with_correlations(&success_failure.engagement_prediction.feature_correlations)
            .with_questions(&questions)
            .with_success_patterns(&success_failure)
            .with_upstream_error(upstream_error.as_deref());
        let insights = generate_layered_insights_with_config(&input, config);

        info!(
            analysis_id = %analysis_id,
            questions = questions.len(),
            insights = insights.metadata.total_insights,
            "analysis finished"
        );

        AnalysisReport {
            analysis_id,
            insights,
            success_failure,
            questions,
        }
    }
}
