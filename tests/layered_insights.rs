mod common;

use common::{hobby_records, Script, ScriptedClient, GENERATED_RESPONSE};
use insight_engine::config::EngineConfig;
use insight_engine::llm::LanguageModelClient;
use insight_engine::recommendations::RecommendationCategory;
use insight_engine::synthesis::{
    calculate_overall_confidence, perform_comparative_analysis, InsightDetails,
    DEFAULT_CONFIDENCE,
};
use insight_engine::{
    analyze_success_failure, derive_analysis_id, generate_layered_insights, AnalysisRequest,
    CommunityProfile, CommunityType, InsightEngine, SynthesisInput,
};
use std::sync::Arc;
use std::time::Duration;

fn hobby_profile() -> CommunityProfile {
    CommunityProfile::new(CommunityType::Hobby, 0.85)
}

#[test]
fn hobby_layers_cover_every_level() {
    let records = hobby_records();
    let profile = hobby_profile();
    let report = analyze_success_failure(&records, &profile);
    let patterns = report.findings();
    let input = SynthesisInput::new("hobby-run", &records, &profile)
        .with_patterns(&patterns)
        .with_correlations(&report.engagement_prediction.feature_correlations)
        .with_success_patterns(&report);
    let insights = generate_layered_insights(&input);

    assert!(insights.metadata.error.is_none());
    assert_eq!(insights.metadata.analysis_id, "hobby-run");
    assert_eq!(insights.metadata.records_analyzed, 10);
    assert_eq!(insights.metadata.total_insights, insights.all_insights().count());
    assert!(insights.metadata.confidence_score > 0.0);
    assert!(insights.metadata.confidence_score <= 1.0);

    let sentiment = insights
        .surface
        .iter()
        .find_map(|insight| match &insight.details {
            InsightDetails::SentimentDistribution {
                positive,
                neutral,
                negative,
                ..
            } => Some(positive + neutral + negative),
            _ => None,
        })
        .expect("sentiment distribution");
    assert_eq!(sentiment, 100);

    let drivers = insights
        .patterns
        .iter()
        .find_map(|insight| match &insight.details {
            InsightDetails::BehavioralDrivers {
                behavioral_drivers, ..
            } => Some(behavioral_drivers.clone()),
            _ => None,
        })
        .expect("behavioral drivers");
    assert!(drivers.iter().any(|driver| driver == "skill_development"));

    assert!(insights
        .strategy
        .iter()
        .any(|insight| insight.title == "Hobby Community Growth Strategy"));
    assert!(!insights.predictions.is_empty());
    assert!(insights.comparative.available);
}

#[test]
fn empty_records_still_produce_every_layer() {
    let profile = CommunityProfile::new(CommunityType::Support, 0.6);
    let insights = generate_layered_insights(&SynthesisInput::new("empty", &[], &profile));

    assert_eq!(insights.surface[0].title, "No Data Available");
    assert!(!insights.patterns.is_empty());
    assert!(!insights.predictions.is_empty());
    assert!(!insights.strategy.is_empty());
    assert!(!insights.comparative.available);
    assert_eq!(insights.metadata.records_analyzed, 0);
}

#[test]
fn overall_confidence_defaults_without_signal() {
    assert_eq!(calculate_overall_confidence(&[], &[], &[], &[]), DEFAULT_CONFIDENCE);
}

#[test]
fn comparative_analysis_needs_enough_records() {
    let records = hobby_records();

    let short = perform_comparative_analysis(&records[..2]);
    assert!(!short.available);
    assert!(short.reason.is_some());
    assert!(short.deltas.is_none());

    let full = perform_comparative_analysis(&records);
    assert!(full.available);
    let early = full.early.expect("early period");
    let late = full.late.expect("late period");
    assert_eq!(early.records + late.records, records.len());
    assert!(early.end <= late.start);
    let deltas = full.deltas.expect("deltas");
    assert!((deltas.engagement - (late.average_engagement - early.average_engagement)).abs() < 1e-6);
}

#[test]
fn failing_stage_is_isolated() {
    let mut records = hobby_records();
    records[3].sentiment_score = f64::NAN;
    let profile = hobby_profile();
    let insights = generate_layered_insights(&SynthesisInput::new("nan-run", &records, &profile));

    let error = insights.metadata.error.clone().expect("stage error recorded");
    assert!(error.contains("surface stage failed"), "{}", error);
    assert!(error.contains("comparative stage failed"), "{}", error);
    assert!(!insights.comparative.available);
    assert!(!insights.patterns.is_empty());
    assert!(!insights.strategy.is_empty());

    let value = serde_json::to_value(&insights).expect("serializable");
    for key in ["surface", "patterns", "predictions", "strategy", "comparative", "metadata"] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(value["surface"][0]["kind"], "stage_fallback");
}

#[test]
fn success_failure_report_leads_with_community_advice() {
    let records = hobby_records();
    let report = analyze_success_failure(&records, &hobby_profile());

    assert_eq!(report.metadata.posts_analyzed, 10);
    assert!(report.metadata.error.is_none());
    assert_eq!(
        report.optimization_recommendations[0].category,
        RecommendationCategory::CommunitySpecific
    );
    assert!(report
        .optimization_recommendations
        .iter()
        .any(|rec| rec.category == RecommendationCategory::RejectionRisk));
    assert!(!report.findings().is_empty());
}

#[test]
fn analysis_id_is_stable_for_the_same_records() {
    let records = hobby_records();
    let first = derive_analysis_id(&records);
    assert_eq!(first, derive_analysis_id(&records));
    assert!(first.starts_with("analysis_"));
    assert_ne!(first, derive_analysis_id(&records[..5]));
}

#[tokio::test]
async fn offline_engine_uses_fallback_questions() {
    let engine = InsightEngine::new(EngineConfig::default(), None);
    assert!(!engine.has_language_model());

    let report = engine
        .analyze(AnalysisRequest::new(hobby_records(), hobby_profile()))
        .await;

    assert!(report.analysis_id.starts_with("analysis_"));
    assert_eq!(report.insights.metadata.analysis_id, report.analysis_id);
    assert_eq!(report.success_failure.metadata.posts_analyzed, 10);
    assert_eq!(report.questions.len(), 2);
    assert!(report
        .questions
        .iter()
        .all(|q| q.scored.question.id.starts_with("fallback_hobby_")));
    assert!(report.insights.metadata.error.is_none());
}

#[tokio::test]
async fn engine_answers_generated_questions() {
    let client = Arc::new(ScriptedClient::responding(GENERATED_RESPONSE));
    let engine = InsightEngine::new(
        EngineConfig::default(),
        Some(client.clone() as Arc<dyn LanguageModelClient>),
    );

    let request =
        AnalysisRequest::new(hobby_records(), hobby_profile()).with_analysis_id("run-42");
    let report = engine.analyze(request).await;

    assert_eq!(client.calls(), 1);
    assert_eq!(report.analysis_id, "run-42");
    assert_eq!(report.questions.len(), 3);
    assert!(report
        .questions
        .windows(2)
        .all(|pair| pair[0].scored.composite_score >= pair[1].scored.composite_score));
    assert!(report
        .insights
        .patterns
        .iter()
        .any(|insight| insight.title == "Community Question Insight"));
}

#[tokio::test]
async fn cancellation_skips_questions_but_keeps_report() {
    let client = ScriptedClient::new(Script::Delay(
        Duration::from_secs(10),
        GENERATED_RESPONSE.to_string(),
    ));
    let engine = InsightEngine::new(
        EngineConfig::default(),
        Some(Arc::new(client) as Arc<dyn LanguageModelClient>),
    );

    let report = engine
        .analyze_until(
            AnalysisRequest::new(hobby_records(), hobby_profile()),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

    assert!(report.questions.is_empty());
    let error = report.insights.metadata.error.expect("cancellation recorded");
    assert!(error.contains("cancelled"), "{}", error);
    assert!(!report.insights.surface.is_empty());
    assert!(!report.insights.strategy.is_empty());
}
