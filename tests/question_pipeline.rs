mod common;

use common::{hobby_records, short_timeout, Script, ScriptedClient, GENERATED_RESPONSE};
use insight_engine::config::QuestionWeights;
use insight_engine::llm::{CompletionOptions, LanguageModelClient, LlmError};
use insight_engine::questions::scoring::data_availability;
use insight_engine::questions::{
    extract_questions_from_response, generate_dynamic_questions,
    generate_fallback_questions_by_type, generate_question_answers, infer_question_category,
    score_questions, CandidateQuestion, QuestionCategory, SurpriseSignals, MAX_SCORED_QUESTIONS,
};
use insight_engine::{CommunityProfile, CommunityType};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

fn candidate(id: &str, text: &str, category: QuestionCategory, requirements: &[&str]) -> CandidateQuestion {
    CandidateQuestion {
        id: id.to_string(),
        text: text.to_string(),
        category,
        data_requirements: requirements.iter().map(|tag| tag.to_string()).collect(),
        expected_insights: vec!["How to improve engagement".to_string()],
        raw_surprise_hint: None,
    }
}

fn assert_fallback(questions: &[CandidateQuestion]) {
    assert!(questions.len() >= 2);
    let ids: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids.len(), questions.len());
    assert!(questions.iter().all(|q| q.id.contains("fallback")));
}

#[test]
fn category_rules_classify_free_text() {
    let cases = [
        ("When do posts perform best?", QuestionCategory::Temporal),
        ("Which hours see the most replies?", QuestionCategory::Temporal),
        ("Who are the most active members?", QuestionCategory::Demographic),
        ("How do newcomers differ from veterans?", QuestionCategory::Demographic),
        ("What drives people to comment?", QuestionCategory::Behavioral),
        ("Does engagement follow effort?", QuestionCategory::Behavioral),
        ("What values does the community share?", QuestionCategory::Cultural),
        ("Which cultural norms shape feedback?", QuestionCategory::Cultural),
        ("Which tools are popular?", QuestionCategory::General),
    ];
    for (text, expected) in cases {
        assert_eq!(infer_question_category(text), expected, "{}", text);
    }
}

#[test]
fn extraction_tolerates_fences_and_mixed_items() {
    let questions = extract_questions_from_response(GENERATED_RESPONSE).expect("parsed");
    assert_eq!(questions.len(), 3);

    assert_eq!(questions[0].id, "generated_1");
    assert_eq!(questions[0].category, QuestionCategory::Temporal);
    assert_eq!(questions[0].raw_surprise_hint, Some(0.8));

    assert_eq!(questions[1].category, QuestionCategory::Demographic);
    assert!(questions[1].data_requirements.contains("comments"));
    assert_eq!(questions[1].raw_surprise_hint, None);

    assert_eq!(questions[2].category, QuestionCategory::Cultural);
    assert!(!questions[2].data_requirements.is_empty());
    assert!(!questions[2].expected_insights.is_empty());
}

#[test]
fn extraction_accepts_questions_key_and_drops_duplicates() {
    let raw = r#"{"questions": [{"question": "Why do guides win?"}, {"question": "why do guides WIN"}, {"question": "  "}]}"#;
    let questions = extract_questions_from_response(raw).expect("parsed");
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].category, QuestionCategory::General);
}

#[test]
fn extraction_rejects_text_without_json() {
    assert!(matches!(
        extract_questions_from_response("I cannot help with that."),
        Err(LlmError::Parse(_))
    ));
    assert!(extract_questions_from_response(r#"{"answer": 42}"#)
        .expect("parsed")
        .is_empty());
}

#[test]
fn fallback_questions_are_complete_for_every_type() {
    let records = hobby_records();
    for kind in CommunityType::ALL {
        let questions = generate_fallback_questions_by_type(kind, &records);
        assert_eq!(questions.len(), 2, "{:?}", kind);
        assert_fallback(&questions);
        for question in &questions {
            assert!(question.id.starts_with(&format!("fallback_{}_", kind.label())));
            assert!(!question.text.is_empty());
            assert!(!question.data_requirements.is_empty());
            assert!(!question.expected_insights.is_empty());
        }
    }
    let hobby = generate_fallback_questions_by_type(CommunityType::Hobby, &records);
    assert!(hobby[0].text.contains("r/3dprinting") || hobby[0].text.contains("r/woodworking"));
    let anonymous = generate_fallback_questions_by_type(CommunityType::News, &[]);
    assert!(anonymous[0].text.contains("this community"));
}

#[tokio::test]
async fn generation_uses_model_questions_when_usable() {
    let records = hobby_records();
    let profile = CommunityProfile::new(CommunityType::Hobby, 0.85);
    let client = ScriptedClient::responding(GENERATED_RESPONSE);

    let questions = generate_dynamic_questions(
        Some(&client as &dyn LanguageModelClient),
        &records,
        &profile,
        &[],
        &CompletionOptions::default(),
    )
    .await;
    assert_eq!(client.calls(), 1);
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q.id.starts_with("generated_")));
}

#[tokio::test]
async fn generation_falls_back_on_failure_garbage_and_timeout() {
    let records = hobby_records();
    let profile = CommunityProfile::new(CommunityType::Support, 0.7);
    let clients = [
        ScriptedClient::new(Script::Fail),
        ScriptedClient::responding("sorry, no JSON today"),
        ScriptedClient::responding(r#"{"generated_questions": []}"#),
        ScriptedClient::new(Script::Delay(
            Duration::from_secs(5),
            GENERATED_RESPONSE.to_string(),
        )),
    ];

    for client in &clients {
        let questions = generate_dynamic_questions(
            Some(client as &dyn LanguageModelClient),
            &records,
            &profile,
            &[],
            &short_timeout(),
        )
        .await;
        assert_fallback(&questions);
        assert!(questions.iter().all(|q| q.id.starts_with("fallback_support_")));
        assert_eq!(client.calls(), 1);
    }

    let offline =
        generate_dynamic_questions(None, &records, &profile, &[], &short_timeout()).await;
    assert_fallback(&offline);
}

#[tokio::test]
async fn single_generated_question_is_topped_up() {
    let records = hobby_records();
    let profile = CommunityProfile::new(CommunityType::Hobby, 0.85);
    let responses = [
        r#"{"questions": [{"question": "Why do guides win?"}]}"#,
        r#"{"questions": ["Why do guides win?", "why do guides WIN", "  "]}"#,
    ];

    for raw in responses {
        let client = ScriptedClient::responding(raw);
        let questions = generate_dynamic_questions(
            Some(&client as &dyn LanguageModelClient),
            &records,
            &profile,
            &[],
            &CompletionOptions::default(),
        )
        .await;

        assert_eq!(questions.len(), 2, "{}", raw);
        let ids: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), questions.len());
        assert_eq!(questions[0].id, "generated_1");
        assert_eq!(questions[0].text, "Why do guides win?");
        assert!(questions[1].id.starts_with("fallback_hobby_"));
    }
}

#[test]
fn scoring_truncates_and_sorts() {
    let records = hobby_records();
    let texts = [
        "Why do surprising tutorials outperform showcases despite fewer photos?",
        "How should beginners format their first post?",
        "When is the best time to post?",
        "Who comments the most?",
        "What values matter here?",
        "Which tools are popular?",
        "How can we improve replies and boost engagement?",
        "Does sentiment matter?",
        "Is there a hidden pattern in failed prints?",
        "What drives people to comment?",
        "What should new members avoid?",
        "Which tips grow a following?",
    ];
    let questions: Vec<CandidateQuestion> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let category = infer_question_category(text);
            candidate(&format!("q{}", i), text, category, &["posts", "engagement"])
        })
        .collect();

    let scored = score_questions(&questions, &records);
    assert_eq!(scored.len(), MAX_SCORED_QUESTIONS);
    assert!(scored
        .windows(2)
        .all(|pair| pair[0].composite_score >= pair[1].composite_score));
    for entry in &scored {
        for value in [
            entry.surprise_factor,
            entry.data_availability,
            entry.actionability,
            entry.composite_score,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
    }

    assert!(score_questions(&[], &records).is_empty());
}

#[test]
fn model_hint_blends_with_lexical_surprise() {
    let weights = QuestionWeights::default();
    let blended = SurpriseSignals {
        model_hint: Some(1.0),
        lexical: 0.2,
    }
    .combine(&weights);
    assert!((blended - 0.6).abs() < 1e-9);

    let lexical_only = SurpriseSignals {
        model_hint: None,
        lexical: 0.45,
    }
    .combine(&weights);
    assert!((lexical_only - 0.45).abs() < 1e-9);
}

#[test]
fn availability_counts_resolvable_requirements() {
    let records = hobby_records();
    let tags = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<BTreeSet<_>>();

    assert_eq!(data_availability(&BTreeSet::new(), &records), 0.5);
    assert_eq!(data_availability(&tags(&["posts", "comments"]), &records), 1.0);
    assert_eq!(data_availability(&tags(&["posts", "moon_phase"]), &records), 0.5);
    assert_eq!(data_availability(&tags(&["posts"]), &[]), 0.0);
}

#[test]
fn answers_cover_every_category() {
    let records = hobby_records();
    let questions = vec![
        candidate("d", "Who engages?", QuestionCategory::Demographic, &["communities", "comments"]),
        candidate("b", "What drives replies?", QuestionCategory::Behavioral, &["posts", "comments"]),
        candidate("t", "When to post?", QuestionCategory::Temporal, &["timestamps"]),
        candidate("c", "Which values?", QuestionCategory::Cultural, &["sentiment"]),
        candidate("g", "What works?", QuestionCategory::General, &["posts"]),
    ];
    let scored = score_questions(&questions, &records);
    let answers = generate_question_answers(&scored, &records, &[]);

    assert_eq!(answers.len(), scored.len());
    for answer in &answers {
        let title = answer.scored.question.category.title();
        assert!(answer.summary.starts_with(title), "{}", answer.summary);
        assert!(!answer.insights.is_empty());
        assert!(!answer.evidence.is_empty());
        assert!((0.1..=0.95).contains(&answer.confidence), "{}", answer.summary);
    }
}

#[test]
fn unanswerable_question_degrades_alone() {
    let records = hobby_records();
    let questions = vec![
        candidate("c", "Which values?", QuestionCategory::Cultural, &["posts"]),
        candidate("g", "What works?", QuestionCategory::General, &["posts"]),
    ];
    let scored = score_questions(&questions, &records);
    let answers = generate_question_answers(&scored, &records, &[]);

    assert_eq!(answers.len(), 2);
    let cultural = answers
        .iter()
        .find(|a| a.scored.question.id == "c")
        .expect("cultural answer");
    assert!(cultural.confidence <= 0.5);
    assert!(!cultural.insights.is_empty());
    let general = answers
        .iter()
        .find(|a| a.scored.question.id == "g")
        .expect("general answer");
    assert!(general.confidence > cultural.confidence);
}
