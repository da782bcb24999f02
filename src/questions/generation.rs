use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::llm::{
    extract_json, CompletionOptions, LanguageModelClient, LlmError, QUESTION_GENERATION,
};
use crate::patterns::PatternFinding;
use crate::questions::{
    default_expected_insights, default_requirements, infer_question_category, normalize_words,
    CandidateQuestion, QuestionCategory,
};
use crate::stats::mean;
use crate::{clamp01, CommunityProfile, CommunityType, ContentRecord};

const MAX_PROMPT_PATTERNS: usize = 5;
const MAX_SAMPLE_TITLES: usize = 3;
const MIN_QUESTIONS: usize = 2;

/// Ask the language model for community-specific questions.
///
/// Never fails: a missing client, transport error, timeout, unparsable
/// response, or empty extraction all yield the two fallback questions for the
/// community type. A response with a single usable question is topped up
/// from the fallback set so at least two questions are always returned.
pub async fn generate_dynamic_questions(
    client: Option<&dyn LanguageModelClient>,
    records: &[ContentRecord],
    profile: &CommunityProfile,
    patterns: &[PatternFinding],
    options: &CompletionOptions,
) -> Vec<CandidateQuestion> {
    let kind = profile.primary_type;
    let Some(client) = client else {
        info!(
            community_type = kind.label(),
            reason = %LlmError::NotConfigured,
            "using fallback questions"
        );
        return generate_fallback_questions_by_type(kind, records);
    };

    let prompt = build_question_prompt(records, profile, patterns);
    debug!(prompt_chars = prompt.len(), "requesting generated questions");

    let response = match tokio::time::timeout(
        options.timeout,
        client.complete(&prompt, QUESTION_GENERATION, options),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout(options.timeout)),
    };

    match response.and_then(|raw| extract_questions_from_response(&raw)) {
        Ok(questions) if !questions.is_empty() => {
            info!(count = questions.len(), "generated questions from language model");
            top_up_with_fallback(questions, kind, records)
        }
        Ok(_) => {
            warn!("language model returned no usable questions, using fallback questions");
            generate_fallback_questions_by_type(kind, records)
        }
        Err(err) => {
            warn!(error = %err, "question generation failed, using fallback questions");
            generate_fallback_questions_by_type(kind, records)
        }
    }
}

fn top_up_with_fallback(
    mut questions: Vec<CandidateQuestion>,
    kind: CommunityType,
    records: &[ContentRecord],
) -> Vec<CandidateQuestion> {
    if questions.len() >= MIN_QUESTIONS {
        return questions;
    }
    let mut seen: HashSet<String> = questions.iter().map(|q| normalize_words(&q.text)).collect();
    for fallback in generate_fallback_questions_by_type(kind, records) {
        if questions.len() >= MIN_QUESTIONS {
            break;
        }
        if seen.insert(normalize_words(&fallback.text)) {
            questions.push(fallback);
        }
    }
    debug!(count = questions.len(), "topped up generated questions with fallbacks");
    questions
}

/// Normalize a raw model response onto [`CandidateQuestion`]s.
///
/// Accepts a `generated_questions` or `questions` array whose items are either
/// plain strings or objects carrying `question`/`text`. Missing categories are
/// inferred from the text; missing requirements and expected insights get
/// category defaults. Errors only when no JSON object can be parsed.
pub fn extract_questions_from_response(raw: &str) -> Result<Vec<CandidateQuestion>, LlmError> {
    let json =
        extract_json(raw).ok_or_else(|| LlmError::Parse("no JSON object found".to_string()))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|err| LlmError::Parse(format!("invalid JSON: {}", err)))?;

    let items = value
        .get("generated_questions")
        .or_else(|| value.get("questions"))
        .and_then(Value::as_array);
    let Some(items) = items else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    let mut questions = Vec::new();
    for item in items {
        let Some(question) = normalize_question(item, questions.len()) else {
            continue;
        };
        if seen.insert(normalize_words(&question.text)) {
            questions.push(question);
        }
    }
    Ok(questions)
}

fn normalize_question(item: &Value, index: usize) -> Option<CandidateQuestion> {
    let text = item
        .as_str()
        .or_else(|| first_str(item, &["question", "text"]))?
        .trim()
        .to_string();
    if text.is_empty() {
        return None;
    }

    let category = first_str(item, &["category", "type"])
        .and_then(QuestionCategory::from_str)
        .unwrap_or_else(|| infer_question_category(&text));

    let mut data_requirements: BTreeSet<String> =
        string_list(item, &["data_requirements", "dataRequirements"])
            .into_iter()
            .map(|tag| tag.to_lowercase())
            .collect();
    if data_requirements.is_empty() {
        data_requirements = default_requirements(category);
    }

    let mut expected_insights = string_list(item, &["expected_insights", "expectedInsights"]);
    if expected_insights.is_empty() {
        expected_insights = default_expected_insights(category);
    }

    let raw_surprise_hint = ["surprise_factor", "surpriseFactor", "surprise"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_f64))
        .map(clamp01);

    Some(CandidateQuestion {
        id: format!("generated_{}", index + 1),
        text,
        category,
        data_requirements,
        expected_insights,
        raw_surprise_hint,
    })
}

fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| item.get(*key).and_then(Value::as_str))
}

fn string_list(item: &Value, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|key| item.get(*key)) else {
        return Vec::new();
    };
    let values: Vec<&str> = match value {
        Value::String(single) => vec![single.as_str()],
        Value::Array(entries) => entries.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    values
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn build_question_prompt(
    records: &[ContentRecord],
    profile: &CommunityProfile,
    patterns: &[PatternFinding],
) -> String {
    let (role, focus) = match profile.primary_type {
        CommunityType::Dating => (
            "a social researcher studying identity-driven dating communities",
            "how members present themselves, what vulnerability earns support, and where performance backfires",
        ),
        CommunityType::Product => (
            "a product insights analyst",
            "purchase decisions, comparisons between products, and which experiences members trust",
        ),
        CommunityType::Hobby => (
            "an analyst of skill-based hobby communities",
            "how members learn, what project showcases earn attention, and how beginners are welcomed",
        ),
        CommunityType::Support => (
            "a researcher of peer-support communities",
            "help-seeking, empathy, and which responses make members feel heard",
        ),
        CommunityType::News | CommunityType::General => (
            "a community analyst",
            "what the community rewards, how discussion unfolds, and what changes over time",
        ),
    };

    let notable = if patterns.is_empty() {
        "- none detected yet".to_string()
    } else {
        let mut ranked: Vec<&PatternFinding> = patterns.iter().collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
            .iter()
            .take(MAX_PROMPT_PATTERNS)
            .map(|pattern| {
                format!(
                    "- {} (confidence {:.2})",
                    pattern.description, pattern.confidence
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are {role}.
Community type: {kind} (classification confidence {confidence:.2}).
Focus on {focus}.

Data summary:
{summary}

Notable patterns:
{notable}

Generate 5 surprising, answerable questions about this community.
Return a single JSON object, no markdown or commentary:
{{"generated_questions": [{{"question": "...", "category": "demographic|behavioral|temporal|cultural|general", "data_requirements": ["posts", "sentiment", "comments", "timestamps", "engagement", "communities"], "expected_insights": ["..."], "surprise_factor": 0.0}}]}}
"#,
        role = role,
        kind = profile.primary_type.label(),
        confidence = profile.confidence,
        focus = focus,
        summary = summarize_records(records),
        notable = notable,
    )
}

fn summarize_records(records: &[ContentRecord]) -> String {
    if records.is_empty() {
        return "- no records available".to_string();
    }

    let engagement: Vec<f64> = records.iter().map(|r| r.engagement_score as f64).collect();
    let sentiment: Vec<f64> = records.iter().map(|r| r.sentiment_score).collect();
    let comments: Vec<f64> = records.iter().map(|r| r.comment_count as f64).collect();

    let mut communities: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.community.is_empty()) {
        *communities.entry(record.community.as_str()).or_insert(0) += 1;
    }
    let community_list = if communities.is_empty() {
        "unknown".to_string()
    } else {
        communities
            .iter()
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut top: Vec<&ContentRecord> = records.iter().collect();
    top.sort_by(|a, b| b.engagement_score.cmp(&a.engagement_score));
    let titles = top
        .iter()
        .take(MAX_SAMPLE_TITLES)
        .map(|record| {
            let title: String = record.title.chars().take(80).collect();
            format!("  * \"{}\" (engagement {})", title, record.engagement_score)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "- posts analyzed: {}\n- communities: {}\n- average engagement: {:.1}\n- average sentiment: {:.2}\n- average comments: {:.1}\n- top posts:\n{}",
        records.len(),
        community_list,
        mean(&engagement),
        mean(&sentiment),
        mean(&comments),
        titles
    )
}

/// Two deterministic questions per community type, ids `fallback_{type}_{n}`.
pub fn generate_fallback_questions_by_type(
    kind: CommunityType,
    records: &[ContentRecord],
) -> Vec<CandidateQuestion> {
    let scope = dominant_community(records)
        .map(|name| format!("r/{}", name))
        .unwrap_or_else(|| "this community".to_string());

    let templates: [(QuestionCategory, String, &[&str], &str); 2] = match kind {
        CommunityType::Dating => [
            (
                QuestionCategory::Cultural,
                format!("Does vulnerability or self-promotion earn more support in {}?", scope),
                &["posts", "sentiment", "engagement"],
                "Whether authentic storytelling outperforms polished self-presentation",
            ),
            (
                QuestionCategory::Behavioral,
                format!("What drives members of {} to reply rather than just upvote?", scope),
                &["posts", "comments", "engagement"],
                "Which post styles spark conversation instead of passive approval",
            ),
        ],
        CommunityType::Product => [
            (
                QuestionCategory::Behavioral,
                format!("Do comparison posts out-engage single-product reviews in {}?", scope),
                &["posts", "engagement"],
                "Whether comparative framing is what members value most",
            ),
            (
                QuestionCategory::Cultural,
                format!("How does negative sentiment about a product shape engagement in {}?", scope),
                &["sentiment", "engagement"],
                "Whether critical reviews are rewarded or punished",
            ),
        ],
        CommunityType::Hobby => [
            (
                QuestionCategory::Behavioral,
                format!("Which tutorial or skill-sharing posts earn the most engagement in {}?", scope),
                &["posts", "comments", "engagement"],
                "What teaching formats the community rewards",
            ),
            (
                QuestionCategory::Temporal,
                format!("When do project showcases in {} get the strongest response?", scope),
                &["timestamps", "engagement"],
                "Best posting windows for showcase content",
            ),
        ],
        CommunityType::Support => [
            (
                QuestionCategory::Cultural,
                format!("Which tone of post receives the most empathetic responses in {}?", scope),
                &["posts", "sentiment", "comments"],
                "How emotional openness relates to community support",
            ),
            (
                QuestionCategory::Temporal,
                format!("At what times do help requests in {} get answered most?", scope),
                &["timestamps", "comments"],
                "When members are most available to help each other",
            ),
        ],
        CommunityType::News | CommunityType::General => [
            (
                QuestionCategory::General,
                format!("What separates the top posts in {} from the rest?", scope),
                &["posts", "engagement"],
                "Content traits shared by the highest performers",
            ),
            (
                QuestionCategory::Temporal,
                format!("How has engagement in {} shifted over time?", scope),
                &["timestamps", "engagement"],
                "Whether the community is growing, stable, or cooling off",
            ),
        ],
    };

    templates
        .into_iter()
        .enumerate()
        .map(|(index, (category, text, requirements, insight))| CandidateQuestion {
            id: format!("fallback_{}_{}", kind.label(), index + 1),
            text,
            category,
            data_requirements: requirements.iter().map(|tag| tag.to_string()).collect(),
            expected_insights: vec![insight.to_string()],
            raw_surprise_hint: None,
        })
        .collect()
}

fn dominant_community(records: &[ContentRecord]) -> Option<&str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.community.trim().is_empty()) {
        *counts.entry(record.community.trim()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(name, _)| name)
}
