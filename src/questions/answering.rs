use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::features::{hour_and_weekday, weekday_name};
use crate::patterns::{sample_factor, PatternFinding};
use crate::questions::{AnsweredQuestion, QuestionCategory, ScoredQuestion};
use crate::stats::{correlation, mean, median};
use crate::{format_float, round_to, ContentRecord};

const DEGRADED_CONFIDENCE: f64 = 0.3;
const MIN_ANSWER_CONFIDENCE: f64 = 0.1;
const MAX_ANSWER_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Serialize)]
pub struct PostDigest {
    pub id: String,
    pub title: String,
    pub engagement_score: i64,
    pub community: String,
}

/// Data slice handed to a single answer generator.
///
/// `scores`, `patterns` and `question` are always present. The optional
/// columns are filled only when the question declared the matching
/// requirement tag.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionContext {
    pub question: String,
    pub scores: Vec<i64>,
    pub patterns: Vec<PatternFinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<PostDigest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiments: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_counts: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<i64>>,
}

struct Answer {
    summary: String,
    evidence: Vec<String>,
    confidence: f64,
    insights: Vec<String>,
}

type AnswerResult = Result<Answer, String>;

pub fn extract_relevant_data_for_question(
    question: &ScoredQuestion,
    records: &[ContentRecord],
    patterns: &[PatternFinding],
) -> QuestionContext {
    let post_tags = ["posts", "content", "titles", "communities", "subreddits", "community"];
    let posts: Option<Vec<PostDigest>> = requires(question, &post_tags).then(|| {
        records
            .iter()
            .map(|record| PostDigest {
                id: record.id.clone(),
                title: record.title.clone(),
                engagement_score: record.engagement_score,
                community: record.community.clone(),
            })
            .collect()
    });
    let sentiments: Option<Vec<f64>> = requires(question, &["sentiment"])
        .then(|| records.iter().map(|record| record.sentiment_score).collect());
    let comment_counts: Option<Vec<u32>> = requires(question, &["comments", "comment_counts"])
        .then(|| records.iter().map(|record| record.comment_count).collect());
    let timestamps: Option<Vec<i64>> = requires(question, &["timestamps", "timing", "time"])
        .then(|| records.iter().map(|record| record.created_at).collect());

    QuestionContext {
        question: question.question.text.clone(),
        scores: records.iter().map(|record| record.engagement_score).collect(),
        patterns: patterns.to_vec(),
        posts,
        sentiments,
        comment_counts,
        timestamps,
    }
}

/// Answer every question in order. A failing question yields a degraded
/// answer; the batch always completes.
pub fn generate_question_answers(
    questions: &[ScoredQuestion],
    records: &[ContentRecord],
    patterns: &[PatternFinding],
) -> Vec<AnsweredQuestion> {
    questions
        .iter()
        .map(|question| {
            let context = extract_relevant_data_for_question(question, records, patterns);
            let category = question.question.category;
            let result = match category {
                QuestionCategory::Demographic => answer_demographic(&context),
                QuestionCategory::Behavioral => answer_behavioral(&context),
                QuestionCategory::Temporal => answer_temporal(&context),
                QuestionCategory::Cultural => answer_cultural(&context),
                QuestionCategory::General => answer_general(&context),
            };
            let answer = result.unwrap_or_else(|reason| {
                warn!(question_id = %question.question.id, reason = %reason, "question answer degraded");
                degraded_answer(category, &reason)
            });

            AnsweredQuestion {
                scored: question.clone(),
                summary: format!("{}: {}", category.title(), answer.summary),
                evidence: answer.evidence,
                confidence: round_to(answer.confidence, 3),
                insights: answer.insights,
            }
        })
        .collect()
}

fn requires(question: &ScoredQuestion, tags: &[&str]) -> bool {
    question
        .question
        .data_requirements
        .iter()
        .any(|req| tags.contains(&req.trim().to_lowercase().as_str()))
}

fn degraded_answer(category: QuestionCategory, reason: &str) -> Answer {
    Answer {
        summary: format!("could not be answered from the available data ({})", reason),
        evidence: Vec::new(),
        confidence: DEGRADED_CONFIDENCE,
        insights: vec![format!(
            "Collect more {} data before drawing conclusions",
            category.label()
        )],
    }
}

fn answer_confidence(samples: usize, signal: f64) -> f64 {
    (sample_factor(samples) * (0.5 + 0.5 * signal.abs()))
        .clamp(MIN_ANSWER_CONFIDENCE, MAX_ANSWER_CONFIDENCE)
}

fn answer_demographic(context: &QuestionContext) -> AnswerResult {
    let posts = context
        .posts
        .as_ref()
        .filter(|posts| !posts.is_empty())
        .ok_or_else(|| "no per-community posts in context".to_string())?;

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for post in posts {
        let community = match post.community.trim() {
            "" => "unlabeled",
            name => name,
        };
        groups
            .entry(community)
            .or_default()
            .push(post.engagement_score as f64);
    }

    let mut ranked: Vec<(&str, usize, f64)> = groups
        .iter()
        .map(|(community, scores)| (*community, scores.len(), mean(scores)))
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(b.0)));
    let (leader, leader_posts, leader_avg) = ranked[0];

    let mut evidence: Vec<String> = ranked
        .iter()
        .map(|(community, count, avg)| {
            format!("r/{}: {} posts, average engagement {}", community, count, format_float(*avg, 1))
        })
        .collect();

    let mut insights = vec![format!(
        "Members active in r/{} respond most strongly; tailor examples to them",
        leader
    )];
    let mut signal: f64 = 0.3;
    if let Some(comments) = context.comment_counts.as_ref() {
        let discussed = comments.iter().filter(|count| **count > 0).count();
        let share = discussed as f64 / comments.len().max(1) as f64;
        let r = correlation(comments, &context.scores);
        evidence.push(format!(
            "{:.0}% of posts draw comments; comments vs engagement r = {}",
            share * 100.0,
            format_float(r, 2)
        ));
        if r > 0.3 {
            insights.push("An active commenting core drives visibility for the wider audience".into());
        }
        signal = signal.max(r.abs());
    }

    let summary = if ranked.len() > 1 {
        format!(
            "r/{} leads {} communities with {} average engagement over {} posts",
            leader,
            ranked.len(),
            format_float(leader_avg, 1),
            leader_posts
        )
    } else {
        format!(
            "activity is concentrated in r/{} ({} posts, {} average engagement)",
            leader,
            leader_posts,
            format_float(leader_avg, 1)
        )
    };

    Ok(Answer {
        summary,
        evidence,
        confidence: answer_confidence(posts.len(), signal),
        insights,
    })
}

fn answer_behavioral(context: &QuestionContext) -> AnswerResult {
    if context.scores.is_empty() {
        return Err("no engagement scores in context".to_string());
    }

    let mut evidence: Vec<String> = Vec::new();
    let mut insights: Vec<String> = Vec::new();
    let mut signal: f64 = 0.0;

    if let Some(comments) = context.comment_counts.as_ref() {
        let r = correlation(comments, &context.scores);
        evidence.push(format!("comments vs engagement r = {}", format_float(r, 2)));
        signal = signal.max(r.abs());
        if r > 0.3 {
            insights.push("Posts that start conversations earn more engagement; invite replies".into());
        } else if r < -0.3 {
            insights.push("Heavily debated posts underperform; keep threads constructive".into());
        }
    }

    for finding in context.patterns.iter().take(3) {
        evidence.push(finding.description.clone());
        signal = signal.max(finding.confidence * 0.5);
    }

    let positive = context.scores.iter().filter(|score| **score > 0).count();
    let share = positive as f64 / context.scores.len() as f64;
    evidence.push(format!("{:.0}% of posts finish with positive engagement", share * 100.0));

    if insights.is_empty() {
        insights.push(match context.patterns.first() {
            Some(finding) => format!("Lean into the strongest observed pattern: {}", finding.description),
            None => "Engagement is spread evenly; experiment with post formats to find a driver".into(),
        });
    }

    let summary = format!(
        "{:.0}% of {} posts earn positive engagement, shaped by {} observed patterns",
        share * 100.0,
        context.scores.len(),
        context.patterns.len()
    );

    Ok(Answer {
        summary,
        evidence,
        confidence: answer_confidence(context.scores.len(), signal),
        insights,
    })
}

fn answer_temporal(context: &QuestionContext) -> AnswerResult {
    let timestamps = context
        .timestamps
        .as_ref()
        .filter(|stamps| stamps.iter().any(|ts| *ts > 0))
        .ok_or_else(|| "no timestamps in context".to_string())?;

    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for (ts, score) in timestamps.iter().zip(context.scores.iter()) {
        let (hour, day) = hour_and_weekday(*ts);
        by_hour.entry(hour).or_default().push(*score as f64);
        by_day.entry(day).or_default().push(*score as f64);
    }

    let best = |groups: &BTreeMap<u32, Vec<f64>>| {
        groups
            .iter()
            .map(|(key, scores)| (*key, mean(scores), scores.len()))
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
    };
    let (hour, hour_avg, hour_posts) =
        best(&by_hour).ok_or_else(|| "no scored timestamps".to_string())?;
    let (day, day_avg, _) = best(&by_day).ok_or_else(|| "no scored timestamps".to_string())?;

    let overall = mean(&context.scores.iter().map(|s| *s as f64).collect::<Vec<_>>());
    let lift = if overall.abs() > f64::EPSILON {
        (hour_avg - overall) / overall.abs()
    } else {
        0.0
    };

    let evidence = vec![
        format!(
            "{:02}:00 UTC averages {} engagement over {} posts",
            hour,
            format_float(hour_avg, 1),
            hour_posts
        ),
        format!("{} averages {} engagement", weekday_name(day), format_float(day_avg, 1)),
        format!("overall average engagement {}", format_float(overall, 1)),
    ];

    Ok(Answer {
        summary: format!(
            "posts around {:02}:00 UTC on {}s perform best",
            hour,
            weekday_name(day)
        ),
        evidence,
        confidence: answer_confidence(timestamps.len(), lift.min(1.0)) * 0.9,
        insights: vec![format!(
            "Schedule important posts near {:02}:00 UTC, favouring {}",
            hour,
            weekday_name(day)
        )],
    })
}

fn answer_cultural(context: &QuestionContext) -> AnswerResult {
    let sentiments = context
        .sentiments
        .as_ref()
        .ok_or_else(|| "no sentiment scores in context".to_string())?;
    let paired: Vec<(f64, f64)> = sentiments
        .iter()
        .zip(context.scores.iter())
        .filter(|(sentiment, _)| sentiment.is_finite())
        .map(|(sentiment, score)| (*sentiment, *score as f64))
        .collect();
    if paired.is_empty() {
        return Err("sentiment scores are unusable".to_string());
    }

    let tone: Vec<f64> = paired.iter().map(|(s, _)| *s).collect();
    let scores: Vec<f64> = paired.iter().map(|(_, e)| *e).collect();
    let r = correlation(&tone, &scores);
    let average_tone = mean(&tone);

    let positive: Vec<f64> = paired.iter().filter(|(s, _)| *s > 0.1).map(|(_, e)| *e).collect();
    let negative: Vec<f64> = paired.iter().filter(|(s, _)| *s < -0.1).map(|(_, e)| *e).collect();

    let mut evidence = vec![
        format!("average sentiment {}", format_float(average_tone, 2)),
        format!("sentiment vs engagement r = {}", format_float(r, 2)),
    ];
    if !positive.is_empty() {
        evidence.push(format!(
            "positive posts median engagement {}",
            format_float(median(&positive), 1)
        ));
    }
    if !negative.is_empty() {
        evidence.push(format!(
            "negative posts median engagement {}",
            format_float(median(&negative), 1)
        ));
    }

    let (summary, insight) = if r > 0.2 {
        (
            "the community rewards an upbeat, encouraging tone",
            "Frame contributions constructively; warmth is part of the culture",
        )
    } else if r < -0.2 {
        (
            "candid or critical posts resonate more than cheerful ones",
            "Do not shy away from honest criticism; the community values candour",
        )
    } else {
        (
            "tone matters less than substance here",
            "Focus on content quality over emotional framing",
        )
    };

    Ok(Answer {
        summary: summary.to_string(),
        evidence,
        confidence: answer_confidence(paired.len(), r),
        insights: vec![insight.to_string()],
    })
}

fn answer_general(context: &QuestionContext) -> AnswerResult {
    if context.scores.is_empty() {
        return Err("no records to summarise".to_string());
    }
    let scores: Vec<f64> = context.scores.iter().map(|s| *s as f64).collect();
    let strongest = context
        .patterns
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

    let mut evidence = vec![
        format!("{} posts analysed", scores.len()),
        format!(
            "mean engagement {}, median {}",
            format_float(mean(&scores), 1),
            format_float(median(&scores), 1)
        ),
    ];
    let insight = match strongest {
        Some(finding) => {
            evidence.push(finding.description.clone());
            format!("Prioritise this pattern: {}", finding.description)
        }
        None => "Gather more posts to surface a reliable pattern".to_string(),
    };

    Ok(Answer {
        summary: format!(
            "typical posts earn {} engagement (median)",
            format_float(median(&scores), 1)
        ),
        evidence,
        confidence: answer_confidence(
            scores.len(),
            strongest.map(|finding| finding.confidence).unwrap_or(0.0),
        ),
        insights: vec![insight],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::CandidateQuestion;
    use std::collections::BTreeSet;

    fn scored(category: QuestionCategory, requirements: &[&str]) -> ScoredQuestion {
        ScoredQuestion {
            question: CandidateQuestion {
                id: "q1".into(),
                text: "What happens?".into(),
                category,
                data_requirements: requirements.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
                expected_insights: vec![],
                raw_surprise_hint: None,
            },
            surprise_factor: 0.5,
            data_availability: 0.5,
            actionability: 0.5,
            composite_score: 0.5,
        }
    }

    #[test]
    fn context_only_includes_requested_columns() {
        let records = vec![ContentRecord {
            id: "a".into(),
            engagement_score: 3,
            created_at: 1_700_000_000,
            ..ContentRecord::default()
        }];
        let context = extract_relevant_data_for_question(
            &scored(QuestionCategory::Temporal, &["timestamps"]),
            &records,
            &[],
        );
        assert_eq!(context.scores, vec![3]);
        assert_eq!(context.timestamps, Some(vec![1_700_000_000]));
        assert!(context.posts.is_none());
        assert!(context.sentiments.is_none());
        assert!(context.comment_counts.is_none());
    }

    #[test]
    fn missing_column_degrades_single_answer() {
        let records = vec![ContentRecord {
            id: "a".into(),
            engagement_score: 3,
            ..ContentRecord::default()
        }];
        let answers = generate_question_answers(
            &[
                scored(QuestionCategory::Temporal, &["posts"]),
                scored(QuestionCategory::General, &["posts"]),
            ],
            &records,
            &[],
        );
        assert_eq!(answers.len(), 2);
        assert!(answers[0].confidence <= 0.5);
        assert!(answers[0].summary.starts_with("Temporal:"));
        assert!(!answers[0].insights.is_empty());
        assert!(answers[1].summary.starts_with("General:"));
    }
}
