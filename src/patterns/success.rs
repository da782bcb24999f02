use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CohortConfig;
use crate::features::{extract_features, weekday_name};
use crate::patterns::{sample_factor, top_cohort, PatternFinding, PatternType};
use crate::stats::{mean, percentile, std_dev};
use crate::{round_to, ContentRecord};

/// Floor used when the cohort carries no length signal at all.
const MIN_LENGTH_CONFIDENCE: f64 = 0.1;
const MAX_LENGTH_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthPattern {
    pub optimal_min: usize,
    pub optimal_max: usize,
    pub average_length: f64,
    pub confidence: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingPattern {
    /// UTC hours, strongest first.
    pub best_hours: Vec<u32>,
    pub best_days: Vec<String>,
    pub confidence: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatUsage {
    pub format: String,
    pub count: usize,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatPattern {
    /// Markers present in the cohort, most frequent first.
    pub ranked: Vec<FormatUsage>,
    pub confidence: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighPerformingAnalysis {
    pub patterns: Vec<PatternFinding>,
    pub optimal_length: LengthPattern,
    pub best_timing: TimingPattern,
    pub effective_formats: FormatPattern,
    pub cohort_size: usize,
    pub engagement_threshold: Option<i64>,
}

pub fn analyze_high_performing_content(records: &[ContentRecord]) -> HighPerformingAnalysis {
    analyze_high_performing_content_with_config(records, &CohortConfig::default())
}

pub fn analyze_high_performing_content_with_config(
    records: &[ContentRecord],
    cohorts: &CohortConfig,
) -> HighPerformingAnalysis {
    let cohort = top_cohort(records, cohorts.top_fraction);

    let optimal_length = analyze_length_patterns(cohort.iter().copied());
    let best_timing = analyze_timing_patterns(cohort.iter().copied());
    let effective_formats = analyze_format_patterns(cohort.iter().copied());

    let mut patterns = Vec::new();
    if !cohort.is_empty() {
        patterns.push(length_finding(&optimal_length));
        if let Some(finding) = timing_finding(&best_timing) {
            patterns.push(finding);
        }
        if let Some(finding) = format_finding(&effective_formats) {
            patterns.push(finding);
        }
        patterns.push(elements_finding(records, &cohort));
    }

    HighPerformingAnalysis {
        patterns,
        optimal_length,
        best_timing,
        effective_formats,
        cohort_size: cohort.len(),
        engagement_threshold: cohort.last().map(|record| record.engagement_score),
    }
}

pub fn analyze_length_patterns<'a>(
    records: impl IntoIterator<Item = &'a ContentRecord>,
) -> LengthPattern {
    let mut lengths: Vec<f64> = records
        .into_iter()
        .map(|record| record.content_length() as f64)
        .collect();
    let sample_size = lengths.len();

    if lengths.iter().all(|length| *length == 0.0) {
        return LengthPattern {
            optimal_min: 0,
            optimal_max: 0,
            average_length: 0.0,
            confidence: MIN_LENGTH_CONFIDENCE,
            sample_size,
        };
    }

    lengths.sort_by(|a, b| a.total_cmp(b));
    let average_length = mean(&lengths);
    let variation = std_dev(&lengths) / average_length;
    let confidence = (sample_factor(sample_size) / (1.0 + variation))
        .clamp(MIN_LENGTH_CONFIDENCE, MAX_LENGTH_CONFIDENCE);

    LengthPattern {
        optimal_min: percentile(&lengths, 0.25).round() as usize,
        optimal_max: percentile(&lengths, 0.75).round() as usize,
        average_length: round_to(average_length, 1),
        confidence: round_to(confidence, 3),
        sample_size,
    }
}

pub fn analyze_timing_patterns<'a>(
    records: impl IntoIterator<Item = &'a ContentRecord>,
) -> TimingPattern {
    let mut by_hour: BTreeMap<u32, i64> = BTreeMap::new();
    let mut by_day: BTreeMap<u32, i64> = BTreeMap::new();
    let mut sample_size = 0usize;

    for record in records {
        let features = extract_features(record);
        let engagement = record.engagement_score.max(0);
        *by_hour.entry(features.hour_of_day).or_insert(0) += engagement;
        *by_day.entry(features.day_of_week).or_insert(0) += engagement;
        sample_size += 1;
    }

    let best_hours: Vec<u32> = strongest(&by_hour, 3);
    let best_days: Vec<String> = strongest(&by_day, 2)
        .into_iter()
        .map(|day| weekday_name(day).to_string())
        .collect();

    let total: i64 = by_hour.values().sum();
    let concentration = if total > 0 {
        best_hours
            .iter()
            .map(|hour| by_hour.get(hour).copied().unwrap_or(0))
            .sum::<i64>() as f64
            / total as f64
    } else {
        0.0
    };

    TimingPattern {
        best_hours,
        best_days,
        confidence: round_to(sample_factor(sample_size) * concentration, 3),
        sample_size,
    }
}

pub fn analyze_format_patterns<'a>(
    records: impl IntoIterator<Item = &'a ContentRecord>,
) -> FormatPattern {
    let mut counts = [0usize; 4];
    let mut sample_size = 0usize;

    for record in records {
        let features = extract_features(record);
        let flags = [
            features.has_list,
            features.has_links,
            features.has_question,
            features.has_emojis,
        ];
        for (count, flag) in counts.iter_mut().zip(flags) {
            if flag {
                *count += 1;
            }
        }
        sample_size += 1;
    }

    let mut ranked: Vec<FormatUsage> = ["lists", "links", "questions", "emojis"]
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(format, count)| FormatUsage {
            format: format.to_string(),
            count,
            frequency: round_to(count as f64 / sample_size as f64, 3),
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));

    let confidence = ranked
        .first()
        .map(|top| sample_factor(sample_size) * top.frequency)
        .unwrap_or(0.0);

    FormatPattern {
        ranked,
        confidence: round_to(confidence, 3),
        sample_size,
    }
}

fn strongest(totals: &BTreeMap<u32, i64>, limit: usize) -> Vec<u32> {
    let mut entries: Vec<(u32, i64)> = totals
        .iter()
        .filter(|(_, total)| **total > 0)
        .map(|(key, total)| (*key, *total))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries.into_iter().take(limit).map(|(key, _)| key).collect()
}

fn length_finding(pattern: &LengthPattern) -> PatternFinding {
    let description = if pattern.optimal_max == 0 {
        "Top performers carry no measurable text; length is not a signal here".to_string()
    } else {
        format!(
            "Top performers run {}-{} characters of title and body",
            pattern.optimal_min, pattern.optimal_max
        )
    };
    PatternFinding {
        pattern_type: PatternType::ContentLength,
        description,
        evidence: vec![
            format!("average length {:.0} characters", pattern.average_length),
            format!("{} posts in the top cohort", pattern.sample_size),
        ],
        confidence: pattern.confidence,
    }
}

fn timing_finding(pattern: &TimingPattern) -> Option<PatternFinding> {
    if pattern.best_hours.is_empty() {
        return None;
    }
    let hours = pattern
        .best_hours
        .iter()
        .map(|hour| format!("{:02}:00", hour))
        .collect::<Vec<_>>()
        .join(", ");
    Some(PatternFinding {
        pattern_type: PatternType::Timing,
        description: format!("Strongest posting windows (UTC): {}", hours),
        evidence: vec![format!("best days: {}", pattern.best_days.join(", "))],
        confidence: pattern.confidence,
    })
}

fn format_finding(pattern: &FormatPattern) -> Option<PatternFinding> {
    let top = pattern.ranked.first()?;
    Some(PatternFinding {
        pattern_type: PatternType::Formatting,
        description: format!(
            "{} appear in {:.0}% of top-performing posts",
            capitalize(&top.format),
            top.frequency * 100.0
        ),
        evidence: pattern
            .ranked
            .iter()
            .map(|usage| format!("{}: {}/{}", usage.format, usage.count, pattern.sample_size))
            .collect(),
        confidence: pattern.confidence,
    })
}

fn elements_finding(records: &[ContentRecord], cohort: &[&ContentRecord]) -> PatternFinding {
    let overall: Vec<f64> = records.iter().map(|r| r.comment_count as f64).collect();
    let top: Vec<f64> = cohort.iter().map(|r| r.comment_count as f64).collect();
    let overall_avg = mean(&overall);
    let top_avg = mean(&top);
    let lift = if overall_avg > 0.0 { top_avg / overall_avg } else { 1.0 };

    PatternFinding {
        pattern_type: PatternType::Elements,
        description: format!(
            "Top posts draw {:.1} comments on average versus {:.1} overall",
            top_avg, overall_avg
        ),
        evidence: vec![format!("discussion lift {:.2}x", lift)],
        confidence: round_to(sample_factor(cohort.len()) * (lift / 2.0).min(1.0), 3),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
