pub mod failure;
pub mod success;

use serde::{Deserialize, Serialize};

use crate::ContentRecord;

pub use failure::{
    analyze_failure_patterns, analyze_failure_patterns_with_config, identify_common_mistakes,
    identify_rejection_triggers, CommonMistake, DownvotePattern, FailureAnalysis,
    RejectionTrigger,
};
pub use success::{
    analyze_format_patterns, analyze_high_performing_content,
    analyze_high_performing_content_with_config, analyze_length_patterns, analyze_timing_patterns,
    FormatPattern, FormatUsage, HighPerformingAnalysis, LengthPattern, TimingPattern,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    ContentLength,
    Timing,
    Formatting,
    Elements,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternFinding {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub description: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// Share of the cohort needed before a finding counts as well supported.
pub(crate) fn sample_factor(size: usize) -> f64 {
    (size as f64 / 10.0).min(1.0)
}

pub(crate) fn cohort_len(total: usize, fraction: f64) -> usize {
    if total == 0 {
        return 0;
    }
    ((total as f64 * fraction.max(0.0).min(1.0)).ceil() as usize).clamp(1, total)
}

/// Highest-engagement `fraction` of the records, best first.
pub fn top_cohort(records: &[ContentRecord], fraction: f64) -> Vec<&ContentRecord> {
    let mut ranked: Vec<&ContentRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.engagement_score.cmp(&a.engagement_score));
    ranked.truncate(cohort_len(records.len(), fraction));
    ranked
}

/// Non-positive records plus the lowest-engagement `fraction`, worst first.
pub fn bottom_cohort(records: &[ContentRecord], fraction: f64) -> Vec<&ContentRecord> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|idx| records[*idx].engagement_score);
    let quota = cohort_len(records.len(), fraction);
    order
        .into_iter()
        .enumerate()
        .filter(|(rank, idx)| *rank < quota || records[*idx].engagement_score <= 0)
        .map(|(_, idx)| &records[idx])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, score: i64) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            engagement_score: score,
            ..ContentRecord::default()
        }
    }

    #[test]
    fn bottom_cohort_includes_every_non_positive_record() {
        let records = vec![
            record("a", 50),
            record("b", -3),
            record("c", 0),
            record("d", 12),
            record("e", 7),
            record("f", 30),
            record("g", 9),
            record("h", 40),
        ];
        let ids: Vec<&str> = bottom_cohort(&records, 0.25)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);

        let ids: Vec<&str> = bottom_cohort(&records, 0.5)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c", "e", "g"]);
    }

    #[test]
    fn top_cohort_keeps_at_least_one_record() {
        let records = vec![record("a", 1), record("b", 2)];
        let top = top_cohort(&records, 0.1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, "b");
    }
}
