use chrono::{DateTime, Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::ContentRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFeatures {
    pub title_length: usize,
    pub body_length: usize,
    pub has_question: bool,
    pub has_links: bool,
    pub has_emojis: bool,
    pub has_list: bool,
    pub sentiment_score: f64,
    pub hour_of_day: u32,
    /// 0 = Monday.
    pub day_of_week: u32,
}

pub fn extract_features(record: &ContentRecord) -> ContentFeatures {
    let title = record.title.as_str();
    let body = record.body.as_str();
    let (hour_of_day, day_of_week) = hour_and_weekday(record.created_at);

    ContentFeatures {
        title_length: title.chars().count(),
        body_length: body.chars().count(),
        has_question: title.contains('?') || body.contains('?'),
        has_links: has_link(title) || has_link(body),
        has_emojis: title.chars().chain(body.chars()).any(is_pictographic),
        has_list: has_list_markup(body),
        sentiment_score: record.sentiment_score,
        hour_of_day,
        day_of_week,
    }
}

/// UTC hour and weekday of an epoch timestamp. Out-of-range values map to the epoch.
pub fn hour_and_weekday(created_at: i64) -> (u32, u32) {
    DateTime::from_timestamp(created_at, 0)
        .map(|dt| (dt.hour(), dt.weekday().num_days_from_monday()))
        .unwrap_or((0, 3))
}

pub fn weekday_name(day: u32) -> &'static str {
    match day {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}

fn has_link(text: &str) -> bool {
    let lowercase = text.to_lowercase();
    ["http://", "https://", "www."]
        .iter()
        .any(|needle| lowercase.contains(needle))
}

fn is_pictographic(ch: char) -> bool {
    matches!(
        ch as u32,
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B00..=0x2BFF | 0xFE0F
    )
}

fn has_list_markup(text: &str) -> bool {
    text.lines().map(str::trim_start).any(|line| {
        if line.starts_with("- ") || line.starts_with("* ") || line.starts_with("• ") {
            return true;
        }
        let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
        digits > 0 && matches!(line[digits..].chars().next(), Some('.') | Some(')'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_numbered_and_bulleted_lists() {
        assert!(has_list_markup("intro\n1. first\n2. second"));
        assert!(has_list_markup("  - item"));
        assert!(!has_list_markup("2024 was a good year"));
    }

    #[test]
    fn epoch_maps_to_thursday_midnight() {
        assert_eq!(hour_and_weekday(0), (0, 3));
        // 2024-01-01T15:00:00Z was a Monday.
        assert_eq!(hour_and_weekday(1_704_121_200), (15, 0));
    }
}
