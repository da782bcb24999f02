use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{round_to, ContentRecord};

/// Fixed origin so the same seed always yields the same timestamps.
const BASE_TIMESTAMP: i64 = 1_700_000_000;
const DEFAULT_COMMUNITY: &str = "community";

const TOPICS: [&str; 8] = [
    "my first build",
    "a beginner setup",
    "weekly progress",
    "a tricky problem",
    "tools I rely on",
    "lessons from a failed attempt",
    "a budget alternative",
    "long-term results",
];

const OPENERS: [&str; 5] = [
    "Finally finished",
    "Need advice on",
    "Step-by-step guide to",
    "What I learned from",
    "Honest thoughts on",
];

pub fn generate_synthetic_records(
    count: usize,
    seed: u64,
    communities: &[&str],
) -> Vec<ContentRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(count);
    let mut timestamp = BASE_TIMESTAMP;

    for idx in 0..count {
        let community = if communities.is_empty() {
            DEFAULT_COMMUNITY
        } else {
            communities[rng.gen_range(0..communities.len())]
        };
        let opener = OPENERS[rng.gen_range(0..OPENERS.len())];
        let topic = TOPICS[rng.gen_range(0..TOPICS.len())];
        let asks = rng.gen::<f64>() < 0.3;
        let title = format!("{} {}{}", opener, topic, if asks { "?" } else { "" });

        let body = sample_body(&mut rng, topic);
        let sentiment_score: f64 = round_to(rng.gen_range(-0.6..0.9), 3);
        let structure_bonus = if body.contains("\n- ") { 1.5 } else { 1.0 };
        let tone_bonus = 1.0 + sentiment_score.max(0.0) * 0.5;
        let base: f64 = rng.gen_range(-5.0..60.0);
        let engagement_score = (base * structure_bonus * tone_bonus).round() as i64;
        let reply_rate: f64 = rng.gen_range(0.05..0.6);
        let comment_count = (engagement_score.max(0) as f64 * reply_rate).round() as u32;

        timestamp += rng.gen_range(1_800..14_400);
        records.push(ContentRecord {
            id: format!("synthetic_{}", idx),
            title,
            body,
            engagement_score,
            comment_count,
            sentiment_score,
            community: community.to_string(),
            created_at: timestamp,
        });
    }

    records
}

fn sample_body(rng: &mut StdRng, topic: &str) -> String {
    match rng.gen_range(0..4) {
        0 => String::new(),
        1 => format!("Quick note about {}.", topic),
        2 => format!(
            "Here is what worked for {}:\n- plan the first week\n- keep notes\n- ask for feedback early",
            topic
        ),
        _ => format!(
            "I spent a month on {} and want to share the details, including what went wrong, \
             what I would change and where to find better resources. More at https://example.com/notes",
            topic
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_records() {
        let a = generate_synthetic_records(12, 7, &["woodworking", "3dprinting"]);
        let b = generate_synthetic_records(12, 7, &["woodworking", "3dprinting"]);
        assert_eq!(a.len(), 12);
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(left.title, right.title);
            assert_eq!(left.engagement_score, right.engagement_score);
            assert_eq!(left.created_at, right.created_at);
        }
        assert!(a.windows(2).all(|pair| pair[0].created_at < pair[1].created_at));
    }
}
