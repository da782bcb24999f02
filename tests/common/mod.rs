#![allow(dead_code)]

use async_trait::async_trait;
use insight_engine::llm::{CompletionOptions, LanguageModelClient, LlmError};
use insight_engine::ContentRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 2024-01-01T00:00:00Z, a Monday.
pub const BASE_TIMESTAMP: i64 = 1_704_067_200;

pub fn record(id: &str, score: i64) -> ContentRecord {
    ContentRecord {
        id: id.to_string(),
        engagement_score: score,
        ..ContentRecord::default()
    }
}

/// Ten posts split across two hobby communities, two days apart each.
pub fn hobby_records() -> Vec<ContentRecord> {
    let rows: [(&str, &str, &str, i64, u32, f64); 10] = [
        (
            "woodworking",
            "Step-by-step guide to my first dovetail joint",
            "Here is how I did it:\n1. mark the tails\n2. saw to the line\n3. chop the waste",
            240,
            58,
            0.8,
        ),
        (
            "woodworking",
            "Help",
            "",
            -3,
            1,
            -0.4,
        ),
        (
            "3dprinting",
            "Finally dialed in my first-layer settings",
            "After two weeks of tuning the bed level and z offset the prints come out clean.",
            130,
            22,
            0.6,
        ),
        (
            "3dprinting",
            "Why does my nozzle keep clogging?",
            "Printing PETG at 240C and it clogs every hour. Any ideas?",
            45,
            30,
            -0.2,
        ),
        (
            "woodworking",
            "Shop tour after five years of collecting tools",
            "Lots of photos in the gallery at https://example.com/shop plus a list of favourites.",
            180,
            40,
            0.5,
        ),
        (
            "3dprinting",
            "BUY NOW discount filament promo code",
            "click here for the best deal",
            -12,
            2,
            0.0,
        ),
        (
            "woodworking",
            "Cutting board from scrap walnut",
            "Simple project over the weekend, finished with mineral oil.",
            75,
            9,
            0.4,
        ),
        (
            "3dprinting",
            "Print failed overnight again",
            "Woke up to spaghetti. Not sure what went wrong this time.",
            12,
            6,
            -0.5,
        ),
        (
            "woodworking",
            "Beginner question about sharpening",
            "Which stones should a beginner buy first? Budget is limited.",
            60,
            25,
            0.05,
        ),
        (
            "3dprinting",
            "Tutorial: calibrating e-steps in ten minutes",
            "- heat the nozzle\n- mark 120mm\n- extrude 100mm\n- measure and adjust",
            210,
            47,
            0.7,
        ),
    ];

    rows.iter()
        .enumerate()
        .map(
            |(idx, (community, title, body, score, comments, sentiment))| ContentRecord {
                id: format!("post_{}", idx + 1),
                title: title.to_string(),
                body: body.to_string(),
                engagement_score: *score,
                comment_count: *comments,
                sentiment_score: *sentiment,
                community: community.to_string(),
                created_at: BASE_TIMESTAMP + idx as i64 * 2 * 86_400 + (idx as i64 % 4) * 3_600,
            },
        )
        .collect()
}

pub enum Script {
    Respond(String),
    Fail,
    Delay(Duration, String),
}

/// Language-model double that replays a fixed behaviour and counts calls.
pub struct ScriptedClient {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn responding(body: &str) -> Self {
        Self::new(Script::Respond(body.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedClient {
    async fn complete(
        &self,
        _prompt: &str,
        _purpose: &str,
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Respond(body) => Ok(body.clone()),
            Script::Fail => Err(LlmError::Transport("connection refused".to_string())),
            Script::Delay(delay, body) => {
                tokio::time::sleep(*delay).await;
                Ok(body.clone())
            }
        }
    }
}

pub fn short_timeout() -> CompletionOptions {
    CompletionOptions {
        timeout: Duration::from_millis(50),
        ..CompletionOptions::default()
    }
}

pub const GENERATED_RESPONSE: &str = r#"Here you go:
```json
{
  "generated_questions": [
    {"question": "When do tutorial posts get the most upvotes?", "category": "temporal", "surprise_factor": 0.8},
    {"text": "Who answers beginner questions most often?", "dataRequirements": ["comments"]},
    "What values make a project showcase feel welcome?"
  ]
}
```"#;
