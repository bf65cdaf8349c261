//! Sentiment scoring: the scorer capability, a built-in lexicon scorer and
//! the back-fill pass that annotates unscored items in the store.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::store::{SentimentAnnotation, StorageError, Store};

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Scores at or inside this band are labelled neutral.
const NEUTRAL_BAND: f64 = 0.05;

/// Longest text handed to a scorer, in chars.
pub const MAX_SCORED_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    /// Scoring was attempted and failed; score is forced to 0.0.
    Skipped,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Polarity label for a score in `[-1, 1]`.
    pub fn from_score(score: f64) -> Self {
        if score > NEUTRAL_BAND {
            Self::Positive
        } else if score < -NEUTRAL_BAND {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a scorer for one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentScore {
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// Anything that can turn text into a `(score, label, confidence)` triple.
/// `None` means the text could not be scored.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Option<SentimentScore>;
    fn name(&self) -> &'static str;
}

/// Lexicon scorer with short-range negation.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw score, lexicon hits, token count).
    ///
    /// A negator within the previous 1..=3 tokens flips the sign of a hit.
    pub fn score_raw(&self, text: &str) -> (i32, usize, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;
        let mut hits = 0usize;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
            hits += 1;
        }

        (score, hits, tokens.len())
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> Option<SentimentScore> {
        let (raw, hits, tokens) = self.score_raw(text);
        if tokens == 0 {
            return None;
        }
        // Squash into (-1, 1); 15 keeps one strong word around 0.6.
        let raw = f64::from(raw);
        let score = raw / (raw * raw + 15.0).sqrt();
        let confidence = if hits == 0 {
            0.5
        } else {
            (0.5 + 0.5 * score.abs()).min(1.0)
        };
        Some(SentimentScore {
            score,
            label: SentimentLabel::from_score(score),
            confidence,
        })
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "without"
    )
}

/// Text a scorer sees for an item: title and body, capped.
pub fn scoring_text(title: &str, body: Option<&str>) -> String {
    let joined = match body {
        Some(b) if !b.trim().is_empty() => format!("{title} {b}"),
        _ => title.to_string(),
    };
    joined.chars().take(MAX_SCORED_CHARS).collect()
}

/// Result of a back-fill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoringReport {
    pub analyzed: usize,
    pub skipped: usize,
}

/// Annotate every unscored item, walking ids upward in batches.
///
/// The id cursor only moves forward, so an item that fails within a pass is
/// marked `skipped` once and never revisited.
pub fn score_pending(
    store: &Store,
    scorer: &dyn SentimentScorer,
    batch_size: usize,
) -> Result<ScoringReport, StorageError> {
    let batch_size = batch_size.max(1);
    let mut report = ScoringReport::default();
    let mut cursor = 0i64;

    loop {
        let batch = store.unscored_after(cursor, batch_size)?;
        let Some(last) = batch.last() else { break };
        cursor = last.id;

        for item in &batch {
            let text = scoring_text(&item.title, item.body.as_deref());
            let annotation = match scorer.score(&text) {
                Some(s) => {
                    report.analyzed += 1;
                    SentimentAnnotation {
                        item_id: item.id,
                        score: s.score,
                        label: s.label,
                        confidence: s.confidence,
                    }
                }
                None => {
                    report.skipped += 1;
                    metrics::counter!("scoring_skipped_total").increment(1);
                    SentimentAnnotation::skipped(item.id)
                }
            };
            store.apply_annotation(&annotation, chrono::Utc::now())?;
        }

        tracing::debug!(target: "ingest", cursor, batch = batch.len(), scorer = scorer.name(), "scored batch");
    }

    if report.analyzed + report.skipped > 0 {
        tracing::info!(
            target: "ingest",
            analyzed = report.analyzed,
            skipped = report.skipped,
            "sentiment back-fill complete"
        );
    }
    Ok(report)
}
