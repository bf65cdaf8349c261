//! # Hourly aggregation
//!
//! Rolls scored, country-tagged items of one time bucket into one summary
//! per country:
//!
//! - `avg` is the plain mean of scores.
//! - `weighted` is `Σ s·w / Σ w` with `w` from the credibility table, falling
//!   back to `avg` when every weight is zero.
//! - Items are ordered by score, then id; the first is kept as the most
//!   negative reference and the last as the most positive one.
//!
//! All countries of a bucket are upserted in one transaction, so a failed or
//! cancelled run leaves the previous state untouched.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::credibility::CredibilityModel;
use crate::geo::{country_name, CountryCode};
use crate::store::{CountryHourSummary, ScoredRow, StorageError, Store};

pub const DEFAULT_BUCKET_SECS: i64 = 3600;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("storage error during aggregation: {0}")]
    Storage(#[from] StorageError),
    #[error("aggregation cancelled before commit")]
    Cancelled,
}

impl AggregateError {
    /// Storage failures are transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Shared cancellation switch, checked between country upserts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-country result returned to callers. Never exposes row ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    pub avg_sentiment: f64,
    pub weighted_sentiment: f64,
    pub article_count: u64,
    pub country_name: String,
}

/// In-memory rollup of one country group.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRollup {
    pub avg: f64,
    pub weighted: f64,
    pub count: u64,
    pub top_positive: i64,
    pub top_negative: i64,
}

#[derive(Debug, Clone)]
pub struct AggregationEngine {
    bucket_secs: i64,
    include_skipped: bool,
    cancel: CancelFlag,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_SECS, false)
    }
}

impl AggregationEngine {
    pub fn new(bucket_secs: i64, include_skipped: bool) -> Self {
        Self {
            bucket_secs: bucket_secs.max(1),
            include_skipped,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn bucket_secs(&self) -> i64 {
        self.bucket_secs
    }

    /// Start of the bucket containing `ts`.
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        bucket_start(ts, self.bucket_secs)
    }

    /// Aggregate the bucket containing `bucket` (defaults to now).
    ///
    /// Re-running a bucket overwrites its summaries. A bucket with no
    /// qualifying items writes nothing and returns an empty map.
    pub fn aggregate_hour(
        &self,
        store: &mut Store,
        credibility: &CredibilityModel,
        bucket: Option<DateTime<Utc>>,
    ) -> Result<BTreeMap<CountryCode, SummaryResult>, AggregateError> {
        crate::metrics::describe_pipeline_metrics();
        let t0 = Instant::now();

        let start = self.bucket_start(bucket.unwrap_or_else(Utc::now));
        let end = start + Duration::seconds(self.bucket_secs);

        let rows = store.scored_items_in_window(start, end, self.include_skipped)?;
        let rollups = summarize(&rows, credibility);

        let now = Utc::now();
        let summaries: Vec<CountryHourSummary> = rollups
            .iter()
            .map(|(code, r)| CountryHourSummary {
                country_code: code.clone(),
                hour_bucket: start,
                avg_sentiment: r.avg,
                weighted_sentiment: Some(r.weighted),
                article_count: r.count,
                top_positive_ref: Some(r.top_positive),
                top_negative_ref: Some(r.top_negative),
                updated_at: now,
            })
            .collect();

        let cancel = &self.cancel;
        if !store.upsert_summaries(&summaries, || cancel.is_cancelled())? {
            tracing::warn!(target: "aggregate", bucket = %start, "aggregation cancelled; rolled back");
            return Err(AggregateError::Cancelled);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        metrics::counter!("aggregation_runs_total").increment(1);
        metrics::gauge!("aggregation_countries").set(rollups.len() as f64);
        metrics::histogram!("aggregation_duration_ms").record(ms);

        tracing::info!(
            target: "aggregate",
            bucket = %start,
            items = rows.len(),
            countries = rollups.len(),
            "hourly aggregation complete"
        );

        Ok(rollups
            .into_iter()
            .map(|(code, r)| {
                let name = country_name(&code);
                (
                    code,
                    SummaryResult {
                        avg_sentiment: r.avg,
                        weighted_sentiment: r.weighted,
                        article_count: r.count,
                        country_name: name,
                    },
                )
            })
            .collect())
    }
}

/// Floor `ts` to a multiple of `bucket_secs` since the epoch.
pub fn bucket_start(ts: DateTime<Utc>, bucket_secs: i64) -> DateTime<Utc> {
    let secs = ts.timestamp();
    let floored = secs - secs.rem_euclid(bucket_secs.max(1));
    Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
}

/// Group rows by country and compute each rollup.
pub fn summarize(rows: &[ScoredRow], credibility: &CredibilityModel) -> BTreeMap<CountryCode, CountryRollup> {
    let mut groups: BTreeMap<&str, Vec<&ScoredRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.country_code.as_str()).or_default().push(row);
    }

    groups
        .into_iter()
        .filter_map(|(code, group)| rollup(&group, credibility).map(|r| (code.to_string(), r)))
        .collect()
}

fn rollup(group: &[&ScoredRow], credibility: &CredibilityModel) -> Option<CountryRollup> {
    let n = group.len();
    if n == 0 {
        return None;
    }

    let avg = group.iter().map(|r| r.score).sum::<f64>() / n as f64;

    let (mut num, mut den) = (0.0f64, 0.0f64);
    for r in group {
        let w = credibility.weight_for_key(&r.source_category);
        num += r.score * w;
        den += w;
    }
    let weighted = if den > 0.0 { num / den } else { avg };

    let mut sorted: Vec<&&ScoredRow> = group.iter().collect();
    sorted.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.id.cmp(&b.id)));
    let top_negative = sorted.first()?.id;
    let top_positive = sorted.last()?.id;

    Some(CountryRollup {
        avg,
        weighted,
        count: n as u64,
        top_positive,
        top_negative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, code: &str, cat: &str, score: f64) -> ScoredRow {
        ScoredRow {
            id,
            country_code: code.into(),
            source_category: cat.into(),
            score,
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    #[test]
    fn bucket_start_floors_to_hour() {
        assert_eq!(bucket_start(ts("2024-03-01T10:59:59Z"), 3600), ts("2024-03-01T10:00:00Z"));
        assert_eq!(bucket_start(ts("2024-03-01T10:00:00Z"), 3600), ts("2024-03-01T10:00:00Z"));
        assert_eq!(bucket_start(ts("2024-03-01T10:29:00Z"), 900), ts("2024-03-01T10:15:00Z"));
    }

    #[test]
    fn weighted_mean_uses_credibility() {
        let cred = CredibilityModel::default_seed();
        // feed (1.0) at +0.5, forum (0.6) at -0.5 → avg 0, weighted 0.2/1.6 = 0.125
        let rows = [row(1, "DE", "feed", 0.5), row(2, "DE", "forum_api", -0.5)];
        let out = summarize(&rows, &cred);
        let de = &out["DE"];
        assert!(de.avg.abs() < 1e-12);
        assert!((de.weighted - 0.125).abs() < 1e-12);
        assert_eq!(de.count, 2);
        assert_eq!(de.top_positive, 1);
        assert_eq!(de.top_negative, 2);
    }

    #[test]
    fn zero_total_weight_falls_back_to_plain_mean() {
        let mut cred = CredibilityModel::default_seed();
        cred.weights.insert("feed".into(), 0.0);
        let rows = [row(1, "FR", "feed", 0.4), row(2, "FR", "feed", 0.2)];
        let fr = &summarize(&rows, &cred)["FR"];
        assert!((fr.weighted - fr.avg).abs() < 1e-12);
        assert!((fr.avg - 0.3).abs() < 1e-12);
    }

    #[test]
    fn extremal_ties_follow_id_order() {
        let cred = CredibilityModel::default_seed();
        let rows = [
            row(7, "US", "feed", 0.9),
            row(3, "US", "feed", 0.9),
            row(5, "US", "feed", -0.4),
            row(4, "US", "feed", -0.4),
        ];
        let us = &summarize(&rows, &cred)["US"];
        assert_eq!(us.top_positive, 7);
        assert_eq!(us.top_negative, 4);
    }

    #[test]
    fn single_item_is_both_extremes() {
        let cred = CredibilityModel::default_seed();
        let rows = [row(9, "JP", "scraped", 0.1)];
        let jp = &summarize(&rows, &cred)["JP"];
        assert_eq!((jp.top_positive, jp.top_negative), (9, 9));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
        flag.reset();
        assert!(!other.is_cancelled());
    }

    #[test]
    fn retryable_only_for_storage_errors() {
        assert!(!AggregateError::Cancelled.is_retryable());
        let e = AggregateError::from(StorageError::Timestamp(0));
        assert!(e.is_retryable());
    }
}
