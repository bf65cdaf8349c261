//! Read-side views over the store: global snapshot, per-country detail,
//! headlines, trends and health.
//!
//! "No data" is always an empty or `None` result, never an error.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::geo::country_name;
use crate::sentiment::SentimentLabel;
use crate::store::{CountryHourSummary, HeadlineFilter, StorageError, Store, StoredItem};

/// Number of items listed in a country detail.
pub const TOP_HEADLINES: usize = 20;

pub const DEFAULT_DETAIL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryData {
    pub country_code: String,
    pub country_name: String,
    pub sentiment_score: f64,
    pub article_count: u64,
    /// Change from this country's previous bucket, when one exists.
    pub trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSnapshot {
    pub countries: Vec<CountryData>,
    pub global_average: f64,
    pub total_articles: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl GlobalSnapshot {
    pub fn empty() -> Self {
        Self {
            countries: Vec::new(),
            global_average: 0.0,
            total_articles: 0,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyTrendPoint {
    pub hour: DateTime<Utc>,
    pub sentiment: f64,
    pub articles: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlinePreview {
    pub id: i64,
    pub title: String,
    pub source_label: String,
    pub source_category: String,
    pub country_code: Option<String>,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<SentimentLabel>,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
}

impl From<StoredItem> for HeadlinePreview {
    fn from(it: StoredItem) -> Self {
        Self {
            id: it.id,
            title: it.title,
            source_label: it.source_label,
            source_category: it.source_category.to_string(),
            country_code: it.country_code,
            sentiment_score: it.sentiment_score,
            sentiment_label: it.sentiment_label,
            url: it.url,
            published_at: it.published_at,
            ingested_at: it.ingested_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryDetail {
    pub country_code: String,
    pub country_name: String,
    pub current_sentiment: f64,
    pub article_count: u64,
    pub hourly_trend: Vec<HourlyTrendPoint>,
    pub top_headlines: Vec<HeadlinePreview>,
    pub source_breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalTrendPoint {
    pub hour: DateTime<Utc>,
    pub avg_sentiment: f64,
    pub total_articles: u64,
    pub country_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStat {
    pub source_category: String,
    pub count: u64,
    pub avg_sentiment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub database_ok: bool,
    pub articles_today: u64,
    pub scheduler_running: bool,
    pub last_collection: Option<DateTime<Utc>>,
}

/// Items behind a summary's weak references; `None` when the row is gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRefs {
    pub top_positive: Option<HeadlinePreview>,
    pub top_negative: Option<HeadlinePreview>,
}

/// Latest bucket across all countries.
///
/// `global_average` is the article-count-weighted mean of each country's
/// displayed sentiment.
pub fn global_snapshot(store: &Store) -> Result<GlobalSnapshot, StorageError> {
    let Some(bucket) = store.latest_bucket()? else {
        return Ok(GlobalSnapshot::empty());
    };

    let mut countries = Vec::new();
    let mut total_articles = 0u64;
    let mut weighted_sum = 0.0f64;

    for s in store.summaries_for_bucket(bucket)? {
        let sentiment = s.display_sentiment();
        let trend = store
            .previous_summary(&s.country_code, bucket)?
            .map(|prev| sentiment - prev.display_sentiment());

        total_articles += s.article_count;
        weighted_sum += sentiment * s.article_count as f64;
        countries.push(CountryData {
            country_name: country_name(&s.country_code),
            country_code: s.country_code,
            sentiment_score: sentiment,
            article_count: s.article_count,
            trend,
        });
    }

    let global_average = if total_articles > 0 {
        weighted_sum / total_articles as f64
    } else {
        0.0
    };

    Ok(GlobalSnapshot {
        countries,
        global_average,
        total_articles,
        last_updated: Some(bucket),
    })
}

/// Per-country view over the trailing `window_hours` from now.
pub fn country_detail(
    store: &Store,
    code: &str,
    window_hours: i64,
) -> Result<Option<CountryDetail>, StorageError> {
    country_detail_at(store, code, window_hours, Utc::now())
}

/// Per-country view over `[now - window_hours, now]`. `None` when the
/// country has no summary in the window.
pub fn country_detail_at(
    store: &Store,
    code: &str,
    window_hours: i64,
    now: DateTime<Utc>,
) -> Result<Option<CountryDetail>, StorageError> {
    let code = code.trim().to_ascii_uppercase();
    let since = now - Duration::hours(window_hours.max(0));

    let hourly = store.country_summaries_since(&code, since)?;
    let Some(latest) = hourly.last() else {
        return Ok(None);
    };
    let current_sentiment = latest.display_sentiment();

    let top_headlines = store
        .top_items_by_magnitude(&code, since, TOP_HEADLINES)?
        .into_iter()
        .map(HeadlinePreview::from)
        .collect();
    let source_breakdown = store.category_counts(&code, since)?;

    Ok(Some(CountryDetail {
        country_name: country_name(&code),
        current_sentiment,
        article_count: hourly.iter().map(|h| h.article_count).sum(),
        hourly_trend: hourly
            .iter()
            .map(|h| HourlyTrendPoint {
                hour: h.hour_bucket,
                sentiment: h.display_sentiment(),
                articles: h.article_count,
            })
            .collect(),
        top_headlines,
        source_breakdown,
        country_code: code,
    }))
}

/// Most extreme scored items of a country, optionally filtered by polarity.
pub fn headlines(
    store: &Store,
    code: &str,
    limit: usize,
    filter: HeadlineFilter,
) -> Result<Vec<HeadlinePreview>, StorageError> {
    let code = code.trim().to_ascii_uppercase();
    Ok(store
        .headlines(&code, filter, limit)?
        .into_iter()
        .map(HeadlinePreview::from)
        .collect())
}

/// Parse the `sentiment=` query value. Unknown values mean no filter.
pub fn parse_headline_filter(raw: Option<&str>) -> HeadlineFilter {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("positive") => HeadlineFilter::Positive,
        Some("negative") => HeadlineFilter::Negative,
        Some("neutral") => HeadlineFilter::Neutral,
        _ => HeadlineFilter::All,
    }
}

/// Cross-country mean per bucket over the trailing window, chronological.
pub fn global_trend_at(
    store: &Store,
    window_hours: i64,
    now: DateTime<Utc>,
) -> Result<Vec<GlobalTrendPoint>, StorageError> {
    let since = now - Duration::hours(window_hours.max(0));
    let mut by_hour: BTreeMap<DateTime<Utc>, Vec<CountryHourSummary>> = BTreeMap::new();
    for s in store.summaries_since(since)? {
        by_hour.entry(s.hour_bucket).or_default().push(s);
    }

    Ok(by_hour
        .into_iter()
        .map(|(hour, rows)| GlobalTrendPoint {
            hour,
            avg_sentiment: rows.iter().map(|r| r.display_sentiment()).sum::<f64>() / rows.len() as f64,
            total_articles: rows.iter().map(|r| r.article_count).sum(),
            country_count: rows.len(),
        })
        .collect())
}

/// Item count and mean score per source category since midnight UTC.
pub fn source_stats_at(store: &Store, now: DateTime<Utc>) -> Result<Vec<SourceStat>, StorageError> {
    Ok(store
        .source_stats(start_of_day(now))?
        .into_iter()
        .map(|(source_category, count, avg_sentiment)| SourceStat {
            source_category,
            count,
            avg_sentiment,
        })
        .collect())
}

/// Store reachability, background loop state and today's ingest volume.
/// "healthy" needs both a reachable store and running loops.
pub fn health(
    store: &Store,
    scheduler_running: bool,
    last_collection: Option<DateTime<Utc>>,
) -> HealthStatus {
    let database_ok = store.ping();
    let articles_today = if database_ok {
        store.count_items_since(start_of_day(Utc::now())).unwrap_or(0)
    } else {
        0
    };
    HealthStatus {
        status: if database_ok && scheduler_running { "healthy" } else { "degraded" }.to_string(),
        database_ok,
        articles_today,
        scheduler_running,
        last_collection,
    }
}

/// Look up the items a summary points at. Dangling references map to `None`.
pub fn resolve_top_refs(store: &Store, summary: &CountryHourSummary) -> Result<TopRefs, StorageError> {
    let fetch = |id: Option<i64>| -> Result<Option<HeadlinePreview>, StorageError> {
        match id {
            Some(id) => Ok(store.item(id)?.map(HeadlinePreview::from)),
            None => Ok(None),
        }
    };
    Ok(TopRefs {
        top_positive: fetch(summary.top_positive_ref)?,
        top_negative: fetch(summary.top_negative_ref)?,
    })
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .unwrap_or(now)
}
