// tests/query_facade.rs
//
// Read-side views built on top of real aggregation runs.

use chrono::{DateTime, Duration, Utc};

use country_sentiment::aggregate::AggregationEngine;
use country_sentiment::credibility::{CredibilityModel, SourceCategory};
use country_sentiment::ingest::types::NormalizedItem;
use country_sentiment::query::{self, GlobalSnapshot, TOP_HEADLINES};
use country_sentiment::sentiment::SentimentLabel;
use country_sentiment::store::{CountryHourSummary, HeadlineFilter, SentimentAnnotation, Store};

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("rfc3339")
        .with_timezone(&Utc)
}

fn put(store: &Store, url: &str, country: &str, at: DateTime<Utc>, score: f64) -> i64 {
    let item = NormalizedItem {
        source_category: SourceCategory::Feed,
        source_label: "Fixture".into(),
        title: format!("headline {url}"),
        body: None,
        url: url.into(),
        country_hint: None,
        published_at: None,
    };
    let id = store
        .insert_item(&item, Some(country), at)
        .expect("insert")
        .expect("fresh url");
    let ann = SentimentAnnotation {
        item_id: id,
        score,
        label: SentimentLabel::from_score(score),
        confidence: 0.8,
    };
    store.apply_annotation(&ann, at).expect("annotate");
    id
}

fn aggregate(store: &mut Store, bucket: DateTime<Utc>) {
    AggregationEngine::default()
        .aggregate_hour(store, &CredibilityModel::default_seed(), Some(bucket))
        .expect("aggregate");
}

/// DE in two buckets, FR in the later one.
fn two_bucket_store() -> (Store, DateTime<Utc>, DateTime<Utc>) {
    let mut store = Store::open_in_memory().expect("open db");
    let h1 = ts("2024-05-01T09:00:00Z");
    let h2 = ts("2024-05-01T10:00:00Z");

    put(&store, "de-1", "DE", h1, 0.1);
    aggregate(&mut store, h1);

    put(&store, "de-2", "DE", h2, 0.5);
    put(&store, "de-3", "DE", h2 + Duration::minutes(1), 0.5);
    put(&store, "fr-1", "FR", h2, -0.4);
    aggregate(&mut store, h2);

    (store, h1, h2)
}

#[test]
fn empty_store_yields_explicit_empty_snapshot() {
    let store = Store::open_in_memory().expect("open db");
    let snap = query::global_snapshot(&store).expect("snapshot");
    assert_eq!(snap, GlobalSnapshot::empty());
    assert!(snap.countries.is_empty());
    assert_eq!(snap.global_average, 0.0);
    assert_eq!(snap.total_articles, 0);
    assert!(snap.last_updated.is_none());
}

#[test]
fn snapshot_reads_latest_bucket_with_trend() {
    let (store, _h1, h2) = two_bucket_store();
    let snap = query::global_snapshot(&store).expect("snapshot");

    assert_eq!(snap.last_updated, Some(h2));
    assert_eq!(snap.total_articles, 3);
    // (0.5 * 2 + -0.4 * 1) / 3
    assert!((snap.global_average - 0.2).abs() < 1e-9);

    let codes: Vec<_> = snap.countries.iter().map(|c| c.country_code.as_str()).collect();
    assert_eq!(codes, ["DE", "FR"]);

    let de = &snap.countries[0];
    assert_eq!(de.country_name, "Germany");
    assert_eq!(de.article_count, 2);
    assert!((de.trend.expect("previous bucket") - 0.4).abs() < 1e-9);
    assert!(snap.countries[1].trend.is_none());
}

#[test]
fn country_detail_covers_the_trailing_window() {
    let (store, h1, h2) = two_bucket_store();
    let now = h2 + Duration::minutes(30);

    let wide = query::country_detail_at(&store, "de", 24, now)
        .expect("detail")
        .expect("has data");
    assert_eq!(wide.country_code, "DE");
    assert_eq!(wide.article_count, 3);
    assert!((wide.current_sentiment - 0.5).abs() < 1e-9);
    let hours: Vec<_> = wide.hourly_trend.iter().map(|p| p.hour).collect();
    assert_eq!(hours, [h1, h2]);
    assert_eq!(wide.top_headlines.len(), 3);
    assert_eq!(wide.source_breakdown.get("feed"), Some(&3));

    // One hour back from 10:30 excludes the 09:00 bucket.
    let narrow = query::country_detail_at(&store, "DE", 1, now)
        .expect("detail")
        .expect("has data");
    assert_eq!(narrow.hourly_trend.len(), 1);
    assert_eq!(narrow.article_count, 2);
    assert_eq!(narrow.top_headlines.len(), 2);

    assert!(query::country_detail_at(&store, "IT", 24, now).unwrap().is_none());
}

#[test]
fn country_detail_caps_headlines_by_magnitude() {
    let mut store = Store::open_in_memory().expect("open db");
    let h = ts("2024-05-01T10:00:00Z");
    for i in 0..25 {
        let score = if i % 2 == 0 { i as f64 / 30.0 } else { -(i as f64) / 30.0 };
        put(&store, &format!("br-{i}"), "BR", h, score);
    }
    aggregate(&mut store, h);

    let detail = query::country_detail_at(&store, "BR", 24, h + Duration::minutes(5))
        .unwrap()
        .unwrap();
    assert_eq!(detail.top_headlines.len(), TOP_HEADLINES);
    let magnitudes: Vec<f64> = detail
        .top_headlines
        .iter()
        .map(|h| h.sentiment_score.unwrap().abs())
        .collect();
    assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
    assert!((magnitudes[0] - 24.0 / 30.0).abs() < 1e-9);
}

#[test]
fn headlines_filter_by_polarity() {
    let store = Store::open_in_memory().expect("open db");
    let h = ts("2024-05-01T10:00:00Z");
    let pos = put(&store, "cl-1", "CL", h, 0.9);
    let neu = put(&store, "cl-2", "CL", h, 0.1);
    let neg = put(&store, "cl-3", "CL", h, -0.5);
    put(&store, "pe-1", "PE", h, 0.95);

    let ids = |f: HeadlineFilter, limit: usize| -> Vec<i64> {
        query::headlines(&store, "cl", limit, f)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect()
    };
    assert_eq!(ids(HeadlineFilter::All, 10), [pos, neg, neu]);
    assert_eq!(ids(HeadlineFilter::All, 2), [pos, neg]);
    assert_eq!(ids(HeadlineFilter::Positive, 10), [pos]);
    assert_eq!(ids(HeadlineFilter::Negative, 10), [neg]);
    assert_eq!(ids(HeadlineFilter::Neutral, 10), [neu]);
}

#[test]
fn global_trend_is_chronological() {
    let (store, h1, h2) = two_bucket_store();
    let points = query::global_trend_at(&store, 24, h2 + Duration::minutes(30)).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].hour, h1);
    assert_eq!(points[0].country_count, 1);
    assert_eq!(points[1].hour, h2);
    assert_eq!(points[1].total_articles, 3);
    assert_eq!(points[1].country_count, 2);
    // mean of DE 0.5 and FR -0.4
    assert!((points[1].avg_sentiment - 0.05).abs() < 1e-9);
}

#[test]
fn dangling_top_refs_resolve_to_none() {
    let mut store = Store::open_in_memory().expect("open db");
    let h = ts("2024-05-01T10:00:00Z");
    let kept = put(&store, "ng-1", "NG", h, 0.6);
    let summary = CountryHourSummary {
        country_code: "NG".into(),
        hour_bucket: h,
        avg_sentiment: 0.6,
        weighted_sentiment: Some(0.6),
        article_count: 1,
        top_positive_ref: Some(kept),
        top_negative_ref: Some(kept + 999),
        updated_at: h,
    };
    assert!(store.upsert_summaries(&[summary.clone()], || false).unwrap());

    let refs = query::resolve_top_refs(&store, &summary).unwrap();
    assert_eq!(refs.top_positive.map(|p| p.id), Some(kept));
    assert!(refs.top_negative.is_none());
}
