// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use country_sentiment::config::AppConfig;
use country_sentiment::credibility::SourceCategory;
use country_sentiment::ingest::providers::RssFeedCollector;
use country_sentiment::ingest::types::NormalizedItem;
use country_sentiment::{api, PipelineContext};

const BODY_LIMIT: usize = 1024 * 1024;
const FIXTURE: &str = include_str!("fixtures/world_rss.xml");

fn item(title: &str, url: &str) -> NormalizedItem {
    NormalizedItem {
        source_category: SourceCategory::Feed,
        source_label: "Wire".into(),
        title: title.into(),
        body: None,
        url: url.into(),
        country_hint: None,
        published_at: Some(Utc::now()),
    }
}

fn empty_ctx() -> Arc<PipelineContext> {
    Arc::new(PipelineContext::in_memory(AppConfig::default()).expect("context"))
}

/// Scored and aggregated items for KE and DE in the current bucket.
fn seed(ctx: &PipelineContext) {
    ctx.ingest(vec![
        item("Deadly floods hit Kenya", "https://x.test/1"),
        item("Kenya celebrates historic peace success", "https://x.test/2"),
        item("Germany wins praise for strong recovery", "https://x.test/3"),
    ])
    .expect("ingest");
    ctx.score_pending().expect("score");
    ctx.aggregate_hour(None).expect("aggregate");
}

fn seeded_ctx() -> Arc<PipelineContext> {
    let ctx = empty_ctx();
    seed(&ctx);
    ctx
}

async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn call_json(app: Router, method: &str, uri: &str) -> (StatusCode, Json) {
    let (status, bytes) = call(app, method, uri).await;
    let v = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn health_reports_database_state() {
    let ctx = empty_ctx();
    ctx.set_scheduler_running(true);
    let (status, v) = call_json(api::router(ctx), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["database_ok"], true);
    assert_eq!(v["scheduler_running"], true);
    assert_eq!(v["articles_today"], 0);
    assert!(v["last_collection"].is_null());
}

#[tokio::test]
async fn health_is_degraded_without_background_loops() {
    let (status, v) = call_json(api::router(empty_ctx()), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "degraded");
    assert_eq!(v["database_ok"], true);
    assert_eq!(v["scheduler_running"], false);
}

#[tokio::test]
async fn collect_trigger_runs_a_pass_in_the_background() {
    let ctx = Arc::new(
        PipelineContext::in_memory(AppConfig::default())
            .expect("context")
            .with_collectors(vec![Box::new(RssFeedCollector::from_xml("World Desk", FIXTURE))]),
    );

    let (status, v) = call_json(api::router(ctx.clone()), "POST", "/collect/trigger").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(v["status"], "collection started");

    for _ in 0..200 {
        if ctx.last_collection().is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(ctx.last_collection().is_some(), "pass did not finish");
    assert!(ctx.store().count_items().unwrap() > 0);
    assert!(ctx.store().count_summaries().unwrap() > 0);
}

#[tokio::test]
async fn global_snapshot_is_empty_not_an_error() {
    let (status, v) = call_json(api::router(empty_ctx()), "GET", "/sentiment/global").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["countries"].as_array().map(Vec::len), Some(0));
    assert_eq!(v["total_articles"], 0);
    assert!(v["last_updated"].is_null());
}

#[tokio::test]
async fn global_snapshot_lists_aggregated_countries() {
    let (status, v) = call_json(api::router(seeded_ctx()), "GET", "/sentiment/global").await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = v["countries"]
        .as_array()
        .expect("countries")
        .iter()
        .filter_map(|c| c["country_code"].as_str())
        .collect();
    assert_eq!(codes, ["DE", "KE"]);
    assert_eq!(v["total_articles"], 3);
}

#[tokio::test]
async fn country_detail_and_missing_country() {
    let ctx = seeded_ctx();

    let (status, v) = call_json(api::router(ctx.clone()), "GET", "/sentiment/ke?hours=6").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["country_code"], "KE");
    assert_eq!(v["country_name"], "Kenya");
    assert_eq!(v["article_count"], 2);
    assert_eq!(v["top_headlines"].as_array().map(Vec::len), Some(2));

    let (status, _) = call(api::router(ctx.clone()), "GET", "/sentiment/FR").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(api::router(ctx), "GET", "/sentiment/XX").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn headlines_respect_filter_and_limit() {
    let ctx = seeded_ctx();

    let (status, v) = call_json(api::router(ctx.clone()), "GET", "/headlines/KE?sentiment=negative").await;
    assert_eq!(status, StatusCode::OK);
    let rows = v.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["sentiment_score"].as_f64().unwrap() < -0.2);

    let (_, v) = call_json(api::router(ctx), "GET", "/headlines/KE?limit=1").await;
    assert_eq!(v.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn trends_and_sources() {
    let ctx = seeded_ctx();

    let (status, v) = call_json(api::router(ctx.clone()), "GET", "/trends?hours=2").await;
    assert_eq!(status, StatusCode::OK);
    let points = v.as_array().expect("array");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["country_count"], 2);

    let (status, v) = call_json(api::router(ctx), "GET", "/sources").await;
    assert_eq!(status, StatusCode::OK);
    let stats = v.as_array().expect("array");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["source_category"], "feed");
    assert_eq!(stats[0]["count"], 3);
}

#[tokio::test]
async fn admin_aggregate_is_idempotent() {
    let ctx = seeded_ctx();

    let (status, first) = call_json(api::router(ctx.clone()), "POST", "/admin/aggregate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["countries"], 2);

    let (_, second) = call_json(api::router(ctx.clone()), "POST", "/admin/aggregate").await;
    assert_eq!(first, second);
    assert_eq!(ctx.store().count_summaries().unwrap(), 2);
}

#[tokio::test]
async fn admin_cleanup_reports_deleted_rows() {
    let ctx = seeded_ctx();

    let (status, v) = call_json(api::router(ctx.clone()), "POST", "/admin/cleanup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["deleted"], 0);
    assert_eq!(v["days"], 30);
    assert_eq!(ctx.store().count_items().unwrap(), 3);
}

#[tokio::test]
async fn admin_cleanup_rejects_out_of_range_horizon() {
    let ctx = seeded_ctx();
    let (status, v) = call_json(
        api::router(ctx.clone()),
        "POST",
        "/admin/cleanup?days=4294967295",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("out of range"));
    assert_eq!(ctx.store().count_items().unwrap(), 3);
}

#[tokio::test]
async fn admin_reload_credibility_returns_text() {
    let (status, bytes) = call(api::router(empty_ctx()), "GET", "/admin/reload-credibility").await;
    assert_eq!(status, StatusCode::OK);
    let body = String::from_utf8(bytes).expect("utf8");
    assert!(body.starts_with("reloaded"), "got {body}");
}

#[tokio::test]
async fn metrics_endpoint_exposes_pipeline_series() {
    let ctx = empty_ctx();
    // Recorder first, so the aggregation run below is counted.
    let app = api::router(ctx.clone());
    seed(&ctx);
    let (status, bytes) = call(app, "GET", "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.contains("aggregation_runs_total"), "metrics body: {text}");
}
