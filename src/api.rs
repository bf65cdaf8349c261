use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregate::AggregateError;
use crate::context::PipelineContext;
use crate::geo;
use crate::metrics::Metrics;
use crate::query::{self, DEFAULT_DETAIL_HOURS};
use crate::retention::{self, RetentionError};
use crate::store::StorageError;

const DEFAULT_HEADLINE_LIMIT: usize = 20;
const MAX_HEADLINE_LIMIT: usize = 100;
const MAX_WINDOW_HOURS: i64 = 24 * 30;

#[derive(Clone)]
pub struct AppState {
    ctx: Arc<PipelineContext>,
}

impl AppState {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }
}

/// Full HTTP surface. `/metrics` is merged in when the recorder installs.
pub fn router(ctx: Arc<PipelineContext>) -> Router {
    crate::metrics::describe_pipeline_metrics();

    let api = Router::new()
        .route("/health", get(health))
        .route("/sentiment/global", get(sentiment_global))
        .route("/sentiment/{code}", get(sentiment_country))
        .route("/headlines/{code}", get(country_headlines))
        .route("/trends", get(global_trends))
        .route("/sources", get(source_stats))
        .route("/collect/trigger", post(trigger_collection))
        .route("/admin/aggregate", post(admin_aggregate))
        .route("/admin/cleanup", post(admin_cleanup))
        .route("/admin/reload-credibility", get(admin_reload_credibility))
        .layer(CorsLayer::very_permissive())
        .with_state(AppState::new(ctx));

    match Metrics::init() {
        Ok(m) => api.merge(m.router()),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics recorder unavailable; /metrics disabled");
            api
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Aggregate(AggregateError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(_) | ApiError::Aggregate(_) => {
                tracing::error!(error = ?self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<RetentionError> for ApiError {
    fn from(e: RetentionError) -> Self {
        match e {
            RetentionError::HorizonOutOfRange(_) => ApiError::BadRequest(e.to_string()),
            RetentionError::Storage(e) => ApiError::Storage(e),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn country_param(raw: &str) -> Result<String, ApiError> {
    geo::valid_hint(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown country code '{raw}'")))
}

async fn health(State(state): State<AppState>) -> Json<query::HealthStatus> {
    let running = state.ctx.scheduler_running();
    let last = state.ctx.last_collection();
    Json(query::health(&state.ctx.store(), running, last))
}

async fn sentiment_global(State(state): State<AppState>) -> ApiResult<query::GlobalSnapshot> {
    Ok(Json(query::global_snapshot(&state.ctx.store())?))
}

#[derive(Deserialize)]
struct WindowQuery {
    hours: Option<i64>,
}

impl WindowQuery {
    fn hours(&self) -> i64 {
        self.hours
            .unwrap_or(DEFAULT_DETAIL_HOURS)
            .clamp(1, MAX_WINDOW_HOURS)
    }
}

async fn sentiment_country(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<query::CountryDetail> {
    let code = country_param(&code)?;
    query::country_detail(&state.ctx.store(), &code, q.hours())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no data for {code}")))
}

#[derive(Deserialize)]
struct HeadlineQuery {
    limit: Option<usize>,
    sentiment: Option<String>,
}

async fn country_headlines(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(q): Query<HeadlineQuery>,
) -> ApiResult<Vec<query::HeadlinePreview>> {
    let code = country_param(&code)?;
    let limit = q
        .limit
        .unwrap_or(DEFAULT_HEADLINE_LIMIT)
        .clamp(1, MAX_HEADLINE_LIMIT);
    let filter = query::parse_headline_filter(q.sentiment.as_deref());
    Ok(Json(query::headlines(&state.ctx.store(), &code, limit, filter)?))
}

async fn global_trends(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<query::GlobalTrendPoint>> {
    Ok(Json(query::global_trend_at(
        &state.ctx.store(),
        q.hours(),
        Utc::now(),
    )?))
}

async fn source_stats(State(state): State<AppState>) -> ApiResult<Vec<query::SourceStat>> {
    Ok(Json(query::source_stats_at(&state.ctx.store(), Utc::now())?))
}

#[derive(Serialize)]
struct TriggerOut {
    status: &'static str,
}

/// Start one collection pass in the background and answer right away.
async fn trigger_collection(State(state): State<AppState>) -> (StatusCode, Json<TriggerOut>) {
    let ctx = state.ctx.clone();
    tokio::spawn(async move {
        match ctx.run_collection().await {
            Ok(report) => tracing::info!(
                target: "ingest",
                saved = report.ingest.saved,
                countries = report.countries,
                "triggered collection finished"
            ),
            Err(e) => tracing::error!(target: "ingest", error = ?e, "triggered collection failed"),
        }
    });
    (StatusCode::ACCEPTED, Json(TriggerOut { status: "collection started" }))
}

#[derive(Deserialize)]
struct AggregateQuery {
    /// RFC 3339 instant inside the bucket to rebuild; default now.
    hour: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct AggregateOut {
    countries: usize,
    results: std::collections::BTreeMap<geo::CountryCode, crate::aggregate::SummaryResult>,
}

async fn admin_aggregate(
    State(state): State<AppState>,
    Query(q): Query<AggregateQuery>,
) -> ApiResult<AggregateOut> {
    let results = state.ctx.aggregate_hour(q.hour)?;
    Ok(Json(AggregateOut {
        countries: results.len(),
        results,
    }))
}

#[derive(Deserialize)]
struct CleanupQuery {
    days: Option<u32>,
}

#[derive(Serialize)]
struct CleanupOut {
    deleted: u64,
    days: u32,
}

async fn admin_cleanup(
    State(state): State<AppState>,
    Query(q): Query<CleanupQuery>,
) -> ApiResult<CleanupOut> {
    let days = q.days.unwrap_or(state.ctx.config().retention.days);
    let deleted = retention::purge_older_than(&mut state.ctx.store(), days)?;
    Ok(Json(CleanupOut { deleted, days }))
}

async fn admin_reload_credibility(State(state): State<AppState>) -> String {
    let n = state.ctx.reload_credibility();
    format!("reloaded ({n} categories)")
}
