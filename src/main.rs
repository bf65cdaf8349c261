//! Country Sentiment Service: binary entrypoint.
//! Opens the store, starts the collection and retention loops, and serves the
//! read API over Axum.

use shuttle_axum::ShuttleAxum;
use std::sync::Arc;

use country_sentiment::ingest::scheduler;
use country_sentiment::{api, init_tracing, AppConfig, PipelineContext};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    // anyhow errors convert into shuttle_runtime::Error::Custom.
    let config = AppConfig::load_default()?;
    let ctx = Arc::new(PipelineContext::init(config)?);

    // Background loops live for the whole process.
    let _handles = scheduler::spawn_all(ctx.clone());

    let router = api::router(ctx);
    Ok(router.into())
}
