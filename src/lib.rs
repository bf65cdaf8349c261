// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod context;
pub mod credibility;
pub mod geo;
pub mod ingest;
pub mod metrics;
pub mod query;
pub mod retention;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{AggregateError, AggregationEngine, CancelFlag, SummaryResult};
pub use crate::api::router;
pub use crate::config::AppConfig;
pub use crate::context::{CollectionReport, PipelineContext};
pub use crate::credibility::{CredibilityModel, SourceCategory};
pub use crate::geo::{CountryCode, GeoResolver};
pub use crate::store::{StorageError, Store};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter; `LOG_FORMAT=json` switches to JSON lines. Safe to call twice.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("country_sentiment=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
