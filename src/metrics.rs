use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metric descriptions (so series show up on /metrics).
pub fn describe_pipeline_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

fn describe_all() {
    describe_counter!("ingest_collected_total", "Items returned by collectors.");
    describe_counter!("ingest_saved_total", "New items persisted.");
    describe_counter!(
        "ingest_duplicate_total",
        "Items skipped because their URL was already seen."
    );
    describe_counter!(
        "ingest_collector_errors_total",
        "Collector fetch/parse failures."
    );
    describe_counter!(
        "ingest_unresolved_country_total",
        "Persisted items without a country."
    );
    describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
    describe_counter!("scoring_skipped_total", "Items the scorer could not score.");
    describe_counter!("aggregation_runs_total", "Committed aggregation runs.");
    describe_gauge!(
        "aggregation_countries",
        "Countries written by the last aggregation run."
    );
    describe_histogram!(
        "aggregation_duration_ms",
        "Aggregation run time in milliseconds."
    );
    describe_counter!("collection_runs_total", "Completed collection passes.");
    describe_gauge!(
        "collection_last_run_ts",
        "Unix time of the last completed collection pass."
    );
    describe_counter!(
        "retention_deleted_total",
        "Rows removed by retention sweeps."
    );
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder once; later calls reuse it.
    pub fn init() -> anyhow::Result<Self> {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))
            })?
            .clone();
        // Descriptions emitted before the recorder existed went nowhere.
        describe_all();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
