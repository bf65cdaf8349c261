// src/ingest/scheduler.rs
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::context::PipelineContext;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub collection_interval: Duration,
    pub retention_interval: Duration,
}

impl SchedulerCfg {
    pub fn from_config(cfg: &crate::config::AppConfig) -> Self {
        Self {
            collection_interval: Duration::from_secs(cfg.collection.interval_secs.max(1)),
            retention_interval: Duration::from_secs(cfg.retention.sweep_interval_secs.max(1)),
        }
    }
}

/// Handles for the background loops. Dropping does not stop them; call `shutdown`.
pub struct SchedulerHandles {
    pub collection: Option<JoinHandle<()>>,
    pub retention: JoinHandle<()>,
    ctx: Arc<PipelineContext>,
}

impl SchedulerHandles {
    pub fn shutdown(self) {
        if let Some(h) = self.collection {
            h.abort();
        }
        self.retention.abort();
        self.ctx.set_scheduler_running(false);
        tracing::info!("background loops stopped");
    }
}

/// Collect → persist → score → aggregate on a fixed tick. The first tick fires
/// immediately. A failed pass is logged and retried on the next tick.
pub fn spawn_collection_loop(ctx: Arc<PipelineContext>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match ctx.run_collection().await {
                Ok(report) => {
                    counter!("collection_runs_total").increment(1);
                    gauge!("collection_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
                    tracing::info!(
                        target: "ingest",
                        saved = report.ingest.saved,
                        duplicates = report.ingest.duplicates,
                        scored = report.scoring.analyzed,
                        countries = report.countries,
                        "collection tick"
                    );
                }
                Err(e) => {
                    tracing::error!(target: "ingest", error = ?e, "collection tick failed");
                }
            }
        }
    })
}

/// Daily (or `period`) retention sweep with the configured horizon.
pub fn spawn_retention_loop(ctx: Arc<PipelineContext>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            if let Err(e) = ctx.purge_expired() {
                tracing::error!(target: "retention", error = ?e, "retention sweep failed");
            }
        }
    })
}

/// Start every background loop the config asks for.
pub fn spawn_all(ctx: Arc<PipelineContext>) -> SchedulerHandles {
    let cfg = SchedulerCfg::from_config(ctx.config());
    let collection = if ctx.config().collection.enabled {
        Some(spawn_collection_loop(ctx.clone(), cfg.collection_interval))
    } else {
        tracing::info!(target: "ingest", "collection disabled by config");
        None
    };
    let retention = spawn_retention_loop(ctx.clone(), cfg.retention_interval);
    ctx.set_scheduler_running(true);
    SchedulerHandles {
        collection,
        retention,
        ctx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn cfg_takes_intervals_from_config() {
        let mut app = AppConfig::default();
        app.collection.interval_secs = 600;
        app.retention.sweep_interval_secs = 0;
        let cfg = SchedulerCfg::from_config(&app);
        assert_eq!(cfg.collection_interval, Duration::from_secs(600));
        assert_eq!(cfg.retention_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn disabled_collection_spawns_only_retention() {
        let mut app = AppConfig::default();
        app.collection.enabled = false;
        let ctx = Arc::new(PipelineContext::in_memory(app).unwrap());
        assert!(!ctx.scheduler_running());
        let handles = spawn_all(ctx.clone());
        assert!(handles.collection.is_none());
        assert!(ctx.scheduler_running());
        handles.shutdown();
        assert!(!ctx.scheduler_running());
    }
}
