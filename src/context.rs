//! Process-wide pipeline state: resolver, credibility table, scorer, store
//! and configuration, owned in one place and shared as `Arc<PipelineContext>`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use crate::aggregate::{AggregateError, AggregationEngine, SummaryResult};
use crate::config::AppConfig;
use crate::credibility::CredibilityModel;
use crate::geo::{CountryCode, GeoResolver};
use crate::ingest::providers::RssFeedCollector;
use crate::ingest::types::{Collector, NormalizedItem};
use crate::ingest::{self, IngestReport};
use crate::retention::{self, RetentionError};
use crate::sentiment::{self, LexiconScorer, ScoringReport, SentimentScorer};
use crate::store::{StorageError, Store};

/// Outcome of one collect → persist → score → aggregate pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionReport {
    pub ingest: IngestReport,
    pub scoring: ScoringReport,
    pub countries: usize,
}

pub struct PipelineContext {
    config: AppConfig,
    resolver: GeoResolver,
    credibility: RwLock<CredibilityModel>,
    scorer: Box<dyn SentimentScorer>,
    store: Mutex<Store>,
    engine: AggregationEngine,
    collectors: Vec<Box<dyn Collector>>,
    last_collection: RwLock<Option<DateTime<Utc>>>,
    scheduler_running: AtomicBool,
}

impl PipelineContext {
    /// Open the on-disk store and load every table named by `config`.
    pub fn init(config: AppConfig) -> Result<Self> {
        if let Some(parent) = config.store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
        let store = Store::open(&config.store.path, config.store.busy_timeout())
            .with_context(|| format!("opening store at {}", config.store.path.display()))?;
        tracing::info!(path = %config.store.path.display(), "store opened");
        Ok(Self::with_store(config, store))
    }

    /// Same wiring over an in-memory store.
    pub fn in_memory(config: AppConfig) -> Result<Self> {
        let store = Store::open_in_memory().context("opening in-memory store")?;
        Ok(Self::with_store(config, store))
    }

    fn with_store(config: AppConfig, store: Store) -> Self {
        let resolver = GeoResolver::from_config(Some(config.paths.aliases.as_path()));
        let credibility = CredibilityModel::load_from_file(&config.paths.credibility);
        let engine = AggregationEngine::new(
            config.aggregation.bucket_secs,
            config.aggregation.include_skipped,
        );
        let collectors: Vec<Box<dyn Collector>> = config
            .collection
            .feeds
            .iter()
            .map(|f| Box::new(RssFeedCollector::from_config(f)) as Box<dyn Collector>)
            .collect();

        tracing::info!(
            aliases = resolver.alias_count(),
            collectors = collectors.len(),
            bucket_secs = engine.bucket_secs(),
            "pipeline context ready"
        );

        Self {
            config,
            resolver,
            credibility: RwLock::new(credibility),
            scorer: Box::new(LexiconScorer::new()),
            store: Mutex::new(store),
            engine,
            collectors,
            last_collection: RwLock::new(None),
            scheduler_running: AtomicBool::new(false),
        }
    }

    /// Replace the configured collectors.
    pub fn with_collectors(mut self, collectors: Vec<Box<dyn Collector>>) -> Self {
        self.collectors = collectors;
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn SentimentScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_credibility(self, model: CredibilityModel) -> Self {
        *self.credibility.write().unwrap_or_else(|e| e.into_inner()) = model;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn resolver(&self) -> &GeoResolver {
        &self.resolver
    }

    /// Exclusive access to the store. A poisoned lock is recovered: the
    /// connection itself stays valid.
    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current credibility table.
    pub fn credibility(&self) -> CredibilityModel {
        self.credibility
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Re-read the credibility file. Returns the number of weighted categories.
    pub fn reload_credibility(&self) -> usize {
        let fresh = CredibilityModel::load_from_file(&self.config.paths.credibility);
        let n = fresh.weights.len();
        *self.credibility.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        tracing::info!(categories = n, "credibility table reloaded");
        n
    }

    pub fn last_collection(&self) -> Option<DateTime<Utc>> {
        *self.last_collection.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the background loops are up. Set by `ingest::scheduler`.
    pub fn scheduler_running(&self) -> bool {
        self.scheduler_running.load(Ordering::SeqCst)
    }

    pub fn set_scheduler_running(&self, running: bool) {
        self.scheduler_running.store(running, Ordering::SeqCst);
    }

    /// Persist already-collected items (geo-tagging included).
    pub fn ingest(&self, items: Vec<NormalizedItem>) -> Result<IngestReport, StorageError> {
        ingest::persist_items(&self.store(), &self.resolver, items, Utc::now())
    }

    /// Score every unscored item.
    pub fn score_pending(&self) -> Result<ScoringReport, StorageError> {
        sentiment::score_pending(
            &self.store(),
            self.scorer.as_ref(),
            self.config.collection.score_batch_size,
        )
    }

    /// Aggregate the bucket containing `bucket` (now when `None`).
    pub fn aggregate_hour(
        &self,
        bucket: Option<DateTime<Utc>>,
    ) -> Result<BTreeMap<CountryCode, SummaryResult>, AggregateError> {
        let credibility = self.credibility();
        let mut store = self.store();
        self.engine.aggregate_hour(&mut store, &credibility, bucket)
    }

    /// Retention with the configured horizon.
    pub fn purge_expired(&self) -> Result<u64, RetentionError> {
        retention::purge_older_than(&mut self.store(), self.config.retention.days)
    }

    /// Full pass: poll collectors, persist, score, aggregate the current bucket.
    pub async fn run_collection(&self) -> Result<CollectionReport> {
        let (items, errors) = ingest::collect_all(&self.collectors).await;
        let report = self.process_collected(items, errors)?;
        *self.last_collection.write().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
        Ok(report)
    }

    fn process_collected(&self, items: Vec<NormalizedItem>, errors: usize) -> Result<CollectionReport> {
        let mut ingest = self.ingest(items).context("persisting collected items")?;
        ingest.collector_errors = errors;
        let scoring = self.score_pending().context("scoring pending items")?;
        let countries = self.aggregate_hour(None).context("aggregating current bucket")?.len();
        Ok(CollectionReport {
            ingest,
            scoring,
            countries,
        })
    }

    /// Stop in-flight aggregation before commit. Background tasks are stopped
    /// by their owner (see `ingest::scheduler`).
    pub fn shutdown(&self) {
        self.engine.cancel_flag().cancel();
        tracing::info!("pipeline context shut down");
    }
}
