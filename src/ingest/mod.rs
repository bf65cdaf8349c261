// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::collections::HashSet;

use crate::geo::{self, GeoResolver};
use crate::ingest::types::{Collector, NormalizedItem};
use crate::store::{StorageError, Store};

pub const MAX_TITLE_CHARS: usize = 500;
pub const MAX_BODY_CHARS: usize = 4_000;

/// Counters for one ingest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collected: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub dropped: usize,
    pub unresolved: usize,
    pub collector_errors: usize,
}

/// Normalize text: decode entities, strip tags, straighten quotes, collapse
/// whitespace, cap at `max_chars`.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Structured hint for an item: the collector's own code, else the outlet
/// or community it came from.
pub fn source_hint(item: &NormalizedItem) -> Option<String> {
    if let Some(code) = item.country_hint.as_deref().and_then(geo::valid_hint) {
        return Some(code);
    }
    let label = item.source_label.trim();
    if label.starts_with("r/") || label.starts_with("/r/") {
        geo::country_for_community(label)
    } else {
        geo::country_for_source_label(label)
    }
}

/// Poll every configured collector. One failing collector never aborts the batch.
pub async fn collect_all(collectors: &[Box<dyn Collector>]) -> (Vec<NormalizedItem>, usize) {
    crate::metrics::describe_pipeline_metrics();

    let mut items = Vec::new();
    let mut errors = 0usize;
    for c in collectors {
        if !c.is_configured() {
            tracing::debug!(target: "ingest", collector = c.name(), "collector not configured; skipping");
            continue;
        }
        match c.collect().await {
            Ok(mut v) => {
                tracing::debug!(target: "ingest", collector = c.name(), count = v.len(), "collected");
                counter!("ingest_collected_total", "collector" => c.name()).increment(v.len() as u64);
                items.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, collector = c.name(), "collector error");
                counter!("ingest_collector_errors_total", "collector" => c.name()).increment(1);
                errors += 1;
            }
        }
    }
    (items, errors)
}

/// Normalize, geo-tag and persist items. URL duplicates (in the batch or
/// already stored) are counted and skipped. A stored country is never
/// recomputed.
pub fn persist_items(
    store: &Store,
    resolver: &GeoResolver,
    items: Vec<NormalizedItem>,
    now: DateTime<Utc>,
) -> Result<IngestReport, StorageError> {
    crate::metrics::describe_pipeline_metrics();

    let mut report = IngestReport {
        collected: items.len(),
        ..IngestReport::default()
    };
    let mut seen_urls: HashSet<String> = HashSet::new();

    for mut item in items {
        item.title = normalize_text(&item.title, MAX_TITLE_CHARS);
        item.body = item
            .body
            .as_deref()
            .map(|b| normalize_text(b, MAX_BODY_CHARS))
            .filter(|b| !b.is_empty());
        item.url = item.url.trim().to_string();

        if item.title.is_empty() || item.url.is_empty() {
            report.dropped += 1;
            continue;
        }
        if !seen_urls.insert(item.url.clone()) {
            report.duplicates += 1;
            continue;
        }

        let hint = source_hint(&item);
        let country = resolver.resolve(&item.title, item.body.as_deref(), hint.as_deref());
        if country.is_none() {
            report.unresolved += 1;
        }

        match store.insert_item(&item, country.as_deref(), now)? {
            Some(_) => report.saved += 1,
            None => report.duplicates += 1,
        }
    }

    counter!("ingest_saved_total").increment(report.saved as u64);
    counter!("ingest_duplicate_total").increment(report.duplicates as u64);
    counter!("ingest_unresolved_country_total").increment(report.unresolved as u64);

    tracing::info!(
        target: "ingest",
        collected = report.collected,
        saved = report.saved,
        duplicates = report.duplicates,
        unresolved = report.unresolved,
        "items persisted"
    );
    Ok(report)
}
