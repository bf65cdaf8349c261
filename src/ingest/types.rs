// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credibility::SourceCategory;

/// Collector output, independent of where the item came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedItem {
    pub source_category: SourceCategory,
    pub source_label: String, // display only, e.g. "BBC News"
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub url: String, // dedup key
    #[serde(default)]
    pub country_hint: Option<String>, // ISO alpha-2 when the source knows it
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self) -> Result<Vec<NormalizedItem>>;

    /// Collectors missing credentials or endpoints report `false` and are skipped.
    fn is_configured(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}
