// src/config/pipeline.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::credibility::SourceCategory;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
const ENV_RETENTION_DAYS: &str = "RETENTION_DAYS";
const ENV_COLLECTION_INTERVAL: &str = "COLLECTION_INTERVAL_SECS";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub aggregation: AggregationConfig,
    pub retention: RetentionConfig,
    pub collection: CollectionConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/sentiment.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregationConfig {
    pub bucket_secs: i64,
    /// Whether `skipped` items (failed scoring, score 0.0) count toward aggregates.
    pub include_skipped: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            bucket_secs: crate::aggregate::DEFAULT_BUCKET_SECS,
            include_skipped: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetentionConfig {
    pub days: u32,
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: crate::retention::DEFAULT_RETENTION_DAYS,
            sweep_interval_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub score_batch_size: usize,
    pub feeds: Vec<FeedConfig>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            score_batch_size: 64,
            feeds: Vec::new(),
        }
    }
}

/// One RSS feed to poll.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_feed_category")]
    pub category: SourceCategory,
    /// Fixed ISO alpha-2 code for national feeds.
    #[serde(default)]
    pub country: Option<String>,
}

fn default_feed_category() -> SourceCategory {
    SourceCategory::Feed
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub credibility: PathBuf,
    pub aliases: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            credibility: PathBuf::from("config/credibility.json"),
            aliases: PathBuf::from("config/country_aliases.json"),
        }
    }
}

impl AppConfig {
    /// Parse a TOML config. Missing sections and fields take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing pipeline config toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file, then apply env overrides:
    /// 1) $PIPELINE_CONFIG_PATH (must exist)
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `DATABASE_PATH`, `RETENTION_DAYS`, `COLLECTION_INTERVAL_SECS`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(p) = env::var(ENV_DATABASE_PATH) {
            if !p.trim().is_empty() {
                self.store.path = PathBuf::from(p.trim());
            }
        }
        if let Ok(v) = env::var(ENV_RETENTION_DAYS) {
            self.retention.days = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_RETENTION_DAYS}={v} is not a day count"))?;
        }
        if let Ok(v) = env::var(ENV_COLLECTION_INTERVAL) {
            self.collection.interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_COLLECTION_INTERVAL}={v} is not a number of seconds"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.aggregation.bucket_secs <= 0 {
            return Err(anyhow!("aggregation.bucket_secs must be positive"));
        }
        if self.collection.interval_secs == 0 {
            return Err(anyhow!("collection.interval_secs must be positive"));
        }
        if crate::retention::cutoff_for(self.retention.days, chrono::Utc::now()).is_none() {
            return Err(anyhow!("retention.days = {} is out of range", self.retention.days));
        }
        for feed in &self.collection.feeds {
            if let Some(c) = &feed.country {
                if !crate::geo::registry::is_valid_alpha2(c) {
                    return Err(anyhow!("feed '{}' has unknown country code '{c}'", feed.name));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.retention.days, 30);
        assert_eq!(cfg.aggregation.bucket_secs, 3600);
        assert!(!cfg.aggregation.include_skipped);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [aggregation]
            include_skipped = true

            [[collection.feeds]]
            name = "Tagesschau"
            url = "https://example.test/de.xml"
            country = "DE"
            "#,
        )
        .unwrap();
        assert!(cfg.aggregation.include_skipped);
        assert_eq!(cfg.aggregation.bucket_secs, 3600);
        assert_eq!(cfg.collection.feeds.len(), 1);
        assert_eq!(cfg.collection.feeds[0].category, SourceCategory::Feed);
        assert_eq!(cfg.collection.feeds[0].country.as_deref(), Some("DE"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(AppConfig::from_toml_str("[aggregation]\nbucket_secs = 0").is_err());
        let bad_feed = r#"
            [[collection.feeds]]
            name = "X"
            url = "https://example.test/x.xml"
            country = "XX"
        "#;
        assert!(AppConfig::from_toml_str(bad_feed).is_err());
        assert!(AppConfig::from_toml_str("store = 5").is_err());
        assert!(AppConfig::from_toml_str("[retention]\ndays = 4294967295").is_err());
    }
}
