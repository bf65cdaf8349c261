//! # Source credibility
//!
//! Static mapping from a source *category* to a trust weight in `[0.0, 1.0]`,
//! used by the hourly aggregation as the per-item weight.
//!
//! - Loads from JSON config (`default_weight`, `weights`, `aliases`).
//! - Category lookup is case-insensitive and tolerant of `-`/space/`_` spelling.
//! - Aliases map legacy collector names (`rss`, `hn`, `reddit`, ...) to categories.
//! - Falls back to the built-in `default_seed()` when the file is missing or broken.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::Path};

/// Weight for categories the table does not know.
pub const DEFAULT_WEIGHT: f64 = 0.5;

/// Where an item came from. Closed set plus an escape hatch for new collectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceCategory {
    Feed,
    OfficialFeed,
    Scraped,
    ThirdPartyApi,
    TechAggregator,
    ForumApi,
    FederatedSocial,
    Other(String),
}

impl SourceCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Feed => "feed",
            Self::OfficialFeed => "official_feed",
            Self::Scraped => "scraped",
            Self::ThirdPartyApi => "third_party_api",
            Self::TechAggregator => "tech_aggregator",
            Self::ForumApi => "forum_api",
            Self::FederatedSocial => "federated_social",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Parse a stored or configured category. Unknown names become `Other`.
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "feed" | "rss" => Self::Feed,
            "official_feed" | "gov" => Self::OfficialFeed,
            "scraped" | "scraper" => Self::Scraped,
            "third_party_api" | "newsapi" => Self::ThirdPartyApi,
            "tech_aggregator" | "hn" | "hackernews" => Self::TechAggregator,
            "forum_api" | "reddit" => Self::ForumApi,
            "federated_social" | "mastodon" => Self::FederatedSocial,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SourceCategory {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<SourceCategory> for String {
    fn from(c: SourceCategory) -> Self {
        c.as_str().to_string()
    }
}

/// Credibility table, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CredibilityModel {
    /// Weight used when a category has no entry.
    #[serde(default = "default_default_weight")]
    pub default_weight: f64,
    /// Weight per canonical category key.
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    /// Extra names → canonical category key.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_default_weight() -> f64 {
    DEFAULT_WEIGHT
}

impl Default for CredibilityModel {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl CredibilityModel {
    /// Load the table from a JSON file, falling back to `default_seed()`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => {
                tracing::debug!(path = %path.display(), "credibility file missing; using built-in table");
                return Self::default_seed();
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(mut model) => {
                model.normalize_keys();
                model
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid credibility file; using built-in table");
                Self::default_seed()
            }
        }
    }

    /// Weight for a category, clamped to `[0, 1]`.
    ///
    /// 1. Alias → canonical key → weight.
    /// 2. Direct key.
    /// 3. `default_weight`.
    pub fn weight_for(&self, category: &SourceCategory) -> f64 {
        self.weight_for_key(category.as_str())
    }

    /// Same lookup for a raw category string (as stored in the database).
    pub fn weight_for_key(&self, key: &str) -> f64 {
        let k = normalize(key);

        if let Some(canon) = self.aliases.get(&k) {
            if let Some(&w) = self.weights.get(&normalize(canon)) {
                return clamp01(w);
            }
        }
        if let Some(&w) = self.weights.get(&k) {
            return clamp01(w);
        }
        clamp01(self.default_weight)
    }

    fn normalize_keys(&mut self) {
        self.weights = self
            .weights
            .drain()
            .map(|(k, w)| (normalize(&k), w))
            .collect();
        self.aliases = self
            .aliases
            .drain()
            .map(|(k, v)| (normalize(&k), normalize(&v)))
            .collect();
    }

    /// Built-in table: feeds trusted most, federated social least.
    pub fn default_seed() -> Self {
        let mut weights = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [
            ("feed", 1.0),
            ("official_feed", 1.0),
            ("scraped", 0.9),
            ("third_party_api", 0.9),
            ("tech_aggregator", 0.8),
            ("forum_api", 0.6),
            ("federated_social", 0.5),
        ] {
            weights.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("rss", "feed"),
            ("scraper", "scraped"),
            ("hn", "tech_aggregator"),
            ("hackernews", "tech_aggregator"),
            ("reddit", "forum_api"),
            ("mastodon", "federated_social"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_weight: DEFAULT_WEIGHT,
            weights,
            aliases,
        }
    }
}

/// Lowercase, unify `-`/space to `_`, collapse repeats.
fn normalize(s: &str) -> String {
    let lowered = s.trim().to_ascii_lowercase().replace(['-', ' ', '.'], "_");
    lowered
        .split('_')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}
