// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::config::FeedConfig;
use crate::credibility::SourceCategory;
use crate::ingest::types::{Collector, NormalizedItem};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(ts.trim(), &Rfc2822).ok()?;
    Utc.timestamp_opt(odt.unix_timestamp(), 0).single()
}

/// RSS 2.0 collector over a static document or an HTTP endpoint.
pub struct RssFeedCollector {
    label: String,
    category: SourceCategory,
    country: Option<String>,
    mode: Mode,
}

enum Mode {
    Static(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeedCollector {
    /// Collector over an in-memory XML document (fixtures, tests).
    pub fn from_xml(label: &str, xml: &str) -> Self {
        Self {
            label: label.to_string(),
            category: SourceCategory::Feed,
            country: None,
            mode: Mode::Static(xml.to_string()),
        }
    }

    pub fn from_url(label: &str, url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            label: label.to_string(),
            category: SourceCategory::Feed,
            country: None,
            mode: Mode::Http {
                url: url.trim().to_string(),
                client,
            },
        }
    }

    pub fn from_config(cfg: &FeedConfig) -> Self {
        Self::from_url(&cfg.name, &cfg.url)
            .with_category(cfg.category.clone())
            .with_country(cfg.country.clone())
    }

    pub fn with_category(mut self, category: SourceCategory) -> Self {
        self.category = category;
        self
    }

    /// Fixed country for every item of a national feed.
    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.country = country.map(|c| c.trim().to_ascii_uppercase());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn parse_items(&self, xml: &str) -> Result<Vec<NormalizedItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing rss xml for {}", self.label))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let Some(url) = it.link.or(it.guid).filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let title = it.title.unwrap_or_default();
            if title.trim().is_empty() {
                continue;
            }
            out.push(NormalizedItem {
                source_category: self.category.clone(),
                source_label: self.label.clone(),
                title,
                body: it.description,
                url,
                country_hint: self.country.clone(),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl Collector for RssFeedCollector {
    async fn collect(&self) -> Result<Vec<NormalizedItem>> {
        match &self.mode {
            Mode::Static(s) => self.parse_items(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("rss http get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("rss http status {url}"))?
                    .text()
                    .await
                    .context("rss http .text()")?;
                self.parse_items(&body)
            }
        }
    }

    fn is_configured(&self) -> bool {
        match &self.mode {
            Mode::Static(_) => true,
            Mode::Http { url, .. } => url.starts_with("http://") || url.starts_with("https://"),
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

/// quick-xml only knows the XML entities; map the common HTML ones first.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
