//! SQLite persistence for raw items and per-country hourly summaries.
//!
//! Timestamps are stored as UTC unix milliseconds so window and cutoff
//! checks are plain integer comparisons.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::credibility::SourceCategory;
use crate::ingest::types::NormalizedItem;
use crate::sentiment::SentimentLabel;

pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// A persisted item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredItem {
    pub id: i64,
    pub source_category: SourceCategory,
    pub source_label: String,
    pub country_code: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<SentimentLabel>,
    pub confidence: Option<f64>,
    pub published_at: Option<DateTime<Utc>>,
    pub scored_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
}

/// One row of `country_hour_summaries`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryHourSummary {
    pub country_code: String,
    pub hour_bucket: DateTime<Utc>,
    pub avg_sentiment: f64,
    pub weighted_sentiment: Option<f64>,
    pub article_count: u64,
    /// Weak item ids; may dangle after retention.
    pub top_positive_ref: Option<i64>,
    pub top_negative_ref: Option<i64>,
    /// Last run that changed a computed field.
    pub updated_at: DateTime<Utc>,
}

impl CountryHourSummary {
    /// The value shown to readers: weighted mean when present, plain mean otherwise.
    pub fn display_sentiment(&self) -> f64 {
        self.weighted_sentiment.unwrap_or(self.avg_sentiment)
    }
}

/// Minimal projection used by the aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub id: i64,
    pub country_code: String,
    pub source_category: String,
    pub score: f64,
}

/// Scorer output applied to one stored item.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentAnnotation {
    pub item_id: i64,
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl SentimentAnnotation {
    /// Marker for a failed scoring attempt.
    pub fn skipped(item_id: i64) -> Self {
        Self {
            item_id,
            score: 0.0,
            label: SentimentLabel::Skipped,
            confidence: 0.0,
        }
    }
}

/// Polarity filter for headline listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadlineFilter {
    #[default]
    All,
    Positive,
    Negative,
    Neutral,
}

/// Polarity cut-off used by [`HeadlineFilter`].
pub const HEADLINE_POLARITY: f64 = 0.2;

/// Rows removed by a retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeCounts {
    pub items: u64,
    pub summaries: u64,
}

impl PurgeCounts {
    pub fn total(&self) -> u64 {
        self.items + self.summaries
    }
}

pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(StorageError::Timestamp(ms))
}

fn opt_from_millis(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, StorageError> {
    ms.map(from_millis).transpose()
}

const ITEM_COLUMNS: &str = "id, source_category, source_label, country_code, title, body, url, \
     sentiment_score, sentiment_label, confidence, published_at, scored_at, ingested_at";

const SUMMARY_COLUMNS: &str = "country_code, hour_bucket, avg_sentiment, weighted_sentiment, \
     article_count, top_positive_ref, top_negative_ref, updated_at";

struct ItemRow {
    id: i64,
    source_category: String,
    source_label: String,
    country_code: Option<String>,
    title: String,
    body: Option<String>,
    url: String,
    sentiment_score: Option<f64>,
    sentiment_label: Option<String>,
    confidence: Option<f64>,
    published_at: Option<i64>,
    scored_at: Option<i64>,
    ingested_at: i64,
}

impl ItemRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_category: row.get(1)?,
            source_label: row.get(2)?,
            country_code: row.get(3)?,
            title: row.get(4)?,
            body: row.get(5)?,
            url: row.get(6)?,
            sentiment_score: row.get(7)?,
            sentiment_label: row.get(8)?,
            confidence: row.get(9)?,
            published_at: row.get(10)?,
            scored_at: row.get(11)?,
            ingested_at: row.get(12)?,
        })
    }

    fn into_item(self) -> Result<StoredItem, StorageError> {
        Ok(StoredItem {
            id: self.id,
            source_category: SourceCategory::parse(&self.source_category),
            source_label: self.source_label,
            country_code: self.country_code,
            title: self.title,
            body: self.body,
            url: self.url,
            sentiment_score: self.sentiment_score,
            sentiment_label: self.sentiment_label.as_deref().and_then(SentimentLabel::parse),
            confidence: self.confidence,
            published_at: opt_from_millis(self.published_at)?,
            scored_at: opt_from_millis(self.scored_at)?,
            ingested_at: from_millis(self.ingested_at)?,
        })
    }
}

struct SummaryRow {
    country_code: String,
    hour_bucket: i64,
    avg_sentiment: f64,
    weighted_sentiment: Option<f64>,
    article_count: i64,
    top_positive_ref: Option<i64>,
    top_negative_ref: Option<i64>,
    updated_at: i64,
}

impl SummaryRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            country_code: row.get(0)?,
            hour_bucket: row.get(1)?,
            avg_sentiment: row.get(2)?,
            weighted_sentiment: row.get(3)?,
            article_count: row.get(4)?,
            top_positive_ref: row.get(5)?,
            top_negative_ref: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_summary(self) -> Result<CountryHourSummary, StorageError> {
        Ok(CountryHourSummary {
            country_code: self.country_code,
            hour_bucket: from_millis(self.hour_bucket)?,
            avg_sentiment: self.avg_sentiment,
            weighted_sentiment: self.weighted_sentiment,
            article_count: u64::try_from(self.article_count).unwrap_or(0),
            top_positive_ref: self.top_positive_ref,
            top_negative_ref: self.top_negative_ref,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../../migrations/0001_init.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    /// `SELECT 1` round trip.
    pub fn ping(&self) -> bool {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    // ---- items -------------------------------------------------------------

    /// Insert an item. Returns `None` when the URL is already stored.
    pub fn insert_item(
        &self,
        item: &NormalizedItem,
        country_code: Option<&str>,
        ingested_at: DateTime<Utc>,
    ) -> Result<Option<i64>, StorageError> {
        let changes = self.conn.execute(
            "
            INSERT OR IGNORE INTO items (
                source_category, source_label, country_code, title, body, url,
                published_at, ingested_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                item.source_category.as_str(),
                item.source_label,
                country_code,
                item.title,
                item.body,
                item.url,
                item.published_at.map(to_millis),
                to_millis(ingested_at),
            ],
        )?;
        if changes == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    pub fn url_exists(&self, url: &str) -> Result<bool, StorageError> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM items WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn item(&self, id: i64) -> Result<Option<StoredItem>, StorageError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], ItemRow::read)
            .optional()?
            .map(ItemRow::into_item)
            .transpose()
    }

    /// Unscored items with `id > cursor`, ascending, at most `limit`.
    pub fn unscored_after(&self, cursor: i64, limit: usize) -> Result<Vec<StoredItem>, StorageError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE id > ?1 AND sentiment_score IS NULL
             ORDER BY id ASC LIMIT ?2"
        );
        self.query_items(&sql, params![cursor, limit as i64])
    }

    /// Write a scorer annotation. Score is clamped to `[-1, 1]`, confidence to `[0, 1]`.
    /// Returns `false` when the item does not exist.
    pub fn apply_annotation(
        &self,
        annotation: &SentimentAnnotation,
        scored_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let score = clamp_or_zero(annotation.score, -1.0, 1.0);
        let confidence = clamp_or_zero(annotation.confidence, 0.0, 1.0);
        let changes = self.conn.execute(
            "
            UPDATE items
            SET sentiment_score = ?2, sentiment_label = ?3, confidence = ?4, scored_at = ?5
            WHERE id = ?1
            ",
            params![
                annotation.item_id,
                score,
                annotation.label.as_str(),
                confidence,
                to_millis(scored_at),
            ],
        )?;
        Ok(changes > 0)
    }

    /// Scored, country-tagged items with `start <= ingested_at < end`.
    pub fn scored_items_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        include_skipped: bool,
    ) -> Result<Vec<ScoredRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, country_code, source_category, sentiment_score
            FROM items
            WHERE ingested_at >= ?1 AND ingested_at < ?2
              AND sentiment_score IS NOT NULL
              AND country_code IS NOT NULL
              AND (?3 OR sentiment_label IS NULL OR sentiment_label != 'skipped')
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![to_millis(start), to_millis(end), include_skipped],
            |row| {
                Ok(ScoredRow {
                    id: row.get(0)?,
                    country_code: row.get(1)?,
                    source_category: row.get(2)?,
                    score: row.get(3)?,
                })
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Country items since `since`, most extreme score first.
    pub fn top_items_by_magnitude(
        &self,
        country_code: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StoredItem>, StorageError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE country_code = ?1 AND ingested_at >= ?2 AND sentiment_score IS NOT NULL
             ORDER BY ABS(sentiment_score) DESC, id ASC LIMIT ?3"
        );
        self.query_items(&sql, params![country_code, to_millis(since), limit as i64])
    }

    /// Scored country items matching `filter`, most extreme first.
    pub fn headlines(
        &self,
        country_code: &str,
        filter: HeadlineFilter,
        limit: usize,
    ) -> Result<Vec<StoredItem>, StorageError> {
        let p = HEADLINE_POLARITY;
        let clause = match filter {
            HeadlineFilter::All => String::new(),
            HeadlineFilter::Positive => format!("AND sentiment_score > {p}"),
            HeadlineFilter::Negative => format!("AND sentiment_score < -{p}"),
            HeadlineFilter::Neutral => {
                format!("AND sentiment_score >= -{p} AND sentiment_score <= {p}")
            }
        };
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE country_code = ?1 AND sentiment_score IS NOT NULL {clause}
             ORDER BY ABS(sentiment_score) DESC, id DESC LIMIT ?2"
        );
        self.query_items(&sql, params![country_code, limit as i64])
    }

    /// Item counts per source category for a country since `since`.
    pub fn category_counts(
        &self,
        country_code: &str,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, u64>, StorageError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT source_category, COUNT(*)
            FROM items
            WHERE country_code = ?1 AND ingested_at >= ?2
            GROUP BY source_category
            ",
        )?;
        let rows = stmt.query_map(params![country_code, to_millis(since)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (category, n) = row?;
            out.insert(category, u64::try_from(n).unwrap_or(0));
        }
        Ok(out)
    }

    /// Item count and mean score per source category since `since`.
    pub fn source_stats(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, u64, Option<f64>)>, StorageError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT source_category, COUNT(*), AVG(sentiment_score)
            FROM items
            WHERE ingested_at >= ?1
            GROUP BY source_category
            ORDER BY source_category ASC
            ",
        )?;
        let rows = stmt.query_map(params![to_millis(since)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                u64::try_from(row.get::<_, i64>(1)?).unwrap_or(0),
                row.get::<_, Option<f64>>(2)?,
            ))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count_items_since(&self, since: DateTime<Utc>) -> Result<u64, StorageError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE ingested_at >= ?1",
            params![to_millis(since)],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    pub fn count_items(&self) -> Result<u64, StorageError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    pub fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let ms: Option<i64> = self
            .conn
            .query_row("SELECT MAX(ingested_at) FROM items", [], |row| row.get(0))?;
        opt_from_millis(ms)
    }

    fn query_items(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredItem>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ItemRow::read)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_item()?);
        }
        Ok(out)
    }

    // ---- summaries ---------------------------------------------------------

    /// Upsert every summary in one transaction.
    ///
    /// A row whose computed fields are unchanged is left as is, `updated_at`
    /// included, so re-running a bucket over the same items is a no-op.
    ///
    /// `abort` is polled before each row; when it returns `true` the
    /// transaction is rolled back and `Ok(false)` is returned. Any error also
    /// rolls back every row.
    pub fn upsert_summaries(
        &mut self,
        summaries: &[CountryHourSummary],
        abort: impl Fn() -> bool,
    ) -> Result<bool, StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO country_hour_summaries (
                    country_code, hour_bucket, avg_sentiment, weighted_sentiment,
                    article_count, top_positive_ref, top_negative_ref, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(country_code, hour_bucket) DO UPDATE SET
                    avg_sentiment = excluded.avg_sentiment,
                    weighted_sentiment = excluded.weighted_sentiment,
                    article_count = excluded.article_count,
                    top_positive_ref = excluded.top_positive_ref,
                    top_negative_ref = excluded.top_negative_ref,
                    updated_at = excluded.updated_at
                WHERE avg_sentiment IS NOT excluded.avg_sentiment
                    OR weighted_sentiment IS NOT excluded.weighted_sentiment
                    OR article_count IS NOT excluded.article_count
                    OR top_positive_ref IS NOT excluded.top_positive_ref
                    OR top_negative_ref IS NOT excluded.top_negative_ref
                ",
            )?;
            for s in summaries {
                if abort() {
                    // Dropping `tx` without commit rolls back.
                    return Ok(false);
                }
                stmt.execute(params![
                    s.country_code,
                    to_millis(s.hour_bucket),
                    s.avg_sentiment,
                    s.weighted_sentiment,
                    i64::try_from(s.article_count).unwrap_or(i64::MAX),
                    s.top_positive_ref,
                    s.top_negative_ref,
                    to_millis(s.updated_at),
                ])?;
            }
        }
        if abort() {
            return Ok(false);
        }
        tx.commit()?;
        Ok(true)
    }

    pub fn latest_bucket(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let ms: Option<i64> = self.conn.query_row(
            "SELECT MAX(hour_bucket) FROM country_hour_summaries",
            [],
            |row| row.get(0),
        )?;
        opt_from_millis(ms)
    }

    /// Every summary of one bucket, by country code.
    pub fn summaries_for_bucket(
        &self,
        bucket: DateTime<Utc>,
    ) -> Result<Vec<CountryHourSummary>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM country_hour_summaries
             WHERE hour_bucket = ?1 ORDER BY country_code ASC"
        );
        self.query_summaries(&sql, params![to_millis(bucket)])
    }

    pub fn summary(
        &self,
        country_code: &str,
        bucket: DateTime<Utc>,
    ) -> Result<Option<CountryHourSummary>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM country_hour_summaries
             WHERE country_code = ?1 AND hour_bucket = ?2"
        );
        self.conn
            .query_row(&sql, params![country_code, to_millis(bucket)], SummaryRow::read)
            .optional()?
            .map(SummaryRow::into_summary)
            .transpose()
    }

    /// The latest summary of a country strictly before `bucket`.
    pub fn previous_summary(
        &self,
        country_code: &str,
        bucket: DateTime<Utc>,
    ) -> Result<Option<CountryHourSummary>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM country_hour_summaries
             WHERE country_code = ?1 AND hour_bucket < ?2
             ORDER BY hour_bucket DESC LIMIT 1"
        );
        self.conn
            .query_row(&sql, params![country_code, to_millis(bucket)], SummaryRow::read)
            .optional()?
            .map(SummaryRow::into_summary)
            .transpose()
    }

    /// Summaries of one country with `hour_bucket >= since`, chronological.
    pub fn country_summaries_since(
        &self,
        country_code: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CountryHourSummary>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM country_hour_summaries
             WHERE country_code = ?1 AND hour_bucket >= ?2
             ORDER BY hour_bucket ASC"
        );
        self.query_summaries(&sql, params![country_code, to_millis(since)])
    }

    /// All summaries with `hour_bucket >= since`, chronological.
    pub fn summaries_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<CountryHourSummary>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM country_hour_summaries
             WHERE hour_bucket >= ?1
             ORDER BY hour_bucket ASC, country_code ASC"
        );
        self.query_summaries(&sql, params![to_millis(since)])
    }

    pub fn count_summaries(&self) -> Result<u64, StorageError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM country_hour_summaries",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn query_summaries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CountryHourSummary>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, SummaryRow::read)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_summary()?);
        }
        Ok(out)
    }

    // ---- retention ---------------------------------------------------------

    /// Delete items ingested before `cutoff` and summaries whose bucket starts
    /// before it, in one transaction. Rows exactly at `cutoff` stay.
    pub fn delete_before(&mut self, cutoff: DateTime<Utc>) -> Result<PurgeCounts, StorageError> {
        let cutoff_ms = to_millis(cutoff);
        let tx = self.conn.transaction()?;
        let items = tx.execute("DELETE FROM items WHERE ingested_at < ?1", params![cutoff_ms])?;
        let summaries = tx.execute(
            "DELETE FROM country_hour_summaries WHERE hour_bucket < ?1",
            params![cutoff_ms],
        )?;
        tx.commit()?;
        Ok(PurgeCounts {
            items: items as u64,
            summaries: summaries as u64,
        })
    }
}

fn clamp_or_zero(x: f64, lo: f64, hi: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(lo, hi)
}
