//! Retention sweep: drops raw items and hourly summaries older than a horizon.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::store::{PurgeCounts, StorageError, Store};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("retention horizon of {0} days is out of range")]
    HorizonOutOfRange(u32),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// `now - days`, or `None` when that instant is not representable.
pub fn cutoff_for(days: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(days)).and_then(|d| now.checked_sub_signed(d))
}

/// Delete everything older than `days` before now. Returns rows removed.
pub fn purge_older_than(store: &mut Store, days: u32) -> Result<u64, RetentionError> {
    let cutoff = cutoff_for(days, Utc::now()).ok_or(RetentionError::HorizonOutOfRange(days))?;
    Ok(purge_before(store, cutoff)?)
}

/// Delete items ingested before `cutoff` and summaries whose bucket starts
/// before it. Rows exactly at the cutoff are kept; a second call returns 0.
pub fn purge_before(store: &mut Store, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
    crate::metrics::describe_pipeline_metrics();

    let PurgeCounts { items, summaries } = store.delete_before(cutoff)?;
    let total = items + summaries;

    metrics::counter!("retention_deleted_total").increment(total);
    if total > 0 {
        tracing::info!(target: "retention", %cutoff, items, summaries, "old data removed");
    } else {
        tracing::debug!(target: "retention", %cutoff, "nothing to remove");
    }
    Ok(total)
}
