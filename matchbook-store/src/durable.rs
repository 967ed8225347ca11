//! Durable per-subject result store with a quality/age overwrite policy.
//!
//! Unlike the ephemeral cache, records here never expire on their own.
//! A stored record is replaced only when a candidate is strictly better
//! (more matched people) or the record has aged past the freshness
//! horizon. The policy is check-then-act without mutual exclusion:
//! concurrent writers for one subject id can race between fetch and
//! write, so convergence is best-effort, not linearizable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchbook_core::{MatchbookResult, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default freshness horizon (30 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 3600);

/// Backend seam for the durable store: an opaque per-key blob store.
///
/// Implementations resolve their backing container (bucket, table,
/// database) at construction, creating it if it does not exist, and fail
/// with [`StoreError::Unavailable`] when neither works.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> MatchbookResult<Option<Vec<u8>>>;
    async fn put(&self, key: &str, payload: &[u8]) -> MatchbookResult<()>;
}

/// Persisted wire shape for one subject's record.
///
/// The timestamp is an RFC 3339 instant: locale independent and
/// parseable back into a typed time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    result: Value,
    #[serde(default)]
    timestamp: Option<String>,
}

/// One subject's stored result with freshness and quality metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DurableRecord {
    pub subject_id: String,
    /// MatchResult-shaped payload as stored.
    pub payload: Value,
    /// Count of matched person records; higher is strictly better.
    pub quality: i64,
    /// When the record was written. `None` means the stored timestamp
    /// was missing or unparseable; such records are infinitely stale and
    /// always eligible for replacement, never silently fresh.
    pub stored_at: Option<DateTime<Utc>>,
}

impl DurableRecord {
    /// Whether this record is within the freshness horizon as of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.stored_at {
            Some(at) => {
                let age = now
                    .signed_duration_since(at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                age <= max_age
            }
            None => false,
        }
    }
}

/// Per-subject object store with a freshness/quality overwrite policy.
pub struct DurableResultStore {
    store: Arc<dyn ObjectStore>,
    max_age: Duration,
}

impl DurableResultStore {
    /// Wrap an already-resolved object store with the default freshness
    /// horizon. Container resolution (fetch-if-exists, else create) is
    /// the backend constructor's job and fails fatally there.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Set the freshness horizon beyond which records are replaceable
    /// regardless of quality.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Fetch records for the given subject ids.
    ///
    /// Returns the records that exist alongside the subset of ids with
    /// no stored record. Stored blobs that fail to decode entirely are
    /// reported as missing.
    pub async fn fetch_many(
        &self,
        subject_ids: &[String],
    ) -> MatchbookResult<(HashMap<String, DurableRecord>, Vec<String>)> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();

        for subject_id in subject_ids {
            match self.store.get(subject_id).await? {
                Some(bytes) => match decode_record(subject_id, &bytes) {
                    Some(record) => {
                        found.insert(subject_id.clone(), record);
                    }
                    None => missing.push(subject_id.clone()),
                },
                None => missing.push(subject_id.clone()),
            }
        }

        Ok((found, missing))
    }

    /// Store `payload` for `subject_id` iff the overwrite policy allows
    /// it. Returns whether the write was applied.
    ///
    /// The candidate wins when any of:
    /// 1. no record exists for this subject id,
    /// 2. `quality` is strictly greater than the stored quality,
    /// 3. the stored record has aged past the freshness horizon.
    ///
    /// Otherwise the existing record is retained unchanged and the
    /// candidate is discarded. Accepted writes stamp `now` as the new
    /// record's timestamp.
    pub async fn store_if_better(
        &self,
        subject_id: &str,
        payload: &Value,
        quality: i64,
        now: DateTime<Utc>,
    ) -> MatchbookResult<bool> {
        if let Some(bytes) = self.store.get(subject_id).await? {
            if let Some(existing) = decode_record(subject_id, &bytes) {
                let better = quality > existing.quality;
                let stale = !existing.is_fresh(now, self.max_age);
                if !better && !stale {
                    return Ok(false);
                }
            }
        }

        let record = StoredRecord {
            result: payload.clone(),
            timestamp: Some(now.to_rfc3339()),
        };
        let bytes = serde_json::to_vec(&record).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;
        self.store.put(subject_id, &bytes).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for DurableResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableResultStore")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

/// Decode a stored blob into a record. Returns `None` when the blob is
/// not a stored record at all; an unparseable timestamp only clears
/// `stored_at`.
fn decode_record(subject_id: &str, bytes: &[u8]) -> Option<DurableRecord> {
    let stored: StoredRecord = serde_json::from_slice(bytes).ok()?;
    let stored_at = stored
        .timestamp
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));
    let quality = stored
        .result
        .get("people_count")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    Some(DurableRecord {
        subject_id: subject_id.to_string(),
        payload: stored.result,
        quality,
        stored_at,
    })
}
