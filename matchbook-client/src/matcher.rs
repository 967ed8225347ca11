//! Request coordination: derive key, check caches, call remote, store,
//! decode.
//!
//! The key for a request is computed once and reused for both the cache
//! lookup and the post-call store; the two must never diverge. The
//! check-then-call-then-store sequence is not atomic: concurrent
//! identical requests may each observe a miss and each call the remote,
//! with the last write winning in the ephemeral cache.

use chrono::Utc;
use matchbook_core::{
    derive_key, BulkRequest, MatchDescriptor, MatchResult, MatchbookError, MatchbookResult,
    ValidationError,
};
use matchbook_store::{DurableRecord, DurableResultStore, EphemeralCache};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::transport::{MatchTransport, TransportResponse, BULK_ENDPOINT, MATCH_ENDPOINT};
use crate::wire::{self, MatchEnvelope, SubjectEnvelope};

/// Outcome of a bulk lookup.
///
/// Subjects the service flagged as errored are excluded from `results`
/// and reported in `failed_subjects` instead of raising; a partial
/// failure never aborts the batch.
#[derive(Debug, Clone, Default)]
pub struct BulkMatchOutcome {
    pub results: HashMap<String, MatchResult>,
    /// Subject ids flagged as errored, in sorted order.
    pub failed_subjects: Vec<String>,
}

impl BulkMatchOutcome {
    pub fn failure_count(&self) -> usize {
        self.failed_subjects.len()
    }
}

/// Coordinates lookups across the ephemeral cache, the durable store
/// and the remote matching service.
pub struct Matcher<T: MatchTransport> {
    transport: T,
    cache: EphemeralCache,
    durable: Option<DurableResultStore>,
}

impl<T: MatchTransport> Matcher<T> {
    pub fn new(transport: T, cache: EphemeralCache) -> Self {
        Self {
            transport,
            cache,
            durable: None,
        }
    }

    /// Attach a durable result store, consulted and updated by bulk
    /// lookups.
    pub fn with_durable_store(mut self, store: DurableResultStore) -> Self {
        self.durable = Some(store);
        self
    }

    /// Look up a single descriptor.
    ///
    /// On an ephemeral cache hit the raw payload is decoded and
    /// returned without any remote call. On a miss the remote response
    /// is validated, stored under the lookup key, and decoded.
    pub async fn match_one(&self, descriptor: &MatchDescriptor) -> MatchbookResult<MatchResult> {
        let key = derive_key(MATCH_ENDPOINT, &descriptor.to_params());

        if let Some(body) = self.cache.get(&key).await? {
            debug!(key = %key, "ephemeral cache hit");
            let url = self.transport.match_url(descriptor);
            let result = MatchEnvelope::decode(&body)?.into_result(&url)?;
            return Ok(MatchResult::from_value(result)?.with_url(url));
        }

        debug!(key = %key, "ephemeral cache miss, calling remote");
        let response = self.transport.get_match(descriptor).await?;
        let (url, body) = classify(response)?;
        let result = MatchEnvelope::decode(&body)?.into_result(&url)?;

        // Same key as the lookup above; the payload only reaches the
        // cache once the response has been validated. The cache is
        // best-effort: a failed store never fails a call that already
        // holds a usable response.
        if let Err(err) = self.cache.set(&key, &body).await {
            warn!(key = %key, error = %err, "failed to store response in ephemeral cache");
        }

        Ok(MatchResult::from_value(result)?.with_url(url))
    }

    /// Look up a batch of descriptors keyed by subject id.
    ///
    /// Checks the ephemeral cache for the whole batch, short-circuits
    /// subject ids covered by a sufficiently fresh durable record, and
    /// POSTs the full bulk body for the remainder. Decoded results are
    /// offered to the durable store regardless of whether they are
    /// returned.
    pub async fn match_bulk(&self, request: &BulkRequest) -> MatchbookResult<BulkMatchOutcome> {
        let key = derive_key(BULK_ENDPOINT, &request.to_params());

        if let Some(body) = self.cache.get(&key).await? {
            debug!(key = %key, "ephemeral cache hit for bulk request");
            let envelopes = wire::decode_bulk(&body)?;
            let url = self.transport.bulk_url();
            return self.assemble(envelopes, HashMap::new(), &url).await;
        }

        let mut covered: HashMap<String, DurableRecord> = HashMap::new();
        if let Some(store) = &self.durable {
            let ids = request.subject_ids();
            let (found, missing) = store.fetch_many(&ids).await?;
            let now = Utc::now();
            covered = found
                .into_iter()
                .filter(|(_, record)| record.is_fresh(now, store.max_age()))
                .collect();
            debug!(
                covered = covered.len(),
                missing = missing.len(),
                "durable store consulted"
            );
        }

        if !covered.is_empty() && covered.len() == request.len() {
            debug!("all subjects covered by fresh durable records");
            let url = self.transport.bulk_url();
            return assemble_from_durable(covered, &url);
        }

        let response = self.transport.post_bulk(request).await?;
        let (url, body) = classify(response)?;
        let envelopes = wire::decode_bulk(&body)?;

        // Same key as the lookup above; best-effort, as in match_one.
        if let Err(err) = self.cache.set(&key, &body).await {
            warn!(key = %key, error = %err, "failed to store response in ephemeral cache");
        }

        self.assemble(envelopes, covered, &url).await
    }

    /// Turn per-subject envelopes into an outcome, preferring durable
    /// records for covered subjects and feeding every decoded result to
    /// the durable store.
    async fn assemble(
        &self,
        envelopes: HashMap<String, SubjectEnvelope>,
        covered: HashMap<String, DurableRecord>,
        url: &str,
    ) -> MatchbookResult<BulkMatchOutcome> {
        let now = Utc::now();
        let mut outcome = BulkMatchOutcome::default();

        for (subject_id, envelope) in envelopes {
            if envelope.error {
                if covered.contains_key(&subject_id) {
                    // The fresh durable record stands in; a subject is
                    // never both a result and a failure.
                    warn!(subject_id = %subject_id, "subject errored remotely, serving durable record");
                } else {
                    warn!(subject_id = %subject_id, "subject flagged as errored by the service");
                    outcome.failed_subjects.push(subject_id);
                }
                continue;
            }

            let result_value = envelope.result.ok_or_else(|| {
                MatchbookError::from(ValidationError::RequiredFieldMissing {
                    field: "result".to_string(),
                })
            })?;

            // Stored independent of whether this record is returned.
            if let Some(store) = &self.durable {
                let quality = result_value
                    .get("people_count")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                store
                    .store_if_better(&subject_id, &result_value, quality, now)
                    .await?;
            }

            if covered.contains_key(&subject_id) {
                continue;
            }

            outcome.results.insert(
                subject_id,
                MatchResult::from_value(result_value)?.with_url(url),
            );
        }

        for (subject_id, record) in covered {
            outcome.results.insert(
                subject_id,
                MatchResult::from_value(record.payload)?.with_url(url),
            );
        }

        outcome.failed_subjects.sort();
        Ok(outcome)
    }
}

/// Build an outcome purely from durable records, with no remote call.
fn assemble_from_durable(
    covered: HashMap<String, DurableRecord>,
    url: &str,
) -> MatchbookResult<BulkMatchOutcome> {
    let mut outcome = BulkMatchOutcome::default();
    for (subject_id, record) in covered {
        outcome.results.insert(
            subject_id,
            MatchResult::from_value(record.payload)?.with_url(url),
        );
    }
    Ok(outcome)
}

/// Apply the transport-level contract: anything but a 200 is fatal.
fn classify(response: TransportResponse) -> MatchbookResult<(String, Vec<u8>)> {
    if response.status != 200 {
        return Err(MatchbookError::InvalidStatus {
            status: response.status,
            url: response.url,
        });
    }
    Ok((response.url, response.body))
}
