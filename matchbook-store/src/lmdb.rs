//! LMDB-backed store implementations.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a memory-mapped
//! key-value store. Two backends share the same environment pattern:
//!
//! - [`LmdbCacheBackend`] stores ephemeral payloads with an expiry
//!   deadline framed ahead of the bytes; reads past the deadline report
//!   absent, and reclamation is left to the store.
//! - [`LmdbObjectStore`] stores durable per-subject blobs in a named
//!   database, resolved open-or-create at construction.

use async_trait::async_trait;
use chrono::Utc;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use matchbook_core::{CacheKey, MatchbookResult, StoreError};
use std::path::Path;
use std::time::Duration;

use crate::durable::ObjectStore;
use crate::ephemeral::CacheBackend;

/// Deadline frame length: unix milliseconds, big endian.
const DEADLINE_LEN: usize = 8;

fn open_env<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Env, StoreError> {
    std::fs::create_dir_all(&path).map_err(|e| StoreError::Unavailable {
        reason: format!("failed to create store directory: {e}"),
    })?;

    unsafe {
        EnvOpenOptions::new()
            .map_size(max_size_mb * 1024 * 1024)
            .max_dbs(2)
            .open(path.as_ref())
    }
    .map_err(|e| StoreError::Unavailable {
        reason: format!("failed to open LMDB environment: {e}"),
    })
}

/// LMDB-backed ephemeral cache backend.
pub struct LmdbCacheBackend {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbCacheBackend {
    /// Open (or create) the cache database under `path`.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, StoreError> {
        let env = open_env(path, max_size_mb)?;

        let mut wtxn = env.write_txn().map_err(|e| StoreError::Unavailable {
            reason: format!("failed to begin transaction: {e}"),
        })?;
        let db = env
            .create_database(&mut wtxn, Some("ephemeral"))
            .map_err(|e| StoreError::Unavailable {
                reason: format!("failed to create cache database: {e}"),
            })?;
        wtxn.commit().map_err(|e| StoreError::Unavailable {
            reason: format!("failed to commit: {e}"),
        })?;

        Ok(Self { env, db })
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get(&self, key: &CacheKey) -> MatchbookResult<Option<Vec<u8>>> {
        let read_err = |reason: String| StoreError::ReadFailed {
            key: key.to_hex(),
            reason,
        };

        let rtxn = self.env.read_txn().map_err(|e| read_err(e.to_string()))?;
        let Some(raw) = self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(|e| read_err(e.to_string()))?
        else {
            return Ok(None);
        };

        if raw.len() < DEADLINE_LEN {
            return Err(read_err("truncated cache entry".to_string()).into());
        }
        let mut deadline_bytes = [0u8; DEADLINE_LEN];
        deadline_bytes.copy_from_slice(&raw[..DEADLINE_LEN]);
        let deadline_ms = i64::from_be_bytes(deadline_bytes);

        if Utc::now().timestamp_millis() >= deadline_ms {
            // Expired; left in place for the store to reclaim.
            return Ok(None);
        }

        Ok(Some(raw[DEADLINE_LEN..].to_vec()))
    }

    async fn set(&self, key: &CacheKey, payload: &[u8], ttl: Duration) -> MatchbookResult<()> {
        let write_err = |reason: String| StoreError::WriteFailed {
            key: key.to_hex(),
            reason,
        };

        let deadline_ms = Utc::now().timestamp_millis() + ttl.as_millis() as i64;
        let mut entry = Vec::with_capacity(DEADLINE_LEN + payload.len());
        entry.extend_from_slice(&deadline_ms.to_be_bytes());
        entry.extend_from_slice(payload);

        let mut wtxn = self.env.write_txn().map_err(|e| write_err(e.to_string()))?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &entry)
            .map_err(|e| write_err(e.to_string()))?;
        wtxn.commit().map_err(|e| write_err(e.to_string()))?;
        Ok(())
    }
}

/// LMDB-backed durable blob store.
///
/// The backing database is resolved lazily at construction: fetched if
/// it already exists in the environment, created otherwise. When both
/// fail, construction fails with [`StoreError::Unavailable`].
#[derive(Debug)]
pub struct LmdbObjectStore {
    env: Env,
    db: Database<Str, Bytes>,
}

impl LmdbObjectStore {
    /// Open the store under `path`, resolving the named container.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, StoreError> {
        let env = open_env(path, max_size_mb)?;

        let rtxn = env.read_txn().map_err(|e| StoreError::Unavailable {
            reason: format!("failed to begin transaction: {e}"),
        })?;
        let existing = env
            .open_database::<Str, Bytes>(&rtxn, Some("durable"))
            .map_err(|e| StoreError::Unavailable {
                reason: format!("failed to fetch container: {e}"),
            })?;
        drop(rtxn);

        let db = match existing {
            Some(db) => db,
            None => {
                let mut wtxn = env.write_txn().map_err(|e| StoreError::Unavailable {
                    reason: format!("failed to begin transaction: {e}"),
                })?;
                let db = env
                    .create_database(&mut wtxn, Some("durable"))
                    .map_err(|e| StoreError::Unavailable {
                        reason: format!("failed to create container: {e}"),
                    })?;
                wtxn.commit().map_err(|e| StoreError::Unavailable {
                    reason: format!("failed to commit: {e}"),
                })?;
                db
            }
        };

        Ok(Self { env, db })
    }
}

#[async_trait]
impl ObjectStore for LmdbObjectStore {
    async fn get(&self, key: &str) -> MatchbookResult<Option<Vec<u8>>> {
        let read_err = |reason: String| StoreError::ReadFailed {
            key: key.to_string(),
            reason,
        };

        let rtxn = self.env.read_txn().map_err(|e| read_err(e.to_string()))?;
        let value = self
            .db
            .get(&rtxn, key)
            .map_err(|e| read_err(e.to_string()))?
            .map(|v| v.to_vec());
        Ok(value)
    }

    async fn put(&self, key: &str, payload: &[u8]) -> MatchbookResult<()> {
        let write_err = |reason: String| StoreError::WriteFailed {
            key: key.to_string(),
            reason,
        };

        let mut wtxn = self.env.write_txn().map_err(|e| write_err(e.to_string()))?;
        self.db
            .put(&mut wtxn, key, payload)
            .map_err(|e| write_err(e.to_string()))?;
        wtxn.commit().map_err(|e| write_err(e.to_string()))?;
        Ok(())
    }
}
