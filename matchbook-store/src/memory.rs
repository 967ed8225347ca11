//! In-memory backends for tests and single-process use.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use matchbook_core::{CacheKey, MatchbookResult, StoreError};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::durable::ObjectStore;
use crate::ephemeral::CacheBackend;

/// In-memory cache backend keeping an expiry deadline next to each
/// payload. Expired entries read as absent; they are never removed,
/// matching the contract that eviction belongs to the backing service.
#[derive(Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<CacheKey, (Vec<u8>, DateTime<Utc>)>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> MatchbookResult<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        match entries.get(key) {
            Some((payload, expires_at)) if Utc::now() < *expires_at => Ok(Some(payload.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, payload: &[u8], ttl: Duration) -> MatchbookResult<()> {
        let expires_at = Utc::now()
            + ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(0));
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(*key, (payload.to_vec(), expires_at));
        Ok(())
    }
}

/// In-memory per-key blob store.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> MatchbookResult<Option<Vec<u8>>> {
        let objects = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(objects.get(key).cloned())
    }

    async fn put(&self, key: &str, payload: &[u8]) -> MatchbookResult<()> {
        let mut objects = self.objects.write().map_err(|_| StoreError::LockPoisoned)?;
        objects.insert(key.to_string(), payload.to_vec());
        Ok(())
    }
}
