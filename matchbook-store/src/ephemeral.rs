//! TTL-bounded shared cache for raw response payloads.
//!
//! The cache mode is an explicit tagged variant selected once at
//! construction, never inferred from configuration data. Lookups and
//! stores are check-then-act without mutual exclusion: two concurrent
//! callers can both miss and both store, and the last write wins.

use async_trait::async_trait;
use matchbook_core::{CacheKey, MatchbookResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default entry TTL (one hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Backend seam for the ephemeral cache: an opaque byte store with
/// TTL-scoped writes.
///
/// Expiry belongs to the implementation: `get` must report entries past
/// their TTL as absent. Nothing in this layer deletes entries.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Look up the payload stored under `key`, if any unexpired entry
    /// exists.
    async fn get(&self, key: &CacheKey) -> MatchbookResult<Option<Vec<u8>>>;

    /// Store `payload` under `key` for `ttl`, replacing any previous
    /// entry.
    async fn set(&self, key: &CacheKey, payload: &[u8], ttl: Duration) -> MatchbookResult<()>;
}

/// Cache mode, selected once at construction.
#[derive(Clone)]
pub enum CacheMode {
    /// All lookups report absent and all stores are no-ops.
    Disabled,
    /// Cache against `backend` with a fixed per-instance TTL.
    Enabled {
        backend: Arc<dyn CacheBackend>,
        ttl: Duration,
    },
}

impl CacheMode {
    /// Enabled mode with the default TTL.
    pub fn enabled(backend: Arc<dyn CacheBackend>) -> Self {
        Self::Enabled {
            backend,
            ttl: DEFAULT_TTL,
        }
    }

    /// Enabled mode with an explicit TTL. The TTL is fixed for the
    /// lifetime of the cache; it cannot be overridden per entry.
    pub fn enabled_with_ttl(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self::Enabled { backend, ttl }
    }
}

impl fmt::Debug for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("CacheMode::Disabled"),
            Self::Enabled { ttl, .. } => f
                .debug_struct("CacheMode::Enabled")
                .field("ttl", ttl)
                .finish_non_exhaustive(),
        }
    }
}

/// TTL-bounded key-to-payload store backed by a shared cache service.
#[derive(Debug, Clone)]
pub struct EphemeralCache {
    mode: CacheMode,
}

impl EphemeralCache {
    pub fn new(mode: CacheMode) -> Self {
        Self { mode }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(CacheMode::Disabled)
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, CacheMode::Enabled { .. })
    }

    /// The per-instance TTL, or `None` when disabled.
    pub fn ttl(&self) -> Option<Duration> {
        match &self.mode {
            CacheMode::Disabled => None,
            CacheMode::Enabled { ttl, .. } => Some(*ttl),
        }
    }

    /// Look up a payload. Disabled mode always reports absent.
    pub async fn get(&self, key: &CacheKey) -> MatchbookResult<Option<Vec<u8>>> {
        match &self.mode {
            CacheMode::Disabled => Ok(None),
            CacheMode::Enabled { backend, .. } => backend.get(key).await,
        }
    }

    /// Store a payload under `key`, overwriting any previous entry.
    /// No-op when disabled.
    pub async fn set(&self, key: &CacheKey, payload: &[u8]) -> MatchbookResult<()> {
        match &self.mode {
            CacheMode::Disabled => Ok(()),
            CacheMode::Enabled { backend, ttl } => backend.set(key, payload, *ttl).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCacheBackend;
    use matchbook_core::derive_key;
    use serde_json::json;

    fn test_key() -> CacheKey {
        derive_key("match", &json!({"first_name": "Alice", "last_name": "Smith"}))
    }

    #[tokio::test]
    async fn test_disabled_mode_reports_absent() {
        let cache = EphemeralCache::disabled();
        assert!(!cache.is_enabled());
        assert_eq!(cache.ttl(), None);
        assert_eq!(cache.get(&test_key()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_disabled_mode_set_is_noop() {
        let cache = EphemeralCache::disabled();
        cache.set(&test_key(), b"payload").await.unwrap();
        assert_eq!(cache.get(&test_key()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_enabled_roundtrip() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = EphemeralCache::new(CacheMode::enabled(backend));
        assert!(cache.is_enabled());
        assert_eq!(cache.ttl(), Some(DEFAULT_TTL));

        let key = test_key();
        cache.set(&key, b"payload").await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_entry() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = EphemeralCache::new(CacheMode::enabled(backend));

        let key = test_key();
        cache.set(&key, b"first").await.unwrap();
        cache.set(&key, b"second").await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = EphemeralCache::new(CacheMode::enabled_with_ttl(
            backend,
            Duration::ZERO,
        ));

        let key = test_key();
        cache.set(&key, b"payload").await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[test]
    fn test_debug_does_not_leak_backend() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let mode = CacheMode::enabled_with_ttl(backend, Duration::from_secs(60));
        let rendered = format!("{:?}", mode);
        assert!(rendered.contains("Enabled"));
        assert!(rendered.contains("60"));
    }
}
