//! Matchbook Store - Caching Layers
//!
//! Two stores with deliberately different contracts:
//!
//! - [`EphemeralCache`]: a TTL-bounded key-to-payload cache with no
//!   quality awareness. Entries expire solely by age, enforced by the
//!   backing store; this layer never deletes anything.
//! - [`DurableResultStore`]: a persistent per-subject store whose
//!   overwrite decision weighs both result quality (matched-record
//!   count) and age against a freshness horizon.
//!
//! Both sit behind narrow async traits ([`CacheBackend`],
//! [`ObjectStore`]) so the backing service is swappable; LMDB-backed and
//! in-memory implementations are provided.

pub mod durable;
pub mod ephemeral;
pub mod lmdb;
pub mod memory;

pub use durable::{DurableRecord, DurableResultStore, ObjectStore, DEFAULT_MAX_AGE};
pub use ephemeral::{CacheBackend, CacheMode, EphemeralCache, DEFAULT_TTL};
pub use lmdb::{LmdbCacheBackend, LmdbObjectStore};
pub use memory::{InMemoryCacheBackend, InMemoryObjectStore};
