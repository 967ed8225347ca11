//! Matchbook Core - Descriptors, Results, Keys
//!
//! Pure data types and pure functions shared by the store and client
//! crates. Nothing in this crate performs I/O: cache-key derivation and
//! result decoding are deterministic transformations, and the error
//! taxonomy here is the single vocabulary for every matchbook operation.

pub mod descriptor;
pub mod error;
pub mod key;
pub mod result;

pub use descriptor::{BulkRequest, MatchDescriptor};
pub use error::{MatchbookError, MatchbookResult, StoreError, ValidationError};
pub use key::{derive_key, CacheKey, KEY_LEN};
pub use result::{MatchResult, Person};
