//! Matchbook Client - Transport and Coordination
//!
//! Talks to the remote Civis matching service and coordinates the
//! memoization layers around it: derive a key, check the ephemeral
//! cache (and, for bulk lookups, the durable store), call the remote on
//! a miss, store the raw payload, decode into typed results.
//!
//! The transport is a narrow trait seam; [`HttpTransport`] is the
//! reqwest-backed implementation. No operation retries internally.

pub mod matcher;
pub mod transport;
pub mod wire;

pub use matcher::{BulkMatchOutcome, Matcher};
pub use transport::{
    HttpTransport, MatchTransport, MatcherConfig, TransportResponse, BULK_ENDPOINT, MATCH_ENDPOINT,
};
