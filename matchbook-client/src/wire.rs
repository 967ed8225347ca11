//! Wire envelopes for the Civis matching service responses.

use matchbook_core::{MatchbookError, MatchbookResult, ValidationError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Top-level envelope for single-match responses.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchEnvelope {
    pub error: bool,
    #[serde(default)]
    pub error_id: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl MatchEnvelope {
    /// Decode a raw response body.
    pub fn decode(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::InvalidShape {
            reason: e.to_string(),
        })
    }

    /// Extract the result payload, classifying a service-level failure.
    pub fn into_result(self, url: &str) -> MatchbookResult<Value> {
        if self.error {
            return Err(MatchbookError::Service {
                error_id: self.error_id.unwrap_or(0),
                message: self.error_message.unwrap_or_default(),
                url: url.to_string(),
            });
        }
        self.result.ok_or_else(|| {
            ValidationError::RequiredFieldMissing {
                field: "result".to_string(),
            }
            .into()
        })
    }
}

/// Per-subject envelope within a bulk response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectEnvelope {
    pub error: bool,
    #[serde(default)]
    pub result: Option<Value>,
}

/// Decode a bulk response body into per-subject envelopes.
pub fn decode_bulk(body: &[u8]) -> Result<HashMap<String, SubjectEnvelope>, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::InvalidShape {
        reason: e.to_string(),
    })
}
