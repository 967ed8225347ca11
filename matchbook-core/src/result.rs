//! Typed match results decoded from raw service payloads.
//!
//! Decoding is a pure transformation with validation at the boundary:
//! required fields fail loudly here with a [`ValidationError`] instead of
//! surfacing later as missing-attribute bugs. Everything beyond the
//! required fields passes through untyped.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single matched identity record.
///
/// Only the name fields are required; location, demographic and
/// per-topic score attributes pass through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    /// Decode a person record, requiring the name fields.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut map) = value else {
            return Err(ValidationError::InvalidShape {
                reason: "person must be an object".to_string(),
            });
        };

        let first_name = take_string(&mut map, "first_name")?;
        let last_name = take_string(&mut map, "last_name")?;

        Ok(Self {
            first_name,
            last_name,
            extra: map,
        })
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Person: {} {}", self.first_name, self.last_name)
    }
}

/// Aggregate result of one lookup against the matching service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched person records; an absent `people` field decodes to an
    /// empty sequence, not an error.
    #[serde(default)]
    pub people: Vec<Person>,
    pub people_count: i64,
    pub more_people: Option<bool>,
    pub score_mean: Option<f64>,
    pub score_min: Option<f64>,
    pub score_max: Option<f64>,
    pub score_std: Option<f64>,
    /// Resolved request identity, attached by the coordinator.
    pub url: Option<String>,
}

impl MatchResult {
    /// Decode a raw result payload.
    ///
    /// `people_count` is required; the score summary fields are typed
    /// but otherwise unvalidated, and anything of the wrong shape is
    /// simply absent from the decoded record.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut map) = value else {
            return Err(ValidationError::InvalidShape {
                reason: "result must be an object".to_string(),
            });
        };

        let people_count = map
            .remove("people_count")
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: "people_count".to_string(),
            })?
            .as_i64()
            .ok_or_else(|| ValidationError::InvalidShape {
                reason: "people_count must be an integer".to_string(),
            })?;

        let people = match map.remove("people") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(Person::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ValidationError::InvalidShape {
                    reason: "people must be an array".to_string(),
                })
            }
        };

        Ok(Self {
            people,
            people_count,
            more_people: map.remove("more_people").and_then(|v| v.as_bool()),
            score_mean: take_f64(&mut map, "score_mean"),
            score_min: take_f64(&mut map, "score_min"),
            score_max: take_f64(&mut map, "score_max"),
            score_std: take_f64(&mut map, "score_std"),
            url: map.remove("url").and_then(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            }),
        })
    }

    /// Attach the resolved request identity.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchResult: {}", self.url.as_deref().unwrap_or("<unresolved>"))
    }
}

fn take_string(map: &mut Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    match map.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::InvalidShape {
            reason: format!("{field} must be a string"),
        }),
        None => Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        }),
    }
}

fn take_f64(map: &mut Map<String, Value>, field: &str) -> Option<f64> {
    map.remove(field).and_then(|v| v.as_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_people_decodes_to_empty() {
        let result = MatchResult::from_value(json!({"people_count": 0})).expect("decode");
        assert!(result.people.is_empty());
        assert_eq!(result.people_count, 0);
    }

    #[test]
    fn test_missing_people_count_is_required() {
        let err = MatchResult::from_value(json!({"people": []})).expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::RequiredFieldMissing {
                field: "people_count".to_string()
            }
        );
    }

    #[test]
    fn test_full_result_decodes() {
        let result = MatchResult::from_value(json!({
            "people_count": 2,
            "more_people": false,
            "people": [
                {"first_name": "Alice", "last_name": "Smith", "state": "IL", "score_gotv": 0.7},
                {"first_name": "Alicia", "last_name": "Smith"}
            ],
            "score_mean": 0.5,
            "score_min": 0.2,
            "score_max": 0.8,
            "score_std": 0.1
        }))
        .expect("decode");

        assert_eq!(result.people_count, 2);
        assert_eq!(result.more_people, Some(false));
        assert_eq!(result.people.len(), 2);
        assert_eq!(result.people[0].first_name, "Alice");
        assert_eq!(result.people[0].extra.get("state"), Some(&json!("IL")));
        assert_eq!(result.score_mean, Some(0.5));
        assert_eq!(result.score_std, Some(0.1));
        assert_eq!(result.url, None);
    }

    #[test]
    fn test_person_requires_name_fields() {
        let err = Person::from_value(json!({"first_name": "Alice"})).expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::RequiredFieldMissing {
                field: "last_name".to_string()
            }
        );
    }

    #[test]
    fn test_person_rejects_non_object() {
        let err = Person::from_value(json!("Alice")).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidShape { .. }));
    }

    #[test]
    fn test_non_array_people_is_malformed() {
        let err = MatchResult::from_value(json!({"people_count": 1, "people": "Alice"}))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidShape { .. }));
    }

    #[test]
    fn test_with_url_attaches_identity() {
        let result = MatchResult::from_value(json!({"people_count": 0}))
            .expect("decode")
            .with_url("http://example.com/match?first_name=Alice");
        assert_eq!(
            result.url.as_deref(),
            Some("http://example.com/match?first_name=Alice")
        );
    }

    #[test]
    fn test_display_renderings() {
        let person = Person::from_value(json!({"first_name": "Alice", "last_name": "Smith"}))
            .expect("decode");
        assert_eq!(format!("{}", person), "Person: Alice Smith");

        let result = MatchResult::from_value(json!({"people_count": 0}))
            .expect("decode")
            .with_url("http://example.com/match");
        assert_eq!(format!("{}", result), "MatchResult: http://example.com/match");
    }
}
