//! Lookup inputs: single descriptors and subject-keyed batches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Input identity attributes for a single lookup.
///
/// First and last name are required; the demographic attributes are
/// optional and only serialized when present, so the wire query carries
/// exactly the attributes the caller provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDescriptor {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl MatchDescriptor {
    /// Create a descriptor with the required name fields.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_year: None,
            birth_month: None,
            birth_day: None,
            state: None,
            city: None,
        }
    }

    pub fn with_birth_year(mut self, year: i32) -> Self {
        self.birth_year = Some(year);
        self
    }

    pub fn with_birth_month(mut self, month: u32) -> Self {
        self.birth_month = Some(month);
        self
    }

    pub fn with_birth_day(mut self, day: u32) -> Self {
        self.birth_day = Some(day);
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Canonical parameter set for this descriptor.
    ///
    /// Used both for cache-key derivation and as the wire parameter
    /// shape; absent optional attributes are omitted entirely.
    pub fn to_params(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("first_name".to_string(), Value::from(self.first_name.clone()));
        map.insert("last_name".to_string(), Value::from(self.last_name.clone()));
        if let Some(year) = self.birth_year {
            map.insert("birth_year".to_string(), Value::from(year));
        }
        if let Some(month) = self.birth_month {
            map.insert("birth_month".to_string(), Value::from(month));
        }
        if let Some(day) = self.birth_day {
            map.insert("birth_day".to_string(), Value::from(day));
        }
        if let Some(state) = &self.state {
            map.insert("state".to_string(), Value::from(state.clone()));
        }
        if let Some(city) = &self.city {
            map.insert("city".to_string(), Value::from(city.clone()));
        }
        Value::Object(map)
    }

    /// Query pairs for a GET request against the match endpoint.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("first_name", self.first_name.clone()),
            ("last_name", self.last_name.clone()),
        ];
        if let Some(year) = self.birth_year {
            pairs.push(("birth_year", year.to_string()));
        }
        if let Some(month) = self.birth_month {
            pairs.push(("birth_month", month.to_string()));
        }
        if let Some(day) = self.birth_day {
            pairs.push(("birth_day", day.to_string()));
        }
        if let Some(state) = &self.state {
            pairs.push(("state", state.clone()));
        }
        if let Some(city) = &self.city {
            pairs.push(("city", city.clone()));
        }
        pairs
    }
}

/// A batch of descriptors keyed by caller-chosen subject id.
///
/// Keys are unique and their order is irrelevant; key derivation over a
/// bulk request canonicalizes the map before hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkRequest(HashMap<String, MatchDescriptor>);

impl BulkRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor under a subject id, replacing any previous
    /// entry for that id.
    pub fn insert(
        &mut self,
        subject_id: impl Into<String>,
        descriptor: MatchDescriptor,
    ) -> Option<MatchDescriptor> {
        self.0.insert(subject_id.into(), descriptor)
    }

    pub fn get(&self, subject_id: &str) -> Option<&MatchDescriptor> {
        self.0.get(subject_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Subject ids in sorted order, for stable iteration and reporting.
    pub fn subject_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.0.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MatchDescriptor)> {
        self.0.iter()
    }

    /// Canonical wire body for the bulk endpoint: `{"people": {...}}`.
    pub fn to_params(&self) -> Value {
        let mut people = serde_json::Map::new();
        for (subject_id, descriptor) in &self.0 {
            people.insert(subject_id.clone(), descriptor.to_params());
        }
        let mut body = serde_json::Map::new();
        body.insert("people".to_string(), Value::Object(people));
        Value::Object(body)
    }
}

impl FromIterator<(String, MatchDescriptor)> for BulkRequest {
    fn from_iter<I: IntoIterator<Item = (String, MatchDescriptor)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_key;

    #[test]
    fn test_descriptor_builders() {
        let descriptor = MatchDescriptor::new("Alice", "Smith")
            .with_birth_year(1985)
            .with_birth_month(6)
            .with_birth_day(14)
            .with_state("IL")
            .with_city("Chicago");

        assert_eq!(descriptor.first_name, "Alice");
        assert_eq!(descriptor.last_name, "Smith");
        assert_eq!(descriptor.birth_year, Some(1985));
        assert_eq!(descriptor.birth_month, Some(6));
        assert_eq!(descriptor.birth_day, Some(14));
        assert_eq!(descriptor.state.as_deref(), Some("IL"));
        assert_eq!(descriptor.city.as_deref(), Some("Chicago"));
    }

    #[test]
    fn test_params_omit_absent_attributes() {
        let descriptor = MatchDescriptor::new("Alice", "Smith").with_state("IL");
        let params = descriptor.to_params();
        let map = params.as_object().expect("params must be an object");

        assert_eq!(map.len(), 3);
        assert!(map.contains_key("first_name"));
        assert!(map.contains_key("last_name"));
        assert!(map.contains_key("state"));
        assert!(!map.contains_key("birth_year"));
    }

    #[test]
    fn test_query_pairs_match_params() {
        let descriptor = MatchDescriptor::new("Alice", "Smith").with_birth_year(1985);
        let pairs = descriptor.to_query();

        assert_eq!(
            pairs,
            vec![
                ("first_name", "Alice".to_string()),
                ("last_name", "Smith".to_string()),
                ("birth_year", "1985".to_string()),
            ]
        );
    }

    #[test]
    fn test_serde_omits_none_fields() {
        let descriptor = MatchDescriptor::new("Alice", "Smith");
        let encoded = serde_json::to_string(&descriptor).expect("serialize");
        assert!(!encoded.contains("birth_year"));
        assert!(!encoded.contains("city"));
    }

    #[test]
    fn test_bulk_request_keys_are_unique() {
        let mut request = BulkRequest::new();
        assert!(request
            .insert("0", MatchDescriptor::new("Alice", "Smith"))
            .is_none());
        let replaced = request.insert("0", MatchDescriptor::new("Bob", "Jones"));

        assert_eq!(replaced, Some(MatchDescriptor::new("Alice", "Smith")));
        assert_eq!(request.len(), 1);
        assert_eq!(request.get("0"), Some(&MatchDescriptor::new("Bob", "Jones")));
    }

    #[test]
    fn test_bulk_request_body_shape() {
        let mut request = BulkRequest::new();
        request.insert("7", MatchDescriptor::new("Alice", "Smith"));
        let body = request.to_params();

        let people = body
            .get("people")
            .and_then(Value::as_object)
            .expect("people object");
        assert_eq!(people.len(), 1);
        assert_eq!(
            people.get("7").and_then(|d| d.get("first_name")),
            Some(&Value::from("Alice"))
        );
    }

    #[test]
    fn test_bulk_key_independent_of_insertion_order() {
        let mut forward = BulkRequest::new();
        forward.insert("0", MatchDescriptor::new("Alice", "Smith"));
        forward.insert("1", MatchDescriptor::new("Bob", "Jones"));

        let mut backward = BulkRequest::new();
        backward.insert("1", MatchDescriptor::new("Bob", "Jones"));
        backward.insert("0", MatchDescriptor::new("Alice", "Smith"));

        assert_eq!(
            derive_key("multimatch", &forward.to_params()),
            derive_key("multimatch", &backward.to_params())
        );
    }

    #[test]
    fn test_subject_ids_sorted() {
        let mut request = BulkRequest::new();
        request.insert("b", MatchDescriptor::new("B", "B"));
        request.insert("a", MatchDescriptor::new("A", "A"));
        request.insert("c", MatchDescriptor::new("C", "C"));

        assert_eq!(request.subject_ids(), vec!["a", "b", "c"]);
    }
}
