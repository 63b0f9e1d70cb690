use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::document::Metadata;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type FilterPredicate = Arc<dyn Fn(Option<&Value>, &Metadata) -> bool + Send + Sync>;

/// Admission predicate applied to a single metadata key.
#[derive(Clone)]
pub enum FilterSpec {
    /// The key must be present, any value.
    Exists,
    /// The value must equal the expected one. Numbers and numeric strings
    /// compare by numeric value.
    Equals(Value),
    /// The stringified value must match the pattern.
    Regex(Regex),
    /// Arbitrary predicate over the value and the full metadata map.
    Predicate(FilterPredicate),
}

impl FilterSpec {
    /// Interpret a raw configuration value: `null` means existence,
    /// `/…/`-delimited strings compile to patterns, anything else is an
    /// equality check.
    pub fn from_config_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Null => Ok(FilterSpec::Exists),
            Value::String(s) if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') => {
                let pattern = &s[1..s.len() - 1];
                Regex::new(pattern)
                    .map(FilterSpec::Regex)
                    .map_err(|source| FilterError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    })
            }
            other => Ok(FilterSpec::Equals(other.clone())),
        }
    }

    pub fn matches(&self, key: &str, metadata: &Metadata) -> bool {
        let value = metadata.get(key);
        match self {
            FilterSpec::Exists => value.is_some(),
            FilterSpec::Equals(expected) => {
                value.map_or(false, |actual| loose_eq(actual, expected))
            }
            FilterSpec::Regex(pattern) => {
                value.map_or(false, |actual| pattern.is_match(&stringify(actual)))
            }
            FilterSpec::Predicate(predicate) => predicate(value, metadata),
        }
    }

    /// Stable textual form used for cache-key derivation. Predicates are
    /// opaque functions and contribute a constant marker.
    pub fn fingerprint(&self) -> String {
        match self {
            FilterSpec::Exists => "exists".to_string(),
            FilterSpec::Equals(expected) => format!("eq:{expected}"),
            FilterSpec::Regex(pattern) => format!("regex:{}", pattern.as_str()),
            FilterSpec::Predicate(_) => "predicate".to_string(),
        }
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality with numeric coercion: numbers compare by value, and numeric
/// strings compare against numbers.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => n
            .as_f64()
            .zip(s.trim().parse::<f64>().ok())
            .map_or(false, |(a, b)| a == b),
        _ => left == right,
    }
}

/// The configured set of admission predicates. A document is retained only
/// if every filter passes.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilters {
    inner: BTreeMap<String, FilterSpec>,
}

impl MetadataFilters {
    pub fn new() -> Self {
        MetadataFilters::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, spec: FilterSpec) {
        self.inner.insert(key.into(), spec);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterSpec)> {
        self.inner.iter()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.inner.iter().all(|(key, spec)| spec.matches(key, metadata))
    }

    pub fn from_config_map(map: &BTreeMap<String, Value>) -> Result<Self, FilterError> {
        let mut filters = MetadataFilters::new();
        for (key, value) in map {
            filters.insert(key.clone(), FilterSpec::from_config_value(value)?);
        }
        Ok(filters)
    }
}

impl<'de> Deserialize<'de> for MetadataFilters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        MetadataFilters::from_config_map(&raw).map_err(D::Error::custom)
    }
}
