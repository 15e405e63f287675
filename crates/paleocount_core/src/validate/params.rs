//! Raw and normalized parameter maps.

use super::ErrorCode;
use crate::outcome::Failure;
use std::collections::BTreeMap;

/// Flat, untyped parameter map as handed over by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(BTreeMap<String, String>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parses `key=value` pairs; entries without `=` are skipped.
    pub fn parse_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Self {
        pairs
            .into_iter()
            .filter_map(|pair| pair.split_once('='))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for RawParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Typed value produced by a field's coercion step.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
    /// Optional field supplied but empty: clears the stored value.
    Null,
}

/// Normalized parameter map ready for persistence.
///
/// Keys absent here were absent from the raw input; a `Value::Null` entry
/// means the caller explicitly blanked the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanParams(BTreeMap<&'static str, Value>);

impl CleanParams {
    pub(crate) fn insert(&mut self, key: &'static str, value: Value) {
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Present with a non-null value.
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(value) if *value != Value::Null)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(Value::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn decimal(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Value::Decimal(value)) => Some(*value),
            Some(Value::Integer(value)) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(Value::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Text value a schema marked as required.
    pub fn require_text(&self, key: &str) -> Result<&str, Failure> {
        self.text(key)
            .ok_or_else(|| Failure::field(key, ErrorCode::Missing))
    }

    /// Integer value a schema marked as required.
    pub fn require_integer(&self, key: &str) -> Result<i64, Failure> {
        self.integer(key)
            .ok_or_else(|| Failure::field(key, ErrorCode::Missing))
    }

    /// Partial-update view of an optional text column.
    ///
    /// `None` leaves the column untouched, `Some(None)` clears it.
    pub fn patch_text(&self, key: &str) -> Option<Option<String>> {
        match self.0.get(key)? {
            Value::Text(value) => Some(Some(value.clone())),
            _ => Some(None),
        }
    }

    pub fn patch_integer(&self, key: &str) -> Option<Option<i64>> {
        match self.0.get(key)? {
            Value::Integer(value) => Some(Some(*value)),
            _ => Some(None),
        }
    }

    pub fn patch_decimal(&self, key: &str) -> Option<Option<f64>> {
        self.0.get(key)?;
        Some(self.decimal(key))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
