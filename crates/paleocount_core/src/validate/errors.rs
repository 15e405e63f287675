use crate::outcome::Failure;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Violation code reported for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Required key absent from the raw map.
    Missing,
    /// Value empty after stripping.
    Blank,
    TooLong,
    NotANumber,
    /// Fails a `> 0` rule.
    NotPositive,
    /// Fails a `>= 0` rule.
    Negative,
    /// Above the field's upper bound.
    TooLarge,
    NotABoolean,
    /// Value outside a closed enumeration.
    NotIncluded,
    InvalidFormat,
    /// Sibling with the same value exists in the same scope.
    Taken,
    NotInGroup,
    NotInProject,
    /// Two mutually exclusive fields were both supplied.
    Exclusive,
    /// Record is still referenced and cannot be removed.
    InUse,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Blank => "blank",
            Self::TooLong => "too_long",
            Self::NotANumber => "not_a_number",
            Self::NotPositive => "not_positive",
            Self::Negative => "negative",
            Self::TooLarge => "too_large",
            Self::NotABoolean => "not_a_boolean",
            Self::NotIncluded => "not_included",
            Self::InvalidFormat => "invalid_format",
            Self::Taken => "taken",
            Self::NotInGroup => "not_in_group",
            Self::NotInProject => "not_in_project",
            Self::Exclusive => "exclusive",
            Self::InUse => "in_use",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name → first violated rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, ErrorCode>);

impl FieldErrors {
    /// Records `code` for `field` unless the field already failed.
    pub fn insert(&mut self, field: impl Into<String>, code: ErrorCode) {
        self.0.entry(field.into()).or_insert(code);
    }

    pub fn get(&self, field: &str) -> Option<ErrorCode> {
        self.0.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ErrorCode)> {
        self.0.iter().map(|(field, code)| (field.as_str(), *code))
    }

    /// Comma-separated field names, for logging without values.
    pub fn field_names(&self) -> String {
        self.0.keys().cloned().collect::<Vec<_>>().join(",")
    }

    /// `Ok(())` when nothing failed, otherwise an `Invalid` failure.
    pub fn into_result(self) -> Result<(), Failure> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Failure::Invalid(self))
        }
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, code) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {code}")?;
            first = false;
        }
        Ok(())
    }
}
