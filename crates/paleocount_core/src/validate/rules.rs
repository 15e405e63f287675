//! Per-field presence, coercion and rule objects.

use super::{ErrorCode, Value};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// Coercion applied to the stripped raw string before any rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    Integer,
    Decimal,
    Boolean,
}

impl Kind {
    fn coerce(self, stripped: &str) -> Result<Value, ErrorCode> {
        match self {
            Self::Text => Ok(Value::Text(stripped.to_string())),
            Self::Integer => stripped
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| ErrorCode::NotANumber),
            Self::Decimal => match stripped.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Value::Decimal(value)),
                _ => Err(ErrorCode::NotANumber),
            },
            Self::Boolean => match stripped.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(ErrorCode::NotABoolean),
            },
        }
    }
}

/// One pure check over an already coerced value.
///
/// Rules that do not apply to a value's type pass it through.
#[derive(Debug, Clone)]
pub enum Rule {
    NotBlank,
    /// Maximum length in characters.
    MaxSize(usize),
    /// Strictly greater than zero.
    Positive,
    /// Greater than or equal to zero.
    NonNegative,
    /// Absolute value at most the bound.
    Max(i64),
    Included(&'static [&'static str]),
    Format(&'static Regex),
}

impl Rule {
    pub fn check(&self, value: &Value) -> Result<(), ErrorCode> {
        match (self, value) {
            (Self::NotBlank, Value::Text(text)) if text.is_empty() => Err(ErrorCode::Blank),
            (Self::MaxSize(max), Value::Text(text)) if text.chars().count() > *max => {
                Err(ErrorCode::TooLong)
            }
            (Self::Positive, Value::Integer(number)) if *number <= 0 => {
                Err(ErrorCode::NotPositive)
            }
            (Self::Positive, Value::Decimal(number)) if *number <= 0.0 => {
                Err(ErrorCode::NotPositive)
            }
            (Self::NonNegative, Value::Integer(number)) if *number < 0 => {
                Err(ErrorCode::Negative)
            }
            (Self::NonNegative, Value::Decimal(number)) if *number < 0.0 => {
                Err(ErrorCode::Negative)
            }
            (Self::Max(max), Value::Integer(number))
                if number.unsigned_abs() > max.unsigned_abs() =>
            {
                Err(ErrorCode::TooLarge)
            }
            (Self::Included(allowed), Value::Text(text)) if !allowed.contains(&text.as_str()) => {
                Err(ErrorCode::NotIncluded)
            }
            (Self::Format(pattern), Value::Text(text)) if !pattern.is_match(text) => {
                Err(ErrorCode::InvalidFormat)
            }
            _ => Ok(()),
        }
    }
}

/// Presence, coercion and ordered rules for one named field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub presence: Presence,
    pub kind: Kind,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn new(name: &'static str, presence: Presence, kind: Kind) -> Self {
        Self {
            name,
            presence,
            kind,
            rules: Vec::new(),
        }
    }

    pub fn required(name: &'static str, kind: Kind) -> Self {
        Self::new(name, Presence::Required, kind)
    }

    pub fn optional(name: &'static str, kind: Kind) -> Self {
        Self::new(name, Presence::Optional, kind)
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluates one raw value.
    ///
    /// Returns `Ok(None)` when an optional field is absent. An empty value
    /// on an optional field without `NotBlank` becomes `Value::Null`.
    pub fn evaluate(&self, raw: Option<&str>) -> Result<Option<Value>, ErrorCode> {
        let Some(raw) = raw else {
            return match self.presence {
                Presence::Required => Err(ErrorCode::Missing),
                Presence::Optional => Ok(None),
            };
        };

        let stripped = raw.trim();
        if stripped.is_empty() {
            let not_blank = self.rules.iter().any(|rule| matches!(rule, Rule::NotBlank));
            if not_blank || self.presence == Presence::Required {
                return Err(ErrorCode::Blank);
            }
            return Ok(Some(Value::Null));
        }

        let value = self.kind.coerce(stripped)?;
        for rule in &self.rules {
            rule.check(&value)?;
        }
        Ok(Some(value))
    }
}
