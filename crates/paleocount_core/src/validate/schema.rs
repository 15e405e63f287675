//! Schemas: ordered field specs per entity and verb.
//!
//! # Invariants
//! - `update` requires `id` and treats every other field as optional.
//! - `find` and `delete` only read `id`.
//! - Every schema reports at most one code per field.

use super::rules::{FieldSpec, Kind, Presence, Rule};
use super::{CleanParams, ErrorCode, FieldErrors, RawParams};
use crate::model::counting::OccurrenceStatus;
use crate::outcome::Outcome;
use once_cell::sync::Lazy;
use regex::Regex;

const NAME_MAX_CHARS: usize = 255;
const DESCRIPTION_MAX_CHARS: usize = 2000;

/// Upper bound on one tally and on the size of one shift.
pub const QUANTITY_MAX: i64 = 1_000_000_000;
/// Upper bound on sample and occurrence ranks.
pub const RANK_MAX: i64 = 1_000_000_000;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

static STATUS_VALUES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    OccurrenceStatus::ALL
        .iter()
        .map(|status| status.as_str())
        .collect()
});

/// Operation verb a schema is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Update,
    Find,
    Delete,
}

impl Verb {
    /// Presence of domain-mandatory fields under this verb.
    fn mandatory(self) -> Presence {
        match self {
            Self::Create => Presence::Required,
            _ => Presence::Optional,
        }
    }
}

/// Ordered field specs plus schema-level cross-field checks.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    exclusive: Vec<(&'static str, &'static str)>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            exclusive: Vec::new(),
        }
    }

    /// Rejects inputs supplying both `first` and `second`; the error is
    /// reported on `second`.
    pub fn exclusive(mut self, first: &'static str, second: &'static str) -> Self {
        self.exclusive.push((first, second));
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Validates `raw` against every field independently.
    pub fn validate(&self, raw: &RawParams) -> Outcome<CleanParams> {
        let mut clean = CleanParams::default();
        let mut errors = FieldErrors::default();

        for field in &self.fields {
            match field.evaluate(raw.get(field.name)) {
                Ok(Some(value)) => clean.insert(field.name, value),
                Ok(None) => {}
                Err(code) => errors.insert(field.name, code),
            }
        }

        for (first, second) in &self.exclusive {
            if clean.is_set(first) && clean.is_set(second) {
                errors.insert(*second, ErrorCode::Exclusive);
            }
        }

        match errors.into_result() {
            Ok(()) => Outcome::Success(clean),
            Err(failure) => Outcome::Failure(failure),
        }
    }
}

fn id_field(name: &'static str) -> FieldSpec {
    FieldSpec::required(name, Kind::Integer).rule(Rule::Positive)
}

fn name_field(presence: Presence) -> FieldSpec {
    FieldSpec::new("name", presence, Kind::Text)
        .rule(Rule::NotBlank)
        .rule(Rule::MaxSize(NAME_MAX_CHARS))
}

fn description_field() -> FieldSpec {
    FieldSpec::optional("description", Kind::Text).rule(Rule::MaxSize(DESCRIPTION_MAX_CHARS))
}

fn by_id() -> Schema {
    Schema::new(vec![id_field("id")])
}

/// Schema for records identified by `id` whose only mutable field is `name`,
/// created under `parent`.
fn named_child(verb: Verb, parent: &'static str) -> Schema {
    match verb {
        Verb::Create => Schema::new(vec![id_field(parent), name_field(Presence::Required)]),
        Verb::Update => Schema::new(vec![id_field("id"), name_field(Presence::Optional)]),
        Verb::Find | Verb::Delete => by_id(),
    }
}

pub fn project_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create | Verb::Update => {
            let mut fields = Vec::new();
            if verb == Verb::Update {
                fields.push(id_field("id"));
            }
            fields.push(name_field(verb.mandatory()));
            fields.push(FieldSpec::optional("public", Kind::Boolean));
            Schema::new(fields)
        }
        Verb::Find | Verb::Delete => by_id(),
    }
}

pub fn participation_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create => Schema::new(vec![
            id_field("project_id"),
            id_field("user_id"),
            FieldSpec::optional("manager", Kind::Boolean),
        ]),
        Verb::Update => Schema::new(vec![
            id_field("id"),
            FieldSpec::required("manager", Kind::Boolean),
        ]),
        Verb::Find | Verb::Delete => by_id(),
    }
}

pub fn user_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create | Verb::Update => {
            let mut fields = Vec::new();
            if verb == Verb::Update {
                fields.push(id_field("id"));
            }
            fields.push(name_field(verb.mandatory()));
            fields.push(
                FieldSpec::new("email", verb.mandatory(), Kind::Text)
                    .rule(Rule::NotBlank)
                    .rule(Rule::MaxSize(NAME_MAX_CHARS))
                    .rule(Rule::Format(&EMAIL_RE)),
            );
            Schema::new(fields)
        }
        Verb::Find | Verb::Delete => by_id(),
    }
}

pub fn section_schema(verb: Verb) -> Schema {
    named_child(verb, "project_id")
}

pub fn sample_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create | Verb::Update => {
            let mut fields = vec![match verb {
                Verb::Create => id_field("section_id"),
                _ => id_field("id"),
            }];
            fields.push(name_field(verb.mandatory()));
            fields.push(
                FieldSpec::new("rank", verb.mandatory(), Kind::Integer)
                    .rule(Rule::NotBlank)
                    .rule(Rule::NonNegative)
                    .rule(Rule::Max(RANK_MAX)),
            );
            fields.push(FieldSpec::optional("weight", Kind::Decimal).rule(Rule::Positive));
            fields.push(description_field());
            Schema::new(fields)
        }
        Verb::Find | Verb::Delete => by_id(),
    }
}

pub fn counting_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create => Schema::new(vec![
            id_field("project_id"),
            id_field("group_id"),
            name_field(Presence::Required),
            FieldSpec::optional("marker_id", Kind::Integer).rule(Rule::Positive),
        ]),
        Verb::Update => Schema::new(vec![
            id_field("id"),
            name_field(Presence::Optional),
            FieldSpec::optional("marker_id", Kind::Integer).rule(Rule::Positive),
        ]),
        Verb::Find | Verb::Delete => by_id(),
    }
}

fn status_field() -> FieldSpec {
    FieldSpec::optional("status", Kind::Text)
        .rule(Rule::NotBlank)
        .rule(Rule::Included(STATUS_VALUES.as_slice()))
}

pub fn occurrence_schema(verb: Verb) -> Schema {
    let quantity = FieldSpec::optional("quantity", Kind::Integer)
        .rule(Rule::NonNegative)
        .rule(Rule::Max(QUANTITY_MAX));
    let rank = FieldSpec::optional("rank", Kind::Integer)
        .rule(Rule::NotBlank)
        .rule(Rule::NonNegative)
        .rule(Rule::Max(RANK_MAX));
    let uncertain = FieldSpec::optional("uncertain", Kind::Boolean).rule(Rule::NotBlank);

    match verb {
        Verb::Create => Schema::new(vec![
            id_field("counting_id"),
            id_field("sample_id"),
            id_field("species_id"),
            quantity,
            status_field(),
            uncertain,
            rank,
        ]),
        Verb::Update => Schema::new(vec![
            id_field("id"),
            quantity,
            FieldSpec::optional("shift", Kind::Integer)
                .rule(Rule::NotBlank)
                .rule(Rule::Max(QUANTITY_MAX)),
            status_field(),
            uncertain,
            rank,
        ])
        .exclusive("quantity", "shift"),
        Verb::Find | Verb::Delete => by_id(),
    }
}

/// Parameters of the per-sample tally report.
pub fn sample_report_schema() -> Schema {
    Schema::new(vec![id_field("counting_id"), id_field("sample_id")])
}

/// Parameters naming only a parent record, for list operations.
pub fn parent_schema(parent: &'static str) -> Schema {
    Schema::new(vec![id_field(parent)])
}

pub fn group_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create => Schema::new(vec![name_field(Presence::Required)]),
        Verb::Update => Schema::new(vec![id_field("id"), name_field(Presence::Optional)]),
        Verb::Find | Verb::Delete => by_id(),
    }
}

pub fn species_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create => Schema::new(vec![
            id_field("group_id"),
            name_field(Presence::Required),
            description_field(),
        ]),
        Verb::Update => Schema::new(vec![
            id_field("id"),
            name_field(Presence::Optional),
            description_field(),
        ]),
        Verb::Find | Verb::Delete => by_id(),
    }
}

pub fn field_schema(verb: Verb) -> Schema {
    named_child(verb, "group_id")
}

pub fn choice_schema(verb: Verb) -> Schema {
    named_child(verb, "field_id")
}

pub fn feature_schema(verb: Verb) -> Schema {
    match verb {
        Verb::Create => Schema::new(vec![id_field("species_id"), id_field("choice_id")]),
        Verb::Update | Verb::Find | Verb::Delete => by_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::{occurrence_schema, project_schema, sample_schema, user_schema, Verb};
    use crate::outcome::{Failure, Outcome};
    use crate::validate::{ErrorCode, RawParams, Value};

    fn errors_of(outcome: Outcome<crate::validate::CleanParams>) -> crate::validate::FieldErrors {
        match outcome {
            Outcome::Failure(Failure::Invalid(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn reports_one_error_per_invalid_field() {
        let raw = RawParams::new()
            .with("section_id", "abc")
            .with("name", "   ")
            .with("rank", "-1")
            .with("weight", "0");
        let errors = errors_of(sample_schema(Verb::Create).validate(&raw));
        assert_eq!(errors.get("section_id"), Some(ErrorCode::NotANumber));
        assert_eq!(errors.get("name"), Some(ErrorCode::Blank));
        assert_eq!(errors.get("rank"), Some(ErrorCode::Negative));
        assert_eq!(errors.get("weight"), Some(ErrorCode::NotPositive));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = RawParams::new().with("name", " Survey ").with("colour", "red");
        let clean = project_schema(Verb::Create)
            .validate(&raw)
            .success()
            .expect("valid project params");
        assert_eq!(clean.text("name"), Some("Survey"));
        assert!(!clean.contains("colour"));
    }

    #[test]
    fn update_requires_only_id() {
        let missing = errors_of(project_schema(Verb::Update).validate(&RawParams::new()));
        assert_eq!(missing.get("id"), Some(ErrorCode::Missing));
        assert_eq!(missing.len(), 1);

        let clean = project_schema(Verb::Update)
            .validate(&RawParams::new().with("id", "4"))
            .success()
            .expect("partial update is valid");
        assert_eq!(clean.integer("id"), Some(4));
        assert!(!clean.contains("name"));
    }

    #[test]
    fn name_is_limited_to_255_chars() {
        let raw = RawParams::new().with("name", "x".repeat(256));
        let errors = errors_of(project_schema(Verb::Create).validate(&raw));
        assert_eq!(errors.get("name"), Some(ErrorCode::TooLong));
    }

    #[test]
    fn occurrence_quantity_and_shift_are_exclusive() {
        let raw = RawParams::new()
            .with("id", "1")
            .with("quantity", "3")
            .with("shift", "-1");
        let errors = errors_of(occurrence_schema(Verb::Update).validate(&raw));
        assert_eq!(errors.get("shift"), Some(ErrorCode::Exclusive));
        assert!(!errors.contains("quantity"));
    }

    #[test]
    fn occurrence_numbers_are_bounded() {
        let raw = RawParams::new()
            .with("counting_id", "1")
            .with("sample_id", "1")
            .with("species_id", "1")
            .with("quantity", i64::MAX.to_string())
            .with("rank", "1000000001");
        let errors = errors_of(occurrence_schema(Verb::Create).validate(&raw));
        assert_eq!(errors.get("quantity"), Some(ErrorCode::TooLarge));
        assert_eq!(errors.get("rank"), Some(ErrorCode::TooLarge));

        let shift = RawParams::new().with("id", "1").with("shift", i64::MIN.to_string());
        let errors = errors_of(occurrence_schema(Verb::Update).validate(&shift));
        assert_eq!(errors.get("shift"), Some(ErrorCode::TooLarge));
    }

    #[test]
    fn occurrence_status_must_be_known() {
        let raw = RawParams::new()
            .with("counting_id", "1")
            .with("sample_id", "1")
            .with("species_id", "1")
            .with("status", "plenty");
        let errors = errors_of(occurrence_schema(Verb::Create).validate(&raw));
        assert_eq!(errors.get("status"), Some(ErrorCode::NotIncluded));
    }

    #[test]
    fn occurrence_quantity_may_be_blanked() {
        let raw = RawParams::new().with("id", "9").with("quantity", "");
        let clean = occurrence_schema(Verb::Update)
            .validate(&raw)
            .success()
            .expect("blank quantity clears");
        assert_eq!(clean.get("quantity"), Some(&Value::Null));
        assert_eq!(clean.patch_integer("quantity"), Some(None));
    }

    #[test]
    fn email_format_is_checked() {
        let raw = RawParams::new().with("name", "Ada").with("email", "ada.example.org");
        let errors = errors_of(user_schema(Verb::Create).validate(&raw));
        assert_eq!(errors.get("email"), Some(ErrorCode::InvalidFormat));
    }
}
