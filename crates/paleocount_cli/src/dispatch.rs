//! Entity/verb routing for the `run` command.

use crate::error::CliError;
use paleocount_core::{
    Authorizer, CountingService, OccurrenceService, OperationResult, Outcome,
    ParticipationService, ProjectService, RawParams, SampleService, SectionService, SqliteStore,
    TaxonomyService, UserService,
};
use serde::Serialize;
use serde_json::{json, Value};

/// One printed JSON document plus its HTTP-equivalent status.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Encodes an operation result; failures become
/// `{"status": .., "error": .., "fields": ..}`.
pub fn reply<T: Serialize>(result: OperationResult<T>) -> Result<Reply, CliError> {
    match result? {
        Outcome::Success(value) => Ok(Reply::ok(serde_json::to_value(value)?)),
        Outcome::Failure(failure) => {
            let status = failure.http_status();
            let mut body = serde_json::to_value(&failure)?;
            if let Value::Object(map) = &mut body {
                map.insert("status".to_string(), json!(status));
            }
            Ok(Reply { status, body })
        }
    }
}

pub fn run(
    store: SqliteStore<'_>,
    auth: &dyn Authorizer,
    entity: &str,
    verb: &str,
    raw: &RawParams,
) -> Result<Reply, CliError> {
    match entity {
        "project" => {
            let service = ProjectService::new(store);
            match verb {
                "create" => reply(service.create(auth, raw)),
                "update" => reply(service.update(auth, raw)),
                "find" => reply(service.find(auth, raw)),
                "delete" => reply(service.delete(auth, raw)),
                "list" => reply(service.list(auth)),
                _ => unknown(entity, verb),
            }
        }
        "participation" => {
            let service = ParticipationService::new(store);
            match verb {
                "create" => reply(service.create(auth, raw)),
                "update" => reply(service.update(auth, raw)),
                "find" => reply(service.find(auth, raw)),
                "delete" => reply(service.delete(auth, raw)),
                "list" => reply(service.list(auth, raw)),
                _ => unknown(entity, verb),
            }
        }
        "section" => {
            let service = SectionService::new(store);
            match verb {
                "create" => reply(service.create(auth, raw)),
                "update" => reply(service.update(auth, raw)),
                "find" => reply(service.find(auth, raw)),
                "delete" => reply(service.delete(auth, raw)),
                "list" => reply(service.list(auth, raw)),
                _ => unknown(entity, verb),
            }
        }
        "sample" => {
            let service = SampleService::new(store);
            match verb {
                "create" => reply(service.create(auth, raw)),
                "update" => reply(service.update(auth, raw)),
                "find" => reply(service.find(auth, raw)),
                "delete" => reply(service.delete(auth, raw)),
                "list" => reply(service.list(auth, raw)),
                _ => unknown(entity, verb),
            }
        }
        "counting" => {
            let service = CountingService::new(store);
            match verb {
                "create" => reply(service.create(auth, raw)),
                "update" => reply(service.update(auth, raw)),
                "find" => reply(service.find(auth, raw)),
                "delete" => reply(service.delete(auth, raw)),
                "list" => reply(service.list(auth, raw)),
                _ => unknown(entity, verb),
            }
        }
        "occurrence" => {
            let service = OccurrenceService::new(store);
            match verb {
                "create" => reply(service.with_summary(service.create(auth, raw))),
                "update" => reply(service.with_summary(service.update(auth, raw))),
                "find" => reply(service.with_summary(service.find(auth, raw))),
                "delete" => reply(service.with_summary(service.delete(auth, raw))),
                "report" => reply(service.sample_report(auth, raw)),
                _ => unknown(entity, verb),
            }
        }
        "group" | "species" | "field" | "choice" | "feature" => {
            run_taxonomy(TaxonomyService::new(store), auth, entity, verb, raw)
        }
        "user" => {
            let service = UserService::new(store);
            match verb {
                "update" => reply(service.update(auth, raw)),
                "find" => reply(service.find(auth, raw)),
                _ => unknown(entity, verb),
            }
        }
        _ => unknown(entity, verb),
    }
}

fn run_taxonomy(
    service: TaxonomyService<SqliteStore<'_>>,
    auth: &dyn Authorizer,
    entity: &str,
    verb: &str,
    raw: &RawParams,
) -> Result<Reply, CliError> {
    match (entity, verb) {
        ("group", "create") => reply(service.create_group(auth, raw)),
        ("group", "update") => reply(service.update_group(auth, raw)),
        ("group", "find") => reply(service.find_group(raw)),
        ("group", "delete") => reply(service.delete_group(auth, raw)),
        ("group", "list") => reply(service.list_groups()),
        ("species", "create") => reply(service.create_species(auth, raw)),
        ("species", "update") => reply(service.update_species(auth, raw)),
        ("species", "find") => reply(service.find_species(raw)),
        ("species", "delete") => reply(service.delete_species(auth, raw)),
        ("species", "list") => reply(service.list_species(raw)),
        ("species", "with_choice") => reply(service.species_with_choice(raw)),
        ("field", "create") => reply(service.create_field(auth, raw)),
        ("field", "update") => reply(service.update_field(auth, raw)),
        ("field", "find") => reply(service.find_field(raw)),
        ("field", "delete") => reply(service.delete_field(auth, raw)),
        ("choice", "create") => reply(service.create_choice(auth, raw)),
        ("choice", "update") => reply(service.update_choice(auth, raw)),
        ("choice", "find") => reply(service.find_choice(raw)),
        ("choice", "delete") => reply(service.delete_choice(auth, raw)),
        ("feature", "create") => reply(service.create_feature(auth, raw)),
        ("feature", "find") => reply(service.find_feature(raw)),
        ("feature", "delete") => reply(service.delete_feature(auth, raw)),
        _ => unknown(entity, verb),
    }
}

fn unknown(entity: &str, verb: &str) -> Result<Reply, CliError> {
    Err(CliError::Usage(format!("unknown operation `{entity} {verb}`")))
}

#[cfg(test)]
mod tests {
    use super::{reply, run};
    use paleocount_core::{
        open_db_in_memory, ErrorCode, Failure, FixedAuthorizer, OperationResult, Outcome,
        RawParams, SqliteStore, UserService,
    };
    use serde_json::json;

    fn ok<T>(result: OperationResult<T>) -> T {
        match result.unwrap() {
            Outcome::Success(value) => value,
            Outcome::Failure(failure) => panic!("unexpected failure: {failure}"),
        }
    }

    #[test]
    fn failure_reply_carries_status_and_fields() {
        let result: OperationResult<()> =
            Ok(Outcome::Failure(Failure::field("name", ErrorCode::Taken)));
        let reply = reply(result).unwrap();
        assert_eq!(reply.status, 422);
        assert_eq!(
            reply.body,
            json!({"status": 422, "error": "invalid", "fields": {"name": "taken"}})
        );
        assert!(!reply.is_success());
    }

    #[test]
    fn guest_write_is_unauthorized() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteStore::try_new(&conn).unwrap();
        let raw = RawParams::new().with("name", "");
        let reply = run(store, &FixedAuthorizer::guest(), "project", "create", &raw).unwrap();
        assert_eq!(reply.body, json!({"status": 401, "error": "unauthorized"}));
    }

    #[test]
    fn occurrence_reply_carries_symbol_and_summary() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteStore::try_new(&conn).unwrap();
        let user = ok(UserService::new(store).register(
            &RawParams::new()
                .with("name", "Ada")
                .with("email", "ada@example.org"),
        ));
        let auth = FixedAuthorizer::manager(user.id);

        let created = |entity: &str, raw: RawParams| {
            let reply = run(store, &auth, entity, "create", &raw).unwrap();
            assert!(reply.is_success(), "{entity}: {}", reply.body);
            reply.body["id"].as_i64().unwrap().to_string()
        };
        let project = created("project", RawParams::new().with("name", "Core 7"));
        let section = created(
            "section",
            RawParams::new().with("project_id", &project).with("name", "S1"),
        );
        let sample = created(
            "sample",
            RawParams::new()
                .with("section_id", &section)
                .with("name", "A")
                .with("rank", "0"),
        );
        let group = created("group", RawParams::new().with("name", "Foraminifera"));
        let species = created(
            "species",
            RawParams::new().with("group_id", &group).with("name", "Orbulina universa"),
        );
        let counting = created(
            "counting",
            RawParams::new()
                .with("project_id", &project)
                .with("group_id", &group)
                .with("name", "C"),
        );

        let raw = RawParams::new()
            .with("counting_id", &counting)
            .with("sample_id", &sample)
            .with("species_id", &species)
            .with("quantity", "4")
            .with("status", "present");
        let reply = run(store, &auth, "occurrence", "create", &raw).unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["status_symbol"], json!("+"));
        assert_eq!(
            reply.body["summary"],
            json!({"countable": 0, "uncountable": 4, "total": 4})
        );
    }

    #[test]
    fn unknown_operation_is_a_usage_error() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteStore::try_new(&conn).unwrap();
        assert!(run(
            store,
            &FixedAuthorizer::guest(),
            "project",
            "explode",
            &RawParams::new()
        )
        .is_err());
    }
}
