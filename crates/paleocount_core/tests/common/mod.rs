#![allow(dead_code)]

use paleocount_core::model::counting::Counting;
use paleocount_core::model::project::Project;
use paleocount_core::model::section::{Sample, Section};
use paleocount_core::model::taxonomy::{Group, Species};
use paleocount_core::model::user::UserId;
use paleocount_core::{
    Authorizer, CountingService, Failure, OperationResult, Outcome, ProjectService, RawParams,
    SampleService, SectionService, SqliteStore, TaxonomyService, UserService,
};
use std::fmt::Debug;

pub fn ok<T>(result: OperationResult<T>) -> T {
    match result.unwrap() {
        Outcome::Success(value) => value,
        Outcome::Failure(failure) => panic!("unexpected failure: {failure}"),
    }
}

pub fn failure<T: Debug>(result: OperationResult<T>) -> Failure {
    match result.unwrap() {
        Outcome::Failure(failure) => failure,
        Outcome::Success(value) => panic!("unexpected success: {value:?}"),
    }
}

pub fn params(pairs: &[(&str, &str)]) -> RawParams {
    pairs.iter().map(|(key, value)| (*key, *value)).collect()
}

pub fn register(store: SqliteStore<'_>, name: &str) -> UserId {
    let raw = RawParams::new()
        .with("name", name)
        .with("email", format!("{}@example.org", name.to_lowercase()));
    ok(UserService::new(store).register(&raw)).id
}

pub fn project(store: SqliteStore<'_>, auth: &dyn Authorizer, name: &str) -> Project {
    ok(ProjectService::new(store).create(auth, &params(&[("name", name)])))
}

pub fn section(
    store: SqliteStore<'_>,
    auth: &dyn Authorizer,
    project: &Project,
    name: &str,
) -> Section {
    let raw = RawParams::new()
        .with("project_id", project.id.to_string())
        .with("name", name);
    ok(SectionService::new(store).create(auth, &raw))
}

pub fn sample(
    store: SqliteStore<'_>,
    auth: &dyn Authorizer,
    section: &Section,
    name: &str,
    rank: i64,
) -> Sample {
    let raw = RawParams::new()
        .with("section_id", section.id.to_string())
        .with("name", name)
        .with("rank", rank.to_string());
    ok(SampleService::new(store).create(auth, &raw))
}

pub fn group(store: SqliteStore<'_>, auth: &dyn Authorizer, name: &str) -> Group {
    ok(TaxonomyService::new(store).create_group(auth, &params(&[("name", name)])))
}

pub fn species(
    store: SqliteStore<'_>,
    auth: &dyn Authorizer,
    group: &Group,
    name: &str,
) -> Species {
    let raw = RawParams::new()
        .with("group_id", group.id.to_string())
        .with("name", name);
    ok(TaxonomyService::new(store).create_species(auth, &raw))
}

pub fn counting(
    store: SqliteStore<'_>,
    auth: &dyn Authorizer,
    project: &Project,
    group: &Group,
    name: &str,
) -> Counting {
    let raw = RawParams::new()
        .with("project_id", project.id.to_string())
        .with("group_id", group.id.to_string())
        .with("name", name);
    ok(CountingService::new(store).create(auth, &raw))
}
