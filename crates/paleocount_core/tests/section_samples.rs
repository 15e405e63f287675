mod common;

use common::{failure, ok, project, register, sample, section};
use paleocount_core::{
    open_db_in_memory, ErrorCode, Failure, ParticipationAuthorizer, RawParams, SampleService,
    SectionService, SqliteStore,
};

#[test]
fn samples_list_top_down_by_rank() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let s1 = section(store, &auth, &project(store, &auth, "P"), "S1");

    sample(store, &auth, &s1, "base", 0);
    sample(store, &auth, &s1, "top", 20);
    sample(store, &auth, &s1, "middle", 10);

    let names: Vec<_> = ok(SampleService::new(store).list(
        &auth,
        &RawParams::new().with("section_id", s1.id.to_string()),
    ))
    .into_iter()
    .map(|sample| sample.name)
    .collect();
    assert_eq!(names, vec!["top", "middle", "base"]);
}

#[test]
fn sample_name_and_rank_conflicts_are_both_reported() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let owned = project(store, &auth, "P");
    let s1 = section(store, &auth, &owned, "S1");
    let s2 = section(store, &auth, &owned, "S2");
    sample(store, &auth, &s1, "A", 0);
    sample(store, &auth, &s2, "A", 0);

    let raw = RawParams::new()
        .with("section_id", s1.id.to_string())
        .with("name", "A")
        .with("rank", "0");
    let conflict = failure(SampleService::new(store).create(&auth, &raw));
    let errors = conflict.field_errors().unwrap();
    assert_eq!(errors.get("name"), Some(ErrorCode::Taken));
    assert_eq!(errors.get("rank"), Some(ErrorCode::Taken));
}

#[test]
fn sample_validation_reports_each_field() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);

    let raw = RawParams::new()
        .with("section_id", "0")
        .with("name", "")
        .with("rank", "deep")
        .with("weight", "-2.5");
    let invalid = failure(SampleService::new(store).create(&auth, &raw));
    let errors = invalid.field_errors().unwrap();
    assert_eq!(errors.get("section_id"), Some(ErrorCode::NotPositive));
    assert_eq!(errors.get("name"), Some(ErrorCode::Blank));
    assert_eq!(errors.get("rank"), Some(ErrorCode::NotANumber));
    assert_eq!(errors.get("weight"), Some(ErrorCode::NotPositive));
    assert_eq!(invalid.http_status(), 422);
}

#[test]
fn sample_update_patches_and_clears_optional_columns() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let s1 = section(store, &auth, &project(store, &auth, "P"), "S1");
    let service = SampleService::new(store);

    let created = ok(service.create(
        &auth,
        &RawParams::new()
            .with("section_id", s1.id.to_string())
            .with("name", "A")
            .with("rank", "3")
            .with("weight", "12.5")
            .with("description", "marl"),
    ));
    assert_eq!(created.weight, Some(12.5));

    let updated = ok(service.update(
        &auth,
        &RawParams::new()
            .with("id", created.id.to_string())
            .with("weight", "")
            .with("rank", "4"),
    ));
    assert_eq!(updated.weight, None);
    assert_eq!(updated.rank, 4);
    assert_eq!(updated.description.as_deref(), Some("marl"));
    assert_eq!(updated.name, "A");
}

#[test]
fn section_rename_respects_scope() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let owned = project(store, &auth, "P");
    section(store, &auth, &owned, "S1");
    let s2 = section(store, &auth, &owned, "S2");
    let service = SectionService::new(store);

    let clash = RawParams::new()
        .with("id", s2.id.to_string())
        .with("name", "S1");
    assert_eq!(
        failure(service.update(&auth, &clash)),
        Failure::field("name", ErrorCode::Taken)
    );

    let rename = RawParams::new()
        .with("id", s2.id.to_string())
        .with("name", "S3");
    assert_eq!(ok(service.update(&auth, &rename)).name, "S3");
}

#[test]
fn missing_parent_section_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);

    let raw = RawParams::new()
        .with("section_id", "77")
        .with("name", "A")
        .with("rank", "0");
    assert_eq!(
        failure(SampleService::new(store).create(&auth, &raw)),
        Failure::NotFound
    );
}
