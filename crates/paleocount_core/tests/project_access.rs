mod common;

use common::{failure, ok, params, project, register, section};
use paleocount_core::{
    open_db_in_memory, ErrorCode, Failure, FixedAuthorizer, ParticipationAuthorizer,
    ParticipationService, ProjectService, RawParams, SectionService, SqliteStore,
};

#[test]
fn creator_becomes_manager() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);

    let created = project(store, &auth, "Adriatic cores");
    assert!(!created.public);

    let members = ok(ParticipationService::new(store).list(
        &auth,
        &RawParams::new().with("project_id", created.id.to_string()),
    ));
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, alice);
    assert!(members[0].manager);
}

#[test]
fn guest_write_is_unauthorized_even_with_invalid_payload() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let owned = project(
        store,
        &ParticipationAuthorizer::for_user(alice, &store),
        "Private",
    );
    let service = ProjectService::new(store);
    let guest = ParticipationAuthorizer::guest(&store);

    let invalid = RawParams::new()
        .with("id", owned.id.to_string())
        .with("name", "   ");
    assert_eq!(failure(service.update(&guest, &invalid)), Failure::Unauthorized);

    let malformed = params(&[("id", "not-a-number")]);
    assert_eq!(
        failure(service.update(&guest, &malformed)),
        Failure::Unauthorized
    );
    assert_eq!(
        failure(service.create(&guest, &params(&[]))),
        Failure::Unauthorized
    );
}

#[test]
fn authenticated_outsider_is_forbidden() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let bob = register(store, "Bob");
    let owned = project(
        store,
        &ParticipationAuthorizer::for_user(alice, &store),
        "Private",
    );
    let service = ProjectService::new(store);
    let bob_auth = ParticipationAuthorizer::for_user(bob, &store);
    let by_id = RawParams::new().with("id", owned.id.to_string());

    assert_eq!(failure(service.find(&bob_auth, &by_id)), Failure::Forbidden);
    assert_eq!(
        failure(service.find(&ParticipationAuthorizer::guest(&store), &by_id)),
        Failure::Unauthorized
    );
    assert_eq!(failure(service.delete(&bob_auth, &by_id)), Failure::Forbidden);
}

#[test]
fn validation_runs_before_authorization_for_identified_actors() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = ProjectService::new(store);

    let outcome = failure(service.update(&FixedAuthorizer::outsider(7), &params(&[("name", "x")])));
    assert_eq!(outcome.field_errors().unwrap().get("id"), Some(ErrorCode::Missing));
}

#[test]
fn missing_target_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = ProjectService::new(store);

    assert_eq!(
        failure(service.find(&FixedAuthorizer::manager(1), &params(&[("id", "404")]))),
        Failure::NotFound
    );
}

#[test]
fn public_project_is_visible_to_guests_but_not_writable_by_observers() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let bob = register(store, "Bob");
    let alice_auth = ParticipationAuthorizer::for_user(alice, &store);
    let service = ProjectService::new(store);

    let published = ok(service.create(&alice_auth, &params(&[("name", "Open"), ("public", "true")])));
    let hidden = project(store, &alice_auth, "Hidden");

    let guest = ParticipationAuthorizer::guest(&store);
    let by_id = RawParams::new().with("id", published.id.to_string());
    assert_eq!(ok(service.find(&guest, &by_id)).name, "Open");

    let visible: Vec<_> = ok(service.list(&guest)).into_iter().map(|p| p.id).collect();
    assert_eq!(visible, vec![published.id]);
    let mine: Vec<_> = ok(service.list(&alice_auth)).into_iter().map(|p| p.id).collect();
    assert!(mine.contains(&hidden.id));

    let rename = by_id.clone().with("name", "Renamed");
    assert_eq!(
        failure(service.update(&ParticipationAuthorizer::for_user(bob, &store), &rename)),
        Failure::Forbidden
    );
}

#[test]
fn non_manager_participant_can_view_but_not_manage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let bob = register(store, "Bob");
    let alice_auth = ParticipationAuthorizer::for_user(alice, &store);
    let owned = project(store, &alice_auth, "Team");

    let memberships = ParticipationService::new(store);
    let joined = ok(memberships.create(
        &alice_auth,
        &RawParams::new()
            .with("project_id", owned.id.to_string())
            .with("user_id", bob.to_string()),
    ));
    assert!(!joined.manager);

    let bob_auth = ParticipationAuthorizer::for_user(bob, &store);
    let service = ProjectService::new(store);
    let by_id = RawParams::new().with("id", owned.id.to_string());
    assert_eq!(ok(service.find(&bob_auth, &by_id)).id, owned.id);
    assert_eq!(
        failure(service.update(&bob_auth, &by_id.clone().with("public", "true"))),
        Failure::Forbidden
    );

    ok(memberships.update(
        &alice_auth,
        &RawParams::new()
            .with("id", joined.id.to_string())
            .with("manager", "yes"),
    ));
    let published = ok(service.update(&bob_auth, &by_id.with("public", "true")));
    assert!(published.public);
}

#[test]
fn duplicate_participation_is_taken() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let alice_auth = ParticipationAuthorizer::for_user(alice, &store);
    let owned = project(store, &alice_auth, "Team");

    let raw = RawParams::new()
        .with("project_id", owned.id.to_string())
        .with("user_id", alice.to_string());
    assert_eq!(
        failure(ParticipationService::new(store).create(&alice_auth, &raw)),
        Failure::field("user_id", ErrorCode::Taken)
    );
}

#[test]
fn names_are_unique_per_scope_only() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let first = project(store, &auth, "North");
    let second = project(store, &auth, "South");

    assert_eq!(
        failure(ProjectService::new(store).create(&auth, &params(&[("name", "North")]))),
        Failure::field("name", ErrorCode::Taken)
    );

    section(store, &auth, &first, "S1");
    section(store, &auth, &second, "S1");
    let again = RawParams::new()
        .with("project_id", first.id.to_string())
        .with("name", "S1");
    assert_eq!(
        failure(SectionService::new(store).create(&auth, &again)),
        Failure::field("name", ErrorCode::Taken)
    );
}

#[test]
fn renaming_to_own_name_is_not_taken() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let owned = project(store, &auth, "Same");

    let raw = RawParams::new()
        .with("id", owned.id.to_string())
        .with("name", "Same");
    assert_eq!(ok(ProjectService::new(store).update(&auth, &raw)).name, "Same");
}

#[test]
fn deleting_project_cascades_to_sections() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let owned = project(store, &auth, "Doomed");
    let child = section(store, &auth, &owned, "S1");

    ok(ProjectService::new(store).delete(&auth, &RawParams::new().with("id", owned.id.to_string())));
    assert_eq!(
        failure(SectionService::new(store).find(&auth, &RawParams::new().with("id", child.id.to_string()))),
        Failure::NotFound
    );
}
