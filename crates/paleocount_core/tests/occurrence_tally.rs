mod common;

use common::{counting, failure, group, ok, project, register, sample, section, species};
use paleocount_core::model::counting::{Counting, Occurrence, OccurrenceStatus};
use paleocount_core::model::section::Sample;
use paleocount_core::model::taxonomy::Species;
use paleocount_core::validate::schema::{QUANTITY_MAX, RANK_MAX};
use paleocount_core::{
    open_db_in_memory, ErrorCode, Failure, OccurrenceService, ParticipationAuthorizer, RawParams,
    SqliteStore,
};
use serde_json::json;

struct Sheet {
    counting: Counting,
    sample: Sample,
    globigerina: Species,
    orbulina: Species,
}

fn sheet(store: SqliteStore<'_>, auth: &ParticipationAuthorizer<'_, SqliteStore<'_>>) -> Sheet {
    let owned = project(store, auth, "P");
    let s1 = section(store, auth, &owned, "S1");
    let a = sample(store, auth, &s1, "A", 0);
    let forams = group(store, auth, "Foraminifera");
    let globigerina = species(store, auth, &forams, "Globigerina bulloides");
    let orbulina = species(store, auth, &forams, "Orbulina universa");
    Sheet {
        counting: counting(store, auth, &owned, &forams, "C"),
        sample: a,
        globigerina,
        orbulina,
    }
}

fn tally(sheet: &Sheet, species: &Species) -> RawParams {
    RawParams::new()
        .with("counting_id", sheet.counting.id.to_string())
        .with("sample_id", sheet.sample.id.to_string())
        .with("species_id", species.id.to_string())
}

fn shift(
    service: &OccurrenceService<SqliteStore<'_>>,
    auth: &ParticipationAuthorizer<'_, SqliteStore<'_>>,
    occurrence: &Occurrence,
    by: i64,
) -> Option<i64> {
    let raw = RawParams::new()
        .with("id", occurrence.id.to_string())
        .with("shift", by.to_string());
    ok(service.update(auth, &raw)).quantity
}

#[test]
fn second_occurrence_of_same_species_is_taken() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    let first = ok(service.create(
        &auth,
        &tally(&sheet, &sheet.globigerina)
            .with("quantity", "5")
            .with("status", "normal"),
    ));
    assert_eq!(first.quantity, Some(5));
    assert_eq!(first.status, OccurrenceStatus::Normal);

    assert_eq!(
        failure(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("quantity", "1"))),
        Failure::field("species_id", ErrorCode::Taken)
    );
}

#[test]
fn rank_and_species_are_checked_independently() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    ok(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("rank", "1")));

    let fresh_rank_same_species = failure(service.create(
        &auth,
        &tally(&sheet, &sheet.globigerina).with("rank", "2"),
    ));
    let errors = fresh_rank_same_species.field_errors().unwrap();
    assert_eq!(errors.get("species_id"), Some(ErrorCode::Taken));
    assert!(!errors.contains("rank"));

    let same_rank_fresh_species =
        failure(service.create(&auth, &tally(&sheet, &sheet.orbulina).with("rank", "1")));
    assert_eq!(
        same_rank_fresh_species,
        Failure::field("rank", ErrorCode::Taken)
    );

    let both = failure(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("rank", "1")));
    let errors = both.field_errors().unwrap();
    assert_eq!(errors.get("rank"), Some(ErrorCode::Taken));
    assert_eq!(errors.get("species_id"), Some(ErrorCode::Taken));
}

#[test]
fn omitted_rank_goes_on_top() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    let first = ok(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("rank", "4")));
    let second = ok(service.create(&auth, &tally(&sheet, &sheet.orbulina)));
    assert_eq!(first.rank, 4);
    assert_eq!(second.rank, 5);
    assert_eq!(second.quantity, None);
    assert!(!second.uncertain);
}

#[test]
fn shift_clamps_to_absent_and_restores() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    let counted = ok(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("quantity", "2")));
    assert_eq!(shift(&service, &auth, &counted, 0), Some(2));
    assert_eq!(shift(&service, &auth, &counted, 0), Some(2));
    assert_eq!(shift(&service, &auth, &counted, 4), Some(6));
    assert_eq!(shift(&service, &auth, &counted, -4), Some(2));
    assert_eq!(shift(&service, &auth, &counted, -5), None);

    let noted = ok(service.create(&auth, &tally(&sheet, &sheet.orbulina)));
    assert_eq!(shift(&service, &auth, &noted, 0), None);
    assert_eq!(shift(&service, &auth, &noted, 3), Some(3));
}

#[test]
fn quantity_and_shift_are_exclusive() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);
    let counted = ok(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("quantity", "2")));

    let raw = RawParams::new()
        .with("id", counted.id.to_string())
        .with("quantity", "3")
        .with("shift", "1");
    assert_eq!(
        failure(service.update(&auth, &raw)),
        Failure::field("shift", ErrorCode::Exclusive)
    );
}

#[test]
fn update_can_clear_quantity_and_change_status() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);
    let counted = ok(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("quantity", "2")));

    let raw = RawParams::new()
        .with("id", counted.id.to_string())
        .with("quantity", "")
        .with("status", "reworked")
        .with("uncertain", "true");
    let updated = ok(service.update(&auth, &raw));
    assert_eq!(updated.quantity, None);
    assert_eq!(updated.status, OccurrenceStatus::Reworked);
    assert!(updated.uncertain);
    assert_eq!(updated.rank, counted.rank);
}

#[test]
fn species_outside_counting_group_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let diatoms = group(store, &auth, "Diatoms");
    let stranger = species(store, &auth, &diatoms, "Coscinodiscus");

    assert_eq!(
        failure(OccurrenceService::new(store).create(&auth, &tally(&sheet, &stranger))),
        Failure::field("species_id", ErrorCode::NotInGroup)
    );
}

#[test]
fn sample_from_another_project_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let elsewhere = project(store, &auth, "Q");
    let far = sample(store, &auth, &section(store, &auth, &elsewhere, "S9"), "Z", 0);

    let raw = RawParams::new()
        .with("counting_id", sheet.counting.id.to_string())
        .with("sample_id", far.id.to_string())
        .with("species_id", sheet.globigerina.id.to_string());
    assert_eq!(
        failure(OccurrenceService::new(store).create(&auth, &raw)),
        Failure::field("sample_id", ErrorCode::NotInProject)
    );
}

#[test]
fn outsider_cannot_tally_and_guest_is_unauthorized() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let bob = register(store, "Bob");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    let raw = tally(&sheet, &sheet.globigerina).with("quantity", "-1");
    assert_eq!(
        failure(service.create(&ParticipationAuthorizer::for_user(bob, &store), &tally(&sheet, &sheet.globigerina))),
        Failure::Forbidden
    );
    assert_eq!(
        failure(service.create(&ParticipationAuthorizer::guest(&store), &raw)),
        Failure::Unauthorized
    );
    assert_eq!(
        failure(service.create(&auth, &raw)),
        Failure::field("quantity", ErrorCode::Negative)
    );
}

#[test]
fn sample_report_lists_by_rank_with_symbols_and_summary() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let forams = sheet.counting.group_id;
    let service = OccurrenceService::new(store);

    ok(service.create(
        &auth,
        &tally(&sheet, &sheet.globigerina)
            .with("rank", "0")
            .with("quantity", "3"),
    ));
    ok(service.create(
        &auth,
        &tally(&sheet, &sheet.orbulina)
            .with("rank", "1")
            .with("quantity", "2")
            .with("status", "present")
            .with("uncertain", "true"),
    ));
    let third = {
        let raw = RawParams::new()
            .with("group_id", forams.to_string())
            .with("name", "Uvigerina peregrina");
        ok(paleocount_core::TaxonomyService::new(store).create_species(&auth, &raw))
    };
    ok(service.create(&auth, &tally(&sheet, &third).with("rank", "2")));

    let report = ok(service.sample_report(
        &auth,
        &RawParams::new()
            .with("counting_id", sheet.counting.id.to_string())
            .with("sample_id", sheet.sample.id.to_string()),
    ));

    let ranks: Vec<_> = report.occurrences.iter().map(|view| view.rank).collect();
    assert_eq!(ranks, vec![2, 1, 0]);

    let body = serde_json::to_value(&report).unwrap();
    assert_eq!(
        body["summary"],
        json!({"countable": 3, "uncountable": 2, "total": 5})
    );
    assert_eq!(body["occurrences"][1]["status"], json!("present"));
    assert_eq!(body["occurrences"][1]["status_symbol"], json!("+?"));
    assert_eq!(body["occurrences"][1]["uncertain"], json!(true));
    assert_eq!(body["occurrences"][0]["quantity"], json!(null));
    assert_eq!(body["occurrences"][2]["status_symbol"], json!(""));
}

#[test]
fn deleting_occurrence_frees_species_slot() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    let first = ok(service.create(&auth, &tally(&sheet, &sheet.globigerina)));
    ok(service.delete(&auth, &RawParams::new().with("id", first.id.to_string())));
    ok(service.create(&auth, &tally(&sheet, &sheet.globigerina)));
}

#[test]
fn oversized_tallies_are_rejected_and_report_stays_exact() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    assert_eq!(
        failure(service.create(
            &auth,
            &tally(&sheet, &sheet.globigerina).with("quantity", i64::MAX.to_string()),
        )),
        Failure::field("quantity", ErrorCode::TooLarge)
    );

    let top = QUANTITY_MAX.to_string();
    let first = ok(service.create(&auth, &tally(&sheet, &sheet.globigerina).with("quantity", &top)));
    ok(service.create(
        &auth,
        &tally(&sheet, &sheet.orbulina)
            .with("quantity", &top)
            .with("status", "present"),
    ));

    let report = ok(service.sample_report(
        &auth,
        &RawParams::new()
            .with("counting_id", sheet.counting.id.to_string())
            .with("sample_id", sheet.sample.id.to_string()),
    ));
    assert_eq!(report.summary.countable, QUANTITY_MAX);
    assert_eq!(report.summary.uncountable, QUANTITY_MAX);
    assert_eq!(report.summary.total, 2 * QUANTITY_MAX);

    let raw = RawParams::new()
        .with("id", first.id.to_string())
        .with("shift", "1");
    assert_eq!(
        failure(service.update(&auth, &raw)),
        Failure::field("shift", ErrorCode::TooLarge)
    );
    assert_eq!(shift(&service, &auth, &first, -1), Some(QUANTITY_MAX - 1));
}

#[test]
fn rank_is_bounded_and_default_rank_follows_the_top() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    assert_eq!(
        failure(service.create(
            &auth,
            &tally(&sheet, &sheet.globigerina).with("rank", i64::MAX.to_string()),
        )),
        Failure::field("rank", ErrorCode::TooLarge)
    );

    ok(service.create(
        &auth,
        &tally(&sheet, &sheet.globigerina).with("rank", RANK_MAX.to_string()),
    ));
    let next = ok(service.create(&auth, &tally(&sheet, &sheet.orbulina)));
    assert_eq!(next.rank, RANK_MAX + 1);
}

#[test]
fn tally_change_returns_symbol_and_refreshed_summary() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let alice = register(store, "Alice");
    let auth = ParticipationAuthorizer::for_user(alice, &store);
    let sheet = sheet(store, &auth);
    let service = OccurrenceService::new(store);

    let created = ok(service.with_summary(service.create(
        &auth,
        &tally(&sheet, &sheet.globigerina).with("quantity", "3"),
    )));
    let body = serde_json::to_value(&created).unwrap();
    assert_eq!(body["status_symbol"], json!(""));
    assert_eq!(
        body["summary"],
        json!({"countable": 3, "uncountable": 0, "total": 3})
    );

    let other = ok(service.create(
        &auth,
        &tally(&sheet, &sheet.orbulina)
            .with("quantity", "2")
            .with("status", "reworked"),
    ));
    let raw = RawParams::new()
        .with("id", other.id.to_string())
        .with("shift", "1")
        .with("uncertain", "yes");
    let updated = ok(service.with_summary(service.update(&auth, &raw)));
    let updated = serde_json::to_value(&updated).unwrap();
    assert_eq!(updated["id"], json!(other.id));
    assert_eq!(updated["quantity"], json!(3));
    assert_eq!(updated["status_symbol"], json!("R?"));
    assert_eq!(
        updated["summary"],
        json!({"countable": 3, "uncountable": 3, "total": 6})
    );

    let removed = ok(service.with_summary(
        service.delete(&auth, &RawParams::new().with("id", other.id.to_string())),
    ));
    assert_eq!(removed.summary.total, 3);

    let rejected = service.with_summary(
        service.create(&auth, &tally(&sheet, &sheet.orbulina).with("quantity", "-1")),
    );
    assert_eq!(
        failure(rejected),
        Failure::field("quantity", ErrorCode::Negative)
    );
}
