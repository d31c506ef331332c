use chrono::Utc;
use meetsched_core::db::open_db_in_memory;
use meetsched_core::{
    parse_timestamp, DbPool, Meeting, MeetingDraft, MeetingRepository, MeetingStore, Participant,
    RepoError, SqliteMeetingRepository, SqliteMeetingStore, TimeRange, Timestamp,
};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Parses `HH:MM` as that time on 2020-09-19 UTC; full RFC 3339 is used as is.
fn at(value: &str) -> Timestamp {
    if value.contains('T') {
        parse_timestamp(value).unwrap()
    } else {
        parse_timestamp(&format!("2020-09-19T{value}:00Z")).unwrap()
    }
}

fn meeting(title: &str, emails: &[&str], start: &str, end: &str) -> Meeting {
    let participants = emails
        .iter()
        .map(|email| Participant::new(email.to_uppercase(), *email, "No"))
        .collect();
    let draft = MeetingDraft::new(title, participants, at(start), at(end));
    Meeting::from_draft(draft, Uuid::new_v4(), Utc::now())
}

fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(at(start), at(end)).unwrap()
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn insert_and_get_roundtrip_preserves_every_field() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let stored = meeting(
        "Planning",
        &["max@x.com", "alex@x.com"],
        "2020-09-19T15:00:00+02:00",
        "2020-09-19T19:00:00+02:00",
    );
    let id = repo.insert_meeting(&stored).unwrap();
    assert_eq!(id, stored.id);

    let loaded = repo.get_meeting(id).unwrap();
    assert_eq!(loaded, stored);
    assert_eq!(loaded.start_time.offset().local_minus_utc(), 7200);
    assert_eq!(loaded.participants[0].email, "max@x.com");
    assert_eq!(loaded.participants[1].email, "alex@x.com");
}

#[test]
fn get_missing_meeting_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let missing = Uuid::new_v4();
    let err = repo.get_meeting(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn insert_rejects_invalid_meetings_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let mut reversed = meeting(
        "Reversed",
        &["max@x.com"],
        "13:00",
        "14:00",
    );
    std::mem::swap(&mut reversed.start_time, &mut reversed.end_time);

    let err = repo.insert_meeting(&reversed).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(row_count(&conn, "meetings"), 0);
}

#[test]
fn list_by_participant_matches_exact_email_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let first = meeting("A", &["max@x.com"], "09:00", "10:00");
    let second = meeting(
        "B",
        &["alex@x.com", "max@x.com"],
        "11:00",
        "12:00",
    );
    let other = meeting("C", &["maxi@x.com"], "09:00", "10:00");
    for item in [&first, &second, &other] {
        repo.insert_meeting(item).unwrap();
    }

    let found = repo.list_by_participant("max@x.com").unwrap();
    let ids: Vec<_> = found.iter().map(|item| item.id).collect();
    assert_eq!(found.len(), 2);
    assert!(ids.contains(&first.id));
    assert!(ids.contains(&second.id));

    assert!(repo.list_by_participant("nobody@x.com").unwrap().is_empty());
}

#[test]
fn window_query_returns_only_strictly_contained_meetings() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let inside = meeting("Inside", &["max@x.com"], "13:00", "17:00");
    let spanning = meeting("Spanning", &["alex@x.com"], "11:00", "19:00");
    let touching = meeting("Touching", &["sam@x.com"], "12:00", "13:00");
    for item in [&inside, &spanning, &touching] {
        repo.insert_meeting(item).unwrap();
    }

    let found = repo
        .list_within_window(&range("12:00", "18:00"))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, inside.id);
}

#[test]
fn find_conflicts_uses_half_open_overlap() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let existing = meeting("Existing", &["max@x.com"], "13:00", "17:00");
    repo.insert_meeting(&existing).unwrap();

    let overlapping = range("16:00", "18:00");
    let hits = repo.find_conflicts("max@x.com", &overlapping).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, existing.id);

    let enclosing = range("12:00", "18:00");
    assert_eq!(repo.find_conflicts("max@x.com", &enclosing).unwrap().len(), 1);

    let after = range("17:00", "18:00");
    assert!(repo.find_conflicts("max@x.com", &after).unwrap().is_empty());

    let before = range("12:00", "13:00");
    assert!(repo.find_conflicts("max@x.com", &before).unwrap().is_empty());

    assert!(repo
        .find_conflicts("alex@x.com", &overlapping)
        .unwrap()
        .is_empty());
}

#[test]
fn overlap_trigger_rejects_direct_insert_without_partial_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let existing = meeting("Existing", &["max@x.com"], "13:00", "17:00");
    repo.insert_meeting(&existing).unwrap();

    let clash = meeting(
        "Clash",
        &["alex@x.com", "max@x.com"],
        "16:00",
        "18:00",
    );
    let err = repo.insert_meeting(&clash).unwrap_err();
    assert!(matches!(err, RepoError::Overlap(id) if id == clash.id));

    assert_eq!(row_count(&conn, "meetings"), 1);
    assert_eq!(row_count(&conn, "meeting_participants"), 1);
}

#[test]
fn overlap_trigger_ignores_duplicate_emails_within_one_meeting() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeetingRepository::new(&conn);

    let doubled = meeting(
        "Doubled",
        &["max@x.com", "max@x.com"],
        "13:00",
        "14:00",
    );
    repo.insert_meeting(&doubled).unwrap();
    assert_eq!(repo.get_meeting(doubled.id).unwrap().participants.len(), 2);
}

#[test]
fn store_write_rolls_back_when_the_closure_fails() {
    let pool = Arc::new(DbPool::open_in_memory(Duration::from_secs(1)).unwrap());
    let store = SqliteMeetingStore::new(Arc::clone(&pool));

    let first = meeting("First", &["max@x.com"], "09:00", "10:00");
    let result: Result<(), RepoError> = store.write(|repo| {
        repo.insert_meeting(&first)?;
        Err(RepoError::InvalidData("abort after insert".to_string()))
    });
    assert!(result.is_err());

    let remaining = store
        .read(|repo| repo.list_by_participant("max@x.com"))
        .unwrap();
    assert!(remaining.is_empty());
}

#[test]
fn store_write_commits_on_success() {
    let pool = Arc::new(DbPool::open_in_memory(Duration::from_secs(1)).unwrap());
    let store = SqliteMeetingStore::new(pool);

    let first = meeting("First", &["max@x.com"], "09:00", "10:00");
    store
        .write(|repo| repo.insert_meeting(&first))
        .unwrap();

    let loaded = store.read(|repo| repo.get_meeting(first.id)).unwrap();
    assert_eq!(loaded, first);
}
