use meetsched_core::{
    parse_timestamp, CoreConfig, ErrorKind, MeetingDraft, MeetingRuntime, Participant,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn config(path: &Path, pool_size: usize, store_timeout: Duration) -> CoreConfig {
    CoreConfig {
        db_path: path.to_path_buf(),
        pool_size,
        store_timeout,
        ..CoreConfig::default()
    }
}

fn standup(start: &str, end: &str) -> MeetingDraft {
    MeetingDraft::new(
        "Standup",
        vec![Participant::new("Max", "max@x.com", "Yes")],
        parse_timestamp(start).unwrap(),
        parse_timestamp(end).unwrap(),
    )
}

#[test]
fn racing_overlapping_proposals_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(
        MeetingRuntime::start(&config(
            &dir.path().join("race.db"),
            4,
            Duration::from_secs(10),
        ))
        .unwrap(),
    );
    let contenders = 8;
    let barrier = Arc::new(Barrier::new(contenders));

    let handles: Vec<_> = (0..contenders)
        .map(|index| {
            let runtime = Arc::clone(&runtime);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let start = format!("2020-09-19T13:{:02}:00Z", index);
                let candidate = standup(&start, "2020-09-19T14:30:00Z");
                barrier.wait();
                runtime.scheduler().propose_meeting(&candidate)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let admitted = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(admitted, 1);
    for result in &results {
        if let Err(err) = result {
            assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected error: {err}");
        }
    }
    assert_eq!(
        runtime
            .queries()
            .get_by_participant("max@x.com")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn separate_runtimes_sharing_one_database_cannot_double_book() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let first = MeetingRuntime::start(&config(&path, 2, Duration::from_secs(10))).unwrap();
    let second = MeetingRuntime::start(&config(&path, 2, Duration::from_secs(10))).unwrap();

    first
        .scheduler()
        .propose_meeting(&standup("2020-09-19T13:00:00Z", "2020-09-19T14:00:00Z"))
        .unwrap();
    let err = second
        .scheduler()
        .propose_meeting(&standup("2020-09-19T13:30:00Z", "2020-09-19T15:00:00Z"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn proposal_times_out_while_another_writer_holds_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("busy.db");
    let runtime = MeetingRuntime::start(&config(&path, 1, Duration::from_millis(100))).unwrap();

    let blocker = Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let err = runtime
        .scheduler()
        .propose_meeting(&standup("2020-09-19T13:00:00Z", "2020-09-19T14:00:00Z"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.is_timeout(), "expected timeout, got: {err}");

    // WAL readers are not blocked by the pending writer.
    assert!(runtime
        .queries()
        .get_by_participant("max@x.com")
        .unwrap()
        .is_empty());

    blocker.execute_batch("ROLLBACK;").unwrap();
    runtime
        .scheduler()
        .propose_meeting(&standup("2020-09-19T13:00:00Z", "2020-09-19T14:00:00Z"))
        .unwrap();
}

#[test]
fn shutdown_drains_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MeetingRuntime::start(&config(
        &dir.path().join("drain.db"),
        3,
        Duration::from_secs(1),
    ))
    .unwrap();
    let pool = Arc::clone(runtime.pool());
    assert_eq!(pool.idle_count(), 3);

    runtime.shutdown(Duration::from_millis(100)).unwrap();
    assert_eq!(pool.idle_count(), 0);
    assert!(pool.acquire().is_err());
}
