use attendance_engine::error::{EngineError, QueryError, ReconcileError, ResolutionError, ValidationError};
use attendance_engine::model::{AttendanceSpan, Employee, SpanKey};
use attendance_engine::store::{MemoryAttendanceStore, MemoryDirectory};
use attendance_engine::{AttendanceEngine, EngineOptions, Reconciliation, Severity};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    engine: AttendanceEngine,
    directory: Arc<MemoryDirectory>,
    store: Arc<MemoryAttendanceStore>,
}

fn harness_with(options: EngineOptions) -> Harness {
    let directory = Arc::new(
        MemoryDirectory::with_employees([
            Employee::new(1, "Ana Souza", "ana@company.com", "RFID001"),
            Employee::new(2, "Bruno Lima", "bruno@company.com", "RFID002").inactive(),
            Employee::new(3, "Carla Dias", "carla@company.com", "RFID003"),
        ])
        .unwrap(),
    );
    let store = Arc::new(MemoryAttendanceStore::new());
    let engine = AttendanceEngine::new(directory.clone(), store.clone(), options);
    Harness {
        engine,
        directory,
        store,
    }
}

fn harness() -> Harness {
    harness_with(EngineOptions::default())
}

fn event(tag: &str, kind: &str, occurred_at: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "deviceId": "D1",
        "rfidTag": tag,
        "kind": kind,
        "occurredAt": occurred_at
    }))
    .unwrap()
}

fn at(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").unwrap()
}

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

fn open_counts(spans: &[AttendanceSpan]) -> HashMap<SpanKey, usize> {
    let mut counts = HashMap::new();
    for span in spans.iter().filter(|s| s.is_open()) {
        *counts.entry(span.key()).or_insert(0) += 1;
    }
    counts
}

#[actix_web::test]
async fn check_in_then_check_out_then_check_in_again() {
    let h = harness();

    let opened = h
        .engine
        .process(&event("RFID001", "CHECK_IN", "2024-10-30T08:00:00"))
        .await
        .unwrap();
    let Reconciliation::Opened(first) = opened.clone() else {
        panic!("expected an opened span, got {opened:?}");
    };
    assert_eq!(first.date, date("2024-10-30"));
    assert_eq!(first.opened_at, at("2024-10-30T08:00:00"));
    assert_eq!(first.closed_at, None);

    let closed = h
        .engine
        .process(&event("RFID001", "CHECK_OUT", "2024-10-30T17:00:00"))
        .await
        .unwrap();
    assert_eq!(closed.span().id, first.id);
    assert_eq!(closed.span().closed_at, Some(at("2024-10-30T17:00:00")));
    assert_eq!(closed.span().opened_at, first.opened_at);

    // The day's span is closed, so a later check-in starts a second one.
    let again = h
        .engine
        .process(&event("RFID001", "CHECK_IN", "2024-10-30T08:00:00"))
        .await
        .unwrap();
    assert!(matches!(again, Reconciliation::Opened(ref s) if s.id != first.id));

    let spans = h.engine.find_spans(1, date("2024-10-30")).await.unwrap();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans.iter().filter(|s| s.is_open()).count(), 1);
}

#[actix_web::test]
async fn at_most_one_open_span_per_employee_and_day() {
    let h = harness();
    let script = [
        ("RFID001", "CHECK_IN", "2024-10-30T08:00:00"),
        ("RFID001", "CHECK_IN", "2024-10-30T08:01:00"),
        ("RFID003", "CHECK_IN", "2024-10-30T08:02:00"),
        ("RFID001", "CHECK_OUT", "2024-10-30T12:00:00"),
        ("RFID001", "CHECK_OUT", "2024-10-30T12:01:00"),
        ("RFID001", "CHECK_IN", "2024-10-30T13:00:00"),
        ("RFID001", "CHECK_IN", "2024-10-31T08:00:00"),
        ("RFID003", "CHECK_IN", "2024-10-30T09:00:00"),
        ("RFID003", "CHECK_OUT", "2024-10-31T17:00:00"),
        ("RFID001", "CHECK_IN", "2024-10-30T14:00:00"),
    ];

    for (tag, kind, ts) in script {
        let _ = h.engine.process(&event(tag, kind, ts)).await;
        let counts = open_counts(&h.store.all_spans());
        assert!(
            counts.values().all(|n| *n <= 1),
            "more than one open span after {kind} at {ts}: {counts:?}"
        );
    }
}

#[actix_web::test]
async fn replayed_check_in_is_rejected_without_side_effects() {
    let h = harness();
    let payload = event("RFID001", "CHECK_IN", "2024-10-30T08:00:00");

    h.engine.process(&payload).await.unwrap();
    let after_first = h.store.all_spans();

    let err = h.engine.process(&payload).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Reconcile(ReconcileError::DuplicateOpen(key))
            if key == SpanKey::new(1, date("2024-10-30"))
    ));
    assert_eq!(err.severity(), Severity::Rejection);
    assert_eq!(h.store.all_spans(), after_first);
}

#[actix_web::test]
async fn events_are_anchored_to_their_own_date() {
    let h = harness();

    h.engine
        .process(&event("RFID001", "CHECK_IN", "2024-01-15T23:59:00"))
        .await
        .unwrap();

    // The close lands on the 16th, where nothing is open.
    let err = h
        .engine
        .process(&event("RFID001", "CHECK_OUT", "2024-01-16T00:05:00"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Reconcile(ReconcileError::NoOpenSpan(key)) if key.date == date("2024-01-16")
    ));

    h.engine
        .process(&event("RFID001", "CHECK_IN", "2024-01-16T00:06:00"))
        .await
        .unwrap();

    let spans = h
        .engine
        .find_spans_between(1, date("2024-01-15"), date("2024-01-16"))
        .await
        .unwrap();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].date, date("2024-01-15"));
    assert!(spans[0].is_open());
    assert_eq!(spans[1].date, date("2024-01-16"));
}

#[actix_web::test]
async fn inactive_employee_never_produces_a_span() {
    let h = harness();

    let err = h
        .engine
        .process(&event("RFID002", "CHECK_IN", "2024-10-30T08:00:00"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Resolution(ResolutionError::InactiveEmployee(2))
    ));
    assert!(h.store.all_spans().is_empty());
}

#[actix_web::test]
async fn close_without_open_leaves_storage_unchanged() {
    let h = harness();
    h.engine
        .process(&event("RFID003", "CHECK_IN", "2024-10-29T08:00:00"))
        .await
        .unwrap();
    let before = h.store.all_spans();

    let err = h
        .engine
        .process(&event("RFID001", "CHECK_OUT", "2024-10-30T17:00:00"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Reconcile(ReconcileError::NoOpenSpan(_))
    ));
    assert_eq!(h.store.all_spans(), before);
}

#[actix_web::test]
async fn unknown_tags_and_bad_payloads_are_caller_errors() {
    let h = harness();

    let unknown = h
        .engine
        .process(&event("RFID999", "CHECK_IN", "2024-10-30T08:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(
        unknown,
        EngineError::Resolution(ResolutionError::UnknownTag(_))
    ));
    assert_eq!(unknown.severity(), Severity::CallerError);

    let bad_kind = h
        .engine
        .process(&event("RFID001", "ENTER", "2024-10-30T08:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(
        bad_kind,
        EngineError::Validation(ValidationError::InvalidEventKind(_))
    ));

    let malformed = h.engine.process(b"not json").await.unwrap_err();
    assert!(matches!(
        malformed,
        EngineError::Validation(ValidationError::MalformedPayload(_))
    ));

    assert!(h.store.all_spans().is_empty());
}

#[actix_web::test]
async fn corrupt_key_is_fatal_but_other_keys_keep_working() {
    let h = harness();
    let day = date("2024-10-30");
    for hour in [8, 9] {
        let opened_at = day.and_hms_opt(hour, 0, 0).unwrap();
        h.store.import_span(AttendanceSpan {
            id: 0,
            employee_id: 1,
            date: day,
            opened_at,
            closed_at: None,
            created_at: opened_at,
        });
    }

    let err = h
        .engine
        .process(&event("RFID001", "CHECK_OUT", "2024-10-30T17:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Reconcile(ReconcileError::InvariantViolation { open_spans: 2, .. })
    ));
    assert_eq!(err.severity(), Severity::Fatal);

    // Nothing was repaired.
    assert_eq!(open_counts(&h.store.all_spans())[&SpanKey::new(1, day)], 2);

    // Other employees and other days of the same employee are unaffected.
    assert!(h
        .engine
        .process(&event("RFID003", "CHECK_IN", "2024-10-30T08:00:00"))
        .await
        .is_ok());
    assert!(h
        .engine
        .process(&event("RFID001", "CHECK_IN", "2024-10-31T08:00:00"))
        .await
        .is_ok());
}

#[actix_web::test]
async fn inverted_range_is_rejected() {
    let h = harness();
    let err = h
        .engine
        .find_spans_between(1, date("2024-10-31"), date("2024-10-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidRange { .. }));

    let same_day = h
        .engine
        .find_spans_between(1, date("2024-10-31"), date("2024-10-31"))
        .await;
    assert!(same_day.unwrap().is_empty());
}

#[actix_web::test]
async fn daily_report_summarises_the_day() {
    let h = harness();
    for (tag, kind, ts) in [
        ("RFID001", "CHECK_IN", "2024-10-30T08:00:00"),
        ("RFID001", "CHECK_OUT", "2024-10-30T12:00:00"),
        ("RFID001", "CHECK_IN", "2024-10-30T13:00:00"),
        ("RFID003", "CHECK_IN", "2024-10-30T09:00:00"),
        ("RFID003", "CHECK_IN", "2024-10-31T09:00:00"),
    ] {
        h.engine.process(&event(tag, kind, ts)).await.unwrap();
    }

    let report = h.engine.daily_report(date("2024-10-30")).await.unwrap();
    assert_eq!(report.employees, 2);
    assert_eq!(report.spans, 3);
    assert_eq!(report.checked_out, 1);
    assert_eq!(report.still_present, 2);
}

#[actix_web::test]
async fn spans_are_listed_by_opening_time() {
    let h = harness();
    for (kind, ts) in [
        ("CHECK_IN", "2024-10-30T10:00:00"),
        ("CHECK_OUT", "2024-10-30T11:00:00"),
        ("CHECK_IN", "2024-10-30T08:00:00"),
    ] {
        h.engine.process(&event("RFID001", kind, ts)).await.unwrap();
    }

    let expected = vec![at("2024-10-30T08:00:00"), at("2024-10-30T10:00:00")];

    let spans = h.engine.find_spans(1, date("2024-10-30")).await.unwrap();
    let opened: Vec<NaiveDateTime> = spans.iter().map(|s| s.opened_at).collect();
    assert_eq!(opened, expected);

    let report = h.engine.daily_report(date("2024-10-30")).await.unwrap();
    let opened: Vec<NaiveDateTime> = report.attendances.iter().map(|s| s.opened_at).collect();
    assert_eq!(opened, expected);
}

#[actix_web::test]
async fn cached_identity_honours_deactivation_after_invalidate() {
    let h = harness_with(EngineOptions {
        tag_cache_ttl: Duration::from_secs(300),
        tag_cache_capacity: 100,
    });

    h.engine
        .process(&event("RFID001", "CHECK_IN", "2024-10-30T08:00:00"))
        .await
        .unwrap();

    h.directory.set_active(1, false);
    h.engine.resolver().invalidate("RFID001").await;

    let err = h
        .engine
        .process(&event("RFID001", "CHECK_OUT", "2024-10-30T17:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Resolution(ResolutionError::InactiveEmployee(1))
    ));
}

#[test]
fn concurrent_duplicate_check_ins_create_exactly_one_span() {
    let h = Arc::new(harness());
    let payload = event("RFID001", "CHECK_IN", "2024-10-30T08:00:00");

    let results: Vec<Result<Reconciliation, EngineError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let h = h.clone();
                let payload = payload.clone();
                scope.spawn(move || futures::executor::block_on(h.engine.process(&payload)))
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    let opened = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(EngineError::Reconcile(ReconcileError::DuplicateOpen(_)))
            )
        })
        .count();

    assert_eq!(opened, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(h.store.all_spans().len(), 1);
}

#[test]
fn different_keys_proceed_independently_under_concurrency() {
    let h = Arc::new(harness());

    let results: Vec<Result<Reconciliation, EngineError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=10)
            .flat_map(|day| {
                ["RFID001", "RFID003"].map(|tag| {
                    let h = h.clone();
                    let payload = event(tag, "CHECK_IN", &format!("2024-10-{day:02}T08:00:00"));
                    scope.spawn(move || futures::executor::block_on(h.engine.process(&payload)))
                })
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(h.store.all_spans().len(), 20);
}
