//! Integration tests for `PgEventStore`.
//!
//! `#[sqlx::test]` creates a scratch database per test on the server named by
//! `DATABASE_URL`.

use accounts_core::error::{DomainError, ErrorKind};
use accounts_core::event::{StreamId, StreamVersion};
use accounts_core::repository::{EventStore, MAX_STREAM_VERSION, StoredEvent};
use accounts_event_store::PgEventStore;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `StoredEvent` with sensible defaults.
fn make_stored_event(stream_version: StreamVersion) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        event_name: "TestEvent".to_string(),
        payload: br#"{"key":"value"}"#.to_vec(),
        occurred_at: Utc::now(),
        stream_version,
    }
}

fn fresh_stream_id() -> StreamId {
    StreamId::new(format!("test-{}", Uuid::new_v4()))
}

async fn append_committed(
    store: &PgEventStore,
    stream_id: &StreamId,
    expected_version: StreamVersion,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    let mut session = store.begin().await?;
    session
        .append_to_event_stream(stream_id, expected_version, events)
        .await?;
    session.commit().await
}

// --- retrieve ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_retrieve_returns_empty_vec_for_nonexistent_stream(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let events = store
        .retrieve_event_stream(&fresh_stream_id(), 1, MAX_STREAM_VERSION)
        .await
        .unwrap();

    assert!(events.is_empty());
}

// --- append + retrieve round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_and_retrieve_single_event(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();
    let event = make_stored_event(1);

    append_committed(&store, &stream_id, 0, &[event.clone()])
        .await
        .unwrap();

    let loaded = store
        .retrieve_event_stream(&stream_id, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].event_id, event.event_id);
    assert_eq!(loaded[0].event_name, event.event_name);
    assert_eq!(loaded[0].payload, event.payload);
    assert_eq!(loaded[0].stream_version, 1);
    // PostgreSQL TIMESTAMPTZ has microsecond precision.
    assert_eq!(
        loaded[0].occurred_at.timestamp_micros(),
        event.occurred_at.timestamp_micros()
    );
}

// --- ordering and windows ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_retrieve_window_is_inclusive_and_ordered(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();
    let events: Vec<StoredEvent> = (1..=4).map(make_stored_event).collect();

    append_committed(&store, &stream_id, 0, &events).await.unwrap();

    let window = store.retrieve_event_stream(&stream_id, 2, 3).await.unwrap();
    let versions: Vec<StreamVersion> = window.iter().map(|e| e.stream_version).collect();
    assert_eq!(versions, vec![2, 3]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_session_reads_its_own_uncommitted_appends(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();

    let mut session = store.begin().await.unwrap();
    session
        .append_to_event_stream(&stream_id, 0, &[make_stored_event(1)])
        .await
        .unwrap();

    let inside = session
        .retrieve_event_stream(&stream_id, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    let outside = store
        .retrieve_event_stream(&stream_id, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    assert_eq!(inside.len(), 1);
    assert!(outside.is_empty());

    session.rollback().await.unwrap();
}

// --- stream isolation ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_stream_isolation(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_a = fresh_stream_id();
    let stream_b = fresh_stream_id();

    append_committed(&store, &stream_a, 0, &[make_stored_event(1)])
        .await
        .unwrap();
    append_committed(&store, &stream_b, 0, &[make_stored_event(1)])
        .await
        .unwrap();

    let loaded_a = store
        .retrieve_event_stream(&stream_a, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    let loaded_b = store
        .retrieve_event_stream(&stream_b, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    assert_eq!(loaded_a.len(), 1);
    assert_eq!(loaded_b.len(), 1);
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_expected_version_is_a_concurrency_conflict(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();

    append_committed(&store, &stream_id, 0, &[make_stored_event(1)])
        .await
        .unwrap();

    let result = append_committed(&store, &stream_id, 0, &[make_stored_event(1)]).await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            stream_id: conflict_stream,
            expected_version,
        }) => {
            assert_eq!(conflict_stream, stream_id.to_string());
            assert_eq!(expected_version, 0);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_racing_sessions_only_one_commits(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();

    let mut first = store.begin().await.unwrap();
    let mut second = store.begin().await.unwrap();
    first
        .append_to_event_stream(&stream_id, 0, &[make_stored_event(1)])
        .await
        .unwrap();

    let second_append = tokio::spawn({
        let stream_id = stream_id.clone();
        async move {
            second
                .append_to_event_stream(&stream_id, 0, &[make_stored_event(1)])
                .await
        }
    });
    first.commit().await.unwrap();

    let err = second_append.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);

    let loaded = store
        .retrieve_event_stream(&stream_id, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_sequential_appends_with_correct_expected_version(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();

    append_committed(
        &store,
        &stream_id,
        0,
        &[make_stored_event(1), make_stored_event(2)],
    )
    .await
    .unwrap();
    append_committed(
        &store,
        &stream_id,
        2,
        &[make_stored_event(3), make_stored_event(4)],
    )
    .await
    .unwrap();

    let loaded = store
        .retrieve_event_stream(&stream_id, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 4);
    for (expected, event) in (1..).zip(&loaded) {
        assert_eq!(event.stream_version, expected);
    }
}

// --- edge cases ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_empty_events_is_noop(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();

    append_committed(&store, &stream_id, 0, &[]).await.unwrap();

    let loaded = store
        .retrieve_event_stream(&stream_id, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    assert!(loaded.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_misplaced_version_is_technical(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();

    let result = append_committed(&store, &stream_id, 0, &[make_stored_event(2)]).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Technical);
}

// --- purge ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_purge_then_retrieve_is_empty(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let stream_id = fresh_stream_id();
    append_committed(
        &store,
        &stream_id,
        0,
        &[make_stored_event(1), make_stored_event(2)],
    )
    .await
    .unwrap();

    store.purge_event_stream(&stream_id).await.unwrap();

    let loaded = store
        .retrieve_event_stream(&stream_id, 1, MAX_STREAM_VERSION)
        .await
        .unwrap();
    assert!(loaded.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_purge_of_missing_stream_succeeds(pool: PgPool) {
    let store = PgEventStore::new(pool);

    store.purge_event_stream(&fresh_stream_id()).await.unwrap();
}
