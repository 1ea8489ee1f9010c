//! Test event stores: in-process `EventStore` implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use accounts_core::error::DomainError;
use accounts_core::event::{StreamId, StreamVersion};
use accounts_core::repository::{
    EventStore, EventStoreSession, StoredEvent, check_positions,
};
use async_trait::async_trait;
use tokio::sync::Barrier;

type Streams = Arc<Mutex<HashMap<StreamId, Vec<StoredEvent>>>>;

fn window(
    events: impl IntoIterator<Item = StoredEvent>,
    from_version: StreamVersion,
    to_version: StreamVersion,
) -> Vec<StoredEvent> {
    events
        .into_iter()
        .filter(|e| (from_version..=to_version).contains(&e.stream_version))
        .collect()
}

fn current_version(events: &[StoredEvent]) -> StreamVersion {
    events.last().map_or(0, |e| e.stream_version)
}

fn conflict(stream_id: &StreamId, expected_version: StreamVersion) -> DomainError {
    DomainError::ConcurrencyConflict {
        stream_id: stream_id.to_string(),
        expected_version,
    }
}

/// An event store held in memory with the same transactional contract as the
/// PostgreSQL store: appends are buffered per session and become visible on
/// commit, a stale expected version fails with `ConcurrencyConflict`, and a
/// dropped session discards its writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    streams: Streams,
    sessions_begun: Arc<AtomicU32>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed events of `stream_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn events(&self, stream_id: &StreamId) -> Vec<StoredEvent> {
        self.streams
            .lock()
            .unwrap()
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns how many sessions have been opened.
    #[must_use]
    pub fn sessions_begun(&self) -> u32 {
        self.sessions_begun.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn begin(&self) -> Result<Box<dyn EventStoreSession>, DomainError> {
        self.sessions_begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            streams: Arc::clone(&self.streams),
            pending: Vec::new(),
        }))
    }

    async fn retrieve_event_stream(
        &self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(window(self.events(stream_id), from_version, to_version))
    }

    async fn purge_event_stream(&self, stream_id: &StreamId) -> Result<(), DomainError> {
        self.streams.lock().unwrap().remove(stream_id);
        Ok(())
    }
}

struct InMemorySession {
    streams: Streams,
    pending: Vec<(StreamId, StreamVersion, Vec<StoredEvent>)>,
}

impl InMemorySession {
    fn visible(&self, stream_id: &StreamId) -> Vec<StoredEvent> {
        let mut events = self
            .streams
            .lock()
            .unwrap()
            .get(stream_id)
            .cloned()
            .unwrap_or_default();
        for (pending_id, _, pending_events) in &self.pending {
            if pending_id == stream_id {
                events.extend(pending_events.iter().cloned());
            }
        }
        events
    }
}

#[async_trait]
impl EventStoreSession for InMemorySession {
    async fn retrieve_event_stream(
        &mut self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(window(self.visible(stream_id), from_version, to_version))
    }

    async fn append_to_event_stream(
        &mut self,
        stream_id: &StreamId,
        expected_version: StreamVersion,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        check_positions(stream_id, expected_version, events)?;
        if current_version(&self.visible(stream_id)) != expected_version {
            return Err(conflict(stream_id, expected_version));
        }
        self.pending
            .push((stream_id.clone(), expected_version, events.to_vec()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut streams = self.streams.lock().unwrap();
        let mut staged: HashMap<StreamId, Vec<StoredEvent>> = HashMap::new();
        for (stream_id, expected_version, events) in &self.pending {
            let stream = staged
                .entry(stream_id.clone())
                .or_insert_with(|| streams.get(stream_id).cloned().unwrap_or_default());
            if current_version(stream) != *expected_version {
                return Err(conflict(stream_id, *expected_version));
            }
            stream.extend(events.iter().cloned());
        }
        streams.extend(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Wraps an `InMemoryEventStore` and fails the first `conflicts` appends with
/// `ConcurrencyConflict`, as if another writer had won each race.
#[derive(Debug, Clone)]
pub struct ConflictingEventStore {
    inner: InMemoryEventStore,
    remaining: Arc<AtomicU32>,
}

impl ConflictingEventStore {
    /// Create a store that conflicts on the next `conflicts` appends.
    #[must_use]
    pub fn new(inner: InMemoryEventStore, conflicts: u32) -> Self {
        Self {
            inner,
            remaining: Arc::new(AtomicU32::new(conflicts)),
        }
    }

    /// Returns how many sessions (attempts) have been opened.
    #[must_use]
    pub fn sessions_begun(&self) -> u32 {
        self.inner.sessions_begun()
    }
}

#[async_trait]
impl EventStore for ConflictingEventStore {
    async fn begin(&self) -> Result<Box<dyn EventStoreSession>, DomainError> {
        Ok(Box::new(ConflictingSession {
            inner: self.inner.begin().await?,
            remaining: Arc::clone(&self.remaining),
        }))
    }

    async fn retrieve_event_stream(
        &self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner
            .retrieve_event_stream(stream_id, from_version, to_version)
            .await
    }

    async fn purge_event_stream(&self, stream_id: &StreamId) -> Result<(), DomainError> {
        self.inner.purge_event_stream(stream_id).await
    }
}

struct ConflictingSession {
    inner: Box<dyn EventStoreSession>,
    remaining: Arc<AtomicU32>,
}

#[async_trait]
impl EventStoreSession for ConflictingSession {
    async fn retrieve_event_stream(
        &mut self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner
            .retrieve_event_stream(stream_id, from_version, to_version)
            .await
    }

    async fn append_to_event_stream(
        &mut self,
        stream_id: &StreamId,
        expected_version: StreamVersion,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let claimed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if claimed {
            return Err(conflict(stream_id, expected_version));
        }
        self.inner
            .append_to_event_stream(stream_id, expected_version, events)
            .await
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.rollback().await
    }
}

/// Wraps an `InMemoryEventStore` and holds the first `parties` appends at a
/// barrier until all of them have arrived, so that concurrent commands are
/// guaranteed to read the same stream version before either writes.
#[derive(Debug, Clone)]
pub struct InterleavingEventStore {
    inner: InMemoryEventStore,
    barrier: Arc<Barrier>,
    parties: u32,
    arrived: Arc<AtomicU32>,
}

impl InterleavingEventStore {
    /// Create a store whose first `parties` appends rendezvous.
    #[must_use]
    pub fn new(inner: InMemoryEventStore, parties: u32) -> Self {
        Self {
            inner,
            barrier: Arc::new(Barrier::new(parties as usize)),
            parties,
            arrived: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl EventStore for InterleavingEventStore {
    async fn begin(&self) -> Result<Box<dyn EventStoreSession>, DomainError> {
        Ok(Box::new(InterleavingSession {
            inner: self.inner.begin().await?,
            store: self.clone(),
        }))
    }

    async fn retrieve_event_stream(
        &self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner
            .retrieve_event_stream(stream_id, from_version, to_version)
            .await
    }

    async fn purge_event_stream(&self, stream_id: &StreamId) -> Result<(), DomainError> {
        self.inner.purge_event_stream(stream_id).await
    }
}

struct InterleavingSession {
    inner: Box<dyn EventStoreSession>,
    store: InterleavingEventStore,
}

#[async_trait]
impl EventStoreSession for InterleavingSession {
    async fn retrieve_event_stream(
        &mut self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner
            .retrieve_event_stream(stream_id, from_version, to_version)
            .await
    }

    async fn append_to_event_stream(
        &mut self,
        stream_id: &StreamId,
        expected_version: StreamVersion,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if self.store.arrived.fetch_add(1, Ordering::SeqCst) < self.store.parties {
            self.store.barrier.wait().await;
        }
        self.inner
            .append_to_event_stream(stream_id, expected_version, events)
            .await
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.rollback().await
    }
}

/// An event store that always returns a technical error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn begin(&self) -> Result<Box<dyn EventStoreSession>, DomainError> {
        Err(DomainError::Technical("connection refused".into()))
    }

    async fn retrieve_event_stream(
        &self,
        _stream_id: &StreamId,
        _from_version: StreamVersion,
        _to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Technical("connection refused".into()))
    }

    async fn purge_event_stream(&self, _stream_id: &StreamId) -> Result<(), DomainError> {
        Err(DomainError::Technical("connection refused".into()))
    }
}

#[cfg(test)]
mod tests {
    use accounts_core::error::ErrorKind;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn stored(stream_version: StreamVersion) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            event_name: "TestEvent".into(),
            payload: b"{}".to_vec(),
            occurred_at: Utc::now(),
            stream_version,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_appends_are_invisible_to_other_readers() {
        let store = InMemoryEventStore::new();
        let stream_id = StreamId::new("test-1");

        let mut session = store.begin().await.unwrap();
        session
            .append_to_event_stream(&stream_id, 0, &[stored(1)])
            .await
            .unwrap();

        assert!(store.events(&stream_id).is_empty());
        session.commit().await.unwrap();
        assert_eq!(store.events(&stream_id).len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_session_discards_appends() {
        let store = InMemoryEventStore::new();
        let stream_id = StreamId::new("test-1");

        {
            let mut session = store.begin().await.unwrap();
            session
                .append_to_event_stream(&stream_id, 0, &[stored(1)])
                .await
                .unwrap();
        }

        assert!(store.events(&stream_id).is_empty());
    }

    #[tokio::test]
    async fn test_second_committer_at_same_version_conflicts() {
        let store = InMemoryEventStore::new();
        let stream_id = StreamId::new("test-1");

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first
            .append_to_event_stream(&stream_id, 0, &[stored(1)])
            .await
            .unwrap();
        second
            .append_to_event_stream(&stream_id, 0, &[stored(1)])
            .await
            .unwrap();
        first.commit().await.unwrap();

        let err = second.commit().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert_eq!(store.events(&stream_id).len(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_store_fails_exactly_configured_appends() {
        let store = ConflictingEventStore::new(InMemoryEventStore::new(), 2);
        let stream_id = StreamId::new("test-1");

        for _ in 0..2 {
            let mut session = store.begin().await.unwrap();
            let err = session
                .append_to_event_stream(&stream_id, 0, &[stored(1)])
                .await
                .unwrap_err();
            assert!(err.is_concurrency_conflict());
        }

        let mut session = store.begin().await.unwrap();
        session
            .append_to_event_stream(&stream_id, 0, &[stored(1)])
            .await
            .unwrap();
        session.commit().await.unwrap();

        assert_eq!(store.sessions_begun(), 3);
    }
}
