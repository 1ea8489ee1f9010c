//! Event store abstraction.
//!
//! The store deals only in [`StoredEvent`] records; payload encoding is the
//! business of each bounded context, which injects its marshal/unmarshal
//! functions into its stream adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{StreamId, StreamVersion};

/// Highest version usable as the upper bound of a full-stream retrieval.
pub const MAX_STREAM_VERSION: StreamVersion = i64::MAX.unsigned_abs();

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Event name for deserialization routing.
    pub event_name: String,
    /// Serialized event, opaque to the store.
    pub payload: Vec<u8>,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
    /// Position within the stream.
    pub stream_version: StreamVersion,
}

/// Encodes a domain event into a store record.
pub type MarshalDomainEvent<E> = fn(&E) -> Result<StoredEvent, DomainError>;

/// Decodes a store record back into a domain event.
pub type UnmarshalDomainEvent<E> = fn(&StoredEvent) -> Result<E, DomainError>;

/// Shared handle onto the event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Opens a transaction against the backing store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Technical` if the transaction cannot be started.
    async fn begin(&self) -> Result<Box<dyn EventStoreSession>, DomainError>;

    /// Loads the events of `stream_id` with
    /// `from_version <= stream_version <= to_version`, ascending, outside any
    /// caller transaction. A stream that does not exist yields an empty vec.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Technical` on I/O failure.
    async fn retrieve_event_stream(
        &self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Deletes every event of `stream_id` in its own transaction. Purging a
    /// stream that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Technical` on I/O failure.
    async fn purge_event_stream(&self, stream_id: &StreamId) -> Result<(), DomainError>;
}

/// One open transaction against the event log.
///
/// Dropping a session without calling [`EventStoreSession::commit`] discards
/// everything appended through it.
#[async_trait]
pub trait EventStoreSession: Send {
    /// Same contract as [`EventStore::retrieve_event_stream`], but reads
    /// through this transaction.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Technical` on I/O failure.
    async fn retrieve_event_stream(
        &mut self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Appends `events` at versions `expected_version + 1 ..`. An empty slice
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stream is no longer
    /// at `expected_version` or another writer claimed one of the versions.
    /// Returns `DomainError::Technical` if a record's version does not match
    /// its position, or on any other I/O failure.
    async fn append_to_event_stream(
        &mut self,
        stream_id: &StreamId,
        expected_version: StreamVersion,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Technical` if the commit fails, or
    /// `DomainError::ConcurrencyConflict` if the store detects the conflict
    /// only at commit time.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Technical` if the rollback fails.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Verifies that `events` carry versions `expected_version + 1 ..` in order.
///
/// # Errors
///
/// Returns `DomainError::Technical` naming the first misplaced record.
pub fn check_positions(
    stream_id: &StreamId,
    expected_version: StreamVersion,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    for (offset, event) in (1..).zip(events) {
        let position = expected_version.checked_add(offset).ok_or_else(|| {
            DomainError::Technical(format!(
                "stream {stream_id} has no version left after {expected_version}"
            ))
        })?;
        if event.stream_version != position {
            return Err(DomainError::Technical(format!(
                "event {} for stream {stream_id} carries version {} but would be stored at {position}",
                event.event_name, event.stream_version
            )));
        }
    }
    Ok(())
}
