//! Domain event abstractions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of an event within its stream. The first event is version 1;
/// version 0 means the stream has no events yet.
pub type StreamVersion = u64;

/// Identifies one aggregate instance's event log, e.g. `customer-<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(String);

impl StreamId {
    /// Creates a stream identifier.
    ///
    /// # Panics
    ///
    /// Panics if `value` is empty. An empty stream id is a programming error,
    /// not a recoverable condition.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        assert!(!value.is_empty(), "stream id must not be empty");
        Self(value)
    }

    /// Returns the stream id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventMeta {
    /// Identity of the owning aggregate.
    pub identifier: String,
    /// Declared name of the event kind.
    pub event_name: String,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
    /// Position of this event in its stream.
    pub stream_version: StreamVersion,
    /// Unique event identifier.
    pub message_id: Uuid,
    /// Correlation ID of the command that caused this event.
    pub causation_id: Uuid,
}

impl EventMeta {
    /// Builds metadata for a freshly recorded event.
    #[must_use]
    pub fn record(
        identifier: impl Into<String>,
        event_name: &'static str,
        occurred_at: DateTime<Utc>,
        stream_version: StreamVersion,
        causation_id: Uuid,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            event_name: event_name.to_owned(),
            occurred_at,
            stream_version,
            message_id: Uuid::new_v4(),
            causation_id,
        }
    }
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + fmt::Debug {
    /// Returns the declared event name (used for serialization routing).
    fn event_name(&self) -> &'static str;

    /// Returns the metadata for this event.
    fn meta(&self) -> &EventMeta;

    /// Returns the stream version of this event.
    fn stream_version(&self) -> StreamVersion {
        self.meta().stream_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_exposes_its_value() {
        let stream_id = StreamId::new("customer-123");

        assert_eq!(stream_id.as_str(), "customer-123");
        assert_eq!(stream_id.to_string(), "customer-123");
    }

    #[test]
    #[should_panic(expected = "stream id must not be empty")]
    fn test_stream_id_panics_on_empty_input() {
        let _ = StreamId::new("");
    }

    #[test]
    fn test_event_meta_record_assigns_fresh_message_id() {
        let now = Utc::now();
        let causation_id = Uuid::new_v4();

        let a = EventMeta::record("c-1", "CustomerRegistered", now, 1, causation_id);
        let b = EventMeta::record("c-1", "CustomerRegistered", now, 1, causation_id);

        assert_ne!(a.message_id, b.message_id);
        assert_eq!(a.event_name, "CustomerRegistered");
        assert_eq!(a.stream_version, 1);
        assert_eq!(a.causation_id, causation_id);
    }
}
