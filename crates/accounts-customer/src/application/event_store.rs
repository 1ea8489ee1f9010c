//! Customer stream adapter over the generic event store.

use accounts_core::error::{DomainError, ResultExt};
use accounts_core::event::{StreamId, StreamVersion};
use accounts_core::repository::{
    EventStore, EventStoreSession, MAX_STREAM_VERSION, MarshalDomainEvent, StoredEvent,
    UnmarshalDomainEvent,
};

use crate::domain::events::CustomerEvent;
use crate::domain::values::CustomerId;

const STREAM_PREFIX: &str = "customer";

/// Reads and writes customer streams, encoding events with the injected
/// codec functions.
#[derive(Debug, Clone, Copy)]
pub struct CustomerEventStore {
    marshal: MarshalDomainEvent<CustomerEvent>,
    unmarshal: UnmarshalDomainEvent<CustomerEvent>,
}

impl CustomerEventStore {
    /// Creates an adapter using the given codec.
    #[must_use]
    pub fn new(
        marshal: MarshalDomainEvent<CustomerEvent>,
        unmarshal: UnmarshalDomainEvent<CustomerEvent>,
    ) -> Self {
        Self { marshal, unmarshal }
    }

    /// Returns the stream holding `customer_id`'s events.
    #[must_use]
    pub fn stream_id(customer_id: CustomerId) -> StreamId {
        StreamId::new(format!("{STREAM_PREFIX}-{customer_id}"))
    }

    /// Loads a customer that must already exist, inside `session`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the stream is empty, or a
    /// `Technical` error if reading or decoding fails.
    pub async fn retrieve_for_update(
        &self,
        session: &mut dyn EventStoreSession,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        let events = self
            .retrieve(session, customer_id)
            .await
            .context("customer_event_store.retrieve_for_update")?;
        if events.is_empty() {
            return Err(DomainError::NotFound(format!("customer {customer_id}"))
                .context("customer_event_store.retrieve_for_update"));
        }
        Ok(events)
    }

    /// Loads a customer stream inside `session`. A stream that does not exist
    /// yields an empty vec.
    ///
    /// # Errors
    ///
    /// Returns a `Technical` error if reading or decoding fails.
    pub async fn retrieve(
        &self,
        session: &mut dyn EventStoreSession,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        let stored = session
            .retrieve_event_stream(&Self::stream_id(customer_id), 1, MAX_STREAM_VERSION)
            .await
            .context("customer_event_store.retrieve")?;
        self.decode_all(&stored)
    }

    /// Loads a customer stream from committed state, outside any command.
    ///
    /// # Errors
    ///
    /// Returns a `Technical` error if reading or decoding fails.
    pub async fn retrieve_committed(
        &self,
        store: &dyn EventStore,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        let stored = store
            .retrieve_event_stream(&Self::stream_id(customer_id), 1, MAX_STREAM_VERSION)
            .await
            .context("customer_event_store.retrieve_committed")?;
        self.decode_all(&stored)
    }

    /// Encodes `events` and appends them after `expected_version`, returning
    /// the appended records.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyConflict` if another writer advanced the stream,
    /// or a `Technical` error if encoding or writing fails.
    pub async fn append(
        &self,
        session: &mut dyn EventStoreSession,
        customer_id: CustomerId,
        expected_version: StreamVersion,
        events: &[CustomerEvent],
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let stored = events
            .iter()
            .map(self.marshal)
            .collect::<Result<Vec<_>, _>>()
            .context("customer_event_store.append")?;
        session
            .append_to_event_stream(&Self::stream_id(customer_id), expected_version, &stored)
            .await
            .context("customer_event_store.append")?;
        Ok(stored)
    }

    /// Deletes every event of `customer_id`.
    ///
    /// # Errors
    ///
    /// Returns a `Technical` error on I/O failure.
    pub async fn purge(
        &self,
        store: &dyn EventStore,
        customer_id: CustomerId,
    ) -> Result<(), DomainError> {
        store
            .purge_event_stream(&Self::stream_id(customer_id))
            .await
            .context("customer_event_store.purge")
    }

    fn decode_all(&self, stored: &[StoredEvent]) -> Result<Vec<CustomerEvent>, DomainError> {
        stored
            .iter()
            .map(self.unmarshal)
            .collect::<Result<Vec<_>, _>>()
            .context("customer_event_store.decode")
    }
}

#[cfg(test)]
mod tests {
    use accounts_core::error::ErrorKind;
    use accounts_core::event::DomainEvent;
    use accounts_test_support::{FixedClock, InMemoryEventStore, SequenceRng};
    use chrono::Utc;

    use super::*;
    use crate::application::codec::{marshal_customer_event, unmarshal_customer_event};
    use crate::domain::aggregates::Customer;
    use crate::domain::commands::RegisterCustomer;

    fn adapter() -> CustomerEventStore {
        CustomerEventStore::new(marshal_customer_event, unmarshal_customer_event)
    }

    fn registered_event() -> (CustomerId, Vec<CustomerEvent>) {
        let mut rng = SequenceRng::new(vec![3]);
        let command =
            RegisterCustomer::build("kevin@ball.com", "Kevin", "Ball", &mut rng).unwrap();
        let events = Customer::default()
            .register(&command, &FixedClock(Utc::now()))
            .unwrap();
        (command.customer_id, events)
    }

    #[test]
    fn test_stream_id_is_prefixed_with_aggregate_kind() {
        let customer_id = CustomerId::generate();

        let stream_id = CustomerEventStore::stream_id(customer_id);

        assert_eq!(stream_id.as_str(), format!("customer-{customer_id}"));
    }

    #[tokio::test]
    async fn test_append_then_retrieve_committed_decodes_events() {
        // Arrange
        let store = InMemoryEventStore::new();
        let (customer_id, events) = registered_event();
        let mut session = store.begin().await.unwrap();

        // Act
        let stored = adapter()
            .append(session.as_mut(), customer_id, 0, &events)
            .await
            .unwrap();
        session.commit().await.unwrap();
        let loaded = adapter()
            .retrieve_committed(&store, customer_id)
            .await
            .unwrap();

        // Assert
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event_name, events[0].event_name());
        assert_eq!(loaded, events);
        assert_eq!(
            store.events(&CustomerEventStore::stream_id(customer_id)),
            stored
        );
    }

    #[tokio::test]
    async fn test_retrieve_for_update_on_empty_stream_is_not_found() {
        let store = InMemoryEventStore::new();
        let mut session = store.begin().await.unwrap();

        let err = adapter()
            .retrieve_for_update(session.as_mut(), CustomerId::generate())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("customer_event_store.retrieve_for_update"));
    }

    #[tokio::test]
    async fn test_retrieve_allows_empty_stream() {
        let store = InMemoryEventStore::new();
        let mut session = store.begin().await.unwrap();

        let events = adapter()
            .retrieve(session.as_mut(), CustomerId::generate())
            .await
            .unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_the_stream() {
        // Arrange
        let store = InMemoryEventStore::new();
        let (customer_id, events) = registered_event();
        let mut session = store.begin().await.unwrap();
        adapter()
            .append(session.as_mut(), customer_id, 0, &events)
            .await
            .unwrap();
        session.commit().await.unwrap();

        // Act
        adapter().purge(&store, customer_id).await.unwrap();

        // Assert
        let loaded = adapter()
            .retrieve_committed(&store, customer_id)
            .await
            .unwrap();
        assert!(loaded.is_empty());
    }
}
