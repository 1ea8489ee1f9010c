//! JSON codec between `CustomerEvent` and `StoredEvent`.
//!
//! The record's `event_name` selects the payload type; the payload carries
//! the full event, metadata included, so nanosecond timestamps survive a
//! store that truncates `occurred_at`.

use accounts_core::error::DomainError;
use accounts_core::event::DomainEvent;
use accounts_core::repository::StoredEvent;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::events::{
    CUSTOMER_DELETED, CUSTOMER_EMAIL_ADDRESS_CHANGED, CUSTOMER_EMAIL_ADDRESS_CONFIRMATION_FAILED,
    CUSTOMER_EMAIL_ADDRESS_CONFIRMED, CUSTOMER_REGISTERED, CustomerEvent,
};

fn encode<T: Serialize>(event_name: &str, body: &T) -> Result<Vec<u8>, DomainError> {
    serde_json::to_vec(body)
        .map_err(|e| DomainError::Technical(format!("{event_name} serialization failed: {e}")))
}

fn decode<T: DeserializeOwned>(stored: &StoredEvent) -> Result<T, DomainError> {
    serde_json::from_slice(&stored.payload).map_err(|e| {
        DomainError::Technical(format!(
            "{} deserialization failed: {e}",
            stored.event_name
        ))
    })
}

/// Encodes a customer event into a store record.
///
/// # Errors
///
/// Returns `DomainError::Technical` if serialization fails.
pub fn marshal_customer_event(event: &CustomerEvent) -> Result<StoredEvent, DomainError> {
    let event_name = event.event_name();
    let payload = match event {
        CustomerEvent::Registered(e) => encode(event_name, e)?,
        CustomerEvent::EmailAddressConfirmed(e) => encode(event_name, e)?,
        CustomerEvent::EmailAddressConfirmationFailed(e) => encode(event_name, e)?,
        CustomerEvent::EmailAddressChanged(e) => encode(event_name, e)?,
        CustomerEvent::Deleted(e) => encode(event_name, e)?,
    };
    let meta = event.meta();

    Ok(StoredEvent {
        event_id: meta.message_id,
        event_name: event_name.to_owned(),
        payload,
        occurred_at: meta.occurred_at,
        stream_version: meta.stream_version,
    })
}

/// Decodes a store record into a customer event.
///
/// # Errors
///
/// Returns `DomainError::Technical` for an unknown event name, a malformed
/// payload, or a payload whose version disagrees with the record.
pub fn unmarshal_customer_event(stored: &StoredEvent) -> Result<CustomerEvent, DomainError> {
    let event = match stored.event_name.as_str() {
        CUSTOMER_REGISTERED => CustomerEvent::Registered(decode(stored)?),
        CUSTOMER_EMAIL_ADDRESS_CONFIRMED => CustomerEvent::EmailAddressConfirmed(decode(stored)?),
        CUSTOMER_EMAIL_ADDRESS_CONFIRMATION_FAILED => {
            CustomerEvent::EmailAddressConfirmationFailed(decode(stored)?)
        }
        CUSTOMER_EMAIL_ADDRESS_CHANGED => CustomerEvent::EmailAddressChanged(decode(stored)?),
        CUSTOMER_DELETED => CustomerEvent::Deleted(decode(stored)?),
        unknown => {
            return Err(DomainError::Technical(format!(
                "unknown customer event name {unknown:?}"
            )));
        }
    };

    if event.stream_version() != stored.stream_version {
        return Err(DomainError::Technical(format!(
            "{} payload carries version {} but is stored at {}",
            stored.event_name,
            event.stream_version(),
            stored.stream_version
        )));
    }
    if event.meta().event_name != stored.event_name {
        return Err(DomainError::Technical(format!(
            "payload names {} but is stored as {}",
            event.meta().event_name,
            stored.event_name
        )));
    }

    Ok(event)
}
