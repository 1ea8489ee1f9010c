//! Query handlers for the Customer context.
//!
//! Queries read committed state outside the command pipeline and return
//! read-only views.

use accounts_core::aggregate::replay;
use accounts_core::error::DomainError;
use accounts_core::event::StreamVersion;
use accounts_core::repository::EventStore;
use serde::Serialize;

use crate::application::event_store::CustomerEventStore;
use crate::domain::aggregates::Customer;
use crate::domain::values::{CustomerEmailAddress, CustomerId};

/// Read-only view of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerView {
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// Given (first) name.
    pub given_name: String,
    /// Family (last) name.
    pub family_name: String,
    /// The address on file.
    pub email_address: String,
    /// Whether the address on file has been confirmed.
    pub email_address_confirmed: bool,
    /// Current stream version.
    pub version: StreamVersion,
}

/// Retrieves a customer by id.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the customer was never registered or
/// has been deleted, or a `Technical` error if loading fails.
pub async fn get_customer_by_id(
    customer_id: CustomerId,
    store: &dyn EventStore,
    event_store: &CustomerEventStore,
) -> Result<CustomerView, DomainError> {
    let history = event_store.retrieve_committed(store, customer_id).await?;
    let customer = replay::<Customer>(&history);

    let not_found = || {
        DomainError::NotFound(format!("customer {customer_id}")).context("get_customer_by_id")
    };
    if customer.is_deleted {
        return Err(not_found());
    }
    let (Some(person_name), Some(email)) = (customer.person_name, customer.email_address) else {
        return Err(not_found());
    };

    Ok(CustomerView {
        customer_id,
        given_name: person_name.given_name,
        family_name: person_name.family_name,
        email_address: email.email_address().to_string(),
        email_address_confirmed: matches!(email, CustomerEmailAddress::Confirmed { .. }),
        version: customer.version,
    })
}
