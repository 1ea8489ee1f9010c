//! Aggregate roots for the Customer context.
//!
//! `Customer` is rebuilt from its stream by [`accounts_core::aggregate::replay`].
//! Each business operation reads the current state and returns the events it
//! decided to record; it never mutates state itself.

use accounts_core::aggregate::AggregateRoot;
use accounts_core::clock::Clock;
use accounts_core::error::DomainError;
use accounts_core::event::{EventMeta, StreamVersion};

use super::commands::{
    ChangeCustomerEmailAddress, ConfirmCustomerEmailAddress, DeleteCustomer, RegisterCustomer,
};
use super::events::{
    CUSTOMER_DELETED, CUSTOMER_EMAIL_ADDRESS_CHANGED, CUSTOMER_EMAIL_ADDRESS_CONFIRMATION_FAILED,
    CUSTOMER_EMAIL_ADDRESS_CONFIRMED, CUSTOMER_REGISTERED, CustomerDeleted,
    CustomerEmailAddressChanged, CustomerEmailAddressConfirmationFailed,
    CustomerEmailAddressConfirmed, CustomerEvent, CustomerRegistered,
};
use super::values::{CustomerEmailAddress, CustomerId, PersonName};

/// Reason recorded when a confirmation hash does not match.
pub const CONFIRMATION_HASH_MISMATCH: &str = "confirmation hash does not match";

/// The aggregate root for a customer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Aggregate identifier, set by registration.
    pub id: Option<CustomerId>,
    /// The customer's name.
    pub person_name: Option<PersonName>,
    /// The address on file.
    pub email_address: Option<CustomerEmailAddress>,
    /// Whether the account has been deleted.
    pub is_deleted: bool,
    /// Current version (last applied stream version).
    pub version: StreamVersion,
}

impl Customer {
    /// Returns `true` once a registration has been applied.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.id.is_some()
    }

    /// Decides the outcome of a registration.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Duplicate` if the stream already holds a
    /// customer.
    pub fn register(
        &self,
        command: &RegisterCustomer,
        clock: &dyn Clock,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        if self.version > 0 {
            return Err(DomainError::Duplicate(format!(
                "customer {} is already registered",
                command.customer_id
            )));
        }

        Ok(vec![CustomerEvent::Registered(CustomerRegistered {
            customer_id: command.customer_id,
            email_address: command.email_address.clone(),
            confirmation_hash: command.confirmation_hash.clone(),
            person_name: command.person_name.clone(),
            meta: self.next_meta(
                command.customer_id,
                CUSTOMER_REGISTERED,
                command.correlation_id,
                clock,
            ),
        })])
    }

    /// Decides the outcome of a confirmation attempt.
    ///
    /// Confirming an address that is already confirmed records nothing. A
    /// wrong hash is recorded as a failure event and leaves the address
    /// unconfirmed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the customer was never registered or
    /// has been deleted.
    pub fn confirm_email_address(
        &self,
        command: &ConfirmCustomerEmailAddress,
        clock: &dyn Clock,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        let current = self.live_email_address(command.customer_id)?;

        let CustomerEmailAddress::Unconfirmed {
            email_address,
            confirmation_hash,
        } = current
        else {
            return Ok(Vec::new());
        };

        if *confirmation_hash != command.confirmation_hash {
            return Ok(vec![CustomerEvent::EmailAddressConfirmationFailed(
                CustomerEmailAddressConfirmationFailed {
                    customer_id: command.customer_id,
                    confirmation_hash: command.confirmation_hash.clone(),
                    reason: CONFIRMATION_HASH_MISMATCH.to_owned(),
                    meta: self.next_meta(
                        command.customer_id,
                        CUSTOMER_EMAIL_ADDRESS_CONFIRMATION_FAILED,
                        command.correlation_id,
                        clock,
                    ),
                },
            )]);
        }

        Ok(vec![CustomerEvent::EmailAddressConfirmed(
            CustomerEmailAddressConfirmed {
                customer_id: command.customer_id,
                email_address: email_address.clone(),
                meta: self.next_meta(
                    command.customer_id,
                    CUSTOMER_EMAIL_ADDRESS_CONFIRMED,
                    command.correlation_id,
                    clock,
                ),
            },
        )])
    }

    /// Decides the outcome of an email change. Changing to the address
    /// already on file records nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the customer was never registered or
    /// has been deleted.
    pub fn change_email_address(
        &self,
        command: &ChangeCustomerEmailAddress,
        clock: &dyn Clock,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        let current = self.live_email_address(command.customer_id)?;
        if *current.email_address() == command.email_address {
            return Ok(Vec::new());
        }

        Ok(vec![CustomerEvent::EmailAddressChanged(
            CustomerEmailAddressChanged {
                customer_id: command.customer_id,
                email_address: command.email_address.clone(),
                confirmation_hash: command.confirmation_hash.clone(),
                previous_email_address: current.email_address().clone(),
                meta: self.next_meta(
                    command.customer_id,
                    CUSTOMER_EMAIL_ADDRESS_CHANGED,
                    command.correlation_id,
                    clock,
                ),
            },
        )])
    }

    /// Decides the outcome of a deletion.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the customer was never registered or
    /// has already been deleted.
    pub fn delete(
        &self,
        command: &DeleteCustomer,
        clock: &dyn Clock,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        let current = self.live_email_address(command.customer_id)?;

        Ok(vec![CustomerEvent::Deleted(CustomerDeleted {
            customer_id: command.customer_id,
            email_address: current.email_address().clone(),
            meta: self.next_meta(
                command.customer_id,
                CUSTOMER_DELETED,
                command.correlation_id,
                clock,
            ),
        })])
    }

    fn live_email_address(
        &self,
        customer_id: CustomerId,
    ) -> Result<&CustomerEmailAddress, DomainError> {
        match &self.email_address {
            Some(email_address) if !self.is_deleted => Ok(email_address),
            _ => Err(DomainError::NotFound(format!("customer {customer_id}"))),
        }
    }

    fn next_meta(
        &self,
        customer_id: CustomerId,
        event_name: &'static str,
        causation_id: uuid::Uuid,
        clock: &dyn Clock,
    ) -> EventMeta {
        EventMeta::record(
            customer_id.to_string(),
            event_name,
            clock.now(),
            self.version + 1,
            causation_id,
        )
    }
}

impl AggregateRoot for Customer {
    type Event = CustomerEvent;

    fn version(&self) -> StreamVersion {
        self.version
    }

    fn apply(&mut self, event: &CustomerEvent) {
        match event {
            CustomerEvent::Registered(e) => {
                self.id = Some(e.customer_id);
                self.person_name = Some(e.person_name.clone());
                self.email_address = Some(CustomerEmailAddress::Unconfirmed {
                    email_address: e.email_address.clone(),
                    confirmation_hash: e.confirmation_hash.clone(),
                });
                self.version = e.meta.stream_version;
            }
            CustomerEvent::EmailAddressConfirmed(e) => {
                self.email_address = Some(CustomerEmailAddress::Confirmed {
                    email_address: e.email_address.clone(),
                });
                self.version = e.meta.stream_version;
            }
            CustomerEvent::EmailAddressConfirmationFailed(e) => {
                self.version = e.meta.stream_version;
            }
            CustomerEvent::EmailAddressChanged(e) => {
                self.email_address = Some(CustomerEmailAddress::Unconfirmed {
                    email_address: e.email_address.clone(),
                    confirmation_hash: e.confirmation_hash.clone(),
                });
                self.version = e.meta.stream_version;
            }
            CustomerEvent::Deleted(e) => {
                self.is_deleted = true;
                self.version = e.meta.stream_version;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use accounts_core::aggregate::replay;
    use accounts_core::error::ErrorKind;
    use accounts_core::event::DomainEvent;
    use accounts_test_support::{FixedClock, SequenceRng};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn registered() -> (Customer, RegisterCustomer) {
        let mut rng = SequenceRng::new(vec![7]);
        let command =
            RegisterCustomer::build("kevin@ball.com", "Kevin", "Ball", &mut rng).unwrap();
        let events = Customer::default().register(&command, &clock()).unwrap();
        (replay::<Customer>(&events), command)
    }

    fn change_to(customer_id: CustomerId, email: &str) -> ChangeCustomerEmailAddress {
        let mut rng = SequenceRng::new(vec![9]);
        ChangeCustomerEmailAddress::build(&customer_id.to_string(), email, &mut rng).unwrap()
    }

    #[test]
    fn test_register_records_customer_registered_at_version_one() {
        // Arrange
        let mut rng = SequenceRng::new(vec![7]);
        let command =
            RegisterCustomer::build("kevin@ball.com", "Kevin", "Ball", &mut rng).unwrap();

        // Act
        let events = Customer::default().register(&command, &clock()).unwrap();

        // Assert
        assert_eq!(events.len(), 1);
        match &events[0] {
            CustomerEvent::Registered(e) => {
                assert_eq!(e.customer_id, command.customer_id);
                assert_eq!(e.meta.stream_version, 1);
                assert_eq!(e.meta.event_name, CUSTOMER_REGISTERED);
                assert_eq!(e.meta.identifier, command.customer_id.to_string());
                assert_eq!(e.meta.causation_id, command.correlation_id);
                assert_eq!(e.meta.occurred_at, clock().0);
            }
            other => panic!("expected Registered, got {other:?}"),
        }
    }

    #[test]
    fn test_register_twice_is_duplicate() {
        let (customer, command) = registered();

        let err = customer.register(&command, &clock()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_confirm_with_matching_hash_confirms() {
        // Arrange
        let (customer, register) = registered();
        let command = ConfirmCustomerEmailAddress::build(
            &register.customer_id.to_string(),
            register.confirmation_hash.as_str(),
        )
        .unwrap();

        // Act
        let events = customer.confirm_email_address(&command, &clock()).unwrap();

        // Assert
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name(), CUSTOMER_EMAIL_ADDRESS_CONFIRMED);
        assert_eq!(events[0].stream_version(), 2);
    }

    #[test]
    fn test_confirm_with_wrong_hash_records_failure_without_confirming() {
        // Arrange
        let (mut customer, register) = registered();
        let command =
            ConfirmCustomerEmailAddress::build(&register.customer_id.to_string(), "wrong")
                .unwrap();

        // Act
        let events = customer.confirm_email_address(&command, &clock()).unwrap();
        customer.apply(&events[0]);

        // Assert
        assert!(events[0].is_failure_event());
        assert_eq!(customer.version, 2);
        assert!(!customer.email_address.as_ref().unwrap().is_confirmed());
    }

    #[test]
    fn test_confirm_when_already_confirmed_records_nothing() {
        let (mut customer, register) = registered();
        let command = ConfirmCustomerEmailAddress::build(
            &register.customer_id.to_string(),
            register.confirmation_hash.as_str(),
        )
        .unwrap();
        let events = customer.confirm_email_address(&command, &clock()).unwrap();
        customer.apply(&events[0]);

        let again = customer.confirm_email_address(&command, &clock()).unwrap();

        assert!(again.is_empty());
    }

    #[test]
    fn test_change_to_same_address_records_nothing() {
        let (customer, register) = registered();

        let events = customer
            .change_email_address(&change_to(register.customer_id, "kevin@ball.com"), &clock())
            .unwrap();

        assert!(events.is_empty());
    }

    #[test]
    fn test_change_to_new_address_records_previous_address() {
        // Arrange
        let (customer, register) = registered();

        // Act
        let events = customer
            .change_email_address(&change_to(register.customer_id, "kevin@new.com"), &clock())
            .unwrap();

        // Assert
        match &events[..] {
            [CustomerEvent::EmailAddressChanged(e)] => {
                assert_eq!(e.email_address.as_str(), "kevin@new.com");
                assert_eq!(e.previous_email_address.as_str(), "kevin@ball.com");
                assert_eq!(e.meta.stream_version, 2);
            }
            other => panic!("expected one EmailAddressChanged, got {other:?}"),
        }
    }

    #[test]
    fn test_operations_on_unknown_customer_are_not_found() {
        let customer = Customer::default();
        let id = CustomerId::generate();

        let change = customer.change_email_address(&change_to(id, "a@b.com"), &clock());
        let delete = customer.delete(&DeleteCustomer::build(&id.to_string()).unwrap(), &clock());

        assert_eq!(change.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(delete.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_deleted_customer_is_not_found() {
        // Arrange
        let (mut customer, register) = registered();
        let delete = DeleteCustomer::build(&register.customer_id.to_string()).unwrap();
        let events = customer.delete(&delete, &clock()).unwrap();
        customer.apply(&events[0]);

        // Act
        let again = customer.delete(&delete, &clock());
        let change =
            customer.change_email_address(&change_to(register.customer_id, "a@b.com"), &clock());

        // Assert
        assert!(customer.is_deleted);
        assert_eq!(again.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(change.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_replay_is_deterministic() {
        // Arrange
        let (customer, register) = registered();
        let mut history = Customer::default().register(&register, &clock()).unwrap();
        history.extend(
            customer
                .change_email_address(&change_to(register.customer_id, "kevin@new.com"), &clock())
                .unwrap(),
        );

        // Act
        let first = replay::<Customer>(&history);
        let second = replay::<Customer>(&history);

        // Assert
        assert_eq!(first, second);
        assert_eq!(first.version, 2);
        assert_eq!(
            first.email_address.unwrap().email_address().as_str(),
            "kevin@new.com"
        );
    }
}
