//! Domain events for the Customer context.

use accounts_core::event::{DomainEvent, EventMeta};
use serde::{Deserialize, Serialize};

use super::values::{ConfirmationHash, CustomerId, EmailAddress, PersonName};

/// Event name for [`CustomerRegistered`].
pub const CUSTOMER_REGISTERED: &str = "CustomerRegistered";
/// Event name for [`CustomerEmailAddressConfirmed`].
pub const CUSTOMER_EMAIL_ADDRESS_CONFIRMED: &str = "CustomerEmailAddressConfirmed";
/// Event name for [`CustomerEmailAddressConfirmationFailed`].
pub const CUSTOMER_EMAIL_ADDRESS_CONFIRMATION_FAILED: &str =
    "CustomerEmailAddressConfirmationFailed";
/// Event name for [`CustomerEmailAddressChanged`].
pub const CUSTOMER_EMAIL_ADDRESS_CHANGED: &str = "CustomerEmailAddressChanged";
/// Event name for [`CustomerDeleted`].
pub const CUSTOMER_DELETED: &str = "CustomerDeleted";

/// Emitted when a customer registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerRegistered {
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// The address registered with, not yet confirmed.
    pub email_address: EmailAddress,
    /// Hash that confirms `email_address`.
    pub confirmation_hash: ConfirmationHash,
    /// The customer's name.
    pub person_name: PersonName,
    /// Event metadata.
    pub meta: EventMeta,
}

/// Emitted when a customer confirms the address on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerEmailAddressConfirmed {
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// The address now confirmed.
    pub email_address: EmailAddress,
    /// Event metadata.
    pub meta: EventMeta,
}

/// Emitted when a confirmation attempt presents the wrong hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerEmailAddressConfirmationFailed {
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// The hash that was presented.
    pub confirmation_hash: ConfirmationHash,
    /// Why the confirmation failed.
    pub reason: String,
    /// Event metadata.
    pub meta: EventMeta,
}

/// Emitted when a customer changes to a different address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerEmailAddressChanged {
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// The new, unconfirmed address.
    pub email_address: EmailAddress,
    /// Hash that confirms the new address.
    pub confirmation_hash: ConfirmationHash,
    /// The address that was on file before.
    pub previous_email_address: EmailAddress,
    /// Event metadata.
    pub meta: EventMeta,
}

/// Emitted when a customer account is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerDeleted {
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// The address on file at deletion.
    pub email_address: EmailAddress,
    /// Event metadata.
    pub meta: EventMeta,
}

/// Every event on a customer stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerEvent {
    /// A customer has registered.
    Registered(CustomerRegistered),
    /// A customer has confirmed their email address.
    EmailAddressConfirmed(CustomerEmailAddressConfirmed),
    /// A confirmation attempt failed.
    EmailAddressConfirmationFailed(CustomerEmailAddressConfirmationFailed),
    /// A customer has changed their email address.
    EmailAddressChanged(CustomerEmailAddressChanged),
    /// A customer account has been deleted.
    Deleted(CustomerDeleted),
}

impl CustomerEvent {
    /// Returns `true` for events that record a rejected request rather than
    /// a state change.
    #[must_use]
    pub fn is_failure_event(&self) -> bool {
        matches!(self, Self::EmailAddressConfirmationFailed(_))
    }
}

impl DomainEvent for CustomerEvent {
    fn event_name(&self) -> &'static str {
        match self {
            Self::Registered(_) => CUSTOMER_REGISTERED,
            Self::EmailAddressConfirmed(_) => CUSTOMER_EMAIL_ADDRESS_CONFIRMED,
            Self::EmailAddressConfirmationFailed(_) => CUSTOMER_EMAIL_ADDRESS_CONFIRMATION_FAILED,
            Self::EmailAddressChanged(_) => CUSTOMER_EMAIL_ADDRESS_CHANGED,
            Self::Deleted(_) => CUSTOMER_DELETED,
        }
    }

    fn meta(&self) -> &EventMeta {
        match self {
            Self::Registered(e) => &e.meta,
            Self::EmailAddressConfirmed(e) => &e.meta,
            Self::EmailAddressConfirmationFailed(e) => &e.meta,
            Self::EmailAddressChanged(e) => &e.meta,
            Self::Deleted(e) => &e.meta,
        }
    }
}
