//! Commands for the Customer context.

use accounts_core::command::Command;
use accounts_core::error::DomainError;
use accounts_core::rng::DeterministicRng;
use uuid::Uuid;

use super::values::{ConfirmationHash, CustomerId, EmailAddress, PersonName};

/// Command to register a new customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCustomer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The identity assigned to the new customer.
    pub customer_id: CustomerId,
    /// The address to register with.
    pub email_address: EmailAddress,
    /// Hash the customer must present to confirm `email_address`.
    pub confirmation_hash: ConfirmationHash,
    /// The customer's name.
    pub person_name: PersonName,
}

impl RegisterCustomer {
    /// Validates raw input and builds the command with a fresh customer id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if any input is malformed.
    pub fn build(
        email_address: &str,
        given_name: &str,
        family_name: &str,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let email_address = EmailAddress::build(email_address)?;
        let person_name = PersonName::build(given_name, family_name)?;
        let confirmation_hash = ConfirmationHash::generate(&email_address, rng);

        Ok(Self {
            correlation_id: Uuid::new_v4(),
            customer_id: CustomerId::generate(),
            email_address,
            confirmation_hash,
            person_name,
        })
    }
}

/// Command to confirm the email address on file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmCustomerEmailAddress {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// The hash presented by the customer.
    pub confirmation_hash: ConfirmationHash,
}

impl ConfirmCustomerEmailAddress {
    /// Validates raw input and builds the command.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if any input is malformed.
    pub fn build(customer_id: &str, confirmation_hash: &str) -> Result<Self, DomainError> {
        Ok(Self {
            correlation_id: Uuid::new_v4(),
            customer_id: CustomerId::parse(customer_id)?,
            confirmation_hash: ConfirmationHash::parse(confirmation_hash)?,
        })
    }
}

/// Command to change the email address on file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeCustomerEmailAddress {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The customer identifier.
    pub customer_id: CustomerId,
    /// The new address.
    pub email_address: EmailAddress,
    /// Hash that will confirm the new address.
    pub confirmation_hash: ConfirmationHash,
}

impl ChangeCustomerEmailAddress {
    /// Validates raw input and builds the command.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if any input is malformed.
    pub fn build(
        customer_id: &str,
        email_address: &str,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let customer_id = CustomerId::parse(customer_id)?;
        let email_address = EmailAddress::build(email_address)?;
        let confirmation_hash = ConfirmationHash::generate(&email_address, rng);

        Ok(Self {
            correlation_id: Uuid::new_v4(),
            customer_id,
            email_address,
            confirmation_hash,
        })
    }
}

/// Command to delete a customer account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCustomer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The customer identifier.
    pub customer_id: CustomerId,
}

impl DeleteCustomer {
    /// Validates raw input and builds the command.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if `customer_id` is malformed.
    pub fn build(customer_id: &str) -> Result<Self, DomainError> {
        Ok(Self {
            correlation_id: Uuid::new_v4(),
            customer_id: CustomerId::parse(customer_id)?,
        })
    }
}

/// Every command the Customer context accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerCommand {
    /// Register a new customer.
    Register(RegisterCustomer),
    /// Confirm the email address on file.
    ConfirmEmailAddress(ConfirmCustomerEmailAddress),
    /// Change the email address on file.
    ChangeEmailAddress(ChangeCustomerEmailAddress),
    /// Delete the customer account.
    Delete(DeleteCustomer),
}

impl CustomerCommand {
    /// Command type of [`CustomerCommand::Register`].
    pub const REGISTER: &'static str = "RegisterCustomer";
    /// Command type of [`CustomerCommand::ConfirmEmailAddress`].
    pub const CONFIRM_EMAIL_ADDRESS: &'static str = "ConfirmCustomerEmailAddress";
    /// Command type of [`CustomerCommand::ChangeEmailAddress`].
    pub const CHANGE_EMAIL_ADDRESS: &'static str = "ChangeCustomerEmailAddress";
    /// Command type of [`CustomerCommand::Delete`].
    pub const DELETE: &'static str = "DeleteCustomer";

    /// Every command type the Customer context recognizes.
    pub const COMMAND_TYPES: &'static [&'static str] = &[
        Self::REGISTER,
        Self::CONFIRM_EMAIL_ADDRESS,
        Self::CHANGE_EMAIL_ADDRESS,
        Self::DELETE,
    ];

    /// Returns the customer this command targets.
    #[must_use]
    pub fn customer_id(&self) -> CustomerId {
        match self {
            Self::Register(c) => c.customer_id,
            Self::ConfirmEmailAddress(c) => c.customer_id,
            Self::ChangeEmailAddress(c) => c.customer_id,
            Self::Delete(c) => c.customer_id,
        }
    }
}

impl Command for CustomerCommand {
    fn command_type(&self) -> &'static str {
        match self {
            Self::Register(_) => Self::REGISTER,
            Self::ConfirmEmailAddress(_) => Self::CONFIRM_EMAIL_ADDRESS,
            Self::ChangeEmailAddress(_) => Self::CHANGE_EMAIL_ADDRESS,
            Self::Delete(_) => Self::DELETE,
        }
    }

    fn correlation_id(&self) -> Uuid {
        match self {
            Self::Register(c) => c.correlation_id,
            Self::ConfirmEmailAddress(c) => c.correlation_id,
            Self::ChangeEmailAddress(c) => c.correlation_id,
            Self::Delete(c) => c.correlation_id,
        }
    }

    fn target_id(&self) -> String {
        self.customer_id().to_string()
    }
}
