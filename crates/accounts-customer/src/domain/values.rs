//! Value objects for the Customer context.

use std::fmt;

use accounts_core::error::DomainError;
use accounts_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Identity of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Generates a fresh identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identity received from outside.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if `input` is not a UUID or is
    /// the nil UUID.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let id = Uuid::parse_str(input.trim()).map_err(|e| {
            DomainError::InvalidCommand(format!("customer id {input:?} is not a valid UUID: {e}"))
        })?;
        Self::from_uuid(id)
    }

    /// Wraps an existing UUID.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` for the nil UUID.
    pub fn from_uuid(id: Uuid) -> Result<Self, DomainError> {
        if id.is_nil() {
            return Err(DomainError::InvalidCommand(
                "customer id must not be nil".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A syntactically valid email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validates and builds an email address.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if `input` is not shaped like
    /// `local@domain.tld`.
    pub fn build(input: &str) -> Result<Self, DomainError> {
        let candidate = input.trim();
        let invalid =
            || DomainError::InvalidCommand(format!("email address {candidate:?} is invalid"));

        let (local, domain) = candidate.split_once('@').ok_or_else(invalid)?;
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@');
        if local.is_empty() || !domain_ok || candidate.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self(candidate.to_owned()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secret a customer must present to confirm an email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationHash(String);

impl ConfirmationHash {
    /// Derives a new hash for `email_address`, salted from `rng`.
    #[must_use]
    pub fn generate(email_address: &EmailAddress, rng: &mut dyn DeterministicRng) -> Self {
        let salt = rng.next_u64();
        let digest = Sha256::digest(format!("{email_address}:{salt}").as_bytes());
        Self(format!("{digest:x}"))
    }

    /// Parses a hash received from outside.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if `input` is empty.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let candidate = input.trim();
        if candidate.is_empty() {
            return Err(DomainError::InvalidCommand(
                "confirmation hash must not be empty".into(),
            ));
        }
        Ok(Self(candidate.to_owned()))
    }

    /// Returns the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfirmationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A customer's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonName {
    /// Given (first) name.
    pub given_name: String,
    /// Family (last) name.
    pub family_name: String,
}

impl PersonName {
    /// Validates and builds a person name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if either part is blank.
    pub fn build(given_name: &str, family_name: &str) -> Result<Self, DomainError> {
        if given_name.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "given name must not be empty".into(),
            ));
        }
        if family_name.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "family name must not be empty".into(),
            ));
        }
        Ok(Self {
            given_name: given_name.trim().to_owned(),
            family_name: family_name.trim().to_owned(),
        })
    }
}

/// The email address on file, with its confirmation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerEmailAddress {
    /// Awaiting confirmation with the given hash.
    Unconfirmed {
        /// The address.
        email_address: EmailAddress,
        /// The hash that confirms it.
        confirmation_hash: ConfirmationHash,
    },
    /// Confirmed by the customer.
    Confirmed {
        /// The address.
        email_address: EmailAddress,
    },
}

impl CustomerEmailAddress {
    /// Returns the address regardless of confirmation state.
    #[must_use]
    pub fn email_address(&self) -> &EmailAddress {
        match self {
            Self::Unconfirmed { email_address, .. } | Self::Confirmed { email_address } => {
                email_address
            }
        }
    }

    /// Returns `true` once the address has been confirmed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}
