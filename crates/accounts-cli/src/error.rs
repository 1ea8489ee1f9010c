//! Customer accounts CLI: error types.

use accounts_core::error::{DomainError, ErrorKind};
use accounts_event_store::StoreConfigError;
use thiserror::Error;

/// Exit code for failures that have no more specific code.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for rejected input (`InvalidCommand`, `UnknownCommand`).
pub const EXIT_INVALID_INPUT: u8 = 2;
/// Exit code for `NotFound`.
pub const EXIT_NOT_FOUND: u8 = 3;
/// Exit code for `Duplicate`.
pub const EXIT_DUPLICATE: u8 = 4;
/// Exit code for contention (`ConcurrencyConflict`, `MaxRetriesExceeded`).
pub const EXIT_CONFLICT: u8 = 5;
/// Exit code for missing or invalid configuration.
pub const EXIT_CONFIG: u8 = 78;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store configuration, connection or migration failed.
    #[error(transparent)]
    Store(#[from] StoreConfigError),

    /// A command or query failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Writing the result failed.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// Maps the error to the process exit code.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Store(StoreConfigError::Config(_)) => EXIT_CONFIG,
            Self::Store(_) | Self::Output(_) => EXIT_FAILURE,
            Self::Domain(err) => match err.kind() {
                ErrorKind::InvalidCommand | ErrorKind::UnknownCommand => EXIT_INVALID_INPUT,
                ErrorKind::NotFound => EXIT_NOT_FOUND,
                ErrorKind::Duplicate => EXIT_DUPLICATE,
                ErrorKind::ConcurrencyConflict | ErrorKind::MaxRetriesExceeded => EXIT_CONFLICT,
                ErrorKind::Technical => EXIT_FAILURE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(err: DomainError) -> u8 {
        AppError::from(err).exit_code()
    }

    #[test]
    fn test_invalid_command_maps_to_invalid_input() {
        assert_eq!(
            code_of(DomainError::InvalidCommand("bad email".into())),
            EXIT_INVALID_INPUT
        );
        assert_eq!(
            code_of(DomainError::UnknownCommand("[X] command is unknown".into())),
            EXIT_INVALID_INPUT
        );
    }

    #[test]
    fn test_not_found_maps_through_context() {
        assert_eq!(
            code_of(DomainError::NotFound("customer 1".into()).context("ChangeCustomerEmailAddress")),
            EXIT_NOT_FOUND
        );
    }

    #[test]
    fn test_duplicate_maps_to_duplicate() {
        assert_eq!(
            code_of(DomainError::Duplicate("customer 1".into())),
            EXIT_DUPLICATE
        );
    }

    #[test]
    fn test_contention_maps_to_conflict() {
        let conflict = DomainError::ConcurrencyConflict {
            stream_id: "customer-1".into(),
            expected_version: 1,
        };
        assert_eq!(
            code_of(DomainError::MaxRetriesExceeded {
                attempts: 10,
                last_conflict: Box::new(conflict),
            }),
            EXIT_CONFLICT
        );
    }

    #[test]
    fn test_technical_maps_to_failure() {
        assert_eq!(
            code_of(DomainError::Technical("db down".into())),
            EXIT_FAILURE
        );
    }

    #[test]
    fn test_missing_configuration_maps_to_config() {
        let err = AppError::from(StoreConfigError::Config("DATABASE_URL must be set".into()));

        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }
}
