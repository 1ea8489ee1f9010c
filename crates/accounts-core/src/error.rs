//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A command was malformed and never reached business logic.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// A command of a type no dispatcher knows about.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The target aggregate does not exist (or no longer exists).
    #[error("not found: {0}")]
    NotFound(String),

    /// An aggregate with the same identity already exists.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Optimistic concurrency conflict: someone else appended first.
    #[error("concurrency conflict on stream {stream_id}: expected version {expected_version}")]
    ConcurrencyConflict {
        /// The stream that had the conflict.
        stream_id: String,
        /// The version the writer expected the stream to be at.
        expected_version: u64,
    },

    /// The retry bound was exhausted while still seeing conflicts.
    #[error("max retries exceeded after {attempts} attempts: {last_conflict}")]
    MaxRetriesExceeded {
        /// Number of attempts made.
        attempts: u32,
        /// The conflict observed on the final attempt.
        #[source]
        last_conflict: Box<DomainError>,
    },

    /// I/O, transaction or serialization failure.
    #[error("technical error: {0}")]
    Technical(String),

    /// Another error wrapped with the name of the operation that saw it.
    #[error("{operation}: {source}")]
    Context {
        /// Operation name, e.g. `customer_event_store.append`.
        operation: &'static str,
        /// The wrapped error.
        #[source]
        source: Box<DomainError>,
    },
}

/// Classification of a `DomainError`, stable across any amount of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`DomainError::InvalidCommand`].
    InvalidCommand,
    /// See [`DomainError::UnknownCommand`].
    UnknownCommand,
    /// See [`DomainError::NotFound`].
    NotFound,
    /// See [`DomainError::Duplicate`].
    Duplicate,
    /// See [`DomainError::ConcurrencyConflict`].
    ConcurrencyConflict,
    /// See [`DomainError::MaxRetriesExceeded`].
    MaxRetriesExceeded,
    /// See [`DomainError::Technical`].
    Technical,
}

impl DomainError {
    /// Returns the kind of the innermost error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCommand(_) => ErrorKind::InvalidCommand,
            Self::UnknownCommand(_) => ErrorKind::UnknownCommand,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::MaxRetriesExceeded { .. } => ErrorKind::MaxRetriesExceeded,
            Self::Technical(_) => ErrorKind::Technical,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// Wraps this error with the name of an operation.
    #[must_use]
    pub fn context(self, operation: &'static str) -> Self {
        Self::Context {
            operation,
            source: Box::new(self),
        }
    }

    /// Returns `true` if this is (or wraps) a concurrency conflict.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyConflict
    }

    /// Strips all `Context` layers and returns the innermost error.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Adds operation context to `Result<T, DomainError>`.
pub trait ResultExt<T> {
    /// Wraps the error, if any, with `operation`.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in `DomainError::Context`.
    fn context(self, operation: &'static str) -> Result<T, DomainError>;
}

impl<T> ResultExt<T> for Result<T, DomainError> {
    fn context(self, operation: &'static str) -> Result<T, DomainError> {
        self.map_err(|e| e.context(operation))
    }
}
