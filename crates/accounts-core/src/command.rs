//! Command abstractions.

use uuid::Uuid;

use crate::error::DomainError;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// Identity of the aggregate this command targets.
    fn target_id(&self) -> String;

    /// Checks that the command is well formed before any transaction is
    /// opened.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCommand` if the target identity is empty.
    fn validate(&self) -> Result<(), DomainError> {
        if self.target_id().trim().is_empty() {
            return Err(DomainError::InvalidCommand(format!(
                "[{}]: command was not properly created",
                self.command_type()
            )));
        }
        Ok(())
    }
}
