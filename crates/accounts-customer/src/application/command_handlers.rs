//! Command handler for the Customer context.
//!
//! `CustomerCommandHandler` is the dispatcher the command pipeline drives:
//! inside each attempt's session it loads the customer stream, replays it,
//! runs the business operation the command maps to and appends the recorded
//! events at the replayed version.

use std::sync::Arc;
use std::time::Duration;

use accounts_core::aggregate::{AggregateRoot, replay};
use accounts_core::clock::Clock;
use accounts_core::command::Command;
use accounts_core::error::DomainError;
use accounts_core::pipeline::{CommandDispatcher, CommandPipeline, RetryPolicy};
use accounts_core::repository::{EventStore, EventStoreSession, StoredEvent};
use async_trait::async_trait;
use tracing::info;

use crate::application::codec::{marshal_customer_event, unmarshal_customer_event};
use crate::application::event_store::CustomerEventStore;
use crate::domain::aggregates::Customer;
use crate::domain::commands::CustomerCommand;
use crate::domain::values::CustomerId;

/// Executes customer commands through a retrying pipeline.
#[derive(Clone)]
pub struct CustomerCommandHandler {
    pipeline: CommandPipeline,
    event_store: CustomerEventStore,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CustomerCommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerCommandHandler")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl CustomerCommandHandler {
    /// Creates a handler over `store` with the default retry policy and the
    /// JSON event codec.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(
            CommandPipeline::new(store, RetryPolicy::default()),
            CustomerEventStore::new(marshal_customer_event, unmarshal_customer_event),
            clock,
        )
    }

    /// Creates a handler from explicitly configured parts.
    #[must_use]
    pub fn from_parts(
        pipeline: CommandPipeline,
        event_store: CustomerEventStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pipeline,
            event_store,
            clock,
        }
    }

    /// Bounds every command execution by `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.pipeline = self.pipeline.with_deadline(deadline);
        self
    }

    /// Executes `command`, returning the records it appended. An empty vec
    /// means the command was accepted but changed nothing.
    ///
    /// Not idempotent: submitting the same command twice runs it twice.
    ///
    /// # Errors
    ///
    /// Returns the classified `DomainError` the pipeline produced.
    pub async fn handle(&self, command: &CustomerCommand) -> Result<Vec<StoredEvent>, DomainError> {
        let recorded = self.pipeline.execute(self, command).await?;
        info!(
            command_type = command.command_type(),
            customer_id = %command.customer_id(),
            correlation_id = %command.correlation_id(),
            recorded = recorded.len(),
            "customer command handled"
        );
        Ok(recorded)
    }

    /// Deletes every event of `customer_id`. Administrative; bypasses the
    /// pipeline.
    ///
    /// # Errors
    ///
    /// Returns a `Technical` error on I/O failure.
    pub async fn purge(&self, customer_id: CustomerId) -> Result<(), DomainError> {
        self.event_store
            .purge(self.pipeline.store().as_ref(), customer_id)
            .await
    }
}

#[async_trait]
impl CommandDispatcher for CustomerCommandHandler {
    type Command = CustomerCommand;

    fn known_command_types(&self) -> &'static [&'static str] {
        CustomerCommand::COMMAND_TYPES
    }

    async fn dispatch(
        &self,
        session: &mut dyn EventStoreSession,
        command: &CustomerCommand,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let customer_id = command.customer_id();
        let history = match command {
            CustomerCommand::Register(_) => self.event_store.retrieve(session, customer_id).await?,
            _ => {
                self.event_store
                    .retrieve_for_update(session, customer_id)
                    .await?
            }
        };
        let customer = replay::<Customer>(&history);

        let clock = self.clock.as_ref();
        let recorded = match command {
            CustomerCommand::Register(c) => customer.register(c, clock),
            CustomerCommand::ConfirmEmailAddress(c) => customer.confirm_email_address(c, clock),
            CustomerCommand::ChangeEmailAddress(c) => customer.change_email_address(c, clock),
            CustomerCommand::Delete(c) => customer.delete(c, clock),
        }?;

        self.event_store
            .append(session, customer_id, customer.version(), &recorded)
            .await
    }
}
