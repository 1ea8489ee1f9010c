//! Executes parsed CLI commands against an event store.

use std::sync::Arc;
use std::time::Duration;

use accounts_core::clock::Clock;
use accounts_core::event::StreamVersion;
use accounts_core::pipeline::{CommandPipeline, RetryPolicy};
use accounts_core::repository::{EventStore, StoredEvent};
use accounts_core::rng::DeterministicRng;
use accounts_customer::application::codec::{marshal_customer_event, unmarshal_customer_event};
use accounts_customer::application::command_handlers::CustomerCommandHandler;
use accounts_customer::application::event_store::CustomerEventStore;
use accounts_customer::application::query_handlers::{CustomerView, get_customer_by_id};
use accounts_customer::domain::commands::{
    ChangeCustomerEmailAddress, ConfirmCustomerEmailAddress, CustomerCommand, DeleteCustomer,
    RegisterCustomer,
};
use accounts_customer::domain::values::CustomerId;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::Commands;
use crate::error::AppError;

/// Summary of one appended event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedEvent {
    /// Event identifier.
    pub event_id: Uuid,
    /// Event name.
    pub event_name: String,
    /// Position in the stream.
    pub stream_version: StreamVersion,
}

impl From<&StoredEvent> for RecordedEvent {
    fn from(stored: &StoredEvent) -> Self {
        Self {
            event_id: stored.event_id,
            event_name: stored.event_name.clone(),
            stream_version: stored.stream_version,
        }
    }
}

/// What a CLI command printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Output {
    /// A command ran; `events` may be empty.
    Recorded {
        /// The targeted customer.
        customer_id: CustomerId,
        /// Hash issued for a new, unconfirmed address.
        #[serde(skip_serializing_if = "Option::is_none")]
        confirmation_hash: Option<String>,
        /// Events the command appended.
        events: Vec<RecordedEvent>,
    },
    /// Current state of a customer.
    Customer(CustomerView),
    /// A stream was purged.
    Purged {
        /// The purged customer.
        customer_id: CustomerId,
    },
}

/// Wires the customer handler and query side to one event store.
pub struct App {
    store: Arc<dyn EventStore>,
    handler: CustomerCommandHandler,
    event_store: CustomerEventStore,
    rng: Box<dyn DeterministicRng>,
}

impl App {
    /// Creates the application over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
        policy: RetryPolicy,
        deadline: Option<Duration>,
    ) -> Self {
        let event_store = CustomerEventStore::new(marshal_customer_event, unmarshal_customer_event);
        let mut pipeline = CommandPipeline::new(Arc::clone(&store), policy);
        if let Some(deadline) = deadline {
            pipeline = pipeline.with_deadline(deadline);
        }

        Self {
            store,
            handler: CustomerCommandHandler::from_parts(pipeline, event_store, clock),
            event_store,
            rng,
        }
    }

    /// Runs one CLI command.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Domain` with the classified failure.
    pub async fn execute(&mut self, command: Commands) -> Result<Output, AppError> {
        match command {
            Commands::Register {
                email,
                given_name,
                family_name,
            } => {
                let register =
                    RegisterCustomer::build(&email, &given_name, &family_name, self.rng.as_mut())?;
                let hash = register.confirmation_hash.to_string();
                self.submit(CustomerCommand::Register(register), Some(hash))
                    .await
            }
            Commands::ConfirmEmail { customer_id, hash } => {
                let confirm = ConfirmCustomerEmailAddress::build(&customer_id, &hash)?;
                self.submit(CustomerCommand::ConfirmEmailAddress(confirm), None)
                    .await
            }
            Commands::ChangeEmail { customer_id, email } => {
                let change =
                    ChangeCustomerEmailAddress::build(&customer_id, &email, self.rng.as_mut())?;
                let hash = change.confirmation_hash.to_string();
                self.submit(CustomerCommand::ChangeEmailAddress(change), Some(hash))
                    .await
            }
            Commands::Delete { customer_id } => {
                let delete = DeleteCustomer::build(&customer_id)?;
                self.submit(CustomerCommand::Delete(delete), None).await
            }
            Commands::Show { customer_id } => {
                let customer_id = CustomerId::parse(&customer_id)?;
                let view =
                    get_customer_by_id(customer_id, self.store.as_ref(), &self.event_store).await?;
                Ok(Output::Customer(view))
            }
            Commands::Purge { customer_id } => {
                let customer_id = CustomerId::parse(&customer_id)?;
                self.handler.purge(customer_id).await?;
                Ok(Output::Purged { customer_id })
            }
        }
    }

    async fn submit(
        &self,
        command: CustomerCommand,
        issued_hash: Option<String>,
    ) -> Result<Output, AppError> {
        let recorded = self.handler.handle(&command).await?;
        // A hash only matters if the command recorded the address it confirms.
        let confirmation_hash = issued_hash.filter(|_| !recorded.is_empty());

        Ok(Output::Recorded {
            customer_id: command.customer_id(),
            confirmation_hash,
            events: recorded.iter().map(RecordedEvent::from).collect(),
        })
    }
}
