//! Retrying transactional command pipeline.
//!
//! Each attempt opens a session, lets the dispatcher load, replay, decide and
//! append inside it, and commits. Attempts that end in a concurrency conflict
//! are retried up to the policy's bound; every other failure is returned
//! immediately. The retry decision itself is a pure function
//! ([`RetryPolicy::decide`]) so it can be tested without any store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{DomainError, ErrorKind, ResultExt};
use crate::repository::{EventStore, EventStoreSession, StoredEvent};

/// Default number of attempts before giving up on a contended stream.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Result of a single attempt, classified for the retry decision.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// The attempt committed.
    Committed(T),
    /// Another writer got there first; the attempt was rolled back.
    Conflicted(DomainError),
    /// Any other failure.
    Failed(DomainError),
}

impl<T> AttemptOutcome<T> {
    /// Classifies the result of an attempt by error kind.
    #[must_use]
    pub fn classify(result: Result<T, DomainError>) -> Self {
        match result {
            Ok(value) => Self::Committed(value),
            Err(err) if err.kind() == ErrorKind::ConcurrencyConflict => Self::Conflicted(err),
            Err(err) => Self::Failed(err),
        }
    }
}

/// What the pipeline does after an attempt.
#[derive(Debug)]
pub enum RetryDecision<T> {
    /// Run another attempt.
    Retry,
    /// Stop and hand this result to the caller.
    Return(Result<T, DomainError>),
}

/// Bounded retry policy for concurrency conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` attempts (at least one).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns the attempt bound.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what to do after attempt number `attempt` (1-based).
    #[must_use]
    pub fn decide<T>(&self, attempt: u32, outcome: AttemptOutcome<T>) -> RetryDecision<T> {
        match outcome {
            AttemptOutcome::Committed(value) => RetryDecision::Return(Ok(value)),
            AttemptOutcome::Failed(err) => RetryDecision::Return(Err(err)),
            AttemptOutcome::Conflicted(err) if attempt >= self.max_attempts => {
                RetryDecision::Return(Err(DomainError::MaxRetriesExceeded {
                    attempts: attempt,
                    last_conflict: Box::new(err),
                }))
            }
            AttemptOutcome::Conflicted(_) => RetryDecision::Retry,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Maps each known command to exactly one aggregate operation.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// The closed set of commands this dispatcher handles.
    type Command: Command;

    /// Command types this dispatcher recognizes.
    fn known_command_types(&self) -> &'static [&'static str];

    /// Loads the target stream, replays it, runs the business operation and
    /// appends the recorded events, all through `session`. Returns the
    /// appended records.
    ///
    /// Must not perform I/O other than through `session`: it is re-run on
    /// every retry.
    ///
    /// # Errors
    ///
    /// Returns whatever classified `DomainError` the operation produced.
    async fn dispatch(
        &self,
        session: &mut dyn EventStoreSession,
        command: &Self::Command,
    ) -> Result<Vec<StoredEvent>, DomainError>;
}

/// Executes commands transactionally with bounded conflict retries.
#[derive(Clone)]
pub struct CommandPipeline {
    store: Arc<dyn EventStore>,
    policy: RetryPolicy,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for CommandPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPipeline")
            .field("policy", &self.policy)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl CommandPipeline {
    /// Creates a pipeline over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            deadline: None,
        }
    }

    /// Bounds every execution by `deadline` of wall-clock time.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the store this pipeline writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Validates, classifies and executes `command`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` or `UnknownCommand` without opening a
    /// transaction; `MaxRetriesExceeded` when every attempt conflicted;
    /// `Technical` when the deadline expires; otherwise the first
    /// non-conflict error an attempt produced.
    pub async fn execute<D>(
        &self,
        dispatcher: &D,
        command: &D::Command,
    ) -> Result<Vec<StoredEvent>, DomainError>
    where
        D: CommandDispatcher + ?Sized,
    {
        let command_type = command.command_type();
        command.validate().context(command_type)?;
        if !dispatcher.known_command_types().contains(&command_type) {
            return Err(DomainError::UnknownCommand(format!(
                "[{command_type}] command is unknown"
            )));
        }

        let retried = self.retry(dispatcher, command);
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, retried)
                .await
                .unwrap_or_else(|_| {
                    Err(DomainError::Technical(format!(
                        "command timed out after {} ms",
                        deadline.as_millis()
                    )))
                }),
            None => retried.await,
        };

        result.context(command_type)
    }

    async fn retry<D>(
        &self,
        dispatcher: &D,
        command: &D::Command,
    ) -> Result<Vec<StoredEvent>, DomainError>
    where
        D: CommandDispatcher + ?Sized,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = AttemptOutcome::classify(self.attempt(dispatcher, command).await);
            if let AttemptOutcome::Conflicted(err) = &outcome {
                warn!(
                    command_type = command.command_type(),
                    target_id = %command.target_id(),
                    attempt,
                    max_attempts = self.policy.max_attempts(),
                    error = %err,
                    "concurrency conflict"
                );
            }
            match self.policy.decide(attempt, outcome) {
                RetryDecision::Retry => {}
                RetryDecision::Return(result) => return result,
            }
        }
    }

    async fn attempt<D>(
        &self,
        dispatcher: &D,
        command: &D::Command,
    ) -> Result<Vec<StoredEvent>, DomainError>
    where
        D: CommandDispatcher + ?Sized,
    {
        let mut session = self.store.begin().await?;

        match dispatcher.dispatch(session.as_mut(), command).await {
            Ok(recorded) => {
                session.commit().await?;
                debug!(
                    command_type = command.command_type(),
                    target_id = %command.target_id(),
                    recorded = recorded.len(),
                    "command committed"
                );
                Ok(recorded)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
