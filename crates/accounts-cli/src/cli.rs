//! Command line definition.

use std::time::Duration;

use accounts_core::pipeline::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use accounts_event_store::{StoreConfig, StoreConfigError};
use clap::{Parser, Subcommand};

/// Administer customer accounts stored as event streams.
#[derive(Debug, Parser)]
#[command(name = "accounts", version, about, propagate_version = true)]
pub struct Cli {
    /// PostgreSQL connection string.
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Attempts per command before a contended stream is given up on.
    #[arg(long, global = true, env = "ACCOUNTS_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Wall-clock bound for one command, in milliseconds.
    #[arg(long, global = true, env = "ACCOUNTS_DEADLINE_MS")]
    pub deadline_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Operations on a single customer.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Register a new customer
    Register {
        /// Email address to register with.
        #[arg(long)]
        email: String,
        /// Given (first) name.
        #[arg(long)]
        given_name: String,
        /// Family (last) name.
        #[arg(long)]
        family_name: String,
    },

    /// Confirm a customer's email address
    ConfirmEmail {
        /// Customer identifier.
        customer_id: String,
        /// Hash issued at registration or email change.
        #[arg(long)]
        hash: String,
    },

    /// Change a customer's email address
    ChangeEmail {
        /// Customer identifier.
        customer_id: String,
        /// The new email address.
        #[arg(long)]
        email: String,
    },

    /// Delete a customer account
    Delete {
        /// Customer identifier.
        customer_id: String,
    },

    /// Show the current state of a customer
    Show {
        /// Customer identifier.
        customer_id: String,
    },

    /// Remove a customer's entire event stream
    Purge {
        /// Customer identifier.
        customer_id: String,
    },
}

impl Cli {
    /// Builds the store configuration; `--database-url` overrides
    /// `DATABASE_URL`, pool settings come from the environment.
    ///
    /// # Errors
    ///
    /// Returns `StoreConfigError::Config` if no database URL is available or
    /// a pool setting does not parse.
    pub fn store_config(&self) -> Result<StoreConfig, StoreConfigError> {
        StoreConfig::from_lookup(|key| match key {
            "DATABASE_URL" => self.database_url.clone(),
            _ => std::env::var(key).ok(),
        })
    }

    /// Returns the retry policy selected by `--max-attempts`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }

    /// Returns the per-command deadline, if one was given.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}
