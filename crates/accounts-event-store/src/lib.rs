//! Accounts Event Store: PostgreSQL persistence for event streams.

pub mod config;
pub mod pg_event_store;

pub use config::{StoreConfig, StoreConfigError};
pub use pg_event_store::PgEventStore;
