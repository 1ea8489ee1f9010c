//! Application services for the Customer context.

pub mod codec;
pub mod command_handlers;
pub mod event_store;
pub mod query_handlers;
