//! Accounts Core: event-sourcing abstractions.
//!
//! This crate defines the event model, the event store seam, the replay
//! engine and the retrying command pipeline that every bounded context
//! builds on. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod repository;
pub mod rng;
